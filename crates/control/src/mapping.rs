//! Capture-space <-> screen-space coordinate mapping.
//!
//! The detector sees a (usually downscaled) copy of the capture region.
//! Screen space is integral, so `to_screen` rounds to the nearest pixel;
//! that rounding is what makes `to_screen(to_capture(p)) == p` exact for
//! every pixel inside the region.

use pursuit_common::config::TrackingConfig;
use pursuit_model::{CaptureRegion, Point2D, ScreenPoint};

/// Maps points between the detector's frame and the screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    region: CaptureRegion,
    frame_width: u32,
    frame_height: u32,
}

impl CoordinateMapper {
    /// `frame_width`/`frame_height` must be non-zero; validated configs guarantee it.
    pub fn new(region: CaptureRegion, frame_width: u32, frame_height: u32) -> Self {
        Self {
            region,
            frame_width: frame_width.max(1),
            frame_height: frame_height.max(1),
        }
    }

    pub fn from_config(config: &TrackingConfig) -> Self {
        Self::new(config.region, config.frame_width, config.frame_height)
    }

    pub fn region(&self) -> &CaptureRegion {
        &self.region
    }

    /// Screen pixels per capture pixel along each axis.
    pub fn scale_factors(&self) -> (f64, f64) {
        (
            f64::from(self.region.width) / f64::from(self.frame_width),
            f64::from(self.region.height) / f64::from(self.frame_height),
        )
    }

    /// Center of the detector frame in capture space.
    pub fn capture_center(&self) -> Point2D {
        Point2D::new(
            f64::from(self.frame_width) / 2.0,
            f64::from(self.frame_height) / 2.0,
        )
    }

    /// Map a capture-space point to an absolute screen pixel.
    ///
    /// Points outside the frame are clamped to the region's edges.
    pub fn to_screen(&self, point: Point2D) -> ScreenPoint {
        let fw = f64::from(self.frame_width);
        let fh = f64::from(self.frame_height);
        let x = clamp_finite(point.x, fw);
        let y = clamp_finite(point.y, fh);

        let sx = (x * f64::from(self.region.width) / fw).round() as i32;
        let sy = (y * f64::from(self.region.height) / fh).round() as i32;

        self.region
            .clamp(ScreenPoint::new(self.region.left + sx, self.region.top + sy))
    }

    /// Map an absolute screen pixel into capture space.
    ///
    /// Pixels outside the region are clamped to its edges first.
    pub fn to_capture(&self, point: ScreenPoint) -> Point2D {
        let p = self.region.clamp(point);
        let dx = f64::from(p.x - self.region.left);
        let dy = f64::from(p.y - self.region.top);
        Point2D::new(
            dx * f64::from(self.frame_width) / f64::from(self.region.width),
            dy * f64::from(self.frame_height) / f64::from(self.region.height),
        )
    }
}

fn clamp_finite(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hd_mapper() -> CoordinateMapper {
        CoordinateMapper::new(CaptureRegion::new(0, 0, 1920, 1080), 640, 360)
    }

    #[test]
    fn test_scale_factors() {
        let (sx, sy) = hd_mapper().scale_factors();
        assert!((sx - 3.0).abs() < 1e-12);
        assert!((sy - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_frame_center_maps_to_screen_center() {
        let mapper = hd_mapper();
        assert_eq!(
            mapper.to_screen(Point2D::new(320.0, 180.0)),
            ScreenPoint::new(960, 540)
        );
        assert_eq!(
            mapper.to_capture(ScreenPoint::new(960, 540)),
            Point2D::new(320.0, 180.0)
        );
    }

    #[test]
    fn test_offset_region() {
        let mapper = CoordinateMapper::new(CaptureRegion::new(2560, 100, 1280, 720), 640, 360);
        assert_eq!(
            mapper.to_screen(Point2D::new(10.0, 20.0)),
            ScreenPoint::new(2580, 140)
        );
    }

    #[test]
    fn test_out_of_bounds_is_clamped() {
        let mapper = hd_mapper();
        assert_eq!(
            mapper.to_screen(Point2D::new(-50.0, 9000.0)),
            ScreenPoint::new(0, 1079)
        );
        assert_eq!(
            mapper.to_screen(Point2D::new(f64::NAN, 640.0)),
            ScreenPoint::new(0, 1079)
        );
        assert_eq!(
            mapper.to_capture(ScreenPoint::new(5000, -3)),
            mapper.to_capture(ScreenPoint::new(1919, 0))
        );
    }

    proptest! {
        #[test]
        fn roundtrip_is_exact_inside_region(
            left in -4000i32..4000,
            top in -4000i32..4000,
            width in 1u32..4000,
            height in 1u32..4000,
            frame_w in 1u32..2000,
            frame_h in 1u32..2000,
            fx in 0.0f64..1.0,
            fy in 0.0f64..1.0,
        ) {
            let region = CaptureRegion::new(left, top, width, height);
            let mapper = CoordinateMapper::new(region, frame_w, frame_h);
            let p = ScreenPoint::new(
                left + (fx * f64::from(width - 1)).round() as i32,
                top + (fy * f64::from(height - 1)).round() as i32,
            );
            prop_assert!(region.contains(&p));
            prop_assert_eq!(mapper.to_screen(mapper.to_capture(p)), p);
        }

        #[test]
        fn to_screen_always_lands_in_region(x in -1e6f64..1e6, y in -1e6f64..1e6) {
            let mapper = hd_mapper();
            let s = mapper.to_screen(Point2D::new(x, y));
            prop_assert!(mapper.region().contains(&s));
        }
    }
}
