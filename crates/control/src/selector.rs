//! Single-target selection with cross-frame identity.
//!
//! Detections carry no identity of their own. The selector keeps one track
//! and continues it with nearest-neighbour gating: a detection only extends
//! the track if its center moved by at most `gating_radius` since the last
//! match. Unmatched frames age the track; past `max_staleness` it is dropped
//! and the next frame with detections starts a new one.

use pursuit_common::config::TrackingConfig;
use pursuit_model::{Detection, Point2D};
use serde::{Deserialize, Serialize};

/// The selector's memory between frames.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum TrackState {
    /// No target is being followed.
    #[default]
    Empty,
    /// A target is being followed.
    Active {
        /// Track identifier, unique for the lifetime of the selector.
        id: u64,
        /// Last matched center (capture space).
        center: Point2D,
        /// Consecutive frames without a match.
        staleness: u32,
    },
}

/// Outcome of one selection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Selection {
    /// A detection matched this frame.
    Locked {
        track_id: u64,
        center: Point2D,
        confidence: f64,
    },
    /// Nothing matched this frame; holding the last known center.
    Coasting {
        track_id: u64,
        center: Point2D,
        staleness: u32,
    },
    /// No target.
    NoTarget,
}

impl Selection {
    /// Point the controller should steer toward, if any.
    pub fn target(&self) -> Option<Point2D> {
        match self {
            Self::Locked { center, .. } | Self::Coasting { center, .. } => Some(*center),
            Self::NoTarget => None,
        }
    }

    pub fn track_id(&self) -> Option<u64> {
        match self {
            Self::Locked { track_id, .. } | Self::Coasting { track_id, .. } => Some(*track_id),
            Self::NoTarget => None,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }
}

/// Picks the active target each frame and maintains its [`TrackState`].
#[derive(Debug)]
pub struct TargetSelector {
    state: TrackState,
    last_track_id: u64,
}

impl Default for TargetSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetSelector {
    pub fn new() -> Self {
        Self {
            state: TrackState::Empty,
            last_track_id: 0,
        }
    }

    pub fn state(&self) -> &TrackState {
        &self.state
    }

    /// Forget the current track. Track identifiers keep increasing.
    pub fn reset(&mut self) {
        self.state = TrackState::Empty;
    }

    /// Run one selection cycle over this frame's detections.
    ///
    /// Never fails; malformed detections are skipped like low-confidence ones.
    pub fn select(&mut self, detections: &[Detection], config: &TrackingConfig) -> Selection {
        let frame_center = Point2D::new(
            f64::from(config.frame_width) / 2.0,
            f64::from(config.frame_height) / 2.0,
        );
        self.select_around(detections, frame_center, config)
    }

    /// Like [`select`](Self::select), with the frame center supplied by the
    /// caller for frames whose size differs from the configured one.
    ///
    /// A frame with no detections at all reports [`Selection::NoTarget`]
    /// right away. The track still ages, so it survives a brief dropout.
    pub fn select_around(
        &mut self,
        detections: &[Detection],
        frame_center: Point2D,
        config: &TrackingConfig,
    ) -> Selection {
        let candidates: Vec<&Detection> = detections
            .iter()
            .filter(|d| d.is_well_formed() && d.confidence >= config.confidence_threshold)
            .filter(|d| !(config.ignore_center_boxes && d.contains(&frame_center)))
            .collect();

        match self.state {
            TrackState::Empty => match nearest(&candidates, &frame_center) {
                Some(det) => self.start_track(det),
                None => Selection::NoTarget,
            },
            TrackState::Active {
                id,
                center,
                staleness,
            } => {
                let matched = nearest(&candidates, &center)
                    .filter(|det| det.center().distance_to(&center) <= config.gating_radius);

                match matched {
                    Some(det) => {
                        let center = det.center();
                        self.state = TrackState::Active {
                            id,
                            center,
                            staleness: 0,
                        };
                        Selection::Locked {
                            track_id: id,
                            center,
                            confidence: det.confidence,
                        }
                    }
                    None => {
                        let aged = self.age_track(
                            id,
                            center,
                            staleness.saturating_add(1),
                            config.max_staleness,
                        );
                        if detections.is_empty() {
                            Selection::NoTarget
                        } else {
                            aged
                        }
                    }
                }
            }
        }
    }

    fn start_track(&mut self, det: &Detection) -> Selection {
        self.last_track_id += 1;
        let id = self.last_track_id;
        let center = det.center();
        self.state = TrackState::Active {
            id,
            center,
            staleness: 0,
        };
        tracing::debug!(track_id = id, x = center.x, y = center.y, "Track acquired");
        Selection::Locked {
            track_id: id,
            center,
            confidence: det.confidence,
        }
    }

    fn age_track(&mut self, id: u64, center: Point2D, staleness: u32, limit: u32) -> Selection {
        if staleness > limit {
            tracing::debug!(track_id = id, staleness, "Track lost");
            self.state = TrackState::Empty;
            return Selection::NoTarget;
        }
        self.state = TrackState::Active {
            id,
            center,
            staleness,
        };
        Selection::Coasting {
            track_id: id,
            center,
            staleness,
        }
    }
}

/// Closest detection to `anchor`. Ties go to higher confidence, then to input order.
fn nearest<'a>(candidates: &[&'a Detection], anchor: &Point2D) -> Option<&'a Detection> {
    let mut best: Option<(&Detection, f64)> = None;
    for &det in candidates {
        let dist = det.center().distance_to(anchor);
        let better = match best {
            None => true,
            Some((current, best_dist)) => {
                dist < best_dist || (dist == best_dist && det.confidence > current.confidence)
            }
        };
        if better {
            best = Some((det, dist));
        }
    }
    best.map(|(det, _)| det)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TrackingConfig {
        TrackingConfig {
            confidence_threshold: 0.5,
            gating_radius: 20.0,
            max_staleness: 2,
            frame_width: 640,
            frame_height: 360,
            ..TrackingConfig::default()
        }
    }

    /// A 10x10 box centered on `(cx, cy)`.
    fn det(cx: f64, cy: f64, confidence: f64) -> Detection {
        Detection::new(cx - 5.0, cy - 5.0, 10.0, 10.0, confidence)
    }

    #[test]
    fn test_empty_frame_without_track_is_no_target() {
        let mut selector = TargetSelector::new();
        assert_eq!(selector.select(&[], &config()), Selection::NoTarget);
        assert_eq!(*selector.state(), TrackState::Empty);
    }

    #[test]
    fn test_low_confidence_is_filtered() {
        let mut selector = TargetSelector::new();
        let sel = selector.select(&[det(320.0, 180.0, 0.3)], &config());
        assert_eq!(sel, Selection::NoTarget);
    }

    #[test]
    fn test_first_pick_is_nearest_to_frame_center() {
        let mut selector = TargetSelector::new();
        let sel = selector.select(
            &[
                det(100.0, 100.0, 0.9),
                det(330.0, 170.0, 0.6),
                det(500.0, 300.0, 0.95),
            ],
            &config(),
        );
        assert_eq!(sel.target(), Some(Point2D::new(330.0, 170.0)));
        assert_eq!(sel.track_id(), Some(1));
        assert!(sel.is_locked());
    }

    #[test]
    fn test_tie_breaks_on_confidence_then_order() {
        let mut selector = TargetSelector::new();
        let sel = selector.select(
            &[det(300.0, 180.0, 0.6), det(340.0, 180.0, 0.8)],
            &config(),
        );
        assert_eq!(sel.target(), Some(Point2D::new(340.0, 180.0)));

        let mut selector = TargetSelector::new();
        let sel = selector.select(
            &[det(300.0, 180.0, 0.7), det(340.0, 180.0, 0.7)],
            &config(),
        );
        assert_eq!(sel.target(), Some(Point2D::new(300.0, 180.0)));
    }

    #[test]
    fn test_track_ignores_distractor_near_center() {
        let mut selector = TargetSelector::new();
        let cfg = config();
        let id = selector.select(&[det(100.0, 100.0, 0.6)], &cfg).track_id();

        let mut x = 100.0;
        for _ in 0..10 {
            x += 19.0;
            let sel = selector.select(&[det(320.0, 180.0, 0.99), det(x, 100.0, 0.6)], &cfg);
            assert_eq!(sel.track_id(), id);
            assert_eq!(sel.target(), Some(Point2D::new(x, 100.0)));
        }
    }

    #[test]
    fn test_follows_moving_target() {
        let mut selector = TargetSelector::new();
        let cfg = config();
        let id = selector.select(&[det(320.0, 180.0, 0.9)], &cfg).track_id();
        for step in 1..=10 {
            let x = 320.0 + 15.0 * step as f64;
            let sel = selector.select(&[det(x, 180.0, 0.9)], &cfg);
            assert!(sel.is_locked());
            assert_eq!(sel.track_id(), id);
            assert_eq!(sel.target(), Some(Point2D::new(x, 180.0)));
        }
    }

    #[test]
    fn test_jump_beyond_gate_ages_track() {
        let mut selector = TargetSelector::new();
        let cfg = config();
        selector.select(&[det(320.0, 180.0, 0.9)], &cfg);

        let sel = selector.select(&[det(400.0, 180.0, 0.9)], &cfg);
        assert_eq!(
            sel,
            Selection::Coasting {
                track_id: 1,
                center: Point2D::new(320.0, 180.0),
                staleness: 1,
            }
        );
    }

    #[test]
    fn test_track_dropped_after_staleness_limit() {
        let mut selector = TargetSelector::new();
        let cfg = config();
        selector.select(&[det(320.0, 180.0, 0.9)], &cfg);

        // max_staleness = 2: two coasting frames, the third drops the track.
        let filtered = [det(320.0, 180.0, 0.1)];
        assert!(matches!(selector.select(&filtered, &cfg), Selection::Coasting { staleness: 1, .. }));
        assert!(matches!(selector.select(&filtered, &cfg), Selection::Coasting { staleness: 2, .. }));
        assert_eq!(selector.select(&filtered, &cfg), Selection::NoTarget);
        assert_eq!(*selector.state(), TrackState::Empty);

        // Next frame with detections starts a fresh track.
        let sel = selector.select(&[det(400.0, 180.0, 0.9)], &cfg);
        assert_eq!(sel.track_id(), Some(2));
    }

    #[test]
    fn test_empty_frame_reports_no_target_but_keeps_track() {
        let mut selector = TargetSelector::new();
        let cfg = config();
        selector.select(&[det(320.0, 180.0, 0.9)], &cfg);

        assert_eq!(selector.select(&[], &cfg), Selection::NoTarget);
        assert!(matches!(
            selector.state(),
            TrackState::Active { id: 1, staleness: 1, .. }
        ));

        assert_eq!(selector.select(&[], &cfg), Selection::NoTarget);
        assert_eq!(selector.select(&[], &cfg), Selection::NoTarget);
        assert_eq!(*selector.state(), TrackState::Empty);
    }

    #[test]
    fn test_staleness_saturates_at_limit() {
        let mut selector = TargetSelector::new();
        let cfg = TrackingConfig {
            max_staleness: u32::MAX,
            ..config()
        };
        selector.select(&[det(320.0, 180.0, 0.9)], &cfg);
        selector.state = TrackState::Active {
            id: 1,
            center: Point2D::new(320.0, 180.0),
            staleness: u32::MAX,
        };

        let sel = selector.select(&[det(600.0, 50.0, 0.9)], &cfg);
        assert_eq!(
            sel,
            Selection::Coasting {
                track_id: 1,
                center: Point2D::new(320.0, 180.0),
                staleness: u32::MAX,
            }
        );
    }

    #[test]
    fn test_select_around_uses_given_center() {
        let mut selector = TargetSelector::new();
        let sel = selector.select_around(
            &[det(320.0, 180.0, 0.9), det(1250.0, 700.0, 0.9)],
            Point2D::new(1280.0, 720.0),
            &config(),
        );
        assert_eq!(sel.target(), Some(Point2D::new(1250.0, 700.0)));
    }

    #[test]
    fn test_rematch_resets_staleness() {
        let mut selector = TargetSelector::new();
        let cfg = config();
        selector.select(&[det(320.0, 180.0, 0.9)], &cfg);
        selector.select(&[], &cfg);
        let sel = selector.select(&[det(325.0, 182.0, 0.9)], &cfg);
        assert!(sel.is_locked());
        assert!(matches!(
            selector.state(),
            TrackState::Active { id: 1, staleness: 0, .. }
        ));
    }

    #[test]
    fn test_ignore_center_boxes() {
        let mut selector = TargetSelector::new();
        let cfg = TrackingConfig {
            ignore_center_boxes: true,
            ..config()
        };
        let own_model = Detection::new(300.0, 150.0, 40.0, 80.0, 0.99);
        let sel = selector.select(&[own_model, det(100.0, 100.0, 0.6)], &cfg);
        assert_eq!(sel.target(), Some(Point2D::new(100.0, 100.0)));
    }

    #[test]
    fn test_malformed_detections_are_skipped() {
        let mut selector = TargetSelector::new();
        let bad = Detection::new(f64::NAN, 0.0, 10.0, 10.0, 0.9);
        assert_eq!(selector.select(&[bad], &config()), Selection::NoTarget);
    }

    #[test]
    fn test_reset_keeps_ids_monotonic() {
        let mut selector = TargetSelector::new();
        let cfg = config();
        selector.select(&[det(320.0, 180.0, 0.9)], &cfg);
        selector.reset();
        let sel = selector.select(&[det(320.0, 180.0, 0.9)], &cfg);
        assert_eq!(sel.track_id(), Some(2));
    }
}
