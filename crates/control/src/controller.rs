//! Proportional-derivative pointer control with exponential smoothing.
//!
//! Per tracking tick:
//! 1. `error = target - pointer` (screen px)
//! 2. inside the dead zone: emit zero, remember the error, zero the smoothed output
//! 3. `raw = kp * error + kd * (error - previous_error)`
//! 4. `smoothed = alpha * previous_smoothed + (1 - alpha) * raw`
//! 5. clamp `smoothed` to `max_speed` by vector magnitude
//!
//! The clamp acts on the vector length, not per axis, so diagonal motion is
//! capped at the same speed as horizontal motion and keeps its direction.

use pursuit_common::config::TrackingConfig;
use pursuit_model::{PointerCommand, ScreenPoint, Vector2};
use serde::{Deserialize, Serialize};

/// Controller engagement state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ControlMode {
    /// Engagement off, or no target.
    #[default]
    Idle,
    /// Engagement on and a target is selected.
    Tracking,
}

/// Memory carried between control ticks.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlState {
    /// Last emitted (smoothed, clamped) displacement.
    pub previous_output: Vector2,

    /// Raw error of the previous tick. `None` right after a reset, which
    /// makes the first derivative term zero.
    pub previous_raw_error: Option<Vector2>,

    /// Ticks spent in [`ControlMode::Tracking`] since the last reset.
    pub ticks: u64,
}

/// Stateful control law turning a target offset into a bounded displacement.
#[derive(Debug, Default)]
pub struct MotionController {
    mode: ControlMode,
    state: ControlState,
}

impl MotionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    /// Drop all momentum and return to [`ControlMode::Idle`].
    pub fn reset(&mut self) {
        if self.mode == ControlMode::Tracking {
            tracing::debug!(ticks = self.state.ticks, "Controller idle");
        }
        self.mode = ControlMode::Idle;
        self.state = ControlState::default();
    }

    /// Run one control tick.
    ///
    /// `target` is the selected target in screen space, `None` when the
    /// selector reported no target. Returns [`PointerCommand::ZERO`] while idle.
    pub fn step(
        &mut self,
        engaged: bool,
        target: Option<ScreenPoint>,
        pointer: ScreenPoint,
        config: &TrackingConfig,
    ) -> PointerCommand {
        let Some(target) = target.filter(|_| engaged) else {
            if self.mode != ControlMode::Idle {
                self.reset();
            }
            return PointerCommand::ZERO;
        };

        if self.mode == ControlMode::Idle {
            self.state = ControlState::default();
            self.mode = ControlMode::Tracking;
            tracing::debug!(x = target.x, y = target.y, "Controller tracking");
        }

        self.track(pointer.offset_to(&target), config)
    }

    fn track(&mut self, error: Vector2, config: &TrackingConfig) -> PointerCommand {
        self.state.ticks += 1;

        if error.magnitude() <= config.dead_zone {
            self.state.previous_raw_error = Some(error);
            self.state.previous_output = Vector2::ZERO;
            return PointerCommand::ZERO;
        }

        let proportional = error * config.kp;
        let derivative = match self.state.previous_raw_error {
            Some(previous) => (error - previous) * config.kd,
            None => Vector2::ZERO,
        };
        let raw = proportional + derivative;

        let smoothed = self.state.previous_output * config.alpha + raw * (1.0 - config.alpha);
        let output = smoothed.clamp_magnitude(config.max_speed);

        self.state.previous_raw_error = Some(error);
        self.state.previous_output = output;
        output.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scenario_config() -> TrackingConfig {
        TrackingConfig {
            kp: 0.15,
            kd: 0.05,
            alpha: 0.85,
            dead_zone: 5.0,
            max_speed: 30.0,
            ..TrackingConfig::default()
        }
    }

    fn origin() -> ScreenPoint {
        ScreenPoint::new(0, 0)
    }

    #[test]
    fn test_idle_without_engagement() {
        let mut ctrl = MotionController::new();
        let cmd = ctrl.step(
            false,
            Some(ScreenPoint::new(100, 100)),
            origin(),
            &scenario_config(),
        );
        assert_eq!(cmd, PointerCommand::ZERO);
        assert_eq!(ctrl.mode(), ControlMode::Idle);
    }

    #[test]
    fn test_idle_without_target() {
        let mut ctrl = MotionController::new();
        assert_eq!(
            ctrl.step(true, None, origin(), &scenario_config()),
            PointerCommand::ZERO
        );
        assert_eq!(ctrl.mode(), ControlMode::Idle);
    }

    #[test]
    fn test_first_tick_has_no_derivative_kick() {
        let mut ctrl = MotionController::new();
        let cfg = scenario_config();
        let cmd = ctrl.step(true, Some(ScreenPoint::new(100, 100)), origin(), &cfg);
        // (1 - alpha) * kp * error
        let expected = (1.0 - cfg.alpha) * cfg.kp * 100.0;
        assert!((cmd.dx - expected).abs() < 1e-9);
        assert!((cmd.dy - expected).abs() < 1e-9);
        assert_eq!(ctrl.mode(), ControlMode::Tracking);
    }

    #[test]
    fn test_scenario_three_ticks() {
        let mut ctrl = MotionController::new();
        let cfg = scenario_config();
        let targets = [
            ScreenPoint::new(100, 100),
            ScreenPoint::new(102, 101),
            ScreenPoint::new(105, 104),
        ];

        let mut pointer = (0.0f64, 0.0f64);
        let mut last_error = f64::INFINITY;
        let mut last_speed = 0.0;
        for target in targets {
            let at = ScreenPoint::new(pointer.0.round() as i32, pointer.1.round() as i32);
            let error = at.offset_to(&target).magnitude();
            let cmd = ctrl.step(true, Some(target), at, &cfg);

            assert!(cmd.dx > 0.0 && cmd.dy > 0.0, "must move toward target");
            assert!(cmd.magnitude() <= cfg.max_speed + 1e-9);
            assert!(error < last_error, "raw error should shrink");
            assert!(cmd.magnitude() > last_speed, "output trends up toward steady state");

            last_error = error;
            last_speed = cmd.magnitude();
            pointer.0 += cmd.dx;
            pointer.1 += cmd.dy;
        }
    }

    #[test]
    fn test_dead_zone_emits_zero_and_remembers_error() {
        let mut ctrl = MotionController::new();
        let cfg = TrackingConfig {
            kp: 50.0,
            kd: 50.0,
            ..scenario_config()
        };
        let cmd = ctrl.step(true, Some(ScreenPoint::new(3, 4)), origin(), &cfg);
        assert_eq!(cmd, PointerCommand::ZERO);
        assert_eq!(ctrl.state().previous_raw_error, Some(Vector2::new(3.0, 4.0)));
        assert_eq!(ctrl.state().previous_output, Vector2::ZERO);
    }

    #[test]
    fn test_toggle_off_resets_state() {
        let mut ctrl = MotionController::new();
        let cfg = scenario_config();
        for _ in 0..5 {
            ctrl.step(true, Some(ScreenPoint::new(200, 0)), origin(), &cfg);
        }
        assert!(ctrl.state().ticks > 0);

        ctrl.step(false, Some(ScreenPoint::new(200, 0)), origin(), &cfg);
        assert_eq!(*ctrl.state(), ControlState::default());

        // Re-engaging on a new target: no derivative term, no residual momentum.
        let cmd = ctrl.step(true, Some(ScreenPoint::new(0, 200)), origin(), &cfg);
        let expected = (1.0 - cfg.alpha) * cfg.kp * 200.0;
        assert_eq!(cmd.dx, 0.0);
        assert!((cmd.dy - expected).abs() < 1e-9);
    }

    #[test]
    fn test_target_loss_resets_state() {
        let mut ctrl = MotionController::new();
        let cfg = scenario_config();
        ctrl.step(true, Some(ScreenPoint::new(200, 0)), origin(), &cfg);
        ctrl.step(true, None, origin(), &cfg);
        assert_eq!(ctrl.mode(), ControlMode::Idle);
        assert_eq!(ctrl.state().previous_raw_error, None);
    }

    #[test]
    fn test_diagonal_clamp_keeps_direction() {
        let mut ctrl = MotionController::new();
        let cfg = TrackingConfig {
            kp: 10.0,
            kd: 0.0,
            alpha: 0.0,
            max_speed: 10.0,
            ..scenario_config()
        };
        let cmd = ctrl.step(true, Some(ScreenPoint::new(500, 500)), origin(), &cfg);
        assert!((cmd.magnitude() - 10.0).abs() < 1e-9);
        assert!((cmd.dx - cmd.dy).abs() < 1e-9);
    }

    #[test]
    fn test_zero_alpha_reaches_steady_state_immediately() {
        let mut ctrl = MotionController::new();
        let cfg = TrackingConfig {
            alpha: 0.0,
            dead_zone: 0.0,
            ..scenario_config()
        };
        for _ in 0..3 {
            let cmd = ctrl.step(true, Some(ScreenPoint::new(100, 0)), origin(), &cfg);
            assert!((cmd.dx - 15.0).abs() < 1e-9);
        }
    }

    proptest! {
        #[test]
        fn output_never_exceeds_max_speed(
            kp in 0.0f64..100.0,
            kd in 0.0f64..100.0,
            alpha in 0.0f64..0.999,
            max_speed in 0.1f64..200.0,
            targets in prop::collection::vec((-5000i32..5000, -5000i32..5000), 1..30),
        ) {
            let cfg = TrackingConfig { kp, kd, alpha, max_speed, dead_zone: 0.0, ..TrackingConfig::default() };
            let mut ctrl = MotionController::new();
            for (x, y) in targets {
                let cmd = ctrl.step(true, Some(ScreenPoint::new(x, y)), ScreenPoint::new(0, 0), &cfg);
                prop_assert!(cmd.magnitude() <= max_speed * (1.0 + 1e-12));
            }
        }

        #[test]
        fn dead_zone_is_exactly_zero(
            kp in 0.0f64..1000.0,
            kd in 0.0f64..1000.0,
            alpha in 0.0f64..0.999,
            dx in -20i32..=20,
            dy in -20i32..=20,
        ) {
            let dead_zone = 20.0;
            prop_assume!(f64::from(dx).hypot(f64::from(dy)) <= dead_zone);
            let cfg = TrackingConfig { kp, kd, alpha, dead_zone, ..TrackingConfig::default() };
            let mut ctrl = MotionController::new();
            // Build momentum first, then enter the dead zone.
            ctrl.step(true, Some(ScreenPoint::new(400, 400)), ScreenPoint::new(0, 0), &cfg);
            let cmd = ctrl.step(true, Some(ScreenPoint::new(dx, dy)), ScreenPoint::new(0, 0), &cfg);
            prop_assert_eq!(cmd, PointerCommand::ZERO);
        }

        #[test]
        fn constant_error_converges_monotonically(
            kp in 0.01f64..1.0,
            alpha in 0.0f64..0.99,
            ex in 50i32..400,
        ) {
            let cfg = TrackingConfig {
                kp,
                kd: 0.05,
                alpha,
                dead_zone: 0.0,
                max_speed: 1000.0,
                ..TrackingConfig::default()
            };
            let steady = kp * f64::from(ex);
            let mut ctrl = MotionController::new();
            let mut previous = 0.0;
            for _ in 0..200 {
                let cmd = ctrl.step(true, Some(ScreenPoint::new(ex, 0)), ScreenPoint::new(0, 0), &cfg);
                prop_assert!(cmd.dx >= previous - 1e-9);
                prop_assert!(cmd.dx <= steady + 1e-9);
                previous = cmd.dx;
            }
            if alpha < 0.9 {
                prop_assert!((previous - steady).abs() < 1e-6 * steady.max(1.0));
            }
        }

        #[test]
        fn high_alpha_barely_moves(raw_target in 100i32..2000) {
            let cfg = TrackingConfig {
                kp: 0.5,
                kd: 0.0,
                alpha: 0.999,
                dead_zone: 0.0,
                max_speed: 1e6,
                ..TrackingConfig::default()
            };
            let mut ctrl = MotionController::new();
            let mut previous = 0.0;
            for _ in 0..10 {
                let cmd = ctrl.step(true, Some(ScreenPoint::new(raw_target, 0)), ScreenPoint::new(0, 0), &cfg);
                let raw = cfg.kp * f64::from(raw_target);
                prop_assert!((cmd.dx - previous).abs() <= 0.001 * raw + 1e-9);
                previous = cmd.dx;
            }
        }
    }
}
