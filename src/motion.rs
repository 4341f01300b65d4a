// ==============================================================================
// motion.rs: INPUT SMOOTHING + HEADING + TRANSLATIONAL INTEGRATION
// ==============================================================================
// Two ways to move the body, picked once per vehicle:
//
// - Kinematic:       speed follows tuned accel / brake / coast constants.
// - ForceIntegrated: speed follows the summed tire forces, then drag, brakes
//                    and coasting bleed it toward zero without crossing it.
//
// Both share input smoothing, the speed-sensitive heading model, and the
// position advance along the heading. Speeds here are km/h, accelerations
// handed back to the state are m/s^2 in the vehicle frame.
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::config::{InputSmoothing, MotionConfig};
use crate::state::{ControlInput, KinematicState, TireCornerState};
use crate::types::{Real, heading_forward, kmh_to_ms, ms_to_kmh, wrap_degrees};

const HANDBRAKE_FACTOR: Real = 0.8;
const COAST_FACTOR: Real = 0.3;
const DRAG_SCALE: Real = 1000.0;
const TURN_MIN_SPEED: Real = 0.5; // km/h
const TURN_FADE_SPEED: Real = 150.0; // km/h
const TURN_MIN_FACTOR: Real = 0.3;
const MOVE_MIN_SPEED: Real = 0.1; // km/h
const REST_SNAP_SPEED: Real = 0.1; // km/h

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionMode {
    Kinematic,
    ForceIntegrated,
}

/// Move `current` toward `target` by at most `rate * dt`, using the rise
/// rate when moving away from zero and the fall rate when returning.
pub fn smooth_axis(current: Real, target: Real, dt: Real, rise: Real, fall: Real, lo: Real, hi: Real) -> Real {
    let delta = target - current;
    let rising = (delta > 0.0) == (current > 0.0) || (delta != 0.0 && current == 0.0);
    let step = dt * if rising { rise } else { fall };
    (current + delta.clamp(-step, step)).clamp(lo, hi)
}

#[derive(Debug, Clone)]
pub struct MotionModel {
    cfg: MotionConfig,
    mass: Real,
}

impl MotionModel {
    pub fn new(cfg: &MotionConfig, mass: Real) -> Self {
        Self { cfg: cfg.clone(), mass }
    }

    pub fn max_forward(&self) -> Real {
        self.cfg.max_speed
    }

    pub fn max_reverse(&self) -> Real {
        self.cfg.max_speed * self.cfg.reverse_speed_fraction
    }

    // ----------------------------------------------------------------------
    // Shared
    // ----------------------------------------------------------------------

    pub fn smooth_inputs(&self, dt: Real, input: &ControlInput, kin: &mut KinematicState) {
        let s: &InputSmoothing = &self.cfg.smoothing;
        kin.throttle = smooth_axis(kin.throttle, input.throttle, dt, s.throttle_rise, s.throttle_fall, 0.0, 1.0);
        kin.brake = smooth_axis(kin.brake, input.brake, dt, s.brake_rise, s.brake_fall, 0.0, 1.0);
        kin.steering = smooth_axis(kin.steering, input.steering, dt, s.steering_rise, s.steering_fall, -1.0, 1.0);
        kin.steering_angle = kin.steering * self.cfg.max_steering_angle;
    }

    /// Turning authority fades with speed but never below 30%.
    pub fn advance_heading(&self, dt: Real, kin: &mut KinematicState) {
        if kin.speed.abs() < TURN_MIN_SPEED {
            return;
        }
        let factor = (1.0 - kin.speed.abs() / TURN_FADE_SPEED).max(TURN_MIN_FACTOR);
        kin.heading = wrap_degrees(kin.heading + self.cfg.turn_speed * kin.steering * factor * dt);
    }

    // ----------------------------------------------------------------------
    // Kinematic
    // ----------------------------------------------------------------------

    pub fn integrate_kinematic(&self, dt: Real, handbrake: bool, kin: &mut KinematicState) {
        let c = &self.cfg;
        let before = kin.speed;

        let coasting = kin.throttle <= 0.0 && kin.brake <= 0.0 && !handbrake;
        let mut accel = if kin.throttle > 0.0 {
            c.acceleration * kin.throttle
        } else if kin.brake > 0.0 {
            -c.brake_deceleration * kin.brake
        } else if handbrake {
            -c.brake_deceleration * HANDBRAKE_FACTOR
        } else if kin.speed > 0.0 {
            -c.deceleration * COAST_FACTOR
        } else if kin.speed < 0.0 {
            c.deceleration * COAST_FACTOR
        } else {
            0.0
        };
        accel -= self.drag(kin.speed);

        let mut speed = kin.speed + accel * dt;
        // coasting drifts toward zero, never through it
        if coasting && speed * before < 0.0 {
            speed = 0.0;
        }
        kin.speed = speed.clamp(-self.max_reverse(), self.max_forward());
        if kin.speed.abs() < REST_SNAP_SPEED && kin.throttle == 0.0 {
            kin.speed = 0.0;
        }

        self.finish(dt, before, 0.0, kin);
    }

    // ----------------------------------------------------------------------
    // Force-integrated
    // ----------------------------------------------------------------------

    pub fn integrate_forces(&self, dt: Real, handbrake: bool, tires: &[TireCornerState], kin: &mut KinematicState) {
        let c = &self.cfg;
        let before = kin.speed;

        let long: Real = tires.iter().map(|t| t.long_force).sum();
        let lat: Real = tires.iter().map(|t| t.lat_force).sum();
        let a_long = long / self.mass;
        let a_lat = lat / self.mass;

        let mut speed = kin.speed + ms_to_kmh(a_long) * dt;

        // resistance magnitude in km/h per s, always opposing motion
        let mut resist = self.drag(speed).abs() + c.brake_deceleration * kin.brake;
        if handbrake {
            resist += c.brake_deceleration * HANDBRAKE_FACTOR;
        }
        if kin.throttle == 0.0 {
            resist += c.deceleration * COAST_FACTOR;
        }
        let bleed = resist * dt;
        speed = if bleed >= speed.abs() { 0.0 } else { speed - speed.signum() * bleed };

        kin.speed = speed.clamp(-self.max_reverse(), self.max_forward());
        self.finish(dt, before, a_lat, kin);
    }

    fn drag(&self, speed: Real) -> Real {
        0.5 * self.cfg.drag_coefficient * speed * speed.abs() / DRAG_SCALE
    }

    /// Advance position and publish vehicle-frame velocity / acceleration.
    fn finish(&self, dt: Real, speed_before: Real, a_lat: Real, kin: &mut KinematicState) {
        let v = kmh_to_ms(kin.speed);
        if kin.speed.abs() >= MOVE_MIN_SPEED {
            kin.position += heading_forward(kin.heading) * v * dt;
        }
        let a_long = kmh_to_ms(kin.speed - speed_before) / dt;

        kin.velocity.x = 0.0;
        kin.velocity.y = v;
        kin.acceleration.x = a_lat;
        kin.acceleration.y = a_long;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::presets::sports_car;
    use crate::types::Vec3;
    use approx::assert_relative_eq;

    fn model() -> MotionModel {
        let cfg = sports_car();
        MotionModel::new(&cfg.motion, cfg.mass)
    }

    fn rest() -> KinematicState {
        KinematicState::at_rest(Vec3::zeros(), 0.0, 800.0)
    }

    #[test]
    fn smoothing_rises_and_falls_at_configured_rates() {
        // rise 8/s, fall 12/s
        let up = smooth_axis(0.0, 1.0, 0.05, 8.0, 12.0, 0.0, 1.0);
        assert_relative_eq!(up, 0.4, epsilon = 1e-12);
        let down = smooth_axis(0.5, 0.0, 0.01, 8.0, 12.0, 0.0, 1.0);
        assert_relative_eq!(down, 0.38, epsilon = 1e-12);
        assert_eq!(smooth_axis(0.9, 1.0, 1.0, 8.0, 12.0, 0.0, 1.0), 1.0);
    }

    #[test]
    fn steering_smoothing_is_symmetric() {
        let right = smooth_axis(0.0, 1.0, 0.1, 3.0, 6.0, -1.0, 1.0);
        let left = smooth_axis(0.0, -1.0, 0.1, 3.0, 6.0, -1.0, 1.0);
        assert_relative_eq!(right, -left, epsilon = 1e-12);
        // returning from a left lock toward center uses the fall rate
        let back = smooth_axis(-0.5, 0.0, 0.05, 3.0, 6.0, -1.0, 1.0);
        assert_relative_eq!(back, -0.2, epsilon = 1e-12);
    }

    #[test]
    fn steering_angle_scales_with_lock() {
        let m = model();
        let mut k = rest();
        let input = ControlInput { steering: 1.0, ..Default::default() };
        for _ in 0..60 {
            m.smooth_inputs(1.0 / 60.0, &input, &mut k);
        }
        assert_relative_eq!(k.steering, 1.0);
        assert_relative_eq!(k.steering_angle, 40.0);
    }

    #[test]
    fn heading_holds_when_stationary_and_wraps_when_turning() {
        let m = model();
        let mut k = rest();
        k.steering = -1.0;
        m.advance_heading(1.0, &mut k);
        assert_eq!(k.heading, 0.0);

        k.speed = 30.0;
        m.advance_heading(0.1, &mut k);
        // 200 deg/s * -1 * 0.8 * 0.1 s
        assert_relative_eq!(k.heading, 360.0 - 16.0, epsilon = 1e-9);
    }

    #[test]
    fn kinematic_throttle_accelerates_and_moves_forward() {
        let m = model();
        let mut k = rest();
        k.throttle = 1.0;
        m.integrate_kinematic(0.1, false, &mut k);
        assert_relative_eq!(k.speed, 8.0, epsilon = 1e-9);
        assert_relative_eq!(k.position.y, kmh_to_ms(8.0) * 0.1, epsilon = 1e-12);
        assert_relative_eq!(k.velocity.y, kmh_to_ms(8.0));
        assert_relative_eq!(k.acceleration.y, kmh_to_ms(80.0), epsilon = 1e-9);
    }

    #[test]
    fn kinematic_speed_is_capped_both_ways() {
        let m = model();
        let mut k = rest();
        k.speed = 199.9;
        k.throttle = 1.0;
        m.integrate_kinematic(1.0, false, &mut k);
        assert_eq!(k.speed, 200.0);

        let mut k = rest();
        k.brake = 1.0;
        for _ in 0..100 {
            m.integrate_kinematic(0.1, false, &mut k);
        }
        assert_eq!(k.speed, -60.0);
    }

    #[test]
    fn kinematic_coasting_stops_at_rest() {
        let m = model();
        let mut k = rest();
        k.speed = 5.0;
        for _ in 0..200 {
            m.integrate_kinematic(0.05, false, &mut k);
        }
        assert_eq!(k.speed, 0.0);
    }

    #[test]
    fn forces_accelerate_along_heading() {
        let m = model();
        let mut k = rest();
        k.heading = 90.0;
        k.throttle = 1.0;
        let push = TireCornerState { long_force: 1500.0, ..Default::default() };
        m.integrate_forces(0.1, false, &vec![push; 4], &mut k);

        // 6000 N / 1500 kg = 4 m/s^2, minus a sliver of drag
        assert!(k.speed > 1.43 && k.speed <= 4.0 * 3.6 * 0.1);
        assert!(k.position.x > 0.0);
        assert_relative_eq!(k.position.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn resistance_stops_but_never_reverses() {
        let m = model();
        let mut k = rest();
        k.speed = 1.0;
        k.brake = 1.0;
        m.integrate_forces(0.5, false, &vec![TireCornerState::default(); 4], &mut k);
        assert_eq!(k.speed, 0.0);

        let mut k = rest();
        k.speed = -1.0;
        m.integrate_forces(0.5, true, &vec![TireCornerState::default(); 4], &mut k);
        assert_eq!(k.speed, 0.0);
    }

    #[test]
    fn lateral_force_reports_lateral_acceleration() {
        let m = model();
        let mut k = rest();
        k.speed = 50.0;
        k.throttle = 0.5;
        let side = TireCornerState { lat_force: 750.0, ..Default::default() };
        m.integrate_forces(0.02, false, &vec![side; 4], &mut k);
        assert_relative_eq!(k.acceleration.x, 2.0);
    }

    #[test]
    fn vertical_components_are_preserved() {
        let m = model();
        let mut k = rest();
        k.velocity.z = 0.4;
        k.acceleration.z = -3.0;
        m.integrate_kinematic(0.02, false, &mut k);
        assert_eq!(k.velocity.z, 0.4);
        assert_eq!(k.acceleration.z, -3.0);
    }
}
