//! Body roll / pitch / bounce as three independent spring-damper channels.
//!
//! Targets come from the current acceleration and from left/right and
//! front/rear compression asymmetry; each channel then chases its target
//! with a damped second-order step. Grouping of corners into sides and axles
//! comes from the wheel configuration.

use crate::config::{PoseConfig, WheelConfig};
use crate::state::{KinematicState, PoseState, SuspensionCornerState};
use crate::types::{Axle, GRAVITY, Real, Side, kmh_to_ms, mean_where};

const STRAIGHT_TURN_RADIUS: Real = 1000.0; // m
const MIN_STEER_RAD: Real = 0.01;
const ASYMMETRY_GAIN: Real = 0.3;
const BOUNCE_GAIN: Real = 0.3;
const ANTI_ROLL_SCALE: Real = 10_000.0;
const MAX_ANTI_ROLL_EFFECT: Real = 0.3;
const VELOCITY_RETENTION: Real = 0.95;

#[derive(Debug, Clone)]
pub struct PoseStage {
    cfg: PoseConfig,
    mass: Real,
    roll_inertia: Real,
    pitch_inertia: Real,
    placement: Vec<(Axle, Side)>,
}

impl PoseStage {
    pub fn new(cfg: &PoseConfig, mass: Real, wheels: &[WheelConfig]) -> Self {
        Self {
            roll_inertia: mass * cfg.track_width.powi(2) / 12.0,
            pitch_inertia: mass * cfg.wheelbase.powi(2) / 12.0,
            placement: wheels.iter().map(|w| (w.axle, w.side)).collect(),
            cfg: cfg.clone(),
            mass,
        }
    }

    pub fn target_roll(&self, kin: &KinematicState, suspension: &[SuspensionCornerState]) -> Real {
        let speed = kmh_to_ms(kin.speed);
        let steer = kin.steering_angle.to_radians();
        let radius = if steer.abs() > MIN_STEER_RAD {
            self.cfg.wheelbase / steer.tan()
        } else {
            STRAIGHT_TURN_RADIUS
        };
        let lateral = speed * speed / radius;
        let base = lateral.atan2(GRAVITY).to_degrees();

        let left = self.side_mean(suspension, Side::Left);
        let right = self.side_mean(suspension, Side::Right);
        let from_suspension = ((left - right) * ASYMMETRY_GAIN)
            .atan2(self.cfg.track_width)
            .to_degrees();

        let anti_roll = ((self.cfg.front_anti_roll + self.cfg.rear_anti_roll) / ANTI_ROLL_SCALE)
            .min(MAX_ANTI_ROLL_EFFECT);

        (base * (1.0 - anti_roll) + from_suspension).clamp(-self.cfg.max_roll, self.cfg.max_roll)
    }

    pub fn target_pitch(&self, kin: &KinematicState, suspension: &[SuspensionCornerState]) -> Real {
        let base = -kin.acceleration.y.atan2(GRAVITY).to_degrees();

        let front = self.axle_mean(suspension, Axle::Front);
        let rear = self.axle_mean(suspension, Axle::Rear);
        let from_suspension = ((front - rear) * ASYMMETRY_GAIN)
            .atan2(self.cfg.wheelbase)
            .to_degrees();

        (base + from_suspension).clamp(-self.cfg.max_pitch, self.cfg.max_pitch)
    }

    pub fn target_bounce(&self, suspension: &[SuspensionCornerState]) -> Real {
        mean_where(suspension, |s| Some(s.compression)) * BOUNCE_GAIN
    }

    pub fn step(&self, dt: Real, kin: &KinematicState, suspension: &[SuspensionCornerState], pose: &mut PoseState) {
        let c = &self.cfg;

        let roll_target = self.target_roll(kin, suspension);
        chase(
            &mut pose.roll,
            &mut pose.roll_velocity,
            roll_target,
            c.roll_stiffness,
            c.roll_damping,
            self.roll_inertia,
            dt,
        );
        pose.roll = pose.roll.clamp(-c.max_roll, c.max_roll);

        let pitch_target = self.target_pitch(kin, suspension);
        chase(
            &mut pose.pitch,
            &mut pose.pitch_velocity,
            pitch_target,
            c.pitch_stiffness,
            c.pitch_damping,
            self.pitch_inertia,
            dt,
        );
        pose.pitch = pose.pitch.clamp(-c.max_pitch, c.max_pitch);

        let bounce_target = self.target_bounce(suspension);
        chase(
            &mut pose.bounce,
            &mut pose.bounce_velocity,
            bounce_target,
            c.bounce_stiffness,
            c.bounce_damping,
            self.mass,
            dt,
        );
    }

    fn side_mean(&self, suspension: &[SuspensionCornerState], side: Side) -> Real {
        let grouped: Vec<_> = self.placement.iter().zip(suspension).collect();
        mean_where(&grouped, |((_, s), c)| (*s == side).then_some(c.compression))
    }

    fn axle_mean(&self, suspension: &[SuspensionCornerState], axle: Axle) -> Real {
        let grouped: Vec<_> = self.placement.iter().zip(suspension).collect();
        mean_where(&grouped, |((a, _), c)| (*a == axle).then_some(c.compression))
    }
}

/// One damped spring step toward `target`; velocity bleeds 5% per call.
fn chase(
    value: &mut Real,
    velocity: &mut Real,
    target: Real,
    stiffness: Real,
    damping: Real,
    inertia: Real,
    dt: Real,
) {
    let effort = (target - *value) * stiffness - *velocity * damping;
    *velocity += effort / inertia * dt;
    *value += *velocity * dt;
    *velocity *= VELOCITY_RETENTION;
}
