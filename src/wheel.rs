// ==============================================================================
// wheel.rs: WHEEL KINEMATICS AND WORLD PLACEMENT
// ==============================================================================
// Wheels do not carry their own spin dynamics: rotation is derived from the
// vehicle speed each tick. Free-rolling wheels turn at 90% of the rate a
// driven wheel would, which keeps the long-slip signal alive on them.
// ==============================================================================

use crate::config::WheelConfig;
use crate::state::{KinematicState, WheelState};
use crate::types::{Real, Vec3, kmh_to_ms, local_to_world, wrap_degrees};

const FREE_ROLL_FACTOR: Real = 0.9;

#[derive(Debug, Clone)]
struct WheelGeometry {
    local: Vec3,
    radius: Real,
    steerable: bool,
    driven: bool,
}

#[derive(Debug, Clone)]
pub struct WheelStage {
    wheels: Vec<WheelGeometry>,
}

impl WheelStage {
    pub fn new(cfg: &[WheelConfig]) -> Self {
        let wheels = cfg
            .iter()
            .map(|w| WheelGeometry {
                local: w.position,
                radius: w.radius,
                steerable: w.steerable,
                driven: w.driven,
            })
            .collect();
        Self { wheels }
    }

    pub fn initial_states(&self, position: &Vec3, heading: Real) -> Vec<WheelState> {
        self.wheels
            .iter()
            .map(|g| WheelState {
                local_position: g.local,
                world_position: position + local_to_world(&g.local, heading),
                rotation_angle: 0.0,
                rotation_speed: 0.0,
                steering_angle: 0.0,
                linear_velocity: Vec3::zeros(),
                angular_velocity: 0.0,
                drive_torque: 0.0,
            })
            .collect()
    }

    pub fn step(&self, dt: Real, kin: &KinematicState, torques: &[Real], out: &mut [WheelState]) {
        let speed_ms = kmh_to_ms(kin.speed);

        for ((g, w), &torque) in self.wheels.iter().zip(out.iter_mut()).zip(torques) {
            let mut spin = (speed_ms / g.radius).to_degrees();
            if !g.driven {
                spin *= FREE_ROLL_FACTOR;
            }

            w.rotation_speed = spin;
            w.rotation_angle = wrap_degrees(w.rotation_angle + spin * dt);
            w.angular_velocity = spin.to_radians();
            w.steering_angle = if g.steerable { kin.steering_angle } else { 0.0 };

            w.local_position = g.local;
            w.world_position = kin.position + local_to_world(&g.local, kin.heading);
            w.linear_velocity = kin.velocity;
            w.drive_torque = torque;
        }
    }
}
