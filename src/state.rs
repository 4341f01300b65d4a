// ==============================================================================
// state.rs: DATA-ONLY STATE AGGREGATES
// ------------------------------------------------------------------------------
// Everything a vehicle carries between ticks lives in one of these structs.
// Stages own no hidden state: serialize a VehicleSnapshot, restore it, and the
// next tick produces bit-identical output.
//
// Frames:
// - world:   x east, y north (forward at heading 0), z up
// - vehicle: x right, y forward, z up
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::types::{Real, Vec3};

/// Raw driver input for the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlInput {
    pub throttle: Real, // [0, 1]
    pub brake: Real,    // [0, 1]
    pub steering: Real, // [-1, 1], positive = right
    pub handbrake: bool,
    pub clutch: Real,   // [0, 1], manual pedal
    /// Latched; cleared after the tick that consumes it.
    pub gear_up: bool,
    pub gear_down: bool,
}

impl ControlInput {
    /// Same input with every analog axis forced into its range.
    /// NaN axes collapse to zero.
    pub fn clamped(self) -> Self {
        fn unit(v: Real) -> Real {
            if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
        }
        Self {
            throttle: unit(self.throttle),
            brake: unit(self.brake),
            steering: if self.steering.is_nan() { 0.0 } else { self.steering.clamp(-1.0, 1.0) },
            clutch: unit(self.clutch),
            ..self
        }
    }
}

/// Translational state of the body plus the smoothed driver axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinematicState {
    pub position: Vec3,      // world, m
    pub heading: Real,       // degrees, [0, 360)
    pub speed: Real,         // km/h, signed
    pub velocity: Vec3,      // vehicle frame, m/s
    pub acceleration: Vec3,  // vehicle frame, m/s^2
    pub steering_angle: Real, // degrees
    pub engine_rpm: Real,

    pub throttle: Real,
    pub brake: Real,
    pub steering: Real,
}

impl KinematicState {
    pub fn at_rest(position: Vec3, heading: Real, idle_rpm: Real) -> Self {
        Self {
            position,
            heading,
            speed: 0.0,
            velocity: Vec3::zeros(),
            acceleration: Vec3::zeros(),
            steering_angle: 0.0,
            engine_rpm: idle_rpm,
            throttle: 0.0,
            brake: 0.0,
            steering: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftPhase {
    Engaged,
    Shifting,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrivetrainState {
    pub engine_rpm: Real,
    /// 0 neutral, -1 reverse, 1.. forward gear index.
    pub current_gear: i32,
    pub clutch_position: Real, // 0 engaged .. 1 disengaged
    pub wheel_torques: Vec<Real>,
    pub phase: ShiftPhase,
    pub shift_timer: Real,     // s
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WheelState {
    pub local_position: Vec3,
    pub world_position: Vec3,
    pub rotation_angle: Real,   // deg, [0, 360)
    pub rotation_speed: Real,   // deg/s
    pub steering_angle: Real,   // deg
    pub linear_velocity: Vec3,
    pub angular_velocity: Real, // rad/s
    pub drive_torque: Real,     // N*m
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspensionCornerState {
    pub compression: Real,          // m, positive = compressed
    pub compression_velocity: Real, // m/s
    pub spring_force: Real,         // N
    pub damper_force: Real,         // N
    pub total_force: Real,          // N
    pub wheel_offset: Real,         // m, vertical
    pub in_air: bool,
    pub contact_point: Vec3,
    pub contact_normal: Vec3,
}

impl Default for SuspensionCornerState {
    fn default() -> Self {
        Self {
            compression: 0.0,
            compression_velocity: 0.0,
            spring_force: 0.0,
            damper_force: 0.0,
            total_force: 0.0,
            wheel_offset: 0.0,
            in_air: false,
            contact_point: Vec3::zeros(),
            contact_normal: Vec3::z(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TireCornerState {
    pub long_slip: Real,
    pub lat_slip: Real,        // rad
    pub long_force: Real,      // N
    pub lat_force: Real,       // N
    pub aligning_moment: Real, // N*m
    pub load: Real,            // N
    pub rest_load: Real,       // N
    pub normalized_load: Real,
    pub wheel_torque: Real,    // N*m, reaction on the wheel
}

impl TireCornerState {
    /// Magnitude of the combined in-plane force.
    pub fn combined_force(&self) -> Real {
        self.long_force.hypot(self.lat_force)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseState {
    pub roll: Real,           // deg, positive = left side down
    pub pitch: Real,          // deg, positive = nose down
    pub roll_velocity: Real,  // deg/s
    pub pitch_velocity: Real, // deg/s
    pub bounce: Real,         // m
    pub bounce_velocity: Real,
}

/// Complete resumable state of one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub input: ControlInput,
    pub kinematics: KinematicState,
    pub drivetrain: DrivetrainState,
    pub wheels: Vec<WheelState>,
    pub suspension: Vec<SuspensionCornerState>,
    pub tires: Vec<TireCornerState>,
    pub pose: PoseState,
}

impl VehicleSnapshot {
    /// Corner count when every per-corner array agrees, `None` otherwise.
    pub fn corner_count(&self) -> Option<usize> {
        let n = self.wheels.len();
        (self.suspension.len() == n
            && self.tires.len() == n
            && self.drivetrain.wheel_torques.len() == n)
            .then_some(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_input_stays_in_range() {
        let raw = ControlInput {
            throttle: 1.7,
            brake: -0.2,
            steering: -3.0,
            clutch: Real::NAN,
            gear_up: true,
            ..Default::default()
        };
        let c = raw.clamped();
        assert_eq!(c.throttle, 1.0);
        assert_eq!(c.brake, 0.0);
        assert_eq!(c.steering, -1.0);
        assert_eq!(c.clutch, 0.0);
        assert!(c.gear_up);
    }

    #[test]
    fn combined_force_is_euclidean() {
        let t = TireCornerState { long_force: 3.0, lat_force: -4.0, ..Default::default() };
        assert_eq!(t.combined_force(), 5.0);
    }

    #[test]
    fn corner_count_detects_ragged_snapshots() {
        let wheel = WheelState {
            local_position: Vec3::zeros(),
            world_position: Vec3::zeros(),
            rotation_angle: 0.0,
            rotation_speed: 0.0,
            steering_angle: 0.0,
            linear_velocity: Vec3::zeros(),
            angular_velocity: 0.0,
            drive_torque: 0.0,
        };
        let mut snap = VehicleSnapshot {
            input: ControlInput::default(),
            kinematics: KinematicState::at_rest(Vec3::zeros(), 0.0, 800.0),
            drivetrain: DrivetrainState {
                engine_rpm: 800.0,
                current_gear: 1,
                clutch_position: 0.0,
                wheel_torques: vec![0.0; 2],
                phase: ShiftPhase::Engaged,
                shift_timer: 0.0,
            },
            wheels: vec![wheel; 2],
            suspension: vec![SuspensionCornerState::default(); 2],
            tires: vec![TireCornerState::default(); 2],
            pose: PoseState::default(),
        };
        assert_eq!(snap.corner_count(), Some(2));
        snap.tires.pop();
        assert_eq!(snap.corner_count(), None);
    }
}
