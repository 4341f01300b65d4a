// ==============================================================================
// config.rs: VEHICLE CONFIGURATION (STRUCTURED, SERDE, VALIDATED ONCE)
// ------------------------------------------------------------------------------
// One VehicleConfig describes a single vehicle:
// - chassis: mass, centre of mass, spawn pose, unsprung wheel mass
// - per-corner arrays: wheels, suspension, tires (tires optional)
// - drivetrain: engine curve, gear table, final drive, differential, shifting
// - pose: body roll/pitch/bounce spring-damper parameters
// - motion: speed limits, kinematic accel constants, input smoothing
//
// Loading from disk is the caller's business; everything here derives
// Serialize/Deserialize so any serde format works.
//
// validate() is the single gate: every stage constructor relies on it having
// passed, so stages never divide by a zero mass/radius/stiffness per tick.
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{
    ensure_finite, ensure_non_negative, ensure_positive, ensure_unit, ConfigError,
};
use crate::types::{Axle, Real, Side, Vec3};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleConfig {
    pub name: String,
    pub mass: Real,                 // kg
    pub center_of_mass: Vec3,       // vehicle-local (x right, y forward, z up)
    #[serde(default)]
    pub initial_position: Vec3,     // world
    #[serde(default)]
    pub initial_heading: Real,      // degrees
    #[serde(default = "default_wheel_mass")]
    pub wheel_mass: Real,           // kg, unsprung per wheel

    pub wheels: Vec<WheelConfig>,
    pub suspension: Vec<SuspensionConfig>,
    /// Present => tire forces drive the vehicle; absent => kinematic motion.
    #[serde(default)]
    pub tires: Option<Vec<TireConfig>>,

    pub drivetrain: DrivetrainConfig,
    pub pose: PoseConfig,
    pub motion: MotionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WheelConfig {
    pub position: Vec3,   // vehicle-local mount point
    pub radius: Real,     // m
    pub steerable: bool,
    pub driven: bool,
    pub axle: Axle,
    pub side: Side,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuspensionConfig {
    pub natural_frequency: Real, // rad/s
    pub damping_ratio: Real,     // 1.0 = critical
    pub rest_length: Real,       // m
    pub max_compression: Real,   // m
    pub max_droop: Real,         // m
}

impl Default for SuspensionConfig {
    fn default() -> Self {
        Self {
            natural_frequency: 7.0,
            damping_ratio: 1.0,
            rest_length: 0.3,
            max_compression: 0.1,
            max_droop: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TireConfig {
    pub friction: Real,           // peak mu
    pub lateral_stiffness: Real,  // magic-formula stiffness numerator
}

impl Default for TireConfig {
    fn default() -> Self {
        Self { friction: 1.0, lateral_stiffness: 17.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub idle_rpm: Real,
    pub max_rpm: Real,
    /// (rpm, full-load torque N*m), rpm strictly increasing.
    pub torque_curve: Vec<(Real, Real)>,
    pub damping_full_throttle: Real,
    pub damping_clutch_engaged: Real,
    pub damping_clutch_disengaged: Real,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idle_rpm: 800.0,
            max_rpm: 6000.0,
            torque_curve: vec![(0.0, 300.0), (3000.0, 400.0), (5000.0, 350.0), (6000.0, 0.0)],
            damping_full_throttle: 0.15,
            damping_clutch_engaged: 2.0,
            damping_clutch_disengaged: 0.35,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferentialKind {
    Open,
    LimitedSlip,
}

/// Only `front_rear_split` acts on the torque split; `kind` and the biases
/// are carried for callers but do not couple wheel speeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifferentialConfig {
    pub kind: DifferentialKind,
    pub front_rear_split: Real, // fraction of torque to the front axle
    pub front_bias: Real,
    pub rear_bias: Real,
}

impl Default for DifferentialConfig {
    fn default() -> Self {
        Self {
            kind: DifferentialKind::LimitedSlip,
            front_rear_split: 0.5,
            front_bias: 1.5,
            rear_bias: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrivetrainConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    /// Index 0 is neutral; 1.. are forward gears.
    pub gear_ratios: Vec<Real>,
    pub final_drive: Real,
    #[serde(default)]
    pub reverse_ratio: Option<Real>,
    #[serde(default = "default_true")]
    pub auto_shift: bool,
    pub shift_time: Real, // s
    #[serde(default)]
    pub differential: DifferentialConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseConfig {
    pub track_width: Real, // m
    pub wheelbase: Real,   // m
    pub max_roll: Real,    // deg
    pub max_pitch: Real,   // deg

    pub roll_stiffness: Real,
    pub pitch_stiffness: Real,
    pub bounce_stiffness: Real,
    pub roll_damping: Real,
    pub pitch_damping: Real,
    pub bounce_damping: Real,

    pub front_anti_roll: Real,
    pub rear_anti_roll: Real,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSmoothing {
    pub throttle_rise: Real, // units per second
    pub throttle_fall: Real,
    pub brake_rise: Real,
    pub brake_fall: Real,
    pub steering_rise: Real,
    pub steering_fall: Real,
}

impl Default for InputSmoothing {
    fn default() -> Self {
        Self {
            throttle_rise: 6.0,
            throttle_fall: 10.0,
            brake_rise: 6.0,
            brake_fall: 10.0,
            steering_rise: 2.5,
            steering_fall: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    pub max_speed: Real,              // km/h
    #[serde(default = "default_reverse_fraction")]
    pub reverse_speed_fraction: Real, // of max_speed
    pub drag_coefficient: Real,
    pub acceleration: Real,           // km/h per s (kinematic)
    pub deceleration: Real,           // km/h per s, coasting
    pub brake_deceleration: Real,     // km/h per s
    pub turn_speed: Real,             // deg/s at full lock
    pub max_steering_angle: Real,     // deg
    #[serde(default)]
    pub smoothing: InputSmoothing,
}

fn default_wheel_mass() -> Real { 20.0 }
fn default_true() -> bool { true }
fn default_reverse_fraction() -> Real { 0.3 }

impl VehicleConfig {
    pub fn corner_count(&self) -> usize {
        self.wheels.len()
    }

    pub fn uses_tire_forces(&self) -> bool {
        self.tires.is_some()
    }

    /// Reject anything that would later surface as a divide-by-zero or an
    /// out-of-range index inside a tick.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wheels.is_empty() {
            return Err(ConfigError::NoWheels);
        }
        let tires = self.tires.as_ref().map_or(self.wheels.len(), Vec::len);
        if self.suspension.len() != self.wheels.len() || tires != self.wheels.len() {
            return Err(ConfigError::CornerCountMismatch {
                wheels: self.wheels.len(),
                suspension: self.suspension.len(),
                tires,
            });
        }

        ensure_positive("mass", self.mass)?;
        ensure_positive("wheel_mass", self.wheel_mass)?;
        ensure_finite("initial_heading", self.initial_heading)?;
        ensure_vec_finite("center_of_mass", &self.center_of_mass)?;
        ensure_vec_finite("initial_position", &self.initial_position)?;

        for w in &self.wheels {
            ensure_positive("wheel.radius", w.radius)?;
            ensure_vec_finite("wheel.position", &w.position)?;
        }
        for s in &self.suspension {
            s.validate()?;
        }
        if let Some(tires) = &self.tires {
            for t in tires {
                ensure_positive("tire.friction", t.friction)?;
                ensure_positive("tire.lateral_stiffness", t.lateral_stiffness)?;
            }
        }

        self.drivetrain.validate()?;
        self.pose.validate()?;
        self.motion.validate()?;
        Ok(())
    }
}

impl SuspensionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("suspension.natural_frequency", self.natural_frequency)?;
        ensure_non_negative("suspension.damping_ratio", self.damping_ratio)?;
        ensure_non_negative("suspension.rest_length", self.rest_length)?;
        ensure_non_negative("suspension.max_compression", self.max_compression)?;
        ensure_positive("suspension.max_droop", self.max_droop)?;
        Ok(())
    }
}

impl DrivetrainConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let e = &self.engine;
        ensure_positive("engine.idle_rpm", e.idle_rpm)?;
        ensure_positive("engine.max_rpm", e.max_rpm)?;
        if e.idle_rpm >= e.max_rpm {
            return Err(ConfigError::IdleAboveMax { idle: e.idle_rpm, max: e.max_rpm });
        }
        ensure_non_negative("engine.damping_full_throttle", e.damping_full_throttle)?;
        ensure_non_negative("engine.damping_clutch_engaged", e.damping_clutch_engaged)?;
        ensure_non_negative("engine.damping_clutch_disengaged", e.damping_clutch_disengaged)?;
        // curve shape is checked where it is built
        crate::drivetrain::TorqueCurve::new(e.torque_curve.clone())?;

        if self.gear_ratios.len() < 2 {
            return Err(ConfigError::MissingForwardGear);
        }
        if self.gear_ratios[0] != 0.0 {
            return Err(ConfigError::NeutralRatioNotZero(self.gear_ratios[0]));
        }
        for &ratio in &self.gear_ratios[1..] {
            ensure_positive("gear_ratio", ratio)?;
        }
        ensure_positive("final_drive", self.final_drive)?;
        if let Some(r) = self.reverse_ratio {
            ensure_finite("reverse_ratio", r)?;
            if r >= 0.0 {
                return Err(ConfigError::ReverseRatioNotNegative(r));
            }
        }
        ensure_non_negative("shift_time", self.shift_time)?;
        ensure_unit("differential.front_rear_split", self.differential.front_rear_split)?;
        Ok(())
    }
}

impl PoseConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("pose.track_width", self.track_width)?;
        ensure_positive("pose.wheelbase", self.wheelbase)?;
        ensure_non_negative("pose.max_roll", self.max_roll)?;
        ensure_non_negative("pose.max_pitch", self.max_pitch)?;
        for (field, v) in [
            ("pose.roll_stiffness", self.roll_stiffness),
            ("pose.pitch_stiffness", self.pitch_stiffness),
            ("pose.bounce_stiffness", self.bounce_stiffness),
            ("pose.roll_damping", self.roll_damping),
            ("pose.pitch_damping", self.pitch_damping),
            ("pose.bounce_damping", self.bounce_damping),
            ("pose.front_anti_roll", self.front_anti_roll),
            ("pose.rear_anti_roll", self.rear_anti_roll),
        ] {
            ensure_non_negative(field, v)?;
        }
        Ok(())
    }
}

impl MotionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("motion.max_speed", self.max_speed)?;
        ensure_unit("motion.reverse_speed_fraction", self.reverse_speed_fraction)?;
        for (field, v) in [
            ("motion.drag_coefficient", self.drag_coefficient),
            ("motion.acceleration", self.acceleration),
            ("motion.deceleration", self.deceleration),
            ("motion.brake_deceleration", self.brake_deceleration),
            ("motion.turn_speed", self.turn_speed),
            ("motion.max_steering_angle", self.max_steering_angle),
            ("smoothing.throttle_rise", self.smoothing.throttle_rise),
            ("smoothing.throttle_fall", self.smoothing.throttle_fall),
            ("smoothing.brake_rise", self.smoothing.brake_rise),
            ("smoothing.brake_fall", self.smoothing.brake_fall),
            ("smoothing.steering_rise", self.smoothing.steering_rise),
            ("smoothing.steering_fall", self.smoothing.steering_fall),
        ] {
            ensure_non_negative(field, v)?;
        }
        Ok(())
    }
}

fn ensure_vec_finite(field: &'static str, v: &Vec3) -> Result<(), ConfigError> {
    if v.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { field })
    }
}

// ==============================================================================
// Presets
// ==============================================================================
pub mod presets {
    use super::*;

    fn corner(x: Real, y: Real, steerable: bool, driven: bool, axle: Axle, side: Side) -> WheelConfig {
        WheelConfig {
            position: Vec3::new(x, y, -0.35),
            radius: 0.35,
            steerable,
            driven,
            axle,
            side,
        }
    }

    /// Four-wheel-drive sports car: FL, FR, RL, RR.
    pub fn sports_car() -> VehicleConfig {
        VehicleConfig {
            name: "Sports Car".to_string(),
            mass: 1500.0,
            center_of_mass: Vec3::new(0.0, 0.0, 0.3),
            initial_position: Vec3::new(0.0, 0.0, 0.6),
            initial_heading: 0.0,
            wheel_mass: 20.0,

            wheels: vec![
                corner(-0.9,  1.3, true,  true, Axle::Front, Side::Left),
                corner( 0.9,  1.3, true,  true, Axle::Front, Side::Right),
                corner(-0.9, -1.3, false, true, Axle::Rear,  Side::Left),
                corner( 0.9, -1.3, false, true, Axle::Rear,  Side::Right),
            ],
            suspension: vec![SuspensionConfig::default(); 4],
            tires: Some(vec![
                TireConfig { friction: 1.0, lateral_stiffness: 17.0 },
                TireConfig { friction: 1.0, lateral_stiffness: 17.0 },
                TireConfig { friction: 1.1, lateral_stiffness: 17.0 },
                TireConfig { friction: 1.1, lateral_stiffness: 17.0 },
            ]),

            drivetrain: DrivetrainConfig {
                engine: EngineConfig {
                    idle_rpm: 800.0,
                    max_rpm: 7000.0,
                    torque_curve: vec![
                        (0.0, 300.0),
                        (1000.0, 350.0),
                        (3000.0, 450.0),
                        (5000.0, 420.0),
                        (6500.0, 380.0),
                        (7000.0, 0.0),
                    ],
                    damping_full_throttle: 0.15,
                    damping_clutch_engaged: 2.0,
                    damping_clutch_disengaged: 0.35,
                },
                gear_ratios: vec![0.0, 3.5, 2.5, 1.8, 1.4, 1.0, 0.8],
                final_drive: 3.5,
                reverse_ratio: Some(-3.5),
                auto_shift: true,
                shift_time: 0.3,
                differential: DifferentialConfig::default(),
            },

            pose: PoseConfig {
                track_width: 1.8,
                wheelbase: 2.6,
                max_roll: 6.0,
                max_pitch: 4.0,
                roll_stiffness: 12_000.0,
                pitch_stiffness: 12_000.0,
                bounce_stiffness: 18_000.0,
                roll_damping: 600.0,
                pitch_damping: 600.0,
                bounce_damping: 900.0,
                front_anti_roll: 1500.0,
                rear_anti_roll: 1200.0,
            },

            motion: MotionConfig {
                max_speed: 200.0,
                reverse_speed_fraction: 0.3,
                drag_coefficient: 0.3,
                acceleration: 80.0,
                deceleration: 40.0,
                brake_deceleration: 120.0,
                turn_speed: 200.0,
                max_steering_angle: 40.0,
                smoothing: InputSmoothing {
                    throttle_rise: 8.0,
                    throttle_fall: 12.0,
                    brake_rise: 8.0,
                    brake_fall: 12.0,
                    steering_rise: 3.0,
                    steering_fall: 6.0,
                },
            },
        }
    }

    /// Rear-drive coupe: front wheels steer only, all torque to the rear.
    pub fn rwd_coupe() -> VehicleConfig {
        let mut cfg = sports_car();
        cfg.name = "RWD Coupe".to_string();
        cfg.mass = 1250.0;
        for w in cfg.wheels.iter_mut() {
            w.driven = w.axle.is_rear();
        }
        cfg.drivetrain.differential.front_rear_split = 0.0;
        cfg.drivetrain.differential.kind = DifferentialKind::Open;
        cfg
    }

    /// Same chassis without tires: speed comes from the kinematic model.
    pub fn arcade_car() -> VehicleConfig {
        let mut cfg = sports_car();
        cfg.name = "Arcade Car".to_string();
        cfg.tires = None;
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::presets::*;
    use super::*;

    #[test]
    fn presets_validate() {
        assert_eq!(sports_car().validate(), Ok(()));
        assert_eq!(rwd_coupe().validate(), Ok(()));
        assert_eq!(arcade_car().validate(), Ok(()));
    }

    #[test]
    fn rejects_mismatched_corner_arrays() {
        let mut cfg = sports_car();
        cfg.suspension.pop();
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::CornerCountMismatch { wheels: 4, suspension: 3, tires: 4 })
        );

        let mut cfg = sports_car();
        cfg.tires.as_mut().unwrap().push(TireConfig::default());
        assert!(matches!(cfg.validate(), Err(ConfigError::CornerCountMismatch { tires: 5, .. })));
    }

    #[test]
    fn rejects_non_positive_physical_constants() {
        let mut cfg = sports_car();
        cfg.mass = 0.0;
        assert_eq!(cfg.validate(), Err(ConfigError::NonPositive { field: "mass", value: 0.0 }));

        let mut cfg = sports_car();
        cfg.wheels[2].radius = -0.3;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NonPositive { field: "wheel.radius", .. })
        ));

        let mut cfg = sports_car();
        cfg.mass = Real::NAN;
        assert_eq!(cfg.validate(), Err(ConfigError::NonFinite { field: "mass" }));
    }

    #[test]
    fn rejects_malformed_torque_curves() {
        let mut cfg = sports_car();
        cfg.drivetrain.engine.torque_curve.clear();
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyTorqueCurve));

        let mut cfg = sports_car();
        cfg.drivetrain.engine.torque_curve = vec![(0.0, 300.0), (3000.0, 450.0), (2000.0, 100.0)];
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NonMonotonicTorqueCurve { index: 2, .. })
        ));
    }

    #[test]
    fn rejects_gear_table_without_forward_gear() {
        let mut cfg = sports_car();
        cfg.drivetrain.gear_ratios = vec![0.0];
        assert_eq!(cfg.validate(), Err(ConfigError::MissingForwardGear));

        let mut cfg = sports_car();
        cfg.drivetrain.gear_ratios[0] = 1.0;
        assert_eq!(cfg.validate(), Err(ConfigError::NeutralRatioNotZero(1.0)));

        let mut cfg = sports_car();
        cfg.drivetrain.reverse_ratio = Some(3.5);
        assert_eq!(cfg.validate(), Err(ConfigError::ReverseRatioNotNegative(3.5)));
    }

    #[test]
    fn rejects_split_outside_unit_range() {
        let mut cfg = sports_car();
        cfg.drivetrain.differential.front_rear_split = 1.5;
        assert!(matches!(cfg.validate(), Err(ConfigError::OutOfUnitRange { .. })));
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = sports_car();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: VehicleConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn sparse_json_fills_defaults() {
        let json = r#"{
            "name": "minimal",
            "mass": 900.0,
            "center_of_mass": [0.0, 0.0, 0.2],
            "wheels": [
                {"position": [-0.7, 1.0, -0.3], "radius": 0.3, "steerable": true, "driven": false, "axle": "front", "side": "left"},
                {"position": [0.7, 1.0, -0.3], "radius": 0.3, "steerable": true, "driven": false, "axle": "front", "side": "right"},
                {"position": [-0.7, -1.0, -0.3], "radius": 0.3, "steerable": false, "driven": true, "axle": "rear", "side": "left"},
                {"position": [0.7, -1.0, -0.3], "radius": 0.3, "steerable": false, "driven": true, "axle": "rear", "side": "right"}
            ],
            "suspension": [{}, {}, {}, {}],
            "drivetrain": {"gear_ratios": [0.0, 3.0, 2.0], "final_drive": 4.0, "shift_time": 0.2},
            "pose": {
                "track_width": 1.4, "wheelbase": 2.0, "max_roll": 5.0, "max_pitch": 3.0,
                "roll_stiffness": 8000.0, "pitch_stiffness": 8000.0, "bounce_stiffness": 12000.0,
                "roll_damping": 400.0, "pitch_damping": 400.0, "bounce_damping": 600.0,
                "front_anti_roll": 800.0, "rear_anti_roll": 800.0
            },
            "motion": {
                "max_speed": 120.0, "drag_coefficient": 0.3, "acceleration": 40.0,
                "deceleration": 20.0, "brake_deceleration": 60.0, "turn_speed": 120.0,
                "max_steering_angle": 35.0
            }
        }"#;
        let cfg: VehicleConfig = serde_json::from_str(json).unwrap();
        assert!(cfg.tires.is_none());
        assert!(cfg.drivetrain.auto_shift);
        assert_eq!(cfg.suspension[0], SuspensionConfig::default());
        assert_eq!(cfg.validate(), Ok(()));
    }
}
