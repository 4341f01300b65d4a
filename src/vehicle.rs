// ==============================================================================
// vehicle.rs: ONE VEHICLE, OWNED STATE + FIXED-ORDER STAGE PIPELINE
// ==============================================================================
// tick(dt), force-integrated:
//   smooth inputs -> heading -> drivetrain -> wheels -> suspension -> tires
//   -> pose -> integrate tire forces into speed / position
//
// tick(dt), kinematic:
//   smooth inputs -> heading -> speed / position -> drivetrain -> wheels
//   -> suspension -> pose            (tire states stay zero)
//
// Pose reads the acceleration left by the previous tick's force integration,
// so in force-integrated mode roll and pitch lag the tires by one tick.
//
// Stages are plain fields resolved at construction; every per-corner Vec is
// allocated once and never resized.
// ==============================================================================

use log::{info, trace, warn};

use crate::config::VehicleConfig;
use crate::drivetrain::{DriveDemand, Drivetrain};
use crate::error::{ConfigError, RestoreError};
use crate::motion::{MotionMode, MotionModel};
use crate::pose::PoseStage;
use crate::state::{
    ControlInput, DrivetrainState, KinematicState, PoseState, ShiftPhase, SuspensionCornerState,
    TireCornerState, VehicleSnapshot, WheelState,
};
use crate::suspension::SuspensionStage;
use crate::terrain::{FlatTerrain, TerrainQuery};
use crate::tire::TireStage;
use crate::types::{Real, Vec3, wrap_degrees};
use crate::wheel::WheelStage;

#[derive(Debug, Clone)]
pub struct Vehicle {
    config: VehicleConfig,
    mode: MotionMode,

    // -------------------------
    // stages
    // -------------------------
    drivetrain: Drivetrain,
    wheel_stage: WheelStage,
    suspension_stage: SuspensionStage,
    tire_stage: Option<TireStage>,
    pose_stage: PoseStage,
    motion: MotionModel,

    // -------------------------
    // state
    // -------------------------
    input: ControlInput,
    kinematics: KinematicState,
    transmission: DrivetrainState,
    wheels: Vec<WheelState>,
    suspension: Vec<SuspensionCornerState>,
    tires: Vec<TireCornerState>,
    pose: PoseState,
}

impl Vehicle {
    pub fn new(config: VehicleConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let drivetrain = Drivetrain::new(&config.drivetrain, &config.wheels)?;
        let wheel_stage = WheelStage::new(&config.wheels);
        let suspension_stage = SuspensionStage::new(
            config.mass,
            &config.center_of_mass,
            &config.wheels,
            &config.suspension,
        );
        let tire_stage = config.tires.as_ref().map(|tires| {
            TireStage::new(
                tires,
                &config.wheels,
                &suspension_stage.sprung_masses(),
                config.wheel_mass,
            )
        });
        let mode = if config.uses_tire_forces() {
            MotionMode::ForceIntegrated
        } else {
            MotionMode::Kinematic
        };
        let pose_stage = PoseStage::new(&config.pose, config.mass, &config.wheels);
        let motion = MotionModel::new(&config.motion, config.mass);

        let heading = wrap_degrees(config.initial_heading);
        let kinematics =
            KinematicState::at_rest(config.initial_position, heading, drivetrain.idle_rpm());
        let transmission = drivetrain.initial_state();
        let wheels = wheel_stage.initial_states(&kinematics.position, heading);
        let suspension = suspension_stage.initial_states(&wheels, &FlatTerrain::default());
        let tires = match &tire_stage {
            Some(stage) => stage.initial_states(),
            None => vec![TireCornerState::default(); wheels.len()],
        };

        info!(
            "vehicle '{}' ready: {} corners, {:?}, {} kg",
            config.name,
            wheels.len(),
            mode,
            config.mass
        );

        Ok(Self {
            config,
            mode,
            drivetrain,
            wheel_stage,
            suspension_stage,
            tire_stage,
            pose_stage,
            motion,
            input: ControlInput::default(),
            kinematics,
            transmission,
            wheels,
            suspension,
            tires,
            pose: PoseState::default(),
        })
    }

    /// Rebuild a vehicle from `config` and resume it from `snapshot`.
    pub fn restore(config: VehicleConfig, snapshot: VehicleSnapshot) -> Result<Self, RestoreError> {
        let mut vehicle = Self::new(config)?;

        let expected = vehicle.wheels.len();
        if snapshot.corner_count() != Some(expected) {
            return Err(RestoreError::CornerCount { expected, found: snapshot.wheels.len() });
        }
        let gear = snapshot.drivetrain.current_gear;
        let (lowest, highest) = (vehicle.drivetrain.lowest_gear(), vehicle.drivetrain.highest_gear());
        if gear < lowest || gear > highest {
            return Err(RestoreError::GearOutOfRange { gear, lowest, highest });
        }
        let shift = &snapshot.drivetrain;
        if !shift.shift_timer.is_finite() || shift.shift_timer < 0.0 {
            return Err(RestoreError::InvalidShiftTimer(shift.shift_timer));
        }
        if shift.phase == ShiftPhase::Shifting && shift.clutch_position != 1.0 {
            return Err(RestoreError::ClutchWhileShifting(shift.clutch_position));
        }

        let VehicleSnapshot { input, kinematics, drivetrain, wheels, suspension, tires, pose } = snapshot;
        vehicle.input = input;
        vehicle.kinematics = kinematics;
        vehicle.transmission = drivetrain;
        vehicle.wheels = wheels;
        vehicle.suspension = suspension;
        vehicle.tires = tires;
        vehicle.pose = pose;
        Ok(vehicle)
    }

    pub fn snapshot(&self) -> VehicleSnapshot {
        VehicleSnapshot {
            input: self.input,
            kinematics: self.kinematics.clone(),
            drivetrain: self.transmission.clone(),
            wheels: self.wheels.clone(),
            suspension: self.suspension.clone(),
            tires: self.tires.clone(),
            pose: self.pose.clone(),
        }
    }

    // ====================================================================
    // Tick
    // ====================================================================

    /// Advance on flat default ground.
    pub fn tick(&mut self, dt: Real) {
        self.tick_on(dt, &FlatTerrain::default());
    }

    pub fn tick_on(&mut self, dt: Real, terrain: &dyn TerrainQuery) {
        if !dt.is_finite() || dt <= 0.0 {
            warn!("'{}': ignoring tick with dt = {dt}", self.config.name);
            return;
        }

        let input = self.input.clamped();
        let kin = &mut self.kinematics;

        self.motion.smooth_inputs(dt, &input, kin);
        self.motion.advance_heading(dt, kin);
        if self.mode == MotionMode::Kinematic {
            self.motion.integrate_kinematic(dt, input.handbrake, kin);
        }

        let demand = DriveDemand {
            throttle: kin.throttle,
            clutch_pedal: input.clutch,
            gear_up: input.gear_up,
            gear_down: input.gear_down,
        };
        self.drivetrain.step(dt, &demand, kin.speed, &mut self.transmission);
        kin.engine_rpm = self.transmission.engine_rpm;

        self.wheel_stage.step(dt, kin, &self.transmission.wheel_torques, &mut self.wheels);
        self.suspension_stage.step(dt, kin, &self.wheels, terrain, &mut self.suspension);
        if let Some(tires) = &self.tire_stage {
            tires.step(kin, &self.wheels, &self.suspension, terrain, &mut self.tires);
        }
        self.pose_stage.step(dt, kin, &self.suspension, &mut self.pose);

        if self.mode == MotionMode::ForceIntegrated {
            self.motion.integrate_forces(dt, input.handbrake, &self.tires, kin);
        }

        // requests are one-shot
        self.input.gear_up = false;
        self.input.gear_down = false;

        trace!(
            "'{}': speed {:.2} km/h, heading {:.1}, gear {}, {:.0} rpm",
            self.config.name,
            kin.speed,
            kin.heading,
            self.transmission.current_gear,
            kin.engine_rpm
        );
    }

    // ====================================================================
    // Input
    // ====================================================================

    pub fn set_throttle(&mut self, throttle: Real) {
        self.input.throttle = throttle;
    }

    pub fn set_brake(&mut self, brake: Real) {
        self.input.brake = brake;
    }

    /// -1 full left .. 1 full right.
    pub fn set_steering(&mut self, steering: Real) {
        self.input.steering = steering;
    }

    pub fn set_handbrake(&mut self, engaged: bool) {
        self.input.handbrake = engaged;
    }

    pub fn set_clutch(&mut self, clutch: Real) {
        self.input.clutch = clutch;
    }

    pub fn request_gear_up(&mut self) {
        self.input.gear_up = true;
    }

    pub fn request_gear_down(&mut self) {
        self.input.gear_down = true;
    }

    /// Replace the analog axes; pending gear requests stay latched.
    pub fn set_input(&mut self, input: ControlInput) {
        let gear_up = self.input.gear_up || input.gear_up;
        let gear_down = self.input.gear_down || input.gear_down;
        self.input = ControlInput { gear_up, gear_down, ..input };
    }

    /// External heave disturbance (bumps, drops) seen by the suspension.
    pub fn set_vertical_acceleration(&mut self, a_z: Real) {
        self.kinematics.acceleration.z = a_z;
    }

    // ====================================================================
    // Accessors
    // ====================================================================

    pub fn config(&self) -> &VehicleConfig {
        &self.config
    }

    pub fn mode(&self) -> MotionMode {
        self.mode
    }

    pub fn corner_count(&self) -> usize {
        self.wheels.len()
    }

    pub fn input(&self) -> &ControlInput {
        &self.input
    }

    pub fn kinematics(&self) -> &KinematicState {
        &self.kinematics
    }

    pub fn drivetrain(&self) -> &DrivetrainState {
        &self.transmission
    }

    pub fn wheels(&self) -> &[WheelState] {
        &self.wheels
    }

    pub fn suspension(&self) -> &[SuspensionCornerState] {
        &self.suspension
    }

    pub fn tires(&self) -> &[TireCornerState] {
        &self.tires
    }

    pub fn pose(&self) -> &PoseState {
        &self.pose
    }

    pub fn position(&self) -> Vec3 {
        self.kinematics.position
    }

    pub fn heading(&self) -> Real {
        self.kinematics.heading
    }

    pub fn speed(&self) -> Real {
        self.kinematics.speed
    }

    pub fn engine_rpm(&self) -> Real {
        self.transmission.engine_rpm
    }

    pub fn gear(&self) -> i32 {
        self.transmission.current_gear
    }

    pub fn gear_range(&self) -> (i32, i32) {
        (self.drivetrain.lowest_gear(), self.drivetrain.highest_gear())
    }
}
