//! Per-frame vehicle dynamics: driver input in, pose and kinematics out.
//!
//! A [`Vehicle`] runs a fixed pipeline each tick (drivetrain, wheels,
//! suspension, tires, body pose, motion integration) over state it owns
//! outright. A [`World`] holds many of them over one shared terrain.

pub mod config;
pub mod drivetrain;
pub mod error;
pub mod motion;
pub mod pose;
pub mod state;
pub mod suspension;
pub mod terrain;
pub mod tire;
pub mod types;
pub mod vehicle;
pub mod wheel;
pub mod world;

pub use config::{VehicleConfig, presets};
pub use error::{ConfigError, RestoreError};
pub use motion::MotionMode;
pub use state::{ControlInput, VehicleSnapshot};
pub use terrain::{FlatTerrain, SurfaceKind, TerrainQuery, TerrainSample};
pub use types::{Real, Vec3};
pub use vehicle::Vehicle;
pub use world::{VehicleId, World, WorldSnapshot};
