// ==============================================================================
// world.rs: MANY INDEPENDENT VEHICLES ON ONE SHARED TERRAIN
// ==============================================================================
// Vehicles never interact; the world only fans a shared dt and terrain out to
// each of them and gathers a serializable telemetry frame afterwards.
// ==============================================================================

use std::collections::HashMap;
use std::fmt;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::VehicleConfig;
use crate::error::ConfigError;
use crate::terrain::{FlatTerrain, TerrainQuery};
use crate::types::{Real, Vec3};
use crate::vehicle::Vehicle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(Uuid);

impl VehicleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VehicleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleTelemetry {
    pub id: VehicleId,
    pub name: String,
    pub position: Vec3,
    pub heading: Real,
    pub speed: Real,
    pub engine_rpm: Real,
    pub gear: i32,
    pub roll: Real,
    pub pitch: Real,
    pub wheels_in_air: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub vehicles: Vec<VehicleTelemetry>,
}

impl WorldSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

pub struct World {
    tick: u64,
    vehicles: HashMap<VehicleId, Vehicle>,
    terrain: Box<dyn TerrainQuery + Send + Sync>,
}

impl World {
    pub fn new() -> Self {
        Self::with_terrain(FlatTerrain::default())
    }

    pub fn with_terrain(terrain: impl TerrainQuery + Send + Sync + 'static) -> Self {
        Self {
            tick: 0,
            vehicles: HashMap::new(),
            terrain: Box::new(terrain),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn spawn(&mut self, config: VehicleConfig) -> Result<VehicleId, ConfigError> {
        let vehicle = Vehicle::new(config)?;
        Ok(self.insert(vehicle))
    }

    pub fn insert(&mut self, vehicle: Vehicle) -> VehicleId {
        let id = VehicleId::new();
        info!("spawned '{}' as {id}", vehicle.config().name);
        self.vehicles.insert(id, vehicle);
        id
    }

    pub fn remove(&mut self, id: VehicleId) -> Option<Vehicle> {
        let removed = self.vehicles.remove(&id);
        if removed.is_some() {
            info!("removed {id}");
        }
        removed
    }

    pub fn get(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(&id)
    }

    pub fn get_mut(&mut self, id: VehicleId) -> Option<&mut Vehicle> {
        self.vehicles.get_mut(&id)
    }

    pub fn ids(&self) -> Vec<VehicleId> {
        let mut ids: Vec<_> = self.vehicles.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Advance every vehicle by `dt` on the shared terrain.
    pub fn update(&mut self, dt: Real) {
        let terrain: &dyn TerrainQuery = &*self.terrain;
        for vehicle in self.vehicles.values_mut() {
            vehicle.tick_on(dt, terrain);
        }
        self.tick += 1;
        debug!("world tick {} ({} vehicles)", self.tick, self.vehicles.len());
    }

    /// Telemetry for every vehicle, ordered by id.
    pub fn snapshot(&self) -> WorldSnapshot {
        let mut vehicles: Vec<VehicleTelemetry> = self
            .vehicles
            .iter()
            .map(|(id, v)| {
                let kin = v.kinematics();
                VehicleTelemetry {
                    id: *id,
                    name: v.config().name.clone(),
                    position: kin.position,
                    heading: kin.heading,
                    speed: kin.speed,
                    engine_rpm: v.engine_rpm(),
                    gear: v.gear(),
                    roll: v.pose().roll,
                    pitch: v.pose().pitch,
                    wheels_in_air: v.suspension().iter().filter(|s| s.in_air).count(),
                }
            })
            .collect();
        vehicles.sort_by_key(|t| t.id);
        WorldSnapshot { tick: self.tick, vehicles }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
