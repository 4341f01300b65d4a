//! Ground queries consumed by the suspension and tire stages.
//!
//! The pipeline never owns terrain data; it only asks for height, normal and
//! surface friction at a world (x, y). Heightmaps, procedural terrain or a
//! physics engine can sit behind [`TerrainQuery`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Real, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceKind {
    #[default]
    Default,
    Asphalt,
    Dirt,
    Gravel,
    Grass,
    Ice,
}

impl SurfaceKind {
    /// Friction multiplier applied on top of the tire's own coefficient.
    pub fn friction(self) -> Real {
        match self {
            SurfaceKind::Default | SurfaceKind::Asphalt => 1.0,
            SurfaceKind::Dirt => 0.7,
            SurfaceKind::Gravel => 0.6,
            SurfaceKind::Grass => 0.55,
            SurfaceKind::Ice => 0.1,
        }
    }
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SurfaceKind::Default => "default",
            SurfaceKind::Asphalt => "asphalt",
            SurfaceKind::Dirt => "dirt",
            SurfaceKind::Gravel => "gravel",
            SurfaceKind::Grass => "grass",
            SurfaceKind::Ice => "ice",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainSample {
    pub height: Real,
    pub normal: Vec3,
    pub friction: Real,
    pub surface: SurfaceKind,
}

/// Axis-aligned world extent: (min_x, min_y, max_x, max_y).
pub type WorldBounds = (Real, Real, Real, Real);

pub trait TerrainQuery {
    fn height_at(&self, x: Real, y: Real) -> Real;

    /// Unit normal pointing away from the ground.
    fn normal_at(&self, x: Real, y: Real) -> Vec3;

    fn surface_at(&self, _x: Real, _y: Real) -> SurfaceKind {
        SurfaceKind::Default
    }

    fn sample(&self, x: Real, y: Real) -> TerrainSample {
        let surface = self.surface_at(x, y);
        TerrainSample {
            height: self.height_at(x, y),
            normal: self.normal_at(x, y),
            friction: surface.friction(),
            surface,
        }
    }

    fn world_bounds(&self) -> WorldBounds {
        (-10_000.0, -10_000.0, 10_000.0, 10_000.0)
    }
}

// ============================================
// Flat ground
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FlatTerrain {
    pub height: Real,
    pub surface: SurfaceKind,
}

impl FlatTerrain {
    pub fn with_surface(surface: SurfaceKind) -> Self {
        Self { height: 0.0, surface }
    }
}

impl TerrainQuery for FlatTerrain {
    fn height_at(&self, _x: Real, _y: Real) -> Real {
        self.height
    }

    fn normal_at(&self, _x: Real, _y: Real) -> Vec3 {
        Vec3::z()
    }

    fn surface_at(&self, _x: Real, _y: Real) -> SurfaceKind {
        self.surface
    }
}

// ============================================
// Inclined plane: z = base + gx*x + gy*y
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InclinedPlane {
    pub base_height: Real,
    pub gradient_x: Real,
    pub gradient_y: Real,
    pub surface: SurfaceKind,
}

impl TerrainQuery for InclinedPlane {
    fn height_at(&self, x: Real, y: Real) -> Real {
        self.base_height + self.gradient_x * x + self.gradient_y * y
    }

    fn normal_at(&self, _x: Real, _y: Real) -> Vec3 {
        Vec3::new(-self.gradient_x, -self.gradient_y, 1.0).normalize()
    }

    fn surface_at(&self, _x: Real, _y: Real) -> SurfaceKind {
        self.surface
    }
}
