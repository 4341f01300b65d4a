//! Core shared types for the pipeline (scalar, vector, corner placement).
// types.rs
use std::fmt;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

pub type Real = f64;
pub type Vec3 = Vector3<Real>;

pub const GRAVITY: Real = 9.81; // m/s^2

// ----- tiny unit helpers -----------------------------------------------------
#[inline] pub fn kmh_to_ms(v: Real) -> Real { v / 3.6 }
#[inline] pub fn ms_to_kmh(v: Real) -> Real { v * 3.6 }

/// Wrap an angle in degrees into `[0, 360)`.
#[inline]
pub fn wrap_degrees(deg: Real) -> Real {
    let w = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if w >= 360.0 { 0.0 } else { w }
}

/// Forward unit vector (world) for a heading in degrees, clockwise from +y.
#[inline]
pub fn heading_forward(heading_deg: Real) -> Vec3 {
    let h = heading_deg.to_radians();
    Vec3::new(h.sin(), h.cos(), 0.0)
}

/// Rotate a vehicle-local offset (x right, y forward) into world space.
#[inline]
pub fn local_to_world(local: &Vec3, heading_deg: Real) -> Vec3 {
    let h = heading_deg.to_radians();
    let (sin_h, cos_h) = h.sin_cos();
    Vec3::new(
        local.x * cos_h + local.y * sin_h,
        -local.x * sin_h + local.y * cos_h,
        local.z,
    )
}

// ============================================
// Corner placement
// ============================================

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axle { Front, Rear }

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side { Left, Right }

impl Axle {
    pub fn is_rear(&self) -> bool { matches!(self, Axle::Rear) }
}

impl fmt::Display for Axle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Axle::Front => "front",
            Axle::Rear => "rear",
        };
        write!(f, "{s}")
    }
}

/// Mean of the values selected by `pick`, or 0 when nothing matches.
pub(crate) fn mean_where<T>(items: &[T], pick: impl Fn(&T) -> Option<Real>) -> Real {
    let (sum, n) = items
        .iter()
        .filter_map(pick)
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as Real }
}
