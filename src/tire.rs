// ==============================================================================
// tire.rs: TIRE LOAD AND FORCE (EMPIRICAL CURVE + FRICTION CIRCLE)
// ==============================================================================
// Per corner:
// 1) load   = wheel weight + whatever the spring pushes down (>= 0)
// 2) slips  = long from wheel vs road speed, lat estimated from steer + speed
// 3) forces:
//      long = drive torque / R, limited to ±mu*Fz
//      lat  = magic formula at lat slip, limited to what the friction
//             circle leaves after long
// 4) wheel reaction torque and a pneumatic-trail aligning moment
//
// mu = tire friction * terrain friction under the contact point.
// Airborne corners report zero load and zero forces for the same tick.
// ==============================================================================

use crate::config::{TireConfig, WheelConfig};
use crate::state::{KinematicState, SuspensionCornerState, TireCornerState, WheelState};
use crate::terrain::TerrainQuery;
use crate::types::{GRAVITY, Real, kmh_to_ms};

/// Effective rolling radius used for slip and force conversion, shared by
/// every corner regardless of the wheel's own radius.
pub const TIRE_RADIUS: Real = 0.35; // m

const PNEUMATIC_TRAIL: Real = 0.02; // m
const SLIP_SPEED_EPS: Real = 0.1; // m/s
const STEERED_LAT_GAIN: Real = 0.3;
const FREE_LAT_GAIN: Real = 0.1;

// Magic-formula shape
const SHAPE_C: Real = 1.9;
const CURVATURE_E: Real = 0.97;

/// y = D sin(C atan(Bx - E(Bx - atan Bx))), with B = stiffness / D, D = peak.
pub fn magic_formula(slip: Real, stiffness: Real, peak: Real) -> Real {
    if peak <= Real::EPSILON {
        return 0.0;
    }
    let b = stiffness / peak;
    let bx = b * slip;
    let inner = bx - CURVATURE_E * (bx - bx.atan());
    peak * (SHAPE_C * inner.atan()).sin()
}

#[derive(Debug, Clone)]
struct TireCorner {
    friction: Real,
    lateral_stiffness: Real,
    steerable: bool,
    rest_load: Real,
}

#[derive(Debug, Clone)]
pub struct TireStage {
    corners: Vec<TireCorner>,
    wheel_weight: Real, // N
}

impl TireStage {
    pub fn new(tires: &[TireConfig], wheels: &[WheelConfig], sprung_masses: &[Real], wheel_mass: Real) -> Self {
        let wheel_weight = wheel_mass * GRAVITY;
        let corners = tires
            .iter()
            .zip(wheels)
            .zip(sprung_masses)
            .map(|((t, w), m)| TireCorner {
                friction: t.friction,
                lateral_stiffness: t.lateral_stiffness,
                steerable: w.steerable,
                rest_load: wheel_weight + m * GRAVITY,
            })
            .collect();
        Self { corners, wheel_weight }
    }

    pub fn initial_states(&self) -> Vec<TireCornerState> {
        self.corners
            .iter()
            .map(|c| TireCornerState { rest_load: c.rest_load, ..Default::default() })
            .collect()
    }

    pub fn step(
        &self,
        kin: &KinematicState,
        wheels: &[WheelState],
        suspension: &[SuspensionCornerState],
        terrain: &dyn TerrainQuery,
        out: &mut [TireCornerState],
    ) {
        let road_speed = kmh_to_ms(kin.speed);
        let speed_factor = (kin.speed / 100.0).clamp(-1.0, 1.0);

        for (((c, w), s), t) in self
            .corners
            .iter()
            .zip(wheels)
            .zip(suspension)
            .zip(out.iter_mut())
        {
            t.rest_load = c.rest_load;

            if s.in_air {
                t.load = 0.0;
                t.normalized_load = 0.0;
                t.long_force = 0.0;
                t.lat_force = 0.0;
                t.wheel_torque = 0.0;
                t.aligning_moment = 0.0;
                continue;
            }

            // -------------------------
            // LOAD
            // -------------------------
            let load = self.wheel_weight + (-s.spring_force).max(0.0);
            t.load = load;
            t.normalized_load = load / c.rest_load;

            // -------------------------
            // SLIP
            // -------------------------
            let wheel_speed = w.angular_velocity * TIRE_RADIUS;
            t.long_slip = if road_speed.abs() > SLIP_SPEED_EPS {
                (wheel_speed - road_speed) / road_speed
            } else {
                wheel_speed - road_speed
            };
            t.lat_slip = if c.steerable {
                w.steering_angle.to_radians() * STEERED_LAT_GAIN * speed_factor
            } else {
                kin.steering_angle.to_radians() * FREE_LAT_GAIN * speed_factor
            };

            // -------------------------
            // FORCES (friction circle)
            // -------------------------
            let ground = terrain.sample(s.contact_point.x, s.contact_point.y);
            let grip = c.friction * ground.friction * load;

            let long = (w.drive_torque / TIRE_RADIUS).clamp(-grip, grip);
            let lat_cap = (grip * grip - long * long).max(0.0).sqrt();
            let lat = magic_formula(t.lat_slip, c.lateral_stiffness, grip).clamp(-lat_cap, lat_cap);

            t.long_force = long;
            t.lat_force = lat;
            t.wheel_torque = -long * TIRE_RADIUS;
            t.aligning_moment = lat * PNEUMATIC_TRAIL;
        }
    }
}
