// ==============================================================================
// suspension.rs: PER-CORNER SPRING / DAMPER (QUASI-STATIC COMPRESSION)
// ==============================================================================
// Compression is not integrated; it is the static answer to
//
//     m_s * g / k      (weight)
//   + m_s * a_z / k    (body heave acceleration)
//   + v_z * c / k      (wheel vertical velocity through the damper)
//
// clamped to [-max_droop, max_compression]. The finite difference of that
// value gives compression velocity for the damper force.
//
// Corner constants (sprung mass, k, c) are fixed at construction:
//   m_s ∝ 1 / max(0.1, |wheel - CoM|_xy), normalized to the vehicle mass
//   k   = f^2 * m_s
//   c   = zeta * 2 * sqrt(k * m_s)
//
// Terrain is sampled under each wheel only to report the contact patch.
// ==============================================================================

use crate::config::{SuspensionConfig, WheelConfig};
use crate::state::{KinematicState, SuspensionCornerState, WheelState};
use crate::terrain::TerrainQuery;
use crate::types::{GRAVITY, Real, Vec3};

const MIN_COM_DISTANCE: Real = 0.1; // m
const AIRBORNE_DROOP_FRACTION: Real = 0.99;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerSpring {
    pub sprung_mass: Real, // kg
    pub stiffness: Real,   // N/m
    pub damper_rate: Real, // N*s/m
    pub max_compression: Real,
    pub max_droop: Real,
}

#[derive(Debug, Clone)]
pub struct SuspensionStage {
    corners: Vec<CornerSpring>,
}

/// Split `mass` over the wheels by inverse horizontal distance to the CoM.
pub fn sprung_masses(mass: Real, center_of_mass: &Vec3, wheels: &[WheelConfig]) -> Vec<Real> {
    let inverse: Vec<Real> = wheels
        .iter()
        .map(|w| {
            let d = (w.position.xy() - center_of_mass.xy()).norm();
            1.0 / d.max(MIN_COM_DISTANCE)
        })
        .collect();
    let total: Real = inverse.iter().sum();
    inverse.iter().map(|inv| mass * inv / total).collect()
}

impl SuspensionStage {
    pub fn new(
        mass: Real,
        center_of_mass: &Vec3,
        wheels: &[WheelConfig],
        springs: &[SuspensionConfig],
    ) -> Self {
        let corners = sprung_masses(mass, center_of_mass, wheels)
            .into_iter()
            .zip(springs)
            .map(|(m, s)| {
                let k = s.natural_frequency.powi(2) * m;
                CornerSpring {
                    sprung_mass: m,
                    stiffness: k,
                    damper_rate: s.damping_ratio * 2.0 * (k * m).sqrt(),
                    max_compression: s.max_compression,
                    max_droop: s.max_droop,
                }
            })
            .collect();
        Self { corners }
    }

    pub fn corners(&self) -> &[CornerSpring] {
        &self.corners
    }

    pub fn sprung_masses(&self) -> Vec<Real> {
        self.corners.iter().map(|c| c.sprung_mass).collect()
    }

    pub fn initial_states(&self, wheels: &[WheelState], terrain: &dyn TerrainQuery) -> Vec<SuspensionCornerState> {
        wheels
            .iter()
            .map(|w| {
                let ground = terrain.sample(w.world_position.x, w.world_position.y);
                SuspensionCornerState {
                    contact_point: Vec3::new(w.world_position.x, w.world_position.y, ground.height),
                    contact_normal: ground.normal,
                    ..Default::default()
                }
            })
            .collect()
    }

    pub fn step(
        &self,
        dt: Real,
        kin: &KinematicState,
        wheels: &[WheelState],
        terrain: &dyn TerrainQuery,
        out: &mut [SuspensionCornerState],
    ) {
        let a_z = kin.acceleration.z;

        for ((c, w), s) in self.corners.iter().zip(wheels).zip(out.iter_mut()) {
            let k = c.stiffness;
            let v_z = w.linear_velocity.z;

            let raw = c.sprung_mass * GRAVITY / k
                + c.sprung_mass * a_z / k
                + v_z * c.damper_rate / k;
            let compression = raw.clamp(-c.max_droop, c.max_compression);

            let velocity = if dt > 0.0 { (compression - s.compression) / dt } else { 0.0 };

            s.compression = compression;
            s.compression_velocity = velocity;
            s.spring_force = -k * compression;
            s.damper_force = -c.damper_rate * velocity;
            s.total_force = s.spring_force + s.damper_force;
            s.wheel_offset = -compression;
            s.in_air = compression <= -c.max_droop * AIRBORNE_DROOP_FRACTION;

            let ground = terrain.sample(w.world_position.x, w.world_position.y);
            s.contact_point = Vec3::new(w.world_position.x, w.world_position.y, ground.height);
            s.contact_normal = ground.normal;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::presets::sports_car;
    use crate::terrain::{FlatTerrain, InclinedPlane, SurfaceKind};
    use crate::wheel::WheelStage;
    use approx::assert_relative_eq;

    struct Rig {
        stage: SuspensionStage,
        kin: KinematicState,
        wheels: Vec<WheelState>,
        corners: Vec<SuspensionCornerState>,
    }

    fn rig() -> Rig {
        let cfg = sports_car();
        let stage = SuspensionStage::new(cfg.mass, &cfg.center_of_mass, &cfg.wheels, &cfg.suspension);
        let kin = KinematicState::at_rest(cfg.initial_position, 0.0, 800.0);
        let wheels = WheelStage::new(&cfg.wheels).initial_states(&kin.position, kin.heading);
        let corners = stage.initial_states(&wheels, &FlatTerrain::default());
        Rig { stage, kin, wheels, corners }
    }

    #[test]
    fn sprung_mass_sums_to_vehicle_mass() {
        let cfg = sports_car();
        let masses = sprung_masses(cfg.mass, &cfg.center_of_mass, &cfg.wheels);
        assert_relative_eq!(masses.iter().sum::<Real>(), cfg.mass, epsilon = 1e-9);
        // symmetric layout -> equal shares
        for m in &masses {
            assert_relative_eq!(*m, 375.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn wheel_nearer_the_com_carries_more() {
        let mut cfg = sports_car();
        cfg.center_of_mass.y = 0.8;
        let masses = sprung_masses(cfg.mass, &cfg.center_of_mass, &cfg.wheels);
        assert!(masses[0] > masses[2]);
    }

    #[test]
    fn stiffness_and_damping_follow_frequency() {
        let r = rig();
        let c = r.stage.corners()[0];
        assert_relative_eq!(c.stiffness, 49.0 * 375.0, epsilon = 1e-9);
        assert_relative_eq!(c.damper_rate, 2.0 * (c.stiffness * 375.0).sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn static_load_bottoms_out_soft_preset() {
        let mut r = rig();
        r.stage.step(0.02, &r.kin, &r.wheels, &FlatTerrain::default(), &mut r.corners);
        // g / f^2 = 0.2 m, limited to 0.1 m of travel
        for s in &r.corners {
            assert_relative_eq!(s.compression, 0.1);
            assert_relative_eq!(s.wheel_offset, -0.1);
            assert!(!s.in_air);
            assert_relative_eq!(s.compression_velocity, 0.1 / 0.02, epsilon = 1e-9);
        }
    }

    #[test]
    fn zero_dt_gives_zero_velocity() {
        let mut r = rig();
        r.stage.step(0.0, &r.kin, &r.wheels, &FlatTerrain::default(), &mut r.corners);
        assert!(r.corners.iter().all(|s| s.compression_velocity == 0.0 && s.damper_force == 0.0));
    }

    #[test]
    fn strong_downward_acceleration_lifts_wheels() {
        let mut r = rig();
        r.kin.acceleration.z = -50.0;
        r.stage.step(0.02, &r.kin, &r.wheels, &FlatTerrain::default(), &mut r.corners);
        for s in &r.corners {
            assert_relative_eq!(s.compression, -0.1);
            assert!(s.in_air);
            assert!(s.spring_force > 0.0);
        }
    }

    #[test]
    fn contact_patch_reports_terrain() {
        let mut r = rig();
        let hill = InclinedPlane {
            base_height: 0.5,
            gradient_x: 0.2,
            gradient_y: 0.0,
            surface: SurfaceKind::Asphalt,
        };
        r.stage.step(0.02, &r.kin, &r.wheels, &hill, &mut r.corners);
        let fr = &r.corners[1];
        assert_relative_eq!(fr.contact_point.x, r.wheels[1].world_position.x);
        assert_relative_eq!(fr.contact_point.z, 0.5 + 0.2 * 0.9, epsilon = 1e-9);
        assert!(fr.contact_normal.x < 0.0);
    }
}
