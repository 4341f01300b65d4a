// ==============================================================================
// drivetrain.rs: ENGINE + CLUTCH + GEARBOX + DIFFERENTIAL
// ==============================================================================
// Per tick, in this order:
// 1) shift state machine (timer, manual requests, auto-shift)
// 2) engine torque from the curve at the PREVIOUS tick's rpm, scaled by throttle
// 3) clutch:   torque * (1 - clutch_position)
// 4) gearbox:  torque * ratio(gear) * final_drive   (neutral -> 0)
// 5) split:    front/rear share, then evenly over the driven wheels per axle
// 6) rpm from vehicle speed through the total ratio, clamped [idle, max]
// 7) engine damping pulls rpm toward idle
//
// Gear numbering: -1 reverse (only with a reverse ratio), 0 neutral, 1.. forward.
// While Shifting the clutch is held fully open (1.0).
// ==============================================================================

use std::f64::consts::PI;

use log::{debug, warn};

use crate::config::{DrivetrainConfig, WheelConfig};
use crate::error::{ConfigError, ensure_finite};
use crate::state::{DrivetrainState, ShiftPhase};
use crate::types::{Axle, Real, kmh_to_ms};

const UPSHIFT_FRACTION: Real = 0.85;
const DOWNSHIFT_FRACTION: Real = 0.35;
const DAMPING_SCALE: Real = 10.0;

// ====================================================================
// Torque curve
// ====================================================================

/// Full-load engine torque over rpm, linearly interpolated.
#[derive(Debug, Clone, PartialEq)]
pub struct TorqueCurve {
    points: Vec<(Real, Real)>, // (rpm, N*m), rpm strictly increasing
}

impl TorqueCurve {
    pub fn new(points: Vec<(Real, Real)>) -> Result<Self, ConfigError> {
        if points.is_empty() {
            return Err(ConfigError::EmptyTorqueCurve);
        }
        if points.len() < 2 {
            return Err(ConfigError::TorqueCurveTooShort(points.len()));
        }
        for &(rpm, torque) in &points {
            ensure_finite("torque_curve.rpm", rpm)?;
            ensure_finite("torque_curve.torque", torque)?;
        }
        for (index, pair) in points.windows(2).enumerate() {
            if pair[1].0 <= pair[0].0 {
                return Err(ConfigError::NonMonotonicTorqueCurve {
                    index: index + 1,
                    rpm: pair[1].0,
                    previous: pair[0].0,
                });
            }
        }
        Ok(Self { points })
    }

    /// Below the first point holds the first torque; past the last point the
    /// engine is cut (0).
    pub fn torque_at(&self, rpm: Real) -> Real {
        for pair in self.points.windows(2) {
            let (r1, t1) = pair[0];
            let (r2, t2) = pair[1];
            if (r1..=r2).contains(&rpm) {
                let t = (rpm - r1) / (r2 - r1);
                return t1 + t * (t2 - t1);
            }
        }
        match self.points.first() {
            Some(&(r0, t0)) if rpm < r0 => t0,
            _ => 0.0,
        }
    }
}

// ====================================================================
// Stage
// ====================================================================

/// What the driver asks of the drivetrain this tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriveDemand {
    pub throttle: Real,     // smoothed, [0, 1]
    pub clutch_pedal: Real, // [0, 1]
    pub gear_up: bool,
    pub gear_down: bool,
}

#[derive(Debug, Clone)]
pub struct Drivetrain {
    curve: TorqueCurve,
    idle_rpm: Real,
    max_rpm: Real,
    damping_full_throttle: Real,
    damping_clutch_engaged: Real,
    damping_clutch_disengaged: Real,

    gear_ratios: Vec<Real>,
    final_drive: Real,
    reverse_ratio: Option<Real>,
    auto_shift: bool,
    shift_time: Real,

    front_rear_split: Real,
    /// Per corner: the axle it is driven on, `None` if it is free-rolling.
    driven: Vec<Option<Axle>>,
    front_driven: usize,
    rear_driven: usize,
    drive_radius: Real, // m, mean driven-wheel radius
}

impl Drivetrain {
    pub fn new(cfg: &DrivetrainConfig, wheels: &[WheelConfig]) -> Result<Self, ConfigError> {
        let curve = TorqueCurve::new(cfg.engine.torque_curve.clone())?;

        let driven: Vec<Option<Axle>> =
            wheels.iter().map(|w| w.driven.then_some(w.axle)).collect();
        let front_driven = driven.iter().filter(|a| **a == Some(Axle::Front)).count();
        let rear_driven = driven.iter().filter(|a| **a == Some(Axle::Rear)).count();

        let split = cfg.differential.front_rear_split;
        for (axle, count, share) in [(Axle::Front, front_driven, split), (Axle::Rear, rear_driven, 1.0 - split)] {
            if count == 0 && share > 0.0 {
                warn!("front_rear_split {split} sends torque to a {axle} axle with no driven wheels");
            }
        }

        // free-rolling-only vehicles still need a radius for the rpm feedback
        let radii: Vec<Real> = if front_driven + rear_driven > 0 {
            wheels.iter().filter(|w| w.driven).map(|w| w.radius).collect()
        } else {
            wheels.iter().map(|w| w.radius).collect()
        };
        let drive_radius = radii.iter().sum::<Real>() / radii.len().max(1) as Real;

        Ok(Self {
            curve,
            idle_rpm: cfg.engine.idle_rpm,
            max_rpm: cfg.engine.max_rpm,
            damping_full_throttle: cfg.engine.damping_full_throttle,
            damping_clutch_engaged: cfg.engine.damping_clutch_engaged,
            damping_clutch_disengaged: cfg.engine.damping_clutch_disengaged,
            gear_ratios: cfg.gear_ratios.clone(),
            final_drive: cfg.final_drive,
            reverse_ratio: cfg.reverse_ratio,
            auto_shift: cfg.auto_shift,
            shift_time: cfg.shift_time,
            front_rear_split: split,
            driven,
            front_driven,
            rear_driven,
            drive_radius,
        })
    }

    pub fn initial_state(&self) -> DrivetrainState {
        DrivetrainState {
            engine_rpm: self.idle_rpm,
            current_gear: 1,
            clutch_position: 0.0,
            wheel_torques: vec![0.0; self.driven.len()],
            phase: ShiftPhase::Engaged,
            shift_timer: 0.0,
        }
    }

    pub fn idle_rpm(&self) -> Real {
        self.idle_rpm
    }

    pub fn lowest_gear(&self) -> i32 {
        if self.reverse_ratio.is_some() { -1 } else { 0 }
    }

    pub fn highest_gear(&self) -> i32 {
        self.gear_ratios.len() as i32 - 1
    }

    /// Gearbox ratio times final drive; 0 in neutral or for unknown gears.
    /// Neutral is gear 0 whatever the table holds in slot 0.
    pub fn total_ratio(&self, gear: i32) -> Real {
        let ratio = match gear {
            -1 => self.reverse_ratio.unwrap_or(0.0),
            0 => 0.0,
            g if g > 0 => self.gear_ratios.get(g as usize).copied().unwrap_or(0.0),
            _ => 0.0,
        };
        ratio * self.final_drive
    }

    pub fn step(&self, dt: Real, demand: &DriveDemand, speed_kmh: Real, st: &mut DrivetrainState) {
        // 1) shifting
        self.update_shift(dt, demand, st);

        // 2-4) engine -> clutch -> gearbox
        let engine_torque = self.curve.torque_at(st.engine_rpm) * demand.throttle;
        let clutched = engine_torque * (1.0 - st.clutch_position);
        let total_ratio = self.total_ratio(st.current_gear);
        let axle_torque = clutched * total_ratio;

        // 5) differential
        self.distribute(axle_torque, st.current_gear, &mut st.wheel_torques);

        // 6) rpm follows the road
        st.engine_rpm = self.rpm_from_speed(speed_kmh, total_ratio);

        // 7) damping
        let damping = if demand.throttle > 0.1 {
            self.damping_full_throttle
        } else if st.clutch_position < 0.1 {
            self.damping_clutch_engaged
        } else {
            self.damping_clutch_disengaged
        };
        st.engine_rpm = (st.engine_rpm - damping * dt * DAMPING_SCALE).max(self.idle_rpm);
    }

    fn update_shift(&self, dt: Real, demand: &DriveDemand, st: &mut DrivetrainState) {
        match st.phase {
            ShiftPhase::Shifting => {
                st.shift_timer -= dt;
                if st.shift_timer <= 0.0 {
                    st.shift_timer = 0.0;
                    st.phase = ShiftPhase::Engaged;
                    st.clutch_position = demand.clutch_pedal;
                }
                // requests during a shift are dropped
            }
            ShiftPhase::Engaged => {
                st.clutch_position = demand.clutch_pedal;

                let gear = st.current_gear;
                let requested = if demand.gear_up && gear < self.highest_gear() {
                    Some(gear + 1)
                } else if demand.gear_down && !demand.gear_up && gear > self.lowest_gear() {
                    Some(gear - 1)
                } else {
                    None
                };

                if let Some(target) = requested {
                    self.begin_shift(st, target, "manual");
                } else if self.auto_shift && gear >= 1 {
                    let rpm = st.engine_rpm;
                    if rpm > self.max_rpm * UPSHIFT_FRACTION && gear < self.highest_gear() {
                        self.begin_shift(st, gear + 1, "auto");
                    } else if rpm < self.max_rpm * DOWNSHIFT_FRACTION && gear > 1 {
                        self.begin_shift(st, gear - 1, "auto");
                    }
                }
            }
        }
    }

    fn begin_shift(&self, st: &mut DrivetrainState, target: i32, origin: &str) {
        debug!(
            "{origin} shift {} -> {target} at {:.0} rpm",
            st.current_gear, st.engine_rpm
        );
        st.current_gear = target;
        st.phase = ShiftPhase::Shifting;
        st.shift_timer = self.shift_time;
        st.clutch_position = 1.0;
    }

    fn distribute(&self, total: Real, gear: i32, out: &mut [Real]) {
        if gear == 0 {
            out.iter_mut().for_each(|t| *t = 0.0);
            return;
        }
        let front = total * self.front_rear_split;
        let rear = total * (1.0 - self.front_rear_split);
        let per_front = if self.front_driven > 0 { front / self.front_driven as Real } else { 0.0 };
        let per_rear = if self.rear_driven > 0 { rear / self.rear_driven as Real } else { 0.0 };

        for (t, axle) in out.iter_mut().zip(&self.driven) {
            *t = match axle {
                Some(Axle::Front) => per_front,
                Some(Axle::Rear) => per_rear,
                None => 0.0,
            };
        }
    }

    fn rpm_from_speed(&self, speed_kmh: Real, total_ratio: Real) -> Real {
        if total_ratio == 0.0 {
            return self.idle_rpm;
        }
        let wheel_rpm = kmh_to_ms(speed_kmh).abs() / (2.0 * PI * self.drive_radius) * 60.0;
        (wheel_rpm * total_ratio.abs()).clamp(self.idle_rpm, self.max_rpm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::presets::{rwd_coupe, sports_car};
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn sports() -> Drivetrain {
        let cfg = sports_car();
        Drivetrain::new(&cfg.drivetrain, &cfg.wheels).unwrap()
    }

    fn full_throttle() -> DriveDemand {
        DriveDemand { throttle: 1.0, ..Default::default() }
    }

    #[test]
    fn curve_interpolates_between_points() {
        let curve = TorqueCurve::new(vec![(0.0, 300.0), (3000.0, 450.0), (6000.0, 0.0)]).unwrap();
        assert_relative_eq!(curve.torque_at(1500.0), 375.0);
        assert_relative_eq!(curve.torque_at(3000.0), 450.0);
        assert_relative_eq!(curve.torque_at(4500.0), 225.0);
    }

    #[test]
    fn curve_holds_below_and_cuts_above() {
        let curve = TorqueCurve::new(vec![(1000.0, 200.0), (5000.0, 400.0)]).unwrap();
        assert_eq!(curve.torque_at(500.0), 200.0);
        assert_eq!(curve.torque_at(5000.1), 0.0);
    }

    #[test]
    fn curve_rejects_bad_tables() {
        assert_eq!(TorqueCurve::new(vec![]), Err(ConfigError::EmptyTorqueCurve));
        assert_eq!(
            TorqueCurve::new(vec![(0.0, 100.0)]),
            Err(ConfigError::TorqueCurveTooShort(1))
        );
        assert!(matches!(
            TorqueCurve::new(vec![(0.0, 100.0), (0.0, 200.0)]),
            Err(ConfigError::NonMonotonicTorqueCurve { index: 1, .. })
        ));
        assert!(matches!(
            TorqueCurve::new(vec![(0.0, 100.0), (Real::INFINITY, 200.0)]),
            Err(ConfigError::NonFinite { .. })
        ));
    }

    #[test]
    fn rpm_tracks_speed_through_second_gear() {
        let mut cfg = sports_car();
        cfg.drivetrain.auto_shift = false;
        let dt_stage = Drivetrain::new(&cfg.drivetrain, &cfg.wheels).unwrap();
        let mut st = dt_stage.initial_state();
        st.current_gear = 2;

        dt_stage.step(1.0 / 60.0, &DriveDemand::default(), 36.0, &mut st);
        assert_eq!(st.current_gear, 2);
        assert_abs_diff_eq!(st.engine_rpm, 2389.0, epsilon = 3.0);
    }

    #[test]
    fn neutral_idles_and_delivers_nothing() {
        let dt_stage = sports();
        let mut st = dt_stage.initial_state();
        st.current_gear = 0;
        dt_stage.step(1.0 / 60.0, &full_throttle(), 80.0, &mut st);
        assert_eq!(st.engine_rpm, dt_stage.idle_rpm());
        assert!(st.wheel_torques.iter().all(|t| *t == 0.0));
    }

    #[test]
    fn neutral_ignores_ratio_table_slot_zero() {
        let mut cfg = sports_car();
        cfg.drivetrain.gear_ratios[0] = 1.0;
        let dt_stage = Drivetrain::new(&cfg.drivetrain, &cfg.wheels).unwrap();
        assert_eq!(dt_stage.total_ratio(0), 0.0);

        let mut st = dt_stage.initial_state();
        st.current_gear = 0;
        dt_stage.step(1.0 / 60.0, &full_throttle(), 80.0, &mut st);
        assert_eq!(st.engine_rpm, dt_stage.idle_rpm());
        assert!(st.wheel_torques.iter().all(|t| *t == 0.0));
    }

    #[test]
    fn awd_split_is_even_per_axle() {
        let dt_stage = sports();
        let mut st = dt_stage.initial_state();
        dt_stage.step(1.0 / 60.0, &full_throttle(), 0.0, &mut st);

        // 800 rpm -> 340 N*m, first gear 3.5 * 3.5
        let total = 340.0 * 3.5 * 3.5;
        for t in &st.wheel_torques {
            assert_relative_eq!(*t, total * 0.25, epsilon = 1e-9);
        }
    }

    #[test]
    fn rwd_sends_everything_to_the_rear() {
        let cfg = rwd_coupe();
        let dt_stage = Drivetrain::new(&cfg.drivetrain, &cfg.wheels).unwrap();
        let mut st = dt_stage.initial_state();
        dt_stage.step(1.0 / 60.0, &full_throttle(), 0.0, &mut st);

        assert_eq!(st.wheel_torques[0], 0.0);
        assert_eq!(st.wheel_torques[1], 0.0);
        assert!(st.wheel_torques[2] > 0.0);
        assert_relative_eq!(st.wheel_torques[2], st.wheel_torques[3]);
    }

    #[test]
    fn reverse_gear_pushes_backwards() {
        let dt_stage = sports();
        let mut st = dt_stage.initial_state();
        st.current_gear = -1;
        dt_stage.step(1.0 / 60.0, &full_throttle(), -20.0, &mut st);
        assert!(st.wheel_torques.iter().all(|t| *t < 0.0));
        assert!(st.engine_rpm > dt_stage.idle_rpm());
    }

    #[test]
    fn auto_upshift_opens_clutch_then_reengages() {
        let dt_stage = sports();
        let mut st = dt_stage.initial_state();
        st.engine_rpm = 6000.0; // > 0.85 * 7000
        let dt = 1.0 / 60.0;

        dt_stage.step(dt, &full_throttle(), 64.0, &mut st);
        assert_eq!(st.current_gear, 2);
        assert_eq!(st.phase, ShiftPhase::Shifting);
        assert_eq!(st.clutch_position, 1.0);
        assert!(st.wheel_torques.iter().all(|t| *t == 0.0));

        let mut ticks = 0;
        while st.phase == ShiftPhase::Shifting {
            dt_stage.step(dt, &full_throttle(), 64.0, &mut st);
            assert_eq!(st.current_gear, 2);
            ticks += 1;
            assert!(ticks < 100);
        }
        assert!((18..=19).contains(&ticks));
        assert_eq!(st.clutch_position, 0.0);
    }

    #[test]
    fn manual_requests_ignored_while_shifting() {
        let dt_stage = sports();
        let mut st = dt_stage.initial_state();
        let up = DriveDemand { gear_up: true, ..Default::default() };

        dt_stage.step(0.01, &up, 0.0, &mut st);
        assert_eq!(st.current_gear, 2);
        dt_stage.step(0.01, &up, 0.0, &mut st);
        assert_eq!(st.current_gear, 2);
    }

    #[test]
    fn gear_up_wins_over_gear_down() {
        let dt_stage = sports();
        let mut st = dt_stage.initial_state();
        let both = DriveDemand { gear_up: true, gear_down: true, ..Default::default() };
        dt_stage.step(0.01, &both, 0.0, &mut st);
        assert_eq!(st.current_gear, 2);
    }

    #[test]
    fn manual_downshift_reaches_reverse_and_stops() {
        let dt_stage = sports();
        let mut st = dt_stage.initial_state();
        let down = DriveDemand { gear_down: true, ..Default::default() };
        for _ in 0..10 {
            dt_stage.step(0.01, &down, 0.0, &mut st);
            // let the shift complete
            for _ in 0..40 {
                dt_stage.step(0.01, &DriveDemand::default(), 0.0, &mut st);
            }
        }
        assert_eq!(st.current_gear, -1);
    }

    #[test]
    fn clutch_pedal_cuts_torque_when_engaged() {
        let dt_stage = sports();
        let mut st = dt_stage.initial_state();
        let demand = DriveDemand { throttle: 1.0, clutch_pedal: 1.0, ..Default::default() };
        dt_stage.step(0.01, &demand, 0.0, &mut st);
        assert_eq!(st.clutch_position, 1.0);
        assert!(st.wheel_torques.iter().all(|t| *t == 0.0));
    }

    #[test]
    fn damping_never_drops_below_idle() {
        let dt_stage = sports();
        let mut st = dt_stage.initial_state();
        for _ in 0..100 {
            dt_stage.step(0.1, &DriveDemand::default(), 0.0, &mut st);
            assert!(st.engine_rpm >= dt_stage.idle_rpm());
        }
    }
}
