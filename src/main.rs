use log::{error, info};
use tokio::time::{Duration, interval};

use vehicle_dynamics::presets;
use vehicle_dynamics::{ControlInput, Real, World};

const DT: Real = 1.0 / 60.0;
const TELEMETRY_EVERY: u64 = 60;

/// Scripted driver: launch, sweep right, brake, then roll to a stop.
fn scripted_input(t: Real) -> ControlInput {
    match t {
        t if t < 3.0 => ControlInput { throttle: 1.0, ..Default::default() },
        t if t < 5.0 => ControlInput { throttle: 0.6, steering: 0.4, ..Default::default() },
        t if t < 6.5 => ControlInput { brake: 0.8, ..Default::default() },
        _ => ControlInput::default(),
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let seconds: Real = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(10.0);
    let total_ticks = (seconds / DT).round() as u64;

    let mut world = World::new();
    let mut ids = Vec::new();
    for config in [presets::sports_car(), presets::rwd_coupe(), presets::arcade_car()] {
        match world.spawn(config) {
            Ok(id) => ids.push(id),
            Err(e) => {
                error!("preset rejected: {e}");
                return;
            }
        }
    }
    info!("running {} vehicles for {seconds} s", ids.len());

    // Fixed timestep: ~60 Hz
    let mut ticker = interval(Duration::from_millis(16));

    for tick in 0..total_ticks {
        ticker.tick().await;

        let input = scripted_input(tick as Real * DT);
        for id in &ids {
            if let Some(vehicle) = world.get_mut(*id) {
                vehicle.set_input(input);
            }
        }

        world.update(DT);

        if world.tick() % TELEMETRY_EVERY == 0 {
            match world.snapshot().to_json() {
                Ok(json) => println!("{json}"),
                Err(e) => error!("telemetry encode failed: {e}"),
            }
        }
    }
}
