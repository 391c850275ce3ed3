//! Local environment drift used when the telemetry source does not report
//! environment readings.

use std::sync::Arc;
use std::time::Duration;

use rescue_core::{current_unix_timestamp_ms, Environment};
use tokio::task::JoinHandle;

use crate::TelemetryClient;

pub const DETECTION_SPIKE_PROBABILITY: f64 = 0.05;
const TEMPERATURE_RANGE_C: (f64, f64) = (20.0, 35.0);
const VISIBILITY_FLOOR: f64 = 0.3;

/// Seeded random walk over the environment readings.
#[derive(Debug, Clone)]
pub struct EnvironmentDrift {
    state: u64,
}

impl EnvironmentDrift {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn from_clock() -> Self {
        Self::new(current_unix_timestamp_ms())
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut mixed = self.state;
        mixed = (mixed ^ (mixed >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        mixed = (mixed ^ (mixed >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        mixed ^ (mixed >> 31)
    }

    /// Uniform sample in `[0, 1)`.
    fn next_unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1_u64 << 53) as f64
    }

    pub fn step(&mut self, environment: Environment) -> Environment {
        let battery_percent = (environment.battery_percent - self.next_unit() * 0.1).max(0.0);
        let temperature_c = (environment.temperature_c + (self.next_unit() - 0.5) * 0.5)
            .clamp(TEMPERATURE_RANGE_C.0, TEMPERATURE_RANGE_C.1);
        let gas_level = (environment.gas_level + (self.next_unit() - 0.5) * 0.02).clamp(0.0, 1.0);
        let visibility = (environment.visibility + (self.next_unit() - 0.5) * 0.01)
            .clamp(VISIBILITY_FLOOR, 1.0);
        let spike = self.next_unit() < DETECTION_SPIKE_PROBABILITY;

        Environment {
            battery_percent,
            temperature_c,
            gas_level,
            visibility,
            person_detected: environment.person_detected || spike,
        }
    }
}

/// Feeds one drift step into `client` every `interval` until aborted.
pub fn spawn_drift(
    client: Arc<TelemetryClient>,
    mut drift: EnvironmentDrift,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            client.update_environment(|environment| drift.step(environment));
        }
    })
}
