//! Deterministic sample data shaped like the turbine source table.

use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::RawRecord;

pub const SYNTHETIC_FIELDS: [&str; 3] = ["wind_speed", "power", "ambient_temperature"];

/// One record per minute for `days` days starting at `start`.
///
/// wind_speed is in [0, 15] m/s, power in [0, 1000] kW and
/// ambient_temperature in [-5, 40] C, each rounded to two decimals.
pub fn generate_records(start: NaiveDateTime, days: u32, seed: u64) -> Vec<RawRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let total_minutes = i64::from(days) * 24 * 60;
    (0..total_minutes)
        .map(|minute| {
            RawRecord::new(start + Duration::minutes(minute))
                .with_value("wind_speed", round2(rng.gen_range(0.0..=15.0)))
                .with_value("power", round2(rng.gen_range(0.0..=1000.0)))
                .with_value("ambient_temperature", round2(rng.gen_range(-5.0..=40.0)))
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
