//! Synthetic API log generation
//!
//! Mimics a steady production service: Gaussian latency around 120ms with a
//! small chance of a +1000ms spike, a 95/3/2 status mix of 200/500/404, and
//! uniform traffic over four endpoints. Useful for demos and for exercising
//! the pipeline in tests.

use crate::record::RawRecord;
use chrono::{DateTime, Duration, Utc};
use rand::prelude::*;
use uuid::Uuid;

const ENDPOINTS: [&str; 4] = ["/login", "/search", "/order", "/checkout"];

/// Synthetic log batch generator.
#[derive(Debug, Clone)]
pub struct LogGenerator {
    count: usize,
    start: Option<DateTime<Utc>>,
    mean_latency_ms: f64,
    latency_std_ms: f64,
    spike_probability: f64,
    seed: Option<u64>,
}

impl Default for LogGenerator {
    fn default() -> Self {
        Self::new(5000)
    }
}

impl LogGenerator {
    /// Create a generator for `count` records.
    pub fn new(count: usize) -> Self {
        Self {
            count,
            start: None,
            mean_latency_ms: 120.0,
            latency_std_ms: 30.0,
            spike_probability: 0.02,
            seed: None,
        }
    }

    /// Fix the timestamp of the first record (defaults to now).
    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// Set the latency spike probability.
    pub fn with_spike_probability(mut self, p: f64) -> Self {
        self.spike_probability = p.clamp(0.0, 1.0);
        self
    }

    /// Set the random seed for reproducible batches.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Generate the batch, one record per second.
    pub fn generate(&self) -> Vec<RawRecord> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let start = self.start.unwrap_or_else(Utc::now);

        (0..self.count)
            .map(|i| {
                let spike = if rng.gen::<f64>() < self.spike_probability {
                    1000.0
                } else {
                    0.0
                };
                let latency =
                    gaussian(&mut rng, self.mean_latency_ms, self.latency_std_ms) + spike;

                RawRecord {
                    timestamp: start + Duration::seconds(i as i64),
                    trace_id: Uuid::new_v4().to_string(),
                    endpoint: ENDPOINTS[rng.gen_range(0..ENDPOINTS.len())].to_string(),
                    latency_ms: latency.max(1.0) as u64,
                    status_code: weighted_status(&mut rng),
                    user_id: rng.gen_range(1..=1000),
                }
            })
            .collect()
    }
}

/// 95% 200, 3% 500, 2% 404.
fn weighted_status(rng: &mut impl Rng) -> u16 {
    match rng.gen_range(0..100) {
        0..=94 => 200,
        95..=97 => 500,
        _ => 404,
    }
}

/// Box-Muller Gaussian sample.
fn gaussian(rng: &mut impl Rng, mean: f64, std: f64) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen();
    mean + std * (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}
