//! Random thermal-relaxation profiles.
//!
//! Builds a [`NoiseProfile`] whose per-qubit T1/T2 times are drawn from
//! normal distributions, the way a noisy fallback device is emulated.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::debug;

use qlab_ir::{GateTimes, IrError, IrResult, NoiseProfile};

/// Lower bound for sampled relaxation times, in nanoseconds.
const MIN_TIME_NS: f64 = 1.0;

/// Distribution parameters for sampled T1/T2 times (nanoseconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalParams {
    /// Mean T1.
    pub t1_mean: f64,
    /// Standard deviation of T1.
    pub t1_std: f64,
    /// Mean T2.
    pub t2_mean: f64,
    /// Standard deviation of T2.
    pub t2_std: f64,
    /// Instruction durations.
    pub gate_times: GateTimes,
}

impl Default for ThermalParams {
    /// T1 ~ N(50 µs, 10 µs), T2 ~ N(70 µs, 10 µs).
    fn default() -> Self {
        Self {
            t1_mean: 50e3,
            t1_std: 10e3,
            t2_mean: 70e3,
            t2_std: 10e3,
            gate_times: GateTimes::default(),
        }
    }
}

fn normal(name: &str, mean: f64, std: f64) -> IrResult<Normal<f64>> {
    if !mean.is_finite() {
        return Err(IrError::InvalidNoise(format!("{name} mean must be finite, got {mean}")));
    }
    if !std.is_finite() || std < 0.0 {
        return Err(IrError::InvalidNoise(format!(
            "{name} standard deviation must be finite and non-negative, got {std}"
        )));
    }
    Normal::new(mean, std)
        .map_err(|e| IrError::InvalidNoise(format!("{name} standard deviation {std}: {e}")))
}

/// Sample a per-qubit thermal relaxation profile.
///
/// Both times are kept strictly positive and `T2` is capped at `2·T1`.
/// A negative or non-finite spread is rejected before any qubit is drawn.
pub fn sample_thermal_profile<R: Rng + ?Sized>(
    num_qubits: usize,
    params: &ThermalParams,
    rng: &mut R,
) -> IrResult<NoiseProfile> {
    let t1_dist = normal("T1", params.t1_mean, params.t1_std)?;
    let t2_dist = normal("T2", params.t2_mean, params.t2_std)?;

    let mut t1 = Vec::with_capacity(num_qubits);
    let mut t2 = Vec::with_capacity(num_qubits);
    for _ in 0..num_qubits {
        let a = t1_dist.sample(rng).max(MIN_TIME_NS);
        let b = t2_dist.sample(rng).max(MIN_TIME_NS).min(2.0 * a);
        t1.push(a);
        t2.push(b);
    }
    debug!(num_qubits, "sampled thermal relaxation profile");
    NoiseProfile::new(t1, t2, params.gate_times)
}
