//! Backend capability introspection.
//!
//! Describes what a backend can do: qubit count, supported gates, shot
//! limits, feature flags and, for noisy simulators, the relaxation profile
//! used when sampling.

use serde::{Deserialize, Serialize};

use qlab_ir::{Circuit, NoiseProfile};

/// Feature flag: backend can return the final statevector.
pub const FEATURE_STATEVECTOR: &str = "statevector";
/// Feature flag: backend supports measurement before the end of a circuit.
pub const FEATURE_MID_CIRCUIT_MEASUREMENT: &str = "mid_circuit_measurement";
/// Feature flag: backend supports gates conditioned on measured bits.
pub const FEATURE_DYNAMIC_CIRCUITS: &str = "dynamic_circuits";

/// Hardware capabilities of a quantum backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capabilities {
    /// Name of the backend.
    pub name: String,
    /// Number of qubits available.
    pub num_qubits: u32,
    /// Supported gate set (OpenQASM 3 naming convention).
    pub gate_set: GateSet,
    /// Maximum number of shots per job.
    pub max_shots: u32,
    /// Whether this is a simulator (`true`) or real hardware (`false`).
    pub is_simulator: bool,
    /// Additional capability flags, see the `FEATURE_*` constants.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
    /// Thermal relaxation profile applied by noisy simulators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_profile: Option<NoiseProfile>,
}

impl Capabilities {
    /// Create capabilities for a simulator.
    pub fn simulator(num_qubits: u32) -> Self {
        Self {
            name: "simulator".into(),
            num_qubits,
            gate_set: GateSet::universal(),
            max_shots: 100_000,
            is_simulator: true,
            features: vec![
                FEATURE_STATEVECTOR.into(),
                FEATURE_MID_CIRCUIT_MEASUREMENT.into(),
                FEATURE_DYNAMIC_CIRCUITS.into(),
            ],
            noise_profile: None,
        }
    }

    /// Create capabilities for a remote device from its reported basis gates.
    pub fn device(name: impl Into<String>, num_qubits: u32, basis_gates: &[String]) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            gate_set: GateSet::from_basis(basis_gates),
            max_shots: 100_000,
            is_simulator: false,
            features: vec![
                FEATURE_MID_CIRCUIT_MEASUREMENT.into(),
                FEATURE_DYNAMIC_CIRCUITS.into(),
            ],
            noise_profile: None,
        }
    }

    /// Set the shot limit.
    #[must_use]
    pub fn with_max_shots(mut self, max_shots: u32) -> Self {
        self.max_shots = max_shots;
        self
    }

    /// Attach a thermal relaxation profile.
    #[must_use]
    pub fn with_noise_profile(mut self, profile: NoiseProfile) -> Self {
        self.noise_profile = Some(profile);
        self
    }

    /// Check a feature flag.
    pub fn supports(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }

    /// Reasons a circuit cannot run as-is; empty when it fits.
    pub fn check(&self, circuit: &Circuit) -> Vec<String> {
        let mut reasons = vec![];
        if circuit.num_qubits() > self.num_qubits as usize {
            reasons.push(format!(
                "circuit uses {} qubits, backend has {}",
                circuit.num_qubits(),
                self.num_qubits
            ));
        }
        if circuit.has_conditionals() && !self.supports(FEATURE_DYNAMIC_CIRCUITS) {
            reasons.push("classically conditioned gates are not supported".into());
        }
        if circuit.has_mid_circuit_measurement() && !self.supports(FEATURE_MID_CIRCUIT_MEASUREMENT) {
            reasons.push("mid-circuit measurement is not supported".into());
        }
        reasons
    }
}

/// Set of gates a backend supports.
///
/// If `native` is empty, all supported gates are considered native
/// (typical for simulators).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateSet {
    /// Single-qubit gates supported.
    pub single_qubit: Vec<String>,
    /// Two-qubit gates supported.
    pub two_qubit: Vec<String>,
    /// Three-qubit gates supported.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub three_qubit: Vec<String>,
    /// Native gates (execute without decomposition on this backend).
    pub native: Vec<String>,
}

impl GateSet {
    /// Every gate the IR can express.
    pub fn universal() -> Self {
        let names = |list: &[&str]| list.iter().map(|s| (*s).to_string()).collect();
        Self {
            single_qubit: names(&[
                "id", "x", "y", "z", "h", "s", "sdg", "t", "tdg", "sx", "rx", "ry", "rz", "p", "u",
            ]),
            two_qubit: names(&["cx", "cy", "cz", "ch", "swap", "cp"]),
            three_qubit: names(&["ccx"]),
            native: vec![],
        }
    }

    /// Gate set of a device that reports its basis gates.
    ///
    /// The service transpiles submitted circuits, so every IR gate is
    /// accepted; only the reported basis counts as native.
    pub fn from_basis(basis_gates: &[String]) -> Self {
        Self {
            native: basis_gates.to_vec(),
            ..Self::universal()
        }
    }

    /// Check if a gate is supported.
    pub fn contains(&self, gate: &str) -> bool {
        self.single_qubit.iter().any(|g| g == gate)
            || self.two_qubit.iter().any(|g| g == gate)
            || self.three_qubit.iter().any(|g| g == gate)
    }
}
