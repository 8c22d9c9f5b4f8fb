//! Thermal relaxation noise parameters.
//!
//! A [`NoiseProfile`] holds per-qubit T1/T2 times together with the duration
//! of each instruction class. Simulators turn it into a
//! [`ThermalRelaxation`] channel for every instruction they execute.
//!
//! All times are in nanoseconds.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::StandardGate;
use crate::instruction::{Instruction, InstructionKind};

/// Slack allowed when checking `T2 <= 2 * T1`.
const T2_BOUND_SLACK: f64 = 1e-9;

/// Duration class of an instruction, following the u1/u2/u3/cx basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DurationClass {
    /// Virtual phase gates (z, s, t, p, rz).
    U1,
    /// Half rotations (h, sx).
    U2,
    /// Full single-qubit rotations (x, y, rx, ry, u).
    U3,
    /// Two-qubit entangling gates.
    Cx,
    /// Reset and state initialisation.
    Reset,
    /// Measurement.
    Measure,
    /// Instructions without physical duration (barriers, identity).
    Free,
}

impl DurationClass {
    /// Classify an instruction.
    pub fn of(instruction: &Instruction) -> Self {
        match &instruction.kind {
            InstructionKind::Gate(gate) => Self::of_gate(&gate.standard),
            InstructionKind::Measure => DurationClass::Measure,
            InstructionKind::Reset | InstructionKind::Initialize { .. } => DurationClass::Reset,
            InstructionKind::Barrier => DurationClass::Free,
        }
    }

    /// Classify a standard gate.
    pub fn of_gate(gate: &StandardGate) -> Self {
        match gate {
            StandardGate::I => DurationClass::Free,
            StandardGate::Z
            | StandardGate::S
            | StandardGate::Sdg
            | StandardGate::T
            | StandardGate::Tdg
            | StandardGate::P(_)
            | StandardGate::Rz(_) => DurationClass::U1,
            StandardGate::H | StandardGate::SX => DurationClass::U2,
            StandardGate::X
            | StandardGate::Y
            | StandardGate::Rx(_)
            | StandardGate::Ry(_)
            | StandardGate::U(_, _, _) => DurationClass::U3,
            StandardGate::CX
            | StandardGate::CY
            | StandardGate::CZ
            | StandardGate::CH
            | StandardGate::Swap
            | StandardGate::CP(_)
            | StandardGate::CCX => DurationClass::Cx,
        }
    }
}

/// Instruction durations in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateTimes {
    /// Duration of u1-class gates.
    pub u1: f64,
    /// Duration of u2-class gates.
    pub u2: f64,
    /// Duration of u3-class gates.
    pub u3: f64,
    /// Duration of two-qubit gates.
    pub cx: f64,
    /// Duration of reset.
    pub reset: f64,
    /// Duration of measurement.
    pub measure: f64,
}

impl Default for GateTimes {
    fn default() -> Self {
        Self {
            u1: 0.0,
            u2: 50.0,
            u3: 100.0,
            cx: 300.0,
            reset: 1000.0,
            measure: 1000.0,
        }
    }
}

impl GateTimes {
    /// Duration of an instruction class.
    pub fn duration(&self, class: DurationClass) -> f64 {
        match class {
            DurationClass::U1 => self.u1,
            DurationClass::U2 => self.u2,
            DurationClass::U3 => self.u3,
            DurationClass::Cx => self.cx,
            DurationClass::Reset => self.reset,
            DurationClass::Measure => self.measure,
            DurationClass::Free => 0.0,
        }
    }
}

/// Thermal relaxation over a fixed time window.
///
/// Decomposed into amplitude damping with `γ = 1 - exp(-t/T1)` and a phase
/// flip with probability `λ = (1 - exp(-t/Tφ)) / 2`, where
/// `1/Tφ = 1/T2 - 1/(2·T1)`. Together they reproduce population decay with T1
/// and coherence decay with T2.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalRelaxation {
    t1: f64,
    t2: f64,
    time: f64,
}

impl ThermalRelaxation {
    /// Create a thermal relaxation channel.
    ///
    /// Requires `T1 > 0`, `T2 > 0`, `T2 <= 2·T1` and a non-negative time.
    pub fn new(t1: f64, t2: f64, time: f64) -> IrResult<Self> {
        if t1.is_nan() || t1 <= 0.0 {
            return Err(IrError::InvalidNoise(format!("T1 must be positive, got {t1}")));
        }
        if t2.is_nan() || t2 <= 0.0 {
            return Err(IrError::InvalidNoise(format!("T2 must be positive, got {t2}")));
        }
        if t2 > 2.0 * t1 + T2_BOUND_SLACK {
            return Err(IrError::InvalidNoise(format!(
                "T2 ({t2}) must not exceed 2·T1 ({})",
                2.0 * t1
            )));
        }
        if !time.is_finite() || time < 0.0 {
            return Err(IrError::InvalidNoise(format!(
                "duration must be non-negative, got {time}"
            )));
        }
        Ok(Self { t1, t2, time })
    }

    /// Relaxation time.
    pub fn t1(&self) -> f64 {
        self.t1
    }

    /// Dephasing time.
    pub fn t2(&self) -> f64 {
        self.t2
    }

    /// Duration of the window.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Probability of decaying from |1⟩ to |0⟩.
    pub fn damping(&self) -> f64 {
        1.0 - (-self.time / self.t1).exp()
    }

    /// Probability of a pure-dephasing phase flip.
    pub fn dephasing(&self) -> f64 {
        let rate = (1.0 / self.t2 - 0.5 / self.t1).max(0.0);
        (1.0 - (-self.time * rate).exp()) / 2.0
    }

    /// Whether the channel leaves every state untouched.
    pub fn is_identity(&self) -> bool {
        self.time == 0.0 || (self.damping() == 0.0 && self.dephasing() == 0.0)
    }
}

/// Per-qubit relaxation data plus instruction durations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoiseProfile {
    /// T1 relaxation time per qubit.
    #[serde(default)]
    pub t1: Vec<f64>,

    /// T2 dephasing time per qubit.
    #[serde(default)]
    pub t2: Vec<f64>,

    /// Instruction durations.
    #[serde(default)]
    pub gate_times: GateTimes,
}

impl NoiseProfile {
    /// Create a profile, checking every qubit's T1/T2 pair.
    pub fn new(t1: Vec<f64>, t2: Vec<f64>, gate_times: GateTimes) -> IrResult<Self> {
        if t1.len() != t2.len() {
            return Err(IrError::InvalidNoise(format!(
                "{} T1 values but {} T2 values",
                t1.len(),
                t2.len()
            )));
        }
        for (&a, &b) in t1.iter().zip(&t2) {
            ThermalRelaxation::new(a, b, 0.0)?;
        }
        Ok(Self { t1, t2, gate_times })
    }

    /// Number of qubits covered by the profile.
    pub fn num_qubits(&self) -> usize {
        self.t1.len()
    }

    /// Get the T1 time for a specific qubit, if known.
    pub fn qubit_t1(&self, qubit_index: usize) -> Option<f64> {
        self.t1.get(qubit_index).copied()
    }

    /// Get the T2 time for a specific qubit, if known.
    pub fn qubit_t2(&self, qubit_index: usize) -> Option<f64> {
        self.t2.get(qubit_index).copied()
    }

    /// Relaxation a qubit undergoes during `instruction`.
    ///
    /// Returns `None` for qubits outside the profile and for zero-duration
    /// instructions.
    pub fn relaxation(&self, qubit_index: usize, instruction: &Instruction) -> Option<ThermalRelaxation> {
        let time = self.gate_times.duration(DurationClass::of(instruction));
        if time == 0.0 {
            return None;
        }
        let t1 = self.qubit_t1(qubit_index)?;
        let t2 = self.qubit_t2(qubit_index)?;
        ThermalRelaxation::new(t1, t2, time).ok()
    }

    /// Check if this profile has any noise data at all.
    pub fn is_empty(&self) -> bool {
        self.t1.is_empty()
    }
}

impl std::fmt::Display for NoiseProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "NoiseModel: thermal_relaxation on {} qubit(s), instructions with noise: [",
            self.num_qubits()
        )?;
        let g = &self.gate_times;
        let mut first = true;
        for (name, time) in [
            ("u1", g.u1),
            ("u2", g.u2),
            ("u3", g.u3),
            ("cx", g.cx),
            ("reset", g.reset),
            ("measure", g.measure),
        ] {
            if time > 0.0 {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "'{name}'")?;
                first = false;
            }
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qubit::{ClbitId, QubitId};

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn test_duration_classes() {
        assert_eq!(DurationClass::of_gate(&StandardGate::Rz(0.3)), DurationClass::U1);
        assert_eq!(DurationClass::of_gate(&StandardGate::H), DurationClass::U2);
        assert_eq!(DurationClass::of_gate(&StandardGate::X), DurationClass::U3);
        assert_eq!(DurationClass::of_gate(&StandardGate::CP(0.5)), DurationClass::Cx);
        assert_eq!(
            DurationClass::of(&Instruction::measure(QubitId(0), ClbitId(0))),
            DurationClass::Measure
        );
        assert_eq!(
            DurationClass::of(&Instruction::barrier([QubitId(0)])),
            DurationClass::Free
        );
    }

    #[test]
    fn test_default_gate_times() {
        let g = GateTimes::default();
        assert_eq!(g.duration(DurationClass::U1), 0.0);
        assert_eq!(g.duration(DurationClass::U2), 50.0);
        assert_eq!(g.duration(DurationClass::U3), 100.0);
        assert_eq!(g.duration(DurationClass::Cx), 300.0);
        assert_eq!(g.duration(DurationClass::Reset), 1000.0);
        assert_eq!(g.duration(DurationClass::Measure), 1000.0);
    }

    #[test]
    fn test_thermal_relaxation_probabilities() {
        let ch = ThermalRelaxation::new(50e3, 70e3, 1000.0).unwrap();
        let expected_gamma = 1.0 - (-1000.0_f64 / 50e3).exp();
        assert!((ch.damping() - expected_gamma).abs() < TOLERANCE);

        let rate: f64 = 1.0 / 70e3 - 0.5 / 50e3;
        let expected_lambda = (1.0 - (-1000.0 * rate).exp()) / 2.0;
        assert!((ch.dephasing() - expected_lambda).abs() < TOLERANCE);
        assert!(!ch.is_identity());
    }

    #[test]
    fn test_t2_limit_has_no_pure_dephasing() {
        let ch = ThermalRelaxation::new(40e3, 80e3, 300.0).unwrap();
        assert!(ch.dephasing().abs() < TOLERANCE);
        assert!(ch.damping() > 0.0);
    }

    #[test]
    fn test_zero_time_is_identity() {
        let ch = ThermalRelaxation::new(50e3, 70e3, 0.0).unwrap();
        assert!(ch.is_identity());
    }

    #[test]
    fn test_invalid_relaxation() {
        assert!(ThermalRelaxation::new(0.0, 10.0, 1.0).is_err());
        assert!(ThermalRelaxation::new(10.0, -1.0, 1.0).is_err());
        assert!(ThermalRelaxation::new(10.0, 25.0, 1.0).is_err());
        assert!(ThermalRelaxation::new(10.0, 15.0, -1.0).is_err());
        assert!(ThermalRelaxation::new(10.0, 15.0, f64::NAN).is_err());
    }

    #[test]
    fn test_noise_profile_with_data() {
        let profile = NoiseProfile::new(
            vec![50e3, 45e3, 55e3],
            vec![30e3, 25e3, 35e3],
            GateTimes::default(),
        )
        .unwrap();

        assert!(!profile.is_empty());
        assert_eq!(profile.num_qubits(), 3);
        assert_eq!(profile.qubit_t1(1), Some(45e3));
        assert_eq!(profile.qubit_t2(2), Some(35e3));
        assert_eq!(profile.qubit_t1(99), None);

        let measure = Instruction::measure(QubitId(0), ClbitId(0));
        let ch = profile.relaxation(0, &measure).unwrap();
        assert_eq!(ch.time(), 1000.0);
        assert!(profile.relaxation(7, &measure).is_none());

        let z = Instruction::single_qubit_gate(StandardGate::Z, QubitId(0));
        assert!(profile.relaxation(0, &z).is_none());
    }

    #[test]
    fn test_noise_profile_rejects_mismatch() {
        assert!(NoiseProfile::new(vec![1.0], vec![], GateTimes::default()).is_err());
        assert!(NoiseProfile::new(vec![1.0], vec![3.0], GateTimes::default()).is_err());
    }

    #[test]
    fn test_noise_profile_display_and_serialization() {
        let profile = NoiseProfile::new(vec![50e3], vec![60e3], GateTimes::default()).unwrap();
        assert_eq!(
            profile.to_string(),
            "NoiseModel: thermal_relaxation on 1 qubit(s), instructions with noise: ['u2', 'u3', 'cx', 'reset', 'measure']"
        );

        let json = serde_json::to_string(&profile).unwrap();
        let back: NoiseProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile);
    }
}
