//! Single-qubit teleportation.

use num_complex::Complex64;
use rand::Rng;
use serde::Serialize;

use qlab_ir::{Circuit, ClassicalCondition, IrResult, StandardGate};

/// Real amplitudes of the state `α|0⟩ + β|1⟩` to teleport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TeleportInput {
    pub alpha: f64,
    pub beta: f64,
}

/// Random input with `α = sqrt(U(0,1))` and `β = sqrt(1 - α²)`.
pub fn random_input<R: Rng + ?Sized>(rng: &mut R) -> TeleportInput {
    let alpha: f64 = rng.gen_range(0.0..=1.0f64).sqrt();
    let beta = (1.0 - alpha * alpha).max(0.0).sqrt();
    TeleportInput { alpha, beta }
}

/// Teleport qubit 0 onto qubit 2.
///
/// Registers are `Qbit 0`, `Entangled Qbit 1`, `Entangled Qbit 2` and a
/// three-bit `c_bit`. The corrections on qubit 2 are conditioned on the
/// mid-circuit measurements, and qubit 2 is measured into `c_bit[2]`.
pub fn teleport_circuit(input: TeleportInput) -> IrResult<Circuit> {
    let mut circuit = Circuit::new("teleport");
    let q0 = circuit.add_qreg("Qbit 0", 1)?[0];
    let q1 = circuit.add_qreg("Entangled Qbit 1", 1)?[0];
    let q2 = circuit.add_qreg("Entangled Qbit 2", 1)?[0];
    let c = circuit.add_creg("c_bit", 3)?;

    circuit.initialize(
        Complex64::new(input.alpha, 0.0),
        Complex64::new(input.beta, 0.0),
        q0,
    )?;
    circuit.barrier_all()?;

    // Bell pair between qubits 1 and 2
    circuit.h(q1)?.cx(q1, q2)?;
    circuit.barrier_all()?;

    // Bell measurement of qubits 0 and 1
    circuit.cx(q0, q1)?.h(q0)?;
    circuit.barrier_all()?;
    circuit.measure(q0, c[0])?.measure(q1, c[1])?;

    circuit.gate_if(StandardGate::X, [q2], ClassicalCondition::is_set(c[1]))?;
    circuit.gate_if(StandardGate::Z, [q2], ClassicalCondition::is_set(c[0]))?;
    circuit.measure(q2, c[2])?;
    Ok(circuit)
}
