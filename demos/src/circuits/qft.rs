//! Quantum Fourier transform of a computational basis state.

use std::f64::consts::PI;

use qlab_ir::{Circuit, IrResult, QubitId};

/// Controlled-phase ladder of the QFT on the first `n` qubits.
///
/// For each `k` from `n` down to 1: `h(k-1)`, then
/// `cp(π / 2^(k-1-q), q, k-1)` for every `q < k-1`.
pub fn qft_rotations(circuit: &mut Circuit, n: u32) -> IrResult<()> {
    for k in (1..=n).rev() {
        let target = k - 1;
        circuit.h(QubitId(target))?;
        for q in 0..target {
            let angle = PI / 2f64.powi((target - q) as i32);
            circuit.cp(angle, QubitId(q), QubitId(target))?;
        }
    }
    Ok(())
}

/// Reverse qubit order: swap `q` with `n-q-1` for `q < n/2`.
pub fn swap_registers(circuit: &mut Circuit, n: u32) -> IrResult<()> {
    for q in 0..n / 2 {
        circuit.swap(QubitId(q), QubitId(n - q - 1))?;
    }
    Ok(())
}

/// Full QFT on the first `n` qubits.
pub fn qft(circuit: &mut Circuit, n: u32) -> IrResult<()> {
    qft_rotations(circuit, n)?;
    swap_registers(circuit, n)
}

/// Prepare `|number⟩` on as many qubits as `number` has binary digits
/// (one qubit for zero) and apply the QFT.
///
/// Returns the circuit and its width.
pub fn qft_circuit(number: u64) -> IrResult<(Circuit, u32)> {
    let width = (u64::BITS - number.leading_zeros()).max(1);
    let mut circuit = Circuit::with_size("qft", width, 0);
    for bit in 0..width {
        if (number >> bit) & 1 == 1 {
            circuit.x(QubitId(bit))?;
        }
    }
    qft(&mut circuit, width)?;
    Ok((circuit, width))
}
