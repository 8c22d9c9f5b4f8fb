//! Random number generator circuit.

use qlab_ir::{Circuit, IrError, IrResult, QubitId};

/// Hadamard on every qubit, then measure all into `meas`.
///
/// Each shot yields `bit_length` independent fair bits.
pub fn qrng_circuit(bit_length: u32) -> IrResult<Circuit> {
    if bit_length == 0 {
        return Err(IrError::InvalidState(
            "a random number needs at least one bit".into(),
        ));
    }
    let mut circuit = Circuit::with_size("qrng", bit_length, 0);
    for i in 0..bit_length {
        circuit.h(QubitId(i))?;
    }
    circuit.measure_all()?;
    Ok(circuit)
}
