//! Error types for the IR crate.

use crate::qubit::{ClbitId, QubitId};
use thiserror::Error;

/// Errors that can occur while building circuits.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Qubit not found in circuit.
    #[error("Qubit {qubit:?} not found in circuit{}", format_gate_context(.gate_name))]
    QubitNotFound {
        /// The qubit that was not found.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Classical bit not found in circuit.
    #[error("Classical bit {clbit:?} not found in circuit{}", format_gate_context(.gate_name))]
    ClbitNotFound {
        /// The classical bit that was not found.
        clbit: ClbitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Gate requires different number of qubits.
    #[error("Gate '{gate_name}' requires {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Expected number of qubits.
        expected: u32,
        /// Actual number of qubits provided.
        got: u32,
    },

    /// Duplicate qubit in operation.
    #[error("Duplicate qubit {qubit:?} in operation{}", format_gate_context(.gate_name))]
    DuplicateQubit {
        /// The duplicate qubit.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Measurement operands are not paired one-to-one.
    #[error("Measurement needs one classical bit per qubit: {qubits} qubits, {clbits} clbits")]
    MeasureArity {
        /// Number of measured qubits.
        qubits: usize,
        /// Number of target classical bits.
        clbits: usize,
    },

    /// State vector passed to `initialize` is not a normalized one-qubit state.
    #[error("Invalid initial state: {0}")]
    InvalidState(String),

    /// Register with this name already exists.
    #[error("Register '{0}' already exists")]
    DuplicateRegister(String),

    /// Circuit would exceed the addressable qubit range.
    #[error("Circuit size {0} exceeds the supported maximum")]
    TooLarge(usize),

    /// Invalid noise parameters.
    #[error("Invalid noise parameter: {0}")]
    InvalidNoise(String),
}

/// Helper function to format optional gate context.
#[allow(clippy::ref_option)]
fn format_gate_context(gate_name: &Option<String>) -> String {
    match gate_name {
        Some(name) => format!(" (gate: {name})"),
        None => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_with_gate_context() {
        let err = IrError::QubitNotFound {
            qubit: QubitId(4),
            gate_name: Some("cx".into()),
        };
        assert_eq!(
            err.to_string(),
            "Qubit QubitId(4) not found in circuit (gate: cx)"
        );

        let err = IrError::ClbitNotFound {
            clbit: ClbitId(1),
            gate_name: None,
        };
        assert_eq!(err.to_string(), "Classical bit ClbitId(1) not found in circuit");
    }
}
