//! QLab Circuit Intermediate Representation
//!
//! This crate provides the data structures the demo programs use to describe
//! quantum circuits before handing them to a backend.
//!
//! # Overview
//!
//! A [`Circuit`] is an ordered list of [`Instruction`]s over a set of qubits
//! and classical bits. Program order is kept as written, so gates that are
//! classically conditioned on a measurement run after that measurement.
//!
//! # Core Components
//!
//! - **Qubits and Classical Bits**: [`QubitId`], [`ClbitId`], optionally grouped
//!   into named registers
//! - **Gates**: [`StandardGate`] plus an optional [`ClassicalCondition`]
//! - **Instructions**: [`Instruction`] combining gates with their operands
//! - **Noise**: [`NoiseProfile`] and [`ThermalRelaxation`] parameters
//! - **Drawing**: [`draw`] renders a circuit as text
//!
//! # Example: Building a Bell State
//!
//! ```rust
//! use qlab_ir::{Circuit, ClbitId, QubitId};
//!
//! let mut circuit = Circuit::with_size("bell_state", 2, 2);
//!
//! circuit.h(QubitId(0)).unwrap();
//! circuit.cx(QubitId(0), QubitId(1)).unwrap();
//! circuit.measure(QubitId(0), ClbitId(0)).unwrap();
//! circuit.measure(QubitId(1), ClbitId(1)).unwrap();
//!
//! assert_eq!(circuit.num_qubits(), 2);
//! assert_eq!(circuit.depth(), 3);
//! ```
//!
//! # Example: Feed-forward
//!
//! ```rust
//! use qlab_ir::{Circuit, ClassicalCondition, ClbitId, QubitId, StandardGate};
//!
//! let mut circuit = Circuit::with_size("feed_forward", 2, 1);
//! circuit.h(QubitId(0)).unwrap();
//! circuit.measure(QubitId(0), ClbitId(0)).unwrap();
//! circuit
//!     .gate_if(StandardGate::X, [QubitId(1)], ClassicalCondition::is_set(ClbitId(0)))
//!     .unwrap();
//!
//! assert!(circuit.has_conditionals());
//! ```
//!
//! # Supported Gates
//!
//! | Gate | Qubits | Description |
//! |------|--------|-------------|
//! | `H` | 1 | Hadamard gate |
//! | `X`, `Y`, `Z` | 1 | Pauli gates |
//! | `S`, `Sdg`, `T`, `Tdg`, `SX` | 1 | Clifford+T gates |
//! | `Rx`, `Ry`, `Rz`, `P` | 1 | Rotation and phase gates |
//! | `U` | 1 | Universal single-qubit gate U(θ,φ,λ) |
//! | `CX`, `CY`, `CZ`, `CH` | 2 | Controlled gates |
//! | `CP` | 2 | Controlled phase |
//! | `Swap` | 2 | SWAP gate |
//! | `CCX` | 3 | Toffoli (CCNOT) gate |

pub mod circuit;
pub mod draw;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod noise;
pub mod qubit;

pub use circuit::Circuit;
pub use draw::{DrawOptions, draw_with};
pub use error::{IrError, IrResult};
pub use gate::{ClassicalCondition, Gate, StandardGate};
pub use instruction::{Instruction, InstructionKind};
pub use noise::{DurationClass, GateTimes, NoiseProfile, ThermalRelaxation};
pub use qubit::{Clbit, ClbitId, Qubit, QubitId};
