//! Circuit builders for the demo programs.

pub mod qft;
pub mod qrng;
pub mod teleport;

pub use qft::{qft, qft_circuit, qft_rotations, swap_registers};
pub use qrng::qrng_circuit;
pub use teleport::{TeleportInput, random_input, teleport_circuit};
