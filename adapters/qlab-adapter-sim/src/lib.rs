//! QLab Local Statevector Simulator
//!
//! This crate is the local execution service behind the [`qlab_hal::Backend`]
//! trait. It runs shots on statevectors, supports mid-circuit measurement
//! and classically conditioned gates, and can apply thermal relaxation noise
//! sampled per qubit.
//!
//! # Features
//!
//! - **Block decomposition**: qubits that never interact are simulated on
//!   separate statevectors, so wide but shallow circuits (such as a random
//!   number generator over 64 qubits) stay cheap
//! - **Dynamic circuits**: measurement collapses the state; conditioned gates
//!   read the classical bits of the current shot
//! - **Thermal relaxation**: per-shot amplitude damping and dephasing
//!   trajectories driven by a [`qlab_ir::NoiseProfile`]
//! - **Statevector snapshots** for measurement-free circuits
//!
//! # Memory per entangled block
//!
//! | Qubits | Memory |
//! |--------|--------|
//! | 10 | ~16 KB |
//! | 20 | ~16 MB |
//! | 24 | ~256 MB |
//!
//! # Example
//!
//! ```ignore
//! use qlab_adapter_sim::{SimulatorBackend, ThermalParams, sample_thermal_profile};
//! use qlab_hal::Backend;
//! use qlab_ir::Circuit;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut rng = rand::thread_rng();
//!     let noise = sample_thermal_profile(2, &ThermalParams::default(), &mut rng)?;
//!     let backend = SimulatorBackend::new().with_noise(noise);
//!
//!     let circuit = Circuit::bell()?;
//!     let result = backend.run(&circuit, 1000).await?;
//!     println!("Results: {:?}", result.counts);
//!     Ok(())
//! }
//! ```

mod engine;
mod noise;
mod simulator;
mod statevector;

pub use noise::{ThermalParams, sample_thermal_profile};
pub use simulator::{SimulatorBackend, SimulatorConfiguration};
