//! QLab Hardware Abstraction Layer
//!
//! This crate provides the interface the demo programs use to run circuits,
//! whether on the local simulator or on a remote quantum processor.
//!
//! # Overview
//!
//! - A common [`Backend`] trait for job submission and management
//! - [`Capabilities`] to describe hardware features and constraints
//! - Token handling for remote providers ([`TokenProvider`], [`CachedToken`])
//! - Unified result handling via [`ExecutionResult`] and [`Counts`]
//!
//! # Backends
//!
//! | Backend | Crate | Authentication |
//! |---------|-------|----------------|
//! | Local Simulator | `qlab-adapter-sim` | None |
//! | IBM Quantum Platform | `qlab-adapter-ibm` | `IBM_API_KEY` or `IBM_QUANTUM_TOKEN` env var |
//!
//! # Example: Running a Circuit
//!
//! ```ignore
//! use qlab_hal::Backend;
//! use qlab_adapter_sim::SimulatorBackend;
//! use qlab_ir::Circuit;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let circuit = Circuit::bell()?;
//!     let backend = SimulatorBackend::new();
//!
//!     let job_id = backend.submit(&circuit, 1000).await?;
//!     let result = backend.wait(&job_id).await?;
//!
//!     if let Some((bitstring, count)) = result.counts.most_frequent() {
//!         println!("Most frequent: {} ({} times)", bitstring, count);
//!     }
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod backend;
pub mod capability;
pub mod error;
pub mod job;
pub mod result;

pub use auth::{CachedToken, EnvTokenProvider, TokenProvider};
pub use backend::{Backend, BackendAvailability, ValidationResult, WaitPolicy};
pub use capability::{
    Capabilities, FEATURE_DYNAMIC_CIRCUITS, FEATURE_MID_CIRCUIT_MEASUREMENT, FEATURE_STATEVECTOR,
    GateSet,
};
pub use error::{HalError, HalResult};
pub use job::{Job, JobId, JobStatus};
pub use result::{Counts, ExecutionResult};
