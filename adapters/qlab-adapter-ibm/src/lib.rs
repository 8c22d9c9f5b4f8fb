//! IBM Quantum Platform adapter for QLab.
//!
//! Talks to the IBM Quantum Cloud REST API: IAM authentication, account
//! usage, device listing with least-busy selection, sessions, and Sampler V2
//! jobs submitted as OpenQASM 3.
//!
//! # Authentication
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `IBM_API_KEY` | IBM Cloud API key, exchanged for an IAM token |
//! | `IBM_SERVICE_CRN` | instance CRN, required with `IBM_API_KEY` |
//! | `IBM_QUANTUM_TOKEN` | pre-issued bearer token |
//! | `IBM_QUANTUM_URL` | API base URL override |
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use qlab_adapter_ibm::{IbmCredentials, IbmService};
//! use qlab_hal::Backend;
//!
//! let service = IbmService::connect(&IbmCredentials::from_env().await).await?;
//! let backend = service.least_busy(8).await?;
//! backend.open_session(Duration::from_secs(25 * 60)).await?;
//! let result = backend.run(&circuit, 4096).await;
//! backend.close_session().await?;
//! ```

mod api;
mod backend;
mod credentials;
mod error;
mod qasm;
mod service;

pub use api::{
    BackendInfo, BackendStatus, DEFAULT_ENDPOINT, IbmClient, InstanceUsage, ProcessorType,
    UsagePeriod, UsageReport,
};
pub use backend::{DEFAULT_OPTIMIZATION_LEVEL, IbmBackend};
pub use credentials::{AccountInfo, IbmCredentials};
pub use error::{IbmError, IbmResult};
pub use qasm::{ClassicalRegister, classical_registers, emit as emit_qasm3};
pub use service::{IbmService, least_busy};
