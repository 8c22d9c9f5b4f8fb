//! Random number generation with a remote device and a simulator fallback.
//!
//! [`generate`] tries two tiers in order:
//!
//! 1. **Remote**: connect, pick the least busy device, open a session, run
//!    one sampler job, close the session.
//! 2. **Simulator**: a local simulator with thermal relaxation noise drawn
//!    per qubit.
//!
//! Any remote error moves on to the simulator; a simulator error is final.
//! The outcome says which tier produced the counts and, for a fallback, why.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use qlab_adapter_ibm::{AccountInfo, BackendInfo, IbmBackend, IbmCredentials, IbmService, UsageReport};
use qlab_adapter_sim::{SimulatorBackend, SimulatorConfiguration, ThermalParams, sample_thermal_profile};
use qlab_hal::{Backend, Counts, ExecutionResult, HalError, HalResult, JobId, ValidationResult};
use qlab_ir::Circuit;

use crate::circuits::qrng_circuit;

/// What to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrngRequest {
    /// Width of the random number.
    pub bit_length: u32,
    /// Shots per tier.
    pub shots: u32,
    /// Skip the remote tier.
    pub force_simulator: bool,
}

impl QrngRequest {
    /// Request that tries the remote tier first.
    pub fn new(bit_length: u32, shots: u32) -> Self {
        Self {
            bit_length,
            shots,
            force_simulator: false,
        }
    }

    /// Skip the remote tier.
    #[must_use]
    pub fn simulator_only(mut self) -> Self {
        self.force_simulator = true;
        self
    }
}

/// Settings for the simulator tier.
#[derive(Debug, Clone, Default)]
pub struct SimulatorSettings {
    /// T1/T2 distribution of the emulated device.
    pub noise: ThermalParams,
    /// Seed for the noise draw and for shot sampling.
    pub seed: Option<u64>,
}

/// What the remote service reported after connecting.
#[derive(Debug, Clone)]
pub struct RemoteConnection {
    pub account: AccountInfo,
    pub usage: UsageReport,
    pub backend: BackendInfo,
}

/// Summary of a finished sampler job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteReport {
    /// Number of PUB results in the job.
    pub pub_count: usize,
    /// Classical registers present in the first PUB.
    pub registers: Vec<String>,
    /// Metadata of the first PUB.
    pub pub_metadata: serde_json::Value,
    /// Job level metadata.
    pub job_metadata: serde_json::Value,
}

impl RemoteReport {
    /// Read the report from an execution result's metadata.
    pub fn from_metadata(metadata: &serde_json::Value) -> Self {
        serde_json::from_value(metadata.clone()).unwrap_or_default()
    }
}

/// Remote execution service behind the first tier.
#[async_trait]
pub trait RemoteService: Send {
    /// Authenticate and choose a device with at least `min_qubits` qubits.
    async fn connect(&mut self, min_qubits: usize) -> HalResult<RemoteConnection>;

    /// Submit one job on the chosen device.
    async fn submit(&mut self, circuit: &Circuit, shots: u32) -> HalResult<JobId>;

    /// Wait for a submitted job.
    async fn collect(&mut self, job_id: &JobId) -> HalResult<ExecutionResult>;

    /// Release server-side resources. Called after every execution attempt.
    async fn close(&mut self) -> HalResult<()>;
}

/// Progress hooks for the user-facing report. All default to no-ops.
pub trait QrngObserver: Send {
    fn on_connected(&mut self, _connection: &RemoteConnection) {}
    fn on_job_created(&mut self, _job_id: &JobId) {}
    fn on_remote_result(&mut self, _report: &RemoteReport) {}
    fn on_fallback(&mut self, _reason: &FallbackReason) {}
    fn on_simulator(&mut self, _config: &SimulatorConfiguration) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl QrngObserver for NoopObserver {}

/// Why the simulator tier ran.
#[derive(Debug)]
pub enum FallbackReason {
    /// The user asked for the simulator.
    Forced,
    /// Authentication, usage lookup or device selection failed.
    ConnectFailed(HalError),
    /// Session, submission or the job itself failed.
    ExecutionFailed(HalError),
}

impl FallbackReason {
    /// The remote error, if the remote tier was attempted.
    pub fn remote_error(&self) -> Option<&HalError> {
        match self {
            Self::Forced => None,
            Self::ConnectFailed(e) | Self::ExecutionFailed(e) => Some(e),
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forced => write!(f, "simulator requested"),
            Self::ConnectFailed(e) => write!(f, "Failed to connect to IBM Quantum Runtime: {e}"),
            Self::ExecutionFailed(e) => {
                write!(f, "Error during execution on IBM Quantum Runtime: {e}")
            }
        }
    }
}

/// Counts and provenance of a successful run.
#[derive(Debug)]
pub enum QrngExecution {
    /// The remote device produced the counts.
    Remote {
        backend: String,
        job_id: JobId,
        circuit: Circuit,
        counts: Counts,
        report: RemoteReport,
    },
    /// The simulator produced the counts.
    SimulatorFallback {
        reason: FallbackReason,
        circuit: Circuit,
        counts: Counts,
        config: SimulatorConfiguration,
    },
}

impl QrngExecution {
    /// Measured outcomes.
    pub fn counts(&self) -> &Counts {
        match self {
            Self::Remote { counts, .. } | Self::SimulatorFallback { counts, .. } => counts,
        }
    }

    /// Logical circuit handed to the backend.
    ///
    /// The remote service transpiles to the device ISA on its side, so for
    /// remote runs this is not the circuit the hardware executed.
    pub fn circuit(&self) -> &Circuit {
        match self {
            Self::Remote { circuit, .. } | Self::SimulatorFallback { circuit, .. } => circuit,
        }
    }

    /// Heading to print above [`circuit`](Self::circuit).
    pub fn circuit_heading(&self) -> &'static str {
        match self {
            Self::Remote { .. } => {
                "Quantum circuit used (logical; transpiled to the device ISA server-side):"
            }
            Self::SimulatorFallback { .. } => "Quantum circuit used:",
        }
    }

    /// Whether the simulator tier produced the counts.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::SimulatorFallback { .. })
    }

    /// Name of the backend that ran the circuit.
    pub fn backend_name(&self) -> &str {
        match self {
            Self::Remote { backend, .. } => backend,
            Self::SimulatorFallback { config, .. } => &config.backend_name,
        }
    }
}

/// The simulator tier failed, so no counts exist.
#[derive(Debug, Error)]
#[error("{cause}")]
pub struct QrngError {
    /// Simulator (or circuit construction) failure.
    #[source]
    pub cause: HalError,
    /// Why the remote tier did not deliver, if it was attempted.
    pub remote: Option<HalError>,
}

/// Generate counts for a `bit_length`-bit random number.
///
/// The remote tier is attempted only when `remote` is given and the request
/// does not force the simulator. The remote session is closed after the
/// attempt whatever its outcome; a failing close is logged and ignored.
#[instrument(skip_all, fields(bits = request.bit_length, shots = request.shots))]
pub async fn generate(
    request: &QrngRequest,
    remote: Option<&mut dyn RemoteService>,
    settings: &SimulatorSettings,
    observer: &mut dyn QrngObserver,
) -> Result<QrngExecution, QrngError> {
    let circuit = qrng_circuit(request.bit_length).map_err(|e| QrngError {
        cause: e.into(),
        remote: None,
    })?;

    let reason = match remote {
        _ if request.force_simulator => FallbackReason::Forced,
        None => FallbackReason::ConnectFailed(HalError::BackendUnavailable(
            "no remote service configured".into(),
        )),
        Some(remote) => match run_remote(remote, &circuit, request, observer).await {
            Ok(execution) => return Ok(execution),
            Err(reason) => reason,
        },
    };

    if let Some(e) = reason.remote_error() {
        warn!(error = %e, "remote tier failed, falling back to simulator");
    }
    observer.on_fallback(&reason);

    match run_simulator(&circuit, request.shots, settings, observer).await {
        Ok((counts, config)) => Ok(QrngExecution::SimulatorFallback {
            reason,
            circuit,
            counts,
            config,
        }),
        Err(cause) => Err(QrngError {
            cause,
            remote: match reason {
                FallbackReason::Forced => None,
                FallbackReason::ConnectFailed(e) | FallbackReason::ExecutionFailed(e) => Some(e),
            },
        }),
    }
}

async fn run_remote(
    remote: &mut dyn RemoteService,
    circuit: &Circuit,
    request: &QrngRequest,
    observer: &mut dyn QrngObserver,
) -> Result<QrngExecution, FallbackReason> {
    let connection = remote
        .connect(request.bit_length as usize)
        .await
        .map_err(FallbackReason::ConnectFailed)?;
    observer.on_connected(&connection);

    let outcome = execute_remote(remote, circuit, request.shots, observer).await;
    if let Err(e) = remote.close().await {
        warn!(error = %e, "failed to close remote session");
    }
    let (job_id, result) = outcome.map_err(FallbackReason::ExecutionFailed)?;

    let report = RemoteReport::from_metadata(&result.metadata);
    observer.on_remote_result(&report);
    info!(backend = %connection.backend.name, job = %job_id, outcomes = result.counts.len(), "remote job finished");

    Ok(QrngExecution::Remote {
        backend: connection.backend.name,
        job_id,
        circuit: circuit.clone(),
        counts: result.counts,
        report,
    })
}

async fn execute_remote(
    remote: &mut dyn RemoteService,
    circuit: &Circuit,
    shots: u32,
    observer: &mut dyn QrngObserver,
) -> HalResult<(JobId, ExecutionResult)> {
    let job_id = remote.submit(circuit, shots).await?;
    observer.on_job_created(&job_id);

    let result = remote.collect(&job_id).await?;
    if result.counts.is_empty() {
        return Err(HalError::JobFailed(format!("job {job_id} returned no samples")));
    }
    Ok((job_id, result))
}

async fn run_simulator(
    circuit: &Circuit,
    shots: u32,
    settings: &SimulatorSettings,
    observer: &mut dyn QrngObserver,
) -> HalResult<(Counts, SimulatorConfiguration)> {
    let mut rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let noise = sample_thermal_profile(circuit.num_qubits(), &settings.noise, &mut rng)?;

    let mut backend = SimulatorBackend::new().with_noise(noise);
    if let Some(seed) = settings.seed {
        backend = backend.with_seed(seed);
    }
    let config = backend.configuration(shots);
    observer.on_simulator(&config);

    let result = backend.run(circuit, shots).await?;
    info!(outcomes = result.counts.len(), "simulator run finished");
    Ok((result.counts, config))
}

/// [`RemoteService`] backed by the IBM Quantum Platform.
pub struct IbmRemote {
    credentials: IbmCredentials,
    session_ttl: Duration,
    optimization_level: u8,
    backend: Option<IbmBackend>,
}

impl IbmRemote {
    /// Remote tier using `credentials`.
    pub fn new(credentials: IbmCredentials, session_ttl: Duration, optimization_level: u8) -> Self {
        Self {
            credentials,
            session_ttl,
            optimization_level,
            backend: None,
        }
    }

    fn backend(&self) -> HalResult<&IbmBackend> {
        self.backend
            .as_ref()
            .ok_or_else(|| HalError::Backend("not connected to a device".into()))
    }
}

#[async_trait]
impl RemoteService for IbmRemote {
    async fn connect(&mut self, min_qubits: usize) -> HalResult<RemoteConnection> {
        let service = IbmService::connect(&self.credentials).await?;
        let usage = service.usage().await?;
        let backend = service
            .least_busy(min_qubits)
            .await?
            .with_optimization_level(self.optimization_level);
        let info = backend.info().await?;
        self.backend = Some(backend);

        Ok(RemoteConnection {
            account: service.account().clone(),
            usage,
            backend: info,
        })
    }

    async fn submit(&mut self, circuit: &Circuit, shots: u32) -> HalResult<JobId> {
        let backend = self.backend()?;
        if let ValidationResult::Invalid { reasons } = backend.validate(circuit).await? {
            return Err(HalError::InvalidCircuit(reasons.join("; ")));
        }
        backend.open_session(self.session_ttl).await?;
        backend.submit(circuit, shots).await
    }

    async fn collect(&mut self, job_id: &JobId) -> HalResult<ExecutionResult> {
        self.backend()?.wait(job_id).await
    }

    async fn close(&mut self) -> HalResult<()> {
        match &self.backend {
            Some(backend) => Ok(backend.close_session().await?),
            None => Ok(()),
        }
    }
}
