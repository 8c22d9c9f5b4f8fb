//! Simulator backend implementation.

use async_trait::async_trait;
use num_complex::Complex64;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use qlab_hal::{
    Backend, BackendAvailability, Capabilities, ExecutionResult,
    HalError, HalResult, Job, JobId, JobStatus, ValidationResult, WaitPolicy,
};
use qlab_ir::{Circuit, NoiseProfile};

use crate::engine::{ExecutionPlan, final_statevector};

/// Default circuit width accepted by the simulator.
const DEFAULT_MAX_QUBITS: u32 = 128;
/// Default limit on qubits that must share one statevector.
const DEFAULT_MAX_BLOCK_QUBITS: u32 = 24;
/// Shot limit per job.
const MAX_SHOTS: u32 = 1_000_000;

/// Job data for the simulator.
struct SimJob {
    job: Job,
    result: Option<ExecutionResult>,
}

type JobTable = Arc<Mutex<FxHashMap<String, SimJob>>>;

/// Local simulator backend.
///
/// Circuits are split into independent qubit blocks (see the engine module),
/// so the width limit applies to entangled qubits rather than to the whole
/// circuit. Attach a [`NoiseProfile`] to run thermal relaxation trajectories.
pub struct SimulatorBackend {
    /// Backend name.
    name: String,
    /// Cached capabilities.
    capabilities: Capabilities,
    /// Active jobs.
    jobs: JobTable,
    /// Limit on qubits sharing one statevector.
    max_block_qubits: u32,
    /// Base seed; job `k` uses `seed + k`.
    seed: Option<u64>,
    /// Jobs submitted so far.
    submitted: AtomicU64,
}

impl SimulatorBackend {
    /// Create a new simulator backend with default settings.
    pub fn new() -> Self {
        Self::with_max_qubits(DEFAULT_MAX_QUBITS)
    }

    /// Create a simulator with custom max qubits.
    pub fn with_max_qubits(max_qubits: u32) -> Self {
        Self {
            name: "qlab_simulator".into(),
            capabilities: Capabilities::simulator(max_qubits).with_max_shots(MAX_SHOTS),
            jobs: Arc::new(Mutex::new(FxHashMap::default())),
            max_block_qubits: DEFAULT_MAX_BLOCK_QUBITS.min(max_qubits),
            seed: None,
            submitted: AtomicU64::new(0),
        }
    }

    /// Apply thermal relaxation noise to every job.
    #[must_use]
    pub fn with_noise(mut self, profile: NoiseProfile) -> Self {
        self.capabilities = self.capabilities.with_noise_profile(profile);
        self
    }

    /// Make sampling reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Limit the number of qubits simulated on one statevector.
    #[must_use]
    pub fn with_max_block_qubits(mut self, max_block_qubits: u32) -> Self {
        self.max_block_qubits = max_block_qubits;
        self
    }

    /// The noise profile applied to jobs, if any.
    pub fn noise(&self) -> Option<&NoiseProfile> {
        self.capabilities.noise_profile.as_ref()
    }

    /// Describe the simulator settings for display.
    pub fn configuration(&self, shots: u32) -> SimulatorConfiguration {
        SimulatorConfiguration {
            backend_name: self.name.clone(),
            backend_version: env!("CARGO_PKG_VERSION").to_string(),
            description: "local statevector simulator with thermal relaxation trajectories"
                .to_string(),
            shots,
            method: "statevector".to_string(),
            device: "CPU".to_string(),
            precision: "double".to_string(),
            n_qubits: self.capabilities.num_qubits,
            max_block_qubits: self.max_block_qubits,
            seed: self.seed,
            noise_model: self.noise().map(ToString::to_string),
        }
    }

    /// Exact final state of a measurement-free circuit.
    ///
    /// Amplitudes are little-endian (qubit 0 is the lowest index bit).
    #[instrument(skip(self, circuit), fields(circuit = circuit.name()))]
    pub fn statevector(&self, circuit: &Circuit) -> HalResult<Vec<Complex64>> {
        final_statevector(circuit, self.max_block_qubits as usize)
    }

    fn next_rng(&self) -> StdRng {
        let k = self.submitted.fetch_add(1, Ordering::SeqCst);
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(k)),
            None => StdRng::from_entropy(),
        }
    }

    fn check_shots(&self, shots: u32) -> HalResult<()> {
        if shots == 0 || shots > self.capabilities.max_shots {
            return Err(HalError::InvalidShots(format!(
                "{shots} (allowed: 1..={})",
                self.capabilities.max_shots
            )));
        }
        Ok(())
    }

    fn plan(&self, circuit: &Circuit) -> HalResult<ExecutionPlan> {
        if circuit.num_qubits() > self.capabilities.num_qubits as usize {
            return Err(HalError::CircuitTooLarge(format!(
                "Circuit has {} qubits but simulator only supports {}",
                circuit.num_qubits(),
                self.capabilities.num_qubits
            )));
        }
        ExecutionPlan::new(circuit, self.noise().is_some(), self.max_block_qubits as usize)
    }
}

/// A planned job handed to the blocking pool.
struct SimTask {
    jobs: JobTable,
    job_id: JobId,
    circuit: Circuit,
    plan: ExecutionPlan,
    noise: Option<NoiseProfile>,
    shots: u32,
    rng: StdRng,
    max_block_qubits: usize,
}

impl SimTask {
    /// Run the job and store its outcome unless it was cancelled meanwhile.
    fn execute(mut self) {
        {
            let mut table = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
            match table.get_mut(&self.job_id.0) {
                Some(entry) if !entry.job.status.is_terminal() => {
                    entry.job.transition(JobStatus::Running);
                }
                _ => return,
            }
        }

        let start = Instant::now();
        let counts = self.plan.run(self.shots, self.noise.as_ref(), &mut self.rng);
        let elapsed = start.elapsed();
        debug!(job = %self.job_id, ?elapsed, outcomes = counts.len(), "simulation finished");

        let mut result = ExecutionResult::new(counts, self.shots)
            .with_execution_time(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
            .with_metadata(serde_json::json!({
                "method": "statevector",
                "blocks": self.plan.num_blocks(),
                "widest_block": self.plan.widest_block(),
                "noise": self.noise.is_some(),
            }));
        if !self.circuit.instructions().iter().any(|i| i.is_measure()) {
            match final_statevector(&self.circuit, self.max_block_qubits) {
                Ok(amplitudes) => result = result.with_statevector(amplitudes),
                Err(e) => debug!(job = %self.job_id, "no statevector: {e}"),
            }
        }

        let mut table = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = table.get_mut(&self.job_id.0) {
            if entry.job.status.is_terminal() {
                return;
            }
            entry.job.transition(JobStatus::Completed);
            entry.result = Some(result);
        }
    }
}

impl Default for SimulatorBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for SimulatorBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn availability(&self) -> HalResult<BackendAvailability> {
        Ok(BackendAvailability::always_available())
    }

    async fn validate(&self, circuit: &Circuit) -> HalResult<ValidationResult> {
        let mut reasons = self.capabilities.check(circuit);
        if reasons.is_empty() {
            if let Err(e) = self.plan(circuit) {
                reasons.push(e.to_string());
            }
        }
        if reasons.is_empty() {
            Ok(ValidationResult::Valid)
        } else {
            Ok(ValidationResult::Invalid { reasons })
        }
    }

    #[instrument(skip(self, circuit), fields(circuit = circuit.name()))]
    async fn submit(&self, circuit: &Circuit, shots: u32) -> HalResult<JobId> {
        self.check_shots(shots)?;
        let plan = self.plan(circuit)?;

        let job_id = JobId::new(Uuid::new_v4().to_string());
        let job = Job::new(job_id.clone(), shots).with_backend(self.name.clone());
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job_id.0.clone(), SimJob { job, result: None });

        info!(job = %job_id, qubits = circuit.num_qubits(), shots, "submitted simulation");

        let task = SimTask {
            jobs: Arc::clone(&self.jobs),
            job_id: job_id.clone(),
            circuit: circuit.clone(),
            plan,
            noise: self.noise().cloned(),
            shots,
            rng: self.next_rng(),
            max_block_qubits: self.max_block_qubits as usize,
        };
        tokio::task::spawn_blocking(move || task.execute());

        Ok(job_id)
    }

    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus> {
        let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        jobs.get(&job_id.0)
            .map(|j| j.job.status.clone())
            .ok_or_else(|| HalError::JobNotFound(job_id.0.clone()))
    }

    /// Hand out a finished job's outcome and drop it from the job table.
    async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult> {
        let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = jobs.remove(&job_id.0) else {
            return Err(HalError::JobNotFound(job_id.0.clone()));
        };
        match (entry.job.status, entry.result) {
            (JobStatus::Completed, Some(result)) => Ok(result),
            (JobStatus::Cancelled, _) => Err(HalError::JobCancelled),
            (JobStatus::Failed(msg), _) => Err(HalError::JobFailed(msg)),
            (status, result) => {
                let err = HalError::Backend(format!("job {job_id} is not finished ({status})"));
                let job = Job { status, ..entry.job };
                jobs.insert(job_id.0.clone(), SimJob { job, result });
                Err(err)
            }
        }
    }

    async fn cancel(&self, job_id: &JobId) -> HalResult<()> {
        let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sim_job) = jobs.get_mut(&job_id.0) {
            sim_job.job.transition(JobStatus::Cancelled);
            Ok(())
        } else {
            Err(HalError::JobNotFound(job_id.0.clone()))
        }
    }

    fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            poll_interval: Duration::from_millis(5),
            max_polls: 120_000,
        }
    }
}

/// Simulator settings, printed before a fallback run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorConfiguration {
    /// Backend name.
    pub backend_name: String,
    /// Crate version.
    pub backend_version: String,
    /// One-line description.
    pub description: String,
    /// Shots per job.
    pub shots: u32,
    /// Simulation method.
    pub method: String,
    /// Execution device.
    pub device: String,
    /// Floating point precision.
    pub precision: String,
    /// Circuit width limit.
    pub n_qubits: u32,
    /// Entangled-qubit limit.
    pub max_block_qubits: u32,
    /// Sampling seed, when fixed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Noise model summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_model: Option<String>,
}

impl fmt::Display for SimulatorConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Backend Name: {}", self.backend_name)?;
        writeln!(f, "  Description: {}", self.description)?;
        writeln!(f, "  Version: {}", self.backend_version)?;
        writeln!(f, "  Shots: {}", self.shots)?;
        writeln!(f, "  Method: {}", self.method)?;
        writeln!(f, "  Device: {}", self.device)?;
        writeln!(f, "  Precision: {}", self.precision)?;
        writeln!(f, "  Max Qubits: {} ({} entangled)", self.n_qubits, self.max_block_qubits)?;
        if let Some(seed) = self.seed {
            writeln!(f, "  Seed: {seed}")?;
        }
        match &self.noise_model {
            Some(noise) => write!(f, "  Noise Model: {noise}"),
            None => write!(f, "  Noise Model: none"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qlab_ir::{ClbitId, GateTimes, QubitId};

    #[test]
    fn test_simulator_capabilities() {
        let backend = SimulatorBackend::new();
        let caps = backend.capabilities();

        assert!(caps.is_simulator);
        assert_eq!(caps.num_qubits, 128);
        assert_eq!(caps.max_shots, MAX_SHOTS);
    }

    #[tokio::test]
    async fn test_simulator_bell_state() {
        let backend = SimulatorBackend::new().with_seed(1);

        let circuit = Circuit::bell().unwrap();
        let job_id = backend.submit(&circuit, 1000).await.unwrap();
        let result = backend.wait(&job_id).await.unwrap();
        assert_eq!(result.shots, 1000);

        let counts = &result.counts;
        assert_eq!(counts.get("00") + counts.get("11"), 1000);
        assert_eq!(counts.get("01") + counts.get("10"), 0);
    }

    #[tokio::test]
    async fn test_seeded_runs_repeat() {
        let mut circuit = Circuit::with_size("coin", 3, 0);
        for q in 0..3 {
            circuit.h(QubitId(q)).unwrap();
        }
        circuit.measure_all().unwrap();

        let a = SimulatorBackend::new().with_seed(99);
        let b = SimulatorBackend::new().with_seed(99);
        let ra = a.run(&circuit, 200).await.unwrap();
        let rb = b.run(&circuit, 200).await.unwrap();
        assert_eq!(ra.counts, rb.counts);
    }

    #[tokio::test]
    async fn test_statevector_attached_without_measurements() {
        let backend = SimulatorBackend::new();
        let mut circuit = Circuit::with_size("x", 1, 0);
        circuit.x(QubitId(0)).unwrap();
        let result = backend.run(&circuit, 1).await.unwrap();
        assert!(result.counts.is_empty());
        let sv = result.statevector.unwrap();
        assert!((sv[1].re - 1.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_noisy_simulator_relaxes() {
        let slow = GateTimes {
            measure: 1e7,
            ..GateTimes::default()
        };
        let noise = NoiseProfile::new(vec![50.0], vec![50.0], slow).unwrap();
        let backend = SimulatorBackend::new().with_noise(noise).with_seed(3);

        let mut circuit = Circuit::with_size("decay", 1, 1);
        circuit.x(QubitId(0)).unwrap();
        circuit.measure(QubitId(0), ClbitId(0)).unwrap();
        let result = backend.run(&circuit, 100).await.unwrap();
        assert_eq!(result.counts.get("0"), 100);
        assert!(
            backend
                .configuration(100)
                .to_string()
                .contains("thermal_relaxation")
        );
    }

    #[tokio::test]
    async fn test_simulator_too_many_qubits() {
        let backend = SimulatorBackend::with_max_qubits(5);

        let circuit = Circuit::with_size("test", 10, 0);
        let result = backend.submit(&circuit, 100).await;

        assert!(matches!(result, Err(HalError::CircuitTooLarge(_))));
    }

    #[tokio::test]
    async fn test_invalid_shots() {
        let backend = SimulatorBackend::new();
        let circuit = Circuit::bell().unwrap();
        let err = backend.submit(&circuit, 0).await.unwrap_err();
        assert!(matches!(err, HalError::InvalidShots(_)));
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let backend = SimulatorBackend::new();
        let err = backend.status(&JobId::new("nope")).await.unwrap_err();
        assert!(matches!(err, HalError::JobNotFound(_)));
    }

    #[tokio::test]
    async fn test_collected_jobs_leave_the_table() {
        let backend = SimulatorBackend::new().with_seed(2);
        let circuit = Circuit::bell().unwrap();

        let job_id = backend.submit(&circuit, 50).await.unwrap();
        let result = backend.wait(&job_id).await.unwrap();
        assert_eq!(result.counts.total_shots(), 50);
        assert!(backend.jobs.lock().unwrap().is_empty());

        assert!(matches!(
            backend.status(&job_id).await,
            Err(HalError::JobNotFound(_))
        ));
        assert!(matches!(
            backend.result(&job_id).await,
            Err(HalError::JobNotFound(_))
        ));
    }
}
