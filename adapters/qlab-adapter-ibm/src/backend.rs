//! IBM Quantum backend implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use qlab_hal::{
    Backend, BackendAvailability, Capabilities, Counts, ExecutionResult, HalError, HalResult,
    JobId, JobStatus, ValidationResult, WaitPolicy,
};
use qlab_ir::Circuit;

use crate::api::{BackendInfo, ClassicalRegisterData, IbmClient, JobResultResponse, JobStatusResponse};
use crate::error::{IbmError, IbmResult};
use crate::qasm::{self, ClassicalRegister};

/// How long to cache backend info before refreshing from the API.
const BACKEND_INFO_TTL: Duration = Duration::from_secs(5 * 60);

/// Optimization level requested from the service-side transpiler.
pub const DEFAULT_OPTIMIZATION_LEVEL: u8 = 1;

/// Default shot limit when the device does not report one.
const DEFAULT_MAX_SHOTS: u32 = 100_000;

/// IBM Quantum backend adapter bound to one device.
pub struct IbmBackend {
    client: Arc<IbmClient>,
    target: String,
    capabilities: Capabilities,
    optimization_level: u8,
    /// Cached backend info with fetch timestamp for TTL-based refresh.
    backend_info: RwLock<(BackendInfo, Instant)>,
    /// Open session, if any; jobs are submitted into it.
    session: Mutex<Option<String>>,
    /// Classical register layout of each submitted job.
    layouts: Mutex<FxHashMap<String, Vec<ClassicalRegister>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl IbmBackend {
    /// Wrap a device returned by [`IbmClient::list_backends`].
    pub fn new(client: Arc<IbmClient>, info: BackendInfo) -> Self {
        let num_qubits = u32::try_from(info.num_qubits).unwrap_or(u32::MAX);
        let capabilities = Capabilities::device(&info.name, num_qubits, &info.basis_gates)
            .with_max_shots(info.max_shots.unwrap_or(DEFAULT_MAX_SHOTS));

        Self {
            client,
            target: info.name.clone(),
            capabilities,
            optimization_level: DEFAULT_OPTIMIZATION_LEVEL,
            backend_info: RwLock::new((info, Instant::now())),
            session: Mutex::new(None),
            layouts: Mutex::new(FxHashMap::default()),
        }
    }

    /// Set the transpiler optimization level.
    #[must_use]
    pub fn with_optimization_level(mut self, level: u8) -> Self {
        self.optimization_level = level;
        self
    }

    /// Target device name.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Transpiler optimization level sent with each job.
    pub fn optimization_level(&self) -> u8 {
        self.optimization_level
    }

    /// Backend information, refreshed from the API when stale.
    pub async fn info(&self) -> IbmResult<BackendInfo> {
        {
            let cached = self.backend_info.read().await;
            if cached.1.elapsed() < BACKEND_INFO_TTL {
                return Ok(cached.0.clone());
            }
        }

        let info = self.client.get_backend(&self.target).await?;
        *self.backend_info.write().await = (info.clone(), Instant::now());
        Ok(info)
    }

    /// Open a dedicated session; later submissions run inside it.
    #[instrument(skip(self), fields(backend = %self.target))]
    pub async fn open_session(&self, max_ttl: Duration) -> IbmResult<String> {
        let id = self.client.create_session(&self.target, max_ttl).await?;
        info!(session = %id, "session opened");
        *lock(&self.session) = Some(id.clone());
        Ok(id)
    }

    /// Id of the open session.
    pub fn session_id(&self) -> Option<String> {
        lock(&self.session).clone()
    }

    /// Close the open session, if any.
    pub async fn close_session(&self) -> IbmResult<()> {
        let Some(id) = lock(&self.session).take() else {
            return Ok(());
        };
        self.client.close_session(&id).await?;
        info!(session = %id, "session closed");
        Ok(())
    }
}

/// Map the service's job state onto a HAL status.
fn job_status(status: &JobStatusResponse) -> JobStatus {
    if status.is_completed() {
        JobStatus::Completed
    } else if status.is_failed() {
        JobStatus::Failed(
            status
                .error_message()
                .unwrap_or_else(|| "Unknown error".to_string()),
        )
    } else if status.is_cancelled() {
        JobStatus::Cancelled
    } else if status.is_queued() {
        JobStatus::Queued
    } else {
        // VALIDATING, RUNNING and anything new
        JobStatus::Running
    }
}

/// Significant bits in a hex sample such as `"0x1a"`.
fn hex_bit_length(hex: &str) -> usize {
    let hex = hex.strip_prefix("0x").unwrap_or(hex).trim_start_matches('0');
    match hex.chars().next().and_then(|c| c.to_digit(16)) {
        Some(first) => (hex.len() - 1) * 4 + (32 - first.leading_zeros() as usize),
        None => 0,
    }
}

/// Infer a register width from its samples when the service does not report it.
///
/// Uses the bit length of the largest sample, at least one bit.
fn infer_bit_width(samples: &[String]) -> usize {
    samples
        .iter()
        .map(|s| hex_bit_length(s))
        .max()
        .unwrap_or(0)
        .max(1)
}

/// Convert a hex sample to a binary string of exactly `width` bits.
///
/// Handles registers wider than any integer type. Bits above `width` are
/// dropped.
fn hex_to_binary(hex: &str, width: usize) -> IbmResult<String> {
    let digits = hex.strip_prefix("0x").unwrap_or(hex);
    let mut bits = String::with_capacity(digits.len() * 4);
    for c in digits.chars() {
        let value = c
            .to_digit(16)
            .ok_or_else(|| IbmError::InvalidParameter(format!("invalid sample '{hex}'")))?;
        bits.push_str(&format!("{value:04b}"));
    }
    if bits.len() >= width {
        Ok(bits.split_off(bits.len() - width))
    } else {
        Ok(format!("{bits:0>width$}"))
    }
}

/// Aggregate per-shot samples into counts.
///
/// Registers are concatenated with the last declared register leftmost, so
/// bitstrings follow clbit order. Without a known layout every returned
/// register is used, ordered by name.
fn results_to_counts(
    data: &HashMap<String, ClassicalRegisterData>,
    layout: Option<&[ClassicalRegister]>,
) -> IbmResult<Counts> {
    let registers: Vec<(&ClassicalRegisterData, usize)> = match layout {
        Some(layout) => layout
            .iter()
            .filter(|r| r.width > 0)
            .map(|r| {
                data.get(&r.name).map(|d| (d, r.width)).ok_or_else(|| IbmError::ApiError {
                    status: None,
                    message: format!("result has no data for register '{}'", r.name),
                })
            })
            .collect::<IbmResult<_>>()?,
        None => {
            let mut names: Vec<&String> = data.keys().collect();
            names.sort();
            names
                .into_iter()
                .map(|n| {
                    let d = &data[n];
                    (d, d.num_bits.unwrap_or_else(|| infer_bit_width(&d.samples)))
                })
                .collect()
        }
    };

    let shots = registers.first().map_or(0, |(d, _)| d.samples.len());
    if registers.iter().any(|(d, _)| d.samples.len() != shots) {
        return Err(IbmError::ApiError {
            status: None,
            message: "registers report different shot counts".into(),
        });
    }

    let mut counts = Counts::new();
    for shot in 0..shots {
        let mut bitstring = String::new();
        for (data, width) in registers.iter().rev() {
            bitstring.push_str(&hex_to_binary(&data.samples[shot], *width)?);
        }
        counts.record(bitstring);
    }
    Ok(counts)
}

/// Build the execution result for the first PUB of a job.
fn execution_result(
    response: &JobResultResponse,
    layout: Option<&[ClassicalRegister]>,
) -> IbmResult<ExecutionResult> {
    let first = response.results.first().ok_or_else(|| IbmError::ApiError {
        status: None,
        message: "job returned no PUB results".into(),
    })?;

    let counts = results_to_counts(&first.data, layout)?;
    let shots = u32::try_from(counts.total_shots()).unwrap_or(u32::MAX);

    let mut registers: Vec<&String> = first.data.keys().collect();
    registers.sort();
    let metadata = serde_json::json!({
        "pub_count": response.results.len(),
        "registers": registers,
        "pub_metadata": first.metadata,
        "job_metadata": response.metadata,
    });

    Ok(ExecutionResult::new(counts, shots).with_metadata(metadata))
}

#[async_trait]
impl Backend for IbmBackend {
    fn name(&self) -> &str {
        &self.target
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn availability(&self) -> HalResult<BackendAvailability> {
        match self.info().await {
            Ok(info) if info.status.operational => Ok(BackendAvailability {
                is_available: true,
                queue_depth: info.status.pending_jobs,
                estimated_wait: None,
                status_message: info.status.status_msg,
            }),
            Ok(info) => Ok(BackendAvailability::unavailable(
                info.status
                    .status_msg
                    .unwrap_or_else(|| "backend offline".to_string()),
            )),
            Err(e) => {
                warn!(backend = %self.target, error = %e, "availability check failed");
                Ok(BackendAvailability::unavailable("failed to query backend"))
            }
        }
    }

    async fn validate(&self, circuit: &Circuit) -> HalResult<ValidationResult> {
        let mut reasons = self.capabilities.check(circuit);
        if let Err(e) = qasm::emit(circuit) {
            reasons.push(e.to_string());
        }
        if reasons.is_empty() {
            Ok(ValidationResult::Valid)
        } else {
            Ok(ValidationResult::Invalid { reasons })
        }
    }

    #[instrument(skip(self, circuit), fields(backend = %self.target, qubits = circuit.num_qubits()))]
    async fn submit(&self, circuit: &Circuit, shots: u32) -> HalResult<JobId> {
        let info = self.info().await?;
        if circuit.num_qubits() > info.num_qubits {
            return Err(IbmError::TooManyQubits {
                required: circuit.num_qubits(),
                available: info.num_qubits,
            }
            .into());
        }
        if !info.status.operational {
            return Err(HalError::BackendUnavailable(
                info.status
                    .status_msg
                    .unwrap_or_else(|| "Backend offline".to_string()),
            ));
        }
        if shots == 0 || shots > self.capabilities.max_shots {
            return Err(HalError::InvalidShots(format!(
                "{shots} (allowed 1..={})",
                self.capabilities.max_shots
            )));
        }

        let qasm = qasm::emit(circuit)?;
        debug!(bytes = qasm.len(), "circuit serialized");

        let session = self.session_id();
        let response = self
            .client
            .submit_sampler_job(
                &self.target,
                &qasm,
                shots,
                session.as_deref(),
                self.optimization_level,
            )
            .await
            .map_err(|e| HalError::SubmissionFailed(e.to_string()))?;

        lock(&self.layouts).insert(response.id.clone(), qasm::classical_registers(circuit));
        info!(job = %response.id, "job submitted");
        Ok(JobId(response.id))
    }

    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus> {
        let status = self.client.get_job_status(&job_id.0).await?;
        Ok(job_status(&status))
    }

    async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult> {
        let response = self.client.get_job_results(&job_id.0).await?;
        let layout = lock(&self.layouts).remove(&job_id.0);
        Ok(execution_result(&response, layout.as_deref())?)
    }

    async fn cancel(&self, job_id: &JobId) -> HalResult<()> {
        self.client.cancel_job(&job_id.0).await?;
        Ok(())
    }

    /// 2s poll for up to 2 hours; device queues are long.
    fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            poll_interval: Duration::from_secs(2),
            max_polls: 3600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{BackendStatus, JobState};

    fn register(samples: &[&str], num_bits: Option<usize>) -> ClassicalRegisterData {
        ClassicalRegisterData {
            samples: samples.iter().map(|s| (*s).to_string()).collect(),
            num_bits,
        }
    }

    fn device(name: &str, qubits: usize) -> BackendInfo {
        BackendInfo {
            name: name.into(),
            version: None,
            num_qubits: qubits,
            status: BackendStatus {
                operational: true,
                status_msg: Some("active".into()),
                pending_jobs: Some(0),
            },
            processor_type: None,
            basis_gates: vec!["cz".into(), "rz".into(), "sx".into(), "x".into()],
            simulator: false,
            max_shots: Some(10_000),
            max_circuits: None,
            online_date: None,
            description: None,
        }
    }

    #[test]
    fn test_hex_to_binary() {
        assert_eq!(hex_to_binary("0x0", 2).unwrap(), "00");
        assert_eq!(hex_to_binary("0x3", 2).unwrap(), "11");
        assert_eq!(hex_to_binary("0x5", 4).unwrap(), "0101");
        assert_eq!(hex_to_binary("0xff", 8).unwrap(), "11111111");
        assert_eq!(hex_to_binary("0x1f", 3).unwrap(), "111");
        assert!(hex_to_binary("0xzz", 3).is_err());
    }

    #[test]
    fn test_hex_to_binary_wider_than_u128() {
        let hex = format!("0x1{}", "0".repeat(40));
        let bits = hex_to_binary(&hex, 170).unwrap();
        assert_eq!(bits.len(), 170);
        assert_eq!(bits.find('1'), Some(170 - 161));
    }

    #[test]
    fn test_infer_bit_width() {
        let samples = |v: &[&str]| v.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
        assert_eq!(infer_bit_width(&samples(&["0x0", "0x0"])), 1);
        assert_eq!(infer_bit_width(&samples(&["0x0", "0x3", "0x1"])), 2);
        assert_eq!(infer_bit_width(&samples(&["0x8"])), 4);
        assert_eq!(infer_bit_width(&samples(&["0x10"])), 5);
    }

    #[test]
    fn test_counts_keep_observation_order_and_width() {
        let mut data = HashMap::new();
        data.insert("meas".to_string(), register(&["0x2", "0x0", "0x2", "0x1"], None));
        let layout = [ClassicalRegister {
            name: "meas".into(),
            width: 3,
        }];

        let counts = results_to_counts(&data, Some(&layout)).unwrap();
        assert_eq!(counts.keys().collect::<Vec<_>>(), vec!["010", "000", "001"]);
        assert_eq!(counts.get("010"), 2);
        assert_eq!(counts.total_shots(), 4);
    }

    #[test]
    fn test_counts_concatenate_registers_in_clbit_order() {
        let mut data = HashMap::new();
        data.insert("a".to_string(), register(&["0x1", "0x0"], Some(1)));
        data.insert("b".to_string(), register(&["0x2", "0x3"], Some(2)));
        let layout = [
            ClassicalRegister {
                name: "a".into(),
                width: 1,
            },
            ClassicalRegister {
                name: "b".into(),
                width: 2,
            },
        ];

        let counts = results_to_counts(&data, Some(&layout)).unwrap();
        assert_eq!(counts.get("101"), 1);
        assert_eq!(counts.get("110"), 1);

        let unknown = results_to_counts(&data, None).unwrap();
        assert_eq!(unknown.get("101"), 1);
    }

    #[test]
    fn test_missing_register_is_an_error() {
        let data = HashMap::new();
        let layout = [ClassicalRegister {
            name: "meas".into(),
            width: 2,
        }];
        assert!(results_to_counts(&data, Some(&layout)).is_err());
    }

    #[test]
    fn test_execution_result_metadata() {
        let response: JobResultResponse = serde_json::from_str(
            r#"{"results": [{"data": {"meas": {"samples": ["0x1", "0x1"]}},
                             "metadata": {"shots": 2}}],
                "metadata": {"execution": {}}}"#,
        )
        .unwrap();
        let result = execution_result(&response, None).unwrap();
        assert_eq!(result.shots, 2);
        assert_eq!(result.counts.get("1"), 2);
        assert_eq!(result.metadata["pub_count"], 1);
        assert_eq!(result.metadata["registers"][0], "meas");
        assert_eq!(result.metadata["pub_metadata"]["shots"], 2);
    }

    #[test]
    fn test_job_status_mapping() {
        let status = |s: &str, reason: Option<&str>| JobStatusResponse {
            id: "j".into(),
            status: s.into(),
            backend: None,
            session_id: None,
            state: Some(JobState {
                status: s.into(),
                reason: reason.map(String::from),
                reason_code: None,
            }),
        };
        assert_eq!(job_status(&status("Queued", None)), JobStatus::Queued);
        assert_eq!(job_status(&status("Validating", None)), JobStatus::Running);
        assert_eq!(job_status(&status("Running", None)), JobStatus::Running);
        assert_eq!(job_status(&status("Completed", None)), JobStatus::Completed);
        assert_eq!(job_status(&status("Cancelled", None)), JobStatus::Cancelled);
        assert_eq!(
            job_status(&status("Failed", Some("too deep"))),
            JobStatus::Failed("too deep".into())
        );
        assert_eq!(
            job_status(&status("ERROR", None)),
            JobStatus::Failed("Unknown error".into())
        );
        assert_eq!(job_status(&status("QUEUED", None)), JobStatus::Queued);
    }

    #[tokio::test]
    async fn test_backend_reports_device_capabilities() {
        let client = Arc::new(IbmClient::with_token("https://example.test/api", "t", None).unwrap());
        let backend = IbmBackend::new(client, device("ibm_test", 5));
        assert_eq!(backend.name(), "ibm_test");
        assert_eq!(backend.capabilities().num_qubits, 5);
        assert_eq!(backend.capabilities().max_shots, 10_000);
        assert!(!backend.capabilities().is_simulator);
        assert!(backend.session_id().is_none());
        // Nothing to close, no request is made.
        backend.close_session().await.unwrap();

        let mut wide = Circuit::with_size("wide", 6, 0);
        wide.measure_all().unwrap();
        let validation = backend.validate(&wide).await.unwrap();
        assert!(!validation.is_valid());

        let availability = backend.availability().await.unwrap();
        assert!(availability.is_available);
        assert_eq!(availability.queue_depth, Some(0));
    }
}
