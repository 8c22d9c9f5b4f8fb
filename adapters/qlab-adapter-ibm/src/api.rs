//! IBM Quantum Platform REST client.
//!
//! Covers the calls the QRNG demo needs against `quantum.cloud.ibm.com/api`:
//! - IAM token exchange and refresh
//! - Backend listing (configuration + status per device)
//! - Usage report
//! - Sessions
//! - Sampler V2 jobs: submit, poll, fetch results, cancel

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use qlab_hal::CachedToken;

use crate::credentials::IbmCredentials;
use crate::error::{IbmError, IbmResult};

/// Default IBM Quantum Cloud API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://quantum.cloud.ibm.com/api";

/// IBM Cloud IAM token endpoint.
pub const IAM_TOKEN_URL: &str = "https://iam.cloud.ibm.com/identity/token";

/// IBM API version header value.
const IBM_API_VERSION: &str = "2026-02-01";

/// User-Agent sent with requests (Cloudflare blocks the default reqwest UA).
const USER_AGENT: &str = concat!("qlab/", env!("CARGO_PKG_VERSION"), " (quantum-demos)");

/// Refresh the IAM token when it expires within this many seconds.
const TOKEN_REFRESH_BUFFER_SECS: u64 = 60;

/// IBM Quantum API client.
pub struct IbmClient {
    client: Client,
    endpoint: String,
    iam_url: String,
    /// API key kept for token refresh; `None` for direct bearer tokens.
    api_key: Option<String>,
    service_crn: Option<String>,
    token: RwLock<CachedToken>,
}

impl fmt::Debug for IbmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IbmClient")
            .field("endpoint", &self.endpoint)
            .field("token", &"[REDACTED]")
            .field("service_crn", &self.service_crn)
            .finish_non_exhaustive()
    }
}

/// IAM token response from `iam.cloud.ibm.com`.
#[derive(Debug, Deserialize)]
struct IamTokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

fn http_client(verify: bool) -> IbmResult<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("application/json"),
    );

    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .danger_accept_invalid_certs(!verify)
        .timeout(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(10))
        .build()?)
}

/// Exchange an IBM Cloud API key for an IAM bearer token.
async fn exchange_api_key(client: &Client, iam_url: &str, api_key: &str) -> IbmResult<CachedToken> {
    let response = client
        .post(iam_url)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(format!(
            "grant_type=urn:ibm:params:oauth:grant-type:apikey&apikey={api_key}"
        ))
        .send()
        .await
        .map_err(|e| IbmError::IamTokenExchange(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "no body".to_string());
        return Err(IbmError::IamTokenExchange(format!(
            "IAM returned {status}: {body}"
        )));
    }

    let iam: IamTokenResponse = response
        .json()
        .await
        .map_err(|e| IbmError::IamTokenExchange(format!("failed to parse IAM response: {e}")))?;

    let mut token = match iam.expires_in {
        Some(secs) => CachedToken::from_expires_in(iam.access_token, secs),
        None => CachedToken::non_expiring(iam.access_token),
    };
    token.refresh_token = iam.refresh_token;
    Ok(token)
}

/// Map a non-success response body to an [`IbmError`].
///
/// IBM returns `{"errors": [{"code": .., "message": ..}], "trace": ..}`;
/// anything else is reported verbatim.
pub(crate) fn api_error(status: StatusCode, body: &str) -> IbmError {
    if status == StatusCode::UNAUTHORIZED {
        return IbmError::InvalidToken;
    }
    let message = serde_json::from_str::<ApiErrorResponse>(body)
        .ok()
        .and_then(|e| e.into_message())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body.trim().to_string()
            }
        });
    IbmError::ApiError {
        status: Some(status.as_u16()),
        message,
    }
}

async fn check(response: Response) -> IbmResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(api_error(status, &body))
}

/// Body of a Sampler V2 job with a single PUB.
pub(crate) fn sampler_job_body(
    backend: &str,
    qasm: &str,
    shots: u32,
    session_id: Option<&str>,
    optimization_level: u8,
) -> serde_json::Value {
    let mut body = serde_json::json!({
        "program_id": "sampler",
        "backend": backend,
        "params": {
            "version": 2,
            // PUB = (circuit, parameter values, shots)
            "pubs": [[qasm, {}, shots]],
            "options": {
                "optimization_level": optimization_level
            }
        }
    });
    if let Some(id) = session_id {
        body["session_id"] = serde_json::json!(id);
    }
    body
}

impl IbmClient {
    /// Connect with the given credentials.
    ///
    /// An API key is exchanged for an IAM token and requires the instance
    /// CRN; a bearer token is used as-is.
    pub async fn connect(credentials: &IbmCredentials) -> IbmResult<Self> {
        let client = http_client(credentials.verify)?;

        let token = match (&credentials.api_key, &credentials.token) {
            (Some(key), _) => {
                if credentials.instance.is_none() {
                    return Err(IbmError::MissingServiceCrn);
                }
                exchange_api_key(&client, &credentials.iam_url, key).await?
            }
            (None, Some(token)) => CachedToken::non_expiring(token.clone()),
            (None, None) => return Err(IbmError::MissingToken),
        };
        debug!(endpoint = %credentials.url, "connected to IBM Quantum Platform");

        Ok(Self {
            client,
            endpoint: credentials.url.trim_end_matches('/').to_string(),
            iam_url: credentials.iam_url.clone(),
            api_key: credentials.api_key.clone(),
            service_crn: credentials.instance.clone(),
            token: RwLock::new(token),
        })
    }

    /// Client with a fixed bearer token, without any network round trip.
    pub fn with_token(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        service_crn: Option<String>,
    ) -> IbmResult<Self> {
        Ok(Self {
            client: http_client(true)?,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            iam_url: IAM_TOKEN_URL.to_string(),
            api_key: None,
            service_crn,
            token: RwLock::new(CachedToken::non_expiring(token)),
        })
    }

    /// API base URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// `Authorization` header value, refreshing the IAM token when needed.
    async fn authorization(&self) -> IbmResult<String> {
        {
            let token = self.token.read().await;
            if self.api_key.is_none() || !token.expires_soon(TOKEN_REFRESH_BUFFER_SECS) {
                return Ok(token.authorization());
            }
        }

        let mut token = self.token.write().await;
        if token.expires_soon(TOKEN_REFRESH_BUFFER_SECS) {
            if let Some(key) = &self.api_key {
                debug!("refreshing IAM token");
                *token = exchange_api_key(&self.client, &self.iam_url, key).await?;
            }
        }
        Ok(token.authorization())
    }

    async fn request(&self, method: Method, path: &str) -> IbmResult<RequestBuilder> {
        let auth = self.authorization().await?;
        let auth =
            header::HeaderValue::from_str(&auth).map_err(|_| IbmError::InvalidToken)?;

        let mut builder = self
            .client
            .request(method, format!("{}{}", self.endpoint, path))
            .header(header::AUTHORIZATION, auth)
            .header("ibm-api-version", IBM_API_VERSION);
        if let Some(crn) = &self.service_crn {
            builder = builder.header("service-crn", crn);
        }
        Ok(builder)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> IbmResult<T> {
        let response = self.request(Method::GET, path).await?.send().await?;
        Ok(check(response).await?.json().await?)
    }

    /// List devices with their configuration and status.
    ///
    /// Devices whose details cannot be fetched are skipped with a warning.
    pub async fn list_backends(&self) -> IbmResult<Vec<BackendInfo>> {
        let devices: DevicesResponse = self.get_json("/v1/backends").await?;
        let mut backends = Vec::with_capacity(devices.devices.len());

        for device in &devices.devices {
            match self.get_backend(&device.name).await {
                Ok(info) => backends.push(info),
                Err(e) => warn!(backend = %device.name, error = %e, "skipping backend"),
            }
        }

        Ok(backends)
    }

    /// Fetch `/configuration` and `/status` of one backend.
    pub async fn get_backend(&self, name: &str) -> IbmResult<BackendInfo> {
        let config_path = format!("/v1/backends/{name}/configuration");
        let response = self.request(Method::GET, &config_path).await?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(IbmError::BackendUnavailable(name.to_string()));
        }
        let config: BackendConfigResponse = check(response).await?.json().await?;

        let status_path = format!("/v1/backends/{name}/status");
        let status = match self.get_json::<BackendStatusResponse>(&status_path).await {
            Ok(s) => BackendStatus {
                operational: s.state,
                status_msg: Some(if s.message.is_empty() { s.status } else { s.message }),
                pending_jobs: Some(u32::try_from(s.length_queue).unwrap_or(u32::MAX)),
            },
            Err(e) => {
                debug!(backend = name, error = %e, "status unavailable, assuming operational");
                BackendStatus {
                    operational: true,
                    status_msg: None,
                    pending_jobs: None,
                }
            }
        };

        Ok(BackendInfo::from_parts(config, status))
    }

    /// Usage of the current instance.
    pub async fn usage(&self) -> IbmResult<UsageReport> {
        self.get_json("/v1/usage").await
    }

    /// Open a dedicated session on `backend`.
    pub async fn create_session(&self, backend: &str, max_ttl: Duration) -> IbmResult<String> {
        let body = serde_json::json!({
            "backend": backend,
            "mode": "dedicated",
            "max_ttl": max_ttl.as_secs(),
        });
        let response = self
            .request(Method::POST, "/v1/sessions")
            .await?
            .json(&body)
            .send()
            .await?;
        let session: SessionResponse = check(response)
            .await
            .map_err(|e| IbmError::SessionFailed(e.to_string()))?
            .json()
            .await?;
        Ok(session.id)
    }

    /// Close a session; queued jobs inside it are cancelled by the service.
    pub async fn close_session(&self, session_id: &str) -> IbmResult<()> {
        let path = format!("/v1/sessions/{session_id}/close");
        let response = self.request(Method::DELETE, &path).await?.send().await?;
        check(response)
            .await
            .map_err(|e| IbmError::SessionFailed(e.to_string()))?;
        Ok(())
    }

    /// Submit one OpenQASM 3 circuit as a Sampler V2 job.
    pub async fn submit_sampler_job(
        &self,
        backend: &str,
        qasm: &str,
        shots: u32,
        session_id: Option<&str>,
        optimization_level: u8,
    ) -> IbmResult<SubmitResponse> {
        let body = sampler_job_body(backend, qasm, shots, session_id, optimization_level);
        let response = self
            .request(Method::POST, "/v1/jobs")
            .await?
            .json(&body)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Get job status.
    pub async fn get_job_status(&self, job_id: &str) -> IbmResult<JobStatusResponse> {
        let path = format!("/v1/jobs/{job_id}");
        let response = self.request(Method::GET, &path).await?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(IbmError::JobNotFound(job_id.to_string()));
        }
        Ok(check(response).await?.json().await?)
    }

    /// Get job results.
    pub async fn get_job_results(&self, job_id: &str) -> IbmResult<JobResultResponse> {
        let path = format!("/v1/jobs/{job_id}/results");
        let response = self.request(Method::GET, &path).await?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(IbmError::JobNotFound(job_id.to_string()));
        }
        Ok(check(response).await?.json().await?)
    }

    /// Cancel a job.
    pub async fn cancel_job(&self, job_id: &str) -> IbmResult<()> {
        let path = format!("/v1/jobs/{job_id}/cancel");
        let response = self.request(Method::POST, &path).await?.send().await?;
        check(response).await?;
        Ok(())
    }
}

// ============================================================================
// Response types
// ============================================================================

/// API error response.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    errors: Vec<ApiErrorEntry>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEntry {
    #[serde(default)]
    message: String,
}

impl ApiErrorResponse {
    fn into_message(self) -> Option<String> {
        let joined = self
            .errors
            .into_iter()
            .map(|e| e.message)
            .filter(|m| !m.is_empty())
            .collect::<Vec<_>>()
            .join("; ");
        if joined.is_empty() {
            self.message.filter(|m| !m.is_empty())
        } else {
            Some(joined)
        }
    }
}

/// Device list response (`{"devices": [...]}`).
#[derive(Debug, Deserialize)]
struct DevicesResponse {
    devices: Vec<DeviceEntry>,
}

#[derive(Debug, Deserialize)]
struct DeviceEntry {
    name: String,
}

/// Backend configuration from `/backends/{name}/configuration`.
#[derive(Debug, Deserialize)]
struct BackendConfigResponse {
    backend_name: String,
    #[serde(default)]
    backend_version: Option<String>,
    n_qubits: usize,
    #[serde(default)]
    basis_gates: Vec<String>,
    #[serde(default)]
    processor_type: Option<ProcessorType>,
    #[serde(default)]
    simulator: Option<bool>,
    #[serde(default)]
    max_shots: Option<u32>,
    #[serde(default)]
    max_experiments: Option<u32>,
    #[serde(default)]
    online_date: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Backend status from `/backends/{name}/status`.
#[derive(Debug, Deserialize)]
struct BackendStatusResponse {
    state: bool,
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    length_queue: u64,
}

/// Backend information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendInfo {
    /// Backend name.
    pub name: String,
    /// Backend version.
    #[serde(default)]
    pub version: Option<String>,
    /// Number of qubits.
    pub num_qubits: usize,
    /// Backend status.
    pub status: BackendStatus,
    /// Processor type.
    #[serde(default)]
    pub processor_type: Option<ProcessorType>,
    /// Basis gates.
    #[serde(default)]
    pub basis_gates: Vec<String>,
    /// Whether this is a simulator.
    #[serde(default)]
    pub simulator: bool,
    /// Maximum number of shots.
    #[serde(default)]
    pub max_shots: Option<u32>,
    /// Maximum number of circuits per job.
    #[serde(default)]
    pub max_circuits: Option<u32>,
    /// Date the device went online.
    #[serde(default)]
    pub online_date: Option<String>,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
}

impl BackendInfo {
    fn from_parts(config: BackendConfigResponse, status: BackendStatus) -> Self {
        Self {
            name: config.backend_name,
            version: config.backend_version,
            num_qubits: config.n_qubits,
            status,
            processor_type: config.processor_type,
            basis_gates: config.basis_gates,
            simulator: config.simulator.unwrap_or(false),
            max_shots: config.max_shots,
            max_circuits: config.max_experiments,
            online_date: config.online_date,
            description: config.description,
        }
    }

    /// Queue length, with unknown queues sorting last.
    pub fn queue_length(&self) -> u32 {
        self.status.pending_jobs.unwrap_or(u32::MAX)
    }
}

/// Backend status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendStatus {
    /// Whether the backend is operational.
    pub operational: bool,
    /// Status message.
    #[serde(default)]
    pub status_msg: Option<String>,
    /// Number of pending jobs.
    #[serde(default)]
    pub pending_jobs: Option<u32>,
}

/// Processor type information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorType {
    /// Family (e.g., "Eagle", "Heron").
    pub family: String,
    /// Revision.
    #[serde(default)]
    pub revision: Option<serde_json::Value>,
}

impl fmt::Display for ProcessorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.revision {
            Some(serde_json::Value::String(r)) => write!(f, "{} r{r}", self.family),
            Some(r) if !r.is_null() => write!(f, "{} r{r}", self.family),
            _ => write!(f, "{}", self.family),
        }
    }
}

/// Usage of the current instance, from `/v1/usage`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageReport {
    /// Accounting period.
    #[serde(default, alias = "usage_period")]
    pub period: Option<UsagePeriod>,
    /// Per-instance breakdown.
    #[serde(default, rename = "byInstance")]
    pub by_instance: Vec<InstanceUsage>,
    /// Instance the report is for.
    #[serde(default)]
    pub instance_id: Option<String>,
    /// Seconds consumed in this period.
    #[serde(default)]
    pub usage_consumed_seconds: Option<f64>,
    /// Seconds allowed in this period.
    #[serde(default)]
    pub usage_limit_seconds: Option<f64>,
    /// Seconds left in this period.
    #[serde(default)]
    pub usage_remaining_seconds: Option<f64>,
    /// Whether the limit has been hit.
    #[serde(default)]
    pub usage_limit_reached: Option<bool>,
}

/// Start and end of an accounting period.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsagePeriod {
    /// Period start.
    #[serde(default, alias = "start_time")]
    pub start: Option<String>,
    /// Period end.
    #[serde(default, alias = "end_time")]
    pub end: Option<String>,
}

/// Usage of one instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceUsage {
    /// Instance name or CRN.
    #[serde(default)]
    pub instance: String,
    /// Quota in seconds.
    #[serde(default)]
    pub quota: Option<f64>,
    /// Seconds used.
    #[serde(default)]
    pub usage: Option<f64>,
    /// Jobs waiting.
    #[serde(default, rename = "pendingJobs")]
    pub pending_jobs: Option<u32>,
    /// Cap on waiting jobs.
    #[serde(default, rename = "maxPendingJobs")]
    pub max_pending_jobs: Option<u32>,
}

impl fmt::Display for UsageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".into());
        let num = |v: Option<f64>| v.map_or_else(|| "-".into(), |x| format!("{x}"));

        if let Some(period) = &self.period {
            writeln!(f, "  Period Start: {}", show(&period.start))?;
            writeln!(f, "  Period End: {}", show(&period.end))?;
        }
        if let Some(id) = &self.instance_id {
            writeln!(f, "  Instance: {id}")?;
        }
        if self.usage_consumed_seconds.is_some() || self.usage_limit_seconds.is_some() {
            writeln!(f, "  Consumed (s): {}", num(self.usage_consumed_seconds))?;
            writeln!(f, "  Limit (s): {}", num(self.usage_limit_seconds))?;
            writeln!(f, "  Remaining (s): {}", num(self.usage_remaining_seconds))?;
        }
        for entry in &self.by_instance {
            writeln!(f, "  Instance: {}", entry.instance)?;
            writeln!(f, "    Quota: {}", num(entry.quota))?;
            writeln!(f, "    Usage: {}", num(entry.usage))?;
            writeln!(
                f,
                "    Pending Jobs: {}",
                entry.pending_jobs.map_or_else(|| "-".into(), |n| n.to_string())
            )?;
            writeln!(
                f,
                "    Max Pending Jobs: {}",
                entry.max_pending_jobs.map_or_else(|| "-".into(), |n| n.to_string())
            )?;
        }
        Ok(())
    }
}

/// Session creation response.
#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
}

/// Job submission response.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    /// Job ID.
    pub id: String,
    /// Job status.
    #[serde(default)]
    pub status: String,
}

/// Job status response.
#[derive(Debug, Clone, Deserialize)]
pub struct JobStatusResponse {
    /// Job ID.
    pub id: String,
    /// Job status (mixed case on the Cloud API).
    pub status: String,
    /// Backend name.
    #[serde(default)]
    pub backend: Option<String>,
    /// Session the job ran in.
    #[serde(default)]
    pub session_id: Option<String>,
    /// State object with reason.
    #[serde(default)]
    pub state: Option<JobState>,
}

/// Job state with reason.
#[derive(Debug, Clone, Deserialize)]
pub struct JobState {
    /// Status string.
    #[serde(default)]
    pub status: String,
    /// Reason for failure.
    #[serde(default)]
    pub reason: Option<String>,
    /// Reason code.
    #[serde(default)]
    pub reason_code: Option<u32>,
}

impl JobStatusResponse {
    fn normalized_status(&self) -> String {
        self.status.to_uppercase()
    }

    /// Check if job is waiting in the queue.
    pub fn is_queued(&self) -> bool {
        self.normalized_status() == "QUEUED"
    }

    /// Check if job completed successfully.
    pub fn is_completed(&self) -> bool {
        self.normalized_status() == "COMPLETED"
    }

    /// Check if job failed.
    pub fn is_failed(&self) -> bool {
        matches!(self.normalized_status().as_str(), "FAILED" | "ERROR")
    }

    /// Check if job was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.normalized_status() == "CANCELLED"
    }

    /// Failure reason, if any.
    pub fn error_message(&self) -> Option<String> {
        self.state.as_ref().and_then(|s| s.reason.clone())
    }
}

/// Job result response.
#[derive(Debug, Deserialize)]
pub struct JobResultResponse {
    /// One entry per PUB.
    pub results: Vec<SamplerResult>,
    /// Job-level metadata.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Sampler result for one PUB.
#[derive(Debug, Deserialize)]
pub struct SamplerResult {
    /// Classical register name to sampled values.
    #[serde(default)]
    pub data: HashMap<String, ClassicalRegisterData>,
    /// PUB metadata.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Samples of one classical register.
#[derive(Debug, Deserialize)]
pub struct ClassicalRegisterData {
    /// One hex string per shot, e.g. `["0x0", "0x2", ...]`.
    pub samples: Vec<String>,
    /// Register width when reported.
    #[serde(default)]
    pub num_bits: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(s: &str, reason: Option<&str>) -> JobStatusResponse {
        JobStatusResponse {
            id: "test".to_string(),
            status: s.to_string(),
            backend: None,
            session_id: None,
            state: Some(JobState {
                status: s.to_string(),
                reason: reason.map(String::from),
                reason_code: None,
            }),
        }
    }

    #[test]
    fn test_job_status_predicates() {
        let done = status("Completed", None);
        assert!(done.is_completed());
        assert!(!done.is_failed());

        let failed = status("Failed", Some("circuit too deep"));
        assert!(failed.is_failed());
        assert!(status("ERROR", None).is_failed());
        assert_eq!(failed.error_message().unwrap(), "circuit too deep");

        assert!(status("queued", None).is_queued());
        assert!(!status("Running", None).is_queued());
        assert!(status("CANCELLED", None).is_cancelled());
    }

    #[test]
    fn test_sampler_job_body() {
        let body = sampler_job_body("ibm_kyiv", "OPENQASM 3.0;", 4096, Some("sess-1"), 1);
        assert_eq!(body["program_id"], "sampler");
        assert_eq!(body["backend"], "ibm_kyiv");
        assert_eq!(body["session_id"], "sess-1");
        assert_eq!(body["params"]["version"], 2);
        assert_eq!(body["params"]["pubs"][0][0], "OPENQASM 3.0;");
        assert_eq!(body["params"]["pubs"][0][2], 4096);
        assert_eq!(body["params"]["options"]["optimization_level"], 1);

        let body = sampler_job_body("ibm_kyiv", "x", 1, None, 1);
        assert!(body.get("session_id").is_none());
    }

    #[test]
    fn test_api_error_parsing() {
        let err = api_error(
            StatusCode::BAD_REQUEST,
            r#"{"errors":[{"code":1234,"message":"bad backend"}],"trace":"abc"}"#,
        );
        assert!(matches!(
            err,
            IbmError::ApiError { status: Some(400), ref message } if message == "bad backend"
        ));

        let err = api_error(StatusCode::INTERNAL_SERVER_ERROR, "oops");
        assert!(err.to_string().contains("oops"));

        let err = api_error(StatusCode::BAD_GATEWAY, "");
        assert!(err.to_string().contains("502"));

        assert!(matches!(
            api_error(StatusCode::UNAUTHORIZED, "{}"),
            IbmError::InvalidToken
        ));
    }

    #[test]
    fn test_devices_response_deserialization() {
        let json = r#"{"devices": [
            {"name": "ibm_fez", "status": {"name": "online"}},
            {"name": "ibm_torino", "status": {"name": "online"}}
        ]}"#;
        let resp: DevicesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.devices.len(), 2);
        assert_eq!(resp.devices[1].name, "ibm_torino");
    }

    #[test]
    fn test_backend_info_from_configuration_and_status() {
        let config: BackendConfigResponse = serde_json::from_str(
            r#"{
                "backend_name": "ibm_torino",
                "backend_version": "1.2.3",
                "n_qubits": 133,
                "basis_gates": ["cz", "id", "rz", "sx", "x"],
                "processor_type": {"family": "Heron", "revision": 1},
                "simulator": false,
                "max_shots": 100000,
                "max_experiments": 300,
                "online_date": "2023-10-16T04:00:00Z",
                "description": "133 qubit device"
            }"#,
        )
        .unwrap();
        let status: BackendStatusResponse = serde_json::from_str(
            r#"{"state": true, "status": "active", "message": "", "length_queue": 12}"#,
        )
        .unwrap();
        assert_eq!(status.length_queue, 12);

        let info = BackendInfo::from_parts(
            config,
            BackendStatus {
                operational: status.state,
                status_msg: Some(status.status),
                pending_jobs: Some(12),
            },
        );
        assert_eq!(info.version.as_deref(), Some("1.2.3"));
        assert_eq!(info.max_circuits, Some(300));
        assert_eq!(info.queue_length(), 12);
        assert_eq!(info.processor_type.unwrap().to_string(), "Heron r1");
    }

    #[test]
    fn test_usage_report_both_shapes() {
        let platform: UsageReport = serde_json::from_str(
            r#"{
                "period": {"start": "2026-10-01", "end": "2026-10-31"},
                "byInstance": [{"instance": "open", "quota": 600, "usage": 12.5,
                                "pendingJobs": 1, "maxPendingJobs": 3}]
            }"#,
        )
        .unwrap();
        assert_eq!(platform.by_instance[0].max_pending_jobs, Some(3));
        let shown = platform.to_string();
        assert!(shown.contains("Period Start: 2026-10-01"));
        assert!(shown.contains("Pending Jobs: 1"));

        let cloud: UsageReport = serde_json::from_str(
            r#"{
                "instance_id": "crn:v1:x",
                "usage_period": {"start_time": "a", "end_time": "b"},
                "usage_consumed_seconds": 30,
                "usage_limit_seconds": 600,
                "usage_remaining_seconds": 570,
                "usage_limit_reached": false
            }"#,
        )
        .unwrap();
        assert_eq!(cloud.period.unwrap().end.as_deref(), Some("b"));
        assert_eq!(cloud.usage_remaining_seconds, Some(570.0));
    }

    #[test]
    fn test_v2_results_deserialization() {
        let json = r#"{
            "results": [{
                "data": {"meas": {"samples": ["0x0", "0x3", "0x1"], "num_bits": 2}},
                "metadata": {"circuit_metadata": {}}
            }],
            "metadata": {"version": 2}
        }"#;
        let resp: JobResultResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.results.len(), 1);
        let meas = &resp.results[0].data["meas"];
        assert_eq!(meas.samples.len(), 3);
        assert_eq!(meas.num_bits, Some(2));
    }

    #[test]
    fn test_client_debug_redacts_token() {
        let client = IbmClient::with_token("https://example.test/api/", "secret", None).unwrap();
        assert_eq!(client.endpoint(), "https://example.test/api");
        assert!(!format!("{client:?}").contains("secret"));
    }

    #[tokio::test]
    async fn test_connect_without_credentials_fails_fast() {
        let err = IbmClient::connect(&IbmCredentials::default()).await.unwrap_err();
        assert!(matches!(err, IbmError::MissingToken));

        let err = IbmClient::connect(&IbmCredentials::default().with_api_key("k"))
            .await
            .unwrap_err();
        assert!(matches!(err, IbmError::MissingServiceCrn));
    }
}
