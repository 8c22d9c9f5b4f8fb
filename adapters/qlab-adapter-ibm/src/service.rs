//! Account-level entry point: connect once, then inspect usage and pick a device.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::api::{BackendInfo, IbmClient, UsageReport};
use crate::backend::IbmBackend;
use crate::credentials::{AccountInfo, IbmCredentials};
use crate::error::{IbmError, IbmResult};

/// Pick the operational hardware device with the shortest queue.
///
/// Simulators and devices narrower than `min_qubits` are skipped. Ties on
/// queue length go to the alphabetically first name, unknown queue lengths
/// sort last.
pub fn least_busy(backends: &[BackendInfo], min_qubits: usize) -> Option<&BackendInfo> {
    backends
        .iter()
        .filter(|b| !b.simulator && b.status.operational && b.num_qubits >= min_qubits)
        .min_by(|a, b| {
            a.queue_length()
                .cmp(&b.queue_length())
                .then_with(|| a.name.cmp(&b.name))
        })
}

/// Connected IBM Quantum Platform account.
#[derive(Debug)]
pub struct IbmService {
    client: Arc<IbmClient>,
    account: AccountInfo,
}

impl IbmService {
    /// Authenticate with the given credentials.
    #[instrument(skip(credentials), fields(url = %credentials.url))]
    pub async fn connect(credentials: &IbmCredentials) -> IbmResult<Self> {
        let client = IbmClient::connect(credentials).await?;
        info!("authenticated with IBM Quantum Platform");
        Ok(Self {
            client: Arc::new(client),
            account: credentials.account(),
        })
    }

    /// Account settings in use, without secrets.
    pub fn account(&self) -> &AccountInfo {
        &self.account
    }

    /// Usage of the current instance.
    pub async fn usage(&self) -> IbmResult<UsageReport> {
        self.client.usage().await
    }

    /// All devices visible to the instance.
    pub async fn backends(&self) -> IbmResult<Vec<BackendInfo>> {
        self.client.list_backends().await
    }

    /// A named device.
    pub async fn backend(&self, name: &str) -> IbmResult<IbmBackend> {
        let info = self.client.get_backend(name).await?;
        Ok(IbmBackend::new(Arc::clone(&self.client), info))
    }

    /// The least busy device with at least `min_qubits` qubits.
    pub async fn least_busy(&self, min_qubits: usize) -> IbmResult<IbmBackend> {
        let backends = self.backends().await?;
        debug!(candidates = backends.len(), min_qubits, "selecting least busy device");
        let chosen = least_busy(&backends, min_qubits)
            .cloned()
            .ok_or(IbmError::NoSuitableBackend { min_qubits })?;
        info!(backend = %chosen.name, pending = ?chosen.status.pending_jobs, "selected device");
        Ok(IbmBackend::new(Arc::clone(&self.client), chosen))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::BackendStatus;

    fn device(name: &str, qubits: usize, pending: Option<u32>) -> BackendInfo {
        BackendInfo {
            name: name.into(),
            version: None,
            num_qubits: qubits,
            status: BackendStatus {
                operational: true,
                status_msg: None,
                pending_jobs: pending,
            },
            processor_type: None,
            basis_gates: vec![],
            simulator: false,
            max_shots: None,
            max_circuits: None,
            online_date: None,
            description: None,
        }
    }

    #[test]
    fn test_least_busy_picks_shortest_queue() {
        let backends = vec![
            device("ibm_a", 127, Some(40)),
            device("ibm_b", 127, Some(3)),
            device("ibm_c", 133, Some(17)),
        ];
        assert_eq!(least_busy(&backends, 64).unwrap().name, "ibm_b");
    }

    #[test]
    fn test_least_busy_filters() {
        let mut sim = device("simulator_x", 1000, Some(0));
        sim.simulator = true;
        let mut offline = device("ibm_offline", 127, Some(0));
        offline.status.operational = false;
        let small = device("ibm_small", 5, Some(0));
        let ok = device("ibm_ok", 127, Some(50));

        let backends = vec![sim, offline, small, ok];
        assert_eq!(least_busy(&backends, 8).unwrap().name, "ibm_ok");
        assert!(least_busy(&backends, 200).is_none());
        assert!(least_busy(&[], 1).is_none());
    }

    #[test]
    fn test_least_busy_ties_and_unknown_queue() {
        let backends = vec![
            device("ibm_z", 127, Some(2)),
            device("ibm_y", 127, Some(2)),
            device("ibm_unknown", 127, None),
        ];
        assert_eq!(least_busy(&backends, 1).unwrap().name, "ibm_y");

        let only_unknown = vec![device("ibm_unknown", 127, None)];
        assert_eq!(least_busy(&only_unknown, 1).unwrap().name, "ibm_unknown");
    }

    #[tokio::test]
    async fn test_connect_requires_credentials() {
        let err = IbmService::connect(&IbmCredentials::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IbmError::MissingToken));
    }
}
