//! Mock cluster for testing
//!
//! Stores workloads and configuration in memory, useful for unit tests
//! without requiring a Kubernetes cluster.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use super::{ClusterClient, ClusterCondition, InfrastructureConfig, ProxyConfig};
use crate::error::{KubeError, Result};
use crate::workload::{Workload, WorkloadKind};

type ObjectKey = (WorkloadKind, String, String);

/// In-memory cluster for testing
#[derive(Clone, Default)]
pub struct MockCluster {
    state: Arc<RwLock<MockState>>,
    /// Track operation counts for assertions
    operations: Arc<RwLock<OperationCounts>>,
}

#[derive(Default)]
struct MockState {
    objects: HashMap<ObjectKey, Workload>,
    proxy: Option<ProxyConfig>,
    infrastructure: Option<InfrastructureConfig>,
    feature_set: Option<String>,
    upgradeable: Option<ClusterCondition>,
    config_failure: Option<String>,
    submit_failure: Option<String>,
    latency: Option<Duration>,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub config_reads: usize,
    pub gets: usize,
    pub submits: usize,
}

impl MockCluster {
    /// Create a new empty cluster
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cluster proxy configuration
    pub fn with_proxy(self, proxy: ProxyConfig) -> Self {
        self.state.write().unwrap().proxy = Some(proxy);
        self
    }

    /// Set the cluster infrastructure configuration
    pub fn with_infrastructure(self, infrastructure: InfrastructureConfig) -> Self {
        self.state.write().unwrap().infrastructure = Some(infrastructure);
        self
    }

    /// Set the feature set enabled by the FeatureGate
    pub fn with_feature_set(self, feature_set: impl Into<String>) -> Self {
        self.state.write().unwrap().feature_set = Some(feature_set.into());
        self
    }

    /// Set the cluster version `Upgradeable` condition
    pub fn with_upgradeable(self, condition: ClusterCondition) -> Self {
        self.state.write().unwrap().upgradeable = Some(condition);
        self
    }

    /// Make every configuration read fail with `message`
    pub fn with_config_failure(self, message: impl Into<String>) -> Self {
        self.state.write().unwrap().config_failure = Some(message.into());
        self
    }

    /// Make every submission fail with `message`
    pub fn with_submit_failure(self, message: impl Into<String>) -> Self {
        self.state.write().unwrap().submit_failure = Some(message.into());
        self
    }

    /// Delay every call by `latency`
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state.write().unwrap().latency = Some(latency);
        self
    }

    /// Store a live object as-is, status and deletion marker included
    pub fn set_live(&self, workload: Workload) {
        let key = key_of(&workload);
        self.state.write().unwrap().objects.insert(key, workload);
    }

    /// Get a stored object
    pub fn object(&self, kind: WorkloadKind, namespace: &str, name: &str) -> Option<Workload> {
        self.state
            .read()
            .unwrap()
            .objects
            .get(&(kind, namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.operations.read().unwrap().clone()
    }

    /// Reset operation counts
    pub fn reset_counts(&self) {
        let mut ops = self.operations.write().unwrap();
        *ops = OperationCounts::default();
    }

    async fn config_read<T: Clone>(
        &self,
        pick: impl Fn(&MockState) -> Option<T>,
    ) -> Result<Option<T>> {
        self.simulate_latency().await;
        self.operations.write().unwrap().config_reads += 1;

        let state = self.state.read().unwrap();
        if let Some(message) = &state.config_failure {
            return Err(KubeError::Other(message.clone().into()));
        }
        Ok(pick(&state))
    }

    async fn simulate_latency(&self) {
        let latency = self.state.read().unwrap().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn key_of(workload: &Workload) -> ObjectKey {
    (
        workload.kind(),
        workload.namespace().to_string(),
        workload.name().to_string(),
    )
}

/// Apply the manifest's desired state while keeping the server-owned fields
fn merge_live(existing: Option<&Workload>, manifest: &Workload) -> Workload {
    let mut merged = manifest.clone();
    match (existing, &mut merged) {
        (Some(Workload::Deployment(live)), Workload::Deployment(next)) => {
            next.status = live.status.clone();
            next.metadata.deletion_timestamp = live.metadata.deletion_timestamp.clone();
        }
        (Some(Workload::DaemonSet(live)), Workload::DaemonSet(next)) => {
            next.status = live.status.clone();
            next.metadata.deletion_timestamp = live.metadata.deletion_timestamp.clone();
        }
        _ => {}
    }
    merged
}

#[async_trait]
impl ClusterClient for MockCluster {
    async fn proxy_config(&self) -> Result<Option<ProxyConfig>> {
        self.config_read(|s| s.proxy.clone()).await
    }

    async fn infrastructure_config(&self) -> Result<Option<InfrastructureConfig>> {
        self.config_read(|s| s.infrastructure.clone()).await
    }

    async fn feature_set(&self) -> Result<Option<String>> {
        self.config_read(|s| s.feature_set.clone()).await
    }

    async fn upgradeable_condition(&self) -> Result<Option<ClusterCondition>> {
        self.config_read(|s| s.upgradeable.clone()).await
    }

    async fn get(&self, kind: WorkloadKind, namespace: &str, name: &str) -> Result<Workload> {
        self.simulate_latency().await;
        self.operations.write().unwrap().gets += 1;

        self.object(kind, namespace, name)
            .ok_or_else(|| KubeError::NotFound {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    async fn create_or_update(&self, manifest: &Workload) -> Result<()> {
        self.simulate_latency().await;
        self.operations.write().unwrap().submits += 1;

        let mut state = self.state.write().unwrap();
        if let Some(message) = &state.submit_failure {
            return Err(KubeError::Other(message.clone().into()));
        }

        let key = key_of(manifest);
        let merged = merge_live(state.objects.get(&key), manifest);
        state.objects.insert(key, merged);
        Ok(())
    }
}
