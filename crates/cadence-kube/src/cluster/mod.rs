//! Cluster access used by the builder and the precondition checks
//!
//! The builder never talks to the API server directly. Everything it needs is
//! behind [`ClusterClient`]:
//! - **Live**: [`LiveCluster`] backed by a `kube::Client`
//! - **Mock**: [`MockCluster`], an in-memory cluster for tests
//!
//! Every read is a fresh snapshot; nothing is cached between calls.

mod live;
mod mock;

pub use live::LiveCluster;
pub use mock::{MockCluster, OperationCounts};

use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{KubeError, Result};
use crate::workload::{Workload, WorkloadKind};

/// Cluster-wide proxy settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    #[serde(default)]
    pub http_proxy: String,
    #[serde(default)]
    pub https_proxy: String,
    #[serde(default)]
    pub no_proxy: String,
}

/// Cluster infrastructure settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureConfig {
    #[serde(default, rename = "apiServerInternalURL")]
    pub api_server_internal_url: String,
}

/// A status condition reported by a cluster-scoped configuration object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterCondition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Capabilities the builder and checks consume from the cluster
///
/// Lookups of cluster-wide configuration return `Ok(None)` when the object
/// does not exist; that is a normal outcome, not an error.
///
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Cluster-wide proxy configuration
    async fn proxy_config(&self) -> Result<Option<ProxyConfig>>;

    /// Cluster infrastructure configuration
    async fn infrastructure_config(&self) -> Result<Option<InfrastructureConfig>>;

    /// Feature set enabled through the cluster FeatureGate, if any
    async fn feature_set(&self) -> Result<Option<String>>;

    /// The `Upgradeable` condition of the cluster version, if reported
    async fn upgradeable_condition(&self) -> Result<Option<ClusterCondition>>;

    /// Fetch the live object; a missing object is [`KubeError::NotFound`]
    async fn get(&self, kind: WorkloadKind, namespace: &str, name: &str) -> Result<Workload>;

    /// Create the object or update it to match the manifest
    async fn create_or_update(&self, manifest: &Workload) -> Result<()>;
}

/// Await `fut` unless `cancel` fires first
///
/// `during` names the step for the resulting [`KubeError::Cancelled`].
pub async fn cancellable<T, F>(cancel: &CancellationToken, during: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(KubeError::Cancelled(during.to_string())),
        res = fut => res,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancellable_passes_through() {
        let cancel = CancellationToken::new();
        let value = cancellable(&cancel, "testing", async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_cancellable_returns_promptly_when_cancelled() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = cancellable(&cancel, "waiting", async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(err.to_string(), "operation cancelled while waiting");
    }

    #[tokio::test]
    async fn test_cancellable_already_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let res: Result<()> = cancellable(&cancel, "submitting", async { Ok(()) }).await;
        assert!(res.unwrap_err().is_cancelled());
    }

    #[test]
    fn test_config_deserialize() {
        let proxy: ProxyConfig =
            serde_json::from_str(r#"{"httpProxy":"http://p","noProxy":".svc"}"#).unwrap();
        assert_eq!(proxy.http_proxy, "http://p");
        assert_eq!(proxy.https_proxy, "");
        assert_eq!(proxy.no_proxy, ".svc");

        let infra: InfrastructureConfig =
            serde_json::from_str(r#"{"apiServerInternalURL":"https://api-int:6443"}"#).unwrap();
        assert_eq!(infra.api_server_internal_url, "https://api-int:6443");
    }
}
