//! Resource builder: mutate, submit and verify one workload at a time
//!
//! Each call to [`ResourceBuilder::apply`] walks a fixed sequence:
//!
//! ```text
//! Mutate -> Submit -> (Initializing: done) | (Applying: Verify -> done or error)
//! ```
//!
//! Per-kind behavior lives behind [`KindBuilder`], resolved once per manifest
//! through a [`KindRegistry`]. The builder keeps no state between calls, so
//! distinct workloads may be applied concurrently.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use cadence_core::BuilderMode;

use crate::cluster::{ClusterClient, cancellable};
use crate::error::{KubeError, Result};
use crate::health::{Health, workload_health};
use crate::mutate::{
    INJECT_PROXY_ANNOTATION, inject_proxy, parse_container_names, parse_internal_api_url,
    rewrite_service_host_env,
};
use crate::workload::{Workload, WorkloadKind};

/// Builder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderConfig {
    /// Whether submitted workloads are health-checked
    #[serde(default)]
    pub mode: BuilderMode,

    /// Annotation listing containers that receive proxy settings
    #[serde(default = "default_inject_proxy_annotation")]
    pub inject_proxy_annotation: String,

    /// The controller's own Deployment, pointed at the internal load balancer
    #[serde(default)]
    pub self_deployment: SelfDeployment,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            mode: BuilderMode::default(),
            inject_proxy_annotation: default_inject_proxy_annotation(),
            self_deployment: SelfDeployment::default(),
        }
    }
}

impl BuilderConfig {
    /// Default configuration with the given mode
    pub fn with_mode(mode: BuilderMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }
}

fn default_inject_proxy_annotation() -> String {
    INJECT_PROXY_ANNOTATION.to_string()
}

/// Identity of the controller's own Deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfDeployment {
    pub namespace: String,
    pub name: String,
    /// Container whose service host is rewritten
    pub container: String,
}

impl Default for SelfDeployment {
    fn default() -> Self {
        Self {
            namespace: "openshift-cluster-version".to_string(),
            name: "cluster-version-operator".to_string(),
            container: "cluster-version-operator".to_string(),
        }
    }
}

impl SelfDeployment {
    fn matches(&self, workload: &Workload) -> bool {
        workload.kind() == WorkloadKind::Deployment
            && workload.namespace() == self.namespace
            && workload.name() == self.name
    }
}

/// Step of an apply call, used in logs and cancellation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyPhase {
    Mutate,
    Submit,
    Verify,
}

impl fmt::Display for ApplyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyPhase::Mutate => write!(f, "mutating"),
            ApplyPhase::Submit => write!(f, "submitting"),
            ApplyPhase::Verify => write!(f, "verifying"),
        }
    }
}

/// Everything a [`KindBuilder`] may use during one apply call
pub struct BuildContext<'a> {
    pub cluster: &'a dyn ClusterClient,
    pub config: &'a BuilderConfig,
    pub cancel: &'a CancellationToken,
}

/// Per-kind mutation and health verification
#[async_trait]
pub trait KindBuilder: Send + Sync {
    /// Kind handled by this builder
    fn kind(&self) -> WorkloadKind;

    /// Rewrite the manifest before submission
    ///
    /// Defaults to proxy injection driven by the inject-proxy annotation.
    async fn mutate(&self, ctx: &BuildContext<'_>, manifest: &mut Workload) -> Result<()> {
        inject_cluster_proxy(ctx, manifest).await
    }

    /// Re-fetch the live object and evaluate it
    async fn check_health(&self, ctx: &BuildContext<'_>, manifest: &Workload) -> Result<Health> {
        let live = cancellable(
            ctx.cancel,
            &ApplyPhase::Verify.to_string(),
            ctx.cluster
                .get(manifest.kind(), manifest.namespace(), manifest.name()),
        )
        .await?;
        workload_health(&live)
    }
}

/// Deployments: proxy injection plus the self-deployment service host rewrite
pub struct DeploymentBuilder;

#[async_trait]
impl KindBuilder for DeploymentBuilder {
    fn kind(&self) -> WorkloadKind {
        WorkloadKind::Deployment
    }

    async fn mutate(&self, ctx: &BuildContext<'_>, manifest: &mut Workload) -> Result<()> {
        inject_cluster_proxy(ctx, manifest).await?;

        if ctx.config.self_deployment.matches(manifest) {
            rewrite_self_service_host(ctx, manifest).await?;
        }

        Ok(())
    }
}

/// DaemonSets: proxy injection, deletion-only health
pub struct DaemonSetBuilder;

#[async_trait]
impl KindBuilder for DaemonSetBuilder {
    fn kind(&self) -> WorkloadKind {
        WorkloadKind::DaemonSet
    }
}

/// Fill proxy settings into the containers named by the inject-proxy annotation
///
/// A missing proxy configuration injects empty values.
async fn inject_cluster_proxy(ctx: &BuildContext<'_>, manifest: &mut Workload) -> Result<()> {
    let names: Vec<String> = match manifest.annotation(&ctx.config.inject_proxy_annotation) {
        Some(value) if !value.is_empty() => parse_container_names(value)
            .into_iter()
            .map(str::to_string)
            .collect(),
        _ => return Ok(()),
    };

    let proxy = cancellable(
        ctx.cancel,
        &ApplyPhase::Mutate.to_string(),
        ctx.cluster.proxy_config(),
    )
    .await?
    .unwrap_or_default();

    debug!(
        workload = %manifest.identity(),
        containers = ?names,
        "injecting proxy configuration"
    );

    if let Some(pod_spec) = manifest.pod_spec_mut() {
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        inject_proxy(
            pod_spec,
            &names,
            &proxy.http_proxy,
            &proxy.https_proxy,
            &proxy.no_proxy,
        );
    }

    Ok(())
}

/// Point the controller's own Deployment at the internal API load balancer
///
/// A missing infrastructure configuration leaves the manifest untouched.
async fn rewrite_self_service_host(ctx: &BuildContext<'_>, manifest: &mut Workload) -> Result<()> {
    let Some(infrastructure) = cancellable(
        ctx.cancel,
        &ApplyPhase::Mutate.to_string(),
        ctx.cluster.infrastructure_config(),
    )
    .await?
    else {
        debug!(
            workload = %manifest.identity(),
            "no infrastructure configuration, keeping service host"
        );
        return Ok(());
    };

    let Some(address) = parse_internal_api_url(&infrastructure.api_server_internal_url)? else {
        return Ok(());
    };

    debug!(
        workload = %manifest.identity(),
        host = %address.host,
        port = ?address.port,
        "rewriting service host to internal load balancer"
    );

    let container = ctx.config.self_deployment.container.as_str();
    if let Some(pod_spec) = manifest.pod_spec_mut() {
        rewrite_service_host_env(
            pod_spec,
            &[container],
            &address.host,
            address.port.as_deref(),
        );
    }

    Ok(())
}

/// Registry of kind builders, keyed by workload kind
#[derive(Clone)]
pub struct KindRegistry {
    builders: BTreeMap<WorkloadKind, Arc<dyn KindBuilder>>,
}

impl KindRegistry {
    /// Registry with no builders
    pub fn empty() -> Self {
        Self {
            builders: BTreeMap::new(),
        }
    }

    /// Register a builder, replacing any builder for the same kind
    pub fn register(&mut self, builder: Arc<dyn KindBuilder>) {
        self.builders.insert(builder.kind(), builder);
    }

    /// Resolve the builder for a kind
    pub fn resolve(&self, kind: WorkloadKind) -> Result<&dyn KindBuilder> {
        self.builders
            .get(&kind)
            .map(|b| b.as_ref())
            .ok_or_else(|| KubeError::UnsupportedKind(kind.to_string()))
    }

    /// Registered kinds, in order
    pub fn kinds(&self) -> Vec<WorkloadKind> {
        self.builders.keys().copied().collect()
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(DeploymentBuilder));
        registry.register(Arc::new(DaemonSetBuilder));
        registry
    }
}

/// Applies workloads to a cluster and verifies their health
pub struct ResourceBuilder {
    cluster: Arc<dyn ClusterClient>,
    config: BuilderConfig,
    registry: KindRegistry,
}

impl ResourceBuilder {
    /// Create a builder with the default kind registry
    pub fn new(cluster: Arc<dyn ClusterClient>, config: BuilderConfig) -> Self {
        Self::with_registry(cluster, config, KindRegistry::default())
    }

    /// Create a builder with a custom kind registry
    pub fn with_registry(
        cluster: Arc<dyn ClusterClient>,
        config: BuilderConfig,
        registry: KindRegistry,
    ) -> Self {
        Self {
            cluster,
            config,
            registry,
        }
    }

    pub fn mode(&self) -> BuilderMode {
        self.config.mode
    }

    fn context<'a>(&'a self, cancel: &'a CancellationToken) -> BuildContext<'a> {
        BuildContext {
            cluster: self.cluster.as_ref(),
            config: &self.config,
            cancel,
        }
    }

    /// Mutate, submit and (unless initializing) verify one workload
    ///
    /// Health failures come back as [`KubeError::Unhealthy`] and are expected
    /// to be retried by the caller. A cancelled call returns
    /// [`KubeError::Cancelled`]; a submission that already went through is not
    /// rolled back.
    pub async fn apply(&self, mut manifest: Workload, cancel: &CancellationToken) -> Result<()> {
        let builder = self.registry.resolve(manifest.kind())?;
        let ctx = self.context(cancel);
        let iden = manifest.identity();

        debug!(workload = %iden, kind = %manifest.kind(), phase = %ApplyPhase::Mutate, "applying");
        builder.mutate(&ctx, &mut manifest).await?;

        debug!(workload = %iden, phase = %ApplyPhase::Submit, "applying");
        cancellable(
            cancel,
            &ApplyPhase::Submit.to_string(),
            self.cluster.create_or_update(&manifest),
        )
        .await?;
        info!(workload = %iden, kind = %manifest.kind(), "submitted");

        if !self.config.mode.verifies_health() {
            return Ok(());
        }

        debug!(workload = %iden, phase = %ApplyPhase::Verify, "applying");
        builder.check_health(&ctx, &manifest).await.map(|_| ())
    }

    /// Verify a previously submitted workload without re-submitting it
    ///
    /// Always healthy in initializing mode, without touching the cluster.
    pub async fn verify(&self, manifest: &Workload, cancel: &CancellationToken) -> Result<Health> {
        if !self.config.mode.verifies_health() {
            return Ok(Health::Healthy);
        }

        let builder = self.registry.resolve(manifest.kind())?;
        builder.check_health(&self.context(cancel), manifest).await
    }
}
