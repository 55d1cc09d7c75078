//! Cadence Kube - Kubernetes integration for Cadence
//!
//! This crate provides:
//! - **Resource Builder**: Mutate, submit and verify Deployments and DaemonSets
//! - **Mutation**: Cluster proxy injection and in-cluster API address rewriting
//! - **Health**: Deployment condition evaluation into structured update errors
//! - **Cluster Access**: A narrow client trait with live and in-memory implementations
//! - **Preconditions**: Independent upgrade checks reduced to a single verdict

pub mod builder;
pub mod cluster;
pub mod error;
pub mod health;
pub mod mutate;
pub mod precondition;
pub mod workload;

pub use builder::{
    ApplyPhase, BuildContext, BuilderConfig, DaemonSetBuilder, DeploymentBuilder, KindBuilder,
    KindRegistry, ResourceBuilder, SelfDeployment,
};
pub use cluster::{
    ClusterClient, ClusterCondition, InfrastructureConfig, LiveCluster, MockCluster,
    OperationCounts, ProxyConfig,
};
pub use error::{KubeError, Result};
pub use health::{Health, workload_health};
pub use precondition::{
    FeatureGateCheck, Precondition, PreconditionList, ReleaseContext, UpgradeableCheck,
};
pub use workload::{Workload, WorkloadKind};
