//! Cluster access through a live `kube::Client`
//!
//! Workloads are submitted with Server-Side Apply, which creates the object
//! when missing and updates it otherwise in a single call.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment};
use kube::{
    Client,
    api::{Api, DynamicObject, Patch, PatchParams},
    core::GroupVersionKind,
    discovery::ApiResource,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{ClusterClient, ClusterCondition, InfrastructureConfig, ProxyConfig};
use crate::error::{KubeError, Result};
use crate::workload::{Workload, WorkloadKind};

/// Field manager name for Server-Side Apply
const FIELD_MANAGER: &str = "cadence";

/// Group of the cluster-wide configuration objects
const CONFIG_GROUP: &str = "config.openshift.io";

/// Name of the singleton configuration objects
const CLUSTER_SINGLETON: &str = "cluster";

/// Name of the cluster version object
const CLUSTER_VERSION_SINGLETON: &str = "version";

/// [`ClusterClient`] backed by the Kubernetes API
#[derive(Clone)]
pub struct LiveCluster {
    client: Client,
}

impl LiveCluster {
    /// Connect using the default kubeconfig or in-cluster configuration
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self { client })
    }

    /// Fetch a cluster-scoped configuration singleton, `None` when absent
    async fn config_object(
        &self,
        kind: &str,
        plural: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>> {
        let gvk = GroupVersionKind::gvk(CONFIG_GROUP, "v1", kind);
        let resource = ApiResource::from_gvk_with_plural(&gvk, plural);
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &resource);

        let obj = api.get_opt(name).await?;
        if obj.is_none() {
            debug!(kind, name, "configuration object not found");
        }
        Ok(obj)
    }

    async fn get_typed<K>(&self, kind: WorkloadKind, namespace: &str, name: &str) -> Result<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + std::fmt::Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await?.ok_or_else(|| KubeError::NotFound {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }

    async fn apply_typed<K>(&self, namespace: &str, name: &str, obj: &K) -> Result<()>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + serde::Serialize
            + std::fmt::Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let params = PatchParams::apply(FIELD_MANAGER).force();
        api.patch(name, &params, &Patch::Apply(obj)).await?;
        Ok(())
    }
}

/// Read `.status` (or `.spec`) of a dynamic object into a typed view
fn section<T: DeserializeOwned>(obj: &DynamicObject, field: &str) -> Result<Option<T>> {
    match obj.data.get(field) {
        Some(value) if !value.is_null() => Ok(Some(serde_json::from_value(value.clone())?)),
        _ => Ok(None),
    }
}

#[async_trait]
impl ClusterClient for LiveCluster {
    async fn proxy_config(&self) -> Result<Option<ProxyConfig>> {
        match self.config_object("Proxy", "proxies", CLUSTER_SINGLETON).await? {
            Some(obj) => Ok(Some(section(&obj, "status")?.unwrap_or_default())),
            None => Ok(None),
        }
    }

    async fn infrastructure_config(&self) -> Result<Option<InfrastructureConfig>> {
        match self
            .config_object("Infrastructure", "infrastructures", CLUSTER_SINGLETON)
            .await?
        {
            Some(obj) => Ok(Some(section(&obj, "status")?.unwrap_or_default())),
            None => Ok(None),
        }
    }

    async fn feature_set(&self) -> Result<Option<String>> {
        let Some(obj) = self
            .config_object("FeatureGate", "featuregates", CLUSTER_SINGLETON)
            .await?
        else {
            return Ok(None);
        };

        Ok(obj
            .data
            .get("spec")
            .and_then(|spec| spec.get("featureSet"))
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }

    async fn upgradeable_condition(&self) -> Result<Option<ClusterCondition>> {
        let Some(obj) = self
            .config_object("ClusterVersion", "clusterversions", CLUSTER_VERSION_SINGLETON)
            .await?
        else {
            return Ok(None);
        };

        let conditions: Vec<ClusterCondition> = obj
            .data
            .get("status")
            .and_then(|status| status.get("conditions"))
            .map(|c| serde_json::from_value(c.clone()))
            .transpose()?
            .unwrap_or_default();

        Ok(conditions.into_iter().rfind(|c| c.type_ == "Upgradeable"))
    }

    async fn get(&self, kind: WorkloadKind, namespace: &str, name: &str) -> Result<Workload> {
        match kind {
            WorkloadKind::Deployment => Ok(Workload::from(
                self.get_typed::<Deployment>(kind, namespace, name).await?,
            )),
            WorkloadKind::DaemonSet => Ok(Workload::from(
                self.get_typed::<DaemonSet>(kind, namespace, name).await?,
            )),
        }
    }

    async fn create_or_update(&self, manifest: &Workload) -> Result<()> {
        let namespace = manifest.namespace();
        let name = manifest.name();
        if name.is_empty() {
            return Err(KubeError::InvalidManifest(
                "resource missing metadata.name".to_string(),
            ));
        }

        match manifest {
            Workload::Deployment(d) => self.apply_typed(namespace, name, d.as_ref()).await,
            Workload::DaemonSet(d) => self.apply_typed(namespace, name, d.as_ref()).await,
        }
    }
}
