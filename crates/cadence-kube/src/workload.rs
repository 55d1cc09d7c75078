//! Workload manifests handled by the resource builder
//!
//! A [`Workload`] is one desired-state object of a supported kind. It is
//! decoded from YAML, mutated in place, submitted, and then dropped; no
//! identity is kept between apply cycles.

use std::fmt;

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment};
use k8s_openapi::api::core::v1::PodSpec;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::error::{KubeError, Result};

/// Namespace assumed when a manifest does not set one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Workload kinds the builder knows how to apply and verify
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WorkloadKind {
    Deployment,
    DaemonSet,
}

impl WorkloadKind {
    /// All supported kinds
    pub const ALL: [WorkloadKind; 2] = [WorkloadKind::Deployment, WorkloadKind::DaemonSet];

    /// Kind as it appears in manifests
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deployment => "Deployment",
            Self::DaemonSet => "DaemonSet",
        }
    }

    /// Resolve a manifest `kind` field
    pub fn from_kind(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == kind)
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed workload manifest or live object
#[derive(Debug, Clone, PartialEq)]
pub enum Workload {
    Deployment(Box<Deployment>),
    DaemonSet(Box<DaemonSet>),
}

impl From<Deployment> for Workload {
    fn from(d: Deployment) -> Self {
        Workload::Deployment(Box::new(d))
    }
}

impl From<DaemonSet> for Workload {
    fn from(d: DaemonSet) -> Self {
        Workload::DaemonSet(Box::new(d))
    }
}

impl Workload {
    /// Decode a single YAML document
    pub fn from_yaml(doc: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(doc)?;

        let kind = value
            .get("kind")
            .and_then(|k| k.as_str())
            .ok_or_else(|| KubeError::InvalidManifest("missing kind".to_string()))?;

        let workload = match WorkloadKind::from_kind(kind) {
            Some(WorkloadKind::Deployment) => {
                Workload::from(serde_yaml::from_value::<Deployment>(value)?)
            }
            Some(WorkloadKind::DaemonSet) => {
                Workload::from(serde_yaml::from_value::<DaemonSet>(value)?)
            }
            None => return Err(KubeError::UnsupportedKind(kind.to_string())),
        };

        if workload.name().is_empty() {
            return Err(KubeError::InvalidManifest(format!(
                "{} is missing metadata.name",
                workload.kind()
            )));
        }

        Ok(workload)
    }

    /// Decode a multi-document YAML stream, preserving document order
    ///
    /// Documents are separated by `---` lines; `---` inside a value is content.
    pub fn parse_all(manifest: &str) -> Result<Vec<Self>> {
        let mut workloads = Vec::new();

        for (index, doc) in split_documents(manifest).iter().enumerate() {
            let doc = doc.trim();
            if doc.is_empty()
                || doc
                    .lines()
                    .all(|l| l.trim().is_empty() || l.trim().starts_with('#'))
            {
                continue;
            }

            let workload = Self::from_yaml(doc).map_err(|e| {
                KubeError::InvalidManifest(format!("document {}: {}", index, e))
            })?;
            workloads.push(workload);
        }

        Ok(workloads)
    }

    pub fn kind(&self) -> WorkloadKind {
        match self {
            Workload::Deployment(_) => WorkloadKind::Deployment,
            Workload::DaemonSet(_) => WorkloadKind::DaemonSet,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Workload::Deployment(d) => &d.metadata,
            Workload::DaemonSet(d) => &d.metadata,
        }
    }

    /// Namespace, falling back to [`DEFAULT_NAMESPACE`]
    pub fn namespace(&self) -> &str {
        self.metadata()
            .namespace
            .as_deref()
            .unwrap_or(DEFAULT_NAMESPACE)
    }

    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    /// `namespace/name`, used as the subject of health errors
    pub fn identity(&self) -> String {
        format!("{}/{}", self.namespace(), self.name())
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata()
            .annotations
            .as_ref()
            .and_then(|a| a.get(key))
            .map(String::as_str)
    }

    /// Whether the deletion marker is set
    pub fn is_being_deleted(&self) -> bool {
        self.metadata().deletion_timestamp.is_some()
    }

    /// Pod template spec, if the manifest carries one
    pub fn pod_spec(&self) -> Option<&PodSpec> {
        match self {
            Workload::Deployment(d) => d.spec.as_ref()?.template.spec.as_ref(),
            Workload::DaemonSet(d) => d.spec.as_ref()?.template.spec.as_ref(),
        }
    }

    /// Mutable pod template spec, if the manifest carries one
    pub fn pod_spec_mut(&mut self) -> Option<&mut PodSpec> {
        match self {
            Workload::Deployment(d) => d.spec.as_mut()?.template.spec.as_mut(),
            Workload::DaemonSet(d) => d.spec.as_mut()?.template.spec.as_mut(),
        }
    }

    pub fn as_deployment(&self) -> Option<&Deployment> {
        match self {
            Workload::Deployment(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_daemonset(&self) -> Option<&DaemonSet> {
        match self {
            Workload::DaemonSet(d) => Some(d),
            _ => None,
        }
    }
}

fn split_documents(manifest: &str) -> Vec<String> {
    let mut docs = vec![String::new()];

    for line in manifest.lines() {
        let marker = line.trim_end();
        if marker == "---" || marker.starts_with("--- ") {
            docs.push(String::new());
            continue;
        }
        if let Some(current) = docs.last_mut() {
            current.push_str(line);
            current.push('\n');
        }
    }

    docs
}
