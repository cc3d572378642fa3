use std::fmt;

use serde::Deserialize;

/// The kinds of cluster resources this crate knows how to provision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// The shared PostgreSQL operator
    Operator,
    /// A user-named PostgreSQL cluster managed by the operator
    DatabaseCluster,
    /// A zookeeper ensemble backing a streaming cluster
    CoordinationCluster,
    /// A kafka cluster
    StreamingCluster,
    /// A one-shot initialization job
    Job,
}

impl ResourceKind {
    /// What to do when the resource is found before installing it.
    ///
    /// The operator is shared infrastructure and a zookeeper ensemble is only
    /// a dependency of its kafka cluster. The other kinds are named by the
    /// user for a single run.
    pub fn default_policy(&self) -> ExistsPolicy {
        match self {
            Self::Operator => ExistsPolicy::Skip,
            Self::CoordinationCluster => ExistsPolicy::Reuse,
            Self::DatabaseCluster | Self::StreamingCluster | Self::Job => ExistsPolicy::Error,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Operator => "PostgreSQL operator",
            Self::DatabaseCluster => "database cluster",
            Self::CoordinationCluster => "zookeeper cluster",
            Self::StreamingCluster => "kafka cluster",
            Self::Job => "job",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Behavior of "ensure" when the probe reports the resource already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistsPolicy {
    /// Log and report success without installing
    Skip,
    /// Wait until the existing resource is ready, then report success
    Reuse,
    /// Fail the provisioning run
    Error,
}

/// Identifies what is being provisioned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    kind: ResourceKind,
    name: String,
    namespace: String,
}

impl ResourceDescriptor {
    pub fn new(kind: ResourceKind, name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.kind, self.name)
    }
}

/// One entry of a list-based control plane response, reduced to what
/// membership tests need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRecord {
    pub name: String,
    pub category_tag: String,
}

impl InstanceRecord {
    /// Whether this record is named `name` and its category contains `tag`
    pub fn matches(&self, name: &str, tag: &str) -> bool {
        self.name == name && self.category_tag.contains(tag)
    }
}

/// Raw shape of `kubectl kudo get instances -o json`
#[derive(Debug, Deserialize)]
pub(crate) struct KudoInstance {
    metadata: KudoMetadata,
    spec: KudoSpec,
}

#[derive(Debug, Deserialize)]
struct KudoMetadata {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KudoSpec {
    operator_version: KudoOperatorVersion,
}

#[derive(Debug, Deserialize)]
struct KudoOperatorVersion {
    name: String,
}

impl From<KudoInstance> for InstanceRecord {
    fn from(instance: KudoInstance) -> Self {
        Self {
            name: instance.metadata.name,
            category_tag: instance.spec.operator_version.name,
        }
    }
}

/// Decodes a kudo instance list
pub fn decode_instances(raw: &str) -> Result<Vec<InstanceRecord>, serde_json::Error> {
    let instances: Vec<KudoInstance> = serde_json::from_str(raw)?;
    Ok(instances.into_iter().map(InstanceRecord::from).collect())
}

/// `true` if every `(name, tag)` pair is matched by at least one record
pub fn contains_all(records: &[InstanceRecord], required: &[(String, String)]) -> bool {
    required.iter().all(|(name, tag)| {
        records
            .iter()
            .any(|record| record.matches(name, tag))
    })
}
