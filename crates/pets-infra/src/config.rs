use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use derive_builder::Builder;
use tracing::debug;

use crate::error::ConfigError;
use crate::DEFAULT_NAMESPACE;

const DEFAULT_REGISTRY_CHECK_PATH: &str = "/v2/";
const DEFAULT_OPERATOR_REPOSITORY: &str = "https://github.com/zalando/postgres-operator.git";
const DEFAULT_OPERATOR_RESOURCE: &str = "service/postgres-operator";
const DEFAULT_OPERATOR_SELECTOR: &str = "name=postgres-operator";
const DEFAULT_DATABASE_MANIFEST: &str = "pets-db.yml";
const DEFAULT_REGISTRY_PLACEHOLDER: &str = "{{DOCKER_REGISTRY}}";
const DEFAULT_REPLICAS: u16 = 3;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Operator manifests, applied in this order
const OPERATOR_MANIFESTS: &[&str] = &[
    "manifests/configmap.yaml",
    "manifests/operator-service-account-rbac.yaml",
    "manifests/postgres-operator.yaml",
    "manifests/api-service.yaml",
];

pub const REGISTRY_VAR: &str = "DOCKER_REGISTRY";
pub const CLUSTER_REGISTRY_VAR: &str = "DOCKER_REGISTRY_K8S";
const NAMESPACE_VAR: &str = "PETS_NAMESPACE";
const KUBECTL_VAR: &str = "PETS_KUBECTL";
const DOCKER_VAR: &str = "PETS_DOCKER";
const GIT_VAR: &str = "PETS_GIT";
const SEARCH_PATH_VAR: &str = "PETS_PATH";
const MANIFEST_DIR_VAR: &str = "PETS_MANIFEST_DIR";
const DATABASE_MANIFEST_VAR: &str = "PETS_DATABASE_MANIFEST";
const KAFKA_CLUSTER_VAR: &str = "PETS_KAFKA_CLUSTER";
const POLL_INTERVAL_VAR: &str = "PETS_POLL_INTERVAL";
const MAX_POLL_ATTEMPTS_VAR: &str = "PETS_MAX_POLL_ATTEMPTS";

/// Describes what to provision and which tools to drive.
///
/// # Example
///
/// ```
/// # use pets_infra::{InfraConfig, ConfigError};
/// # fn example() -> Result<(), ConfigError> {
/// let config = InfraConfig::builder()
///     .namespace("pets")
///     .registry_url("http://localhost:5000")
///     .streaming_cluster("pets")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Builder, Debug, Clone)]
#[builder(build_fn(private, name = "build_impl"))]
pub struct InfraConfig {
    /// Kubernetes namespace for every resource. Defaults to `default`.
    #[builder(setter(into), default = "DEFAULT_NAMESPACE.to_string()")]
    pub(crate) namespace: String,
    #[builder(setter(into), default = "\"kubectl\".to_string()")]
    pub(crate) kubectl: String,
    #[builder(setter(into), default = "\"docker\".to_string()")]
    pub(crate) docker: String,
    #[builder(setter(into), default = "\"git\".to_string()")]
    pub(crate) git: String,
    /// Path list used to resolve the tools. `PATH` when not set.
    #[builder(setter(into, strip_option), default)]
    pub(crate) search_path: Option<OsString>,
    /// Registry the job image is pushed to, e.g. `http://localhost:5000`
    #[builder(setter(into, strip_option), default)]
    pub(crate) registry_url: Option<String>,
    /// Registry as reachable from inside the cluster, if it differs
    #[builder(setter(into, strip_option), default)]
    pub(crate) cluster_registry_url: Option<String>,
    #[builder(setter(into), default = "DEFAULT_REGISTRY_CHECK_PATH.to_string()")]
    pub(crate) registry_check_path: String,
    #[builder(setter(into), default = "DEFAULT_OPERATOR_REPOSITORY.to_string()")]
    pub(crate) operator_repository: String,
    #[builder(default = "OPERATOR_MANIFESTS.iter().map(|m| m.to_string()).collect()")]
    pub(crate) operator_manifests: Vec<String>,
    /// Resource described to decide whether the operator is installed
    #[builder(setter(into), default = "DEFAULT_OPERATOR_RESOURCE.to_string()")]
    pub(crate) operator_resource: String,
    /// Label selector of the operator pod
    #[builder(setter(into), default = "DEFAULT_OPERATOR_SELECTOR.to_string()")]
    pub(crate) operator_selector: String,
    /// Directory holding the database manifest, the job Dockerfile and job template
    #[builder(setter(into), default = "PathBuf::from(\".\")")]
    pub(crate) manifest_dir: PathBuf,
    #[builder(setter(into), default = "PathBuf::from(DEFAULT_DATABASE_MANIFEST)")]
    pub(crate) database_manifest: PathBuf,
    /// Name of the kafka cluster to create. No kafka cluster when not set.
    #[builder(setter(into, strip_option), default)]
    pub(crate) streaming_cluster: Option<String>,
    #[builder(default = "DEFAULT_REPLICAS")]
    pub(crate) coordination_replicas: u16,
    #[builder(default = "DEFAULT_REPLICAS")]
    pub(crate) streaming_replicas: u16,
    /// Token replaced by the registry host in the job template
    #[builder(setter(into), default = "DEFAULT_REGISTRY_PLACEHOLDER.to_string()")]
    pub(crate) registry_placeholder: String,
    /// Delay between two readiness probes
    #[builder(default = "DEFAULT_POLL_INTERVAL")]
    pub(crate) poll_interval: Duration,
    /// Give up waiting for readiness after this many probes. Unbounded when not set.
    #[builder(setter(strip_option), default)]
    pub(crate) max_poll_attempts: Option<u32>,
}

impl InfraConfig {
    /// Creates a default [`InfraConfigBuilder`].
    pub fn builder() -> InfraConfigBuilder {
        InfraConfigBuilder::default()
    }

    /// Reads overrides from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`, unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(namespace) = lookup(NAMESPACE_VAR) {
            builder.namespace(namespace);
        }
        if let Some(kubectl) = lookup(KUBECTL_VAR) {
            builder.kubectl(kubectl);
        }
        if let Some(docker) = lookup(DOCKER_VAR) {
            builder.docker(docker);
        }
        if let Some(git) = lookup(GIT_VAR) {
            builder.git(git);
        }
        if let Some(path) = lookup(SEARCH_PATH_VAR).or_else(|| lookup("PATH")) {
            builder.search_path(path);
        }
        if let Some(registry) = lookup(REGISTRY_VAR) {
            builder.registry_url(registry);
        }
        if let Some(registry) = lookup(CLUSTER_REGISTRY_VAR) {
            builder.cluster_registry_url(registry);
        }
        if let Some(dir) = lookup(MANIFEST_DIR_VAR) {
            builder.manifest_dir(dir);
        }
        if let Some(manifest) = lookup(DATABASE_MANIFEST_VAR) {
            builder.database_manifest(manifest);
        }
        if let Some(cluster) = lookup(KAFKA_CLUSTER_VAR).filter(|name| !name.is_empty()) {
            builder.streaming_cluster(cluster);
        }
        if let Some(value) = lookup(POLL_INTERVAL_VAR) {
            let interval = humantime::parse_duration(&value).map_err(|err| {
                ConfigError::InvalidValue {
                    var: POLL_INTERVAL_VAR,
                    value: value.clone(),
                    reason: err.to_string(),
                }
            })?;
            builder.poll_interval(interval);
        }
        if let Some(value) = lookup(MAX_POLL_ATTEMPTS_VAR) {
            let attempts = value
                .parse::<u32>()
                .map_err(|err| ConfigError::InvalidValue {
                    var: MAX_POLL_ATTEMPTS_VAR,
                    value: value.clone(),
                    reason: err.to_string(),
                })?;
            builder.max_poll_attempts(attempts);
        }

        let config = builder.build()?;
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn streaming_cluster(&self) -> Option<&str> {
        self.streaming_cluster.as_deref()
    }

    /// Database manifest path, relative paths are taken from `manifest_dir`
    pub fn database_manifest_path(&self) -> PathBuf {
        self.manifest_dir.join(&self.database_manifest)
    }
}

impl InfraConfigBuilder {
    /// Creates an [`InfraConfig`] with the collected configuration options.
    pub fn build(&self) -> Result<InfraConfig, ConfigError> {
        let config = self
            .build_impl()
            .map_err(|err| ConfigError::MissingRequiredConfig(err.to_string()))?;
        if config.coordination_replicas == 0 {
            return Err(ConfigError::Zero("coordination_replicas"));
        }
        if config.streaming_replicas == 0 {
            return Err(ConfigError::Zero("streaming_replicas"));
        }
        if config.max_poll_attempts == Some(0) {
            return Err(ConfigError::Zero(MAX_POLL_ATTEMPTS_VAR));
        }
        Ok(config)
    }
}
