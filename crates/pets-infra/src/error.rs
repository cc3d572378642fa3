use std::io::Error as IoError;
use std::path::PathBuf;

use pets_command::CommandError;

use crate::resource::ResourceDescriptor;

/// The stage-labelled error of a whole provisioning run.
///
/// Every layer below embeds its cause in its message, so the rendered error
/// reads as a breadcrumb trail from the stage down to the failing command.
#[derive(thiserror::Error, Debug)]
pub enum InfraError {
    #[error("error on initialize: {0}")]
    Initialize(PreflightError),
    #[error("error installing PostgreSQL operator: {0}")]
    Operator(ProvisionError),
    #[error("error installing database: {0}")]
    Database(ProvisionError),
    #[error("error installing Kafka cluster: {0}")]
    Streaming(ProvisionError),
}

/// Errors building an [`InfraConfig`](crate::InfraConfig)
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Attempted to construct a Config object without all required fields
    #[error("Missing required config option {0}")]
    MissingRequiredConfig(String),
    /// An environment variable holds a value that cannot be used
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
    /// A count that must be positive was set to zero
    #[error("{0} must be at least 1")]
    Zero(&'static str),
}

/// Errors found while resolving tools and the registry before any install
#[derive(thiserror::Error, Debug)]
pub enum PreflightError {
    /// A required executable is not in the search path
    #[error("not {tool:?} path found: {err}")]
    ToolNotFound { tool: String, err: which::Error },
    /// No registry was configured
    #[error("error checking docker registry, variable {0} does not exist")]
    RegistryNotConfigured(&'static str),
    /// The registry URL cannot be parsed
    #[error("error checking docker registry, invalid url {url:?}: {err}")]
    InvalidRegistryUrl { url: String, err: url::ParseError },
    /// The registry URL has no host to tag images with
    #[error("error checking docker registry, url {0:?} has no host")]
    RegistryWithoutHost(String),
    /// The registry could not be reached
    #[error("error checking docker registry {url}: {err}")]
    RegistryUnreachable { url: String, err: ureq::Transport },
    /// The registry answered with something other than 200
    #[error("error checking docker registry {url}, status is {status}")]
    RegistryStatus { url: String, status: u16 },
}

/// Errors reading the identity out of a manifest file
#[derive(thiserror::Error, Debug)]
pub enum ManifestError {
    #[error("error reading {path:?}: {err}")]
    Read { path: PathBuf, err: IoError },
    #[error("error parsing {path:?}: {err}")]
    Parse {
        path: PathBuf,
        err: serde_yaml::Error,
    },
    #[error("{path:?} has no metadata.name")]
    MissingName { path: PathBuf },
}

/// Errors building and pushing a container image
#[derive(thiserror::Error, Debug)]
pub enum ImageError {
    /// Reported before docker is invoked
    #[error("dockerfile {0:?} does not exist")]
    DockerfileNotFound(PathBuf),
    #[error("error creating docker image {tag}: {err}")]
    Build { tag: String, err: CommandError },
    #[error("error pushing docker image {tag}: {err}")]
    Push { tag: String, err: CommandError },
}

/// Errors that may occur while ensuring a single resource
#[derive(thiserror::Error, Debug)]
pub enum ProvisionError {
    /// The probe found the resource and its policy does not allow reuse
    #[error("{resource} already exists")]
    AlreadyExists { resource: ResourceDescriptor },
    /// One step of the install sequence failed
    #[error("error creating {resource}: {err}")]
    Install {
        resource: ResourceDescriptor,
        err: Box<ProvisionError>,
    },
    /// An external tool exited unsuccessfully
    #[error("error in {tool}: {err}")]
    Command { tool: String, err: CommandError },
    /// The manifest repository could not be cloned
    #[error("error cloning {repository}: {err}")]
    Clone {
        repository: String,
        err: CommandError,
    },
    #[error("error creating temp dir: {0}")]
    ScratchDir(IoError),
    #[error("error getting cluster name from yaml file: {0}")]
    Manifest(ManifestError),
    #[error("error reading file {path:?}: {err}")]
    Template { path: PathBuf, err: IoError },
    #[error("error writing rendered manifest: {0}")]
    Render(IoError),
    #[error(transparent)]
    Image(ImageError),
    /// The registry hosts could not be derived from the configuration
    #[error("error resolving docker registry: {0}")]
    Registry(PreflightError),
    /// Provisioning of the init job failed after the database came up
    #[error("error creating job for cluster {cluster:?}: {err}")]
    Job {
        cluster: String,
        err: Box<ProvisionError>,
    },
    /// Readiness polling ran out of attempts
    #[error("{resource} not ready after {attempts} attempts")]
    Timeout {
        resource: ResourceDescriptor,
        attempts: u32,
    },
}
