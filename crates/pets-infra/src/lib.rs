//! Provisioning of the pets data and streaming stack onto Kubernetes.
//!
//! Everything is driven through `kubectl`, `docker` and `git`. Each resource
//! is "ensured": probed, installed only when absent, then polled until it
//! reports ready. The [`Installer`] runs the stages for a real cluster and
//! [`run`] sequences them, labelling each failure with its stage.
//!
//! # Example
//!
//! ```no_run
//! use pets_infra::{run, InfraConfig, Installer, RunPlan};
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = InfraConfig::from_env()?;
//! let plan = RunPlan::from(&config);
//! let mut installer = Installer::new(config);
//! run(&mut installer, &plan)?;
//! # Ok(())
//! # }
//! ```

#![deny(rustdoc::broken_intra_doc_links)]

mod config;
mod error;
mod image;
mod installer;
mod manifest;
mod orchestrator;
mod poller;
mod preflight;
mod probe;
pub mod provision;
mod resource;
mod runner;
mod status;

#[cfg(test)]
mod test_util;

pub use config::{InfraConfig, InfraConfigBuilder};
pub use error::{ConfigError, ImageError, InfraError, ManifestError, PreflightError, ProvisionError};
pub use image::ImageBuild;
pub use installer::{InfraSetup, Installer};
pub use manifest::read_manifest_name;
pub use orchestrator::{run, RunPlan};
pub use poller::{PollTimeout, ReadinessPoller, ReadinessProbe};
pub use preflight::{check_registry, registry_endpoints, registry_host, resolve_tools, RegistryEndpoints};
pub use probe::{ExistenceCheck, ReadinessCheck, ToolProbe};
pub use provision::{InstallPlan, Provisioner, ProvisioningOutcome};
pub use resource::{decode_instances, ExistsPolicy, InstanceRecord, ResourceDescriptor, ResourceKind};
pub use runner::{CommandRunner, SystemRunner, ToolPaths, Tools};
pub use status::{parse_readiness, ReadinessStatus, StatusFormat};

pub use pets_command::{CommandError, CommandErrorKind, CommandOutput};

pub(crate) const DEFAULT_NAMESPACE: &str = "default";
