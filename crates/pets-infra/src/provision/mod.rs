//! The "ensure resource" engine.
//!
//! A [`Provisioner`] is built once per resource with its existence check,
//! install plan and readiness check already chosen for its kind, so
//! [`Provisioner::ensure`] never branches on the kind itself.

mod database;
mod job;
mod operator;
mod streaming;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info, instrument};

use crate::error::ProvisionError;
use crate::image::ImageBuild;
use crate::poller::ReadinessPoller;
use crate::probe::{ExistenceCheck, ReadinessCheck};
use crate::resource::{ExistsPolicy, ResourceDescriptor};
use crate::runner::{kubectl_result, Tools};

pub use database::database_cluster;
pub use job::database_job;
pub use operator::postgres_operator;
pub use streaming::{coordination_cluster, streaming_cluster};

/// What a successful "ensure" did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisioningOutcome {
    /// `false` when the resource was already there and left untouched
    pub created_now: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProvisionState {
    Unknown,
    Exists,
    Absent,
    Creating,
    Ready,
}

/// The steps that materialize an absent resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallPlan {
    /// Clone `repository` into a scratch directory and create each manifest from it, in order
    ClonedManifests {
        repository: String,
        manifests: Vec<String>,
    },
    /// `kubectl create -f <path>`
    ManifestFile { path: PathBuf },
    /// `kubectl kudo install <operator> --instance <instance> [-p KEY=VALUE]...`
    KudoInstall {
        operator: String,
        instance: String,
        parameters: Vec<(String, String)>,
    },
    /// Build and push an image, then create the template with the registry placeholder replaced
    ImageJob {
        image: ImageBuild,
        template: PathBuf,
        placeholder: String,
        registry_host: String,
    },
}

impl InstallPlan {
    fn run(&self, tools: &Tools<'_>) -> Result<(), ProvisionError> {
        match self {
            Self::ClonedManifests {
                repository,
                manifests,
            } => {
                // removed on drop, whichever way this returns
                let scratch = TempDir::new().map_err(ProvisionError::ScratchDir)?;
                let checkout = scratch.path().display().to_string();
                tools
                    .git(["clone", "--depth", "1", repository.as_str(), checkout.as_str()])
                    .into_result()
                    .map_err(|err| ProvisionError::Clone {
                        repository: repository.clone(),
                        err,
                    })?;

                for manifest in manifests {
                    let path = scratch.path().join(manifest);
                    debug!(manifest = %path.display(), "creating");
                    kubectl_result(tools.kubectl_ns([
                        "create".to_string(),
                        "-f".to_string(),
                        path.display().to_string(),
                    ]))?;
                }
                Ok(())
            }
            Self::ManifestFile { path } => {
                kubectl_result(tools.kubectl_ns([
                    "create".to_string(),
                    "-f".to_string(),
                    path.display().to_string(),
                ]))?;
                Ok(())
            }
            Self::KudoInstall {
                operator,
                instance,
                parameters,
            } => {
                let mut args = vec![
                    "kudo".to_string(),
                    "install".to_string(),
                    operator.clone(),
                    "--instance".to_string(),
                    instance.clone(),
                ];
                for (key, value) in parameters {
                    args.push("-p".to_string());
                    args.push(format!("{key}={value}"));
                }
                kubectl_result(tools.kubectl_ns(args))?;
                Ok(())
            }
            Self::ImageJob {
                image,
                template,
                placeholder,
                registry_host,
            } => {
                image.build_and_push(tools).map_err(ProvisionError::Image)?;
                let manifest = render_template(template, placeholder, registry_host)?;
                kubectl_result(tools.kubectl_ns([
                    "create".to_string(),
                    "-f".to_string(),
                    manifest.path().display().to_string(),
                ]))?;
                Ok(())
            }
        }
    }
}

/// Writes `template` with every `placeholder` replaced by `value` to a temporary file
pub(crate) fn render_template(
    template: &Path,
    placeholder: &str,
    value: &str,
) -> Result<NamedTempFile, ProvisionError> {
    let contents = fs::read_to_string(template).map_err(|err| ProvisionError::Template {
        path: template.to_path_buf(),
        err,
    })?;
    let mut rendered = NamedTempFile::new().map_err(ProvisionError::Render)?;
    rendered
        .write_all(contents.replace(placeholder, value).as_bytes())
        .map_err(ProvisionError::Render)?;
    Ok(rendered)
}

/// Ensures a single resource: probe, install when absent, wait for readiness
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioner {
    descriptor: ResourceDescriptor,
    policy: ExistsPolicy,
    existence: ExistenceCheck,
    install: InstallPlan,
    readiness: ReadinessCheck,
    /// Ensured, in order, before `install` runs
    requires: Vec<Provisioner>,
}

impl Provisioner {
    /// Uses the default [`ExistsPolicy`] of the descriptor's kind
    pub fn new(
        descriptor: ResourceDescriptor,
        existence: ExistenceCheck,
        install: InstallPlan,
        readiness: ReadinessCheck,
    ) -> Self {
        Self {
            policy: descriptor.kind().default_policy(),
            descriptor,
            existence,
            install,
            readiness,
            requires: Vec::new(),
        }
    }

    pub fn with_policy(mut self, policy: ExistsPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn requires(mut self, dependency: Provisioner) -> Self {
        self.requires.push(dependency);
        self
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    pub fn policy(&self) -> ExistsPolicy {
        self.policy
    }

    #[instrument(skip(self, tools, poller), fields(resource = %self.descriptor))]
    pub fn ensure(
        &self,
        tools: &Tools<'_>,
        poller: &ReadinessPoller,
    ) -> Result<ProvisioningOutcome, ProvisionError> {
        debug!(state = ?ProvisionState::Unknown, "probing");
        if self.existence.exists(tools) {
            info!(state = ?ProvisionState::Exists, policy = ?self.policy, "{} found", self.descriptor);
            return match self.policy {
                ExistsPolicy::Skip => Ok(ProvisioningOutcome { created_now: false }),
                ExistsPolicy::Reuse => {
                    self.wait_until_ready(tools, poller)?;
                    Ok(ProvisioningOutcome { created_now: false })
                }
                ExistsPolicy::Error => Err(ProvisionError::AlreadyExists {
                    resource: self.descriptor.clone(),
                }),
            };
        }

        info!(state = ?ProvisionState::Absent, "installing {}", self.descriptor);
        self.install(tools, poller)
            .map_err(|err| ProvisionError::Install {
                resource: self.descriptor.clone(),
                err: Box::new(err),
            })?;

        self.wait_until_ready(tools, poller)?;
        Ok(ProvisioningOutcome { created_now: true })
    }

    fn wait_until_ready(
        &self,
        tools: &Tools<'_>,
        poller: &ReadinessPoller,
    ) -> Result<(), ProvisionError> {
        info!(state = ?ProvisionState::Creating, "waiting for {}", self.descriptor);
        let probe = self.readiness.bind(self.descriptor.kind(), tools);
        let attempts = poller
            .wait_until_ready(&probe)
            .map_err(|timeout| ProvisionError::Timeout {
                resource: self.descriptor.clone(),
                attempts: timeout.attempts,
            })?;

        info!(state = ?ProvisionState::Ready, attempts, "{} is running", self.descriptor);
        Ok(())
    }

    fn install(&self, tools: &Tools<'_>, poller: &ReadinessPoller) -> Result<(), ProvisionError> {
        for dependency in &self.requires {
            dependency.ensure(tools, poller)?;
        }
        self.install.run(tools)
    }
}
