use std::path::Path;

use tracing::{info, instrument};

use crate::config::InfraConfig;
use crate::error::{PreflightError, ProvisionError};
use crate::manifest::read_manifest_name;
use crate::poller::ReadinessPoller;
use crate::preflight::{check_registry, registry_endpoints, resolve_tools, RegistryEndpoints};
use crate::provision::{
    database_cluster, database_job, postgres_operator, streaming_cluster, ProvisioningOutcome,
};
use crate::runner::{CommandRunner, SystemRunner, ToolPaths, Tools};

/// The stages of a provisioning run, in the order they are executed
#[cfg_attr(test, mockall::automock)]
pub trait InfraSetup {
    /// Resolves tool paths and checks the registry
    fn initialize(&mut self) -> Result<(), PreflightError>;
    fn install_operator(&self) -> Result<ProvisioningOutcome, ProvisionError>;
    /// Creates the database named by `manifest` and then its init job
    fn create_database(&self, manifest: &Path) -> Result<ProvisioningOutcome, ProvisionError>;
    fn create_streaming_cluster(&self, name: &str) -> Result<ProvisioningOutcome, ProvisionError>;
}

/// Provisions the stack onto the cluster kubectl is pointed at.
///
/// # Example
///
/// ```no_run
/// # use pets_infra::{InfraConfig, Installer, InfraSetup};
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = InfraConfig::builder()
///     .registry_url("http://localhost:5000")
///     .build()?;
/// let mut installer = Installer::new(config);
/// installer.initialize()?;
/// installer.install_operator()?;
/// # Ok(())
/// # }
/// ```
pub struct Installer {
    config: InfraConfig,
    runner: Box<dyn CommandRunner>,
    paths: ToolPaths,
    registry: Option<RegistryEndpoints>,
    poller: ReadinessPoller,
}

impl Installer {
    /// Runs the real tools
    pub fn new(config: InfraConfig) -> Self {
        Self::with_runner(config, Box::new(SystemRunner))
    }

    pub fn with_runner(config: InfraConfig, runner: Box<dyn CommandRunner>) -> Self {
        let poller = ReadinessPoller::new(config.poll_interval, config.max_poll_attempts);
        Self {
            config,
            runner,
            paths: ToolPaths::unresolved(),
            registry: None,
            poller,
        }
    }

    pub fn config(&self) -> &InfraConfig {
        &self.config
    }

    fn tools(&self) -> Tools<'_> {
        Tools::new(self.runner.as_ref(), &self.paths, self.config.namespace())
    }

    /// Registry hosts found by [`InfraSetup::initialize`], or derived from the
    /// configuration when it was skipped
    fn registry(&self) -> Result<RegistryEndpoints, PreflightError> {
        match &self.registry {
            Some(registry) => Ok(registry.clone()),
            None => registry_endpoints(&self.config),
        }
    }
}

impl InfraSetup for Installer {
    #[instrument(skip(self))]
    fn initialize(&mut self) -> Result<(), PreflightError> {
        self.paths = resolve_tools(&self.config)?;
        self.registry = Some(check_registry(&self.config)?);
        Ok(())
    }

    #[instrument(skip(self))]
    fn install_operator(&self) -> Result<ProvisioningOutcome, ProvisionError> {
        info!("Installing PostgreSQL operator ...");
        postgres_operator(&self.config).ensure(&self.tools(), &self.poller)
    }

    #[instrument(skip(self))]
    fn create_database(&self, manifest: &Path) -> Result<ProvisioningOutcome, ProvisionError> {
        let name = read_manifest_name(manifest).map_err(ProvisionError::Manifest)?;
        info!("Creating database {name:?} ...");
        let tools = self.tools();

        let outcome = database_cluster(&self.config, &name, manifest).ensure(&tools, &self.poller)?;

        let job_result = self
            .registry()
            .map_err(ProvisionError::Registry)
            .and_then(|registry| {
                database_job(&self.config, &name, &registry).ensure(&tools, &self.poller)
            });
        if let Err(err) = job_result {
            return Err(ProvisionError::Job {
                cluster: name,
                err: Box::new(err),
            });
        }

        info!("Database {name:?} created");
        Ok(outcome)
    }

    #[instrument(skip(self))]
    fn create_streaming_cluster(&self, name: &str) -> Result<ProvisioningOutcome, ProvisionError> {
        info!("Creating kafka cluster {name:?} ...");
        let outcome = streaming_cluster(&self.config, name).ensure(&self.tools(), &self.poller)?;
        info!("Kafka cluster {name:?} created");
        Ok(outcome)
    }
}
