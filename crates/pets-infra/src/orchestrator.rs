use std::path::PathBuf;

use tracing::{info, instrument};

use crate::config::InfraConfig;
use crate::error::InfraError;
use crate::installer::InfraSetup;

/// What a run creates after the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub database_manifest: PathBuf,
    /// Kafka cluster created last, if any
    pub streaming_cluster: Option<String>,
}

impl From<&InfraConfig> for RunPlan {
    fn from(config: &InfraConfig) -> Self {
        Self {
            database_manifest: config.database_manifest_path(),
            streaming_cluster: config.streaming_cluster().map(ToOwned::to_owned),
        }
    }
}

/// Runs every stage in order and stops at the first failure
#[instrument(skip(setup))]
pub fn run<S>(setup: &mut S, plan: &RunPlan) -> Result<(), InfraError>
where
    S: InfraSetup + ?Sized,
{
    setup.initialize().map_err(InfraError::Initialize)?;
    setup.install_operator().map_err(InfraError::Operator)?;
    setup
        .create_database(&plan.database_manifest)
        .map_err(InfraError::Database)?;
    if let Some(cluster) = &plan.streaming_cluster {
        setup
            .create_streaming_cluster(cluster)
            .map_err(InfraError::Streaming)?;
    }
    info!("infrastructure ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use mockall::predicate::eq;
    use mockall::Sequence;
    use pets_command::{CommandError, CommandErrorKind};

    use crate::error::{PreflightError, ProvisionError};
    use crate::installer::MockInfraSetup;
    use crate::provision::ProvisioningOutcome;
    use crate::resource::{ResourceDescriptor, ResourceKind};

    use super::*;

    const CREATED: ProvisioningOutcome = ProvisioningOutcome { created_now: true };

    fn plan(streaming_cluster: Option<&str>) -> RunPlan {
        RunPlan {
            database_manifest: PathBuf::from("pets-db.yml"),
            streaming_cluster: streaming_cluster.map(ToOwned::to_owned),
        }
    }

    fn kubectl_failure() -> ProvisionError {
        ProvisionError::Command {
            tool: "kubectl".to_string(),
            err: CommandError {
                command: "kubectl create -f pets-db.yml".to_string(),
                source: CommandErrorKind::ExitError(1, "forbidden".to_string()),
            },
        }
    }

    #[test]
    fn test_stages_in_order() {
        let mut setup = MockInfraSetup::new();
        let mut seq = Sequence::new();
        setup
            .expect_initialize()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        setup
            .expect_install_operator()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(ProvisioningOutcome { created_now: false }));
        setup
            .expect_create_database()
            .with(eq(Path::new("pets-db.yml")))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(CREATED));
        setup
            .expect_create_streaming_cluster()
            .with(eq("pets"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(CREATED));

        run(&mut setup, &plan(Some("pets"))).expect("run");
    }

    #[test]
    fn test_streaming_stage_is_optional() {
        let mut setup = MockInfraSetup::new();
        setup.expect_initialize().returning(|| Ok(()));
        setup.expect_install_operator().returning(|| Ok(CREATED));
        setup.expect_create_database().returning(|_| Ok(CREATED));
        setup.expect_create_streaming_cluster().never();

        run(&mut setup, &plan(None)).expect("run");
    }

    #[test]
    fn test_initialize_failure_stops_run() {
        let mut setup = MockInfraSetup::new();
        setup
            .expect_initialize()
            .returning(|| Err(PreflightError::RegistryNotConfigured("DOCKER_REGISTRY")));
        setup.expect_install_operator().never();
        setup.expect_create_database().never();

        let err = run(&mut setup, &plan(Some("pets"))).unwrap_err();
        assert!(err.to_string().starts_with("error on initialize: "));
    }

    #[test]
    fn test_operator_failure_is_labelled() {
        let mut setup = MockInfraSetup::new();
        setup.expect_initialize().returning(|| Ok(()));
        setup.expect_install_operator().returning(|| Err(kubectl_failure()));
        setup.expect_create_database().never();

        let err = run(&mut setup, &plan(None)).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("error installing PostgreSQL operator: error in kubectl"));
    }

    #[test]
    fn test_database_failure_is_labelled() {
        let mut setup = MockInfraSetup::new();
        setup.expect_initialize().returning(|| Ok(()));
        setup.expect_install_operator().returning(|| Ok(CREATED));
        setup.expect_create_database().returning(|_| {
            Err(ProvisionError::AlreadyExists {
                resource: ResourceDescriptor::new(ResourceKind::DatabaseCluster, "pets", "default"),
            })
        });
        setup.expect_create_streaming_cluster().never();

        let err = run(&mut setup, &plan(Some("pets"))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "error installing database: database cluster \"pets\" already exists"
        );
    }

    #[test]
    fn test_streaming_failure_is_labelled() {
        let mut setup = MockInfraSetup::new();
        setup.expect_initialize().returning(|| Ok(()));
        setup.expect_install_operator().returning(|| Ok(CREATED));
        setup.expect_create_database().returning(|_| Ok(CREATED));
        setup
            .expect_create_streaming_cluster()
            .returning(|_| Err(kubectl_failure()));

        let err = run(&mut setup, &plan(Some("pets"))).unwrap_err();
        assert!(matches!(err, InfraError::Streaming(_)));
        assert!(err.to_string().starts_with("error installing Kafka cluster: "));
    }

    #[test]
    fn test_plan_from_config() {
        let config = InfraConfig::builder()
            .manifest_dir("/srv/pets")
            .streaming_cluster("pets")
            .build()
            .expect("config");
        let plan = RunPlan::from(&config);
        assert_eq!(plan.database_manifest, PathBuf::from("/srv/pets/pets-db.yml"));
        assert_eq!(plan.streaming_cluster.as_deref(), Some("pets"));
    }
}
