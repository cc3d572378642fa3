use crate::config::InfraConfig;
use crate::probe::{ExistenceCheck, ReadinessCheck};
use crate::resource::{ResourceDescriptor, ResourceKind};

use super::{InstallPlan, Provisioner};

/// The shared postgres operator, left alone when it is already installed
pub fn postgres_operator(config: &InfraConfig) -> Provisioner {
    let name = config
        .operator_resource
        .rsplit('/')
        .next()
        .unwrap_or(config.operator_resource.as_str());

    Provisioner::new(
        ResourceDescriptor::new(ResourceKind::Operator, name, config.namespace()),
        ExistenceCheck::describe(config.operator_resource.clone()),
        InstallPlan::ClonedManifests {
            repository: config.operator_repository.clone(),
            manifests: config.operator_manifests.clone(),
        },
        ReadinessCheck::StatusField {
            args: vec![
                "get".to_string(),
                "pod".to_string(),
                "-l".to_string(),
                config.operator_selector.clone(),
                "-o".to_string(),
                "jsonpath='{.items[0].status.containerStatuses[0].ready}'".to_string(),
            ],
        },
    )
}
