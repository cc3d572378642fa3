use std::path::Path;

use crate::config::InfraConfig;
use crate::probe::{ExistenceCheck, ReadinessCheck};
use crate::resource::{ResourceDescriptor, ResourceKind};

use super::{InstallPlan, Provisioner};

/// A postgres cluster named `name`, created from `manifest`
pub fn database_cluster(config: &InfraConfig, name: &str, manifest: &Path) -> Provisioner {
    let resource = format!("postgresql/{name}");
    Provisioner::new(
        ResourceDescriptor::new(ResourceKind::DatabaseCluster, name, config.namespace()),
        ExistenceCheck::describe(resource.clone()),
        InstallPlan::ManifestFile {
            path: manifest.to_path_buf(),
        },
        ReadinessCheck::jsonpath(resource, "{.status}"),
    )
}
