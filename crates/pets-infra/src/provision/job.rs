use crate::config::InfraConfig;
use crate::image::ImageBuild;
use crate::preflight::RegistryEndpoints;
use crate::probe::{ExistenceCheck, ReadinessCheck};
use crate::resource::{ResourceDescriptor, ResourceKind};

use super::{InstallPlan, Provisioner};

/// The job that initializes database `cluster`, named `<cluster>-job`.
///
/// Expects `Dockerfile-<cluster>-job` and the `<cluster>-job.yml` template in the
/// manifest directory.
pub fn database_job(
    config: &InfraConfig,
    cluster: &str,
    registry: &RegistryEndpoints,
) -> Provisioner {
    let name = format!("{cluster}-job");
    let resource = format!("job/{name}");
    let dir = &config.manifest_dir;

    Provisioner::new(
        ResourceDescriptor::new(ResourceKind::Job, name.as_str(), config.namespace()),
        ExistenceCheck::describe(resource.clone()),
        InstallPlan::ImageJob {
            image: ImageBuild::new(
                dir,
                dir.join(format!("Dockerfile-{name}")),
                format!("{}/{name}", registry.push_host),
            ),
            template: dir.join(format!("{name}.yml")),
            placeholder: config.registry_placeholder.clone(),
            registry_host: registry.cluster_host.clone(),
        },
        ReadinessCheck::jsonpath(
            resource,
            "'{.status.conditions[?(@.type==\"Complete\")].status}'",
        ),
    )
}
