use crate::config::InfraConfig;
use crate::probe::{ExistenceCheck, ReadinessCheck};
use crate::resource::{ResourceDescriptor, ResourceKind};

use super::{InstallPlan, Provisioner};

const ZOOKEEPER: &str = "zookeeper";
const KAFKA: &str = "kafka";
const ZOOKEEPER_CLIENT_PORT: u16 = 2181;
/// Kafka is pointed at no more than this many zookeeper hosts
const MAX_ZOOKEEPER_HOSTS: u16 = 3;

fn instance(service: &str, cluster: &str) -> String {
    format!("{service}-{cluster}")
}

/// Comma separated client addresses of the zookeeper ensemble of `cluster`
pub(crate) fn zookeeper_uri(cluster: &str, replicas: u16) -> String {
    let instance = instance(ZOOKEEPER, cluster);
    (0..replicas.min(MAX_ZOOKEEPER_HOSTS))
        .map(|ordinal| {
            format!("{instance}-{ZOOKEEPER}-{ordinal}.{instance}-hs:{ZOOKEEPER_CLIENT_PORT}")
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// The zookeeper ensemble a kafka cluster depends on
pub fn coordination_cluster(config: &InfraConfig, cluster: &str) -> Provisioner {
    let instance = instance(ZOOKEEPER, cluster);
    Provisioner::new(
        ResourceDescriptor::new(ResourceKind::CoordinationCluster, cluster, config.namespace()),
        ExistenceCheck::KudoInstances {
            required: vec![(instance.clone(), ZOOKEEPER.to_string())],
        },
        InstallPlan::KudoInstall {
            operator: ZOOKEEPER.to_string(),
            instance: instance.clone(),
            parameters: Vec::new(),
        },
        ReadinessCheck::pod_ordinals(&instance, ZOOKEEPER, config.coordination_replicas),
    )
}

/// A kafka cluster, its zookeeper ensemble is created and awaited first
pub fn streaming_cluster(config: &InfraConfig, cluster: &str) -> Provisioner {
    let kafka_instance = instance(KAFKA, cluster);
    Provisioner::new(
        ResourceDescriptor::new(ResourceKind::StreamingCluster, cluster, config.namespace()),
        ExistenceCheck::KudoInstances {
            required: vec![
                (kafka_instance.clone(), KAFKA.to_string()),
                (instance(ZOOKEEPER, cluster), ZOOKEEPER.to_string()),
            ],
        },
        InstallPlan::KudoInstall {
            operator: KAFKA.to_string(),
            instance: kafka_instance.clone(),
            parameters: vec![(
                "ZOOKEEPER_URI".to_string(),
                zookeeper_uri(cluster, config.coordination_replicas),
            )],
        },
        ReadinessCheck::pod_ordinals(&kafka_instance, KAFKA, config.streaming_replicas),
    )
    .requires(coordination_cluster(config, cluster))
}
