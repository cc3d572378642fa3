//! Existence and readiness checks against the cluster control plane.

use pets_command::CommandError;
use tracing::{debug, warn};

use crate::poller::ReadinessProbe;
use crate::resource::{contains_all, decode_instances, ResourceKind};
use crate::runner::Tools;
use crate::status::{parse_readiness, ReadinessStatus};

/// How to find out whether a resource is already there
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExistenceCheck {
    /// `kubectl describe <resource>`, success means the resource exists
    Describe { resource: String },
    /// List kudo instances and require one record for each `(name, tag)` pair
    KudoInstances { required: Vec<(String, String)> },
}

impl ExistenceCheck {
    pub fn describe(resource: impl Into<String>) -> Self {
        Self::Describe {
            resource: resource.into(),
        }
    }

    /// Never fails, a probe that cannot confirm the resource reports it absent
    pub fn exists(&self, tools: &Tools<'_>) -> bool {
        match self {
            Self::Describe { resource } => {
                let output = tools.kubectl_ns(["describe", resource.as_str()]);
                if !output.succeeded() {
                    debug!(%resource, output = output.combined_output(), "describe failed");
                }
                output.succeeded()
            }
            Self::KudoInstances { required } => {
                let raw = match tools
                    .kubectl_ns(["kudo", "get", "instances", "-o", "json"])
                    .into_result()
                {
                    Ok(raw) => raw,
                    Err(err) => {
                        warn!(%err, "unable to list kudo instances");
                        return false;
                    }
                };
                match decode_instances(&raw) {
                    Ok(records) => contains_all(&records, required),
                    Err(err) => {
                        warn!(%err, "invalid kudo instance list");
                        false
                    }
                }
            }
        }
    }
}

/// How to read the readiness of a resource that is being created
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessCheck {
    /// One kubectl query whose output is parsed by resource kind
    StatusField { args: Vec<String> },
    /// Every listed pod must report a ready container on the same tick
    PodSet { pods: Vec<String> },
}

impl ReadinessCheck {
    /// `kubectl get <resource> -o jsonpath=<path>`
    pub fn jsonpath(resource: impl Into<String>, path: &str) -> Self {
        Self::StatusField {
            args: vec![
                "get".to_string(),
                resource.into(),
                "-o".to_string(),
                format!("jsonpath={path}"),
            ],
        }
    }

    /// Pods `<instance>-<service>-<i>` for every ordinal below `replicas`
    pub fn pod_ordinals(instance: &str, service: &str, replicas: u16) -> Self {
        Self::PodSet {
            pods: (0..replicas)
                .map(|ordinal| format!("{instance}-{service}-{ordinal}"))
                .collect(),
        }
    }

    pub fn bind<'a>(&'a self, kind: ResourceKind, tools: &'a Tools<'a>) -> ToolProbe<'a> {
        ToolProbe {
            check: self,
            kind,
            tools,
        }
    }
}

/// A [`ReadinessCheck`] bound to the tools that run it
pub struct ToolProbe<'a> {
    check: &'a ReadinessCheck,
    kind: ResourceKind,
    tools: &'a Tools<'a>,
}

impl ToolProbe<'_> {
    fn pod_ready(&self, pod: &str) -> Result<ReadinessStatus, CommandError> {
        let raw = self
            .tools
            .kubectl_ns([
                "get".to_string(),
                format!("pod/{pod}"),
                "-o".to_string(),
                "jsonpath='{.status.containerStatuses[0].ready}'".to_string(),
            ])
            .into_result()?;
        Ok(parse_readiness(self.kind, &raw))
    }
}

impl ReadinessProbe for ToolProbe<'_> {
    fn probe(&self) -> Result<ReadinessStatus, CommandError> {
        match self.check {
            ReadinessCheck::StatusField { args } => {
                let raw = self.tools.kubectl_ns(args.iter().cloned()).into_result()?;
                Ok(parse_readiness(self.kind, &raw))
            }
            ReadinessCheck::PodSet { pods } => {
                // query every ordinal, even after one reports not ready
                let ready = pods
                    .iter()
                    .map(|pod| match self.pod_ready(pod) {
                        Ok(status) => status.ready,
                        Err(err) => {
                            debug!(pod = %pod, %err, "pod probe failed");
                            false
                        }
                    })
                    .fold(true, |all, ready| all && ready);
                Ok(ready.into())
            }
        }
    }
}
