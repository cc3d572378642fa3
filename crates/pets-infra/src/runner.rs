use std::path::{Path, PathBuf};

use pets_command::{CommandOutput, ExternalCommand};

use crate::error::ProvisionError;

pub const KUBECTL: &str = "kubectl";
pub const DOCKER: &str = "docker";
pub const GIT: &str = "git";

/// Runs external programs to completion.
///
/// The seam between provisioning logic and the real tools, fakes implement it in tests.
pub trait CommandRunner {
    fn run(&self, program: &Path, args: &[String]) -> CommandOutput;
}

/// Spawns real processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &Path, args: &[String]) -> CommandOutput {
        ExternalCommand::new(program).args(args).log().run()
    }
}

/// Locations of the executables resolved by preflight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub kubectl: PathBuf,
    pub docker: PathBuf,
    pub git: PathBuf,
}

impl ToolPaths {
    /// Uses the bare names and leaves lookup to the operating system
    pub fn unresolved() -> Self {
        Self {
            kubectl: PathBuf::from(KUBECTL),
            docker: PathBuf::from(DOCKER),
            git: PathBuf::from(GIT),
        }
    }
}

/// The tool set a provisioner drives, bound to one namespace
#[derive(Clone, Copy)]
pub struct Tools<'a> {
    runner: &'a dyn CommandRunner,
    paths: &'a ToolPaths,
    namespace: &'a str,
}

impl<'a> Tools<'a> {
    pub fn new(runner: &'a dyn CommandRunner, paths: &'a ToolPaths, namespace: &'a str) -> Self {
        Self {
            runner,
            paths,
            namespace,
        }
    }

    pub fn namespace(&self) -> &str {
        self.namespace
    }

    /// Runs kubectl with `-n <namespace>` appended
    pub fn kubectl_ns<I, S>(&self, args: I) -> CommandOutput
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = collect(args);
        args.push("-n".to_string());
        args.push(self.namespace.to_string());
        self.runner.run(&self.paths.kubectl, &args)
    }

    pub fn docker<I, S>(&self, args: I) -> CommandOutput
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runner.run(&self.paths.docker, &collect(args))
    }

    pub fn git<I, S>(&self, args: I) -> CommandOutput
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runner.run(&self.paths.git, &collect(args))
    }
}

fn collect<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    args.into_iter().map(Into::into).collect()
}

/// Converts a failed kubectl run into an error naming the tool
pub(crate) fn kubectl_result(output: CommandOutput) -> Result<String, ProvisionError> {
    output.into_result().map_err(|err| ProvisionError::Command {
        tool: KUBECTL.to_string(),
        err,
    })
}
