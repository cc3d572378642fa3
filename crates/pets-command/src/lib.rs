//! Helper types to run external programs the way the provisioner needs them:
//! blocking, with standard output and standard error merged into one buffer.

#![warn(missing_docs)]

use std::ffi::{OsStr, OsString};
use std::process::Output;

use tracing::{debug, info};

/// A failed external program run
#[derive(thiserror::Error, Debug)]
#[error("Failed to run \"{command}\": {source}")]
pub struct CommandError {
    /// The command line, as displayed in logs
    pub command: String,
    /// How the run failed
    pub source: CommandErrorKind,
}

/// Ways an external program run can fail
#[derive(thiserror::Error, Debug)]
pub enum CommandErrorKind {
    /// Killed by a signal, no exit code
    #[error("Child process was terminated and has no exit code\n  output: {0}")]
    Terminated(String),
    /// Exited with a non-zero code, the merged output is kept
    #[error("Child process completed with non-zero exit code {0}\n  output: {1}")]
    ExitError(i32, String),
    /// The program could not be spawned
    #[error("An error occurred while invoking child process: {0}")]
    IoError(#[from] std::io::Error),
}

/// The captured result of one external program run.
///
/// The merged output is kept even when the program fails, callers may
/// need to inspect it to tell a missing resource apart from a transport error.
#[derive(Debug)]
pub struct CommandOutput {
    command: String,
    combined_output: String,
    failure: Option<CommandErrorKind>,
}

impl CommandOutput {
    /// Builds an output by hand, mostly useful for fake runners in tests
    pub fn new(
        command: impl Into<String>,
        combined_output: impl Into<String>,
        failure: Option<CommandErrorKind>,
    ) -> Self {
        Self {
            command: command.into(),
            combined_output: combined_output.into(),
            failure,
        }
    }

    /// The stringified command line that produced this output
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Standard output and standard error, merged
    pub fn combined_output(&self) -> &str {
        &self.combined_output
    }

    /// `true` when the process ran and exited with code `0`
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// Describes the failure, including the captured output, if there was one
    pub fn failure_detail(&self) -> Option<String> {
        self.failure.as_ref().map(|kind| kind.to_string())
    }

    /// Converts into `Ok(output)` on success and `Err(CommandError)` otherwise
    pub fn into_result(self) -> Result<String, CommandError> {
        match self.failure {
            None => Ok(self.combined_output),
            Some(source) => Err(CommandError {
                command: self.command,
                source,
            }),
        }
    }

    fn from_process(command: String, output: Output) -> Self {
        let combined_output = String::from_utf8_lossy(&output.stdout).to_string();
        let failure = match output.status.code() {
            Some(0i32) => None,
            None => Some(CommandErrorKind::Terminated(combined_output.clone())),
            Some(code) => Some(CommandErrorKind::ExitError(code, combined_output.clone())),
        };
        Self {
            command,
            combined_output,
            failure,
        }
    }
}

/// A single invocation of an external program.
///
/// # Example
///
/// ```
/// use pets_command::ExternalCommand;
/// let mut command = ExternalCommand::new("echo");
/// command.arg("one").arg("two three");
/// assert_eq!(command.display(), "echo one two three");
/// ```
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    program: OsString,
    args: Vec<OsString>,
}

impl ExternalCommand {
    /// Creates a command for the given program, either a bare name or a path
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
        }
    }

    /// Appends one argument
    pub fn arg<S: AsRef<OsStr>>(&mut self, arg: S) -> &mut Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Appends several arguments
    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_os_string()));
        self
    }

    /// Print a stringified version of the command to the debug log.
    pub fn log(&mut self) -> &mut Self {
        debug!(command = %self.display(), "prepared");
        self
    }

    /// Return a stringified version of the command.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs the program to completion, blocking the caller.
    ///
    /// Standard error is redirected into standard output so both land in one
    /// buffer in the order they were written. The merged output is also
    /// logged, at `info` when the program failed and `debug` otherwise.
    pub fn run(&self) -> CommandOutput {
        let command = self.display();
        debug!("Executing> {}", command);

        let output = match duct::cmd(&self.program, &self.args)
            .stderr_to_stdout()
            .stdout_capture()
            .unchecked()
            .run()
        {
            Ok(output) => CommandOutput::from_process(command, output),
            Err(err) => CommandOutput::new(command, "", Some(CommandErrorKind::IoError(err))),
        };

        if output.succeeded() {
            debug!(command = output.command(), "{}", output.combined_output());
        } else {
            info!(command = output.command(), "failed: {}", output.combined_output());
        }
        output
    }

    /// Runs the program and keeps the output only when it exits with `0`.
    ///
    /// # Example
    ///
    /// ```
    /// use pets_command::{ExternalCommand, CommandErrorKind};
    ///
    /// let error = ExternalCommand::new("sh")
    ///     .args(["-c", "echo this command failed 1>&2 && false"])
    ///     .result()
    ///     .unwrap_err();
    /// if let CommandErrorKind::ExitError(1i32, output) = error.source {
    ///     assert_eq!(output, "this command failed\n");
    /// } else {
    ///     panic!("should fail with merged output");
    /// }
    /// ```
    pub fn result(&self) -> Result<String, CommandError> {
        self.run().into_result()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_merges_stdout_and_stderr() {
        let output = ExternalCommand::new("sh")
            .args(["-c", "echo ok params: $0 $1; echo warning 1>&2", "param-1", "param-2"])
            .run();

        assert!(output.succeeded());
        assert!(output.failure_detail().is_none());
        assert_eq!(output.combined_output(), "ok params: param-1 param-2\nwarning\n");
    }

    #[test]
    fn test_keeps_output_on_failure() {
        let output = ExternalCommand::new("sh")
            .args(["-c", "echo ko params: $0; exit 3", "param-1"])
            .run();

        assert!(!output.succeeded());
        assert_eq!(output.combined_output(), "ko params: param-1\n");
        let detail = output.failure_detail().expect("failure detail");
        assert!(detail.contains("non-zero exit code 3"));
        assert!(detail.contains("ko params: param-1"));
    }

    #[test]
    fn test_missing_program() {
        let error = ExternalCommand::new("pets-command-does-not-exist")
            .arg("get")
            .result()
            .unwrap_err();

        assert!(matches!(error.source, CommandErrorKind::IoError(_)));
        assert_eq!(error.command, "pets-command-does-not-exist get");
    }

    #[test]
    fn test_terminated_process() {
        let output = ExternalCommand::new("sh")
            .args(["-c", "echo partial; kill -9 $$"])
            .run();

        assert_eq!(output.combined_output(), "partial\n");
        let error = output.into_result().unwrap_err();
        assert!(matches!(error.source, CommandErrorKind::Terminated(_)));
    }
}
