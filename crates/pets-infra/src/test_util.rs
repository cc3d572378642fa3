use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;

use pets_command::{CommandErrorKind, CommandOutput};

use crate::runner::{CommandRunner, ToolPaths};

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Ok(String),
    Fail(String),
}

impl Reply {
    pub(crate) fn ok(output: impl Into<String>) -> Self {
        Self::Ok(output.into())
    }

    pub(crate) fn fail(output: impl Into<String>) -> Self {
        Self::Fail(output.into())
    }
}

struct Rule {
    prefix: String,
    replies: VecDeque<Reply>,
}

#[derive(Default)]
struct Script {
    rules: Vec<Rule>,
    calls: Vec<String>,
}

/// Answers commands from a script and records every command line.
///
/// A rule matches when the command line starts with its prefix, the first
/// matching rule wins. Replies are consumed in order and the last one repeats.
/// Unscripted commands fail with exit code 1.
#[derive(Clone, Default)]
pub(crate) struct ScriptedRunner {
    script: Rc<RefCell<Script>>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on(&self, prefix: &str, replies: impl IntoIterator<Item = Reply>) -> &Self {
        self.script.borrow_mut().rules.push(Rule {
            prefix: prefix.to_string(),
            replies: replies.into_iter().collect(),
        });
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.script.borrow().calls.clone()
    }

    pub(crate) fn count(&self, prefix: &str) -> usize {
        self.script
            .borrow()
            .calls
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &Path, args: &[String]) -> CommandOutput {
        let command = std::iter::once(program.display().to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");

        let mut script = self.script.borrow_mut();
        script.calls.push(command.clone());
        let reply = script
            .rules
            .iter_mut()
            .find(|rule| command.starts_with(&rule.prefix))
            .and_then(|rule| {
                if rule.replies.len() > 1 {
                    rule.replies.pop_front()
                } else {
                    rule.replies.front().cloned()
                }
            });

        match reply {
            Some(Reply::Ok(output)) => CommandOutput::new(command, output, None),
            Some(Reply::Fail(output)) => {
                let failure = CommandErrorKind::ExitError(1, output.clone());
                CommandOutput::new(command, output, Some(failure))
            }
            None => CommandOutput::new(
                command,
                "not scripted",
                Some(CommandErrorKind::ExitError(1, "not scripted".to_string())),
            ),
        }
    }
}

pub(crate) fn bare_paths() -> ToolPaths {
    ToolPaths::unresolved()
}
