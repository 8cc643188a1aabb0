use crate::process::{CommandLine, CommandRunner, StreamIo};
use crate::RuntimeError;
use std::process::Child;
use std::sync::{Mutex, PoisonError};

/// Scripted [`CommandRunner`] that records every invocation.
///
/// Replies are matched against the rendered command line by prefix, newest
/// rule first. Commands without a matching rule succeed with empty output.
#[derive(Debug, Default)]
pub struct MockRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<String>>,
}

#[derive(Debug, Clone)]
enum Reply {
    Stdout(String),
    Fail { code: i32, stderr: String },
}

#[derive(Debug)]
struct Rule {
    prefix: String,
    reply: Reply,
    remaining: Option<usize>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, prefix: &str, stdout: &str) {
        self.push(prefix, Reply::Stdout(stdout.to_owned()), None);
    }

    pub fn respond_once(&self, prefix: &str, stdout: &str) {
        self.push(prefix, Reply::Stdout(stdout.to_owned()), Some(1));
    }

    pub fn fail(&self, prefix: &str, code: i32, stderr: &str) {
        self.push(
            prefix,
            Reply::Fail {
                code,
                stderr: stderr.to_owned(),
            },
            None,
        );
    }

    pub fn fail_once(&self, prefix: &str, code: i32, stderr: &str) {
        self.push(
            prefix,
            Reply::Fail {
                code,
                stderr: stderr.to_owned(),
            },
            Some(1),
        );
    }

    /// Rendered command lines in invocation order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn push(&self, prefix: &str, reply: Reply, remaining: Option<usize>) {
        self.rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Rule {
                prefix: prefix.to_owned(),
                reply,
                remaining,
            });
    }

    fn reply_for(&self, rendered: &str) -> Option<Reply> {
        let mut rules = self.rules.lock().unwrap_or_else(PoisonError::into_inner);
        let idx = rules
            .iter()
            .rposition(|r| rendered.starts_with(&r.prefix))?;
        let reply = rules[idx].reply.clone();
        if let Some(remaining) = rules[idx].remaining.as_mut() {
            *remaining -= 1;
            if *remaining == 0 {
                rules.remove(idx);
            }
        }
        Some(reply)
    }

    fn record(&self, rendered: &str) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(rendered.to_owned());
    }
}

impl CommandRunner for MockRunner {
    fn output(&self, command: &CommandLine) -> Result<String, RuntimeError> {
        let rendered = command.to_string();
        self.record(&rendered);
        match self.reply_for(&rendered) {
            None => Ok(String::new()),
            Some(Reply::Stdout(stdout)) => Ok(stdout),
            Some(Reply::Fail { code, stderr }) => Err(RuntimeError::CommandFailed {
                command: rendered,
                code: Some(code),
                stdout: String::new(),
                stderr,
            }),
        }
    }

    fn spawn(&self, command: &CommandLine, _io: StreamIo) -> Result<Child, RuntimeError> {
        let rendered = command.to_string();
        self.record(&rendered);
        Err(RuntimeError::Spawn {
            command: rendered,
            source: std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "mock runner does not spawn processes",
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(line: &str) -> CommandLine {
        CommandLine::parse(line).unwrap()
    }

    #[test]
    fn unmatched_commands_succeed_silently() {
        let runner = MockRunner::new();
        assert_eq!(runner.output(&cmd("docker ps")).unwrap(), "");
        assert_eq!(runner.calls(), ["docker ps"]);
    }

    #[test]
    fn newest_rule_wins() {
        let runner = MockRunner::new();
        runner.respond("docker", "generic");
        runner.respond("docker image", "specific");
        assert_eq!(runner.output(&cmd("docker image ls")).unwrap(), "specific");
        assert_eq!(runner.output(&cmd("docker ps")).unwrap(), "generic");
    }

    #[test]
    fn once_rules_are_consumed() {
        let runner = MockRunner::new();
        runner.respond("docker inspect", "[]");
        runner.fail_once("docker inspect", 1, "No such object");

        assert!(runner.output(&cmd("docker inspect x")).is_err());
        assert_eq!(runner.output(&cmd("docker inspect x")).unwrap(), "[]");
        assert_eq!(runner.call_count("docker inspect"), 2);
    }

    #[test]
    fn failures_carry_exit_code() {
        let runner = MockRunner::new();
        runner.fail("docker rm", 125, "no such container");
        let err = runner.output(&cmd("docker rm gone")).unwrap_err();
        assert_eq!(err.exit_code(), Some(125));
        assert!(err.to_string().contains("no such container"));
    }

    #[test]
    fn spawn_is_recorded_but_unsupported() {
        let runner = MockRunner::new();
        assert!(runner
            .spawn(&cmd("docker exec x nc -l 1234"), StreamIo::default())
            .is_err());
        assert_eq!(runner.call_count("docker exec"), 1);
    }
}
