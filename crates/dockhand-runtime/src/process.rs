use crate::RuntimeError;
use std::fmt;
use std::process::{Child, Command, Stdio};
use tracing::debug;

/// A tokenized external command.
///
/// Strings passed through [`CommandLine::parse`] or [`CommandLine::args_str`]
/// are split on whitespace only. Quotes and other shell metacharacters are
/// passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Build from a whitespace separated command string.
    pub fn parse(line: &str) -> Result<Self, RuntimeError> {
        Self::from_tokens(line.split_whitespace())
    }

    /// Build from pre-tokenized arguments; the first token is the program.
    pub fn from_tokens<I, S>(tokens: I) -> Result<Self, RuntimeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tokens = tokens.into_iter().map(Into::into);
        let program = tokens
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| RuntimeError::InvalidArgument("empty command".to_owned()))?;
        Ok(Self {
            program,
            args: tokens.collect(),
            env: Vec::new(),
        })
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append the whitespace separated tokens of `args`.
    #[must_use]
    pub fn args_str(self, args: &str) -> Self {
        self.args(args.split_whitespace())
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn envs(&self) -> &[(String, String)] {
        &self.env
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        cmd
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Disposition of one stdio stream of a spawned process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IoMode {
    #[default]
    Inherit,
    Piped,
    Null,
}

impl IoMode {
    fn stdio(self) -> Stdio {
        match self {
            IoMode::Inherit => Stdio::inherit(),
            IoMode::Piped => Stdio::piped(),
            IoMode::Null => Stdio::null(),
        }
    }
}

/// Stdio wiring for streaming mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamIo {
    pub stdin: IoMode,
    pub stdout: IoMode,
    pub stderr: IoMode,
}

impl StreamIo {
    /// All three streams piped back to the caller.
    pub fn piped() -> Self {
        Self {
            stdin: IoMode::Piped,
            stdout: IoMode::Piped,
            stderr: IoMode::Piped,
        }
    }

    #[must_use]
    pub fn with_stdin(mut self, mode: IoMode) -> Self {
        self.stdin = mode;
        self
    }

    #[must_use]
    pub fn with_stdout(mut self, mode: IoMode) -> Self {
        self.stdout = mode;
        self
    }

    #[must_use]
    pub fn with_stderr(mut self, mode: IoMode) -> Self {
        self.stderr = mode;
        self
    }
}

/// Executes external commands on behalf of images, containers and volumes.
pub trait CommandRunner: Send + Sync {
    /// Run to completion and return captured stdout.
    ///
    /// A non-zero exit is reported as [`RuntimeError::CommandFailed`].
    fn output(&self, command: &CommandLine) -> Result<String, RuntimeError>;

    /// Spawn without waiting and hand back the live process.
    fn spawn(&self, command: &CommandLine, io: StreamIo) -> Result<Child, RuntimeError>;
}

/// [`CommandRunner`] backed by `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessRunner {
    fn output(&self, command: &CommandLine) -> Result<String, RuntimeError> {
        debug!("command: {command}");
        let output = command
            .to_command()
            .output()
            .map_err(|source| RuntimeError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            Ok(stdout)
        } else {
            Err(RuntimeError::CommandFailed {
                command: command.to_string(),
                code: output.status.code(),
                stdout,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }

    fn spawn(&self, command: &CommandLine, io: StreamIo) -> Result<Child, RuntimeError> {
        debug!("command (streaming): {command}");
        command
            .to_command()
            .stdin(io.stdin.stdio())
            .stdout(io.stdout.stdio())
            .stderr(io.stderr.stdio())
            .spawn()
            .map_err(|source| RuntimeError::Spawn {
                command: command.to_string(),
                source,
            })
    }
}
