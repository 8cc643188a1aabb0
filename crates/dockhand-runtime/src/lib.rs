//! Container lifecycle and readiness primitives for integration test harnesses.
//!
//! This crate implements the execution layer: a pluggable `CommandRunner`
//! that shells out to the container-management CLI (with a scripted
//! `MockRunner` for tests), `Image` and `Container` handles driven through an
//! explicit lifecycle state machine, bind-mount `Volume`s with permission,
//! ACL and SELinux labeling, bounded-retry readiness `probe`s, prerequisite
//! checks, and the `Harness` context that ties them together.

pub mod container;
pub mod harness;
pub mod image;
pub mod lifecycle;
pub mod mock;
pub mod prereq;
pub mod probe;
pub mod process;
pub mod volume;

pub use container::Container;
pub use harness::Harness;
pub use image::{Image, ImageSource};
pub use lifecycle::{validate_transition, ContainerState};
pub use mock::MockRunner;
pub use prereq::{check_prereqs, format_missing, MissingPrereq, PrereqKind};
pub use probe::{check_path_exists, check_port, wait_for, wait_for_path, wait_for_port, Probe};
pub use process::{CommandLine, CommandRunner, IoMode, ProcessRunner, StreamIo};
pub use volume::{Volume, VolumeSpec};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("command `{command}` failed with {}: {}", exit_label(.code), failure_detail(.stdout, .stderr))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("container '{0}' is already running")]
    AlreadyRunning(String),
    #[error("container '{0}' is not running")]
    NotRunning(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("volume {} has no container target", .0.display())]
    MissingTarget(PathBuf),
    #[error("{what} not reached after {attempts} attempts")]
    ProbeTimeout { what: String, attempts: u32 },
    #[error("invalid state transition for container '{tag}': {from} -> {to}")]
    InvalidTransition {
        tag: String,
        from: ContainerState,
        to: ContainerState,
    },
    #[error("unexpected output from `{command}`: {reason}")]
    UnexpectedOutput { command: String, reason: String },
}

impl RuntimeError {
    /// Exit code of a failed external command, if any.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RuntimeError::CommandFailed { code, .. } => *code,
            _ => None,
        }
    }
}

#[allow(clippy::ref_option)]
fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_owned(),
    }
}

fn failure_detail(stdout: &str, stderr: &str) -> String {
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_owned();
    }
    let stdout = stdout.trim();
    if stdout.is_empty() {
        "no output".to_owned()
    } else {
        stdout.to_owned()
    }
}
