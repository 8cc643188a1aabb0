use crate::RuntimeError;
use std::fmt;

/// Lifecycle of a container handle.
///
/// `Started` replaces the historic "occupied" flag: a background instance is
/// alive and foreground runs must not remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    /// No engine-side container exists for the tag.
    Idle,
    /// Running in the background with a recorded runtime id.
    Started,
    /// Engine-side container exists but is not running.
    Exited,
    /// Removed by `clean`. Terminal.
    Removed,
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerState::Idle => write!(f, "idle"),
            ContainerState::Started => write!(f, "started"),
            ContainerState::Exited => write!(f, "exited"),
            ContainerState::Removed => write!(f, "removed"),
        }
    }
}

pub fn validate_transition(
    tag: &str,
    from: ContainerState,
    to: ContainerState,
) -> Result<(), RuntimeError> {
    let valid = matches!(
        (from, to),
        (
            ContainerState::Idle,
            ContainerState::Started | ContainerState::Exited
        ) | (ContainerState::Started, ContainerState::Exited)
            | (_, ContainerState::Removed)
    );

    if valid {
        Ok(())
    } else {
        Err(RuntimeError::InvalidTransition {
            tag: tag.to_owned(),
            from,
            to,
        })
    }
}
