//! Identifier types, tag bookkeeping, configuration and inspect views for Dockhand.
//!
//! This crate defines the schema layer shared by the runtime and the CLI:
//! opaque tag newtypes (`ImageTag`, `ContainerTag`), random tag generation
//! guarded by a collision-checked `TagRegistry`, the TOML-backed
//! `HarnessConfig`, and typed views over the JSON documents produced by the
//! container engine's `inspect` verbs.

pub mod config;
pub mod inspect;
pub mod registry;
pub mod types;

pub use config::{HarnessConfig, ProbeConfig};
pub use inspect::{first_record, ip_address, ContainerStateView};
pub use registry::{generate_tag, TagKind, TagRegistry, GENERATED_TAG_LEN};
pub use types::{ContainerTag, ImageTag};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid {kind} tag '{tag}': {reason}")]
    InvalidTag {
        kind: TagKind,
        tag: String,
        reason: &'static str,
    },
    #[error("{kind} tag '{tag}' is already in use")]
    TagInUse { kind: TagKind, tag: String },
    #[error("could not generate a unique {0} tag")]
    TagSpaceExhausted(TagKind),
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    SerializeToml(#[from] toml::ser::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("malformed inspect output: {0}")]
    InspectShape(String),
}
