//! Random tag generation and the registry that keeps generated tags unique.

use crate::SchemaError;
use rand::Rng;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Length of a generated tag (lowercase ASCII letters only).
pub const GENERATED_TAG_LEN: usize = 10;

const MAX_GENERATE_ATTEMPTS: usize = 16;

/// Engine namespace a tag lives in. Images and containers are named
/// independently by the engine, so the registry tracks them separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Image,
    Container,
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagKind::Image => write!(f, "image"),
            TagKind::Container => write!(f, "container"),
        }
    }
}

/// Produce a random lowercase identifier of [`GENERATED_TAG_LEN`] letters.
pub fn generate_tag() -> String {
    let mut rng = rand::thread_rng();
    (0..GENERATED_TAG_LEN)
        .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
        .collect()
}

/// Set of tags handed out by one harness.
///
/// Generated tags are retried on collision; explicit tags that are already
/// claimed are rejected. Tags are released when the owning resource is
/// cleaned, so a name can be reused afterwards.
#[derive(Debug, Default)]
pub struct TagRegistry {
    issued: Mutex<HashSet<(TagKind, String)>>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate and claim a fresh tag.
    pub fn generate(&self, kind: TagKind) -> Result<String, SchemaError> {
        self.generate_with(kind, generate_tag)
    }

    fn generate_with(
        &self,
        kind: TagKind,
        mut source: impl FnMut() -> String,
    ) -> Result<String, SchemaError> {
        let mut issued = self.issued.lock().unwrap_or_else(PoisonError::into_inner);
        for _ in 0..MAX_GENERATE_ATTEMPTS {
            let candidate = source();
            if issued.insert((kind, candidate.clone())) {
                return Ok(candidate);
            }
        }
        Err(SchemaError::TagSpaceExhausted(kind))
    }

    /// Claim a caller-chosen tag.
    pub fn claim(&self, kind: TagKind, tag: &str) -> Result<(), SchemaError> {
        let mut issued = self.issued.lock().unwrap_or_else(PoisonError::into_inner);
        if issued.insert((kind, tag.to_owned())) {
            Ok(())
        } else {
            Err(SchemaError::TagInUse {
                kind,
                tag: tag.to_owned(),
            })
        }
    }

    /// Release a tag. Returns whether it was claimed.
    pub fn release(&self, kind: TagKind, tag: &str) -> bool {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(kind, tag.to_owned()))
    }

    pub fn contains(&self, kind: TagKind, tag: &str) -> bool {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(kind, tag.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tag_is_lowercase() {
        let tag = generate_tag();
        assert_eq!(tag.len(), GENERATED_TAG_LEN);
        assert!(tag.bytes().all(|b| b.is_ascii_lowercase()));
    }

    #[test]
    fn generate_claims_the_tag() {
        let registry = TagRegistry::new();
        let tag = registry.generate(TagKind::Container).unwrap();
        assert!(registry.contains(TagKind::Container, &tag));
        assert!(!registry.contains(TagKind::Image, &tag));
    }

    #[test]
    fn generate_retries_on_collision() {
        let registry = TagRegistry::new();
        registry.claim(TagKind::Image, "aaaa").unwrap();

        let mut candidates = vec!["bbbb", "aaaa"];
        let tag = registry
            .generate_with(TagKind::Image, || candidates.pop().unwrap().to_owned())
            .unwrap();
        assert_eq!(tag, "bbbb");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn generate_gives_up_after_bounded_attempts() {
        let registry = TagRegistry::new();
        registry.claim(TagKind::Image, "same").unwrap();
        let err = registry
            .generate_with(TagKind::Image, || "same".to_owned())
            .unwrap_err();
        assert!(matches!(err, SchemaError::TagSpaceExhausted(TagKind::Image)));
    }

    #[test]
    fn duplicate_claim_is_rejected() {
        let registry = TagRegistry::new();
        registry.claim(TagKind::Container, "ahoj").unwrap();
        let err = registry.claim(TagKind::Container, "ahoj").unwrap_err();
        assert!(err.to_string().contains("already in use"));
        // Same name in the other namespace is fine.
        registry.claim(TagKind::Image, "ahoj").unwrap();
    }

    #[test]
    fn release_allows_reuse() {
        let registry = TagRegistry::new();
        registry.claim(TagKind::Image, "hallo").unwrap();
        assert!(registry.release(TagKind::Image, "hallo"));
        assert!(!registry.release(TagKind::Image, "hallo"));
        registry.claim(TagKind::Image, "hallo").unwrap();
    }
}
