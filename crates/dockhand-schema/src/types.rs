//! Newtype wrappers for engine-facing identifiers.
//!
//! Both newtypes are validated on construction, so a tag can always be passed
//! to the engine CLI as a single argument. They serialize as plain strings.

use crate::registry::TagKind;
use crate::SchemaError;
use serde::Serialize;
use std::fmt;
use std::ops::Deref;

const MAX_TAG_LEN: usize = 128;

macro_rules! tag_newtype {
    ($(#[$meta:meta])* $name:ident, $kind:expr, $validate:path) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap a tag.
            pub fn new(s: impl Into<String>) -> Result<Self, SchemaError> {
                let s = s.into();
                $validate(&s).map_err(|reason| SchemaError::InvalidTag {
                    kind: $kind,
                    tag: s.clone(),
                    reason,
                })?;
                Ok(Self(s))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl From<$name> for String {
            fn from(tag: $name) -> String {
                tag.0
            }
        }
    };
}

tag_newtype!(
    /// Locally assigned name of an image (`repository[:tag]` syntax, lowercase).
    ImageTag,
    TagKind::Image,
    validate_image_tag
);

tag_newtype!(
    /// Name given to a container with `--name`.
    ContainerTag,
    TagKind::Container,
    validate_container_tag
);

fn validate_common(tag: &str) -> Result<(), &'static str> {
    if tag.is_empty() {
        return Err("must not be empty");
    }
    if tag.len() > MAX_TAG_LEN {
        return Err("must be at most 128 characters");
    }
    // A leading dash would be read as a flag by the engine CLI.
    if !tag.as_bytes()[0].is_ascii_alphanumeric() {
        return Err("must start with an ASCII letter or digit");
    }
    Ok(())
}

fn validate_image_tag(tag: &str) -> Result<(), &'static str> {
    validate_common(tag)?;
    if !tag.bytes().all(|b| {
        b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'_' | b'.' | b'-' | b'/' | b':')
    }) {
        return Err("must match [a-z0-9_./:-]");
    }
    Ok(())
}

fn validate_container_tag(tag: &str) -> Result<(), &'static str> {
    validate_common(tag)?;
    if !tag
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'))
    {
        return Err("must match [a-zA-Z0-9_.-]");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_tag_accepts_repository_syntax() {
        let tag = ImageTag::new("registry.local:5000/team/app:1.2").unwrap();
        assert_eq!(tag.as_str(), "registry.local:5000/team/app:1.2");
        assert_eq!(tag.to_string(), "registry.local:5000/team/app:1.2");
    }

    #[test]
    fn image_tag_rejects_uppercase() {
        let err = ImageTag::new("Fedora").unwrap_err();
        assert!(err.to_string().contains("[a-z0-9_./:-]"));
    }

    #[test]
    fn tags_reject_leading_dash() {
        assert!(ImageTag::new("-it").is_err());
        assert!(ContainerTag::new("--rm").is_err());
    }

    #[test]
    fn tags_reject_empty_and_whitespace() {
        assert!(ImageTag::new("").is_err());
        assert!(ContainerTag::new("a b").is_err());
        assert!(ContainerTag::new("x".repeat(129)).is_err());
    }

    #[test]
    fn container_tag_rejects_slash() {
        assert!(ContainerTag::new("web/1").is_err());
        assert!(ContainerTag::new("Web_1.a-b").is_ok());
    }

    #[test]
    fn serializes_as_plain_string() {
        let tag = ContainerTag::new("ahoj").unwrap();
        assert_eq!(serde_json::to_string(&tag).unwrap(), "\"ahoj\"");
        let value = serde_json::json!({ "image": ImageTag::new("fedora:40").unwrap() });
        assert_eq!(value["image"], "fedora:40");
    }
}
