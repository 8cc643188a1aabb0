use crate::container::Container;
use crate::image::Image;
use crate::probe::Probe;
use crate::process::{CommandLine, CommandRunner, ProcessRunner};
use crate::volume::{Volume, VolumeSpec};
use crate::RuntimeError;
use dockhand_schema::{HarnessConfig, TagKind, TagRegistry};
use std::fmt;
use std::sync::Arc;

/// Shared context for images, containers and volumes.
///
/// Cloning is cheap; every clone shares the runner, configuration and tag
/// registry, so tags stay unique across everything created from one harness.
#[derive(Clone)]
pub struct Harness {
    runner: Arc<dyn CommandRunner>,
    config: Arc<HarnessConfig>,
    tags: Arc<TagRegistry>,
}

impl fmt::Debug for Harness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Harness")
            .field("config", &self.config)
            .field("tags", &self.tags.len())
            .finish_non_exhaustive()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(HarnessConfig::default())
    }
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        Self::with_runner(config, Arc::new(ProcessRunner::new()))
    }

    pub fn with_runner(config: HarnessConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            config: Arc::new(config),
            tags: Arc::new(TagRegistry::new()),
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub fn tags(&self) -> &TagRegistry {
        &self.tags
    }

    /// Pull, import or adopt `source` and tag it locally.
    pub fn image(&self, source: &str, tag: Option<&str>) -> Result<Image, RuntimeError> {
        Image::new(self, source, tag)
    }

    /// Handle for an image that already carries `tag` locally.
    pub fn existing_image(&self, tag: &str) -> Result<Image, RuntimeError> {
        Image::existing(self, tag)
    }

    pub fn container(&self, image: &Image, tag: Option<&str>) -> Result<Container, RuntimeError> {
        Container::new(self, image, tag)
    }

    pub fn volume(&self, spec: VolumeSpec) -> Result<Volume, RuntimeError> {
        Volume::create(self, spec)
    }

    pub fn probe(&self) -> Probe {
        Probe::new(self.config.probe)
    }

    pub(crate) fn engine(&self) -> CommandLine {
        CommandLine::new(self.config.engine.as_str())
    }

    /// Claim `explicit` or generate a fresh tag in `kind`'s namespace.
    pub(crate) fn claim_tag(
        &self,
        kind: TagKind,
        explicit: Option<&str>,
    ) -> Result<String, RuntimeError> {
        match explicit {
            Some(tag) => {
                self.tags
                    .claim(kind, tag)
                    .map_err(|e| RuntimeError::InvalidArgument(e.to_string()))?;
                Ok(tag.to_owned())
            }
            None => self
                .tags
                .generate(kind)
                .map_err(|e| RuntimeError::InvalidArgument(e.to_string())),
        }
    }

    pub(crate) fn release_tag(&self, kind: TagKind, tag: &str) {
        self.tags.release(kind, tag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRunner;

    #[test]
    fn clones_share_the_tag_registry() {
        let harness = Harness::with_runner(HarnessConfig::default(), Arc::new(MockRunner::new()));
        let other = harness.clone();
        harness.claim_tag(TagKind::Image, Some("ahoj")).unwrap();
        let err = other.claim_tag(TagKind::Image, Some("ahoj")).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidArgument(_)));
    }

    #[test]
    fn engine_comes_from_config() {
        let harness = Harness::with_runner(
            HarnessConfig::default().with_engine("podman"),
            Arc::new(MockRunner::new()),
        );
        assert_eq!(harness.engine().to_string(), "podman");
    }

    #[test]
    fn generated_tags_are_released() {
        let harness = Harness::with_runner(HarnessConfig::default(), Arc::new(MockRunner::new()));
        let tag = harness.claim_tag(TagKind::Container, None).unwrap();
        assert!(harness.tags().contains(TagKind::Container, &tag));
        harness.release_tag(TagKind::Container, &tag);
        assert!(harness.tags().is_empty());
    }
}
