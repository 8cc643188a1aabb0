use crate::harness::Harness;
use crate::RuntimeError;
use dockhand_schema::{first_record, ImageTag, TagKind};
use serde_json::Value;
use std::fmt;
use tracing::{debug, info};

/// Marker that makes a source reference an archive to import.
const ARCHIVE_MARKER: &str = ".tar";
/// Prefixes that mark a reference as already present in local storage.
const LOCAL_PREFIXES: [&str; 2] = ["docker=", "docker:"];

/// Where an image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Tarball imported with `image import`.
    Archive(String),
    /// Image already in local storage, addressed by this reference.
    Local(String),
    /// Registry reference fetched with `image pull`.
    Remote(String),
}

impl ImageSource {
    pub fn parse(reference: &str) -> Self {
        let reference = reference.trim();
        if reference.contains(ARCHIVE_MARKER) {
            return ImageSource::Archive(reference.to_owned());
        }
        for prefix in LOCAL_PREFIXES {
            if let Some(local) = reference.strip_prefix(prefix) {
                return ImageSource::Local(local.to_owned());
            }
        }
        ImageSource::Remote(reference.to_owned())
    }
}

/// A locally tagged container image.
pub struct Image {
    harness: Harness,
    tag: ImageTag,
    original: String,
    inspected: Option<Value>,
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("tag", &self.tag)
            .field("original", &self.original)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)
    }
}

impl Image {
    /// Materialize `source` and tag it as `tag` (random when `None`).
    pub fn new(harness: &Harness, source: &str, tag: Option<&str>) -> Result<Self, RuntimeError> {
        let source = source.trim();
        if source.is_empty() {
            return Err(RuntimeError::InvalidArgument(
                "image source must not be empty".to_owned(),
            ));
        }

        let tag = Self::claim(harness, tag)?;
        let mut image = Self {
            harness: harness.clone(),
            tag,
            original: source.to_owned(),
            inspected: None,
        };
        if let Err(e) = image.materialize(ImageSource::parse(source)) {
            harness.release_tag(TagKind::Image, &image.tag);
            return Err(e);
        }
        info!("image {} ready (from {source})", image.tag);
        Ok(image)
    }

    /// Adopt an image that is already tagged `tag` locally.
    pub fn existing(harness: &Harness, tag: &str) -> Result<Self, RuntimeError> {
        let tag = Self::claim(harness, Some(tag))?;
        Ok(Self {
            harness: harness.clone(),
            original: tag.to_string(),
            tag,
            inspected: None,
        })
    }

    /// Record the reference an adopted image was tagged from, so that
    /// `clean(true)` removes it as well.
    #[must_use]
    pub fn with_original(mut self, original: impl Into<String>) -> Self {
        self.original = original.into();
        self
    }

    fn claim(harness: &Harness, tag: Option<&str>) -> Result<ImageTag, RuntimeError> {
        if let Some(explicit) = tag {
            ImageTag::new(explicit).map_err(|e| RuntimeError::InvalidArgument(e.to_string()))?;
        }
        let claimed = harness.claim_tag(TagKind::Image, tag)?;
        ImageTag::new(claimed.as_str()).map_err(|e| {
            harness.release_tag(TagKind::Image, &claimed);
            RuntimeError::InvalidArgument(e.to_string())
        })
    }

    fn materialize(&mut self, source: ImageSource) -> Result<(), RuntimeError> {
        let runner = self.harness.runner();
        match source {
            ImageSource::Archive(path) => {
                runner.output(
                    &self
                        .harness
                        .engine()
                        .args(["image", "import", path.as_str(), self.tag.as_str()]),
                )?;
                // The archive is not addressable by the engine afterwards.
                self.original = self.tag.to_string();
                return Ok(());
            }
            ImageSource::Local(reference) => {
                debug!("image {reference} is local, skipping pull");
                self.original = reference;
            }
            ImageSource::Remote(reference) => {
                runner.output(
                    &self
                        .harness
                        .engine()
                        .args(["image", "pull", reference.as_str()]),
                )?;
                self.original = reference;
            }
        }
        runner.output(&self.harness.engine().args([
            "image",
            "tag",
            self.original.as_str(),
            self.tag.as_str(),
        ]))?;
        Ok(())
    }

    pub fn tag(&self) -> &ImageTag {
        &self.tag
    }

    /// Reference the image was created from (the tag itself after an import).
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Inspect record, served from cache unless `force_refresh` or not yet fetched.
    pub fn inspect(&mut self, force_refresh: bool) -> Result<&Value, RuntimeError> {
        let record = match self.inspected.take() {
            Some(cached) if !force_refresh => cached,
            _ => self.fetch_inspect()?,
        };
        Ok(self.inspected.insert(record))
    }

    pub fn refresh(&mut self) -> Result<&Value, RuntimeError> {
        self.inspect(true)
    }

    fn fetch_inspect(&self) -> Result<Value, RuntimeError> {
        let cmd = self
            .harness
            .engine()
            .args(["image", "inspect", self.tag.as_str()]);
        let stdout = self.harness.runner().output(&cmd)?;
        first_record(&stdout).map_err(|e| RuntimeError::UnexpectedOutput {
            command: cmd.to_string(),
            reason: e.to_string(),
        })
    }

    /// Remove the local tag, and with `force` the original reference too.
    ///
    /// The tag stays claimed in the registry when the engine refuses to
    /// remove it, since the engine still knows the image under that name.
    pub fn clean(self, force: bool) -> Result<(), RuntimeError> {
        let runner = self.harness.runner();
        runner.output(
            &self
                .harness
                .engine()
                .args(["image", "remove", self.tag.as_str()]),
        )?;
        self.harness.release_tag(TagKind::Image, &self.tag);
        info!("image {} removed", self.tag);

        if force && self.tag != self.original.as_str() {
            runner.output(
                &self
                    .harness
                    .engine()
                    .args(["image", "remove", self.original.as_str()]),
            )?;
        }
        Ok(())
    }
}
