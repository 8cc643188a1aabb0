use crate::harness::Harness;
use crate::process::CommandLine;
use crate::RuntimeError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const TEMP_PREFIX: &str = "dockhand-vol-";
/// Suffix asking the engine to relabel the mount with a private SELinux label.
const RELABEL_SUFFIX: &str = ":Z";

/// Options for [`Volume::create`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeSpec {
    /// Host directory; a fresh temporary directory when `None`.
    pub directory: Option<PathBuf>,
    /// Mount point inside the container.
    pub target: Option<String>,
    /// Mode in any form `chmod` accepts (`a+x`, `0750`, ...).
    pub permissions: Option<String>,
    /// `setfacl -m` rules, applied one at a time.
    pub acl_rules: Vec<String>,
    /// SELinux type set with `chcon -t`.
    pub selinux_type: Option<String>,
    pub force_relabel: bool,
}

impl VolumeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.directory = Some(dir.into());
        self
    }

    #[must_use]
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    #[must_use]
    pub fn permissions(mut self, mode: impl Into<String>) -> Self {
        self.permissions = Some(mode.into());
        self
    }

    #[must_use]
    pub fn acl_rule(mut self, rule: impl Into<String>) -> Self {
        self.acl_rules.push(rule.into());
        self
    }

    #[must_use]
    pub fn selinux_type(mut self, selinux_type: impl Into<String>) -> Self {
        self.selinux_type = Some(selinux_type.into());
        self
    }

    #[must_use]
    pub fn force_relabel(mut self, relabel: bool) -> Self {
        self.force_relabel = relabel;
        self
    }
}

/// A host directory bind-mounted into containers.
pub struct Volume {
    harness: Harness,
    host_path: PathBuf,
    target: Option<String>,
    force_relabel: bool,
}

impl fmt::Debug for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Volume")
            .field("host_path", &self.host_path)
            .field("target", &self.target)
            .field("force_relabel", &self.force_relabel)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.host_path.display())
    }
}

impl Volume {
    /// Allocate the host directory and apply permissions, ACL rules and the
    /// SELinux type, in that order.
    pub fn create(harness: &Harness, mut spec: VolumeSpec) -> Result<Self, RuntimeError> {
        let (host_path, created_root) = allocate(spec.directory.take())?;
        let volume = Self {
            harness: harness.clone(),
            host_path,
            target: spec.target.take(),
            force_relabel: spec.force_relabel,
        };

        if let Err(e) = volume.apply_attributes(&spec) {
            if let Some(root) = created_root {
                if let Err(rm) = fs::remove_dir_all(&root) {
                    warn!(
                        "failed to remove {} after labeling error: {rm}",
                        root.display()
                    );
                }
            }
            return Err(e);
        }
        debug!("volume {} ready", volume.host_path.display());
        Ok(volume)
    }

    fn apply_attributes(&self, spec: &VolumeSpec) -> Result<(), RuntimeError> {
        if let Some(mode) = &spec.permissions {
            self.set_permissions(mode)?;
        }
        if !spec.acl_rules.is_empty() {
            self.set_acl(&spec.acl_rules)?;
        }
        if let Some(selinux_type) = &spec.selinux_type {
            self.set_selinux_type(selinux_type)?;
        }
        Ok(())
    }

    pub fn set_permissions(&self, mode: &str) -> Result<(), RuntimeError> {
        self.run_on_dir("chmod", &[mode])
    }

    pub fn set_acl<S: AsRef<str>>(&self, rules: &[S]) -> Result<(), RuntimeError> {
        for rule in rules {
            self.run_on_dir("setfacl", &["-m", rule.as_ref()])?;
        }
        Ok(())
    }

    pub fn set_selinux_type(&self, selinux_type: &str) -> Result<(), RuntimeError> {
        self.run_on_dir("chcon", &["-t", selinux_type])
    }

    fn run_on_dir(&self, program: &str, args: &[&str]) -> Result<(), RuntimeError> {
        let cmd = CommandLine::new(program)
            .args(args.iter().copied())
            .arg(self.host_path.to_string_lossy());
        self.harness.runner().output(&cmd)?;
        Ok(())
    }

    pub fn set_target(&mut self, target: impl Into<String>) {
        self.target = Some(target.into());
    }

    pub fn set_force_relabel(&mut self, relabel: bool) {
        self.force_relabel = relabel;
    }

    pub fn host_path(&self) -> &Path {
        &self.host_path
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn force_relabel(&self) -> bool {
        self.force_relabel
    }

    /// Mount-spec for the engine command line: `-v <host>:<target>[:Z]`.
    pub fn docker(&self) -> Result<String, RuntimeError> {
        let [flag, binding] = self.mount_args()?;
        Ok(format!("{flag} {binding}"))
    }

    /// The mount-spec as two command-line tokens.
    pub fn mount_args(&self) -> Result<[String; 2], RuntimeError> {
        let target = self
            .target
            .as_deref()
            .ok_or_else(|| RuntimeError::MissingTarget(self.host_path.clone()))?;
        let mut binding = format!("{}:{target}", self.host_path.display());
        if self.force_relabel {
            binding.push_str(RELABEL_SUFFIX);
        }
        Ok(["-v".to_owned(), binding])
    }

    /// Host path and target for callers building their own mount syntax.
    pub fn raw(&self) -> (&Path, Option<&str>) {
        (&self.host_path, self.target.as_deref())
    }

    /// Recursively remove the host directory.
    pub fn clean(self) -> Result<(), RuntimeError> {
        fs::remove_dir_all(&self.host_path)?;
        debug!("volume {} removed", self.host_path.display());
        Ok(())
    }
}

/// Returns the directory and the outermost directory this call created,
/// which is what a rollback has to remove.
fn allocate(directory: Option<PathBuf>) -> Result<(PathBuf, Option<PathBuf>), RuntimeError> {
    if let Some(dir) = directory {
        let root = dir
            .ancestors()
            .take_while(|p| !p.as_os_str().is_empty() && !p.exists())
            .last()
            .map(Path::to_path_buf);
        if root.is_some() {
            fs::create_dir_all(&dir)?;
        }
        return Ok((dir, root));
    }

    // Private (0700) directory, kept until `clean`.
    let dir = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempdir()?
        .keep();
    Ok((dir.clone(), Some(dir)))
}
