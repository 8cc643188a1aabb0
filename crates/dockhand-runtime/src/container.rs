use crate::harness::Harness;
use crate::image::Image;
use crate::lifecycle::{validate_transition, ContainerState};
use crate::process::{CommandLine, StreamIo};
use crate::RuntimeError;
use dockhand_schema::{first_record, ip_address, ContainerStateView, ContainerTag, ImageTag, TagKind};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::process::Child;
use tracing::{debug, info, warn};

/// A named container bound to one image.
///
/// The container does not own the image; cleaning the container leaves the
/// image in place.
pub struct Container {
    harness: Harness,
    tag: ContainerTag,
    image: ImageTag,
    runtime_id: Option<String>,
    state: ContainerState,
    inspected: Option<Value>,
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("tag", &self.tag)
            .field("image", &self.image)
            .field("runtime_id", &self.runtime_id)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)
    }
}

impl Container {
    pub fn new(harness: &Harness, image: &Image, tag: Option<&str>) -> Result<Self, RuntimeError> {
        if let Some(explicit) = tag {
            ContainerTag::new(explicit)
                .map_err(|e| RuntimeError::InvalidArgument(e.to_string()))?;
        }
        let claimed = harness.claim_tag(TagKind::Container, tag)?;
        let tag = ContainerTag::new(claimed.as_str()).map_err(|e| {
            harness.release_tag(TagKind::Container, &claimed);
            RuntimeError::InvalidArgument(e.to_string())
        })?;
        Ok(Self {
            harness: harness.clone(),
            tag,
            image: image.tag().clone(),
            runtime_id: None,
            state: ContainerState::Idle,
            inspected: None,
        })
    }

    pub fn tag(&self) -> &ContainerTag {
        &self.tag
    }

    pub fn image_tag(&self) -> &ImageTag {
        &self.image
    }

    pub fn state(&self) -> ContainerState {
        self.state
    }

    /// Engine id of the background instance, set only while started.
    pub fn runtime_id(&self) -> Option<&str> {
        self.runtime_id.as_deref()
    }

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
            .args(["container", "inspect", self.tag.as_str()]);
        let stdout = self.harness.runner().output(&cmd)?;
        first_record(&stdout).map_err(|e| unexpected(&cmd, &e))
    }

    /// Re-inspects and reports whether the container is running, unpaused
    /// and not dead.
    pub fn is_running(&mut self) -> Result<bool, RuntimeError> {
        let record = self.refresh()?;
        let state = ContainerStateView::from_record(record).map_err(|e| {
            RuntimeError::UnexpectedOutput {
                command: "container inspect".to_owned(),
                reason: e.to_string(),
            }
        })?;
        Ok(state.is_running())
    }

    /// `NetworkSettings.IPAddress` from the (cached) inspect record.
    pub fn ip_address(&mut self) -> Result<Option<String>, RuntimeError> {
        Ok(ip_address(self.inspect(false)?).map(str::to_owned))
    }

    /// Start `command` in the background.
    ///
    /// `extra_params` replaces the configured background parameters
    /// (`-it -d` by default).
    pub fn start(&mut self, command: &str, extra_params: Option<&str>) -> Result<(), RuntimeError> {
        if self.runtime_id.is_some() {
            return Err(RuntimeError::AlreadyRunning(self.tag.to_string()));
        }
        validate_transition(&self.tag, self.state, ContainerState::Started)?;

        let params = extra_params
            .unwrap_or(self.harness.config().background_params.as_str())
            .to_owned();
        // Mark as started first so nothing treats it as a throwaway run.
        self.state = ContainerState::Started;
        self.inspected = None;

        let output = match self.invoke_run(command, &params) {
            Ok(output) => output,
            Err(e) => {
                self.state = ContainerState::Exited;
                return Err(e);
            }
        };
        let Some(id) = parse_runtime_id(&output) else {
            self.state = ContainerState::Exited;
            return Err(RuntimeError::UnexpectedOutput {
                command: format!("{} container run", self.harness.config().engine),
                reason: "no container id in output".to_owned(),
            });
        };
        info!("container {} started in background ({id})", self.tag);
        self.runtime_id = Some(id);
        Ok(())
    }

    /// Run `command` in the foreground and remove the container afterwards.
    ///
    /// Removal also happens when the command fails; the handle returns to
    /// `Idle` and can run again.
    pub fn run(&mut self, command: &str, params: &str) -> Result<String, RuntimeError> {
        match self.state {
            ContainerState::Idle => {}
            ContainerState::Started => {
                return Err(RuntimeError::AlreadyRunning(self.tag.to_string()))
            }
            other => {
                return Err(RuntimeError::InvalidTransition {
                    tag: self.tag.to_string(),
                    from: other,
                    to: ContainerState::Exited,
                })
            }
        }
        let result = self.invoke_run(command, params);
        self.remove_quietly();
        self.inspected = None;
        result
    }

    /// Run `command` in the foreground and keep the exited container for
    /// inspection until `clean`.
    pub fn run_and_keep(&mut self, command: &str, params: &str) -> Result<String, RuntimeError> {
        if self.state == ContainerState::Started {
            return Err(RuntimeError::AlreadyRunning(self.tag.to_string()));
        }
        validate_transition(&self.tag, self.state, ContainerState::Exited)?;
        self.state = ContainerState::Exited;
        self.inspected = None;
        self.invoke_run(command, params)
    }

    fn run_command(&self, command: &str, params: &str) -> CommandLine {
        self.harness
            .engine()
            .args(["container", "run", "--name", self.tag.as_str()])
            .args_str(params)
            .arg(self.image.as_str())
            .args_str(command)
    }

    fn invoke_run(&self, command: &str, params: &str) -> Result<String, RuntimeError> {
        self.harness
            .runner()
            .output(&self.run_command(command, params))
    }

    fn exec_command(&self, command: &str) -> Result<CommandLine, RuntimeError> {
        if self.runtime_id.is_none() {
            return Err(RuntimeError::NotRunning(self.tag.to_string()));
        }
        Ok(self.harness.engine().args([
            "container",
            "exec",
            self.tag.as_str(),
            self.harness.config().exec_shell.as_str(),
            "-c",
            command,
        ]))
    }

    /// Run a shell command inside the started container.
    pub fn execute(&self, command: &str) -> Result<String, RuntimeError> {
        let cmd = self.exec_command(command)?;
        self.harness.runner().output(&cmd)
    }

    /// Like [`Container::execute`] but returns the live process immediately.
    pub fn execute_streaming(&self, command: &str, io: StreamIo) -> Result<Child, RuntimeError> {
        let cmd = self.exec_command(command)?;
        self.harness.runner().spawn(&cmd, io)
    }

    /// Install packages with the configured install command. Returns `None`
    /// without running anything when `packages` is empty.
    pub fn install_packages<S: AsRef<str>>(
        &self,
        packages: &[S],
    ) -> Result<Option<String>, RuntimeError> {
        if packages.is_empty() {
            return Ok(None);
        }
        let list: Vec<&str> = packages.iter().map(AsRef::as_ref).collect();
        debug!("installing packages in {}: {}", self.tag, list.join(" "));
        let command = format!(
            "{} {}",
            self.harness.config().install_command,
            list.join(" ")
        );
        self.execute(&command).map(Some)
    }

    /// Stop the background instance if it is running; otherwise a no-op.
    pub fn stop(&mut self) -> Result<(), RuntimeError> {
        let Some(id) = self.runtime_id.clone() else {
            return Ok(());
        };
        if !self.is_running()? {
            return Ok(());
        }
        self.harness
            .runner()
            .output(&self.harness.engine().args(["stop", id.as_str()]))?;
        validate_transition(&self.tag, self.state, ContainerState::Exited)?;
        self.state = ContainerState::Exited;
        self.runtime_id = None;
        self.inspected = None;
        info!("container {} stopped", self.tag);
        Ok(())
    }

    /// Copy a host path into the container.
    pub fn copy_to(&self, src: &Path, dest: &str) -> Result<(), RuntimeError> {
        let src = src.to_string_lossy();
        let target = format!("{}:{dest}", self.tag);
        self.harness
            .runner()
            .output(&self.harness.engine().args(["cp", &*src, target.as_str()]))?;
        Ok(())
    }

    /// Copy a container path to the host, starting the container with the
    /// keep-alive command first if it was never started.
    pub fn copy_from(&mut self, src: &str, dest: &Path) -> Result<(), RuntimeError> {
        if self.state == ContainerState::Idle {
            let keepalive = self.harness.config().keepalive_command.clone();
            self.start(&keepalive, None)?;
        }
        let source = format!("{}:{src}", self.tag);
        let dest = dest.to_string_lossy();
        self.harness
            .runner()
            .output(&self.harness.engine().args(["cp", source.as_str(), &*dest]))?;
        Ok(())
    }

    /// Stop and remove the container. Never fails: problems are logged and
    /// the handle ends up `Removed` either way, so repeated calls are fine.
    pub fn clean(&mut self) {
        if let Err(e) = self.stop() {
            warn!("container {}: stop during cleanup failed: {e}", self.tag);
        }
        self.runtime_id = None;
        self.remove_quietly();
        self.state = ContainerState::Removed;
        self.inspected = None;
        self.harness.release_tag(TagKind::Container, &self.tag);
    }

    fn remove_quietly(&self) {
        let cmd = self
            .harness
            .engine()
            .args(["container", "rm", self.tag.as_str()]);
        match self.harness.runner().output(&cmd) {
            Ok(_) => debug!("container {} removed", self.tag),
            Err(e) => warn!("container {} already removed: {e}", self.tag),
        }
    }
}

/// Container id printed by a detached `run`: the second-to-last element of
/// the newline-split output, i.e. the last non-empty line.
fn parse_runtime_id(output: &str) -> Option<String> {
    output
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_owned)
}

fn unexpected(cmd: &CommandLine, e: &dockhand_schema::SchemaError) -> RuntimeError {
    RuntimeError::UnexpectedOutput {
        command: cmd.to_string(),
        reason: e.to_string(),
    }
}
