use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "DOCKHAND_CONFIG";
/// Environment variable overriding the engine binary.
pub const ENGINE_ENV: &str = "DOCKHAND_ENGINE";

/// Settings shared by every component created from one harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Container-management CLI, e.g. `docker` or `podman`.
    #[serde(default = "default_engine")]
    pub engine: String,
    /// Prefix used by `Container::install_packages`.
    #[serde(default = "default_install_command")]
    pub install_command: String,
    /// Shell that wraps commands passed to `Container::execute`.
    #[serde(default = "default_exec_shell")]
    pub exec_shell: String,
    /// Command used when a container has to be started implicitly.
    #[serde(default = "default_keepalive_command")]
    pub keepalive_command: String,
    /// Extra `run` parameters for background starts.
    #[serde(default = "default_background_params")]
    pub background_params: String,
    #[serde(default)]
    pub probe: ProbeConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            install_command: default_install_command(),
            exec_shell: default_exec_shell(),
            keepalive_command: default_keepalive_command(),
            background_params: default_background_params(),
            probe: ProbeConfig::default(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay_ms: default_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl ProbeConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl HarnessConfig {
    #[must_use]
    pub fn with_engine(mut self, engine: &str) -> Self {
        engine.clone_into(&mut self.engine);
        self
    }

    pub fn parse(input: &str) -> Result<Self, SchemaError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load from `$DOCKHAND_CONFIG`, else `~/.config/dockhand/config.toml`
    /// when it exists, else defaults. `$DOCKHAND_ENGINE` is applied last.
    pub fn load_default() -> Result<Self, SchemaError> {
        let config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path))?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load(&path)?,
                _ => Self::default(),
            },
        };
        Ok(config.apply_env())
    }

    #[must_use]
    pub fn apply_env(self) -> Self {
        match std::env::var(ENGINE_ENV) {
            Ok(engine) if !engine.trim().is_empty() => self.with_engine(engine.trim()),
            _ => self,
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SchemaError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.engine.trim().is_empty() {
            return Err(SchemaError::Config("engine must not be empty".to_owned()));
        }
        if self.engine.contains(char::is_whitespace) {
            return Err(SchemaError::Config(format!(
                "engine must be a single program name, got '{}'",
                self.engine
            )));
        }
        if self.exec_shell.trim().is_empty() {
            return Err(SchemaError::Config(
                "exec_shell must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(PathBuf::from(home).join(".config/dockhand/config.toml"))
}

fn default_engine() -> String {
    "docker".to_owned()
}

fn default_install_command() -> String {
    "dnf -y install".to_owned()
}

fn default_exec_shell() -> String {
    "/bin/bash".to_owned()
}

fn default_keepalive_command() -> String {
    "/bin/bash".to_owned()
}

fn default_background_params() -> String {
    "-it -d".to_owned()
}

fn default_attempts() -> u32 {
    1
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_connect_timeout_ms() -> u64 {
    2000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = HarnessConfig::parse("").unwrap();
        assert_eq!(config, HarnessConfig::default());
        assert_eq!(config.engine, "docker");
        assert_eq!(config.background_params, "-it -d");
        assert_eq!(config.probe.delay(), Duration::from_secs(1));
        assert_eq!(config.probe.connect_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn parses_partial_document() {
        let config = HarnessConfig::parse(
            r#"
engine = "podman"
install_command = "microdnf -y install"

[probe]
attempts = 10
"#,
        )
        .unwrap();
        assert_eq!(config.engine, "podman");
        assert_eq!(config.install_command, "microdnf -y install");
        assert_eq!(config.probe.attempts, 10);
        assert_eq!(config.probe.delay_ms, 1000);
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(HarnessConfig::parse("engines = \"docker\"").is_err());
        assert!(HarnessConfig::parse("[probe]\nretries = 3").is_err());
    }

    #[test]
    fn rejects_engine_with_arguments() {
        let err = HarnessConfig::parse("engine = \"sudo docker\"").unwrap_err();
        assert!(err.to_string().contains("single program name"));
    }

    #[test]
    fn config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let config = HarnessConfig::default().with_engine("podman");
        config.save(&path).unwrap();

        let loaded = HarnessConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = HarnessConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, SchemaError::Io(_)));
    }
}
