use super::{colorize_status, describe, json_pretty, EXIT_SUCCESS};
use dockhand_runtime::Probe;
use dockhand_schema::HarnessConfig;
use std::path::Path;

/// Configured probe defaults with command-line overrides applied.
pub fn configure(
    config: &HarnessConfig,
    attempts: Option<u32>,
    delay_ms: Option<u64>,
    timeout_ms: Option<u64>,
) -> Probe {
    let mut probe = config.probe;
    if let Some(attempts) = attempts {
        probe.attempts = attempts;
    }
    if let Some(delay_ms) = delay_ms {
        probe.delay_ms = delay_ms;
    }
    if let Some(timeout_ms) = timeout_ms {
        probe.connect_timeout_ms = timeout_ms;
    }
    Probe::new(probe)
}

pub fn port(probe: &Probe, host: &str, port: u16, json: bool) -> Result<u8, String> {
    let target = format!("{host}:{port}");
    report(&target, probe.wait_for_port(host, port), "open", json)
}

pub fn path(probe: &Probe, path: &Path, json: bool) -> Result<u8, String> {
    let target = path.display().to_string();
    report(&target, probe.wait_for_path(path), "present", json)
}

fn report(
    target: &str,
    outcome: Result<u32, dockhand_runtime::RuntimeError>,
    ready: &str,
    json: bool,
) -> Result<u8, String> {
    let attempt = outcome.map_err(|e| describe(&e))?;
    if json {
        let out = serde_json::json!({ "target": target, "ready": true, "attempt": attempt });
        println!("{}", json_pretty(&out)?);
    } else {
        println!("{target} {} (attempt {attempt})", colorize_status(ready));
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_configured_values() {
        let config = HarnessConfig::default();
        let probe = configure(&config, Some(5), None, Some(100));
        assert_eq!(probe.config().attempts, 5);
        assert_eq!(probe.config().delay_ms, config.probe.delay_ms);
        assert_eq!(probe.config().connect_timeout_ms, 100);
    }

    #[test]
    fn existing_path_succeeds_first_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let probe = configure(&HarnessConfig::default(), Some(1), Some(1), None);
        assert_eq!(path(&probe, dir.path(), true).unwrap(), EXIT_SUCCESS);
    }

    #[test]
    fn missing_path_is_probe_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let probe = configure(&HarnessConfig::default(), Some(2), Some(1), None);
        let err = path(&probe, &dir.path().join("never"), false).unwrap_err();
        assert!(err.starts_with("probe timeout:"));
    }
}
