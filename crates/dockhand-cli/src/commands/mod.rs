pub mod completions;
pub mod doctor;
pub mod image;
pub mod probe;
pub mod run;
pub mod volume;

use dockhand_runtime::RuntimeError;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_COMMAND_ERROR: u8 = 3;
pub const EXIT_PROBE_TIMEOUT: u8 = 4;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// Render a runtime error with the prefix `main` maps to an exit code.
pub fn describe(err: &RuntimeError) -> String {
    match err {
        RuntimeError::CommandFailed { .. } | RuntimeError::Spawn { .. } => {
            format!("command failed: {err}")
        }
        RuntimeError::ProbeTimeout { .. } => format!("probe timeout: {err}"),
        other => other.to_string(),
    }
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
    pb.set_style(style);
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn finish(pb: &ProgressBar, msg: String) {
    if let Ok(style) = ProgressStyle::with_template("{msg}") {
        pb.set_style(style);
    }
    pb.finish_with_message(msg);
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    finish(pb, format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    finish(pb, format!("✗ {msg}"));
}

/// Spinner on a TTY, nothing in JSON mode.
pub fn progress(msg: &str, json: bool) -> Option<ProgressBar> {
    (!json).then(|| spinner(msg))
}

pub fn colorize_status(status: &str) -> String {
    use console::Style;
    match status {
        "pass" | "open" | "present" => Style::new().green().apply_to(status).to_string(),
        "fail" | "closed" | "missing" => Style::new().red().bold().apply_to(status).to_string(),
        "warn" => Style::new().yellow().apply_to(status).to_string(),
        other => other.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_pretty_serializes_object() {
        let val = serde_json::json!({"tag": "ahoj"});
        let result = json_pretty(&val).unwrap();
        assert!(result.contains("\"tag\""));
        assert!(result.contains("\"ahoj\""));
    }

    #[test]
    fn describe_prefixes_map_to_exit_codes() {
        let failed = RuntimeError::CommandFailed {
            command: "docker image pull nope".to_owned(),
            code: Some(1),
            stdout: String::new(),
            stderr: "not found".to_owned(),
        };
        assert!(describe(&failed).starts_with("command failed:"));

        let timeout = RuntimeError::ProbeTimeout {
            what: "port 127.0.0.1:1".to_owned(),
            attempts: 3,
        };
        assert!(describe(&timeout).starts_with("probe timeout:"));

        let other = RuntimeError::InvalidArgument("bad tag".to_owned());
        assert_eq!(describe(&other), "invalid argument: bad tag");
    }

    #[test]
    fn colorize_status_keeps_text() {
        for status in ["pass", "fail", "warn", "open", "closed"] {
            assert!(colorize_status(status).contains(status));
        }
        assert_eq!(colorize_status("info"), "info");
    }

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_FAILURE,
            EXIT_CONFIG_ERROR,
            EXIT_COMMAND_ERROR,
            EXIT_PROBE_TIMEOUT,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn spinner_finishes() {
        let pb = spinner("testing...");
        spin_ok(&pb, "done");
        let pb = spinner("testing...");
        spin_fail(&pb, "failed");
        assert!(progress("quiet", true).is_none());
    }
}
