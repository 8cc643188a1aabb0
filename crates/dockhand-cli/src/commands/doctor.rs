use super::{colorize_status, EXIT_FAILURE, EXIT_SUCCESS};
use dockhand_runtime::{check_prereqs, MissingPrereq, PrereqKind};
use dockhand_schema::HarnessConfig;

pub fn run(config: &HarnessConfig, json_output: bool) -> Result<u8, String> {
    let mut checks = vec![Check::info(
        "engine",
        &format!("Container engine: {}", config.engine),
    )];
    let missing = check_prereqs(config);
    let all_pass = collect(&mut checks, &missing);
    print_results(&checks, all_pass, json_output)
}

/// Turn missing prerequisites into checks. Only the engine is fatal; the
/// labeling tools are needed just for volumes that ask for them.
fn collect(checks: &mut Vec<Check>, missing: &[MissingPrereq]) -> bool {
    let mut all_pass = true;
    let engine_missing: Vec<_> = missing
        .iter()
        .filter(|m| m.kind == PrereqKind::Engine)
        .collect();
    if engine_missing.is_empty() {
        checks.push(Check::pass("engine_available", "Container engine is reachable"));
    } else {
        all_pass = false;
        for m in engine_missing {
            checks.push(Check::fail("engine_available", m.to_string().trim()));
        }
    }

    for tool in ["setfacl", "chcon"] {
        match missing
            .iter()
            .find(|m| m.kind == PrereqKind::Labeling && m.name == tool)
        {
            Some(m) => checks.push(Check::warn(tool, m.to_string().trim())),
            None => checks.push(Check::pass(tool, &format!("{tool} available"))),
        }
    }
    all_pass
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?
        );
    } else {
        println!("dockhand doctor\n");
        for check in checks {
            let icon = match check.status {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} [{}] {}", colorize_status(check.status), check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: String,
    status: &'static str,
    message: String,
}

impl Check {
    fn new(name: &str, status: &'static str, message: &str) -> Self {
        Self {
            name: name.to_owned(),
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn warn(name: &str, message: &str) -> Self {
        Self::new(name, "warn", message)
    }

    fn info(name: &str, message: &str) -> Self {
        Self::new(name, "info", message)
    }
}
