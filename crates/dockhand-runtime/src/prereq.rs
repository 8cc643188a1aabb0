use dockhand_schema::HarnessConfig;
use std::fmt;
use std::process::{Command, Stdio};

/// What a prerequisite is needed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrereqKind {
    /// The engine CLI or its daemon; nothing works without it.
    Engine,
    /// Volume labeling tools, needed only when a volume asks for ACLs or
    /// SELinux types.
    Labeling,
}

/// A missing host tool, with a hint on how to get it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingPrereq {
    pub kind: PrereqKind,
    pub name: String,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn command_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

fn engine_reachable(engine: &str) -> bool {
    Command::new(engine)
        .arg("info")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

/// Check the host tools the harness shells out to.
/// An empty list means everything is in place.
pub fn check_prereqs(config: &HarnessConfig) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();
    let engine = config.engine.as_str();

    if !command_exists(engine) {
        missing.push(MissingPrereq {
            kind: PrereqKind::Engine,
            name: engine.to_owned(),
            purpose: "container engine CLI",
            install_hint: "dnf install moby-engine | apt install docker.io | dnf install podman-docker",
        });
    } else if !engine_reachable(engine) {
        missing.push(MissingPrereq {
            kind: PrereqKind::Engine,
            name: format!("{engine} daemon"),
            purpose: "running images and containers",
            install_hint: "start the service (systemctl start docker) or add your user to the docker group",
        });
    }

    if !command_exists("setfacl") {
        missing.push(MissingPrereq {
            kind: PrereqKind::Labeling,
            name: "setfacl".to_owned(),
            purpose: "ACL rules on volume directories",
            install_hint: "dnf install acl | apt install acl | zypper install acl",
        });
    }

    if !command_exists("chcon") {
        missing.push(MissingPrereq {
            kind: PrereqKind::Labeling,
            name: "chcon".to_owned(),
            purpose: "SELinux types on volume directories",
            install_hint: "part of coreutils (usually pre-installed)",
        });
    }

    missing
}

/// Render missing prerequisites as a user-facing error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\ndockhand needs these tools to drive containers and volumes.");
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_prereq_display() {
        let m = MissingPrereq {
            kind: PrereqKind::Labeling,
            name: "setfacl".to_owned(),
            purpose: "ACL rules",
            install_hint: "dnf install acl",
        };
        let s = m.to_string();
        assert!(s.contains("setfacl"));
        assert!(s.contains("ACL rules"));
        assert!(s.contains("dnf install acl"));
    }

    #[test]
    fn format_missing_lists_every_item() {
        let items = vec![
            MissingPrereq {
                kind: PrereqKind::Engine,
                name: "docker".to_owned(),
                purpose: "engine",
                install_hint: "apt install docker.io",
            },
            MissingPrereq {
                kind: PrereqKind::Labeling,
                name: "chcon".to_owned(),
                purpose: "labels",
                install_hint: "coreutils",
            },
        ];
        let output = format_missing(&items);
        assert!(output.starts_with("missing prerequisites:"));
        assert!(output.contains("docker"));
        assert!(output.contains("chcon"));
    }

    #[test]
    fn nonexistent_engine_is_reported() {
        let config = HarnessConfig::default().with_engine("dockhand-no-such-engine");
        let missing = check_prereqs(&config);
        assert!(missing
            .iter()
            .any(|m| m.kind == PrereqKind::Engine && m.name == "dockhand-no-such-engine"));
    }

    #[test]
    fn engine_named_like_a_labeling_tool_is_still_an_engine() {
        let config = HarnessConfig::default().with_engine("chcon-no-such-engine");
        for m in check_prereqs(&config) {
            let is_engine = m.name.starts_with("chcon-no-such-engine");
            assert_eq!(m.kind == PrereqKind::Engine, is_engine, "{m}");
        }
    }
}
