use super::{describe, json_pretty, EXIT_SUCCESS};
use dockhand_runtime::{Harness, VolumeSpec};
use std::path::PathBuf;

pub struct CreateArgs {
    pub dir: Option<PathBuf>,
    pub target: Option<String>,
    pub permissions: Option<String>,
    pub acl: Vec<String>,
    pub selinux_type: Option<String>,
    pub relabel: bool,
}

impl CreateArgs {
    fn into_spec(self) -> VolumeSpec {
        VolumeSpec {
            directory: self.dir,
            target: self.target,
            permissions: self.permissions,
            acl_rules: self.acl,
            selinux_type: self.selinux_type,
            force_relabel: self.relabel,
        }
    }
}

/// Create the volume and leave it in place for later mounts.
pub fn create(harness: &Harness, args: CreateArgs, json: bool) -> Result<u8, String> {
    let volume = harness.volume(args.into_spec()).map_err(|e| describe(&e))?;
    let mount = volume.target().map(|_| volume.docker()).transpose();
    let mount = mount.map_err(|e| describe(&e))?;

    if json {
        let out = serde_json::json!({
            "host_path": volume.host_path().display().to_string(),
            "target": volume.target(),
            "mount": mount,
        });
        println!("{}", json_pretty(&out)?);
    } else {
        println!("{volume}");
        if let Some(mount) = mount {
            println!("{mount}");
        }
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_map_onto_volume_spec() {
        let spec = CreateArgs {
            dir: Some(PathBuf::from("/tmp/superdir")),
            target: Some("/data".to_owned()),
            permissions: Some("a+x".to_owned()),
            acl: vec!["u:26:rwx".to_owned()],
            selinux_type: None,
            relabel: true,
        }
        .into_spec();
        assert_eq!(
            spec,
            VolumeSpec::new()
                .directory("/tmp/superdir")
                .target("/data")
                .permissions("a+x")
                .acl_rule("u:26:rwx")
                .force_relabel(true)
        );
    }
}
