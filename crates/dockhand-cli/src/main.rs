mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_COMMAND_ERROR, EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_PROBE_TIMEOUT};
use dockhand_runtime::Harness;
use dockhand_schema::HarnessConfig;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "dockhand",
    version,
    about = "Drive container images, containers and volumes for integration tests"
)]
struct Cli {
    /// Path to a TOML configuration file (default: $DOCKHAND_CONFIG or ~/.config/dockhand/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Container engine binary, overriding configuration.
    #[arg(long, global = true)]
    engine: Option<String>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Manage locally tagged images.
    #[command(subcommand)]
    Image(ImageCommand),
    /// Run a throwaway container in the foreground and print its output.
    Run {
        /// Local image tag.
        image: String,
        /// Extra parameters passed to `container run`.
        #[arg(long, default_value = "")]
        params: String,
        /// Command to run inside the container (after --).
        #[arg(required = true, last = true)]
        command: Vec<String>,
    },
    /// Manage bind-mount volumes.
    #[command(subcommand)]
    Volume(VolumeCommand),
    /// Wait for a port or a path to become available.
    #[command(subcommand)]
    Probe(ProbeCommand),
    /// Check host prerequisites.
    Doctor,
    /// Generate shell completions.
    Completions { shell: Shell },
}

#[derive(Debug, Subcommand)]
enum ImageCommand {
    /// Pull, import or adopt an image and tag it locally.
    Pull {
        /// Registry reference, `*.tar` archive, or `docker=<local ref>`.
        source: String,
        /// Local tag (random when omitted).
        #[arg(long)]
        tag: Option<String>,
    },
    /// Print the inspect record of a tagged image.
    Inspect { tag: String },
    /// Remove a local tag.
    Rm {
        tag: String,
        /// Also remove the reference the tag was created from.
        #[arg(long)]
        original: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum VolumeCommand {
    /// Create a host directory for bind-mounting.
    Create {
        /// Host directory (a temporary directory when omitted).
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Mount point inside the container.
        #[arg(long)]
        target: Option<String>,
        /// Mode passed to chmod.
        #[arg(long)]
        permissions: Option<String>,
        /// ACL rule passed to `setfacl -m` (repeatable).
        #[arg(long = "acl")]
        acl: Vec<String>,
        /// SELinux type passed to `chcon -t`.
        #[arg(long)]
        selinux_type: Option<String>,
        /// Ask the engine to relabel the mount (`:Z`).
        #[arg(long, default_value_t = false)]
        relabel: bool,
    },
}

#[derive(Debug, Subcommand)]
enum ProbeCommand {
    /// Wait until a TCP port accepts connections.
    Port {
        host: String,
        port: u16,
        #[arg(long)]
        attempts: Option<u32>,
        #[arg(long)]
        delay_ms: Option<u64>,
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Wait until a path exists.
    Path {
        path: PathBuf,
        #[arg(long)]
        attempts: Option<u32>,
        #[arg(long)]
        delay_ms: Option<u64>,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("DOCKHAND_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let json_output = cli.json;
    let config = match load_config(cli.config.as_deref(), cli.engine.as_deref()) {
        Ok(config) => config,
        Err(msg) => return report(&msg),
    };

    let result = match cli.command {
        Commands::Image(ImageCommand::Pull { source, tag }) => {
            commands::image::pull(&Harness::new(config), &source, tag.as_deref(), json_output)
        }
        Commands::Image(ImageCommand::Inspect { tag }) => {
            commands::image::inspect(&Harness::new(config), &tag)
        }
        Commands::Image(ImageCommand::Rm { tag, original }) => {
            commands::image::remove(&Harness::new(config), &tag, original.as_deref(), json_output)
        }
        Commands::Run {
            image,
            params,
            command,
        } => commands::run::run(&Harness::new(config), &image, &params, &command, json_output),
        Commands::Volume(VolumeCommand::Create {
            dir,
            target,
            permissions,
            acl,
            selinux_type,
            relabel,
        }) => commands::volume::create(
            &Harness::new(config),
            commands::volume::CreateArgs {
                dir,
                target,
                permissions,
                acl,
                selinux_type,
                relabel,
            },
            json_output,
        ),
        Commands::Probe(ProbeCommand::Port {
            host,
            port,
            attempts,
            delay_ms,
            timeout_ms,
        }) => {
            let probe = commands::probe::configure(&config, attempts, delay_ms, timeout_ms);
            commands::probe::port(&probe, &host, port, json_output)
        }
        Commands::Probe(ProbeCommand::Path {
            path,
            attempts,
            delay_ms,
        }) => {
            let probe = commands::probe::configure(&config, attempts, delay_ms, None);
            commands::probe::path(&probe, &path, json_output)
        }
        Commands::Doctor => commands::doctor::run(&config, json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => report(&msg),
    }
}

fn load_config(path: Option<&Path>, engine: Option<&str>) -> Result<HarnessConfig, String> {
    let config = match path {
        Some(path) => HarnessConfig::load(path)
            .map(HarnessConfig::apply_env)
            .map_err(|e| format!("config error: {}: {e}", path.display()))?,
        None => HarnessConfig::load_default().map_err(|e| format!("config error: {e}"))?,
    };
    let config = match engine {
        Some(engine) => config.with_engine(engine),
        None => config,
    };
    config.validate().map_err(|e| format!("config error: {e}"))?;
    Ok(config)
}

fn report(msg: &str) -> ExitCode {
    eprintln!("error: {msg}");
    let code = if msg.starts_with("config error:") {
        EXIT_CONFIG_ERROR
    } else if msg.starts_with("command failed:") {
        EXIT_COMMAND_ERROR
    } else if msg.starts_with("probe timeout:") {
        EXIT_PROBE_TIMEOUT
    } else {
        EXIT_FAILURE
    };
    ExitCode::from(code)
}
