//! hab-client - run the Habitat `hab` binary through the binding.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hab_client::config::{ConfigLoader, HabConfig};
use hab_client::display;
use hab_client::{Arg, Execution, Hab, HabError, OptionMap};

#[derive(Parser)]
#[command(
    name = "hab-client",
    about = "Run the Habitat hab binary and query its supervisor",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file to load instead of the default search paths.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the hab binary.
    #[arg(long, global = true)]
    binary: Option<PathBuf>,

    /// Base URL of the supervisor HTTP API.
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the hab version and build.
    Version,
    /// Fail unless the hab version satisfies a semver range.
    Require {
        /// Version range, e.g. ">=1.6.0".
        range: String,
    },
    /// Show `hab svc status` as a table.
    Status,
    /// List services from the supervisor HTTP API.
    Services,
    /// Run hab with arbitrary arguments.
    #[allow(clippy::struct_excessive_bools)]
    Run {
        /// Spawn the process and stream nothing unless --passthrough is set.
        #[arg(long)]
        spawn: bool,
        /// Run through a shell.
        #[arg(long)]
        shell: bool,
        /// Stream output lines to the log as they arrive.
        #[arg(long)]
        passthrough: bool,
        /// Wait for a spawned process to exit.
        #[arg(long)]
        wait: bool,
        /// Print a null marker instead of failing.
        #[arg(long)]
        null_on_error: bool,
        /// Arguments passed to hab, subcommand first.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<HabConfig, HabError> {
    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_path(path.clone()),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load()?;
    if let Some(binary) = &cli.binary {
        config.binary.clone_from(binary);
    }
    if let Some(url) = &cli.api_url {
        config.api_base_url.clone_from(url);
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<(), HabError> {
    let hab = Hab::new(load_config(&cli)?)?;

    match cli.command {
        Commands::Version => display::print_version(hab.version().await),
        Commands::Require { range } => {
            hab.require_version(&range).await?;
            display::print_requirement_met(&range, hab.version().await);
        }
        Commands::Status => match hab.status().await {
            Some(rows) => display::print_status(&rows),
            None => display::print_error("hab svc status failed"),
        },
        Commands::Services => display::print_json(&hab.get_services().await?),
        Commands::Run {
            spawn,
            shell,
            passthrough,
            wait,
            null_on_error,
            args,
        } => {
            let directives = OptionMap::new()
                .spawn(spawn)
                .shell(shell)
                .passthrough(passthrough)
                .wait(wait)
                .null_on_error(null_on_error);
            let call = args
                .into_iter()
                .map(Arg::from)
                .chain(std::iter::once(Arg::from(directives)));

            match hab.exec(call).await? {
                Execution::Output(output) => display::print_output(&output),
                Execution::Null => display::print_null(),
                Execution::Completed => {}
                Execution::Spawned(process) => {
                    let output = process.capture_trimmed(None).await?;
                    if !passthrough {
                        display::print_output(&output);
                    }
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            display::print_error(&err.to_string());
            ExitCode::FAILURE
        }
    }
}
