use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use envlocker::{resolve, upload, ProcessEnv, Resolution, ResolveOptions, UploadRequest};
use envlocker_secrets::OnePasswordCli;
use tracing_subscriber::EnvFilter;

/// envlocker - inject secrets from 1Password into your environment
#[derive(Parser, Debug)]
#[command(name = "envlocker")]
#[command(about = "Inject secrets from 1Password into a process environment")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log backend calls and skip reasons
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a command with the environment's secrets injected
    Run {
        #[command(flatten)]
        target: TargetArgs,

        /// Command to run, after `--`
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// List the variable names that would be injected
    Show {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Create a new item from a .env file
    Upload {
        /// Path to the .env file
        file: PathBuf,

        /// Title of the new item
        #[arg(long)]
        title: String,

        /// Vault to create the item in
        #[arg(long)]
        vault: String,

        /// Account to use (for multi-account setups)
        #[arg(long)]
        account: Option<String>,

        /// Item category (default: Server)
        #[arg(long)]
        category: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
struct TargetArgs {
    /// Environment name (default: $ENVLOCKER_ENV_NAME, then "development")
    #[arg(short, long)]
    env: Option<String>,

    /// Directory containing .envlockerrc (default: current directory)
    #[arg(long)]
    dir: Option<PathBuf>,
}

impl TargetArgs {
    fn options(&self) -> ResolveOptions {
        ResolveOptions {
            env_name: self.env.clone(),
            base_dir: self.dir.clone(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("envlocker={}", level).parse()?)
                .add_directive(format!("envlocker_secrets={}", level).parse()?),
        )
        .init();

    let backend = OnePasswordCli::new();

    match cli.command {
        Commands::Run { target, command } => run_command(&backend, &target, &command),
        Commands::Show { target } => run_show(&backend, &target),
        Commands::Upload {
            file,
            title,
            vault,
            account,
            category,
        } => {
            let request = UploadRequest {
                file_path: file,
                title,
                vault,
                account,
                category,
            };
            run_upload(&backend, &request)
        }
    }
}

fn run_command(backend: &OnePasswordCli, target: &TargetArgs, command: &[String]) -> Result<()> {
    let (program, args) = command.split_first().context("No command given")?;

    // Single-threaded at this point; the child inherits the injected variables.
    let resolution = resolve(backend, &mut ProcessEnv, &target.options());
    if let Resolution::Skipped(reason) = &resolution {
        tracing::debug!("No secrets injected: {}", reason);
    }

    let status = Command::new(program)
        .args(args)
        .status()
        .with_context(|| format!("Failed to run '{}'", program))?;

    std::process::exit(status.code().unwrap_or(1));
}

fn run_show(backend: &OnePasswordCli, target: &TargetArgs) -> Result<()> {
    let mut values: BTreeMap<String, String> = BTreeMap::new();

    match resolve(backend, &mut values, &target.options()) {
        Resolution::Applied(report) => {
            for key in &report.injected {
                println!("{}", key);
            }
        }
        Resolution::Skipped(reason) => {
            eprintln!("Nothing to inject: {}", reason);
        }
    }

    Ok(())
}

fn run_upload(backend: &OnePasswordCli, request: &UploadRequest) -> Result<()> {
    let item = upload(backend, request)
        .with_context(|| format!("Failed to upload {}", request.file_path.display()))?;

    println!(
        "Created item '{}' ({}) in vault '{}'",
        item.title.as_deref().unwrap_or(&request.title),
        item.id.as_deref().unwrap_or("unknown id"),
        request.vault
    );

    Ok(())
}
