//! # vaultpress CLI
//!
//! Publishes tagged notes from a markdown vault as a static blog and pushes
//! the rendered pages to a GitHub repository.

mod commands;
mod publish;
mod staging;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vaultpress")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "vaultpress.yml", global = true)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// GitHub token, overriding remote.token from the config file
    #[arg(long, env = "VAULTPRESS_GITHUB_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new vaultpress project
    Init {
        /// Target directory (defaults to current directory)
        path: Option<PathBuf>,
    },

    /// Render the blog into the staging directory without pushing
    Build,

    /// Render, stage and push the blog to the remote branch
    Publish {
        /// Stage locally and skip the remote
        #[arg(long)]
        dry_run: bool,

        /// Emit the publish report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check tagged documents for problems without writing anything
    Verify {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Inspect configuration values
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print one value by dotted key (e.g. site.title)
    Get { key: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `--json` output stays parseable
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { path } => commands::init_project(path.as_deref()),
        Commands::Build => commands::build_site(&cli.config).await,
        Commands::Publish { dry_run, json } => {
            let opts = commands::PublishOptions {
                dry_run,
                json,
                token: cli.token,
            };
            commands::publish_site(&cli.config, opts).await
        }
        Commands::Verify { json } => commands::verify_site(&cli.config, json),
        Commands::Config { command } => match command {
            ConfigCommands::Get { key } => commands::config_get(&cli.config, &key),
        },
    }
}
