use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use prov_core::utils::LogLevel;

mod commands;

/// Provenance capture command-line interface
///
/// Inspect type identifiers, check capture policies and run a simulated
/// recording session.
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Log level (trace, debug, info, warning, error)
    #[clap(long, global = true, default_value = "warning")]
    log_level: LogLevel,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a raw type identifier
    Decode {
        /// Identifier, decimal or 0x-prefixed hex
        id: String,

        /// Print JSON instead of text
        #[clap(long)]
        json: bool,
    },

    /// Find the identifier of a type name
    Lookup {
        /// Type name, e.g. "read" or "file"
        name: String,
    },

    /// List every known type
    Types {
        /// Only relation types
        #[clap(long, conflicts_with = "nodes")]
        relations: bool,

        /// Only node types
        #[clap(long)]
        nodes: bool,
    },

    /// Validate a policy file and show what it resolves to
    Policy {
        /// Path to a TOML or JSON policy file
        file: PathBuf,
    },

    /// Record a short simulated session and print the records
    Demo {
        /// Policy file to apply
        #[clap(long)]
        policy: Option<PathBuf>,

        /// Record untracked objects too
        #[clap(long)]
        capture_all: bool,

        /// Print a summary line instead of every record
        #[clap(long)]
        summary: bool,
    },
}

fn init_logging(level: LogLevel) {
    let level = match level {
        LogLevel::Trace => Level::TRACE,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warning => Level::WARN,
        LogLevel::Error => Level::ERROR,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    match cli.command {
        Commands::Decode { id, json } => commands::types::decode(&id, json),
        Commands::Lookup { name } => commands::types::lookup(&name),
        Commands::Types { relations, nodes } => commands::types::list(relations, nodes),
        Commands::Policy { file } => commands::policy::check(&file),
        Commands::Demo {
            policy,
            capture_all,
            summary,
        } => commands::demo::run(policy.as_deref(), capture_all, summary),
    }
}
