//! itemstore CLI - schema-less resource store from the command line.

mod commands;
mod output;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "itemstore")]
#[command(author, version, about = "Schema-less multi-type resource store")]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "human")]
    format: output::OutputFormat,

    /// Log format
    #[arg(long, global = true, default_value = "pretty")]
    log_format: LogFormat,

    /// Workspace path (defaults to current directory)
    #[arg(long, short = 'C', global = true, env = "ITEMSTORE_PATH")]
    path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new workspace
    Init {
        /// Workspace name
        #[arg(long, short = 'n')]
        name: Option<String>,
    },

    /// Serve items over HTTP
    Serve {
        /// Host to bind to (overrides the workspace config)
        #[arg(long, env = "ITEMSTORE_HOST")]
        host: Option<String>,

        /// Port to listen on (overrides the workspace config)
        #[arg(long, short = 'p', env = "ITEMSTORE_PORT")]
        port: Option<u16>,

        /// Keep items in memory instead of the workspace
        #[arg(long)]
        memory: bool,
    },

    /// List items of a type
    #[command(alias = "ls")]
    List {
        /// Plural type name (e.g., widgets)
        types: String,
    },

    /// Get an item by name
    Get {
        /// Plural type name
        types: String,
        /// Item name
        name: String,
    },

    /// Create an item
    Create {
        /// Plural type name
        types: String,
        /// Item name
        name: String,
        /// Item data as JSON
        #[arg(long, short = 'd')]
        data: Option<String>,
    },

    /// Replace the data of an item
    Put {
        /// Plural type name
        types: String,
        /// Item name
        name: String,
        /// New item data as JSON
        #[arg(long, short = 'd')]
        data: String,
    },

    /// Patch an item
    Patch {
        /// Plural type name
        types: String,
        /// Item name
        name: String,
        /// JSON merge patch (RFC 7396)
        #[arg(long, conflicts_with = "json", required_unless_present = "json")]
        merge: Option<String>,
        /// JSON patch (RFC 6902)
        #[arg(long)]
        json: Option<String>,
    },

    /// Delete an item
    #[command(alias = "rm")]
    Delete {
        /// Plural type name
        types: String,
        /// Item name
        name: String,
    },
}

fn init_tracing(log_format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match log_format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_format);

    // Determine workspace path
    let workspace_path = cli.path.map_or_else(std::env::current_dir, Ok)?;

    match cli.command {
        Commands::Init { name } => commands::init(&workspace_path, name, cli.format),
        Commands::Serve { host, port, memory } => {
            commands::serve(&workspace_path, host, port, memory)
        }
        Commands::List { types } => commands::list(&workspace_path, &types, cli.format),
        Commands::Get { types, name } => commands::get(&workspace_path, &types, &name, cli.format),
        Commands::Create { types, name, data } => {
            commands::create(&workspace_path, &types, &name, data.as_deref(), cli.format)
        }
        Commands::Put { types, name, data } => {
            commands::put(&workspace_path, &types, &name, &data, cli.format)
        }
        Commands::Patch {
            types,
            name,
            merge,
            json,
        } => {
            let patch = match (merge, json) {
                (Some(merge), _) => commands::PatchArg::Merge(merge),
                (None, Some(json)) => commands::PatchArg::Json(json),
                (None, None) => bail!("one of --merge or --json is required"),
            };
            commands::patch(&workspace_path, &types, &name, &patch, cli.format)
        }
        Commands::Delete { types, name } => {
            commands::delete(&workspace_path, &types, &name, cli.format)
        }
    }
}
