//! Cytomine CLI
//!
//! Command-line access to a Cytomine service.
//!
//! # Commands
//!
//! - `get` - Fetch one resource
//! - `list` - List a collection, one page or all of it
//! - `delete` - Delete one resource
//! - `undo` / `redo` - Revert or reapply a command
//! - `kinds` - List the known resource kinds

mod commands;

use clap::{Parser, Subcommand};
use commands::{parse_pair, Format};
use cytomine_core::{CommandId, Session, SessionConfig};
use cytomine_http::{HttpConfig, HttpTransport};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Cytomine command-line client.
#[derive(Parser)]
#[command(name = "cytomine")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the service
    #[arg(global = true, long, env = "CYTOMINE_HOST", default_value = "http://localhost:8080")]
    host: String,

    /// Extra request header, as `name=value`
    #[arg(global = true, long = "header", value_parser = parse_pair)]
    headers: Vec<(String, String)>,

    /// Request timeout in seconds
    #[arg(global = true, long, default_value = "30")]
    timeout: u64,

    /// Output format (text, json)
    #[arg(global = true, short, long, default_value = "text")]
    format: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one resource
    Get {
        /// Resource kind, e.g. `project`
        kind: String,
        /// Numeric id, or `name=id,...` for composite kinds
        identity: String,
    },

    /// List a collection
    List {
        /// Resource kind, e.g. `imageinstance`
        kind: String,

        /// Filter, as `key=value`; repeatable
        #[arg(long = "filter", value_parser = parse_pair)]
        filters: Vec<(String, String)>,

        /// Page size (0 fetches everything in one request)
        #[arg(long, default_value = "0")]
        page_size: u32,

        /// Page to fetch
        #[arg(long, default_value = "0", conflicts_with = "all")]
        page: u64,

        /// Fetch every page
        #[arg(long)]
        all: bool,
    },

    /// Delete one resource
    Delete {
        /// Resource kind
        kind: String,
        /// Numeric id, or `name=id,...` for composite kinds
        identity: String,
    },

    /// Revert a command
    Undo {
        /// Command id
        command: Option<u64>,
    },

    /// Reapply a reverted command
    Redo {
        /// Command id
        command: Option<u64>,
    },

    /// List the known resource kinds
    Kinds,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let format: Format = cli.format.parse()?;

    match cli.command {
        Commands::Kinds => {
            println!("{}", commands::kinds::run(format)?);
            return Ok(());
        }
        Commands::Version => {
            println!("Cytomine CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Cytomine Core v{}", cytomine_core::VERSION);
            return Ok(());
        }
        _ => {}
    }

    let mut config = HttpConfig::new(cli.host).with_timeout(Duration::from_secs(cli.timeout));
    for (name, value) in cli.headers {
        config = config.with_header(name, value);
    }
    let transport = HttpTransport::new(config)?;
    let session = Session::with_config(Arc::new(transport), SessionConfig::default());

    let output = match cli.command {
        Commands::Get { kind, identity } => {
            commands::get::run(&session, &kind, &identity, format).await
        }
        Commands::List {
            kind,
            filters,
            page_size,
            page,
            all,
        } => {
            let request = commands::list::ListRequest {
                kind,
                filters,
                page_size,
                page: (!all).then_some(page),
            };
            commands::list::run(&session, request, format).await
        }
        Commands::Delete { kind, identity } => {
            commands::delete::run(&session, &kind, &identity, format).await
        }
        Commands::Undo { command } => {
            commands::history::undo(&session, command.map(CommandId::new), format).await
        }
        Commands::Redo { command } => {
            commands::history::redo(&session, command.map(CommandId::new), format).await
        }
        Commands::Kinds | Commands::Version => Ok(String::new()),
    };

    session.logout().await;
    println!("{}", output?);
    Ok(())
}
