//! Litrev CLI - Literature-review document index

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Litrev - Build a searchable index from a folder of papers and reports
#[derive(Parser)]
#[command(name = "litrev", author, version, about, long_about = None, propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Litrev (create config and data directories)
    Init,

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Extract, classify and chunk documents without touching the index
    Scan {
        /// Directory to scan (default: ingest.source_dir)
        dir: Option<String>,
    },

    /// Rebuild the index from a document directory
    Build {
        /// Directory to index (default: ingest.source_dir)
        dir: Option<String>,

        /// Store chunks without computing embeddings
        #[arg(long)]
        no_embed: bool,
    },

    /// Search the index
    Search {
        /// Search query
        query: String,

        /// Maximum results
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// Use full-text search instead of embeddings
        #[arg(short, long)]
        keyword: bool,
    },

    /// Show index statistics
    Stats,

    /// Manage the extracted-text cache
    #[command(subcommand)]
    Cache(CacheCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., chunking.chunk_size)
        key: String,

        /// Value to set
        value: String,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Show cache size
    Stats,

    /// Delete every cached text
    Clear,
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "litrev=debug,info" } else { "litrev=info,warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::show(),
            ConfigCommands::Set { key, value } => commands::config::set(&key, &value),
        },
        Commands::Scan { dir } => commands::scan::run(dir.as_deref()),
        Commands::Build { dir, no_embed } => commands::build::run(dir.as_deref(), no_embed),
        Commands::Search {
            query,
            limit,
            keyword,
        } => commands::search::run(&query, limit, keyword),
        Commands::Stats => commands::stats::run(),
        Commands::Cache(cmd) => match cmd {
            CacheCommands::Stats => commands::cache::stats(),
            CacheCommands::Clear => commands::cache::clear(),
        },
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
