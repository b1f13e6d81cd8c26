//! wikiprose: plaintext corpora from Wikipedia XML dumps

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::FmtSubscriber;
use wikiprose::config::{Config, LogFormat, LoggingConfig, DEFAULT_CONFIG_FILE};

use commands::{ExtractOptions, FetchOptions};

#[derive(Parser)]
#[command(name = "wikiprose")]
#[command(about = "Turn Wikipedia XML dumps into clean plaintext corpora")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract clean article text from dump archives
    Extract {
        /// Dump archive, or a directory of archives
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Documents written per append
        #[arg(long)]
        batch_size: Option<usize>,

        /// Maximum documents accepted per archive
        #[arg(long)]
        max_pages: Option<usize>,

        /// Log progress every N accepted documents
        #[arg(long)]
        progress_interval: Option<usize>,

        /// Archives processed in parallel
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Quiet mode (no progress output)
        #[arg(short, long)]
        quiet: bool,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Clean a single wikitext file (or stdin) and print the result
    Clean {
        /// Wikitext file; reads stdin when omitted
        file: Option<PathBuf>,
    },

    /// Download dump archives not yet present locally
    Fetch {
        /// Dump directory URL
        #[arg(long)]
        base_url: Option<String>,

        /// Download directory
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Maximum archives to download
        #[arg(long)]
        max_files: Option<usize>,

        /// Quiet mode (no progress bars)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Write a default configuration file
    Init {
        /// Output directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(logging: &LoggingConfig, verbose: u8) -> Result<()> {
    let builder = FmtSubscriber::builder()
        .with_max_level(logging.level.raised_by(verbose))
        .with_target(false)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    init_logging(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Extract {
            input,
            output,
            batch_size,
            max_pages,
            progress_interval,
            jobs,
            quiet,
            json,
        } => {
            let options = ExtractOptions {
                output,
                batch_size,
                max_pages,
                progress_interval,
                jobs,
            };
            commands::extract::extract(config, input, options, quiet, json)
        }
        Commands::Clean { file } => commands::clean::clean_file(&config, file),
        Commands::Fetch {
            base_url,
            data_dir,
            max_files,
            quiet,
        } => {
            let options = FetchOptions {
                base_url,
                data_dir,
                max_files,
            };
            commands::fetch::fetch_archives(config, options, quiet)
        }
        Commands::Init { path, force } => commands::init::init_config(path, force),
    }
}
