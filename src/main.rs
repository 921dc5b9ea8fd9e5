//! pharmatrack - pharmacy retail price tracker CLI.
//!
//! The scheduler (cron or similar) invokes `pharmatrack run`; everything
//! else is operator tooling around the same core.

use anyhow::Result;
use clap::{Parser, Subcommand};
use pharmatrack::config::Config;
use pharmatrack::extract::Retailer;
use pharmatrack::fetch::FetchClient;
use pharmatrack::format::Formatter;
use pharmatrack::runner::{scrape_once, ScrapeRunner};
use pharmatrack::store::JsonStore;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pharmatrack",
    version,
    about = "Pharmacy retail price tracker",
    long_about = "Tracks prices and stock for pharmacy products across Romanian \
                  e-commerce sites by scraping their product pages."
)]
struct Cli {
    /// Fetch-proxy API key (required for proxied domains like drmax.ro)
    #[arg(long, global = true, env = "PHARMATRACK_PROXY_KEY")]
    proxy_key: Option<String>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "table", global = true)]
    format: pharmatrack::config::OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one full scrape pass over all active targets
    #[command(alias = "r")]
    Run {
        /// Data directory holding targets.json and the observation logs
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,
    },

    /// Scrape a single URL without touching the store (for testing a page)
    #[command(alias = "s")]
    Scrape {
        /// Product page URL
        url: String,
    },

    /// Register a new target URL
    Add {
        /// Product page URL
        url: String,

        /// Data directory holding targets.json
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,
    },

    /// Reactivate a target that was deactivated after repeated failures
    Reactivate {
        /// Target id (see targets.json)
        id: String,

        /// Data directory holding targets.json
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,
    },

    /// List supported retailers
    Retailers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();
    config.format = cli.format;

    if let Some(key) = cli.proxy_key {
        config.proxy_api_key = Some(key);
    }

    match cli.command {
        Commands::Run { data_dir } => {
            let store = JsonStore::open(&data_dir)?;
            let fetcher = FetchClient::new(&config)?;
            let formatter = Formatter::new(config.format);

            let runner = ScrapeRunner::new(fetcher, store, config);
            let summary = runner.run().await?;

            println!("{}", formatter.format_summary(&summary));
        }

        Commands::Scrape { url } => {
            let fetcher = FetchClient::new(&config)?;
            let retailer = Retailer::for_url(&url);

            let result = scrape_once(&fetcher, &config, &url).await;

            let formatter = Formatter::new(config.format);
            println!("{}", formatter.format_result(&url, retailer, &result));
        }

        Commands::Add { url, data_dir } => {
            let store = JsonStore::open(&data_dir)?;
            let target = store.add_target(&url)?;
            let retailer = Retailer::for_url(&url);

            println!("Added target {} ({}) -> {}", target.id, retailer, target.url);
        }

        Commands::Reactivate { id, data_dir } => {
            let store = JsonStore::open(&data_dir)?;
            let target = store.reactivate_target(&id)?;

            println!("Reactivated target {} -> {}", target.id, target.url);
        }

        Commands::Retailers => {
            println!("Supported retailers:\n");
            println!("{:<16} {:<20}", "Name", "Domain");
            println!("{:-<16} {:-<20}", "", "");

            for retailer in Retailer::dedicated() {
                println!("{:<16} {:<20}", retailer.name(), retailer.domain().unwrap_or("-"));
            }

            println!("\nAny other domain uses the generic fallback extractor.");
        }
    }

    Ok(())
}
