//! Itbooks CLI - scrapes IT publisher catalogs into a local book store.

use anyhow::Context;
use clap::{Parser, Subcommand};
use itbooks::config::Config;
use itbooks::console::Console;
use itbooks::error::Result;
use itbooks::scrapers::CrawlRegistry;
use itbooks::storage::JsonBookStore;
use itbooks::{ingest, orchestrator};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Concurrent scraper of IT publisher catalogs.
#[derive(Parser, Debug)]
#[command(name = "itbooks")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file to use instead of the default location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape publishers and save the books into the store.
    Scrape {
        /// Publishers to scrape, comma separated. All when omitted.
        #[arg(short, long, env = "PUBLISHERS", value_delimiter = ',')]
        publishers: Vec<String>,
    },

    /// Scrape one publisher and log the books without saving them.
    Test {
        /// Publisher to scrape.
        #[arg(short, long, env = "PUBLISHER")]
        publisher: String,
    },

    /// List known publishers.
    Sites,

    /// Print the config file location.
    Config,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Returns a token that is cancelled on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupted, stopping crawlers");
            token.cancel();
        }
    });
    cancel
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let console = Console::new();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::config_path()?,
    };
    let config = Config::load_from(&config_path).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    init_logging(cli.verbose || config.scraping.debug);
    log::debug!("loaded configuration from {}", config_path.display());

    match cli.command {
        Command::Config => {
            println!("{}", config_path.display());
        }

        Command::Sites => {
            let registry = CrawlRegistry::new(&config.scraping)?;
            for name in registry.names() {
                if let Some(crawler) = registry.get(name) {
                    println!("{:<10} {}", name, crawler.publisher());
                }
            }
        }

        Command::Scrape { publishers } => {
            console.section("Itbooks - Scrape");

            let store_path = config.store_path()?;
            let store = JsonBookStore::open(&store_path)
                .await
                .with_context(|| format!("Failed to open book store {}", store_path.display()))?;
            console.info(&format!("Book store: {}", store.path().display()));

            let registry = CrawlRegistry::new(&config.scraping)?;
            let resolution = registry.resolve(publishers.as_slice());
            for name in &resolution.unknown {
                console.warning(&format!("Unknown publisher '{}' skipped", name));
            }
            let crawlers = resolution.crawlers;

            if crawlers.is_empty() {
                console.error("No known publishers selected");
            } else {
                let names: Vec<_> = crawlers.iter().map(|c| c.name()).collect();
                console.step(&format!("Scraping {}", names.join(", ")));
            }

            let run = orchestrator::run(crawlers, cancel_on_ctrl_c());
            let (summary, report) = ingest::persist(run, &store).await;

            console.section("Summary");
            console.report(&report);
            console.ingest_summary(&summary);
        }

        Command::Test { publisher } => {
            let registry = CrawlRegistry::new(&config.scraping)?;
            let crawler = registry
                .get(&publisher)
                .ok_or_else(|| anyhow::anyhow!("Unknown publisher: {}", publisher))?;

            console.section(&format!("Itbooks - Test {}", crawler.publisher()));

            let run = orchestrator::run(vec![crawler], cancel_on_ctrl_c());
            let (count, report) = ingest::log_only(run).await;

            console.section("Summary");
            console.report(&report);
            console.info(&format!("{} books scraped", count));
        }
    }

    Ok(())
}
