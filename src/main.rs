//! MTG Price Sync - shop price aggregator
//!
//! Aligns shop redactions with the canonical catalog, scrapes shop offers
//! and merges them into a SQLite catalog. Runs single cycles or as a daemon.

use clap::{Parser, Subcommand};
use mtg_price_sync::config::{SchedulerConfig, SyncConfig, DEFAULT_UAH_PER_USD};
use mtg_price_sync::store::{CardFilter, CatalogStore, SqliteStore};
use mtg_price_sync::wants::{find_offers, parse_wants};
use mtg_price_sync::{CatalogSync, ExtractorClient, RedactionSynonymTable, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// MTG price aggregator - reconciles shop offers against the canonical catalog
#[derive(Parser, Debug)]
#[command(name = "mtg_price_sync")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, default_value_t = default_data_path("catalog.db"))]
    database: String,

    /// Path to the `;`-delimited redaction synonym table
    #[arg(short, long, default_value_t = default_data_path("synonyms.csv"))]
    synonyms: String,

    /// Base URL of the page extractor service
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    extractor_url: String,

    /// Maximum concurrent card resolutions
    #[arg(long, default_value_t = 100)]
    max_concurrency: usize,

    /// Per-card resolution deadline in seconds (0 disables it)
    #[arg(long, default_value_t = 30)]
    task_timeout_secs: u64,

    /// Extra attempts for cards whose fetch failed
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Hryvnia per dollar for the Ukrainian shops
    #[arg(long, default_value_t = DEFAULT_UAH_PER_USD)]
    uah_per_usd: f64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild the redaction list from the canonical source and shop menus
    Redactions,

    /// Scrape and merge one shop's offers
    Update {
        #[arg(long)]
        shop: String,

        /// Only update this redaction
        #[arg(long)]
        redaction: Option<String>,
    },

    /// Print stored cards a shop has offers for
    List {
        #[arg(long)]
        shop: String,

        #[arg(long)]
        redaction: Option<String>,

        #[arg(long, default_value_t = 0)]
        skip: usize,

        #[arg(long, default_value_t = 50)]
        limit: usize,
    },

    /// Look up stored offers for every card in a wants list file
    Wants { file: PathBuf },

    /// Refresh redactions and update every shop periodically
    Daemon {
        /// Interval in hours between cycles
        #[arg(long, default_value_t = 24)]
        interval_hours: u64,
    },
}

/// Returns a path under the data dir: ~/.local/share/mtg_price_sync/<file>
fn default_data_path(file: &str) -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mtg_price_sync")
        .join(file)
        .to_string_lossy()
        .to_string()
}

impl Args {
    fn sync_config(&self) -> SyncConfig {
        let task_timeout = match self.task_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        SyncConfig {
            scheduler: SchedulerConfig {
                max_concurrency: self.max_concurrency,
                task_timeout,
                max_retries: self.retries,
            },
            ..SyncConfig::with_uah_rate(self.uah_per_usd)
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let db_path = PathBuf::from(&args.database);

    log::info!("Starting mtg_price_sync...");
    log::info!("Database path: {}", db_path.display());

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("Failed to create database directory: {}", e);
                std::process::exit(1);
            }
            log::info!("Created directory: {}", parent.display());
        }
    }

    let store = match SqliteStore::open(&db_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            log::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(args, store).await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args, store: Arc<SqliteStore>) -> Result<()> {
    match &args.command {
        Command::List {
            shop,
            redaction,
            skip,
            limit,
        } => {
            let mut filter = CardFilter::shop(shop).page(*skip, *limit);
            if let Some(redaction) = redaction {
                filter = filter.in_redaction(redaction);
            }
            list_cards(store.as_ref(), &filter)
        }
        Command::Wants { file } => {
            let text = std::fs::read_to_string(file)?;
            print_wants(store.as_ref(), &text)
        }
        command => {
            let synonyms = RedactionSynonymTable::from_path(&args.synonyms)?;
            let sync = CatalogSync::with_extractor(
                ExtractorClient::new(&args.extractor_url),
                synonyms,
                store,
                args.sync_config(),
            );

            match command {
                Command::Redactions => {
                    let redactions = sync.refresh_redactions().await?;
                    log::info!("Stored {} redactions", redactions.len());
                }
                Command::Update { shop, redaction } => {
                    sync.update_shop(shop, redaction.as_deref()).await?;
                }
                Command::Daemon { interval_hours } => {
                    log::info!(
                        "Running in daemon mode, syncing every {} hour(s)",
                        interval_hours
                    );
                    run_daemon(&sync, *interval_hours).await;
                }
                Command::List { .. } | Command::Wants { .. } => {}
            }
            Ok(())
        }
    }
}

/// Run the sync daemon - a full cycle on startup, then one per interval
async fn run_daemon(sync: &CatalogSync, interval_hours: u64) {
    let mut ticker = interval(daemon_period(interval_hours));

    loop {
        // the first tick completes immediately
        ticker.tick().await;
        log::info!("Scheduled sync triggered");
        run_cycle(sync).await;
    }
}

/// Longest daemon interval accepted: ten years
const MAX_INTERVAL_HOURS: u64 = 24 * 365 * 10;

/// Time between daemon cycles, between one hour and [`MAX_INTERVAL_HOURS`]
fn daemon_period(interval_hours: u64) -> Duration {
    Duration::from_secs(
        interval_hours
            .clamp(1, MAX_INTERVAL_HOURS)
            .saturating_mul(3600),
    )
}

/// Run a single full cycle
async fn run_cycle(sync: &CatalogSync) {
    if let Err(e) = sync.refresh_redactions().await {
        if e.is_data_integrity() {
            log::error!("Synonym table is stale, skipping this cycle: {}", e);
        } else {
            log::error!("Failed to refresh redactions: {}", e);
        }
        return;
    }

    match sync.update_all().await {
        Ok(reports) => {
            let resolved: usize = reports.iter().map(|r| r.resolved).sum();
            log::info!(
                "Sync completed: {} shops, {} offers resolved",
                reports.len(),
                resolved
            );
        }
        Err(e) => log::error!("Failed to update shops: {}", e),
    }
}

fn list_cards(store: &dyn CatalogStore, filter: &CardFilter) -> Result<()> {
    let total = store.count_cards(&CardFilter {
        skip: 0,
        limit: None,
        ..filter.clone()
    })?;
    let shop = filter.shop.as_deref().unwrap_or_default();

    for card in store.list_cards(filter)? {
        if let Some(offer) = card.shops.get(shop) {
            println!(
                "{:<40} {:<24} ${:>9.2} x{:<3} overpay {:.2}",
                card.name, card.redaction, offer.price, offer.quantity, offer.overpay
            );
        }
    }
    println!(
        "-- showing from {} ({} cards in total)",
        filter.skip, total
    );
    Ok(())
}

fn print_wants(store: &dyn CatalogStore, text: &str) -> Result<()> {
    let entries = parse_wants(text);
    log::info!("Wants list has {} cards", entries.len());

    for matched in find_offers(store, &entries)? {
        println!("{} x{}", matched.entry.name, matched.entry.count);
        if matched.offers.is_empty() {
            println!("    no offers");
        }
        for wanted in &matched.offers {
            println!(
                "    {:<12} {:<24} ${:>9.2} x{:<3} {}",
                wanted.offer.shop,
                wanted.redaction,
                wanted.offer.price,
                wanted.offer.quantity,
                wanted.offer.url
            );
        }
    }
    Ok(())
}
