//! Runtime configuration

use crate::price::CurrencyRule;
use std::time::Duration;

/// Default cap on concurrent resolutions against the canonical source
pub const DEFAULT_MAX_CONCURRENCY: usize = 100;

/// Default per-card resolution deadline
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(30);

/// Hryvnia per dollar used by the Ukrainian shops
pub const DEFAULT_UAH_PER_USD: f64 = 8.0;

/// A shop the sync knows how to scrape
#[derive(Debug, Clone, PartialEq)]
pub struct ShopConfig {
    pub id: String,
    pub currency: CurrencyRule,
}

impl ShopConfig {
    pub fn new(id: &str, currency: CurrencyRule) -> Self {
        Self {
            id: id.to_string(),
            currency,
        }
    }
}

/// Bounds for one resolution batch
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub max_concurrency: usize,
    /// Deadline per card; `None` waits indefinitely
    pub task_timeout: Option<Duration>,
    /// Extra attempts for transient fetch failures
    pub max_retries: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            task_timeout: Some(DEFAULT_TASK_TIMEOUT),
            max_retries: 0,
        }
    }
}

/// Everything a sync cycle needs besides its collaborators
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub scheduler: SchedulerConfig,
    /// Currency of the reference price source
    pub reference_currency: CurrencyRule,
    /// Shops in the order redaction menus are aligned
    pub shops: Vec<ShopConfig>,
}

impl SyncConfig {
    /// The two Ukrainian shops with the given exchange rate
    pub fn with_uah_rate(uah_per_usd: f64) -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            reference_currency: CurrencyRule::usd(),
            shops: vec![
                ShopConfig::new("spellshop", CurrencyRule::uah(uah_per_usd)),
                ShopConfig::new("buymagic", CurrencyRule::uah(uah_per_usd)),
            ],
        }
    }

    pub fn shop(&self, id: &str) -> Option<&ShopConfig> {
        self.shops.iter().find(|s| s.id == id)
    }

    pub fn shop_ids(&self) -> Vec<&str> {
        self.shops.iter().map(|s| s.id.as_str()).collect()
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::with_uah_rate(DEFAULT_UAH_PER_USD)
    }
}
