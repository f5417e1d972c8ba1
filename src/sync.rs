//! Refresh and update cycles
//!
//! `refresh_redactions` rebuilds the stored redaction set from the canonical
//! source and the shop menus. `update_shop` walks a shop's stored redactions,
//! resolves their offers and merges them into the catalog. Only one cycle runs
//! at a time per [`CatalogSync`].

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::merge::CatalogMerger;
use crate::models::{normalize, Redaction};
use crate::offers::OfferScraper;
use crate::redactions::RedactionResolver;
use crate::resolver::CardResolver;
use crate::scheduler::ResolutionScheduler;
use crate::sources::{CanonicalSource, ExtractorClient, PriceSource, ShopSource};
use crate::store::CatalogStore;
use crate::synonyms::RedactionSynonymTable;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Counts from one shop update
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub shop: String,
    pub redactions: usize,
    /// Redactions whose listing could not be fetched
    pub failed_listings: usize,
    pub offers: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub inserted: usize,
    pub updated: usize,
}

impl UpdateReport {
    fn new(shop: &str) -> Self {
        Self {
            shop: shop.to_string(),
            ..Default::default()
        }
    }
}

pub struct CatalogSync {
    canonical: Arc<dyn CanonicalSource>,
    prices: Arc<dyn PriceSource>,
    /// In configured shop order
    shops: Vec<Arc<dyn ShopSource>>,
    synonyms: RedactionSynonymTable,
    store: Arc<dyn CatalogStore>,
    config: SyncConfig,
    cycle: Mutex<()>,
}

impl CatalogSync {
    pub fn new(
        canonical: Arc<dyn CanonicalSource>,
        prices: Arc<dyn PriceSource>,
        shops: Vec<Arc<dyn ShopSource>>,
        synonyms: RedactionSynonymTable,
        store: Arc<dyn CatalogStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            canonical,
            prices,
            shops,
            synonyms,
            store,
            config,
            cycle: Mutex::new(()),
        }
    }

    /// Wire every collaborator to one extractor service
    pub fn with_extractor(
        client: ExtractorClient,
        synonyms: RedactionSynonymTable,
        store: Arc<dyn CatalogStore>,
        config: SyncConfig,
    ) -> Self {
        let shops: Vec<Arc<dyn ShopSource>> = config
            .shop_ids()
            .into_iter()
            .map(|id| Arc::new(client.shop(id)) as Arc<dyn ShopSource>)
            .collect();
        let client = Arc::new(client);

        Self::new(client.clone(), client, shops, synonyms, store, config)
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn CatalogStore {
        self.store.as_ref()
    }

    /// Rebuild and store the aligned redaction set
    ///
    /// Nothing is written when alignment fails.
    pub async fn refresh_redactions(&self) -> Result<Vec<Redaction>> {
        let _cycle = self.cycle.lock().await;
        log::info!("Refreshing redactions...");

        let redactions =
            RedactionResolver::new(self.canonical.as_ref(), &self.shops, &self.synonyms)
                .resolve_all()
                .await?;
        self.store.replace_redactions(&redactions)?;

        Ok(redactions)
    }

    /// Scrape, resolve and merge one shop's offers
    ///
    /// With `redaction` set only that stored redaction is updated. A listing
    /// that fails to load is counted and skipped.
    pub async fn update_shop(&self, shop_id: &str, redaction: Option<&str>) -> Result<UpdateReport> {
        let _cycle = self.cycle.lock().await;
        self.run_update(shop_id, redaction).await
    }

    /// Update every configured shop, one after another
    pub async fn update_all(&self) -> Result<Vec<UpdateReport>> {
        let _cycle = self.cycle.lock().await;

        let mut reports = Vec::with_capacity(self.config.shops.len());
        for shop in &self.config.shops {
            reports.push(self.run_update(&shop.id, None).await?);
        }
        Ok(reports)
    }

    async fn run_update(&self, shop_id: &str, redaction: Option<&str>) -> Result<UpdateReport> {
        let shop_id = normalize(shop_id);
        let unknown = || SyncError::UnknownShop(shop_id.clone());
        let shop_config = self.config.shop(&shop_id).ok_or_else(unknown)?;
        let shop = self
            .shops
            .iter()
            .find(|s| s.shop_id() == shop_id)
            .ok_or_else(unknown)?;

        let wanted = redaction.map(normalize);
        let redactions: Vec<Redaction> = self
            .store
            .list_redactions()?
            .into_iter()
            .filter(|r| r.shop_url(&shop_id).is_some())
            .filter(|r| wanted.as_ref().map_or(true, |w| &r.name == w))
            .collect();

        if let Some(name) = &wanted {
            if redactions.is_empty() {
                log::warn!("{}: redaction '{}' is not stored for this shop", shop_id, name);
            }
        }
        log::info!("{}: updating {} redactions", shop_id, redactions.len());

        let resolver = CardResolver::new(
            Arc::clone(&self.canonical),
            Arc::clone(&self.prices),
            self.config.reference_currency.clone(),
        );
        let scheduler = ResolutionScheduler::new(Arc::new(resolver), self.config.scheduler.clone());
        let scraper = OfferScraper::new(shop.as_ref());
        let merger = CatalogMerger::new(self.store.as_ref());

        let mut report = UpdateReport::new(&shop_id);
        for redaction in &redactions {
            let offers = match scraper.list_offers(redaction).await {
                Ok(offers) => offers,
                Err(e) => {
                    log::warn!(
                        "{}: skipping '{}', listing failed: {}",
                        shop_id,
                        redaction.name,
                        e
                    );
                    report.failed_listings += 1;
                    continue;
                }
            };
            report.offers += offers.len();

            let outcome = scheduler
                .resolve_batch(&shop_id, &shop_config.currency, offers, redaction)
                .await;
            report.resolved += outcome.resolved;
            report.unresolved += outcome.unresolved;

            let merged = merger.merge_batch(&shop_id, outcome.cards)?;
            report.inserted += merged.inserted;
            report.updated += merged.updated;
            report.redactions += 1;
        }

        log::info!(
            "{}: {} redactions, {} offers, {} resolved, {} unresolved, {} new cards, {} updated ({} listings failed)",
            shop_id,
            report.redactions,
            report.offers,
            report.resolved,
            report.unresolved,
            report.inserted,
            report.updated,
            report.failed_listings
        );

        Ok(report)
    }
}
