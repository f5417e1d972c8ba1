//! Merging freshly resolved cards into the stored catalog
//!
//! A batch only ever touches the offer of the shop it came from. Offers other
//! shops have for the same card survive, and running the same batch twice
//! leaves the catalog as the first run did.

use crate::error::Result;
use crate::models::Card;
use crate::store::CatalogStore;

/// What one merge did to the catalog
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub inserted: usize,
    pub updated: usize,
    /// Cards that carried no offer for the batch shop
    pub skipped: usize,
}

pub struct CatalogMerger<'a> {
    store: &'a dyn CatalogStore,
}

impl<'a> CatalogMerger<'a> {
    pub fn new(store: &'a dyn CatalogStore) -> Self {
        Self { store }
    }

    /// Fold each card's `shop_id` offer into the stored catalog
    ///
    /// Stored cards keep their descriptive data and every other shop's offer;
    /// unknown cards are stored as resolved.
    pub fn merge_batch(&self, shop_id: &str, cards: Vec<Card>) -> Result<MergeSummary> {
        let mut summary = MergeSummary::default();

        for card in cards {
            let offer = match card.shops.get(shop_id) {
                Some(offer) => offer.clone(),
                None => {
                    log::warn!(
                        "Card '{}' ({}) has no {} offer, skipping",
                        card.name,
                        card.redaction,
                        shop_id
                    );
                    summary.skipped += 1;
                    continue;
                }
            };

            match self.store.find_card(&card.key())? {
                Some(mut existing) => {
                    existing.set_offer(offer);
                    self.store.upsert_card(&existing)?;
                    summary.updated += 1;
                }
                None => {
                    self.store.upsert_card(&card)?;
                    summary.inserted += 1;
                }
            }
        }

        log::info!(
            "{}: merged {} new and {} existing cards ({} skipped)",
            shop_id,
            summary.inserted,
            summary.updated,
            summary.skipped
        );

        Ok(summary)
    }
}
