//! Shop offer listing

use crate::error::{Result, SyncError};
use crate::models::{normalize, RawOffer, Redaction};
use crate::sources::ShopSource;
use std::collections::HashSet;

/// Name prefixes of generic basic land rows shops list alongside real cards
pub const BASIC_LAND_PREFIXES: [&str; 6] = [
    "plains",
    "island",
    "swamp",
    "mountain",
    "forest",
    "wastes",
];

/// True for basic land placeholders such as `Mountain`, `Forest (#297)` or
/// `Island 2`, but not for cards like `Mountain Goat`.
pub fn is_basic_land(name: &str) -> bool {
    let name = normalize(name);
    let name = name.strip_prefix("snow-covered ").unwrap_or(&name);

    BASIC_LAND_PREFIXES.iter().any(|prefix| match name.strip_prefix(prefix) {
        Some(rest) => !rest.trim_start().starts_with(char::is_alphabetic),
        None => false,
    })
}

/// Collects a shop's offers for one redaction, across every listing page
pub struct OfferScraper<'a> {
    shop: &'a dyn ShopSource,
}

impl<'a> OfferScraper<'a> {
    pub fn new(shop: &'a dyn ShopSource) -> Self {
        Self { shop }
    }

    pub async fn list_offers(&self, redaction: &Redaction) -> Result<Vec<RawOffer>> {
        let shop_id = self.shop.shop_id();
        let first_url = redaction
            .shop_url(shop_id)
            .ok_or_else(|| SyncError::ShopNotListed {
                shop: shop_id.to_string(),
                redaction: redaction.name.clone(),
            })?;

        let first = self.shop.fetch_listing(first_url).await?;
        let mut rows = first.offers;

        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(first_url);
        for page_url in &first.pages {
            if !seen.insert(page_url.as_str()) {
                continue;
            }
            let page = self.shop.fetch_listing(page_url).await?;
            rows.extend(page.offers);
        }

        let total = rows.len();
        let offers: Vec<RawOffer> = rows
            .into_iter()
            .filter(|row| !row.name.trim().is_empty() && !is_basic_land(&row.name))
            .collect();

        log::info!(
            "{}: {} offers in '{}' ({} pages, {} placeholder rows dropped)",
            shop_id,
            offers.len(),
            redaction.name,
            seen.len(),
            total - offers.len()
        );

        Ok(offers)
    }
}
