//! Page extractor collaborators
//!
//! Each site is seen only through typed records produced by an extractor; the
//! matching logic never touches markup.

pub mod http;

use crate::error::Result;
use crate::models::{CardInfo, RawOffer};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::{ExtractorClient, HttpShopSource};

/// Pages with fewer sections than this are hint lists, not card pages
pub const MIN_CARD_PAGE_SECTIONS: usize = 3;

/// A labelled link as the extractor found it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingLink {
    pub name: String,
    pub url: String,
}

impl ListingLink {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

/// Structured content of one canonical source page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalPage {
    pub url: String,
    /// Number of content sections; the card-page signal
    #[serde(default)]
    pub section_count: usize,
    #[serde(default)]
    pub card_type: Option<String>,
    #[serde(default)]
    pub info: Option<CardInfo>,
    /// Redaction label as printed, e.g. `Alpha (Rare)`
    #[serde(default)]
    pub redaction_label: Option<String>,
    /// Links to the same card in other redactions
    #[serde(default)]
    pub redaction_links: Vec<ListingLink>,
    #[serde(default = "default_true")]
    pub is_english: bool,
    /// Link to the English printing when this page is not it
    #[serde(default)]
    pub english_url: Option<String>,
    /// Candidate cards offered instead of a card page
    #[serde(default)]
    pub hints: Vec<ListingLink>,
    /// Identifier of this card at the secondary price source
    #[serde(default)]
    pub price_source_id: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for CanonicalPage {
    fn default() -> Self {
        Self {
            url: String::new(),
            section_count: 0,
            card_type: None,
            info: None,
            redaction_label: None,
            redaction_links: Vec::new(),
            is_english: true,
            english_url: None,
            hints: Vec::new(),
            price_source_id: None,
        }
    }
}

impl CanonicalPage {
    pub fn is_card_page(&self) -> bool {
        self.section_count >= MIN_CARD_PAGE_SECTIONS
    }
}

/// Raw low/mid/high prices from the secondary price source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub url: String,
    pub low: String,
    pub mid: String,
    pub high: String,
}

/// One page of a shop listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShopPage {
    #[serde(default)]
    pub offers: Vec<RawOffer>,
    /// Further page URLs found in the pager
    #[serde(default)]
    pub pages: Vec<String>,
}

/// The authoritative card catalog
#[async_trait]
pub trait CanonicalSource: Send + Sync {
    /// Every redaction the catalog knows, as (name, url)
    async fn list_redactions(&self) -> Result<Vec<ListingLink>>;

    /// Search result page for a card name
    async fn search(&self, query: &str) -> Result<CanonicalPage>;

    /// Page at a URL taken from a previous page
    async fn fetch_page(&self, url: &str) -> Result<CanonicalPage>;
}

/// Reference prices keyed by the canonical page's price source id
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_prices(&self, source_id: &str) -> Result<PriceQuote>;
}

/// A shop selling cards
#[async_trait]
pub trait ShopSource: Send + Sync {
    fn shop_id(&self) -> &str;

    /// The shop's own redaction menu
    async fn list_redactions(&self) -> Result<Vec<ListingLink>>;

    /// One listing page of offers
    async fn fetch_listing(&self, url: &str) -> Result<ShopPage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_to_english_hint_list() {
        let page: CanonicalPage = serde_json::from_str(r#"{"url": "u"}"#).unwrap();
        assert!(page.is_english);
        assert!(!page.is_card_page());
        assert!(page.hints.is_empty());
    }

    #[test]
    fn section_count_decides_card_page() {
        let mut page = CanonicalPage {
            section_count: MIN_CARD_PAGE_SECTIONS - 1,
            ..Default::default()
        };
        assert!(!page.is_card_page());
        page.section_count = MIN_CARD_PAGE_SECTIONS;
        assert!(page.is_card_page());
    }
}
