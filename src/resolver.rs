//! Card identity resolution against the canonical catalog
//!
//! A shop row only carries a name and the redaction it was listed under. The
//! resolver walks the canonical source until it lands on the English printing
//! of that card in that redaction, then pulls reference prices for it:
//!
//! 1. search by name; a page with too few sections is a hint list, and the
//!    hint most similar to the name is followed
//! 2. a non-English printing is swapped for its English sibling
//! 3. a printing from another redaction is swapped for the alternate
//!    redaction link whose text matches exactly
//! 4. reference prices come from the secondary price source
//!
//! Any step that cannot proceed yields [`Unresolved`]. Nothing here aborts a
//! batch.

use crate::models::{normalize, Card, CardPrices};
use crate::price::{to_canonical_price, CurrencyRule};
use crate::sources::{CanonicalPage, CanonicalSource, ListingLink, PriceSource};
use std::sync::Arc;
use thiserror::Error;

/// Why a shop row could not be matched to a canonical card
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Unresolved {
    #[error("no candidate cards for '{query}'")]
    NoCandidates { query: String },
    #[error("{url} is not a card page")]
    NotACardPage { url: String },
    #[error("no English printing linked from {url}")]
    NoEnglishPrinting { url: String },
    #[error("no printing in redaction '{redaction}'")]
    RedactionNotFound { redaction: String },
    #[error("no price source id on {url}")]
    NoPriceSource { url: String },
    #[error("fetch of {url} failed: {reason}")]
    Fetch { url: String, reason: String },
    #[error("resolution timed out")]
    TimedOut,
}

impl Unresolved {
    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, Unresolved::Fetch { .. } | Unresolved::TimedOut)
    }
}

/// Edit-distance similarity in `[0, 1]`
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Pick the hint whose name is most similar to `name`
///
/// Ties go to the hint listed first on the page.
pub fn select_hint<'a>(hints: &'a [ListingLink], name: &str) -> Option<&'a ListingLink> {
    let target = normalize(name);
    let mut best: Option<(&ListingLink, f64)> = None;

    for hint in hints.iter().filter(|h| !h.url.is_empty()) {
        let score = similarity(&normalize(&hint.name), &target);
        match best {
            Some((_, top)) if top >= score => {}
            _ => best = Some((hint, score)),
        }
    }

    best.map(|(hint, _)| hint)
}

/// Redaction name from a printed label, e.g. `Alpha (Rare)` -> `alpha`
pub fn label_redaction(label: &str) -> String {
    normalize(label.split('(').next().unwrap_or(label))
}

/// Resolves shop names to canonical cards
pub struct CardResolver {
    canonical: Arc<dyn CanonicalSource>,
    prices: Arc<dyn PriceSource>,
    price_rule: CurrencyRule,
}

impl CardResolver {
    pub fn new(
        canonical: Arc<dyn CanonicalSource>,
        prices: Arc<dyn PriceSource>,
        price_rule: CurrencyRule,
    ) -> Self {
        Self {
            canonical,
            prices,
            price_rule,
        }
    }

    /// Resolve a scraped `(name, redaction)` pair to a canonical card
    ///
    /// The returned card has info and reference prices but no shop offers.
    pub async fn resolve(&self, raw_name: &str, redaction: &str) -> Result<Card, Unresolved> {
        let redaction = normalize(redaction);
        let mut name = normalize(raw_name);

        let mut page = self
            .canonical
            .search(&name)
            .await
            .map_err(|e| fetch_failed(&format!("search:{}", name), e))?;

        if !page.is_card_page() {
            let hint = select_hint(&page.hints, &name).ok_or_else(|| Unresolved::NoCandidates {
                query: name.clone(),
            })?;
            log::debug!("'{}' resolved through hint '{}'", name, hint.name);

            name = normalize(&hint.name);
            let url = hint.url.clone();
            page = self.fetch(&url).await?;
            if !page.is_card_page() {
                return Err(Unresolved::NotACardPage { url });
            }
        }

        let page = self.english_printing(page).await?;
        let page = self.select_redaction(page, &redaction).await?;
        let prices = self.reference_prices(&page).await?;

        let mut card = Card::new(&name, &redaction);
        card.card_type = page.card_type.unwrap_or_default();
        card.info = page.info;
        card.prices = Some(prices);
        Ok(card)
    }

    async fn fetch(&self, url: &str) -> Result<CanonicalPage, Unresolved> {
        self.canonical
            .fetch_page(url)
            .await
            .map_err(|e| fetch_failed(url, e))
    }

    async fn english_printing(&self, page: CanonicalPage) -> Result<CanonicalPage, Unresolved> {
        if page.is_english {
            return Ok(page);
        }
        match page.english_url.as_deref() {
            Some(url) if !url.is_empty() => self.fetch(url).await,
            _ => Err(Unresolved::NoEnglishPrinting { url: page.url }),
        }
    }

    async fn select_redaction(
        &self,
        page: CanonicalPage,
        redaction: &str,
    ) -> Result<CanonicalPage, Unresolved> {
        if in_redaction(&page, redaction) {
            return Ok(page);
        }

        let not_found = || Unresolved::RedactionNotFound {
            redaction: redaction.to_string(),
        };
        let link = page
            .redaction_links
            .iter()
            .find(|link| normalize(&link.name) == redaction)
            .ok_or_else(not_found)?;

        // the alternate printing goes through the same checks as the first
        let alternate = self.fetch(&link.url).await?;
        if !alternate.is_card_page() {
            return Err(Unresolved::NotACardPage {
                url: link.url.clone(),
            });
        }
        let alternate = self.english_printing(alternate).await?;
        if !in_redaction(&alternate, redaction) {
            log::debug!(
                "{} is labelled {:?}, not '{}'",
                alternate.url,
                alternate.redaction_label,
                redaction
            );
            return Err(not_found());
        }
        Ok(alternate)
    }

    async fn reference_prices(&self, page: &CanonicalPage) -> Result<CardPrices, Unresolved> {
        let sid = match page.price_source_id.as_deref().map(normalize) {
            Some(sid) if !sid.is_empty() => sid,
            _ => {
                return Err(Unresolved::NoPriceSource {
                    url: page.url.clone(),
                })
            }
        };

        let quote = self
            .prices
            .fetch_prices(&sid)
            .await
            .map_err(|e| fetch_failed(&format!("prices:{}", sid), e))?;

        Ok(CardPrices {
            low: to_canonical_price(&quote.low, &self.price_rule),
            mid: to_canonical_price(&quote.mid, &self.price_rule),
            high: to_canonical_price(&quote.high, &self.price_rule),
            url: quote.url,
            sid,
        })
    }
}

fn in_redaction(page: &CanonicalPage, redaction: &str) -> bool {
    page.redaction_label.as_deref().map(label_redaction).as_deref() == Some(redaction)
}

fn fetch_failed(url: &str, err: crate::error::SyncError) -> Unresolved {
    log::debug!("Fetch of {} failed: {}", url, err);
    Unresolved::Fetch {
        url: url.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
