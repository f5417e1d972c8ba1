//! Wants-list lookup
//!
//! A wants list is plain text with one card per line and an optional trailing
//! count:
//!
//! ```text
//! Lightning Bolt 4
//! Black Lotus;1
//! Counterspell
//! ```

use crate::error::Result;
use crate::models::{normalize, ShopOffer};
use crate::store::CatalogStore;
use std::collections::HashMap;

/// One wanted card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WantEntry {
    pub name: String,
    pub count: u32,
}

/// A stored offer for a wanted card
#[derive(Debug, Clone, PartialEq)]
pub struct WantedOffer {
    pub redaction: String,
    pub offer: ShopOffer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WantMatch {
    pub entry: WantEntry,
    /// Cheapest first
    pub offers: Vec<WantedOffer>,
}

/// Split a line into card name and count; the count defaults to 1
fn parse_line(line: &str) -> Option<WantEntry> {
    let line = line.trim_matches(|c| c == ' ' || c == '\t' || c == '\r');
    let name_end = line.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let (name, digits) = line.split_at(name_end);

    let name = normalize(name.trim_matches(|c| c == ' ' || c == '\t' || c == ';'));
    if name.is_empty() {
        return None;
    }

    // a count of 0 still asks for one copy
    let count = digits.parse::<u32>().ok().filter(|n| *n > 0).unwrap_or(1);
    Some(WantEntry { name, count })
}

/// Parse a wants list, summing repeated names in first-seen order
pub fn parse_wants(text: &str) -> Vec<WantEntry> {
    let mut entries: Vec<WantEntry> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for entry in text.lines().filter_map(parse_line) {
        match index.get(&entry.name) {
            Some(&i) => entries[i].count = entries[i].count.saturating_add(entry.count),
            None => {
                index.insert(entry.name.clone(), entries.len());
                entries.push(entry);
            }
        }
    }

    entries
}

/// Every stored offer for each wanted card, across redactions and shops
pub fn find_offers(store: &dyn CatalogStore, entries: &[WantEntry]) -> Result<Vec<WantMatch>> {
    let mut matches = Vec::with_capacity(entries.len());

    for entry in entries {
        let mut offers: Vec<WantedOffer> = store
            .find_cards_by_name(&entry.name)?
            .into_iter()
            .flat_map(|card| {
                let redaction = card.redaction;
                card.shops.into_values().map(move |offer| WantedOffer {
                    redaction: redaction.clone(),
                    offer,
                })
            })
            .collect();
        offers.sort_by(|a, b| a.offer.price.total_cmp(&b.offer.price));

        if offers.is_empty() {
            log::debug!("No offers for wanted card '{}'", entry.name);
        }
        matches.push(WantMatch {
            entry: entry.clone(),
            offers,
        });
    }

    Ok(matches)
}
