//! Catalog data model: redactions, cards and shop offers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Offer type assigned when a shop does not say otherwise
pub const DEFAULT_OFFER_TYPE: &str = "common";

/// Trim and lower-case a name so every source compares the same way
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// A card set/edition with its per-shop aliases and listing URLs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Redaction {
    pub name: String,
    pub url: String,
    /// Aliases in the shop order declared by the synonym table
    #[serde(default)]
    pub synonyms: Vec<String>,
    /// Shop id -> that shop's listing URL for this redaction
    #[serde(default)]
    pub shops: BTreeMap<String, String>,
}

impl Redaction {
    pub fn new(name: &str, url: &str, synonyms: Vec<String>) -> Self {
        Self {
            name: normalize(name),
            url: url.to_string(),
            synonyms,
            shops: BTreeMap::new(),
        }
    }

    /// Canonical name followed by every non-empty alias
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str())
            .chain(self.synonyms.iter().map(String::as_str))
            .filter(|n| !n.is_empty())
    }

    /// Whether an already normalized name refers to this redaction
    pub fn is_known_as(&self, name: &str) -> bool {
        self.names().any(|n| n == name)
    }

    pub fn shop_url(&self, shop_id: &str) -> Option<&str> {
        self.shops.get(shop_id).map(String::as_str)
    }
}

/// Descriptive data from the canonical source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardInfo {
    pub url: String,
    pub img_url: String,
    #[serde(default)]
    pub description: Vec<String>,
}

/// Reference price snapshot from the secondary price source (USD)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardPrices {
    pub sid: String,
    pub url: String,
    pub low: f64,
    pub mid: f64,
    pub high: f64,
}

impl CardPrices {
    pub fn average(&self) -> f64 {
        (self.low + self.mid + self.high) / 3.0
    }
}

/// One shop's priced, quantified listing of a card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopOffer {
    pub shop: String,
    pub url: String,
    pub price: f64,
    pub overpay: f64,
    pub quantity: u32,
    #[serde(default = "default_offer_type")]
    pub offer_type: String,
}

fn default_offer_type() -> String {
    DEFAULT_OFFER_TYPE.to_string()
}

impl ShopOffer {
    /// Build an offer; `overpay` is the reference average divided by the price
    pub fn new(
        shop: &str,
        url: &str,
        price: f64,
        quantity: u32,
        reference: Option<&CardPrices>,
    ) -> Self {
        let overpay = reference.map(|p| p.average() / price).unwrap_or(0.0);
        Self {
            shop: shop.to_string(),
            url: url.to_string(),
            price,
            overpay,
            quantity,
            offer_type: default_offer_type(),
        }
    }
}

/// Identity of a card in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardKey {
    pub name: String,
    pub redaction: String,
}

impl CardKey {
    pub fn new(name: &str, redaction: &str) -> Self {
        Self {
            name: normalize(name),
            redaction: normalize(redaction),
        }
    }
}

/// A canonical card with the offers shops have for it
///
/// Two cards are equal when their `(name, redaction)` keys match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub name: String,
    pub redaction: String,
    #[serde(default)]
    pub card_type: String,
    #[serde(default)]
    pub info: Option<CardInfo>,
    #[serde(default)]
    pub prices: Option<CardPrices>,
    #[serde(default)]
    pub shops: BTreeMap<String, ShopOffer>,
}

impl Card {
    pub fn new(name: &str, redaction: &str) -> Self {
        Self {
            name: normalize(name),
            redaction: normalize(redaction),
            card_type: String::new(),
            info: None,
            prices: None,
            shops: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> CardKey {
        CardKey {
            name: self.name.clone(),
            redaction: self.redaction.clone(),
        }
    }

    pub fn has_info(&self) -> bool {
        self.info.is_some()
    }

    pub fn has_prices(&self) -> bool {
        self.prices.is_some()
    }

    /// Replace this card's offer for the offer's shop, leaving other shops alone
    pub fn set_offer(&mut self, offer: ShopOffer) {
        self.shops.insert(offer.shop.clone(), offer);
    }
}

impl PartialEq for Card {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.redaction == other.redaction
    }
}

impl Eq for Card {}

impl Hash for Card {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.redaction.hash(state);
    }
}

/// An offer row as a shop lists it, before any matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOffer {
    pub name: String,
    pub price: String,
    #[serde(default)]
    pub quantity: u32,
    pub url: String,
}
