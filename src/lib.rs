//! MTG Price Sync - shop offers reconciled against the canonical catalog
//!
//! Aligns each shop's redactions (sets) with the canonical source, resolves
//! the cards shops list to canonical identities, and merges their offers into
//! a SQLite catalog without losing what other shops contributed.

pub mod config;
pub mod error;
pub mod merge;
pub mod models;
pub mod offers;
pub mod price;
pub mod redactions;
pub mod resolver;
pub mod scheduler;
pub mod sources;
pub mod store;
pub mod sync;
pub mod synonyms;
pub mod wants;

#[cfg(test)]
mod testing;

pub use config::{SchedulerConfig, ShopConfig, SyncConfig};
pub use error::{Error, Result, SyncError};
pub use merge::{CatalogMerger, MergeSummary};
pub use models::{Card, CardInfo, CardKey, CardPrices, RawOffer, Redaction, ShopOffer};
pub use price::{to_canonical_price, CurrencyRule};
pub use resolver::{CardResolver, Unresolved};
pub use scheduler::{BatchOutcome, ResolutionScheduler};
pub use sources::ExtractorClient;
pub use store::{CardFilter, CatalogStore, SqliteStore};
pub use sync::{CatalogSync, UpdateReport};
pub use synonyms::RedactionSynonymTable;
