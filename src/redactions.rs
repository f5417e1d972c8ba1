//! Redaction alignment across sources
//!
//! The canonical source decides which redactions exist. Each shop names them
//! its own way, so every entry in a shop's menu is matched against the
//! canonical name and the synonym table aliases of each redaction.

use crate::error::{Result, SyncError};
use crate::models::{normalize, Redaction};
use crate::sources::{CanonicalSource, ShopSource};
use crate::synonyms::RedactionSynonymTable;
use std::collections::HashSet;
use std::sync::Arc;

pub struct RedactionResolver<'a> {
    canonical: &'a dyn CanonicalSource,
    /// Menus are aligned in this order
    shops: &'a [Arc<dyn ShopSource>],
    synonyms: &'a RedactionSynonymTable,
}

impl<'a> RedactionResolver<'a> {
    pub fn new(
        canonical: &'a dyn CanonicalSource,
        shops: &'a [Arc<dyn ShopSource>],
        synonyms: &'a RedactionSynonymTable,
    ) -> Self {
        Self {
            canonical,
            shops,
            synonyms,
        }
    }

    /// Build every canonical redaction with its aliases and shop URLs
    ///
    /// A shop menu entry that matches no redaction means the synonym table is
    /// stale; the whole alignment fails with [`SyncError::UnknownRedaction`].
    pub async fn resolve_all(&self) -> Result<Vec<Redaction>> {
        let listing = self.canonical.list_redactions().await?;

        let mut seen = HashSet::new();
        let mut redactions: Vec<Redaction> = Vec::with_capacity(listing.len());
        for link in listing {
            let name = normalize(&link.name);
            if name.is_empty() {
                continue;
            }
            if !seen.insert(name.clone()) {
                log::warn!("Canonical redaction '{}' listed twice, keeping the first", name);
                continue;
            }
            let synonyms = self
                .synonyms
                .lookup(&name)
                .map(<[String]>::to_vec)
                .unwrap_or_default();
            redactions.push(Redaction::new(&name, &link.url, synonyms));
        }
        log::info!("Canonical source lists {} redactions", redactions.len());

        for shop in self.shops {
            self.align_shop(shop.as_ref(), &mut redactions).await?;
        }

        Ok(redactions)
    }

    async fn align_shop(&self, shop: &dyn ShopSource, redactions: &mut [Redaction]) -> Result<()> {
        let shop_id = shop.shop_id();
        let menu = shop.list_redactions().await?;

        let mut attached = 0;
        for entry in &menu {
            let name = normalize(&entry.name);
            if name.is_empty() {
                continue;
            }

            let mut matched = false;
            for redaction in redactions.iter_mut().filter(|r| r.is_known_as(&name)) {
                redaction
                    .shops
                    .insert(shop_id.to_string(), entry.url.clone());
                matched = true;
            }

            if !matched {
                log::error!("{}: redaction '{}' is not in the synonym table", shop_id, name);
                return Err(SyncError::UnknownRedaction {
                    shop: shop_id.to_string(),
                    name,
                });
            }
            attached += 1;
        }

        log::info!("{}: aligned {} redactions", shop_id, attached);
        Ok(())
    }
}
