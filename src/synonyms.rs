//! Redaction synonym table
//!
//! A `;`-delimited file with one row per canonical redaction. The first column
//! holds the canonical name, every following column holds one shop's alias:
//!
//! ```text
//! magiccards;spellshop;buymagic
//! alpha;alpha edition;1st ed
//! ```
//!
//! The header order of the shop columns is the order of `Redaction::synonyms`.

use crate::error::Result;
use crate::models::normalize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Canonical redaction name -> per-shop aliases
#[derive(Debug, Clone, Default)]
pub struct RedactionSynonymTable {
    shop_ids: Vec<String>,
    rows: HashMap<String, Vec<String>>,
}

impl RedactionSynonymTable {
    /// Load the table from a file on disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let table = Self::from_reader(file)?;
        log::info!(
            "Loaded {} redaction synonyms for shops [{}] from {}",
            table.len(),
            table.shop_ids.join(", "),
            path.as_ref().display()
        );
        Ok(table)
    }

    /// Load the table from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let shop_ids: Vec<String> = rdr.headers()?.iter().skip(1).map(normalize).collect();

        let mut rows = HashMap::new();
        for record in rdr.records() {
            let record = record?;
            let canonical = match record.get(0).map(normalize) {
                Some(name) if !name.is_empty() => name,
                _ => continue,
            };
            let aliases: Vec<String> = (1..=shop_ids.len())
                .map(|i| record.get(i).map(normalize).unwrap_or_default())
                .collect();

            if rows.insert(canonical.clone(), aliases).is_some() {
                log::warn!("Duplicate synonym row for '{}', keeping the last", canonical);
            }
        }

        Ok(Self { shop_ids, rows })
    }

    /// Aliases for a canonical redaction name, in shop column order
    pub fn lookup(&self, canonical_name: &str) -> Option<&[String]> {
        self.rows
            .get(&normalize(canonical_name))
            .map(Vec::as_slice)
    }

    /// Shop ids in the order their aliases appear
    pub fn shop_ids(&self) -> &[String] {
        &self.shop_ids
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
