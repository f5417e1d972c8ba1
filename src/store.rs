//! Catalog storage
//!
//! Cards and redactions are stored as JSON documents keyed by their identity.
//! Uses parameterized queries exclusively (no SQL string concatenation).

use crate::error::{Result, SyncError};
use crate::models::{normalize, Card, CardKey, Redaction};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Which stored cards a listing returns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardFilter {
    /// Only cards with an offer from this shop
    pub shop: Option<String>,
    pub redaction: Option<String>,
    pub skip: usize,
    /// `None` returns every match
    pub limit: Option<usize>,
}

impl CardFilter {
    pub fn shop(shop: &str) -> Self {
        Self {
            shop: Some(normalize(shop)),
            ..Default::default()
        }
    }

    pub fn in_redaction(mut self, redaction: &str) -> Self {
        self.redaction = Some(normalize(redaction));
        self
    }

    pub fn page(mut self, skip: usize, limit: usize) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }
}

/// Document storage for the catalog
///
/// Each call is atomic for the record it touches.
pub trait CatalogStore: Send + Sync {
    fn find_card(&self, key: &CardKey) -> Result<Option<Card>>;

    fn upsert_card(&self, card: &Card) -> Result<()>;

    fn list_redactions(&self) -> Result<Vec<Redaction>>;

    /// Drop every stored redaction and store `redactions` instead
    fn replace_redactions(&self, redactions: &[Redaction]) -> Result<()>;

    fn list_cards(&self, filter: &CardFilter) -> Result<Vec<Card>>;

    fn count_cards(&self, filter: &CardFilter) -> Result<usize>;

    /// Every printing of a card name across redactions
    fn find_cards_by_name(&self, name: &str) -> Result<Vec<Card>>;
}

/// SQLite-backed catalog store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and make sure the schema exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        log::info!("Opened database: {}", path.as_ref().display());
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| SyncError::StoreLock)
    }
}

/// Initialize the database schema
///
/// - `redactions`: one document per canonical redaction name
/// - `cards`: one document per `(name, redaction)`
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS redactions (
            name TEXT PRIMARY KEY,
            doc TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cards (
            name TEXT NOT NULL,
            redaction TEXT NOT NULL,
            doc TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (name, redaction)
        );

        CREATE INDEX IF NOT EXISTS idx_cards_redaction ON cards(redaction);
        ",
    )?;

    log::debug!("Database schema initialized");
    Ok(())
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// JSON path of a shop's offer inside a card document
fn shop_path(shop: &str) -> String {
    format!("$.shops.\"{}\"", shop.replace('"', ""))
}

fn parse_docs(docs: Vec<String>) -> Result<Vec<Card>> {
    docs.iter()
        .map(|doc| serde_json::from_str(doc).map_err(SyncError::from))
        .collect()
}

impl CatalogStore for SqliteStore {
    fn find_card(&self, key: &CardKey) -> Result<Option<Card>> {
        let conn = self.conn()?;
        let doc: Option<String> = conn
            .query_row(
                "SELECT doc FROM cards WHERE name = ?1 AND redaction = ?2",
                params![&key.name, &key.redaction],
                |row| row.get(0),
            )
            .optional()?;

        match doc {
            Some(doc) => Ok(Some(serde_json::from_str(&doc)?)),
            None => Ok(None),
        }
    }

    fn upsert_card(&self, card: &Card) -> Result<()> {
        let doc = serde_json::to_string(card)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO cards (name, redaction, doc, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name, redaction) DO UPDATE SET doc = excluded.doc,
                                                        updated_at = excluded.updated_at",
            params![&card.name, &card.redaction, doc, now()],
        )?;
        Ok(())
    }

    fn list_redactions(&self) -> Result<Vec<Redaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT doc FROM redactions ORDER BY name")?;
        let docs = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        docs.iter()
            .map(|doc| serde_json::from_str(doc).map_err(SyncError::from))
            .collect()
    }

    fn replace_redactions(&self, redactions: &[Redaction]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM redactions", [])?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO redactions (name, doc, updated_at) VALUES (?1, ?2, ?3)",
            )?;
            let updated_at = now();
            for redaction in redactions {
                let doc = serde_json::to_string(redaction)?;
                stmt.execute(params![&redaction.name, doc, &updated_at])?;
            }
        }
        tx.commit()?;

        log::info!("Stored {} redactions", redactions.len());
        Ok(())
    }

    fn list_cards(&self, filter: &CardFilter) -> Result<Vec<Card>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT doc FROM cards
             WHERE (?1 IS NULL OR json_extract(doc, ?2) IS NOT NULL)
               AND (?3 IS NULL OR redaction = ?3)
             ORDER BY redaction, name
             LIMIT ?4 OFFSET ?5",
        )?;

        let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);
        let path = filter.shop.as_deref().map(shop_path);
        let docs = stmt
            .query_map(
                params![
                    &filter.shop,
                    &path,
                    &filter.redaction,
                    limit,
                    filter.skip as i64
                ],
                |row| row.get::<_, String>(0),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        parse_docs(docs)
    }

    fn count_cards(&self, filter: &CardFilter) -> Result<usize> {
        let conn = self.conn()?;
        let path = filter.shop.as_deref().map(shop_path);
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM cards
             WHERE (?1 IS NULL OR json_extract(doc, ?2) IS NOT NULL)
               AND (?3 IS NULL OR redaction = ?3)",
            params![&filter.shop, &path, &filter.redaction],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn find_cards_by_name(&self, name: &str) -> Result<Vec<Card>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT doc FROM cards WHERE name = ?1 ORDER BY redaction")?;
        let docs = stmt
            .query_map(params![normalize(name)], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        parse_docs(docs)
    }
}
