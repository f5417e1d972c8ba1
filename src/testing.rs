//! In-memory collaborators for unit tests

use crate::error::{Result, SyncError};
use crate::models::{CardInfo, RawOffer};
use crate::sources::{
    CanonicalPage, CanonicalSource, ListingLink, PriceQuote, PriceSource, ShopPage, ShopSource,
    MIN_CARD_PAGE_SECTIONS,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

fn not_found() -> SyncError {
    SyncError::HttpStatus(reqwest::StatusCode::NOT_FOUND)
}

/// English card page in `redaction` with a price source id
pub fn card_page(url: &str, redaction_label: &str, sid: &str) -> CanonicalPage {
    CanonicalPage {
        url: url.to_string(),
        section_count: MIN_CARD_PAGE_SECTIONS + 1,
        card_type: Some("Instant".to_string()),
        info: Some(CardInfo {
            url: url.to_string(),
            img_url: format!("{}.jpg", url),
            description: vec![],
        }),
        redaction_label: Some(redaction_label.to_string()),
        price_source_id: Some(sid.to_string()),
        ..Default::default()
    }
}

/// Search result page listing only hints
pub fn hint_page(hints: &[(&str, &str)]) -> CanonicalPage {
    CanonicalPage {
        url: "https://canon.example/query".to_string(),
        section_count: 1,
        hints: hints.iter().map(|(n, u)| ListingLink::new(n, u)).collect(),
        ..Default::default()
    }
}

pub fn offer(name: &str, price: &str, quantity: u32) -> RawOffer {
    RawOffer {
        name: name.to_string(),
        price: price.to_string(),
        quantity,
        url: format!("https://shop.example/{}", name.replace(' ', "-")),
    }
}

#[derive(Default)]
pub struct FakeCanonical {
    pub redactions: Vec<ListingLink>,
    pub searches: HashMap<String, CanonicalPage>,
    pub pages: HashMap<String, CanonicalPage>,
    /// Queries that hang for this long before answering
    pub slow: HashMap<String, Duration>,
    pub requests: AtomicUsize,
    in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
}

impl FakeCanonical {
    pub fn with_search(mut self, query: &str, page: CanonicalPage) -> Self {
        self.searches.insert(query.to_string(), page);
        self
    }

    pub fn with_page(mut self, page: CanonicalPage) -> Self {
        self.pages.insert(page.url.clone(), page);
        self
    }

    pub fn with_redaction(mut self, name: &str, url: &str) -> Self {
        self.redactions.push(ListingLink::new(name, url));
        self
    }

    async fn track<T>(&self, key: &str, value: Option<T>) -> Result<T> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .slow
            .get(key)
            .copied()
            .unwrap_or(Duration::from_millis(5));
        tokio::time::sleep(delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        value.ok_or_else(not_found)
    }
}

#[async_trait]
impl CanonicalSource for FakeCanonical {
    async fn list_redactions(&self) -> Result<Vec<ListingLink>> {
        Ok(self.redactions.clone())
    }

    async fn search(&self, query: &str) -> Result<CanonicalPage> {
        let page = self.searches.get(query).cloned();
        self.track(query, page).await
    }

    async fn fetch_page(&self, url: &str) -> Result<CanonicalPage> {
        let page = self.pages.get(url).cloned();
        self.track(url, page).await
    }
}

#[derive(Default)]
pub struct FakePrices {
    pub quotes: HashMap<String, PriceQuote>,
    /// Ids that fail this many times before answering
    pub flaky: Mutex<HashMap<String, usize>>,
    pub calls: AtomicUsize,
}

impl FakePrices {
    pub fn with_quote(mut self, sid: &str, low: &str, mid: &str, high: &str) -> Self {
        self.quotes.insert(
            sid.to_string(),
            PriceQuote {
                url: format!("https://prices.example/{}", sid),
                low: low.to_string(),
                mid: mid.to_string(),
                high: high.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl PriceSource for FakePrices {
    async fn fetch_prices(&self, source_id: &str) -> Result<PriceQuote> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut flaky = self.flaky.lock().unwrap();
            if let Some(left) = flaky.get_mut(source_id) {
                if *left > 0 {
                    *left -= 1;
                    return Err(SyncError::HttpStatus(
                        reqwest::StatusCode::SERVICE_UNAVAILABLE,
                    ));
                }
            }
        }
        self.quotes.get(source_id).cloned().ok_or_else(not_found)
    }
}

pub struct FakeShop {
    pub id: String,
    pub menu: Vec<ListingLink>,
    pub listings: HashMap<String, ShopPage>,
    pub fetched: Mutex<Vec<String>>,
}

impl FakeShop {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            menu: Vec::new(),
            listings: HashMap::new(),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn with_menu_entry(mut self, name: &str, url: &str) -> Self {
        self.menu.push(ListingLink::new(name, url));
        self
    }

    pub fn with_listing(mut self, url: &str, offers: Vec<RawOffer>, pages: &[&str]) -> Self {
        self.listings.insert(
            url.to_string(),
            ShopPage {
                offers,
                pages: pages.iter().map(|p| p.to_string()).collect(),
            },
        );
        self
    }
}

#[async_trait]
impl ShopSource for FakeShop {
    fn shop_id(&self) -> &str {
        &self.id
    }

    async fn list_redactions(&self) -> Result<Vec<ListingLink>> {
        Ok(self.menu.clone())
    }

    async fn fetch_listing(&self, url: &str) -> Result<ShopPage> {
        self.fetched.lock().unwrap().push(url.to_string());
        self.listings.get(url).cloned().ok_or_else(not_found)
    }
}
