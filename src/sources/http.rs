//! HTTP client for the page extractor service
//!
//! The extractor turns site markup into the JSON records declared in
//! [`crate::sources`]. Uses async reqwest for non-blocking requests.

use super::{
    CanonicalPage, CanonicalSource, ListingLink, PriceQuote, PriceSource, ShopPage, ShopSource,
};
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

const USER_AGENT: &str = "mtg_price_sync/1.0";

/// Shared client for every extractor endpoint
#[derive(Debug, Clone)]
pub struct ExtractorClient {
    client: reqwest::Client,
    base_url: String,
}

impl ExtractorClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Client view for one shop
    pub fn shop(&self, shop_id: &str) -> HttpShopSource {
        HttpShopSource {
            client: self.clone(),
            shop_id: shop_id.to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("Fetching {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .query(query)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SyncError::HttpStatus(response.status()));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl CanonicalSource for ExtractorClient {
    async fn list_redactions(&self) -> Result<Vec<ListingLink>> {
        self.get_json("/canonical/redactions", &[]).await
    }

    async fn search(&self, query: &str) -> Result<CanonicalPage> {
        self.get_json("/canonical/search", &[("q", query)]).await
    }

    async fn fetch_page(&self, url: &str) -> Result<CanonicalPage> {
        self.get_json("/canonical/page", &[("url", url)]).await
    }
}

#[async_trait]
impl PriceSource for ExtractorClient {
    async fn fetch_prices(&self, source_id: &str) -> Result<PriceQuote> {
        let path = format!("/prices/{}", urlencoding::encode(source_id));
        self.get_json(&path, &[]).await
    }
}

/// Extractor endpoints for a single shop
#[derive(Debug, Clone)]
pub struct HttpShopSource {
    client: ExtractorClient,
    shop_id: String,
}

impl HttpShopSource {
    fn path(&self, endpoint: &str) -> String {
        format!("/shops/{}/{}", urlencoding::encode(&self.shop_id), endpoint)
    }
}

#[async_trait]
impl ShopSource for HttpShopSource {
    fn shop_id(&self) -> &str {
        &self.shop_id
    }

    async fn list_redactions(&self) -> Result<Vec<ListingLink>> {
        self.client.get_json(&self.path("redactions"), &[]).await
    }

    async fn fetch_listing(&self, url: &str) -> Result<ShopPage> {
        self.client
            .get_json(&self.path("listing"), &[("url", url)])
            .await
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
