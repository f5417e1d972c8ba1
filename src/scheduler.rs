//! Bounded-concurrency resolution of shop offers
//!
//! Every raw offer becomes one tokio task. A semaphore sized to
//! `min(offers, max_concurrency)` limits how many of them talk to the
//! canonical source at once; the batch returns after every task has finished.
//! Tasks are detached, so a caller that stops waiting does not cut in-flight
//! fetches short.

use crate::config::SchedulerConfig;
use crate::models::{Card, RawOffer, Redaction, ShopOffer};
use crate::price::{to_canonical_price, CurrencyRule};
use crate::resolver::{CardResolver, Unresolved};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Resolved cards plus counts of what was dropped
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Resolved cards, each carrying the batch shop's offer; unordered
    pub cards: Vec<Card>,
    pub resolved: usize,
    pub unresolved: usize,
    /// Part of `unresolved` that hit the per-card deadline
    pub timed_out: usize,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.resolved + self.unresolved
    }
}

/// Runs a shop's offers through the card resolver
pub struct ResolutionScheduler {
    resolver: Arc<CardResolver>,
    config: SchedulerConfig,
}

impl ResolutionScheduler {
    pub fn new(resolver: Arc<CardResolver>, config: SchedulerConfig) -> Self {
        Self { resolver, config }
    }

    /// Worker count for a batch of `len` offers
    pub fn pool_size(&self, len: usize) -> usize {
        len.min(self.config.max_concurrency.max(1))
    }

    /// Resolve every offer listed by `shop_id` under `redaction`
    ///
    /// Unresolved offers are counted and dropped; this never fails.
    pub async fn resolve_batch(
        &self,
        shop_id: &str,
        currency: &CurrencyRule,
        offers: Vec<RawOffer>,
        redaction: &Redaction,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        if offers.is_empty() {
            return outcome;
        }

        let semaphore = Arc::new(Semaphore::new(self.pool_size(offers.len())));

        let handles: Vec<_> = offers
            .into_iter()
            .map(|offer| {
                let semaphore = Arc::clone(&semaphore);
                let resolver = Arc::clone(&self.resolver);
                let config = self.config.clone();
                let redaction = redaction.name.clone();

                tokio::spawn(async move {
                    // the semaphore is never closed
                    let _permit = semaphore.acquire_owned().await.ok();
                    let result =
                        resolve_with_retry(&resolver, &config, &offer.name, &redaction).await;
                    (offer, result)
                })
            })
            .collect();

        for handle in handles {
            let (raw, result) = match handle.await {
                Ok(done) => done,
                Err(e) => {
                    log::warn!("Resolution task failed: {}", e);
                    outcome.unresolved += 1;
                    continue;
                }
            };

            match result {
                Ok(mut card) => {
                    let price = to_canonical_price(&raw.price, currency);
                    let reference = card.prices.clone();
                    let offer =
                        ShopOffer::new(shop_id, &raw.url, price, raw.quantity, reference.as_ref());
                    card.set_offer(offer);
                    outcome.cards.push(card);
                    outcome.resolved += 1;
                }
                Err(reason) => {
                    log::debug!(
                        "Unresolved '{}' in '{}': {}",
                        raw.name,
                        redaction.name,
                        reason
                    );
                    if reason == Unresolved::TimedOut {
                        outcome.timed_out += 1;
                    }
                    outcome.unresolved += 1;
                }
            }
        }

        log::info!(
            "{}: resolved {}/{} offers in '{}' ({} timed out)",
            shop_id,
            outcome.resolved,
            outcome.total(),
            redaction.name,
            outcome.timed_out
        );

        outcome
    }
}

async fn resolve_with_retry(
    resolver: &CardResolver,
    config: &SchedulerConfig,
    name: &str,
    redaction: &str,
) -> Result<Card, Unresolved> {
    let mut attempt = 0;
    loop {
        let result = match config.task_timeout {
            Some(limit) => tokio::time::timeout(limit, resolver.resolve(name, redaction))
                .await
                .unwrap_or(Err(Unresolved::TimedOut)),
            None => resolver.resolve(name, redaction).await,
        };

        match result {
            Err(reason) if reason.is_retryable() && attempt < config.max_retries => {
                attempt += 1;
                log::debug!(
                    "Retrying '{}' ({}/{}): {}",
                    name,
                    attempt,
                    config.max_retries,
                    reason
                );
            }
            other => return other,
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
