//! Per-domain request throttling
//!
//! Every request to a domain first takes one of that domain's permits, then
//! books a start slot at least `delay-ms` (or the robots.txt Crawl-delay)
//! after the previous one, then sleeps a random extra of up to
//! `random-delay-ms`.

use crate::config::CrawlerConfig;
use crate::robots::ParsedRobots;
use crate::state::DomainState;
use crate::FetchCause;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{OnceCell, OwnedSemaphorePermit};
use tokio::time::Instant;
use tracing::trace;

/// Shared politeness gate for all requests leaving a fetcher
#[derive(Debug)]
pub struct DomainThrottle {
    domains: Mutex<HashMap<String, DomainState>>,
    concurrency: usize,
    delay: Duration,
    random_delay: Duration,
}

impl DomainThrottle {
    pub fn new(config: &CrawlerConfig) -> Self {
        Self {
            domains: Mutex::new(HashMap::new()),
            concurrency: config.per_domain_concurrency as usize,
            delay: config.delay(),
            random_delay: config.random_delay(),
        }
    }

    /// Waits until a request to `domain` may start
    ///
    /// The returned permit must be held for the duration of the request.
    pub async fn acquire(&self, domain: &str) -> Result<OwnedSemaphorePermit, FetchCause> {
        let permits = self.with_state(domain, |state| state.permits());
        let permit = permits
            .acquire_owned()
            .await
            .map_err(|_| FetchCause::Other(format!("throttle for {} closed", domain)))?;

        let wait = self.with_state(domain, |state| {
            let spacing = state.spacing(self.delay);
            state.reserve_slot(spacing, Instant::now())
        }) + jitter(self.random_delay);

        if !wait.is_zero() {
            trace!(domain, wait_ms = wait.as_millis() as u64, "Throttling request");
            tokio::time::sleep(wait).await;
        }

        Ok(permit)
    }

    /// Raises the spacing for `domain` to a robots.txt Crawl-delay
    pub fn set_crawl_delay(&self, domain: &str, delay: Duration) {
        self.with_state(domain, |state| state.crawl_delay = Some(delay));
    }

    /// The robots.txt slot for `domain`, shared by every request to it
    pub fn robots(&self, domain: &str) -> Arc<OnceCell<ParsedRobots>> {
        self.with_state(domain, |state| state.robots())
    }

    /// Requests issued so far, by domain
    pub fn requests_by_domain(&self) -> BTreeMap<String, u32> {
        self.lock()
            .iter()
            .filter(|(_, state)| state.request_count > 0)
            .map(|(domain, state)| (domain.clone(), state.request_count))
            .collect()
    }

    fn with_state<R>(&self, domain: &str, f: impl FnOnce(&mut DomainState) -> R) -> R {
        let mut domains = self.lock();
        let state = domains
            .entry(domain.to_string())
            .or_insert_with(|| DomainState::new(self.concurrency));
        f(state)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DomainState>> {
        self.domains.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_ms))
}
