use crate::robots::ParsedRobots;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OnceCell, Semaphore};
use tokio::time::Instant;

/// Tracks the state of a domain during crawling
///
/// This structure maintains per-domain information needed for politeness:
/// request counting, request spacing, a concurrency cap and the robots.txt
/// rules fetched for the domain.
#[derive(Debug, Clone)]
pub struct DomainState {
    /// Number of requests made to this domain in the current process
    pub request_count: u32,

    /// Scheduled start of the most recent request to this domain
    pub last_request_time: Option<Instant>,

    /// Crawl-delay announced by the domain's robots.txt
    pub crawl_delay: Option<Duration>,

    /// Caps in-flight requests to this domain
    permits: Arc<Semaphore>,

    /// robots.txt rules, fetched at most once
    robots: Arc<OnceCell<ParsedRobots>>,
}

impl DomainState {
    /// Creates a new DomainState allowing `concurrency` requests in flight
    pub fn new(concurrency: usize) -> Self {
        Self {
            request_count: 0,
            last_request_time: None,
            crawl_delay: None,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            robots: Arc::new(OnceCell::new()),
        }
    }

    pub fn permits(&self) -> Arc<Semaphore> {
        Arc::clone(&self.permits)
    }

    pub fn robots(&self) -> Arc<OnceCell<ParsedRobots>> {
        Arc::clone(&self.robots)
    }

    /// Minimum gap between request starts: the configured delay or the
    /// robots.txt Crawl-delay, whichever is longer
    pub fn spacing(&self, configured: Duration) -> Duration {
        self.crawl_delay.map_or(configured, |d| d.max(configured))
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, spacing: Duration, now: Instant) -> Option<Duration> {
        let next = self.last_request_time? + spacing;
        (next > now).then(|| next - now)
    }

    /// Records that a request will start at `at`
    ///
    /// Updates the request count and last request time.
    pub fn record_request(&mut self, at: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(at);
    }

    /// Books the next free start slot and returns how long to wait for it
    ///
    /// Booking under the caller's lock keeps concurrent requests to the same
    /// domain spaced out instead of all waking at once.
    pub fn reserve_slot(&mut self, spacing: Duration, now: Instant) -> Duration {
        let wait = self
            .time_until_next_request(spacing, now)
            .unwrap_or(Duration::ZERO);
        self.record_request(now + wait);
        wait
    }
}

impl Default for DomainState {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn test_new_domain_state() {
        let state = DomainState::new(2);
        assert_eq!(state.request_count, 0);
        assert!(state.last_request_time.is_none());
        assert!(state.crawl_delay.is_none());
        assert_eq!(state.permits().available_permits(), 2);
        assert!(state.robots().get().is_none());
    }

    #[test]
    fn test_zero_concurrency_still_allows_one() {
        let state = DomainState::new(0);
        assert_eq!(state.permits().available_permits(), 1);
    }

    #[test]
    fn test_record_request() {
        let mut state = DomainState::default();
        let now = Instant::now();

        state.record_request(now);
        assert_eq!(state.request_count, 1);
        assert_eq!(state.last_request_time, Some(now));

        state.record_request(now);
        assert_eq!(state.request_count, 2);
    }

    #[test]
    fn test_time_until_next_request() {
        let mut state = DomainState::default();
        let now = Instant::now();

        assert!(state.time_until_next_request(SECOND, now).is_none());

        state.last_request_time = Some(now);
        assert_eq!(state.time_until_next_request(SECOND, now), Some(SECOND));

        let soon = now + Duration::from_millis(400);
        assert_eq!(
            state.time_until_next_request(SECOND, soon),
            Some(Duration::from_millis(600))
        );

        let later = now + Duration::from_millis(1100);
        assert!(state.time_until_next_request(SECOND, later).is_none());
    }

    #[test]
    fn test_reserve_slot_spaces_concurrent_requests() {
        let mut state = DomainState::default();
        let now = Instant::now();

        assert_eq!(state.reserve_slot(SECOND, now), Duration::ZERO);
        assert_eq!(state.reserve_slot(SECOND, now), SECOND);
        assert_eq!(state.reserve_slot(SECOND, now), 2 * SECOND);
        assert_eq!(state.request_count, 3);
    }

    #[test]
    fn test_spacing_prefers_longer_crawl_delay() {
        let mut state = DomainState::default();
        assert_eq!(state.spacing(SECOND), SECOND);

        state.crawl_delay = Some(5 * SECOND);
        assert_eq!(state.spacing(SECOND), 5 * SECOND);

        state.crawl_delay = Some(Duration::from_millis(10));
        assert_eq!(state.spacing(SECOND), SECOND);
    }

    #[tokio::test]
    async fn test_robots_cell_shared_between_clones() {
        let state = DomainState::default();
        let clone = state.clone();
        state
            .robots()
            .get_or_init(|| async { ParsedRobots::allow_all() })
            .await;
        assert!(clone.robots().get().is_some());
    }
}
