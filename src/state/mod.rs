//! State module for tracking per-domain politeness state
//!
//! `DomainState` holds what the fetcher needs to stay polite towards one host:
//! a request counter, the last scheduled request start, the robots.txt
//! Crawl-delay and a cap on in-flight requests.

mod domain_state;

pub use domain_state::DomainState;
