//! Robots.txt handling module
//!
//! robots.txt is fetched once per domain per process and consulted before
//! every request to that domain. A missing or unreadable file allows everything.

mod parser;

pub use parser::ParsedRobots;

use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

/// The robots.txt location for the host serving `url`
pub fn robots_url(url: &Url) -> Option<Url> {
    url.join("/robots.txt").ok()
}

/// Fetches and parses robots.txt for the host serving `url`
///
/// Never fails: any error, non-success status or unreadable body yields
/// `ParsedRobots::allow_all()`.
pub async fn fetch_robots(client: &Client, url: &Url) -> ParsedRobots {
    let Some(robots_url) = robots_url(url) else {
        return ParsedRobots::allow_all();
    };

    let response = match client.get(robots_url.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(url = %robots_url, error = %e, "robots.txt unreachable, allowing all");
            return ParsedRobots::allow_all();
        }
    };

    if !response.status().is_success() {
        debug!(url = %robots_url, status = response.status().as_u16(), "No robots.txt");
        return ParsedRobots::allow_all();
    }

    match response.text().await {
        Ok(body) => {
            debug!(url = %robots_url, bytes = body.len(), "Fetched robots.txt");
            ParsedRobots::from_content(&body)
        }
        Err(e) => {
            warn!(url = %robots_url, error = %e, "Failed to read robots.txt body");
            ParsedRobots::allow_all()
        }
    }
}
