//! Link discovery on listing pages

use crate::crawler::extractor::{apply_rules, CompiledMapping};
use crate::record::{ArticleFields, CrawlWarning};
use crate::url::{dedup_key, resolve_link};
use scraper::{ElementRef, Html};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

/// A detail link found in a listing item, with the fields visible next to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    pub url: Url,
    pub preview: ArticleFields,
}

/// Everything found on one listing page, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub links: Vec<DiscoveredLink>,
    pub warnings: Vec<CrawlWarning>,
}

/// Collects detail links from a listing page
///
/// Each element matching the item selector contributes at most one link.
/// Relative hrefs are resolved against `page_url`; a link seen earlier on the
/// same page (by normalized URL) is skipped. No limit is applied here.
///
/// # Arguments
///
/// * `html` - The listing page body
/// * `page_url` - Where the listing was fetched from, after redirects
/// * `mapping` - The compiled field mapping
pub fn discover(html: &str, page_url: &Url, mapping: &CompiledMapping) -> Discovery {
    let document = Html::parse_document(html);
    let listing = &mapping.listing;
    let mut discovery = Discovery::default();
    let mut seen = HashSet::new();

    for (index, item) in document.select(&listing.item).enumerate() {
        let href = link_href(item, mapping);
        let Some(url) = href.and_then(|h| resolve_link(h, page_url)) else {
            discovery.warnings.push(CrawlWarning::MissingLink {
                url: page_url.to_string(),
                item: index,
            });
            continue;
        };

        if !seen.insert(dedup_key(&url)) {
            debug!(url = %url, "Skipping duplicate listing link");
            continue;
        }

        let preview = apply_rules(item, &listing.preview, &mapping.delimiter, url.as_str());
        // A field missing from the preview is normal; the detail page may supply it
        discovery.warnings.extend(
            preview
                .warnings
                .into_iter()
                .filter(|w| !matches!(w, CrawlWarning::MissingField { .. })),
        );

        discovery.links.push(DiscoveredLink {
            url,
            preview: preview.fields,
        });
    }

    debug!(
        url = %page_url,
        links = discovery.links.len(),
        "Listing page parsed"
    );
    discovery
}

fn link_href<'a>(item: ElementRef<'a>, mapping: &CompiledMapping) -> Option<&'a str> {
    let listing = &mapping.listing;
    if listing.link.matches(&item) {
        if let Some(href) = item.value().attr(&listing.link_attr) {
            return Some(href);
        }
    }

    item.select(&listing.link)
        .find_map(|element| element.value().attr(&listing.link_attr))
}
