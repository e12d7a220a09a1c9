use crate::UrlError;
use url::Url;

/// Query parameters that never change which article a URL points at
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "mc_eid", "ref", "source", "at_medium", "at_campaign",
];

/// Normalizes a URL into its canonical comparison form
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or not HTTP(S)
/// 2. Lowercase the host and remove a `www.` prefix
/// 3. Remove dot segments, empty segments, and a trailing slash (root stays `/`)
/// 4. Remove the fragment
/// 5. Remove tracking query parameters (including any `utm_*`)
/// 6. Sort remaining query parameters; drop an empty query
///
/// The scheme is kept as-is so local test servers over plain HTTP still work.
///
/// # Examples
///
/// ```
/// use article_harvest::url::normalize_url;
///
/// let url = normalize_url("https://WWW.RTE.IE/news/business/?utm_source=x#top").unwrap();
/// assert_eq!(url.as_str(), "https://rte.ie/news/business");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    let path = normalize_path(url.path());
    url.set_path(&path);
    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            let query = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query));
        }
    }

    Ok(url)
}

/// The key under which a URL is de-duplicated within a run
///
/// Falls back to the raw URL when it cannot be normalized.
pub fn dedup_key(url: &Url) -> String {
    normalize_url(url.as_str())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

/// Resolves an href against the page it was found on
///
/// Returns None for `javascript:`, `mailto:`, `tel:` and `data:` links,
/// fragment-only anchors, unparsable hrefs, and non-HTTP(S) results.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    base_url
        .join(href)
        .ok()
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
}

fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    format!("/{}", segments.join("/"))
}

fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.rte.ie/news/business/").unwrap()
    }

    #[test]
    fn test_scheme_preserved() {
        let result = normalize_url("http://127.0.0.1:4000/a").unwrap();
        assert_eq!(result.as_str(), "http://127.0.0.1:4000/a");
    }

    #[test]
    fn test_www_and_case_folded() {
        let result = normalize_url("https://WWW.RTE.IE/News/").unwrap();
        assert_eq!(result.as_str(), "https://rte.ie/News");
    }

    #[test]
    fn test_root_keeps_slash() {
        let result = normalize_url("https://rte.ie").unwrap();
        assert_eq!(result.as_str(), "https://rte.ie/");
    }

    #[test]
    fn test_dot_segments_and_double_slashes() {
        let result = normalize_url("https://rte.ie/news//business/../world/./a/").unwrap();
        assert_eq!(result.as_str(), "https://rte.ie/news/world/a");
    }

    #[test]
    fn test_tracking_params_removed_and_sorted() {
        let result =
            normalize_url("https://rte.ie/a?utm_campaign=x&page=2&fbclid=y&lang=ga#c").unwrap();
        assert_eq!(result.as_str(), "https://rte.ie/a?lang=ga&page=2");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://rte.ie/file");
        assert!(matches!(result, Err(UrlError::InvalidScheme(_))));
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(normalize_url("not a url"), Err(UrlError::Parse(_))));
    }

    #[test]
    fn test_dedup_key_collapses_variants() {
        let a = Url::parse("https://www.rte.ie/news/2024/0101/story/").unwrap();
        let b = Url::parse("https://rte.ie/news/2024/0101/story?utm_source=feed").unwrap();
        assert_eq!(dedup_key(&a), dedup_key(&b));
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        assert_eq!(
            resolve_link("/news/business/2024/story", &base()).unwrap().as_str(),
            "https://www.rte.ie/news/business/2024/story"
        );
        assert_eq!(
            resolve_link("story", &base()).unwrap().as_str(),
            "https://www.rte.ie/news/business/story"
        );
        assert_eq!(
            resolve_link(" https://other.ie/x ", &base()).unwrap().as_str(),
            "https://other.ie/x"
        );
    }

    #[test]
    fn test_resolve_skips_non_navigational() {
        for href in [
            "",
            "#comments",
            "javascript:void(0)",
            "JavaScript:alert(1)",
            "mailto:news@rte.ie",
            "tel:+35312083111",
            "data:text/html,<p>x</p>",
            "ftp://rte.ie/file",
        ] {
            assert!(resolve_link(href, &base()).is_none(), "{} resolved", href);
        }
    }
}
