use crate::url::extract_domain;
use crate::ScopeError;
use url::Url;

/// Checks if a domain matches a wildcard pattern
///
/// `"example.com"` matches only itself; `"*.example.com"` matches the bare
/// domain and any subdomain depth beneath it.
///
/// ```
/// use article_harvest::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.rte.ie", "rte.ie"));
/// assert!(matches_wildcard("*.rte.ie", "www.rte.ie"));
/// assert!(!matches_wildcard("rte.ie", "www.rte.ie"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || candidate
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => candidate == pattern,
    }
}

/// The set of domains a fetcher may contact
#[derive(Debug, Clone)]
pub struct Scope {
    patterns: Vec<String>,
}

impl Scope {
    /// Builds a scope from domain patterns; patterns are lowercased
    pub fn new(patterns: Vec<String>) -> Self {
        Self {
            patterns: patterns.into_iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// Returns true if the domain matches any allowed pattern
    pub fn allows(&self, domain: &str) -> bool {
        self.patterns.iter().any(|p| matches_wildcard(p, domain))
    }

    /// Fails with `ScopeError` unless the URL's host is allowed
    pub fn check(&self, url: &Url) -> Result<(), ScopeError> {
        match extract_domain(url) {
            Some(domain) if self.allows(&domain) => Ok(()),
            domain => Err(ScopeError {
                url: url.to_string(),
                domain: domain.unwrap_or_default(),
            }),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rte_scope() -> Scope {
        Scope::new(vec!["www.rte.ie".to_string(), "rte.ie".to_string()])
    }

    #[test]
    fn test_exact_patterns() {
        assert!(matches_wildcard("rte.ie", "rte.ie"));
        assert!(!matches_wildcard("rte.ie", "www.rte.ie"));
        assert!(!matches_wildcard("www.rte.ie", "rte.ie"));
    }

    #[test]
    fn test_wildcard_patterns() {
        assert!(matches_wildcard("*.rte.ie", "rte.ie"));
        assert!(matches_wildcard("*.rte.ie", "www.rte.ie"));
        assert!(matches_wildcard("*.rte.ie", "img.static.rte.ie"));
        assert!(!matches_wildcard("*.rte.ie", "notrte.ie"));
        assert!(!matches_wildcard("*.rte.ie", "rte.ie.evil.com"));
        assert!(!matches_wildcard("*.rte.ie", ""));
    }

    #[test]
    fn test_scope_allows_listed_hosts() {
        let scope = rte_scope();
        assert!(scope.allows("www.rte.ie"));
        assert!(scope.allows("rte.ie"));
        assert!(!scope.allows("bbc.co.uk"));
    }

    #[test]
    fn test_scope_check_is_case_insensitive_on_host() {
        let scope = rte_scope();
        let url = Url::parse("https://WWW.RTE.IE/news/business/").unwrap();
        assert!(scope.check(&url).is_ok());
    }

    #[test]
    fn test_scope_check_rejects_other_domain() {
        let scope = rte_scope();
        let url = Url::parse("https://www.irishtimes.com/business/").unwrap();
        let err = scope.check(&url).unwrap_err();
        assert_eq!(err.domain, "www.irishtimes.com");
        assert_eq!(err.url, "https://www.irishtimes.com/business/");
    }

    #[test]
    fn test_patterns_lowercased() {
        let scope = Scope::new(vec!["*.RTE.ie".to_string()]);
        assert_eq!(scope.patterns(), &["*.rte.ie".to_string()]);
        assert!(scope.allows("www.rte.ie"));
    }
}
