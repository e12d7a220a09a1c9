use crate::config::mapping::{FieldMapping, FieldRule, PostProcess};
use crate::config::types::{Config, CrawlerConfig, OutputConfig, SiteConfig, UserAgentConfig};
use crate::crawler::CompiledMapping;
use crate::record::FieldName;
use crate::url::Scope;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_site_config(&config.site)?;
    validate_mapping(&config.mapping)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.parallelism < 1 || config.parallelism > 64 {
        return Err(ConfigError::Validation(format!(
            "parallelism must be between 1 and 64, got {}",
            config.parallelism
        )));
    }

    if config.per_domain_concurrency < 1 || config.per_domain_concurrency > 64 {
        return Err(ConfigError::Validation(format!(
            "per_domain_concurrency must be between 1 and 64, got {}",
            config.per_domain_concurrency
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

/// Validates the listing template, allow-list and default categories
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    if !config.base_url.contains("{category}") {
        return Err(ConfigError::Validation(format!(
            "base_url '{}' must contain a {{category}} placeholder",
            config.base_url
        )));
    }

    if config.allowed_domains.is_empty() {
        return Err(ConfigError::Validation(
            "allowed_domains must list at least one domain".to_string(),
        ));
    }

    for pattern in &config.allowed_domains {
        validate_domain_pattern(pattern)?;
    }

    let sample = config.listing_url("category");
    let url = Url::parse(&sample).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid base_url '{}': {}", config.base_url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use HTTP or HTTPS",
            config.base_url
        )));
    }

    // A listing page the fetcher refuses to contact is a dead configuration
    Scope::new(config.allowed_domains.clone())
        .check(&url)
        .map_err(|e| ConfigError::Validation(format!("base_url is not allowed: {}", e)))?;

    for category in &config.categories {
        validate_category(category)?;
    }

    Ok(())
}

/// Validates a category name used in the listing template
pub(crate) fn validate_category(category: &str) -> Result<(), ConfigError> {
    if category.trim().is_empty() {
        return Err(ConfigError::Validation(
            "category cannot be empty".to_string(),
        ));
    }

    if category.contains(['/', '\\', '?', '#']) {
        return Err(ConfigError::Validation(format!(
            "category '{}' must not contain '/', '\\', '?' or '#'",
            category
        )));
    }

    // Dot segments would resolve the listing URL to a parent page
    let decoded = category.to_ascii_lowercase().replace("%2e", ".");
    if decoded == "." || decoded == ".." {
        return Err(ConfigError::Validation(format!(
            "category '{}' is a relative path segment",
            category
        )));
    }

    Ok(())
}

/// Validates the field mapping, compiling every selector once
fn validate_mapping(mapping: &FieldMapping) -> Result<(), ConfigError> {
    CompiledMapping::compile(mapping)?;

    let has_title = mapping
        .listing
        .preview
        .iter()
        .chain(mapping.detail.iter())
        .any(|rule| rule.field == FieldName::Title);

    if !has_title {
        return Err(ConfigError::Validation(
            "mapping needs a title rule in listing.preview or detail".to_string(),
        ));
    }

    if mapping.listing.link.attr.is_empty() {
        return Err(ConfigError::Validation(
            "listing.link.attr cannot be empty".to_string(),
        ));
    }

    for rule in mapping.listing.preview.iter().chain(mapping.detail.iter()) {
        validate_rule(rule)?;
    }

    Ok(())
}

/// Validates a single rule's post-processing chain
fn validate_rule(rule: &FieldRule) -> Result<(), ConfigError> {
    let date_steps = rule
        .post
        .iter()
        .filter(|step| matches!(step, PostProcess::ParseDate(_)))
        .count();

    if date_steps > 0 && rule.field != FieldName::PublishedAt {
        return Err(ConfigError::Validation(format!(
            "parse-date is only valid on the published-at field, found on '{}'",
            rule.field
        )));
    }

    if date_steps > 1 {
        return Err(ConfigError::Validation(format!(
            "rule for '{}' has more than one parse-date step",
            rule.field
        )));
    }

    if let Some(format) = rule.date_format() {
        if format.trim().is_empty() {
            return Err(ConfigError::Validation(
                "parse-date format cannot be empty".to_string(),
            ));
        }
    }

    if let Some(attr) = &rule.attr {
        if attr.is_empty() {
            return Err(ConfigError::Validation(format!(
                "attr for '{}' cannot be empty",
                rule.field
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    let paths = [
        ("json_path", &config.json_path),
        ("summary_path", &config.summary_path),
        ("archive_path", &config.archive_path),
        ("chart_path", &config.chart_path),
    ];

    for (name, path) in paths {
        if matches!(path, Some(p) if p.is_empty()) {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    match pattern.strip_prefix("*.") {
        Some(domain) => validate_domain_string(domain),
        None => validate_domain_string(pattern),
    }
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}
