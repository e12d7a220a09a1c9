//! Configuration module for Article-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! including the field mapping that tells the crawler where each article field
//! lives in a site's markup.
//!
//! # Example
//!
//! ```no_run
//! use article_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Listing template: {}", config.site.base_url);
//! ```

mod mapping;
mod parser;
mod types;
mod validation;

// Re-export types
pub use mapping::{Cardinality, FieldMapping, FieldRule, LinkRule, ListingMapping, PostProcess};
pub use types::{Config, CrawlerConfig, OutputConfig, SiteConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub(crate) use validation::validate_category;
