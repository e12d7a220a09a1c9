//! JSON export of harvested articles

use crate::output::{write_file, OutputResult};
use crate::record::Article;
use serde::Serialize;
use std::path::Path;

/// Serializes articles as a pretty-printed JSON array
pub fn articles_to_json(articles: &[Article]) -> OutputResult<String> {
    Ok(serde_json::to_string_pretty(articles)?)
}

/// Writes any serializable value as pretty JSON
///
/// # Arguments
///
/// * `value` - Articles, scored articles, or any other record list
/// * `path` - Destination file; parent directories are created
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> OutputResult<()> {
    let mut json = serde_json::to_vec_pretty(value)?;
    json.push(b'\n');
    write_file(path, &json)?;
    tracing::info!("Wrote JSON output to {}", path.display());
    Ok(())
}
