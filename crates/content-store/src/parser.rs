//! Parser for JSON Lines snapshot files.
//!
//! A snapshot directory holds one document per line in each of:
//! - content.jsonl: `{"id", "title", "source", "url", "summary", "category", "timestamp", "upvotes", "downvotes"}`
//! - users.jsonl: `{"id", "display_name", "preferences"}`
//! - interactions.jsonl: `{"user_id", "content_id", "interaction_type", "rating", "timestamp"}`
//!
//! Field aliases (`_id`, `content_summary`, `created_at`) accept documents
//! exported straight from the original document store.

use crate::error::{Result, StoreError};
use crate::types::{ContentItem, InteractionRecord, UserRecord};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Read a JSON Lines file into typed records.
///
/// Blank lines are skipped. The first undecodable line aborts with a
/// [`StoreError::ParseError`] naming the file and line.
pub fn parse_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => StoreError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => StoreError::IoError(e),
    })?;

    let mut records = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line_trimmed = line.trim();
        if line_trimmed.is_empty() {
            continue;
        }
        let record = serde_json::from_str(line_trimmed).map_err(|e| StoreError::ParseError {
            file: file_name.clone(),
            line: idx + 1,
            reason: e.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Parse content.jsonl
pub fn parse_content(path: &Path) -> Result<Vec<ContentItem>> {
    parse_jsonl(path)
}

/// Parse users.jsonl
pub fn parse_users(path: &Path) -> Result<Vec<UserRecord>> {
    parse_jsonl(path)
}

/// Parse interactions.jsonl
pub fn parse_interactions(path: &Path) -> Result<Vec<InteractionRecord>> {
    parse_jsonl(path)
}

/// Write records as JSON Lines, replacing the file
pub fn write_jsonl<'a, T, I>(path: &Path, records: I) -> Result<()>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut writer = BufWriter::new(fs::File::create(path)?);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
