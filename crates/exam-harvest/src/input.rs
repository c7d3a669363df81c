//! Loading target lists from disk.
//!
//! Two formats are accepted: a JSON array of `{topic, question, link}`
//! objects, or a link sheet with a `Topic,Question,Link` header row.

use std::path::Path;

use crate::types::{HarvestError, HarvestResult, Target};

/// Load targets from `path`, choosing the format by extension.
pub fn load_targets(path: &Path) -> HarvestResult<Vec<Target>> {
    let raw = std::fs::read_to_string(path)?;
    let is_sheet = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    if is_sheet {
        parse_link_sheet(&raw)
    } else {
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Parse a comma-separated link sheet. Columns are found by header name,
/// case-insensitively, so extra columns and any column order are fine.
pub fn parse_link_sheet(raw: &str) -> HarvestResult<Vec<Target>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());

    let headers: csv::StringRecord = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_ascii_lowercase())
        .collect();
    if headers.is_empty() {
        return Err(HarvestError::InvalidRequest("link sheet is empty".to_string()));
    }
    for name in ["topic", "question", "link"] {
        if !headers.iter().any(|h| h == name) {
            return Err(HarvestError::InvalidRequest(format!(
                "link sheet has no '{name}' column"
            )));
        }
    }
    reader.set_headers(headers);

    let mut targets = Vec::new();
    for row in reader.deserialize::<Target>() {
        targets.push(row?);
    }
    Ok(targets)
}
