use anyhow::{Context, Result};
use rag_core::Document;
use std::path::Path;

/// Read a dataset file of `{id, text}` records.
///
/// Accepts either a JSON array or JSON Lines (one object per line, blank
/// lines ignored).
pub async fn load_dataset(path: &Path) -> Result<Vec<Document>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read dataset {}", path.display()))?;

    parse_dataset(&content).with_context(|| format!("Failed to parse dataset {}", path.display()))
}

pub fn parse_dataset(content: &str) -> Result<Vec<Document>> {
    let trimmed = content.trim_start();

    if trimmed.starts_with('[') {
        let documents: Vec<Document> = serde_json::from_str(trimmed)?;
        return Ok(documents);
    }

    trimmed
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            serde_json::from_str::<Document>(line)
                .with_context(|| format!("Invalid record on line {}", number + 1))
        })
        .collect()
}
