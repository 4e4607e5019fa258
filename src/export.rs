//! Bulk export of tools as CSV or JSON.
//!
//! CSV output quotes fields per RFC 4180 and joins list fields with `"; "`.
//! It is meant for spreadsheets, not as a stable interchange format.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::models::{ToolFilters, ToolRecord};
use crate::store::ToolStore;

const CSV_HEADER: [&str; 16] = [
    "name",
    "description",
    "category",
    "radar_position",
    "cx_relevance_score",
    "integration_score",
    "overall_score",
    "cost_rating",
    "pricing_model",
    "key_features",
    "use_cases",
    "integrations",
    "source_url",
    "reasoning",
    "created_at",
    "updated_at",
];

/// Render tools as CSV with a header row. Lines end with CRLF.
pub fn to_csv(tools: &[ToolRecord]) -> String {
    let mut out = String::new();
    push_row(&mut out, CSV_HEADER.iter().map(|s| s.to_string()));

    for t in tools {
        push_row(
            &mut out,
            [
                t.name.clone(),
                t.description.clone(),
                t.category.clone(),
                t.radar_position.as_str().to_string(),
                t.cx_relevance_score.to_string(),
                t.integration_score.to_string(),
                format!("{:.2}", t.overall_score),
                t.cost_rating.symbol().to_string(),
                t.pricing_model.clone(),
                t.key_features.join("; "),
                t.use_cases.join("; "),
                t.integrations.join("; "),
                t.source_url.clone(),
                t.reasoning.clone(),
                crate::get::format_ts_iso(t.created_at),
                crate::get::format_ts_iso(t.updated_at),
            ],
        );
    }
    out
}

fn push_row(out: &mut String, fields: impl IntoIterator<Item = String>) {
    let line = fields
        .into_iter()
        .map(|f| csv_field(&f))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&line);
    out.push_str("\r\n");
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn to_json(tools: &[ToolRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(tools)?)
}

/// Suggested download name: `radar_tools.csv`, or
/// `radar_search_<query>.csv` for search results.
pub fn suggested_file_name(search: Option<&str>, extension: &str) -> String {
    match search.map(str::trim).filter(|q| !q.is_empty()) {
        None => format!("radar_tools.{}", extension),
        Some(q) => format!("radar_search_{}.{}", sanitize_query(q), extension),
    }
}

/// First 20 characters, word characters only, separator runs as `-`.
fn sanitize_query(query: &str) -> String {
    let truncated: String = query.chars().take(20).collect();

    let mut out = String::new();
    let mut pending_sep = false;
    for c in truncated.chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_sep && !out.is_empty() {
                out.push('-');
            }
            pending_sep = false;
            out.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_sep = true;
        }
    }

    if out.is_empty() {
        "search".to_string()
    } else {
        out
    }
}

/// Export tools to a file (or stdout when `output` is `None`).
///
/// When `output` is a directory, the suggested file name is used inside it.
pub async fn run_export(
    config: &Config,
    format: &str,
    search: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let extension = match format {
        "csv" => "csv",
        "json" => "json",
        _ => bail!("Unknown export format: {}. Use csv or json.", format),
    };

    let store = ToolStore::open(config).await?;
    let tools = match search {
        Some(q) => store.search(q).await,
        None => store.get_all(&ToolFilters::default()).await,
    };
    store.close().await;
    let tools = tools?;

    let body = if extension == "csv" {
        to_csv(&tools)
    } else {
        to_json(&tools)?
    };

    match output {
        Some(path) => {
            let path: PathBuf = if path.is_dir() {
                path.join(suggested_file_name(search, extension))
            } else {
                path.to_path_buf()
            };
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(&path, &body)
                .with_context(|| format!("Failed to write export: {}", path.display()))?;
            eprintln!("Exported {} tools to {}", tools.len(), path.display());
        }
        None => {
            print!("{}", body);
        }
    }

    Ok(())
}
