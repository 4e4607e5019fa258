//! `radar analyze`, `radar add` and `radar compare`.
//!
//! These are the commands that call the model. Each performs at most one
//! analysis (or comparison) request and waits for it, retries included.

use anyhow::{bail, Context, Result};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::analyzer::Analyzer;
use crate::config::Config;
use crate::llm::AnthropicClient;
use crate::models::{AddOutcome, NewTool, ToolAnalysis};
use crate::store::ToolStore;

/// Build an analyzer backed by the Anthropic API.
///
/// Fails when the API key environment variable is not set.
pub fn analyzer_from_config(config: &Config) -> Result<Analyzer> {
    let client = AnthropicClient::from_config(&config.llm)?;
    Ok(Analyzer::new(Box::new(client), Arc::new(config.clone())))
}

/// Resolve the tool description: positional text, then `--file`, then stdin.
pub fn read_input(text: Option<String>, file: Option<&Path>) -> Result<String> {
    let content = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?,
        (None, None) => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    if content.trim().is_empty() {
        bail!("No input provided. Pass text, --file, or pipe a description on stdin.");
    }
    Ok(content)
}

pub async fn run_analyze(
    config: &Config,
    text: Option<String>,
    file: Option<&Path>,
    url: Option<String>,
    json: bool,
) -> Result<()> {
    let content = read_input(text, file)?;
    let analyzer = analyzer_from_config(config)?;
    let analysis = analyzer
        .analyze(&content, url.as_deref().unwrap_or(""))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print_analysis(&analysis);
    }
    Ok(())
}

pub async fn run_add(
    config: &Config,
    text: Option<String>,
    file: Option<&Path>,
    url: Option<String>,
) -> Result<()> {
    let content = read_input(text, file)?;
    let source_url = url.unwrap_or_default();

    let analyzer = analyzer_from_config(config)?;

    // refuse before the model call so an analysis is never thrown away
    let store = ToolStore::open(config).await?;
    if let Err(e) = store.ensure_schema().await {
        store.close().await;
        return Err(e);
    }

    let analysis = match analyzer.analyze(&content, &source_url).await {
        Ok(a) => a,
        Err(e) => {
            store.close().await;
            return Err(e.into());
        }
    };
    print_analysis(&analysis);

    let outcome = store
        .add_tool(&NewTool::new(analysis.clone(), source_url))
        .await;
    store.close().await;

    match outcome? {
        AddOutcome::Added(id) => {
            println!();
            println!("Added '{}' (id {}).", analysis.name, id);
        }
        AddOutcome::Duplicate => {
            eprintln!(
                "Warning: a tool named '{}' already exists. Nothing was added.",
                analysis.name
            );
        }
    }
    Ok(())
}

pub async fn run_compare(config: &Config, names: &[String]) -> Result<()> {
    if names.len() < 2 {
        bail!("compare needs at least two tool names");
    }

    let store = ToolStore::open(config).await?;
    let mut tools = Vec::with_capacity(names.len());
    for name in names {
        match store.get_by_name(name).await? {
            Some(tool) => tools.push(tool),
            None => {
                store.close().await;
                bail!("tool not found: {}", name);
            }
        }
    }
    store.close().await;

    let analyzer = analyzer_from_config(config)?;
    let comparison = analyzer.compare(&tools).await?;
    println!("{}", comparison);
    Ok(())
}

fn print_analysis(a: &ToolAnalysis) {
    println!("{}", a.name);
    println!("{}", "=".repeat(a.name.chars().count().max(3)));
    println!();
    println!("  Category:     {}", a.category);
    println!("  Position:     {}", a.radar_position);
    println!(
        "  Scores:       CX {}/10, integration {}/10, overall {:.1}",
        a.cx_relevance_score, a.integration_score, a.overall_score
    );
    println!("  Cost:         {} ({})", a.cost_rating.symbol(), a.pricing_model);
    println!();
    println!("  {}", a.description);

    for (label, items) in [
        ("Key features", &a.key_features),
        ("Use cases", &a.use_cases),
        ("Integrations", &a.integrations),
    ] {
        if !items.is_empty() {
            println!();
            println!("  {}:", label);
            for item in items {
                println!("    - {}", item);
            }
        }
    }

    if !a.reasoning.is_empty() {
        println!();
        println!("  Reasoning: {}", a.reasoning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_input_prefers_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tool.txt");
        std::fs::write(&path, "from file").unwrap();

        assert_eq!(read_input(Some("inline".into()), Some(&path)).unwrap(), "inline");
        assert_eq!(read_input(None, Some(&path)).unwrap(), "from file");
    }

    #[test]
    fn test_read_input_rejects_blank() {
        let err = read_input(Some("  \n".into()), None).unwrap_err();
        assert!(err.to_string().contains("No input provided"));
    }

    #[test]
    fn test_read_input_missing_file() {
        let err = read_input(None, Some(Path::new("/nonexistent/tool.txt"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read input file"));
    }
}
