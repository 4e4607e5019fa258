//! Single tool retrieval.
//!
//! Used by the `radar get` CLI command. The HTTP API serves the same
//! record as JSON from `GET /tools/{name}`.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::models::ToolRecord;
use crate::store::ToolStore;

pub async fn run_get(config: &Config, name: &str, json: bool) -> Result<()> {
    let store = ToolStore::open(config).await?;
    let tool = store.get_by_name(name).await;
    store.close().await;

    let tool = match tool? {
        Some(t) => t,
        None => bail!("tool not found: {}", name),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&tool)?);
    } else {
        print_record(&tool);
    }
    Ok(())
}

fn print_record(t: &ToolRecord) {
    println!("--- Tool ---");
    println!("id:             {}", t.id);
    println!("name:           {}", t.name);
    println!("category:       {}", t.category);
    println!("position:       {}", t.radar_position);
    println!("cx_relevance:   {}", t.cx_relevance_score);
    println!("integration:    {}", t.integration_score);
    println!("overall:        {:.2}", t.overall_score);
    println!("cost:           {}", t.cost_rating.symbol());
    println!("pricing_model:  {}", t.pricing_model);
    if !t.source_url.is_empty() {
        println!("source_url:     {}", t.source_url);
    }
    println!("created_at:     {}", format_ts_iso(t.created_at));
    println!("updated_at:     {}", format_ts_iso(t.updated_at));
    println!();

    println!("--- Description ---");
    println!("{}", t.description);
    println!();

    for (label, items) in [
        ("Key features", &t.key_features),
        ("Use cases", &t.use_cases),
        ("Integrations", &t.integrations),
    ] {
        println!("--- {} ({}) ---", label, items.len());
        for item in items {
            println!("- {}", item);
        }
        println!();
    }

    println!("--- Reasoning ---");
    println!("{}", t.reasoning);
}

pub(crate) fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
