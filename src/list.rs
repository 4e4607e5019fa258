//! `radar list` and `radar radar`.

use anyhow::Result;

use crate::config::Config;
use crate::layout::RadarLayout;
use crate::models::{ToolFilters, ToolRecord};
use crate::store::ToolStore;

pub async fn run_list(config: &Config, filters: &ToolFilters, json: bool) -> Result<()> {
    let store = ToolStore::open(config).await?;
    let tools = store.get_all(filters).await;
    store.close().await;
    let tools = tools?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }

    print_table(&tools);
    Ok(())
}

/// Print tools as a fixed-width table, or "No tools." when empty.
pub fn print_table(tools: &[ToolRecord]) {
    if tools.is_empty() {
        println!("No tools.");
        return;
    }

    println!(
        "  {:<4} {:<28} {:<22} {:<7} {:>3} {:>4} {:>6}  {}",
        "ID", "NAME", "CATEGORY", "RING", "CX", "INT", "SCORE", "COST"
    );
    println!("  {}", "-".repeat(86));
    for t in tools {
        println!(
            "  {:<4} {:<28} {:<22} {:<7} {:>3} {:>4} {:>6.2}  {}",
            t.id,
            truncate(&t.name, 28),
            truncate(&t.category, 22),
            t.radar_position.as_str(),
            t.cx_relevance_score,
            t.integration_score,
            t.overall_score,
            t.cost_rating.symbol()
        );
    }
    println!();
    println!("{} tool{}", tools.len(), if tools.len() == 1 { "" } else { "s" });
}

pub async fn run_radar(config: &Config, filters: &ToolFilters, json: bool) -> Result<()> {
    let store = ToolStore::open(config).await?;
    let tools = store.get_all(filters).await;
    store.close().await;
    let tools = tools?;

    let layout = RadarLayout::new(config);
    let points = layout.plot_all(&tools);

    if json {
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(());
    }

    if points.is_empty() {
        println!("No tools.");
        return Ok(());
    }

    println!(
        "  {:<28} {:<7} {:>4} {:>8} {:>7} {:>7} {:>7}",
        "NAME", "RING", "IDX", "ANGLE", "RADIUS", "X", "Y"
    );
    println!("  {}", "-".repeat(74));
    for p in &points {
        println!(
            "  {:<28} {:<7} {:>4} {:>8.1} {:>7.2} {:>7.2} {:>7.2}",
            truncate(&p.name, 28),
            p.position.as_str(),
            p.ring,
            p.angle_deg,
            p.radius,
            p.x,
            p.y
        );
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(3)).collect();
        out.push_str("...");
        out
    }
}
