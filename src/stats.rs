//! Radar statistics overview.
//!
//! Provides a quick summary of what is tracked: totals by ring and by
//! category, database size, and the most recently added tools. Used by
//! `radar stats`.

use anyhow::Result;

use crate::config::Config;
use crate::store::ToolStore;

const RECENT_LIMIT: i64 = 5;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = ToolStore::open(config).await?;
    let stats = store.stats().await;
    let recent = store.recent(RECENT_LIMIT).await;
    store.close().await;
    let (stats, recent) = (stats?, recent?);

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Tech Radar - Stats");
    println!("==================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Tools:       {}", stats.total);

    if stats.total == 0 {
        println!();
        return Ok(());
    }

    println!();
    println!("  By position:");
    for position in config.ring_order() {
        let count = stats.by_position.get(position.as_str()).copied().unwrap_or(0);
        println!("    {:<24} {:>5}", position.as_str(), count);
    }

    println!();
    println!("  By category:");
    let mut categories: Vec<(&String, &i64)> = stats.by_category.iter().collect();
    categories.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (category, count) in categories {
        println!("    {:<24} {:>5}", category, count);
    }

    println!();
    println!("  Recently added:");
    for t in &recent {
        println!(
            "    {:<24} {:<7} {}",
            t.name,
            t.radar_position.as_str(),
            format_ts_relative(t.created_at)
        );
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_short(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_short(ts)
    }
}

fn format_ts_short(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
