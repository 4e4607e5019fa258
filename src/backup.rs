//! `radar backup`: a consistent copy of the live database.
//!
//! Uses `VACUUM INTO`, which is safe while other connections are open
//! and produces a compacted single-file copy (no WAL sidecar).

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::db;

/// Backup file name for a timestamp, e.g. `radar_backup_20240131_093000.db`.
pub fn backup_file_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("radar_backup_{}.db", now.format("%Y%m%d_%H%M%S"))
}

/// Write a backup into `dir` (default: `backups/` next to the database)
/// and return its path.
pub async fn create_backup(config: &Config, dir: Option<&Path>) -> Result<PathBuf> {
    if !config.db.path.exists() {
        bail!(
            "Database not found: {}. Run `radar init` first.",
            config.db.path.display()
        );
    }

    let dir = match dir {
        Some(d) => d.to_path_buf(),
        None => config
            .db
            .path
            .parent()
            .map(|p| p.join("backups"))
            .unwrap_or_else(|| PathBuf::from("backups")),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create backup directory: {}", dir.display()))?;

    let target = dir.join(backup_file_name(chrono::Local::now()));
    if target.exists() {
        bail!("Backup already exists: {}", target.display());
    }

    let pool = db::connect(config).await?;
    let result = sqlx::query("VACUUM INTO ?")
        .bind(target.to_string_lossy().to_string())
        .execute(&pool)
        .await;
    pool.close().await;
    result.with_context(|| format!("Failed to write backup: {}", target.display()))?;

    tracing::info!(path = %target.display(), "backup written");
    Ok(target)
}

pub async fn run_backup(config: &Config, dir: Option<&Path>) -> Result<()> {
    let path = create_backup(config, dir).await?;
    println!("Backup written to {}", path.display());
    Ok(())
}
