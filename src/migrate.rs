//! Schema creation and SQL migration files.
//!
//! [`run_migrations`] is idempotent and safe to run on every `radar init`.
//! It also upgrades databases created before the layout offset columns
//! existed. [`apply_migration_dir`] applies hand-written `*.sql` files once
//! each, tracked in `schema_migrations`.

use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let result = create_schema(&pool).await;
    pool.close().await;
    result
}

async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tools (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL DEFAULT '',
            radar_position TEXT NOT NULL DEFAULT 'Assess',
            cx_relevance_score INTEGER NOT NULL DEFAULT 5,
            integration_score INTEGER NOT NULL DEFAULT 5,
            overall_score REAL NOT NULL DEFAULT 5.0,
            cost_rating TEXT NOT NULL DEFAULT '$$',
            pricing_model TEXT NOT NULL DEFAULT '',
            key_features TEXT NOT NULL DEFAULT '[]',
            use_cases TEXT NOT NULL DEFAULT '[]',
            integrations TEXT NOT NULL DEFAULT '[]',
            source_url TEXT NOT NULL DEFAULT '',
            reasoning TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'active',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            plot_angle_offset INTEGER,
            plot_radius_offset REAL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Databases created before layout offsets were stored
    let columns: Vec<String> = sqlx::query("PRAGMA table_info(tools)")
        .fetch_all(pool)
        .await?
        .iter()
        .map(|row| row.get::<String, _>("name"))
        .collect();

    for (column, ty) in [
        ("plot_angle_offset", "INTEGER"),
        ("plot_radius_offset", "REAL"),
    ] {
        if !columns.iter().any(|c| c == column) {
            tracing::info!(column, "adding missing column to tools");
            sqlx::query(&format!("ALTER TABLE tools ADD COLUMN {} {}", column, ty))
                .execute(pool)
                .await?;
        }
    }

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tools_category ON tools(category)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tools_position ON tools(radar_position)")
        .execute(pool)
        .await?;

    if let Err(e) = create_fts(pool).await {
        tracing::warn!(error = %e, "full-text index unavailable, search will use substring matching");
    }

    Ok(())
}

/// Create the external-content FTS5 index and its sync triggers.
async fn create_fts(pool: &SqlitePool) -> Result<()> {
    // FTS5 CREATE is not idempotent natively, so we check first
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='tools_fts'",
    )
    .fetch_one(pool)
    .await?;

    if !fts_exists {
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE tools_fts USING fts5(
                name,
                description,
                category,
                content='tools',
                content_rowid='id'
            )
            "#,
        )
        .execute(pool)
        .await?;
    }

    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS tools_fts_ai AFTER INSERT ON tools BEGIN
            INSERT INTO tools_fts(rowid, name, description, category)
            VALUES (new.id, new.name, new.description, new.category);
        END
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS tools_fts_ad AFTER DELETE ON tools BEGIN
            INSERT INTO tools_fts(tools_fts, rowid, name, description, category)
            VALUES ('delete', old.id, old.name, old.description, old.category);
        END
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS tools_fts_au
        AFTER UPDATE OF name, description, category ON tools BEGIN
            INSERT INTO tools_fts(tools_fts, rowid, name, description, category)
            VALUES ('delete', old.id, old.name, old.description, old.category);
            INSERT INTO tools_fts(rowid, name, description, category)
            VALUES (new.id, new.name, new.description, new.category);
        END
        "#,
    )
    .execute(pool)
    .await?;

    if !fts_exists {
        // Index rows that predate the FTS table
        sqlx::query("INSERT INTO tools_fts(tools_fts) VALUES ('rebuild')")
            .execute(pool)
            .await?;
        tracing::info!("created full-text index");
    }

    Ok(())
}

/// Apply every `*.sql` file in `dir` that has not been applied yet, in
/// lexical file-name order. Returns the versions applied by this run.
pub async fn apply_migration_dir(config: &Config, dir: &Path) -> Result<Vec<String>> {
    let files = migration_files(dir)?;
    let pool = db::connect(config).await?;
    let result = apply_files(&pool, &files).await;
    pool.close().await;
    result
}

fn migration_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read migration directory: {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().map(|e| e == "sql").unwrap_or(false) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

async fn apply_files(pool: &SqlitePool, files: &[PathBuf]) -> Result<Vec<String>> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    let mut applied = Vec::new();

    for path in files {
        let version = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let exists: bool =
            sqlx::query_scalar("SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?")
                .bind(&version)
                .fetch_one(pool)
                .await?;
        if exists {
            tracing::debug!(version = %version, "migration already applied");
            continue;
        }

        let sql = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read migration: {}", path.display()))?;

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(&sql)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Migration {} failed", version))?;
        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)")
            .bind(&version)
            .bind(db::now_ts())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(version = %version, "applied migration");
        applied.push(version);
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.db.path = dir.path().join("data").join("radar.db");
        config
    }

    async fn table_names(config: &Config) -> Vec<String> {
        let pool = db::connect(config).await.unwrap();
        let names = sqlx::query_scalar("SELECT name FROM sqlite_master ORDER BY name")
            .fetch_all(&pool)
            .await
            .unwrap();
        pool.close().await;
        names
    }

    #[tokio::test]
    async fn test_run_migrations_idempotent() {
        let dir = TempDir::new().unwrap();
        let config = temp_config(&dir);

        run_migrations(&config).await.unwrap();
        run_migrations(&config).await.unwrap();

        let names = table_names(&config).await;
        assert!(names.contains(&"tools".to_string()));
        assert!(names.contains(&"tools_fts".to_string()));
        assert!(names.contains(&"idx_tools_category".to_string()));
        assert!(names.contains(&"tools_fts_au".to_string()));
    }

    #[tokio::test]
    async fn test_adds_missing_offset_columns() {
        let dir = TempDir::new().unwrap();
        let config = temp_config(&dir);

        let pool = db::connect(&config).await.unwrap();
        sqlx::query(
            "CREATE TABLE tools (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT UNIQUE NOT NULL, \
             description TEXT NOT NULL DEFAULT '', category TEXT NOT NULL DEFAULT '', \
             radar_position TEXT NOT NULL DEFAULT 'Assess', created_at INTEGER NOT NULL, \
             updated_at INTEGER NOT NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO tools (name, description, created_at, updated_at) VALUES ('Old', 'legacy row', 0, 0)")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;

        run_migrations(&config).await.unwrap();

        let pool = db::connect(&config).await.unwrap();
        let offset: Option<i64> = sqlx::query_scalar("SELECT plot_angle_offset FROM tools WHERE name = 'Old'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(offset, None);

        // pre-existing rows are indexed by the rebuild
        let hits: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tools_fts WHERE tools_fts MATCH 'legacy'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(hits, 1);
        pool.close().await;
    }

    #[tokio::test]
    async fn test_apply_migration_dir_once() {
        let dir = TempDir::new().unwrap();
        let config = temp_config(&dir);
        run_migrations(&config).await.unwrap();

        let mig = dir.path().join("migrations");
        std::fs::create_dir_all(&mig).unwrap();
        std::fs::write(
            mig.join("001_notes.sql"),
            "CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT);\nINSERT INTO notes (body) VALUES ('a');",
        )
        .unwrap();
        std::fs::write(mig.join("002_more.sql"), "INSERT INTO notes (body) VALUES ('b');").unwrap();
        std::fs::write(mig.join("README.md"), "not a migration").unwrap();

        let applied = apply_migration_dir(&config, &mig).await.unwrap();
        assert_eq!(applied, vec!["001_notes", "002_more"]);

        let again = apply_migration_dir(&config, &mig).await.unwrap();
        assert!(again.is_empty());

        let pool = db::connect(&config).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notes")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 2);
        pool.close().await;
    }

    #[tokio::test]
    async fn test_failed_migration_rolls_back() {
        let dir = TempDir::new().unwrap();
        let config = temp_config(&dir);
        run_migrations(&config).await.unwrap();

        let mig = dir.path().join("migrations");
        std::fs::create_dir_all(&mig).unwrap();
        std::fs::write(
            mig.join("001_bad.sql"),
            "CREATE TABLE half (id INTEGER);\nINSERT INTO missing_table VALUES (1);",
        )
        .unwrap();

        let err = apply_migration_dir(&config, &mig).await.unwrap_err();
        assert!(format!("{:#}", err).contains("001_bad"));

        let names = table_names(&config).await;
        assert!(!names.contains(&"half".to_string()));
    }
}
