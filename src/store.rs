//! Tool persistence.
//!
//! [`ToolStore`] wraps one connection pool. Only `active` rows are visible
//! to reads. Rows whose layout offsets are missing (written before offsets
//! were stored) are backfilled on read; a failed backfill write is logged
//! and the computed values are still returned.

use anyhow::{bail, Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::BTreeMap;

use crate::config::Config;
use crate::db;
use crate::layout::jitter;
use crate::models::{
    AddOutcome, CostRating, NewTool, RadarPosition, StoreStats, ToolFilters, ToolRecord,
    ToolStatus,
};

const SELECT_TOOLS: &str = r#"
    SELECT id, name, description, category, radar_position, cx_relevance_score,
           integration_score, overall_score, cost_rating, pricing_model, key_features,
           use_cases, integrations, source_url, reasoning, status, created_at, updated_at,
           plot_angle_offset, plot_radius_offset
    FROM tools
"#;

pub struct ToolStore {
    pool: SqlitePool,
}

impl ToolStore {
    /// Connect to the configured database. The schema must already exist
    /// (see [`crate::migrate::run_migrations`]).
    pub async fn open(config: &Config) -> Result<Self> {
        Ok(Self::new(db::connect(config).await?))
    }

    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Fail unless `radar init` has created the `tools` table.
    pub async fn ensure_schema(&self) -> Result<()> {
        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='tools'",
        )
        .fetch_one(&self.pool)
        .await?;
        if tables == 0 {
            bail!("Database is not initialized. Run `radar init` first.");
        }
        Ok(())
    }

    /// Insert a tool. A name collision yields [`AddOutcome::Duplicate`].
    pub async fn add_tool(&self, tool: &NewTool) -> Result<AddOutcome> {
        let a = &tool.analysis;
        let offsets = tool.jitter.unwrap_or_else(|| jitter(&a.name));
        let now = db::now_ts();

        let result = sqlx::query(
            r#"
            INSERT INTO tools (
                name, description, category, radar_position, cx_relevance_score,
                integration_score, overall_score, cost_rating, pricing_model, key_features,
                use_cases, integrations, source_url, reasoning, status, created_at, updated_at,
                plot_angle_offset, plot_radius_offset
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&a.name)
        .bind(&a.description)
        .bind(&a.category)
        .bind(a.radar_position.as_str())
        .bind(a.cx_relevance_score)
        .bind(a.integration_score)
        .bind(a.overall_score)
        .bind(a.cost_rating.symbol())
        .bind(&a.pricing_model)
        .bind(serde_json::to_string(&a.key_features)?)
        .bind(serde_json::to_string(&a.use_cases)?)
        .bind(serde_json::to_string(&a.integrations)?)
        .bind(&tool.source_url)
        .bind(&a.reasoning)
        .bind(ToolStatus::Active.as_str())
        .bind(now)
        .bind(now)
        .bind(offsets.angle_offset)
        .bind(offsets.radius_offset)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => {
                let id = done.last_insert_rowid();
                tracing::info!(id, name = %a.name, "tool added");
                Ok(AddOutcome::Added(id))
            }
            Err(e)
                if e
                    .as_database_error()
                    .map(|d| d.is_unique_violation())
                    .unwrap_or(false) =>
            {
                tracing::warn!(name = %a.name, "tool already exists");
                Ok(AddOutcome::Duplicate)
            }
            Err(e) => Err(e).context("Failed to insert tool"),
        }
    }

    /// Active tools matching `filters`, ordered by id.
    pub async fn get_all(&self, filters: &ToolFilters) -> Result<Vec<ToolRecord>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_TOOLS);
        qb.push(" WHERE status = 'active'");

        if let Some(ref category) = filters.category {
            qb.push(" AND category = ").push_bind(category.clone());
        }
        if let Some(position) = filters.position {
            qb.push(" AND radar_position = ").push_bind(position.as_str());
        }
        if let Some(min) = filters.min_cx_score {
            qb.push(" AND cx_relevance_score >= ").push_bind(min);
        }
        if let Some(max) = filters.max_cx_score {
            qb.push(" AND cx_relevance_score <= ").push_bind(max);
        }
        if let Some(min) = filters.min_integration_score {
            qb.push(" AND integration_score >= ").push_bind(min);
        }
        if let Some(max) = filters.max_integration_score {
            qb.push(" AND integration_score <= ").push_bind(max);
        }
        qb.push(" ORDER BY id ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        self.hydrate(&rows).await
    }

    /// Search name, description and category.
    ///
    /// Uses the full-text index when available, falling back to a
    /// case-insensitive substring match. Result order is not guaranteed
    /// to be by relevance.
    pub async fn search(&self, query: &str) -> Result<Vec<ToolRecord>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        match self.search_fts(query).await {
            Ok(rows) if !rows.is_empty() => return self.hydrate(&rows).await,
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "full-text search failed, using substring match"),
        }

        // LIKE folds ASCII case only; other text matches as typed
        let pattern = format!("%{}%", query);
        let rows = sqlx::query(&format!(
            "{} WHERE status = 'active' AND (name LIKE ?1 OR description LIKE ?1 \
             OR category LIKE ?1) ORDER BY name",
            SELECT_TOOLS
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(&rows).await
    }

    async fn search_fts(&self, query: &str) -> Result<Vec<SqliteRow>, sqlx::Error> {
        let phrase = format!("\"{}\"", query.replace('"', "\"\""));
        sqlx::query(
            r#"
            SELECT t.id, t.name, t.description, t.category, t.radar_position,
                   t.cx_relevance_score, t.integration_score, t.overall_score, t.cost_rating,
                   t.pricing_model, t.key_features, t.use_cases, t.integrations, t.source_url,
                   t.reasoning, t.status, t.created_at, t.updated_at, t.plot_angle_offset,
                   t.plot_radius_offset
            FROM tools_fts
            JOIN tools t ON t.id = tools_fts.rowid
            WHERE tools_fts MATCH ? AND t.status = 'active'
            ORDER BY bm25(tools_fts)
            "#,
        )
        .bind(phrase)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<ToolRecord>> {
        let row = sqlx::query(&format!(
            "{} WHERE status = 'active' AND name = ?",
            SELECT_TOOLS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate(std::slice::from_ref(&row)).await?.pop()),
            None => Ok(None),
        }
    }

    /// Most recently added active tools.
    pub async fn recent(&self, limit: i64) -> Result<Vec<ToolRecord>> {
        let rows = sqlx::query(&format!(
            "{} WHERE status = 'active' ORDER BY created_at DESC, id DESC LIMIT ?",
            SELECT_TOOLS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(&rows).await
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tools WHERE status = 'active'")
            .fetch_one(&self.pool)
            .await?;

        let by_position: BTreeMap<String, i64> = sqlx::query(
            "SELECT radar_position AS k, COUNT(*) AS n FROM tools WHERE status = 'active' GROUP BY radar_position",
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|r| (r.get::<String, _>("k"), r.get::<i64, _>("n")))
        .collect();

        let by_category: BTreeMap<String, i64> = sqlx::query(
            "SELECT category AS k, COUNT(*) AS n FROM tools WHERE status = 'active' GROUP BY category",
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|r| (r.get::<String, _>("k"), r.get::<i64, _>("n")))
        .collect();

        Ok(StoreStats {
            total,
            by_position,
            by_category,
        })
    }

    /// Map rows to records, backfilling missing layout offsets.
    async fn hydrate(&self, rows: &[SqliteRow]) -> Result<Vec<ToolRecord>> {
        let mut records = Vec::with_capacity(rows.len());

        for row in rows {
            let (mut record, has_offsets) = record_from_row(row)?;
            if !has_offsets {
                let j = jitter(&record.name);
                record.plot_angle_offset = j.angle_offset;
                record.plot_radius_offset = j.radius_offset;

                let write = sqlx::query(
                    "UPDATE tools SET plot_angle_offset = ?, plot_radius_offset = ? WHERE id = ?",
                )
                .bind(j.angle_offset)
                .bind(j.radius_offset)
                .bind(record.id)
                .execute(&self.pool)
                .await;

                match write {
                    Ok(_) => tracing::debug!(id = record.id, name = %record.name, "backfilled layout offsets"),
                    Err(e) => tracing::warn!(id = record.id, error = %e, "failed to backfill layout offsets"),
                }
            }
            records.push(record);
        }

        Ok(records)
    }
}

/// Returns the record and whether both offset columns were present.
fn record_from_row(row: &SqliteRow) -> Result<(ToolRecord, bool)> {
    let angle: Option<i64> = row.try_get("plot_angle_offset")?;
    let radius: Option<f64> = row.try_get("plot_radius_offset")?;
    let position: String = row.try_get("radar_position")?;
    let cost: String = row.try_get("cost_rating")?;
    let status: String = row.try_get("status")?;

    let record = ToolRecord {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
        radar_position: RadarPosition::parse(&position).unwrap_or(RadarPosition::Assess),
        cx_relevance_score: row.try_get("cx_relevance_score")?,
        integration_score: row.try_get("integration_score")?,
        overall_score: row.try_get("overall_score")?,
        cost_rating: CostRating::parse(&cost).unwrap_or(CostRating::Medium),
        pricing_model: row.try_get("pricing_model")?,
        key_features: json_list(row.try_get("key_features")?),
        use_cases: json_list(row.try_get("use_cases")?),
        integrations: json_list(row.try_get("integrations")?),
        source_url: row.try_get("source_url")?,
        reasoning: row.try_get("reasoning")?,
        status: ToolStatus::from_db(&status),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        plot_angle_offset: angle.unwrap_or_default(),
        plot_radius_offset: radius.unwrap_or_default(),
    };

    Ok((record, angle.is_some() && radius.is_some()))
}

fn json_list(raw: String) -> Vec<String> {
    serde_json::from_str(&raw).unwrap_or_default()
}
