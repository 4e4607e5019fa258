//! Core data models used throughout the radar.
//!
//! [`ToolAnalysis`] is the validated output of a model call; [`ToolRecord`]
//! is what the store holds. The two fixed enumerations ([`RadarPosition`]
//! and [`CostRating`]) carry their own normalization rules.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::layout::Jitter;

/// Adoption ring on the radar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RadarPosition {
    Adopt,
    Trial,
    Assess,
    Hold,
}

impl RadarPosition {
    pub const ALL: [RadarPosition; 4] = [
        RadarPosition::Adopt,
        RadarPosition::Trial,
        RadarPosition::Assess,
        RadarPosition::Hold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RadarPosition::Adopt => "Adopt",
            RadarPosition::Trial => "Trial",
            RadarPosition::Assess => "Assess",
            RadarPosition::Hold => "Hold",
        }
    }

    /// Exact, then case-insensitive match. Surrounding whitespace is ignored.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .iter()
            .find(|p| p.as_str() == s)
            .or_else(|| Self::ALL.iter().find(|p| p.as_str().eq_ignore_ascii_case(s)))
            .copied()
    }

    /// Like [`RadarPosition::parse`], defaulting to `Assess` with a warning.
    pub fn normalize(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| {
            tracing::warn!(value = %s, "invalid radar_position, defaulting to 'Assess'");
            RadarPosition::Assess
        })
    }
}

impl std::fmt::Display for RadarPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cost tier, rendered as one to four dollar signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CostRating {
    Low,
    Medium,
    High,
    Enterprise,
}

impl CostRating {
    pub const ALL: [CostRating; 4] = [
        CostRating::Low,
        CostRating::Medium,
        CostRating::High,
        CostRating::Enterprise,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            CostRating::Low => "$",
            CostRating::Medium => "$$",
            CostRating::High => "$$$",
            CostRating::Enterprise => "$$$$",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.iter().find(|c| c.symbol() == s).copied()
    }

    /// Exact symbol match, defaulting to `$$` with a warning.
    pub fn normalize(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| {
            tracing::warn!(value = %s, "invalid cost_rating, defaulting to '$$'");
            CostRating::Medium
        })
    }
}

impl std::fmt::Display for CostRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Serialize for CostRating {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

impl<'de> Deserialize<'de> for CostRating {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        CostRating::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid cost rating: {}", s)))
    }
}

/// Visibility flag. Only active rows are returned by queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Active,
    Inactive,
}

impl ToolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolStatus::Active => "active",
            ToolStatus::Inactive => "inactive",
        }
    }

    pub fn from_db(s: &str) -> Self {
        if s.eq_ignore_ascii_case("inactive") {
            ToolStatus::Inactive
        } else {
            ToolStatus::Active
        }
    }
}

/// Validated, normalized result of analyzing one tool description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolAnalysis {
    pub name: String,
    pub description: String,
    pub category: String,
    pub cx_relevance_score: i64,
    pub integration_score: i64,
    pub overall_score: f64,
    pub key_features: Vec<String>,
    pub use_cases: Vec<String>,
    pub integrations: Vec<String>,
    pub radar_position: RadarPosition,
    pub cost_rating: CostRating,
    pub pricing_model: String,
    pub reasoning: String,
}

/// A tool ready to be inserted into the store.
#[derive(Debug, Clone)]
pub struct NewTool {
    pub analysis: ToolAnalysis,
    pub source_url: String,
    /// Pre-computed layout offsets. Computed from the name when `None`.
    pub jitter: Option<Jitter>,
}

impl NewTool {
    pub fn new(analysis: ToolAnalysis, source_url: impl Into<String>) -> Self {
        Self {
            analysis,
            source_url: source_url.into(),
            jitter: None,
        }
    }
}

/// A persisted tool row.
#[derive(Debug, Clone, Serialize)]
pub struct ToolRecord {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub category: String,
    pub radar_position: RadarPosition,
    pub cx_relevance_score: i64,
    pub integration_score: i64,
    pub overall_score: f64,
    pub cost_rating: CostRating,
    pub pricing_model: String,
    pub key_features: Vec<String>,
    pub use_cases: Vec<String>,
    pub integrations: Vec<String>,
    pub source_url: String,
    pub reasoning: String,
    pub status: ToolStatus,
    pub created_at: i64,
    pub updated_at: i64,
    pub plot_angle_offset: i64,
    pub plot_radius_offset: f64,
}

impl ToolRecord {
    pub fn jitter(&self) -> Jitter {
        Jitter {
            angle_offset: self.plot_angle_offset,
            radius_offset: self.plot_radius_offset,
        }
    }
}

/// Query filters for listing tools. All bounds are inclusive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolFilters {
    pub category: Option<String>,
    #[serde(default, deserialize_with = "deserialize_position")]
    pub position: Option<RadarPosition>,
    pub min_cx_score: Option<i64>,
    pub max_cx_score: Option<i64>,
    pub min_integration_score: Option<i64>,
    pub max_integration_score: Option<i64>,
}

/// Query strings spell positions in any case; an empty value means no filter.
fn deserialize_position<'de, D>(deserializer: D) -> Result<Option<RadarPosition>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => RadarPosition::parse(s).map(Some).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid position '{}': use Adopt, Trial, Assess or Hold",
                s
            ))
        }),
    }
}

/// Result of [`crate::store::ToolStore::add_tool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added(i64),
    /// A tool with the same name already exists. Nothing was written.
    Duplicate,
}

/// Grouped counts over active tools.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    pub total: i64,
    pub by_position: BTreeMap<String, i64>,
    pub by_category: BTreeMap<String, i64>,
}
