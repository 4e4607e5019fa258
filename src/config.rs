//! TOML configuration.
//!
//! The configuration is loaded once by the binary and passed by reference to
//! every component that needs it. A missing file is not an error: the
//! built-in defaults describe a complete, usable radar.
//!
//! Scoring weights are renormalized on load so they always sum to `1.0`,
//! which lets authors write plain ratios (`cx_weight = 3`,
//! `integration_weight = 2`).

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::models::{CostRating, RadarPosition};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    #[serde(default = "default_positions")]
    pub positions: Vec<String>,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default = "default_cost_bands")]
    pub cost_bands: BTreeMap<String, String>,
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ScoringConfig {
    #[serde(default = "default_cx_weight")]
    pub cx_weight: f64,
    #[serde(default = "default_integration_weight")]
    pub integration_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            cx_weight: default_cx_weight(),
            integration_weight: default_integration_weight(),
        }
    }
}

fn default_cx_weight() -> f64 {
    0.6
}
fn default_integration_weight() -> f64 {
    0.4
}

impl ScoringConfig {
    /// Divide each weight by their sum so the pair sums to exactly 1.0.
    pub fn normalized(self) -> Result<Self> {
        if self.cx_weight < 0.0 || self.integration_weight < 0.0 {
            bail!("scoring weights must be >= 0");
        }
        let total = self.cx_weight + self.integration_weight;
        if !(total > 0.0) {
            bail!("scoring weights must sum to a positive value");
        }
        Ok(Self {
            cx_weight: self.cx_weight / total,
            integration_weight: self.integration_weight / total,
        })
    }
}

/// Weighted overall score for a relevance/integration pair.
pub fn weighted_score(relevance: f64, integration: f64, weights: &ScoringConfig) -> f64 {
    relevance * weights.cx_weight + integration * weights.integration_weight
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/radar.db")
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Total number of attempts, including the first.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_retries: default_max_retries(),
            retry_base_ms: default_retry_base_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "claude-3-haiku-20240307".to_string()
}
fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_temperature() -> f64 {
    0.3
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_base_ms() -> u64 {
    1000
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8501".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_categories() -> Vec<String> {
    [
        "CRM",
        "Helpdesk/Support",
        "Analytics",
        "Knowledge Base",
        "Chat/Messaging",
        "Feedback/Survey",
        "Workforce Management",
        "AI/Automation",
        "Integration Platform",
        "Voice/Phone",
        "Other",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_positions() -> Vec<String> {
    RadarPosition::ALL
        .iter()
        .map(|p| p.as_str().to_string())
        .collect()
}

fn default_cost_bands() -> BTreeMap<String, String> {
    [
        ("low", "$"),
        ("medium", "$$"),
        ("high", "$$$"),
        ("enterprise", "$$$$"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            positions: default_positions(),
            scoring: ScoringConfig::default(),
            cost_bands: default_cost_bands(),
            db: DbConfig::default(),
            llm: LlmConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Radar positions in ring order, center first.
    pub fn ring_order(&self) -> Vec<RadarPosition> {
        self.positions
            .iter()
            .filter_map(|p| RadarPosition::parse(p))
            .collect()
    }

    /// The configured label for a tier, e.g. `"medium"` for `$$`.
    pub fn cost_band_label(&self, rating: CostRating) -> Option<&str> {
        self.cost_bands
            .iter()
            .find(|(_, symbol)| symbol.as_str() == rating.symbol())
            .map(|(label, _)| label.as_str())
    }
}

/// Load configuration from `path`, falling back to [`Config::default`] when
/// the file does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

/// Parse and validate a configuration document.
pub fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse config file")?;

    config.scoring = config.scoring.normalized()?;

    if config.categories.is_empty() {
        bail!("categories must not be empty");
    }

    // Positions: exactly the four radar labels, in any order
    if config.positions.len() != RadarPosition::ALL.len() {
        bail!(
            "positions must list exactly {} labels, got {}",
            RadarPosition::ALL.len(),
            config.positions.len()
        );
    }
    let ring = config.ring_order();
    for expected in RadarPosition::ALL {
        if !ring.contains(&expected) {
            bail!("positions must include '{}'", expected.as_str());
        }
    }

    for (band, symbol) in &config.cost_bands {
        if CostRating::parse(symbol).is_none() {
            bail!(
                "cost_bands.{} = '{}' is not one of $, $$, $$$, $$$$",
                band,
                symbol
            );
        }
    }

    if config.llm.max_retries == 0 {
        bail!("llm.max_retries must be >= 1");
    }
    if !(0.0..=1.0).contains(&config.llm.temperature) {
        bail!("llm.temperature must be in [0.0, 1.0]");
    }

    match config.logging.format.as_str() {
        "pretty" | "json" => {}
        other => bail!(
            "Unknown logging format: '{}'. Must be pretty or json.",
            other
        ),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("nonexistent.toml")).unwrap();

        assert_eq!(config.scoring.cx_weight, 0.6);
        assert_eq!(config.scoring.integration_weight, 0.4);
        assert_eq!(config.categories.len(), 11);
        assert_eq!(config.cost_bands.len(), 4);
        assert_eq!(config.positions, vec!["Adopt", "Trial", "Assess", "Hold"]);
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("radar.toml");
        std::fs::write(
            &path,
            r#"
categories = ["CRM", "Analytics"]

[scoring]
cx_weight = 0.7
integration_weight = 0.3

[db]
path = "/tmp/elsewhere.db"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert!((config.scoring.cx_weight - 0.7).abs() < 1e-9);
        assert!((config.scoring.integration_weight - 0.3).abs() < 1e-9);
        assert_eq!(config.categories, vec!["CRM", "Analytics"]);
        assert_eq!(config.db.path, PathBuf::from("/tmp/elsewhere.db"));
        // untouched sections keep their defaults
        assert_eq!(config.llm.max_retries, 3);
        assert_eq!(config.positions.len(), 4);
    }

    #[test]
    fn test_weights_are_normalized() {
        let config = parse_config(
            r#"
[scoring]
cx_weight = 0.8
integration_weight = 0.4
"#,
        )
        .unwrap();

        let total = config.scoring.cx_weight + config.scoring.integration_weight;
        assert!((total - 1.0).abs() < 1e-9);
        assert!((config.scoring.cx_weight - 0.6667).abs() < 1e-4);
        assert!((config.scoring.integration_weight - 0.3333).abs() < 1e-4);
    }

    #[test]
    fn test_partial_scoring_table_uses_default_for_missing_weight() {
        let config = parse_config("[scoring]\ncx_weight = 0.6\n").unwrap();
        assert!((config.scoring.cx_weight - 0.6).abs() < 1e-9);
        assert!((config.scoring.integration_weight - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_zero_weights_rejected() {
        let err = parse_config("[scoring]\ncx_weight = 0.0\nintegration_weight = 0.0\n").unwrap_err();
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn test_positions_must_be_the_four_labels() {
        assert!(parse_config(r#"positions = ["Adopt", "Trial"]"#).is_err());
        assert!(parse_config(r#"positions = ["Adopt", "Trial", "Assess", "Later"]"#).is_err());

        let config = parse_config(r#"positions = ["Hold", "Assess", "Trial", "Adopt"]"#).unwrap();
        assert_eq!(config.ring_order()[0], RadarPosition::Hold);
    }

    #[test]
    fn test_invalid_cost_band_rejected() {
        let err = parse_config("[cost_bands]\nlow = \"cheap\"\n").unwrap_err();
        assert!(err.to_string().contains("cost_bands.low"));
    }

    #[test]
    fn test_weighted_score_default_weights() {
        let weights = ScoringConfig::default();
        assert!((weighted_score(8.0, 6.0, &weights) - 7.2).abs() < 1e-9);
        assert!((weighted_score(1.0, 1.0, &weights) - 1.0).abs() < 1e-9);
        assert!((weighted_score(10.0, 10.0, &weights) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_score_single_weight() {
        let weights = ScoringConfig {
            cx_weight: 1.0,
            integration_weight: 0.0,
        };
        assert_eq!(weighted_score(8.0, 5.0, &weights), 8.0);
    }

    #[test]
    fn test_cost_band_label() {
        let config = Config::default();
        assert_eq!(config.cost_band_label(CostRating::Medium), Some("medium"));
        assert_eq!(config.cost_band_label(CostRating::Enterprise), Some("enterprise"));
    }
}
