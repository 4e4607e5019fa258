//! Reply parsing and validation.
//!
//! Turns the raw text of a model reply into a [`ToolAnalysis`]. This module
//! has no knowledge of the model client: it is a pure function of the reply
//! text and the configuration, so it can be exercised without a network.
//!
//! # Normalization rules
//!
//! | Field | Rule |
//! |-------|------|
//! | `cx_relevance_score`, `integration_score` | coerce to integer, clamp to `[1, 10]` |
//! | `radar_position` | exact, then case-insensitive, else `Assess` |
//! | `cost_rating` | exact symbol, else `$$` |
//! | `category` | case-insensitive match to the configured spelling |
//! | `overall_score` | discarded; recomputed from the configured weights |
//!
//! Missing or mistyped required fields are [`AnalysisError::Validation`].

use serde_json::{Map, Value};

use crate::config::{weighted_score, Config};
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{CostRating, RadarPosition, ToolAnalysis};

/// Maximum number of reply characters carried in a parse error.
const SNIPPET_CHARS: usize = 500;

pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 10;

/// Strip markdown code fences and isolate the outermost `{ ... }` span.
///
/// Models sometimes wrap JSON in prose or fences; everything before the
/// first `{` and after the last `}` is dropped. If no such span exists the
/// trimmed text is returned unchanged and parsing will report it.
pub fn extract_json(text: &str) -> String {
    let text = text.replace("```json", "").replace("```", "");

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => text[start..=end].to_string(),
        _ => text.trim().to_string(),
    }
}

/// Parse and validate a raw model reply.
pub fn parse_reply(reply: &str, config: &Config) -> AnalysisResult<ToolAnalysis> {
    let json_text = extract_json(reply);
    let value: Value = serde_json::from_str(&json_text).map_err(|e| {
        tracing::error!(error = %e, reply = %snippet(reply), "JSON parsing error");
        AnalysisError::Parse {
            message: e.to_string(),
            snippet: snippet(reply),
        }
    })?;

    validate_analysis(&value, config)
}

/// Validate an already-parsed reply object.
pub fn validate_analysis(value: &Value, config: &Config) -> AnalysisResult<ToolAnalysis> {
    let obj = value
        .as_object()
        .ok_or_else(|| AnalysisError::Validation("reply is not a JSON object".to_string()))?;

    let name = required_str(obj, "name")?.trim().to_string();
    if name.is_empty() {
        return Err(AnalysisError::Validation(
            "name must not be empty".to_string(),
        ));
    }

    let cx_relevance_score = clamp_score(required_int(obj, "cx_relevance_score")?);
    let integration_score = clamp_score(required_int(obj, "integration_score")?);

    // Any model-provided overall_score is ignored.
    let overall_score = weighted_score(
        cx_relevance_score as f64,
        integration_score as f64,
        &config.scoring,
    );

    Ok(ToolAnalysis {
        name,
        description: required_str(obj, "description")?.to_string(),
        category: normalize_category(required_str(obj, "category")?, &config.categories),
        cx_relevance_score,
        integration_score,
        overall_score,
        key_features: required_str_list(obj, "key_features")?,
        use_cases: required_str_list(obj, "use_cases")?,
        integrations: required_str_list(obj, "integrations")?,
        radar_position: RadarPosition::normalize(required_str(obj, "radar_position")?),
        cost_rating: CostRating::normalize(required_str(obj, "cost_rating")?),
        pricing_model: required_str(obj, "pricing_model")?.to_string(),
        reasoning: required_str(obj, "reasoning")?.to_string(),
    })
}

pub fn clamp_score(v: i64) -> i64 {
    v.clamp(MIN_SCORE, MAX_SCORE)
}

/// Map a category onto its configured spelling.
///
/// Unknown categories fall into `Other` when the configuration has one;
/// otherwise the model's label is kept.
pub fn normalize_category(raw: &str, categories: &[String]) -> String {
    let raw = raw.trim();
    if let Some(c) = categories.iter().find(|c| c.as_str() == raw) {
        return c.clone();
    }
    if let Some(c) = categories.iter().find(|c| c.eq_ignore_ascii_case(raw)) {
        return c.clone();
    }
    match categories.iter().find(|c| c.as_str() == "Other") {
        Some(other) => {
            tracing::warn!(value = %raw, "unknown category, defaulting to 'Other'");
            other.clone()
        }
        None => raw.to_string(),
    }
}

fn field<'a>(obj: &'a Map<String, Value>, key: &str) -> AnalysisResult<&'a Value> {
    match obj.get(key) {
        Some(Value::Null) | None => Err(AnalysisError::Validation(format!(
            "missing required field: {}",
            key
        ))),
        Some(v) => Ok(v),
    }
}

fn required_str<'a>(obj: &'a Map<String, Value>, key: &str) -> AnalysisResult<&'a str> {
    field(obj, key)?
        .as_str()
        .ok_or_else(|| AnalysisError::Validation(format!("field {} must be a string", key)))
}

/// Integers pass through; floats truncate toward zero; numeric strings parse.
fn required_int(obj: &Map<String, Value>, key: &str) -> AnalysisResult<i64> {
    let v = field(obj, key)?;
    let invalid = || AnalysisError::Validation(format!("field {} must be an integer", key));

    match v {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if let Some(f) = n.as_f64() {
                Ok(f.trunc() as i64)
            } else {
                Err(invalid())
            }
        }
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
                .ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

fn required_str_list(obj: &Map<String, Value>, key: &str) -> AnalysisResult<Vec<String>> {
    let arr = field(obj, key)?.as_array().ok_or_else(|| {
        AnalysisError::Validation(format!("field {} must be a list of strings", key))
    })?;

    arr.iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                AnalysisError::Validation(format!("field {} must be a list of strings", key))
            })
        })
        .collect()
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect()
}
