//! Structured tool analysis.
//!
//! [`Analyzer`] builds a prompt from the configuration and user-supplied
//! text, calls the model through a [`CompletionClient`] with the retry
//! policy, and validates the reply with [`crate::validate::parse_reply`].
//!
//! The analyzer holds no state besides its client and the immutable
//! configuration it was constructed with.

use std::sync::Arc;

use crate::config::Config;
use crate::error::AnalysisResult;
use crate::llm::{complete_with_retry, CompletionClient, CompletionRequest};
use crate::models::{CostRating, RadarPosition, ToolAnalysis, ToolRecord};
use crate::validate::parse_reply;

pub struct Analyzer {
    client: Box<dyn CompletionClient>,
    config: Arc<Config>,
}

impl Analyzer {
    pub fn new(client: Box<dyn CompletionClient>, config: Arc<Config>) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Analyze free text describing a tool.
    pub async fn analyze(&self, content: &str, source_url: &str) -> AnalysisResult<ToolAnalysis> {
        let prompt = build_analysis_prompt(&self.config, content, source_url);
        let request = CompletionRequest::from_config(prompt, &self.config.llm);

        let reply = complete_with_retry(self.client.as_ref(), &request, &self.config.llm).await?;
        let analysis = parse_reply(&reply, &self.config)?;

        tracing::info!(
            name = %analysis.name,
            category = %analysis.category,
            position = %analysis.radar_position,
            overall = analysis.overall_score,
            "analysis complete"
        );
        Ok(analysis)
    }

    /// Ask the model for a markdown comparison of stored tools.
    pub async fn compare(&self, tools: &[ToolRecord]) -> AnalysisResult<String> {
        let prompt = build_comparison_prompt(tools);
        let request = CompletionRequest::from_config(prompt, &self.config.llm);
        complete_with_retry(self.client.as_ref(), &request, &self.config.llm).await
    }
}

fn position_definition(position: RadarPosition) -> &'static str {
    match position {
        RadarPosition::Adopt => "Mature, proven, strong ROI, recommended for immediate use",
        RadarPosition::Trial => "Promising, worth testing, emerging leaders, good for pilot",
        RadarPosition::Assess => "Interesting, monitor developments, not ready yet, emerging",
        RadarPosition::Hold => "Declining, better alternatives exist, poor fit, or immature",
    }
}

fn cost_definition(rating: CostRating) -> &'static str {
    match rating {
        CostRating::Low => "<$50/user/month or free tier suitable",
        CostRating::Medium => "$50-150/user/month",
        CostRating::High => "$150-500/user/month",
        CostRating::Enterprise => ">$500/user/month or enterprise only",
    }
}

/// Build the single-message analysis prompt.
pub fn build_analysis_prompt(config: &Config, content: &str, source_url: &str) -> String {
    let positions = config
        .ring_order()
        .into_iter()
        .map(|p| format!("- {}: {}", p.as_str(), position_definition(p)))
        .collect::<Vec<_>>()
        .join("\n");

    let costs = CostRating::ALL
        .iter()
        .map(|c| match config.cost_band_label(*c) {
            Some(label) => format!("- {} ({}): {}", c.symbol(), label, cost_definition(*c)),
            None => format!("- {}: {}", c.symbol(), cost_definition(*c)),
        })
        .collect::<Vec<_>>()
        .join("\n");

    let cx_pct = (config.scoring.cx_weight * 100.0).round();
    let int_pct = (config.scoring.integration_weight * 100.0).round();

    format!(
        r#"You are a CX technology analyst for a Customer Experience team.

Your focus is on tools that help the team:
- Provide excellent customer support
- Understand customer needs and satisfaction
- Streamline support workflows
- Work efficiently and scale customer operations

Analyze tools based on their value specifically for customer experience teams.

CATEGORIES: {categories}

SCORING CRITERIA (1-10):
- CX Relevance: Direct impact on customer satisfaction, support efficiency, insights
- Integration: API availability, common integrations, technical accessibility

RADAR POSITIONS:
{positions}

COST RATINGS:
{costs}

overall_score is a weighted average ({cx_pct}% CX relevance, {int_pct}% integration).

Return ONLY valid JSON matching this exact structure (no markdown, no explanation):
{{
    "name": "string",
    "description": "string",
    "category": "string (from categories list)",
    "cx_relevance_score": 1-10,
    "integration_score": 1-10,
    "overall_score": float,
    "key_features": ["string"],
    "use_cases": ["string"],
    "integrations": ["string"],
    "radar_position": "Adopt|Trial|Assess|Hold",
    "cost_rating": "$|$$|$$$|$$$$",
    "pricing_model": "string",
    "reasoning": "string"
}}

Analyze this tool/technology:

{content}

Source: {source_url}"#,
        categories = config.categories.join(", "),
        positions = positions,
        costs = costs,
        cx_pct = cx_pct,
        int_pct = int_pct,
        content = content.trim(),
        source_url = source_url.trim(),
    )
}

/// Build the comparison prompt for two or more stored tools.
pub fn build_comparison_prompt(tools: &[ToolRecord]) -> String {
    let tools_info = tools
        .iter()
        .map(|t| {
            format!(
                "**{}**\nCategory: {}\nDescription: {}\nRadar Position: {}\nScores: CX={}, Integration={}",
                t.name,
                t.category,
                t.description,
                t.radar_position,
                t.cx_relevance_score,
                t.integration_score
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    format!(
        r#"You are a CX technology analyst. Provide an objective comparison.

Compare these tools for a CX team. Focus on:
- Best use cases for each
- Key differentiators
- Recommendations based on team size/needs

Tools to compare:
{}

Provide a clear, structured comparison in markdown."#,
        tools_info
    )
}
