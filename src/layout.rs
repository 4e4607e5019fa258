//! Radar chart layout.
//!
//! Maps a [`ToolRecord`] to a point on the radar: the ring comes from the
//! tool's adoption position, the angle from its category plus a small
//! per-tool offset so that tools in the same sector do not overlap.
//!
//! The per-tool offset ([`jitter`]) is derived from a SHA-256 hash of the
//! tool name. It is computed once, stored with the record, and read back
//! from the store afterwards; the layout never recomputes it.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::models::{RadarPosition, ToolRecord};

/// Stable layout offsets for one tool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Jitter {
    /// Degrees, in `[-20, 20]`.
    pub angle_offset: i64,
    /// Ring-relative, in `[0.00, 0.29]`.
    pub radius_offset: f64,
}

/// Compute layout offsets from a tool name.
///
/// The SHA-256 digest is read as a big-endian 256-bit integer `h`:
///
/// ```text
/// angle_offset  = (h mod 41) - 20
/// radius_offset = (h mod 30) / 100
/// ```
///
/// ```rust
/// use tech_radar::layout::jitter;
///
/// let j = jitter("Zendesk");
/// assert_eq!(j, jitter("Zendesk"));
/// assert!((-20..=20).contains(&j.angle_offset));
/// ```
pub fn jitter(name: &str) -> Jitter {
    let digest = Sha256::digest(name.as_bytes());
    let angle_offset = digest_mod(&digest, 41) as i64 - 20;
    let radius_offset = digest_mod(&digest, 30) as f64 / 100.0;
    Jitter {
        angle_offset,
        radius_offset,
    }
}

/// `digest mod m`, treating `digest` as a big-endian unsigned integer.
fn digest_mod(digest: &[u8], m: u64) -> u64 {
    digest
        .iter()
        .fold(0u64, |acc, &byte| (acc * 256 + byte as u64) % m)
}

/// A plotted tool.
#[derive(Debug, Clone, Serialize)]
pub struct RadarPoint {
    pub name: String,
    pub category: String,
    pub position: RadarPosition,
    pub cx_relevance_score: i64,
    pub ring: usize,
    pub angle_deg: f64,
    pub radius: f64,
    pub x: f64,
    pub y: f64,
    pub color: &'static str,
}

/// Ring colour for a position.
pub fn position_color(position: RadarPosition) -> &'static str {
    match position {
        RadarPosition::Adopt => "#34D399",
        RadarPosition::Trial => "#60A5FA",
        RadarPosition::Assess => "#FBBF24",
        RadarPosition::Hold => "#F87171",
    }
}

/// Ring and sector geometry derived from configuration.
pub struct RadarLayout {
    rings: Vec<RadarPosition>,
    categories: Vec<String>,
}

impl RadarLayout {
    pub fn new(config: &Config) -> Self {
        Self {
            rings: config.ring_order(),
            categories: config.categories.clone(),
        }
    }

    /// Number of rings; the outermost ring's outer edge sits at this radius.
    pub fn ring_count(&self) -> usize {
        self.rings.len()
    }

    pub fn ring_of(&self, position: RadarPosition) -> usize {
        self.rings.iter().position(|p| *p == position).unwrap_or(0)
    }

    /// Sector start angle for a category. Unknown categories sit at 0°.
    pub fn base_angle(&self, category: &str) -> f64 {
        if self.categories.is_empty() {
            return 0.0;
        }
        let step = 360.0 / self.categories.len() as f64;
        self.categories
            .iter()
            .position(|c| c == category)
            .map(|i| i as f64 * step)
            .unwrap_or(0.0)
    }

    pub fn plot(&self, tool: &ToolRecord) -> RadarPoint {
        let ring = self.ring_of(tool.radar_position);
        let jitter = tool.jitter();

        let angle_deg = self.base_angle(&tool.category) + jitter.angle_offset as f64;
        let radius = ring as f64 + 0.5 + jitter.radius_offset;
        let rad = angle_deg.to_radians();

        RadarPoint {
            name: tool.name.clone(),
            category: tool.category.clone(),
            position: tool.radar_position,
            cx_relevance_score: tool.cx_relevance_score,
            ring,
            angle_deg,
            radius,
            x: radius * rad.cos(),
            y: radius * rad.sin(),
            color: position_color(tool.radar_position),
        }
    }

    pub fn plot_all(&self, tools: &[ToolRecord]) -> Vec<RadarPoint> {
        tools.iter().map(|t| self.plot(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CostRating, ToolStatus};

    fn record(name: &str, category: &str, position: RadarPosition, j: Jitter) -> ToolRecord {
        ToolRecord {
            id: 1,
            name: name.to_string(),
            description: String::new(),
            category: category.to_string(),
            radar_position: position,
            cx_relevance_score: 5,
            integration_score: 5,
            overall_score: 5.0,
            cost_rating: CostRating::Medium,
            pricing_model: String::new(),
            key_features: vec![],
            use_cases: vec![],
            integrations: vec![],
            source_url: String::new(),
            reasoning: String::new(),
            status: ToolStatus::Active,
            created_at: 0,
            updated_at: 0,
            plot_angle_offset: j.angle_offset,
            plot_radius_offset: j.radius_offset,
        }
    }

    #[test]
    fn test_jitter_deterministic() {
        let a = jitter("Deterministic Test Tool");
        let b = jitter("Deterministic Test Tool");
        assert_eq!(a, b);
    }

    #[test]
    fn test_jitter_ranges() {
        for i in 0..500 {
            let j = jitter(&format!("tool-{}", i));
            assert!((-20..=20).contains(&j.angle_offset), "angle {}", j.angle_offset);
            assert!(
                (0.0..=0.29).contains(&j.radius_offset),
                "radius {}",
                j.radius_offset
            );
            // two-decimal granularity
            let cents = j.radius_offset * 100.0;
            assert!((cents - cents.round()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_jitter_spreads_names() {
        let distinct: std::collections::HashSet<i64> = (0..200)
            .map(|i| jitter(&format!("name {}", i)).angle_offset)
            .collect();
        assert!(distinct.len() > 20, "offsets should vary across names");
    }

    #[test]
    fn test_digest_mod_matches_small_integers() {
        // 0x01_00 = 256
        assert_eq!(digest_mod(&[0x01, 0x00], 41), 256 % 41);
        assert_eq!(digest_mod(&[0xff, 0xff, 0xff], 30), 0xff_ffff % 30);
    }

    #[test]
    fn test_plot_uses_ring_and_stored_offsets() {
        let config = Config::default();
        let layout = RadarLayout::new(&config);
        let j = Jitter {
            angle_offset: 0,
            radius_offset: 0.1,
        };

        // CRM is the first category → base angle 0°
        let p = layout.plot(&record("A", "CRM", RadarPosition::Adopt, j));
        assert_eq!(p.ring, 0);
        assert!((p.radius - 0.6).abs() < 1e-9);
        assert!((p.x - 0.6).abs() < 1e-9);
        assert!(p.y.abs() < 1e-9);
        assert_eq!(p.color, "#34D399");

        let p = layout.plot(&record("B", "CRM", RadarPosition::Hold, j));
        assert_eq!(p.ring, 3);
        assert!((p.radius - 3.6).abs() < 1e-9);
    }

    #[test]
    fn test_plot_category_sectors() {
        let config = Config::default();
        let layout = RadarLayout::new(&config);
        let step = 360.0 / config.categories.len() as f64;

        assert_eq!(layout.base_angle("CRM"), 0.0);
        assert!((layout.base_angle("Analytics") - 2.0 * step).abs() < 1e-9);
        assert_eq!(layout.base_angle("Unknown"), 0.0);

        let j = Jitter {
            angle_offset: -10,
            radius_offset: 0.0,
        };
        let p = layout.plot(&record("C", "Analytics", RadarPosition::Trial, j));
        assert!((p.angle_deg - (2.0 * step - 10.0)).abs() < 1e-9);
    }
}
