//! Tunables for layout, enrichment, and the external API.
//!
//! Loaded from a JSON file when the host provides one, otherwise defaults.
//! Every field has a serde default so partial config files stay valid across
//! versions.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Sphere radius for the initial seed layout.
    #[serde(default = "default_seed_radius")]
    pub seed_radius: f32,
    /// Sphere radius for papers added by enrichment.
    #[serde(default = "default_spawn_radius")]
    pub spawn_radius: f32,
    /// Cap on new papers merged per enrichment operation.
    #[serde(default = "default_max_new_papers")]
    pub max_new_papers: usize,
    /// How long newly added nodes stay highlighted.
    #[serde(default = "default_highlight_ms")]
    pub highlight_ms: u64,
    /// Duration of the cluster reassignment animation.
    #[serde(default = "default_animation_ms")]
    pub animation_ms: u64,
    /// Radius of the sphere the cluster centers sit on.
    #[serde(default = "default_major_cluster_radius")]
    pub major_cluster_radius: f32,
    /// Radius of each cluster's own member sphere.
    #[serde(default = "default_minor_cluster_radius")]
    pub minor_cluster_radius: f32,
    /// Distance under which two simultaneously dragged nodes auto-connect.
    #[serde(default = "default_proximity_threshold")]
    pub proximity_threshold: f32,
    /// Solver heat after a structural change.
    #[serde(default = "default_insert_alpha")]
    pub insert_alpha: f32,
    /// Solver heat while a node is being dragged.
    #[serde(default = "default_drag_alpha")]
    pub drag_alpha: f32,
    /// Result cap for recommendation fetches.
    #[serde(default = "default_recommendation_limit")]
    pub recommendation_limit: usize,
    /// Result cap for citation/reference/author fetches.
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
    /// Retry attempts before an API call is surfaced as failed.
    #[serde(default = "default_api_max_attempts")]
    pub api_max_attempts: u32,
    /// Fixed backoff between retry attempts.
    #[serde(default = "default_api_retry_delay_ms")]
    pub api_retry_delay_ms: u64,
}

fn default_seed_radius() -> f32 {
    0.1
}

fn default_spawn_radius() -> f32 {
    0.2
}

fn default_max_new_papers() -> usize {
    5
}

fn default_highlight_ms() -> u64 {
    3000
}

fn default_animation_ms() -> u64 {
    1000
}

fn default_major_cluster_radius() -> f32 {
    0.25
}

fn default_minor_cluster_radius() -> f32 {
    0.08
}

fn default_proximity_threshold() -> f32 {
    0.05
}

fn default_insert_alpha() -> f32 {
    0.2
}

fn default_drag_alpha() -> f32 {
    0.1
}

fn default_recommendation_limit() -> usize {
    5
}

fn default_fetch_limit() -> usize {
    100
}

fn default_api_max_attempts() -> u32 {
    20
}

fn default_api_retry_delay_ms() -> u64 {
    1000
}

impl Default for GraphConfig {
    fn default() -> Self {
        // serde defaults are the single source of truth
        serde_json::from_str("{}").expect("empty config must deserialize")
    }
}

impl GraphConfig {
    /// Load config from a JSON file. Missing file falls back to defaults;
    /// malformed JSON is an error (silent fallback would hide typos).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        if !path.exists() {
            println!("[Config] No config at {:?}, using defaults", path);
            return Ok(GraphConfig::default());
        }
        let content =
            fs::read_to_string(path).map_err(|e| format!("Failed to read {:?}: {}", path, e))?;
        serde_json::from_str(&content).map_err(|e| format!("Failed to parse {:?}: {}", path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let c = GraphConfig::default();
        assert_eq!(c.max_new_papers, 5);
        assert_eq!(c.highlight_ms, 3000);
        assert_eq!(c.animation_ms, 1000);
        assert_eq!(c.api_max_attempts, 20);
        assert!((c.major_cluster_radius - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_load_partial_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"maxNewPapers": 3}}"#).ok();
        // field names are snake_case on disk; the above must not silently apply
        let c = GraphConfig::load(f.path()).unwrap();
        assert_eq!(c.max_new_papers, 5);

        let mut f2 = tempfile::NamedTempFile::new().unwrap();
        write!(f2, r#"{{"max_new_papers": 3}}"#).ok();
        let c2 = GraphConfig::load(f2.path()).unwrap();
        assert_eq!(c2.max_new_papers, 3);
    }

    #[test]
    fn test_load_missing_file_defaults() {
        let c = GraphConfig::load("/nonexistent/papergraph.json").unwrap();
        assert_eq!(c.fetch_limit, 100);
    }

    #[test]
    fn test_load_malformed_is_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "not json").ok();
        assert!(GraphConfig::load(f.path()).is_err());
    }
}
