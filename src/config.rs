use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Engine configuration (loaded from .crosscheck.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub similarity: SimilarityConfig,

    #[serde(default)]
    pub consensus: ConsensusConfig,

    #[serde(default)]
    pub patterns: PatternConfig,
}

/// Knobs for the pairwise similarity scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Composite score at or above which two findings are duplicates
    #[serde(default = "default_similarity_threshold")]
    pub threshold: f64,

    /// Line window within which proximity lifts the text score
    #[serde(default = "default_line_proximity")]
    pub line_proximity: u32,

    /// Weight of title similarity in the text composite
    #[serde(default = "default_title_weight")]
    pub title_weight: f64,

    /// Weight of description similarity in the text composite
    #[serde(default = "default_description_weight")]
    pub description_weight: f64,

    /// How strongly line proximity blends into the final score
    #[serde(default = "default_proximity_weight")]
    pub proximity_weight: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        SimilarityConfig {
            threshold: default_similarity_threshold(),
            line_proximity: default_line_proximity(),
            title_weight: default_title_weight(),
            description_weight: default_description_weight(),
            proximity_weight: default_proximity_weight(),
        }
    }
}

/// Knobs for cross-agent consensus aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Confidence added per additional distinct agent role, capped at 1.0
    #[serde(default = "default_confidence_boost")]
    pub confidence_boost: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        ConsensusConfig {
            confidence_boost: default_confidence_boost(),
        }
    }
}

/// Knobs for cross-agent pattern detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    /// Distinct agent roles required before a theme counts as a pattern
    #[serde(default = "default_min_agent_roles")]
    pub min_agent_roles: usize,
}

impl Default for PatternConfig {
    fn default() -> Self {
        PatternConfig {
            min_agent_roles: default_min_agent_roles(),
        }
    }
}

fn default_similarity_threshold() -> f64 {
    0.85
}

fn default_line_proximity() -> u32 {
    5
}

fn default_title_weight() -> f64 {
    0.6
}

fn default_description_weight() -> f64 {
    0.4
}

fn default_proximity_weight() -> f64 {
    0.6
}

fn default_confidence_boost() -> f64 {
    0.05
}

fn default_min_agent_roles() -> usize {
    2
}

/// Failure while reading an explicit config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl EngineConfig {
    /// Parse a config from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Try to load .crosscheck.toml from the given directory or its parents.
    pub fn load(start: &Path) -> Option<Self> {
        let config_path = find_config_file(start)?;
        debug!("Found config: {}", config_path.display());

        match Self::from_path(&config_path) {
            Ok(config) => {
                info!("Loaded config from {}", config_path.display());
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Ignoring {}: {}", config_path.display(), e);
                None
            }
        }
    }
}

/// Walk up from the start path to find .crosscheck.toml
fn find_config_file(start: &Path) -> Option<std::path::PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let config = current.join(".crosscheck.toml");
        if config.exists() {
            return Some(config);
        }
        if !current.pop() {
            return None;
        }
    }
}
