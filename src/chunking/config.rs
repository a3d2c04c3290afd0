//! Configuration for the semantic chunker.

use serde::{Deserialize, Serialize};

use super::types::ChunkingError;

/// How the breakpoint threshold is derived from the distance sequence.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BreakpointStrategy {
    /// Threshold is the P-th percentile of the distances, P in (0, 100].
    Percentile { threshold: f32 },
    /// Threshold is mean + multiplier * standard deviation.
    StandardDeviation { multiplier: f32 },
}

impl BreakpointStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            BreakpointStrategy::Percentile { .. } => "percentile",
            BreakpointStrategy::StandardDeviation { .. } => "standard_deviation",
        }
    }
}

impl Default for BreakpointStrategy {
    fn default() -> Self {
        BreakpointStrategy::Percentile { threshold: 70.0 }
    }
}

/// Tunables for semantic splitting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Breakpoint strategy and amount.
    pub strategy: BreakpointStrategy,
    /// Neighbors on each side folded into a sentence's embedding input.
    pub smoothing_window: Option<usize>,
    /// A chunk never ends up with fewer sentences than this.
    pub min_sentences_per_chunk: usize,
    /// Semantic chunks longer than this are re-split lexically.
    pub max_chunk_chars: Option<usize>,
    /// Whether oversized chunks fall back to the lexical cascade.
    pub fallback_to_lexical: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: BreakpointStrategy::default(),
            smoothing_window: Some(1),
            min_sentences_per_chunk: 1,
            max_chunk_chars: None,
            fallback_to_lexical: true,
        }
    }
}

impl ChunkingConfig {
    /// Validates the configuration; run before any I/O.
    pub fn validate(&self) -> Result<(), ChunkingError> {
        match self.strategy {
            BreakpointStrategy::Percentile { threshold } => {
                if !(threshold > 0.0 && threshold <= 100.0) {
                    return Err(ChunkingError::Config(format!(
                        "percentile threshold must be in (0, 100], got {threshold}"
                    )));
                }
            }
            BreakpointStrategy::StandardDeviation { multiplier } => {
                if !multiplier.is_finite() || multiplier < 0.0 {
                    return Err(ChunkingError::Config(format!(
                        "standard deviation multiplier must be non-negative, got {multiplier}"
                    )));
                }
            }
        }
        if self.min_sentences_per_chunk == 0 {
            return Err(ChunkingError::Config(
                "min_sentences_per_chunk must be at least 1".to_string(),
            ));
        }
        if let Some(max) = self.max_chunk_chars {
            if max == 0 {
                return Err(ChunkingError::Config(
                    "max_chunk_chars must be positive when set".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ChunkingConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_percentile() {
        let config = ChunkingConfig {
            strategy: BreakpointStrategy::Percentile { threshold: 101.0 },
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ChunkingConfig {
            strategy: BreakpointStrategy::Percentile { threshold: 0.0 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_negative_multiplier() {
        let config = ChunkingConfig {
            strategy: BreakpointStrategy::StandardDeviation { multiplier: -1.0 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_sentence_floor() {
        let config = ChunkingConfig {
            min_sentences_per_chunk: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
