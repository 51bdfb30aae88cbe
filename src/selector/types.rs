//! Mode selection types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Thinking strategy, trading reasoning depth for latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingMode {
    /// Answer directly with no tree search.
    Fast,
    /// Shallow search.
    Hybrid,
    /// Deep search.
    Deliberate,
}

impl ThinkingMode {
    /// All modes, shallowest first.
    pub const ALL: [Self; 3] = [Self::Fast, Self::Hybrid, Self::Deliberate];

    /// Returns true if this mode runs the path search.
    #[must_use]
    pub const fn searches(&self) -> bool {
        !matches!(self, Self::Fast)
    }

    /// Returns the mode name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Hybrid => "hybrid",
            Self::Deliberate => "deliberate",
        }
    }
}

impl fmt::Display for ThinkingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThinkingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "hybrid" => Ok(Self::Hybrid),
            "deliberate" => Ok(Self::Deliberate),
            other => Err(format!("unknown thinking mode: {other}")),
        }
    }
}

/// The four normalized inputs to a mode decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionFactors {
    /// Query complexity in [0, 1].
    pub complexity: f64,
    /// Emotion factor in [0, 1]; low means struggling.
    pub emotion: f64,
    /// `1 - cognitive_load`.
    pub load: f64,
    /// Readiness factor in [0, 1].
    pub readiness: f64,
}

impl DecisionFactors {
    /// Every factor at 0.5.
    #[must_use]
    pub const fn neutral() -> Self {
        Self::uniform(0.5)
    }

    /// Every factor at `value`.
    #[must_use]
    pub const fn uniform(value: f64) -> Self {
        Self {
            complexity: value,
            emotion: value,
            load: value,
            readiness: value,
        }
    }

    /// The smallest of the three affect-derived factors.
    #[must_use]
    pub fn weakest_affect(&self) -> f64 {
        self.emotion.min(self.load).min(self.readiness)
    }
}

/// What a [`ThinkingPolicy`](crate::traits::ThinkingPolicy) decided.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyVerdict {
    /// Chosen mode.
    pub mode: ThinkingMode,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Human-readable justification.
    pub rationale: String,
}

impl PolicyVerdict {
    /// Create a verdict.
    #[must_use]
    pub fn new(mode: ThinkingMode, confidence: f64, rationale: impl Into<String>) -> Self {
        Self {
            mode,
            confidence,
            rationale: rationale.into(),
        }
    }
}

/// A complete, immutable mode decision for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkingDecision {
    /// Chosen mode.
    pub mode: ThinkingMode,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Human-readable justification.
    pub rationale: String,
    /// Factors the decision was made from.
    pub factors: DecisionFactors,
    /// Planning estimate of wall-clock time.
    pub estimated_time_ms: u64,
    /// Planning estimate of tokens.
    pub estimated_tokens: u32,
    /// True if this is the error fallback rather than a rule outcome.
    pub is_fallback: bool,
}
