//! Token budget types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::affect::{AffectState, ReadinessTier};
use crate::selector::ThinkingMode;

/// Budget size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetMode {
    /// Smallest grant, for easy queries and confident users.
    Conservative,
    /// The default grant.
    Balanced,
    /// Largest grant, for hard queries or struggling users.
    Aggressive,
}

impl BudgetMode {
    /// Returns the mode name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Balanced => "balanced",
            Self::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for BudgetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ThinkingMode> for BudgetMode {
    fn from(mode: ThinkingMode) -> Self {
        match mode {
            ThinkingMode::Fast => Self::Conservative,
            ThinkingMode::Hybrid => Self::Balanced,
            ThinkingMode::Deliberate => Self::Aggressive,
        }
    }
}

/// Multipliers applied to the base budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetFactors {
    /// Emotion multiplier in [0.5, 2.0].
    pub emotion: f64,
    /// Cognitive-load multiplier in [0.5, 1.5].
    pub load: f64,
    /// Readiness multiplier in [0.5, 1.3].
    pub readiness: f64,
    /// Complexity multiplier in [0.8, 1.2].
    pub complexity: f64,
}

impl BudgetFactors {
    /// Every multiplier at 1.0.
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            emotion: 1.0,
            load: 1.0,
            readiness: 1.0,
            complexity: 1.0,
        }
    }

    /// Product of all four multipliers.
    #[must_use]
    pub fn product(&self) -> f64 {
        self.emotion * self.load * self.readiness * self.complexity
    }
}

/// A token grant and its reasoning/response split.
///
/// `reasoning_tokens + response_tokens == total_tokens` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBudget {
    /// Tokens reserved for visible reasoning.
    pub reasoning_tokens: u32,
    /// Tokens reserved for the final answer.
    pub response_tokens: u32,
    /// Total grant.
    pub total_tokens: u32,
    /// Size class the grant was computed for.
    pub mode: BudgetMode,
    /// Complexity the grant was computed for.
    pub complexity: f64,
    /// Share of the total reserved for reasoning.
    pub reasoning_ratio: f64,
    /// Multipliers applied to the base.
    pub factors: BudgetFactors,
    /// True if this is the internal-failure fallback.
    pub is_fallback: bool,
}

impl TokenBudget {
    /// Split `total` with `ratio`, flooring the reasoning share.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn split(total: u32, ratio: f64) -> (u32, u32) {
        let reasoning = ((f64::from(total) * ratio).floor() as u32).min(total);
        (reasoning, total - reasoning)
    }

    /// Returns true if the split adds up to the total.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.reasoning_tokens as u64 + self.response_tokens as u64 == self.total_tokens as u64
    }
}

/// Where the complexity of a budget request comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityInput {
    /// Score the query text.
    Query(String),
    /// Use a precomputed score; must lie in [0, 1].
    Score(f64),
}

/// Inputs to a single allocation.
///
/// Explicit `cognitive_load` and `readiness` take precedence over the
/// values carried by `affect`.
///
/// # Example
///
/// ```
/// use deep_thinking::budget::{BudgetMode, BudgetRequest};
///
/// let request = BudgetRequest::for_complexity(0.4)
///     .with_cognitive_load(0.3)
///     .with_mode(BudgetMode::Balanced)
///     .with_ceiling(4096);
/// assert_eq!(request.ceiling, Some(4096));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRequest {
    /// Query text or precomputed score.
    pub complexity: ComplexityInput,
    /// Affect snapshot; neutral when absent.
    pub affect: Option<AffectState>,
    /// Cognitive load in [0, 1].
    pub cognitive_load: Option<f64>,
    /// Readiness tier.
    pub readiness: Option<ReadinessTier>,
    /// Explicit size class; derived when absent.
    pub mode: Option<BudgetMode>,
    /// Provider ceiling; the configured default when absent.
    pub ceiling: Option<u32>,
}

impl BudgetRequest {
    fn with_input(complexity: ComplexityInput) -> Self {
        Self {
            complexity,
            affect: None,
            cognitive_load: None,
            readiness: None,
            mode: None,
            ceiling: None,
        }
    }

    /// Request a budget for `query`.
    #[must_use]
    pub fn for_query(query: impl Into<String>) -> Self {
        Self::with_input(ComplexityInput::Query(query.into()))
    }

    /// Request a budget for a precomputed complexity score.
    #[must_use]
    pub fn for_complexity(score: f64) -> Self {
        Self::with_input(ComplexityInput::Score(score))
    }

    /// Attach an affect snapshot.
    #[must_use]
    pub fn with_affect(mut self, affect: AffectState) -> Self {
        self.affect = Some(affect);
        self
    }

    /// Set the cognitive load.
    #[must_use]
    pub fn with_cognitive_load(mut self, load: f64) -> Self {
        self.cognitive_load = Some(load);
        self
    }

    /// Set the readiness tier.
    #[must_use]
    pub fn with_readiness(mut self, readiness: ReadinessTier) -> Self {
        self.readiness = Some(readiness);
        self
    }

    /// Force a size class.
    #[must_use]
    pub fn with_mode(mut self, mode: BudgetMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set the provider ceiling.
    #[must_use]
    pub fn with_ceiling(mut self, ceiling: u32) -> Self {
        self.ceiling = Some(ceiling);
        self
    }
}
