//! Hand-tuned decision constants.
//!
//! Every threshold the selector, allocator, search and orchestrator consult
//! lives here as a named, overridable default. None of these values has a
//! derivation beyond calibration; treat them as starting points.

use std::f64::consts::SQRT_2;

use serde::{Deserialize, Serialize};

/// Weights of the four factors in the mode selector's weighted score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorWeights {
    /// Complexity weight.
    pub complexity: f64,
    /// Emotion factor weight.
    pub emotion: f64,
    /// Load factor weight.
    pub load: f64,
    /// Readiness factor weight.
    pub readiness: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            complexity: 0.30,
            emotion: 0.25,
            load: 0.25,
            readiness: 0.20,
        }
    }
}

/// Planning estimate for one mode: a base plus a complexity-scaled addend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeEstimate {
    /// Time at zero complexity.
    pub base_time_ms: f64,
    /// Additional time at complexity 1.0.
    pub time_per_complexity_ms: f64,
    /// Tokens at zero complexity.
    pub base_tokens: f64,
    /// Additional tokens at complexity 1.0.
    pub tokens_per_complexity: f64,
}

impl ModeEstimate {
    const fn new(base_time_ms: f64, time_span: f64, base_tokens: f64, token_span: f64) -> Self {
        Self {
            base_time_ms,
            time_per_complexity_ms: time_span,
            base_tokens,
            tokens_per_complexity: token_span,
        }
    }
}

/// Per-mode planning estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeEstimates {
    /// Fast mode: 500-1500 ms, 300-1000 tokens.
    pub fast: ModeEstimate,
    /// Hybrid mode: 1500-4500 ms, 800-2500 tokens.
    pub hybrid: ModeEstimate,
    /// Deliberate mode: 3000-8000 ms, 1500-4500 tokens.
    pub deliberate: ModeEstimate,
}

impl Default for ModeEstimates {
    fn default() -> Self {
        Self {
            fast: ModeEstimate::new(500.0, 1000.0, 300.0, 700.0),
            hybrid: ModeEstimate::new(1500.0, 3000.0, 800.0, 1700.0),
            deliberate: ModeEstimate::new(3000.0, 5000.0, 1500.0, 3000.0),
        }
    }
}

/// Thresholds and confidences of the heuristic mode decision rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeThresholds {
    /// Complexity above which Deliberate is forced.
    pub deliberate_complexity: f64,
    /// Confidence of the high-complexity rule.
    pub deliberate_confidence: f64,
    /// A factor below this marks the user as struggling.
    pub struggling_factor: f64,
    /// Confidence of the struggling override.
    pub struggling_confidence: f64,
    /// Complexity ceiling for the weighted-score Fast rule.
    pub fast_complexity: f64,
    /// Weighted score floor for the weighted-score Fast rule.
    pub fast_weighted_score: f64,
    /// Confidence of the weighted-score Fast rule.
    pub fast_confidence: f64,
    /// Complexity ceiling for the emotion Fast rule.
    pub quick_complexity: f64,
    /// Emotion factor floor for the emotion Fast rule.
    pub quick_emotion: f64,
    /// Confidence of the emotion Fast rule.
    pub quick_confidence: f64,
    /// Confidence of the Hybrid default.
    pub hybrid_confidence: f64,
    /// Confidence and factor value of the error fallback.
    pub fallback_confidence: f64,
    /// Share of rescaled valence in the emotion factor.
    pub valence_weight: f64,
    /// Load substituted when none is usable.
    pub default_load: f64,
    /// Weighted score weights.
    pub weights: FactorWeights,
    /// Planning estimates.
    pub estimates: ModeEstimates,
}

impl Default for ModeThresholds {
    fn default() -> Self {
        Self {
            deliberate_complexity: 0.7,
            deliberate_confidence: 0.9,
            struggling_factor: 0.4,
            struggling_confidence: 0.85,
            fast_complexity: 0.35,
            fast_weighted_score: 0.70,
            fast_confidence: 0.85,
            quick_complexity: 0.25,
            quick_emotion: 0.6,
            quick_confidence: 0.90,
            hybrid_confidence: 0.75,
            fallback_confidence: 0.5,
            valence_weight: 0.3,
            default_load: 0.5,
            weights: FactorWeights::default(),
            estimates: ModeEstimates::default(),
        }
    }
}

/// Token budget configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Conservative base budget, within [2000, 3000].
    pub conservative_base: u32,
    /// Balanced base budget, within [3000, 5000].
    pub balanced_base: u32,
    /// Aggressive base budget, within [5000, 8000].
    pub aggressive_base: u32,
    /// Smallest total granted when the ceiling allows it.
    pub floor_tokens: u32,
    /// Ceiling used when no resource-limit capability is configured.
    pub provider_max_tokens: u32,
    /// Fraction of the ceiling that may be granted, in (0, 1].
    pub safety_margin: f64,
    /// Reasoning share before adjustments.
    pub base_ratio: f64,
    /// Lower reasoning share bound.
    pub ratio_min: f64,
    /// Upper reasoning share bound.
    pub ratio_max: f64,
    /// Share added for high complexity.
    pub complex_ratio_bonus: f64,
    /// Share added for a struggling emotion.
    pub struggling_ratio_bonus: f64,
    /// Share removed for a confident emotion.
    pub confident_ratio_penalty: f64,
    /// Complexity above which a query counts as hard.
    pub high_complexity: f64,
    /// Complexity below which a query counts as easy.
    pub low_complexity: f64,
    /// Load above which the user counts as struggling.
    pub high_load: f64,
    /// Load below which the user counts as confident.
    pub low_load: f64,
    /// Total granted by the internal-failure fallback, before the ceiling.
    pub fallback_total: u32,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            conservative_base: 2500,
            balanced_base: 4000,
            aggressive_base: 6500,
            floor_tokens: 2500,
            provider_max_tokens: 8192,
            safety_margin: 0.9,
            base_ratio: 0.5,
            ratio_min: 0.4,
            ratio_max: 0.7,
            complex_ratio_bonus: 0.15,
            struggling_ratio_bonus: 0.10,
            confident_ratio_penalty: 0.10,
            high_complexity: 0.7,
            low_complexity: 0.3,
            high_load: 0.7,
            low_load: 0.4,
            fallback_total: 3000,
        }
    }
}

/// Path search configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Iteration cap; the effective count is `min(max_iterations, max_steps)`.
    pub max_iterations: usize,
    /// Children generated per expansion.
    pub expansion_width: usize,
    /// UCB1 exploration constant.
    pub exploration_constant: f64,
    /// Weight of the depth term in the simulation proxy.
    pub depth_weight: f64,
    /// Depth at which the depth term saturates.
    pub depth_horizon: f64,
    /// Weight of the length term in the simulation proxy.
    pub length_weight: f64,
    /// Word count at which the length term saturates.
    pub length_horizon: f64,
    /// Weight of the strategy diversity term.
    pub diversity_weight: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            expansion_width: 1,
            exploration_constant: SQRT_2,
            depth_weight: 0.4,
            depth_horizon: 5.0,
            length_weight: 0.4,
            length_horizon: 50.0,
            diversity_weight: 0.2,
        }
    }
}

/// Budget-derived search depth per mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthPolicy {
    /// Fixed depth for Fast mode.
    pub fast_steps: usize,
    /// Reasoning tokens per Deliberate step.
    pub deliberate_tokens_per_step: u32,
    /// Deliberate depth lower bound.
    pub deliberate_min: usize,
    /// Deliberate depth upper bound.
    pub deliberate_max: usize,
    /// Reasoning tokens per Hybrid step.
    pub hybrid_tokens_per_step: u32,
    /// Hybrid depth lower bound.
    pub hybrid_min: usize,
    /// Hybrid depth upper bound.
    pub hybrid_max: usize,
}

impl Default for DepthPolicy {
    fn default() -> Self {
        Self {
            fast_steps: 2,
            deliberate_tokens_per_step: 400,
            deliberate_min: 3,
            deliberate_max: 8,
            hybrid_tokens_per_step: 500,
            hybrid_min: 3,
            hybrid_max: 5,
        }
    }
}
