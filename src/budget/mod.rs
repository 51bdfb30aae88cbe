//! Token budget allocation.
//!
//! Computes how many tokens a request may spend and how to split them
//! between visible reasoning and the final answer:
//! 1. `safe_max = floor(ceiling * safety_margin)`
//! 2. Derive a [`BudgetMode`] unless one was given
//! 3. Multiply the mode's base budget by emotion, load, readiness and
//!    complexity factors
//! 4. Clamp to `[floor_tokens, safe_max]`; the ceiling wins a conflict
//! 5. Split by a reasoning ratio clamped to the configured bounds
//!
//! Unlike mode selection, allocation grants resources, so out-of-contract
//! numeric input is rejected with a [`ValidationError`] instead of being
//! repaired. Any other internal failure yields a fixed Balanced budget.
//!
//! The allocator holds only immutable configuration and is safe to share
//! across concurrent requests.

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

mod types;

pub use types::{BudgetFactors, BudgetMode, BudgetRequest, ComplexityInput, TokenBudget};

use tracing::{error, info};

use crate::affect::{AffectState, Emotion, EmotionTable, ReadinessTable, ReadinessTier};
use crate::complexity::ComplexityEstimator;
use crate::config::BudgetConfig;
use crate::error::ValidationError;

/// Bounds of the emotion multiplier.
pub const EMOTION_FACTOR_RANGE: (f64, f64) = (0.5, 2.0);

/// Bounds of the cognitive-load multiplier.
pub const LOAD_FACTOR_RANGE: (f64, f64) = (0.5, 1.5);

/// Bounds of the readiness multiplier.
pub const READINESS_FACTOR_RANGE: (f64, f64) = (0.5, 1.3);

/// Load multiplier at zero load; falls one-for-one as load rises.
pub const LOAD_FACTOR_PIVOT: f64 = 1.5;

/// Complexity multiplier at zero complexity.
pub const COMPLEXITY_FACTOR_BASE: f64 = 0.8;

/// Complexity multiplier gain from zero to full complexity.
pub const COMPLEXITY_FACTOR_SPAN: f64 = 0.4;

/// Token budget allocator.
#[derive(Debug, Clone)]
pub struct BudgetAllocator {
    config: BudgetConfig,
    estimator: ComplexityEstimator,
    emotions: EmotionTable,
    readiness: ReadinessTable,
}

impl Default for BudgetAllocator {
    fn default() -> Self {
        Self::new(BudgetConfig::default())
    }
}

impl BudgetAllocator {
    /// Create an allocator with the default multiplier tables.
    #[must_use]
    pub fn new(config: BudgetConfig) -> Self {
        Self {
            config,
            estimator: ComplexityEstimator::default(),
            emotions: EmotionTable::budget_multipliers(),
            readiness: ReadinessTable::budget_multipliers(),
        }
    }

    /// Replace the emotion and readiness multiplier tables.
    #[must_use]
    pub fn with_tables(mut self, emotions: EmotionTable, readiness: ReadinessTable) -> Self {
        self.emotions = emotions;
        self.readiness = readiness;
        self
    }

    /// Replace the complexity estimator used for query requests.
    #[must_use]
    pub fn with_estimator(mut self, estimator: ComplexityEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &BudgetConfig {
        &self.config
    }

    /// Allocate a budget.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the cognitive load or a precomputed
    /// complexity is NaN, infinite or outside `[0, 1]`, or if the ceiling
    /// leaves no usable tokens.
    pub fn allocate(&self, request: &BudgetRequest) -> Result<TokenBudget, ValidationError> {
        let neutral = AffectState::neutral();
        let affect = request.affect.as_ref().unwrap_or(&neutral);

        let load = ValidationError::check_unit_range(
            "cognitive_load",
            request.cognitive_load.unwrap_or(affect.cognitive_load),
            0.0,
            1.0,
        )?;

        let complexity = match &request.complexity {
            ComplexityInput::Query(query) => self.estimator.estimate(query),
            ComplexityInput::Score(score) => {
                ValidationError::check_unit_range("complexity", *score, 0.0, 1.0)?
            }
        };

        let ceiling = request.ceiling.unwrap_or(self.config.provider_max_tokens);
        let safe_max = self.safe_max(ceiling)?;

        let readiness = request.readiness.unwrap_or(affect.readiness);
        let emotion = affect.primary_emotion;

        let mode = request
            .mode
            .unwrap_or_else(|| self.determine_mode(complexity, emotion, load, readiness));

        let factors = BudgetFactors {
            emotion: clamp_factor(self.emotions.lookup(emotion), EMOTION_FACTOR_RANGE),
            load: clamp_factor(LOAD_FACTOR_PIVOT - load, LOAD_FACTOR_RANGE),
            readiness: clamp_factor(self.readiness.lookup(readiness), READINESS_FACTOR_RANGE),
            complexity: COMPLEXITY_FACTOR_SPAN.mul_add(complexity, COMPLEXITY_FACTOR_BASE),
        };

        let raw = f64::from(self.base_for(mode)) * factors.product();
        let ratio = self.reasoning_ratio(complexity, emotion);
        if !raw.is_finite() || !ratio.is_finite() {
            error!(
                raw_total = raw,
                ratio, "Budget arithmetic produced a non-finite value, using fallback"
            );
            return Ok(self.fallback_budget(safe_max));
        }

        let total = (raw.floor() as u32)
            .max(self.config.floor_tokens)
            .min(safe_max);
        let (reasoning_tokens, response_tokens) = TokenBudget::split(total, ratio);

        info!(
            total_tokens = total,
            reasoning_tokens,
            response_tokens,
            complexity,
            mode = %mode,
            "Budget allocated"
        );

        Ok(TokenBudget {
            reasoning_tokens,
            response_tokens,
            total_tokens: total,
            mode,
            complexity,
            reasoning_ratio: ratio,
            factors,
            is_fallback: false,
        })
    }

    /// Largest grant allowed under `ceiling`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCeiling`] if the result is zero.
    pub fn safe_max(&self, ceiling: u32) -> Result<u32, ValidationError> {
        let safe_max = (f64::from(ceiling) * self.config.safety_margin).floor();
        if safe_max.is_finite() && safe_max >= 1.0 {
            Ok(safe_max as u32)
        } else {
            Err(ValidationError::InvalidCeiling { value: ceiling })
        }
    }

    /// Derive a size class from the request signals.
    ///
    /// Struggling users and hard queries get Aggressive; confident users
    /// with easy queries get Conservative; everyone else gets Balanced.
    #[must_use]
    pub fn determine_mode(
        &self,
        complexity: f64,
        emotion: Emotion,
        load: f64,
        readiness: ReadinessTier,
    ) -> BudgetMode {
        let c = &self.config;
        let struggling = emotion.is_struggling() || readiness.is_struggling() || load > c.high_load;
        let confident = emotion.is_confident() && readiness.is_confident() && load < c.low_load;

        if struggling || complexity > c.high_complexity {
            BudgetMode::Aggressive
        } else if confident && complexity < c.low_complexity {
            BudgetMode::Conservative
        } else {
            BudgetMode::Balanced
        }
    }

    /// Share of the total reserved for reasoning.
    #[must_use]
    pub fn reasoning_ratio(&self, complexity: f64, emotion: Emotion) -> f64 {
        let c = &self.config;
        let mut ratio = c.base_ratio;
        if complexity > c.high_complexity {
            ratio += c.complex_ratio_bonus;
        }
        if emotion.is_struggling() {
            ratio += c.struggling_ratio_bonus;
        }
        if emotion.is_confident() {
            ratio -= c.confident_ratio_penalty;
        }
        ratio.clamp(c.ratio_min, c.ratio_max)
    }

    /// Base budget for `mode`.
    #[must_use]
    pub const fn base_for(&self, mode: BudgetMode) -> u32 {
        match mode {
            BudgetMode::Conservative => self.config.conservative_base,
            BudgetMode::Balanced => self.config.balanced_base,
            BudgetMode::Aggressive => self.config.aggressive_base,
        }
    }

    /// The fixed Balanced budget used when allocation fails internally.
    #[must_use]
    pub fn fallback_budget(&self, safe_max: u32) -> TokenBudget {
        let total = self.config.fallback_total.min(safe_max);
        let (reasoning_tokens, response_tokens) = TokenBudget::split(total, 0.5);
        TokenBudget {
            reasoning_tokens,
            response_tokens,
            total_tokens: total,
            mode: BudgetMode::Balanced,
            complexity: 0.5,
            reasoning_ratio: 0.5,
            factors: BudgetFactors::identity(),
            is_fallback: true,
        }
    }
}

fn clamp_factor(value: f64, (min, max): (f64, f64)) -> f64 {
    value.clamp(min, max)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::test_utils::{confident_affect, struggling_affect};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use test_case::test_case;

    fn allocator() -> BudgetAllocator {
        BudgetAllocator::default()
    }

    #[test]
    fn test_neutral_balanced_budget() {
        let budget = allocator()
            .allocate(&BudgetRequest::for_complexity(0.5))
            .unwrap();

        // 4000 * 1.0 * 1.0 * 0.9 * 1.0
        assert_eq!(budget.mode, BudgetMode::Balanced);
        assert_eq!(budget.total_tokens, 3600);
        assert_eq!(budget.reasoning_tokens, 1800);
        assert_eq!(budget.response_tokens, 1800);
        assert!(!budget.is_fallback);
    }

    #[test]
    fn test_struggling_user_gets_aggressive_budget() {
        let budget = allocator()
            .allocate(&BudgetRequest::for_complexity(0.9).with_affect(struggling_affect()))
            .unwrap();

        // 6500 * 1.5 * 0.7 * 0.7 * 1.16
        assert_eq!(budget.mode, BudgetMode::Aggressive);
        assert!((5540..=5542).contains(&budget.total_tokens));
        // 0.5 + 0.15 + 0.10 clamps to 0.7
        assert_eq!(budget.reasoning_ratio, 0.7);
        assert!(budget.is_consistent());
    }

    #[test]
    fn test_confident_user_easy_query_gets_conservative() {
        let budget = allocator()
            .allocate(&BudgetRequest::for_query("What is 2+2?").with_affect(confident_affect()))
            .unwrap();

        assert_eq!(budget.mode, BudgetMode::Conservative);
        assert_eq!(budget.reasoning_ratio, 0.4);
        assert!(budget.total_tokens >= 2500);
    }

    #[test_case(-0.5; "negative")]
    #[test_case(1.2; "above one")]
    fn test_invalid_load_is_rejected(load: f64) {
        let err = allocator()
            .allocate(&BudgetRequest::for_complexity(0.5).with_cognitive_load(load))
            .unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { field, .. } if field == "cognitive_load"));
    }

    #[test]
    fn test_nan_load_is_rejected() {
        let err = allocator()
            .allocate(&BudgetRequest::for_complexity(0.5).with_cognitive_load(f64::NAN))
            .unwrap_err();
        assert!(matches!(err, ValidationError::NotFinite { .. }));
    }

    #[test]
    fn test_invalid_affect_load_is_rejected() {
        let mut affect = AffectState::neutral();
        affect.cognitive_load = 3.0;
        let result = allocator().allocate(&BudgetRequest::for_complexity(0.5).with_affect(affect));
        assert!(result.is_err());
    }

    #[test]
    fn test_out_of_range_complexity_is_rejected() {
        let err = allocator()
            .allocate(&BudgetRequest::for_complexity(1.5))
            .unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { field, .. } if field == "complexity"));
    }

    #[test]
    fn test_zero_ceiling_is_rejected() {
        let err = allocator()
            .allocate(&BudgetRequest::for_complexity(0.5).with_ceiling(0))
            .unwrap_err();
        assert_eq!(err, ValidationError::InvalidCeiling { value: 0 });
    }

    #[test]
    fn test_ceiling_beats_floor() {
        let budget = allocator()
            .allocate(&BudgetRequest::for_complexity(0.1).with_ceiling(1000))
            .unwrap();
        assert_eq!(budget.total_tokens, 900);
        assert!(budget.is_consistent());
    }

    #[test]
    fn test_floor_applies_under_generous_ceiling() {
        // Overwhelmed users shrink the emotion factor to 0.6
        let affect = AffectState::new(Emotion::Overwhelmed, 0.0, ReadinessTier::NotReady, 0.0);
        let budget = allocator()
            .allocate(
                &BudgetRequest::for_complexity(0.0)
                    .with_affect(affect)
                    .with_mode(BudgetMode::Conservative),
            )
            .unwrap();
        assert_eq!(budget.total_tokens, 2500);
    }

    #[test]
    fn test_explicit_mode_wins() {
        let budget = allocator()
            .allocate(&BudgetRequest::for_complexity(0.9).with_mode(BudgetMode::Conservative))
            .unwrap();
        assert_eq!(budget.mode, BudgetMode::Conservative);
    }

    #[test]
    fn test_nan_table_entry_falls_back() {
        let emotions = EmotionTable::budget_multipliers().with_entry(Emotion::Neutral, f64::NAN);
        let allocator = allocator().with_tables(emotions, ReadinessTable::budget_multipliers());

        let budget = allocator
            .allocate(&BudgetRequest::for_complexity(0.5))
            .unwrap();
        assert!(budget.is_fallback);
        assert_eq!(budget.mode, BudgetMode::Balanced);
        assert_eq!(budget.total_tokens, 3000);
        assert_eq!(budget.reasoning_tokens, 1500);
        assert_eq!(budget.response_tokens, 1500);
    }

    #[test]
    fn test_fallback_respects_ceiling() {
        let budget = allocator().fallback_budget(2047);
        assert_eq!(budget.total_tokens, 2047);
        assert!(budget.is_consistent());
    }

    #[test_case(Emotion::Confused, ReadinessTier::High, 0.2, 0.1, BudgetMode::Aggressive)]
    #[test_case(Emotion::Neutral, ReadinessTier::Low, 0.2, 0.1, BudgetMode::Aggressive)]
    #[test_case(Emotion::Neutral, ReadinessTier::High, 0.8, 0.1, BudgetMode::Aggressive)]
    #[test_case(Emotion::Neutral, ReadinessTier::High, 0.2, 0.8, BudgetMode::Aggressive)]
    #[test_case(Emotion::Engaged, ReadinessTier::Optimal, 0.2, 0.2, BudgetMode::Conservative)]
    #[test_case(Emotion::Engaged, ReadinessTier::Optimal, 0.5, 0.2, BudgetMode::Balanced)]
    #[test_case(Emotion::Engaged, ReadinessTier::Optimal, 0.2, 0.5, BudgetMode::Balanced)]
    fn test_determine_mode(
        emotion: Emotion,
        readiness: ReadinessTier,
        load: f64,
        complexity: f64,
        expected: BudgetMode,
    ) {
        assert_eq!(
            allocator().determine_mode(complexity, emotion, load, readiness),
            expected
        );
    }

    #[test_case(0.5, Emotion::Neutral, 0.5)]
    #[test_case(0.8, Emotion::Neutral, 0.65)]
    #[test_case(0.5, Emotion::Anxious, 0.6)]
    #[test_case(0.5, Emotion::Confident, 0.4)]
    #[test_case(0.9, Emotion::Frustrated, 0.7)]
    fn test_reasoning_ratio(complexity: f64, emotion: Emotion, expected: f64) {
        let ratio = allocator().reasoning_ratio(complexity, emotion);
        assert!((ratio - expected).abs() < 1e-12);
    }

    #[test]
    fn test_thinking_mode_conversion() {
        use crate::selector::ThinkingMode;
        assert_eq!(BudgetMode::from(ThinkingMode::Fast), BudgetMode::Conservative);
        assert_eq!(BudgetMode::from(ThinkingMode::Hybrid), BudgetMode::Balanced);
        assert_eq!(BudgetMode::from(ThinkingMode::Deliberate), BudgetMode::Aggressive);
    }

    fn emotion_strategy() -> impl Strategy<Value = Emotion> {
        prop_oneof![
            Just(Emotion::Confused),
            Just(Emotion::Anxious),
            Just(Emotion::Overwhelmed),
            Just(Emotion::Neutral),
            Just(Emotion::Curious),
            Just(Emotion::Confident),
            Just(Emotion::Engaged),
            Just(Emotion::Bored),
        ]
    }

    fn readiness_strategy() -> impl Strategy<Value = ReadinessTier> {
        prop_oneof![
            Just(ReadinessTier::NotReady),
            Just(ReadinessTier::Low),
            Just(ReadinessTier::Moderate),
            Just(ReadinessTier::High),
            Just(ReadinessTier::Optimal),
        ]
    }

    proptest! {
        #[test]
        fn prop_split_is_exact(
            complexity in 0.0f64..=1.0,
            load in 0.0f64..=1.0,
            emotion in emotion_strategy(),
            readiness in readiness_strategy(),
            ceiling in 1024u32..32_768,
        ) {
            let affect = AffectState::new(emotion, 0.0, readiness, load);
            let budget = allocator()
                .allocate(&BudgetRequest::for_complexity(complexity).with_affect(affect).with_ceiling(ceiling))
                .unwrap();
            prop_assert_eq!(budget.reasoning_tokens + budget.response_tokens, budget.total_tokens);
            prop_assert!(f64::from(budget.total_tokens) <= f64::from(ceiling) * 0.9);
        }

        #[test]
        fn prop_complexity_is_monotonic(
            a in 0.0f64..=1.0,
            b in 0.0f64..=1.0,
            load in 0.0f64..=1.0,
            emotion in emotion_strategy(),
            readiness in readiness_strategy(),
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let affect = AffectState::new(emotion, 0.0, readiness, load);
            let low = allocator()
                .allocate(&BudgetRequest::for_complexity(lo).with_affect(affect.clone()))
                .unwrap();
            let high = allocator()
                .allocate(&BudgetRequest::for_complexity(hi).with_affect(affect))
                .unwrap();
            prop_assert!(low.total_tokens <= high.total_tokens);
            prop_assert!(low.reasoning_ratio <= high.reasoning_ratio);
        }
    }
}
