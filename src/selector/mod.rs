//! Thinking-mode selection.
//!
//! Turns a query and an affect snapshot into a [`ThinkingDecision`]:
//! 1. Score the query with the [`ComplexityEstimator`]
//! 2. Derive the emotion, load and readiness factors from swappable tables
//! 3. Hand the factors to a [`ThinkingPolicy`]
//! 4. Attach a per-mode planning estimate
//!
//! Selection never fails. A missing affect snapshot or an unusable
//! cognitive load is repaired with a logged default, and any internal
//! failure yields a Hybrid fallback decision.

mod policy;
mod types;

pub use policy::HeuristicPolicy;
pub use types::{DecisionFactors, PolicyVerdict, ThinkingDecision, ThinkingMode};

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::affect::{AffectState, EmotionTable, ReadinessTable, ReadinessTier};
use crate::complexity::ComplexityEstimator;
use crate::config::{ModeEstimate, ModeThresholds};
use crate::error::ValidationError;
use crate::traits::ThinkingPolicy;

/// Chooses a thinking mode per request.
///
/// Holds only immutable configuration; one selector can serve concurrent
/// requests.
#[derive(Clone)]
pub struct ModeSelector {
    estimator: ComplexityEstimator,
    emotions: EmotionTable,
    readiness: ReadinessTable,
    thresholds: ModeThresholds,
    policy: Arc<dyn ThinkingPolicy>,
}

impl std::fmt::Debug for ModeSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeSelector")
            .field("thresholds", &self.thresholds)
            .finish_non_exhaustive()
    }
}

impl Default for ModeSelector {
    fn default() -> Self {
        Self::new(ModeThresholds::default())
    }
}

impl ModeSelector {
    /// Create a selector running the heuristic policy with `thresholds`.
    #[must_use]
    pub fn new(thresholds: ModeThresholds) -> Self {
        Self {
            estimator: ComplexityEstimator::default(),
            emotions: EmotionTable::mode_confidence(),
            readiness: ReadinessTable::mode_factors(),
            policy: Arc::new(HeuristicPolicy::new(thresholds.clone())),
            thresholds,
        }
    }

    /// Replace the decision policy.
    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn ThinkingPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the emotion and readiness lookup tables.
    #[must_use]
    pub fn with_tables(mut self, emotions: EmotionTable, readiness: ReadinessTable) -> Self {
        self.emotions = emotions;
        self.readiness = readiness;
        self
    }

    /// Replace the complexity estimator.
    #[must_use]
    pub fn with_estimator(mut self, estimator: ComplexityEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    /// The complexity estimator in use.
    #[must_use]
    pub const fn estimator(&self) -> &ComplexityEstimator {
        &self.estimator
    }

    /// Choose a mode for `query`.
    ///
    /// An explicit `cognitive_load` or `readiness` takes precedence over the
    /// value carried by `affect`.
    #[must_use]
    pub fn select(
        &self,
        query: &str,
        affect: Option<&AffectState>,
        cognitive_load: Option<f64>,
        readiness: Option<ReadinessTier>,
    ) -> ThinkingDecision {
        let complexity = self.estimator.estimate(query);
        self.select_with_complexity(complexity, affect, cognitive_load, readiness)
    }

    /// Choose a mode from a precomputed complexity score.
    #[must_use]
    pub fn select_with_complexity(
        &self,
        complexity: f64,
        affect: Option<&AffectState>,
        cognitive_load: Option<f64>,
        readiness: Option<ReadinessTier>,
    ) -> ThinkingDecision {
        match self.try_select(complexity, affect, cognitive_load, readiness) {
            Ok(decision) => {
                info!(
                    mode = %decision.mode,
                    confidence = decision.confidence,
                    complexity = decision.factors.complexity,
                    estimated_time_ms = decision.estimated_time_ms,
                    "Thinking mode selected"
                );
                decision
            }
            Err(err) => {
                error!(error = %err, "Mode selection failed, falling back to hybrid");
                self.fallback_decision()
            }
        }
    }

    /// Compute the decision factors without deciding.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NotFinite`] if `complexity` is NaN or
    /// infinite. Every other input is repaired.
    pub fn factors(
        &self,
        complexity: f64,
        affect: Option<&AffectState>,
        cognitive_load: Option<f64>,
        readiness: Option<ReadinessTier>,
    ) -> Result<DecisionFactors, ValidationError> {
        if !complexity.is_finite() {
            return Err(ValidationError::NotFinite {
                field: "complexity".into(),
            });
        }

        let neutral;
        let affect = if let Some(state) = affect {
            state
        } else {
            warn!("No affect state supplied, using neutral defaults");
            neutral = AffectState::neutral();
            &neutral
        };

        let t = &self.thresholds;
        let base = self.emotions.lookup(affect.primary_emotion);
        let emotion = (1.0 - t.valence_weight) * base + t.valence_weight * affect.valence_unit();

        let load = 1.0 - self.repair_load(cognitive_load.unwrap_or(affect.cognitive_load));

        let tier = readiness.unwrap_or(affect.readiness);

        Ok(DecisionFactors {
            complexity: complexity.clamp(0.0, 1.0),
            emotion: emotion.clamp(0.0, 1.0),
            load,
            readiness: self.readiness.lookup(tier).clamp(0.0, 1.0),
        })
    }

    fn repair_load(&self, load: f64) -> f64 {
        if !load.is_finite() {
            warn!(
                cognitive_load = load,
                default = self.thresholds.default_load,
                "Cognitive load is not a number, using default"
            );
            return self.thresholds.default_load;
        }
        if !(0.0..=1.0).contains(&load) {
            let clamped = load.clamp(0.0, 1.0);
            warn!(
                cognitive_load = load,
                clamped, "Cognitive load out of range, clamping"
            );
            return clamped;
        }
        load
    }

    fn try_select(
        &self,
        complexity: f64,
        affect: Option<&AffectState>,
        cognitive_load: Option<f64>,
        readiness: Option<ReadinessTier>,
    ) -> Result<ThinkingDecision, ValidationError> {
        let factors = self.factors(complexity, affect, cognitive_load, readiness)?;

        let verdict = catch_unwind(AssertUnwindSafe(|| self.policy.decide(&factors))).map_err(
            |_| ValidationError::NotFinite {
                field: "policy verdict".into(),
            },
        )?;
        let confidence = ValidationError::check_unit_range(
            "policy confidence",
            verdict.confidence,
            0.0,
            1.0,
        )?;

        let (estimated_time_ms, estimated_tokens) = self.estimate(verdict.mode, factors.complexity);

        Ok(ThinkingDecision {
            mode: verdict.mode,
            confidence,
            rationale: verdict.rationale,
            factors,
            estimated_time_ms,
            estimated_tokens,
            is_fallback: false,
        })
    }

    /// Planning estimate of `(time_ms, tokens)` for `mode`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn estimate(&self, mode: ThinkingMode, complexity: f64) -> (u64, u32) {
        let estimates = &self.thresholds.estimates;
        let estimate: &ModeEstimate = match mode {
            ThinkingMode::Fast => &estimates.fast,
            ThinkingMode::Hybrid => &estimates.hybrid,
            ThinkingMode::Deliberate => &estimates.deliberate,
        };
        let c = complexity.clamp(0.0, 1.0);
        let time = estimate.time_per_complexity_ms.mul_add(c, estimate.base_time_ms);
        let tokens = estimate.tokens_per_complexity.mul_add(c, estimate.base_tokens);
        (time.max(0.0).round() as u64, tokens.max(0.0).round() as u32)
    }

    /// The Hybrid decision returned when selection itself fails.
    #[must_use]
    pub fn fallback_decision(&self) -> ThinkingDecision {
        let value = self.thresholds.fallback_confidence;
        let (estimated_time_ms, estimated_tokens) = self.estimate(ThinkingMode::Hybrid, value);
        ThinkingDecision {
            mode: ThinkingMode::Hybrid,
            confidence: value,
            rationale: "Mode selection failed; defaulting to hybrid".into(),
            factors: DecisionFactors::uniform(value),
            estimated_time_ms,
            estimated_tokens,
            is_fallback: true,
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::affect::Emotion;
    use crate::traits::MockThinkingPolicy;
    use crate::test_utils::{confident_affect, struggling_affect};
    use test_case::test_case;

    #[test]
    fn test_simple_query_confident_user_is_fast() {
        let decision = ModeSelector::default().select(
            "What is 2+2?",
            Some(&confident_affect()),
            None,
            None,
        );
        assert_eq!(decision.mode, ThinkingMode::Fast);
        assert!(decision.estimated_time_ms < 2000);
        assert!(!decision.is_fallback);
    }

    #[test]
    fn test_struggling_user_is_deliberate() {
        let decision = ModeSelector::default().select(
            "What is 2+2?",
            Some(&struggling_affect()),
            None,
            None,
        );
        assert_eq!(decision.mode, ThinkingMode::Deliberate);
        assert_eq!(decision.confidence, 0.85);
    }

    #[test]
    fn test_missing_affect_uses_neutral() {
        let selector = ModeSelector::default();
        let factors = selector.factors(0.5, None, None, None).unwrap();
        // neutral: 0.7 * 0.5 + 0.3 * 0.5
        assert!((factors.emotion - 0.5).abs() < 1e-12);
        assert_eq!(factors.load, 0.5);
        assert_eq!(factors.readiness, 0.5);
    }

    #[test_case(-0.5, 1.0; "negative clamps to zero load")]
    #[test_case(1.7, 0.0; "above one clamps to full load")]
    #[test_case(f64::NAN, 0.5; "nan defaults")]
    #[test_case(f64::INFINITY, 0.5; "infinity defaults")]
    fn test_bad_load_is_repaired(load: f64, expected_factor: f64) {
        let selector = ModeSelector::default();
        let factors = selector.factors(0.5, None, Some(load), None).unwrap();
        assert_eq!(factors.load, expected_factor);

        let decision = selector.select("anything", None, Some(load), None);
        assert!(!decision.is_fallback);
    }

    #[test]
    fn test_explicit_inputs_override_affect() {
        let selector = ModeSelector::default();
        let affect = confident_affect();
        let factors = selector
            .factors(0.1, Some(&affect), Some(0.9), Some(ReadinessTier::NotReady))
            .unwrap();
        assert!((factors.load - 0.1).abs() < 1e-12);
        assert_eq!(factors.readiness, 0.1);
    }

    #[test]
    fn test_emotion_blends_valence() {
        let selector = ModeSelector::default();
        let affect = AffectState::new(Emotion::Confident, 1.0, ReadinessTier::High, 0.2);
        let factors = selector.factors(0.1, Some(&affect), None, None).unwrap();
        // 0.7 * 0.9 + 0.3 * 1.0
        assert!((factors.emotion - 0.93).abs() < 1e-12);
    }

    #[test]
    fn test_nan_complexity_falls_back() {
        let decision = ModeSelector::default().select_with_complexity(f64::NAN, None, None, None);
        assert!(decision.is_fallback);
        assert_eq!(decision.mode, ThinkingMode::Hybrid);
        assert_eq!(decision.confidence, 0.5);
        assert_eq!(decision.factors, DecisionFactors::uniform(0.5));
    }

    #[test]
    fn test_policy_out_of_range_confidence_falls_back() {
        let mut policy = MockThinkingPolicy::new();
        policy
            .expect_decide()
            .returning(|_| PolicyVerdict::new(ThinkingMode::Fast, 1.5, "overconfident"));

        let selector = ModeSelector::default().with_policy(Arc::new(policy));
        let decision = selector.select("hello", None, None, None);
        assert!(decision.is_fallback);
    }

    #[test]
    fn test_panicking_policy_falls_back() {
        let mut policy = MockThinkingPolicy::new();
        policy.expect_decide().returning(|_| panic!("model crashed"));

        let selector = ModeSelector::default().with_policy(Arc::new(policy));
        let decision = selector.select("hello", None, None, None);
        assert!(decision.is_fallback);
        assert_eq!(decision.mode, ThinkingMode::Hybrid);
    }

    #[test]
    fn test_custom_policy_receives_factors() {
        let mut policy = MockThinkingPolicy::new();
        policy
            .expect_decide()
            .withf(|factors| factors.readiness == 1.0)
            .times(1)
            .returning(|_| PolicyVerdict::new(ThinkingMode::Deliberate, 0.6, "learned"));

        let selector = ModeSelector::default().with_policy(Arc::new(policy));
        let decision = selector.select("hi", None, None, Some(ReadinessTier::Optimal));
        assert_eq!(decision.mode, ThinkingMode::Deliberate);
        assert_eq!(decision.rationale, "learned");
    }

    #[test_case(ThinkingMode::Fast, 0.0, 500, 300)]
    #[test_case(ThinkingMode::Fast, 1.0, 1500, 1000)]
    #[test_case(ThinkingMode::Hybrid, 1.0, 4500, 2500)]
    #[test_case(ThinkingMode::Deliberate, 0.0, 3000, 1500)]
    #[test_case(ThinkingMode::Deliberate, 1.0, 8000, 4500)]
    fn test_estimates(mode: ThinkingMode, complexity: f64, time: u64, tokens: u32) {
        assert_eq!(
            ModeSelector::default().estimate(mode, complexity),
            (time, tokens)
        );
    }

    #[test]
    fn test_long_technical_query_is_deliberate() {
        let mut query = String::from(
            "Explain why the algorithm uses recursion and how entropy, quantum \
             entanglement and the derivative relate to this theorem",
        );
        while query.split_whitespace().count() < 150 {
            query.push_str(" with more context");
        }
        let decision =
            ModeSelector::default().select(&query, Some(&struggling_affect()), None, None);
        assert_eq!(decision.mode, ThinkingMode::Deliberate);
        assert!(decision.factors.complexity > 0.6);
    }
}
