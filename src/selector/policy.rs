//! Rule-based thinking policy.

use crate::config::ModeThresholds;
use crate::traits::ThinkingPolicy;

use super::types::{DecisionFactors, PolicyVerdict, ThinkingMode};

/// Ordered decision rules; the first match wins.
///
/// 1. High complexity forces Deliberate.
/// 2. Any struggling affect factor forces Deliberate.
/// 3. Low complexity with a high weighted score allows Fast.
/// 4. Very low complexity with a positive emotion allows Fast.
/// 5. Everything else is Hybrid.
#[derive(Debug, Clone, Default)]
pub struct HeuristicPolicy {
    thresholds: ModeThresholds,
}

impl HeuristicPolicy {
    /// Create a policy with custom thresholds.
    #[must_use]
    pub const fn new(thresholds: ModeThresholds) -> Self {
        Self { thresholds }
    }

    /// The thresholds in use.
    #[must_use]
    pub const fn thresholds(&self) -> &ModeThresholds {
        &self.thresholds
    }

    /// Weighted blend of all four factors.
    #[must_use]
    pub fn weighted_score(&self, factors: &DecisionFactors) -> f64 {
        let w = &self.thresholds.weights;
        w.complexity * factors.complexity
            + w.emotion * factors.emotion
            + w.load * factors.load
            + w.readiness * factors.readiness
    }
}

impl ThinkingPolicy for HeuristicPolicy {
    fn decide(&self, factors: &DecisionFactors) -> PolicyVerdict {
        let t = &self.thresholds;
        let complexity = factors.complexity;

        if complexity > t.deliberate_complexity {
            return PolicyVerdict::new(
                ThinkingMode::Deliberate,
                t.deliberate_confidence,
                format!("High complexity ({complexity:.2}) calls for deliberate reasoning"),
            );
        }

        let weakest = factors.weakest_affect();
        if weakest < t.struggling_factor {
            return PolicyVerdict::new(
                ThinkingMode::Deliberate,
                t.struggling_confidence,
                format!(
                    "User appears to be struggling (weakest factor {weakest:.2}); \
                     slowing down to reason explicitly"
                ),
            );
        }

        let score = self.weighted_score(factors);
        if complexity < t.fast_complexity && score > t.fast_weighted_score {
            return PolicyVerdict::new(
                ThinkingMode::Fast,
                t.fast_confidence,
                format!(
                    "Simple query ({complexity:.2}) and favourable state \
                     (score {score:.2}); answering directly"
                ),
            );
        }

        if complexity < t.quick_complexity && factors.emotion > t.quick_emotion {
            return PolicyVerdict::new(
                ThinkingMode::Fast,
                t.quick_confidence,
                format!(
                    "Very simple query ({complexity:.2}) and positive emotion ({:.2})",
                    factors.emotion
                ),
            );
        }

        PolicyVerdict::new(
            ThinkingMode::Hybrid,
            t.hybrid_confidence,
            format!("Moderate complexity ({complexity:.2}); balancing speed and depth"),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn factors(complexity: f64, emotion: f64, load: f64, readiness: f64) -> DecisionFactors {
        DecisionFactors {
            complexity,
            emotion,
            load,
            readiness,
        }
    }

    #[test_case(factors(0.71, 0.9, 0.9, 0.9), ThinkingMode::Deliberate, 0.9; "high complexity")]
    #[test_case(factors(0.2, 0.39, 0.9, 0.9), ThinkingMode::Deliberate, 0.85; "struggling emotion")]
    #[test_case(factors(0.2, 0.9, 0.9, 0.1), ThinkingMode::Deliberate, 0.85; "not ready")]
    #[test_case(factors(0.3, 0.9, 0.9, 1.0), ThinkingMode::Fast, 0.85; "weighted fast")]
    #[test_case(factors(0.1, 0.65, 0.5, 0.5), ThinkingMode::Fast, 0.90; "emotion fast")]
    #[test_case(factors(0.5, 0.5, 0.5, 0.5), ThinkingMode::Hybrid, 0.75; "hybrid default")]
    #[test_case(factors(0.7, 0.5, 0.5, 0.5), ThinkingMode::Hybrid, 0.75; "boundary is not high")]
    fn test_rules(input: DecisionFactors, mode: ThinkingMode, confidence: f64) {
        let verdict = HeuristicPolicy::default().decide(&input);
        assert_eq!(verdict.mode, mode);
        assert_eq!(verdict.confidence, confidence);
        assert!(!verdict.rationale.is_empty());
    }

    #[test]
    fn test_high_complexity_beats_struggling() {
        let verdict = HeuristicPolicy::default().decide(&factors(0.9, 0.1, 0.1, 0.1));
        assert_eq!(verdict.confidence, 0.9);
    }

    #[test]
    fn test_weighted_score() {
        let policy = HeuristicPolicy::default();
        let score = policy.weighted_score(&DecisionFactors::uniform(1.0));
        assert!((score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = ModeThresholds {
            deliberate_complexity: 0.4,
            ..ModeThresholds::default()
        };
        let verdict = HeuristicPolicy::new(thresholds).decide(&DecisionFactors::neutral());
        assert_eq!(verdict.mode, ThinkingMode::Deliberate);
    }
}
