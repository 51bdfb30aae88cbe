//! Test utilities and mock factories.
//!
//! This module provides shared testing infrastructure:
//! - Mock step generators and clocks
//! - Affect, budget and chain fixtures
//!
//! Only compiled for tests (`#[cfg(test)]`).

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::affect::{AffectState, Emotion, ReadinessTier};
use crate::budget::{BudgetFactors, BudgetMode, TokenBudget};
use crate::chain::{ReasoningChain, ReasoningStep};
use crate::error::GenerationError;
use crate::search::ReasoningStrategy;
use crate::selector::ThinkingMode;
use crate::traits::{MockStepGenerator, MockTimeProvider};

/// A fixed instant all fixtures start from.
#[must_use]
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
}

/// Confident, optimally ready, lightly loaded.
#[must_use]
pub const fn confident_affect() -> AffectState {
    AffectState::new(Emotion::Confident, 0.8, ReadinessTier::Optimal, 0.2)
}

/// Confused, barely ready, heavily loaded.
#[must_use]
pub const fn struggling_affect() -> AffectState {
    AffectState::new(Emotion::Confused, -0.6, ReadinessTier::Low, 0.8)
}

/// A Balanced 3600-token budget split evenly.
#[must_use]
pub const fn sample_budget() -> TokenBudget {
    TokenBudget {
        reasoning_tokens: 1800,
        response_tokens: 1800,
        total_tokens: 3600,
        mode: BudgetMode::Balanced,
        complexity: 0.5,
        reasoning_ratio: 0.5,
        factors: BudgetFactors::identity(),
        is_fallback: false,
    }
}

/// An open Hybrid chain started at `started_at` with no steps.
#[must_use]
pub fn chain_started_at(id: &str, started_at: DateTime<Utc>) -> ReasoningChain {
    ReasoningChain::new(
        id,
        "Why is the sky blue?",
        ThinkingMode::Hybrid,
        0.5,
        &sample_budget(),
        Some(AffectState::neutral()),
        started_at,
    )
}

/// An open chain with `steps` causal steps of confidence 0.75.
#[must_use]
pub fn sample_chain(id: &str, steps: usize) -> ReasoningChain {
    let mut chain = chain_started_at(id, base_time());
    for n in 1..=steps {
        chain
            .append_step(ReasoningStep::new(
                format!("Step {n}: light scatters because of its wavelength"),
                ReasoningStrategy::Causal,
                0.75,
            ))
            .expect("fixture step");
    }
    chain
}

/// A clock returning [`base_time`] plus each offset in turn, then repeating
/// the last one.
#[must_use]
pub fn fixed_clock(offsets_ms: &[i64]) -> MockTimeProvider {
    let times: Vec<DateTime<Utc>> = offsets_ms
        .iter()
        .map(|ms| base_time() + Duration::milliseconds(*ms))
        .collect();
    let calls = AtomicUsize::new(0);
    let mut mock = MockTimeProvider::new();
    mock.expect_now().returning(move || {
        let index = calls.fetch_add(1, Ordering::SeqCst).min(times.len() - 1);
        times[index]
    });
    mock
}

/// A generator returning `steps` in order, cycling when exhausted.
#[must_use]
pub fn mock_generator_sequence(steps: &[&str]) -> MockStepGenerator {
    let steps: Vec<String> = steps.iter().map(|s| (*s).to_string()).collect();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut mock = MockStepGenerator::new();
    mock.expect_generate_step().returning(move |_| {
        let index = calls.fetch_add(1, Ordering::SeqCst) % steps.len();
        Ok(steps[index].clone())
    });
    mock
}

/// A generator that always fails with `error`.
#[must_use]
pub fn mock_generator_failure(error: GenerationError) -> MockStepGenerator {
    let mut mock = MockStepGenerator::new();
    mock.expect_generate_step()
        .returning(move |_| Err(error.clone()));
    mock
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::StepRequest;
    use crate::traits::{StepGenerator, TimeProvider};

    #[tokio::test]
    async fn test_mock_generator_sequence_cycles() {
        let generator = mock_generator_sequence(&["a", "b"]);
        let request = StepRequest::new("q", Vec::new(), None, 0);
        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(generator.generate_step(&request).await.unwrap());
        }
        assert_eq!(seen, vec!["a", "b", "a"]);
    }

    #[tokio::test]
    async fn test_mock_generator_failure() {
        let generator = mock_generator_failure(GenerationError::EmptyResponse);
        let request = StepRequest::new("q", Vec::new(), None, 0);
        assert_eq!(
            generator.generate_step(&request).await,
            Err(GenerationError::EmptyResponse)
        );
    }

    #[test]
    fn test_fixed_clock_repeats_last() {
        let clock = fixed_clock(&[0, 250]);
        assert_eq!(clock.now(), base_time());
        assert_eq!(clock.now(), base_time() + Duration::milliseconds(250));
        assert_eq!(clock.now(), base_time() + Duration::milliseconds(250));
    }

    #[test]
    fn test_sample_chain_numbering() {
        let chain = sample_chain("c", 3);
        let numbers: Vec<usize> = chain.steps().iter().map(|s| s.step_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(sample_budget().is_consistent());
    }
}
