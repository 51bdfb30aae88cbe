//! Trait definitions for swappable collaborators.
//!
//! This module defines traits for:
//! - [`StepGenerator`]: the generative step-continuation capability
//! - [`ChainStore`]: optional chain persistence
//! - [`TokenCeiling`]: the provider's hard token limit
//! - [`ThinkingPolicy`]: the mode decision rule set
//! - [`TimeProvider`]: time abstraction for testing
//!
//! # Mocking
//!
//! All traits are annotated with `#[cfg_attr(test, mockall::automock)]`
//! which generates mock implementations automatically for testing.
//!
//! # Example
//!
//! ```
//! use deep_thinking::traits::{FixedCeiling, RealTimeProvider, TimeProvider, TokenCeiling};
//!
//! let time_provider = RealTimeProvider;
//! let now = time_provider.now();
//! println!("Current time: {now}");
//!
//! assert_eq!(FixedCeiling::new(8192).max_tokens(), 8192);
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::budget::TokenBudget;
use crate::chain::ReasoningChain;
use crate::error::{GenerationError, StorageError};
use crate::search::StepRequest;
use crate::selector::{DecisionFactors, PolicyVerdict};

/// Step-generation capability.
///
/// Produces one text continuation of a partial reasoning path. This is the
/// only call in the search that may incur external latency or cost.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StepGenerator: Send + Sync {
    /// Generate the next reasoning step.
    ///
    /// # Arguments
    ///
    /// * `request` - The query, the path so far and the affect snapshot
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError`] if no continuation could be produced.
    /// The search treats this as a soft miss.
    async fn generate_step(&self, request: &StepRequest) -> Result<String, GenerationError>;
}

/// Chain persistence capability.
///
/// Saves are fire-and-forget from the orchestrator's point of view: core
/// behaviour is identical with or without a store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainStore: Send + Sync {
    /// Persist a completed chain with the budget it ran under.
    ///
    /// The affect snapshot travels on the chain itself.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the database operation fails.
    async fn save_chain(
        &self,
        chain: &ReasoningChain,
        budget: &TokenBudget,
    ) -> Result<(), StorageError>;

    /// Load a chain by ID.
    ///
    /// Returns `None` if the chain doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the database operation fails.
    async fn load_chain(&self, id: &str) -> Result<Option<ReasoningChain>, StorageError>;

    /// Most recently started chains, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the database operation fails.
    async fn recent_chains(&self, limit: u32) -> Result<Vec<ReasoningChain>, StorageError>;
}

/// Resource-limit capability.
#[cfg_attr(test, mockall::automock)]
pub trait TokenCeiling: Send + Sync {
    /// The provider's hard per-request token limit.
    fn max_tokens(&self) -> u32;
}

/// A ceiling fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedCeiling(u32);

impl FixedCeiling {
    /// Create a fixed ceiling.
    #[must_use]
    pub const fn new(max_tokens: u32) -> Self {
        Self(max_tokens)
    }
}

impl TokenCeiling for FixedCeiling {
    fn max_tokens(&self) -> u32 {
        self.0
    }
}

/// Thinking-mode decision rules.
///
/// The heuristic rule set is one implementation; a learned model plugs in
/// by satisfying the same contract. Implementations must return a
/// confidence in `[0, 1]`.
#[cfg_attr(test, mockall::automock)]
pub trait ThinkingPolicy: Send + Sync {
    /// Choose a mode from normalized factors.
    fn decide(&self, factors: &DecisionFactors) -> PolicyVerdict;
}

/// Time provider trait for deterministic testing.
///
/// This trait abstracts time operations to allow for
/// deterministic testing by providing fixed timestamps.
#[cfg_attr(test, mockall::automock)]
pub trait TimeProvider: Send + Sync {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Real time provider using system clock.
///
/// This is the production implementation that returns the actual current time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealTimeProvider;

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::float_cmp
)]
mod tests {
    use super::*;
    use crate::selector::ThinkingMode;
    use crate::test_utils::{sample_budget, sample_chain};
    use static_assertions::assert_impl_all;

    assert_impl_all!(RealTimeProvider: Send, Sync, Clone, Copy, Default);
    assert_impl_all!(FixedCeiling: Send, Sync, Clone, Copy);

    #[test]
    fn test_real_time_provider_now() {
        let provider = RealTimeProvider;
        let before = Utc::now();
        let now = provider.now();
        let after = Utc::now();
        assert!(now >= before);
        assert!(now <= after);
    }

    #[test]
    fn test_fixed_ceiling() {
        let ceiling = FixedCeiling::new(4096);
        assert_eq!(ceiling.max_tokens(), 4096);
    }

    #[tokio::test]
    async fn test_mock_step_generator() {
        let mut mock = MockStepGenerator::new();
        mock.expect_generate_step()
            .returning(|req| Ok(format!("Consider {}", req.query)));

        let request = StepRequest::new("gravity", Vec::new(), None, 0);
        let step = mock.generate_step(&request).await.unwrap();
        assert_eq!(step, "Consider gravity");
    }

    #[tokio::test]
    async fn test_mock_step_generator_error() {
        let mut mock = MockStepGenerator::new();
        mock.expect_generate_step()
            .returning(|_| Err(GenerationError::Timeout { elapsed_ms: 30 }));

        let request = StepRequest::new("gravity", Vec::new(), None, 0);
        let result = mock.generate_step(&request).await;
        assert!(matches!(result, Err(GenerationError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_mock_chain_store_save() {
        let mut mock = MockChainStore::new();
        mock.expect_save_chain().times(1).returning(|_, _| Ok(()));

        let chain = sample_chain("chain-1", 2);
        let result = mock.save_chain(&chain, &sample_budget()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_mock_chain_store_load_not_found() {
        let mut mock = MockChainStore::new();
        mock.expect_load_chain()
            .with(mockall::predicate::eq("missing"))
            .returning(|_| Ok(None));

        assert!(mock.load_chain("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mock_chain_store_error() {
        let mut mock = MockChainStore::new();
        mock.expect_recent_chains().returning(|_| {
            Err(StorageError::ConnectionFailed {
                message: "Test error".to_string(),
            })
        });

        let result = mock.recent_chains(5).await;
        assert!(matches!(result, Err(StorageError::ConnectionFailed { .. })));
    }

    #[test]
    fn test_mock_thinking_policy() {
        let mut mock = MockThinkingPolicy::new();
        mock.expect_decide().returning(|_| PolicyVerdict {
            mode: ThinkingMode::Fast,
            confidence: 1.0,
            rationale: "always fast".into(),
        });

        let verdict = mock.decide(&DecisionFactors::neutral());
        assert_eq!(verdict.mode, ThinkingMode::Fast);
    }

    #[test]
    fn test_mock_time_provider_multiple_calls() {
        let time1 = Utc::now();
        let time2 = time1 + chrono::Duration::hours(1);

        let mut mock = MockTimeProvider::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_now()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(time1);
        mock.expect_now()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(time2);

        assert_eq!(mock.now(), time1);
        assert_eq!(mock.now(), time2);
    }
}
