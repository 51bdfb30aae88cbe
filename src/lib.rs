//! Deep Thinking
//!
//! An affect-aware reasoning core. For each query plus a snapshot of the
//! user's emotional and cognitive state it decides how hard to think, how to
//! split a token budget between reasoning and answer, and how to build a
//! multi-step reasoning chain by tree search over generated steps.
//!
//! # Features
//!
//! - Deterministic complexity scoring of free text
//! - Fast / Hybrid / Deliberate mode selection behind a swappable policy
//! - Token budgets that never exceed the provider ceiling
//! - UCB1 tree search over reasoning steps with cooperative cancellation
//! - Chain generation that always returns a well-formed result
//! - Optional `SQLite` chain persistence
//!
//! # Quick Start
//!
//! ```
//! use deep_thinking::orchestrator::Orchestrator;
//! use deep_thinking::selector::ThinkingMode;
//!
//! let orchestrator = Orchestrator::builder().build().unwrap();
//! let decision = orchestrator.select_mode("What is 2+2?", None, None, None);
//! assert_ne!(decision.mode, ThinkingMode::Deliberate);
//! ```
//!
//! # Architecture
//!
//! ```text
//! query + affect
//!      │
//!      ▼
//! ┌────────────┐   ┌───────────────┐   ┌──────────────────┐
//! │ Complexity │──▶│ Mode Selector │──▶│ Budget Allocator │
//! └────────────┘   └───────────────┘   └────────┬─────────┘
//!                                               ▼
//!                  ┌──────────────┐    ┌──────────────────┐
//!                  │ StepGenerator│◀───│   Path Search    │
//!                  └──────────────┘    └────────┬─────────┘
//!                                               ▼
//!                                      ReasoningChain ──▶ ChainStore
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod affect;
pub mod budget;
pub mod chain;
pub mod complexity;
pub mod config;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod search;
pub mod selector;
pub mod storage;
pub mod telemetry;
pub mod traits;

#[cfg(test)]
mod test_utils;

pub use affect::{AffectState, Emotion, ReadinessTier};
pub use budget::{BudgetAllocator, BudgetMode, BudgetRequest, TokenBudget};
pub use chain::{ReasoningChain, ReasoningStep};
pub use complexity::{estimate_complexity, ComplexityEstimator};
pub use config::Config;
pub use error::{AppError, ValidationError};
pub use orchestrator::{ChainRequest, Orchestrator, OrchestratorBuilder, ThinkingOutcome};
pub use search::{PathSearchEngine, ReasoningPath, ReasoningStrategy, StepRequest};
pub use selector::{ModeSelector, ThinkingDecision, ThinkingMode};
pub use traits::{ChainStore, StepGenerator};
