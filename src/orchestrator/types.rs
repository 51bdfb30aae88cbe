//! Orchestrator request and response types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::affect::AffectState;
use crate::budget::TokenBudget;
use crate::chain::ReasoningChain;
use crate::selector::{ThinkingDecision, ThinkingMode};

/// Input to `generate_chain`.
///
/// The id is assigned up front so the caller can cancel the request before
/// it returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainRequest {
    /// Chain identifier.
    pub id: String,
    /// The query to reason about.
    pub query: String,
    /// Affect snapshot.
    pub affect: Option<AffectState>,
    /// Cognitive load override.
    pub cognitive_load: Option<f64>,
    /// Thinking mode to run under.
    pub mode: ThinkingMode,
    /// Budget the chain may spend.
    pub budget: TokenBudget,
}

impl ChainRequest {
    /// Create a request with a fresh id.
    #[must_use]
    pub fn new(query: impl Into<String>, mode: ThinkingMode, budget: TokenBudget) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            query: query.into(),
            affect: None,
            cognitive_load: None,
            mode,
            budget,
        }
    }

    /// Use a caller-chosen id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
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
}

/// Result of the full select, allocate and search pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkingOutcome {
    /// Mode decision.
    pub decision: ThinkingDecision,
    /// Token grant.
    pub budget: TokenBudget,
    /// Reasoning chain; `None` in Fast mode.
    pub chain: Option<ReasoningChain>,
}
