//! Reasoning chain model.
//!
//! A [`ReasoningChain`] is created when a request starts, grows by
//! [`ReasoningChain::append_step`], and ends with exactly one
//! [`ReasoningChain::complete`]. Steps are numbered by the chain in append
//! order; whatever number a step carried before is overwritten.

#![allow(clippy::cast_precision_loss)]

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::affect::AffectState;
use crate::budget::TokenBudget;
use crate::error::ChainError;
use crate::search::{ReasoningStrategy, SearchProvenance};
use crate::selector::ThinkingMode;

/// One element of a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningStep {
    /// Unique step identifier.
    pub id: String,
    /// 1-indexed position, assigned by the owning chain.
    pub step_number: usize,
    /// Step text.
    pub content: String,
    /// Inference kind.
    pub strategy: ReasoningStrategy,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Search statistics, when the step came from a tree search.
    pub provenance: Option<SearchProvenance>,
}

impl ReasoningStep {
    /// Create an unnumbered step. Confidence is clamped to `[0, 1]`; NaN
    /// becomes 0.
    #[must_use]
    pub fn new(content: impl Into<String>, strategy: ReasoningStrategy, confidence: f64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            id: Uuid::new_v4().to_string(),
            step_number: 0,
            content: content.into(),
            strategy,
            confidence,
            provenance: None,
        }
    }

    /// Attach search provenance.
    #[must_use]
    pub fn with_provenance(mut self, provenance: SearchProvenance) -> Self {
        self.provenance = Some(provenance);
        self
    }
}

/// The aggregate result for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningChain {
    id: String,
    query: String,
    steps: Vec<ReasoningStep>,
    mode: ThinkingMode,
    complexity_score: f64,
    reasoning_budget: u32,
    total_budget: u32,
    affect: Option<AffectState>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    conclusion: Option<String>,
    total_confidence: f64,
    processing_time_ms: u64,
    is_fallback: bool,
}

impl ReasoningChain {
    /// Start a chain.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        query: impl Into<String>,
        mode: ThinkingMode,
        complexity_score: f64,
        budget: &TokenBudget,
        affect: Option<AffectState>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            query: query.into(),
            steps: Vec::new(),
            mode,
            complexity_score,
            reasoning_budget: budget.reasoning_tokens,
            total_budget: budget.total_tokens,
            affect,
            started_at,
            completed_at: None,
            conclusion: None,
            total_confidence: 0.0,
            processing_time_ms: 0,
            is_fallback: false,
        }
    }

    /// Flag the chain as a fallback result.
    #[must_use]
    pub const fn into_fallback(mut self) -> Self {
        self.is_fallback = true;
        self
    }

    /// Append a step, numbering it `len + 1`.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::AlreadyCompleted`] after [`Self::complete`], or
    /// [`ChainError::EmptyStepContent`] for blank content.
    pub fn append_step(&mut self, mut step: ReasoningStep) -> Result<usize, ChainError> {
        if self.is_complete() {
            return Err(ChainError::AlreadyCompleted {
                chain_id: self.id.clone(),
            });
        }
        if step.content.trim().is_empty() {
            return Err(ChainError::EmptyStepContent);
        }
        step.step_number = self.steps.len() + 1;
        let number = step.step_number;
        self.steps.push(step);
        Ok(number)
    }

    /// Terminal transition: record the conclusion, mean confidence and
    /// elapsed time since `started_at`.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::AlreadyCompleted`] if called twice.
    pub fn complete(
        &mut self,
        conclusion: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), ChainError> {
        if self.is_complete() {
            return Err(ChainError::AlreadyCompleted {
                chain_id: self.id.clone(),
            });
        }
        self.total_confidence = self.average_confidence();
        self.processing_time_ms =
            u64::try_from((now - self.started_at).num_milliseconds()).unwrap_or(0);
        self.conclusion = Some(conclusion.into());
        self.completed_at = Some(now);
        Ok(())
    }

    /// Returns true once [`Self::complete`] has run.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Mean step confidence, or 0 with no steps.
    #[must_use]
    pub fn average_confidence(&self) -> f64 {
        if self.steps.is_empty() {
            return 0.0;
        }
        self.steps.iter().map(|s| s.confidence).sum::<f64>() / self.steps.len() as f64
    }

    /// Step count per strategy.
    #[must_use]
    pub fn strategy_distribution(&self) -> BTreeMap<ReasoningStrategy, usize> {
        let mut distribution = BTreeMap::new();
        for step in &self.steps {
            *distribution.entry(step.strategy).or_insert(0) += 1;
        }
        distribution
    }

    /// Chain identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The query being reasoned about.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Steps in append order.
    #[must_use]
    pub fn steps(&self) -> &[ReasoningStep] {
        &self.steps
    }

    /// Thinking mode the chain ran under.
    #[must_use]
    pub const fn mode(&self) -> ThinkingMode {
        self.mode
    }

    /// Complexity of the query.
    #[must_use]
    pub const fn complexity_score(&self) -> f64 {
        self.complexity_score
    }

    /// Reasoning share of the budget.
    #[must_use]
    pub const fn reasoning_budget(&self) -> u32 {
        self.reasoning_budget
    }

    /// Total budget.
    #[must_use]
    pub const fn total_budget(&self) -> u32 {
        self.total_budget
    }

    /// Affect snapshot taken at request start.
    #[must_use]
    pub const fn affect(&self) -> Option<&AffectState> {
        self.affect.as_ref()
    }

    /// Creation time.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Completion time.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Conclusion, once complete.
    #[must_use]
    pub fn conclusion(&self) -> Option<&str> {
        self.conclusion.as_deref()
    }

    /// Mean step confidence, fixed at completion.
    #[must_use]
    pub const fn total_confidence(&self) -> f64 {
        self.total_confidence
    }

    /// Milliseconds from creation to completion.
    #[must_use]
    pub const fn processing_time_ms(&self) -> u64 {
        self.processing_time_ms
    }

    /// True for the minimal chain built after a failure.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        self.is_fallback
    }
}
