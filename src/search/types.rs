//! Path search types.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::affect::AffectState;
use crate::chain::ReasoningStep;

/// Marker conclusion for a search that never expanded.
pub const EMPTY_PATH_CONCLUSION: &str = "No reasoning steps generated";

/// What the step generator is asked to continue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRequest {
    /// The original query.
    pub query: String,
    /// Step contents from the root down to the node being expanded.
    pub path: Vec<String>,
    /// Affect snapshot for tone and pacing.
    pub affect: Option<AffectState>,
    /// Depth of the node being expanded.
    pub depth: usize,
}

impl StepRequest {
    /// Create a request.
    #[must_use]
    pub fn new(
        query: impl Into<String>,
        path: Vec<String>,
        affect: Option<AffectState>,
        depth: usize,
    ) -> Self {
        Self {
            query: query.into(),
            path,
            affect,
            depth,
        }
    }

    /// The path so far as numbered lines, or `"No previous steps"`.
    #[must_use]
    pub fn path_context(&self) -> String {
        if self.path.is_empty() {
            return "No previous steps".into();
        }
        let mut context = String::new();
        for (index, step) in self.path.iter().enumerate() {
            if index > 0 {
                context.push('\n');
            }
            let _ = write!(context, "Step {}: {step}", index + 1);
        }
        context
    }

    /// A complete expansion prompt for text-completion generators.
    #[must_use]
    pub fn prompt(&self) -> String {
        format!(
            "You are reasoning through a problem step-by-step.\n\n\
             Original Query: {query}\n\n\
             Previous Reasoning Steps:\n{context}\n\n\
             Generate the NEXT logical reasoning step. Be specific and clear.\n\
             Focus on ONE reasoning action:\n\
             - Break down the problem\n\
             - Identify key concepts\n\
             - Make a logical deduction\n\
             - Consider an example\n\
             - Draw a conclusion\n\n\
             Next Step:",
            query = self.query,
            context = self.path_context(),
        )
    }
}

/// Where in the search tree a step came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchProvenance {
    /// Arena index of the node.
    pub node_index: usize,
    /// Visit count at extraction.
    pub visits: u32,
    /// Mean simulated value at extraction.
    pub mean_value: f64,
    /// UCB1 score at extraction; `None` when infinite.
    pub ucb_score: Option<f64>,
}

/// Counters describing one search run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Iterations completed.
    pub iterations: usize,
    /// Nodes attached to the tree.
    pub expansions: usize,
    /// Generator calls that produced nothing usable.
    pub misses: usize,
    /// True if the search stopped on a cancellation signal.
    pub cancelled: bool,
}

/// The best chain of steps found by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningPath {
    /// Steps from the root's best child down to a leaf.
    pub steps: Vec<ReasoningStep>,
    /// Mean value of the final node.
    pub total_value: f64,
    /// Path confidence; equal to `total_value`.
    pub confidence: f64,
    /// Last step's content, or [`EMPTY_PATH_CONCLUSION`].
    pub conclusion: String,
    /// Run counters.
    pub stats: SearchStats,
}

impl ReasoningPath {
    /// A path with no steps.
    #[must_use]
    pub fn empty(stats: SearchStats) -> Self {
        Self {
            steps: Vec::new(),
            total_value: 0.0,
            confidence: 0.0,
            conclusion: EMPTY_PATH_CONCLUSION.into(),
            stats,
        }
    }

    /// Returns true if no step was extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_path_context_empty() {
        let request = StepRequest::new("q", Vec::new(), None, 0);
        assert_eq!(request.path_context(), "No previous steps");
    }

    #[test]
    fn test_path_context_numbers_from_root() {
        let request = StepRequest::new("q", vec!["define terms".into(), "apply rule".into()], None, 2);
        assert_eq!(
            request.path_context(),
            "Step 1: define terms\nStep 2: apply rule"
        );
    }

    #[test]
    fn test_prompt_embeds_query_and_context() {
        let request = StepRequest::new("Why is the sky blue?", vec!["light scatters".into()], None, 1);
        let prompt = request.prompt();
        assert!(prompt.contains("Original Query: Why is the sky blue?"));
        assert!(prompt.contains("Step 1: light scatters"));
        assert!(prompt.ends_with("Next Step:"));
    }

    #[test]
    fn test_empty_path() {
        let path = ReasoningPath::empty(SearchStats::default());
        assert!(path.is_empty());
        assert_eq!(path.conclusion, EMPTY_PATH_CONCLUSION);
    }
}
