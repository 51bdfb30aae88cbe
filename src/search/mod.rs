//! Tree search over reasoning steps.
//!
//! Each iteration runs the four classic phases over a [`SearchTree`]:
//! - **Selection**: descend by UCB1 until a childless node
//! - **Expansion**: ask the [`StepGenerator`] for up to `expansion_width`
//!   continuations of the selected path and descend into the first
//! - **Simulation**: score the node with a static proxy (depth, length and
//!   strategy diversity), with no further generator calls
//! - **Backpropagation**: add the score to every ancestor
//!
//! After at most `min(max_iterations, max_steps)` iterations the path of
//! highest mean value is extracted. Generator failures cost one expansion
//! and are never propagated. Cancellation is checked before every
//! iteration and also interrupts an in-flight generator call; the best path
//! found so far is still returned.

#![allow(clippy::cast_precision_loss)]

mod strategy;
mod tree;
mod types;

pub use strategy::ReasoningStrategy;
pub use tree::{NodeId, SearchNode, SearchTree};
pub use types::{
    ReasoningPath, SearchProvenance, SearchStats, StepRequest, EMPTY_PATH_CONCLUSION,
};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::affect::AffectState;
use crate::chain::ReasoningStep;
use crate::config::SearchConfig;
use crate::error::GenerationError;
use crate::traits::StepGenerator;

/// Grows one tree per call; trees are never shared across requests.
#[derive(Clone)]
pub struct PathSearchEngine {
    config: SearchConfig,
    generator: Arc<dyn StepGenerator>,
}

impl std::fmt::Debug for PathSearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathSearchEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PathSearchEngine {
    /// Create an engine.
    #[must_use]
    pub fn new(config: SearchConfig, generator: Arc<dyn StepGenerator>) -> Self {
        Self { config, generator }
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search for the best path of at most `max_steps` steps.
    pub async fn search(
        &self,
        query: &str,
        affect: Option<&AffectState>,
        max_steps: usize,
        cancel: &CancellationToken,
    ) -> ReasoningPath {
        let iterations = self.config.max_iterations.min(max_steps);
        let exploration = self.config.exploration_constant;
        let mut tree = SearchTree::new();
        let mut stats = SearchStats::default();

        info!(max_steps, iterations, "Starting path search");

        for iteration in 0..iterations {
            if cancel.is_cancelled() {
                info!(iteration, "Search cancelled, extracting best path so far");
                stats.cancelled = true;
                break;
            }

            let mut node = tree.select(exploration);

            if tree.node(node).depth < max_steps {
                if let Some(child) = self
                    .expand(&mut tree, node, query, affect, cancel, &mut stats)
                    .await
                {
                    node = child;
                }
            }

            let value = self.simulate(&tree, node);
            tree.backpropagate(node, value);
            stats.iterations += 1;

            debug!(
                iteration = iteration + 1,
                depth = tree.node(node).depth,
                value,
                "Search iteration complete"
            );
        }

        let path = self.extract(&tree, stats);
        info!(
            steps = path.steps.len(),
            value = path.total_value,
            expansions = stats.expansions,
            misses = stats.misses,
            cancelled = stats.cancelled,
            "Path search complete"
        );
        path
    }

    async fn expand(
        &self,
        tree: &mut SearchTree,
        parent: NodeId,
        query: &str,
        affect: Option<&AffectState>,
        cancel: &CancellationToken,
        stats: &mut SearchStats,
    ) -> Option<NodeId> {
        let request = StepRequest::new(
            query,
            tree.path_contents(parent),
            affect.cloned(),
            tree.node(parent).depth,
        );

        let mut first = None;
        for _ in 0..self.config.expansion_width.max(1) {
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    stats.cancelled = true;
                    break;
                }
                outcome = self.generator.generate_step(&request) => outcome,
            };

            match outcome.and_then(non_empty) {
                Ok(content) => {
                    let strategy = ReasoningStrategy::infer(&content);
                    let child = tree.add_child(parent, content, strategy);
                    stats.expansions += 1;
                    debug!(
                        depth = tree.node(child).depth,
                        strategy = %strategy,
                        "Expanded search node"
                    );
                    first.get_or_insert(child);
                }
                Err(err) => {
                    stats.misses += 1;
                    warn!(
                        error = %err,
                        transient = err.is_transient(),
                        depth = request.depth,
                        "Step generation failed, skipping expansion"
                    );
                }
            }
        }
        first
    }

    /// Static value proxy for `node`, in `[0, 1]`.
    #[must_use]
    pub fn simulate(&self, tree: &SearchTree, node: NodeId) -> f64 {
        let c = &self.config;
        let current = tree.node(node);
        let depth = (current.depth as f64 / c.depth_horizon).min(1.0);
        let length = (current.word_count() as f64 / c.length_horizon).min(1.0);
        let diversity =
            tree.distinct_strategies(node) as f64 / ReasoningStrategy::ALL.len() as f64;
        c.depth_weight * depth + c.length_weight * length + c.diversity_weight * diversity
    }

    fn extract(&self, tree: &SearchTree, stats: SearchStats) -> ReasoningPath {
        let best = tree.best_path();
        let Some(&leaf) = best.last() else {
            return ReasoningPath::empty(stats);
        };

        let steps: Vec<ReasoningStep> = best
            .iter()
            .enumerate()
            .map(|(index, &id)| {
                let node = tree.node(id);
                let confidence = if node.visits == 0 {
                    0.5
                } else {
                    node.mean_value()
                };
                let ucb = tree.ucb(id, self.config.exploration_constant);
                let mut step = ReasoningStep::new(
                    node.content.clone(),
                    node.strategy.unwrap_or(ReasoningStrategy::Deductive),
                    confidence,
                )
                .with_provenance(SearchProvenance {
                    node_index: id.index(),
                    visits: node.visits,
                    mean_value: node.mean_value(),
                    ucb_score: ucb.is_finite().then_some(ucb),
                });
                step.step_number = index + 1;
                step
            })
            .collect();

        let total_value = tree.node(leaf).mean_value();
        let conclusion = steps
            .last()
            .map_or_else(|| EMPTY_PATH_CONCLUSION.to_string(), |s| s.content.clone());

        ReasoningPath {
            steps,
            total_value,
            confidence: total_value,
            conclusion,
            stats,
        }
    }
}

fn non_empty(content: String) -> Result<String, GenerationError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        Err(GenerationError::EmptyResponse)
    } else {
        Ok(trimmed.to_string())
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
    use crate::traits::MockStepGenerator;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn engine(generator: MockStepGenerator) -> PathSearchEngine {
        PathSearchEngine::new(SearchConfig::default(), Arc::new(generator))
    }

    fn counting_generator() -> MockStepGenerator {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut mock = MockStepGenerator::new();
        mock.expect_generate_step().returning(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("Step {n} therefore follows from the previous observation"))
        });
        mock
    }

    #[tokio::test]
    async fn test_search_builds_bounded_path() {
        let engine = engine(counting_generator());
        let path = engine
            .search("Why?", None, 3, &CancellationToken::new())
            .await;

        assert!(!path.is_empty());
        assert!(path.steps.len() <= 3);
        assert_eq!(path.stats.iterations, 3);
        for (index, step) in path.steps.iter().enumerate() {
            assert_eq!(step.step_number, index + 1);
            assert!(step.provenance.is_some());
        }
        assert_eq!(path.conclusion, path.steps.last().unwrap().content);
        assert_eq!(path.confidence, path.total_value);
    }

    #[tokio::test]
    async fn test_iterations_capped_by_config() {
        let config = SearchConfig {
            max_iterations: 2,
            ..SearchConfig::default()
        };
        let engine = PathSearchEngine::new(config, Arc::new(counting_generator()));
        let path = engine
            .search("q", None, 8, &CancellationToken::new())
            .await;
        assert_eq!(path.stats.iterations, 2);
    }

    #[tokio::test]
    async fn test_failing_generator_yields_empty_path() {
        let mut mock = MockStepGenerator::new();
        mock.expect_generate_step().returning(|_| {
            Err(GenerationError::Unavailable {
                message: "offline".into(),
            })
        });

        let path = engine(mock)
            .search("q", None, 4, &CancellationToken::new())
            .await;

        assert!(path.is_empty());
        assert_eq!(path.conclusion, EMPTY_PATH_CONCLUSION);
        assert_eq!(path.stats.iterations, 4);
        assert_eq!(path.stats.misses, 4);
        assert_eq!(path.stats.expansions, 0);
    }

    #[tokio::test]
    async fn test_blank_step_counts_as_miss() {
        let mut mock = MockStepGenerator::new();
        mock.expect_generate_step().returning(|_| Ok("   ".into()));

        let path = engine(mock)
            .search("q", None, 2, &CancellationToken::new())
            .await;
        assert!(path.is_empty());
        assert_eq!(path.stats.misses, 2);
    }

    #[tokio::test]
    async fn test_generator_sees_path_so_far() {
        let mut mock = MockStepGenerator::new();
        mock.expect_generate_step().returning(|req| {
            assert_eq!(req.path.len(), req.depth);
            Ok(format!("depth {} step", req.depth))
        });

        let path = engine(mock)
            .search("q", None, 3, &CancellationToken::new())
            .await;
        assert_eq!(path.steps[0].content, "depth 0 step");
    }

    #[tokio::test]
    async fn test_zero_steps_runs_nothing() {
        let mut mock = MockStepGenerator::new();
        mock.expect_generate_step().never();

        let path = engine(mock)
            .search("q", None, 0, &CancellationToken::new())
            .await;
        assert!(path.is_empty());
        assert_eq!(path.stats.iterations, 0);
    }

    #[tokio::test]
    async fn test_pre_cancelled_search_stops_immediately() {
        let mut mock = MockStepGenerator::new();
        mock.expect_generate_step().never();

        let token = CancellationToken::new();
        token.cancel();
        let path = engine(mock).search("q", None, 5, &token).await;

        assert!(path.stats.cancelled);
        assert_eq!(path.stats.iterations, 0);
        assert!(path.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_mid_search_keeps_progress() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let counter = Arc::new(AtomicUsize::new(0));
        let mut mock = MockStepGenerator::new();
        mock.expect_generate_step().returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 1 {
                trigger.cancel();
            }
            Ok("then we observe the pattern".into())
        });

        let path = engine(mock).search("q", None, 8, &token).await;

        assert!(path.stats.cancelled);
        assert_eq!(path.stats.iterations, 2);
        assert!(!path.is_empty());
    }

    #[tokio::test]
    async fn test_expansion_width_adds_siblings() {
        let config = SearchConfig {
            expansion_width: 3,
            max_iterations: 1,
            ..SearchConfig::default()
        };
        let engine = PathSearchEngine::new(config, Arc::new(counting_generator()));
        let path = engine
            .search("q", None, 5, &CancellationToken::new())
            .await;

        assert_eq!(path.stats.expansions, 3);
        // descends into the first sibling
        assert_eq!(path.steps.len(), 1);
        assert!(path.steps[0].content.starts_with("Step 1 "));
    }

    #[test]
    fn test_simulate_weights() {
        let engine = engine(MockStepGenerator::new());
        let mut tree = SearchTree::new();
        let words = vec!["word"; 50].join(" ");
        let a = tree.add_child(tree.root(), words, ReasoningStrategy::Causal);

        // 0.4 * 1/5 + 0.4 * 1 + 0.2 * 1/6
        let expected = 0.4 * 0.2 + 0.4 + 0.2 / 6.0;
        assert!((engine.simulate(&tree, a) - expected).abs() < 1e-12);
        assert_eq!(engine.simulate(&tree, tree.root()), 0.0);
    }

    #[test]
    fn test_simulate_stays_in_unit_interval() {
        let engine = engine(MockStepGenerator::new());
        let mut tree = SearchTree::new();
        let mut node = tree.root();
        for strategy in ReasoningStrategy::ALL.iter().cycle().take(9) {
            node = tree.add_child(node, vec!["x"; 80].join(" "), *strategy);
        }
        let value = engine.simulate(&tree, node);
        assert!((value - 1.0).abs() < 1e-12);
    }
}
