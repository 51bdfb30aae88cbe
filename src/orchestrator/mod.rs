//! Request orchestration.
//!
//! The [`Orchestrator`] sequences mode selection, budget allocation and path
//! search, assembles the [`ReasoningChain`], and guarantees that
//! [`Orchestrator::generate_chain`] always returns a completed chain:
//!
//! - no step generator configured: one deterministic analysis step
//! - search produced nothing: the same one-step chain
//! - internal error or panic: the same one-step chain, logged at `error`
//!
//! Every in-flight chain is registered under its id so [`Orchestrator::cancel`]
//! can stop its search early.

mod types;

pub use types::{ChainRequest, ThinkingOutcome};

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::affect::{AffectState, ReadinessTier};
use crate::budget::{BudgetAllocator, BudgetRequest, TokenBudget};
use crate::chain::{ReasoningChain, ReasoningStep};
use crate::config::{validate_config, Config, DepthPolicy};
use crate::error::{AppError, ChainError, ConfigError, ValidationError};
use crate::metrics::{ChainEvent, ChainMetrics, FallbackEvent};
use crate::search::{PathSearchEngine, ReasoningStrategy};
use crate::selector::{ModeSelector, ThinkingDecision, ThinkingMode};
use crate::storage::SqliteChainStore;
use crate::traits::{
    ChainStore, FixedCeiling, RealTimeProvider, StepGenerator, ThinkingPolicy, TimeProvider,
    TokenCeiling,
};

/// Confidence of the one-step fallback chain.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Characters of the query quoted in the fallback step.
pub const FALLBACK_QUERY_CHARS: usize = 100;

/// The content of the one-step fallback chain for `query`.
#[must_use]
pub fn fallback_step_content(query: &str) -> String {
    let truncated: String = query.chars().take(FALLBACK_QUERY_CHARS).collect();
    format!("Analyzing: {truncated}...")
}

/// Builder for [`Orchestrator`].
#[derive(Default)]
pub struct OrchestratorBuilder {
    config: Config,
    generator: Option<Arc<dyn StepGenerator>>,
    store: Option<Arc<dyn ChainStore>>,
    clock: Option<Arc<dyn TimeProvider>>,
    ceiling: Option<Arc<dyn TokenCeiling>>,
    policy: Option<Arc<dyn ThinkingPolicy>>,
    metrics: Option<Arc<ChainMetrics>>,
}

impl OrchestratorBuilder {
    /// Start from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config`.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Set the step generator. Without one every chain is a fallback.
    #[must_use]
    pub fn generator(mut self, generator: Arc<dyn StepGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Persist completed chains to `store`.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn ChainStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replace the provider ceiling; defaults to the configured maximum.
    #[must_use]
    pub fn ceiling(mut self, ceiling: Arc<dyn TokenCeiling>) -> Self {
        self.ceiling = Some(ceiling);
        self
    }

    /// Replace the heuristic mode policy.
    #[must_use]
    pub fn policy(mut self, policy: Arc<dyn ThinkingPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Share a metrics collector.
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<ChainMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build, opening a [`SqliteChainStore`] at the configured
    /// `database_path` unless a store was injected.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] if the configuration is invalid, or
    /// [`AppError::Storage`] if the database cannot be opened.
    pub async fn build_with_store(mut self) -> Result<Orchestrator, AppError> {
        validate_config(&self.config)?;
        if self.store.is_none() {
            if let Some(path) = self.config.database_path.clone() {
                let store = SqliteChainStore::new(&path).await?;
                self.store = Some(Arc::new(store));
            }
        }
        Ok(self.build()?)
    }

    /// Validate the configuration and build.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the configuration is invalid.
    pub fn build(self) -> Result<Orchestrator, ConfigError> {
        validate_config(&self.config)?;
        let config = self.config;

        let mut selector = ModeSelector::new(config.thresholds.clone());
        if let Some(policy) = self.policy {
            selector = selector.with_policy(policy);
        }

        Ok(Orchestrator {
            selector,
            allocator: BudgetAllocator::new(config.budget.clone()),
            search: self
                .generator
                .map(|generator| PathSearchEngine::new(config.search.clone(), generator)),
            store: self.store,
            clock: self.clock.unwrap_or_else(|| Arc::new(RealTimeProvider)),
            ceiling: self.ceiling.unwrap_or_else(|| {
                Arc::new(FixedCeiling::new(config.budget.provider_max_tokens))
            }),
            depth: config.depth,
            in_flight: Mutex::new(HashMap::new()),
            next_serial: AtomicU64::new(0),
            metrics: self.metrics.unwrap_or_default(),
        })
    }
}

/// Composes the reasoning core for one process.
///
/// Holds immutable components plus the in-flight cancellation registry;
/// share it behind an `Arc` to serve concurrent requests.
pub struct Orchestrator {
    selector: ModeSelector,
    allocator: BudgetAllocator,
    search: Option<PathSearchEngine>,
    store: Option<Arc<dyn ChainStore>>,
    clock: Arc<dyn TimeProvider>,
    ceiling: Arc<dyn TokenCeiling>,
    depth: DepthPolicy,
    in_flight: Registry,
    next_serial: AtomicU64,
    metrics: Arc<ChainMetrics>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("selector", &self.selector)
            .field("allocator", &self.allocator)
            .field("search", &self.search)
            .field("has_store", &self.store.is_some())
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

type Registry = Mutex<HashMap<String, (u64, CancellationToken)>>;

/// Removes a chain from the in-flight registry when dropped.
struct InFlight<'a> {
    registry: &'a Registry,
    id: String,
    serial: u64,
    token: CancellationToken,
}

impl<'a> InFlight<'a> {
    fn register(registry: &'a Registry, serial: u64, id: &str) -> Self {
        let token = CancellationToken::new();
        match registry.lock() {
            Ok(mut map) => {
                if map.insert(id.to_string(), (serial, token.clone())).is_some() {
                    warn!(chain_id = %id, "Chain id already in flight, replacing its cancel handle");
                }
            }
            Err(poison_error) => {
                error!(chain_id = %id, error = %poison_error, "In-flight registry poisoned");
            }
        }
        Self {
            registry,
            id: id.to_string(),
            serial,
            token,
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut map) = self.registry.lock() {
            // a newer request may have reused the id
            if map.get(&self.id).is_some_and(|(serial, _)| *serial == self.serial) {
                map.remove(&self.id);
            }
        }
    }
}

/// Outcome of the fallible part of chain generation.
struct Assembled {
    chain: ReasoningChain,
    cancelled: bool,
    fallback_reason: Option<String>,
}

impl Orchestrator {
    /// Start building an orchestrator.
    #[must_use]
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// The metrics collector.
    #[must_use]
    pub fn metrics(&self) -> &ChainMetrics {
        &self.metrics
    }

    /// The mode selector.
    #[must_use]
    pub const fn selector(&self) -> &ModeSelector {
        &self.selector
    }

    /// Choose a thinking mode. Never fails.
    #[must_use]
    pub fn select_mode(
        &self,
        query: &str,
        affect: Option<&AffectState>,
        cognitive_load: Option<f64>,
        readiness: Option<ReadinessTier>,
    ) -> ThinkingDecision {
        self.selector.select(query, affect, cognitive_load, readiness)
    }

    /// Allocate a token budget under the provider ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for out-of-range numeric input.
    pub fn allocate(&self, mut request: BudgetRequest) -> Result<TokenBudget, ValidationError> {
        if request.ceiling.is_none() {
            request.ceiling = Some(self.ceiling.max_tokens());
        }
        self.allocator.allocate(&request)
    }

    /// Search depth for `mode` given the reasoning share of a budget.
    #[must_use]
    pub fn search_depth(&self, mode: ThinkingMode, reasoning_tokens: u32) -> usize {
        let d = &self.depth;
        let steps = |per_step: u32| {
            usize::try_from(reasoning_tokens / per_step.max(1)).unwrap_or(usize::MAX)
        };
        match mode {
            ThinkingMode::Fast => d.fast_steps,
            ThinkingMode::Deliberate => {
                steps(d.deliberate_tokens_per_step).clamp(d.deliberate_min, d.deliberate_max)
            }
            ThinkingMode::Hybrid => {
                steps(d.hybrid_tokens_per_step).clamp(d.hybrid_min, d.hybrid_max)
            }
        }
    }

    /// Request early termination of an in-flight chain.
    ///
    /// Returns false if no chain with `chain_id` is running. The chain still
    /// completes, with the best path found so far.
    pub fn cancel(&self, chain_id: &str) -> bool {
        let token = match self.in_flight.lock() {
            Ok(map) => map.get(chain_id).map(|(_, token)| token.clone()),
            Err(poison_error) => poison_error
                .into_inner()
                .get(chain_id)
                .map(|(_, token)| token.clone()),
        };
        match token {
            Some(token) => {
                info!(chain_id, "Cancelling chain");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of chains currently generating.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().map_or(0, |map| map.len())
    }

    /// Build a reasoning chain. Never fails.
    pub async fn generate_chain(&self, request: ChainRequest) -> ReasoningChain {
        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        let guard = InFlight::register(&self.in_flight, serial, &request.id);
        let started_at = self.clock.now();
        let complexity = self.selector.estimator().estimate(&request.query);

        let outcome =
            AssertUnwindSafe(self.assemble(&request, complexity, started_at, &guard.token))
                .catch_unwind()
                .await;
        drop(guard);

        let assembled = match outcome {
            Ok(Ok(assembled)) => assembled,
            Ok(Err(err)) => {
                error!(chain_id = %request.id, error = %err, "Chain assembly failed");
                self.fallback(&request, complexity, started_at, err.to_string())
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!(chain_id = %request.id, panic = %reason, "Chain assembly panicked");
                self.fallback(&request, complexity, started_at, format!("panic: {reason}"))
            }
        };

        self.finish(assembled, &request.budget)
    }

    /// Run select, allocate and search in sequence. Fast mode skips search.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when allocation rejects its input, for
    /// example a cognitive load outside `[0, 1]`.
    pub async fn think(
        &self,
        query: &str,
        affect: Option<&AffectState>,
        cognitive_load: Option<f64>,
        readiness: Option<ReadinessTier>,
    ) -> Result<ThinkingOutcome, ValidationError> {
        let decision = self.select_mode(query, affect, cognitive_load, readiness);

        let mut budget_request = BudgetRequest::for_complexity(decision.factors.complexity)
            .with_mode(decision.mode.into());
        if let Some(affect) = affect {
            budget_request = budget_request.with_affect(affect.clone());
        }
        if let Some(load) = cognitive_load {
            budget_request = budget_request.with_cognitive_load(load);
        }
        if let Some(readiness) = readiness {
            budget_request = budget_request.with_readiness(readiness);
        }
        let budget = self.allocate(budget_request)?;

        let chain = if decision.mode.searches() {
            let mut request = ChainRequest::new(query, decision.mode, budget.clone());
            if let Some(affect) = affect {
                request = request.with_affect(affect.clone());
            }
            if let Some(load) = cognitive_load {
                request = request.with_cognitive_load(load);
            }
            Some(self.generate_chain(request).await)
        } else {
            info!(mode = %decision.mode, "Fast mode, skipping path search");
            None
        };

        Ok(ThinkingOutcome {
            decision,
            budget,
            chain,
        })
    }

    async fn assemble(
        &self,
        request: &ChainRequest,
        complexity: f64,
        started_at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Assembled, ChainError> {
        let Some(engine) = &self.search else {
            warn!(chain_id = %request.id, "No step generator configured, using fallback chain");
            return Ok(self.fallback(
                request,
                complexity,
                started_at,
                "step generator unavailable".into(),
            ));
        };

        let affect = effective_affect(request);
        let max_steps = self.search_depth(request.mode, request.budget.reasoning_tokens);
        info!(
            chain_id = %request.id,
            mode = %request.mode,
            complexity,
            max_steps,
            reasoning_tokens = request.budget.reasoning_tokens,
            "Generating reasoning chain"
        );

        let path = engine
            .search(&request.query, affect.as_ref(), max_steps, cancel)
            .await;
        let cancelled = path.stats.cancelled;

        if path.is_empty() {
            warn!(
                chain_id = %request.id,
                misses = path.stats.misses,
                cancelled,
                "Search produced no steps, using fallback chain"
            );
            let mut assembled = self.fallback(
                request,
                complexity,
                started_at,
                "search produced no steps".into(),
            );
            assembled.cancelled = cancelled;
            return Ok(assembled);
        }

        let mut chain = ReasoningChain::new(
            request.id.clone(),
            request.query.clone(),
            request.mode,
            complexity,
            &request.budget,
            affect,
            started_at,
        );
        for step in path.steps {
            chain.append_step(step)?;
        }
        chain.complete(path.conclusion, self.clock.now())?;

        Ok(Assembled {
            chain,
            cancelled,
            fallback_reason: None,
        })
    }

    fn fallback(
        &self,
        request: &ChainRequest,
        complexity: f64,
        started_at: DateTime<Utc>,
        reason: String,
    ) -> Assembled {
        let content = fallback_step_content(&request.query);
        let mut chain = ReasoningChain::new(
            request.id.clone(),
            request.query.clone(),
            request.mode,
            complexity,
            &request.budget,
            effective_affect(request),
            started_at,
        )
        .into_fallback();

        let step = ReasoningStep::new(
            content.clone(),
            ReasoningStrategy::Deductive,
            FALLBACK_CONFIDENCE,
        );
        if let Err(err) = chain
            .append_step(step)
            .and_then(|_| chain.complete(content, self.clock.now()))
        {
            error!(chain_id = %request.id, error = %err, "Fallback chain could not be completed");
        }

        Assembled {
            chain,
            cancelled: false,
            fallback_reason: Some(reason),
        }
    }

    fn finish(&self, assembled: Assembled, budget: &TokenBudget) -> ReasoningChain {
        let Assembled {
            chain,
            cancelled,
            fallback_reason,
        } = assembled;

        let mut event = ChainEvent::new(
            chain.mode(),
            chain.processing_time_ms(),
            chain.steps().len(),
        );
        if cancelled {
            event = event.cancelled();
        }
        if let Some(reason) = fallback_reason {
            event = event.fallback();
            self.metrics.record_fallback(FallbackEvent::new(chain.id(), reason));
        }
        self.metrics.record(event);

        info!(
            chain_id = %chain.id(),
            mode = %chain.mode(),
            steps = chain.steps().len(),
            confidence = chain.total_confidence(),
            processing_time_ms = chain.processing_time_ms(),
            fallback = chain.is_fallback(),
            "Reasoning chain complete"
        );

        if let Some(store) = &self.store {
            match Handle::try_current() {
                Ok(handle) => {
                    let store = Arc::clone(store);
                    let saved = chain.clone();
                    let budget = budget.clone();
                    handle.spawn(async move {
                        if let Err(err) = store.save_chain(&saved, &budget).await {
                            warn!(chain_id = %saved.id(), error = %err, "Failed to persist reasoning chain");
                        }
                    });
                }
                Err(err) => {
                    warn!(chain_id = %chain.id(), error = %err, "No Tokio runtime, skipping chain persistence");
                }
            }
        }

        chain
    }
}

/// The request's affect with any explicit cognitive load applied.
fn effective_affect(request: &ChainRequest) -> Option<AffectState> {
    let mut affect = request.affect.clone();
    if let (Some(state), Some(load)) = (affect.as_mut(), request.cognitive_load) {
        if load.is_finite() {
            state.cognitive_load = load.clamp(0.0, 1.0);
        }
    }
    affect
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".into())
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
    use crate::error::GenerationError;
    use crate::test_utils::{
        confident_affect, fixed_clock, mock_generator_failure, mock_generator_sequence,
        sample_budget, struggling_affect,
    };
    use crate::traits::{MockChainStore, MockStepGenerator, MockThinkingPolicy};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn orchestrator(generator: MockStepGenerator) -> Orchestrator {
        Orchestrator::builder()
            .generator(Arc::new(generator))
            .build()
            .unwrap()
    }

    #[test]
    fn test_fallback_content_truncates_query() {
        let long = "x".repeat(250);
        let content = fallback_step_content(&long);
        assert_eq!(content.len(), "Analyzing: ".len() + 100 + 3);
        assert_eq!(fallback_step_content("hi"), "Analyzing: hi...");
    }

    #[test]
    fn test_fallback_content_respects_char_boundaries() {
        let query = "é".repeat(150);
        let content = fallback_step_content(&query);
        assert_eq!(content.chars().count(), "Analyzing: ".len() + 100 + 3);
    }

    #[test]
    fn test_search_depth_per_mode() {
        let orchestrator = Orchestrator::builder().build().unwrap();
        assert_eq!(orchestrator.search_depth(ThinkingMode::Fast, 10_000), 2);
        assert_eq!(orchestrator.search_depth(ThinkingMode::Deliberate, 100), 3);
        assert_eq!(orchestrator.search_depth(ThinkingMode::Deliberate, 2000), 5);
        assert_eq!(orchestrator.search_depth(ThinkingMode::Deliberate, 9000), 8);
        assert_eq!(orchestrator.search_depth(ThinkingMode::Hybrid, 1800), 3);
        assert_eq!(orchestrator.search_depth(ThinkingMode::Hybrid, 2000), 4);
        assert_eq!(orchestrator.search_depth(ThinkingMode::Hybrid, 9000), 5);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.search.max_iterations = 0;
        assert!(Orchestrator::builder().config(config).build().is_err());
    }

    #[test]
    fn test_allocate_uses_injected_ceiling() {
        let orchestrator = Orchestrator::builder()
            .ceiling(Arc::new(FixedCeiling::new(2000)))
            .build()
            .unwrap();
        let budget = orchestrator
            .allocate(BudgetRequest::for_complexity(0.9))
            .unwrap();
        assert_eq!(budget.total_tokens, 1800);
    }

    #[test]
    fn test_allocate_rejects_bad_load() {
        let orchestrator = Orchestrator::builder().build().unwrap();
        let result = orchestrator.allocate(BudgetRequest::for_complexity(0.5).with_cognitive_load(-0.5));
        assert!(matches!(result, Err(ValidationError::OutOfRange { .. })));
    }

    #[tokio::test]
    async fn test_generate_chain_numbers_steps() {
        let orchestrator = orchestrator(mock_generator_sequence(&[
            "First we observe the pattern",
            "Because the load rises the beam bends",
            "Therefore the beam needs support",
        ]));
        let request = ChainRequest::new("Why do beams bend?", ThinkingMode::Hybrid, sample_budget())
            .with_id("chain-1");

        let chain = orchestrator.generate_chain(request).await;

        assert_eq!(chain.id(), "chain-1");
        assert!(chain.is_complete());
        assert!(!chain.is_fallback());
        assert!(!chain.steps().is_empty());
        for (index, step) in chain.steps().iter().enumerate() {
            assert_eq!(step.step_number, index + 1);
        }
        assert_eq!(chain.conclusion(), Some(chain.steps().last().unwrap().content.as_str()));
        assert_eq!(orchestrator.in_flight(), 0);
        assert_eq!(orchestrator.metrics().summary().total_chains, 1);
    }

    #[tokio::test]
    async fn test_failing_generator_yields_fallback_chain() {
        let orchestrator = orchestrator(mock_generator_failure(GenerationError::Timeout {
            elapsed_ms: 30_000,
        }));
        let request = ChainRequest::new("Explain entropy", ThinkingMode::Deliberate, sample_budget());

        let chain = orchestrator.generate_chain(request).await;

        assert!(chain.is_fallback());
        assert_eq!(chain.steps().len(), 1);
        assert_eq!(chain.steps()[0].content, "Analyzing: Explain entropy...");
        assert_eq!(chain.total_confidence(), FALLBACK_CONFIDENCE);
        assert!(chain.completed_at().is_some());

        let summary = orchestrator.metrics().summary();
        assert_eq!(summary.fallback_count, 1);
        assert_eq!(summary.recent_fallbacks[0].reason, "search produced no steps");
    }

    #[tokio::test]
    async fn test_missing_generator_yields_fallback_chain() {
        let orchestrator = Orchestrator::builder().build().unwrap();
        let request = ChainRequest::new("q", ThinkingMode::Hybrid, sample_budget());
        let chain = orchestrator.generate_chain(request).await;
        assert!(chain.is_fallback());
        assert_eq!(chain.steps().len(), 1);
    }

    #[tokio::test]
    async fn test_panicking_generator_is_contained() {
        let mut mock = MockStepGenerator::new();
        mock.expect_generate_step()
            .returning(|_| panic!("generator exploded"));
        let orchestrator = orchestrator(mock);
        let request = ChainRequest::new("q", ThinkingMode::Hybrid, sample_budget()).with_id("p");

        let chain = orchestrator.generate_chain(request).await;

        assert!(chain.is_fallback());
        assert_eq!(chain.total_confidence(), 0.5);
        assert_eq!(orchestrator.in_flight(), 0);
        let fallbacks = orchestrator.metrics().fallbacks();
        assert!(fallbacks[0].reason.contains("generator exploded"));
    }

    #[tokio::test]
    async fn test_processing_time_uses_clock() {
        let clock = fixed_clock(&[0, 1500]);
        let orchestrator = Orchestrator::builder()
            .generator(Arc::new(mock_generator_sequence(&["then compare the two"])))
            .clock(Arc::new(clock))
            .build()
            .unwrap();
        let request = ChainRequest::new("q", ThinkingMode::Hybrid, sample_budget());

        let chain = orchestrator.generate_chain(request).await;
        assert_eq!(chain.processing_time_ms(), 1500);
    }

    #[tokio::test]
    async fn test_cancel_unknown_chain() {
        let orchestrator = Orchestrator::builder().build().unwrap();
        assert!(!orchestrator.cancel("nope"));
    }

    #[tokio::test]
    async fn test_cancel_stops_search_early() {
        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        let started_tx = Mutex::new(Some(started_tx));

        struct SlowGenerator {
            started: Mutex<Option<tokio::sync::oneshot::Sender<()>>>,
        }

        #[async_trait::async_trait]
        impl StepGenerator for SlowGenerator {
            async fn generate_step(
                &self,
                _request: &crate::search::StepRequest,
            ) -> Result<String, GenerationError> {
                if let Some(tx) = self.started.lock().unwrap().take() {
                    let _ = tx.send(());
                    return Ok("First we observe the pattern".into());
                }
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok("too late".into())
            }
        }

        let orchestrator = Arc::new(
            Orchestrator::builder()
                .generator(Arc::new(SlowGenerator { started: started_tx }))
                .build()
                .unwrap(),
        );
        let request = ChainRequest::new("q", ThinkingMode::Deliberate, sample_budget())
            .with_id("slow");

        let task = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.generate_chain(request).await })
        };

        started_rx.await.unwrap();
        while !orchestrator.cancel("slow") {
            tokio::task::yield_now().await;
        }

        let chain = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(chain.steps().len(), 1);
        assert_eq!(chain.steps()[0].content, "First we observe the pattern");
        assert!(!chain.is_fallback());
        assert_eq!(orchestrator.metrics().summary().cancellation_count, 1);
        assert!(!orchestrator.cancel("slow"));
    }

    #[tokio::test]
    async fn test_store_receives_completed_chain() {
        let (tx, rx) = tokio::sync::oneshot::channel::<String>();
        let tx = Mutex::new(Some(tx));
        let mut store = MockChainStore::new();
        store.expect_save_chain().times(1).returning(move |chain, _| {
            assert!(chain.is_complete());
            if let Some(tx) = tx.lock().unwrap().take() {
                let _ = tx.send(chain.id().to_string());
            }
            Ok(())
        });

        let orchestrator = Orchestrator::builder()
            .generator(Arc::new(mock_generator_sequence(&["then we conclude"])))
            .store(Arc::new(store))
            .build()
            .unwrap();
        let request = ChainRequest::new("q", ThinkingMode::Hybrid, sample_budget()).with_id("stored");

        orchestrator.generate_chain(request).await;
        let saved = tokio::time::timeout(Duration::from_secs(5), rx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(saved, "stored");
    }

    /// Polls `future` to completion on the current thread with no runtime.
    fn poll_without_runtime<F: std::future::Future>(future: F) -> F::Output {
        use std::future::Future as _;
        let mut future = std::pin::pin!(future);
        let mut cx = std::task::Context::from_waker(futures_util::task::noop_waker_ref());
        for _ in 0..1000 {
            if let std::task::Poll::Ready(output) = future.as_mut().poll(&mut cx) {
                return output;
            }
        }
        panic!("future did not complete without a runtime");
    }

    #[test]
    fn test_store_without_runtime_skips_save() {
        let mut store = MockChainStore::new();
        store.expect_save_chain().never();
        let orchestrator = Orchestrator::builder()
            .store(Arc::new(store))
            .build()
            .unwrap();
        let request = ChainRequest::new("q", ThinkingMode::Hybrid, sample_budget());

        let chain = poll_without_runtime(orchestrator.generate_chain(request));

        assert!(chain.is_complete());
        assert_eq!(chain.steps().len(), 1);
        assert_eq!(orchestrator.metrics().summary().total_chains, 1);
    }

    #[tokio::test]
    async fn test_build_with_store_opens_configured_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("chains.db");
        let config = Config {
            database_path: Some(db_path.display().to_string()),
            ..Config::default()
        };

        let orchestrator = Orchestrator::builder()
            .config(config)
            .build_with_store()
            .await
            .unwrap();

        assert!(orchestrator.store.is_some());
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_build_with_store_without_path_has_no_store() {
        let orchestrator = Orchestrator::builder().build_with_store().await.unwrap();
        assert!(orchestrator.store.is_none());
    }

    #[tokio::test]
    async fn test_build_with_store_rejects_invalid_config() {
        let mut config = Config::default();
        config.search.max_iterations = 0;
        let result = Orchestrator::builder().config(config).build_with_store().await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_fallback_chain_keeps_load_override() {
        let orchestrator = Orchestrator::builder().build().unwrap();
        let request = ChainRequest::new("q", ThinkingMode::Hybrid, sample_budget())
            .with_affect(confident_affect())
            .with_cognitive_load(0.9);

        let chain = orchestrator.generate_chain(request).await;

        assert!(chain.is_fallback());
        assert_eq!(chain.affect().unwrap().cognitive_load, 0.9);
    }

    #[tokio::test]
    async fn test_think_fast_skips_search() {
        let mut generator = MockStepGenerator::new();
        generator.expect_generate_step().never();
        let orchestrator = orchestrator(generator);

        let outcome = orchestrator
            .think("What is 2+2?", Some(&confident_affect()), None, None)
            .await
            .unwrap();

        assert_eq!(outcome.decision.mode, ThinkingMode::Fast);
        assert!(outcome.decision.estimated_time_ms < 2000);
        assert!(outcome.chain.is_none());
        assert_eq!(outcome.budget.mode, crate::budget::BudgetMode::Conservative);
    }

    #[tokio::test]
    async fn test_think_struggling_runs_deliberate_search() {
        let orchestrator = orchestrator(mock_generator_sequence(&[
            "Because the inputs vary we must normalise",
            "Therefore the model converges",
        ]));

        let outcome = orchestrator
            .think("How do I start?", Some(&struggling_affect()), None, None)
            .await
            .unwrap();

        assert_eq!(outcome.decision.mode, ThinkingMode::Deliberate);
        assert_eq!(outcome.budget.mode, crate::budget::BudgetMode::Aggressive);
        let chain = outcome.chain.unwrap();
        assert_eq!(chain.mode(), ThinkingMode::Deliberate);
        assert_eq!(chain.total_budget(), outcome.budget.total_tokens);
    }

    #[tokio::test]
    async fn test_think_surfaces_invalid_load() {
        let orchestrator = Orchestrator::builder().build().unwrap();
        let result = orchestrator.think("q", None, Some(1.5), None).await;
        assert!(matches!(result, Err(ValidationError::OutOfRange { .. })));
    }

    #[tokio::test]
    async fn test_custom_policy_is_used() {
        let mut policy = MockThinkingPolicy::new();
        policy
            .expect_decide()
            .returning(|_| crate::selector::PolicyVerdict::new(ThinkingMode::Deliberate, 0.99, "forced"));
        let orchestrator = Orchestrator::builder()
            .policy(Arc::new(policy))
            .build()
            .unwrap();

        let decision = orchestrator.select_mode("hi", None, None, None);
        assert_eq!(decision.mode, ThinkingMode::Deliberate);
        assert_eq!(decision.rationale, "forced");
    }

    #[test]
    fn test_effective_affect_applies_load_override() {
        let request = ChainRequest::new("q", ThinkingMode::Hybrid, sample_budget())
            .with_affect(confident_affect())
            .with_cognitive_load(2.0);
        assert_eq!(effective_affect(&request).unwrap().cognitive_load, 1.0);

        let request = ChainRequest::new("q", ThinkingMode::Hybrid, sample_budget())
            .with_cognitive_load(0.3);
        assert!(effective_affect(&request).is_none());
    }
}
