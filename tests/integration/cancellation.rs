//! Cooperative cancellation of in-flight chains.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deep_thinking::budget::{BudgetMode, BudgetRequest, TokenBudget};
use deep_thinking::error::GenerationError;
use deep_thinking::orchestrator::{ChainRequest, Orchestrator};
use deep_thinking::search::StepRequest;
use deep_thinking::selector::ThinkingMode;
use deep_thinking::traits::StepGenerator;

use super::SlowGenerator;

fn deliberate_budget(orchestrator: &Orchestrator) -> TokenBudget {
    orchestrator
        .allocate(BudgetRequest::for_complexity(0.8).with_mode(BudgetMode::Aggressive))
        .unwrap()
}

async fn cancel_when_running(orchestrator: &Orchestrator, id: &str) {
    while !orchestrator.cancel(id) {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_cancel_mid_search_returns_partial_chain() {
    let generator = Arc::new(SlowGenerator::new(1, Duration::from_secs(60)));
    let orchestrator = Arc::new(
        Orchestrator::builder()
            .generator(generator.clone())
            .build()
            .unwrap(),
    );
    let request = ChainRequest::new(
        "How do tides work?",
        ThinkingMode::Deliberate,
        deliberate_budget(&orchestrator),
    )
    .with_id("tides");

    let task = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.generate_chain(request).await })
    };

    // The second call is the one that hangs.
    while generator.calls() < 2 {
        tokio::task::yield_now().await;
    }
    cancel_when_running(&orchestrator, "tides").await;

    let chain = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("cancelled chain should return promptly")
        .unwrap();

    assert!(!chain.is_fallback());
    assert!(chain.is_complete());
    assert_eq!(chain.steps().len(), 1);
    assert_eq!(chain.conclusion(), Some("We observe a pattern at depth 0"));
    assert_eq!(orchestrator.in_flight(), 0);
    assert_eq!(orchestrator.metrics().summary().cancellation_count, 1);
}

#[tokio::test]
async fn test_cancel_before_first_step_falls_back() {
    let generator = Arc::new(SlowGenerator::new(0, Duration::from_secs(60)));
    let orchestrator = Arc::new(
        Orchestrator::builder()
            .generator(generator)
            .build()
            .unwrap(),
    );
    let request = ChainRequest::new(
        "What drives ocean currents?",
        ThinkingMode::Deliberate,
        deliberate_budget(&orchestrator),
    )
    .with_id("currents");

    let task = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.generate_chain(request).await })
    };
    cancel_when_running(&orchestrator, "currents").await;

    let chain = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();

    assert!(chain.is_fallback());
    assert_eq!(chain.steps().len(), 1);
    assert!(chain.steps()[0].content.starts_with("Analyzing: "));

    let summary = orchestrator.metrics().summary();
    assert_eq!(summary.fallback_count, 1);
    assert_eq!(summary.cancellation_count, 1);
}

/// Hangs on queries mentioning "slow", answers everything else at once.
struct QueryGatedGenerator;

#[async_trait]
impl StepGenerator for QueryGatedGenerator {
    async fn generate_step(&self, request: &StepRequest) -> Result<String, GenerationError> {
        if request.query.contains("slow") && request.depth > 0 {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        Ok(format!("First, compare option {}", request.depth + 1))
    }
}

#[tokio::test]
async fn test_cancelling_one_chain_leaves_others_alone() {
    let orchestrator = Arc::new(
        Orchestrator::builder()
            .generator(Arc::new(QueryGatedGenerator))
            .build()
            .unwrap(),
    );
    let budget = orchestrator
        .allocate(BudgetRequest::for_complexity(0.5).with_mode(BudgetMode::Balanced))
        .unwrap();

    let depth = orchestrator.search_depth(ThinkingMode::Hybrid, budget.reasoning_tokens);

    let slow = {
        let orchestrator = Arc::clone(&orchestrator);
        let request =
            ChainRequest::new("a slow question", ThinkingMode::Hybrid, budget.clone()).with_id("slow");
        tokio::spawn(async move { orchestrator.generate_chain(request).await })
    };

    let quick = orchestrator
        .generate_chain(
            ChainRequest::new("a quick question", ThinkingMode::Hybrid, budget).with_id("quick"),
        )
        .await;
    assert!(!quick.is_fallback());
    assert_eq!(quick.steps().len(), depth);
    assert!(!orchestrator.cancel("quick"));

    cancel_when_running(&orchestrator, "slow").await;
    let slow = tokio::time::timeout(Duration::from_secs(5), slow)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(slow.steps().len(), 1);
    assert!(!slow.is_fallback());
    assert_eq!(orchestrator.in_flight(), 0);

    let summary = orchestrator.metrics().summary();
    assert_eq!(summary.total_chains, 2);
    assert_eq!(summary.cancellation_count, 1);
}
