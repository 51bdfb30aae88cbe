//! Chains stay well formed when the generator misbehaves.

use std::sync::Arc;

use deep_thinking::budget::BudgetRequest;
use deep_thinking::chain::ReasoningChain;
use deep_thinking::error::GenerationError;
use deep_thinking::metrics::ChainMetrics;
use deep_thinking::orchestrator::{fallback_step_content, ChainRequest, Orchestrator};
use deep_thinking::search::ReasoningStrategy;
use deep_thinking::selector::ThinkingMode;

use super::{FailingGenerator, ScriptedGenerator};

async fn run(orchestrator: &Orchestrator, query: &str, mode: ThinkingMode) -> ReasoningChain {
    let budget = orchestrator
        .allocate(BudgetRequest::for_query(query))
        .unwrap();
    orchestrator
        .generate_chain(ChainRequest::new(query, mode, budget))
        .await
}

fn assert_fallback_shape(chain: &ReasoningChain, query: &str) {
    assert!(chain.is_fallback());
    assert!(chain.is_complete());
    assert_eq!(chain.steps().len(), 1);

    let step = &chain.steps()[0];
    assert_eq!(step.step_number, 1);
    assert_eq!(step.strategy, ReasoningStrategy::Deductive);
    assert!((step.confidence - 0.5).abs() < f64::EPSILON);
    assert_eq!(step.content, fallback_step_content(query));
    assert_eq!(chain.conclusion(), Some(step.content.as_str()));
}

#[tokio::test]
async fn test_every_error_kind_yields_fallback_chain() {
    let errors = [
        GenerationError::Unavailable {
            message: "connection refused".into(),
        },
        GenerationError::Timeout { elapsed_ms: 30_000 },
        GenerationError::Rejected {
            message: "content policy".into(),
        },
        GenerationError::EmptyResponse,
    ];

    for error in errors {
        let orchestrator = Orchestrator::builder()
            .generator(Arc::new(FailingGenerator(error)))
            .build()
            .unwrap();
        let chain = run(&orchestrator, "Why do bridges sway?", ThinkingMode::Deliberate).await;
        assert_fallback_shape(&chain, "Why do bridges sway?");
    }
}

#[tokio::test]
async fn test_missing_generator_yields_fallback_chain() {
    let orchestrator = Orchestrator::builder().build().unwrap();
    let chain = run(&orchestrator, "Summarize the plot", ThinkingMode::Hybrid).await;

    assert_fallback_shape(&chain, "Summarize the plot");
    let fallbacks = orchestrator.metrics().fallbacks();
    assert_eq!(fallbacks.len(), 1);
    assert_eq!(fallbacks[0].chain_id, chain.id());
}

#[tokio::test]
async fn test_long_query_is_truncated_in_fallback_step() {
    let query = "é".repeat(250);
    let orchestrator = Orchestrator::builder().build().unwrap();
    let chain = run(&orchestrator, &query, ThinkingMode::Fast).await;

    let content = &chain.steps()[0].content;
    assert_eq!(content, &format!("Analyzing: {}...", "é".repeat(100)));
}

#[tokio::test]
async fn test_blank_steps_are_skipped_not_kept() {
    let generator = Arc::new(ScriptedGenerator::new(&[
        "   ",
        "First, note that the pattern repeats",
    ]));
    let orchestrator = Orchestrator::builder()
        .generator(generator.clone())
        .build()
        .unwrap();

    let chain = run(&orchestrator, "Spot the pattern", ThinkingMode::Deliberate).await;

    assert!(!chain.is_fallback());
    assert!(chain
        .steps()
        .iter()
        .all(|step| !step.content.trim().is_empty()));
    assert!(generator.calls() > chain.steps().len());
}

#[tokio::test]
async fn test_fallbacks_do_not_poison_later_chains() {
    let metrics = Arc::new(ChainMetrics::new());
    let failing = Orchestrator::builder()
        .metrics(Arc::clone(&metrics))
        .generator(Arc::new(FailingGenerator(GenerationError::EmptyResponse)))
        .build()
        .unwrap();
    assert!(run(&failing, "q", ThinkingMode::Hybrid).await.is_fallback());

    let healthy = Orchestrator::builder()
        .generator(Arc::new(ScriptedGenerator::new(&["Therefore it holds"])))
        .metrics(Arc::clone(&metrics))
        .build()
        .unwrap();
    assert!(!run(&healthy, "q", ThinkingMode::Hybrid).await.is_fallback());

    let summary = metrics.summary();
    assert_eq!(summary.total_chains, 2);
    assert_eq!(summary.fallback_count, 1);
}
