//! End-to-end chain generation.

use std::sync::Arc;

use deep_thinking::affect::{AffectState, Emotion, ReadinessTier};
use deep_thinking::budget::{BudgetMode, BudgetRequest, TokenBudget};
use deep_thinking::orchestrator::{ChainRequest, Orchestrator};
use deep_thinking::search::ReasoningStrategy;
use deep_thinking::selector::ThinkingMode;

use super::{EchoGenerator, ScriptedGenerator};

fn balanced_budget(orchestrator: &Orchestrator) -> TokenBudget {
    orchestrator
        .allocate(BudgetRequest::for_complexity(0.5).with_mode(BudgetMode::Balanced))
        .unwrap()
}

#[tokio::test]
async fn test_think_struggling_user_gets_numbered_deliberate_chain() {
    let generator = Arc::new(ScriptedGenerator::new(&[
        "First, notice the pattern in the failing inputs",
        "Because the cache is cold, latency spikes",
        "Therefore warm the cache before the benchmark",
    ]));
    let orchestrator = Orchestrator::builder()
        .generator(generator.clone())
        .build()
        .unwrap();
    let affect = AffectState::new(Emotion::Anxious, -0.4, ReadinessTier::Low, 0.8);

    let outcome = orchestrator
        .think("Why is my benchmark slow?", Some(&affect), None, None)
        .await
        .unwrap();

    assert_eq!(outcome.decision.mode, ThinkingMode::Deliberate);
    let chain = outcome.chain.unwrap();
    let max_steps =
        orchestrator.search_depth(ThinkingMode::Deliberate, outcome.budget.reasoning_tokens);

    assert!(chain.is_complete());
    assert!(!chain.steps().is_empty());
    assert!(chain.steps().len() <= max_steps);
    for (index, step) in chain.steps().iter().enumerate() {
        assert_eq!(step.step_number, index + 1);
        assert!((0.0..=1.0).contains(&step.confidence));
    }
    assert_eq!(
        chain.conclusion(),
        Some(chain.steps().last().unwrap().content.as_str())
    );
    assert!((chain.total_confidence() - chain.average_confidence()).abs() < 1e-12);
    assert_eq!(chain.total_budget(), outcome.budget.total_tokens);
    assert_eq!(chain.affect(), Some(&affect));
    assert!(generator.calls() >= chain.steps().len());
}

#[tokio::test]
async fn test_hybrid_chain_follows_path_context() {
    let orchestrator = Orchestrator::builder()
        .generator(Arc::new(EchoGenerator))
        .build()
        .unwrap();
    let budget = balanced_budget(&orchestrator);
    let depth = orchestrator.search_depth(ThinkingMode::Hybrid, budget.reasoning_tokens);
    assert_eq!(depth, 3);

    let chain = orchestrator
        .generate_chain(ChainRequest::new(
            "Compare two sorting strategies",
            ThinkingMode::Hybrid,
            budget,
        ))
        .await;

    assert_eq!(chain.steps().len(), depth);
    for (index, step) in chain.steps().iter().enumerate() {
        let expected = format!("Step at depth {index} after {index} prior steps");
        assert!(step.content.starts_with(&expected), "{}", step.content);
        assert_eq!(step.strategy, ReasoningStrategy::Algorithmic);
        assert!(step.provenance.is_some());
    }
}

#[tokio::test]
async fn test_fast_chain_is_two_steps_deep() {
    let orchestrator = Orchestrator::builder()
        .generator(Arc::new(EchoGenerator))
        .build()
        .unwrap();
    let budget = balanced_budget(&orchestrator);

    let chain = orchestrator
        .generate_chain(ChainRequest::new("What is a heap?", ThinkingMode::Fast, budget))
        .await;

    assert_eq!(chain.mode(), ThinkingMode::Fast);
    assert_eq!(chain.steps().len(), 2);
}

#[tokio::test]
async fn test_strategy_distribution_reflects_steps() {
    let orchestrator = Orchestrator::builder()
        .generator(Arc::new(ScriptedGenerator::new(&[
            "This is similar to a queue",
            "It fails because the lock is held",
            "Thus the lock must be released first",
        ])))
        .build()
        .unwrap();
    let budget = balanced_budget(&orchestrator);

    let chain = orchestrator
        .generate_chain(ChainRequest::new("q", ThinkingMode::Hybrid, budget))
        .await;

    let distribution = chain.strategy_distribution();
    assert_eq!(distribution.values().sum::<usize>(), chain.steps().len());
    assert_eq!(distribution.get(&ReasoningStrategy::Analogical), Some(&1));
    assert_eq!(distribution.get(&ReasoningStrategy::Causal), Some(&1));
    assert_eq!(distribution.get(&ReasoningStrategy::Deductive), Some(&1));
}

#[tokio::test]
async fn test_metrics_track_every_chain() {
    let orchestrator = Orchestrator::builder()
        .generator(Arc::new(EchoGenerator))
        .build()
        .unwrap();
    let budget = balanced_budget(&orchestrator);

    for mode in [ThinkingMode::Fast, ThinkingMode::Hybrid, ThinkingMode::Hybrid] {
        orchestrator
            .generate_chain(ChainRequest::new("q", mode, budget.clone()))
            .await;
    }

    let summary = orchestrator.metrics().summary();
    assert_eq!(summary.total_chains, 3);
    assert_eq!(summary.by_mode["hybrid"].count, 2);
    assert!((summary.by_mode["hybrid"].mean_steps - 3.0).abs() < 1e-12);
    assert_eq!(summary.by_mode["fast"].count, 1);
    assert_eq!(summary.fallback_count, 0);
}
