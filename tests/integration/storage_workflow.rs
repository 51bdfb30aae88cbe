//! Chain persistence through a temp-dir `SQLite` store.

use std::sync::Arc;
use std::time::Duration;

use deep_thinking::budget::{BudgetMode, BudgetRequest};
use deep_thinking::chain::ReasoningChain;
use deep_thinking::config::Config;
use deep_thinking::error::GenerationError;
use deep_thinking::orchestrator::{ChainRequest, Orchestrator};
use deep_thinking::selector::ThinkingMode;
use deep_thinking::storage::SqliteChainStore;
use deep_thinking::traits::ChainStore;
use tempfile::TempDir;

use super::{FailingGenerator, ScriptedGenerator};

async fn create_test_store() -> (SqliteChainStore, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("chains.db");
    let store = SqliteChainStore::new(&db_path)
        .await
        .expect("Failed to create store");
    (store, temp_dir)
}

/// Saves are detached, so poll until the chain shows up.
async fn wait_for_chain(store: &SqliteChainStore, id: &str) -> ReasoningChain {
    for _ in 0..200 {
        if let Some(chain) = store.load_chain(id).await.unwrap() {
            return chain;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("chain {id} was never persisted");
}

#[tokio::test]
async fn test_generated_chain_is_persisted_and_reloaded() {
    let (store, _dir) = create_test_store().await;
    let store = Arc::new(store);
    let orchestrator = Orchestrator::builder()
        .generator(Arc::new(ScriptedGenerator::new(&[
            "Because demand rises, prices follow",
            "Therefore supply expands",
        ])))
        .store(store.clone())
        .build()
        .unwrap();
    let budget = orchestrator
        .allocate(BudgetRequest::for_complexity(0.6).with_mode(BudgetMode::Aggressive))
        .unwrap();

    let chain = orchestrator
        .generate_chain(
            ChainRequest::new("Why do prices rise?", ThinkingMode::Deliberate, budget.clone())
                .with_id("persisted-1"),
        )
        .await;

    let loaded = wait_for_chain(&store, "persisted-1").await;
    assert_eq!(loaded.id(), chain.id());
    assert_eq!(loaded.steps().len(), chain.steps().len());
    assert_eq!(loaded.conclusion(), chain.conclusion());
    assert_eq!(loaded.mode(), ThinkingMode::Deliberate);
    assert_eq!(store.get_budget("persisted-1").await.unwrap(), Some(budget));
}

#[tokio::test]
async fn test_fallback_chains_are_persisted_too() {
    let (store, _dir) = create_test_store().await;
    let store = Arc::new(store);
    let orchestrator = Orchestrator::builder()
        .generator(Arc::new(FailingGenerator(GenerationError::Unavailable {
            message: "provider down".into(),
        })))
        .store(store.clone())
        .build()
        .unwrap();
    let budget = orchestrator
        .allocate(BudgetRequest::for_complexity(0.5))
        .unwrap();

    orchestrator
        .generate_chain(
            ChainRequest::new("Explain inflation", ThinkingMode::Hybrid, budget).with_id("fb-1"),
        )
        .await;

    let loaded = wait_for_chain(&store, "fb-1").await;
    assert!(loaded.is_fallback());
    assert_eq!(loaded.steps().len(), 1);
}

#[tokio::test]
async fn test_recent_chains_newest_first() {
    let (store, _dir) = create_test_store().await;
    let store = Arc::new(store);
    let orchestrator = Orchestrator::builder()
        .generator(Arc::new(ScriptedGenerator::new(&["then we compare"])))
        .store(store.clone())
        .build()
        .unwrap();
    let budget = orchestrator
        .allocate(BudgetRequest::for_complexity(0.5))
        .unwrap();

    for id in ["a", "b", "c"] {
        orchestrator
            .generate_chain(ChainRequest::new("q", ThinkingMode::Hybrid, budget.clone()).with_id(id))
            .await;
        wait_for_chain(&store, id).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let recent = store.recent_chains(2).await.unwrap();
    let ids: Vec<&str> = recent.iter().map(ReasoningChain::id).collect();
    assert_eq!(ids, vec!["c", "b"]);
}

#[tokio::test]
async fn test_reopening_database_keeps_chains() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("chains.db");

    {
        let store = Arc::new(SqliteChainStore::new(&db_path).await.unwrap());
        let orchestrator = Orchestrator::builder()
            .generator(Arc::new(ScriptedGenerator::new(&["then it holds"])))
            .store(store.clone())
            .build()
            .unwrap();
        let budget = orchestrator
            .allocate(BudgetRequest::for_complexity(0.5))
            .unwrap();
        orchestrator
            .generate_chain(ChainRequest::new("q", ThinkingMode::Hybrid, budget).with_id("durable"))
            .await;
        wait_for_chain(&store, "durable").await;
    }

    let reopened = SqliteChainStore::new(&db_path).await.unwrap();
    assert!(reopened.load_chain("durable").await.unwrap().is_some());
    assert_eq!(reopened.chain_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_configured_database_path_receives_chains() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("configured.db");
    let config = Config {
        database_path: Some(db_path.display().to_string()),
        ..Config::default()
    };
    let orchestrator = Orchestrator::builder()
        .config(config)
        .generator(Arc::new(ScriptedGenerator::new(&["then we compare"])))
        .build_with_store()
        .await
        .unwrap();
    let budget = orchestrator.allocate(BudgetRequest::for_complexity(0.5)).unwrap();

    let chain = orchestrator
        .generate_chain(
            ChainRequest::new("Compare the options", ThinkingMode::Hybrid, budget)
                .with_id("configured-1"),
        )
        .await;

    let reader = SqliteChainStore::new(&db_path).await.unwrap();
    let loaded = wait_for_chain(&reader, "configured-1").await;
    assert_eq!(loaded.id(), chain.id());
    assert_eq!(loaded.steps().len(), chain.steps().len());
}
