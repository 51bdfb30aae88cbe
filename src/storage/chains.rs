//! Chain storage operations.

#![allow(clippy::missing_errors_doc)]

use crate::budget::TokenBudget;
use crate::chain::ReasoningChain;
use crate::error::StorageError;
use sqlx::Row;

use super::core::SqliteChainStore;

fn to_json<T: serde::Serialize>(value: &T, what: &str) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|e| StorageError::Serialization {
        message: format!("Failed to serialize {what}: {e}"),
    })
}

fn from_json(json: &str) -> Result<ReasoningChain, StorageError> {
    serde_json::from_str(json).map_err(|e| StorageError::Serialization {
        message: format!("Failed to deserialize chain: {e}"),
    })
}

impl SqliteChainStore {
    /// Insert a chain, replacing any earlier row with the same id.
    pub async fn upsert_chain(
        &self,
        chain: &ReasoningChain,
        budget: &TokenBudget,
    ) -> Result<(), StorageError> {
        let chain_json = to_json(chain, "chain")?;
        let budget_json = to_json(budget, "budget")?;

        sqlx::query(
            r"INSERT OR REPLACE INTO reasoning_chains (
                id, query, mode, complexity_score, budget_mode, total_tokens,
                reasoning_tokens, response_tokens, step_count, total_confidence,
                is_fallback, primary_emotion, started_at, completed_at,
                processing_time_ms, chain_json, budget_json
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(chain.id())
        .bind(chain.query())
        .bind(chain.mode().as_str())
        .bind(chain.complexity_score())
        .bind(budget.mode.as_str())
        .bind(i64::from(budget.total_tokens))
        .bind(i64::from(budget.reasoning_tokens))
        .bind(i64::from(budget.response_tokens))
        .bind(i64::try_from(chain.steps().len()).unwrap_or(i64::MAX))
        .bind(chain.total_confidence())
        .bind(chain.is_fallback())
        .bind(chain.affect().map(|a| a.primary_emotion.as_str()))
        .bind(chain.started_at().to_rfc3339())
        .bind(chain.completed_at().map(|t| t.to_rfc3339()))
        .bind(i64::try_from(chain.processing_time_ms()).unwrap_or(i64::MAX))
        .bind(&chain_json)
        .bind(&budget_json)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::query_error("INSERT reasoning_chains", format!("{e}")))?;

        tracing::debug!(chain_id = %chain.id(), "Chain persisted");
        Ok(())
    }

    /// Fetch one chain.
    pub async fn get_chain(&self, id: &str) -> Result<Option<ReasoningChain>, StorageError> {
        let row = sqlx::query("SELECT chain_json FROM reasoning_chains WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::query_error("SELECT reasoning_chains", format!("{e}")))?;

        row.map(|row| from_json(&row.get::<String, _>("chain_json")))
            .transpose()
    }

    /// Fetch the budget a chain ran under.
    pub async fn get_budget(&self, id: &str) -> Result<Option<TokenBudget>, StorageError> {
        let row = sqlx::query("SELECT budget_json FROM reasoning_chains WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::query_error("SELECT reasoning_chains", format!("{e}")))?;

        row.map(|row| {
            serde_json::from_str(&row.get::<String, _>("budget_json")).map_err(|e| {
                StorageError::Serialization {
                    message: format!("Failed to deserialize budget: {e}"),
                }
            })
        })
        .transpose()
    }

    /// Most recently started chains, newest first.
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<ReasoningChain>, StorageError> {
        let rows = sqlx::query(
            "SELECT chain_json FROM reasoning_chains ORDER BY started_at DESC, rowid DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Self::query_error("SELECT reasoning_chains", format!("{e}")))?;

        rows.iter()
            .map(|row| from_json(&row.get::<String, _>("chain_json")))
            .collect()
    }

    /// Delete one chain.
    pub async fn delete_chain(&self, id: &str) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM reasoning_chains WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::query_error("DELETE reasoning_chains", format!("{e}")))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound {
                chain_id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Number of stored chains.
    pub async fn chain_count(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM reasoning_chains")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Self::query_error("COUNT reasoning_chains", format!("{e}")))?;

        Ok(u64::try_from(row.get::<i64, _>("count")).unwrap_or(0))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::super::core::tests::test_store;
    use super::*;
    use crate::test_utils::{sample_budget, sample_chain};
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_upsert_and_get() {
        let store = test_store().await;
        let chain = sample_chain("chain-1", 3);

        store.upsert_chain(&chain, &sample_budget()).await.unwrap();
        let loaded = store.get_chain("chain-1").await.unwrap();

        assert_eq!(loaded, Some(chain));
    }

    #[tokio::test]
    async fn test_get_missing_chain() {
        let store = test_store().await;
        assert!(store.get_chain("nope").await.unwrap().is_none());
        assert!(store.get_budget("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let store = test_store().await;
        let budget = sample_budget();
        store
            .upsert_chain(&sample_chain("chain-1", 1), &budget)
            .await
            .unwrap();
        store
            .upsert_chain(&sample_chain("chain-1", 4), &budget)
            .await
            .unwrap();

        assert_eq!(store.chain_count().await.unwrap(), 1);
        let loaded = store.get_chain("chain-1").await.unwrap().unwrap();
        assert_eq!(loaded.steps().len(), 4);
    }

    #[tokio::test]
    async fn test_budget_roundtrip() {
        let store = test_store().await;
        let budget = sample_budget();
        store
            .upsert_chain(&sample_chain("chain-1", 1), &budget)
            .await
            .unwrap();
        assert_eq!(store.get_budget("chain-1").await.unwrap(), Some(budget));
    }

    #[tokio::test]
    async fn test_list_recent_orders_newest_first() {
        let store = test_store().await;
        let budget = sample_budget();
        let base = sample_chain("base", 0).started_at();

        for (offset, id) in [(0, "old"), (10, "new"), (5, "mid")] {
            let chain = crate::test_utils::chain_started_at(id, base + Duration::seconds(offset));
            store.upsert_chain(&chain, &budget).await.unwrap();
        }

        let ids: Vec<String> = store
            .list_recent(2)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id().to_string())
            .collect();
        assert_eq!(ids, vec!["new", "mid"]);
    }

    #[tokio::test]
    async fn test_delete_chain() {
        let store = test_store().await;
        store
            .upsert_chain(&sample_chain("gone", 1), &sample_budget())
            .await
            .unwrap();

        store.delete_chain("gone").await.unwrap();
        assert_eq!(store.chain_count().await.unwrap(), 0);
        assert!(matches!(
            store.delete_chain("gone").await,
            Err(StorageError::NotFound { .. })
        ));
    }
}
