//! `ChainStore` implementation for `SqliteChainStore`.

use async_trait::async_trait;

use crate::budget::TokenBudget;
use crate::chain::ReasoningChain;
use crate::error::StorageError;
use crate::traits::ChainStore;

use super::core::SqliteChainStore;

#[async_trait]
impl ChainStore for SqliteChainStore {
    async fn save_chain(
        &self,
        chain: &ReasoningChain,
        budget: &TokenBudget,
    ) -> Result<(), StorageError> {
        self.upsert_chain(chain, budget).await
    }

    async fn load_chain(&self, id: &str) -> Result<Option<ReasoningChain>, StorageError> {
        self.get_chain(id).await
    }

    async fn recent_chains(&self, limit: u32) -> Result<Vec<ReasoningChain>, StorageError> {
        self.list_recent(limit).await
    }
}
