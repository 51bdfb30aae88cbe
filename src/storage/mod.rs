//! Chain persistence.
//!
//! [`SqliteChainStore`] implements [`ChainStore`](crate::traits::ChainStore)
//! on `SQLite` through `sqlx`. The store is optional: the orchestrator
//! behaves identically without one, and save failures are only logged.
//!
//! The implementation is split across submodules:
//! - `core`: pool management, migrations and helpers
//! - `chains`: chain reads and writes
//! - `trait_impl`: the `ChainStore` implementation
//!
//! # Example
//!
//! ```ignore
//! use deep_thinking::storage::SqliteChainStore;
//!
//! let store = SqliteChainStore::new("./data/chains.db").await?;
//! let recent = store.recent_chains(10).await?;
//! ```

mod chains;
mod core;
mod trait_impl;

pub use self::core::SqliteChainStore;
