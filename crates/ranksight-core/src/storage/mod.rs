//! Persistence for evaluation runs.
//!
//! # Implementations
//!
//! - [`InMemoryEvalStore`] - `RwLock`-guarded maps, for tests and dry runs
//! - `RedbEvalStore` - redb database file (behind the `redb-store` feature)

mod eval_store;

#[cfg(feature = "redb-store")]
mod redb_store;

pub use eval_store::{EvalQuery, EvalStore, InMemoryEvalStore, StoreError};

#[cfg(feature = "redb-store")]
pub use redb_store::RedbEvalStore;
