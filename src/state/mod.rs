//! State management over an ordered key-value store
//!
//! Handles:
//! - Staged writes that merge into durable state only on commit
//! - Cctx persistence with nonce and inbound-hash indexes
//! - Nonce, gas price, tracker and migration records

mod manager;
mod store;

pub use manager::{CctxStats, StateManager};
pub use store::{with_cache, BlockInfo, CacheStore, Context, KvStore, MemStore};
