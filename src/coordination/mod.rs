//! Coordination engine for cross-chain transaction orchestration
//!
//! The engine:
//! 1. Finalizes inbound observations into cctxs and initiates their outbound
//! 2. Settles outbound observations, creating revert legs or aborting
//! 3. Maintains gas prices and outbound trackers voted by observers
//! 4. Rotates the TSS key through per-chain fund migrations
//! 5. Turns withdrawals emitted on the hub into outbound cctxs

pub mod abort;
pub mod engine;
pub mod gas_price;
pub mod gateway;
pub mod inbound;
pub mod migration;
pub mod outbound;
pub mod query;
pub mod tracker;
pub mod withdrawal;

#[cfg(test)]
mod scenarios;

pub use engine::{CrosschainEngine, CrosschainMsg, MsgResponse};
pub use gateway::CctxGateway;
pub use migration::CMD_MIGRATE_TSS_FUNDS;
pub use query::PendingCctxs;
pub use withdrawal::ZETA_SENT_GAS_LIMIT;
