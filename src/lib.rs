//! Cross-chain transaction orchestration core
//!
//! Drives each cross-chain transaction (cctx) from a finalized inbound
//! observation to a settled outbound, a completed revert or an abort:
//! - `coordination`: message handlers over the status state machine
//! - `tx`: gas payment and nonce allocation for TSS-signed outbounds
//! - `state`: staged key-value state with typed record access
//! - `external`: the observer, fungible and light-client collaborators

pub mod config;
pub mod coordination;
pub mod error;
pub mod external;
pub mod metrics;
pub mod state;
pub mod telemetry;
pub mod tx;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use coordination::{CrosschainEngine, CrosschainMsg, MsgResponse};
pub use error::{CrosschainError, CrosschainResult};
