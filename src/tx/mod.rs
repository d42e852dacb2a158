//! Outbound preparation: gas payment and nonce allocation

pub mod gas;
pub mod nonce;

pub use gas::{median_gas_values, ChainGasParams, GasPayer};
pub use nonce::{init_chain, init_pending_nonces, remove_from_pending_nonces, update_nonce};
