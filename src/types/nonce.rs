//! Nonce bookkeeping records

use serde::{Deserialize, Serialize};

/// Next nonce to assign on a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainNonce {
    pub chain_id: i64,
    pub nonce: u64,
}

/// Nonces assigned under a TSS key but not yet confirmed on the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingNonces {
    pub tss: String,
    pub chain_id: i64,
    pub nonce_low: u64,
    pub nonce_high: u64,
}

impl PendingNonces {
    pub fn contains(&self, nonce: u64) -> bool {
        nonce >= self.nonce_low && nonce <= self.nonce_high
    }

    pub fn is_empty(&self) -> bool {
        self.nonce_low == self.nonce_high
    }
}

/// Secondary index from an outbound nonce to its cctx
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceToCctx {
    pub tss: String,
    pub chain_id: i64,
    pub nonce: u64,
    pub cctx_index: String,
}
