//! Outbound trackers: candidate transaction hashes reported for a pending nonce

use serde::{Deserialize, Serialize};

pub const MAX_OUTBOUND_TRACKER_HASHES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHash {
    pub tx_hash: String,
    pub tx_signer: String,
    /// Set once an inclusion proof for the hash has been verified
    pub proven: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundTracker {
    pub index: String,
    pub chain_id: i64,
    pub nonce: u64,
    pub hash_list: Vec<TxHash>,
}

impl OutboundTracker {
    pub fn new(chain_id: i64, nonce: u64) -> Self {
        Self {
            index: tracker_index(chain_id, nonce),
            chain_id,
            nonce,
            hash_list: Vec::new(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.hash_list.len() >= MAX_OUTBOUND_TRACKER_HASHES
    }

    pub fn find_hash_mut(&mut self, tx_hash: &str) -> Option<&mut TxHash> {
        self.hash_list
            .iter_mut()
            .find(|h| h.tx_hash.eq_ignore_ascii_case(tx_hash))
    }
}

pub fn tracker_index(chain_id: i64, nonce: u64) -> String {
    format!("{}-{}", chain_id, nonce)
}
