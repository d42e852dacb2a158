//! Data model of the orchestration core
//!
//! Holds:
//! - The CCTX record and its status state machine
//! - Nonce, gas price, tracker and TSS records
//! - Inbound/outbound vote messages and admin messages

pub mod cctx;
pub mod chain;
pub mod coin;
pub mod gas_price;
pub mod msgs;
pub mod nonce;
pub mod tracker;
pub mod tss;

pub use cctx::{
    CctxStatus, CrossChainTx, InboundParams, OutboundParams, ProtocolContractVersion,
    RevertOptions, Status, TxFinalizationStatus,
};
pub use chain::{Chain, ChainParams, GatewayKind, Network, Vm};
pub use coin::{CoinType, ForeignCoin};
pub use gas_price::GasPrice;
pub use msgs::{
    BallotStatus, MsgAddOutboundTracker, MsgMigrateTssFunds, MsgRefundAbortedCctx,
    MsgUpdateTssAddress, MsgVoteGasPrice, MsgVoteInbound, MsgVoteOutbound, MsgZetaSent,
    MsgZrc20Withdrawal, Proof, ReceiveStatus,
};
pub use nonce::{ChainNonce, NonceToCctx, PendingNonces};
pub use tracker::{OutboundTracker, TxHash};
pub use tss::{Tss, TssFundMigratorInfo};

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

/// Cctx indexes created by a given inbound hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundHashToCctx {
    pub inbound_hash: String,
    pub cctx_index: Vec<String>,
}

/// Hub-native amount locked in aborted cctxs that were not refunded yet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZetaAccounting {
    pub aborted_zeta_amount: U256,
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

/// 0x-prefixed hex keccak256 digest
pub fn keccak256_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(keccak256(data)))
}

/// Parse a 20-byte hex address, with or without 0x prefix
pub fn parse_evm_address(input: &str) -> Option<Address> {
    let digits = input.strip_prefix("0x").unwrap_or(input);
    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    input.parse().ok()
}
