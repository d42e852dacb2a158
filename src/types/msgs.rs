//! Messages accepted by the orchestration core
//!
//! Vote messages carry a digest identifying the observation independently of
//! the voter, so every observer voting on the same event lands on the same
//! ballot.

use super::cctx::{ProtocolContractVersion, RevertOptions};
use super::coin::CoinType;
use super::keccak256_hex;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Outcome of a ballot, as reported by the observer collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BallotStatus {
    SuccessObservation,
    FailureObservation,
    InProgress,
}

/// Outcome of an outbound transaction on the destination chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiveStatus {
    #[default]
    Created,
    Success,
    Failed,
}

/// Observation of an inbound transaction on a connected chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgVoteInbound {
    pub creator: String,
    pub sender: String,
    pub sender_chain_id: i64,
    pub tx_origin: String,
    pub receiver: String,
    pub receiver_chain: i64,
    pub amount: U256,
    pub message: String,
    pub inbound_hash: String,
    pub inbound_block_height: u64,
    pub gas_limit: u64,
    pub coin_type: CoinType,
    pub asset: String,
    pub event_index: u64,
    pub protocol_contract_version: ProtocolContractVersion,
    pub revert_options: RevertOptions,
    pub is_cross_chain_call: bool,
}

impl MsgVoteInbound {
    /// Ballot and cctx index of the observation; the voter and the
    /// observed block height do not take part.
    pub fn digest(&self) -> String {
        let canonical = format!(
            "inbound|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{:?}|{}|{}|{}|{}",
            self.sender,
            self.sender_chain_id,
            self.tx_origin,
            self.receiver,
            self.receiver_chain,
            self.amount,
            self.message,
            self.inbound_hash,
            self.gas_limit,
            self.coin_type,
            self.asset,
            self.event_index,
            self.protocol_contract_version,
            self.revert_options.revert_address,
            self.revert_options.call_on_revert,
            self.revert_options.abort_address,
            self.is_cross_chain_call,
        );
        keccak256_hex(canonical.as_bytes())
    }
}

/// Observation of an outbound transaction for a cctx leg
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgVoteOutbound {
    pub creator: String,
    pub cctx_hash: String,
    pub observed_outbound_hash: String,
    pub observed_outbound_block_height: u64,
    pub observed_outbound_gas_used: u64,
    pub observed_outbound_effective_gas_price: U256,
    pub observed_outbound_effective_gas_limit: u64,
    pub value_received: U256,
    pub status: ReceiveStatus,
    pub outbound_chain: i64,
    pub outbound_tss_nonce: u64,
    pub coin_type: CoinType,
}

impl MsgVoteOutbound {
    pub fn digest(&self) -> String {
        let canonical = format!(
            "outbound|{}|{}|{}|{}|{}|{}|{}|{:?}|{}|{}|{}",
            self.cctx_hash,
            self.observed_outbound_hash,
            self.observed_outbound_block_height,
            self.observed_outbound_gas_used,
            self.observed_outbound_effective_gas_price,
            self.observed_outbound_effective_gas_limit,
            self.value_received,
            self.status,
            self.outbound_chain,
            self.outbound_tss_nonce,
            self.coin_type,
        );
        keccak256_hex(canonical.as_bytes())
    }
}

/// `Withdrawal` event of a ZRC20 contract, decoded from a hub transaction log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgZrc20Withdrawal {
    /// Contract called by the hub transaction
    pub emitting_contract: String,
    pub tx_origin: String,
    /// ZRC20 that emitted the event
    pub zrc20: Address,
    /// Receiver, encoded for the destination chain
    pub to: String,
    pub value: U256,
    pub tx_hash: String,
    pub block_number: u64,
    pub event_index: u64,
}

/// `ZetaSent` event of the hub connector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgZetaSent {
    pub emitting_contract: String,
    pub tx_origin: String,
    pub destination_chain_id: i64,
    /// Hex receiver address, with or without 0x prefix
    pub destination_address: String,
    pub zeta_value_and_gas: U256,
    /// Hex payload relayed to the receiver
    pub message: String,
    pub tx_hash: String,
    pub block_number: u64,
    pub event_index: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgVoteGasPrice {
    pub creator: String,
    pub chain_id: i64,
    pub price: u64,
    pub priority_fee: u64,
    pub block_number: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgMigrateTssFunds {
    pub creator: String,
    pub chain_id: i64,
    pub amount: U256,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUpdateTssAddress {
    pub creator: String,
    pub tss_pubkey: String,
}

/// Merkle inclusion proof, opaque to this crate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgAddOutboundTracker {
    pub creator: String,
    pub chain_id: i64,
    pub nonce: u64,
    pub tx_hash: String,
    pub proof: Option<Proof>,
    pub block_hash: String,
    pub tx_index: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgRefundAbortedCctx {
    pub creator: String,
    pub cctx_index: String,
    /// Required when the original sender is not a hub address
    pub refund_address: String,
}
