//! Cross-chain transaction data model and status state machine

use super::coin::CoinType;
use super::msgs::{BallotStatus, MsgVoteInbound, MsgVoteOutbound};
use super::parse_evm_address;
use crate::error::{CrosschainError, CrosschainResult};
use crate::metrics;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One original outbound plus at most one revert
pub const MAX_OUTBOUND_PARAMS: usize = 2;

/// Lifecycle state of a CCTX
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CctxStatus {
    PendingInbound,
    PendingOutbound,
    OutboundMined,
    PendingRevert,
    Reverted,
    Aborted,
}

impl CctxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CctxStatus::PendingInbound => "PendingInbound",
            CctxStatus::PendingOutbound => "PendingOutbound",
            CctxStatus::OutboundMined => "OutboundMined",
            CctxStatus::PendingRevert => "PendingRevert",
            CctxStatus::Reverted => "Reverted",
            CctxStatus::Aborted => "Aborted",
        }
    }

    /// Settled states; the cctx never re-enters processing
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CctxStatus::OutboundMined | CctxStatus::Reverted | CctxStatus::Aborted
        )
    }

    /// States waiting on a TSS-signed outbound
    pub fn is_pending(&self) -> bool {
        matches!(self, CctxStatus::PendingOutbound | CctxStatus::PendingRevert)
    }

    /// Legal edges of the status state machine
    pub fn can_transition_to(&self, next: CctxStatus) -> bool {
        use CctxStatus::*;
        match self {
            PendingInbound => matches!(next, PendingOutbound | OutboundMined | PendingRevert | Aborted),
            PendingOutbound => matches!(next, OutboundMined | PendingRevert | Aborted),
            PendingRevert => matches!(next, Reverted | Aborted),
            OutboundMined | Reverted | Aborted => false,
        }
    }
}

impl fmt::Display for CctxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxFinalizationStatus {
    #[default]
    NotFinalized,
    Finalized,
    Executed,
}

/// Gateway contract generation the inbound was emitted by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolContractVersion {
    #[default]
    V1,
    V2,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevertOptions {
    pub revert_address: String,
    pub call_on_revert: bool,
    pub abort_address: String,
    /// Hex payload handed to the revert and abort hooks
    pub revert_message: String,
    pub revert_gas_limit: u64,
}

impl RevertOptions {
    pub fn evm_revert_address(&self) -> Option<Address> {
        parse_evm_address(&self.revert_address).filter(|a| !a.is_zero())
    }

    pub fn evm_abort_address(&self) -> Option<Address> {
        parse_evm_address(&self.abort_address).filter(|a| !a.is_zero())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundParams {
    pub sender: String,
    pub sender_chain_id: i64,
    pub tx_origin: String,
    pub coin_type: CoinType,
    pub asset: String,
    pub amount: U256,
    pub observed_hash: String,
    pub observed_external_height: u64,
    pub ballot_index: String,
    pub finalized_zeta_height: u64,
    pub tx_finalization_status: TxFinalizationStatus,
    pub is_cross_chain_call: bool,
    /// Position of the event within the inbound transaction
    pub event_index: u64,
}

/// One settlement attempt on a destination chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundParams {
    pub receiver: String,
    pub receiver_chain_id: i64,
    pub coin_type: CoinType,
    pub amount: U256,
    pub tss_nonce: u64,
    pub tss_pubkey: String,
    pub gas_limit: u64,
    pub gas_price: U256,
    pub gas_priority_fee: U256,
    /// Gas fee charged to the user in the destination gas asset, when known
    pub user_gas_fee_paid: Option<U256>,
    pub hash: String,
    pub ballot_index: String,
    pub observed_external_height: u64,
    pub gas_used: u64,
    pub effective_gas_price: U256,
    pub effective_gas_limit: u64,
    pub tx_finalization_status: TxFinalizationStatus,
}

impl OutboundParams {
    pub fn new(
        receiver: impl Into<String>,
        receiver_chain_id: i64,
        coin_type: CoinType,
        gas_limit: u64,
        tss_pubkey: impl Into<String>,
    ) -> Self {
        Self {
            receiver: receiver.into(),
            receiver_chain_id,
            coin_type,
            amount: U256::ZERO,
            tss_nonce: 0,
            tss_pubkey: tss_pubkey.into(),
            gas_limit,
            gas_price: U256::ZERO,
            gas_priority_fee: U256::ZERO,
            user_gas_fee_paid: None,
            hash: String::new(),
            ballot_index: String::new(),
            observed_external_height: 0,
            gas_used: 0,
            effective_gas_price: U256::ZERO,
            effective_gas_limit: 0,
            tx_finalization_status: TxFinalizationStatus::NotFinalized,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub status: CctxStatus,
    pub status_message: String,
    pub error_message: String,
    pub created_timestamp: i64,
    pub last_update_timestamp: i64,
    pub is_abort_refunded: bool,
    /// Why automatic abort processing did not run or failed
    pub error_message_abort: String,
}

impl Status {
    pub fn new(status: CctxStatus, timestamp: i64) -> Self {
        Self {
            status,
            status_message: String::new(),
            error_message: String::new(),
            created_timestamp: timestamp,
            last_update_timestamp: timestamp,
            is_abort_refunded: false,
            error_message_abort: String::new(),
        }
    }

    /// Move to `next` along a legal edge; an illegal edge forces Aborted.
    /// Returns whether the requested transition was applied.
    pub fn change_status(
        &mut self,
        next: CctxStatus,
        message: &str,
        error_message: &str,
        timestamp: i64,
    ) -> bool {
        let from = self.status;
        self.last_update_timestamp = timestamp;
        if !error_message.is_empty() {
            self.error_message = error_message.to_string();
        }

        if !from.can_transition_to(next) {
            self.status = CctxStatus::Aborted;
            self.status_message = format!("Failed to transition status from {} to {}", from, next);
            metrics::record_status_transition(from.as_str(), CctxStatus::Aborted.as_str());
            return false;
        }

        self.status = next;
        self.status_message = message.to_string();
        metrics::record_status_transition(from.as_str(), next.as_str());
        true
    }
}

/// The unit of work of the orchestration core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossChainTx {
    pub creator: String,
    pub index: String,
    /// Protocol fees collected in the hub-native coin
    pub zeta_fees: U256,
    pub relayed_message: String,
    pub cctx_status: Status,
    pub inbound_params: InboundParams,
    pub outbound_params: Vec<OutboundParams>,
    pub protocol_contract_version: ProtocolContractVersion,
    pub revert_options: RevertOptions,
}

impl CrossChainTx {
    /// Build the initial CCTX for a finalized inbound observation
    pub fn new_from_inbound(
        msg: &MsgVoteInbound,
        tss_pubkey: &str,
        timestamp: i64,
    ) -> CrosschainResult<Self> {
        let index = msg.digest();
        let tx_origin = if msg.tx_origin.is_empty() {
            msg.sender.clone()
        } else {
            msg.tx_origin.clone()
        };

        let cctx = CrossChainTx {
            creator: msg.creator.clone(),
            index: index.clone(),
            zeta_fees: U256::ZERO,
            relayed_message: msg.message.clone(),
            cctx_status: Status::new(CctxStatus::PendingInbound, timestamp),
            inbound_params: InboundParams {
                sender: msg.sender.clone(),
                sender_chain_id: msg.sender_chain_id,
                tx_origin,
                coin_type: msg.coin_type,
                asset: msg.asset.clone(),
                amount: msg.amount,
                observed_hash: msg.inbound_hash.clone(),
                observed_external_height: msg.inbound_block_height,
                ballot_index: index,
                finalized_zeta_height: 0,
                tx_finalization_status: TxFinalizationStatus::NotFinalized,
                is_cross_chain_call: msg.is_cross_chain_call,
                event_index: msg.event_index,
            },
            outbound_params: vec![OutboundParams::new(
                msg.receiver.clone(),
                msg.receiver_chain,
                msg.coin_type,
                msg.gas_limit,
                tss_pubkey,
            )],
            protocol_contract_version: msg.protocol_contract_version,
            revert_options: msg.revert_options.clone(),
        };

        cctx.validate()?;
        Ok(cctx)
    }

    pub fn status(&self) -> CctxStatus {
        self.cctx_status.status
    }

    /// The last outbound leg; it is the only one that may be unfinalized
    pub fn current_outbound(&self) -> CrosschainResult<&OutboundParams> {
        self.outbound_params
            .last()
            .ok_or_else(|| CrosschainError::InvalidCctx(format!("cctx {} has no outbound params", self.index)))
    }

    pub fn current_outbound_mut(&mut self) -> CrosschainResult<&mut OutboundParams> {
        let index = self.index.clone();
        self.outbound_params
            .last_mut()
            .ok_or_else(|| CrosschainError::InvalidCctx(format!("cctx {} has no outbound params", index)))
    }

    pub fn is_current_outbound_revert(&self) -> bool {
        self.outbound_params.len() >= MAX_OUTBOUND_PARAMS
    }

    /// Destination of the first outbound, reverted or not
    pub fn original_destination_chain_id(&self) -> Option<i64> {
        self.outbound_params.first().map(|p| p.receiver_chain_id)
    }

    /// Append a revert leg sending the current amount back to the sender chain.
    /// The prior leg is marked executed; a second revert is rejected.
    pub fn add_revert_outbound(&mut self, gas_limit: u64) -> CrosschainResult<()> {
        if self.is_current_outbound_revert() {
            return Err(CrosschainError::InvalidRevert("cannot revert a revert tx".to_string()));
        }

        let revert_receiver = match self.protocol_contract_version {
            ProtocolContractVersion::V2 if !self.revert_options.revert_address.is_empty() => {
                match self.revert_options.evm_revert_address() {
                    Some(address) => address.to_checksum(None),
                    None => self.revert_options.revert_address.clone(),
                }
            }
            _ => self.inbound_params.sender.clone(),
        };
        let sender_chain_id = self.inbound_params.sender_chain_id;
        let coin_type = self.inbound_params.coin_type;

        let current = self.outbound_params.last_mut().ok_or_else(|| {
            CrosschainError::InvalidRevert(
                "cannot revert before trying to process an outbound tx".to_string(),
            )
        })?;

        let mut revert = OutboundParams::new(
            revert_receiver,
            sender_chain_id,
            coin_type,
            gas_limit,
            current.tss_pubkey.clone(),
        );
        revert.amount = current.amount;
        current.tx_finalization_status = TxFinalizationStatus::Executed;

        self.outbound_params.push(revert);
        Ok(())
    }

    /// Record the observed outbound on the current leg
    pub fn update_current_outbound(
        &mut self,
        msg: &MsgVoteOutbound,
        ballot_status: BallotStatus,
    ) -> CrosschainResult<()> {
        let current = self.current_outbound_mut()?;
        if ballot_status != BallotStatus::FailureObservation && msg.value_received != current.amount {
            return Err(CrosschainError::InvalidRequest(format!(
                "ValueReceived {} does not match sent value {}",
                msg.value_received, current.amount
            )));
        }

        current.hash = msg.observed_outbound_hash.clone();
        current.gas_used = msg.observed_outbound_gas_used;
        current.effective_gas_price = msg.observed_outbound_effective_gas_price;
        current.effective_gas_limit = msg.observed_outbound_effective_gas_limit;
        current.observed_external_height = msg.observed_outbound_block_height;
        Ok(())
    }

    pub fn set_outbound_ballot_index(&mut self, ballot_index: &str) -> CrosschainResult<()> {
        self.current_outbound_mut()?.ballot_index = ballot_index.to_string();
        Ok(())
    }

    pub fn set_abort(&mut self, message: &str, error_message: &str, timestamp: i64) {
        self.cctx_status
            .change_status(CctxStatus::Aborted, message, error_message, timestamp);
    }

    pub fn set_pending_revert(&mut self, message: &str, timestamp: i64) {
        self.cctx_status
            .change_status(CctxStatus::PendingRevert, message, "", timestamp);
    }

    pub fn set_pending_outbound(&mut self, message: &str, timestamp: i64) {
        self.cctx_status
            .change_status(CctxStatus::PendingOutbound, message, "", timestamp);
    }

    pub fn set_outbound_mined(&mut self, message: &str, timestamp: i64) {
        self.cctx_status
            .change_status(CctxStatus::OutboundMined, message, "", timestamp);
    }

    pub fn set_reverted(&mut self, message: &str, timestamp: i64) {
        self.cctx_status
            .change_status(CctxStatus::Reverted, message, "", timestamp);
    }

    /// Structural checks applied before a cctx is created or committed
    pub fn validate(&self) -> CrosschainResult<()> {
        if self.outbound_params.is_empty() {
            return Err(CrosschainError::InvalidCctx("outbound tx params cannot be empty".to_string()));
        }
        if self.outbound_params.len() > MAX_OUTBOUND_PARAMS {
            return Err(CrosschainError::InvalidCctx(format!(
                "outbound tx params cannot be more than {}",
                MAX_OUTBOUND_PARAMS
            )));
        }
        if !self.index.is_empty() {
            validate_cctx_index(&self.index)?;
        }
        if self.inbound_params.sender.is_empty() {
            return Err(CrosschainError::InvalidCctx("inbound sender cannot be empty".to_string()));
        }
        for outbound in &self.outbound_params {
            if outbound.receiver.is_empty() {
                return Err(CrosschainError::InvalidCctx("outbound receiver cannot be empty".to_string()));
            }
            if outbound.receiver_chain_id == 0 {
                return Err(CrosschainError::InvalidCctx("outbound receiver chain id cannot be 0".to_string()));
            }
        }
        Ok(())
    }

    pub fn index_bytes(&self) -> CrosschainResult<[u8; 32]> {
        validate_cctx_index(&self.index)?;
        let mut out = [0u8; 32];
        hex::decode_to_slice(&self.index[2..], &mut out)
            .map_err(|e| CrosschainError::InvalidCctx(format!("invalid cctx index: {}", e)))?;
        Ok(out)
    }

    /// Amount stuck in an aborted cctx: the current leg amount, or the inbound amount
    pub fn aborted_amount(&self) -> U256 {
        match self.outbound_params.last() {
            Some(current) if !current.amount.is_zero() => current.amount,
            _ => self.inbound_params.amount,
        }
    }

    /// Short identifier used in log lines and error messages
    pub fn log_identifier(&self) -> String {
        match self.outbound_params.last() {
            Some(current) => format!(
                "{}-{}-{}-{}",
                self.inbound_params.sender, self.inbound_params.sender_chain_id,
                current.receiver_chain_id, current.tss_nonce
            ),
            None => format!("{}-{}", self.inbound_params.sender, self.inbound_params.sender_chain_id),
        }
    }
}

/// A cctx index is a 0x-prefixed 32-byte hex digest
pub fn validate_cctx_index(index: &str) -> CrosschainResult<()> {
    let valid = index.len() == 66
        && index.starts_with("0x")
        && index[2..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(CrosschainError::InvalidCctx(format!("invalid cctx index {}", index)));
    }
    Ok(())
}
