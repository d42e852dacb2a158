//! Withdrawals initiated on the hub
//!
//! ZRC20 `Withdrawal` and connector `ZetaSent` events emitted by hub
//! contracts become outbound cctxs whose sender chain is the hub. A failure is
//! returned to the hub transaction, so no cctx is left behind.

use super::engine::CrosschainEngine;
use crate::error::{CrosschainError, CrosschainResult};
use crate::state::Context;
use crate::types::{
    parse_evm_address, Chain, CoinType, CrossChainTx, MsgVoteInbound, MsgZetaSent,
    MsgZrc20Withdrawal, TxFinalizationStatus,
};

use tracing::info;

/// Gas limit of `ZetaSent` outbounds, before the event index is added
pub const ZETA_SENT_GAS_LIMIT: u64 = 90_000;

impl CrosschainEngine {
    /// Create the outbound cctx of a ZRC20 withdrawal. The gas was paid on the
    /// hub when withdrawing, so the leg only records the median gas price.
    pub fn process_zrc20_withdrawal(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgZrc20Withdrawal,
    ) -> CrosschainResult<String> {
        let coin = self.fungible.foreign_coin(ctx, msg.zrc20)?;
        let receiver_chain = self.withdrawal_chain(coin.foreign_chain_id)?;
        validate_receiver(&receiver_chain, &msg.to)?;

        info!(
            "ZRC20 withdrawal of {} to {} on chain {}",
            msg.value, msg.to, receiver_chain.chain_id
        );
        let inbound = MsgVoteInbound {
            sender: msg.emitting_contract.clone(),
            sender_chain_id: self.settings.hub.chain_id,
            tx_origin: msg.tx_origin.clone(),
            receiver: msg.to.clone(),
            receiver_chain: receiver_chain.chain_id,
            amount: msg.value,
            inbound_hash: msg.tx_hash.clone(),
            inbound_block_height: msg.block_number,
            gas_limit: coin.gas_limit,
            coin_type: coin.coin_type,
            asset: coin.asset,
            event_index: msg.event_index,
            ..Default::default()
        };
        self.process_hub_cctx(ctx, &inbound, false)
    }

    /// Burn the hub-native coin sent through the connector and create the
    /// outbound cctx; its gas is paid from the burnt amount.
    pub fn process_zeta_sent(&self, ctx: &mut Context<'_>, msg: &MsgZetaSent) -> CrosschainResult<String> {
        self.fungible
            .burn_hub_native(ctx, msg.zeta_value_and_gas)
            .map_err(|e| e.context("ProcessZetaSentEvent: failed to burn coins from fungible"))?;

        let receiver_chain = self.withdrawal_chain(msg.destination_chain_id)?;
        let params = self
            .observer
            .chain_params(receiver_chain.chain_id)
            .ok_or(CrosschainError::ChainParamsNotFound {
                chain_id: receiver_chain.chain_id,
            })?;
        if params.zeta_token_contract_address.is_empty() {
            return Err(CrosschainError::UnableToSendCoinType(format!(
                "no zeta token contract on chain {}",
                receiver_chain.chain_id
            )));
        }

        let receiver = format!("0x{}", msg.destination_address.trim_start_matches("0x"));
        validate_receiver(&receiver_chain, &receiver)?;

        info!(
            "Zeta withdrawal of {} to {} on chain {}",
            msg.zeta_value_and_gas, receiver, receiver_chain.chain_id
        );
        let inbound = MsgVoteInbound {
            sender: msg.emitting_contract.clone(),
            sender_chain_id: self.settings.hub.chain_id,
            tx_origin: msg.tx_origin.clone(),
            receiver,
            receiver_chain: receiver_chain.chain_id,
            amount: msg.zeta_value_and_gas,
            message: msg.message.clone(),
            inbound_hash: msg.tx_hash.clone(),
            inbound_block_height: msg.block_number,
            // one tx can emit several events; the index keeps their cctxs apart
            gas_limit: ZETA_SENT_GAS_LIMIT + msg.event_index,
            coin_type: CoinType::Zeta,
            event_index: msg.event_index,
            ..Default::default()
        };
        self.process_hub_cctx(ctx, &inbound, true)
    }

    fn withdrawal_chain(&self, chain_id: i64) -> CrosschainResult<Chain> {
        let chain = self.supported_chain(chain_id)?;
        if !chain.is_external() {
            return Err(CrosschainError::InvalidRequest(format!(
                "withdrawal to chain {} that is not an external chain",
                chain_id
            )));
        }
        Ok(chain)
    }

    fn process_hub_cctx(
        &self,
        ctx: &mut Context<'_>,
        inbound: &MsgVoteInbound,
        should_pay_gas: bool,
    ) -> CrosschainResult<String> {
        if ctx
            .state()
            .is_finalized_inbound(&inbound.inbound_hash, inbound.sender_chain_id, inbound.event_index)
        {
            return Err(CrosschainError::ObservedTxAlreadyFinalized(format!(
                "hub tx {}, event index {}",
                inbound.inbound_hash, inbound.event_index
            )));
        }

        let tss = self.observer.tss().ok_or(CrosschainError::TssNotFound)?;
        let mut cctx = CrossChainTx::new_from_inbound(inbound, &tss.tss_pubkey, ctx.timestamp())?;
        if !should_pay_gas {
            let (gas_price, priority_fee) = self.get_median_gas_values(ctx, inbound.receiver_chain)?;
            let leg = cctx.current_outbound_mut()?;
            leg.gas_price = gas_price;
            leg.gas_priority_fee = priority_fee;
        }

        self.initiate_outbound(ctx, &mut cctx, should_pay_gas)
            .map_err(|e| e.context("ProcessWithdrawalEvent"))?;

        let height = ctx.block_height();
        let mut state = ctx.state();
        state.set_finalized_inbound(&inbound.inbound_hash, inbound.sender_chain_id, inbound.event_index);
        cctx.inbound_params.finalized_zeta_height = height;
        cctx.inbound_params.tx_finalization_status = TxFinalizationStatus::Executed;
        state.save_cctx(&cctx)?;

        info!(
            "Hub withdrawal {} is cctx {} with nonce {}",
            inbound.inbound_hash,
            cctx.index,
            cctx.current_outbound()?.tss_nonce
        );
        Ok(cctx.index)
    }
}

fn validate_receiver(chain: &Chain, receiver: &str) -> CrosschainResult<()> {
    let valid = if chain.is_evm() {
        parse_evm_address(receiver).is_some()
    } else {
        !receiver.is_empty()
    };
    if valid {
        Ok(())
    } else {
        Err(CrosschainError::InvalidAddress(format!(
            "cannot encode address {} for chain {}",
            receiver, chain.chain_id
        )))
    }
}
