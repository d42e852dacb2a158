//! Outbound processing: observation voting and finalization
//!
//! A finalized outbound ballot settles the current leg:
//! - success: `PendingOutbound` → `OutboundMined`, `PendingRevert` → `Reverted`
//! - failure of an external-chain transfer: a revert leg is created
//! - failure of a command, a hub withdrawal or a revert: the cctx aborts
//!
//! Unused gas is returned to the stability pool, or partly to a hub sender.

use super::engine::CrosschainEngine;
use crate::error::{CrosschainError, CrosschainResult};
use crate::metrics;
use crate::state::{with_cache, Context};
use crate::tx::remove_from_pending_nonces;
use crate::types::{
    parse_evm_address, BallotStatus, CctxStatus, CoinType, CrossChainTx, MsgVoteOutbound,
    OutboundParams, TxFinalizationStatus,
};

use alloy_primitives::U256;
use tracing::{debug, error, info, warn};

/// `percent` % of `amount`, rounded down
pub fn percent_of(amount: U256, percent: u64) -> U256 {
    amount.saturating_mul(U256::from(percent)) / U256::from(100u64)
}

impl CrosschainEngine {
    /// Vote on an outbound observation and settle the leg once the ballot
    /// finalizes
    pub fn vote_outbound(&self, ctx: &mut Context<'_>, msg: &MsgVoteOutbound) -> CrosschainResult<()> {
        self.observer.tss().ok_or(CrosschainError::TssNotFound)?;
        let mut cctx = self.validate_outbound_message(ctx, msg)?;

        let ballot_index = msg.digest();
        let (finalized, ballot_status) = self.observer.vote_on_outbound_ballot(msg, &ballot_index)?;
        if !finalized {
            debug!("Outbound ballot {} not finalized yet", ballot_index);
            return Ok(());
        }

        if cctx.status().is_terminal() {
            return Err(CrosschainError::CctxAlreadyFinalized(format!(
                "cctx {} status {}",
                cctx.index,
                cctx.status()
            )));
        }

        let timestamp = ctx.timestamp();
        cctx.set_outbound_ballot_index(&ballot_index)?;
        if let Err(err) = cctx.update_current_outbound(msg, ballot_status) {
            let message = err.to_string();
            warn!("Aborting cctx {}: {}", cctx.index, message);
            cctx.current_outbound_mut()?.tx_finalization_status = TxFinalizationStatus::Executed;
            cctx.set_abort(&message, &message, timestamp);
            metrics::record_abort("add_outbound");
            self.process_abort(ctx, &mut cctx);
            return self.save_outbound(ctx, &cctx);
        }

        self.manage_unused_gas_fee(ctx, &cctx);

        if let Err(err) = self.validate_outbound_observers(ctx, &mut cctx, ballot_status) {
            error!("Unable to process outbound of cctx {}: {}", cctx.index, err);
            cctx.current_outbound_mut()?.tx_finalization_status = TxFinalizationStatus::Executed;
            cctx.set_abort(
                &format!("outbound failed unable to process: {}", err),
                &err.to_string(),
                timestamp,
            );
            metrics::record_abort("validate_outbound");
        }

        if cctx.status() == CctxStatus::Aborted {
            self.process_abort(ctx, &mut cctx);
        }
        self.save_outbound(ctx, &cctx)
    }

    /// Load the cctx an outbound vote refers to and check the vote matches its
    /// current leg
    pub fn validate_outbound_message(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgVoteOutbound,
    ) -> CrosschainResult<CrossChainTx> {
        let cctx = ctx.state().get_cctx(&msg.cctx_hash)?.ok_or_else(|| {
            CrosschainError::InvalidRequest(format!("CCTX {} does not exist", msg.cctx_hash))
        })?;

        let current = cctx.current_outbound()?;
        if current.tss_nonce != msg.outbound_tss_nonce {
            return Err(CrosschainError::InvalidRequest(format!(
                "OutboundTssNonce {} does not match CCTX OutboundTssNonce {}",
                msg.outbound_tss_nonce, current.tss_nonce
            )));
        }
        if current.receiver_chain_id != msg.outbound_chain {
            return Err(CrosschainError::InvalidRequest(format!(
                "OutboundChain {} does not match CCTX OutboundChain {}",
                msg.outbound_chain, current.receiver_chain_id
            )));
        }

        Ok(cctx)
    }

    /// Return the gas the current leg did not use. Failures are logged only.
    pub fn manage_unused_gas_fee(&self, ctx: &mut Context<'_>, cctx: &CrossChainTx) {
        let Ok(current) = cctx.current_outbound() else {
            return;
        };

        let result = match current.user_gas_fee_paid {
            Some(user_gas_fee_paid) => {
                with_cache(ctx, |tmp| self.use_remaining_gas_fee(tmp, cctx, user_gas_fee_paid))
            }
            None => with_cache(ctx, |tmp| self.fund_stability_pool_from_remaining_fees(tmp, current)),
        };

        if let Err(err) = result {
            warn!(
                "Failed to fund gas stability pool with remaining fees of cctx {}: {}",
                cctx.index, err
            );
        }
    }

    fn use_remaining_gas_fee(
        &self,
        ctx: &mut Context<'_>,
        cctx: &CrossChainTx,
        user_gas_fee_paid: U256,
    ) -> CrosschainResult<()> {
        let current = cctx.current_outbound()?;
        let fee_paid = U256::from(current.gas_used).saturating_mul(current.effective_gas_price);
        // the pool covers an outbound that cost more than was charged
        if fee_paid >= user_gas_fee_paid {
            return Ok(());
        }

        let remaining = user_gas_fee_paid - fee_paid;
        let usable = percent_of(remaining, self.settings.fees.usable_remaining_fees_percentage);
        if usable.is_zero() {
            return Ok(());
        }

        let receiver_chain_id = current.receiver_chain_id;
        let params = self
            .observer
            .chain_params(receiver_chain_id)
            .ok_or(CrosschainError::ChainParamsNotFound {
                chain_id: receiver_chain_id,
            })?;

        let refund_to = if self.settings.is_hub_chain(cctx.inbound_params.sender_chain_id) {
            parse_evm_address(&cctx.inbound_params.sender)
        } else {
            None
        };
        let pool_percentage = match refund_to {
            Some(_) => params.stability_pool_percentage,
            None => 100,
        };

        let pool_amount = percent_of(usable, pool_percentage);
        let refund_amount = usable - pool_amount;

        if !pool_amount.is_zero() {
            self.fungible
                .fund_gas_stability_pool(ctx, receiver_chain_id, pool_amount)?;
        }
        if let Some(receiver) = refund_to {
            if !refund_amount.is_zero() {
                self.fungible
                    .refund_remaining_gas_fees(ctx, receiver_chain_id, refund_amount, receiver)?;
            }
        }

        debug!(
            "Unused gas of cctx {}: {} to stability pool, {} refunded",
            cctx.index, pool_amount, refund_amount
        );
        Ok(())
    }

    /// Legacy legs carry no charged fee; the pool gets a share of the unused gas limit
    fn fund_stability_pool_from_remaining_fees(
        &self,
        ctx: &mut Context<'_>,
        leg: &OutboundParams,
    ) -> CrosschainResult<()> {
        let gas_limit = leg.effective_gas_limit;
        let gas_used = leg.gas_used;
        let gas_price = leg.effective_gas_price;

        if gas_limit == gas_used || gas_limit == 0 || gas_used == 0 || gas_price.is_zero() {
            return Ok(());
        }
        if gas_limit < gas_used {
            return Err(CrosschainError::InvalidRequest(format!(
                "the gas limit {} is less than the gas used {}",
                gas_limit, gas_used
            )));
        }

        let remaining_fees = U256::from(gas_limit - gas_used).saturating_mul(gas_price);
        let amount = percent_of(
            remaining_fees,
            self.settings.fees.remaining_fees_to_stability_pool_percent,
        );
        self.fungible
            .fund_gas_stability_pool(ctx, leg.receiver_chain_id, amount)
    }

    /// Apply a finalized outbound ballot to the cctx. The changes, including
    /// any revert leg, are committed only if every step succeeds and the
    /// resulting cctx is valid.
    pub fn validate_outbound_observers(
        &self,
        ctx: &mut Context<'_>,
        cctx: &mut CrossChainTx,
        ballot_status: BallotStatus,
    ) -> CrosschainResult<()> {
        let staged = with_cache(ctx, |tmp| {
            let mut staged = cctx.clone();
            match ballot_status {
                BallotStatus::SuccessObservation => {
                    validate_successful_outbound(&mut staged, tmp.timestamp())?
                }
                BallotStatus::FailureObservation => self.validate_failed_outbound(tmp, &mut staged)?,
                BallotStatus::InProgress => {}
            }
            staged.validate()?;
            Ok::<_, CrosschainError>(staged)
        })?;

        *cctx = staged;
        Ok(())
    }

    fn validate_failed_outbound(
        &self,
        ctx: &mut Context<'_>,
        cctx: &mut CrossChainTx,
    ) -> CrosschainResult<()> {
        let old_status = cctx.status();
        let timestamp = ctx.timestamp();
        let coin_type = cctx.inbound_params.coin_type;

        if coin_type == CoinType::Cmd {
            // commands carry no inbound to return
            cctx.current_outbound_mut()?.tx_finalization_status = TxFinalizationStatus::Executed;
            cctx.set_abort("Outbound failed", "", timestamp);
            metrics::record_abort("outbound_failed");
        } else if self.settings.is_hub_chain(cctx.inbound_params.sender_chain_id) {
            if coin_type == CoinType::Zeta {
                self.revert_hub_outbound(ctx, cctx)
                    .map_err(|e| e.context("validateFailedOutboundObserversForZEVM"))?;
            } else {
                cctx.current_outbound_mut()?.tx_finalization_status = TxFinalizationStatus::Executed;
                cctx.set_abort("Outbound failed", "", timestamp);
                metrics::record_abort("outbound_failed");
            }
        } else {
            match old_status {
                CctxStatus::PendingOutbound => {
                    let input_amount = cctx.current_outbound()?.amount;
                    let fallback_gas_limit = cctx.outbound_params[0].gas_limit;
                    self.create_revert_outbound(ctx, cctx, input_amount, fallback_gas_limit)
                        .map_err(|e| e.context("validateFailedOutbound"))?;
                    cctx.set_pending_revert("Outbound failed, start revert", timestamp);
                }
                CctxStatus::PendingRevert => {
                    cctx.current_outbound_mut()?.tx_finalization_status = TxFinalizationStatus::Executed;
                    cctx.set_abort("Outbound failed: revert failed; abort TX", "", timestamp);
                    metrics::record_abort("revert_failed");
                }
                _ => {}
            }
        }

        info!(
            "Outbound of cctx {} failed: {} -> {}",
            cctx.index,
            old_status,
            cctx.status()
        );
        Ok(())
    }

    /// Revert a hub-sent transfer on the hub itself; no signing is needed, so
    /// the revert completes immediately
    fn revert_hub_outbound(&self, ctx: &mut Context<'_>, cctx: &mut CrossChainTx) -> CrosschainResult<()> {
        let timestamp = ctx.timestamp();
        cctx.index_bytes()
            .map_err(|e| e.context("failed reverting GetCCTXIndexBytes"))?;

        cctx.add_revert_outbound(self.settings.hub.zevm_revert_gas_limit)
            .map_err(|e| e.context("failed AddRevertOutbound"))?;
        cctx.set_pending_revert("Outbound failed, trying revert", timestamp);

        let message = decode_relayed_message(&cctx.relayed_message)?;
        self.fungible
            .revert_and_call_contract(ctx, cctx, &message)
            .map_err(|e| e.context("failed ZETARevertAndCallContract"))?;

        cctx.set_reverted("Outbound failed, revert executed", timestamp);
        let current = cctx.current_outbound_mut()?;
        current.observed_external_height = ctx.block_height();
        current.tx_finalization_status = TxFinalizationStatus::Executed;
        Ok(())
    }

    /// Confirm the nonces of settled legs, drop their trackers and save the cctx.
    /// A leg still waiting for its outbound keeps its nonce pending.
    pub fn save_outbound(&self, ctx: &mut Context<'_>, cctx: &CrossChainTx) -> CrosschainResult<()> {
        let current_pending = cctx.status().is_pending();
        let last = cctx.outbound_params.len().saturating_sub(1);

        for (position, leg) in cctx.outbound_params.iter().enumerate() {
            if current_pending && position == last {
                continue;
            }
            remove_from_pending_nonces(ctx, &leg.tss_pubkey, leg.receiver_chain_id, leg.tss_nonce)?;
            ctx.state()
                .remove_outbound_tracker(leg.receiver_chain_id, leg.tss_nonce);
        }

        ctx.state().save_cctx(cctx)
    }
}

fn validate_successful_outbound(cctx: &mut CrossChainTx, timestamp: i64) -> CrosschainResult<()> {
    match cctx.status() {
        CctxStatus::PendingRevert => cctx.set_reverted("Outbound succeeded, revert executed", timestamp),
        CctxStatus::PendingOutbound => cctx.set_outbound_mined("Outbound succeeded, mined", timestamp),
        _ => return Ok(()),
    }
    cctx.current_outbound_mut()?.tx_finalization_status = TxFinalizationStatus::Executed;
    info!("Outbound of cctx {} succeeded: {}", cctx.index, cctx.status());
    Ok(())
}

/// Relayed messages are hex, with or without 0x prefix
fn decode_relayed_message(message: &str) -> CrosschainResult<Vec<u8>> {
    hex::decode(message.trim_start_matches("0x")).map_err(|e| {
        CrosschainError::InvalidRequest(format!("failed decoding relayed message: {}", e))
    })
}
