//! Handling of aborted cctxs: the automatic abort hook and admin refunds

use super::engine::CrosschainEngine;
use crate::error::{CrosschainError, CrosschainResult};
use crate::state::{with_cache, Context};
use crate::types::{
    parse_evm_address, CctxStatus, CoinType, CrossChainTx, MsgRefundAbortedCctx,
    ProtocolContractVersion,
};

use alloy_primitives::Address;
use tracing::{info, warn};

impl CrosschainEngine {
    /// Hand the funds of a freshly aborted cctx to its abort address.
    ///
    /// Only V2 cctxs that name an abort address and were not refunded yet are
    /// processed; anything else is recorded in `error_message_abort`.
    pub(crate) fn process_abort(&self, ctx: &mut Context<'_>, cctx: &mut CrossChainTx) {
        let abort_address = match cctx.revert_options.evm_abort_address() {
            Some(address)
                if cctx.protocol_contract_version == ProtocolContractVersion::V2
                    && !cctx.cctx_status.is_abort_refunded =>
            {
                address
            }
            _ => {
                cctx.cctx_status.error_message_abort =
                    "abort processing not supported for this cctx".to_string();
                return;
            }
        };

        // a reverted onAbort hook still leaves the funds at the abort address
        let outcome = with_cache(ctx, |tmp| {
            match self.fungible.process_abort(tmp, &*cctx, abort_address) {
                Ok(()) => Ok(None),
                Err(err) if err.is_revertible() => Ok(Some(err)),
                Err(err) => Err(err),
            }
        });

        match outcome {
            Ok(hook_error) => {
                cctx.cctx_status.is_abort_refunded = true;
                if let Some(err) = hook_error {
                    cctx.cctx_status.error_message_abort = format!("failed to process abort: {}", err);
                }
                info!("Abort of cctx {} processed to {}", cctx.index, abort_address);
            }
            Err(err) => {
                warn!("Abort processing failed for cctx {}: {}", cctx.index, err);
                cctx.cctx_status.error_message_abort = format!("failed to process abort: {}", err);
            }
        }
    }

    /// Refund an aborted cctx on the hub
    pub fn refund_aborted_cctx(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgRefundAbortedCctx,
    ) -> CrosschainResult<()> {
        self.ensure_admin(&msg.creator)?;

        let mut cctx = ctx
            .state()
            .get_cctx(&msg.cctx_index)?
            .ok_or_else(|| CrosschainError::CctxNotFound(msg.cctx_index.clone()))?;
        if cctx.status() != CctxStatus::Aborted {
            return Err(CrosschainError::InvalidStatus(format!(
                "cctx {} is {}, not aborted",
                cctx.index,
                cctx.status()
            )));
        }
        if cctx.cctx_status.is_abort_refunded {
            return Err(CrosschainError::InvalidStatus(format!(
                "cctx {} is already refunded",
                cctx.index
            )));
        }

        let refund_address = refund_address(&cctx, &msg.refund_address)?;
        let amount = cctx.aborted_amount();
        if amount.is_zero() {
            return Err(CrosschainError::InvalidRequest("no amount to refund".to_string()));
        }
        let chain_id = self.connected_chain_id(&cctx);

        with_cache(ctx, |tmp| match cctx.inbound_params.coin_type {
            CoinType::Gas => {
                let zrc20 = self.fungible.gas_coin_zrc20(tmp, chain_id)?;
                self.fungible.deposit_zrc20(tmp, zrc20, refund_address, amount)
            }
            CoinType::Erc20 => {
                let zrc20 = self
                    .fungible
                    .foreign_coin_zrc20(tmp, &cctx.inbound_params.asset, chain_id)?;
                self.fungible.deposit_zrc20(tmp, zrc20, refund_address, amount)
            }
            CoinType::Zeta => {
                self.fungible.deposit_hub_native(tmp, refund_address, amount)?;
                tmp.state().remove_aborted_zeta_amount(amount)
            }
            other => Err(CrosschainError::InvalidCoinType(format!(
                "unsupported coin type for refund: {}",
                other
            ))),
        })?;

        cctx.cctx_status.is_abort_refunded = true;
        ctx.state().set_cctx(&cctx)?;

        info!(
            "Refunded {} of aborted cctx {} to {}",
            amount, cctx.index, refund_address
        );
        Ok(())
    }

    /// External chain the cctx moved funds from or to
    fn connected_chain_id(&self, cctx: &CrossChainTx) -> i64 {
        let sender_chain_id = cctx.inbound_params.sender_chain_id;
        if self.settings.is_hub_chain(sender_chain_id) {
            cctx.original_destination_chain_id().unwrap_or(sender_chain_id)
        } else {
            sender_chain_id
        }
    }
}

/// Explicit refund address, or the sender when it is an EVM address
fn refund_address(cctx: &CrossChainTx, requested: &str) -> CrosschainResult<Address> {
    if !requested.is_empty() {
        return parse_evm_address(requested).ok_or_else(|| {
            CrosschainError::InvalidAddress(format!("invalid refund address {}", requested))
        });
    }
    parse_evm_address(&cctx.inbound_params.sender).ok_or_else(|| {
        CrosschainError::InvalidAddress(format!(
            "refund address is required for sender {}",
            cctx.inbound_params.sender
        ))
    })
}
