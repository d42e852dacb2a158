//! Settlement strategies per destination chain
//!
//! - `Observers`: external chains; gas is charged and a TSS nonce assigned,
//!   then observers sign and broadcast the outbound
//! - `Zevm`: the hub itself; the deposit executes synchronously

use super::engine::CrosschainEngine;
use crate::error::{CrosschainError, CrosschainResult};
use crate::metrics;
use crate::state::{with_cache, Context};
use crate::tx::update_nonce;
use crate::types::{CctxStatus, CrossChainTx, GatewayKind};

use alloy_primitives::U256;
use tracing::{info, warn};

/// Gateway used to initiate the outbound of a cctx
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CctxGateway {
    Observers,
    Zevm,
}

impl CctxGateway {
    /// Gateway serving a registered gateway kind
    pub const fn resolve(kind: GatewayKind) -> Self {
        match kind {
            GatewayKind::Observers => CctxGateway::Observers,
            GatewayKind::Zevm => CctxGateway::Zevm,
        }
    }
}

impl CrosschainEngine {
    /// Start settlement of the current leg and return the resulting status.
    ///
    /// Effects are committed only when the attempt succeeds. A failed attempt
    /// leaves `cctx` aborted; unexpected failures are also returned as errors.
    pub fn initiate_outbound(
        &self,
        ctx: &mut Context<'_>,
        cctx: &mut CrossChainTx,
        should_pay_gas: bool,
    ) -> CrosschainResult<CctxStatus> {
        let receiver_chain_id = cctx.current_outbound()?.receiver_chain_id;
        let chain = self.supported_chain(receiver_chain_id)?;

        match CctxGateway::resolve(chain.gateway) {
            CctxGateway::Observers => self.initiate_observers_outbound(ctx, cctx, should_pay_gas),
            CctxGateway::Zevm => self.initiate_zevm_outbound(ctx, cctx),
        }
    }

    fn initiate_observers_outbound(
        &self,
        ctx: &mut Context<'_>,
        cctx: &mut CrossChainTx,
        should_pay_gas: bool,
    ) -> CrosschainResult<CctxStatus> {
        let receiver_chain_id = cctx.current_outbound()?.receiver_chain_id;
        let inbound_amount = cctx.inbound_params.amount;

        let result = with_cache(ctx, |tmp| {
            let tss = self.observer.tss().ok_or(CrosschainError::TssNotFound)?;
            let mut staged = cctx.clone();
            if should_pay_gas {
                self.gas_payer()
                    .pay_gas_and_update_cctx(tmp, receiver_chain_id, &mut staged, inbound_amount)?;
            } else {
                staged.current_outbound_mut()?.amount = inbound_amount;
            }
            update_nonce(tmp, &tss.tss_pubkey, receiver_chain_id, &mut staged)?;
            Ok::<_, CrosschainError>(staged)
        });

        match result {
            Ok(staged) => {
                *cctx = staged;
                cctx.set_pending_outbound("", ctx.timestamp());
                info!(
                    "Cctx {} pending outbound on chain {} with nonce {}",
                    cctx.index,
                    receiver_chain_id,
                    cctx.current_outbound()?.tss_nonce
                );
                Ok(CctxStatus::PendingOutbound)
            }
            Err(err) => {
                let message = err.to_string();
                warn!("Aborting cctx {}: {}", cctx.index, message);
                cctx.set_abort(&message, &message, ctx.timestamp());
                metrics::record_abort("initiate_outbound");
                Err(err)
            }
        }
    }

    fn initiate_zevm_outbound(
        &self,
        ctx: &mut Context<'_>,
        cctx: &mut CrossChainTx,
    ) -> CrosschainResult<CctxStatus> {
        cctx.current_outbound_mut()?.amount = cctx.inbound_params.amount;

        let deposit = with_cache(ctx, |tmp| self.fungible.handle_deposit(tmp, &*cctx));
        let deposit_err = match deposit {
            Ok(()) => {
                cctx.set_outbound_mined("Remote omnichain contract call completed", ctx.timestamp());
                info!("Cctx {} settled on the hub", cctx.index);
                return Ok(CctxStatus::OutboundMined);
            }
            Err(err) if err.is_revertible() => err,
            Err(err) => {
                let message = err.to_string();
                warn!("Aborting cctx {}: deposit failed: {}", cctx.index, message);
                cctx.set_abort(
                    "error during deposit that is not smart contract revert",
                    &message,
                    ctx.timestamp(),
                );
                metrics::record_abort("hub_deposit");
                return Err(err);
            }
        };

        // the deposit was reverted by the receiver: send the funds back
        let deposit_message = deposit_err.to_string();
        let input_amount = cctx.inbound_params.amount;
        let fallback_gas_limit = cctx.outbound_params[0].gas_limit;
        let result = with_cache(ctx, |tmp| {
            let mut staged = cctx.clone();
            self.create_revert_outbound(tmp, &mut staged, input_amount, fallback_gas_limit)?;
            Ok::<_, CrosschainError>(staged)
        });

        match result {
            Ok(staged) => {
                *cctx = staged;
                cctx.cctx_status.change_status(
                    CctxStatus::PendingRevert,
                    &deposit_message,
                    &deposit_message,
                    ctx.timestamp(),
                );
                info!("Cctx {} reverted by receiver, pending revert", cctx.index);
                Ok(CctxStatus::PendingRevert)
            }
            Err(err) => {
                let message = format!("{} deposit revert message: {}", err, deposit_message);
                warn!("Aborting cctx {}: {}", cctx.index, message);
                cctx.set_abort(&message, &err.to_string(), ctx.timestamp());
                metrics::record_abort("hub_deposit_revert");
                Ok(CctxStatus::Aborted)
            }
        }
    }

    /// Append a revert leg towards the sender chain, charge its gas to
    /// `input_amount` and assign its nonce under the current TSS. The status
    /// is left to the caller.
    pub(crate) fn create_revert_outbound(
        &self,
        ctx: &mut Context<'_>,
        cctx: &mut CrossChainTx,
        input_amount: U256,
        fallback_gas_limit: u64,
    ) -> CrosschainResult<()> {
        let sender_chain_id = cctx.inbound_params.sender_chain_id;
        self.supported_chain(sender_chain_id)?;
        let tss = self.observer.tss().ok_or(CrosschainError::TssNotFound)?;

        let gas_payer = self.gas_payer();
        let gas_limit = gas_payer.revert_gas_limit_or(ctx, cctx, fallback_gas_limit)?;
        cctx.add_revert_outbound(gas_limit)
            .map_err(|e| e.context("AddRevertOutbound"))?;

        gas_payer.pay_gas_and_update_cctx(ctx, sender_chain_id, cctx, input_amount)?;
        update_nonce(ctx, &tss.tss_pubkey, sender_chain_id, cctx)?;

        metrics::record_revert_created(sender_chain_id);
        Ok(())
    }
}
