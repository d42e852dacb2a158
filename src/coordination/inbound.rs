//! Inbound processing: ballot voting and cctx creation

use super::engine::CrosschainEngine;
use crate::error::{CrosschainError, CrosschainResult};
use crate::state::Context;
use crate::types::{CctxStatus, CoinType, CrossChainTx, MsgVoteInbound, TxFinalizationStatus};

use tracing::{debug, error, info};

impl CrosschainEngine {
    /// Vote on an inbound observation. Returns the index of the cctx created
    /// when this vote finalizes the ballot.
    pub fn vote_inbound(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgVoteInbound,
    ) -> CrosschainResult<Option<String>> {
        self.supported_chain(msg.sender_chain_id)?;
        self.supported_chain(msg.receiver_chain)?;
        let tss = self.observer.tss().ok_or(CrosschainError::TssNotFound)?;

        let ballot_index = msg.digest();
        let finalized = self.observer.vote_on_inbound_ballot(msg, &ballot_index)?;
        if !finalized {
            debug!("Inbound ballot {} not finalized yet", ballot_index);
            return Ok(None);
        }

        let cctx = self.validate_inbound(ctx, msg, &tss.tss_pubkey, true)?;
        Ok(Some(cctx.index))
    }

    /// Create the cctx of a finalized inbound, initiate its outbound and save
    /// it. Settlement failures leave the cctx aborted; only validation
    /// failures are returned as errors.
    pub fn validate_inbound(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgVoteInbound,
        tss_pubkey: &str,
        should_pay_gas: bool,
    ) -> CrosschainResult<CrossChainTx> {
        if ctx
            .state()
            .is_finalized_inbound(&msg.inbound_hash, msg.sender_chain_id, msg.event_index)
        {
            return Err(CrosschainError::ObservedTxAlreadyFinalized(format!(
                "inbound hash {}, sender chain {}, event index {}",
                msg.inbound_hash, msg.sender_chain_id, msg.event_index
            )));
        }

        let receiver_chain = self.supported_chain(msg.receiver_chain)?;
        if receiver_chain.is_external() && msg.coin_type == CoinType::Zeta {
            let params = self
                .observer
                .chain_params(msg.receiver_chain)
                .ok_or(CrosschainError::ChainParamsNotFound {
                    chain_id: msg.receiver_chain,
                })?;
            if params.zeta_token_contract_address.is_empty() {
                return Err(CrosschainError::UnableToSendCoinType(format!(
                    "no zeta token contract on chain {}",
                    msg.receiver_chain
                )));
            }
        }

        let mut cctx = CrossChainTx::new_from_inbound(msg, tss_pubkey, ctx.timestamp())?;
        info!(
            "Inbound {} from chain {} finalized as cctx {}",
            msg.inbound_hash, msg.sender_chain_id, cctx.index
        );

        if let Err(err) = self.initiate_outbound(ctx, &mut cctx, should_pay_gas) {
            error!("Initiate outbound failed for cctx {}: {}", cctx.index, err);
        }
        if cctx.status() == CctxStatus::Aborted {
            self.process_abort(ctx, &mut cctx);
        }

        let height = ctx.block_height();
        let mut state = ctx.state();
        state.set_finalized_inbound(&msg.inbound_hash, msg.sender_chain_id, msg.event_index);
        cctx.inbound_params.finalized_zeta_height = height;
        cctx.inbound_params.tx_finalization_status = TxFinalizationStatus::Executed;
        state.save_cctx(&cctx)?;

        Ok(cctx)
    }
}
