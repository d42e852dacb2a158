//! Message dispatch for cross-chain transaction orchestration

use crate::config::Settings;
use crate::error::{CrosschainError, CrosschainResult};
use crate::external::{FungibleKeeper, LightClient, ObserverKeeper};
use crate::state::{with_cache, Context};
use crate::tx::GasPayer;
use crate::types::{
    Chain, MsgAddOutboundTracker, MsgMigrateTssFunds, MsgRefundAbortedCctx, MsgUpdateTssAddress,
    MsgVoteGasPrice, MsgVoteInbound, MsgVoteOutbound, MsgZetaSent, MsgZrc20Withdrawal,
};

use std::sync::Arc;
use tracing::debug;

/// Messages accepted by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrosschainMsg {
    VoteInbound(MsgVoteInbound),
    VoteOutbound(MsgVoteOutbound),
    VoteGasPrice(MsgVoteGasPrice),
    AddOutboundTracker(MsgAddOutboundTracker),
    RefundAbortedCctx(MsgRefundAbortedCctx),
    MigrateTssFunds(MsgMigrateTssFunds),
    UpdateTssAddress(MsgUpdateTssAddress),
    /// Hub events, submitted by the hub's EVM post-processing
    Zrc20Withdrawal(MsgZrc20Withdrawal),
    ZetaSent(MsgZetaSent),
}

impl CrosschainMsg {
    pub fn name(&self) -> &'static str {
        match self {
            CrosschainMsg::VoteInbound(_) => "VoteInbound",
            CrosschainMsg::VoteOutbound(_) => "VoteOutbound",
            CrosschainMsg::VoteGasPrice(_) => "VoteGasPrice",
            CrosschainMsg::AddOutboundTracker(_) => "AddOutboundTracker",
            CrosschainMsg::RefundAbortedCctx(_) => "RefundAbortedCctx",
            CrosschainMsg::MigrateTssFunds(_) => "MigrateTssFunds",
            CrosschainMsg::UpdateTssAddress(_) => "UpdateTssAddress",
            CrosschainMsg::Zrc20Withdrawal(_) => "Zrc20Withdrawal",
            CrosschainMsg::ZetaSent(_) => "ZetaSent",
        }
    }
}

/// Result of a handled message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MsgResponse {
    /// Cctx created by a finalizing inbound vote, a migration or a hub event
    pub cctx_index: Option<String>,
    /// Set when a tracker was not added because its cctx is already settled
    pub is_removed: bool,
}

/// Cross-chain orchestration engine
pub struct CrosschainEngine {
    /// Configuration
    pub(crate) settings: Settings,
    /// Ballots, chain registry and TSS records
    pub(crate) observer: Arc<dyn ObserverKeeper>,
    /// Balances, swaps and hub EVM calls
    pub(crate) fungible: Arc<dyn FungibleKeeper>,
    /// Inclusion proof verification
    pub(crate) light_client: Arc<dyn LightClient>,
}

impl CrosschainEngine {
    /// Create a new engine over its collaborators
    pub fn new(
        settings: Settings,
        observer: Arc<dyn ObserverKeeper>,
        fungible: Arc<dyn FungibleKeeper>,
        light_client: Arc<dyn LightClient>,
    ) -> Self {
        Self {
            settings,
            observer,
            fungible,
            light_client,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Handle one message against the state visible in `ctx`. A message that
    /// fails commits nothing.
    pub fn handle(&self, ctx: &mut Context<'_>, msg: CrosschainMsg) -> CrosschainResult<MsgResponse> {
        debug!("Handling message: {}", msg.name());
        with_cache(ctx, |tmp| self.dispatch(tmp, msg))
    }

    fn dispatch(&self, ctx: &mut Context<'_>, msg: CrosschainMsg) -> CrosschainResult<MsgResponse> {
        match msg {
            CrosschainMsg::VoteInbound(msg) => {
                let cctx_index = self.vote_inbound(ctx, &msg)?;
                Ok(MsgResponse {
                    cctx_index,
                    ..Default::default()
                })
            }

            CrosschainMsg::VoteOutbound(msg) => {
                self.vote_outbound(ctx, &msg)?;
                Ok(MsgResponse::default())
            }

            CrosschainMsg::VoteGasPrice(msg) => {
                self.vote_gas_price(ctx, &msg)?;
                Ok(MsgResponse::default())
            }

            CrosschainMsg::AddOutboundTracker(msg) => {
                let is_removed = self.add_outbound_tracker(ctx, &msg)?;
                Ok(MsgResponse {
                    is_removed,
                    ..Default::default()
                })
            }

            CrosschainMsg::RefundAbortedCctx(msg) => {
                self.refund_aborted_cctx(ctx, &msg)?;
                Ok(MsgResponse::default())
            }

            CrosschainMsg::MigrateTssFunds(msg) => {
                let cctx_index = self.migrate_tss_funds(ctx, &msg)?;
                Ok(MsgResponse {
                    cctx_index: Some(cctx_index),
                    ..Default::default()
                })
            }

            CrosschainMsg::UpdateTssAddress(msg) => {
                self.update_tss_address(ctx, &msg)?;
                Ok(MsgResponse::default())
            }

            CrosschainMsg::Zrc20Withdrawal(msg) => {
                let cctx_index = self.process_zrc20_withdrawal(ctx, &msg)?;
                Ok(MsgResponse {
                    cctx_index: Some(cctx_index),
                    ..Default::default()
                })
            }

            CrosschainMsg::ZetaSent(msg) => {
                let cctx_index = self.process_zeta_sent(ctx, &msg)?;
                Ok(MsgResponse {
                    cctx_index: Some(cctx_index),
                    ..Default::default()
                })
            }
        }
    }

    pub(crate) fn gas_payer(&self) -> GasPayer<'_> {
        GasPayer::new(self.fungible.as_ref(), &self.settings.fees)
    }

    pub(crate) fn supported_chain(&self, chain_id: i64) -> CrosschainResult<Chain> {
        self.observer
            .supported_chain(chain_id)
            .ok_or(CrosschainError::UnsupportedChain { chain_id })
    }

    pub(crate) fn ensure_admin(&self, creator: &str) -> CrosschainResult<()> {
        if self.observer.is_admin(creator) {
            Ok(())
        } else {
            Err(CrosschainError::NotAuthorized(format!(
                "{} is not an admin",
                creator
            )))
        }
    }
}
