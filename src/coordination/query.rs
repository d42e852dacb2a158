//! Read-only queries over the orchestration records

use super::engine::CrosschainEngine;
use crate::error::{CrosschainError, CrosschainResult};
use crate::state::Context;
use crate::types::{
    CrossChainTx, GasPrice, InboundHashToCctx, OutboundTracker, TssFundMigratorInfo,
    ZetaAccounting,
};

/// Default page size of `list_pending_cctx`
pub const MAX_PENDING_CCTXS: u32 = 500;

/// Pending cctxs of a chain, oldest nonce first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCctxs {
    pub cctxs: Vec<CrossChainTx>,
    /// Size of the whole pending window, which may exceed the page
    pub total_pending: u64,
}

impl CrosschainEngine {
    pub fn cctx(&self, ctx: &mut Context<'_>, index: &str) -> CrosschainResult<CrossChainTx> {
        ctx.state()
            .get_cctx(index)?
            .ok_or_else(|| CrosschainError::CctxNotFound(index.to_string()))
    }

    /// Cctx holding `nonce` on `chain_id` under the TSS key `tss`
    pub fn cctx_by_nonce(
        &self,
        ctx: &mut Context<'_>,
        tss: &str,
        chain_id: i64,
        nonce: u64,
    ) -> CrosschainResult<CrossChainTx> {
        let entry = ctx
            .state()
            .get_nonce_to_cctx(tss, chain_id, nonce)?
            .ok_or_else(|| {
                CrosschainError::CctxNotFound(format!("chain {} nonce {}", chain_id, nonce))
            })?;
        self.cctx(ctx, &entry.cctx_index)
    }

    /// Walk the pending nonce window of the current TSS on `chain_id`.
    /// A `limit` of 0 uses the default page size.
    pub fn list_pending_cctx(
        &self,
        ctx: &mut Context<'_>,
        chain_id: i64,
        limit: u32,
    ) -> CrosschainResult<PendingCctxs> {
        let tss = self.observer.tss().ok_or(CrosschainError::TssNotFound)?;
        let limit = if limit == 0 { MAX_PENDING_CCTXS } else { limit.min(MAX_PENDING_CCTXS) };

        let pending = ctx
            .state()
            .get_pending_nonces(&tss.tss_pubkey, chain_id)?
            .ok_or(CrosschainError::CannotFindPendingNonces { chain_id })?;

        let mut cctxs = Vec::new();
        for nonce in (pending.nonce_low..pending.nonce_high).take(limit as usize) {
            cctxs.push(self.cctx_by_nonce(ctx, &tss.tss_pubkey, chain_id, nonce)?);
        }

        Ok(PendingCctxs {
            cctxs,
            total_pending: pending.nonce_high.saturating_sub(pending.nonce_low),
        })
    }

    pub fn inbound_hash_to_cctx(
        &self,
        ctx: &mut Context<'_>,
        inbound_hash: &str,
    ) -> CrosschainResult<Option<InboundHashToCctx>> {
        ctx.state().get_inbound_hash_to_cctx(inbound_hash)
    }

    pub fn outbound_tracker(
        &self,
        ctx: &mut Context<'_>,
        chain_id: i64,
        nonce: u64,
    ) -> CrosschainResult<Option<OutboundTracker>> {
        ctx.state().get_outbound_tracker(chain_id, nonce)
    }

    pub fn gas_price(&self, ctx: &mut Context<'_>, chain_id: i64) -> CrosschainResult<Option<GasPrice>> {
        ctx.state().get_gas_price(chain_id)
    }

    pub fn zeta_accounting(&self, ctx: &mut Context<'_>) -> CrosschainResult<ZetaAccounting> {
        ctx.state()
            .get_zeta_accounting()?
            .ok_or(CrosschainError::ZetaAccountingNotFound)
    }

    pub fn fund_migrator(
        &self,
        ctx: &mut Context<'_>,
        chain_id: i64,
    ) -> CrosschainResult<Option<TssFundMigratorInfo>> {
        ctx.state().get_fund_migrator(chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemStore;
    use crate::testing::{self, FakeFungible, ObserverSetup, BSC_CHAIN_ID, OBSERVER, TSS_PUBKEY};
    use crate::tx::init_chain;
    use crate::types::{CoinType, MsgVoteInbound};

    use alloy_primitives::U256;
    use std::sync::Arc;

    fn engine() -> CrosschainEngine {
        CrosschainEngine::new(
            testing::settings(),
            Arc::new(ObserverSetup::default().build()),
            Arc::new(FakeFungible::default()),
            Arc::new(testing::light_client()),
        )
    }

    fn seed_pending(engine: &CrosschainEngine, ctx: &mut Context<'_>, count: u64) -> Vec<String> {
        init_chain(ctx, TSS_PUBKEY, BSC_CHAIN_ID, 0).unwrap();
        let mut gas_price = GasPrice::new(BSC_CHAIN_ID, OBSERVER);
        gas_price.vote(OBSERVER, 1, 0, 1);
        ctx.state().set_gas_price(&gas_price).unwrap();

        (0..count)
            .map(|i| {
                let msg = MsgVoteInbound {
                    creator: OBSERVER.to_string(),
                    sender: "0x1111111111111111111111111111111111111111".to_string(),
                    sender_chain_id: 1,
                    receiver: "0x2222222222222222222222222222222222222222".to_string(),
                    receiver_chain: BSC_CHAIN_ID,
                    amount: U256::from(1_000_000u64),
                    inbound_hash: format!("0xinbound{}", i),
                    coin_type: CoinType::Gas,
                    ..Default::default()
                };
                engine.vote_inbound(ctx, &msg).unwrap().unwrap()
            })
            .collect()
    }

    #[test]
    fn test_list_pending_cctx_pages_window() {
        let engine = engine();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, testing::block());
        let indexes = seed_pending(&engine, &mut ctx, 3);

        let page = engine.list_pending_cctx(&mut ctx, BSC_CHAIN_ID, 2).unwrap();
        assert_eq!(page.total_pending, 3);
        let listed: Vec<String> = page.cctxs.into_iter().map(|c| c.index).collect();
        assert_eq!(listed, indexes[..2].to_vec());

        let all = engine.list_pending_cctx(&mut ctx, BSC_CHAIN_ID, 0).unwrap();
        assert_eq!(all.cctxs.len(), 3);
    }

    #[test]
    fn test_lookups() {
        let engine = engine();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, testing::block());
        let indexes = seed_pending(&engine, &mut ctx, 2);

        let second = engine.cctx_by_nonce(&mut ctx, TSS_PUBKEY, BSC_CHAIN_ID, 1).unwrap();
        assert_eq!(second.index, indexes[1]);
        assert_eq!(engine.cctx(&mut ctx, &indexes[0]).unwrap().index, indexes[0]);
        assert!(matches!(
            engine.cctx(&mut ctx, "0xmissing"),
            Err(CrosschainError::CctxNotFound(_))
        ));
        assert_eq!(
            engine
                .inbound_hash_to_cctx(&mut ctx, "0xinbound0")
                .unwrap()
                .unwrap()
                .cctx_index,
            vec![indexes[0].clone()]
        );
        assert_eq!(
            engine.gas_price(&mut ctx, BSC_CHAIN_ID).unwrap().unwrap().prices,
            vec![1]
        );
        assert!(engine.outbound_tracker(&mut ctx, BSC_CHAIN_ID, 0).unwrap().is_none());
        assert!(engine.fund_migrator(&mut ctx, BSC_CHAIN_ID).unwrap().is_none());
        assert_eq!(
            engine.zeta_accounting(&mut ctx),
            Err(CrosschainError::ZetaAccountingNotFound)
        );
    }
}
