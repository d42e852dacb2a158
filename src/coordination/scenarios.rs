//! End-to-end flows through `CrosschainEngine::handle`

use super::engine::{CrosschainEngine, CrosschainMsg};
use crate::state::{Context, MemStore};
use crate::testing::{
    self, FakeFungible, ObserverSetup, ADMIN, BSC_CHAIN_ID, ETH_CHAIN_ID, GAS_ZRC20_BSC,
    GAS_ZRC20_ETH, HUB_CHAIN_ID, HUB_NATIVE, OBSERVER, TSS_PUBKEY, USDT_ASSET, USDT_ZRC20,
};
use crate::tx::init_chain;
use crate::types::{
    CctxStatus, CoinType, CrossChainTx, GasPrice, MsgMigrateTssFunds, MsgVoteInbound,
    MsgVoteOutbound, MsgZetaSent, MsgZrc20Withdrawal, ReceiveStatus, TxFinalizationStatus,
};

use alloy_primitives::U256;
use std::sync::Arc;

fn engine(fungible: FakeFungible) -> CrosschainEngine {
    CrosschainEngine::new(
        testing::settings(),
        Arc::new(ObserverSetup::default().build()),
        Arc::new(fungible),
        Arc::new(testing::light_client()),
    )
}

fn open_chain(ctx: &mut Context<'_>, chain_id: i64, price: u64) {
    init_chain(ctx, TSS_PUBKEY, chain_id, 0).unwrap();
    let mut gas_price = GasPrice::new(chain_id, OBSERVER);
    gas_price.vote(OBSERVER, price, 0, 1);
    ctx.state().set_gas_price(&gas_price).unwrap();
}

fn inbound(
    sender_chain_id: i64,
    receiver_chain: i64,
    coin_type: CoinType,
    amount: u64,
) -> MsgVoteInbound {
    MsgVoteInbound {
        creator: OBSERVER.to_string(),
        sender: "0x1111111111111111111111111111111111111111".to_string(),
        sender_chain_id,
        receiver: "0x2222222222222222222222222222222222222222".to_string(),
        receiver_chain,
        amount: U256::from(amount),
        inbound_hash: "0xscenario".to_string(),
        coin_type,
        ..Default::default()
    }
}

fn finalize_inbound(engine: &CrosschainEngine, ctx: &mut Context<'_>, msg: MsgVoteInbound) -> CrossChainTx {
    let response = engine.handle(ctx, CrosschainMsg::VoteInbound(msg)).unwrap();
    let index = response.cctx_index.unwrap();
    ctx.state().get_cctx(&index).unwrap().unwrap()
}

fn withdraw(engine: &CrosschainEngine, ctx: &mut Context<'_>, zrc20: alloy_primitives::Address) -> CrossChainTx {
    let msg = MsgZrc20Withdrawal {
        emitting_contract: "0x3333333333333333333333333333333333333333".to_string(),
        tx_origin: "0x4444444444444444444444444444444444444444".to_string(),
        zrc20,
        to: "0x2222222222222222222222222222222222222222".to_string(),
        value: U256::from(1_000_000u64),
        tx_hash: "0xwithdraw".to_string(),
        block_number: 50,
        event_index: 0,
    };
    let response = engine.handle(ctx, CrosschainMsg::Zrc20Withdrawal(msg)).unwrap();
    let index = response.cctx_index.unwrap();
    ctx.state().get_cctx(&index).unwrap().unwrap()
}

fn observe(
    engine: &CrosschainEngine,
    ctx: &mut Context<'_>,
    cctx: &CrossChainTx,
    status: ReceiveStatus,
) -> CrossChainTx {
    let current = cctx.current_outbound().unwrap();
    let msg = MsgVoteOutbound {
        creator: OBSERVER.to_string(),
        cctx_hash: cctx.index.clone(),
        observed_outbound_hash: "0xobserved".to_string(),
        observed_outbound_block_height: 1_000,
        value_received: current.amount,
        status,
        outbound_chain: current.receiver_chain_id,
        outbound_tss_nonce: current.tss_nonce,
        coin_type: cctx.inbound_params.coin_type,
        ..Default::default()
    };
    engine.handle(ctx, CrosschainMsg::VoteOutbound(msg)).unwrap();
    ctx.state().get_cctx(&cctx.index).unwrap().unwrap()
}

fn observe_failure(engine: &CrosschainEngine, ctx: &mut Context<'_>, cctx: &CrossChainTx) -> CrossChainTx {
    observe(engine, ctx, cctx, ReceiveStatus::Failed)
}

#[test]
fn test_native_gas_deposit_pays_destination_gas() {
    let engine = engine(FakeFungible::default());
    let mut store = MemStore::new();
    let mut ctx = Context::new(&mut store, testing::block());
    open_chain(&mut ctx, BSC_CHAIN_ID, 1);

    let cctx = finalize_inbound(
        &engine,
        &mut ctx,
        inbound(ETH_CHAIN_ID, BSC_CHAIN_ID, CoinType::Gas, 1_000_000),
    );

    assert_eq!(cctx.status(), CctxStatus::PendingOutbound);
    let leg = &cctx.outbound_params[0];
    assert_eq!(leg.amount, U256::from(979_000u64));
    assert_eq!(leg.gas_limit, 21_000);
    assert_eq!(leg.gas_price, U256::from(1u64));
    assert_eq!(leg.user_gas_fee_paid, Some(U256::from(21_000u64)));
}

#[test]
fn test_insufficient_gas_aborts() {
    let mut fungible = FakeFungible::default();
    fungible.gas_limits.insert(GAS_ZRC20_BSC, 100);
    let engine = engine(fungible);
    let mut store = MemStore::new();
    let mut ctx = Context::new(&mut store, testing::block());
    open_chain(&mut ctx, BSC_CHAIN_ID, 1);

    let cctx = finalize_inbound(&engine, &mut ctx, inbound(ETH_CHAIN_ID, BSC_CHAIN_ID, CoinType::Gas, 10));

    assert_eq!(cctx.status(), CctxStatus::Aborted);
    assert!(cctx.cctx_status.status_message.starts_with("not enough gas"));
    assert_eq!(cctx.cctx_status.error_message, cctx.cctx_status.status_message);
    assert_eq!(cctx.outbound_params[0].amount, U256::ZERO);
}

#[test]
fn test_hub_withdrawal_settles_to_mined() {
    let engine = engine(FakeFungible::default());
    let mut store = MemStore::new();
    let mut ctx = Context::new(&mut store, testing::block());
    open_chain(&mut ctx, BSC_CHAIN_ID, 3);

    let cctx = withdraw(&engine, &mut ctx, GAS_ZRC20_BSC);
    assert_eq!(cctx.status(), CctxStatus::PendingOutbound);
    assert_eq!(cctx.inbound_params.sender_chain_id, HUB_CHAIN_ID);
    let leg = &cctx.outbound_params[0];
    assert_eq!(leg.receiver_chain_id, BSC_CHAIN_ID);
    assert_eq!(leg.amount, U256::from(1_000_000u64));
    assert_eq!(leg.gas_limit, 21_000);
    assert_eq!(leg.gas_price, U256::from(3u64));
    assert_eq!(leg.tss_nonce, 0);

    let cctx = observe(&engine, &mut ctx, &cctx, ReceiveStatus::Success);
    assert_eq!(cctx.status(), CctxStatus::OutboundMined);
    assert_eq!(
        cctx.outbound_params[0].tx_finalization_status,
        TxFinalizationStatus::Executed
    );
    assert!(ctx
        .state()
        .get_pending_nonces(TSS_PUBKEY, BSC_CHAIN_ID)
        .unwrap()
        .unwrap()
        .is_empty());
}

#[test]
fn test_failed_hub_gas_withdrawal_aborts_without_revert() {
    let engine = engine(FakeFungible::default());
    let mut store = MemStore::new();
    let mut ctx = Context::new(&mut store, testing::block());
    open_chain(&mut ctx, ETH_CHAIN_ID, 1);

    let cctx = withdraw(&engine, &mut ctx, GAS_ZRC20_ETH);
    assert_eq!(cctx.status(), CctxStatus::PendingOutbound);

    let cctx = observe_failure(&engine, &mut ctx, &cctx);
    assert_eq!(cctx.status(), CctxStatus::Aborted);
    assert_eq!(cctx.cctx_status.status_message, "Outbound failed");
    assert_eq!(cctx.outbound_params.len(), 1);

    let pending = ctx.state().get_pending_nonces(TSS_PUBKEY, ETH_CHAIN_ID).unwrap().unwrap();
    assert!(pending.is_empty());
}

#[test]
fn test_zeta_sent_settles_and_refusal_keeps_funds() {
    let engine = engine(FakeFungible::default());
    let mut store = MemStore::new();
    let mut ctx = Context::new(&mut store, testing::block());
    open_chain(&mut ctx, ETH_CHAIN_ID, 2);
    let amount = U256::from(3_000_000_000_000_000_000u128);
    testing::fund_module(&mut ctx, amount);

    let sent = |destination_chain_id: i64, tx_hash: &str| MsgZetaSent {
        emitting_contract: "0x3333333333333333333333333333333333333333".to_string(),
        tx_origin: "0x4444444444444444444444444444444444444444".to_string(),
        destination_chain_id,
        destination_address: "2222222222222222222222222222222222222222".to_string(),
        zeta_value_and_gas: amount,
        message: String::new(),
        tx_hash: tx_hash.to_string(),
        block_number: 60,
        event_index: 1,
    };

    // a refused event leaves the module balance untouched
    assert!(engine
        .handle(&mut ctx, CrosschainMsg::ZetaSent(sent(999, "0xrefused")))
        .is_err());
    assert_eq!(testing::module_balance(&ctx, HUB_NATIVE), amount);

    let response = engine
        .handle(&mut ctx, CrosschainMsg::ZetaSent(sent(ETH_CHAIN_ID, "0xsent")))
        .unwrap();
    let cctx = ctx
        .state()
        .get_cctx(&response.cctx_index.unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(cctx.status(), CctxStatus::PendingOutbound);
    assert_eq!(cctx.inbound_params.coin_type, CoinType::Zeta);
    assert_eq!(cctx.outbound_params[0].gas_limit, 90_001);

    let cctx = observe(&engine, &mut ctx, &cctx, ReceiveStatus::Success);
    assert_eq!(cctx.status(), CctxStatus::OutboundMined);
}

#[test]
fn test_failed_erc20_outbound_reverts_then_aborts() {
    let mut fungible = FakeFungible::default();
    // the asset's ZRC20 reports no gas limit, so the revert reuses the
    // original leg's limit
    fungible.gas_limits.insert(USDT_ZRC20, 0);
    let engine = engine(fungible);
    let mut store = MemStore::new();
    let mut ctx = Context::new(&mut store, testing::block());
    open_chain(&mut ctx, ETH_CHAIN_ID, 1);
    open_chain(&mut ctx, BSC_CHAIN_ID, 1);

    let mut msg = inbound(ETH_CHAIN_ID, BSC_CHAIN_ID, CoinType::Erc20, 1_000_000);
    msg.asset = USDT_ASSET.to_string();
    msg.gas_limit = 50_000;
    let cctx = finalize_inbound(&engine, &mut ctx, msg);
    assert_eq!(cctx.status(), CctxStatus::PendingOutbound);
    // 50_000 gas at price 1, paid with 2 asset units per gas unit
    assert_eq!(cctx.outbound_params[0].amount, U256::from(900_000u64));

    let cctx = observe_failure(&engine, &mut ctx, &cctx);
    assert_eq!(cctx.status(), CctxStatus::PendingRevert);
    assert_eq!(cctx.cctx_status.status_message, "Outbound failed, start revert");
    assert_eq!(cctx.outbound_params.len(), 2);
    assert_eq!(
        cctx.outbound_params[0].tx_finalization_status,
        TxFinalizationStatus::Executed
    );

    let revert = &cctx.outbound_params[1];
    assert_eq!(revert.receiver_chain_id, ETH_CHAIN_ID);
    assert_eq!(revert.receiver, cctx.inbound_params.sender);
    assert_eq!(revert.gas_limit, 50_000);
    assert_eq!(revert.amount, U256::from(800_000u64));
    assert_eq!(revert.tss_nonce, 0);

    {
        let state = ctx.state();
        let bsc = state.get_pending_nonces(TSS_PUBKEY, BSC_CHAIN_ID).unwrap().unwrap();
        assert!(bsc.is_empty());
        let eth = state.get_pending_nonces(TSS_PUBKEY, ETH_CHAIN_ID).unwrap().unwrap();
        assert_eq!((eth.nonce_low, eth.nonce_high), (0, 1));
        assert_eq!(
            state.get_nonce_to_cctx(TSS_PUBKEY, ETH_CHAIN_ID, 0).unwrap().unwrap().cctx_index,
            cctx.index
        );
    }

    let cctx = observe_failure(&engine, &mut ctx, &cctx);
    assert_eq!(cctx.status(), CctxStatus::Aborted);
    assert_eq!(
        cctx.cctx_status.status_message,
        "Outbound failed: revert failed; abort TX"
    );
    assert_eq!(cctx.outbound_params.len(), 2);
    assert!(cctx
        .outbound_params
        .iter()
        .all(|leg| leg.tx_finalization_status == TxFinalizationStatus::Executed));
    assert!(ctx
        .state()
        .get_pending_nonces(TSS_PUBKEY, ETH_CHAIN_ID)
        .unwrap()
        .unwrap()
        .is_empty());
}

#[test]
fn test_migration_refused_with_single_tss() {
    let engine = engine(FakeFungible::default());
    let mut store = MemStore::new();
    let mut ctx = Context::new(&mut store, testing::block());
    open_chain(&mut ctx, ETH_CHAIN_ID, 1);

    let err = engine
        .handle(
            &mut ctx,
            CrosschainMsg::MigrateTssFunds(MsgMigrateTssFunds {
                creator: ADMIN.to_string(),
                chain_id: ETH_CHAIN_ID,
                amount: U256::from(10_000_000_000u64),
            }),
        )
        .unwrap_err();
    assert!(err.to_string().contains("cannot migrate, only one TSS found"));
    assert!(ctx.state().list_cctx().unwrap().is_empty());
    assert!(ctx.state().list_fund_migrators().unwrap().is_empty());
}
