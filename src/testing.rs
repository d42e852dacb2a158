//! Test doubles shared by the unit tests
//!
//! `FakeFungible` keeps every balance it moves in the context's store, so a
//! discarded staged context also discards the fake's effects.

use crate::config::Settings;
use crate::error::{CrosschainError, CrosschainResult};
use crate::external::{FungibleKeeper, MockLightClient, MockObserverKeeper, MODULE_ADDRESS_EVM};
use crate::state::{BlockInfo, Context, KvStore};
use crate::types::{
    BallotStatus, Chain, ChainParams, CoinType, CrossChainTx, ForeignCoin, GatewayKind, Network,
    ReceiveStatus, Tss, Vm,
};

use alloy_primitives::{address, Address, U256};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

pub const HUB_CHAIN_ID: i64 = 7000;
pub const ETH_CHAIN_ID: i64 = 1;
pub const BSC_CHAIN_ID: i64 = 56;
pub const BTC_CHAIN_ID: i64 = 8332;

pub const ADMIN: &str = "admin";
pub const OBSERVER: &str = "observer";

/// secp256k1 public keys of private keys 1 and 2
pub const TSS_PUBKEY: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
pub const NEW_TSS_PUBKEY: &str = "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5";

pub const USDT_ASSET: &str = "0xdac17f958d2ee523a2206206994597c13d831ec7";
pub const ZETA_TOKEN_CONTRACT: &str = "0xf091867ec603a6628ed83d274e835539d82e9cc8";

pub const GAS_ZRC20_ETH: Address = address!("d97B1de3619ed2c6BEb3860147E30cA8A7dC9891");
pub const GAS_ZRC20_BSC: Address = address!("48f80608B672DC30DC7e3dbBd0343c5F02C738Eb");
pub const GAS_ZRC20_BTC: Address = address!("13A0c5930C028511Dc02665E7285134B6d11A5f4");
pub const USDT_ZRC20: Address = address!("7c8dDa80bbBE1254a7aACf3219EBe1481c6E01d7");

/// Balance slot of the hub-native coin
pub const HUB_NATIVE: Address = Address::ZERO;

pub fn block() -> BlockInfo {
    BlockInfo::new(
        100,
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap_or_default(),
    )
}

pub fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.hub.chain_id = HUB_CHAIN_ID;
    settings
}

pub fn chains() -> Vec<Chain> {
    vec![
        Chain {
            chain_id: HUB_CHAIN_ID,
            name: "zeta_mainnet".to_string(),
            vm: Vm::Zevm,
            network: Network::Mainnet,
            gateway: GatewayKind::Zevm,
        },
        Chain {
            chain_id: ETH_CHAIN_ID,
            name: "eth_mainnet".to_string(),
            vm: Vm::Evm,
            network: Network::Mainnet,
            gateway: GatewayKind::Observers,
        },
        Chain {
            chain_id: BSC_CHAIN_ID,
            name: "bsc_mainnet".to_string(),
            vm: Vm::Evm,
            network: Network::Mainnet,
            gateway: GatewayKind::Observers,
        },
        Chain {
            chain_id: BTC_CHAIN_ID,
            name: "btc_mainnet".to_string(),
            vm: Vm::Utxo,
            network: Network::Mainnet,
            gateway: GatewayKind::Observers,
        },
    ]
}

pub fn tss(pubkey: &str, finalized_zeta_height: i64) -> Tss {
    Tss {
        tss_pubkey: pubkey.to_string(),
        finalized_zeta_height,
        keygen_zeta_height: finalized_zeta_height,
        ..Default::default()
    }
}

/// Knobs for the mocked observer collaborator
pub struct ObserverSetup {
    pub chains: Vec<Chain>,
    pub tss: Option<Tss>,
    pub tss_history: Vec<Tss>,
    /// Whether each vote finalizes its ballot
    pub finalize: bool,
    pub stability_pool_percentage: u64,
    pub zeta_token_contract: String,
    pub set_tss_calls: usize,
}

impl Default for ObserverSetup {
    fn default() -> Self {
        Self {
            chains: chains(),
            tss: Some(tss(TSS_PUBKEY, 1)),
            tss_history: vec![tss(TSS_PUBKEY, 1)],
            finalize: true,
            stability_pool_percentage: 60,
            zeta_token_contract: ZETA_TOKEN_CONTRACT.to_string(),
            set_tss_calls: 0,
        }
    }
}

impl ObserverSetup {
    pub fn build(self) -> MockObserverKeeper {
        let mut observer = MockObserverKeeper::new();

        let chains = self.chains.clone();
        observer
            .expect_supported_chain()
            .returning(move |id| chains.iter().find(|c| c.chain_id == id).cloned());
        let chains = self.chains.clone();
        observer
            .expect_supported_chains()
            .returning(move || chains.clone());

        let chains = self.chains;
        let percentage = self.stability_pool_percentage;
        let zeta_token = self.zeta_token_contract;
        observer.expect_chain_params().returning(move |id| {
            chains.iter().find(|c| c.chain_id == id).map(|c| ChainParams {
                chain_id: c.chain_id,
                zeta_token_contract_address: zeta_token.clone(),
                stability_pool_percentage: percentage,
                is_supported: true,
            })
        });

        let current = self.tss;
        observer.expect_tss().returning(move || current.clone());
        let history = self.tss_history;
        observer
            .expect_tss_history()
            .returning(move || history.clone());
        observer
            .expect_set_tss()
            .times(self.set_tss_calls)
            .returning(|_| Ok(()));

        let finalize = self.finalize;
        observer
            .expect_vote_on_inbound_ballot()
            .returning(move |_, _| Ok(finalize));
        observer
            .expect_vote_on_outbound_ballot()
            .returning(move |msg, _| {
                let status = match msg.status {
                    ReceiveStatus::Success => BallotStatus::SuccessObservation,
                    ReceiveStatus::Failed => BallotStatus::FailureObservation,
                    ReceiveStatus::Created => BallotStatus::InProgress,
                };
                Ok((finalize, status))
            });

        observer
            .expect_is_authorized()
            .returning(|address, _| address == OBSERVER);
        observer
            .expect_is_admin()
            .returning(|address| address == ADMIN);

        observer
    }
}

pub fn light_client() -> MockLightClient {
    MockLightClient::new()
}

/// Outcome of the hub deposit in `FakeFungible::handle_deposit`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositOutcome {
    Success,
    Revert,
    Fail,
}

/// Fungible collaborator with fixed prices
///
/// Quotes convert through `units_per_gas`: an asset worth 2 units per gas
/// unit needs 2 units in to obtain 1 gas unit out. Hub-native coin is 1:1.
pub struct FakeFungible {
    pub gas_coins: HashMap<i64, Address>,
    pub foreign_coins: HashMap<(String, i64), Address>,
    pub gas_limits: HashMap<Address, u64>,
    pub flat_fees: HashMap<Address, U256>,
    pub units_per_gas: HashMap<Address, u64>,
    /// ZRC20s with a liquidity pool
    pub pools: HashSet<Address>,
    pub deposit_outcome: DepositOutcome,
    pub fail_revert_call: bool,
    pub fail_abort: bool,
}

impl Default for FakeFungible {
    fn default() -> Self {
        let gas_coins = HashMap::from([
            (ETH_CHAIN_ID, GAS_ZRC20_ETH),
            (BSC_CHAIN_ID, GAS_ZRC20_BSC),
            (BTC_CHAIN_ID, GAS_ZRC20_BTC),
        ]);
        let foreign_coins = HashMap::from([((USDT_ASSET.to_string(), ETH_CHAIN_ID), USDT_ZRC20)]);
        let gas_limits = HashMap::from([
            (GAS_ZRC20_ETH, 21_000),
            (GAS_ZRC20_BSC, 21_000),
            (GAS_ZRC20_BTC, 100),
            (USDT_ZRC20, 100_000),
        ]);
        let units_per_gas = HashMap::from([
            (GAS_ZRC20_ETH, 1),
            (GAS_ZRC20_BSC, 1),
            (GAS_ZRC20_BTC, 1),
            (USDT_ZRC20, 2),
        ]);
        let pools = HashSet::from([GAS_ZRC20_ETH, GAS_ZRC20_BSC, GAS_ZRC20_BTC, USDT_ZRC20]);

        Self {
            gas_coins,
            foreign_coins,
            gas_limits,
            flat_fees: HashMap::new(),
            units_per_gas,
            pools,
            deposit_outcome: DepositOutcome::Success,
            fail_revert_call: false,
            fail_abort: false,
        }
    }
}

impl FakeFungible {
    fn rate(&self, token: Address) -> U256 {
        U256::from(self.units_per_gas.get(&token).copied().unwrap_or(1))
    }

    fn pool(&self, token: Address) -> CrosschainResult<()> {
        if self.pools.contains(&token) {
            Ok(())
        } else {
            Err(CrosschainError::Internal(format!("no pool for {}", token)))
        }
    }
}

fn balance_key(token: Address, owner: Address) -> String {
    format!("fake-fungible/balance/{}/{}", token, owner)
}

fn read_amount(store: &dyn KvStore, key: &str) -> U256 {
    store
        .get(key.as_bytes())
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

fn write_amount(store: &mut dyn KvStore, key: &str, amount: U256) -> CrosschainResult<()> {
    store.set(key.as_bytes(), serde_json::to_vec(&amount)?);
    Ok(())
}

fn credit(ctx: &mut Context<'_>, key: &str, amount: U256) -> CrosschainResult<()> {
    let current = read_amount(ctx.store(), key);
    write_amount(ctx.store_mut(), key, current + amount)
}

fn debit(ctx: &mut Context<'_>, key: &str, amount: U256) -> CrosschainResult<()> {
    let current = read_amount(ctx.store(), key);
    let remaining = current
        .checked_sub(amount)
        .ok_or_else(|| CrosschainError::Internal(format!("insufficient balance for {}", key)))?;
    write_amount(ctx.store_mut(), key, remaining)
}

pub fn balance(ctx: &Context<'_>, token: Address, owner: Address) -> U256 {
    read_amount(ctx.store(), &balance_key(token, owner))
}

pub fn module_balance(ctx: &Context<'_>, token: Address) -> U256 {
    balance(ctx, token, MODULE_ADDRESS_EVM)
}

pub fn burnt(ctx: &Context<'_>, token: Address) -> U256 {
    read_amount(ctx.store(), &format!("fake-fungible/burnt/{}", token))
}

pub fn stability_pool(ctx: &Context<'_>, chain_id: i64) -> U256 {
    read_amount(ctx.store(), &format!("fake-fungible/stability-pool/{}", chain_id))
}

pub fn deposited(ctx: &Context<'_>, cctx_index: &str) -> U256 {
    read_amount(ctx.store(), &format!("fake-fungible/deposit/{}", cctx_index))
}

pub fn revert_called(ctx: &Context<'_>, cctx_index: &str) -> bool {
    ctx.store()
        .has(format!("fake-fungible/revert-call/{}", cctx_index).as_bytes())
}

pub fn abort_processed(ctx: &Context<'_>, cctx_index: &str) -> bool {
    ctx.store()
        .has(format!("fake-fungible/abort/{}", cctx_index).as_bytes())
}

/// Credit hub-native coin to the module account, as a connector call does
pub fn fund_module(ctx: &mut Context<'_>, amount: U256) {
    credit(ctx, &balance_key(HUB_NATIVE, MODULE_ADDRESS_EVM), amount).unwrap();
}

pub fn published_gas_price(ctx: &Context<'_>, chain_id: i64) -> U256 {
    read_amount(ctx.store(), &format!("fake-fungible/gas-price/{}", chain_id))
}

impl FungibleKeeper for FakeFungible {
    fn gas_coin_zrc20(&self, _ctx: &Context<'_>, chain_id: i64) -> CrosschainResult<Address> {
        self.gas_coins
            .get(&chain_id)
            .copied()
            .ok_or_else(|| CrosschainError::ForeignCoinNotFound(format!("gas coin of chain {}", chain_id)))
    }

    fn foreign_coin_zrc20(
        &self,
        _ctx: &Context<'_>,
        asset: &str,
        chain_id: i64,
    ) -> CrosschainResult<Address> {
        self.foreign_coins
            .get(&(asset.to_string(), chain_id))
            .copied()
            .ok_or_else(|| CrosschainError::ForeignCoinNotFound(format!("{} on chain {}", asset, chain_id)))
    }

    fn foreign_coin(&self, ctx: &Context<'_>, zrc20: Address) -> CrosschainResult<ForeignCoin> {
        let gas_coin = self
            .gas_coins
            .iter()
            .find(|(_, coin)| **coin == zrc20)
            .map(|(chain_id, _)| (*chain_id, String::new(), CoinType::Gas));
        let erc20 = self
            .foreign_coins
            .iter()
            .find(|(_, coin)| **coin == zrc20)
            .map(|((asset, chain_id), _)| (*chain_id, asset.clone(), CoinType::Erc20));

        let (foreign_chain_id, asset, coin_type) = gas_coin
            .or(erc20)
            .ok_or_else(|| CrosschainError::ForeignCoinNotFound(zrc20.to_string()))?;
        Ok(ForeignCoin {
            zrc20,
            foreign_chain_id,
            asset,
            coin_type,
            gas_limit: self.query_gas_limit(ctx, zrc20)?,
        })
    }

    fn query_gas_limit(&self, _ctx: &Context<'_>, zrc20: Address) -> CrosschainResult<u64> {
        self.gas_limits
            .get(&zrc20)
            .copied()
            .ok_or_else(|| CrosschainError::ForeignCoinNotFound(zrc20.to_string()))
    }

    fn query_protocol_flat_fee(&self, _ctx: &Context<'_>, zrc20: Address) -> CrosschainResult<U256> {
        Ok(self.flat_fees.get(&zrc20).copied().unwrap_or_default())
    }

    fn query_amounts_in(
        &self,
        _ctx: &Context<'_>,
        amount_out: U256,
        zrc20_in: Address,
        zrc20_out: Address,
    ) -> CrosschainResult<U256> {
        self.pool(zrc20_in)?;
        self.pool(zrc20_out)?;
        Ok(amount_out * self.rate(zrc20_in) / self.rate(zrc20_out))
    }

    fn query_hub_native_amounts_in(
        &self,
        _ctx: &Context<'_>,
        amount_out: U256,
        zrc20_out: Address,
    ) -> CrosschainResult<U256> {
        self.pool(zrc20_out)?;
        Ok(amount_out / self.rate(zrc20_out))
    }

    fn deposit_zrc20(
        &self,
        ctx: &mut Context<'_>,
        zrc20: Address,
        to: Address,
        amount: U256,
    ) -> CrosschainResult<()> {
        credit(ctx, &balance_key(zrc20, to), amount)
    }

    fn mint_hub_native(&self, ctx: &mut Context<'_>, amount: U256) -> CrosschainResult<()> {
        credit(ctx, &balance_key(HUB_NATIVE, MODULE_ADDRESS_EVM), amount)
    }

    fn swap_exact_tokens_for_tokens(
        &self,
        ctx: &mut Context<'_>,
        amount_in: U256,
        zrc20_in: Address,
        zrc20_out: Address,
        min_amount_out: U256,
    ) -> CrosschainResult<U256> {
        self.pool(zrc20_in)?;
        self.pool(zrc20_out)?;
        let amount_out = amount_in * self.rate(zrc20_out) / self.rate(zrc20_in);
        if amount_out < min_amount_out {
            return Err(CrosschainError::Swap("insufficient output amount".to_string()));
        }
        debit(ctx, &balance_key(zrc20_in, MODULE_ADDRESS_EVM), amount_in)?;
        credit(ctx, &balance_key(zrc20_out, MODULE_ADDRESS_EVM), amount_out)?;
        Ok(amount_out)
    }

    fn swap_exact_hub_native_for_tokens(
        &self,
        ctx: &mut Context<'_>,
        amount_in: U256,
        zrc20_out: Address,
        min_amount_out: U256,
    ) -> CrosschainResult<U256> {
        self.pool(zrc20_out)?;
        let amount_out = amount_in * self.rate(zrc20_out);
        if amount_out < min_amount_out {
            return Err(CrosschainError::Swap("insufficient output amount".to_string()));
        }
        debit(ctx, &balance_key(HUB_NATIVE, MODULE_ADDRESS_EVM), amount_in)?;
        credit(ctx, &balance_key(zrc20_out, MODULE_ADDRESS_EVM), amount_out)?;
        Ok(amount_out)
    }

    fn burn_hub_native(&self, ctx: &mut Context<'_>, amount: U256) -> CrosschainResult<()> {
        debit(ctx, &balance_key(HUB_NATIVE, MODULE_ADDRESS_EVM), amount)
    }

    fn burn_zrc20(&self, ctx: &mut Context<'_>, zrc20: Address, amount: U256) -> CrosschainResult<()> {
        debit(ctx, &balance_key(zrc20, MODULE_ADDRESS_EVM), amount)?;
        credit(ctx, &format!("fake-fungible/burnt/{}", zrc20), amount)
    }

    fn handle_deposit(&self, ctx: &mut Context<'_>, cctx: &CrossChainTx) -> CrosschainResult<()> {
        let amount = cctx.current_outbound()?.amount;
        credit(ctx, &format!("fake-fungible/deposit/{}", cctx.index), amount)?;
        match self.deposit_outcome {
            DepositOutcome::Success => Ok(()),
            DepositOutcome::Revert => Err(CrosschainError::ContractReverted(
                "execution reverted".to_string(),
            )),
            DepositOutcome::Fail => Err(CrosschainError::Internal("deposit failed".to_string())),
        }
    }

    fn revert_and_call_contract(
        &self,
        ctx: &mut Context<'_>,
        cctx: &CrossChainTx,
        message: &[u8],
    ) -> CrosschainResult<()> {
        if self.fail_revert_call {
            return Err(CrosschainError::ContractReverted("onRevert reverted".to_string()));
        }
        ctx.store_mut().set(
            format!("fake-fungible/revert-call/{}", cctx.index).as_bytes(),
            message.to_vec(),
        );
        Ok(())
    }

    fn fund_gas_stability_pool(
        &self,
        ctx: &mut Context<'_>,
        chain_id: i64,
        amount: U256,
    ) -> CrosschainResult<()> {
        credit(ctx, &format!("fake-fungible/stability-pool/{}", chain_id), amount)
    }

    fn refund_remaining_gas_fees(
        &self,
        ctx: &mut Context<'_>,
        chain_id: i64,
        amount: U256,
        receiver: Address,
    ) -> CrosschainResult<()> {
        let gas_zrc20 = self.gas_coin_zrc20(ctx, chain_id)?;
        credit(ctx, &balance_key(gas_zrc20, receiver), amount)
    }

    fn deposit_hub_native(&self, ctx: &mut Context<'_>, to: Address, amount: U256) -> CrosschainResult<()> {
        credit(ctx, &balance_key(HUB_NATIVE, to), amount)
    }

    fn set_gas_price(&self, ctx: &mut Context<'_>, chain_id: i64, price: U256) -> CrosschainResult<()> {
        self.gas_coin_zrc20(ctx, chain_id)?;
        write_amount(
            ctx.store_mut(),
            &format!("fake-fungible/gas-price/{}", chain_id),
            price,
        )
    }

    fn process_abort(
        &self,
        ctx: &mut Context<'_>,
        cctx: &CrossChainTx,
        abort_address: Address,
    ) -> CrosschainResult<()> {
        credit(ctx, &balance_key(HUB_NATIVE, abort_address), cctx.aborted_amount())?;
        if self.fail_abort {
            return Err(CrosschainError::ContractReverted("onAbort reverted".to_string()));
        }
        ctx.store_mut().set(
            format!("fake-fungible/abort/{}", cctx.index).as_bytes(),
            abort_address.to_vec(),
        );
        Ok(())
    }
}
