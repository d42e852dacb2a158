//! Interfaces of the collaborating subsystems
//!
//! - `ObserverKeeper`: ballots, the chain registry and TSS records
//! - `FungibleKeeper`: ZRC20 mint/burn, AMM swaps and hub EVM calls
//! - `LightClient`: inclusion proof verification
//!
//! Fungible operations that move balances receive the staged `Context`, so
//! their effects are discarded together with a failed attempt.

use crate::error::CrosschainResult;
use crate::state::Context;
use crate::types::{
    BallotStatus, Chain, ChainParams, CrossChainTx, ForeignCoin, MsgVoteInbound, MsgVoteOutbound,
    Proof, Tss,
};

use alloy_primitives::{address, Address, U256};

/// EVM account of the crosschain module on the hub; fee conversions mint,
/// swap and burn from here
pub const MODULE_ADDRESS_EVM: Address = address!("735b14BB79463307AAcBED86DAf3322B1e6226aB");

#[cfg_attr(test, mockall::automock)]
pub trait ObserverKeeper: Send + Sync {
    /// Registered chain, if it is currently supported
    fn supported_chain(&self, chain_id: i64) -> Option<Chain>;

    fn supported_chains(&self) -> Vec<Chain>;

    fn chain_params(&self, chain_id: i64) -> Option<ChainParams>;

    /// Current TSS key
    fn tss(&self) -> Option<Tss>;

    /// Every TSS key ever generated, oldest first
    fn tss_history(&self) -> Vec<Tss>;

    fn set_tss(&self, tss: Tss) -> CrosschainResult<()>;

    /// Add the creator's vote; returns whether the ballot just finalized
    fn vote_on_inbound_ballot(&self, msg: &MsgVoteInbound, ballot_index: &str)
        -> CrosschainResult<bool>;

    /// Add the creator's vote; returns whether the ballot just finalized and
    /// the ballot outcome
    fn vote_on_outbound_ballot(
        &self,
        msg: &MsgVoteOutbound,
        ballot_index: &str,
    ) -> CrosschainResult<(bool, BallotStatus)>;

    /// Whether the address is an observer allowed to report for the chain
    fn is_authorized(&self, address: &str, chain_id: i64) -> bool;

    fn is_admin(&self, address: &str) -> bool;
}

pub trait FungibleKeeper: Send + Sync {
    /// ZRC20 representing the gas asset of a chain
    fn gas_coin_zrc20(&self, ctx: &Context<'_>, chain_id: i64) -> CrosschainResult<Address>;

    /// ZRC20 representing a foreign asset of a chain
    fn foreign_coin_zrc20(
        &self,
        ctx: &Context<'_>,
        asset: &str,
        chain_id: i64,
    ) -> CrosschainResult<Address>;

    /// Registration of the foreign asset a ZRC20 represents
    fn foreign_coin(&self, ctx: &Context<'_>, zrc20: Address) -> CrosschainResult<ForeignCoin>;

    /// The `GAS_LIMIT` of a ZRC20 contract
    fn query_gas_limit(&self, ctx: &Context<'_>, zrc20: Address) -> CrosschainResult<u64>;

    fn query_protocol_flat_fee(&self, ctx: &Context<'_>, zrc20: Address) -> CrosschainResult<U256>;

    /// Amount of `zrc20_in` needed to obtain `amount_out` of `zrc20_out`
    fn query_amounts_in(
        &self,
        ctx: &Context<'_>,
        amount_out: U256,
        zrc20_in: Address,
        zrc20_out: Address,
    ) -> CrosschainResult<U256>;

    /// Amount of hub-native coin needed to obtain `amount_out` of `zrc20_out`
    fn query_hub_native_amounts_in(
        &self,
        ctx: &Context<'_>,
        amount_out: U256,
        zrc20_out: Address,
    ) -> CrosschainResult<U256>;

    fn deposit_zrc20(
        &self,
        ctx: &mut Context<'_>,
        zrc20: Address,
        to: Address,
        amount: U256,
    ) -> CrosschainResult<()>;

    /// Mint hub-native coin to the module account
    fn mint_hub_native(&self, ctx: &mut Context<'_>, amount: U256) -> CrosschainResult<()>;

    /// Swap from the module account; returns the amount obtained
    fn swap_exact_tokens_for_tokens(
        &self,
        ctx: &mut Context<'_>,
        amount_in: U256,
        zrc20_in: Address,
        zrc20_out: Address,
        min_amount_out: U256,
    ) -> CrosschainResult<U256>;

    fn swap_exact_hub_native_for_tokens(
        &self,
        ctx: &mut Context<'_>,
        amount_in: U256,
        zrc20_out: Address,
        min_amount_out: U256,
    ) -> CrosschainResult<U256>;

    /// Burn hub-native coin held by the module account
    fn burn_hub_native(&self, ctx: &mut Context<'_>, amount: U256) -> CrosschainResult<()>;

    /// Burn from the module account
    fn burn_zrc20(&self, ctx: &mut Context<'_>, zrc20: Address, amount: U256)
        -> CrosschainResult<()>;

    /// Deposit the inbound into the hub EVM, calling the receiver when a
    /// message is attached. A reverted call is reported as `ContractReverted`.
    fn handle_deposit(&self, ctx: &mut Context<'_>, cctx: &CrossChainTx) -> CrosschainResult<()>;

    /// Return hub-native funds to a hub sender whose outbound failed, calling
    /// its revert hook with the relayed message
    fn revert_and_call_contract(
        &self,
        ctx: &mut Context<'_>,
        cctx: &CrossChainTx,
        message: &[u8],
    ) -> CrosschainResult<()>;

    fn fund_gas_stability_pool(
        &self,
        ctx: &mut Context<'_>,
        chain_id: i64,
        amount: U256,
    ) -> CrosschainResult<()>;

    /// Refund unused gas, in gas ZRC20, to a hub sender
    fn refund_remaining_gas_fees(
        &self,
        ctx: &mut Context<'_>,
        chain_id: i64,
        amount: U256,
        receiver: Address,
    ) -> CrosschainResult<()>;

    fn deposit_hub_native(&self, ctx: &mut Context<'_>, to: Address, amount: U256)
        -> CrosschainResult<()>;

    /// Publish the median gas price of a chain to its gas ZRC20
    fn set_gas_price(&self, ctx: &mut Context<'_>, chain_id: i64, price: U256)
        -> CrosschainResult<()>;

    /// Hand an aborted cctx's funds to its abort address
    fn process_abort(
        &self,
        ctx: &mut Context<'_>,
        cctx: &CrossChainTx,
        abort_address: Address,
    ) -> CrosschainResult<()>;
}

#[cfg_attr(test, mockall::automock)]
pub trait LightClient: Send + Sync {
    /// Verify an inclusion proof and return the raw transaction bytes
    fn verify_proof(
        &self,
        proof: &Proof,
        chain_id: i64,
        block_hash: &str,
        tx_index: i64,
    ) -> CrosschainResult<Vec<u8>>;
}
