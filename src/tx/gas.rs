//! Gas payment for outbound legs
//!
//! Converts an inbound value into an outbound value net of the destination
//! chain's gas cost. How the fee is paid depends on the inbound coin:
//! - Native gas: the fee is deducted directly
//! - ERC20: the fee is quoted in the asset, swapped into the gas asset and burnt
//! - Hub-native: the fee is quoted in hub coin at a doubled gas price, plus a
//!   protocol fee, then swapped into the gas asset and burnt
//!
//! Callers run these against a staged context.

use crate::config::FeeConfig;
use crate::error::{CrosschainError, CrosschainResult};
use crate::external::{FungibleKeeper, MODULE_ADDRESS_EVM};
use crate::metrics;
use crate::state::Context;
use crate::types::{CoinType, CrossChainTx};

use alloy_primitives::{Address, U256};
use tracing::{debug, info};

/// Gas figures used to price an outbound on a chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainGasParams {
    pub gas_zrc20: Address,
    pub gas_limit: u64,
    pub gas_price: U256,
    pub priority_fee: U256,
    pub protocol_flat_fee: U256,
}

impl ChainGasParams {
    /// Gas limit × gas price, without protocol fee
    pub fn gas_fee(&self) -> U256 {
        U256::from(self.gas_limit).saturating_mul(self.gas_price)
    }
}

/// How the gas of an outbound is paid, per inbound coin type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GasPaymentPath {
    Native,
    Erc20,
    HubNative,
}

impl GasPaymentPath {
    fn for_coin(coin_type: CoinType) -> CrosschainResult<Self> {
        match coin_type {
            CoinType::Gas | CoinType::NoAssetCall => Ok(GasPaymentPath::Native),
            CoinType::Erc20 => Ok(GasPaymentPath::Erc20),
            CoinType::Zeta => Ok(GasPaymentPath::HubNative),
            CoinType::Cmd => Err(CrosschainError::InvalidCoinType(format!(
                "can't pay gas with coin type {}",
                coin_type
            ))),
        }
    }
}

/// Median gas price and priority fee voted for a chain
pub fn median_gas_values(ctx: &mut Context<'_>, chain_id: i64) -> CrosschainResult<Option<(U256, U256)>> {
    let Some(gas_price) = ctx.state().get_gas_price(chain_id)? else {
        return Ok(None);
    };
    Ok(gas_price.median_price().map(|price| {
        (
            U256::from(price),
            U256::from(gas_price.median_priority_fee()),
        )
    }))
}

/// Gas payment engine
pub struct GasPayer<'a> {
    fungible: &'a dyn FungibleKeeper,
    fees: &'a FeeConfig,
}

impl<'a> GasPayer<'a> {
    pub fn new(fungible: &'a dyn FungibleKeeper, fees: &'a FeeConfig) -> Self {
        Self { fungible, fees }
    }

    /// Gas parameters of `chain_id`; the gas limit is at least `leg_gas_limit`
    pub fn chain_gas_params(
        &self,
        ctx: &mut Context<'_>,
        chain_id: i64,
        leg_gas_limit: u64,
    ) -> CrosschainResult<ChainGasParams> {
        let gas_zrc20 = self.fungible.gas_coin_zrc20(ctx, chain_id)?;
        let queried_gas_limit = self.fungible.query_gas_limit(ctx, gas_zrc20)?;
        let protocol_flat_fee = self.fungible.query_protocol_flat_fee(ctx, gas_zrc20)?;

        let (gas_price, priority_fee) = median_gas_values(ctx, chain_id)?
            .ok_or(CrosschainError::UnableToGetGasPrice { chain_id })?;

        Ok(ChainGasParams {
            gas_zrc20,
            gas_limit: leg_gas_limit.max(queried_gas_limit),
            gas_price,
            priority_fee,
            protocol_flat_fee,
        })
    }

    /// Charge the gas of the current leg towards `chain_id` to `input_amount`
    /// and record the gas figures and net amount on the leg
    pub fn pay_gas_and_update_cctx(
        &self,
        ctx: &mut Context<'_>,
        chain_id: i64,
        cctx: &mut CrossChainTx,
        input_amount: U256,
    ) -> CrosschainResult<()> {
        let coin_type = cctx.inbound_params.coin_type;
        match GasPaymentPath::for_coin(coin_type)? {
            GasPaymentPath::Native => self.pay_gas_native_and_update_cctx(ctx, chain_id, cctx, input_amount)?,
            GasPaymentPath::Erc20 => self.pay_gas_in_erc20_and_update_cctx(ctx, chain_id, cctx, input_amount)?,
            GasPaymentPath::HubNative => self.pay_gas_in_zeta_and_update_cctx(ctx, chain_id, cctx, input_amount)?,
        }

        metrics::record_gas_payment(chain_id, coin_type.as_str());
        Ok(())
    }

    fn pay_gas_native_and_update_cctx(
        &self,
        ctx: &mut Context<'_>,
        chain_id: i64,
        cctx: &mut CrossChainTx,
        input_amount: U256,
    ) -> CrosschainResult<()> {
        let leg_gas_limit = cctx.current_outbound()?.gas_limit;
        let gas = self.chain_gas_params(ctx, chain_id, leg_gas_limit)?;

        let outbound_gas_fee = gas.gas_fee().saturating_add(gas.protocol_flat_fee);
        if outbound_gas_fee > input_amount {
            return Err(CrosschainError::NotEnoughGas(format!(
                "outbound gas fee {} more than available gas for tx {} | identifiers: {}",
                outbound_gas_fee,
                input_amount,
                cctx.log_identifier()
            )));
        }

        info!(
            "Subtracting gas fee {} from amount {} for cctx {}",
            outbound_gas_fee, input_amount, cctx.index
        );
        record_gas_on_leg(cctx, &gas, gas.gas_price, gas.priority_fee, input_amount - outbound_gas_fee)
    }

    fn pay_gas_in_erc20_and_update_cctx(
        &self,
        ctx: &mut Context<'_>,
        chain_id: i64,
        cctx: &mut CrossChainTx,
        input_amount: U256,
    ) -> CrosschainResult<()> {
        let leg_gas_limit = cctx.current_outbound()?.gas_limit;
        let gas = self.chain_gas_params(ctx, chain_id, leg_gas_limit)?;
        let outbound_gas_fee = gas.gas_fee().saturating_add(gas.protocol_flat_fee);

        let asset_zrc20 = self.fungible.foreign_coin_zrc20(
            ctx,
            &cctx.inbound_params.asset,
            cctx.inbound_params.sender_chain_id,
        )?;

        let fee_in_asset = self
            .fungible
            .query_amounts_in(ctx, outbound_gas_fee, asset_zrc20, gas.gas_zrc20)
            .map_err(|e| {
                CrosschainError::NoLiquidityPool(format!(
                    "no route from {} to gas asset {}: {}",
                    asset_zrc20, gas.gas_zrc20, e
                ))
            })?;

        if fee_in_asset > input_amount {
            return Err(CrosschainError::NotEnoughGas(format!(
                "fee in asset {} more than available amount {} | identifiers: {}",
                fee_in_asset,
                input_amount,
                cctx.log_identifier()
            )));
        }

        // mint the fee portion, convert it to gas and burn the gas
        self.fungible
            .deposit_zrc20(ctx, asset_zrc20, MODULE_ADDRESS_EVM, fee_in_asset)
            .map_err(|e| e.context("PayGasInERC20AndUpdateCctx: unable to mint asset fee"))?;
        let gas_obtained = self
            .fungible
            .swap_exact_tokens_for_tokens(ctx, fee_in_asset, asset_zrc20, gas.gas_zrc20, outbound_gas_fee)
            .map_err(|e| CrosschainError::Swap(e.to_string()))?;
        if gas_obtained < outbound_gas_fee {
            return Err(CrosschainError::Swap(format!(
                "obtained gas {} is lower than gas fee {}",
                gas_obtained, outbound_gas_fee
            )));
        }
        self.fungible
            .burn_zrc20(ctx, gas.gas_zrc20, gas_obtained)
            .map_err(|e| e.context("PayGasInERC20AndUpdateCctx: unable to burn gas"))?;

        debug!(
            "Paid gas {} with {} of asset {} for cctx {}",
            outbound_gas_fee, fee_in_asset, asset_zrc20, cctx.index
        );
        record_gas_on_leg(cctx, &gas, gas.gas_price, gas.priority_fee, input_amount - fee_in_asset)
    }

    fn pay_gas_in_zeta_and_update_cctx(
        &self,
        ctx: &mut Context<'_>,
        chain_id: i64,
        cctx: &mut CrossChainTx,
        zeta_burnt: U256,
    ) -> CrosschainResult<()> {
        let leg_gas_limit = cctx.current_outbound()?.gas_limit;
        let gas = self.chain_gas_params(ctx, chain_id, leg_gas_limit)?;

        // overpay the gas price to absorb price moves until the outbound is signed
        let multiplier = U256::from(self.fees.hub_native_gas_multiplier);
        let gas_price = gas.gas_price.saturating_mul(multiplier);
        let priority_fee = gas.priority_fee.saturating_mul(multiplier);
        if priority_fee > gas_price {
            return Err(CrosschainError::InvalidGasPriority {
                gas_price: gas_price.to_string(),
                priority_fee: priority_fee.to_string(),
            });
        }

        let outbound_gas_fee = U256::from(gas.gas_limit).saturating_mul(gas_price);
        let gas_fee_in_zeta = self
            .fungible
            .query_hub_native_amounts_in(ctx, outbound_gas_fee, gas.gas_zrc20)
            .map_err(|e| e.context("PayGasInZetaAndUpdateCctx: unable to query amounts in"))?;
        let fee_in_zeta = gas_fee_in_zeta.saturating_add(self.fees.hub_native_protocol_fee);

        if fee_in_zeta > zeta_burnt {
            return Err(CrosschainError::NotEnoughZetaBurnt(format!(
                "fee in zeta {} more than zeta burnt {} | identifiers: {}",
                fee_in_zeta,
                zeta_burnt,
                cctx.log_identifier()
            )));
        }

        self.fungible
            .mint_hub_native(ctx, fee_in_zeta)
            .map_err(|e| e.context("PayGasInZetaAndUpdateCctx: unable to mint coins"))?;
        let gas_obtained = self
            .fungible
            .swap_exact_hub_native_for_tokens(ctx, gas_fee_in_zeta, gas.gas_zrc20, outbound_gas_fee)
            .map_err(|e| CrosschainError::Swap(e.to_string()))?;
        self.fungible
            .burn_zrc20(ctx, gas.gas_zrc20, gas_obtained)
            .map_err(|e| e.context("PayGasInZetaAndUpdateCctx: unable to burn gas"))?;

        info!(
            "Paid gas {} with {} hub coin for cctx {}",
            outbound_gas_fee, fee_in_zeta, cctx.index
        );
        cctx.zeta_fees = cctx.zeta_fees.saturating_add(fee_in_zeta);
        record_gas_on_leg(cctx, &gas, gas_price, priority_fee, zeta_burnt - fee_in_zeta)
    }

    /// Gas limit for a revert leg back to the sender chain: the `GAS_LIMIT`
    /// of the ZRC20 that carried the inbound. Coin types without a ZRC20 get 0.
    pub fn revert_gas_limit(&self, ctx: &mut Context<'_>, cctx: &CrossChainTx) -> CrosschainResult<u64> {
        let sender_chain_id = cctx.inbound_params.sender_chain_id;
        let zrc20 = match cctx.inbound_params.coin_type {
            CoinType::Gas => self.fungible.gas_coin_zrc20(ctx, sender_chain_id).map_err(|e| {
                CrosschainError::ForeignCoinNotFound(format!(
                    "no gas coin for chain {}: {}",
                    sender_chain_id, e
                ))
            })?,
            CoinType::Erc20 => self
                .fungible
                .foreign_coin_zrc20(ctx, &cctx.inbound_params.asset, sender_chain_id)
                .map_err(|e| {
                    CrosschainError::ForeignCoinNotFound(format!(
                        "no foreign coin {} for chain {}: {}",
                        cctx.inbound_params.asset, sender_chain_id, e
                    ))
                })?,
            CoinType::Zeta | CoinType::Cmd | CoinType::NoAssetCall => return Ok(0),
        };

        self.fungible.query_gas_limit(ctx, zrc20)
    }

    /// `revert_gas_limit`, or `fallback` when it resolves to 0
    pub fn revert_gas_limit_or(
        &self,
        ctx: &mut Context<'_>,
        cctx: &CrossChainTx,
        fallback: u64,
    ) -> CrosschainResult<u64> {
        let gas_limit = self
            .revert_gas_limit(ctx, cctx)
            .map_err(|e| e.context("GetRevertGasLimit"))?;
        Ok(if gas_limit == 0 { fallback } else { gas_limit })
    }
}

fn record_gas_on_leg(
    cctx: &mut CrossChainTx,
    gas: &ChainGasParams,
    gas_price: U256,
    priority_fee: U256,
    net_amount: U256,
) -> CrosschainResult<()> {
    let leg = cctx.current_outbound_mut()?;
    leg.gas_limit = gas.gas_limit;
    leg.gas_price = gas_price;
    leg.gas_priority_fee = priority_fee;
    leg.user_gas_fee_paid = Some(U256::from(gas.gas_limit).saturating_mul(gas_price));
    leg.amount = net_amount;
    Ok(())
}
