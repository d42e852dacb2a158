//! Observer-voted gas prices

use super::engine::CrosschainEngine;
use crate::error::{CrosschainError, CrosschainResult};
use crate::metrics;
use crate::state::Context;
use crate::tx::median_gas_values;
use crate::types::{GasPrice, MsgVoteGasPrice};

use alloy_primitives::U256;
use tracing::debug;

impl CrosschainEngine {
    /// Record an observer's gas price for a chain and publish the new median
    pub fn vote_gas_price(&self, ctx: &mut Context<'_>, msg: &MsgVoteGasPrice) -> CrosschainResult<()> {
        self.supported_chain(msg.chain_id)?;

        let mut state = ctx.state();
        let mut gas_price = state
            .get_gas_price(msg.chain_id)?
            .unwrap_or_else(|| GasPrice::new(msg.chain_id, &msg.creator));
        gas_price.vote(&msg.creator, msg.price, msg.priority_fee, msg.block_number);
        state.set_gas_price(&gas_price)?;

        let median = gas_price
            .median_price()
            .ok_or(CrosschainError::UnableToGetGasPrice {
                chain_id: msg.chain_id,
            })?;
        self.fungible
            .set_gas_price(ctx, msg.chain_id, U256::from(median))?;

        debug!(
            "Gas price vote from {} on chain {}: {} (median {})",
            msg.creator, msg.chain_id, msg.price, median
        );
        metrics::record_gas_price_vote(msg.chain_id);
        Ok(())
    }

    /// Median gas price and priority fee of a chain
    pub fn get_median_gas_values(
        &self,
        ctx: &mut Context<'_>,
        chain_id: i64,
    ) -> CrosschainResult<(U256, U256)> {
        median_gas_values(ctx, chain_id)?.ok_or(CrosschainError::UnableToGetGasPrice { chain_id })
    }
}
