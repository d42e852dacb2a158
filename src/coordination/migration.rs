//! TSS key rotation
//!
//! Funds held by the current TSS on each connected chain are moved to the
//! newest key with one admin-issued migration cctx per chain. Once every
//! migration is mined, the admin switches the current TSS to the new key.

use super::engine::CrosschainEngine;
use crate::error::{CrosschainError, CrosschainResult};
use crate::metrics;
use crate::state::{with_cache, Context};
use crate::tx::{init_pending_nonces, update_nonce};
use crate::types::{
    keccak256_hex, tss::tss_address_for_chain, CctxStatus, Chain, CoinType, CrossChainTx,
    InboundParams, MsgMigrateTssFunds, MsgUpdateTssAddress, OutboundParams,
    ProtocolContractVersion, RevertOptions, Status, TssFundMigratorInfo, TxFinalizationStatus,
};

use alloy_primitives::U256;
use std::collections::HashSet;
use tracing::info;

/// Relayed message of migration cctxs: command and memo
pub const CMD_MIGRATE_TSS_FUNDS: &str = "cmd_migrate_tss_funds";
const MIGRATION_MEMO: &str = "Funds Migrator Admin Cmd";

impl CrosschainEngine {
    /// Create the cctx moving `msg.amount` from the current TSS to the newest
    /// one on `msg.chain_id`. Returns the cctx index.
    pub fn migrate_tss_funds(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgMigrateTssFunds,
    ) -> CrosschainResult<String> {
        self.ensure_admin(&msg.creator)?;
        let chain = self.supported_chain(msg.chain_id)?;
        let current = self.observer.tss().ok_or(CrosschainError::TssNotFound)?;

        let history = self.observer.tss_history();
        if history.len() < 2 {
            return Err(CrosschainError::CannotMigrateTssFunds(
                "cannot migrate, only one TSS found".to_string(),
            ));
        }
        let newest = history
            .iter()
            .max_by_key(|tss| tss.finalized_zeta_height)
            .ok_or(CrosschainError::TssNotFound)?;
        if newest.tss_pubkey == current.tss_pubkey {
            return Err(CrosschainError::CannotMigrateTssFunds(
                "no new tss address has been generated".to_string(),
            ));
        }

        let mut state = ctx.state();
        let pending = state
            .get_pending_nonces(&current.tss_pubkey, msg.chain_id)?
            .ok_or(CrosschainError::CannotFindPendingNonces {
                chain_id: msg.chain_id,
            })?;
        if !pending.is_empty() {
            return Err(CrosschainError::CannotMigrateTssFunds(
                "cannot migrate funds when there are pending nonces".to_string(),
            ));
        }

        if let Some(migrator) = state.get_fund_migrator(msg.chain_id)? {
            let still_pending = state
                .get_cctx(&migrator.migration_cctx_index)?
                .map(|cctx| cctx.status().is_pending())
                .unwrap_or(false);
            if still_pending {
                return Err(CrosschainError::CannotMigrateTssFunds(
                    "cannot migrate funds while there are pending migrations".to_string(),
                ));
            }
        }

        let (median_price, median_priority_fee) = self.get_median_gas_values(ctx, msg.chain_id)?;
        let mut cctx = self.build_migration_cctx(
            ctx,
            msg,
            &chain,
            &current.tss_pubkey,
            &newest.tss_pubkey,
            median_price,
            median_priority_fee,
        )?;

        if ctx.state().get_cctx(&cctx.index)?.is_some() {
            return Err(CrosschainError::CannotMigrateTssFunds(format!(
                "migration cctx {} already exists",
                cctx.index
            )));
        }

        update_nonce(ctx, &current.tss_pubkey, msg.chain_id, &mut cctx)?;

        let mut state = ctx.state();
        state.save_cctx(&cctx)?;
        state.set_fund_migrator(&TssFundMigratorInfo {
            chain_id: msg.chain_id,
            migration_cctx_index: cctx.index.clone(),
        })?;

        info!(
            "Migrating {} on chain {} to new TSS with cctx {}",
            cctx.outbound_params[0].amount, msg.chain_id, cctx.index
        );
        metrics::record_tss_migration(msg.chain_id);
        Ok(cctx.index)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_migration_cctx(
        &self,
        ctx: &Context<'_>,
        msg: &MsgMigrateTssFunds,
        chain: &Chain,
        current_pubkey: &str,
        new_pubkey: &str,
        median_price: U256,
        median_priority_fee: U256,
    ) -> CrosschainResult<CrossChainTx> {
        let config = &self.settings.migration;
        let height = ctx.block_height();
        let index = keccak256_hex(
            format!(
                "{}-{}-{}-{}-{}",
                current_pubkey, new_pubkey, msg.chain_id, msg.amount, height
            )
            .as_bytes(),
        );

        let gas_priority_fee =
            median_priority_fee.saturating_mul(U256::from(config.priority_fee_multiplier));
        let (gas_limit, gas_price, amount) = if chain.is_evm() {
            let gas_price = median_price.saturating_mul(U256::from(config.evm_gas_multiplier_numerator))
                / U256::from(config.evm_gas_multiplier_denominator.max(1));
            let fee = U256::from(config.evm_send_gas_limit)
                .saturating_mul(gas_price)
                .saturating_add(config.evm_buffer_amount);
            if fee > msg.amount {
                return Err(CrosschainError::InsufficientFundsTssMigration(format!(
                    "fee {} exceeds amount {}",
                    fee, msg.amount
                )));
            }
            (config.evm_send_gas_limit, gas_price, msg.amount - fee)
        } else if chain.is_utxo() {
            let gas_price = median_price.saturating_mul(U256::from(config.utxo_gas_multiplier));
            (config.utxo_gas_limit, gas_price, msg.amount)
        } else {
            return Err(CrosschainError::UnsupportedChain {
                chain_id: chain.chain_id,
            });
        };

        let old_address = tss_address_for_chain(current_pubkey, chain)?;
        let new_address = tss_address_for_chain(new_pubkey, chain)?;

        let mut leg = OutboundParams::new(
            new_address,
            chain.chain_id,
            CoinType::Cmd,
            gas_limit,
            current_pubkey,
        );
        leg.amount = amount;
        leg.gas_price = gas_price;
        leg.gas_priority_fee = gas_priority_fee;

        let cctx = CrossChainTx {
            creator: msg.creator.clone(),
            index: index.clone(),
            zeta_fees: U256::ZERO,
            relayed_message: format!("{}:{}", CMD_MIGRATE_TSS_FUNDS, MIGRATION_MEMO),
            cctx_status: Status::new(CctxStatus::PendingOutbound, ctx.timestamp()),
            inbound_params: InboundParams {
                sender: old_address.clone(),
                sender_chain_id: chain.chain_id,
                tx_origin: old_address,
                coin_type: CoinType::Cmd,
                asset: String::new(),
                amount: msg.amount,
                observed_hash: index.clone(),
                observed_external_height: height,
                ballot_index: index,
                finalized_zeta_height: height,
                tx_finalization_status: TxFinalizationStatus::Executed,
                is_cross_chain_call: false,
                event_index: 0,
            },
            outbound_params: vec![leg],
            protocol_contract_version: ProtocolContractVersion::V1,
            revert_options: RevertOptions::default(),
        };
        cctx.validate()?;
        Ok(cctx)
    }

    /// Switch the current TSS to `msg.tss_pubkey` once every chain's funds
    /// have been migrated
    pub fn update_tss_address(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgUpdateTssAddress,
    ) -> CrosschainResult<()> {
        self.ensure_admin(&msg.creator)?;

        let new_tss = self
            .observer
            .tss_history()
            .into_iter()
            .find(|tss| tss.tss_pubkey == msg.tss_pubkey)
            .ok_or_else(|| {
                CrosschainError::UnableToUpdateTss("tss pubkey has not been generated".to_string())
            })?;
        let current = self.observer.tss().ok_or(CrosschainError::TssNotFound)?;
        if current.tss_pubkey == new_tss.tss_pubkey {
            return Err(CrosschainError::UnableToUpdateTss(
                "no new tss address has been generated".to_string(),
            ));
        }

        let chains: Vec<Chain> = self
            .observer
            .supported_chains()
            .into_iter()
            .filter(|chain| chain.is_external() && (chain.is_evm() || chain.is_utxo()))
            .collect();

        let mut state = ctx.state();
        let migrators = state.list_fund_migrators()?;
        let migrated: HashSet<i64> = migrators.iter().map(|m| m.chain_id).collect();
        if chains.iter().any(|chain| !migrated.contains(&chain.chain_id)) {
            return Err(CrosschainError::UnableToUpdateTss(
                "cannot update tss address not enough migrations have been created and completed"
                    .to_string(),
            ));
        }
        for migrator in &migrators {
            let cctx = state
                .get_cctx(&migrator.migration_cctx_index)?
                .ok_or_else(|| {
                    CrosschainError::UnableToUpdateTss("migration cross chain tx not found".to_string())
                })?;
            if cctx.status() != CctxStatus::OutboundMined {
                return Err(CrosschainError::UnableToUpdateTss(
                    "cannot update tss address while there are pending migrations".to_string(),
                ));
            }
        }

        // the observer switches keys only once every window is open
        with_cache(ctx, |tmp| {
            for chain in &chains {
                init_pending_nonces(tmp, &new_tss.tss_pubkey, chain.chain_id)?;
            }
            let mut state = tmp.state();
            for migrator in &migrators {
                state.remove_fund_migrator(migrator.chain_id);
            }
            self.observer.set_tss(new_tss.clone())
        })?;

        info!(
            "Updated TSS from {} to {} across {} chains",
            current.tss_pubkey,
            new_tss.tss_pubkey,
            chains.len()
        );
        Ok(())
    }
}
