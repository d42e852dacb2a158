//! Typed access to the orchestration records over a `KvStore`

use super::store::KvStore;
use crate::error::{CrosschainError, CrosschainResult};
use crate::types::{
    CctxStatus, ChainNonce, CoinType, CrossChainTx, GasPrice, InboundHashToCctx, NonceToCctx,
    OutboundTracker, PendingNonces, TssFundMigratorInfo, ZetaAccounting,
};

use alloy_primitives::U256;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

const CCTX_PREFIX: &str = "cctx/";
const NONCE_TO_CCTX_PREFIX: &str = "nonce-to-cctx/";
const CHAIN_NONCE_PREFIX: &str = "chain-nonce/";
const PENDING_NONCES_PREFIX: &str = "pending-nonces/";
const FINALIZED_INBOUND_PREFIX: &str = "finalized-inbound/";
const INBOUND_HASH_TO_CCTX_PREFIX: &str = "inbound-hash-to-cctx/";
const GAS_PRICE_PREFIX: &str = "gas-price/";
const OUTBOUND_TRACKER_PREFIX: &str = "outbound-tracker/";
const FUND_MIGRATOR_PREFIX: &str = "fund-migrator/";
const ZETA_ACCOUNTING_KEY: &str = "zeta-accounting";

/// State manager over whichever store the current step sees
pub struct StateManager<'a> {
    store: &'a mut dyn KvStore,
}

impl<'a> StateManager<'a> {
    pub fn new(store: &'a mut dyn KvStore) -> Self {
        Self { store }
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> CrosschainResult<Option<T>> {
        match self.store.get(key.as_bytes()) {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&mut self, key: &str, value: &T) -> CrosschainResult<()> {
        let bytes = serde_json::to_vec(value)?;
        self.store.set(key.as_bytes(), bytes);
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, prefix: &str) -> CrosschainResult<Vec<T>> {
        self.store
            .prefix_scan(prefix.as_bytes())
            .into_iter()
            .map(|(_, bytes)| serde_json::from_slice(&bytes).map_err(CrosschainError::from))
            .collect()
    }

    // Cross-chain transactions

    pub fn get_cctx(&self, index: &str) -> CrosschainResult<Option<CrossChainTx>> {
        self.read(&format!("{}{}", CCTX_PREFIX, index))
    }

    pub fn set_cctx(&mut self, cctx: &CrossChainTx) -> CrosschainResult<()> {
        self.write(&format!("{}{}", CCTX_PREFIX, cctx.index), cctx)
    }

    pub fn list_cctx(&self) -> CrosschainResult<Vec<CrossChainTx>> {
        self.scan(CCTX_PREFIX)
    }

    /// Save a cctx together with its secondary indexes:
    /// - the nonce index of the current leg while the cctx is pending
    /// - the inbound hash index
    /// - zeta accounting when a hub-native transfer was aborted without refund
    pub fn save_cctx(&mut self, cctx: &CrossChainTx) -> CrosschainResult<()> {
        self.set_cctx(cctx)?;

        if cctx.status().is_pending() {
            let current = cctx.current_outbound()?;
            self.set_nonce_to_cctx(&NonceToCctx {
                tss: current.tss_pubkey.clone(),
                chain_id: current.receiver_chain_id,
                nonce: current.tss_nonce,
                cctx_index: cctx.index.clone(),
            })?;
        }

        let inbound_hash = &cctx.inbound_params.observed_hash;
        let mut by_hash = self
            .get_inbound_hash_to_cctx(inbound_hash)?
            .unwrap_or_else(|| InboundHashToCctx {
                inbound_hash: inbound_hash.clone(),
                cctx_index: Vec::new(),
            });
        if !by_hash.cctx_index.contains(&cctx.index) {
            by_hash.cctx_index.push(cctx.index.clone());
            self.set_inbound_hash_to_cctx(&by_hash)?;
        }

        if cctx.status() == CctxStatus::Aborted
            && cctx.inbound_params.coin_type == CoinType::Zeta
            && !cctx.cctx_status.is_abort_refunded
        {
            self.add_aborted_zeta_amount(cctx.aborted_amount())?;
        }

        debug!(
            "Saved cctx {} with status {}",
            cctx.index,
            cctx.status()
        );
        Ok(())
    }

    /// Count of stored cctxs per status
    pub fn cctx_stats(&self) -> CrosschainResult<CctxStats> {
        let mut stats = CctxStats::default();
        for cctx in self.list_cctx()? {
            match cctx.status() {
                CctxStatus::PendingInbound => stats.pending_inbound += 1,
                CctxStatus::PendingOutbound => stats.pending_outbound += 1,
                CctxStatus::OutboundMined => stats.outbound_mined += 1,
                CctxStatus::PendingRevert => stats.pending_revert += 1,
                CctxStatus::Reverted => stats.reverted += 1,
                CctxStatus::Aborted => stats.aborted += 1,
            }
        }
        Ok(stats)
    }

    // Nonces

    pub fn get_nonce_to_cctx(
        &self,
        tss: &str,
        chain_id: i64,
        nonce: u64,
    ) -> CrosschainResult<Option<NonceToCctx>> {
        self.read(&nonce_to_cctx_key(tss, chain_id, nonce))
    }

    pub fn set_nonce_to_cctx(&mut self, entry: &NonceToCctx) -> CrosschainResult<()> {
        self.write(&nonce_to_cctx_key(&entry.tss, entry.chain_id, entry.nonce), entry)
    }

    pub fn get_chain_nonce(&self, chain_id: i64) -> CrosschainResult<Option<ChainNonce>> {
        self.read(&format!("{}{}", CHAIN_NONCE_PREFIX, chain_id))
    }

    pub fn set_chain_nonce(&mut self, nonce: &ChainNonce) -> CrosschainResult<()> {
        self.write(&format!("{}{}", CHAIN_NONCE_PREFIX, nonce.chain_id), nonce)
    }

    pub fn get_pending_nonces(
        &self,
        tss: &str,
        chain_id: i64,
    ) -> CrosschainResult<Option<PendingNonces>> {
        self.read(&pending_nonces_key(tss, chain_id))
    }

    pub fn set_pending_nonces(&mut self, pending: &PendingNonces) -> CrosschainResult<()> {
        self.write(&pending_nonces_key(&pending.tss, pending.chain_id), pending)
    }

    pub fn list_pending_nonces(&self) -> CrosschainResult<Vec<PendingNonces>> {
        self.scan(PENDING_NONCES_PREFIX)
    }

    // Inbounds

    pub fn is_finalized_inbound(
        &self,
        inbound_hash: &str,
        chain_id: i64,
        event_index: u64,
    ) -> bool {
        self.store
            .has(finalized_inbound_key(inbound_hash, chain_id, event_index).as_bytes())
    }

    pub fn set_finalized_inbound(&mut self, inbound_hash: &str, chain_id: i64, event_index: u64) {
        self.store.set(
            finalized_inbound_key(inbound_hash, chain_id, event_index).as_bytes(),
            vec![1],
        );
    }

    pub fn get_inbound_hash_to_cctx(
        &self,
        inbound_hash: &str,
    ) -> CrosschainResult<Option<InboundHashToCctx>> {
        self.read(&format!("{}{}", INBOUND_HASH_TO_CCTX_PREFIX, inbound_hash))
    }

    pub fn set_inbound_hash_to_cctx(&mut self, entry: &InboundHashToCctx) -> CrosschainResult<()> {
        self.write(
            &format!("{}{}", INBOUND_HASH_TO_CCTX_PREFIX, entry.inbound_hash),
            entry,
        )
    }

    // Gas prices

    pub fn get_gas_price(&self, chain_id: i64) -> CrosschainResult<Option<GasPrice>> {
        self.read(&format!("{}{}", GAS_PRICE_PREFIX, chain_id))
    }

    pub fn set_gas_price(&mut self, gas_price: &GasPrice) -> CrosschainResult<()> {
        self.write(&format!("{}{}", GAS_PRICE_PREFIX, gas_price.chain_id), gas_price)
    }

    // Outbound trackers

    pub fn get_outbound_tracker(
        &self,
        chain_id: i64,
        nonce: u64,
    ) -> CrosschainResult<Option<OutboundTracker>> {
        self.read(&outbound_tracker_key(chain_id, nonce))
    }

    pub fn set_outbound_tracker(&mut self, tracker: &OutboundTracker) -> CrosschainResult<()> {
        self.write(&outbound_tracker_key(tracker.chain_id, tracker.nonce), tracker)
    }

    pub fn remove_outbound_tracker(&mut self, chain_id: i64, nonce: u64) {
        self.store
            .delete(outbound_tracker_key(chain_id, nonce).as_bytes());
    }

    // TSS fund migrators

    pub fn get_fund_migrator(&self, chain_id: i64) -> CrosschainResult<Option<TssFundMigratorInfo>> {
        self.read(&format!("{}{}", FUND_MIGRATOR_PREFIX, chain_id))
    }

    pub fn set_fund_migrator(&mut self, info: &TssFundMigratorInfo) -> CrosschainResult<()> {
        self.write(&format!("{}{}", FUND_MIGRATOR_PREFIX, info.chain_id), info)
    }

    pub fn list_fund_migrators(&self) -> CrosschainResult<Vec<TssFundMigratorInfo>> {
        self.scan(FUND_MIGRATOR_PREFIX)
    }

    pub fn remove_fund_migrator(&mut self, chain_id: i64) {
        self.store
            .delete(format!("{}{}", FUND_MIGRATOR_PREFIX, chain_id).as_bytes());
    }

    // Zeta accounting

    pub fn get_zeta_accounting(&self) -> CrosschainResult<Option<ZetaAccounting>> {
        self.read(ZETA_ACCOUNTING_KEY)
    }

    pub fn set_zeta_accounting(&mut self, accounting: &ZetaAccounting) -> CrosschainResult<()> {
        self.write(ZETA_ACCOUNTING_KEY, accounting)
    }

    pub fn add_aborted_zeta_amount(&mut self, amount: U256) -> CrosschainResult<()> {
        let mut accounting = self.get_zeta_accounting()?.unwrap_or_default();
        accounting.aborted_zeta_amount = accounting.aborted_zeta_amount.saturating_add(amount);
        self.set_zeta_accounting(&accounting)
    }

    /// Release an aborted hub-native amount after it has been refunded
    pub fn remove_aborted_zeta_amount(&mut self, amount: U256) -> CrosschainResult<()> {
        let mut accounting = self
            .get_zeta_accounting()?
            .ok_or(CrosschainError::ZetaAccountingNotFound)?;
        accounting.aborted_zeta_amount = accounting
            .aborted_zeta_amount
            .checked_sub(amount)
            .ok_or_else(|| {
                CrosschainError::InvalidRequest(format!(
                    "aborted zeta amount {} is lower than refund {}",
                    accounting.aborted_zeta_amount, amount
                ))
            })?;
        self.set_zeta_accounting(&accounting)
    }
}

fn nonce_to_cctx_key(tss: &str, chain_id: i64, nonce: u64) -> String {
    format!("{}{}/{}/{}", NONCE_TO_CCTX_PREFIX, tss, chain_id, nonce)
}

fn pending_nonces_key(tss: &str, chain_id: i64) -> String {
    format!("{}{}/{}", PENDING_NONCES_PREFIX, tss, chain_id)
}

fn finalized_inbound_key(inbound_hash: &str, chain_id: i64, event_index: u64) -> String {
    format!(
        "{}{}-{}-{}",
        FINALIZED_INBOUND_PREFIX, inbound_hash, chain_id, event_index
    )
}

fn outbound_tracker_key(chain_id: i64, nonce: u64) -> String {
    format!("{}{}-{}", OUTBOUND_TRACKER_PREFIX, chain_id, nonce)
}

/// Cctx statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CctxStats {
    pub pending_inbound: u64,
    pub pending_outbound: u64,
    pub outbound_mined: u64,
    pub pending_revert: u64,
    pub reverted: u64,
    pub aborted: u64,
}
