//! Outbound trackers: hashes reported for a pending nonce so observers can
//! find the signed outbound quickly

use super::engine::CrosschainEngine;
use crate::error::{CrosschainError, CrosschainResult};
use crate::state::Context;
use crate::types::{keccak256, Chain, MsgAddOutboundTracker, OutboundTracker, Proof, TxHash};

use sha2::{Digest, Sha256};
use tracing::{debug, info};

impl CrosschainEngine {
    /// Add a candidate hash to the tracker of `(chain, nonce)`. Returns true
    /// when the nonce's cctx is already settled and nothing was added.
    pub fn add_outbound_tracker(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgAddOutboundTracker,
    ) -> CrosschainResult<bool> {
        let chain = self.supported_chain(msg.chain_id)?;
        let tss = self.observer.tss().ok_or(CrosschainError::TssNotFound)?;

        let mut state = ctx.state();
        let cctx = state
            .get_nonce_to_cctx(&tss.tss_pubkey, msg.chain_id, msg.nonce)?
            .map(|entry| state.get_cctx(&entry.cctx_index))
            .transpose()?
            .flatten()
            .ok_or_else(|| {
                CrosschainError::CctxNotFound(format!("chain {} nonce {}", msg.chain_id, msg.nonce))
            })?;

        if !cctx.status().is_pending() {
            debug!(
                "Tracker for chain {} nonce {} ignored, cctx {} is {}",
                msg.chain_id,
                msg.nonce,
                cctx.index,
                cctx.status()
            );
            return Ok(true);
        }

        let proven = match &msg.proof {
            Some(proof) => {
                self.verify_tracker_proof(&chain, proof, msg)?;
                true
            }
            None => {
                if !self.observer.is_authorized(&msg.creator, msg.chain_id)
                    && !self.observer.is_admin(&msg.creator)
                {
                    return Err(CrosschainError::NotAuthorized(format!(
                        "{} cannot add an outbound tracker without a proof",
                        msg.creator
                    )));
                }
                false
            }
        };

        let mut tracker = state
            .get_outbound_tracker(msg.chain_id, msg.nonce)?
            .unwrap_or_else(|| OutboundTracker::new(msg.chain_id, msg.nonce));

        if let Some(existing) = tracker.find_hash_mut(&msg.tx_hash) {
            if proven {
                existing.proven = true;
                state.set_outbound_tracker(&tracker)?;
            }
            return Ok(false);
        }

        if tracker.is_full() {
            return Err(CrosschainError::MaxTrackerHashesReached {
                chain_id: msg.chain_id,
                nonce: msg.nonce,
            });
        }

        tracker.hash_list.push(TxHash {
            tx_hash: msg.tx_hash.clone(),
            tx_signer: msg.creator.clone(),
            proven,
        });
        state.set_outbound_tracker(&tracker)?;

        info!(
            "Outbound tracker for chain {} nonce {} now holds {} hashes",
            msg.chain_id,
            msg.nonce,
            tracker.hash_list.len()
        );
        Ok(false)
    }

    fn verify_tracker_proof(
        &self,
        chain: &Chain,
        proof: &Proof,
        msg: &MsgAddOutboundTracker,
    ) -> CrosschainResult<()> {
        let tx_bytes = self
            .light_client
            .verify_proof(proof, msg.chain_id, &msg.block_hash, msg.tx_index)
            .map_err(|e| CrosschainError::ProofVerificationFailed(e.to_string()))?;

        let body_hash = if chain.is_evm() {
            hex::encode(keccak256(&tx_bytes))
        } else if chain.is_utxo() {
            let mut digest = Sha256::digest(Sha256::digest(&tx_bytes)).to_vec();
            // txids are displayed byte-reversed
            digest.reverse();
            hex::encode(digest)
        } else {
            return Err(CrosschainError::TxBodyVerificationFailed(format!(
                "cannot verify transactions of chain {}",
                chain.chain_id
            )));
        };

        let expected = msg.tx_hash.trim_start_matches("0x");
        if !body_hash.eq_ignore_ascii_case(expected) {
            return Err(CrosschainError::TxBodyVerificationFailed(format!(
                "tx hash mismatch: want {}, got {}",
                expected, body_hash
            )));
        }
        Ok(())
    }
}
