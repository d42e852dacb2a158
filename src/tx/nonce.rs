//! Nonce allocation for TSS-signed outbounds
//!
//! Handles:
//! - Per-chain next nonce (`ChainNonce`)
//! - Per (TSS key, chain) window of unconfirmed nonces (`PendingNonces`)
//! - Confirmation that advances the low end of the window
//!
//! Assignment moves `ChainNonce.nonce` and `PendingNonces.nonce_high`
//! together, and only while they are equal.

use crate::error::{CrosschainError, CrosschainResult};
use crate::metrics;
use crate::state::Context;
use crate::types::{ChainNonce, CrossChainTx, PendingNonces};

use tracing::{debug, warn};

/// Open nonce tracking for a chain under a TSS key, starting at `nonce`
pub fn init_chain(ctx: &mut Context<'_>, tss: &str, chain_id: i64, nonce: u64) -> CrosschainResult<()> {
    let mut state = ctx.state();
    state.set_chain_nonce(&ChainNonce { chain_id, nonce })?;
    state.set_pending_nonces(&PendingNonces {
        tss: tss.to_string(),
        chain_id,
        nonce_low: nonce,
        nonce_high: nonce,
    })?;

    debug!("Initialized nonce for chain {}: {}", chain_id, nonce);
    Ok(())
}

/// Open an empty pending window for a new TSS key at the chain's current nonce
pub fn init_pending_nonces(ctx: &mut Context<'_>, tss: &str, chain_id: i64) -> CrosschainResult<()> {
    let mut state = ctx.state();
    let chain_nonce = state
        .get_chain_nonce(chain_id)?
        .ok_or(CrosschainError::CannotFindReceiverNonce { chain_id })?;

    state.set_pending_nonces(&PendingNonces {
        tss: tss.to_string(),
        chain_id,
        nonce_low: chain_nonce.nonce,
        nonce_high: chain_nonce.nonce,
    })
}

/// Assign the next nonce of `chain_id` under the current TSS key `tss` to the
/// current outbound leg. The leg is stamped with `tss`, which signs it.
pub fn update_nonce(
    ctx: &mut Context<'_>,
    tss: &str,
    chain_id: i64,
    cctx: &mut CrossChainTx,
) -> CrosschainResult<()> {
    let mut state = ctx.state();
    let mut chain_nonce = state
        .get_chain_nonce(chain_id)?
        .ok_or(CrosschainError::CannotFindReceiverNonce { chain_id })?;

    let mut pending = state
        .get_pending_nonces(tss, chain_id)?
        .ok_or(CrosschainError::CannotFindPendingNonces { chain_id })?;

    if pending.nonce_high != chain_nonce.nonce {
        warn!(
            "Nonce mismatch on chain {}: pending high {}, chain nonce {}",
            chain_id, pending.nonce_high, chain_nonce.nonce
        );
        return Err(CrosschainError::NonceMismatch {
            chain_id,
            nonce_high: pending.nonce_high,
            chain_nonce: chain_nonce.nonce,
        });
    }

    let current = cctx.current_outbound_mut()?;
    current.tss_pubkey = tss.to_string();
    current.tss_nonce = chain_nonce.nonce;
    let assigned = current.tss_nonce;
    chain_nonce.nonce += 1;
    pending.nonce_high += 1;

    state.set_chain_nonce(&chain_nonce)?;
    state.set_pending_nonces(&pending)?;

    debug!(
        "Assigned nonce {} on chain {} to cctx {}",
        assigned, chain_id, cctx.index
    );
    metrics::record_nonce_assigned(chain_id);
    Ok(())
}

/// Mark `nonce` confirmed. Nonces outside `[low, high]` are ignored.
pub fn remove_from_pending_nonces(
    ctx: &mut Context<'_>,
    tss: &str,
    chain_id: i64,
    nonce: u64,
) -> CrosschainResult<()> {
    let mut state = ctx.state();
    let Some(mut pending) = state.get_pending_nonces(tss, chain_id)? else {
        return Ok(());
    };

    if pending.contains(nonce) {
        pending.nonce_low = nonce + 1;
        state.set_pending_nonces(&pending)?;
        debug!("Confirmed nonce {} on chain {}", nonce, chain_id);
    }
    Ok(())
}
