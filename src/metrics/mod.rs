//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - CCTX status transitions and aborts
//! - Nonce assignment
//! - Gas payments and revert synthesis
//! - TSS fund migrations and gas price votes
//!
//! The host decides how the registry is served; `gather_text` renders it.

use crate::error::{CrosschainError, CrosschainResult};

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec, Encoder, TextEncoder};

lazy_static! {
    pub static ref STATUS_TRANSITIONS: CounterVec = register_counter_vec!(
        "cctx_status_transitions_total",
        "Total CCTX status transitions",
        &["from", "to"]
    ).unwrap();

    pub static ref CCTX_ABORTED: CounterVec = register_counter_vec!(
        "cctx_aborted_total",
        "Total CCTX aborted by originating operation",
        &["reason"]
    ).unwrap();

    pub static ref NONCES_ASSIGNED: CounterVec = register_counter_vec!(
        "cctx_nonces_assigned_total",
        "Total outbound nonces assigned",
        &["chain_id"]
    ).unwrap();

    pub static ref GAS_PAYMENTS: CounterVec = register_counter_vec!(
        "cctx_gas_payments_total",
        "Total gas payments by destination chain and coin type",
        &["chain_id", "coin_type"]
    ).unwrap();

    pub static ref REVERTS_CREATED: CounterVec = register_counter_vec!(
        "cctx_reverts_created_total",
        "Total revert legs synthesized",
        &["chain_id"]
    ).unwrap();

    pub static ref TSS_MIGRATIONS: CounterVec = register_counter_vec!(
        "cctx_tss_migrations_total",
        "Total TSS fund migration CCTX created",
        &["chain_id"]
    ).unwrap();

    pub static ref GAS_PRICE_VOTES: CounterVec = register_counter_vec!(
        "cctx_gas_price_votes_total",
        "Total gas price votes accepted",
        &["chain_id"]
    ).unwrap();
}

/// Render every registered metric in the Prometheus text format
pub fn gather_text() -> CrosschainResult<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| CrosschainError::Internal(format!("metrics encoding failed: {}", e)))?;
    String::from_utf8(buffer).map_err(|e| CrosschainError::Internal(e.to_string()))
}

// Helper functions to record metrics

pub fn record_status_transition(from: &str, to: &str) {
    STATUS_TRANSITIONS.with_label_values(&[from, to]).inc();
}

pub fn record_abort(reason: &str) {
    CCTX_ABORTED.with_label_values(&[reason]).inc();
}

pub fn record_nonce_assigned(chain_id: i64) {
    NONCES_ASSIGNED
        .with_label_values(&[&chain_id.to_string()])
        .inc();
}

pub fn record_gas_payment(chain_id: i64, coin_type: &str) {
    GAS_PAYMENTS
        .with_label_values(&[&chain_id.to_string(), coin_type])
        .inc();
}

pub fn record_revert_created(chain_id: i64) {
    REVERTS_CREATED
        .with_label_values(&[&chain_id.to_string()])
        .inc();
}

pub fn record_tss_migration(chain_id: i64) {
    TSS_MIGRATIONS
        .with_label_values(&[&chain_id.to_string()])
        .inc();
}

pub fn record_gas_price_vote(chain_id: i64) {
    GAS_PRICE_VOTES
        .with_label_values(&[&chain_id.to_string()])
        .inc();
}
