//! Error types for the CCTX orchestration core

use thiserror::Error;

/// Main error type for cross-chain transaction processing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrosschainError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("chain {chain_id} is not supported")]
    UnsupportedChain { chain_id: i64 },

    #[error("chain params not found for chain {chain_id}")]
    ChainParamsNotFound { chain_id: i64 },

    #[error("tss not found")]
    TssNotFound,

    #[error("cannot find cctx {0}")]
    CctxNotFound(String),

    #[error("invalid cctx: {0}")]
    InvalidCctx(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("cctx already finalized: {0}")]
    CctxAlreadyFinalized(String),

    #[error("inbound already finalized: {0}")]
    ObservedTxAlreadyFinalized(String),

    #[error("unable to send coin type: {0}")]
    UnableToSendCoinType(String),

    #[error("invalid coin type: {0}")]
    InvalidCoinType(String),

    #[error("foreign coin not found: {0}")]
    ForeignCoinNotFound(String),

    #[error("unable to get gas price for chain {chain_id}")]
    UnableToGetGasPrice { chain_id: i64 },

    #[error("not enough gas: {0}")]
    NotEnoughGas(String),

    #[error("not enough zeta burnt: {0}")]
    NotEnoughZetaBurnt(String),

    #[error("no liquidity pool: {0}")]
    NoLiquidityPool(String),

    #[error("swap failed: {0}")]
    Swap(String),

    #[error("gas priority fee {priority_fee} exceeds gas price {gas_price}")]
    InvalidGasPriority {
        gas_price: String,
        priority_fee: String,
    },

    #[error("cannot find receiver nonce for chain {chain_id}")]
    CannotFindReceiverNonce { chain_id: i64 },

    #[error("cannot find pending nonces for chain {chain_id}")]
    CannotFindPendingNonces { chain_id: i64 },

    #[error("nonce mismatch for chain {chain_id}: pending nonce high {nonce_high}, chain nonce {chain_nonce}")]
    NonceMismatch {
        chain_id: i64,
        nonce_high: u64,
        chain_nonce: u64,
    },

    #[error("invalid revert: {0}")]
    InvalidRevert(String),

    #[error("contract call reverted: {0}")]
    ContractReverted(String),

    #[error("cannot migrate tss funds: {0}")]
    CannotMigrateTssFunds(String),

    #[error("insufficient funds for tss migration: {0}")]
    InsufficientFundsTssMigration(String),

    #[error("unable to update tss: {0}")]
    UnableToUpdateTss(String),

    #[error("proof verification failed: {0}")]
    ProofVerificationFailed(String),

    #[error("tx body verification failed: {0}")]
    TxBodyVerificationFailed(String),

    #[error("max outbound tracker hashes reached for chain {chain_id} nonce {nonce}")]
    MaxTrackerHashesReached { chain_id: i64, nonce: u64 },

    #[error("not authorized: {0}")]
    NotAuthorized(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("zeta accounting not found")]
    ZetaAccountingNotFound,

    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<CrosschainError>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CrosschainError {
    /// Prefix the error with the operation that produced it
    pub fn context(self, context: impl Into<String>) -> Self {
        CrosschainError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with every context layer stripped
    pub fn root(&self) -> &CrosschainError {
        match self {
            CrosschainError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if the error aborts the current attempt without any retry path
    pub fn is_fatal_to_attempt(&self) -> bool {
        matches!(
            self.root(),
            CrosschainError::UnsupportedChain { .. }
                | CrosschainError::TssNotFound
                | CrosschainError::CannotFindReceiverNonce { .. }
                | CrosschainError::CannotFindPendingNonces { .. }
                | CrosschainError::NonceMismatch { .. }
                | CrosschainError::NoLiquidityPool(_)
                | CrosschainError::InvalidRevert(_)
        )
    }

    /// Check if the error should send the cctx down the revert path
    pub fn is_revertible(&self) -> bool {
        matches!(self.root(), CrosschainError::ContractReverted(_))
    }

    /// Check if the error is caused by missing chain configuration
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.root(),
            CrosschainError::Config(_)
                | CrosschainError::UnableToGetGasPrice { .. }
                | CrosschainError::ChainParamsNotFound { .. }
                | CrosschainError::ForeignCoinNotFound(_)
        )
    }
}

impl From<serde_json::Error> for CrosschainError {
    fn from(err: serde_json::Error) -> Self {
        CrosschainError::Serialization(err.to_string())
    }
}

/// Result type for cross-chain operations
pub type CrosschainResult<T> = Result<T, CrosschainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_keeps_classification() {
        let err = CrosschainError::NonceMismatch {
            chain_id: 1,
            nonce_high: 4,
            chain_nonce: 5,
        }
        .context("UpdateNonce");

        assert!(err.is_fatal_to_attempt());
        assert!(!err.is_revertible());
        assert!(err.to_string().starts_with("UpdateNonce: nonce mismatch"));
    }

    #[test]
    fn test_classification() {
        assert!(CrosschainError::ContractReverted("boom".into()).is_revertible());
        assert!(CrosschainError::UnableToGetGasPrice { chain_id: 5 }.is_configuration());
        assert!(!CrosschainError::NotEnoughGas("x".into()).is_fatal_to_attempt());
    }
}
