//! Error types for the bridge orchestration core
//!
//! `BridgeError` is the taxonomy surfaced to callers; `ProviderError` covers
//! the wallet/transport boundary and folds into it. `ErrorKind` is the
//! data-only tag recorded on a lifecycle state so a run's last error can be
//! persisted and displayed without carrying the full error value around.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced at the wallet-provider boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("no wallet provider available")]
    Unavailable,

    #[error("requested chain is not registered with the wallet")]
    ChainNotRegistered,

    #[error("provider rejected the request ({code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

#[derive(Error, Debug)]
pub enum BridgeError {
    // ========================================================================
    // Synchronous codec and builder errors
    // ========================================================================

    #[error("invalid amount format: {0}")]
    InvalidAmountFormat(String),

    #[error("leaf index {index} out of range for {leaves} leaves")]
    IndexOutOfRange { index: u64, leaves: usize },

    // ========================================================================
    // Wallet and network errors
    // ========================================================================

    #[error("chain switch failed: {0}")]
    Chain(String),

    #[error("block {0} not found on the connected chain")]
    BlockNotFound(String),

    #[error("no wallet provider available")]
    ProviderUnavailable,

    #[error("no account connected")]
    AccountUnavailable,

    // ========================================================================
    // Run outcomes
    // ========================================================================

    #[error("approval rejected: {0}")]
    ApprovalRejected(String),

    #[error("submission rejected: {0}")]
    SubmissionRejected(String),

    #[error("transaction {tx_hash} still pending, it may yet be mined")]
    StillPending { tx_hash: String },

    #[error("remote error: {message}")]
    GenericRemote {
        message: String,
        /// Structured payload extracted from the raw message, when one was
        /// embedded as an inline JSON fragment.
        payload: Option<serde_json::Value>,
    },

    // ========================================================================
    // Orchestration preconditions
    // ========================================================================

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("a bridge run is already in progress")]
    RunInProgress,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Data-only tag mirroring [`BridgeError`], recorded on lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidAmountFormat,
    IndexOutOfRange,
    Chain,
    BlockNotFound,
    ProviderUnavailable,
    AccountUnavailable,
    ApprovalRejected,
    SubmissionRejected,
    StillPending,
    GenericRemote,
    Validation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidAmountFormat => "invalid_amount_format",
            ErrorKind::IndexOutOfRange => "index_out_of_range",
            ErrorKind::Chain => "chain_error",
            ErrorKind::BlockNotFound => "block_not_found",
            ErrorKind::ProviderUnavailable => "provider_unavailable",
            ErrorKind::AccountUnavailable => "account_unavailable",
            ErrorKind::ApprovalRejected => "approval_rejected",
            ErrorKind::SubmissionRejected => "submission_rejected",
            ErrorKind::StillPending => "still_pending",
            ErrorKind::GenericRemote => "generic_remote_error",
            ErrorKind::Validation => "validation_failed",
        }
    }

    /// Recoverable errors leave a submitted run in place instead of failing it.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ErrorKind::StillPending)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl BridgeError {
    /// The taxonomy tag for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::InvalidAmountFormat(_) => ErrorKind::InvalidAmountFormat,
            BridgeError::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            BridgeError::Chain(_) => ErrorKind::Chain,
            BridgeError::BlockNotFound(_) => ErrorKind::BlockNotFound,
            BridgeError::ProviderUnavailable => ErrorKind::ProviderUnavailable,
            BridgeError::AccountUnavailable => ErrorKind::AccountUnavailable,
            BridgeError::ApprovalRejected(_) => ErrorKind::ApprovalRejected,
            BridgeError::SubmissionRejected(_) => ErrorKind::SubmissionRejected,
            BridgeError::StillPending { .. } => ErrorKind::StillPending,
            BridgeError::GenericRemote { .. } => ErrorKind::GenericRemote,
            BridgeError::Validation(_) => ErrorKind::Validation,
            BridgeError::Provider(ProviderError::Unavailable) => ErrorKind::ProviderUnavailable,
            BridgeError::Provider(_) => ErrorKind::GenericRemote,
            BridgeError::RunInProgress => ErrorKind::Validation,
        }
    }
}
