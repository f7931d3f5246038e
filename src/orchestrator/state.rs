//! Lifecycle state machine
//!
//! One value type, one pure transition function. The orchestrator feeds
//! every observation through [`LifecycleState::apply`]; event/phase pairs
//! that make no sense leave the state untouched, so the reducer is total
//! and replayable.

use std::fmt;

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::types::TxReceipt;

/// Where a run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Validating,
    AwaitingChain,
    AwaitingApproval,
    ApprovalSubmitted,
    ApprovalConfirmed,
    Submitting,
    Submitted,
    Confirmed,
    Failed,
    TimedOut,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Validating => "validating",
            Phase::AwaitingChain => "awaiting_chain",
            Phase::AwaitingApproval => "awaiting_approval",
            Phase::ApprovalSubmitted => "approval_submitted",
            Phase::ApprovalConfirmed => "approval_confirmed",
            Phase::Submitting => "submitting",
            Phase::Submitted => "submitted",
            Phase::Confirmed => "confirmed",
            Phase::Failed => "failed",
            Phase::TimedOut => "timed_out",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Confirmed | Phase::Failed | Phase::TimedOut)
    }

    /// Phases a fresh run may start from.
    pub fn accepts_new_run(&self) -> bool {
        matches!(self, Phase::Idle) || self.is_terminal()
    }

    /// Phases from which a caller-driven deadline may fire.
    pub fn is_deadline_armed(&self) -> bool {
        matches!(self, Phase::ApprovalSubmitted | Phase::Submitted)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error recorded on the lifecycle state. `tx_hash` is filled from the
/// state at the moment the error arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<B256>,
    /// Structured payload recovered from a JSON-bearing provider message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

/// Everything the orchestrator can observe.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    SubmitRequested,
    ChainRequested,
    ChainConfirmed { approval_required: bool },
    ApprovalHashReceived,
    ApprovalReceiptReceived,
    TransferDispatched,
    SubmissionHashReceived(B256),
    ConfirmationReceived { number: u32, receipt: TxReceipt },
    ErrorReceived {
        kind: ErrorKind,
        message: String,
        receipt: Option<TxReceipt>,
        payload: Option<serde_json::Value>,
    },
    DeadlineElapsed,
    ResumeRequested { tx_hash: B256 },
    Acknowledged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleState {
    pub phase: Phase,
    pub tx_hash: Option<B256>,
    /// Monotonic confirmation depth of the tracked transaction.
    pub confirmations: u32,
    /// Set exactly once, on the first confirmation (or a failing receipt).
    pub receipt: Option<TxReceipt>,
    pub error: Option<RunError>,
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            tx_hash: None,
            confirmations: 0,
            receipt: None,
            error: None,
        }
    }
}

impl LifecycleState {
    /// Pure transition function.
    #[must_use]
    pub fn apply(&self, event: LifecycleEvent) -> LifecycleState {
        let mut next = self.clone();
        match event {
            LifecycleEvent::SubmitRequested => {
                if self.phase.accepts_new_run() {
                    next = LifecycleState::default();
                    next.phase = Phase::Validating;
                }
            }
            LifecycleEvent::ChainRequested => {
                if self.phase == Phase::Validating {
                    next.phase = Phase::AwaitingChain;
                }
            }
            LifecycleEvent::ChainConfirmed { approval_required } => {
                if self.phase == Phase::AwaitingChain {
                    next.phase = if approval_required {
                        Phase::AwaitingApproval
                    } else {
                        Phase::Submitting
                    };
                }
            }
            LifecycleEvent::ApprovalHashReceived => {
                if self.phase == Phase::AwaitingApproval {
                    next.phase = Phase::ApprovalSubmitted;
                }
            }
            LifecycleEvent::ApprovalReceiptReceived => {
                if self.phase == Phase::ApprovalSubmitted {
                    next.phase = Phase::ApprovalConfirmed;
                }
            }
            LifecycleEvent::TransferDispatched => {
                if self.phase == Phase::ApprovalConfirmed {
                    next.phase = Phase::Submitting;
                }
            }
            LifecycleEvent::SubmissionHashReceived(hash) => {
                if self.phase == Phase::Submitting {
                    next.phase = Phase::Submitted;
                    next.tx_hash = Some(hash);
                }
            }
            LifecycleEvent::ConfirmationReceived { number, receipt } => match self.phase {
                Phase::Submitted => {
                    next.phase = Phase::Confirmed;
                    next.confirmations = number;
                    if next.receipt.is_none() {
                        next.receipt = Some(receipt);
                    }
                    // A pending marker is obsolete once the chain answers.
                    next.error = None;
                }
                Phase::Confirmed => {
                    next.confirmations = next.confirmations.max(number);
                    if next.receipt.is_none() {
                        next.receipt = Some(receipt);
                    }
                }
                _ => {}
            },
            LifecycleEvent::ErrorReceived {
                kind,
                message,
                receipt,
                payload,
            } => {
                if !self.phase.is_terminal() && self.phase != Phase::Idle {
                    if !(kind.is_recoverable() && self.phase == Phase::Submitted) {
                        next.phase = Phase::Failed;
                        if next.receipt.is_none() {
                            next.receipt = receipt;
                        }
                    }
                    next.error = Some(RunError {
                        kind,
                        message,
                        tx_hash: self.tx_hash,
                        payload,
                    });
                }
            }
            LifecycleEvent::DeadlineElapsed => {
                if self.phase.is_deadline_armed() {
                    next.phase = Phase::TimedOut;
                }
            }
            LifecycleEvent::ResumeRequested { tx_hash } => {
                if self.phase.accepts_new_run() {
                    next = LifecycleState::default();
                    next.phase = Phase::Submitted;
                    next.tx_hash = Some(tx_hash);
                }
            }
            LifecycleEvent::Acknowledged => {
                if self.phase.is_terminal() {
                    next = LifecycleState::default();
                }
            }
        }
        next
    }
}
