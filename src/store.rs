//! Session persistence
//!
//! A run whose transaction reached the chain is recorded so a restart can
//! resume tracking it by hash. Records are written on every phase advance
//! once the hash is known and cleared only by an explicit acknowledgement.

use std::sync::Mutex;

use alloy::primitives::B256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::orchestrator::Phase;
use crate::types::BridgeRequest;

/// Snapshot of a run whose transaction reached the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub request: BridgeRequest,
    pub tx_hash: B256,
    pub phase: Phase,
    pub saved_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(request: BridgeRequest, tx_hash: B256, phase: Phase) -> Self {
        Self {
            request,
            tx_hash,
            phase,
            saved_at: Utc::now(),
        }
    }
}

/// Where session records live. Implementations must tolerate concurrent
/// readers; the orchestrator writes from a single task.
pub trait SessionStore: Send + Sync {
    fn save(&self, record: &SessionRecord) -> Result<(), BridgeError>;
    fn load(&self) -> Result<Option<SessionRecord>, BridgeError>;
    fn clear(&self) -> Result<(), BridgeError>;
}

/// In-memory store, the default for embedding and tests.
#[derive(Default)]
pub struct MemoryStore {
    record: Mutex<Option<SessionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<SessionRecord>> {
        // A poisoned lock still holds a usable record.
        self.record.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionStore for MemoryStore {
    fn save(&self, record: &SessionRecord) -> Result<(), BridgeError> {
        *self.slot() = Some(record.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<SessionRecord>, BridgeError> {
        Ok(self.slot().clone())
    }

    fn clear(&self) -> Result<(), BridgeError> {
        *self.slot() = None;
        Ok(())
    }
}
