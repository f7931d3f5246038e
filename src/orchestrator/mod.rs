//! Transaction lifecycle orchestration
//!
//! Drives one bridge submission at a time through validation, chain
//! verification, spending authorization, submission and confirmation
//! tracking. Every observation folds into the lifecycle state through the
//! pure reducer in [`state`]; this module owns the side effects around it:
//! wallet calls, session persistence and observer notification.

pub mod classify;
pub mod state;

use alloy::primitives::{Address, B256};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::address::parse_account_address;
use crate::amount::to_fixed_point;
use crate::chain_guard::ChainGuard;
use crate::config::BridgeConfig;
use crate::contracts;
use crate::error::{BridgeError, ErrorKind, ProviderError};
use crate::merkle;
use crate::store::{SessionRecord, SessionStore};
use crate::types::{AssetKind, BridgeRequest, RelayPayload, TxReceipt};
use crate::validate::validate;
use crate::wallet::{hex_bytes, hex_uint, CallRequest, TxEvent, TxEventStream, WalletGateway};

use classify::ProviderErrorClass;
pub use state::{LifecycleEvent, LifecycleState, Phase, RunError};

/// Single-run bridge orchestrator.
///
/// Owns the lifecycle state for one submission at a time. Run entry points
/// take `&mut self`, so overlapping runs cannot be expressed on one
/// orchestrator; a logical reentry after a still-pending run is rejected
/// with [`BridgeError::RunInProgress`].
pub struct Orchestrator<S: SessionStore> {
    config: BridgeConfig,
    gateway: WalletGateway,
    chain_guard: ChainGuard,
    store: S,
    state: LifecycleState,
    /// Request bound to the current or last persisted run.
    active_request: Option<BridgeRequest>,
    observers: Vec<mpsc::UnboundedSender<LifecycleState>>,
    /// Last chain id reported by the wallet's change notification.
    observed_chain_id: Option<u64>,
}

impl<S: SessionStore> Orchestrator<S> {
    pub fn new(config: BridgeConfig, gateway: WalletGateway, store: S) -> Self {
        let chain_guard = ChainGuard::new(&config);
        Self {
            config,
            gateway,
            chain_guard,
            store,
            state: LifecycleState::default(),
            active_request: None,
            observers: Vec::new(),
            observed_chain_id: None,
        }
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    /// Snapshot stream of every state change. Dropped receivers are pruned
    /// on the next dispatch.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<LifecycleState> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.observers.push(sender);
        receiver
    }

    /// Saved record of an interrupted run, if any. The UI feeds this back
    /// through [`Self::resume`] after a reload.
    pub fn saved_session(&self) -> Result<Option<SessionRecord>, BridgeError> {
        self.store.load()
    }

    /// Last chain id the wallet reported through [`Self::on_chain_changed`].
    pub fn observed_chain_id(&self) -> Option<u64> {
        self.observed_chain_id
    }

    /// Drive a burn/lock submission end to end.
    ///
    /// Returns once the transaction is confirmed, has failed, or the
    /// provider reports it may still be mined; in the pending case the
    /// phase stays `Submitted`, and a fresh orchestrator (or this one after
    /// [`Self::mark_timed_out`]) can pick the run up again through
    /// [`Self::resume`].
    pub async fn run_burn(
        &mut self,
        request: BridgeRequest,
    ) -> Result<LifecycleState, BridgeError> {
        self.ensure_accepts_new_run()?;
        self.active_request = Some(request.clone());
        self.dispatch(LifecycleEvent::SubmitRequested);

        let account = self.check_preconditions(&request).await?;
        info!(
            direction = %request.direction,
            asset_kind = %request.asset_kind,
            account = %account,
            "burn run started"
        );

        self.dispatch(LifecycleEvent::ChainRequested);
        if let Err(error) = self.ensure_chain().await {
            return Err(self.fail_run(error));
        }

        let approval_required = match self.approval_needed(&request, account).await {
            Ok(required) => required,
            Err(error) => return Err(self.fail_run(error)),
        };
        self.dispatch(LifecycleEvent::ChainConfirmed { approval_required });

        if approval_required {
            if let Err(error) = self.run_approval(&request, account).await {
                return Err(self.fail_run(error));
            }
            self.dispatch(LifecycleEvent::TransferDispatched);
        }

        let call = match self.burn_call(&request, account) {
            Ok(call) => call,
            Err(error) => return Err(self.fail_run(error)),
        };
        self.submit_and_track(call).await
    }

    /// Drive a relay submission: look up the recorded destination block,
    /// rebuild the transaction's merkle proof and submit `relayTx`.
    pub async fn run_relay(
        &mut self,
        request: BridgeRequest,
        payload: RelayPayload,
    ) -> Result<LifecycleState, BridgeError> {
        self.ensure_accepts_new_run()?;
        self.active_request = Some(request.clone());
        self.dispatch(LifecycleEvent::SubmitRequested);

        let account = self.check_preconditions(&request).await?;
        info!(
            direction = %request.direction,
            block_hash = %payload.block_hash,
            tx_index = payload.tx_index,
            "relay run started"
        );

        self.dispatch(LifecycleEvent::ChainRequested);
        if let Err(error) = self.ensure_chain().await {
            return Err(self.fail_run(error));
        }

        let block = match self.gateway.block_by_hash(payload.block_hash).await {
            Ok(Some(block)) => block,
            Ok(None) => {
                let error = BridgeError::BlockNotFound(payload.block_hash.to_string());
                return Err(self.fail_run(error));
            }
            Err(error) => return Err(self.fail_run(error)),
        };
        let proof = match merkle::build_proof(&payload.siblings, payload.tx_index) {
            Ok(proof) => proof,
            Err(error) => return Err(self.fail_run(error)),
        };
        self.dispatch(LifecycleEvent::ChainConfirmed {
            approval_required: false,
        });

        let data = contracts::relay_tx_data(
            block.number,
            &payload.tx_bytes,
            payload.tx_index,
            &proof.siblings,
            &payload.block_header,
        );
        let call = CallRequest {
            from: Some(account),
            to: self.config.relay_contract,
            data: Some(hex_bytes(&data)),
            ..Default::default()
        };
        self.submit_and_track(call).await
    }

    /// Re-attach to a submitted transaction after a reload and track it to
    /// its terminal phase.
    pub async fn resume(
        &mut self,
        request: BridgeRequest,
    ) -> Result<LifecycleState, BridgeError> {
        let Some(tx_hash) = request.resume_tx_hash else {
            return Err(BridgeError::Validation(
                "resume requires a transaction hash".to_string(),
            ));
        };
        self.ensure_accepts_new_run()?;
        self.active_request = Some(request);
        self.dispatch(LifecycleEvent::ResumeRequested { tx_hash });
        info!(tx_hash = %tx_hash, "resuming submitted transaction");

        let events = match self.gateway.watch(tx_hash).await {
            Ok(events) => events,
            Err(error) => return Err(self.fail_run(error)),
        };
        self.track_transfer(events).await
    }

    /// Clear a finished run after the user has seen the outcome.
    pub fn acknowledge(&mut self) {
        if !self.state.phase.is_terminal() {
            return;
        }
        if let Err(error) = self.store.clear() {
            warn!(error = %error, "session record not cleared");
        }
        self.active_request = None;
        self.dispatch(LifecycleEvent::Acknowledged);
    }

    /// Caller-driven deadline for a stuck authorization or submission.
    pub fn mark_timed_out(&mut self) {
        self.dispatch(LifecycleEvent::DeadlineElapsed);
        if self.state.phase == Phase::TimedOut {
            warn!(tx_hash = ?self.state.tx_hash, "run timed out");
        }
    }

    /// Record a wallet network change. In-flight tracking continues; the
    /// next submission re-checks the chain before sending anything.
    pub fn on_chain_changed(&mut self, chain_id: u64) {
        self.observed_chain_id = Some(chain_id);
        if chain_id != self.config.chain_id {
            warn!(
                chain_id,
                expected = self.config.chain_id,
                "wallet moved to another chain"
            );
        }
    }

    fn ensure_accepts_new_run(&self) -> Result<(), BridgeError> {
        if self.state.phase.accepts_new_run() {
            Ok(())
        } else {
            Err(BridgeError::RunInProgress)
        }
    }

    /// Validate the request against a fresh wallet snapshot. A failure
    /// resets the lifecycle; the run never started.
    async fn check_preconditions(
        &mut self,
        request: &BridgeRequest,
    ) -> Result<Address, BridgeError> {
        let context = self.gateway.context().await;
        let report = validate(request, &context, &self.config);
        if !report.is_valid() {
            info!(message = %report.submit.message, "request rejected by validation");
            self.reset_to_idle();
            return Err(BridgeError::Validation(report.submit.message));
        }
        match context.active_account() {
            Some(account) => Ok(account),
            None => {
                self.reset_to_idle();
                Err(BridgeError::AccountUnavailable)
            }
        }
    }

    async fn ensure_chain(&self) -> Result<(), BridgeError> {
        let provider = self.gateway.provider()?.clone();
        self.chain_guard.ensure(provider.as_ref()).await
    }

    /// Whether the manager contract still needs spending authorization for
    /// this request.
    async fn approval_needed(
        &self,
        request: &BridgeRequest,
        account: Address,
    ) -> Result<bool, BridgeError> {
        match request.asset_kind {
            AssetKind::Native => Ok(false),
            AssetKind::Fungible => {
                let token = self.token_contract(request)?;
                let amount =
                    to_fixed_point(request.effective_amount(), self.config.token_decimals)?;
                let allowance = self
                    .gateway
                    .read_allowance(token, account, self.config.erc20_manager)
                    .await?;
                let required = &allowance < amount.as_bigint();
                debug!(token = %token, allowance = %allowance, required, "allowance checked");
                Ok(required)
            }
            AssetKind::NonFungibleUnique | AssetKind::NonFungibleMulti => {
                let token = self.token_contract(request)?;
                let approved = self
                    .gateway
                    .read_approval_for_all(token, account, self.config.erc20_manager)
                    .await?;
                debug!(token = %token, approved, "approval-for-all checked");
                Ok(!approved)
            }
        }
    }

    /// Submit the authorization transaction and wait for its first
    /// confirmation. The transfer is never dispatched on a failed
    /// authorization.
    async fn run_approval(
        &mut self,
        request: &BridgeRequest,
        account: Address,
    ) -> Result<(), BridgeError> {
        let token = self.token_contract(request)?;
        let data = match request.asset_kind {
            AssetKind::Fungible => {
                let amount =
                    to_fixed_point(request.effective_amount(), self.config.token_decimals)?;
                contracts::approve_data(self.config.erc20_manager, &amount)?
            }
            _ => contracts::set_approval_for_all_data(self.config.erc20_manager, true),
        };
        let call = CallRequest {
            from: Some(account),
            to: token,
            data: Some(hex_bytes(&data)),
            ..Default::default()
        };

        let mut events = self
            .gateway
            .send_with_estimated_gas(call)
            .await
            .map_err(approval_send_error)?;

        let mut approval_hash = None;
        while let Some(event) = events.recv().await {
            match event {
                TxEvent::Hash(hash) => {
                    info!(tx_hash = %hash, "authorization submitted");
                    approval_hash = Some(hash);
                    self.dispatch(LifecycleEvent::ApprovalHashReceived);
                }
                TxEvent::Confirmation { .. } => {
                    info!("authorization confirmed");
                    self.dispatch(LifecycleEvent::ApprovalReceiptReceived);
                    return Ok(());
                }
                TxEvent::Error { message, .. } => {
                    return Err(approval_stream_error(message, approval_hash));
                }
            }
        }
        Err(BridgeError::GenericRemote {
            message: "authorization event stream ended without a confirmation".to_string(),
            payload: None,
        })
    }

    /// Build the `freezeBurn` call. Native burns move value by attaching it
    /// to the call; token burns reference the asset contract.
    fn burn_call(
        &self,
        request: &BridgeRequest,
        account: Address,
    ) -> Result<CallRequest, BridgeError> {
        let amount = to_fixed_point(request.effective_amount(), self.config.token_decimals)?;
        let asset_contract = match request.asset_kind {
            AssetKind::Native => Address::ZERO,
            _ => self.token_contract(request)?,
        };
        let token_id = match request.token_id.as_deref() {
            Some(id) if request.asset_kind.is_nft() => id,
            _ => "0",
        };
        let data = contracts::freeze_burn_data(
            &amount,
            asset_contract,
            token_id,
            &request.destination_address,
        )?;
        let value = match request.asset_kind {
            AssetKind::Native => Some(hex_uint(amount.as_bigint())),
            _ => None,
        };
        Ok(CallRequest {
            from: Some(account),
            to: self.config.erc20_manager,
            value,
            data: Some(hex_bytes(&data)),
            ..Default::default()
        })
    }

    fn token_contract(&self, request: &BridgeRequest) -> Result<Address, BridgeError> {
        let contract = request.source_contract.as_deref().ok_or_else(|| {
            BridgeError::Validation("token contract address is required".to_string())
        })?;
        parse_account_address(contract)
    }

    async fn submit_and_track(
        &mut self,
        call: CallRequest,
    ) -> Result<LifecycleState, BridgeError> {
        let events = match self.gateway.send_with_estimated_gas(call).await {
            Ok(events) => events,
            Err(error) => {
                let error = submission_send_error(error);
                return Err(self.fail_run(error));
            }
        };
        self.track_transfer(events).await
    }

    /// Fold transaction events into the lifecycle until the stream closes
    /// or reports an error.
    async fn track_transfer(
        &mut self,
        mut events: TxEventStream,
    ) -> Result<LifecycleState, BridgeError> {
        while let Some(event) = events.recv().await {
            match event {
                TxEvent::Hash(hash) => {
                    if self.state.tx_hash.is_none() {
                        info!(tx_hash = %hash, "transaction submitted");
                    }
                    self.dispatch(LifecycleEvent::SubmissionHashReceived(hash));
                }
                TxEvent::Confirmation { number, receipt } => {
                    if let Some(tracked) = self.state.tx_hash {
                        if receipt.transaction_hash != tracked {
                            warn!(
                                tracked = %tracked,
                                received = %receipt.transaction_hash,
                                "confirmation for a different transaction ignored"
                            );
                            continue;
                        }
                    }
                    if self.state.phase == Phase::Submitted {
                        info!(
                            tx_hash = %receipt.transaction_hash,
                            confirmations = number,
                            "transaction confirmed"
                        );
                    }
                    self.dispatch(LifecycleEvent::ConfirmationReceived { number, receipt });
                }
                TxEvent::Error { message, receipt } => {
                    return self.handle_transfer_error(message, receipt);
                }
            }
        }
        Ok(self.state.clone())
    }

    /// Classify a transfer failure. "Might still be mined" after the hash
    /// keeps the run alive; everything else is terminal.
    fn handle_transfer_error(
        &mut self,
        message: String,
        receipt: Option<TxReceipt>,
    ) -> Result<LifecycleState, BridgeError> {
        let payload = classify::extract_json_payload(&message);
        let display = classify::display_message(&message, payload.as_ref());

        match classify::classify_message(&display) {
            ProviderErrorClass::StillPending if self.state.phase == Phase::Submitted => {
                let tx_hash = self.state.tx_hash;
                self.dispatch(LifecycleEvent::ErrorReceived {
                    kind: ErrorKind::StillPending,
                    message: display,
                    receipt,
                    payload,
                });
                if let Some(hash) = tx_hash {
                    info!(
                        url = %self.config.tx_url(&hash),
                        "transaction not yet mined, track it on the explorer"
                    );
                }
                Ok(self.state.clone())
            }
            class => {
                let bridge_error = match class {
                    ProviderErrorClass::UserRejected => BridgeError::SubmissionRejected(display),
                    _ => BridgeError::GenericRemote {
                        message: display,
                        payload: payload.clone(),
                    },
                };
                error!(kind = bridge_error.kind().as_str(), error = %bridge_error, "transaction failed");
                self.dispatch(LifecycleEvent::ErrorReceived {
                    kind: bridge_error.kind(),
                    message: run_message(&bridge_error),
                    receipt,
                    payload,
                });
                Err(bridge_error)
            }
        }
    }

    /// Record a terminal failure on the state and hand the error back.
    fn fail_run(&mut self, error: BridgeError) -> BridgeError {
        let kind = error.kind();
        let payload = match &error {
            BridgeError::GenericRemote { payload, .. } => payload.clone(),
            _ => None,
        };
        error!(kind = kind.as_str(), error = %error, "run failed");
        self.dispatch(LifecycleEvent::ErrorReceived {
            kind,
            message: run_message(&error),
            receipt: None,
            payload,
        });
        error
    }

    /// Fold one event into the state, persist phase advances and notify
    /// observers.
    fn dispatch(&mut self, event: LifecycleEvent) {
        let next = self.state.apply(event);
        if next == self.state {
            return;
        }
        let phase_changed = next.phase != self.state.phase;
        if phase_changed {
            debug!(from = %self.state.phase, to = %next.phase, "phase transition");
        }
        self.state = next;
        if phase_changed {
            self.persist();
        }
        self.observers
            .retain(|observer| observer.send(self.state.clone()).is_ok());
    }

    /// Write a session record once the run has a transaction hash. Storage
    /// failures never interrupt a run.
    fn persist(&self) {
        let Some(tx_hash) = self.state.tx_hash else {
            return;
        };
        let Some(request) = &self.active_request else {
            return;
        };
        let record = SessionRecord::new(request.clone(), tx_hash, self.state.phase);
        if let Err(error) = self.store.save(&record) {
            warn!(error = %error, "session record not saved");
        }
    }

    fn reset_to_idle(&mut self) {
        self.state = LifecycleState::default();
        self.active_request = None;
        self.observers
            .retain(|observer| observer.send(self.state.clone()).is_ok());
    }
}

/// The user-facing text recorded on the state; wallet-supplied messages are
/// kept verbatim.
fn run_message(error: &BridgeError) -> String {
    match error {
        BridgeError::Chain(message)
        | BridgeError::ApprovalRejected(message)
        | BridgeError::SubmissionRejected(message)
        | BridgeError::Validation(message)
        | BridgeError::GenericRemote { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

/// Remote failure text run through the JSON extraction wallet messages
/// sometimes need.
fn remote_error(message: String) -> BridgeError {
    let payload = classify::extract_json_payload(&message);
    let message = classify::display_message(&message, payload.as_ref());
    BridgeError::GenericRemote { message, payload }
}

/// Errors raised while sending the authorization, before any event stream
/// exists. A wallet-level rejection surfaces as `ApprovalRejected`.
fn approval_send_error(error: BridgeError) -> BridgeError {
    match error {
        BridgeError::Provider(ProviderError::Rejected { code, message }) => {
            match classify::classify_rejection(code, &message) {
                ProviderErrorClass::UserRejected => BridgeError::ApprovalRejected(message),
                _ => remote_error(message),
            }
        }
        other => other,
    }
}

/// Same mapping for the transfer submission itself.
fn submission_send_error(error: BridgeError) -> BridgeError {
    match error {
        BridgeError::Provider(ProviderError::Rejected { code, message }) => {
            match classify::classify_rejection(code, &message) {
                ProviderErrorClass::UserRejected => BridgeError::SubmissionRejected(message),
                _ => remote_error(message),
            }
        }
        other => other,
    }
}

/// Authorization stream failures are terminal; the classified kind decides
/// which error the run returns.
fn approval_stream_error(message: String, tx_hash: Option<B256>) -> BridgeError {
    let payload = classify::extract_json_payload(&message);
    let display = classify::display_message(&message, payload.as_ref());
    match classify::classify_message(&display) {
        ProviderErrorClass::UserRejected => BridgeError::ApprovalRejected(display),
        ProviderErrorClass::StillPending => BridgeError::StillPending {
            tx_hash: tx_hash.map(|hash| hash.to_string()).unwrap_or_default(),
        },
        ProviderErrorClass::Remote => BridgeError::GenericRemote {
            message: display,
            payload,
        },
    }
}
