use std::collections::{BTreeMap, HashSet};
use std::ops::Range;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrona_cipher::{CipherGateway, ClearValue, DecryptionProof, DecryptionTicket};
use chrona_crypto::HashChainVerifier;
use chrona_events::{EventBus, EventFilter, EventPayload, EventStream, VaultEvent};
use chrona_gate::{
    determine_role, is_administrator, AccessGate, Denial, DisclosureAction, GateRequest,
};
use chrona_index::OwnerIndex;
use chrona_store::{
    DecryptionStatus, DisclosureState, Phase, Record, RecordMeta, RecordTable, VaultStats,
};
use chrona_types::{
    CiphertextHandle, Clock, CorrelationId, Identity, InputProof, RecordId, ScopeId, Timestamp,
};
use tracing::{debug, info, warn};

use crate::config::VaultConfig;
use crate::error::{VaultError, VaultResult};
use crate::journal::{JournalBody, JournalEntry};
use crate::snapshot::VaultSnapshot;
use crate::transaction::{Operation, OperationOutput, TransactionReceipt};

/// Everything the vault persists, guarded by one lock.
struct VaultState {
    administrator: Identity,
    records: RecordTable,
    owners: OwnerIndex,
    /// Every handle referenced by a stored record. A handle binds to one record.
    bound: HashSet<CiphertextHandle>,
    pending: BTreeMap<CorrelationId, RecordId>,
    transactions: u64,
    journal: Vec<JournalEntry>,
}

/// Result of applying an operation to the state, before events go out.
struct Applied {
    output: OperationOutput,
    events: Vec<EventPayload>,
}

/// A time-gated, access-controlled record vault.
///
/// All mutations go through [`submit_transaction`](Self::submit_transaction)
/// and run under a single write lock from validation to commit, so every
/// operation either fully applies or leaves the vault untouched. Events are
/// published after commit, before the lock is released, so their bus
/// sequence numbers follow journal order.
pub struct Vault {
    config: VaultConfig,
    clock: Arc<dyn Clock>,
    gateway: Arc<dyn CipherGateway>,
    gate: AccessGate,
    events: Arc<EventBus>,
    state: RwLock<VaultState>,
}

impl Vault {
    /// Create an empty vault administered by `administrator`.
    pub fn new(
        administrator: Identity,
        config: VaultConfig,
        clock: Arc<dyn Clock>,
        gateway: Arc<dyn CipherGateway>,
    ) -> VaultResult<Self> {
        if administrator.is_null() {
            return Err(VaultError::ZeroIdentity);
        }
        info!(administrator = %administrator, scope = %config.scope, "vault created");
        Ok(Self::assemble(
            config,
            clock,
            gateway,
            VaultState {
                administrator,
                records: RecordTable::new(),
                owners: OwnerIndex::new(),
                bound: HashSet::new(),
                pending: BTreeMap::new(),
                transactions: 0,
                journal: Vec::new(),
            },
        ))
    }

    /// Restore a vault from a snapshot after checking its invariants.
    pub fn from_snapshot(
        snapshot: VaultSnapshot,
        config: VaultConfig,
        clock: Arc<dyn Clock>,
        gateway: Arc<dyn CipherGateway>,
    ) -> VaultResult<Self> {
        snapshot.validate()?;
        let bound = snapshot.bound_handles();
        info!(
            records = snapshot.records.total_count(),
            pending = snapshot.pending.len(),
            "vault restored from snapshot"
        );
        Ok(Self::assemble(
            config,
            clock,
            gateway,
            VaultState {
                administrator: snapshot.administrator,
                records: snapshot.records,
                owners: snapshot.owners,
                bound,
                pending: snapshot.pending,
                transactions: snapshot.transactions,
                journal: snapshot.journal,
            },
        ))
    }

    fn assemble(
        config: VaultConfig,
        clock: Arc<dyn Clock>,
        gateway: Arc<dyn CipherGateway>,
        state: VaultState,
    ) -> Self {
        let gate = AccessGate::with_default_stages(config.gate.clone());
        Self {
            config,
            clock,
            gateway,
            gate,
            events: Arc::new(EventBus::default()),
            state: RwLock::new(state),
        }
    }

    /// Publish events on `bus` instead of the vault's private bus.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.events = bus;
        self
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn scope(&self) -> &ScopeId {
        &self.config.scope
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn subscribe(&self, filter: EventFilter) -> VaultResult<EventStream> {
        Ok(self.events.subscribe(filter)?)
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Apply `operation` on behalf of `caller` as one atomic transaction.
    ///
    /// Committed transactions are appended to the journal and their events
    /// published. A rejected transaction changes nothing but the transaction
    /// counter.
    pub fn submit_transaction(&self, caller: Identity, operation: Operation) -> TransactionReceipt {
        let mut state = match self.write() {
            Ok(state) => state,
            Err(error) => {
                warn!(op = operation.name(), caller = %caller.short_id(), %error, "transaction rejected");
                return TransactionReceipt::rejected(0, error);
            }
        };
        state.transactions += 1;
        let seq = state.transactions;

        match self.apply(&mut state, caller, &operation) {
            Ok(applied) => {
                let now = self.clock.now();
                let prev_hash = state.journal.last().map(|e| e.entry_hash);
                state.journal.push(JournalEntry::link(
                    JournalBody {
                        seq,
                        committed_at: now,
                        caller,
                        operation: operation.clone(),
                        output: applied.output.clone(),
                    },
                    prev_hash,
                ));
                // Still under the write lock: bus order matches journal order.
                let effects = self.publish(now, applied.events);
                TransactionReceipt::committed(seq, applied.output, effects)
            }
            Err(error) => {
                drop(state);
                warn!(seq, op = operation.name(), caller = %caller.short_id(), %error, "transaction rejected");
                TransactionReceipt::rejected(seq, error)
            }
        }
    }

    fn apply(
        &self,
        state: &mut VaultState,
        caller: Identity,
        operation: &Operation,
    ) -> VaultResult<Applied> {
        match operation {
            Operation::Submit {
                payload,
                access_field,
                proof,
                disclosure_time,
            } => self.apply_submit(state, caller, payload, *access_field, proof, *disclosure_time),
            Operation::MakePublic { id } => self.apply_make_public(state, caller, *id),
            Operation::RequestDisclosure { id } => {
                self.apply_request_disclosure(state, caller, *id)
            }
            Operation::CompleteDisclosure {
                correlation_id,
                cleartext,
                proof,
            } => self.apply_complete_disclosure(state, *correlation_id, cleartext, proof),
            Operation::TransferOwnership { new_administrator } => {
                self.apply_transfer_ownership(state, caller, *new_administrator)
            }
        }
    }

    fn apply_submit(
        &self,
        state: &mut VaultState,
        owner: Identity,
        payload: &[CiphertextHandle],
        access_field: CiphertextHandle,
        proof: &InputProof,
        disclosure_time: Timestamp,
    ) -> VaultResult<Applied> {
        let now = self.clock.now();
        if disclosure_time <= now {
            return Err(VaultError::InvalidDisclosureTime {
                disclosure_time,
                now,
            });
        }
        if payload.is_empty() {
            return Err(VaultError::EmptyPayload);
        }
        if payload.len() > self.config.max_payload_len {
            return Err(VaultError::PayloadTooLarge {
                len: payload.len(),
                max: self.config.max_payload_len,
            });
        }

        let mut handles = Vec::with_capacity(payload.len() + 1);
        handles.push(access_field);
        handles.extend_from_slice(payload);
        self.gateway
            .verify_input(&self.config.scope, owner, &handles, proof)
            .map_err(|e| VaultError::InvalidProof(e.to_string()))?;
        let mut seen = HashSet::with_capacity(handles.len());
        if let Some(reused) = handles
            .iter()
            .find(|h| state.bound.contains(*h) || !seen.insert(**h))
        {
            return Err(VaultError::HandleReused(*reused));
        }
        self.gateway.allow(&handles, owner)?;

        let id = state.records.next_id();
        let record = Record::new(id, owner, payload.to_vec(), access_field, disclosure_time, now);
        state.owners.append(owner, id)?;
        state.records.insert(record)?;
        state.bound.extend(handles);

        info!(%id, owner = %owner.short_id(), %disclosure_time, len = payload.len(), "record submitted");
        Ok(Applied {
            output: OperationOutput::Submitted { id },
            events: vec![EventPayload::RecordSubmitted {
                id,
                owner,
                disclosure_time,
            }],
        })
    }

    fn apply_make_public(
        &self,
        state: &mut VaultState,
        caller: Identity,
        id: RecordId,
    ) -> VaultResult<Applied> {
        let now = self.clock.now();
        let record = state.records.get(id)?;
        self.check_gate(
            DisclosureAction::MakePublic,
            caller,
            Some(record),
            &state.administrator,
            now,
        )?;
        match record.disclosure {
            DisclosureState::Locked => {}
            DisclosureState::PubliclyDisclosed { .. } => return Err(VaultError::AlreadyPublic(id)),
            DisclosureState::DisclosureRequested { .. } | DisclosureState::Disclosed { .. } => {
                return Err(VaultError::WrongDisclosurePath(id))
            }
        }

        self.gateway.allow_public(&record.payload)?;
        state.records.get_mut(id)?.disclosure = DisclosureState::PubliclyDisclosed { at: now };

        info!(%id, caller = %caller.short_id(), "record made public");
        Ok(Applied {
            output: OperationOutput::MadePublic { id },
            events: vec![EventPayload::RecordMadePublic { id }],
        })
    }

    fn apply_request_disclosure(
        &self,
        state: &mut VaultState,
        caller: Identity,
        id: RecordId,
    ) -> VaultResult<Applied> {
        let now = self.clock.now();
        let record = state.records.get(id)?;
        self.check_gate(
            DisclosureAction::RequestDisclosure,
            caller,
            Some(record),
            &state.administrator,
            now,
        )?;
        match record.disclosure {
            DisclosureState::Locked => {}
            DisclosureState::DisclosureRequested { .. } | DisclosureState::Disclosed { .. } => {
                return Err(VaultError::AlreadyRequested(id))
            }
            DisclosureState::PubliclyDisclosed { .. } => {
                return Err(VaultError::WrongDisclosurePath(id))
            }
        }

        let correlation_id = CorrelationId::new();
        let ticket = DecryptionTicket {
            correlation_id,
            record_id: id,
            handles: vec![record.access_field],
            requester: caller,
            requested_at: now,
        };
        state.records.get_mut(id)?.disclosure = DisclosureState::DisclosureRequested {
            correlation_id,
            requested_at: now,
        };
        state.pending.insert(correlation_id, id);

        info!(%id, %correlation_id, "disclosure requested");
        Ok(Applied {
            output: OperationOutput::DisclosureRequested { id, correlation_id },
            events: vec![EventPayload::DisclosureRequested {
                id,
                correlation_id,
                ticket,
            }],
        })
    }

    fn apply_complete_disclosure(
        &self,
        state: &mut VaultState,
        correlation_id: CorrelationId,
        cleartext: &[ClearValue],
        proof: &DecryptionProof,
    ) -> VaultResult<Applied> {
        let Some(&id) = state.pending.get(&correlation_id) else {
            warn!(%correlation_id, "discarding completion for unknown or completed request");
            return Err(VaultError::UnknownOrCompletedRequest(correlation_id));
        };
        let record = state.records.get(id)?;
        self.gateway
            .verify_decryption(&correlation_id, &[record.access_field], cleartext, proof)
            .map_err(|_| VaultError::InvalidDecryptionProof(correlation_id))?;

        let revealed = match cleartext {
            [ClearValue::Address(address)] => *address,
            other => {
                return Err(VaultError::MalformedDecryption {
                    correlation_id,
                    reason: format!("expected one address, got {} values", other.len()),
                })
            }
        };

        let now = self.clock.now();
        state.records.get_mut(id)?.disclosure = DisclosureState::Disclosed {
            correlation_id,
            revealed,
            disclosed_at: now,
        };
        state.pending.remove(&correlation_id);

        info!(%id, %correlation_id, revealed = %revealed, "record disclosed");
        Ok(Applied {
            output: OperationOutput::Disclosed { id, revealed },
            events: vec![EventPayload::RecordDisclosed { id, revealed }],
        })
    }

    fn apply_transfer_ownership(
        &self,
        state: &mut VaultState,
        caller: Identity,
        new_administrator: Identity,
    ) -> VaultResult<Applied> {
        self.check_gate(
            DisclosureAction::TransferOwnership,
            caller,
            None,
            &state.administrator,
            self.clock.now(),
        )?;
        if new_administrator.is_null() {
            return Err(VaultError::ZeroIdentity);
        }

        let previous = std::mem::replace(&mut state.administrator, new_administrator);
        info!(previous = %previous, new = %new_administrator, "administrator changed");
        Ok(Applied {
            output: OperationOutput::OwnershipTransferred {
                previous,
                new: new_administrator,
            },
            events: vec![EventPayload::OwnershipTransferred {
                previous,
                new: new_administrator,
            }],
        })
    }

    fn check_gate(
        &self,
        action: DisclosureAction,
        caller: Identity,
        record: Option<&Record>,
        administrator: &Identity,
        now: Timestamp,
    ) -> VaultResult<()> {
        let request = GateRequest {
            action,
            caller,
            role: determine_role(&caller, record.map(|r| &r.owner), administrator),
            disclosure_time: record.map(|r| r.disclosure_time),
            now,
        };
        let id = record.map(|r| r.id);
        self.gate
            .evaluate(&request)?
            .into_result()
            .map_err(|denial| match (denial, id) {
                (Denial::NotAdministrator, _) => VaultError::PermissionDenied { caller, action },
                (Denial::TimeGateClosed { opens_at }, Some(id)) => {
                    VaultError::NotEligibleYet { id, opens_at }
                }
                (Denial::PathDisabled, Some(id)) => VaultError::WrongDisclosurePath(id),
                (_, None) => VaultError::PermissionDenied { caller, action },
            })
    }

    fn publish(&self, now: Timestamp, payloads: Vec<EventPayload>) -> Vec<VaultEvent> {
        payloads
            .into_iter()
            .filter_map(|payload| match self.events.publish(now, payload) {
                Ok(event) => Some(event),
                Err(error) => {
                    warn!(%error, "event dropped after commit");
                    None
                }
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Typed mutations
    // ------------------------------------------------------------------

    /// Store a new locked record owned by `owner`.
    ///
    /// `access_field` and `payload` must come from one encrypted input whose
    /// `proof` binds them, in that order, to this vault's scope and `owner`.
    pub fn submit(
        &self,
        owner: Identity,
        payload: Vec<CiphertextHandle>,
        access_field: CiphertextHandle,
        proof: InputProof,
        disclosure_time: Timestamp,
    ) -> VaultResult<RecordId> {
        let operation = Operation::Submit {
            payload,
            access_field,
            proof,
            disclosure_time,
        };
        match self.submit_transaction(owner, operation).into_result()? {
            OperationOutput::Submitted { id } => Ok(id),
            other => Err(unexpected(other)),
        }
    }

    /// Open the public path for an eligible record. Anyone may call this.
    pub fn make_public(&self, caller: Identity, id: RecordId) -> VaultResult<()> {
        match self
            .submit_transaction(caller, Operation::MakePublic { id })
            .into_result()?
        {
            OperationOutput::MadePublic { .. } => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Ask the decryption service to reveal the record's access field.
    /// Administrator only.
    pub fn request_disclosure(&self, caller: Identity, id: RecordId) -> VaultResult<CorrelationId> {
        match self
            .submit_transaction(caller, Operation::RequestDisclosure { id })
            .into_result()?
        {
            OperationOutput::DisclosureRequested { correlation_id, .. } => Ok(correlation_id),
            other => Err(unexpected(other)),
        }
    }

    /// Deliver the decryption result for a pending request.
    ///
    /// The proof authenticates the result, so the transaction is attributed
    /// to the proof's signer.
    pub fn complete_disclosure(
        &self,
        correlation_id: CorrelationId,
        cleartext: Vec<ClearValue>,
        proof: DecryptionProof,
    ) -> VaultResult<(RecordId, Identity)> {
        let caller = proof.signer.to_identity();
        let operation = Operation::CompleteDisclosure {
            correlation_id,
            cleartext,
            proof,
        };
        match self.submit_transaction(caller, operation).into_result()? {
            OperationOutput::Disclosed { id, revealed } => Ok((id, revealed)),
            other => Err(unexpected(other)),
        }
    }

    /// Replace the administrator. Administrator only.
    pub fn transfer_ownership(&self, caller: Identity, new_administrator: Identity) -> VaultResult<()> {
        match self
            .submit_transaction(caller, Operation::TransferOwnership { new_administrator })
            .into_result()?
        {
            OperationOutput::OwnershipTransferred { .. } => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn get(&self, id: RecordId) -> VaultResult<Record> {
        Ok(self.read()?.records.get(id)?.clone())
    }

    pub fn total_count(&self) -> VaultResult<u64> {
        Ok(self.read()?.records.total_count())
    }

    pub fn handle_at(&self, id: RecordId, index: usize) -> VaultResult<CiphertextHandle> {
        Ok(self.read()?.records.handle_at(id, index)?)
    }

    pub fn payload_len(&self, id: RecordId) -> VaultResult<usize> {
        Ok(self.read()?.records.payload_len(id)?)
    }

    /// Whether the record's time gate has opened.
    pub fn can_be_disclosed(&self, id: RecordId) -> VaultResult<bool> {
        let now = self.clock.now();
        Ok(self.read()?.records.get(id)?.is_eligible_at(now))
    }

    pub fn phase(&self, id: RecordId) -> VaultResult<Phase> {
        let now = self.clock.now();
        Ok(self.read()?.records.get(id)?.phase(now))
    }

    pub fn record_meta(&self, id: RecordId) -> VaultResult<RecordMeta> {
        Ok(self.read()?.records.get(id)?.meta())
    }

    pub fn decryption_status(&self, id: RecordId) -> VaultResult<DecryptionStatus> {
        Ok(self.read()?.records.get(id)?.decryption_status())
    }

    pub fn is_disclosure_pending(&self, id: RecordId) -> VaultResult<bool> {
        Ok(self.decryption_status(id)?.pending)
    }

    /// Records with ids in `range`; ids past the end are ignored.
    pub fn records_in(&self, range: Range<u64>) -> VaultResult<Vec<Record>> {
        Ok(self.read()?.records.range(range).to_vec())
    }

    pub fn stats(&self) -> VaultResult<VaultStats> {
        let now = self.clock.now();
        Ok(self.read()?.records.stats(now))
    }

    pub fn record_count_for(&self, owner: &Identity) -> VaultResult<usize> {
        Ok(self.read()?.owners.record_count_for(owner))
    }

    pub fn record_id_at(&self, owner: &Identity, position: usize) -> VaultResult<RecordId> {
        Ok(self.read()?.owners.record_id_at(owner, position)?)
    }

    pub fn records_of(&self, owner: &Identity) -> VaultResult<Vec<RecordId>> {
        Ok(self.read()?.owners.records_of(owner))
    }

    pub fn administrator(&self) -> VaultResult<Identity> {
        Ok(self.read()?.administrator)
    }

    pub fn is_administrator(&self, identity: &Identity) -> VaultResult<bool> {
        Ok(is_administrator(identity, &self.read()?.administrator))
    }

    /// Outstanding disclosure requests, oldest first.
    pub fn pending_requests(&self) -> VaultResult<Vec<(CorrelationId, RecordId)>> {
        let state = self.read()?;
        let mut pending: Vec<_> = state.pending.iter().map(|(c, r)| (*c, *r)).collect();
        pending.sort_by_key(|(_, id)| *id);
        Ok(pending)
    }

    pub fn journal(&self) -> VaultResult<Vec<JournalEntry>> {
        Ok(self.read()?.journal.clone())
    }

    pub fn verify_journal(&self) -> VaultResult<()> {
        let state = self.read()?;
        HashChainVerifier::verify_chain(&state.journal)
            .map_err(|e| VaultError::Journal(e.to_string()))?;
        debug!(entries = state.journal.len(), "journal verified");
        Ok(())
    }

    pub fn snapshot(&self) -> VaultResult<VaultSnapshot> {
        let state = self.read()?;
        Ok(VaultSnapshot {
            administrator: state.administrator,
            records: state.records.clone(),
            owners: state.owners.clone(),
            pending: state.pending.clone(),
            next_id: state.records.next_id(),
            transactions: state.transactions,
            journal: state.journal.clone(),
        })
    }

    fn read(&self) -> VaultResult<RwLockReadGuard<'_, VaultState>> {
        self.state.read().map_err(|_| VaultError::Poisoned)
    }

    fn write(&self) -> VaultResult<RwLockWriteGuard<'_, VaultState>> {
        self.state.write().map_err(|_| VaultError::Poisoned)
    }
}

fn unexpected(output: OperationOutput) -> VaultError {
    VaultError::Journal(format!("unexpected transaction output {output:?}"))
}
