use serde::{Deserialize, Serialize};

use chrona_cipher::DecryptionTicket;
use chrona_types::{CorrelationId, Identity, RecordId, Timestamp};

use crate::error::{EventError, EventResult};

/// Content-addressed event identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId {
    pub hash: [u8; 32],
}

impl EventId {
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self { hash }
    }

    /// First 8 hex characters.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.hash[..4])
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "evt:{}", self.short_hex())
    }
}

/// Classification of vault events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    RecordSubmitted,
    RecordMadePublic,
    DisclosureRequested,
    RecordDisclosed,
    OwnershipTransferred,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::RecordSubmitted => "RecordSubmitted",
            Self::RecordMadePublic => "RecordMadePublic",
            Self::DisclosureRequested => "DisclosureRequested",
            Self::RecordDisclosed => "RecordDisclosed",
            Self::OwnershipTransferred => "OwnershipTransferred",
        };
        write!(f, "{s}")
    }
}

/// Data carried by each kind of event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    RecordSubmitted {
        id: RecordId,
        owner: Identity,
        disclosure_time: Timestamp,
    },
    RecordMadePublic {
        id: RecordId,
    },
    /// Carries the decryption ticket the relay needs to fulfil the request.
    DisclosureRequested {
        id: RecordId,
        correlation_id: CorrelationId,
        ticket: DecryptionTicket,
    },
    RecordDisclosed {
        id: RecordId,
        revealed: Identity,
    },
    OwnershipTransferred {
        previous: Identity,
        new: Identity,
    },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::RecordSubmitted { .. } => EventKind::RecordSubmitted,
            Self::RecordMadePublic { .. } => EventKind::RecordMadePublic,
            Self::DisclosureRequested { .. } => EventKind::DisclosureRequested,
            Self::RecordDisclosed { .. } => EventKind::RecordDisclosed,
            Self::OwnershipTransferred { .. } => EventKind::OwnershipTransferred,
        }
    }

    /// The record the event is about, if any.
    pub fn record_id(&self) -> Option<RecordId> {
        match self {
            Self::RecordSubmitted { id, .. }
            | Self::RecordMadePublic { id }
            | Self::DisclosureRequested { id, .. }
            | Self::RecordDisclosed { id, .. } => Some(*id),
            Self::OwnershipTransferred { .. } => None,
        }
    }
}

/// A single event emitted by a vault.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEvent {
    pub id: EventId,
    /// Position in the emitting bus's sequence, starting at 1.
    pub seq: u64,
    pub emitted_at: Timestamp,
    pub payload: EventPayload,
    /// BLAKE3 over (seq, emitted_at, payload).
    pub integrity_hash: [u8; 32],
}

impl VaultEvent {
    pub fn new(seq: u64, emitted_at: Timestamp, payload: EventPayload) -> EventResult<Self> {
        let integrity_hash = Self::compute_integrity(seq, emitted_at, &payload)?;
        Ok(Self {
            id: EventId::from_hash(integrity_hash),
            seq,
            emitted_at,
            payload,
            integrity_hash,
        })
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    pub fn verify_integrity(&self) -> bool {
        Self::compute_integrity(self.seq, self.emitted_at, &self.payload)
            .map(|expected| expected == self.integrity_hash && self.id.hash == expected)
            .unwrap_or(false)
    }

    fn compute_integrity(
        seq: u64,
        emitted_at: Timestamp,
        payload: &EventPayload,
    ) -> EventResult<[u8; 32]> {
        let payload_bytes =
            bincode::serialize(payload).map_err(|e| EventError::Serialization(e.to_string()))?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"chrona-event-v1:");
        hasher.update(&seq.to_le_bytes());
        hasher.update(&emitted_at.as_secs().to_le_bytes());
        hasher.update(&payload_bytes);
        Ok(*hasher.finalize().as_bytes())
    }
}
