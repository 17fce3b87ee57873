use chrona_types::{CiphertextHandle, CorrelationId, Identity, RecordId, Timestamp};
use serde::{Deserialize, Serialize};

/// The mutable part of a record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DisclosureState {
    Locked,
    PubliclyDisclosed {
        at: Timestamp,
    },
    DisclosureRequested {
        correlation_id: CorrelationId,
        requested_at: Timestamp,
    },
    Disclosed {
        correlation_id: CorrelationId,
        revealed: Identity,
        disclosed_at: Timestamp,
    },
}

/// Observable lifecycle phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Locked,
    Eligible,
    PubliclyDisclosed,
    DisclosureRequested,
    Disclosed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::PubliclyDisclosed | Self::Disclosed)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Locked => "locked",
            Self::Eligible => "eligible",
            Self::PubliclyDisclosed => "publicly disclosed",
            Self::DisclosureRequested => "disclosure requested",
            Self::Disclosed => "disclosed",
        };
        f.write_str(s)
    }
}

/// A stored record.
///
/// Only `disclosure` changes after submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub owner: Identity,
    /// One handle per plaintext byte, in order.
    pub payload: Vec<CiphertextHandle>,
    /// Encrypted address that the administrator path decrypts.
    pub access_field: CiphertextHandle,
    pub disclosure_time: Timestamp,
    pub submitted_at: Timestamp,
    pub disclosure: DisclosureState,
}

impl Record {
    /// A fresh locked record.
    pub fn new(
        id: RecordId,
        owner: Identity,
        payload: Vec<CiphertextHandle>,
        access_field: CiphertextHandle,
        disclosure_time: Timestamp,
        submitted_at: Timestamp,
    ) -> Self {
        Self {
            id,
            owner,
            payload,
            access_field,
            disclosure_time,
            submitted_at,
            disclosure: DisclosureState::Locked,
        }
    }

    /// The time gate: `now >= disclosure_time`.
    pub fn is_eligible_at(&self, now: Timestamp) -> bool {
        now >= self.disclosure_time
    }

    pub fn phase(&self, now: Timestamp) -> Phase {
        match &self.disclosure {
            DisclosureState::Locked if self.is_eligible_at(now) => Phase::Eligible,
            DisclosureState::Locked => Phase::Locked,
            DisclosureState::PubliclyDisclosed { .. } => Phase::PubliclyDisclosed,
            DisclosureState::DisclosureRequested { .. } => Phase::DisclosureRequested,
            DisclosureState::Disclosed { .. } => Phase::Disclosed,
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self.disclosure, DisclosureState::PubliclyDisclosed { .. })
    }

    pub fn is_disclosed(&self) -> bool {
        matches!(self.disclosure, DisclosureState::Disclosed { .. })
    }

    /// The decrypted access field, once the administrator path completed.
    pub fn revealed(&self) -> Option<Identity> {
        match self.disclosure {
            DisclosureState::Disclosed { revealed, .. } => Some(revealed),
            _ => None,
        }
    }

    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// All handles of the record: the access field first, then the payload.
    pub fn handles(&self) -> impl Iterator<Item = &CiphertextHandle> {
        std::iter::once(&self.access_field).chain(self.payload.iter())
    }

    pub fn decryption_status(&self) -> DecryptionStatus {
        match self.disclosure {
            DisclosureState::Locked | DisclosureState::PubliclyDisclosed { .. } => {
                DecryptionStatus::default()
            }
            DisclosureState::DisclosureRequested { .. } => DecryptionStatus {
                requested: true,
                pending: true,
            },
            DisclosureState::Disclosed { .. } => DecryptionStatus {
                requested: true,
                pending: false,
            },
        }
    }

    pub fn meta(&self) -> RecordMeta {
        RecordMeta {
            owner: self.owner,
            disclosure_time: self.disclosure_time,
            is_public: self.is_public(),
            is_disclosed: self.is_disclosed(),
        }
    }
}

/// Summary view of a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub owner: Identity,
    pub disclosure_time: Timestamp,
    pub is_public: bool,
    pub is_disclosed: bool,
}

/// Progress of the administrator disclosure path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionStatus {
    pub requested: bool,
    pub pending: bool,
}
