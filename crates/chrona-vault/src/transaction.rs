use chrona_cipher::{ClearValue, DecryptionProof};
use chrona_events::VaultEvent;
use chrona_types::{CiphertextHandle, CorrelationId, Identity, InputProof, RecordId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};

/// A state-changing request submitted to the vault.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Submit {
        payload: Vec<CiphertextHandle>,
        access_field: CiphertextHandle,
        proof: InputProof,
        disclosure_time: Timestamp,
    },
    MakePublic {
        id: RecordId,
    },
    RequestDisclosure {
        id: RecordId,
    },
    CompleteDisclosure {
        correlation_id: CorrelationId,
        cleartext: Vec<ClearValue>,
        proof: DecryptionProof,
    },
    TransferOwnership {
        new_administrator: Identity,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Submit { .. } => "submit",
            Self::MakePublic { .. } => "make_public",
            Self::RequestDisclosure { .. } => "request_disclosure",
            Self::CompleteDisclosure { .. } => "complete_disclosure",
            Self::TransferOwnership { .. } => "transfer_ownership",
        }
    }
}

/// What a committed operation produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "output", rename_all = "snake_case")]
pub enum OperationOutput {
    Submitted { id: RecordId },
    MadePublic { id: RecordId },
    DisclosureRequested { id: RecordId, correlation_id: CorrelationId },
    Disclosed { id: RecordId, revealed: Identity },
    OwnershipTransferred { previous: Identity, new: Identity },
}

/// The outcome of [`Vault::submit_transaction`](crate::Vault::submit_transaction).
///
/// A failed transaction leaves the vault unchanged.
#[derive(Clone, Debug)]
pub struct TransactionReceipt {
    /// Position among all transactions this vault has processed.
    pub seq: u64,
    pub success: bool,
    pub output: Option<OperationOutput>,
    pub error: Option<VaultError>,
    /// Events published for a committed transaction.
    pub effects: Vec<VaultEvent>,
}

impl TransactionReceipt {
    pub(crate) fn committed(seq: u64, output: OperationOutput, effects: Vec<VaultEvent>) -> Self {
        Self {
            seq,
            success: true,
            output: Some(output),
            error: None,
            effects,
        }
    }

    pub(crate) fn rejected(seq: u64, error: VaultError) -> Self {
        Self {
            seq,
            success: false,
            output: None,
            error: Some(error),
            effects: Vec::new(),
        }
    }

    pub fn into_result(self) -> VaultResult<OperationOutput> {
        match (self.output, self.error) {
            (Some(output), None) => Ok(output),
            (_, Some(error)) => Err(error),
            (None, None) => Err(VaultError::Journal(format!(
                "transaction {} has neither output nor error",
                self.seq
            ))),
        }
    }
}
