use std::time::Duration;

use chrona_types::{Identity, Timestamp};
use serde::{Deserialize, Serialize};

use crate::config::GateConfig;
use crate::error::GateError;
use crate::role::Role;

/// Operations the gate decides on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisclosureAction {
    MakePublic,
    RequestDisclosure,
    TransferOwnership,
}

impl DisclosureAction {
    /// Whether the action is subject to the record's time gate.
    pub fn is_time_gated(&self) -> bool {
        matches!(self, Self::MakePublic | Self::RequestDisclosure)
    }
}

/// Everything a stage may look at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GateRequest {
    pub action: DisclosureAction,
    pub caller: Identity,
    pub role: Role,
    /// The target record's disclosure time; `None` for actions without a record.
    pub disclosure_time: Option<Timestamp>,
    pub now: Timestamp,
}

/// Why a stage refused a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Denial {
    NotAdministrator,
    TimeGateClosed { opens_at: Timestamp },
    PathDisabled,
}

impl std::fmt::Display for Denial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAdministrator => f.write_str("caller is not the administrator"),
            Self::TimeGateClosed { opens_at } => write!(f, "time gate closed until {opens_at}"),
            Self::PathDisabled => f.write_str("disclosure path disabled"),
        }
    }
}

/// The outcome of a single gate stage evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageDecision {
    Pass,
    Deny(Denial),
}

impl StageDecision {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// Recorded result from a completed stage evaluation.
#[derive(Clone, Debug)]
pub struct StageResult {
    pub stage_name: String,
    pub passed: bool,
    pub denial: Option<Denial>,
    pub elapsed: Duration,
}

/// A single evaluation stage in the gate pipeline.
///
/// Object-safe so stages can live in a `Vec<Box<dyn GateStage>>`.
pub trait GateStage: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(
        &self,
        request: &GateRequest,
        config: &GateConfig,
    ) -> Result<StageDecision, GateError>;
}
