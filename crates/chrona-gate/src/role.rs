use chrona_types::{Identity, Timestamp};
use serde::{Deserialize, Serialize};

/// The caller's relationship to a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Administrator,
    Other,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Owner => "owner",
            Self::Administrator => "administrator",
            Self::Other => "other",
        })
    }
}

/// Classify `caller`. An administrator who also owns the record is
/// [`Role::Administrator`].
pub fn determine_role(
    caller: &Identity,
    record_owner: Option<&Identity>,
    administrator: &Identity,
) -> Role {
    if is_administrator(caller, administrator) {
        Role::Administrator
    } else if record_owner == Some(caller) {
        Role::Owner
    } else {
        Role::Other
    }
}

/// Byte equality with the stored administrator. The null identity never
/// matches.
pub fn is_administrator(identity: &Identity, administrator: &Identity) -> bool {
    !identity.is_null() && identity == administrator
}

/// The time gate: open at and after `disclosure_time`.
pub fn is_eligible_time(disclosure_time: Timestamp, now: Timestamp) -> bool {
    now >= disclosure_time
}
