use crate::config::GateConfig;
use crate::error::GateError;
use crate::role::Role;
use crate::stage::{Denial, DisclosureAction, GateRequest, GateStage, StageDecision};

/// Decides which roles may perform which action.
///
/// | Action | Allowed roles | Path switch |
/// |---|---|---|
/// | `MakePublic` | any | `public_path_enabled` |
/// | `RequestDisclosure` | administrator | `admin_path_enabled` |
/// | `TransferOwnership` | administrator | none |
pub struct AuthorityStage;

impl GateStage for AuthorityStage {
    fn name(&self) -> &str {
        "authority"
    }

    fn evaluate(
        &self,
        request: &GateRequest,
        config: &GateConfig,
    ) -> Result<StageDecision, GateError> {
        let admin = request.role == Role::Administrator;
        let decision = match request.action {
            DisclosureAction::MakePublic if !config.public_path_enabled => {
                StageDecision::Deny(Denial::PathDisabled)
            }
            DisclosureAction::MakePublic => StageDecision::Pass,
            DisclosureAction::RequestDisclosure | DisclosureAction::TransferOwnership
                if !admin =>
            {
                StageDecision::Deny(Denial::NotAdministrator)
            }
            DisclosureAction::RequestDisclosure if !config.admin_path_enabled => {
                StageDecision::Deny(Denial::PathDisabled)
            }
            DisclosureAction::RequestDisclosure | DisclosureAction::TransferOwnership => {
                StageDecision::Pass
            }
        };
        Ok(decision)
    }
}
