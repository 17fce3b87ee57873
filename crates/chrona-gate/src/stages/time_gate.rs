use crate::config::GateConfig;
use crate::error::GateError;
use crate::role::is_eligible_time;
use crate::stage::{Denial, GateRequest, GateStage, StageDecision};

/// Denies time-gated actions before the record's disclosure time.
pub struct TimeGateStage;

impl GateStage for TimeGateStage {
    fn name(&self) -> &str {
        "time-gate"
    }

    fn evaluate(
        &self,
        request: &GateRequest,
        _config: &GateConfig,
    ) -> Result<StageDecision, GateError> {
        if !request.action.is_time_gated() {
            return Ok(StageDecision::Pass);
        }
        let opens_at = request.disclosure_time.ok_or_else(|| {
            GateError::MissingContext(format!("{:?} needs a disclosure time", request.action))
        })?;
        if is_eligible_time(opens_at, request.now) {
            Ok(StageDecision::Pass)
        } else {
            Ok(StageDecision::Deny(Denial::TimeGateClosed { opens_at }))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrona_types::{Identity, Timestamp};

    use super::*;
    use crate::role::Role;
    use crate::stage::DisclosureAction;

    #[test]
    fn missing_disclosure_time_is_an_error() {
        let request = GateRequest {
            action: DisclosureAction::MakePublic,
            caller: Identity::from_bytes([1; 20]),
            role: Role::Other,
            disclosure_time: None,
            now: Timestamp::EPOCH,
        };
        assert!(matches!(
            TimeGateStage.evaluate(&request, &GateConfig::default()),
            Err(GateError::MissingContext(_))
        ));
    }
}
