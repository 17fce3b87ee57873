//! Access control gate for Chrona.
//!
//! Every state-changing disclosure operation is run through an
//! [`AccessGate`] before the vault touches any record. The gate evaluates a
//! fail-fast pipeline of [`GateStage`]s over a [`GateRequest`] describing the
//! caller, their [`Role`] and the record's time gate.
//!
//! # Quick Start
//!
//! ```rust
//! use chrona_gate::{AccessGate, DisclosureAction, GateConfig, GateRequest, Role};
//! use chrona_types::{Identity, Timestamp};
//!
//! let gate = AccessGate::with_default_stages(GateConfig::default());
//! let request = GateRequest {
//!     action: DisclosureAction::MakePublic,
//!     caller: Identity::from_bytes([7; 20]),
//!     role: Role::Other,
//!     disclosure_time: Some(Timestamp::from_secs(100)),
//!     now: Timestamp::from_secs(150),
//! };
//! assert!(gate.evaluate(&request).unwrap().is_allowed());
//! ```

pub mod config;
pub mod error;
pub mod gate;
pub mod role;
pub mod stage;
pub mod stages;

pub use config::GateConfig;
pub use error::GateError;
pub use gate::{AccessGate, GateDecision, GateResult};
pub use role::{determine_role, is_administrator, is_eligible_time, Role};
pub use stage::{Denial, DisclosureAction, GateRequest, GateStage, StageDecision, StageResult};
pub use stages::{AuthorityStage, TimeGateStage};

#[cfg(test)]
mod tests {
    use chrona_types::{Identity, Timestamp};

    use super::*;

    fn admin() -> Identity {
        Identity::from_bytes([0xad; 20])
    }

    fn request(action: DisclosureAction, role: Role, now: u64) -> GateRequest {
        GateRequest {
            action,
            caller: if role == Role::Administrator { admin() } else { Identity::from_bytes([1; 20]) },
            role,
            disclosure_time: Some(Timestamp::from_secs(100)),
            now: Timestamp::from_secs(now),
        }
    }

    #[test]
    fn default_gate_runs_both_stages() {
        let gate = AccessGate::with_default_stages(GateConfig::default());
        let result = gate
            .evaluate(&request(DisclosureAction::RequestDisclosure, Role::Administrator, 100))
            .unwrap();
        assert!(result.is_allowed());
        assert_eq!(result.stage_results.len(), 2);
        assert!(result.stage_results.iter().all(|r| r.passed));
    }

    #[test]
    fn non_admin_request_denied_before_time_check() {
        let gate = AccessGate::with_default_stages(GateConfig::default());
        let result = gate
            .evaluate(&request(DisclosureAction::RequestDisclosure, Role::Owner, 50))
            .unwrap();
        assert_eq!(result.decision, GateDecision::Denied(Denial::NotAdministrator));
        assert_eq!(result.stage_results.len(), 1);
        assert_eq!(result.stage_results[0].stage_name, "authority");
    }

    #[test]
    fn closed_time_gate_reports_opening_time() {
        let gate = AccessGate::with_default_stages(GateConfig::default());
        let result = gate
            .evaluate(&request(DisclosureAction::MakePublic, Role::Other, 99))
            .unwrap();
        assert_eq!(
            result.decision,
            GateDecision::Denied(Denial::TimeGateClosed {
                opens_at: Timestamp::from_secs(100)
            })
        );
        assert_eq!(result.stage_results[1].stage_name, "time-gate");
    }

    #[test]
    fn transfer_ignores_time_gate() {
        let gate = AccessGate::with_default_stages(GateConfig::default());
        let mut req = request(DisclosureAction::TransferOwnership, Role::Administrator, 0);
        req.disclosure_time = None;
        assert!(gate.evaluate(&req).unwrap().is_allowed());
    }

    #[test]
    fn disabled_public_path() {
        let config = GateConfig {
            public_path_enabled: false,
            ..GateConfig::default()
        };
        let gate = AccessGate::with_default_stages(config);
        let result = gate
            .evaluate(&request(DisclosureAction::MakePublic, Role::Owner, 200))
            .unwrap();
        assert_eq!(result.decision, GateDecision::Denied(Denial::PathDisabled));
    }

    #[test]
    fn empty_pipeline_allows() {
        let gate = AccessGate::new(GateConfig::default());
        let result = gate
            .evaluate(&request(DisclosureAction::RequestDisclosure, Role::Other, 0))
            .unwrap();
        assert!(result.is_allowed());
        assert!(result.stage_results.is_empty());
    }

    #[test]
    fn custom_stage_integration() {
        struct Freeze;
        impl GateStage for Freeze {
            fn name(&self) -> &str {
                "freeze"
            }
            fn evaluate(
                &self,
                _request: &GateRequest,
                _config: &GateConfig,
            ) -> Result<StageDecision, GateError> {
                Ok(StageDecision::Deny(Denial::PathDisabled))
            }
        }

        let mut gate = AccessGate::new(GateConfig::default());
        gate.add_stage(Box::new(Freeze));
        gate.add_stage(Box::new(AuthorityStage));
        let result = gate
            .evaluate(&request(DisclosureAction::MakePublic, Role::Owner, 200))
            .unwrap();
        assert!(!result.is_allowed());
        assert_eq!(result.stage_results.len(), 1);
        assert_eq!(gate.stage_count(), 2);
    }

    #[test]
    fn config_hash_changes_with_config() {
        let a = AccessGate::new(GateConfig::default()).config_hash();
        let b = AccessGate::new(GateConfig {
            admin_path_enabled: false,
            ..GateConfig::default()
        })
        .config_hash();
        assert_ne!(a, b);
    }
}
