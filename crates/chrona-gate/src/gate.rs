use std::time::{Duration, Instant};

use chrona_crypto::ContentHasher;
use tracing::debug;

use crate::config::GateConfig;
use crate::error::GateError;
use crate::stage::{Denial, GateRequest, GateStage, StageDecision, StageResult};
use crate::stages::{AuthorityStage, TimeGateStage};

/// Final verdict of the pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    Denied(Denial),
}

/// The outcome of running a request through the full gate pipeline.
#[derive(Clone, Debug)]
pub struct GateResult {
    pub decision: GateDecision,
    /// Per-stage results in evaluation order.
    pub stage_results: Vec<StageResult>,
    pub elapsed: Duration,
}

impl GateResult {
    pub fn is_allowed(&self) -> bool {
        self.decision == GateDecision::Allowed
    }

    /// `Ok(())` when allowed, the denial otherwise.
    pub fn into_result(self) -> Result<(), Denial> {
        match self.decision {
            GateDecision::Allowed => Ok(()),
            GateDecision::Denied(denial) => Err(denial),
        }
    }
}

/// A configurable pipeline of stages that every disclosure action passes
/// through before the vault mutates state.
pub struct AccessGate {
    stages: Vec<Box<dyn GateStage>>,
    config: GateConfig,
}

impl AccessGate {
    /// An empty pipeline. Use [`Self::add_stage`] or
    /// [`Self::with_default_stages`].
    pub fn new(config: GateConfig) -> Self {
        Self {
            stages: Vec::new(),
            config,
        }
    }

    /// Authority -> TimeGate
    pub fn with_default_stages(config: GateConfig) -> Self {
        let mut gate = Self::new(config);
        gate.add_stage(Box::new(AuthorityStage));
        gate.add_stage(Box::new(TimeGateStage));
        gate
    }

    pub fn add_stage(&mut self, stage: Box<dyn GateStage>) {
        self.stages.push(stage);
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Evaluate fail-fast: the first denying stage ends the run.
    pub fn evaluate(&self, request: &GateRequest) -> Result<GateResult, GateError> {
        let pipeline_start = Instant::now();
        let mut stage_results = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let stage_start = Instant::now();
            let decision = stage.evaluate(request, &self.config)?;
            let denial = match &decision {
                StageDecision::Pass => None,
                StageDecision::Deny(denial) => Some(denial.clone()),
            };

            stage_results.push(StageResult {
                stage_name: stage.name().to_string(),
                passed: denial.is_none(),
                denial: denial.clone(),
                elapsed: stage_start.elapsed(),
            });

            if let Some(denial) = denial {
                debug!(stage = stage.name(), action = ?request.action, %denial, "gate denied");
                return Ok(GateResult {
                    decision: GateDecision::Denied(denial),
                    stage_results,
                    elapsed: pipeline_start.elapsed(),
                });
            }
        }

        Ok(GateResult {
            decision: GateDecision::Allowed,
            stage_results,
            elapsed: pipeline_start.elapsed(),
        })
    }

    /// BLAKE3 hash of the active configuration.
    pub fn config_hash(&self) -> [u8; 32] {
        let hasher = ContentHasher::new("chrona-gate-config-v1");
        hasher.hash_json(&self.config).unwrap_or([0u8; 32])
    }
}
