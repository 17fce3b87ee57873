use serde::{Deserialize, Serialize};

use crate::record::Phase;

/// Record counts per lifecycle phase at a point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultStats {
    pub total: u64,
    pub locked: u64,
    pub eligible: u64,
    pub publicly_disclosed: u64,
    pub pending: u64,
    pub disclosed: u64,
}

impl VaultStats {
    pub fn record(&mut self, phase: Phase) {
        self.total += 1;
        match phase {
            Phase::Locked => self.locked += 1,
            Phase::Eligible => self.eligible += 1,
            Phase::PubliclyDisclosed => self.publicly_disclosed += 1,
            Phase::DisclosureRequested => self.pending += 1,
            Phase::Disclosed => self.disclosed += 1,
        }
    }
}
