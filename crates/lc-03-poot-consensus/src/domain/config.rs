//! PoOT configuration.

use super::errors::PootConfigError;
use super::slot::SlotClock;
use super::trust::{Condition, TrustPolicy};
use super::weighting::DefaultWeighting;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct PootConfig {
    /// Length of one consensus round.
    pub slot_duration_secs: u64,
    /// Unix time of slot 0.
    pub genesis_time: u64,
    /// Rewards distributed per settled slot.
    pub slot_reward_pool: u64,
    /// Longest accepted uptime beacon lifetime.
    pub beacon_window_secs: u64,
    pub max_credit_per_proof: u64,
    pub trust: TrustPolicy,
    /// Deadline for each proof store or identity call.
    pub store_timeout: Duration,
}

impl Default for PootConfig {
    fn default() -> Self {
        Self {
            slot_duration_secs: 120,
            genesis_time: 0,
            slot_reward_pool: 1_000_000,
            beacon_window_secs: 300,
            max_credit_per_proof: 10_000,
            trust: TrustPolicy::default(),
            store_timeout: Duration::from_secs(5),
        }
    }
}

impl PootConfig {
    pub fn validate(&self) -> Result<(), PootConfigError> {
        if self.slot_duration_secs == 0 {
            return Err(PootConfigError::Zero("slot_duration_secs"));
        }
        if self.beacon_window_secs == 0 {
            return Err(PootConfigError::Zero("beacon_window_secs"));
        }
        if self.max_credit_per_proof == 0 {
            return Err(PootConfigError::Zero("max_credit_per_proof"));
        }
        if self.store_timeout.is_zero() {
            return Err(PootConfigError::Zero("store_timeout"));
        }
        for (index, rule) in self.trust.rules.iter().enumerate() {
            if has_empty_all_of(&rule.condition) {
                return Err(PootConfigError::EmptyRule(index));
            }
        }
        Ok(())
    }

    pub fn slot_clock(&self) -> SlotClock {
        SlotClock::new(self.genesis_time, self.slot_duration_secs)
    }

    pub fn weighting(&self) -> DefaultWeighting {
        DefaultWeighting {
            max_credit_per_proof: self.max_credit_per_proof,
        }
    }
}

fn has_empty_all_of(condition: &Condition) -> bool {
    match condition {
        Condition::AllOf { conditions } => {
            conditions.is_empty() || conditions.iter().any(has_empty_all_of)
        }
        _ => false,
    }
}
