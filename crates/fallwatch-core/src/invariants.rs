//! Pipeline invariants
//!
//! These hold for every cycle. The rule ordering in the snapshot and decision
//! engines makes them unreachable in practice; the checks exist so tests and
//! the runtime can prove it.
//!
//! 1. **Risk matches world state** - `critical` risk only for a confirmed fall state
//! 2. **Buffer cleared only by a cycle** - events are dropped iff a cycle ran
//! 3. **Single duration confirmation** - one `CONFIRMED_FALL_BY_DURATION` per floor episode
//! 4. **Skipped arbiter preserves decision** - `skipped` implies an unchanged outcome
//! 5. **Passive decisions never notify** - `IGNORE`/`MONITOR` never send a message

use std::fmt;

use crate::{Action, ArbiterResult, PolicyResult, RiskLevel, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Invariant {
    RiskMatchesWorldState = 1,
    BufferClearedOnlyByCycle = 2,
    SingleDurationConfirmation = 3,
    SkippedArbiterPreservesDecision = 4,
    PassiveDecisionsNeverNotify = 5,
}

impl Invariant {
    pub fn code(&self) -> &'static str {
        match self {
            Invariant::RiskMatchesWorldState => "FW-1",
            Invariant::BufferClearedOnlyByCycle => "FW-2",
            Invariant::SingleDurationConfirmation => "FW-3",
            Invariant::SkippedArbiterPreservesDecision => "FW-4",
            Invariant::PassiveDecisionsNeverNotify => "FW-5",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Invariant::RiskMatchesWorldState => "Risk Matches World State",
            Invariant::BufferClearedOnlyByCycle => "Buffer Cleared Only By Cycle",
            Invariant::SingleDurationConfirmation => "Single Duration Confirmation",
            Invariant::SkippedArbiterPreservesDecision => "Skipped Arbiter Preserves Decision",
            Invariant::PassiveDecisionsNeverNotify => "Passive Decisions Never Notify",
        }
    }
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.name())
    }
}

/// Invariant violation error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    pub invariant: Invariant,
    pub context: String,
}

impl InvariantViolation {
    pub fn new(invariant: Invariant, context: impl Into<String>) -> Self {
        InvariantViolation {
            invariant,
            context: context.into(),
        }
    }
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invariant violation: {} - {}", self.invariant, self.context)
    }
}

impl std::error::Error for InvariantViolation {}

pub fn check_snapshot(snapshot: &Snapshot) -> Result<(), InvariantViolation> {
    if snapshot.risk_level == RiskLevel::Critical && !snapshot.world_state.is_confirmed() {
        return Err(InvariantViolation::new(
            Invariant::RiskMatchesWorldState,
            format!(
                "snapshot {} is critical with world state {}",
                snapshot.id, snapshot.world_state
            ),
        ));
    }
    Ok(())
}

pub fn check_buffer_clear(cycle_ran: bool, cleared: bool) -> Result<(), InvariantViolation> {
    if cycle_ran != cleared {
        return Err(InvariantViolation::new(
            Invariant::BufferClearedOnlyByCycle,
            format!("cycle_ran={} cleared={}", cycle_ran, cleared),
        ));
    }
    Ok(())
}

pub fn check_duration_confirmations(emitted_in_episode: usize) -> Result<(), InvariantViolation> {
    if emitted_in_episode > 1 {
        return Err(InvariantViolation::new(
            Invariant::SingleDurationConfirmation,
            format!("{} confirmations in one floor episode", emitted_in_episode),
        ));
    }
    Ok(())
}

pub fn check_arbiter(original: Action, result: &ArbiterResult) -> Result<(), InvariantViolation> {
    if result.is_skipped() && result.final_decision != original {
        return Err(InvariantViolation::new(
            Invariant::SkippedArbiterPreservesDecision,
            format!(
                "skipped arbiter changed {} into {}",
                original, result.final_decision
            ),
        ));
    }
    Ok(())
}

pub fn check_policy(decision: Action, policy: &PolicyResult) -> Result<(), InvariantViolation> {
    if decision.is_passive() && policy.is_send() {
        return Err(InvariantViolation::new(
            Invariant::PassiveDecisionsNeverNotify,
            format!("policy authorised a message for {}", decision),
        ));
    }
    Ok(())
}
