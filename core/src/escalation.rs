//! Fraud escalation chain.
//!
//! inactive → stage 1 → stage 2 → stage 3 → terminal
//!                 └────────┴────────┴──→ resolved (matching report)
//!
//! RULES:
//!   - The chain starts when a merged patch leaves the player having
//!     fallen for a scam of a chain-starting type. Stage 1 is due next
//!     month, never the current one.
//!   - One chain at a time: a new scam while a chain runs restarts it.
//!   - Each accepted commit of a month >= the start month debits the
//!     current stage's transaction, then moves the chain one stage on.
//!     Past stage 3 the chain is terminal.
//!   - A report resolves the chain only on an exact merchant and amount
//!     match. Resolution never refunds anything.
//!   - The enum is the source of truth. The `fraud_*` flags are a mirror
//!     kept in step by `sync_flags` so catalog triggers can read it.

use crate::{
    config::{EngineConfig, FraudConfig, StageTransaction},
    event::EngineEvent,
    flags::{keys, FlagStore},
    state::EngineState,
    subsystem::MonthEndSubsystem,
    types::Month,
};
use serde::{Deserialize, Serialize};

pub const FINAL_STAGE: u8 = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EscalationState {
    #[default]
    Inactive,
    Active { stage: u8, start_month: Month },
    Resolved { stage: u8, start_month: Month, resolved_month: Month },
    Terminal { start_month: Month },
}

impl EscalationState {
    pub fn stage(&self) -> Option<u8> {
        match self {
            Self::Active { stage, .. } | Self::Resolved { stage, .. } => Some(*stage),
            Self::Terminal { .. } => Some(FINAL_STAGE),
            Self::Inactive => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    /// The transaction an active chain charges when `month` is committed.
    pub fn current_debit<'c>(&self, month: Month, fraud: &'c FraudConfig) -> Option<&'c StageTransaction> {
        match *self {
            Self::Active { stage, start_month } if month >= start_month => fraud.transaction(stage),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Inactive      => "inactive",
            Self::Active { .. } => "active",
            Self::Resolved { .. } => "resolved",
            Self::Terminal { .. } => "terminal",
        }
    }
}

/// Result of a fraud report.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    /// No chain is due yet. Nothing happens.
    NotActive,
    Mismatch,
    Resolved { stage: u8 },
}

/// True when the flags say the player just fell for a chain-starting scam.
pub fn scam_triggered(flags: &FlagStore, fraud: &FraudConfig) -> bool {
    if !flags.is_true(keys::scam::FELL_FOR_IT) {
        return false;
    }
    let typed = flags
        .as_str(keys::scam::TYPE)
        .map(|t| fraud.scam_types.iter().any(|s| s.eq_ignore_ascii_case(t.trim())))
        .unwrap_or(false);
    typed || flags.is_true(keys::scam::ENTERED_DETAILS)
}

/// Start (or restart) the chain from `month`. Stage 1 is due at `month + 1`.
pub fn start_chain(state: &mut EngineState, month: Month) -> EngineEvent {
    let restarted = state.fraud.is_active();
    for key in [
        keys::fraud::ACTIVE,
        keys::fraud::STAGE,
        keys::fraud::START_MONTH,
        keys::fraud::REPORTED,
        keys::fraud::RESOLVED,
        keys::fraud::GAME_OVER,
        keys::scam::BANK_WARNING_SENT,
        keys::scam::SMISHING_TIPS_SENT,
    ] {
        state.flags.remove(key);
    }

    let start_month = month.saturating_add(1);
    state.fraud = EscalationState::Active { stage: 1, start_month };
    // One-shot: the same fall must not start a second chain.
    state.flags.set(keys::scam::FELL_FOR_IT, false);
    state.flags.set(keys::scam::FELL_MONTH, month);
    sync_flags(&mut state.flags, &state.fraud);

    let scam_type = state.flags.as_str(keys::scam::TYPE).map(str::to_string);
    log::info!("month={month} fraud chain started stage=1 due={start_month} restarted={restarted}");
    EngineEvent::FraudChainStarted { month, start_month, scam_type, restarted }
}

/// Move an active chain on by one committed month.
pub fn advance(state: &mut EngineState, finishing: Month) -> Option<EngineEvent> {
    let EscalationState::Active { stage, start_month } = state.fraud else {
        return None;
    };
    if finishing < start_month {
        return None;
    }

    let event = if stage < FINAL_STAGE {
        let stage = stage + 1;
        state.fraud = EscalationState::Active { stage, start_month };
        log::info!("month={finishing} fraud chain advanced to stage={stage}");
        EngineEvent::FraudChainAdvanced { month: finishing, stage }
    } else {
        state.fraud = EscalationState::Terminal { start_month };
        log::info!("month={finishing} fraud chain unresolved past final stage");
        EngineEvent::FraudChainTerminal { month: finishing, start_month }
    };
    sync_flags(&mut state.flags, &state.fraud);
    Some(event)
}

/// Check a report against the current stage's transaction.
pub fn report(
    state: &mut EngineState,
    merchant: &str,
    amount: f64,
    month: Month,
    fraud: &FraudConfig,
) -> ReportOutcome {
    let EscalationState::Active { stage, start_month } = state.fraud else {
        return ReportOutcome::NotActive;
    };
    if month < start_month {
        return ReportOutcome::NotActive;
    }
    let Some(expected) = fraud.transaction(stage) else {
        return ReportOutcome::Mismatch;
    };

    let name_ok = merchant.trim().to_lowercase() == expected.merchant.trim().to_lowercase();
    let amount_ok = amount.is_finite() && (amount - expected.amount).abs() <= fraud.report_epsilon;
    if !(name_ok && amount_ok) {
        log::debug!("month={month} fraud report mismatch stage={stage}");
        return ReportOutcome::Mismatch;
    }

    state.fraud = EscalationState::Resolved { stage, start_month, resolved_month: month };
    sync_flags(&mut state.flags, &state.fraud);
    log::info!("month={month} fraud chain resolved at stage={stage}");
    ReportOutcome::Resolved { stage }
}

/// Mirror the chain into the `fraud_*` flags.
pub fn sync_flags(flags: &mut FlagStore, fraud: &EscalationState) {
    match *fraud {
        EscalationState::Inactive => {}
        EscalationState::Active { stage, start_month } => {
            flags.set(keys::fraud::ACTIVE, true);
            flags.set(keys::fraud::STAGE, stage as i64);
            flags.set(keys::fraud::START_MONTH, start_month);
        }
        EscalationState::Resolved { stage, start_month, .. } => {
            flags.set(keys::fraud::ACTIVE, false);
            flags.set(keys::fraud::STAGE, stage as i64);
            flags.set(keys::fraud::START_MONTH, start_month);
            flags.set(keys::fraud::REPORTED, true);
            flags.set(keys::fraud::RESOLVED, true);
        }
        EscalationState::Terminal { start_month } => {
            flags.set(keys::fraud::ACTIVE, false);
            flags.set(keys::fraud::STAGE, FINAL_STAGE as i64);
            flags.set(keys::fraud::START_MONTH, start_month);
            flags.set(keys::fraud::GAME_OVER, true);
        }
    }
}

pub struct EscalationSubsystem;

impl MonthEndSubsystem for EscalationSubsystem {
    fn name(&self) -> &'static str { "escalation" }

    fn on_month_end(
        &self,
        state: &mut EngineState,
        finishing: Month,
        _next: Month,
        config: &EngineConfig,
    ) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        if let (Some(stage), Some(txn)) =
            (state.fraud.stage(), state.fraud.current_debit(finishing, &config.fraud))
        {
            state.meters.money -= txn.amount;
            log::info!("month={finishing} fraud debit stage={stage} merchant={} amount={:.2}", txn.merchant, txn.amount);
            events.push(EngineEvent::FraudDebited {
                month:    finishing,
                stage,
                merchant: txn.merchant.clone(),
                amount:   -txn.amount,
            });
        }
        events.extend(advance(state, finishing));
        events
    }
}
