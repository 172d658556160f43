//! Transition events.
//!
//! RULE: Every observable change an applied command makes is described by
//! an EngineEvent. The session adapter appends them to the event log, in
//! order, after the transition has been accepted.

use crate::{
    benefits::BenefitStream,
    support::SupportKind,
    types::{Channel, Effects, Lifestyle, Meters, MessageId, Month, OptionId, ScenarioId, SessionId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    // ── Messages ───────────────────────────────────
    MessagesSeeded {
        month: Month,
        channel: Channel,
        message_ids: Vec<MessageId>,
    },
    MessageRead {
        month: Month,
        channel: Channel,
        message_id: MessageId,
    },
    DraftSelected {
        month: Month,
        message_id: MessageId,
        option_id: OptionId,
    },
    DraftSent {
        month: Month,
        message_id: MessageId,
        option_id: OptionId,
    },
    OptionChosen {
        month: Month,
        channel: Channel,
        message_id: MessageId,
        option_id: OptionId,
        delta: Effects,
    },
    FlagsMerged {
        month: Month,
        keys: Vec<String>,
    },
    FollowUpScheduled {
        month: Month,
        follow_up_id: ScenarioId,
        due_month: Month,
    },
    FollowUpWithdrawn {
        month: Month,
        follow_up_id: ScenarioId,
        due_month: Month,
    },

    // ── Fraud chain ────────────────────────────────
    FraudChainStarted {
        month: Month,
        start_month: Month,
        scam_type: Option<String>,
        restarted: bool,
    },
    FraudChainAdvanced {
        month: Month,
        stage: u8,
    },
    FraudChainTerminal {
        month: Month,
        start_month: Month,
    },
    /// The stage's statement transaction, charged at month end. `amount`
    /// is signed as it appears on the statement.
    FraudDebited {
        month: Month,
        stage: u8,
        merchant: String,
        amount: f64,
    },
    FraudReported {
        month: Month,
        stage: u8,
        merchant: String,
        amount: f64,
    },

    // ── Forms and benefits ─────────────────────────
    FormSubmitted {
        month: Month,
        form: String,
        outcome: String,
    },
    AwardGranted {
        month: Month,
        stream: BenefitStream,
        monthly_amount: f64,
        start_month: Month,
    },
    BenefitPaid {
        month: Month,
        stream: BenefitStream,
        amount: f64,
    },

    // ── Support ────────────────────────────────────
    SupportGranted {
        month: Month,
        support: SupportKind,
        start_month: Month,
        end_month: Option<Month>,
    },
    JobAccepted {
        month: Month,
        monthly_income: f64,
        start_month: Month,
    },
    CounsellingSession {
        month: Month,
        wellbeing: i32,
    },

    // ── Setup and pending choices ──────────────────
    LifestyleSet {
        lifestyle: Lifestyle,
    },
    ContractsLocked {
        housing: String,
        phone: String,
        broadband: String,
        rent: Option<f64>,
    },
    PendingChoiceSet {
        month: Month,
        key: String,
        value: String,
    },

    // ── Clock ──────────────────────────────────────
    MonthCommitted {
        from_month: Month,
        to_month: Month,
        totals: Effects,
        meters: Meters,
        complete: bool,
    },
    SessionReset {
        revision: u64,
    },
}

/// Stable name of an event variant, used for the event_type column.
pub fn event_type_name(event: &EngineEvent) -> &'static str {
    match event {
        EngineEvent::MessagesSeeded { .. }     => "messages_seeded",
        EngineEvent::MessageRead { .. }        => "message_read",
        EngineEvent::DraftSelected { .. }      => "draft_selected",
        EngineEvent::DraftSent { .. }          => "draft_sent",
        EngineEvent::OptionChosen { .. }       => "option_chosen",
        EngineEvent::FlagsMerged { .. }        => "flags_merged",
        EngineEvent::FollowUpScheduled { .. }  => "follow_up_scheduled",
        EngineEvent::FollowUpWithdrawn { .. }  => "follow_up_withdrawn",
        EngineEvent::FraudChainStarted { .. }  => "fraud_chain_started",
        EngineEvent::FraudChainAdvanced { .. } => "fraud_chain_advanced",
        EngineEvent::FraudChainTerminal { .. } => "fraud_chain_terminal",
        EngineEvent::FraudDebited { .. }       => "fraud_debited",
        EngineEvent::FraudReported { .. }      => "fraud_reported",
        EngineEvent::FormSubmitted { .. }      => "form_submitted",
        EngineEvent::AwardGranted { .. }       => "award_granted",
        EngineEvent::BenefitPaid { .. }        => "benefit_paid",
        EngineEvent::SupportGranted { .. }     => "support_granted",
        EngineEvent::JobAccepted { .. }        => "job_accepted",
        EngineEvent::CounsellingSession { .. } => "counselling_session",
        EngineEvent::LifestyleSet { .. }       => "lifestyle_set",
        EngineEvent::ContractsLocked { .. }    => "contracts_locked",
        EngineEvent::PendingChoiceSet { .. }   => "pending_choice_set",
        EngineEvent::MonthCommitted { .. }     => "month_committed",
        EngineEvent::SessionReset { .. }       => "session_reset",
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub session_id: SessionId,
    /// State revision produced by the transition that emitted the event.
    pub revision:   u64,
    /// Position within that transition.
    pub seq:        u32,
    pub month:      Month,
    pub event_type: String,
    pub payload:    String, // JSON-serialized EngineEvent
}
