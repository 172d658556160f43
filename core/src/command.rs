//! The command surface: the engine's only input.

use crate::{
    flags::FlagPatch,
    forms::SpecialForm,
    types::{Channel, Effects, Lifestyle, MessageId, Month, OptionId},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// All commands the transition function accepts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    // ── Setup (month 0) ───────────────────────────
    SetLifestyle {
        lifestyle: Lifestyle,
    },
    LockContracts {
        housing:   String,
        phone:     String,
        broadband: String,
    },

    // ── Messages ──────────────────────────────────
    SeedMessagesIfEmpty,
    MarkMessageRead {
        channel:    Channel,
        message_id: MessageId,
    },
    SelectDraftOption {
        channel:    Channel,
        message_id: MessageId,
        option_id:  OptionId,
    },
    SendDraft {
        channel:    Channel,
        message_id: MessageId,
    },
    ChooseOption {
        channel:    Channel,
        message_id: MessageId,
        option_id:  OptionId,
    },

    // ── Forms, fraud, flags ───────────────────────
    SubmitSpecialForm {
        form: SpecialForm,
    },
    ReportFraud {
        merchant: String,
        amount:   f64,
    },
    MergeFlags {
        patch: FlagPatch,
    },

    // ── Month end ─────────────────────────────────
    SetPendingChoice {
        key:   String,
        value: String,
    },
    CommitMonth {
        totals:     Effects,
        from_month: Month,
    },
    Reset,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetLifestyle { .. }      => "set_lifestyle",
            Self::LockContracts { .. }     => "lock_contracts",
            Self::SeedMessagesIfEmpty      => "seed_messages_if_empty",
            Self::MarkMessageRead { .. }   => "mark_message_read",
            Self::SelectDraftOption { .. } => "select_draft_option",
            Self::SendDraft { .. }         => "send_draft",
            Self::ChooseOption { .. }      => "choose_option",
            Self::SubmitSpecialForm { .. } => "submit_special_form",
            Self::ReportFraud { .. }       => "report_fraud",
            Self::MergeFlags { .. }        => "merge_flags",
            Self::SetPendingChoice { .. }  => "set_pending_choice",
            Self::CommitMonth { .. }       => "commit_month",
            Self::Reset                    => "reset",
        }
    }
}

/// Why a command left the state untouched.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    UnknownMessage,
    UnknownOption,
    WrongChannel,
    AlreadySent,
    NoDraft,
    StaleCommit,
    GameComplete,
    InvalidFlags,
    LifestyleLocked,
    ContractsLocked,
    FraudNotActive,
    ReportMismatch,
    FormAlreadySubmitted,
}

impl Rejection {
    /// The only rejection the player is told about.
    pub fn notice(&self) -> Option<Notice> {
        match self {
            Self::ReportMismatch => Some(Notice::FraudReportMismatch),
            _ => None,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UnknownMessage       => "unknown message",
            Self::UnknownOption        => "unknown option",
            Self::WrongChannel         => "wrong channel for this command",
            Self::AlreadySent          => "message already sent",
            Self::NoDraft              => "no draft selected",
            Self::StaleCommit          => "commit is for a different month",
            Self::GameComplete         => "final month already committed",
            Self::InvalidFlags         => "flag patch failed validation",
            Self::LifestyleLocked      => "lifestyle already chosen",
            Self::ContractsLocked      => "contracts already locked",
            Self::FraudNotActive       => "no fraud chain to report",
            Self::ReportMismatch       => "report does not match the transaction",
            Self::FormAlreadySubmitted => "form already submitted",
        };
        f.write_str(s)
    }
}

/// User-facing notification produced by a transition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    FraudReported,
    FraudReportMismatch,
    FraudGameOver,
}

impl Notice {
    pub fn text(&self) -> &'static str {
        match self {
            Self::FraudReported =>
                "Thanks, your bank has blocked the card and is investigating. Any refund is up to them.",
            Self::FraudReportMismatch =>
                "That doesn't match a suspicious transaction. Check the merchant name and amount on your statement.",
            Self::FraudGameOver =>
                "The fraud went unreported for too long and your account has been emptied.",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    /// Accepted, but nothing changed.
    Unchanged,
    Rejected(Rejection),
}
