//! The state engine: the single transition function.
//!
//! MONTH-END ORDER (fixed, documented, never reordered):
//!   1. Escalation subsystem  (fraud debit, chain advancement)
//!   2. Benefit subsystem     (periodic income)
//!   3. Counselling subsystem (monthly wellbeing boost)
//!
//! RULES:
//!   - `apply` is the only way state changes. It works on a private copy
//!     and hands back a new state; the input is never touched.
//!   - A command either applies fully or is rejected with a `Rejection`.
//!     A rejected transition returns the input state unchanged.
//!   - All randomness flows through `SelectionRng`.
//!   - Persistence happens outside, in session.rs, after the fact.

use crate::{
    benefits::BenefitSubsystem,
    catalog::Catalog,
    command::{Command, Notice, Outcome, Rejection},
    commit,
    config::EngineConfig,
    effects,
    error::SimResult,
    escalation::{self, EscalationSubsystem, ReportOutcome},
    event::EngineEvent,
    flags::{keys, FlagSchema},
    forms,
    rng::SelectionRng,
    state::{Contracts, EngineState},
    subsystem::MonthEndSubsystem,
    support::CounsellingSubsystem,
};

/// Read-only inputs every handler consults.
pub struct Rules<'a> {
    pub catalog: &'a Catalog,
    pub schema:  &'a FlagSchema,
    pub config:  &'a EngineConfig,
}

/// What `apply` returns.
#[derive(Debug, Clone)]
pub struct Transition {
    pub state:   EngineState,
    pub events:  Vec<EngineEvent>,
    pub notices: Vec<Notice>,
    pub outcome: Outcome,
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        self.outcome == Outcome::Applied
    }
}

pub struct SimEngine {
    catalog:    Catalog,
    schema:     FlagSchema,
    config:     EngineConfig,
    chat_rng:   SelectionRng,
    subsystems: Vec<Box<dyn MonthEndSubsystem>>,
}

impl SimEngine {
    pub fn new(catalog: Catalog, config: EngineConfig) -> Self {
        Self {
            catalog,
            schema: FlagSchema::standard(),
            config,
            chat_rng: SelectionRng::from_entropy().with_name("chat"),
            subsystems: Vec::new(),
        }
    }

    /// Build a fully wired engine with all month-end subsystems registered.
    pub fn build(catalog: Catalog, config: EngineConfig) -> Self {
        let mut engine = SimEngine::new(catalog, config);
        // MONTH-END ORDER: fixed, never reordered.
        engine.register(Box::new(EscalationSubsystem));
        engine.register(Box::new(BenefitSubsystem));
        engine.register(Box::new(CounsellingSubsystem));
        engine
    }

    /// The built-in catalog with the default configuration.
    pub fn builtin() -> SimResult<Self> {
        Ok(Self::build(Catalog::builtin()?, EngineConfig::default()))
    }

    /// Catalog and configuration from `data_dir`.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let catalog = Catalog::load(data_dir)?;
        let config = EngineConfig::load(data_dir)?;
        Ok(Self::build(catalog, config))
    }

    /// Make chat selection reproducible.
    pub fn with_chat_seed(mut self, seed: u64) -> Self {
        self.chat_rng = SelectionRng::seeded(seed).with_name("chat");
        self
    }

    pub fn register(&mut self, subsystem: Box<dyn MonthEndSubsystem>) {
        self.subsystems.push(subsystem);
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn initial_state(&self) -> EngineState {
        EngineState::new(&self.config)
    }

    /// Apply one command to `state`.
    pub fn apply(&mut self, state: &EngineState, command: Command) -> Transition {
        let name = command.name();
        let mut next = state.clone();

        match self.dispatch(&mut next, command) {
            Ok(events) if events.is_empty() => Transition {
                state:   state.clone(),
                events,
                notices: Vec::new(),
                outcome: Outcome::Unchanged,
            },
            Ok(events) => {
                next.revision = state.revision + 1;
                let notices = events.iter().filter_map(notice_for).collect();
                log::debug!("month={} {name} applied events={}", next.month(), events.len());
                Transition { state: next, events, notices, outcome: Outcome::Applied }
            }
            Err(rejection) => {
                log::warn!("month={} {name} rejected: {rejection}", state.month());
                Transition {
                    state:   state.clone(),
                    events:  Vec::new(),
                    notices: rejection.notice().into_iter().collect(),
                    outcome: Outcome::Rejected(rejection),
                }
            }
        }
    }

    fn dispatch(&mut self, state: &mut EngineState, command: Command) -> Result<Vec<EngineEvent>, Rejection> {
        let Self { catalog, schema, config, chat_rng, subsystems } = self;
        let rules = Rules { catalog: &*catalog, schema: &*schema, config: &*config };
        let month = state.month();

        match command {
            Command::SetLifestyle { lifestyle } => {
                match state.lifestyle {
                    Some(current) if current == lifestyle => return Ok(Vec::new()),
                    Some(_) => return Err(Rejection::LifestyleLocked),
                    None if month != 0 => return Err(Rejection::LifestyleLocked),
                    None => {}
                }
                state.lifestyle = Some(lifestyle);
                Ok(vec![EngineEvent::LifestyleSet { lifestyle }])
            }

            Command::LockContracts { housing, phone, broadband } => {
                if state.contracts.is_some() || month != 0 {
                    return Err(Rejection::ContractsLocked);
                }
                let rent = config.rent_for(&housing);
                if let Some(rent) = rent {
                    state.flags.set(keys::housing::RENT_MONTHLY, rent);
                }
                state.contracts = Some(Contracts {
                    housing: housing.clone(),
                    phone: phone.clone(),
                    broadband: broadband.clone(),
                });
                Ok(vec![EngineEvent::ContractsLocked { housing, phone, broadband, rent }])
            }

            Command::SeedMessagesIfEmpty => Ok(commit::seed_current_month(state, &rules, chat_rng)),

            Command::MarkMessageRead { channel, message_id } => {
                effects::mark_read(state, channel, &message_id)
            }

            Command::SelectDraftOption { channel, message_id, option_id } => {
                effects::select_draft(state, &rules, channel, &message_id, &option_id)
            }

            Command::SendDraft { channel, message_id } => {
                effects::send_draft(state, &rules, channel, &message_id)
            }

            Command::ChooseOption { channel, message_id, option_id } => {
                effects::choose_option(state, &rules, channel, &message_id, &option_id)
            }

            Command::SubmitSpecialForm { form } => forms::submit(state, catalog, &form),

            Command::ReportFraud { merchant, amount } => {
                match escalation::report(state, &merchant, amount, month, &config.fraud) {
                    ReportOutcome::NotActive => Err(Rejection::FraudNotActive),
                    ReportOutcome::Mismatch  => Err(Rejection::ReportMismatch),
                    ReportOutcome::Resolved { stage } => {
                        Ok(vec![EngineEvent::FraudReported { month, stage, merchant, amount }])
                    }
                }
            }

            Command::MergeFlags { patch } => effects::apply_patch(state, &rules, &patch, month),

            Command::SetPendingChoice { key, value } => {
                if state.pending_choices.get(&key) == Some(&value) {
                    return Ok(Vec::new());
                }
                state.pending_choices.insert(key.clone(), value.clone());
                Ok(vec![EngineEvent::PendingChoiceSet { month, key, value }])
            }

            Command::CommitMonth { totals, from_month } => {
                commit::commit_month(state, &rules, subsystems, chat_rng, totals, from_month)
            }

            Command::Reset => {
                let revision = state.revision;
                *state = EngineState::new(config);
                state.revision = revision;
                log::info!("session reset at revision={revision}");
                Ok(vec![EngineEvent::SessionReset { revision }])
            }
        }
    }
}

fn notice_for(event: &EngineEvent) -> Option<Notice> {
    match event {
        EngineEvent::FraudReported { .. }      => Some(Notice::FraudReported),
        EngineEvent::FraudChainTerminal { .. } => Some(Notice::FraudGameOver),
        _ => None,
    }
}
