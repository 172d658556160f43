//! Support offers through the command surface.
//!
//! A check-up taken while short of money and low in spirits opens a food
//! bank window and starts counselling. Counselling lifts wellbeing at every
//! month end from the next month. An accepted job sets the wage that
//! replaces lifestyle income from the month after.

use lifesim_core::{
    catalog::{Catalog, Choice, Scenario},
    command::{Command, Outcome},
    config::EngineConfig,
    engine::{SimEngine, Transition},
    event::EngineEvent,
    flags::{keys, FlagPatch, FlagValue},
    state::EngineState,
    support::{self, SupportAction, SupportKind},
    trigger::{Cmp, Trigger},
    types::{Channel, Effects, Lifestyle},
};

fn commit(engine: &mut SimEngine, state: &EngineState, totals: Effects) -> Transition {
    let t = engine.apply(state, Command::CommitMonth { totals, from_month: state.month() });
    assert_eq!(t.outcome, Outcome::Applied, "commit of month {} failed", state.month());
    t
}

fn choose(engine: &mut SimEngine, state: &EngineState, message_id: &str, option_id: &str) -> Transition {
    let t = engine.apply(state, Command::ChooseOption {
        channel:    Channel::Inbox,
        message_id: message_id.to_string(),
        option_id:  option_id.to_string(),
    });
    assert!(t.is_applied(), "{message_id}/{option_id} was {:?}", t.outcome);
    t
}

fn merge(engine: &mut SimEngine, state: &EngineState, pairs: &[(&str, FlagValue)]) -> EngineState {
    let patch: FlagPatch = pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
    let t = engine.apply(state, Command::MergeFlags { patch });
    assert!(t.is_applied());
    t.state
}

/// Test 1: a check-up in month 5 at low money and wellbeing grants both
/// offers, judged before the visit's own +1 lands.
#[test]
fn check_up_grants_foodbank_and_counselling() {
    let catalog = Catalog::from_scenarios(vec![Scenario::new("gp-checkup-m5", Channel::Inbox)
        .with_trigger(Trigger::Month { cmp: Cmp::Eq, value: 5 })
        .with_choice(
            Choice::new("gp-go")
                .with_effects(Effects::new(0.0, 1, 1))
                .with_support(SupportAction::GpCheckup),
        )
        .with_choice(Choice::new("gp-skip").with_effects(Effects::new(0.0, -1, -1)))])
    .expect("catalog");
    let mut engine = SimEngine::build(catalog, EngineConfig::default()).with_chat_seed(17);

    let s0 = engine.initial_state();
    let mut state = engine.apply(&s0, Command::SeedMessagesIfEmpty).state;
    for _ in 0..5 {
        state = commit(&mut engine, &state, Effects::new(-50.0, 0, -12)).state;
    }
    assert_eq!(state.month(), 5);
    assert_eq!(state.meters.wellbeing, 10);

    let went = choose(&mut engine, &state, "gp-checkup-m5@m5", "gp-go");
    let granted: Vec<SupportKind> = went
        .events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::SupportGranted { support, start_month: 6, .. } => Some(*support),
            _ => None,
        })
        .collect();
    assert_eq!(granted, vec![SupportKind::FoodbankVoucher, SupportKind::Counselling]);
    assert_eq!(went.state.meters.wellbeing, 11);
    assert!(!support::foodbank_active(&went.state.flags, 5));
    assert!(support::foodbank_active(&went.state.flags, 8));

    let s6 = commit(&mut engine, &went.state, Effects::ZERO);
    assert_eq!(s6.state.meters.wellbeing, 16);
    assert!(s6
        .events
        .iter()
        .any(|e| matches!(e, EngineEvent::CounsellingSession { month: 6, wellbeing: 5 })));
    assert_eq!(s6.state.history.get(6).map(|m| m.wellbeing), Some(16));

    let s7 = commit(&mut engine, &s6.state, Effects::new(0.0, 0, -2)).state;
    assert_eq!(s7.meters.wellbeing, 19);
}

/// Test 2: a comfortable player gets nothing from the same visit.
#[test]
fn comfortable_check_up_grants_nothing() {
    let mut engine = SimEngine::builtin().expect("builtin engine").with_chat_seed(2);
    let s0 = engine.initial_state();
    let mut state = engine.apply(&s0, Command::SeedMessagesIfEmpty).state;
    for _ in 0..5 {
        state = commit(&mut engine, &state, Effects::new(200.0, 0, 0)).state;
    }
    assert!(state.message(Channel::Inbox, "gp-checkup-m5@m5").is_some());

    let went = choose(&mut engine, &state, "gp-checkup-m5@m5", "gp-go");
    assert!(!went.events.iter().any(|e| matches!(e, EngineEvent::SupportGranted { .. })));
    assert!(!went.state.flags.contains(keys::support::COUNSELLING_ACTIVE));
    assert!(!went.state.flags.contains(keys::support::FOODBANK_START));
}

/// Test 3: the agency letter, the interview and the offer follow the
/// application month, and accepting sets next month's wage.
#[test]
fn job_offer_sets_the_new_wage() {
    let mut engine = SimEngine::builtin().expect("builtin engine").with_chat_seed(4);
    let s0 = engine.initial_state();
    let s0 = engine.apply(&s0, Command::SetLifestyle { lifestyle: Lifestyle::PartTime }).state;
    let mut state = engine.apply(&s0, Command::SeedMessagesIfEmpty).state;
    for _ in 0..4 {
        state = commit(&mut engine, &state, Effects::new(100.0, 0, 0)).state;
    }
    assert!(state.message(Channel::Inbox, "jobs-agency-new-listings-m4@m4").is_some());

    let opened = choose(&mut engine, &state, "jobs-agency-new-listings-m4@m4", "open-job-board");
    assert!(opened.state.flags.is_true(keys::job::BOARD_OPEN));
    let applied = merge(&mut engine, &opened.state, &[
        (keys::job::BOARD_OPEN, false.into()),
        (keys::job::APPLICATION_ACTIVE, true.into()),
        (keys::job::APPLIED_MONTH, 4u32.into()),
        (keys::job::PAY_PER_HOUR, 12.5f64.into()),
        (keys::job::HOURS_PER_WEEK, 20u32.into()),
    ]);

    let m5 = commit(&mut engine, &applied, Effects::ZERO).state;
    assert!(m5.message(Channel::Inbox, "work-interview-invite-job@m5").is_some());
    let dressed = choose(&mut engine, &m5, "work-interview-invite-job@m5", "buy-interview-clothes").state;
    let dressed = merge(&mut engine, &dressed, &[(keys::job::OUTFIT_DONE, true.into())]);

    let m6 = commit(&mut engine, &dressed, Effects::ZERO).state;
    assert!(m6.message(Channel::Inbox, "work-job-offer@m6").is_some());
    let accepted = choose(&mut engine, &m6, "work-job-offer@m6", "accept-job");
    assert!(accepted.events.iter().any(|e| matches!(
        e,
        EngineEvent::JobAccepted { month: 6, start_month: 7, .. }
    )));
    assert!(!accepted.state.flags.is_true(keys::job::APPLICATION_ACTIVE));
    assert_eq!(support::job_income(&accepted.state.flags, 6), None);
    assert_eq!(support::job_income(&accepted.state.flags, 7), Some(1125.0));

    let m7 = commit(&mut engine, &accepted.state, Effects::ZERO).state;
    assert!(m7.message(Channel::Inbox, "work-job-offer@m7").is_none());
}
