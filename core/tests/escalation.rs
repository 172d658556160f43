//! Fraud escalation chain driven through the command surface.
//!
//! A scam taken in month 3 puts stage 1 in month 4, stage 2 in month 5,
//! stage 3 in month 6 and goes terminal on the next commit. Every active
//! month is charged its stage's transaction. A matching report stops it.
//! A wrong report changes nothing.

use lifesim_core::{
    catalog::{Catalog, Choice, Scenario},
    command::{Command, Notice, Outcome, Rejection},
    config::EngineConfig,
    engine::{SimEngine, Transition},
    escalation::EscalationState,
    event::EngineEvent,
    flags::{keys, FlagPatch, FlagValue},
    state::EngineState,
    trigger::{Cmp, Trigger},
    types::{Channel, Effects},
};

fn engine() -> SimEngine {
    let catalog = Catalog::from_scenarios(vec![
        Scenario::new("parcel-text", Channel::Chat)
            .with_trigger(Trigger::Month { cmp: Cmp::Eq, value: 3 })
            .with_choice(
                Choice::new("pay-fee")
                    .with_effects(Effects::new(-2.99, 0, -5))
                    .with_flag(keys::scam::FELL_FOR_IT, true)
                    .with_flag(keys::scam::TYPE, "parcel"),
            )
            .with_choice(Choice::new("delete")),
    ])
    .expect("catalog");
    SimEngine::build(catalog, EngineConfig::default()).with_chat_seed(99)
}

fn commit(engine: &mut SimEngine, state: &EngineState) -> Transition {
    let t = engine.apply(state, Command::CommitMonth { totals: Effects::ZERO, from_month: state.month() });
    assert!(t.is_applied(), "commit of month {} was {:?}", state.month(), t.outcome);
    t
}

/// Play to month 3 and fall for the parcel scam.
fn scammed_in_month_3(engine: &mut SimEngine) -> EngineState {
    let s0 = engine.initial_state();
    let mut state = engine.apply(&s0, Command::SeedMessagesIfEmpty).state;
    for _ in 0..3 {
        state = commit(engine, &state).state;
    }
    assert_eq!(state.month(), 3);

    let id = "parcel-text@m3".to_string();
    assert!(state.message(Channel::Chat, &id).is_some());
    let drafted = engine.apply(&state, Command::SelectDraftOption {
        channel:    Channel::Chat,
        message_id: id.clone(),
        option_id:  "pay-fee".to_string(),
    });
    let sent = engine.apply(&drafted.state, Command::SendDraft { channel: Channel::Chat, message_id: id });
    assert!(sent.is_applied());
    assert!(sent
        .events
        .iter()
        .any(|e| matches!(e, EngineEvent::FraudChainStarted { month: 3, start_month: 4, .. })));
    sent.state
}

/// Test 1: unreported, the chain climbs one stage per commit from month 4
/// and goes terminal after stage 3.
#[test]
fn unreported_chain_runs_to_terminal() {
    let mut engine = engine();
    let s3 = scammed_in_month_3(&mut engine);
    assert_eq!(s3.fraud, EscalationState::Active { stage: 1, start_month: 4 });
    assert!(!s3.flags.is_true(keys::scam::FELL_FOR_IT));

    let t4 = commit(&mut engine, &s3);
    let s4 = t4.state;
    assert_eq!(s4.month(), 4);
    assert_eq!(s4.fraud.stage(), Some(1));
    assert_eq!(s4.meters.money, s3.meters.money, "nothing is charged before the start month");
    assert!(!t4.events.iter().any(|e| matches!(e, EngineEvent::FraudDebited { .. })));

    let s5 = commit(&mut engine, &s4).state;
    assert_eq!(s5.fraud.stage(), Some(2));
    assert_eq!(s5.flags.as_i64(keys::fraud::STAGE), Some(2));
    assert!((s4.meters.money - s5.meters.money - 0.45).abs() < 1e-9);

    let s6 = commit(&mut engine, &s5).state;
    assert_eq!(s6.fraud.stage(), Some(3));
    assert!(s6.fraud.is_active());
    assert!((s5.meters.money - s6.meters.money - 59.99).abs() < 1e-9);

    let t7 = commit(&mut engine, &s6);
    assert_eq!(t7.state.fraud, EscalationState::Terminal { start_month: 4 });
    assert_eq!(t7.notices, vec![Notice::FraudGameOver]);
    assert!(t7.state.flags.is_true(keys::fraud::GAME_OVER));
    assert!((s6.meters.money - t7.state.meters.money - 2500.0).abs() < 1e-9);
    assert!(t7.events.iter().any(|e| matches!(
        e,
        EngineEvent::FraudDebited { month: 6, stage: 3, .. }
    )));

    let t8 = commit(&mut engine, &t7.state);
    assert_eq!(t8.state.fraud, t7.state.fraud);
    assert!(t8.notices.is_empty());
    assert_eq!(t8.state.meters.money, t7.state.meters.money);
}

/// Test 2: a matching report at stage 2 resolves the chain for good.
#[test]
fn matching_report_resolves_and_halts() {
    let mut engine = engine();
    let s3 = scammed_in_month_3(&mut engine);
    let s4 = commit(&mut engine, &s3).state;
    let s5 = commit(&mut engine, &s4).state;
    assert_eq!(s5.fraud.stage(), Some(2));
    let money_before = s5.meters.money;

    let t = engine.apply(&s5, Command::ReportFraud {
        merchant: "sports direct".to_string(),
        amount:   59.99,
    });
    assert!(t.is_applied());
    assert_eq!(t.notices, vec![Notice::FraudReported]);
    assert_eq!(
        t.state.fraud,
        EscalationState::Resolved { stage: 2, start_month: 4, resolved_month: 5 }
    );
    assert_eq!(t.state.meters.money, money_before, "resolution never refunds");

    let resolved_money = t.state.meters.money;
    let mut state = t.state;
    for _ in 0..3 {
        state = commit(&mut engine, &state).state;
    }
    assert!(matches!(state.fraud, EscalationState::Resolved { stage: 2, .. }));
    assert!(state.flags.is_true(keys::fraud::RESOLVED));
    assert_eq!(state.meters.money, resolved_money, "a resolved chain charges nothing more");
}

/// Test 3: a wrong merchant or amount yields the mismatch notice and
/// leaves the state untouched.
#[test]
fn mismatched_report_changes_nothing() {
    let mut engine = engine();
    let s3 = scammed_in_month_3(&mut engine);
    let s4 = commit(&mut engine, &s3).state;

    for (merchant, amount) in [("Apple Pay", 1.00), ("Sports Direct", 0.45), ("", 0.45)] {
        let t = engine.apply(&s4, Command::ReportFraud { merchant: merchant.to_string(), amount });
        assert_eq!(t.outcome, Outcome::Rejected(Rejection::ReportMismatch));
        assert_eq!(t.notices, vec![Notice::FraudReportMismatch]);
        assert_eq!(t.state, s4);
    }
}

/// Test 4: before the start month (and with no chain at all) a report is
/// ignored without a notice.
#[test]
fn report_before_the_chain_is_due_is_silent() {
    let mut engine = engine();
    let s0 = engine.initial_state();
    let t = engine.apply(&s0, Command::ReportFraud { merchant: "Apple Pay".to_string(), amount: 0.45 });
    assert_eq!(t.outcome, Outcome::Rejected(Rejection::FraudNotActive));
    assert!(t.notices.is_empty());

    let s3 = scammed_in_month_3(&mut engine);
    let t = engine.apply(&s3, Command::ReportFraud { merchant: "Apple Pay".to_string(), amount: 0.45 });
    assert_eq!(t.outcome, Outcome::Rejected(Rejection::FraudNotActive));
    assert!(t.notices.is_empty());
    assert!(t.state.fraud.is_active());
}

/// Test 5: a plain flag merge can start the chain too, and a second scam
/// while one runs restarts it.
#[test]
fn merged_flags_start_and_restart_the_chain() {
    let mut engine = engine();
    let s0 = engine.initial_state();
    let fell = || {
        FlagPatch::from([
            (keys::scam::FELL_FOR_IT.to_string(), FlagValue::from(true)),
            (keys::scam::ENTERED_DETAILS.to_string(), FlagValue::from(true)),
        ])
    };

    let t = engine.apply(&s0, Command::MergeFlags { patch: fell() });
    assert!(t.is_applied());
    assert_eq!(t.state.fraud, EscalationState::Active { stage: 1, start_month: 1 });

    let s1 = commit(&mut engine, &t.state).state;
    let s2 = commit(&mut engine, &s1).state;
    assert_eq!(s2.fraud.stage(), Some(2));

    let t = engine.apply(&s2, Command::MergeFlags { patch: fell() });
    assert!(t
        .events
        .iter()
        .any(|e| matches!(e, EngineEvent::FraudChainStarted { restarted: true, .. })));
    assert_eq!(t.state.fraud, EscalationState::Active { stage: 1, start_month: 3 });
}

/// Test 6: the fraud flags only mirror the chain. A merge that tries to
/// write them is refused whole, and seeding afterwards is unaffected.
#[test]
fn merged_patch_cannot_forge_the_chain() {
    let mut engine = engine();
    let s0 = engine.initial_state();
    let forged = FlagPatch::from([
        (keys::fraud::ACTIVE.to_string(), FlagValue::from(true)),
        (keys::fraud::STAGE.to_string(), FlagValue::from(2i64)),
        (keys::fraud::START_MONTH.to_string(), FlagValue::from(i64::MAX)),
        ("gymMembership".to_string(), FlagValue::from(true)),
    ]);

    let t = engine.apply(&s0, Command::MergeFlags { patch: forged });
    assert_eq!(t.outcome, Outcome::Rejected(Rejection::InvalidFlags));
    assert_eq!(t.state, s0);
    assert_eq!(t.state.fraud, EscalationState::Inactive);
    assert!(!t.state.flags.contains(keys::fraud::ACTIVE));
    assert!(!t.state.flags.contains("gymMembership"));

    let seeded = engine.apply(&t.state, Command::SeedMessagesIfEmpty);
    assert!(seeded.is_applied());
    let t = engine.apply(&seeded.state, Command::ReportFraud { merchant: "Sports Direct".into(), amount: 59.99 });
    assert_eq!(t.outcome, Outcome::Rejected(Rejection::FraudNotActive));
}
