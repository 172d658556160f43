//! Message selection.
//!
//! A (channel, month) pair is seeded once. Priority ids survive the cap.
//! Scheduled-only scenarios arrive only as follow-ups of a chosen option.

use lifesim_core::{
    catalog::{Catalog, Choice, Scenario},
    command::{Command, Outcome},
    config::EngineConfig,
    engine::{SimEngine, Transition},
    flags::{FlagPatch, FlagValue},
    forms::{FormQuality, SpecialForm},
    state::EngineState,
    types::{Channel, Effects, Lifestyle},
};

fn inbox(id: &str) -> Scenario {
    Scenario::new(id, Channel::Inbox).with_choice(Choice::new("ok"))
}

fn ids_for(state: &EngineState, channel: Channel, month: u32) -> Vec<String> {
    state
        .messages_for(channel, month)
        .map(|m| m.scenario_id.clone())
        .collect()
}

fn commit(engine: &mut SimEngine, state: &EngineState) -> Transition {
    let t = engine.apply(state, Command::CommitMonth { totals: Effects::ZERO, from_month: state.month() });
    assert_eq!(t.outcome, Outcome::Applied, "commit of month {} failed", state.month());
    t
}

/// Test 1: a second seed of the same month changes nothing, even when the
/// flags have moved in between.
#[test]
fn seeding_is_idempotent_per_month() {
    let mut engine = SimEngine::builtin().expect("builtin engine").with_chat_seed(7);
    let s0 = engine.initial_state();
    let s1 = engine.apply(&s0, Command::SetLifestyle { lifestyle: Lifestyle::Benefits }).state;

    let seeded = engine.apply(&s1, Command::SeedMessagesIfEmpty);
    assert_eq!(seeded.outcome, Outcome::Applied);
    assert!(!seeded.state.inbox.is_empty());

    let again = engine.apply(&seeded.state, Command::SeedMessagesIfEmpty);
    assert_eq!(again.outcome, Outcome::Unchanged);
    assert_eq!(again.state, seeded.state);

    let patch = FlagPatch::from([("boilerBreakdownPlanned".to_string(), FlagValue::from(true))]);
    let flagged = engine.apply(&seeded.state, Command::MergeFlags { patch }).state;
    let reseed = engine.apply(&flagged, Command::SeedMessagesIfEmpty);
    assert_eq!(reseed.outcome, Outcome::Unchanged);
    assert_eq!(reseed.state.inbox, seeded.state.inbox);
    assert_eq!(reseed.state.chat, seeded.state.chat);
}

/// Test 2: with 2 priority ids among 5 eligible and a cap of 4, the month
/// holds exactly those 2 plus 2 others, whatever the shuffle does.
#[test]
fn priority_ids_survive_the_cap() {
    let catalog = Catalog::from_scenarios(vec![
        inbox("o1"),
        inbox("p1"),
        inbox("o2"),
        inbox("p2"),
        inbox("o3"),
    ])
    .expect("catalog");

    for money in [0.0, 13.0, 250.5, -40.0, 999.0, 1234.56] {
        let mut config = EngineConfig::default();
        config.starting.money = money;
        config.inbox.cap = 4;
        config.inbox.must_include = vec!["p1".to_string(), "p2".to_string()];

        let mut engine = SimEngine::build(catalog.clone(), config).with_chat_seed(1);
        let s0 = engine.initial_state();
        let state = engine.apply(&s0, Command::SeedMessagesIfEmpty).state;

        let ids = ids_for(&state, Channel::Inbox, 0);
        assert_eq!(ids.len(), 4, "money={money}: {ids:?}");
        assert_eq!(&ids[..2], &["p1".to_string(), "p2".to_string()]);
        assert!(ids[2..].iter().all(|id| id.starts_with('o')));
        assert_ne!(ids[2], ids[3]);
    }
}

/// Test 3: a scheduled-only scenario never shows up on its own trigger,
/// and shows up exactly in the month its follow-up was scheduled for.
#[test]
fn scheduled_only_arrives_through_follow_ups() {
    let catalog = Catalog::from_scenarios(vec![
        Scenario::new("invite", Channel::Inbox)
            .with_choice(Choice::new("attend").with_next("feedback", 1))
            .with_choice(Choice::new("skip")),
        inbox("feedback").scheduled_only(),
    ])
    .expect("catalog");

    // Nobody attends: the feedback never appears.
    let mut engine = SimEngine::build(catalog.clone(), EngineConfig::default()).with_chat_seed(2);
    let s0 = engine.initial_state();
    let mut state = engine.apply(&s0, Command::SeedMessagesIfEmpty).state;
    for _ in 0..3 {
        state = commit(&mut engine, &state).state;
    }
    assert!(state.inbox.iter().all(|m| m.scenario_id != "feedback"));

    // Attending in month 0 schedules it for month 1 only.
    let mut engine = SimEngine::build(catalog, EngineConfig::default()).with_chat_seed(2);
    let s0 = engine.initial_state();
    let state = engine.apply(&s0, Command::SeedMessagesIfEmpty).state;
    assert_eq!(ids_for(&state, Channel::Inbox, 0), vec!["invite"]);

    let chose = engine.apply(&state, Command::ChooseOption {
        channel:    Channel::Inbox,
        message_id: "invite@m0".to_string(),
        option_id:  "attend".to_string(),
    });
    assert!(chose.is_applied());

    let m1 = commit(&mut engine, &chose.state).state;
    let month1 = ids_for(&m1, Channel::Inbox, 1);
    assert_eq!(month1.iter().filter(|id| *id == "feedback").count(), 1);
    assert!(m1.schedule.is_empty());

    let m2 = commit(&mut engine, &m1).state;
    assert!(!ids_for(&m2, Channel::Inbox, 2).contains(&"feedback".to_string()));
}

/// Test 4: the inbox opens with the welcome and a coach message picked
/// from the meters. The family gift arrives in the first month's chat.
#[test]
fn system_messages_lead_the_inbox() {
    let mut engine = SimEngine::builtin().expect("builtin engine").with_chat_seed(11);
    let s0 = engine.initial_state();
    let s1 = engine.apply(&s0, Command::SetLifestyle { lifestyle: Lifestyle::FullTime }).state;
    let m0 = engine.apply(&s1, Command::SeedMessagesIfEmpty).state;

    let inbox0 = ids_for(&m0, Channel::Inbox, 0);
    assert_eq!(&inbox0[..2], &["welcome".to_string(), "coach-balanced".to_string()]);

    let chat0 = ids_for(&m0, Channel::Chat, 0);
    assert!(chat0.contains(&"start-gift-family-jan".to_string()));
    assert!(chat0.len() <= engine.config().chat.cap);

    let t = engine.apply(&m0, Command::CommitMonth {
        totals:     Effects::new(-500.0, 0, 0),
        from_month: 0,
    });
    assert!(t.is_applied());
    let inbox1 = ids_for(&t.state, Channel::Inbox, 1);
    assert_eq!(inbox1.first().map(String::as_str), Some("coach-overdrawn"));
    assert!(!inbox1.contains(&"welcome".to_string()));
    assert!(!ids_for(&t.state, Channel::Chat, 1).contains(&"start-gift-family-jan".to_string()));
}

/// Test 5: a form sent before the first seed leaves its receipt in the
/// month, and the month is still selected in full around it.
#[test]
fn early_form_receipt_does_not_suppress_selection() {
    let mut engine = SimEngine::builtin().expect("builtin engine").with_chat_seed(5);
    let s0 = engine.initial_state();
    let s1 = engine.apply(&s0, Command::SetLifestyle { lifestyle: Lifestyle::Benefits }).state;

    let submitted = engine.apply(&s1, Command::SubmitSpecialForm {
        form: SpecialForm::JobseekerAllowance { quality: FormQuality::Good },
    });
    assert!(submitted.is_applied());
    assert_eq!(ids_for(&submitted.state, Channel::Inbox, 0), vec!["jsa-receipt".to_string()]);

    let seeded = engine.apply(&submitted.state, Command::SeedMessagesIfEmpty);
    assert_eq!(seeded.outcome, Outcome::Applied);
    let inbox0 = ids_for(&seeded.state, Channel::Inbox, 0);
    assert_eq!(&inbox0[..2], &["welcome".to_string(), "coach-balanced".to_string()]);
    assert_eq!(inbox0.last().map(String::as_str), Some("jsa-receipt"));
    assert_eq!(inbox0.iter().filter(|id| *id == "jsa-receipt").count(), 1);
    // The invite is no longer eligible once the form is in.
    assert!(!inbox0.contains(&"benefits-jsa-application".to_string()));
    assert!(!ids_for(&seeded.state, Channel::Chat, 0).is_empty());

    let again = engine.apply(&seeded.state, Command::SeedMessagesIfEmpty);
    assert_eq!(again.outcome, Outcome::Unchanged);
}
