//! sim-runner: headless driver for the life-sim state engine.
//!
//! Usage:
//!   sim-runner --seed 12345 --lifestyle benefits --db run.db
//!   sim-runner --seed 12345 --data-dir ./data --ipc-mode

use anyhow::Result;
use lifesim_core::{
    command::{Command, Notice, Outcome},
    engine::SimEngine,
    escalation::EscalationState,
    flags::keys,
    forms::{FormQuality, SpecialForm, UcAnswers, UcExpected},
    message::{History, Message},
    session::Session,
    state::EngineState,
    store::SessionStore,
    support,
    types::{Channel, Effects, Lifestyle, Meters, Month},
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcRequest {
    GetState,
    Command { command: Command },
    Quit,
}

#[derive(serde::Serialize)]
struct ChoiceView {
    id:    String,
    label: String,
}

#[derive(serde::Serialize)]
struct MessageView {
    id:       String,
    scenario: String,
    month:    Month,
    from:     String,
    subject:  String,
    preview:  String,
    read:     bool,
    chosen:   Option<String>,
    draft:    Option<String>,
    choices:  Vec<ChoiceView>,
}

#[derive(serde::Serialize)]
struct UiState {
    session_id: String,
    month:      Month,
    complete:   bool,
    revision:   u64,
    lifestyle:  Option<Lifestyle>,
    meters:     Meters,
    history:    History,
    fraud:      EscalationState,
    inbox:      Vec<MessageView>,
    chat:       Vec<MessageView>,
    outcome:    Option<Outcome>,
    notices:    Vec<String>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = str_arg(&args, "--db").unwrap_or(":memory:");
    let data_dir = str_arg(&args, "--data-dir");
    let lifestyle: Lifestyle = str_arg(&args, "--lifestyle")
        .unwrap_or("benefits")
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let housing = str_arg(&args, "--housing").unwrap_or("housing_studio");

    if !ipc_mode {
        println!("Life-sim: sim-runner");
        println!("  seed:      {seed}");
        println!("  lifestyle: {}", lifestyle.label());
        println!("  housing:   {housing}");
        println!("  db:        {db}");
        println!("  data_dir:  {}", data_dir.unwrap_or("(built-in)"));
        println!();
    }

    let engine = match data_dir {
        Some(dir) => SimEngine::load(dir)?,
        None => SimEngine::builtin()?,
    }
    .with_chat_seed(seed);

    let store = if db == ":memory:" {
        SessionStore::in_memory()?
    } else {
        SessionStore::open(db)?
    };
    store.migrate()?;

    let session_id = format!("run-{seed}-{}", uuid::Uuid::new_v4());
    let mut session = Session::start(session_id, engine, store)?;

    if ipc_mode {
        run_ipc_loop(&mut session)?;
    } else {
        autoplay(&mut session, lifestyle, housing)?;
        print_summary(&session)?;
    }
    Ok(())
}

fn run_ipc_loop(session: &mut Session) -> Result<()> {
    let stdin = io::stdin();
    serve_ipc(session, stdin.lock(), io::stdout())
}

/// One JSON reply per request line. Errors are reported as
/// `{"error": ...}` lines and the loop carries on.
fn serve_ipc(session: &mut Session, mut handle: impl BufRead, mut stdout: impl Write) -> Result<()> {
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let request: IpcRequest = match serde_json::from_str(&buffer) {
            Ok(r) => r,
            Err(e) => {
                write_error(&mut stdout, &e.to_string())?;
                continue;
            }
        };

        match request {
            IpcRequest::Quit => break,
            IpcRequest::GetState => {
                let state = build_ui_state(session, None, &[]);
                writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
            }
            IpcRequest::Command { command } => {
                // A store failure leaves the session on its last saved state.
                let transition = match session.dispatch(command) {
                    Ok(t) => t,
                    Err(e) => {
                        log::error!("command failed: {e:#}");
                        write_error(&mut stdout, &format!("{e:#}"))?;
                        continue;
                    }
                };
                let state = build_ui_state(session, Some(transition.outcome), &transition.notices);
                writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn write_error(out: &mut impl Write, message: &str) -> io::Result<()> {
    writeln!(out, "{}", serde_json::json!({ "error": message }))?;
    out.flush()
}

/// Play a whole year: answer every message with its first option, fill in
/// any open benefit form, report fraud once it reaches stage 2, and commit
/// fixed living costs each month.
fn autoplay(session: &mut Session, lifestyle: Lifestyle, housing: &str) -> Result<()> {
    session.dispatch(Command::SetLifestyle { lifestyle })?;
    session.dispatch(Command::LockContracts {
        housing:   housing.to_string(),
        phone:     "phone_sim_only".to_string(),
        broadband: "broadband_basic".to_string(),
    })?;
    session.dispatch(Command::SeedMessagesIfEmpty)?;

    while !session.state().clock.complete {
        let month = session.state().month();

        for command in answer_messages(session) {
            session.dispatch(command)?;
        }
        for command in fill_forms(session) {
            session.dispatch(command)?;
        }
        if let Some(command) = report_if_due(session) {
            let t = session.dispatch(command)?;
            for notice in &t.notices {
                log::info!("month={month} notice: {}", notice.text());
            }
        }

        let food = if support::foodbank_active(&session.state().flags, month) {
            "foodbank_voucher"
        } else {
            "food_budget"
        };
        session.dispatch(Command::SetPendingChoice {
            key:   "food".to_string(),
            value: food.to_string(),
        })?;
        let totals = monthly_totals(session.state(), lifestyle);
        let t = session.dispatch(Command::CommitMonth { totals, from_month: month })?;
        if !t.is_applied() {
            anyhow::bail!("commit of month {month} was not applied: {:?}", t.outcome);
        }
        for notice in &t.notices {
            log::info!("month={month} notice: {}", notice.text());
        }
    }
    Ok(())
}

fn answer_messages(session: &Session) -> Vec<Command> {
    let state = session.state();
    let catalog = session.engine().catalog();
    let month = state.month();
    let mut commands = Vec::new();

    for channel in [Channel::Inbox, Channel::Chat] {
        for message in state.messages_for(channel, month).filter(|m| m.chosen_option_id.is_none()) {
            let Some(first) = catalog.get(&message.scenario_id).and_then(|s| s.choices.first()) else {
                continue;
            };
            match channel {
                Channel::Inbox => commands.push(Command::ChooseOption {
                    channel,
                    message_id: message.id.clone(),
                    option_id:  first.id.clone(),
                }),
                Channel::Chat => {
                    commands.push(Command::SelectDraftOption {
                        channel,
                        message_id: message.id.clone(),
                        option_id:  first.id.clone(),
                    });
                    commands.push(Command::SendDraft { channel, message_id: message.id.clone() });
                }
            }
        }
    }
    commands
}

fn fill_forms(session: &Session) -> Vec<Command> {
    let state = session.state();
    let mut commands = Vec::new();

    if state.flags.is_true(keys::benefits::JSA_FORM_OPEN) {
        commands.push(Command::SubmitSpecialForm {
            form: SpecialForm::JobseekerAllowance { quality: FormQuality::Good },
        });
    }
    if state.flags.is_true(keys::benefits::UC_FORM_OPEN) {
        let expected = UcExpected::for_state(state, session.engine().config());
        let answers = UcAnswers {
            rent:        expected.rent.unwrap_or(0.0),
            council_tax: expected.council_tax,
            utilities:   expected.utilities,
        };
        commands.push(Command::SubmitSpecialForm {
            form: SpecialForm::UniversalCredit {
                correct:       answers.assess(&expected),
                monthly_award: expected.rent.unwrap_or(0.0),
            },
        });
    }
    commands
}

fn report_if_due(session: &Session) -> Option<Command> {
    let state = session.state();
    match state.fraud {
        EscalationState::Active { stage: 2, .. } => {
            let tx = session.engine().config().fraud.transaction(2)?;
            Some(Command::ReportFraud { merchant: tx.merchant.clone(), amount: tx.amount })
        }
        _ => None,
    }
}

/// Income minus rent, food and bills for one month. An accepted job's wage
/// replaces the lifestyle income, and a food bank voucher covers food.
fn monthly_totals(state: &EngineState, lifestyle: Lifestyle) -> Effects {
    let month = state.month();
    let income = support::job_income(&state.flags, month).unwrap_or(match lifestyle {
        Lifestyle::Benefits => 0.0,
        Lifestyle::PartTime => 950.0,
        Lifestyle::FullTime => 1650.0,
    });
    let rent = state.flags.as_f64(keys::housing::RENT_MONTHLY).unwrap_or(0.0);
    let bills = 100.0 + 181.0 + 30.0;
    let food = if support::foodbank_active(&state.flags, month) { 0.0 } else { 160.0 };
    Effects::new(income - rent - bills - food, 0, -1)
}

fn build_ui_state(session: &Session, outcome: Option<Outcome>, notices: &[Notice]) -> UiState {
    let state = session.state();
    UiState {
        session_id: session.session_id.clone(),
        month:      state.month(),
        complete:   state.clock.complete,
        revision:   state.revision,
        lifestyle:  state.lifestyle,
        meters:     state.meters,
        history:    state.history.clone(),
        fraud:      state.fraud,
        inbox:      state.inbox.iter().map(|m| message_view(session, m)).collect(),
        chat:       state.chat.iter().map(|m| message_view(session, m)).collect(),
        outcome,
        notices:    notices.iter().map(|n| n.text().to_string()).collect(),
    }
}

fn message_view(session: &Session, message: &Message) -> MessageView {
    let scenario = session.engine().catalog().get(&message.scenario_id);
    MessageView {
        id:       message.id.clone(),
        scenario: message.scenario_id.clone(),
        month:    message.month,
        from:     scenario.map(|s| s.from.clone()).unwrap_or_default(),
        subject:  scenario.map(|s| s.subject.clone()).unwrap_or_default(),
        preview:  scenario.map(|s| s.preview.clone()).unwrap_or_default(),
        read:     message.read,
        chosen:   message.chosen_option_id.clone(),
        draft:    message.draft_option_id.clone(),
        choices:  scenario
            .map(|s| {
                s.choices
                    .iter()
                    .map(|c| ChoiceView { id: c.id.clone(), label: c.label.clone() })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn print_summary(session: &Session) -> Result<()> {
    let state = session.state();
    let events = session.store().events_for_session(&session.session_id)?;
    let answered = state
        .inbox
        .iter()
        .chain(state.chat.iter())
        .filter(|m| m.chosen_option_id.is_some())
        .count();

    println!("=== RUN SUMMARY ===");
    println!("  session:      {}", session.session_id);
    println!("  final month:  {}", state.month());
    println!("  complete:     {}", state.clock.complete);
    println!("  money:        £{:.2}", state.meters.money);
    println!("  health:       {}", state.meters.health);
    println!("  wellbeing:    {}", state.meters.wellbeing);
    println!("  messages:     {} inbox, {} chat ({answered} answered)", state.inbox.len(), state.chat.len());
    println!("  fraud chain:  {}", state.fraud.label());
    println!("  events:       {}", events.len());

    println!();
    println!("=== HISTORY ===");
    for month in 0..state.history.len() as Month {
        if let Some(m) = state.history.get(month) {
            println!(
                "  m{month:<2} | money £{:>9.2} | health {:>3} | wellbeing {:>3}",
                m.money, m.health, m.wellbeing
            );
        }
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
