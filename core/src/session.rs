//! Session adapter: engine + state + store.
//!
//! RULE: The engine decides, the session records. `dispatch` runs the
//! pure transition and, only when it applied, writes the result:
//!   - kv keys `flags`, `history`, `pending_choices`, `contracts`, `state`
//!   - a snapshot for the current month
//!   - the transition's events, keyed by revision
//! Rejected and unchanged transitions write nothing.

use crate::{
    engine::{SimEngine, Transition},
    error::{SimError, SimResult},
    event::{event_type_name, EventLogEntry},
    command::Command,
    snapshot::SessionSnapshot,
    state::EngineState,
    store::{self, SessionStore},
    types::SessionId,
};

pub const KEY_FLAGS: &str = "flags";
pub const KEY_HISTORY: &str = "history";
pub const KEY_PENDING_CHOICES: &str = "pending_choices";
pub const KEY_CONTRACTS: &str = "contracts";
pub const KEY_STATE: &str = "state";

pub struct Session {
    pub session_id: SessionId,
    engine: SimEngine,
    state:  EngineState,
    store:  SessionStore,
}

impl Session {
    /// Start a fresh session under `session_id`.
    pub fn start(session_id: SessionId, engine: SimEngine, store: SessionStore) -> SimResult<Self> {
        store.insert_session(&session_id, env!("CARGO_PKG_VERSION"))?;
        let state = engine.initial_state();
        let session = Self { session_id, engine, state, store };
        session.persist_keys()?;
        log::info!("session {} started", session.session_id);
        Ok(session)
    }

    /// Start a fresh session with a generated id.
    pub fn start_new(engine: SimEngine, store: SessionStore) -> SimResult<Self> {
        Self::start(uuid::Uuid::new_v4().to_string(), engine, store)
    }

    /// Reload the last persisted state of `session_id`.
    pub fn resume(session_id: &str, engine: SimEngine, store: SessionStore) -> SimResult<Self> {
        let Some(json) = store.get_value(session_id, KEY_STATE)? else {
            return Err(SimError::UnknownSession { session_id: session_id.to_string() });
        };
        let state: EngineState = serde_json::from_str(&json)?;
        log::info!(
            "session {session_id} resumed at month={} revision={}",
            state.month(),
            state.revision
        );
        Ok(Self { session_id: session_id.to_string(), engine, state, store })
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn engine(&self) -> &SimEngine {
        &self.engine
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn dispatch(&mut self, command: Command) -> SimResult<Transition> {
        let transition = self.engine.apply(&self.state, command);
        if transition.is_applied() {
            self.state = transition.state.clone();
            self.persist(&transition)?;
        }
        Ok(transition)
    }

    /// Drop everything stored for this session.
    pub fn end(self) -> SimResult<()> {
        self.store.clear_session(&self.session_id)?;
        log::info!("session {} ended", self.session_id);
        Ok(())
    }

    fn persist(&self, transition: &Transition) -> SimResult<()> {
        self.persist_keys()?;

        let state = &transition.state;
        self.store.save_snapshot(&SessionSnapshot {
            session_id: self.session_id.clone(),
            month:      state.month(),
            revision:   state.revision,
            saved_at:   store::timestamp(),
            state:      state.clone(),
        })?;

        for (seq, event) in transition.events.iter().enumerate() {
            self.store.append_event(&EventLogEntry {
                id:         None,
                session_id: self.session_id.clone(),
                revision:   state.revision,
                seq:        seq as u32,
                month:      state.month(),
                event_type: event_type_name(event).to_string(),
                payload:    serde_json::to_string(event)?,
            })?;
        }
        Ok(())
    }

    fn persist_keys(&self) -> SimResult<()> {
        let id = &self.session_id;
        let s = &self.state;
        self.store.put_value(id, KEY_FLAGS, &serde_json::to_string(s.flags.values())?)?;
        self.store.put_value(id, KEY_HISTORY, &serde_json::to_string(&s.history)?)?;
        self.store.put_value(id, KEY_PENDING_CHOICES, &serde_json::to_string(&s.pending_choices)?)?;
        self.store.put_value(id, KEY_CONTRACTS, &serde_json::to_string(&s.contracts)?)?;
        self.store.put_value(id, KEY_STATE, &serde_json::to_string(s)?)?;
        Ok(())
    }
}
