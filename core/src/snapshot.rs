//! Monthly snapshots: full engine state to/from JSON.
//!
//! One snapshot per (session, month), overwritten by later transitions in
//! the same month. The latest snapshot is enough to resume a session
//! without replaying the event log.

use crate::{
    state::EngineState,
    types::{Month, SessionId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub month:      Month,
    pub revision:   u64,
    pub saved_at:   String,
    pub state:      EngineState,
}
