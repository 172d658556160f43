use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Duplicate scenario id '{id}'")]
    DuplicateScenario { id: String },

    #[error("Scenario '{scenario}' has duplicate choice id '{choice}'")]
    DuplicateChoice { scenario: String, choice: String },

    #[error("Scenario '{scenario}' schedules unknown follow-up '{follow_up}'")]
    DanglingFollowUp { scenario: String, follow_up: String },

    #[error("Invalid flag patch: {0}")]
    InvalidFlag(#[from] crate::flags::FlagError),

    #[error("Session '{session_id}' has no persisted state")]
    UnknownSession { session_id: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
