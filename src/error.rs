use thiserror::Error;

/// Main error type for the book club bot
#[derive(Error, Debug)]
pub enum TomeError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram API error: {0}")]
    Telegram(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Meeting lifecycle errors
    #[error("No active meeting")]
    NoActiveMeeting,

    #[error("Meeting not found: {0}")]
    MeetingNotFound(i64),

    #[error("Invalid stage transition: from {from} to {to}")]
    InvalidStageTransition { from: String, to: String },

    // Catalog errors
    #[error("Volume not found: {0}")]
    VolumeNotFound(String),

    #[error("Missing submission {submission_id} in meeting {meeting_id}")]
    MissingSubmission {
        submission_id: i64,
        meeting_id: i64,
    },

    // Ballot validation errors
    #[error("Choice {choice} out of range, expected {min} - {max}")]
    ChoiceOutOfRange { choice: i64, min: i64, max: i64 },

    #[error("Ballot choices must be three different submissions")]
    DuplicateChoice,

    // Tabulation preconditions
    #[error("No ballots were cast")]
    NoBallots,

    #[error("No candidates to tabulate")]
    NoCandidates,

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for TomeError
pub type Result<T> = std::result::Result<T, TomeError>;

impl TomeError {
    /// Validation errors are recoverable: the member is re-prompted with the
    /// violated constraint and no state was written.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TomeError::NoActiveMeeting
                | TomeError::ChoiceOutOfRange { .. }
                | TomeError::DuplicateChoice
                | TomeError::NoBallots
                | TomeError::NoCandidates
                | TomeError::VolumeNotFound(_)
        )
    }
}
