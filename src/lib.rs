pub mod adapters;
pub mod bot;
pub mod config;
pub mod domain;
pub mod error;
pub mod report;
pub mod voting;

pub use adapters::{BooksClient, SqliteStore, TelegramClient};
pub use bot::BotService;
pub use config::AppConfig;
pub use domain::{Ballot, Meeting, MeetingStage, RankedChoices, Submission, WorkSummary};
pub use error::{Result, TomeError};
pub use voting::{instant_runoff, Tabulation};
