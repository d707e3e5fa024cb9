mod commands;
mod handlers;
mod requirements;
mod session;

pub use commands::{Command, ParseError};
pub use handlers::BotService;
pub use requirements::{
    ChatKind, CommandContext, CommandGate, CommandRequirements, Denial, GROUP_CHATS, PRIVATE_CHAT,
};
pub use session::{ChoiceOutcome, SearchSessions};
