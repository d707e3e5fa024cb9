//! Declarative command gating.
//!
//! Every handler declares a `CommandRequirements` record; one `check`
//! evaluates it against the current chat, sender and meeting before the
//! handler body runs, replying with the reason when a requirement fails.

use crate::domain::{Meeting, MeetingStage};
use std::fmt;

/// Kind of chat a message arrived from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatKind::Private => "private",
            ChatKind::Group => "group",
            ChatKind::Supergroup => "supergroup",
            ChatKind::Channel => "channel",
        }
    }
}

impl TryFrom<&str> for ChatKind {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "private" => Ok(ChatKind::Private),
            "group" => Ok(ChatKind::Group),
            "supergroup" => Ok(ChatKind::Supergroup),
            "channel" => Ok(ChatKind::Channel),
            _ => Err(format!("Unknown chat type: {}", s)),
        }
    }
}

pub const GROUP_CHATS: &[ChatKind] = &[ChatKind::Group, ChatKind::Supergroup];
pub const PRIVATE_CHAT: &[ChatKind] = &[ChatKind::Private];

/// What a command demands before it may run
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRequirements {
    /// Allowed chat kinds; empty means any
    pub chat_kinds: &'static [ChatKind],
    /// An active meeting must exist
    pub active_meeting: bool,
    /// Only the configured admin may run this
    pub admin_only: bool,
    /// The active meeting must be in this stage
    pub stage: Option<MeetingStage>,
}

/// The situation a command arrived in
#[derive(Debug, Clone)]
pub struct CommandContext<'a> {
    pub chat_kind: ChatKind,
    pub chat_id: i64,
    pub sender_id: i64,
    pub meeting: Option<&'a Meeting>,
}

/// Why a command was refused; `Display` is the user-facing reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    ForeignChat,
    WrongChatKind { allowed: &'static [ChatKind] },
    NoActiveMeeting,
    AdminOnly,
    WrongStage {
        required: MeetingStage,
        current: MeetingStage,
    },
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Denial::ForeignChat => {
                write!(f, "I am configured for use in a different chat.")
            }
            Denial::WrongChatKind { allowed } => {
                let kinds: Vec<&str> = allowed.iter().map(|k| k.as_str()).collect();
                write!(
                    f,
                    "This command is only allowed in one of these contexts: [{}]",
                    kinds.join(", ")
                )
            }
            Denial::NoActiveMeeting => write!(
                f,
                "There is no active meeting. The admin needs to initiate a new meeting to begin the process."
            ),
            Denial::AdminOnly => write!(f, "Only the admin can tell me to do that."),
            Denial::WrongStage { required, current } => write!(
                f,
                "This command requires the active stage to be {}, but it is currently {}.",
                required, current
            ),
        }
    }
}

/// Evaluates requirements uniformly for every command
#[derive(Debug, Clone)]
pub struct CommandGate {
    pub master_chat_id: i64,
    pub master_user_id: i64,
}

impl CommandGate {
    pub fn new(master_chat_id: i64, master_user_id: i64) -> Self {
        Self {
            master_chat_id,
            master_user_id,
        }
    }

    /// Check all requirements in order, returning the first violation
    pub fn check(
        &self,
        requirements: &CommandRequirements,
        ctx: &CommandContext<'_>,
    ) -> Result<(), Denial> {
        // The bot serves exactly one group; private chats are always fine
        if ctx.chat_kind != ChatKind::Private && ctx.chat_id != self.master_chat_id {
            return Err(Denial::ForeignChat);
        }
        if !requirements.chat_kinds.is_empty()
            && !requirements.chat_kinds.contains(&ctx.chat_kind)
        {
            return Err(Denial::WrongChatKind {
                allowed: requirements.chat_kinds,
            });
        }
        if (requirements.active_meeting || requirements.stage.is_some()) && ctx.meeting.is_none() {
            return Err(Denial::NoActiveMeeting);
        }
        if requirements.admin_only && ctx.sender_id != self.master_user_id {
            return Err(Denial::AdminOnly);
        }
        if let Some(required) = requirements.stage {
            let meeting = ctx.meeting.expect("checked above");
            if meeting.stage != required {
                return Err(Denial::WrongStage {
                    required,
                    current: meeting.stage,
                });
            }
        }
        Ok(())
    }
}
