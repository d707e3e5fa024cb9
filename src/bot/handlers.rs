//! Command handlers and the update loop.
//!
//! Each inbound message is handled to completion before the next one;
//! the store is the only shared mutable state. Handlers check their
//! `CommandRequirements` through the gate, then run against the store
//! and the external adapters.

use crate::adapters::{mention, BooksClient, Message, SqliteStore, TelegramClient, User};
use crate::bot::commands::{Command, ParseError};
use crate::bot::requirements::{
    ChatKind, CommandContext, CommandGate, CommandRequirements, GROUP_CHATS, PRIVATE_CHAT,
};
use crate::bot::session::{ChoiceOutcome, SearchSessions};
use crate::config::AppConfig;
use crate::domain::{format_work_list, MeetingStage, RankedChoices, WorkSummary};
use crate::error::Result;
use crate::report;
use crate::voting;
use std::collections::BTreeSet;
use tracing::{error, info, warn};

/// Telegram caps messages at 4096 characters
const MAX_MESSAGE_LEN: usize = 4096;

pub struct BotService {
    store: SqliteStore,
    telegram: TelegramClient,
    books: BooksClient,
    sessions: SearchSessions,
    gate: CommandGate,
    max_results: u32,
    poll_timeout_secs: u64,
}

impl BotService {
    pub fn new(
        config: &AppConfig,
        store: SqliteStore,
        telegram: TelegramClient,
        books: BooksClient,
    ) -> Self {
        Self {
            store,
            telegram,
            books,
            sessions: SearchSessions::new(),
            gate: CommandGate::new(
                config.telegram.master_chat_id,
                config.telegram.master_user_id,
            ),
            max_results: config.catalog.max_results,
            poll_timeout_secs: config.telegram.poll_timeout_secs,
        }
    }

    /// Long-poll loop; runs until the surrounding task is cancelled
    pub async fn run(&self) -> Result<()> {
        let mut offset = 0i64;
        info!("Starting update loop");

        loop {
            let updates = match self.telegram.get_updates(offset, self.poll_timeout_secs).await {
                Ok(updates) => updates,
                Err(e) => {
                    error!("getUpdates failed: {}", e);
                    tokio::time::sleep(std::time::Duration::from_secs(3)).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                if let Some(message) = update.message {
                    self.handle_message(&message).await;
                }
            }
        }
    }

    /// Handle one message end to end; never propagates errors into the loop
    pub async fn handle_message(&self, message: &Message) {
        let Some(text) = message.text.as_deref() else {
            return;
        };
        let Some(parsed) = Command::parse(text) else {
            return;
        };
        let Some(user) = message.from.clone() else {
            self.send_reply(message, "You are not a real user. Go away.")
                .await;
            return;
        };

        let command = match parsed {
            Ok(command) => command,
            Err(ParseError::BadArguments(expected)) => {
                self.send_reply(
                    message,
                    &format!(
                        "Your message does not conform to the expected format of `{}`.",
                        expected
                    ),
                )
                .await;
                return;
            }
            // Telegram surfaces commands of every bot in the chat; stay quiet
            Err(ParseError::Unknown) => return,
        };

        if let Err(e) = self.dispatch(message, &user, command).await {
            if e.is_recoverable() {
                self.send_reply(message, &e.to_string()).await;
            } else {
                error!("Command failed: {}", e);
                self.send_reply(message, "Something went wrong on my end, please try again.")
                    .await;
            }
        }
    }

    async fn dispatch(&self, message: &Message, user: &User, command: Command) -> Result<()> {
        let requirements = requirements_for(&command);

        let meeting = self.store.try_active_meeting().await?;
        let chat_kind = match ChatKind::try_from(message.chat.kind.as_str()) {
            Ok(kind) => kind,
            Err(e) => {
                warn!("Ignoring message: {}", e);
                return Ok(());
            }
        };
        let ctx = CommandContext {
            chat_kind,
            chat_id: message.chat.id,
            sender_id: user.id,
            meeting: meeting.as_ref(),
        };

        if let Err(denial) = self.gate.check(&requirements, &ctx) {
            self.send_reply(message, &denial.to_string()).await;
            return Ok(());
        }

        match command {
            Command::Instructions => self.instructions(message).await,
            Command::Commands => self.command_list(message).await,
            Command::Status => self.status(message).await,
            Command::NewMeeting => self.new_meeting(message).await,
            Command::Search(query) => self.search(message, user, &query).await,
            Command::Choose(choice) => self.choose(message, user, choice).await,
            Command::FinishSubmissions => self.finish_submissions(message).await,
            Command::Vote(a, b, c) => self.vote(message, user, (a, b, c)).await,
            Command::FinishVoting => self.finish_voting(message).await,
        }
    }

    // ==================== Handlers ====================

    async fn instructions(&self, message: &Message) -> Result<()> {
        let text = "I am the *Book Club Bot*.\n\n\
            Once the admin creates a new meeting, there are two stages: submitting books and voting on books.\n\n\
            During the *submit* stage, members submit 1 book for the active meeting.\n\
            Find your book with `/search <search query>`, then pick it from the results with `/choose <number>`.\n\
            You can repeat this and choose a different book while the stage is ongoing.\n\
            When submissions close, I generate an overview document of the submitted books.\n\n\
            During the *vote* stage, members rank 3 of the submitted books with `/vote <number> <number> <number>`.\n\
            A winner is chosen by instant-runoff (ranked-choice) voting.\n\
            You can repeat this and change your vote while the stage is ongoing.\n\n\
            Type `/commands` in a private chat with me for the full command list.";
        self.telegram.reply_to(message, text).await?;
        Ok(())
    }

    async fn command_list(&self, message: &Message) -> Result<()> {
        let text = "Here is a list of valid commands and their requirements.\n\n\
            Tags: a = admin only, m = active meeting required, p = private chat, g = group chat, s = submit stage, v = vote stage.\n\n\
            */instructions*: how I operate.\n\
            */commands* (p): this message.\n\
            */status* (g): current status of the meeting.\n\
            */new\\_meeting* (a/g): start a new meeting.\n\
            */search* (m/p/s): search the catalog, e.g.\n`/search tolkien lord rings`\n`/search title:\"city of thieves\" author:\"david benioff\"`\n`/search isbn:9788373899292`\n\
            */choose* (m/p/s): submit one of your search results, e.g. `/choose 4`.\n\
            */finish\\_submissions* (a/m/g/s): close submissions, publish the overview, open voting.\n\
            */vote* (m/p/v): rank three books by their overview numbers, e.g. `/vote 5 10 2`.\n\
            */finish\\_voting* (a/m/g/v): close voting and announce the winner.";
        self.telegram.reply_to(message, text).await?;
        Ok(())
    }

    async fn status(&self, message: &Message) -> Result<()> {
        let Some(meeting) = self.store.try_active_meeting().await? else {
            self.send_reply(
                message,
                "There is no active meeting. The admin needs to initiate a new meeting to begin the process.",
            )
            .await;
            return Ok(());
        };

        match meeting.stage {
            MeetingStage::Submit => {
                let submissions = self.store.submissions(meeting.meeting_id).await?;
                let mentions = self
                    .member_mentions(
                        message.chat.id,
                        submissions.iter().map(|s| s.member_id),
                    )
                    .await;
                self.telegram
                    .reply_to(
                        message,
                        &format!(
                            "I am currently collecting submissions for meeting {}.\nThe following members have submitted books: {}",
                            meeting.meeting_id, mentions
                        ),
                    )
                    .await?;
            }
            MeetingStage::Vote => {
                let ballots = self.store.ballots(meeting.meeting_id).await?;
                let mentions = self
                    .member_mentions(message.chat.id, ballots.iter().map(|b| b.member_id))
                    .await;
                self.telegram
                    .reply_to(
                        message,
                        &format!(
                            "I am currently collecting votes for meeting {}.\nThe following members have voted: {}",
                            meeting.meeting_id, mentions
                        ),
                    )
                    .await?;
            }
            MeetingStage::Organized => {
                let volume_id = meeting.volume_id.as_deref().unwrap_or_default();
                let work = self.books.get_volume(volume_id).await?;
                self.telegram
                    .reply_to(
                        message,
                        &format!(
                            "Meeting {} has been organized.\n{} was chosen.",
                            meeting.meeting_id,
                            work.format_line()
                        ),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    async fn new_meeting(&self, message: &Message) -> Result<()> {
        let meeting_id = self.store.create_meeting().await?;
        self.telegram
            .reply_to(
                message,
                &format!(
                    "I have initiated meeting number {} for the book club.",
                    meeting_id
                ),
            )
            .await?;
        Ok(())
    }

    async fn search(&self, message: &Message, user: &User, query: &str) -> Result<()> {
        let (total, mut results) = self.books.find_volumes(query).await?;
        if total == 0 || results.is_empty() {
            self.send_reply(message, "No results found, please try again.")
                .await;
            return Ok(());
        }

        self.sessions.set(user.id, results.clone());

        let mut reply = format!("I found {} results for your search", total);
        if total > self.max_results as u64 {
            reply.push_str(&format!(", these are the top {}:\n", self.max_results));
        } else {
            reply.push_str(":\n");
        }
        // Drop trailing results until the reply fits the message limit
        loop {
            let candidate = format!("{}{}", reply, format_work_list(&results));
            if candidate.len() < MAX_MESSAGE_LEN {
                reply = candidate;
                break;
            }
            results.pop();
        }

        self.telegram.reply_to(message, &reply).await?;
        Ok(())
    }

    async fn choose(&self, message: &Message, user: &User, choice: i64) -> Result<()> {
        let work = match self.sessions.choose(user.id, choice) {
            ChoiceOutcome::NoSearch => {
                self.send_reply(
                    message,
                    "You have no search results to choose from. Have you used the `/search <search expression>` command yet?",
                )
                .await;
                return Ok(());
            }
            ChoiceOutcome::OutOfRange { max } => {
                self.send_reply(
                    message,
                    &format!(
                        "Your choice ({}) is not valid, expected something in the range of 1 - {}.",
                        choice, max
                    ),
                )
                .await;
                return Ok(());
            }
            ChoiceOutcome::Chosen(work) => work,
        };

        let meeting = self.store.active_meeting().await?;
        self.store
            .upsert_submission(meeting.meeting_id, user.id, &work.id)
            .await?;

        self.telegram
            .reply_to(
                message,
                &format!("I saved your choice of {}.", work.format_line()),
            )
            .await?;
        Ok(())
    }

    async fn finish_submissions(&self, message: &Message) -> Result<()> {
        let meeting = self.store.active_meeting().await?;
        let submissions = self.store.submissions(meeting.meeting_id).await?;
        if submissions.is_empty() {
            self.send_reply(
                message,
                "No submissions found, please submit some books for the active meeting.",
            )
            .await;
            return Ok(());
        }

        let mut overview: Vec<(i64, WorkSummary)> = Vec::with_capacity(submissions.len());
        for submission in &submissions {
            let work = self.books.get_volume(&submission.volume_id).await?;
            overview.push((submission.submission_id, work));
        }

        let document = report::render(meeting.meeting_id, &overview);
        self.telegram
            .send_document(
                message.chat.id,
                &report::file_name(meeting.meeting_id),
                document.into_bytes(),
                Some(&format!(
                    "Meeting {} of the book club: Submission Overview",
                    meeting.meeting_id
                )),
            )
            .await?;

        self.store.begin_voting(meeting.meeting_id).await?;
        self.telegram
            .reply_to(
                message,
                "The voting stage has begun. Please have a look at the submission overview I generated and vote based on the numbers in it.",
            )
            .await?;
        Ok(())
    }

    async fn vote(&self, message: &Message, user: &User, raw: (i64, i64, i64)) -> Result<()> {
        let meeting = self.store.active_meeting().await?;
        let submission_count = self.store.submission_count(meeting.meeting_id).await?;

        let choices = RankedChoices::validate(raw, submission_count)?;
        self.store
            .record_ballot(meeting.meeting_id, user.id, choices)
            .await?;

        let mut chosen = Vec::with_capacity(3);
        for submission_id in choices.ranked() {
            let volume_id = self
                .store
                .submission_volume(meeting.meeting_id, submission_id)
                .await?;
            chosen.push(self.books.get_volume(&volume_id).await?);
        }

        self.telegram
            .reply_to(
                message,
                &format!(
                    "Successfully saved your votes:\n{}",
                    format_work_list(&chosen)
                ),
            )
            .await?;
        Ok(())
    }

    async fn finish_voting(&self, message: &Message) -> Result<()> {
        let meeting = self.store.active_meeting().await?;

        let ballots = self.store.ballots(meeting.meeting_id).await?;
        if ballots.is_empty() {
            self.send_reply(message, "No votes found, cannot perform the voting process.")
                .await;
            return Ok(());
        }

        let submissions = self.store.submissions(meeting.meeting_id).await?;
        let candidates: BTreeSet<i64> =
            submissions.iter().map(|s| s.submission_id).collect();
        let choices: Vec<RankedChoices> = ballots.iter().map(|b| b.choices).collect();

        let tabulation = voting::instant_runoff(&candidates, &choices)?;
        let winning_volume_id = self
            .store
            .submission_volume(meeting.meeting_id, tabulation.winner)
            .await?;
        let winner = self.books.get_volume(&winning_volume_id).await?;

        // Audit table: who ranked what
        let mut named_ballots = Vec::with_capacity(ballots.len());
        for ballot in &ballots {
            let name = self
                .telegram
                .member_name(message.chat.id, ballot.member_id)
                .await;
            named_ballots.push((name, ballot.choices));
        }
        let table = voting::render_vote_table_html(&named_ballots, &candidates);

        self.store
            .conclude(meeting.meeting_id, &winning_volume_id)
            .await?;

        self.telegram
            .send_message(message.chat.id, &table, Some("HTML"))
            .await?;
        self.telegram
            .reply_to(
                message,
                &format!(
                    "The voting stage has concluded! The winner is {}. See the vote table above for how members voted.",
                    winner.format_line()
                ),
            )
            .await?;
        Ok(())
    }

    // ==================== Helpers ====================

    /// Reply, logging instead of failing when Telegram is unreachable
    async fn send_reply(&self, message: &Message, text: &str) {
        if let Err(e) = self.telegram.reply_to(message, text).await {
            error!("Failed to send reply: {}", e);
        }
    }

    /// Comma-joined mentions for a set of member ids
    async fn member_mentions(
        &self,
        chat_id: i64,
        member_ids: impl Iterator<Item = i64>,
    ) -> String {
        let mut mentions = Vec::new();
        for member_id in member_ids {
            match self.telegram.get_chat_member(chat_id, member_id).await {
                Ok(member) => mentions.push(mention(&member.user)),
                Err(e) => {
                    warn!(member_id, "Failed to resolve member: {}", e);
                    mentions.push(member_id.to_string());
                }
            }
        }
        mentions.join(", ")
    }
}

/// The requirement record for each command, checked before dispatch
fn requirements_for(command: &Command) -> CommandRequirements {
    match command {
        Command::Instructions => CommandRequirements::default(),
        Command::Commands => CommandRequirements {
            chat_kinds: PRIVATE_CHAT,
            ..Default::default()
        },
        Command::Status => CommandRequirements {
            chat_kinds: GROUP_CHATS,
            ..Default::default()
        },
        Command::NewMeeting => CommandRequirements {
            chat_kinds: GROUP_CHATS,
            admin_only: true,
            ..Default::default()
        },
        Command::Search(_) | Command::Choose(_) => CommandRequirements {
            chat_kinds: PRIVATE_CHAT,
            active_meeting: true,
            stage: Some(MeetingStage::Submit),
            ..Default::default()
        },
        Command::FinishSubmissions => CommandRequirements {
            chat_kinds: GROUP_CHATS,
            active_meeting: true,
            admin_only: true,
            stage: Some(MeetingStage::Submit),
        },
        Command::Vote(..) => CommandRequirements {
            chat_kinds: PRIVATE_CHAT,
            active_meeting: true,
            stage: Some(MeetingStage::Vote),
            ..Default::default()
        },
        Command::FinishVoting => CommandRequirements {
            chat_kinds: GROUP_CHATS,
            active_meeting: true,
            admin_only: true,
            stage: Some(MeetingStage::Vote),
        },
    }
}
