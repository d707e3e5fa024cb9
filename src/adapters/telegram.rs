//! Minimal Telegram Bot API client.
//!
//! Covers the handful of methods the bot needs: getUpdates long polling,
//! sendMessage, sendDocument and getChatMember.

use crate::error::{Result, TomeError};
use reqwest::multipart;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// An incoming update from long polling
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    /// "private", "group", "supergroup" or "channel"
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMember {
    pub user: User,
}

/// Envelope every Bot API response arrives in
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Telegram Bot API client
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    base_url: String,
}

impl TelegramClient {
    /// Create a client for a bot token
    pub fn new(token: &str) -> Self {
        Self::with_base_url(TELEGRAM_API_URL, token)
    }

    /// Create a client against a custom API host (used by tests)
    pub fn with_base_url(base_url: &str, token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: format!("{}/bot{}", base_url.trim_end_matches('/'), token),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let resp = self
            .client
            .post(format!("{}/{}", self.base_url, method))
            .json(&body)
            .send()
            .await?;

        let envelope: ApiResponse<T> = resp.json().await?;
        unwrap_envelope(method, envelope)
    }

    /// Long-poll for updates past `offset`
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message"],
            }),
        )
        .await
    }

    /// Send a message; `parse_mode` is "Markdown", "HTML" or None for plain
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<&str>,
    ) -> Result<Message> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(mode) = parse_mode {
            body["parse_mode"] = json!(mode);
        }
        debug!(chat_id, "Sending message");
        self.call("sendMessage", body).await
    }

    /// Reply to a message in its chat, Markdown parse mode
    pub async fn reply_to(&self, message: &Message, text: &str) -> Result<Message> {
        self.call(
            "sendMessage",
            json!({
                "chat_id": message.chat.id,
                "text": text,
                "parse_mode": "Markdown",
                "reply_to_message_id": message.message_id,
            }),
        )
        .await
    }

    /// Upload a document from memory with an optional caption
    pub async fn send_document(
        &self,
        chat_id: i64,
        filename: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<Message> {
        let part = multipart::Part::bytes(bytes).file_name(filename.to_string());
        let mut form = multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", part);
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }

        let resp = self
            .client
            .post(format!("{}/sendDocument", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let envelope: ApiResponse<Message> = resp.json().await?;
        unwrap_envelope("sendDocument", envelope)
    }

    /// Resolve a chat member by user id
    pub async fn get_chat_member(&self, chat_id: i64, user_id: i64) -> Result<ChatMember> {
        self.call(
            "getChatMember",
            json!({
                "chat_id": chat_id,
                "user_id": user_id,
            }),
        )
        .await
    }

    /// First name of a chat member, falling back to the bare id
    pub async fn member_name(&self, chat_id: i64, user_id: i64) -> String {
        match self.get_chat_member(chat_id, user_id).await {
            Ok(member) => member.user.first_name,
            Err(e) => {
                error!(user_id, "Failed to resolve chat member: {}", e);
                user_id.to_string()
            }
        }
    }
}

/// Markdown mention linking to the user profile
pub fn mention(user: &User) -> String {
    format!("[{}](tg://user?id={})", user.first_name, user.id)
}

fn unwrap_envelope<T>(method: &str, envelope: ApiResponse<T>) -> Result<T> {
    if !envelope.ok {
        return Err(TomeError::Telegram(format!(
            "{} failed: {}",
            method,
            envelope.description.unwrap_or_else(|| "unknown".to_string())
        )));
    }
    envelope
        .result
        .ok_or_else(|| TomeError::Telegram(format!("{} returned an empty result", method)))
}
