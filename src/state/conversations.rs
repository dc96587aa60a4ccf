//! Live chat conversations of one WhatsApp page.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::api::{
    Conversation, ConversationBackend, ConversationStatus, DEFAULT_MESSAGE_LIMIT, Direction,
    Message,
};
use crate::error::{ApiError, ConversationError, Error, Result};
use crate::live::{LiveEvent, LiveEventKind};

/// The conversation whose history is on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenConversation {
    pub sender_id: String,
    pub messages: Vec<Message>,
}

/// What a live event changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveChange {
    Ignored,
    MessageAppended,
    PreviewUpdated,
    /// An unknown conversation appeared; the list was reloaded.
    Reloaded,
}

/// `data` of a pushed `message` event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PushedMessage {
    direction: PushedDirection,
    #[serde(default)]
    sender_name: Option<String>,
    message: String,
    #[serde(default)]
    timestamp: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum PushedDirection {
    Incoming,
    Outgoing,
}

/// `data` of a pushed `conversation_update` event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PushedUpdate {
    last_message: String,
    #[serde(default)]
    updated_at: Option<serde_json::Value>,
}

pub struct ConversationStore {
    backend: Arc<dyn ConversationBackend>,
    page_id: String,
    conversations: Vec<Conversation>,
    open: Option<OpenConversation>,
    error: Option<String>,
    loading: bool,
}

impl ConversationStore {
    pub fn new(backend: Arc<dyn ConversationBackend>, page_id: impl Into<String>) -> Self {
        Self {
            backend,
            page_id: page_id.into(),
            conversations: Vec::new(),
            open: None,
            error: None,
            loading: false,
        }
    }

    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn open_conversation(&self) -> Option<&OpenConversation> {
        self.open.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub async fn refresh(&mut self) -> Result<&[Conversation]> {
        self.begin();
        let result = self.backend.list_conversations(&self.page_id).await;
        self.conversations = self.finish("list", result)?;
        debug!(page_id = %self.page_id, count = self.conversations.len(), "Conversations loaded");
        Ok(&self.conversations)
    }

    /// Load a conversation's history and mark it read.
    pub async fn open(&mut self, sender_id: &str) -> Result<&OpenConversation> {
        self.begin();
        let result = self
            .backend
            .list_messages(&self.page_id, sender_id, DEFAULT_MESSAGE_LIMIT)
            .await;
        let messages = self.finish("messages", result)?;

        if let Err(e) = self.backend.mark_read(&self.page_id, sender_id).await {
            warn!(sender_id, error = %e, "Failed to mark conversation read");
        }

        Ok(&*self.open.insert(OpenConversation {
            sender_id: sender_id.to_string(),
            messages,
        }))
    }

    pub fn close(&mut self) {
        self.open = None;
    }

    /// Send a text message to the open conversation.
    pub async fn send(&mut self, content: &str) -> Result<&Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ConversationError::EmptyMessage.into());
        }
        let sender_id = self
            .open
            .as_ref()
            .map(|c| c.sender_id.clone())
            .ok_or(ConversationError::NoneOpen)?;

        self.begin();
        let result = self
            .backend
            .send_message(&self.page_id, &sender_id, content)
            .await;
        let message = self.finish("send", result)?;

        self.update_preview(&sender_id, &message.content, &message.timestamp);
        let open = self.open.as_mut().ok_or(ConversationError::NoneOpen)?;
        open.messages.push(message);
        Ok(&open.messages[open.messages.len() - 1])
    }

    pub async fn archive(&mut self, sender_id: &str) -> Result<()> {
        self.begin();
        let result = self
            .backend
            .archive_conversation(&self.page_id, sender_id)
            .await;
        self.finish("archive", result)?;

        if let Some(conv) = self.conversations.iter_mut().find(|c| c.sender_id == sender_id) {
            conv.status = ConversationStatus::Archived;
        }
        if self.open.as_ref().is_some_and(|c| c.sender_id == sender_id) {
            self.open = None;
        }
        info!(sender_id, "Conversation archived");
        Ok(())
    }

    /// Fold a pushed event into the list and the open conversation.
    pub async fn apply_live(&mut self, event: &LiveEvent) -> Result<LiveChange> {
        if event.page_id != self.page_id {
            debug!(page_id = %event.page_id, "Live event for another page ignored");
            return Ok(LiveChange::Ignored);
        }
        let Some(sender_id) = event.sender_id.as_deref() else {
            debug!(kind = ?event.kind, "Live event without sender ignored");
            return Ok(LiveChange::Ignored);
        };

        match event.kind {
            LiveEventKind::Message => Ok(self.apply_message(sender_id, event)),
            LiveEventKind::ConversationUpdate => {
                let update = match serde_json::from_value::<PushedUpdate>(event.data.clone()) {
                    Ok(update) => update,
                    Err(e) => {
                        warn!(error = %e, "Undecodable conversation update dropped");
                        return Ok(LiveChange::Ignored);
                    }
                };
                let time = update
                    .updated_at
                    .as_ref()
                    .and_then(parse_time)
                    .or_else(|| DateTime::<Utc>::from_timestamp_millis(event.timestamp))
                    .map(|t| t.format("%H:%M").to_string())
                    .unwrap_or_default();

                if self.update_preview(sender_id, &update.last_message, &time) {
                    Ok(LiveChange::PreviewUpdated)
                } else {
                    info!(sender_id, "New conversation detected, reloading");
                    self.refresh().await?;
                    Ok(LiveChange::Reloaded)
                }
            }
            LiveEventKind::Error => {
                warn!(data = %event.data, "Live server reported an error");
                Ok(LiveChange::Ignored)
            }
            LiveEventKind::Typing | LiveEventKind::Read => Ok(LiveChange::Ignored),
        }
    }

    fn apply_message(&mut self, sender_id: &str, event: &LiveEvent) -> LiveChange {
        let Some(open) = self.open.as_mut().filter(|c| c.sender_id == sender_id) else {
            return LiveChange::Ignored;
        };
        let pushed = match serde_json::from_value::<PushedMessage>(event.data.clone()) {
            Ok(pushed) => pushed,
            Err(e) => {
                warn!(error = %e, "Undecodable live message dropped");
                return LiveChange::Ignored;
            }
        };

        let timestamp = pushed
            .timestamp
            .as_ref()
            .and_then(parse_time)
            .or_else(|| DateTime::<Utc>::from_timestamp_millis(event.timestamp))
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        let (sender, direction) = match pushed.direction {
            PushedDirection::Incoming => (
                pushed.sender_name.unwrap_or_else(|| "Usuario".to_string()),
                Direction::Inbound,
            ),
            PushedDirection::Outgoing => ("Bot".to_string(), Direction::Outbound),
        };

        open.messages.push(Message {
            id: format!("ws-{}", event.timestamp),
            sender,
            content: pushed.message,
            timestamp,
            direction,
        });
        LiveChange::MessageAppended
    }

    /// Returns false when the sender has no conversation in the list.
    fn update_preview(&mut self, sender_id: &str, last_message: &str, time: &str) -> bool {
        match self.conversations.iter_mut().find(|c| c.sender_id == sender_id) {
            Some(conv) => {
                conv.last_message = last_message.to_string();
                conv.last_message_time = time.to_string();
                true
            }
            None => false,
        }
    }

    fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    fn finish<T>(&mut self, action: &str, result: std::result::Result<T, ApiError>) -> Result<T> {
        self.loading = false;
        result.map_err(|e| {
            warn!(action, page_id = %self.page_id, error = %e, "Conversation request failed");
            self.error = Some(e.to_string());
            Error::from(e)
        })
    }
}

/// Accept epoch milliseconds or an RFC 3339 string.
fn parse_time(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        _ => None,
    }
}
