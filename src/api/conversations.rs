//! `/conversations` endpoints and chat message types.

use async_trait::async_trait;
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::backend::ConversationBackend;
use super::client::ApiClient;
use crate::error::ApiError;

/// Default page size for message history.
pub const DEFAULT_MESSAGE_LIMIT: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Active,
    Archived,
    Completed,
}

/// One WhatsApp chat between a page and a sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub page_id: String,
    pub sender_id: String,
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_name: Option<String>,
    pub last_message: String,
    /// Display string chosen by the backend.
    pub last_message_time: String,
    pub status: ConversationStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: String,
    pub content: String,
    pub timestamp: String,
    pub direction: Direction,
}

/// The message-history endpoint answers either a bare list or a wrapper.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessagesPayload {
    List(Vec<Message>),
    Wrapped { messages: Vec<Message> },
}

impl From<MessagesPayload> for Vec<Message> {
    fn from(payload: MessagesPayload) -> Self {
        match payload {
            MessagesPayload::List(messages) | MessagesPayload::Wrapped { messages } => messages,
        }
    }
}

/// A file already hosted elsewhere, sent by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReference {
    pub file_url: String,
    pub file_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Serialize)]
struct TextBody<'a> {
    content: &'a str,
}

const MESSAGES_PATH: &str = "/conversations/messages";

impl ApiClient {
    /// Send a file by URL reference.
    pub async fn send_file(
        &self,
        page_id: &str,
        sender_id: &str,
        file: &FileReference,
    ) -> Result<Message, ApiError> {
        let req = self
            .request(Method::POST, MESSAGES_PATH)
            .await?
            .query(&[("pageId", page_id), ("senderId", sender_id)])
            .json(file);
        self.send_json(req, &Method::POST, MESSAGES_PATH).await
    }

    /// Upload a file as multipart form data.
    pub async fn send_file_bytes(
        &self,
        page_id: &str,
        sender_id: &str,
        bytes: Vec<u8>,
        file_name: &str,
        file_type: &str,
        caption: Option<&str>,
    ) -> Result<Message, ApiError> {
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let mut form = Form::new()
            .part("file", part)
            .text("fileType", file_type.to_string());
        if let Some(cap) = caption {
            form = form.text("caption", cap.to_string());
        }

        let req = self
            .request(Method::POST, MESSAGES_PATH)
            .await?
            .query(&[("pageId", page_id), ("senderId", sender_id)])
            .multipart(form);
        let message: Message = self.send_json(req, &Method::POST, MESSAGES_PATH).await?;
        info!(page_id, sender_id, file_name, "File uploaded to conversation");
        Ok(message)
    }

    /// Forward a conversation payload to an external webhook and return its JSON reply.
    pub async fn forward_to_webhook(
        &self,
        webhook_url: &str,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, ApiError> {
        let req = self.external(Method::POST, webhook_url)?.json(payload);
        self.send_json(req, &Method::POST, webhook_url).await
    }
}

#[async_trait]
impl ConversationBackend for ApiClient {
    async fn list_conversations(&self, page_id: &str) -> Result<Vec<Conversation>, ApiError> {
        let path = "/conversations";
        let req = self
            .request(Method::GET, path)
            .await?
            .query(&[("pageId", page_id)]);
        self.send_json(req, &Method::GET, path).await
    }

    async fn list_messages(
        &self,
        page_id: &str,
        sender_id: &str,
        limit: u32,
    ) -> Result<Vec<Message>, ApiError> {
        let req = self
            .request(Method::GET, MESSAGES_PATH)
            .await?
            .query(&[("pageId", page_id), ("senderId", sender_id)])
            .query(&[("limit", limit)]);
        let payload: MessagesPayload = self.send_json(req, &Method::GET, MESSAGES_PATH).await?;
        Ok(payload.into())
    }

    async fn send_message(
        &self,
        page_id: &str,
        sender_id: &str,
        content: &str,
    ) -> Result<Message, ApiError> {
        let req = self
            .request(Method::POST, MESSAGES_PATH)
            .await?
            .query(&[("pageId", page_id), ("senderId", sender_id)])
            .json(&TextBody { content });
        self.send_json(req, &Method::POST, MESSAGES_PATH).await
    }

    async fn archive_conversation(&self, page_id: &str, sender_id: &str) -> Result<(), ApiError> {
        let path = "/conversations/archive";
        let req = self
            .request(Method::PUT, path)
            .await?
            .query(&[("pageId", page_id), ("senderId", sender_id)])
            .json(&serde_json::json!({}));
        self.send_empty(req, &Method::PUT, path).await?;
        info!(page_id, sender_id, "Conversation archived");
        Ok(())
    }

    async fn mark_read(&self, page_id: &str, sender_id: &str) -> Result<(), ApiError> {
        let path = "/conversations/read";
        let req = self
            .request(Method::PUT, path)
            .await?
            .query(&[("pageId", page_id), ("senderId", sender_id)])
            .json(&serde_json::json!({}));
        self.send_empty(req, &Method::PUT, path).await
    }
}
