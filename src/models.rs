use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Who authored a message. The backend only ever stores these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single message in conversation order.
///
/// Backend timestamps are offset-less ISO strings (`2025-01-05T14:03:22.123`),
/// so they deserialize as naive datetimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<NaiveDateTime>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: None,
        }
    }
}

/// A full conversation as returned by `GET /chats/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// One row of the `GET /chats` listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "lastMessage", default)]
    pub last_message: String,
    #[serde(default)]
    pub timestamp: String,
}

/// Partial settings update for `PUT /chats/{id}/settings`. Fields left as
/// `None` are omitted from the request so the backend keeps its value.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// One uploaded file as reported by `POST /upload`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub url: String,
    #[serde(default)]
    pub analysis: Option<String>,
}

impl UploadedFile {
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

// Response envelopes.

#[derive(Debug, Deserialize)]
pub struct ChatList {
    pub chats: Vec<ChatSummary>,
}

#[derive(Debug, Deserialize)]
pub struct ChatReply {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<Message>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_accepts_offsetless_timestamp() {
        let msg: Message = serde_json::from_str(
            r#"{"role": "user", "content": "hi", "timestamp": "2025-01-05T14:03:22.123456"}"#,
        )
        .unwrap();
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.timestamp.unwrap().format("%H:%M").to_string(), "14:03");
    }

    #[test]
    fn message_timestamp_is_optional() {
        let msg: Message =
            serde_json::from_str(r#"{"role": "assistant", "content": "hello"}"#).unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.timestamp.is_none());
    }

    #[test]
    fn chat_fills_missing_fields_with_defaults() {
        let chat: Chat = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert_eq!(chat.id, "abc");
        assert!(chat.title.is_empty());
        assert!(chat.messages.is_empty());
    }

    #[test]
    fn summary_maps_camel_case_last_message() {
        let listing: ChatList = serde_json::from_str(
            r#"{"chats": [{"id": "1", "title": "t", "lastMessage": "hey", "timestamp": ""}]}"#,
        )
        .unwrap();
        assert_eq!(listing.chats[0].last_message, "hey");
    }

    #[test]
    fn settings_omits_unset_fields() {
        let body = serde_json::to_string(&ChatSettings {
            system_prompt: Some("be brief".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(body, r#"{"system_prompt":"be brief"}"#);
    }

    #[test]
    fn role_round_trips_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""user""#);
        assert_eq!(
            serde_json::from_str::<Role>(r#""assistant""#).unwrap(),
            Role::Assistant
        );
    }
}
