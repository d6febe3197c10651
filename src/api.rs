use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;

use crate::models::{
    Chat, ChatList, ChatReply, ChatSettings, ChatSummary, HistoryResponse, Message,
    UploadResponse, UploadedFile,
};

/// Every failure a backend call can produce: the request never completed
/// (transport or bad JSON), the server answered with a non-success status,
/// or a local file for upload could not be read.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("cannot read {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct SendBody<'a> {
    message: &'a str,
    #[serde(rename = "chatId")]
    chat_id: &'a str,
}

#[derive(Serialize)]
struct EditBody<'a> {
    id: usize,
    content: &'a str,
}

/// Typed client for the chat backend, one method per endpoint.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /chats`
    pub async fn list_chats(&self) -> ApiResult<Vec<ChatSummary>> {
        let response = self.client.get(self.url("/chats")).send().await?;
        let listing: ChatList = check(response).await?.json().await?;
        Ok(listing.chats)
    }

    /// `POST /chats/new`
    pub async fn create_chat(&self) -> ApiResult<Chat> {
        let response = self.client.post(self.url("/chats/new")).send().await?;
        Ok(check(response).await?.json().await?)
    }

    /// `GET /chats/{id}`
    pub async fn get_chat(&self, chat_id: &str) -> ApiResult<Chat> {
        let response = self
            .client
            .get(self.url(&format!("/chats/{}", chat_id)))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// `PUT /chats/{id}/settings`
    pub async fn update_settings(&self, chat_id: &str, settings: &ChatSettings) -> ApiResult<()> {
        let response = self
            .client
            .put(self.url(&format!("/chats/{}/settings", chat_id)))
            .json(settings)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// `DELETE /chats/{id}`
    pub async fn delete_chat(&self, chat_id: &str) -> ApiResult<()> {
        let response = self
            .client
            .delete(self.url(&format!("/chats/{}", chat_id)))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// `POST /chats/{id}/clear` — drop every message, keep the settings.
    pub async fn clear_chat(&self, chat_id: &str) -> ApiResult<()> {
        let response = self
            .client
            .post(self.url(&format!("/chats/{}/clear", chat_id)))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// `POST /chat` — send user text, returns the assistant reply.
    pub async fn send_message(&self, chat_id: &str, message: &str) -> ApiResult<String> {
        let response = self
            .client
            .post(self.url("/chat"))
            .json(&SendBody {
                message,
                chat_id,
            })
            .send()
            .await?;
        let reply: ChatReply = check(response).await?.json().await?;
        Ok(reply.message)
    }

    /// `POST /upload` — multipart upload of local files into a chat. The
    /// backend analyses images and echoes the results back.
    pub async fn upload_files(
        &self,
        chat_id: &str,
        paths: &[std::path::PathBuf],
    ) -> ApiResult<Vec<UploadedFile>> {
        let mut form = Form::new().text("chatId", chat_id.to_string());

        for path in paths {
            let bytes = tokio::fs::read(path).await.map_err(|source| ApiError::Io {
                path: path.clone(),
                source,
            })?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "file".to_string());
            let part = Part::bytes(bytes)
                .file_name(file_name)
                .mime_str(guess_mime(path))
                .map_err(ApiError::Transport)?;
            form = form.part("files", part);
        }

        let response = self
            .client
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await?;
        let uploaded: UploadResponse = check(response).await?.json().await?;
        Ok(uploaded.files)
    }

    /// `GET /history` — the legacy flat, single-conversation log.
    pub async fn history(&self) -> ApiResult<Vec<Message>> {
        let response = self.client.get(self.url("/history")).send().await?;
        let history: HistoryResponse = check(response).await?.json().await?;
        Ok(history.history)
    }

    /// `POST /history/edit` — rewrite a user message by index. The backend
    /// truncates everything after it.
    pub async fn edit_history(&self, index: usize, content: &str) -> ApiResult<()> {
        let response = self
            .client
            .post(self.url("/history/edit"))
            .json(&EditBody { id: index, content })
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// `POST /history/delete/{id}`
    pub async fn delete_history_message(&self, index: usize) -> ApiResult<()> {
        let response = self
            .client
            .post(self.url(&format!("/history/delete/{}", index)))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// `POST /history/delete` — clear the whole legacy log.
    pub async fn clear_history(&self) -> ApiResult<()> {
        let response = self.client.post(self.url("/history/delete")).send().await?;
        check(response).await?;
        Ok(())
    }
}

/// Map non-success statuses to `ApiError::Status`, keeping the body for the
/// log and alert line.
async fn check(response: reqwest::Response) -> ApiResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status { status, body })
    }
}

/// The backend only accepts a handful of extensions; anything else is sent
/// as an opaque byte stream.
fn guess_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("txt") => "text/plain",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}
