use ratatui::widgets::ListState;
use tokio::task::JoinHandle;

use crate::api::{ApiClient, ApiResult};
use crate::config::Config;
use crate::models::{Chat, ChatSettings, ChatSummary, Message, Role, UploadedFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Navigating the chat list / thread.
    Normal,
    /// Typing into the message input.
    Insert,
    /// The settings modal (title, system prompt, model).
    Settings,
    /// Entering file paths to upload.
    UploadPrompt,
    /// Browsing the legacy flat history.
    History,
    /// Editing one legacy history message.
    HistoryEdit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    ChatList,
    Thread,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    Title,
    SystemPrompt,
    Model,
}

impl SettingsField {
    pub fn next(self) -> Self {
        match self {
            SettingsField::Title => SettingsField::SystemPrompt,
            SettingsField::SystemPrompt => SettingsField::Model,
            SettingsField::Model => SettingsField::Title,
        }
    }
}

/// All client session state. Rebuilt from the backend on every fetch; the
/// active chat is a transient cached copy and nothing here persists.
pub struct App {
    pub should_quit: bool,
    pub mode: Mode,
    pub focus: Focus,

    pub api: ApiClient,
    pub config: Config,
    /// Options for the settings model picker.
    pub models: Vec<String>,

    // Chat list
    pub chats: Vec<ChatSummary>,
    pub chat_state: ListState,

    // Active chat (displayed state = last successful fetch)
    pub current: Option<Chat>,

    // Message input
    pub input: String,
    pub input_cursor: usize,

    // Settings modal
    pub settings_field: SettingsField,
    pub title_input: String,
    pub prompt_input: String,
    pub model_index: usize,

    // Upload prompt
    pub upload_input: String,

    // Legacy history view
    pub history: Vec<Message>,
    pub history_state: ListState,
    pub history_input: String,

    // In-flight work. One send or upload at a time; the placeholder is
    // removed on settlement whether it succeeded or not.
    pub loading: bool,
    pub loading_label: &'static str,
    pub reply_task: Option<JoinHandle<ApiResult<String>>>,
    pub upload_task: Option<JoinHandle<ApiResult<Vec<UploadedFile>>>>,

    /// User-visible report of the last failed action.
    pub status: Option<String>,

    // Thread viewport, recorded during render for scroll math
    pub thread_scroll: u16,
    pub thread_height: u16,
    pub thread_width: u16,

    pub animation_frame: u8,
}

impl App {
    pub fn new(config: Config) -> Self {
        let api = ApiClient::new(&config.server_url());
        let models = config.models();

        Self {
            should_quit: false,
            mode: Mode::Normal,
            focus: Focus::ChatList,

            api,
            config,
            models,

            chats: Vec::new(),
            chat_state: ListState::default(),

            current: None,

            input: String::new(),
            input_cursor: 0,

            settings_field: SettingsField::Title,
            title_input: String::new(),
            prompt_input: String::new(),
            model_index: 0,

            upload_input: String::new(),

            history: Vec::new(),
            history_state: ListState::default(),
            history_input: String::new(),

            loading: false,
            loading_label: "Thinking",
            reply_task: None,
            upload_task: None,

            status: None,

            thread_scroll: 0,
            thread_height: 0,
            thread_width: 0,

            animation_frame: 0,
        }
    }

    pub fn current_chat_id(&self) -> Option<String> {
        self.current.as_ref().map(|c| c.id.clone())
    }

    pub fn busy(&self) -> bool {
        self.reply_task.is_some() || self.upload_task.is_some()
    }

    /// Report a failed action without tearing anything down; the session
    /// stays usable.
    pub fn alert(&mut self, message: String) {
        log::error!("{}", message);
        self.status = Some(message);
    }

    // --- Chat list actions ---

    /// Fetch the chat list, then open the most recent chat or create one
    /// if there are none.
    pub async fn init_session(&mut self) {
        self.refresh_chats().await;
        if let Some(first) = self.chats.first().map(|c| c.id.clone()) {
            self.open_chat(first).await;
        } else {
            self.new_chat().await;
        }
    }

    pub async fn refresh_chats(&mut self) {
        log::info!("refreshing chat list");
        match self.api.list_chats().await {
            Ok(chats) => {
                self.chats = chats;
                self.sync_chat_selection();
            }
            Err(e) => self.alert(format!("Failed to load chats: {}", e)),
        }
    }

    fn sync_chat_selection(&mut self) {
        let selected = self
            .current_chat_id()
            .and_then(|id| self.chats.iter().position(|c| c.id == id))
            .or(if self.chats.is_empty() { None } else { Some(0) });
        self.chat_state.select(selected);
    }

    pub async fn open_chat(&mut self, chat_id: String) {
        log::info!("opening chat {}", chat_id);
        match self.api.get_chat(&chat_id).await {
            Ok(chat) => {
                self.current = Some(chat);
                self.status = None;
                self.sync_chat_selection();
                self.scroll_thread_to_bottom();
            }
            Err(e) => self.alert(format!("Failed to load chat: {}", e)),
        }
    }

    pub async fn open_selected(&mut self) {
        if let Some(id) = self
            .chat_state
            .selected()
            .and_then(|i| self.chats.get(i))
            .map(|c| c.id.clone())
        {
            self.open_chat(id).await;
        }
    }

    pub async fn new_chat(&mut self) {
        log::info!("creating new chat");
        match self.api.create_chat().await {
            Ok(chat) => {
                let id = chat.id.clone();
                self.current = Some(chat);
                self.refresh_chats().await;
                self.open_chat(id).await;
            }
            Err(e) => self.alert(format!("Failed to create chat: {}", e)),
        }
    }

    pub async fn delete_selected(&mut self) {
        let Some(id) = self
            .chat_state
            .selected()
            .and_then(|i| self.chats.get(i))
            .map(|c| c.id.clone())
        else {
            return;
        };

        log::info!("deleting chat {}", id);
        if let Err(e) = self.api.delete_chat(&id).await {
            self.alert(format!("Failed to delete chat: {}", e));
            return;
        }

        let deleted_current = self.current_chat_id().as_deref() == Some(id.as_str());
        if deleted_current {
            self.current = None;
        }
        self.refresh_chats().await;
        if deleted_current {
            if let Some(first) = self.chats.first().map(|c| c.id.clone()) {
                self.open_chat(first).await;
            } else {
                self.new_chat().await;
            }
        }
    }

    /// Clear every message of the active chat, keeping its settings.
    pub async fn clear_current(&mut self) {
        let Some(id) = self.current_chat_id() else {
            return;
        };
        log::info!("clearing chat {}", id);
        match self.api.clear_chat(&id).await {
            Ok(()) => {
                if let Some(chat) = self.current.as_mut() {
                    chat.messages.clear();
                }
                self.thread_scroll = 0;
                self.refresh_chats().await;
            }
            Err(e) => self.alert(format!("Failed to clear chat: {}", e)),
        }
    }

    // --- Settings ---

    pub fn open_settings(&mut self) {
        let Some(chat) = self.current.as_ref() else {
            self.alert("Select or create a chat first".to_string());
            return;
        };
        self.title_input = chat.title.clone();
        self.prompt_input = chat.system_prompt.clone();
        self.model_index = self
            .models
            .iter()
            .position(|m| *m == chat.model)
            .unwrap_or(0);
        self.settings_field = SettingsField::Title;
        self.mode = Mode::Settings;
    }

    pub async fn save_settings(&mut self) {
        let Some(id) = self.current_chat_id() else {
            return;
        };
        let model = self
            .models
            .get(self.model_index)
            .cloned()
            .unwrap_or_else(|| self.config.default_model());
        let settings = ChatSettings {
            title: Some(self.title_input.clone()),
            system_prompt: Some(self.prompt_input.clone()),
            model: Some(model.clone()),
        };

        log::info!("updating settings for chat {}", id);
        match self.api.update_settings(&id, &settings).await {
            Ok(()) => {
                if let Some(chat) = self.current.as_mut() {
                    chat.title = self.title_input.clone();
                    chat.system_prompt = self.prompt_input.clone();
                    chat.model = model.clone();
                }
                self.mode = Mode::Normal;
                self.refresh_chats().await;

                self.config.default_model = Some(model);
                if let Err(e) = self.config.save() {
                    log::warn!("could not persist config: {}", e);
                }
            }
            Err(e) => self.alert(format!("Failed to update settings: {}", e)),
        }
    }

    // --- Sending and uploading ---

    /// Echo the user message locally, show the placeholder, and hand the
    /// request to a background task. No cancellation once issued.
    pub fn send(&mut self) {
        let text = self.input.trim().to_string();
        if text.is_empty() || self.busy() {
            return;
        }
        let Some(id) = self.current_chat_id() else {
            self.alert("Select or create a chat first".to_string());
            return;
        };

        self.input.clear();
        self.input_cursor = 0;
        self.status = None;

        if let Some(chat) = self.current.as_mut() {
            chat.messages.push(Message::user(text.clone()));
        }
        self.loading = true;
        self.loading_label = "Thinking";
        self.scroll_thread_to_bottom();

        let api = self.api.clone();
        log::info!("sending message to chat {}", id);
        self.reply_task = Some(tokio::spawn(async move {
            api.send_message(&id, &text).await
        }));
    }

    pub fn upload(&mut self) {
        let paths = split_paths(&self.upload_input);
        if paths.is_empty() || self.busy() {
            return;
        }
        let Some(id) = self.current_chat_id() else {
            self.alert("Select or create a chat first".to_string());
            return;
        };

        self.upload_input.clear();
        self.mode = Mode::Normal;
        self.status = None;
        self.loading = true;
        self.loading_label = "Uploading files";
        self.scroll_thread_to_bottom();

        let api = self.api.clone();
        log::info!("uploading {} file(s) to chat {}", paths.len(), id);
        self.upload_task = Some(tokio::spawn(async move {
            api.upload_files(&id, &paths).await
        }));
    }

    /// Reap finished background work. Runs on every tick; the loading
    /// placeholder goes away on settlement regardless of outcome.
    pub async fn poll_tasks(&mut self) {
        if self
            .reply_task
            .as_ref()
            .is_some_and(|task| task.is_finished())
        {
            let task = self.reply_task.take().expect("checked above");
            self.loading = false;
            match task.await {
                Ok(Ok(reply)) => {
                    if let Some(chat) = self.current.as_mut() {
                        chat.messages.push(Message::assistant(reply));
                    }
                    self.scroll_thread_to_bottom();
                }
                Ok(Err(e)) => self.alert(format!("AI reply failed: {}", e)),
                Err(e) => self.alert(format!("AI reply failed: {}", e)),
            }
        }

        if self
            .upload_task
            .as_ref()
            .is_some_and(|task| task.is_finished())
        {
            let task = self.upload_task.take().expect("checked above");
            self.loading = false;
            match task.await {
                Ok(Ok(files)) => self.apply_upload(files),
                Ok(Err(e)) => self.alert(format!("File upload failed: {}", e)),
                Err(e) => self.alert(format!("File upload failed: {}", e)),
            }
        }
    }

    /// Mirror the backend's own history writes: an image becomes a user
    /// `<img>` message followed by the analysis as an assistant message,
    /// anything else a user link message.
    pub fn apply_upload(&mut self, files: Vec<UploadedFile>) {
        let Some(chat) = self.current.as_mut() else {
            return;
        };
        for file in files {
            if file.is_image() {
                chat.messages.push(Message::user(format!(
                    "<img src=\"{}\" alt=\"{}\">",
                    file.url, file.name
                )));
                if let Some(analysis) = file.analysis {
                    chat.messages.push(Message::assistant(analysis));
                }
            } else {
                chat.messages.push(Message::user(format!(
                    "<a href=\"{}\" target=\"_blank\">{}</a>",
                    file.url, file.name
                )));
            }
        }
        self.scroll_thread_to_bottom();
    }

    // --- Legacy history ---

    pub async fn open_history(&mut self) {
        log::info!("loading legacy history");
        match self.api.history().await {
            Ok(history) => {
                self.history = history;
                self.history_state
                    .select(if self.history.is_empty() { None } else { Some(0) });
                self.mode = Mode::History;
            }
            Err(e) => self.alert(format!("Failed to load history: {}", e)),
        }
    }

    pub fn selected_history_message(&self) -> Option<&Message> {
        self.history_state
            .selected()
            .and_then(|i| self.history.get(i))
    }

    /// Only user messages are editable; the backend rejects the rest.
    pub fn begin_history_edit(&mut self) {
        match self.selected_history_message() {
            Some(msg) if msg.role == Role::User => {
                self.history_input = msg.content.clone();
                self.mode = Mode::HistoryEdit;
            }
            Some(_) => self.alert("Only your own messages can be edited".to_string()),
            None => {}
        }
    }

    pub async fn submit_history_edit(&mut self) {
        let Some(index) = self.history_state.selected() else {
            return;
        };
        let content = self.history_input.clone();
        match self.api.edit_history(index, &content).await {
            Ok(()) => {
                self.mode = Mode::History;
                self.open_history().await;
            }
            Err(e) => self.alert(format!("Failed to edit message: {}", e)),
        }
    }

    pub async fn delete_history_selected(&mut self) {
        let Some(index) = self.history_state.selected() else {
            return;
        };
        match self.api.delete_history_message(index).await {
            Ok(()) => self.open_history().await,
            Err(e) => self.alert(format!("Failed to delete message: {}", e)),
        }
    }

    pub async fn clear_history(&mut self) {
        match self.api.clear_history().await {
            Ok(()) => self.open_history().await,
            Err(e) => self.alert(format!("Failed to clear history: {}", e)),
        }
    }

    // --- Chat list navigation ---

    pub fn chat_nav_down(&mut self) {
        let len = self.chats.len();
        if len > 0 {
            let i = self.chat_state.selected().unwrap_or(0);
            self.chat_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn chat_nav_up(&mut self) {
        if !self.chats.is_empty() {
            let i = self.chat_state.selected().unwrap_or(0);
            self.chat_state.select(Some(i.saturating_sub(1)));
        }
    }

    pub fn history_nav_down(&mut self) {
        let len = self.history.len();
        if len > 0 {
            let i = self.history_state.selected().unwrap_or(0);
            self.history_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn history_nav_up(&mut self) {
        if !self.history.is_empty() {
            let i = self.history_state.selected().unwrap_or(0);
            self.history_state.select(Some(i.saturating_sub(1)));
        }
    }

    // --- Animation and scrolling ---

    pub fn tick_animation(&mut self) {
        if self.loading {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Estimate rendered thread height so the newest message (or the
    /// placeholder) stays in view. Mirrors the wrap math used by the
    /// renderer.
    pub fn thread_line_count(&self) -> u16 {
        let wrap_width = if self.thread_width > 0 {
            self.thread_width as usize
        } else {
            50
        };

        let mut total: u16 = 0;
        if let Some(chat) = self.current.as_ref() {
            for msg in &chat.messages {
                total += 1; // role line
                for line in msg.content.lines() {
                    let chars = line.chars().count();
                    if chars == 0 {
                        total += 1;
                    } else {
                        total += chars.div_ceil(wrap_width) as u16;
                    }
                }
                total += 1; // blank line between messages
            }
        }
        if self.loading {
            total += 2; // role line + the animated label
        }
        total
    }

    pub fn scroll_thread_to_bottom(&mut self) {
        let total = self.thread_line_count();
        let visible = if self.thread_height > 0 {
            self.thread_height
        } else {
            20
        };
        self.thread_scroll = total.saturating_sub(visible);
    }

    pub fn scroll_thread_up(&mut self, lines: u16) {
        self.thread_scroll = self.thread_scroll.saturating_sub(lines);
    }

    pub fn scroll_thread_down(&mut self, lines: u16) {
        let max = self
            .thread_line_count()
            .saturating_sub(self.thread_height.max(1));
        self.thread_scroll = (self.thread_scroll + lines).min(max);
    }
}

/// Split the upload prompt into paths on whitespace, with double quotes
/// protecting paths that contain spaces.
fn split_paths(input: &str) -> Vec<std::path::PathBuf> {
    let mut paths = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in input.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    paths.push(std::path::PathBuf::from(std::mem::take(&mut current)));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        paths.push(std::path::PathBuf::from(current));
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use reqwest::StatusCode;

    fn test_app() -> App {
        App::new(Config::new())
    }

    fn chat_with(messages: Vec<Message>) -> Chat {
        Chat {
            id: "c1".to_string(),
            title: String::new(),
            system_prompt: String::new(),
            model: String::new(),
            messages,
        }
    }

    fn failed_call<T: Send + 'static>() -> tokio::task::JoinHandle<crate::api::ApiResult<T>> {
        tokio::spawn(async {
            Err::<T, ApiError>(ApiError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "boom".to_string(),
            })
        })
    }

    #[tokio::test]
    async fn failed_reply_still_removes_the_placeholder() {
        let mut app = test_app();
        app.current = Some(chat_with(vec![Message::user("hello")]));
        app.loading = true;
        app.reply_task = Some(failed_call());

        while !app.reply_task.as_ref().unwrap().is_finished() {
            tokio::task::yield_now().await;
        }
        app.poll_tasks().await;

        assert!(!app.loading);
        assert!(app.status.is_some());
        assert!(app.reply_task.is_none());
        // No assistant message on failure; the echoed user message stays.
        assert_eq!(app.current.as_ref().unwrap().messages.len(), 1);
    }

    #[tokio::test]
    async fn failed_upload_still_removes_the_placeholder() {
        let mut app = test_app();
        app.current = Some(chat_with(Vec::new()));
        app.loading = true;
        app.upload_task = Some(failed_call());

        while !app.upload_task.as_ref().unwrap().is_finished() {
            tokio::task::yield_now().await;
        }
        app.poll_tasks().await;

        assert!(!app.loading);
        assert!(app.status.is_some());
        assert!(app.upload_task.is_none());
        assert!(app.current.as_ref().unwrap().messages.is_empty());
    }

    #[test]
    fn alert_records_status_without_quitting() {
        let mut app = test_app();
        app.alert("Failed to load chats: boom".to_string());
        assert_eq!(app.status.as_deref(), Some("Failed to load chats: boom"));
        assert!(!app.should_quit);
    }

    #[test]
    fn send_without_active_chat_alerts() {
        let mut app = test_app();
        app.input = "hello".to_string();
        app.send();
        assert!(app.status.is_some());
        assert!(!app.loading);
        assert!(app.reply_task.is_none());
    }

    #[test]
    fn send_with_empty_input_is_a_no_op() {
        let mut app = test_app();
        app.input = "   ".to_string();
        app.send();
        assert!(app.status.is_none());
        assert!(app.reply_task.is_none());
    }

    #[test]
    fn upload_echo_mirrors_backend_history_writes() {
        let mut app = test_app();
        app.current = Some(Chat {
            id: "c1".to_string(),
            title: String::new(),
            system_prompt: String::new(),
            model: String::new(),
            messages: Vec::new(),
        });

        app.apply_upload(vec![
            UploadedFile {
                name: "cat.png".to_string(),
                content_type: "image/png".to_string(),
                url: "/uploads/cat.png".to_string(),
                analysis: Some("a cat".to_string()),
            },
            UploadedFile {
                name: "notes.txt".to_string(),
                content_type: "text/plain".to_string(),
                url: "/uploads/notes.txt".to_string(),
                analysis: None,
            },
        ]);

        let messages = &app.current.as_ref().unwrap().messages;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::User);
        assert!(messages[0].content.contains("<img src=\"/uploads/cat.png\""));
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "a cat");
        assert_eq!(messages[2].role, Role::User);
        assert!(messages[2].content.contains("notes.txt"));
    }

    #[test]
    fn assistant_history_messages_are_not_editable() {
        let mut app = test_app();
        app.history = vec![Message::assistant("reply")];
        app.history_state.select(Some(0));
        app.begin_history_edit();
        assert_eq!(app.mode, Mode::Normal);
        assert!(app.status.is_some());
    }

    #[test]
    fn user_history_messages_open_the_editor() {
        let mut app = test_app();
        app.history = vec![Message::user("typo here")];
        app.history_state.select(Some(0));
        app.begin_history_edit();
        assert_eq!(app.mode, Mode::HistoryEdit);
        assert_eq!(app.history_input, "typo here");
    }

    #[test]
    fn thread_scroll_pins_to_bottom() {
        let mut app = test_app();
        app.thread_height = 5;
        app.thread_width = 10;
        app.current = Some(Chat {
            id: "c1".to_string(),
            title: String::new(),
            system_prompt: String::new(),
            model: String::new(),
            messages: (0..10).map(|i| Message::user(format!("msg {}", i))).collect(),
        });

        app.scroll_thread_to_bottom();
        assert_eq!(app.thread_scroll, app.thread_line_count() - 5);

        app.scroll_thread_up(3);
        let up = app.thread_scroll;
        app.scroll_thread_down(100);
        assert!(app.thread_scroll > up);
        assert_eq!(app.thread_scroll, app.thread_line_count() - 5);
    }

    #[test]
    fn full_width_lines_wrap_to_exactly_one_row() {
        let mut app = test_app();
        app.thread_width = 10;
        app.current = Some(chat_with(vec![Message::user("x".repeat(10))]));
        // role line + one wrapped row + trailing blank
        assert_eq!(app.thread_line_count(), 3);

        app.current = Some(chat_with(vec![Message::user("x".repeat(11))]));
        assert_eq!(app.thread_line_count(), 4);
    }

    #[test]
    fn upload_paths_split_on_whitespace_outside_quotes() {
        let paths = split_paths(r#"a.png "my notes.txt"  b.gif"#);
        assert_eq!(
            paths,
            vec![
                std::path::PathBuf::from("a.png"),
                std::path::PathBuf::from("my notes.txt"),
                std::path::PathBuf::from("b.gif"),
            ]
        );
        assert!(split_paths("   ").is_empty());
    }

    #[test]
    fn chat_nav_clamps_at_the_ends() {
        let mut app = test_app();
        app.chats = vec![
            ChatSummary {
                id: "a".to_string(),
                title: "A".to_string(),
                last_message: String::new(),
                timestamp: String::new(),
            },
            ChatSummary {
                id: "b".to_string(),
                title: "B".to_string(),
                last_message: String::new(),
                timestamp: String::new(),
            },
        ];
        app.chat_state.select(Some(0));

        app.chat_nav_up();
        assert_eq!(app.chat_state.selected(), Some(0));
        app.chat_nav_down();
        app.chat_nav_down();
        assert_eq!(app.chat_state.selected(), Some(1));
    }
}
