use ratatui::widgets::ListState;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, ChatResponse, Workspace};
use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Workspaces,
    Question,
    Answer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    BaseUrl,
    ApiKey,
}

/// What the answer pane shows: idle, loading, then answered or failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerState {
    Idle,
    Loading,
    Answered(String),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// One-line banner under the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, text: text.into() }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, text: text.into() }
    }
}

/// Local rejections; no request is sent when one of these comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please type a question.")]
    EmptyQuestion,
    #[error("Please select a workspace.")]
    NoWorkspace,
    #[error("Still waiting for the previous answer.")]
    Busy,
}

/// Returns the workspace to send to when the submission is acceptable.
pub fn validate_submission<'a>(
    question: &str,
    workspace: Option<&'a str>,
) -> Result<&'a str, ValidationError> {
    if question.trim().is_empty() {
        return Err(ValidationError::EmptyQuestion);
    }
    workspace.ok_or(ValidationError::NoWorkspace)
}

/// User-facing text for an API failure
pub fn describe_error(err: &ApiError) -> String {
    match err {
        ApiError::UnexpectedFormat => "Unexpected response format while fetching workspaces".to_string(),
        ApiError::Status { status, body } if !body.trim().is_empty() => {
            let detail: String = body.trim().chars().take(200).collect();
            format!("Request error: server returned {}: {}", status, detail)
        }
        other => format!("Request error: {}", other),
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Single-line text field with a character cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    pub value: String,
    pub cursor: usize,
}

impl TextInput {
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.chars().count(),
        }
    }

    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.value.chars().count();
    }
}

/// Draft values in the settings popup. Nothing reaches the client until
/// `App::apply_settings`.
#[derive(Debug, Clone)]
pub struct SettingsForm {
    pub base_url: TextInput,
    pub api_key: TextInput,
    pub field: SettingsField,
}

impl SettingsForm {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: TextInput::with_value(&config.base_url),
            api_key: TextInput::with_value(&config.api_key),
            field: SettingsField::BaseUrl,
        }
    }

    pub fn active_input(&mut self) -> &mut TextInput {
        match self.field {
            SettingsField::BaseUrl => &mut self.base_url,
            SettingsField::ApiKey => &mut self.api_key,
        }
    }

    pub fn toggle_field(&mut self) {
        self.field = match self.field {
            SettingsField::BaseUrl => SettingsField::ApiKey,
            SettingsField::ApiKey => SettingsField::BaseUrl,
        };
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Backend
    pub client: ApiClient,

    // Workspace selector
    pub workspaces: Vec<Workspace>,
    pub workspace_state: ListState,
    pub workspace_task: Option<JoinHandle<Result<Vec<Workspace>, ApiError>>>,
    refresh_queued: bool,

    // Question / answer
    pub question: TextInput,
    pub answer: AnswerState,
    pub answer_scroll: u16,
    pub question_task: Option<JoinHandle<Result<ChatResponse, ApiError>>>,

    pub notice: Option<Notice>,
    pub settings: Option<SettingsForm>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(config: Config) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            focus: FocusPane::Workspaces,

            client: ApiClient::new(config),

            workspaces: Vec::new(),
            workspace_state: ListState::default(),
            workspace_task: None,
            refresh_queued: false,

            question: TextInput::default(),
            answer: AnswerState::Idle,
            answer_scroll: 0,
            question_task: None,

            notice: None,
            settings: None,

            animation_frame: 0,
        }
    }

    pub fn config(&self) -> &Config {
        self.client.config()
    }

    pub fn selected_workspace(&self) -> Option<&Workspace> {
        self.workspace_state
            .selected()
            .and_then(|i| self.workspaces.get(i))
    }

    pub fn workspaces_loading(&self) -> bool {
        self.workspace_task.is_some()
    }

    pub fn question_pending(&self) -> bool {
        self.question_task.is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.workspaces_loading() || self.question_pending()
    }

    // Workspace list navigation
    pub fn workspace_nav_down(&mut self) {
        let len = self.workspaces.len();
        if len > 0 {
            let i = self.workspace_state.selected().unwrap_or(0);
            self.workspace_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn workspace_nav_up(&mut self) {
        if !self.workspaces.is_empty() {
            let i = self.workspace_state.selected().unwrap_or(0);
            self.workspace_state.select(Some(i.saturating_sub(1)));
        }
    }

    /// Fetch the workspace list in the background. A refresh requested while a
    /// fetch is running is replayed once that fetch lands, so it sees the
    /// latest settings.
    pub fn refresh_workspaces(&mut self) {
        if self.workspace_task.is_some() {
            self.refresh_queued = true;
            return;
        }
        debug!("fetching workspaces");
        let client = self.client.clone();
        self.workspace_task = Some(tokio::spawn(async move { client.list_workspaces().await }));
    }

    pub fn finish_workspaces(&mut self, result: Result<Vec<Workspace>, ApiError>) {
        let previous = self.selected_workspace().map(Workspace::name);
        match result {
            Ok(workspaces) => {
                info!(count = workspaces.len(), "workspaces loaded");
                let selected = previous
                    .and_then(|name| workspaces.iter().position(|w| w.name() == name))
                    .or(if workspaces.is_empty() { None } else { Some(0) });
                self.workspaces = workspaces;
                self.workspace_state.select(selected);
            }
            Err(err) => {
                warn!(error = %err, "could not load workspaces");
                self.workspaces.clear();
                self.workspace_state.select(None);
                self.notice = Some(Notice::error(describe_error(&err)));
            }
        }
    }

    /// Validate and send the current question. On rejection a warning notice
    /// is set and nothing goes over the wire.
    pub fn submit_question(&mut self) -> Result<(), ValidationError> {
        let selected = self.selected_workspace().map(Workspace::name);
        let checked = if self.question_task.is_some() {
            Err(ValidationError::Busy)
        } else {
            validate_submission(&self.question.value, selected.as_deref()).map(str::to_string)
        };
        let workspace = match checked {
            Ok(workspace) => workspace,
            Err(err) => {
                self.notice = Some(Notice::warning(err.to_string()));
                return Err(err);
            }
        };

        info!(%workspace, chars = self.question.value.chars().count(), "submitting question");
        self.notice = None;
        self.answer = AnswerState::Loading;
        self.answer_scroll = 0;
        self.animation_frame = 0;

        let client = self.client.clone();
        let question = self.question.value.clone();
        self.question_task = Some(tokio::spawn(async move {
            client.ask(&workspace, &question).await
        }));
        Ok(())
    }

    pub fn finish_question(&mut self, result: Result<ChatResponse, ApiError>) {
        self.answer = match result {
            Ok(response) => {
                if response.text_response().is_none() {
                    warn!("chat response has no textResponse field");
                }
                AnswerState::Answered(response.text_or_fallback())
            }
            Err(err) => {
                warn!(error = %err, "question failed");
                AnswerState::Failed(describe_error(&err))
            }
        };
        self.answer_scroll = 0;
    }

    /// Collect any finished background request. Never blocks on a task that
    /// is still running.
    pub async fn poll_tasks(&mut self) {
        if self.question_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.question_task.take() {
                match task.await {
                    Ok(result) => self.finish_question(result),
                    Err(e) => self.answer = AnswerState::Failed(format!("Request error: {}", e)),
                }
            }
        }

        if self.workspace_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.workspace_task.take() {
                let result = task.await;
                if std::mem::take(&mut self.refresh_queued) {
                    // Fetched with settings that have since changed
                    debug!("discarding stale workspace list");
                    self.refresh_workspaces();
                    return;
                }
                match result {
                    Ok(result) => self.finish_workspaces(result),
                    Err(e) => self.notice = Some(Notice::error(format!("Request error: {}", e))),
                }
            }
        }
    }

    // Settings popup
    pub fn open_settings(&mut self) {
        self.settings = Some(SettingsForm::from_config(self.config()));
        self.input_mode = InputMode::Editing;
    }

    pub fn cancel_settings(&mut self) {
        self.settings = None;
        self.input_mode = InputMode::Normal;
    }

    /// Replace base URL and key together, then reload workspaces against the
    /// new backend.
    pub fn apply_settings(&mut self) {
        let Some(form) = self.settings.take() else {
            return;
        };
        let config = Config::new(form.base_url.value, form.api_key.value);
        info!(base_url = %config.base_url, "settings updated");
        self.client.set_config(config);
        self.input_mode = InputMode::Normal;
        self.notice = Some(Notice::success("Settings updated successfully!"));
        self.refresh_workspaces();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.question_pending() || self.workspaces_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_answer_down(&mut self) {
        self.answer_scroll = self.answer_scroll.saturating_add(1);
    }

    pub fn scroll_answer_up(&mut self) {
        self.answer_scroll = self.answer_scroll.saturating_sub(1);
    }
}
