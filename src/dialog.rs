//! Dialog/interaction service: asynchronous user-facing prompts,
//! confirmations, selections, and the loader overlay.
//!
//! The service owns validation and settlement; rendering is delegated to a
//! [`DialogPresenter`] injected by the host UI layer. Every operation
//! settles exactly once per call, and cancellation is a distinct result
//! arm, never an empty value.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;

/// Result of a dialog interaction.
///
/// Callers must handle both arms: a cancelled prompt is not an empty
/// confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer<T> {
    /// The user confirmed with a value.
    Value(T),
    /// The user dismissed the dialog.
    Cancelled,
}

impl<T> Answer<T> {
    /// Check if the interaction was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Borrow the confirmed value, if any.
    pub fn as_value(&self) -> Option<&T> {
        match self {
            Self::Value(value) => Some(value),
            Self::Cancelled => None,
        }
    }

    /// Consume into the confirmed value, if any.
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Value(value) => Some(value),
            Self::Cancelled => None,
        }
    }
}

/// Input widget type for prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputKind {
    /// Single-line text.
    #[default]
    Text,
    /// Multi-line text.
    Textarea,
    /// Numeric input.
    Number,
    /// Telephone number.
    Tel,
    /// Search field.
    Search,
    /// Email address.
    Email,
    /// URL.
    Url,
}

/// Custom validation predicate for prompt input.
pub type PromptTestFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Validation options for a prompt.
#[derive(Clone, Default)]
pub struct PromptOptions {
    /// Pattern the input must match.
    pub pattern: Option<Regex>,
    /// Whether empty input is rejected.
    pub required: bool,
    /// Placeholder text.
    pub placeholder: Option<String>,
    /// Custom predicate; input is rejected when it returns false.
    pub test: Option<PromptTestFn>,
}

impl PromptOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a match against `pattern`.
    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Reject empty input.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set placeholder text.
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Set a custom predicate.
    pub fn with_test<F>(mut self, test: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.test = Some(Arc::new(test));
        self
    }

    /// Validate `value` against these options.
    pub fn validate(&self, value: &str) -> Result<(), String> {
        if self.required && value.trim().is_empty() {
            return Err("a value is required".to_string());
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(value) {
                return Err("input does not match the expected format".to_string());
            }
        }
        if let Some(test) = &self.test {
            if !test(value) {
                return Err("input was rejected".to_string());
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for PromptOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptOptions")
            .field("pattern", &self.pattern.as_ref().map(|p| p.as_str()))
            .field("required", &self.required)
            .field("placeholder", &self.placeholder)
            .field("has_test", &self.test.is_some())
            .finish()
    }
}

/// A single prompt request handed to the presenter.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    /// Prompt message.
    pub message: String,
    /// Pre-filled value.
    pub default_value: String,
    /// Input widget type.
    pub kind: InputKind,
    /// Validation options.
    pub options: PromptOptions,
}

/// One input row of a multi-prompt.
#[derive(Clone, Default)]
pub struct Input {
    /// Input id; also keys the returned value.
    pub id: String,
    /// Input widget type.
    pub kind: InputKind,
    /// Pre-filled value.
    pub value: Option<String>,
    /// Placeholder text.
    pub placeholder: Option<String>,
    /// Hint text shown under the input.
    pub hints: Option<String>,
    /// Whether empty input is rejected.
    pub required: bool,
    /// Pattern the input must match.
    pub pattern: Option<Regex>,
    /// Render read-only.
    pub read_only: bool,
    /// Focus this input when the dialog opens.
    pub autofocus: bool,
    /// Render hidden.
    pub hidden: bool,
}

impl Input {
    /// Create an input with an id.
    pub fn new(id: impl Into<String>, kind: InputKind) -> Self {
        Self {
            id: id.into(),
            kind,
            ..Self::default()
        }
    }

    /// Set the pre-filled value.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set placeholder text.
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Reject empty input.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Require a match against `pattern`.
    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    fn validate(&self, value: &str) -> Result<(), String> {
        if self.required && value.trim().is_empty() {
            return Err(format!("{}: a value is required", self.id));
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(value) {
                return Err(format!("{}: input does not match the expected format", self.id));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Input {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Input")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .finish()
    }
}

/// One row of a select dialog.
#[derive(Debug, Clone)]
pub struct SelectOption {
    /// Value returned when this row is chosen.
    pub value: String,
    /// Display label.
    pub label: String,
    /// Icon class or URL.
    pub icon: Option<String>,
    /// Render disabled.
    pub disabled: bool,
}

impl SelectOption {
    /// Create an enabled option.
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            icon: None,
            disabled: false,
        }
    }

    /// Set the icon.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Render disabled.
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// Presentation knobs for a select dialog.
#[derive(Debug, Clone)]
pub struct SelectConfig {
    /// Pre-selected value.
    pub default_value: Option<String>,
    /// Dismiss the dialog as soon as a row is chosen.
    pub hide_on_select: bool,
    /// Apply the UI's text transform to labels.
    pub text_transform: bool,
}

impl Default for SelectConfig {
    fn default() -> Self {
        Self {
            default_value: None,
            hide_on_select: true,
            text_transform: false,
        }
    }
}

impl SelectConfig {
    /// Create default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pre-selected value.
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// What the file browser lets the user pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseMode {
    /// Files only.
    File,
    /// Folders only.
    Folder,
    /// Either.
    Both,
}

/// One listed entry of a browsed folder.
#[derive(Debug, Clone)]
pub struct BrowseEntry {
    /// Entry name.
    pub name: String,
    /// Entry URI.
    pub uri: String,
    /// Resolved URL.
    pub url: String,
    /// Entry is a directory.
    pub is_directory: bool,
    /// Entry is a file.
    pub is_file: bool,
    /// Mime type, when known.
    pub mime: Option<String>,
    /// Icon class.
    pub icon: Option<String>,
}

/// Outcome of a file browser interaction.
#[derive(Debug, Clone)]
pub enum BrowseResult {
    /// A file was picked.
    File {
        /// File name.
        name: String,
        /// File URL.
        url: String,
    },
    /// A folder was picked.
    Folder {
        /// Folder name.
        name: String,
        /// Folder URL.
        url: String,
        /// Folder contents at pick time.
        list: Vec<BrowseEntry>,
        /// Scroll position of the listing.
        scroll: f64,
    },
}

/// Raw single-value submission from the presenter.
#[derive(Debug, Clone)]
pub enum Submission {
    /// A value was submitted.
    Value(String),
    /// The dialog was dismissed.
    Cancelled,
}

/// Raw multi-prompt submission from the presenter.
#[derive(Debug, Clone)]
pub enum MultiSubmission {
    /// All input values, in input order.
    Values(Vec<String>),
    /// The dialog was dismissed.
    Cancelled,
}

/// Raw file browser submission from the presenter.
#[derive(Debug, Clone)]
pub enum BrowseSubmission {
    /// An entry was picked.
    Picked(BrowseResult),
    /// The browser was dismissed.
    Cancelled,
}

/// Rendering boundary for dialogs.
///
/// Implementations render a dialog, wait for the user, and return the raw
/// submission. Validation and re-presentation live in the service; a
/// presenter is called again with an error message when the previous
/// submission failed validation.
#[async_trait]
pub trait DialogPresenter: Send + Sync {
    /// Show an alert; returns when dismissed.
    async fn alert(&self, title: &str, message: &str);

    /// Show a confirmation; false on dismiss.
    async fn confirm(&self, title: &str, message: &str) -> bool;

    /// Show a prompt. `error` carries the rejection message of the
    /// previous submission, if any.
    async fn prompt(&self, request: &PromptRequest, error: Option<&str>) -> Submission;

    /// Show a multi-input prompt.
    async fn multi_prompt(
        &self,
        title: &str,
        inputs: &[Input],
        help: &str,
        error: Option<&str>,
    ) -> MultiSubmission;

    /// Show a select dialog.
    async fn select(
        &self,
        title: &str,
        options: &[SelectOption],
        config: &SelectConfig,
    ) -> Submission;

    /// Show the file browser.
    async fn file_browser(&self, mode: BrowseMode, info: &str, open_last: bool) -> BrowseSubmission;

    /// Show the loader overlay.
    fn show_loader(&self, title: &str, message: &str);

    /// Hide the loader overlay.
    fn hide_loader(&self);
}

/// Cancellation settings for a loader.
#[derive(Clone)]
pub struct LoaderCancel {
    /// How long until the loader cancels itself.
    pub timeout: Duration,
    /// Invoked exactly once when the timeout fires.
    pub callback: Arc<dyn Fn() + Send + Sync>,
}

impl LoaderCancel {
    /// Create cancellation settings.
    pub fn new<F>(timeout: Duration, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            timeout,
            callback: Arc::new(callback),
        }
    }
}

impl std::fmt::Debug for LoaderCancel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderCancel")
            .field("timeout", &self.timeout)
            .finish()
    }
}

struct ActiveLoader {
    generation: u64,
    settled: Arc<AtomicBool>,
}

/// Handle to a shown loader.
pub struct LoaderHandle {
    presenter: Arc<dyn DialogPresenter>,
    slot: Arc<Mutex<Option<ActiveLoader>>>,
    generation: u64,
    settled: Arc<AtomicBool>,
}

impl LoaderHandle {
    /// Hide the loader. Idempotent; suppresses a pending timeout.
    pub fn hide(&self) {
        if self.settled.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut slot = self.slot.lock();
        if slot.as_ref().map(|active| active.generation) == Some(self.generation) {
            *slot = None;
            self.presenter.hide_loader();
        }
    }
}

impl std::fmt::Debug for LoaderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderHandle")
            .field("generation", &self.generation)
            .finish()
    }
}

/// Configuration for the dialog service.
#[derive(Debug, Clone, Default)]
pub struct DialogConfig {
    /// Give up after this many rejected prompt submissions, treating the
    /// interaction as cancelled. `None` keeps the dialog open until valid
    /// input or explicit dismissal.
    pub retry_limit: Option<usize>,
}

impl DialogConfig {
    /// Create default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retry limit.
    pub fn with_retry_limit(mut self, limit: usize) -> Self {
        self.retry_limit = Some(limit);
        self
    }
}

/// Mediates user-facing asynchronous interactions.
pub struct DialogService {
    config: DialogConfig,
    presenter: Arc<dyn DialogPresenter>,
    loader: Arc<Mutex<Option<ActiveLoader>>>,
    loader_generation: AtomicU64,
}

impl DialogService {
    /// Create a service rendering through `presenter`.
    pub fn new(config: DialogConfig, presenter: Arc<dyn DialogPresenter>) -> Self {
        Self {
            config,
            presenter,
            loader: Arc::new(Mutex::new(None)),
            loader_generation: AtomicU64::new(0),
        }
    }

    /// Show an alert. Settles when the user dismisses it.
    pub async fn alert(&self, title: &str, message: &str) {
        self.presenter.alert(title, message).await;
    }

    /// Show a confirmation dialog. Dismissal counts as `false`.
    pub async fn confirm(&self, title: &str, message: &str) -> bool {
        self.presenter.confirm(title, message).await
    }

    /// Show a prompt and validate input until it passes or the user
    /// cancels. Invalid input never settles the call; the dialog is
    /// re-presented with the rejection message.
    pub async fn prompt(
        &self,
        message: &str,
        default_value: &str,
        kind: InputKind,
        options: PromptOptions,
    ) -> Answer<String> {
        let request = PromptRequest {
            message: message.to_string(),
            default_value: default_value.to_string(),
            kind,
            options,
        };

        let mut error: Option<String> = None;
        let mut attempts = 0usize;
        loop {
            match self.presenter.prompt(&request, error.as_deref()).await {
                Submission::Cancelled => return Answer::Cancelled,
                Submission::Value(value) => match request.options.validate(&value) {
                    Ok(()) => return Answer::Value(value),
                    Err(reason) => {
                        attempts += 1;
                        if let Some(limit) = self.config.retry_limit {
                            if attempts >= limit {
                                tracing::debug!("prompt retry limit reached, treating as cancelled");
                                return Answer::Cancelled;
                            }
                        }
                        error = Some(reason);
                    }
                },
            }
        }
    }

    /// Show a multi-input prompt; resolves all values in input order.
    pub async fn multi_prompt(
        &self,
        title: &str,
        inputs: &[Input],
        help: &str,
    ) -> Answer<Vec<String>> {
        let mut error: Option<String> = None;
        let mut attempts = 0usize;
        loop {
            match self
                .presenter
                .multi_prompt(title, inputs, help, error.as_deref())
                .await
            {
                MultiSubmission::Cancelled => return Answer::Cancelled,
                MultiSubmission::Values(values) => {
                    match validate_multi(inputs, &values) {
                        Ok(()) => return Answer::Value(values),
                        Err(reason) => {
                            attempts += 1;
                            if let Some(limit) = self.config.retry_limit {
                                if attempts >= limit {
                                    return Answer::Cancelled;
                                }
                            }
                            error = Some(reason);
                        }
                    }
                }
            }
        }
    }

    /// Show a select dialog.
    pub async fn select(
        &self,
        title: &str,
        options: &[SelectOption],
        config: &SelectConfig,
    ) -> Answer<String> {
        match self.presenter.select(title, options, config).await {
            Submission::Value(value) => Answer::Value(value),
            Submission::Cancelled => Answer::Cancelled,
        }
    }

    /// Show the file browser.
    pub async fn file_browser(
        &self,
        mode: BrowseMode,
        info: &str,
        open_last: bool,
    ) -> Answer<BrowseResult> {
        match self.presenter.file_browser(mode, info, open_last).await {
            BrowseSubmission::Picked(result) => Answer::Value(result),
            BrowseSubmission::Cancelled => Answer::Cancelled,
        }
    }

    /// Show the loader overlay.
    ///
    /// At most one loader is active: starting a second hides and replaces
    /// the first, whose pending timeout is suppressed. With `cancel` set,
    /// the callback fires exactly once when the timeout elapses before
    /// [`LoaderHandle::hide`] is called. The timeout requires a tokio
    /// runtime.
    pub fn show_loader(
        &self,
        title: &str,
        message: &str,
        cancel: Option<LoaderCancel>,
    ) -> LoaderHandle {
        let generation = self.loader_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let settled = Arc::new(AtomicBool::new(false));

        {
            let mut slot = self.loader.lock();
            if let Some(previous) = slot.take() {
                previous.settled.store(true, Ordering::SeqCst);
                self.presenter.hide_loader();
                tracing::debug!("active loader replaced");
            }
            self.presenter.show_loader(title, message);
            *slot = Some(ActiveLoader {
                generation,
                settled: settled.clone(),
            });
        }

        if let Some(cancel) = cancel {
            let presenter = self.presenter.clone();
            let slot = self.loader.clone();
            let settled = settled.clone();
            tokio::spawn(async move {
                tokio::time::sleep(cancel.timeout).await;
                if settled.swap(true, Ordering::SeqCst) {
                    return;
                }
                {
                    let mut slot = slot.lock();
                    if slot.as_ref().map(|active| active.generation) == Some(generation) {
                        *slot = None;
                        presenter.hide_loader();
                    }
                }
                (cancel.callback)();
            });
        }

        LoaderHandle {
            presenter: self.presenter.clone(),
            slot: self.loader.clone(),
            generation,
            settled,
        }
    }

    /// Check if a loader is currently shown.
    pub fn loader_active(&self) -> bool {
        self.loader.lock().is_some()
    }
}

impl std::fmt::Debug for DialogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogService")
            .field("config", &self.config)
            .field("loader_active", &self.loader_active())
            .finish()
    }
}

fn validate_multi(inputs: &[Input], values: &[String]) -> Result<(), String> {
    if values.len() != inputs.len() {
        return Err("submission is missing fields".to_string());
    }
    for (input, value) in inputs.iter().zip(values) {
        input.validate(value)?;
    }
    Ok(())
}
