//! Notification service: fire-and-forget user notifications.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationKind {
    /// Informational.
    #[default]
    Info,
    /// Warning.
    Warning,
    /// Error. Never silently dropped by the service.
    Error,
    /// Success.
    Success,
}

impl NotificationKind {
    /// Check if this is an error notification.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Success => "success",
        };
        write!(f, "{}", name)
    }
}

/// Action invoked when the notification is interacted with.
pub type NotificationActionFn = Box<dyn FnOnce() + Send>;

/// Options for a notification.
pub struct NotificationOptions {
    /// Icon: URL, base64 image, icon class, or inline SVG.
    pub icon: Option<String>,
    /// Whether the rendered notification should auto close.
    pub auto_close: bool,
    /// Action callback, invoked at most once.
    pub action: Option<NotificationActionFn>,
    /// Severity.
    pub kind: NotificationKind,
}

impl Default for NotificationOptions {
    fn default() -> Self {
        Self {
            icon: None,
            auto_close: true,
            action: None,
            kind: NotificationKind::Info,
        }
    }
}

impl NotificationOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the icon.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Set auto-close behavior.
    pub fn with_auto_close(mut self, auto_close: bool) -> Self {
        self.auto_close = auto_close;
        self
    }

    /// Set the action callback.
    pub fn with_action<F>(mut self, action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.action = Some(Box::new(action));
        self
    }

    /// Set the severity.
    pub fn with_kind(mut self, kind: NotificationKind) -> Self {
        self.kind = kind;
        self
    }
}

impl std::fmt::Debug for NotificationOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationOptions")
            .field("icon", &self.icon)
            .field("auto_close", &self.auto_close)
            .field("has_action", &self.action.is_some())
            .field("kind", &self.kind)
            .finish()
    }
}

/// A dispatched notification.
///
/// Ephemeral: no identity beyond its single dispatch, and no external
/// handle to cancel it. The rendering layer calls [`activate`] on user
/// interaction.
///
/// [`activate`]: Notification::activate
pub struct Notification {
    title: String,
    message: String,
    icon: Option<String>,
    auto_close: bool,
    kind: NotificationKind,
    action: Mutex<Option<NotificationActionFn>>,
}

impl Notification {
    /// Notification title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Notification body.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Icon, if set.
    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    /// Whether the rendered notification auto closes.
    pub fn auto_close(&self) -> bool {
        self.auto_close
    }

    /// Severity.
    pub fn kind(&self) -> NotificationKind {
        self.kind
    }

    /// Run the action callback.
    ///
    /// The callback fires at most once regardless of how many times the
    /// notification is interacted with. Returns whether it ran.
    pub fn activate(&self) -> bool {
        let action = self.action.lock().take();
        match action {
            Some(action) => {
                action();
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notification")
            .field("title", &self.title)
            .field("kind", &self.kind)
            .field("auto_close", &self.auto_close)
            .finish()
    }
}

/// Rendering boundary for notifications.
pub trait NotificationSink: Send + Sync {
    /// Render a dispatched notification.
    fn deliver(&self, notification: Arc<Notification>);
}

/// Configuration for the notification service.
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    /// Maximum retained notifications. Error notifications do not count
    /// against the cap.
    pub history_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            history_capacity: 32,
        }
    }
}

impl NotificationConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the history capacity.
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }
}

/// Fire-and-forget notification dispatch with bounded retention.
///
/// The retention queue evicts oldest-first but skips error notifications:
/// an error stays observable even when the rendered toast auto-closed.
pub struct NotificationService {
    config: NotificationConfig,
    sink: Arc<dyn NotificationSink>,
    history: Mutex<VecDeque<Arc<Notification>>>,
}

impl NotificationService {
    /// Create a service delivering to `sink`.
    pub fn new(config: NotificationConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            config,
            sink,
            history: Mutex::new(VecDeque::new()),
        }
    }

    /// Push a notification. Fire and forget: no handle is returned.
    pub fn push(&self, title: impl Into<String>, message: impl Into<String>, options: NotificationOptions) {
        let notification = Arc::new(Notification {
            title: title.into(),
            message: message.into(),
            icon: options.icon,
            auto_close: options.auto_close,
            kind: options.kind,
            action: Mutex::new(options.action),
        });

        if notification.kind.is_error() {
            tracing::error!(title = %notification.title, "error notification: {}", notification.message);
        } else {
            tracing::debug!(title = %notification.title, kind = %notification.kind, "notification pushed");
        }

        self.retain(notification.clone());
        self.sink.deliver(notification);
    }

    /// Push a notification reporting an operation failure.
    pub fn push_error(&self, title: impl Into<String>, error: &crate::Error) {
        self.push(
            title,
            error.to_string(),
            NotificationOptions::new().with_kind(NotificationKind::Error),
        );
    }

    /// Recently dispatched notifications, oldest first.
    pub fn recent(&self) -> Vec<Arc<Notification>> {
        self.history.lock().iter().cloned().collect()
    }

    /// Retained error notifications, oldest first.
    pub fn errors(&self) -> Vec<Arc<Notification>> {
        self.history
            .lock()
            .iter()
            .filter(|n| n.kind.is_error())
            .cloned()
            .collect()
    }

    fn retain(&self, notification: Arc<Notification>) {
        let mut history = self.history.lock();
        history.push_back(notification);

        while history.len() > self.config.history_capacity {
            let victim = history.iter().position(|n| !n.kind.is_error());
            match victim {
                Some(index) => {
                    history.remove(index);
                }
                // Only errors remain; the cap yields to the
                // never-drop-errors guarantee.
                None => break,
            }
        }
    }
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService")
            .field("config", &self.config)
            .field("retained", &self.history.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<Arc<Notification>>>,
    }

    impl NotificationSink for RecordingSink {
        fn deliver(&self, notification: Arc<Notification>) {
            self.delivered.lock().push(notification);
        }
    }

    fn service_with_capacity(capacity: usize) -> (NotificationService, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let service = NotificationService::new(
            NotificationConfig::new().with_history_capacity(capacity),
            sink.clone(),
        );
        (service, sink)
    }

    #[test]
    fn test_push_delivers_to_sink() {
        let (service, sink) = service_with_capacity(8);
        service.push("Saved", "All changes written", NotificationOptions::default());

        let delivered = sink.delivered.lock();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].title(), "Saved");
        assert_eq!(delivered[0].kind(), NotificationKind::Info);
        assert!(delivered[0].auto_close());
    }

    #[test]
    fn test_action_fires_at_most_once() {
        let (service, sink) = service_with_capacity(8);
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();

        service.push(
            "Update",
            "Tap to restart",
            NotificationOptions::new().with_action(move || {
                fired_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let notification = sink.delivered.lock()[0].clone();
        assert!(notification.activate());
        assert!(!notification.activate());
        assert!(!notification.activate());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_activate_without_action() {
        let (service, sink) = service_with_capacity(8);
        service.push("Plain", "No action", NotificationOptions::default());
        assert!(!sink.delivered.lock()[0].activate());
    }

    #[test]
    fn test_error_retained_despite_auto_close() {
        let (service, _sink) = service_with_capacity(8);
        service.push(
            "T",
            "M",
            NotificationOptions::new()
                .with_kind(NotificationKind::Error)
                .with_auto_close(true),
        );

        let errors = service.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message(), "M");
    }

    #[test]
    fn test_eviction_skips_errors() {
        let (service, _sink) = service_with_capacity(2);

        service.push(
            "err",
            "broken",
            NotificationOptions::new().with_kind(NotificationKind::Error),
        );
        service.push("a", "1", NotificationOptions::default());
        service.push("b", "2", NotificationOptions::default());
        service.push("c", "3", NotificationOptions::default());

        let recent = service.recent();
        assert_eq!(recent.len(), 2);
        // The error outlived infos pushed after it
        assert!(recent.iter().any(|n| n.title() == "err"));
        assert!(recent.iter().any(|n| n.title() == "c"));
    }

    #[test]
    fn test_errors_exceed_capacity() {
        let (service, _sink) = service_with_capacity(1);

        for i in 0..3 {
            service.push(
                format!("err-{}", i),
                "boom",
                NotificationOptions::new().with_kind(NotificationKind::Error),
            );
        }

        // The cap never drops errors
        assert_eq!(service.errors().len(), 3);
    }

    #[test]
    fn test_push_error_helper() {
        let (service, sink) = service_with_capacity(8);
        service.push_error("Format failed", &crate::Error::no_formatter("json"));

        let delivered = sink.delivered.lock();
        assert_eq!(delivered[0].kind(), NotificationKind::Error);
        assert!(delivered[0].message().contains("json"));
    }
}
