//! Error types for plugin host operations.

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during plugin host operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A `require` for a name nothing has defined.
    #[error("module not defined: {0}")]
    ModuleNotFound(String),

    /// Plugin id has no record.
    #[error("plugin not found: {0}")]
    PluginNotFound(String),

    /// Plugin id already has a live (non-terminal) record.
    #[error("plugin already active: {0}")]
    PluginAlreadyActive(String),

    /// `init_plugin` called before any init function was registered.
    #[error("no init function registered for plugin: {0}")]
    InitNotRegistered(String),

    /// The plugin's init function failed.
    #[error("plugin init failed: {id}: {reason}")]
    InitFailed {
        /// Plugin id.
        id: String,
        /// Failure description from the init function.
        reason: String,
    },

    /// The plugin's unmount function failed. Teardown still completes.
    #[error("plugin unmount failed: {id}: {reason}")]
    UnmountFailed {
        /// Plugin id.
        id: String,
        /// Failure description from the unmount function.
        reason: String,
    },

    /// Formatter id already registered.
    #[error("formatter already registered: {0}")]
    DuplicateFormatter(String),

    /// File handler id already registered.
    #[error("file handler already registered: {0}")]
    DuplicateFileHandler(String),

    /// No formatter resolvable for the active file.
    #[error("no formatter available: {0}")]
    NoFormatter(String),

    /// Malformed registration options or invalid dialog input.
    #[error("validation error: {0}")]
    Validation(String),

    /// The user cancelled an interaction that required a value.
    #[error("cancelled by user")]
    Cancelled,

    /// Operation attempted in the wrong lifecycle state.
    #[error("invalid plugin state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state.
        expected: String,
        /// Actual state.
        actual: String,
    },

    /// Failure inside an injected host collaborator (file system, installer).
    #[error("host service error: {0}")]
    Host(String),

    /// Host reached its configured plugin capacity.
    #[error("plugin capacity reached: max {0} plugins")]
    CapacityReached(usize),
}

impl Error {
    /// Create a module not found error.
    pub fn module_not_found(name: impl Into<String>) -> Self {
        Self::ModuleNotFound(name.into())
    }

    /// Create a plugin not found error.
    pub fn plugin_not_found(id: impl Into<String>) -> Self {
        Self::PluginNotFound(id.into())
    }

    /// Create an init failed error.
    pub fn init_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InitFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create an unmount failed error.
    pub fn unmount_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnmountFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a no-formatter error.
    pub fn no_formatter(msg: impl Into<String>) -> Self {
        Self::NoFormatter(msg.into())
    }

    /// Create an invalid state error.
    pub fn invalid_state(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::InvalidState {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a host service error.
    pub fn host(msg: impl Into<String>) -> Self {
        Self::Host(msg.into())
    }

    /// Returns true if this error is a duplicate-id collision.
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            Self::PluginAlreadyActive(_)
                | Self::DuplicateFormatter(_)
                | Self::DuplicateFileHandler(_)
        )
    }

    /// Returns true if this error is a lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ModuleNotFound(_) | Self::PluginNotFound(_) | Self::InitNotRegistered(_)
        )
    }

    /// Returns true if this error came from the user dismissing a dialog.
    pub fn is_user_cancel(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns true if this error was raised inside a plugin's own
    /// lifecycle callback rather than by the host.
    pub fn is_plugin_fault(&self) -> bool {
        matches!(self, Self::InitFailed { .. } | Self::UnmountFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::module_not_found("fsOperation");
        assert_eq!(err.to_string(), "module not defined: fsOperation");

        let err = Error::init_failed("my-plugin", "page unavailable");
        assert!(err.to_string().contains("my-plugin"));
        assert!(err.to_string().contains("page unavailable"));
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::module_not_found("x").is_not_found());
        assert!(!Error::module_not_found("x").is_duplicate());

        assert!(Error::DuplicateFileHandler("h".into()).is_duplicate());
        assert!(Error::PluginAlreadyActive("p".into()).is_duplicate());

        assert!(Error::Cancelled.is_user_cancel());
        assert!(!Error::Cancelled.is_plugin_fault());

        assert!(Error::init_failed("p", "boom").is_plugin_fault());
        assert!(Error::unmount_failed("p", "boom").is_plugin_fault());
    }
}
