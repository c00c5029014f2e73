//! Named module registry mediating lookup of shared host services and
//! plugin-exposed capabilities.

use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{Error, Result};

/// Well-known module names seeded by the host before any plugin runs.
pub mod well_known {
    /// File system operations provider.
    pub const FS_OPERATION: &str = "fsOperation";
    /// Loader dialog.
    pub const LOADER: &str = "loader";
    /// Prompt dialog.
    pub const PROMPT: &str = "prompt";
    /// Alert dialog.
    pub const ALERT: &str = "alert";
    /// Confirm dialog.
    pub const CONFIRM: &str = "confirm";
    /// Select dialog.
    pub const SELECT: &str = "select";
    /// Multi-input prompt dialog.
    pub const MULTI_PROMPT: &str = "multiPrompt";
    /// File browser dialog.
    pub const FILE_BROWSER: &str = "fileBrowser";
    /// Notification service.
    pub const NOTIFICATION: &str = "notification";
    /// Plugin registry installer.
    pub const INSTALL_PLUGIN: &str = "installPlugin";
}

/// A registered module: either plain data or a callable service.
///
/// The split lets callers distinguish a config/data payload from a service
/// capability without runtime type probing on an untyped value.
#[derive(Clone)]
pub enum Module {
    /// Data or configuration payload.
    Data(serde_json::Value),
    /// Service capability, recoverable via [`Module::downcast`].
    Service(Arc<dyn Any + Send + Sync>),
}

impl Module {
    /// Wrap a service object.
    ///
    /// Trait-object services go in behind an extra `Arc` (the stored
    /// concrete type is then `Arc<dyn Trait>`, which is what callers
    /// downcast to).
    pub fn service<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self::Service(value)
    }

    /// Wrap a data payload.
    pub fn data(value: impl Into<serde_json::Value>) -> Self {
        Self::Data(value.into())
    }

    /// Check if this module is a service.
    pub fn is_service(&self) -> bool {
        matches!(self, Self::Service(_))
    }

    /// Check if this module is a data payload.
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data(_))
    }

    /// Borrow the data payload, if this is a data module.
    pub fn as_data(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Data(value) => Some(value),
            Self::Service(_) => None,
        }
    }

    /// Recover the typed service behind a service module.
    ///
    /// Returns `None` for data modules and for type mismatches.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        match self {
            Self::Service(service) => service.clone().downcast::<T>().ok(),
            Self::Data(_) => None,
        }
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Data(value) => f.debug_tuple("Data").field(value).finish(),
            Self::Service(_) => f.debug_tuple("Service").field(&"..").finish(),
        }
    }
}

/// Process-wide mapping from string keys to modules.
///
/// Built-ins are seeded at host start-up, before any plugin executes, so a
/// plugin can never observe a host without its dependencies. Redefining an
/// existing name overwrites the previous value with a warning; there is no
/// clear operation, so one plugin cannot evict another's definitions
/// wholesale.
pub struct ModuleRegistry {
    entries: DashMap<String, Module>,
}

impl ModuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Store `module` under `name`, making it retrievable via [`require`].
    ///
    /// [`require`]: ModuleRegistry::require
    pub fn define(&self, name: impl Into<String>, module: Module) {
        let name = name.into();
        if self.entries.insert(name.clone(), module).is_some() {
            tracing::warn!(module = %name, "module redefined, previous value overwritten");
        }
    }

    /// Return the module stored under `name`.
    pub fn require(&self, name: &str) -> Result<Module> {
        self.entries
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::module_not_found(name))
    }

    /// Require a service module and downcast it to `T` in one step.
    pub fn require_service<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        self.require(name)?
            .downcast::<T>()
            .ok_or_else(|| Error::validation(format!("module is not a service of the expected type: {}", name)))
    }

    /// Check if a module is defined.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Get all defined module names.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Get the number of defined modules.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("module_count", &self.entries.len())
            .finish()
    }
}
