//! Plugin record: per-plugin lifecycle bookkeeping and stored callbacks.

use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::lifecycle::PluginState;
use crate::services::SharedPage;

/// Stored plugin init function.
///
/// Invoked with the plugin's base URL, its page handle, and optional
/// install options. The future must complete before the plugin becomes
/// active.
pub type PluginInitFn = Arc<
    dyn Fn(String, SharedPage, Option<serde_json::Value>) -> BoxFuture<'static, Result<()>>
        + Send
        + Sync,
>;

/// Stored plugin unmount function. Absence is valid.
pub type PluginUnmountFn = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// Snapshot of a plugin record.
#[derive(Debug, Clone)]
pub struct PluginInfo {
    /// Plugin id.
    pub id: String,
    /// Local base URL the plugin was served from.
    pub base_url: String,
    /// Current lifecycle state.
    pub state: PluginState,
    /// When the record was created.
    pub installed_at: Instant,
    /// When the plugin became active, if it ever did.
    pub activated_at: Option<Instant>,
}

struct RecordInner {
    id: String,
    base_url: String,
    page: Option<SharedPage>,
    settings: serde_json::Value,
    state: PluginState,
    installed_at: Instant,
    activated_at: Option<Instant>,
}

/// Lifecycle record for one installed plugin.
///
/// The record owns the plugin's page handle while the plugin is
/// initializing or active; teardown releases it before the unmount
/// function runs, so nothing can retain the page past that point.
pub struct PluginRecord {
    inner: RwLock<RecordInner>,
}

impl PluginRecord {
    /// Create a new record in the `Uninitialized` state.
    pub fn new(
        id: impl Into<String>,
        base_url: impl Into<String>,
        page: SharedPage,
        settings: serde_json::Value,
    ) -> Self {
        Self {
            inner: RwLock::new(RecordInner {
                id: id.into(),
                base_url: base_url.into(),
                page: Some(page),
                settings,
                state: PluginState::Uninitialized,
                installed_at: Instant::now(),
                activated_at: None,
            }),
        }
    }

    /// Get the plugin id.
    pub fn id(&self) -> String {
        self.inner.read().id.clone()
    }

    /// Get the plugin's base URL.
    pub fn base_url(&self) -> String {
        self.inner.read().base_url.clone()
    }

    /// Get the current lifecycle state.
    pub fn state(&self) -> PluginState {
        self.inner.read().state
    }

    /// Get the settings blob associated at install time.
    pub fn settings(&self) -> serde_json::Value {
        self.inner.read().settings.clone()
    }

    /// Get the page handle, valid only while the plugin owns it.
    pub fn page(&self) -> Option<SharedPage> {
        let inner = self.inner.read();
        if inner.state.owns_page() {
            inner.page.clone()
        } else {
            None
        }
    }

    /// Get a snapshot of the record.
    pub fn info(&self) -> PluginInfo {
        let inner = self.inner.read();
        PluginInfo {
            id: inner.id.clone(),
            base_url: inner.base_url.clone(),
            state: inner.state,
            installed_at: inner.installed_at,
            activated_at: inner.activated_at,
        }
    }

    /// Transition `Uninitialized → Initializing`.
    ///
    /// Re-init of an unmounted plugin goes through a fresh record, so
    /// this only ever applies to one.
    pub fn begin_init(&self) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.state != PluginState::Uninitialized {
            return Err(Error::invalid_state(
                PluginState::Uninitialized.to_string(),
                inner.state.to_string(),
            ));
        }
        inner.state = PluginState::Initializing;
        Ok(())
    }

    /// Transition `Initializing → Active`.
    pub fn activate(&self) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.state != PluginState::Initializing {
            return Err(Error::invalid_state(
                PluginState::Initializing.to_string(),
                inner.state.to_string(),
            ));
        }
        inner.state = PluginState::Active;
        inner.activated_at = Some(Instant::now());
        Ok(())
    }

    /// Transition `Active → Unmounting`, releasing the page handle.
    ///
    /// Returns the page so the caller can hide it; after this call no
    /// component holds a reference through the record.
    pub fn begin_unmount(&self) -> Result<Option<SharedPage>> {
        let mut inner = self.inner.write();
        if inner.state != PluginState::Active {
            return Err(Error::invalid_state(
                PluginState::Active.to_string(),
                inner.state.to_string(),
            ));
        }
        inner.state = PluginState::Unmounting;
        Ok(inner.page.take())
    }

    /// Transition `Unmounting → Unmounted`. Unconditional once unmounting.
    pub fn finish_unmount(&self) {
        let mut inner = self.inner.write();
        inner.page = None;
        inner.state = PluginState::Unmounted;
    }

    /// Mark a failed init: the record goes terminal and releases the page.
    pub fn fail_init(&self) {
        let mut inner = self.inner.write();
        inner.page = None;
        inner.state = PluginState::Unmounted;
    }
}

impl std::fmt::Debug for PluginRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("PluginRecord")
            .field("id", &inner.id)
            .field("base_url", &inner.base_url)
            .field("state", &inner.state)
            .finish()
    }
}

/// Handle to a plugin record for shared access.
#[derive(Clone)]
pub struct PluginHandle {
    record: Arc<PluginRecord>,
}

impl PluginHandle {
    /// Create a new handle.
    pub fn new(record: PluginRecord) -> Self {
        Self {
            record: Arc::new(record),
        }
    }

    /// Get the plugin id.
    pub fn id(&self) -> String {
        self.record.id()
    }

    /// Get the plugin state.
    pub fn state(&self) -> PluginState {
        self.record.state()
    }

    /// Get a record snapshot.
    pub fn info(&self) -> PluginInfo {
        self.record.info()
    }

    /// Get the underlying record.
    pub fn inner(&self) -> &PluginRecord {
        &self.record
    }
}

impl std::fmt::Debug for PluginHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginHandle")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}
