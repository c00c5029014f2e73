//! Plugin host: lifecycle orchestration and the plugin-facing facade.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::dialog::{
    Answer, BrowseMode, BrowseResult, DialogConfig, DialogPresenter, DialogService, Input,
    InputKind, LoaderCancel, LoaderHandle, PromptOptions, SelectConfig, SelectOption,
};
use crate::error::{Error, Result};
use crate::file_handler::{FileHandlerOptions, FileHandlerRegistry, FileInfo};
use crate::formatter::{Formatter, FormatterRegistry};
use crate::lifecycle::{LifecycleEvent, LifecycleHooks, PluginState};
use crate::notification::{
    NotificationConfig, NotificationOptions, NotificationService, NotificationSink,
};
use crate::plugin::{PluginHandle, PluginInfo, PluginInitFn, PluginRecord, PluginUnmountFn};
use crate::registry::{well_known, Module, ModuleRegistry};
use crate::services::{ActiveDocument, FsOperations, PluginInstaller, SharedPage};

/// Configuration for the plugin host.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Maximum number of live (non-terminal) plugins.
    pub max_plugins: usize,
    /// Notification service configuration.
    pub notifications: NotificationConfig,
    /// Dialog service configuration.
    pub dialogs: DialogConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_plugins: 100,
            notifications: NotificationConfig::default(),
            dialogs: DialogConfig::default(),
        }
    }
}

impl HostConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of live plugins.
    pub fn with_max_plugins(mut self, max: usize) -> Self {
        self.max_plugins = max;
        self
    }

    /// Set the notification configuration.
    pub fn with_notifications(mut self, config: NotificationConfig) -> Self {
        self.notifications = config;
        self
    }

    /// Set the dialog configuration.
    pub fn with_dialogs(mut self, config: DialogConfig) -> Self {
        self.dialogs = config;
        self
    }
}

/// Collaborators injected at host construction.
///
/// The host consumes these purely through their traits and seeds them
/// into the module registry so plugins can `require` them.
pub struct HostContext {
    /// Dialog rendering layer.
    pub presenter: Arc<dyn DialogPresenter>,
    /// Notification rendering layer.
    pub sink: Arc<dyn NotificationSink>,
    /// File system provider.
    pub fs: Arc<dyn FsOperations>,
    /// Plugin registry installer.
    pub installer: Arc<dyn PluginInstaller>,
    /// The editor's view of the active file.
    pub active_doc: Arc<dyn ActiveDocument>,
}

#[derive(Default)]
struct PluginCallbacks {
    init: Option<PluginInitFn>,
    unmount: Option<PluginUnmountFn>,
    settings: Option<serde_json::Value>,
}

/// Census of plugin records by state.
#[derive(Debug, Clone, Default)]
pub struct HostStats {
    /// Total records, terminal included.
    pub total: usize,
    /// Plugins currently active.
    pub active: usize,
    /// Plugins mid-init.
    pub initializing: usize,
    /// Plugins mid-unmount.
    pub unmounting: usize,
    /// Terminal records.
    pub unmounted: usize,
}

/// The plugin host runtime.
///
/// Owns the module registry, the formatter and file-handler registries,
/// the dialog and notification services, and every plugin's lifecycle
/// record. Lifecycle operations on a single plugin id are totally
/// ordered; operations across ids interleave freely, and no registry
/// lock is held across a plugin's awaited init.
pub struct PluginHost {
    config: HostConfig,
    modules: Arc<ModuleRegistry>,
    formatters: Arc<FormatterRegistry>,
    file_handlers: Arc<FileHandlerRegistry>,
    notifications: Arc<NotificationService>,
    dialogs: Arc<DialogService>,
    installer: Arc<dyn PluginInstaller>,
    active_doc: Arc<dyn ActiveDocument>,
    callbacks: DashMap<String, PluginCallbacks>,
    records: DashMap<String, PluginHandle>,
    hooks: Arc<RwLock<LifecycleHooks>>,
}

impl PluginHost {
    /// Create a host and seed the built-in modules.
    ///
    /// Seeding happens here, before any plugin can execute, so a plugin
    /// can never observe a registry without its dependencies.
    pub fn new(config: HostConfig, ctx: HostContext) -> Self {
        let modules = Arc::new(ModuleRegistry::new());
        let dialogs = Arc::new(DialogService::new(config.dialogs.clone(), ctx.presenter));
        let notifications = Arc::new(NotificationService::new(
            config.notifications.clone(),
            ctx.sink,
        ));

        modules.define(
            well_known::FS_OPERATION,
            Module::service(Arc::new(ctx.fs.clone())),
        );
        modules.define(
            well_known::INSTALL_PLUGIN,
            Module::service(Arc::new(ctx.installer.clone())),
        );
        modules.define(well_known::NOTIFICATION, Module::service(notifications.clone()));
        for name in [
            well_known::LOADER,
            well_known::PROMPT,
            well_known::ALERT,
            well_known::CONFIRM,
            well_known::SELECT,
            well_known::MULTI_PROMPT,
            well_known::FILE_BROWSER,
        ] {
            modules.define(name, Module::service(dialogs.clone()));
        }

        tracing::info!(builtins = modules.len(), "plugin host ready");

        Self {
            config,
            modules,
            formatters: Arc::new(FormatterRegistry::new()),
            file_handlers: Arc::new(FileHandlerRegistry::new()),
            notifications,
            dialogs,
            installer: ctx.installer,
            active_doc: ctx.active_doc,
            callbacks: DashMap::new(),
            records: DashMap::new(),
            hooks: Arc::new(RwLock::new(LifecycleHooks::new())),
        }
    }

    /// Get the host configuration.
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Get the module registry.
    pub fn modules(&self) -> &Arc<ModuleRegistry> {
        &self.modules
    }

    /// Get the dialog service.
    pub fn dialogs(&self) -> &Arc<DialogService> {
        &self.dialogs
    }

    /// Get the notification service.
    pub fn notifications(&self) -> &Arc<NotificationService> {
        &self.notifications
    }

    /// Add a lifecycle event handler.
    pub fn on_event<F>(&self, handler: F)
    where
        F: Fn(&LifecycleEvent) + Send + Sync + 'static,
    {
        self.hooks.write().on_event(handler);
    }

    // ---- module registry ----

    /// Define a module.
    pub fn define(&self, name: impl Into<String>, module: Module) {
        self.modules.define(name, module);
    }

    /// Require a module.
    pub fn require(&self, name: &str) -> Result<Module> {
        self.modules.require(name)
    }

    // ---- plugin lifecycle ----

    /// Register a plugin's init function and optional settings.
    ///
    /// Configuration, not a lifecycle transition; re-registration
    /// overwrites.
    pub fn set_plugin_init(
        &self,
        id: impl Into<String>,
        init: PluginInitFn,
        settings: Option<serde_json::Value>,
    ) {
        let id = id.into();
        {
            let mut entry = self.callbacks.entry(id.clone()).or_default();
            entry.init = Some(init);
            if settings.is_some() {
                entry.settings = settings;
            }
        }
        self.hooks.read().emit_registered(&id);
        tracing::debug!(plugin = %id, "plugin init function registered");
    }

    /// Register a plugin's unmount function. Re-registration overwrites.
    pub fn set_plugin_unmount(&self, id: impl Into<String>, unmount: PluginUnmountFn) {
        let id = id.into();
        self.callbacks.entry(id.clone()).or_default().unmount = Some(unmount);
        tracing::debug!(plugin = %id, "plugin unmount function registered");
    }

    /// Get the settings blob associated with a plugin at install time.
    ///
    /// Pure read; `None` for unknown ids.
    pub fn get_plugin_settings(&self, id: &str) -> Option<serde_json::Value> {
        self.callbacks.get(id).and_then(|entry| entry.settings.clone())
    }

    /// Initialize a plugin.
    ///
    /// Creates the lifecycle record and invokes the registered init
    /// function with `(base_url, page, options)`. Rejected when the id
    /// already has a live record, so concurrent double-init yields
    /// exactly one active plugin. A failed init leaves no record behind.
    pub async fn init_plugin(
        &self,
        id: &str,
        base_url: &str,
        page: SharedPage,
        options: Option<serde_json::Value>,
    ) -> Result<()> {
        let init = self
            .callbacks
            .get(id)
            .and_then(|entry| entry.init.clone())
            .ok_or_else(|| Error::InitNotRegistered(id.to_string()))?;

        let census = self.stats();
        if census.active + census.initializing >= self.config.max_plugins {
            return Err(Error::CapacityReached(self.config.max_plugins));
        }

        let settings = self
            .callbacks
            .get(id)
            .and_then(|entry| entry.settings.clone())
            .unwrap_or(serde_json::Value::Null);

        let record = PluginRecord::new(id, base_url, page.clone(), settings);
        record.begin_init()?;
        let handle = PluginHandle::new(record);

        // Atomic check-and-insert: the loser of a same-id race observes a
        // non-terminal record and fails fast.
        match self.records.entry(id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                if !occupied.get().state().is_terminal() {
                    return Err(Error::PluginAlreadyActive(id.to_string()));
                }
                occupied.insert(handle.clone());
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(handle.clone());
            }
        }

        tracing::info!(plugin = %id, base_url = %base_url, "initializing plugin");

        // The awaited init runs with no registry lock held, so other
        // plugins' lifecycle operations proceed freely.
        match init(base_url.to_string(), page, options).await {
            Ok(()) => {
                handle.inner().activate()?;
                self.hooks.read().emit_initialized(id);
                tracing::info!(plugin = %id, "plugin active");
                Ok(())
            }
            Err(err) => {
                let reason = err.to_string();
                // Remove before marking terminal: once terminal, a
                // concurrent re-init may insert a fresh record this
                // removal must not touch.
                self.records.remove(id);
                handle.inner().fail_init();
                self.hooks.read().emit_init_failed(id, &reason);
                tracing::error!(plugin = %id, "plugin init failed: {}", reason);
                Err(Error::init_failed(id, reason))
            }
        }
    }

    /// Unmount a plugin.
    ///
    /// Tolerant: unknown ids and terminal records are a no-op, as is a
    /// repeat call. A plugin still initializing is left alone (init runs
    /// to completion; retry the unmount afterwards). The unmount
    /// function's own failure is logged and surfaced through hooks but
    /// never blocks teardown.
    pub fn unmount_plugin(&self, id: &str) {
        let Some(handle) = self.records.get(id).map(|entry| entry.value().clone()) else {
            tracing::debug!(plugin = %id, "unmount requested for unknown plugin");
            return;
        };

        let state = handle.state();
        if state.is_terminal() || state == PluginState::Unmounting {
            return;
        }
        if !state.can_unmount() {
            tracing::warn!(plugin = %id, state = %state, "unmount deferred: init has not completed");
            return;
        }

        let page = match handle.inner().begin_unmount() {
            Ok(page) => page,
            // Lost a race with another unmount of the same id.
            Err(_) => return,
        };

        if let Some(page) = page {
            page.hide();
        }

        if let Some(unmount) = self.callbacks.get(id).and_then(|entry| entry.unmount.clone()) {
            if let Err(err) = unmount() {
                let reason = err.to_string();
                self.hooks.read().emit_unmount_failed(id, &reason);
                tracing::error!(plugin = %id, "plugin unmount failed: {}", reason);
            }
        }

        handle.inner().finish_unmount();
        self.hooks.read().emit_unmounted(id);
        tracing::info!(plugin = %id, "plugin unmounted");
    }

    /// Get a plugin's current state.
    pub fn plugin_state(&self, id: &str) -> Option<PluginState> {
        self.records.get(id).map(|entry| entry.state())
    }

    /// Get a snapshot of a plugin record.
    pub fn plugin_info(&self, id: &str) -> Option<PluginInfo> {
        self.records.get(id).map(|entry| entry.info())
    }

    /// Check if a plugin has a live (non-terminal) record.
    pub fn contains_plugin(&self, id: &str) -> bool {
        self.records
            .get(id)
            .map(|entry| !entry.state().is_terminal())
            .unwrap_or(false)
    }

    /// Ids of all plugins with records, terminal included.
    pub fn plugin_ids(&self) -> Vec<String> {
        self.records.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Get a census of plugin records by state.
    pub fn stats(&self) -> HostStats {
        let mut stats = HostStats {
            total: self.records.len(),
            ..HostStats::default()
        };
        for entry in self.records.iter() {
            match entry.state() {
                PluginState::Active => stats.active += 1,
                PluginState::Initializing => stats.initializing += 1,
                PluginState::Unmounting => stats.unmounting += 1,
                PluginState::Unmounted => stats.unmounted += 1,
                PluginState::Uninitialized => {}
            }
        }
        stats
    }

    /// Unmount every live plugin. Used at host shutdown.
    pub fn unmount_all(&self) {
        let ids = self.plugin_ids();
        for id in ids {
            self.unmount_plugin(&id);
        }
    }

    // ---- formatting ----

    /// Register a formatter.
    pub fn register_formatter(
        &self,
        id: impl Into<String>,
        extensions: Vec<String>,
        formatter: Arc<dyn Formatter>,
    ) -> Result<()> {
        self.formatters.register(id, extensions, formatter)
    }

    /// Unregister a formatter. No-op if absent.
    pub fn unregister_formatter(&self, id: &str) {
        self.formatters.unregister(id);
    }

    /// `(id, name)` pairs of formatters matching any of `extensions`.
    pub fn get_formatter_for(&self, extensions: &[String]) -> Vec<(String, String)> {
        self.formatters.formatters_for(extensions)
    }

    /// Format the active file.
    ///
    /// A single matching formatter runs directly. With several matches,
    /// `select_if_null` defers to an interactive selection; otherwise the
    /// ambiguity is an error, as is a cancelled selection.
    pub async fn format(&self, select_if_null: bool) -> Result<()> {
        let ext = self
            .active_doc
            .extension()
            .ok_or_else(|| Error::no_formatter("no active file"))?;

        let candidates = self.formatters.matching(&ext);
        match candidates.len() {
            0 => Err(Error::no_formatter(ext)),
            1 => candidates[0].formatter.format().await,
            _ => {
                if !select_if_null {
                    return Err(Error::no_formatter(format!(
                        "multiple formatters claim .{}",
                        ext
                    )));
                }
                let rows: Vec<SelectOption> = candidates
                    .iter()
                    .map(|entry| SelectOption::new(entry.id.clone(), entry.formatter.name()))
                    .collect();
                match self
                    .dialogs
                    .select("Select formatter", &rows, &SelectConfig::new())
                    .await
                {
                    Answer::Value(chosen) => {
                        let entry = self
                            .formatters
                            .get(&chosen)
                            .ok_or_else(|| Error::no_formatter(ext))?;
                        entry.formatter.format().await
                    }
                    Answer::Cancelled => {
                        Err(Error::no_formatter(format!("selection cancelled for .{}", ext)))
                    }
                }
            }
        }
    }

    // ---- file handling ----

    /// Register a file handler.
    pub fn register_file_handler(
        &self,
        id: impl Into<String>,
        options: FileHandlerOptions,
    ) -> Result<()> {
        self.file_handlers.register(id, options)
    }

    /// Unregister a file handler. No-op if absent.
    pub fn unregister_file_handler(&self, id: &str) {
        self.file_handlers.unregister(id);
    }

    /// Dispatch a file open to the first matching handler.
    ///
    /// Handler failures surface to the user as an error notification and
    /// propagate to the caller.
    pub async fn open_file(&self, file: FileInfo) -> Result<bool> {
        let name = file.name.clone();
        match self.file_handlers.open(file).await {
            Ok(handled) => Ok(handled),
            Err(err) => {
                self.notifications
                    .push_error(format!("Failed to open {}", name), &err);
                Err(err)
            }
        }
    }

    // ---- notifications ----

    /// Push a notification.
    pub fn push_notification(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
        options: NotificationOptions,
    ) {
        self.notifications.push(title, message, options);
    }

    // ---- dialogs ----

    /// Show an alert.
    pub async fn alert(&self, title: &str, message: &str) {
        self.dialogs.alert(title, message).await;
    }

    /// Show a confirmation dialog.
    pub async fn confirm(&self, title: &str, message: &str) -> bool {
        self.dialogs.confirm(title, message).await
    }

    /// Show a validated prompt.
    pub async fn prompt(
        &self,
        message: &str,
        default_value: &str,
        kind: InputKind,
        options: PromptOptions,
    ) -> Answer<String> {
        self.dialogs.prompt(message, default_value, kind, options).await
    }

    /// Show a multi-input prompt.
    pub async fn multi_prompt(
        &self,
        title: &str,
        inputs: &[Input],
        help: &str,
    ) -> Answer<Vec<String>> {
        self.dialogs.multi_prompt(title, inputs, help).await
    }

    /// Show a select dialog.
    pub async fn select(
        &self,
        title: &str,
        options: &[SelectOption],
        config: &SelectConfig,
    ) -> Answer<String> {
        self.dialogs.select(title, options, config).await
    }

    /// Show the file browser.
    pub async fn file_browser(
        &self,
        mode: BrowseMode,
        info: &str,
        open_last: bool,
    ) -> Answer<BrowseResult> {
        self.dialogs.file_browser(mode, info, open_last).await
    }

    /// Show the loader overlay.
    pub fn loader(
        &self,
        title: &str,
        message: &str,
        cancel: Option<LoaderCancel>,
    ) -> LoaderHandle {
        self.dialogs.show_loader(title, message, cancel)
    }

    // ---- installer ----

    /// Install a plugin from the registry on behalf of another plugin.
    pub async fn install_plugin(&self, plugin_id: &str, requested_by: &str) -> Result<()> {
        self.installer.install(plugin_id, requested_by).await
    }
}

impl std::fmt::Debug for PluginHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginHost")
            .field("config", &self.config)
            .field("plugin_count", &self.records.len())
            .field("module_count", &self.modules.len())
            .finish()
    }
}

impl Drop for PluginHost {
    fn drop(&mut self) {
        self.unmount_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::{BrowseSubmission, MultiSubmission, PromptRequest, Submission};
    use crate::file_handler::FsStat;
    use crate::services::PageHandle;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubPage {
        hides: AtomicUsize,
    }

    impl StubPage {
        fn shared() -> Arc<StubPage> {
            Arc::new(StubPage {
                hides: AtomicUsize::new(0),
            })
        }
    }

    impl PageHandle for StubPage {
        fn id(&self) -> &str {
            "stub-page"
        }
        fn show(&self) {}
        fn hide(&self) {
            self.hides.fetch_add(1, Ordering::SeqCst);
        }
        fn set_title(&self, _title: &str) {}
        fn set_body(&self, _content: &str) {}
    }

    struct StubPresenter {
        select_value: parking_lot::Mutex<Option<String>>,
    }

    #[async_trait]
    impl DialogPresenter for StubPresenter {
        async fn alert(&self, _title: &str, _message: &str) {}
        async fn confirm(&self, _title: &str, _message: &str) -> bool {
            true
        }
        async fn prompt(&self, _request: &PromptRequest, _error: Option<&str>) -> Submission {
            Submission::Cancelled
        }
        async fn multi_prompt(
            &self,
            _title: &str,
            _inputs: &[Input],
            _help: &str,
            _error: Option<&str>,
        ) -> MultiSubmission {
            MultiSubmission::Cancelled
        }
        async fn select(
            &self,
            _title: &str,
            _options: &[SelectOption],
            _config: &SelectConfig,
        ) -> Submission {
            match self.select_value.lock().clone() {
                Some(value) => Submission::Value(value),
                None => Submission::Cancelled,
            }
        }
        async fn file_browser(
            &self,
            _mode: BrowseMode,
            _info: &str,
            _open_last: bool,
        ) -> BrowseSubmission {
            BrowseSubmission::Cancelled
        }
        fn show_loader(&self, _title: &str, _message: &str) {}
        fn hide_loader(&self) {}
    }

    struct NullSink;

    impl NotificationSink for NullSink {
        fn deliver(&self, _notification: Arc<crate::notification::Notification>) {}
    }

    struct StubFs;

    #[async_trait]
    impl FsOperations for StubFs {
        async fn read(&self, _uri: &str) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
        async fn write(&self, _uri: &str, _data: &[u8]) -> Result<()> {
            Ok(())
        }
        async fn stat(&self, _uri: &str) -> Result<FsStat> {
            Ok(FsStat::default())
        }
        async fn exists(&self, _uri: &str) -> Result<bool> {
            Ok(false)
        }
    }

    struct StubInstaller;

    #[async_trait]
    impl PluginInstaller for StubInstaller {
        async fn install(&self, _plugin_id: &str, _requested_by: &str) -> Result<()> {
            Ok(())
        }
    }

    struct FixedActiveDoc {
        ext: Option<String>,
    }

    impl ActiveDocument for FixedActiveDoc {
        fn extension(&self) -> Option<String> {
            self.ext.clone()
        }
    }

    fn test_host_with_ext(ext: Option<&str>) -> (PluginHost, Arc<StubPresenter>) {
        let presenter = Arc::new(StubPresenter {
            select_value: parking_lot::Mutex::new(None),
        });
        let host = PluginHost::new(
            HostConfig::default(),
            HostContext {
                presenter: presenter.clone(),
                sink: Arc::new(NullSink),
                fs: Arc::new(StubFs),
                installer: Arc::new(StubInstaller),
                active_doc: Arc::new(FixedActiveDoc {
                    ext: ext.map(String::from),
                }),
            },
        );
        (host, presenter)
    }

    fn test_host() -> PluginHost {
        test_host_with_ext(Some("json")).0
    }

    fn noop_init() -> PluginInitFn {
        Arc::new(|_base_url, _page, _options| Box::pin(async { Ok(()) }))
    }

    fn failing_init() -> PluginInitFn {
        Arc::new(|_base_url, _page, _options| {
            Box::pin(async { Err(Error::host("plugin script crashed")) })
        })
    }

    #[test]
    fn test_builtins_seeded() {
        let host = test_host();
        for name in [
            well_known::FS_OPERATION,
            well_known::LOADER,
            well_known::PROMPT,
            well_known::ALERT,
            well_known::CONFIRM,
            well_known::SELECT,
            well_known::MULTI_PROMPT,
            well_known::FILE_BROWSER,
            well_known::NOTIFICATION,
            well_known::INSTALL_PLUGIN,
        ] {
            assert!(host.require(name).is_ok(), "builtin missing: {}", name);
        }
    }

    #[tokio::test]
    async fn test_init_plugin_lifecycle() {
        let host = test_host();
        host.set_plugin_init("p1", noop_init(), Some(serde_json::json!({ "theme": "dark" })));

        host.init_plugin("p1", "https://localhost/p1/", StubPage::shared(), None)
            .await
            .unwrap();

        assert_eq!(host.plugin_state("p1"), Some(PluginState::Active));
        assert!(host.contains_plugin("p1"));
        assert_eq!(
            host.get_plugin_settings("p1"),
            Some(serde_json::json!({ "theme": "dark" }))
        );

        host.unmount_plugin("p1");
        assert_eq!(host.plugin_state("p1"), Some(PluginState::Unmounted));
        assert!(!host.contains_plugin("p1"));
    }

    #[tokio::test]
    async fn test_init_without_registration_fails() {
        let host = test_host();
        let result = host
            .init_plugin("ghost", "https://localhost/ghost/", StubPage::shared(), None)
            .await;
        assert!(matches!(result, Err(Error::InitNotRegistered(_))));
    }

    #[tokio::test]
    async fn test_double_init_rejected() {
        let host = test_host();
        host.set_plugin_init("p1", noop_init(), None);

        host.init_plugin("p1", "https://localhost/p1/", StubPage::shared(), None)
            .await
            .unwrap();
        let result = host
            .init_plugin("p1", "https://localhost/p1/", StubPage::shared(), None)
            .await;

        assert!(matches!(result, Err(Error::PluginAlreadyActive(_))));
        assert_eq!(host.stats().active, 1);
    }

    #[tokio::test]
    async fn test_reinit_after_unmount() {
        let host = test_host();
        host.set_plugin_init("p1", noop_init(), None);

        host.init_plugin("p1", "https://localhost/p1/", StubPage::shared(), None)
            .await
            .unwrap();
        host.unmount_plugin("p1");

        host.init_plugin("p1", "https://localhost/p1/", StubPage::shared(), None)
            .await
            .unwrap();
        assert_eq!(host.plugin_state("p1"), Some(PluginState::Active));
    }

    #[tokio::test]
    async fn test_failed_init_leaves_no_record() {
        let host = test_host();
        host.set_plugin_init("broken", failing_init(), None);

        let result = host
            .init_plugin("broken", "https://localhost/broken/", StubPage::shared(), None)
            .await;

        assert!(matches!(result, Err(Error::InitFailed { .. })));
        assert!(host.plugin_state("broken").is_none());
        assert!(!host.contains_plugin("broken"));
        assert_eq!(host.stats().total, 0);
    }

    #[tokio::test]
    async fn test_unmount_is_idempotent_and_tolerant() {
        let host = test_host();
        host.set_plugin_init("p1", noop_init(), None);

        // Unknown id: no panic, no record
        host.unmount_plugin("p1");
        assert!(host.plugin_state("p1").is_none());

        host.init_plugin("p1", "https://localhost/p1/", StubPage::shared(), None)
            .await
            .unwrap();
        host.unmount_plugin("p1");
        host.unmount_plugin("p1");
        assert_eq!(host.plugin_state("p1"), Some(PluginState::Unmounted));
    }

    #[tokio::test]
    async fn test_unmount_invokes_callback_and_hides_page() {
        let host = test_host();
        let page = StubPage::shared();
        let unmounted = Arc::new(AtomicUsize::new(0));
        let unmounted_clone = unmounted.clone();

        host.set_plugin_init("p1", noop_init(), None);
        host.set_plugin_unmount(
            "p1",
            Arc::new(move || {
                unmounted_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        host.init_plugin("p1", "https://localhost/p1/", page.clone(), None)
            .await
            .unwrap();
        host.unmount_plugin("p1");

        assert_eq!(unmounted.load(Ordering::SeqCst), 1);
        assert_eq!(page.hides.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_unmount_callback_still_tears_down() {
        let host = test_host();
        let failures = Arc::new(AtomicUsize::new(0));
        let failures_clone = failures.clone();
        host.on_event(move |event| {
            if event.is_failure() {
                failures_clone.fetch_add(1, Ordering::SeqCst);
            }
        });

        host.set_plugin_init("p1", noop_init(), None);
        host.set_plugin_unmount("p1", Arc::new(|| Err(Error::host("cleanup exploded"))));

        host.init_plugin("p1", "https://localhost/p1/", StubPage::shared(), None)
            .await
            .unwrap();
        host.unmount_plugin("p1");

        assert_eq!(host.plugin_state("p1"), Some(PluginState::Unmounted));
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_plugin_registers_during_init() {
        // A plugin may call back into the host registries from its init
        // function.
        let host = Arc::new(test_host());
        let host_for_init = host.clone();

        let init: PluginInitFn = Arc::new(move |_base_url, _page, _options| {
            let host = host_for_init.clone();
            Box::pin(async move {
                host.require(well_known::FS_OPERATION)?;
                host.register_file_handler(
                    "md-preview",
                    FileHandlerOptions::new(
                        vec!["md".into()],
                        Arc::new(|_info| Box::pin(async { Ok(()) })),
                    ),
                )?;
                Ok(())
            })
        });

        host.set_plugin_init("p1", init, None);
        host.init_plugin("p1", "https://localhost/p1/", StubPage::shared(), None)
            .await
            .unwrap();

        assert!(host.contains_plugin("p1"));
    }

    #[tokio::test]
    async fn test_format_single_candidate() {
        let (host, _presenter) = test_host_with_ext(Some("json"));
        let (fmt, calls) = crate::formatter::test_support::counting_formatter("Pretty JSON");
        host.register_formatter("json-fmt", vec!["json".into()], fmt)
            .unwrap();

        host.format(false).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_format_no_candidate() {
        let (host, _presenter) = test_host_with_ext(Some("rs"));
        let result = host.format(false).await;
        assert!(matches!(result, Err(Error::NoFormatter(_))));

        let (host, _presenter) = test_host_with_ext(None);
        let result = host.format(true).await;
        assert!(matches!(result, Err(Error::NoFormatter(_))));
    }

    #[tokio::test]
    async fn test_format_ambiguous_uses_selection() {
        let (host, presenter) = test_host_with_ext(Some("json"));
        let (first, first_calls) = crate::formatter::test_support::counting_formatter("First");
        let (second, second_calls) = crate::formatter::test_support::counting_formatter("Second");
        host.register_formatter("a", vec!["json".into()], first).unwrap();
        host.register_formatter("b", vec!["json".into()], second).unwrap();

        // Without selection, ambiguity is an error
        assert!(matches!(host.format(false).await, Err(Error::NoFormatter(_))));

        // Cancelled selection is an error too
        assert!(matches!(host.format(true).await, Err(Error::NoFormatter(_))));

        *presenter.select_value.lock() = Some("b".to_string());
        host.format(true).await.unwrap();
        assert_eq!(first_calls.load(Ordering::SeqCst), 0);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_open_file_failure_notifies() {
        let host = test_host();
        host.register_file_handler(
            "broken",
            FileHandlerOptions::new(
                vec!["bin".into()],
                Arc::new(|_info| Box::pin(async { Err(Error::host("decode failed")) })),
            ),
        )
        .unwrap();

        let file = FileInfo {
            uri: "content://storage/a.bin".into(),
            name: "a.bin".into(),
            stats: FsStat::default(),
            read_only: false,
            options: serde_json::Value::Null,
        };

        assert!(host.open_file(file).await.is_err());
        assert_eq!(host.notifications().errors().len(), 1);
    }

    #[tokio::test]
    async fn test_capacity_enforced() {
        let presenter = Arc::new(StubPresenter {
            select_value: parking_lot::Mutex::new(None),
        });
        let host = PluginHost::new(
            HostConfig::new().with_max_plugins(1),
            HostContext {
                presenter,
                sink: Arc::new(NullSink),
                fs: Arc::new(StubFs),
                installer: Arc::new(StubInstaller),
                active_doc: Arc::new(FixedActiveDoc { ext: None }),
            },
        );

        host.set_plugin_init("p1", noop_init(), None);
        host.set_plugin_init("p2", noop_init(), None);

        host.init_plugin("p1", "https://localhost/p1/", StubPage::shared(), None)
            .await
            .unwrap();
        let result = host
            .init_plugin("p2", "https://localhost/p2/", StubPage::shared(), None)
            .await;
        assert!(matches!(result, Err(Error::CapacityReached(_))));

        // Unmounting frees capacity
        host.unmount_plugin("p1");
        host.init_plugin("p2", "https://localhost/p2/", StubPage::shared(), None)
            .await
            .unwrap();
    }
}
