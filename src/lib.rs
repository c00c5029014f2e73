//! # acode-plugin-host
//!
//! Plugin host runtime for the Acode editor: registers, initializes,
//! isolates, and tears down third-party plugins, and mediates their
//! access to shared host services through a single named-module registry.
//!
//! This crate provides:
//! - **Module Registry** - Named store of host built-ins and plugin capabilities
//! - **Plugin Lifecycle** - Deterministic init/unmount with per-id ordering
//! - **Formatter Registry** - Extension-keyed async formatting handlers
//! - **File Handler Registry** - First-match dispatch of file opens
//! - **Dialog Service** - Validated prompts, selections, and the loader overlay
//! - **Notification Service** - Fire-and-forget notifications with error retention
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use acode_plugin_host::{PluginHost, HostConfig, HostContext};
//!
//! // Create the host with its UI and file-system collaborators
//! let host = PluginHost::new(HostConfig::default(), context);
//!
//! // Register and initialize a plugin
//! host.set_plugin_init("my-plugin", init_fn, Some(settings));
//! host.init_plugin("my-plugin", base_url, page, None).await?;
//! ```
//!
//! Plugins reach shared services by name through the registry the host
//! seeds at start-up (`fsOperation`, `prompt`, `fileBrowser`, ...), and
//! register their own formatters and file handlers, which they are
//! expected to revoke in their unmount function.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod dialog;
mod error;
mod file_handler;
mod formatter;
mod host;
mod lifecycle;
mod notification;
mod plugin;
mod registry;
mod services;

pub use dialog::{
    Answer, BrowseEntry, BrowseMode, BrowseResult, BrowseSubmission, DialogConfig,
    DialogPresenter, DialogService, Input, InputKind, LoaderCancel, LoaderHandle,
    MultiSubmission, PromptOptions, PromptRequest, PromptTestFn, SelectConfig, SelectOption,
    Submission,
};
pub use error::{Error, Result};
pub use file_handler::{
    FileHandlerFn, FileHandlerOptions, FileHandlerRegistry, FileInfo, FsStat,
};
pub use formatter::{Formatter, FormatterRegistry};
pub use host::{HostConfig, HostContext, HostStats, PluginHost};
pub use lifecycle::{LifecycleEvent, LifecycleHooks, PluginState};
pub use notification::{
    Notification, NotificationConfig, NotificationKind, NotificationOptions, NotificationService,
    NotificationSink,
};
pub use plugin::{PluginHandle, PluginInfo, PluginInitFn, PluginRecord, PluginUnmountFn};
pub use registry::{well_known, Module, ModuleRegistry};
pub use services::{ActiveDocument, FsOperations, PageHandle, PluginInstaller, SharedPage};

/// Crate version for compatibility checks.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
