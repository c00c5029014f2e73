//! Traits for host collaborators consumed as opaque capabilities.
//!
//! The host never implements these itself. Concrete implementations are
//! injected at construction, seeded into the module registry, and handed
//! to plugins through their execution context.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::file_handler::FsStat;

/// Handle to a plugin's UI page.
///
/// A plugin owns its page only while it is initializing or active; the
/// lifecycle manager releases the handle when unmounting begins.
pub trait PageHandle: Send + Sync {
    /// Page identifier.
    fn id(&self) -> &str;

    /// Make the page visible.
    fn show(&self);

    /// Hide the page.
    fn hide(&self);

    /// Set the page title.
    fn set_title(&self, title: &str);

    /// Replace the page body content.
    fn set_body(&self, content: &str);
}

/// File system operations exposed to plugins as the `fsOperation` module.
#[async_trait]
pub trait FsOperations: Send + Sync {
    /// Read the file at `uri`.
    async fn read(&self, uri: &str) -> Result<Vec<u8>>;

    /// Write `data` to the file at `uri`, creating it if needed.
    async fn write(&self, uri: &str, data: &[u8]) -> Result<()>;

    /// Stat the entry at `uri`.
    async fn stat(&self, uri: &str) -> Result<FsStat>;

    /// Check whether `uri` exists.
    async fn exists(&self, uri: &str) -> Result<bool>;
}

/// Installer that fetches plugin packages from the plugin registry.
#[async_trait]
pub trait PluginInstaller: Send + Sync {
    /// Install `plugin_id` on behalf of `requested_by`.
    async fn install(&self, plugin_id: &str, requested_by: &str) -> Result<()>;
}

/// The editor engine's view of the currently active file.
pub trait ActiveDocument: Send + Sync {
    /// Extension of the active file (lowercase, no dot), if any file is open.
    fn extension(&self) -> Option<String>;
}

/// Blanket handle type for page trait objects.
pub type SharedPage = Arc<dyn PageHandle>;
