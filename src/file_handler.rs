//! File handler registry: extension-keyed async handlers for file opens.

use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// File metadata snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FsStat {
    /// Entry is a regular file.
    pub is_file: bool,
    /// Entry is a directory.
    pub is_directory: bool,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, milliseconds since the epoch.
    pub modified_at: Option<u64>,
}

/// Read-only snapshot of an opened file, passed to handlers.
///
/// The registry does not own or mutate this after dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    /// URI or path of the file.
    pub uri: String,
    /// File name.
    pub name: String,
    /// File metadata.
    pub stats: FsStat,
    /// Whether the file was opened read-only.
    pub read_only: bool,
    /// Opaque open options.
    #[serde(default)]
    pub options: serde_json::Value,
}

impl FileInfo {
    /// Extension of the file (lowercase, no dot), if it has one.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }
}

/// Stored async file-open handler.
pub type FileHandlerFn = Arc<dyn Fn(FileInfo) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Configuration for a file handler registration.
#[derive(Clone)]
pub struct FileHandlerOptions {
    /// Extensions to handle, without dots.
    pub extensions: Vec<String>,
    /// Invoked when a file with a matching extension is opened.
    pub handle_file: FileHandlerFn,
}

impl FileHandlerOptions {
    /// Create handler options.
    pub fn new(extensions: Vec<String>, handle_file: FileHandlerFn) -> Self {
        Self {
            extensions,
            handle_file,
        }
    }
}

impl std::fmt::Debug for FileHandlerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandlerOptions")
            .field("extensions", &self.extensions)
            .finish()
    }
}

struct FileHandlerEntry {
    id: String,
    extensions: Vec<String>,
    handle_file: FileHandlerFn,
}

/// Registry of file-open handlers.
///
/// Handler ids are unique; extensions need not be disjoint across
/// handlers. Dispatch goes to the first registered handler whose
/// extension set matches the opened file.
pub struct FileHandlerRegistry {
    entries: RwLock<Vec<FileHandlerEntry>>,
}

impl FileHandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Register a handler under `id`.
    ///
    /// Fails with [`Error::DuplicateFileHandler`] if `id` is taken (the
    /// existing entry is untouched) and [`Error::Validation`] if the
    /// extension list is empty or contains blank entries.
    pub fn register(&self, id: impl Into<String>, options: FileHandlerOptions) -> Result<()> {
        let id = id.into();

        if options.extensions.is_empty() {
            return Err(Error::validation("file handler requires at least one extension"));
        }
        if options.extensions.iter().any(|ext| ext.trim().is_empty()) {
            return Err(Error::validation("file handler extensions must not be blank"));
        }

        let mut entries = self.entries.write();
        if entries.iter().any(|entry| entry.id == id) {
            return Err(Error::DuplicateFileHandler(id));
        }

        let extensions = options
            .extensions
            .iter()
            .map(|ext| normalize_extension(ext))
            .collect();

        tracing::debug!(handler = %id, "file handler registered");
        entries.push(FileHandlerEntry {
            id,
            extensions,
            handle_file: options.handle_file,
        });
        Ok(())
    }

    /// Remove the handler registered under `id`. No-op if absent.
    pub fn unregister(&self, id: &str) {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        if entries.len() < before {
            tracing::debug!(handler = %id, "file handler unregistered");
        }
    }

    /// Check if a handler id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.read().iter().any(|entry| entry.id == id)
    }

    /// Ids of handlers claiming `extension`, in registration order.
    pub fn handlers_for(&self, extension: &str) -> Vec<String> {
        let ext = normalize_extension(extension);
        self.entries
            .read()
            .iter()
            .filter(|entry| entry.extensions.contains(&ext))
            .map(|entry| entry.id.clone())
            .collect()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Dispatch a file open to the first matching handler.
    ///
    /// Returns `Ok(true)` if a handler claimed the file, `Ok(false)` if
    /// none matched. Handler failures propagate to the caller.
    pub async fn open(&self, file: FileInfo) -> Result<bool> {
        let Some(ext) = file.extension() else {
            return Ok(false);
        };

        let handler = {
            let entries = self.entries.read();
            entries
                .iter()
                .find(|entry| entry.extensions.contains(&ext))
                .map(|entry| (entry.id.clone(), entry.handle_file.clone()))
        };

        let Some((id, handle_file)) = handler else {
            return Ok(false);
        };

        tracing::debug!(handler = %id, file = %file.name, "dispatching file open");
        handle_file(file).await?;
        Ok(true)
    }
}

impl Default for FileHandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FileHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandlerRegistry")
            .field("handler_count", &self.len())
            .finish()
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}
