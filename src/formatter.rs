//! Formatter registry: extension-keyed async formatting handlers.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{Error, Result};

/// A formatting handler for one or more file extensions.
///
/// `name` is what selection UIs show; formatting itself runs against the
/// active editor document, which the implementation reaches through its
/// own captured context.
#[async_trait]
pub trait Formatter: Send + Sync {
    /// Human-readable formatter name.
    fn name(&self) -> &str;

    /// Format the active document.
    async fn format(&self) -> Result<()>;
}

#[derive(Clone)]
pub(crate) struct FormatterEntry {
    pub(crate) id: String,
    pub(crate) extensions: Vec<String>,
    pub(crate) formatter: Arc<dyn Formatter>,
}

/// Registry of formatters.
///
/// Ids are unique; several formatters may claim the same extension, and
/// lookup returns all of them in registration order for the caller to
/// disambiguate.
pub struct FormatterRegistry {
    entries: RwLock<Vec<FormatterEntry>>,
}

impl FormatterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Register `formatter` under `id` for `extensions`.
    ///
    /// Fails with [`Error::DuplicateFormatter`] if `id` is taken and
    /// [`Error::Validation`] if the extension list is empty.
    pub fn register(
        &self,
        id: impl Into<String>,
        extensions: Vec<String>,
        formatter: Arc<dyn Formatter>,
    ) -> Result<()> {
        let id = id.into();

        if extensions.is_empty() {
            return Err(Error::validation("formatter requires at least one extension"));
        }

        let mut entries = self.entries.write();
        if entries.iter().any(|entry| entry.id == id) {
            return Err(Error::DuplicateFormatter(id));
        }

        let extensions = extensions.iter().map(|ext| normalize_extension(ext)).collect();

        tracing::debug!(formatter = %id, "formatter registered");
        entries.push(FormatterEntry {
            id,
            extensions,
            formatter,
        });
        Ok(())
    }

    /// Remove the formatter registered under `id`.
    ///
    /// No-op if absent: this runs during plugin teardown, which must not
    /// fail.
    pub fn unregister(&self, id: &str) {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        if entries.len() < before {
            tracing::debug!(formatter = %id, "formatter unregistered");
        }
    }

    /// Check if a formatter id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.read().iter().any(|entry| entry.id == id)
    }

    /// `(id, name)` pairs of formatters whose extension set intersects
    /// `extensions`, in registration order.
    ///
    /// This is a lookup, not a selection; the caller disambiguates.
    pub fn formatters_for(&self, extensions: &[String]) -> Vec<(String, String)> {
        let query: Vec<String> = extensions.iter().map(|ext| normalize_extension(ext)).collect();
        self.entries
            .read()
            .iter()
            .filter(|entry| entry.extensions.iter().any(|ext| query.contains(ext)))
            .map(|entry| (entry.id.clone(), entry.formatter.name().to_string()))
            .collect()
    }

    /// Entries claiming `extension`, in registration order.
    pub(crate) fn matching(&self, extension: &str) -> Vec<FormatterEntry> {
        let ext = normalize_extension(extension);
        self.entries
            .read()
            .iter()
            .filter(|entry| entry.extensions.contains(&ext))
            .cloned()
            .collect()
    }

    /// Look up a single entry by id.
    pub(crate) fn get(&self, id: &str) -> Option<FormatterEntry> {
        self.entries.read().iter().find(|entry| entry.id == id).cloned()
    }

    /// Number of registered formatters.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FormatterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatterRegistry")
            .field("formatter_count", &self.len())
            .finish()
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) struct CountingFormatter {
        name: String,
        calls: Arc<AtomicUsize>,
    }

    /// A formatter stub that counts invocations.
    pub(crate) fn counting_formatter(name: &str) -> (Arc<dyn Formatter>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Arc::new(CountingFormatter {
                name: name.to_string(),
                calls: calls.clone(),
            }),
            calls,
        )
    }

    #[async_trait]
    impl Formatter for CountingFormatter {
        fn name(&self) -> &str {
            &self.name
        }

        async fn format(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
