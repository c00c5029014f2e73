//! Plugin lifecycle states and host-facing lifecycle observation.

use std::time::Instant;

/// Plugin lifecycle state.
///
/// Transitions run one way: `Uninitialized → Initializing → Active →
/// Unmounting → Unmounted`. A failed init skips straight from
/// `Initializing` to removal. `Unmounted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginState {
    /// Record exists but the init function has not been invoked yet.
    Uninitialized,
    /// The init function is running.
    Initializing,
    /// Init completed; the plugin owns its page and registrations.
    Active,
    /// The unmount function is running; the page is already released.
    Unmounting,
    /// Terminal. The plugin no longer owns anything.
    Unmounted,
}

impl PluginState {
    /// Check if the plugin can begin initialization.
    pub fn can_init(&self) -> bool {
        matches!(self, Self::Uninitialized | Self::Unmounted)
    }

    /// Check if the plugin can be unmounted.
    pub fn can_unmount(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Check if the plugin may hold its page handle.
    pub fn owns_page(&self) -> bool {
        matches!(self, Self::Initializing | Self::Active)
    }

    /// Check if the plugin is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Unmounted)
    }

    /// Check if a lifecycle transition is currently in flight.
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Initializing | Self::Unmounting)
    }
}

impl std::fmt::Display for PluginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Active => "active",
            Self::Unmounting => "unmounting",
            Self::Unmounted => "unmounted",
        };
        write!(f, "{}", name)
    }
}

/// Lifecycle event for host observation.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// An init function was registered for the id.
    Registered {
        /// Plugin id.
        id: String,
        /// Registration time.
        at: Instant,
    },
    /// The plugin finished init and became active.
    Initialized {
        /// Plugin id.
        id: String,
        /// Activation time.
        at: Instant,
    },
    /// The plugin's init function failed; the record was discarded.
    InitFailed {
        /// Plugin id.
        id: String,
        /// Failure description.
        message: String,
        /// Failure time.
        at: Instant,
    },
    /// The plugin was unmounted.
    Unmounted {
        /// Plugin id.
        id: String,
        /// Unmount time.
        at: Instant,
    },
    /// The plugin's unmount function failed; teardown completed anyway.
    UnmountFailed {
        /// Plugin id.
        id: String,
        /// Failure description.
        message: String,
        /// Failure time.
        at: Instant,
    },
}

impl LifecycleEvent {
    /// Get the plugin id.
    pub fn plugin_id(&self) -> &str {
        match self {
            Self::Registered { id, .. } => id,
            Self::Initialized { id, .. } => id,
            Self::InitFailed { id, .. } => id,
            Self::Unmounted { id, .. } => id,
            Self::UnmountFailed { id, .. } => id,
        }
    }

    /// Get the event timestamp.
    pub fn timestamp(&self) -> Instant {
        match self {
            Self::Registered { at, .. } => *at,
            Self::Initialized { at, .. } => *at,
            Self::InitFailed { at, .. } => *at,
            Self::Unmounted { at, .. } => *at,
            Self::UnmountFailed { at, .. } => *at,
        }
    }

    /// Get the event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Registered { .. } => "registered",
            Self::Initialized { .. } => "initialized",
            Self::InitFailed { .. } => "init_failed",
            Self::Unmounted { .. } => "unmounted",
            Self::UnmountFailed { .. } => "unmount_failed",
        }
    }

    /// Check if the event reports a plugin failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::InitFailed { .. } | Self::UnmountFailed { .. })
    }
}

/// Hooks for lifecycle events.
///
/// The host surfaces plugin init/unmount failures here instead of letting
/// them escape the lifecycle boundary.
pub struct LifecycleHooks {
    handlers: Vec<Box<dyn Fn(&LifecycleEvent) + Send + Sync>>,
}

impl LifecycleHooks {
    /// Create new lifecycle hooks.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Add a lifecycle event handler.
    pub fn on_event<F>(&mut self, handler: F)
    where
        F: Fn(&LifecycleEvent) + Send + Sync + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    /// Emit a lifecycle event.
    pub fn emit(&self, event: LifecycleEvent) {
        for handler in &self.handlers {
            handler(&event);
        }
    }

    /// Emit a registered event.
    pub fn emit_registered(&self, id: &str) {
        self.emit(LifecycleEvent::Registered {
            id: id.to_string(),
            at: Instant::now(),
        });
    }

    /// Emit an initialized event.
    pub fn emit_initialized(&self, id: &str) {
        self.emit(LifecycleEvent::Initialized {
            id: id.to_string(),
            at: Instant::now(),
        });
    }

    /// Emit an init failed event.
    pub fn emit_init_failed(&self, id: &str, message: &str) {
        self.emit(LifecycleEvent::InitFailed {
            id: id.to_string(),
            message: message.to_string(),
            at: Instant::now(),
        });
    }

    /// Emit an unmounted event.
    pub fn emit_unmounted(&self, id: &str) {
        self.emit(LifecycleEvent::Unmounted {
            id: id.to_string(),
            at: Instant::now(),
        });
    }

    /// Emit an unmount failed event.
    pub fn emit_unmount_failed(&self, id: &str, message: &str) {
        self.emit(LifecycleEvent::UnmountFailed {
            id: id.to_string(),
            message: message.to_string(),
            at: Instant::now(),
        });
    }
}

impl Default for LifecycleHooks {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleHooks")
            .field("handler_count", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_state_predicates() {
        assert!(PluginState::Uninitialized.can_init());
        assert!(PluginState::Unmounted.can_init());
        assert!(!PluginState::Active.can_init());
        assert!(!PluginState::Initializing.can_init());

        assert!(PluginState::Active.can_unmount());
        assert!(!PluginState::Initializing.can_unmount());
        assert!(!PluginState::Unmounted.can_unmount());

        assert!(PluginState::Initializing.owns_page());
        assert!(PluginState::Active.owns_page());
        assert!(!PluginState::Unmounting.owns_page());

        assert!(PluginState::Unmounted.is_terminal());
        assert!(!PluginState::Active.is_terminal());

        assert!(PluginState::Initializing.is_transitioning());
        assert!(!PluginState::Active.is_transitioning());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(PluginState::Active.to_string(), "active");
        assert_eq!(PluginState::Unmounting.to_string(), "unmounting");
    }

    #[test]
    fn test_lifecycle_hooks() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        let mut hooks = LifecycleHooks::new();
        hooks.on_event(move |_| {
            counter_clone.fetch_add(1, Ordering::Relaxed);
        });

        hooks.emit_registered("p1");
        hooks.emit_initialized("p1");
        hooks.emit_unmounted("p1");

        assert_eq!(counter.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_lifecycle_event_info() {
        let event = LifecycleEvent::InitFailed {
            id: "broken-plugin".to_string(),
            message: "page missing".to_string(),
            at: Instant::now(),
        };

        assert_eq!(event.plugin_id(), "broken-plugin");
        assert_eq!(event.event_name(), "init_failed");
        assert!(event.is_failure());

        let event = LifecycleEvent::Unmounted {
            id: "p".to_string(),
            at: Instant::now(),
        };
        assert!(!event.is_failure());
    }
}
