/// What a store does when a listener panics during notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListenerPanicPolicy {
    /// Catch the panic, keep notifying the remaining listeners, and report
    /// the failure from the mutating call as
    /// [`StoreError::ListenerPanicked`](crate::StoreError::ListenerPanicked).
    #[default]
    Isolate,
    /// Let the panic unwind out of the mutating call. Listeners after the
    /// failing one are not notified for that mutation.
    Propagate,
}

/// Per-store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Name attached to every log event emitted by the store.
    pub label: String,
    pub listener_panics: ListenerPanicPolicy,
}

impl StoreConfig {
    /// Default config with the given label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Set the listener panic policy.
    pub fn listener_panics(mut self, policy: ListenerPanicPolicy) -> Self {
        self.listener_panics = policy;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            label: "store".to_string(),
            listener_panics: ListenerPanicPolicy::default(),
        }
    }
}
