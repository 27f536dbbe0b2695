//! Multi-subscriber notification with one-shot and persistent policies.
//!
//! Each machine owns its registry as an instance field, so concurrent
//! validations of different licenses never see each other's observers.

use crate::documents::ValidatedDocuments;
use crate::error::LcpError;

/// Whether a subscription survives its first notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverPolicy {
    /// Removed after one notification.
    Once,
    /// Notified on every terminal transition until the machine is dropped.
    Always,
}

/// Callback invoked with the current `(documents, error)` pair.
///
/// At a terminal notification exactly one of the two is `Some`; both are
/// `None` when the machine returns to its initial state after the user
/// cancelled the passphrase prompt.
pub type Observer = Box<dyn FnMut(Option<&ValidatedDocuments>, Option<&LcpError>) + Send>;

/// Ordered observer registry.
#[derive(Default)]
pub struct ObserverRegistry {
    entries: Vec<(Observer, ObserverPolicy)>,
}

impl ObserverRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enroll an observer.
    pub fn add(&mut self, observer: Observer, policy: ObserverPolicy) {
        self.entries.push((observer, policy));
    }

    /// Number of enrolled observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no observer is enrolled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Invoke every observer in insertion order with the given pair, then
    /// drop all one-shot entries.
    pub fn notify(&mut self, documents: Option<&ValidatedDocuments>, error: Option<&LcpError>) {
        for (observer, _) in &mut self.entries {
            observer(documents, error);
        }
        self.entries
            .retain(|(_, policy)| *policy == ObserverPolicy::Always);
    }
}
