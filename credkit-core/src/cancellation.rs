//! Cooperative cancellation for credential requests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Listener = Box<dyn FnOnce() + Send>;

/// Handle to a listener registered with [`CancellationSignal::on_cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ListenerId(u64);

#[derive(Default)]
struct SignalState {
    canceled: bool,
    next_id: u64,
    listeners: Vec<(ListenerId, Listener)>,
}

/// A caller-owned cancellation flag.
///
/// A request whose signal is already cancelled when it reaches the provider is dropped without
/// an answer. Cancelling later tears the provider UI down, see
/// [`crate::ProviderConfig::cancel_in_flight`].
#[derive(Default, uniffi::Object)]
pub struct CancellationSignal {
    state: Mutex<SignalState>,
}

impl std::fmt::Debug for CancellationSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationSignal")
            .field("canceled", &self.is_canceled())
            .finish_non_exhaustive()
    }
}

#[uniffi::export]
impl CancellationSignal {
    /// Creates a signal that is not cancelled.
    #[uniffi::constructor]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the signal and runs every registered listener once. Idempotent.
    pub fn cancel(&self) {
        let listeners = {
            let mut state = self.state();
            if state.canceled {
                return;
            }
            state.canceled = true;
            std::mem::take(&mut state.listeners)
        };
        for (_, listener) in listeners {
            listener();
        }
    }

    /// Whether [`CancellationSignal::cancel`] has been called.
    pub fn is_canceled(&self) -> bool {
        self.state().canceled
    }
}

impl CancellationSignal {
    fn state(&self) -> MutexGuard<'_, SignalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `listener` to run once on cancellation.
    ///
    /// Runs it immediately and returns `None` if the signal is already cancelled.
    pub(crate) fn on_cancel(&self, listener: impl FnOnce() + Send + 'static) -> Option<ListenerId> {
        {
            let mut state = self.state();
            if !state.canceled {
                let id = ListenerId(state.next_id);
                state.next_id += 1;
                state.listeners.push((id, Box::new(listener)));
                return Some(id);
            }
        }
        listener();
        None
    }

    /// Drops a listener that is no longer needed.
    ///
    /// Returns `false` if it already ran or was removed.
    pub(crate) fn remove_listener(&self, id: ListenerId) -> bool {
        let mut state = self.state();
        let before = state.listeners.len();
        state.listeners.retain(|(registered, _)| registered.0 != id.0);
        state.listeners.len() != before
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        self.state().listeners.len()
    }
}

/// Checks the caller's signal before anything is launched.
///
/// Returns `true` if the request must be abandoned silently.
pub(crate) fn already_cancelled(signal: Option<&Arc<CancellationSignal>>) -> bool {
    match signal {
        Some(signal) if signal.is_canceled() => {
            log::info!("credential request already cancelled before provider UI");
            true
        }
        Some(_) => false,
        None => {
            log::debug!("no cancellation signal supplied");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_listener_fires_once() {
        let signal = CancellationSignal::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        assert!(signal
            .on_cancel(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .is_some());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        signal.cancel();
        signal.cancel();
        assert!(signal.is_canceled());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_registered_after_cancel_runs_immediately() {
        let signal = CancellationSignal::new();
        signal.cancel();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let id = signal.on_cancel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(id, None);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_removed_listener_never_runs() {
        let signal = CancellationSignal::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let removed = signal
            .on_cancel(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        let kept = signal.on_cancel(|| {}).unwrap();
        assert_ne!(removed, kept);
        assert!(signal.remove_listener(removed));
        assert!(!signal.remove_listener(removed));
        assert_eq!(signal.listener_count(), 1);

        signal.cancel();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!signal.remove_listener(kept));
        assert_eq!(signal.listener_count(), 0);
    }

    #[test]
    fn test_gate() {
        assert!(!already_cancelled(None));
        let signal = Arc::new(CancellationSignal::new());
        assert!(!already_cancelled(Some(&signal)));
        signal.cancel();
        assert!(already_cancelled(Some(&signal)));
    }
}
