//! Single-shot result correlation keyed by request code.
//!
//! Every launch arms one pending invocation under a fresh [`RequestCode`]. The first result for
//! that code removes the entry and runs its completion; anything that arrives later, or for a code
//! that was never armed, finds nothing and is dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Opaque token tying one provider launch to its single result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestCode(u32);

impl RequestCode {
    /// Wraps a raw code received from the host.
    #[must_use]
    pub const fn new(code: u32) -> Self {
        Self(code)
    }

    /// The raw code sent to the host.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RequestCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What the provider (or the lifecycle around it) produced for one launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RawProviderResult {
    /// The provider UI finished with an activity result code and optional payload.
    Completed {
        result_code: i32,
        data: Option<Vec<u8>>,
    },
    /// The host reported an explicit failure.
    Failed { exception_type: Option<String> },
    /// The caller cancelled while the provider UI was showing.
    Cancelled,
    /// The provider UI went away without answering.
    Interrupted { reason: String },
    /// The host refused to launch the provider UI.
    LaunchFailed { reason: String },
}

type Completion = Box<dyn FnOnce(RawProviderResult) + Send>;

#[derive(Default)]
struct Pending {
    completions: HashMap<RequestCode, Completion>,
    /// Set once the host is gone; nothing can be armed afterwards.
    closed: Option<String>,
}

/// Pending invocations of one provider host.
pub(crate) struct ResultCorrelator {
    next_code: AtomicU32,
    pending: Mutex<Pending>,
}

impl fmt::Debug for ResultCorrelator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCorrelator")
            .field("live", &self.live())
            .finish_non_exhaustive()
    }
}

impl ResultCorrelator {
    pub(crate) fn new(first_code: u32) -> Self {
        Self {
            next_code: AtomicU32::new(first_code),
            pending: Mutex::new(Pending::default()),
        }
    }

    fn pending(&self) -> MutexGuard<'_, Pending> {
        // The map is always consistent between operations, so a panic elsewhere
        // while holding the lock leaves nothing to repair.
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arms a new pending invocation and returns its code.
    ///
    /// Once the correlator is closed nothing is armed: `completion` runs right away with an
    /// interruption and `None` is returned.
    pub(crate) fn arm(
        &self,
        completion: impl FnOnce(RawProviderResult) + Send + 'static,
    ) -> Option<RequestCode> {
        let mut pending = self.pending();
        if let Some(reason) = pending.closed.clone() {
            drop(pending);
            log::warn!("refusing to arm provider invocation: {reason}");
            completion(RawProviderResult::Interrupted { reason });
            return None;
        }
        let mut code = RequestCode(self.next_code.fetch_add(1, Ordering::Relaxed));
        while pending.completions.contains_key(&code) {
            code = RequestCode(self.next_code.fetch_add(1, Ordering::Relaxed));
        }
        pending.completions.insert(code, Box::new(completion));
        drop(pending);
        log::debug!("armed provider invocation {code}");
        Some(code)
    }

    /// Delivers `result` to the invocation armed under `code`.
    ///
    /// Returns `false` if nothing is armed under `code` (already fired, disarmed, or never armed).
    pub(crate) fn fire(&self, code: RequestCode, result: RawProviderResult) -> bool {
        let completion = self.pending().completions.remove(&code);
        match completion {
            Some(completion) => {
                log::debug!("firing provider invocation {code}");
                completion(result);
                true
            }
            None => {
                log::warn!("dropping provider result for unknown or completed invocation {code}");
                false
            }
        }
    }

    /// Closes the correlator and delivers an interruption to every pending invocation.
    ///
    /// Returns the codes that were pending.
    pub(crate) fn close(&self, reason: &str) -> Vec<RequestCode> {
        let drained: Vec<(RequestCode, Completion)> = {
            let mut pending = self.pending();
            pending.closed = Some(reason.to_string());
            pending.completions.drain().collect()
        };
        let mut codes = Vec::with_capacity(drained.len());
        for (code, completion) in drained {
            log::info!("interrupting provider invocation {code}: {reason}");
            completion(RawProviderResult::Interrupted {
                reason: reason.to_string(),
            });
            codes.push(code);
        }
        codes
    }

    pub(crate) fn is_armed(&self, code: RequestCode) -> bool {
        self.pending().completions.contains_key(&code)
    }

    pub(crate) fn live(&self) -> usize {
        self.pending().completions.len()
    }
}
