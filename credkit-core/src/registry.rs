//! Controllers per provider host.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    config::ProviderConfig,
    controller::{Controller, CreatePassword, CreatePublicKey, GetCredential},
    correlator::RequestCode,
    host::{ProviderChannel, ProviderHost},
};

/// The controllers serving one provider host.
///
/// All three share the host's channel, so request codes are unique across operations.
pub(crate) struct HostControllers {
    channel: Arc<ProviderChannel>,
    pub(crate) create_password: Controller<CreatePassword>,
    pub(crate) create_public_key: Controller<CreatePublicKey>,
    pub(crate) get_credential: Controller<GetCredential>,
}

impl HostControllers {
    fn new(host: Arc<dyn ProviderHost>, config: &ProviderConfig) -> Self {
        let channel = Arc::new(ProviderChannel::new(host, config.first_request_code));
        Self {
            create_password: Controller::new(Arc::clone(&channel), config.cancel_in_flight),
            create_public_key: Controller::new(Arc::clone(&channel), config.cancel_in_flight),
            get_credential: Controller::new(Arc::clone(&channel), config.cancel_in_flight),
            channel,
        }
    }

    pub(crate) fn abandon(&self, code: RequestCode, reason: &str) -> bool {
        self.channel.abandon(code, reason)
    }

    pub(crate) fn live_invocations(&self) -> usize {
        self.channel.live_invocations()
    }
}

/// Lazily built [`HostControllers`], keyed by [`ProviderHost::host_id`].
pub(crate) struct ControllerRegistry {
    config: ProviderConfig,
    hosts: Mutex<HashMap<String, Arc<HostControllers>>>,
}

impl ControllerRegistry {
    pub(crate) fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            hosts: Mutex::new(HashMap::new()),
        }
    }

    fn hosts(&self) -> MutexGuard<'_, HashMap<String, Arc<HostControllers>>> {
        self.hosts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the controllers for `host`, building them on first use.
    pub(crate) fn controllers_for(&self, host: Arc<dyn ProviderHost>) -> Arc<HostControllers> {
        let host_id = host.host_id();
        let mut hosts = self.hosts();
        if let Some(controllers) = hosts.get(&host_id) {
            return Arc::clone(controllers);
        }
        log::debug!("building controllers for provider host {host_id}");
        let controllers = Arc::new(HostControllers::new(host, &self.config));
        hosts.insert(host_id, Arc::clone(&controllers));
        controllers
    }

    pub(crate) fn get(&self, host_id: &str) -> Option<Arc<HostControllers>> {
        self.hosts().get(host_id).cloned()
    }

    /// Drops the controllers of a destroyed host and interrupts everything still pending on it.
    ///
    /// Returns the number of interrupted invocations.
    pub(crate) fn destroy(&self, host_id: &str) -> usize {
        let Some(controllers) = self.hosts().remove(host_id) else {
            return 0;
        };
        let interrupted = controllers
            .channel
            .close("the provider host was destroyed");
        log::info!("provider host {host_id} destroyed, interrupted {interrupted} invocation(s)");
        interrupted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::CallbackBinding;
    use crate::error::{CreateCredentialError, HostError};
    use crate::executor::InlineExecutor;
    use crate::host::{ProviderLaunch, ProviderResultReceiver};
    use crate::request::CreatePasswordRequest;

    struct CountingHost(Mutex<usize>);

    impl ProviderHost for CountingHost {
        fn host_id(&self) -> String {
            "activity".to_string()
        }

        fn launch(
            &self,
            _launch: ProviderLaunch,
            _receiver: Arc<ProviderResultReceiver>,
        ) -> Result<(), HostError> {
            *self.0.lock().unwrap() += 1;
            Ok(())
        }

        fn dismiss(&self, _request_code: u32) {}
    }

    #[test]
    fn test_controllers_held_across_destroy_interrupt_new_invocations() {
        let registry = ControllerRegistry::new(ProviderConfig::default());
        let host = Arc::new(CountingHost(Mutex::new(0)));
        let stale = registry.controllers_for(host.clone());
        assert_eq!(registry.destroy("activity"), 0);

        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&outcomes);
        let code = stale.create_password.invoke(
            &CreatePasswordRequest {
                id: "alice".to_string(),
                password: "pw123".to_string(),
            },
            None,
            CallbackBinding::new(
                move |outcome| sink.lock().unwrap().push(outcome),
                Arc::new(InlineExecutor::new()),
            ),
        );

        assert_eq!(code, None);
        assert_eq!(*host.0.lock().unwrap(), 0);
        assert!(matches!(
            outcomes.lock().unwrap().as_slice(),
            [Err(CreateCredentialError::Interrupted { .. })]
        ));
        assert!(registry.get("activity").is_none());
    }
}
