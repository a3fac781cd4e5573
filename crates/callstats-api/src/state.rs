//! Shared application state for the API server.
//!
//! [`AppState`] holds the services every handler calls into. It is built
//! once at startup, wrapped in an `Arc` and never mutated; each request
//! opens its own control-channel session through the services.

use std::sync::Arc;

use callstats_core::config::FeatureFlags;
use callstats_core::monitor::MonitorService;
use callstats_core::provision::Provisioner;
use callstats_core::queues::QueueService;
use callstats_esl::Connector;

use crate::auth::CredentialStore;

/// Collaborators injected into every handler.
pub struct AppState<C> {
    /// Queue, agent and caller views.
    pub queues: QueueService<C>,
    /// Engine status, calls and channels.
    pub monitor: MonitorService<C>,
    /// User provisioning.
    pub provisioner: Provisioner<C>,
    /// Source of the expected access key.
    pub credentials: Arc<CredentialStore>,
    /// Route groups to mount.
    pub features: FeatureFlags,
}

impl<C: Connector> AppState<C> {
    /// Bundle the services with every route group enabled except `calls`.
    pub fn new(
        queues: QueueService<C>,
        monitor: MonitorService<C>,
        provisioner: Provisioner<C>,
        credentials: CredentialStore,
    ) -> Self {
        Self {
            queues,
            monitor,
            provisioner,
            credentials: Arc::new(credentials),
            features: FeatureFlags::default(),
        }
    }

    /// Replace the route-group flags.
    #[must_use]
    pub const fn with_features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }
}
