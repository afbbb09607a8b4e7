use crate::config::BackendConfig;
use crate::credentials::CredentialService;
use crate::supervisor::SessionSupervisor;
use std::sync::Arc;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: BackendConfig,
    pub credentials: Arc<CredentialService>,
    pub supervisor: Arc<SessionSupervisor>,
}

impl AppState {
    pub fn new(
        config: BackendConfig,
        credentials: Arc<CredentialService>,
        supervisor: Arc<SessionSupervisor>,
    ) -> SharedState {
        Arc::new(Self {
            config,
            credentials,
            supervisor,
        })
    }
}
