//! Per-tenant bot session supervision.
//!
//! The supervisor owns the live-session map exclusively; nothing else reads
//! or writes it. Per-tenant async locks serialize start/stop for the same
//! tenant (a stop issued behind an in-flight start waits for it), while
//! operations on distinct tenants interleave freely. Restart is always
//! stop-then-start — at most one live connection per tenant, ever.
//!
//! Secret lifecycle and session lifecycle are independent: removing a
//! stored token does not close a running session. Dropped transport
//! connections are not re-dialed automatically; an explicit restart is
//! required.

use crate::credentials::CredentialService;
use crate::platform::{ConnectError, Connection, InboundEvent, Platform};
use crate::store::SecretName;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub struct SessionSupervisor {
    credentials: Arc<CredentialService>,
    platform: Arc<dyn Platform>,
    events: mpsc::Sender<InboundEvent>,
    login_timeout: Duration,
    sessions: Mutex<HashMap<String, Arc<dyn Connection>>>,
    tenant_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionSupervisor {
    pub fn new(
        credentials: Arc<CredentialService>,
        platform: Arc<dyn Platform>,
        events: mpsc::Sender<InboundEvent>,
        login_timeout: Duration,
    ) -> Self {
        Self {
            credentials,
            platform,
            events,
            login_timeout,
            sessions: Mutex::new(HashMap::new()),
            tenant_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Start (or restart) the bot session for one tenant.
    ///
    /// Returns `Ok(false)` when no token is stored, the platform rejects
    /// the token, or login times out — all cases where an admin must act
    /// and retrying won't help. Transport errors propagate so callers can
    /// retry. On any failure the tenant has no entry in the session map.
    pub async fn start(&self, tenant_id: &str) -> anyhow::Result<bool> {
        let lock = self.tenant_lock(tenant_id);
        let result = {
            let _guard = lock.lock().await;
            self.start_locked(tenant_id).await
        };
        drop(lock);
        self.prune_tenant_lock(tenant_id);
        result
    }

    async fn start_locked(&self, tenant_id: &str) -> anyhow::Result<bool> {
        // Restart semantics: tear down any existing connection first.
        let previous = self.sessions.lock().remove(tenant_id);
        if let Some(old) = previous {
            tracing::info!("replacing existing session for tenant {}", tenant_id);
            old.close().await;
        }

        let Some(token) = self
            .credentials
            .get_plaintext(tenant_id, SecretName::BotToken)?
        else {
            tracing::warn!("no bot token stored for tenant {}, not starting", tenant_id);
            return Ok(false);
        };

        let attempt = self.platform.connect(&token, self.events.clone());
        let conn = match tokio::time::timeout(self.login_timeout, attempt).await {
            Err(_) => {
                tracing::warn!("login timed out for tenant {}", tenant_id);
                return Ok(false);
            }
            Ok(Err(ConnectError::InvalidToken)) => {
                tracing::warn!(
                    "platform rejected the bot token for tenant {} — it must be reset",
                    tenant_id
                );
                return Ok(false);
            }
            Ok(Err(ConnectError::Network(e))) => {
                anyhow::bail!("login failed for tenant {tenant_id}: {e}");
            }
            Ok(Ok(conn)) => conn,
        };

        self.sessions.lock().insert(tenant_id.to_string(), conn);
        tracing::info!("session running for tenant {}", tenant_id);
        Ok(true)
    }

    /// Stop a tenant's session, reporting whether one was running.
    pub async fn stop(&self, tenant_id: &str) -> bool {
        let lock = self.tenant_lock(tenant_id);
        let was_running = {
            let _guard = lock.lock().await;
            let conn = self.sessions.lock().remove(tenant_id);
            match conn {
                Some(conn) => {
                    conn.close().await;
                    tracing::info!("session stopped for tenant {}", tenant_id);
                    true
                }
                None => false,
            }
        };
        drop(lock);
        self.prune_tenant_lock(tenant_id);
        was_running
    }

    /// Snapshot of tenants with a running session.
    pub fn list_active(&self) -> Vec<String> {
        self.sessions.lock().keys().cloned().collect()
    }

    /// Start sessions for every tenant holding a stored bot token. One
    /// tenant's bad token must not abort startup for the others.
    pub async fn start_all(&self) {
        let tenants = match self.credentials.tenants_with(SecretName::BotToken) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!("could not enumerate tenants with bot tokens: {}", e);
                return;
            }
        };
        tracing::info!("starting sessions for {} tenant(s)", tenants.len());

        let mut started = 0usize;
        for tenant_id in &tenants {
            match self.start(tenant_id).await {
                Ok(true) => started += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!("startup failed for tenant {}: {}", tenant_id, e),
            }
        }
        tracing::info!("{}/{} tenant session(s) running", started, tenants.len());
    }

    /// Deliver a reply through a tenant's live connection.
    pub async fn send_to(
        &self,
        tenant_id: &str,
        channel_id: &str,
        text: &str,
    ) -> anyhow::Result<()> {
        let conn = self.sessions.lock().get(tenant_id).cloned();
        match conn {
            Some(conn) => conn.send(channel_id, text).await,
            None => anyhow::bail!("no running session for tenant {tenant_id}"),
        }
    }

    /// Close every session. Called once at process shutdown.
    pub async fn shutdown(&self) {
        for tenant_id in self.list_active() {
            self.stop(&tenant_id).await;
        }
    }

    fn tenant_lock(&self, tenant_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.tenant_locks
            .lock()
            .entry(tenant_id.to_string())
            .or_default()
            .clone()
    }

    /// Drop a tenant's lock entry once no task holds a handle to it.
    /// Without this, every id ever passed to start/stop (typos included)
    /// keeps a slot in the map for the life of the process. The map mutex
    /// makes the strong-count check exact: new handles are only cloned out
    /// while it is held.
    fn prune_tenant_lock(&self, tenant_id: &str) {
        let mut locks = self.tenant_locks.lock();
        if let Some(existing) = locks.get(tenant_id) {
            if Arc::strong_count(existing) == 1 {
                locks.remove(tenant_id);
            }
        }
    }
}
