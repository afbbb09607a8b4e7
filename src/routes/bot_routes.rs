use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::SharedState;

/// POST /api/bot/restart/{tenant_id}
///
/// Always stop-then-start. `running: false` means the tenant has no stored
/// token or the platform rejected it — the admin must fix the token, a
/// retry alone won't help.
pub async fn restart_bot(
    State(state): State<SharedState>,
    Path(tenant_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let running = state.supervisor.start(&tenant_id).await?;
    Ok(Json(json!({
        "tenantId": tenant_id,
        "running": running,
    })))
}

/// POST /api/bot/stop/{tenant_id}
pub async fn stop_bot(
    State(state): State<SharedState>,
    Path(tenant_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let was_running = state.supervisor.stop(&tenant_id).await;
    Ok(Json(json!({
        "tenantId": tenant_id,
        "wasRunning": was_running,
    })))
}

/// GET /api/bot/active
pub async fn active_bots(State(state): State<SharedState>) -> Json<Value> {
    let mut active = state.supervisor.list_active();
    active.sort();
    Json(json!({ "active": active }))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::credentials::CredentialService;
    use crate::db::temp_db;
    use crate::platform::{ConnectError, Connection, InboundEvent, Platform};
    use crate::state::AppState;
    use crate::store::{SecretName, SecretStore};
    use crate::supervisor::SessionSupervisor;
    use crate::vault::SecretCipher;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    pub(crate) const BOT_TOKEN: &str = "routes-test-token-0123456789abcdef0123456789";

    /// Accepts every token and hands out inert connections.
    struct NullPlatform;

    struct NullConnection;

    #[async_trait]
    impl Connection for NullConnection {
        async fn send(&self, _channel_id: &str, _text: &str) -> anyhow::Result<()> {
            Ok(())
        }
        async fn close(&self) {}
    }

    #[async_trait]
    impl Platform for NullPlatform {
        async fn connect(
            &self,
            _token: &str,
            _events: mpsc::Sender<InboundEvent>,
        ) -> Result<Arc<dyn Connection>, ConnectError> {
            Ok(Arc::new(NullConnection))
        }
    }

    /// Shared route-test fixture: state over a tempfile DB, optionally
    /// pre-seeding bot tokens.
    pub(crate) fn test_state(tenants_with_tokens: &[&str]) -> (tempfile::TempDir, SharedState) {
        let (dir, db) = temp_db();
        let credentials = Arc::new(CredentialService::new(
            SecretStore::new(db),
            SecretCipher::new([3; 32]),
        ));
        for tenant in tenants_with_tokens {
            credentials
                .set(tenant, SecretName::BotToken, BOT_TOKEN)
                .unwrap();
        }
        let (tx, _rx) = mpsc::channel(8);
        let supervisor = Arc::new(SessionSupervisor::new(
            credentials.clone(),
            Arc::new(NullPlatform),
            tx,
            std::time::Duration::from_millis(200),
        ));
        let config: BackendConfig = toml::from_str("").unwrap();
        (dir, AppState::new(config, credentials, supervisor))
    }

    #[tokio::test]
    async fn restart_without_token_reports_not_running() {
        let (_dir, state) = test_state(&[]);
        let resp = restart_bot(State(state), Path("guild1".into())).await.unwrap();
        assert_eq!(resp.0["running"], false);
    }

    #[tokio::test]
    async fn restart_then_stop_lifecycle() {
        let (_dir, state) = test_state(&["guild1"]);

        let resp = restart_bot(State(state.clone()), Path("guild1".into()))
            .await
            .unwrap();
        assert_eq!(resp.0["running"], true);

        let resp = active_bots(State(state.clone())).await;
        assert_eq!(resp.0["active"], json!(["guild1"]));

        let resp = stop_bot(State(state.clone()), Path("guild1".into()))
            .await
            .unwrap();
        assert_eq!(resp.0["wasRunning"], true);

        let resp = stop_bot(State(state.clone()), Path("guild1".into()))
            .await
            .unwrap();
        assert_eq!(resp.0["wasRunning"], false);

        let resp = active_bots(State(state)).await;
        assert_eq!(resp.0["active"], json!([]));
    }
}
