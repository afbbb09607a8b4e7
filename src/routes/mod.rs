pub mod bot_routes;
pub mod secret_routes;

use crate::state::SharedState;
use axum::{
    http::{header, Method},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn app(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any) // Restrict to specific origins in production
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    let api = Router::new()
        // Secrets
        .route("/secrets/{name}", post(secret_routes::set_secret))
        .route(
            "/secrets/{name}/{tenant_id}",
            get(secret_routes::get_secret).delete(secret_routes::delete_secret),
        )
        // Bot sessions
        .route("/bot/restart/{tenant_id}", post(bot_routes::restart_bot))
        .route("/bot/stop/{tenant_id}", post(bot_routes::stop_bot))
        .route("/bot/active", get(bot_routes::active_bots))
        .with_state(state);

    Router::new()
        .route("/healthcheck", get(healthcheck))
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "botvault"
    }))
}
