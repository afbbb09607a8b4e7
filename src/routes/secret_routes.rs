use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::SharedState;
use crate::store::SecretName;

#[derive(Deserialize)]
pub struct SetSecretBody {
    #[serde(rename = "tenantId")]
    pub tenant_id: Option<String>,
    pub plaintext: Option<String>,
}

fn parse_name(name: &str) -> Result<SecretName, AppError> {
    name.parse()
        .map_err(|()| AppError::BadRequest(format!("unknown secret name: {name}")))
}

/// POST /api/secrets/{name}
pub async fn set_secret(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Json(body): Json<SetSecretBody>,
) -> Result<Json<Value>, AppError> {
    let name = parse_name(&name)?;
    let tenant_id = body
        .tenant_id
        .ok_or_else(|| AppError::BadRequest("missing field: tenantId".into()))?;
    let plaintext = body
        .plaintext
        .ok_or_else(|| AppError::BadRequest("missing field: plaintext".into()))?;

    state.credentials.set(&tenant_id, name, &plaintext)?;
    Ok(Json(json!({ "status": "ok" })))
}

/// GET /api/secrets/{name}/{tenant_id}
pub async fn get_secret(
    State(state): State<SharedState>,
    Path((name, tenant_id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let name = parse_name(&name)?;
    match state.credentials.get_plaintext(&tenant_id, name)? {
        Some(plaintext) => Ok(Json(json!({
            "tenantId": tenant_id,
            "plaintext": plaintext,
        }))),
        None => Err(AppError::NotFound(format!(
            "no {} stored for tenant {tenant_id}",
            name.as_str()
        ))),
    }
}

/// DELETE /api/secrets/{name}/{tenant_id}
pub async fn delete_secret(
    State(state): State<SharedState>,
    Path((name, tenant_id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let name = parse_name(&name)?;
    let removed = state.credentials.remove(&tenant_id, name)?;
    Ok(Json(json!({ "removed": removed })))
}
