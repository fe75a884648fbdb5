use serde_json::json;

use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};

async fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "apiBaseUrl": state.config.api_base_url,
            "role": state.active.as_ref().map(|a| a.role.as_str()),
            "tokenPresent": state.store.token().is_some(),
        }),
    )
}

async fn handle_config_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "apiBaseUrl": state.config.api_base_url,
            "stateDir": state.config.state_dir.to_string_lossy(),
            "allowManualRoleOverride": state.config.allow_role_override,
        }),
    )
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req).await),
        "config.get" => Some(handle_config_get(state, req).await),
        _ => None,
    }
}
