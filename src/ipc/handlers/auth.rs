use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::auth::{self, Role};
use crate::ipc::error::ok;
use crate::ipc::helpers::{optional_str, required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};

async fn sign_in(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let email = required_str(params, "email")?;
    let password = required_str(params, "password")?;
    let gw = Arc::clone(&state.gateway);

    let signed = auth::sign_in(gw.as_ref(), &email, &password).await?;
    state
        .store
        .set(&signed.token, signed.expires_at)
        .map_err(|e| HandlerErr::new("storage_error", e.to_string()))?;

    resolve_into_state(state).await
}

async fn resolve_role(state: &mut AppState) -> Result<Value, HandlerErr> {
    resolve_into_state(state).await
}

/// Shared tail of sign-in and re-resolution: run the probes, adopt the
/// resulting identity, or fall back to the unauthenticated state. The
/// session token itself is cleared inside `auth::establish` on total
/// failure.
async fn resolve_into_state(state: &mut AppState) -> Result<Value, HandlerErr> {
    let gw = Arc::clone(&state.gateway);
    match auth::establish(gw.as_ref(), &state.store).await {
        Ok(active) => {
            let result = json!({
                "role": active.role.as_str(),
                "profile": active.profile,
            });
            state.active = Some(active);
            state.reset_views();
            Ok(result)
        }
        Err(e) => {
            state.active = None;
            state.reset_views();
            Err(HandlerErr::new("auth_required", e.to_string()))
        }
    }
}

fn sign_out(state: &mut AppState) -> Result<Value, HandlerErr> {
    state
        .store
        .clear()
        .map_err(|e| HandlerErr::new("storage_error", e.to_string()))?;
    state.active = None;
    state.reset_views();
    Ok(json!({ "signedOut": true }))
}

fn override_role(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    if !state.config.allow_role_override {
        return Err(HandlerErr::new(
            "disabled",
            "manual role override is disabled",
        ));
    }
    let raw = required_str(params, "role")?;
    let Some(role) = Role::parse(&raw) else {
        return Err(HandlerErr::bad_params(format!("unknown role: {}", raw)));
    };
    let Some(active) = state.active.as_mut() else {
        return Err(HandlerErr::new("auth_required", "sign in first"));
    };
    active.role = role;
    state.reset_views();
    Ok(json!({ "role": role.as_str() }))
}

fn session_get(state: &mut AppState) -> Result<Value, HandlerErr> {
    Ok(json!({
        "tokenPresent": state.store.token().is_some(),
        "expiresAt": state.store.expiry().map(|dt| dt.to_rfc3339()),
    }))
}

fn session_set(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let token = required_str(params, "token")?;
    let expires_at = match optional_str(params, "expiresAt") {
        Some(raw) => Some(
            DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| HandlerErr::bad_params(format!("expiresAt: {}", e)))?,
        ),
        None => None,
    };
    state
        .store
        .set(&token, expires_at)
        .map_err(|e| HandlerErr::new("storage_error", e.to_string()))?;
    Ok(json!({ "stored": true }))
}

fn session_clear(state: &mut AppState) -> Result<Value, HandlerErr> {
    state
        .store
        .clear()
        .map_err(|e| HandlerErr::new("storage_error", e.to_string()))?;
    state.active = None;
    state.reset_views();
    Ok(json!({ "cleared": true }))
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let out = match req.method.as_str() {
        "auth.signIn" => sign_in(state, &req.params).await,
        "auth.resolveRole" => resolve_role(state).await,
        "auth.signOut" => sign_out(state),
        "auth.overrideRole" => override_role(state, &req.params),
        "session.get" => session_get(state),
        "session.set" => session_set(state, &req.params),
        "session.clear" => session_clear(state),
        _ => return None,
    };
    Some(match out {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    })
}
