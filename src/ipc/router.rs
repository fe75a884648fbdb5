use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

pub async fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    if let Some(resp) = handlers::core::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::auth::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::rooms::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::groups::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::students::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::teachers::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::catalog::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::courses::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::schedule::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::grades::try_handle(state, &req).await {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
