use std::sync::Arc;

use serde_json::{json, Value};

use crate::ipc::error::ok;
use crate::ipc::helpers::{page_from, required_object, required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::resources;

async fn list(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let gw = Arc::clone(&state.gateway);
    let groups = resources::list_groups(gw.as_ref(), page_from(params)).await?;
    Ok(json!({ "groups": groups }))
}

async fn search(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let q = required_str(params, "q")?;
    let gw = Arc::clone(&state.gateway);
    let groups = resources::search_groups(gw.as_ref(), &q, page_from(params)).await?;
    Ok(json!({ "groups": groups }))
}

async fn create(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let body = required_object(params, "group")?;
    let gw = Arc::clone(&state.gateway);
    let group = resources::create_group(gw.as_ref(), &body).await?;
    Ok(json!({ "group": group }))
}

async fn update(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_str(params, "groupId")?;
    let body = required_object(params, "group")?;
    let gw = Arc::clone(&state.gateway);
    let group = resources::update_group(gw.as_ref(), &id, &body).await?;
    Ok(json!({ "group": group }))
}

async fn delete(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_str(params, "groupId")?;
    let gw = Arc::clone(&state.gateway);
    resources::delete_group(gw.as_ref(), &id).await?;
    Ok(json!({ "deleted": true }))
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let out = match req.method.as_str() {
        "groups.list" => list(state, &req.params).await,
        "groups.search" => search(state, &req.params).await,
        "groups.create" => create(state, &req.params).await,
        "groups.update" => update(state, &req.params).await,
        "groups.delete" => delete(state, &req.params).await,
        _ => return None,
    };
    Some(match out {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    })
}
