use std::sync::Arc;

use serde_json::{json, Value};

use crate::ipc::error::ok;
use crate::ipc::helpers::{page_from, required_object, required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::resources;

async fn list(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let gw = Arc::clone(&state.gateway);
    let rooms = resources::list_rooms(gw.as_ref(), page_from(params)).await?;
    Ok(json!({ "rooms": rooms }))
}

async fn search(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let q = required_str(params, "q")?;
    let gw = Arc::clone(&state.gateway);
    let rooms = resources::search_rooms(gw.as_ref(), &q, page_from(params)).await?;
    Ok(json!({ "rooms": rooms }))
}

async fn create(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let body = required_object(params, "room")?;
    let gw = Arc::clone(&state.gateway);
    let room = resources::create_room(gw.as_ref(), &body).await?;
    Ok(json!({ "room": room }))
}

async fn update(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_str(params, "roomId")?;
    let body = required_object(params, "room")?;
    let gw = Arc::clone(&state.gateway);
    let room = resources::update_room(gw.as_ref(), &id, &body).await?;
    Ok(json!({ "room": room }))
}

async fn delete(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_str(params, "roomId")?;
    let gw = Arc::clone(&state.gateway);
    resources::delete_room(gw.as_ref(), &id).await?;
    Ok(json!({ "deleted": true }))
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let out = match req.method.as_str() {
        "rooms.list" => list(state, &req.params).await,
        "rooms.search" => search(state, &req.params).await,
        "rooms.create" => create(state, &req.params).await,
        "rooms.update" => update(state, &req.params).await,
        "rooms.delete" => delete(state, &req.params).await,
        _ => return None,
    };
    Some(match out {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    })
}
