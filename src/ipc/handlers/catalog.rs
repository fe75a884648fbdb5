use std::sync::Arc;

use serde_json::{json, Value};

use crate::ipc::error::ok;
use crate::ipc::helpers::{optional_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::resources;

async fn departments(state: &mut AppState) -> Result<Value, HandlerErr> {
    let gw = Arc::clone(&state.gateway);
    let departments = resources::list_departments(gw.as_ref()).await?;
    Ok(json!({ "departments": departments }))
}

async fn specializations(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let department_id = optional_str(params, "departmentId");
    let gw = Arc::clone(&state.gateway);
    let specializations =
        resources::list_specializations(gw.as_ref(), department_id.as_deref()).await?;
    Ok(json!({ "specializations": specializations }))
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let out = match req.method.as_str() {
        "departments.list" => departments(state).await,
        "specializations.list" => specializations(state, &req.params).await,
        _ => return None,
    };
    Some(match out {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    })
}
