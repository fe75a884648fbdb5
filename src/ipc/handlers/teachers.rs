use std::sync::Arc;

use serde_json::{json, Value};

use crate::files;
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    page_from, read_upload, required_object, required_str, write_download, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::resources;

async fn list(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let gw = Arc::clone(&state.gateway);
    let teachers = resources::list_teachers(gw.as_ref(), page_from(params)).await?;
    Ok(json!({ "teachers": teachers }))
}

async fn search(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let q = required_str(params, "q")?;
    let gw = Arc::clone(&state.gateway);
    let teachers = resources::search_teachers(gw.as_ref(), &q, page_from(params)).await?;
    Ok(json!({ "teachers": teachers }))
}

async fn create(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let body = required_object(params, "teacher")?;
    let gw = Arc::clone(&state.gateway);
    let teacher = resources::create_teacher(gw.as_ref(), &body).await?;
    Ok(json!({ "teacher": teacher }))
}

async fn update(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_str(params, "teacherId")?;
    let body = required_object(params, "teacher")?;
    let gw = Arc::clone(&state.gateway);
    let teacher = resources::update_teacher(gw.as_ref(), &id, &body).await?;
    Ok(json!({ "teacher": teacher }))
}

async fn delete(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_str(params, "teacherId")?;
    let gw = Arc::clone(&state.gateway);
    resources::delete_teacher(gw.as_ref(), &id).await?;
    Ok(json!({ "deleted": true }))
}

async fn import(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let path = required_str(params, "path")?;
    let (bytes, file_name) = read_upload(&path)?;
    let gw = Arc::clone(&state.gateway);
    let summary = files::import_teachers(gw.as_ref(), bytes, &file_name).await?;
    Ok(json!({ "summary": summary }))
}

async fn export(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let out_path = required_str(params, "outPath")?;
    let gw = Arc::clone(&state.gateway);
    let download = files::export_teachers(gw.as_ref()).await?;
    write_download(&out_path, &download)
}

async fn template(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let out_path = required_str(params, "outPath")?;
    let gw = Arc::clone(&state.gateway);
    let download = files::teachers_import_template(gw.as_ref()).await?;
    write_download(&out_path, &download)
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let out = match req.method.as_str() {
        "teachers.list" => list(state, &req.params).await,
        "teachers.search" => search(state, &req.params).await,
        "teachers.create" => create(state, &req.params).await,
        "teachers.update" => update(state, &req.params).await,
        "teachers.delete" => delete(state, &req.params).await,
        "teachers.import" => import(state, &req.params).await,
        "teachers.export" => export(state, &req.params).await,
        "teachers.template" => template(state, &req.params).await,
        _ => return None,
    };
    Some(match out {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    })
}
