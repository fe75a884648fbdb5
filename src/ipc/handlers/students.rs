use std::sync::Arc;

use serde_json::{json, Value};

use crate::files;
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    optional_str, page_from, read_upload, required_object, required_str, write_download,
    HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::resources;

async fn list(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let gw = Arc::clone(&state.gateway);
    let page = page_from(params);
    let students = match optional_str(params, "groupId") {
        Some(group_id) => {
            resources::list_students_in_group(gw.as_ref(), &group_id, page).await?
        }
        None => resources::list_students(gw.as_ref(), page).await?,
    };
    Ok(json!({ "students": students }))
}

async fn search(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let q = required_str(params, "q")?;
    let gw = Arc::clone(&state.gateway);
    let students = resources::search_students(gw.as_ref(), &q, page_from(params)).await?;
    Ok(json!({ "students": students }))
}

async fn create(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let body = required_object(params, "student")?;
    let gw = Arc::clone(&state.gateway);
    let student = resources::create_student(gw.as_ref(), &body).await?;
    Ok(json!({ "student": student }))
}

async fn update(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_str(params, "studentId")?;
    let body = required_object(params, "student")?;
    let gw = Arc::clone(&state.gateway);
    let student = resources::update_student(gw.as_ref(), &id, &body).await?;
    Ok(json!({ "student": student }))
}

async fn delete(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_str(params, "studentId")?;
    let gw = Arc::clone(&state.gateway);
    resources::delete_student(gw.as_ref(), &id).await?;
    Ok(json!({ "deleted": true }))
}

async fn import(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let path = required_str(params, "path")?;
    let (bytes, file_name) = read_upload(&path)?;
    let gw = Arc::clone(&state.gateway);
    let summary = files::import_students(gw.as_ref(), bytes, &file_name).await?;
    Ok(json!({ "summary": summary }))
}

async fn export(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let out_path = required_str(params, "outPath")?;
    let gw = Arc::clone(&state.gateway);
    let download = files::export_students(gw.as_ref()).await?;
    write_download(&out_path, &download)
}

async fn template(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let out_path = required_str(params, "outPath")?;
    let gw = Arc::clone(&state.gateway);
    let download = files::students_import_template(gw.as_ref()).await?;
    write_download(&out_path, &download)
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let out = match req.method.as_str() {
        "students.list" => list(state, &req.params).await,
        "students.search" => search(state, &req.params).await,
        "students.create" => create(state, &req.params).await,
        "students.update" => update(state, &req.params).await,
        "students.delete" => delete(state, &req.params).await,
        "students.import" => import(state, &req.params).await,
        "students.export" => export(state, &req.params).await,
        "students.template" => template(state, &req.params).await,
        _ => return None,
    };
    Some(match out {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    })
}
