use std::sync::Arc;

use serde_json::{json, Value};

use crate::files;
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    optional_str, page_from, read_upload, required_object, required_str, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::resources;

async fn list(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let gw = Arc::clone(&state.gateway);
    let page = page_from(params);
    let courses = if let Some(teacher_id) = optional_str(params, "teacherId") {
        resources::list_courses_for_teacher(gw.as_ref(), &teacher_id, page).await?
    } else if let Some(group_id) = optional_str(params, "groupId") {
        resources::list_courses_for_group(gw.as_ref(), &group_id, page).await?
    } else {
        resources::list_courses(gw.as_ref(), page).await?
    };
    Ok(json!({ "courses": courses }))
}

async fn create(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let body = required_object(params, "course")?;
    let gw = Arc::clone(&state.gateway);
    let course = resources::create_course(gw.as_ref(), &body).await?;
    Ok(json!({ "course": course }))
}

async fn update(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_str(params, "courseId")?;
    let body = required_object(params, "course")?;
    let gw = Arc::clone(&state.gateway);
    let course = resources::update_course(gw.as_ref(), &id, &body).await?;
    Ok(json!({ "course": course }))
}

async fn delete(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_str(params, "courseId")?;
    let gw = Arc::clone(&state.gateway);
    resources::delete_course(gw.as_ref(), &id).await?;
    Ok(json!({ "deleted": true }))
}

async fn syllabus_upload(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let course_id = required_str(params, "courseId")?;
    let path = required_str(params, "path")?;
    let (bytes, file_name) = read_upload(&path)?;
    let gw = Arc::clone(&state.gateway);
    let result = files::upload_syllabus(gw.as_ref(), &course_id, bytes, &file_name).await?;
    Ok(json!({ "syllabus": result }))
}

async fn syllabus_replace(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let course_id = required_str(params, "courseId")?;
    let path = required_str(params, "path")?;
    let (bytes, file_name) = read_upload(&path)?;
    let gw = Arc::clone(&state.gateway);
    let result = files::replace_syllabus(gw.as_ref(), &course_id, bytes, &file_name).await?;
    Ok(json!({ "syllabus": result }))
}

async fn syllabus_delete(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let course_id = required_str(params, "courseId")?;
    let gw = Arc::clone(&state.gateway);
    files::delete_syllabus(gw.as_ref(), &course_id).await?;
    Ok(json!({ "deleted": true }))
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let out = match req.method.as_str() {
        "courses.list" => list(state, &req.params).await,
        "courses.create" => create(state, &req.params).await,
        "courses.update" => update(state, &req.params).await,
        "courses.delete" => delete(state, &req.params).await,
        "courses.syllabusUpload" => syllabus_upload(state, &req.params).await,
        "courses.syllabusReplace" => syllabus_replace(state, &req.params).await,
        "courses.syllabusDelete" => syllabus_delete(state, &req.params).await,
        _ => return None,
    };
    Some(match out {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    })
}
