use std::sync::Arc;

use serde_json::{json, Value};

use crate::grades::{self, check_grade, AssignmentGrid, ColloquiumBoard};
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    nullable_grade, optional_grade, required_bool, required_str, required_usize, HandlerErr,
};
use crate::ipc::types::{AppState, GradeView, Request};
use crate::resources;

fn upsert_view<'a>(state: &'a mut AppState, course_id: &str) -> &'a mut GradeView {
    let epoch = state.next_epoch();
    state
        .grade_views
        .entry(course_id.to_string())
        .or_insert_with(|| GradeView {
            assignments: None,
            colloquiums: None,
            epoch,
        })
}

fn grid_rows(grid: &AssignmentGrid) -> Vec<Value> {
    grid.rows()
        .into_iter()
        .map(|(student_id, mark)| json!({ "studentId": student_id, "mark": mark }))
        .collect()
}

async fn open_assignments(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let course_id = required_str(params, "courseId")?;
    let gw = Arc::clone(&state.gateway);
    let records = resources::fetch_assignments(gw.as_ref(), &course_id).await?;
    let grid = AssignmentGrid::from_records(&course_id, records);
    let rows = grid_rows(&grid);
    upsert_view(state, &course_id).assignments = Some(grid);
    Ok(json!({ "marks": rows }))
}

/// Purely local: per-cell toggles never touch the network.
fn cycle_assignment(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let course_id = required_str(params, "courseId")?;
    let student_id = required_str(params, "studentId")?;
    let Some(grid) = state
        .grade_views
        .get_mut(&course_id)
        .and_then(|view| view.assignments.as_mut())
    else {
        return Err(HandlerErr::new("no_view", "open the assignment grid first"));
    };
    let mark = grid.cycle(&student_id);
    Ok(json!({ "studentId": student_id, "mark": mark }))
}

/// The one persistence point for assignment marks: the whole grid goes out
/// in a single request.
async fn submit_assignments(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let course_id = required_str(params, "courseId")?;
    let payload = {
        let Some(grid) = state
            .grade_views
            .get(&course_id)
            .and_then(|view| view.assignments.as_ref())
        else {
            return Err(HandlerErr::new("no_view", "open the assignment grid first"));
        };
        grid.submit_payload()
    };

    let gw = Arc::clone(&state.gateway);
    resources::submit_assignments(gw.as_ref(), &course_id, payload).await?;

    if let Some(grid) = state
        .grade_views
        .get_mut(&course_id)
        .and_then(|view| view.assignments.as_mut())
    {
        grid.note_submitted();
    }
    Ok(json!({ "submitted": true }))
}

async fn open_colloquiums(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let course_id = required_str(params, "courseId")?;
    let gw = Arc::clone(&state.gateway);
    let records = resources::list_colloquiums(gw.as_ref(), &course_id).await?;
    let board = ColloquiumBoard::from_records(&course_id, &records);
    let cells = board.cells_json();
    upsert_view(state, &course_id).colloquiums = Some(board);
    Ok(json!({ "cells": cells }))
}

async fn set_colloquium(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let course_id = required_str(params, "courseId")?;
    let student_id = required_str(params, "studentId")?;
    let slot = required_usize(params, "slot")?;
    let grade = nullable_grade(params, "grade")?;

    let gw = Arc::clone(&state.gateway);
    let Some(board) = state
        .grade_views
        .get_mut(&course_id)
        .and_then(|view| view.colloquiums.as_mut())
    else {
        return Err(HandlerErr::new("no_view", "open the colloquium board first"));
    };

    let ticket = board
        .apply_edit(&student_id, slot, grade)
        .map_err(HandlerErr::bad_params)?;
    let outcome = grades::commit_colloquium_edit(gw.as_ref(), board, ticket).await;
    let cells = board.cells_json();

    match outcome {
        Ok(()) => Ok(json!({ "cells": cells })),
        // The board was still re-synced; hand the authoritative cells back
        // alongside the error.
        Err(e) => Err(HandlerErr::from(e).with_details(json!({ "cells": cells }))),
    }
}

async fn open_seminars(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let course_id = required_str(params, "courseId")?;
    let gw = Arc::clone(&state.gateway);
    let records = resources::list_seminars(gw.as_ref(), &course_id).await?;
    Ok(json!({ "records": records }))
}

async fn set_seminar(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let course_id = required_str(params, "courseId")?;
    let record_id = required_str(params, "recordId")?;
    let present = required_bool(params, "present")?;
    let grade = optional_grade(params, "grade")?;
    if let Some(g) = grade {
        check_grade(g).map_err(HandlerErr::bad_params)?;
    }

    let gw = Arc::clone(&state.gateway);
    let outcome = resources::update_seminar(gw.as_ref(), &record_id, present, grade).await;
    if let Err(e) = &outcome {
        log::warn!("seminar update failed for {}: {}; re-syncing", record_id, e);
    }

    // Authoritative state comes back regardless of how the mutation went.
    let records = resources::list_seminars(gw.as_ref(), &course_id).await;
    match (outcome, records) {
        (Ok(()), Ok(records)) => Ok(json!({ "records": records })),
        (Ok(()), Err(fetch_err)) => Err(HandlerErr::from(fetch_err)),
        (Err(e), Ok(records)) => {
            Err(HandlerErr::from(e).with_details(json!({ "records": records })))
        }
        (Err(e), Err(fetch_err)) => {
            log::warn!("re-sync fetch also failed: {}", fetch_err);
            Err(HandlerErr::from(e))
        }
    }
}

fn close(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let course_id = required_str(params, "courseId")?;
    state.grade_views.remove(&course_id);
    Ok(json!({ "closed": true }))
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let out = match req.method.as_str() {
        "grades.openAssignments" => open_assignments(state, &req.params).await,
        "grades.cycleAssignment" => cycle_assignment(state, &req.params),
        "grades.submitAssignments" => submit_assignments(state, &req.params).await,
        "grades.openColloquiums" => open_colloquiums(state, &req.params).await,
        "grades.setColloquium" => set_colloquium(state, &req.params).await,
        "grades.openSeminars" => open_seminars(state, &req.params).await,
        "grades.setSeminar" => set_seminar(state, &req.params).await,
        "grades.close" => close(state, &req.params),
        _ => return None,
    };
    Some(match out {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    })
}
