use std::sync::Arc;

use serde_json::{json, Value};

use crate::gateway::ApiGateway;
use crate::ipc::error::ok;
use crate::ipc::helpers::{optional_str, required_object, required_str, HandlerErr};
use crate::ipc::types::{AppState, Request, ScheduleView};
use crate::models::ScheduleEntry;
use crate::resources;
use crate::schedule::{find_conflicts, validate_entry, Conflict};

const SCOPES: [&str; 3] = ["group", "teacher", "room"];

fn view_key(scope: &str, key: &str) -> String {
    format!("{}:{}", scope, key)
}

fn scope_of(params: &Value) -> Result<(String, String), HandlerErr> {
    let scope = required_str(params, "scope")?;
    if !SCOPES.contains(&scope.as_str()) {
        return Err(HandlerErr::bad_params(format!(
            "scope must be one of group, teacher, room; got {}",
            scope
        )));
    }
    let key = required_str(params, "key")?;
    Ok((scope, key))
}

fn parse_candidate(params: &Value) -> Result<(ScheduleEntry, Value), HandlerErr> {
    let body = required_object(params, "entry")?;
    let entry: ScheduleEntry = serde_json::from_value(body.clone())
        .map_err(|e| HandlerErr::bad_params(format!("entry: {}", e)))?;
    validate_entry(&entry).map_err(HandlerErr::bad_params)?;
    Ok((entry, body))
}

fn conflict_details(conflicts: &[Conflict]) -> Value {
    let listed: Vec<Value> = conflicts
        .iter()
        .map(|c| {
            json!({
                "reason": c.reason,
                "message": c.reason.describe(),
                "conflictingEntry": c.conflicting_entry,
            })
        })
        .collect();
    json!({ "conflicts": listed })
}

/// Re-fetches the timetable after a mutation. The result only lands in the
/// cache if the view is still the same load it was when the mutation began.
async fn refresh_view(
    state: &mut AppState,
    gw: &dyn ApiGateway,
    scope: &str,
    key: &str,
    epoch: u64,
) -> Result<Vec<ScheduleEntry>, HandlerErr> {
    let entries = resources::schedule_for(gw, scope, key).await?;
    match state.schedule_views.get_mut(&view_key(scope, key)) {
        Some(view) if view.epoch == epoch => view.entries = entries.clone(),
        _ => log::debug!(
            "schedule view {}:{} was closed during refresh; result dropped",
            scope,
            key
        ),
    }
    Ok(entries)
}

async fn open(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let (scope, key) = scope_of(params)?;
    let gw = Arc::clone(&state.gateway);
    let entries = resources::schedule_for(gw.as_ref(), &scope, &key).await?;
    let epoch = state.next_epoch();
    state.schedule_views.insert(
        view_key(&scope, &key),
        ScheduleView {
            scope: scope.clone(),
            key: key.clone(),
            entries: entries.clone(),
            epoch,
        },
    );
    Ok(json!({ "entries": entries }))
}

fn close(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let (scope, key) = scope_of(params)?;
    state.schedule_views.remove(&view_key(&scope, &key));
    Ok(json!({ "closed": true }))
}

/// Advisory pre-save validation, so the host can flag conflicts while the
/// form is still being edited.
fn check_conflicts(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let (scope, key) = scope_of(params)?;
    let (candidate, _) = parse_candidate(params)?;
    let exclude = optional_str(params, "excludeId");
    let Some(view) = state.schedule_views.get(&view_key(&scope, &key)) else {
        return Err(HandlerErr::new("no_view", "open the schedule first"));
    };
    let conflicts = find_conflicts(&candidate, &view.entries, exclude.as_deref());
    Ok(conflict_details(&conflicts))
}

async fn create(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let (scope, key) = scope_of(params)?;
    let (candidate, body) = parse_candidate(params)?;
    let Some(view) = state.schedule_views.get(&view_key(&scope, &key)) else {
        return Err(HandlerErr::new("no_view", "open the schedule first"));
    };

    // Local rejection happens before any network call.
    let conflicts = find_conflicts(&candidate, &view.entries, None);
    if !conflicts.is_empty() {
        return Err(
            HandlerErr::new("schedule_conflict", "entry conflicts with the loaded timetable")
                .with_details(conflict_details(&conflicts)),
        );
    }

    let epoch = view.epoch;
    let gw = Arc::clone(&state.gateway);
    let created = resources::create_schedule_entry(gw.as_ref(), &body).await?;
    let entries = refresh_view(state, gw.as_ref(), &scope, &key, epoch).await?;
    Ok(json!({ "entry": created, "entries": entries }))
}

async fn update(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let (scope, key) = scope_of(params)?;
    let entry_id = required_str(params, "entryId")?;
    let (candidate, body) = parse_candidate(params)?;
    let Some(view) = state.schedule_views.get(&view_key(&scope, &key)) else {
        return Err(HandlerErr::new("no_view", "open the schedule first"));
    };

    let conflicts = find_conflicts(&candidate, &view.entries, Some(entry_id.as_str()));
    if !conflicts.is_empty() {
        return Err(
            HandlerErr::new("schedule_conflict", "entry conflicts with the loaded timetable")
                .with_details(conflict_details(&conflicts)),
        );
    }

    let epoch = view.epoch;
    let gw = Arc::clone(&state.gateway);
    let updated = resources::update_schedule_entry(gw.as_ref(), &entry_id, &body).await?;
    let entries = refresh_view(state, gw.as_ref(), &scope, &key, epoch).await?;
    Ok(json!({ "entry": updated, "entries": entries }))
}

async fn delete(state: &mut AppState, params: &Value) -> Result<Value, HandlerErr> {
    let (scope, key) = scope_of(params)?;
    let entry_id = required_str(params, "entryId")?;
    let epoch = state
        .schedule_views
        .get(&view_key(&scope, &key))
        .map(|view| view.epoch);

    let gw = Arc::clone(&state.gateway);
    resources::delete_schedule_entry(gw.as_ref(), &entry_id).await?;

    let entries = match epoch {
        Some(epoch) => refresh_view(state, gw.as_ref(), &scope, &key, epoch).await?,
        None => Vec::new(),
    };
    Ok(json!({ "deleted": true, "entries": entries }))
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let out = match req.method.as_str() {
        "schedule.open" => open(state, &req.params).await,
        "schedule.close" => close(state, &req.params),
        "schedule.checkConflicts" => check_conflicts(state, &req.params),
        "schedule.create" => create(state, &req.params).await,
        "schedule.update" => update(state, &req.params).await,
        "schedule.delete" => delete(state, &req.params).await,
        _ => return None,
    };
    Some(match out {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    })
}
