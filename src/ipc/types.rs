use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::auth::ActiveSession;
use crate::config::AppConfig;
use crate::gateway::ApiGateway;
use crate::grades::{AssignmentGrid, ColloquiumBoard};
use crate::models::ScheduleEntry;
use crate::session::SessionStore;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// One loaded timetable. The epoch identifies this particular load; a
/// refresh computed for an older load (the view was closed or reopened
/// while the request ran) is discarded instead of applied.
pub struct ScheduleView {
    pub scope: String,
    pub key: String,
    pub entries: Vec<ScheduleEntry>,
    pub epoch: u64,
}

/// Editing state for one course's grade views.
pub struct GradeView {
    pub assignments: Option<AssignmentGrid>,
    pub colloquiums: Option<ColloquiumBoard>,
    pub epoch: u64,
}

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<SessionStore>,
    pub gateway: Arc<dyn ApiGateway>,
    pub active: Option<ActiveSession>,
    pub schedule_views: HashMap<String, ScheduleView>,
    pub grade_views: HashMap<String, GradeView>,
    epoch_counter: u64,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<SessionStore>, gateway: Arc<dyn ApiGateway>) -> Self {
        Self {
            config,
            store,
            gateway,
            active: None,
            schedule_views: HashMap::new(),
            grade_views: HashMap::new(),
            epoch_counter: 0,
        }
    }

    pub fn next_epoch(&mut self) -> u64 {
        self.epoch_counter += 1;
        self.epoch_counter
    }

    /// Drops everything tied to the signed-in identity.
    pub fn reset_views(&mut self) {
        self.schedule_views.clear();
        self.grade_views.clear();
    }
}
