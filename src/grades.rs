use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::gateway::{ApiError, ApiGateway};
use crate::models::wire;
use crate::resources;

pub const MAX_GRADE: u8 = 10;

pub fn check_grade(grade: u8) -> Result<(), String> {
    if grade > MAX_GRADE {
        return Err(format!("grade must be 0..={}, got {}", MAX_GRADE, grade));
    }
    Ok(())
}

/// Tri-state assignment mark. Repeated toggling cycles through the states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssignmentMark {
    #[default]
    Ungraded,
    Pass,
    Fail,
}

impl AssignmentMark {
    pub fn cycled(self) -> Self {
        match self {
            Self::Ungraded => Self::Pass,
            Self::Pass => Self::Fail,
            Self::Fail => Self::Ungraded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRecord {
    #[serde(deserialize_with = "wire::id")]
    pub student_id: String,
    #[serde(default)]
    pub mark: AssignmentMark,
}

/// The assignment grid for one course. Cell toggles are purely local; the
/// single bulk submit is the only persistence point, carrying the whole grid
/// in one request rather than one request per cell.
pub struct AssignmentGrid {
    pub course_id: String,
    marks: HashMap<String, AssignmentMark>,
    dirty: bool,
}

impl AssignmentGrid {
    pub fn from_records(course_id: &str, records: Vec<AssignmentRecord>) -> Self {
        let marks = records
            .into_iter()
            .map(|r| (r.student_id, r.mark))
            .collect();
        Self {
            course_id: course_id.to_string(),
            marks,
            dirty: false,
        }
    }

    pub fn cycle(&mut self, student_id: &str) -> AssignmentMark {
        let slot = self.marks.entry(student_id.to_string()).or_default();
        *slot = slot.cycled();
        self.dirty = true;
        *slot
    }

    #[allow(dead_code)]
    pub fn mark(&self, student_id: &str) -> AssignmentMark {
        self.marks.get(student_id).copied().unwrap_or_default()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn rows(&self) -> Vec<(String, AssignmentMark)> {
        let mut rows: Vec<_> = self
            .marks
            .iter()
            .map(|(id, mark)| (id.clone(), *mark))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }

    /// The full grid as one request body.
    pub fn submit_payload(&self) -> Value {
        let marks: Vec<Value> = self
            .rows()
            .into_iter()
            .map(|(student_id, mark)| {
                json!({
                    "studentId": student_id,
                    "mark": mark,
                })
            })
            .collect();
        json!({
            "courseId": self.course_id,
            "marks": marks,
        })
    }

    pub fn note_submitted(&mut self) {
        self.dirty = false;
    }
}

/// A graded mini-exam tied to a student and a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColloquiumRecord {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    #[serde(deserialize_with = "wire::id")]
    pub student_id: String,
    #[serde(deserialize_with = "wire::id", default)]
    pub course_id: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    pub grade: u8,
}

/// Attendance plus optional grade for one seminar session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeminarRecord {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    #[serde(deserialize_with = "wire::id")]
    pub student_id: String,
    #[serde(deserialize_with = "wire::id", default)]
    pub course_id: String,
    #[serde(default, alias = "sessionIndex")]
    pub session: u32,
    pub present: bool,
    #[serde(default)]
    pub grade: Option<u8>,
}

type CellKey = (String, usize);

#[derive(Debug, Clone)]
struct Cell {
    seq: u64,
    grade: Option<u8>,
    record_id: Option<String>,
    provisional: bool,
}

/// What a cell edit has to send, derived from the prior record identity.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationPlan {
    /// Clearing a slot that never had a record: nothing to persist.
    Nothing,
    Create {
        student_id: String,
        grade: u8,
        provisional_id: String,
    },
    Update {
        record_id: String,
        grade: u8,
    },
    Delete {
        record_id: String,
    },
}

#[derive(Debug, Clone)]
pub struct EditTicket {
    pub plan: MutationPlan,
    snapshot: HashMap<CellKey, u64>,
}

/// Colloquium scores for one course, editable per (student, slot) cell.
///
/// Edits apply locally first and are pushed to the backend afterwards; the
/// authoritative record set is re-fetched after every push, successful or
/// not, and reconciled back in. Each cell carries an edit sequence so a
/// reconciliation computed for an older edit cannot clobber a newer one.
pub struct ColloquiumBoard {
    pub course_id: String,
    cells: HashMap<CellKey, Cell>,
}

impl ColloquiumBoard {
    pub fn from_records(course_id: &str, records: &[ColloquiumRecord]) -> Self {
        let mut board = Self {
            course_id: course_id.to_string(),
            cells: HashMap::new(),
        };
        for (key, (grade, record_id)) in Self::slots_from_records(records) {
            board.cells.insert(
                key,
                Cell {
                    seq: 0,
                    grade: Some(grade),
                    record_id: Some(record_id),
                    provisional: false,
                },
            );
        }
        board
    }

    /// Slot assignment: a student's records ordered by date (undated last)
    /// become slots 0, 1, 2...
    fn slots_from_records(records: &[ColloquiumRecord]) -> HashMap<CellKey, (u8, String)> {
        let mut per_student: HashMap<&str, Vec<&ColloquiumRecord>> = HashMap::new();
        for record in records {
            per_student
                .entry(record.student_id.as_str())
                .or_default()
                .push(record);
        }
        let mut out = HashMap::new();
        for (student_id, mut list) in per_student {
            list.sort_by(|a, b| match (&a.date, &b.date) {
                (Some(x), Some(y)) => x.cmp(y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => a.id.cmp(&b.id),
            });
            for (slot, record) in list.into_iter().enumerate() {
                out.insert(
                    (student_id.to_string(), slot),
                    (record.grade, record.id.clone()),
                );
            }
        }
        out
    }

    #[allow(dead_code)]
    pub fn grade(&self, student_id: &str, slot: usize) -> Option<u8> {
        self.cells
            .get(&(student_id.to_string(), slot))
            .and_then(|cell| cell.grade)
    }

    #[allow(dead_code)]
    pub fn record_id(&self, student_id: &str, slot: usize) -> Option<String> {
        self.cells
            .get(&(student_id.to_string(), slot))
            .and_then(|cell| cell.record_id.clone())
    }

    /// Applies the new value locally and returns the ticket describing what
    /// to persist. The snapshot inside the ticket is taken after the edit,
    /// so the reconciliation for this very edit passes the fence while any
    /// later edit moves past it.
    pub fn apply_edit(
        &mut self,
        student_id: &str,
        slot: usize,
        grade: Option<u8>,
    ) -> Result<EditTicket, String> {
        if let Some(g) = grade {
            check_grade(g)?;
        }

        let key = (student_id.to_string(), slot);
        let prior = self.cells.get(&key).and_then(|cell| cell.record_id.clone());

        let plan = match (grade, prior) {
            (None, Some(record_id)) => MutationPlan::Delete { record_id },
            (None, None) => MutationPlan::Nothing,
            (Some(g), Some(record_id)) => MutationPlan::Update { record_id, grade: g },
            (Some(g), None) => MutationPlan::Create {
                student_id: student_id.to_string(),
                grade: g,
                provisional_id: format!("pending-{}", Uuid::new_v4()),
            },
        };

        match &plan {
            MutationPlan::Nothing => {
                self.cells.remove(&key);
            }
            _ => {
                let cell = self.cells.entry(key.clone()).or_insert(Cell {
                    seq: 0,
                    grade: None,
                    record_id: None,
                    provisional: false,
                });
                cell.seq += 1;
                cell.grade = grade;
                if let MutationPlan::Create { provisional_id, .. } = &plan {
                    cell.record_id = Some(provisional_id.clone());
                    cell.provisional = true;
                }
            }
        }

        let snapshot = self
            .cells
            .iter()
            .map(|(k, cell)| (k.clone(), cell.seq))
            .collect();
        Ok(EditTicket { plan, snapshot })
    }

    /// Replaces local state with server truth, except for cells edited after
    /// the ticket's snapshot: the server cannot have seen those yet, so the
    /// local value stands until their own reconciliation lands.
    pub fn reconcile(&mut self, records: &[ColloquiumRecord], ticket: &EditTicket) {
        let fresh = Self::slots_from_records(records);
        let mut next: HashMap<CellKey, Cell> = HashMap::new();

        for (key, cell) in self.cells.drain() {
            let fenced_seq = ticket.snapshot.get(&key).copied().unwrap_or(0);
            if cell.seq > fenced_seq {
                next.insert(key, cell);
            }
        }
        for (key, (grade, record_id)) in fresh {
            let seq = ticket.snapshot.get(&key).copied().unwrap_or(0);
            next.entry(key).or_insert(Cell {
                seq,
                grade: Some(grade),
                record_id: Some(record_id),
                provisional: false,
            });
        }

        self.cells = next;
    }

    pub fn cells_json(&self) -> Vec<Value> {
        let mut keys: Vec<&CellKey> = self.cells.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|key| {
                let cell = &self.cells[key];
                json!({
                    "studentId": key.0,
                    "slot": key.1,
                    "grade": cell.grade,
                    "recordId": if cell.provisional { Value::Null } else { json!(cell.record_id) },
                })
            })
            .collect()
    }
}

/// Pushes one cell edit and re-syncs the board from server truth. The
/// re-fetch runs regardless of how the mutation went, so local state cannot
/// silently diverge; a failed mutation still reports its error.
pub async fn commit_colloquium_edit(
    gw: &dyn ApiGateway,
    board: &mut ColloquiumBoard,
    ticket: EditTicket,
) -> Result<(), ApiError> {
    let outcome = match &ticket.plan {
        MutationPlan::Nothing => return Ok(()),
        MutationPlan::Create {
            student_id, grade, ..
        } => resources::create_colloquium(gw, &board.course_id, student_id, *grade)
            .await
            .map(|_| ()),
        MutationPlan::Update { record_id, grade } => {
            resources::update_colloquium(gw, record_id, *grade).await
        }
        MutationPlan::Delete { record_id } => resources::delete_colloquium(gw, record_id).await,
    };

    if let Err(e) = &outcome {
        log::warn!(
            "colloquium mutation failed for course {}: {}; re-syncing",
            board.course_id,
            e
        );
    }

    match resources::list_colloquiums(gw, &board.course_id).await {
        Ok(records) => {
            board.reconcile(&records, &ticket);
            outcome
        }
        Err(fetch_err) => match outcome {
            Ok(()) => Err(fetch_err),
            Err(e) => {
                log::warn!("re-sync fetch also failed: {}", fetch_err);
                Err(e)
            }
        },
    }
}
