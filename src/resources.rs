use chrono::Utc;
use serde_json::{json, Value};

use crate::gateway::{ApiError, ApiGateway};
use crate::grades::{AssignmentRecord, ColloquiumRecord, SeminarRecord};
use crate::models::{
    Course, Department, Group, Room, ScheduleEntry, Specialization, Student, TeacherRecord,
};
use crate::normalize::{self, ENTITY_KEYS};

/// List pagination. Every list endpoint takes `page` and `pageSize`.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 50,
        }
    }
}

impl Page {
    pub fn query(self) -> Vec<(String, String)> {
        vec![
            ("page".to_string(), self.page.to_string()),
            ("pageSize".to_string(), self.page_size.to_string()),
        ]
    }
}

async fn fetch_page<T: serde::de::DeserializeOwned>(
    gw: &dyn ApiGateway,
    path: &str,
    page: Page,
    extra: &[(&str, &str)],
) -> Result<Vec<T>, ApiError> {
    let mut query = page.query();
    for (key, value) in extra {
        query.push((key.to_string(), value.to_string()));
    }
    normalize::parse_list(gw.get_json(path, &query).await?)
}

async fn create_entity<T: serde::de::DeserializeOwned>(
    gw: &dyn ApiGateway,
    path: &str,
    body: &Value,
) -> Result<T, ApiError> {
    normalize::parse_entity(gw.post_json(path, body.clone()).await?, &ENTITY_KEYS)
}

async fn update_entity<T: serde::de::DeserializeOwned>(
    gw: &dyn ApiGateway,
    path: &str,
    body: &Value,
) -> Result<T, ApiError> {
    normalize::parse_entity(gw.put_json(path, body.clone()).await?, &ENTITY_KEYS)
}

// ---- rooms ----

pub async fn list_rooms(gw: &dyn ApiGateway, page: Page) -> Result<Vec<Room>, ApiError> {
    fetch_page(gw, "/api/rooms", page, &[]).await
}

pub async fn search_rooms(gw: &dyn ApiGateway, q: &str, page: Page) -> Result<Vec<Room>, ApiError> {
    fetch_page(gw, "/api/rooms/search", page, &[("q", q)]).await
}

pub async fn create_room(gw: &dyn ApiGateway, body: &Value) -> Result<Room, ApiError> {
    create_entity(gw, "/api/rooms", body).await
}

pub async fn update_room(gw: &dyn ApiGateway, id: &str, body: &Value) -> Result<Room, ApiError> {
    update_entity(gw, &format!("/api/rooms/{}", id), body).await
}

pub async fn delete_room(gw: &dyn ApiGateway, id: &str) -> Result<(), ApiError> {
    gw.delete(&format!("/api/rooms/{}", id)).await
}

// ---- groups ----

pub async fn list_groups(gw: &dyn ApiGateway, page: Page) -> Result<Vec<Group>, ApiError> {
    fetch_page(gw, "/api/groups", page, &[]).await
}

pub async fn search_groups(
    gw: &dyn ApiGateway,
    q: &str,
    page: Page,
) -> Result<Vec<Group>, ApiError> {
    fetch_page(gw, "/api/groups/search", page, &[("q", q)]).await
}

pub async fn create_group(gw: &dyn ApiGateway, body: &Value) -> Result<Group, ApiError> {
    create_entity(gw, "/api/groups", body).await
}

pub async fn update_group(gw: &dyn ApiGateway, id: &str, body: &Value) -> Result<Group, ApiError> {
    update_entity(gw, &format!("/api/groups/{}", id), body).await
}

pub async fn delete_group(gw: &dyn ApiGateway, id: &str) -> Result<(), ApiError> {
    gw.delete(&format!("/api/groups/{}", id)).await
}

// ---- students ----

pub async fn list_students(gw: &dyn ApiGateway, page: Page) -> Result<Vec<Student>, ApiError> {
    fetch_page(gw, "/api/students", page, &[]).await
}

pub async fn list_students_in_group(
    gw: &dyn ApiGateway,
    group_id: &str,
    page: Page,
) -> Result<Vec<Student>, ApiError> {
    fetch_page(gw, "/api/students", page, &[("groupId", group_id)]).await
}

pub async fn search_students(
    gw: &dyn ApiGateway,
    q: &str,
    page: Page,
) -> Result<Vec<Student>, ApiError> {
    fetch_page(gw, "/api/students/search", page, &[("q", q)]).await
}

pub async fn create_student(gw: &dyn ApiGateway, body: &Value) -> Result<Student, ApiError> {
    create_entity(gw, "/api/students", body).await
}

pub async fn update_student(
    gw: &dyn ApiGateway,
    id: &str,
    body: &Value,
) -> Result<Student, ApiError> {
    update_entity(gw, &format!("/api/students/{}", id), body).await
}

pub async fn delete_student(gw: &dyn ApiGateway, id: &str) -> Result<(), ApiError> {
    gw.delete(&format!("/api/students/{}", id)).await
}

// ---- teachers ----

pub async fn list_teachers(
    gw: &dyn ApiGateway,
    page: Page,
) -> Result<Vec<TeacherRecord>, ApiError> {
    fetch_page(gw, "/api/teachers", page, &[]).await
}

pub async fn search_teachers(
    gw: &dyn ApiGateway,
    q: &str,
    page: Page,
) -> Result<Vec<TeacherRecord>, ApiError> {
    fetch_page(gw, "/api/teachers/search", page, &[("q", q)]).await
}

pub async fn create_teacher(gw: &dyn ApiGateway, body: &Value) -> Result<TeacherRecord, ApiError> {
    create_entity(gw, "/api/teachers", body).await
}

pub async fn update_teacher(
    gw: &dyn ApiGateway,
    id: &str,
    body: &Value,
) -> Result<TeacherRecord, ApiError> {
    update_entity(gw, &format!("/api/teachers/{}", id), body).await
}

pub async fn delete_teacher(gw: &dyn ApiGateway, id: &str) -> Result<(), ApiError> {
    gw.delete(&format!("/api/teachers/{}", id)).await
}

// ---- departments / specializations ----

pub async fn list_departments(gw: &dyn ApiGateway) -> Result<Vec<Department>, ApiError> {
    normalize::parse_list(gw.get_json("/api/departments", &[]).await?)
}

pub async fn list_specializations(
    gw: &dyn ApiGateway,
    department_id: Option<&str>,
) -> Result<Vec<Specialization>, ApiError> {
    let query: Vec<(String, String)> = department_id
        .map(|id| vec![("departmentId".to_string(), id.to_string())])
        .unwrap_or_default();
    normalize::parse_list(gw.get_json("/api/specializations", &query).await?)
}

// ---- taught subjects ----

pub async fn list_courses(gw: &dyn ApiGateway, page: Page) -> Result<Vec<Course>, ApiError> {
    fetch_page(gw, "/api/taught-subjects", page, &[]).await
}

pub async fn list_courses_for_teacher(
    gw: &dyn ApiGateway,
    teacher_id: &str,
    page: Page,
) -> Result<Vec<Course>, ApiError> {
    fetch_page(gw, "/api/taught-subjects", page, &[("teacherId", teacher_id)]).await
}

pub async fn list_courses_for_group(
    gw: &dyn ApiGateway,
    group_id: &str,
    page: Page,
) -> Result<Vec<Course>, ApiError> {
    fetch_page(gw, "/api/taught-subjects", page, &[("groupId", group_id)]).await
}

pub async fn create_course(gw: &dyn ApiGateway, body: &Value) -> Result<Course, ApiError> {
    create_entity(gw, "/api/taught-subjects", body).await
}

pub async fn update_course(gw: &dyn ApiGateway, id: &str, body: &Value) -> Result<Course, ApiError> {
    update_entity(gw, &format!("/api/taught-subjects/{}", id), body).await
}

pub async fn delete_course(gw: &dyn ApiGateway, id: &str) -> Result<(), ApiError> {
    gw.delete(&format!("/api/taught-subjects/{}", id)).await
}

// ---- schedule ----

/// `scope` is the timetable axis: a group code, a teacher id, or a room id.
pub async fn schedule_for(
    gw: &dyn ApiGateway,
    scope: &str,
    key: &str,
) -> Result<Vec<ScheduleEntry>, ApiError> {
    let query = vec![(scope.to_string(), key.to_string())];
    normalize::parse_list(gw.get_json("/api/schedule", &query).await?)
}

pub async fn create_schedule_entry(
    gw: &dyn ApiGateway,
    body: &Value,
) -> Result<ScheduleEntry, ApiError> {
    create_entity(gw, "/api/schedule", body).await
}

pub async fn update_schedule_entry(
    gw: &dyn ApiGateway,
    id: &str,
    body: &Value,
) -> Result<ScheduleEntry, ApiError> {
    update_entity(gw, &format!("/api/schedule/{}", id), body).await
}

pub async fn delete_schedule_entry(gw: &dyn ApiGateway, id: &str) -> Result<(), ApiError> {
    gw.delete(&format!("/api/schedule/{}", id)).await
}

// ---- colloquiums ----

pub async fn list_colloquiums(
    gw: &dyn ApiGateway,
    course_id: &str,
) -> Result<Vec<ColloquiumRecord>, ApiError> {
    let query = vec![("courseId".to_string(), course_id.to_string())];
    normalize::parse_list(gw.get_json("/api/colloquiums", &query).await?)
}

pub async fn create_colloquium(
    gw: &dyn ApiGateway,
    course_id: &str,
    student_id: &str,
    grade: u8,
) -> Result<Value, ApiError> {
    gw.post_json(
        "/api/colloquiums",
        json!({
            "studentId": student_id,
            "courseId": course_id,
            "date": Utc::now(),
            "grade": grade,
        }),
    )
    .await
}

pub async fn update_colloquium(
    gw: &dyn ApiGateway,
    record_id: &str,
    grade: u8,
) -> Result<(), ApiError> {
    gw.put_json(
        &format!("/api/colloquiums/{}", record_id),
        json!({ "grade": grade }),
    )
    .await
    .map(|_| ())
}

pub async fn delete_colloquium(gw: &dyn ApiGateway, record_id: &str) -> Result<(), ApiError> {
    gw.delete(&format!("/api/colloquiums/{}", record_id)).await
}

// ---- seminars ----

pub async fn list_seminars(
    gw: &dyn ApiGateway,
    course_id: &str,
) -> Result<Vec<SeminarRecord>, ApiError> {
    let query = vec![("courseId".to_string(), course_id.to_string())];
    normalize::parse_list(gw.get_json("/api/seminars", &query).await?)
}

pub async fn update_seminar(
    gw: &dyn ApiGateway,
    record_id: &str,
    present: bool,
    grade: Option<u8>,
) -> Result<(), ApiError> {
    gw.put_json(
        &format!("/api/seminars/{}", record_id),
        json!({ "present": present, "grade": grade }),
    )
    .await
    .map(|_| ())
}

// ---- assignment grid ----

pub async fn fetch_assignments(
    gw: &dyn ApiGateway,
    course_id: &str,
) -> Result<Vec<AssignmentRecord>, ApiError> {
    normalize::parse_list(
        gw.get_json(
            &format!("/api/taught-subjects/{}/assignments", course_id),
            &[],
        )
        .await?,
    )
}

/// One request for the whole grid; per-cell edits never hit the network.
pub async fn submit_assignments(
    gw: &dyn ApiGateway,
    course_id: &str,
    payload: Value,
) -> Result<(), ApiError> {
    gw.post_json(
        &format!("/api/taught-subjects/{}/assignments/bulk", course_id),
        payload,
    )
    .await
    .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fake::FakeGateway;
    use crate::gateway::HttpMethod;
    use serde_json::json;

    #[tokio::test]
    async fn room_listing_unwraps_nested_envelopes() {
        let gw = FakeGateway::new();
        gw.enqueue_json(
            HttpMethod::Get,
            "/api/rooms",
            json!({"data": {"items": [
                {"id": 1, "name": "A-101", "type": 1},
                {"id": 2, "name": "Lab 3", "type": "laboratory"},
            ]}}),
        );

        let rooms = list_rooms(&gw, Page { page: 1, page_size: 100 })
            .await
            .expect("list rooms");
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].id, "1");
        assert_eq!(rooms[1].kind, crate::models::RoomKind::Laboratory);
    }

    #[tokio::test]
    async fn bare_array_listing_also_parses() {
        let gw = FakeGateway::new();
        gw.enqueue_json(
            HttpMethod::Get,
            "/api/groups",
            json!([{"id": "g1", "code": "CS-31"}]),
        );
        let groups = list_groups(&gw, Page::default()).await.expect("list");
        assert_eq!(groups[0].code, "CS-31");
    }

    #[tokio::test]
    async fn created_entity_is_unwrapped_and_typed() {
        let gw = FakeGateway::new();
        gw.enqueue_json(
            HttpMethod::Post,
            "/api/rooms",
            json!({"data": {"id": 7, "name": "B-2", "type": 2}}),
        );
        let room = create_room(&gw, &json!({"name": "B-2", "type": 2}))
            .await
            .expect("create");
        assert_eq!(room.id, "7");
        assert_eq!(room.kind, crate::models::RoomKind::Classroom);
    }

    #[tokio::test]
    async fn malformed_record_surfaces_a_parse_error() {
        let gw = FakeGateway::new();
        gw.enqueue_json(
            HttpMethod::Get,
            "/api/rooms",
            json!({"items": [{"name": 42}]}),
        );
        assert!(matches!(
            list_rooms(&gw, Page::default()).await,
            Err(ApiError::Parse(_))
        ));
    }
}
