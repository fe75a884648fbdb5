use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Field-level tolerance helpers. Ids and codes arrive as strings from some
/// endpoints and as numbers from others; everything is normalized to strings
/// on the way in.
pub mod wire {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn id<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Null => Ok(String::new()),
            other => Err(serde::de::Error::custom(format!(
                "expected string or number id, got {}",
                other
            ))),
        }
    }
}

/// Closed room classification. The backend serves it either as a numeric code
/// or as free text; both map onto the same five buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoomKind {
    LectureHall,
    Classroom,
    Laboratory,
    SeminarRoom,
    #[default]
    Other,
}

impl RoomKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::LectureHall => "Lecture Hall",
            Self::Classroom => "Classroom",
            Self::Laboratory => "Laboratory",
            Self::SeminarRoom => "Seminar Room",
            Self::Other => "Other",
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::LectureHall,
            2 => Self::Classroom,
            3 => Self::Laboratory,
            4 => Self::SeminarRoom,
            _ => Self::Other,
        }
    }

    pub fn from_text(text: &str) -> Self {
        let lower = text.trim().to_ascii_lowercase();
        if lower.contains("lecture") || lower.contains("hall") || lower.contains("amphi") {
            Self::LectureHall
        } else if lower.contains("lab") {
            Self::Laboratory
        } else if lower.contains("seminar") {
            Self::SeminarRoom
        } else if lower.contains("class") {
            Self::Classroom
        } else {
            Self::Other
        }
    }
}

impl Serialize for RoomKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for RoomKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Number(n) => Ok(Self::from_code(n.as_i64().unwrap_or(-1))),
            serde_json::Value::String(s) => Ok(Self::from_text(&s)),
            _ => Ok(Self::Other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub building: String,
    #[serde(default)]
    pub capacity: u32,
    #[serde(rename = "type", default)]
    pub kind: RoomKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    pub code: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub year: u32,
    #[serde(default)]
    pub student_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    #[serde(default)]
    pub student_id: String,
    #[serde(alias = "fullName")]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(deserialize_with = "wire::id", default)]
    pub group_id: String,
    #[serde(default)]
    pub group_code: String,
    #[serde(default)]
    pub year: u32,
    #[serde(default)]
    pub specialization: String,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherRecord {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    #[serde(alias = "fullName")]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specialization {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub years: u32,
}

/// A taught subject: one course as one teacher delivers it to one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    #[serde(default)]
    pub code: String,
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default)]
    pub credits: u32,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub department: String,
    #[serde(deserialize_with = "wire::id", default)]
    pub teacher_id: String,
    #[serde(default)]
    pub teacher_name: String,
    #[serde(deserialize_with = "wire::id", default)]
    pub group_id: String,
    #[serde(default)]
    pub group_code: String,
    #[serde(default)]
    pub student_count: u32,
    #[serde(default)]
    pub has_syllabus: bool,
}

/// One timetable cell. Times are `HH:MM`; `day_of_week` is 1 (Monday)
/// through 7 (Sunday). Teacher and group identity ride along from the
/// course so the conflict check does not need a second lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    // Drafts arrive without an id; the server assigns one.
    #[serde(deserialize_with = "wire::id", default)]
    pub id: String,
    #[serde(deserialize_with = "wire::id", default)]
    pub course_id: String,
    #[serde(default)]
    pub course_name: String,
    #[serde(default)]
    pub course_code: String,
    #[serde(default)]
    pub teacher_name: String,
    #[serde(deserialize_with = "wire::id", default)]
    pub room_id: String,
    #[serde(default)]
    pub room_name: String,
    #[serde(default)]
    pub group_code: String,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn room_kind_from_code_and_text() {
        assert_eq!(RoomKind::from_code(1), RoomKind::LectureHall);
        assert_eq!(RoomKind::from_code(4), RoomKind::SeminarRoom);
        assert_eq!(RoomKind::from_code(99), RoomKind::Other);
        assert_eq!(RoomKind::from_text("Computer Laboratory"), RoomKind::Laboratory);
        assert_eq!(RoomKind::from_text("lecture hall B"), RoomKind::LectureHall);
        assert_eq!(RoomKind::from_text("Storage"), RoomKind::Other);
    }

    #[test]
    fn room_accepts_numeric_id_and_coded_kind() {
        let room: Room = serde_json::from_value(json!({
            "id": 12,
            "name": "A-201",
            "building": "A",
            "capacity": 90,
            "type": 1
        }))
        .expect("parse room");
        assert_eq!(room.id, "12");
        assert_eq!(room.kind, RoomKind::LectureHall);
    }

    #[test]
    fn room_kind_defaults_when_absent() {
        let room: Room = serde_json::from_value(json!({"id": "r1", "name": "B-10"}))
            .expect("parse room");
        assert_eq!(room.kind, RoomKind::Other);
        assert_eq!(room.capacity, 0);
    }

    #[test]
    fn schedule_entry_roundtrips_camel_case() {
        let entry: ScheduleEntry = serde_json::from_value(json!({
            "id": "se1",
            "courseId": "c9",
            "courseName": "Operating Systems",
            "courseCode": "OS",
            "teacherName": "I. Popescu",
            "roomId": 7,
            "roomName": "Lab 3",
            "groupCode": "CS-31",
            "dayOfWeek": 2,
            "startTime": "09:00",
            "endTime": "10:30",
            "type": "lecture"
        }))
        .expect("parse entry");
        assert_eq!(entry.room_id, "7");
        let back = serde_json::to_value(&entry).expect("serialize entry");
        assert_eq!(back["dayOfWeek"], 2);
        assert_eq!(back["type"], "lecture");
        assert_eq!(back["startTime"], "09:00");
    }
}
