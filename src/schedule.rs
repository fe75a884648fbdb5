use serde::Serialize;

use crate::models::ScheduleEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictReason {
    Room,
    Teacher,
    Group,
}

impl ConflictReason {
    pub fn describe(self) -> &'static str {
        match self {
            Self::Room => "room is already booked",
            Self::Teacher => "teacher is already scheduled",
            Self::Group => "group is already scheduled",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub reason: ConflictReason,
    pub conflicting_entry: ScheduleEntry,
}

/// Minutes since midnight for a `HH:MM` 24-hour string.
pub fn parse_time(raw: &str) -> Option<u16> {
    let (h, m) = raw.trim().split_once(':')?;
    let hours: u16 = h.parse().ok()?;
    let minutes: u16 = m.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

fn interval(entry: &ScheduleEntry) -> Option<(u16, u16)> {
    Some((parse_time(&entry.start_time)?, parse_time(&entry.end_time)?))
}

/// Validates the candidate's own fields before it is allowed anywhere near
/// the conflict check or the wire.
pub fn validate_entry(entry: &ScheduleEntry) -> Result<(), String> {
    if !(1..=7).contains(&entry.day_of_week) {
        return Err(format!("dayOfWeek must be 1..=7, got {}", entry.day_of_week));
    }
    let Some(start) = parse_time(&entry.start_time) else {
        return Err(format!("startTime is not HH:MM: {:?}", entry.start_time));
    };
    let Some(end) = parse_time(&entry.end_time) else {
        return Err(format!("endTime is not HH:MM: {:?}", entry.end_time));
    };
    if start >= end {
        return Err("startTime must be before endTime".to_string());
    }
    Ok(())
}

/// Conflicts between a candidate entry and the currently known set.
///
/// Entries on other days never conflict. Overlap is half-open
/// (`[start, end)`), so back-to-back slots touch without conflicting, and a
/// zero-length interval conflicts with nothing. Each overlapping entry is
/// tested independently for the three conflict classes, so one entry can
/// contribute up to three reasons. The check runs against the locally loaded
/// set only; it is advisory and cannot see what another client is saving.
pub fn find_conflicts(
    candidate: &ScheduleEntry,
    existing: &[ScheduleEntry],
    exclude_id: Option<&str>,
) -> Vec<Conflict> {
    let Some((start, end)) = interval(candidate) else {
        return Vec::new();
    };
    if start == end {
        return Vec::new();
    }

    let mut conflicts = Vec::new();
    for other in existing {
        if exclude_id.is_some_and(|id| id == other.id) {
            continue;
        }
        if other.day_of_week != candidate.day_of_week {
            continue;
        }
        let Some((other_start, other_end)) = interval(other) else {
            continue;
        };
        if other_start == other_end {
            continue;
        }
        if !(start < other_end && end > other_start) {
            continue;
        }

        if !candidate.room_id.is_empty() && candidate.room_id == other.room_id {
            conflicts.push(Conflict {
                reason: ConflictReason::Room,
                conflicting_entry: other.clone(),
            });
        }
        if !candidate.teacher_name.is_empty() && candidate.teacher_name == other.teacher_name {
            conflicts.push(Conflict {
                reason: ConflictReason::Teacher,
                conflicting_entry: other.clone(),
            });
        }
        if !candidate.group_code.is_empty() && candidate.group_code == other.group_code {
            conflicts.push(Conflict {
                reason: ConflictReason::Group,
                conflicting_entry: other.clone(),
            });
        }
    }
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, day: u8, start: &str, end: &str) -> ScheduleEntry {
        ScheduleEntry {
            id: id.to_string(),
            course_id: "c1".to_string(),
            course_name: "Algebra".to_string(),
            course_code: "ALG".to_string(),
            teacher_name: "M. Ionescu".to_string(),
            room_id: "r1".to_string(),
            room_name: "A-101".to_string(),
            group_code: "CS-11".to_string(),
            day_of_week: day,
            start_time: start.to_string(),
            end_time: end.to_string(),
            kind: "lecture".to_string(),
        }
    }

    #[test]
    fn parse_time_accepts_24h_clock() {
        assert_eq!(parse_time("09:00"), Some(540));
        assert_eq!(parse_time("23:59"), Some(1439));
        assert_eq!(parse_time(" 8:05 "), Some(485));
        assert_eq!(parse_time("24:00"), None);
        assert_eq!(parse_time("09:60"), None);
        assert_eq!(parse_time("0900"), None);
    }

    #[test]
    fn overlapping_same_room_is_one_room_conflict() {
        let mut candidate = entry("new", 1, "09:00", "10:30");
        candidate.teacher_name = "Other T".to_string();
        candidate.group_code = "CS-12".to_string();
        let existing = vec![entry("a", 1, "10:00", "11:00")];

        let conflicts = find_conflicts(&candidate, &existing, None);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].reason, ConflictReason::Room);
        assert_eq!(conflicts[0].conflicting_entry.id, "a");
    }

    #[test]
    fn touching_intervals_do_not_conflict() {
        let candidate = entry("new", 1, "09:00", "10:00");
        let existing = vec![entry("a", 1, "10:00", "11:00")];
        assert!(find_conflicts(&candidate, &existing, None).is_empty());
    }

    #[test]
    fn different_days_never_conflict() {
        let candidate = entry("new", 2, "09:00", "10:30");
        let existing = vec![entry("a", 1, "10:00", "11:00")];
        assert!(find_conflicts(&candidate, &existing, None).is_empty());
    }

    #[test]
    fn one_entry_can_carry_multiple_reasons() {
        // Same room, same teacher, same group, overlapping: three reasons
        // from a single existing entry.
        let candidate = entry("new", 1, "09:30", "10:30");
        let existing = vec![entry("a", 1, "09:00", "10:00")];

        let reasons: Vec<ConflictReason> = find_conflicts(&candidate, &existing, None)
            .into_iter()
            .map(|c| c.reason)
            .collect();
        assert_eq!(
            reasons,
            vec![ConflictReason::Room, ConflictReason::Teacher, ConflictReason::Group]
        );
    }

    #[test]
    fn edited_entry_is_excluded_by_identity() {
        let candidate = entry("a", 1, "09:00", "10:30");
        let existing = vec![entry("a", 1, "09:00", "10:30")];
        assert!(find_conflicts(&candidate, &existing, Some("a")).is_empty());
        assert!(!find_conflicts(&candidate, &existing, None).is_empty());
    }

    #[test]
    fn zero_length_intervals_never_overlap() {
        let candidate = entry("new", 1, "10:00", "10:00");
        let existing = vec![entry("a", 1, "09:00", "11:00")];
        assert!(find_conflicts(&candidate, &existing, None).is_empty());

        let candidate = entry("new", 1, "09:00", "11:00");
        let existing = vec![entry("a", 1, "10:00", "10:00")];
        assert!(find_conflicts(&candidate, &existing, None).is_empty());
    }

    #[test]
    fn validate_entry_rejects_inverted_and_malformed_times() {
        let mut e = entry("x", 1, "09:00", "10:00");
        assert!(validate_entry(&e).is_ok());

        e.start_time = "10:00".to_string();
        assert!(validate_entry(&e).is_err());

        e.start_time = "late".to_string();
        assert!(validate_entry(&e).is_err());

        let e = entry("x", 0, "09:00", "10:00");
        assert!(validate_entry(&e).is_err());
    }

    #[test]
    fn different_room_teacher_group_overlap_is_clean() {
        let mut candidate = entry("new", 1, "09:00", "10:30");
        candidate.room_id = "r9".to_string();
        candidate.teacher_name = "Someone Else".to_string();
        candidate.group_code = "EE-21".to_string();
        let existing = vec![entry("a", 1, "09:00", "10:30")];
        assert!(find_conflicts(&candidate, &existing, None).is_empty());
    }
}
