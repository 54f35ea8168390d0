use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use utoipa::ToSchema;

use super::day_key::{AttendanceByDay, day_key};

pub const UNKNOWN_USER: &str = "Unknown User";
pub const NO_CHECK_OUT: &str = "No Check-Out";
pub const ONGOING: &str = "Ongoing";

/// What a calendar cell shows for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DaySummary {
    #[schema(example = "Jane Doe")]
    pub user_name: String,
    #[schema(example = "09:00")]
    pub check_in_time: String,
    #[schema(example = "No Check-Out")]
    pub check_out_time: String,
    #[schema(example = json!(["12:30 - 13:00", "15:10 - Ongoing"]))]
    pub breaks: Vec<String>,
}

pub fn format_time(t: NaiveDateTime) -> String {
    t.format("%H:%M").to_string()
}

/// Per-user view of `date`.
///
/// Records are merged by display name: the first record seen for a name fixes
/// its check-in and check-out, later records for the same name only add breaks.
/// Users come out in the order they were first seen.
pub fn day_entries(date: NaiveDate, by_day: &AttendanceByDay) -> Vec<DaySummary> {
    let Some(records) = by_day.get(&day_key(date)) else {
        return Vec::new();
    };

    let mut entries: Vec<DaySummary> = Vec::new();

    for record in records {
        let user_name = record
            .user_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(UNKNOWN_USER);

        let idx = match entries.iter().position(|e| e.user_name == user_name) {
            Some(idx) => idx,
            None => {
                entries.push(DaySummary {
                    user_name: user_name.to_string(),
                    check_in_time: format_time(record.check_in_time),
                    check_out_time: record
                        .check_out_time
                        .map(format_time)
                        .unwrap_or_else(|| NO_CHECK_OUT.to_string()),
                    breaks: Vec::new(),
                });
                entries.len() - 1
            }
        };

        entries[idx].breaks.extend(record.breaks.iter().map(|b| {
            let end = b
                .break_end
                .map(format_time)
                .unwrap_or_else(|| ONGOING.to_string());
            format!("{} - {}", format_time(b.break_start), end)
        }));
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::day_key::group_by_day;
    use crate::model::attendance::{AttendanceRecord, BreakInterval};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        date(d).and_hms_opt(h, m, 0).unwrap()
    }

    fn record(id: u64, name: Option<&str>, day: u32) -> AttendanceRecord {
        AttendanceRecord {
            id,
            user_id: id,
            user_name: name.map(str::to_string),
            date: date(day),
            check_in_time: at(day, 9, 0),
            check_out_time: Some(at(day, 17, 30)),
            breaks: vec![],
        }
    }

    #[test]
    fn only_entries_of_the_requested_day_are_returned() {
        let by_day = group_by_day(vec![
            record(1, Some("Ann"), 7),
            record(2, Some("Bob"), 8),
        ]);

        let entries = day_entries(date(7), &by_day);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user_name, "Ann");
        assert_eq!(entries[0].check_in_time, "09:00");
        assert_eq!(entries[0].check_out_time, "17:30");
    }

    #[test]
    fn day_without_records_is_empty() {
        let by_day = group_by_day(vec![record(1, Some("Ann"), 7)]);
        assert!(day_entries(date(9), &by_day).is_empty());
        assert!(day_entries(date(9), &AttendanceByDay::new()).is_empty());
    }

    #[test]
    fn missing_check_out_and_name_use_placeholders() {
        let mut r = record(1, None, 7);
        r.check_out_time = None;

        let entries = day_entries(date(7), &group_by_day(vec![r]));
        assert_eq!(entries[0].user_name, "Unknown User");
        assert_eq!(entries[0].check_out_time, "No Check-Out");
    }

    #[test]
    fn breaks_render_with_ongoing_marker() {
        let mut r = record(1, Some("Ann"), 7);
        r.breaks = vec![
            BreakInterval {
                id: 1,
                break_start: at(7, 12, 30),
                break_end: Some(at(7, 13, 0)),
            },
            BreakInterval {
                id: 2,
                break_start: at(7, 15, 5),
                break_end: None,
            },
        ];

        let entries = day_entries(date(7), &group_by_day(vec![r]));
        assert_eq!(entries[0].breaks, vec!["12:30 - 13:00", "15:05 - Ongoing"]);
    }

    #[test]
    fn duplicate_user_keeps_first_times_and_all_breaks() {
        let mut first = record(1, Some("Ann"), 7);
        first.breaks = vec![BreakInterval {
            id: 1,
            break_start: at(7, 10, 0),
            break_end: Some(at(7, 10, 15)),
        }];

        let mut second = record(2, Some("Ann"), 7);
        second.check_in_time = at(7, 18, 0);
        second.check_out_time = None;
        second.breaks = vec![BreakInterval {
            id: 2,
            break_start: at(7, 19, 0),
            break_end: None,
        }];

        let entries = day_entries(date(7), &group_by_day(vec![first, second]));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].check_in_time, "09:00");
        assert_eq!(entries[0].check_out_time, "17:30");
        assert_eq!(entries[0].breaks, vec!["10:00 - 10:15", "19:00 - Ongoing"]);
    }

    #[test]
    fn users_keep_first_seen_order() {
        let by_day = group_by_day(vec![
            record(1, Some("Zed"), 7),
            record(2, Some("Ann"), 7),
            record(3, Some("Zed"), 7),
        ]);
        let names: Vec<_> = day_entries(date(7), &by_day)
            .into_iter()
            .map(|e| e.user_name)
            .collect();
        assert_eq!(names, vec!["Zed", "Ann"]);
    }

    #[test]
    fn projection_is_idempotent() {
        let by_day = group_by_day(vec![
            record(1, Some("Ann"), 7),
            record(2, None, 7),
        ]);
        assert_eq!(day_entries(date(7), &by_day), day_entries(date(7), &by_day));
    }
}
