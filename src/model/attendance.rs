use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A pause inside a work session. `break_end` is `None` while the break is ongoing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BreakInterval {
    #[schema(example = 12)]
    pub id: u64,
    #[schema(example = "2024-03-07T12:30:00", value_type = String, format = "date-time")]
    pub break_start: NaiveDateTime,
    #[schema(example = "2024-03-07T13:00:00", value_type = String, format = "date-time", nullable = true)]
    pub break_end: Option<NaiveDateTime>,
}

impl BreakInterval {
    pub fn is_ongoing(&self) -> bool {
        self.break_end.is_none()
    }
}

/// One user's attendance for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 7)]
    pub user_id: u64,
    #[schema(example = "Jane Doe", nullable = true)]
    pub user_name: Option<String>,
    #[schema(example = "2024-03-07", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "2024-03-07T09:00:00", value_type = String, format = "date-time")]
    pub check_in_time: NaiveDateTime,
    #[schema(example = "2024-03-07T17:30:00", value_type = String, format = "date-time", nullable = true)]
    pub check_out_time: Option<NaiveDateTime>,
    pub breaks: Vec<BreakInterval>,
}

impl AttendanceRecord {
    pub fn is_checked_out(&self) -> bool {
        self.check_out_time.is_some()
    }

    pub fn ongoing_break(&self) -> Option<&BreakInterval> {
        self.breaks.iter().rev().find(|b| b.is_ongoing())
    }

    /// Time between check-in and check-out minus every closed break.
    /// `None` while the user is still clocked in.
    pub fn worked(&self) -> Option<chrono::Duration> {
        let check_out = self.check_out_time?;
        let on_break = self
            .breaks
            .iter()
            .filter_map(|b| b.break_end.map(|end| end - b.break_start))
            .fold(chrono::Duration::zero(), |acc, d| acc + d);

        Some((check_out - self.check_in_time - on_break).max(chrono::Duration::zero()))
    }
}

/// Flat row produced by `attendance LEFT JOIN attendance_breaks LEFT JOIN users`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttendanceRow {
    pub id: u64,
    pub user_id: u64,
    pub user_name: Option<String>,
    pub date: NaiveDate,
    pub check_in_time: NaiveDateTime,
    pub check_out_time: Option<NaiveDateTime>,
    pub break_id: Option<u64>,
    pub break_start: Option<NaiveDateTime>,
    pub break_end: Option<NaiveDateTime>,
}

/// Folds joined rows back into records. Rows must arrive ordered by attendance id,
/// then by break start; each record keeps its breaks in that order.
pub fn fold_rows(rows: Vec<AttendanceRow>) -> Vec<AttendanceRecord> {
    let mut records: Vec<AttendanceRecord> = Vec::new();

    for row in rows {
        let interval = match (row.break_id, row.break_start) {
            (Some(id), Some(break_start)) => Some(BreakInterval {
                id,
                break_start,
                break_end: row.break_end,
            }),
            _ => None,
        };

        match records.last_mut() {
            Some(last) if last.id == row.id => {
                last.breaks.extend(interval);
            }
            _ => records.push(AttendanceRecord {
                id: row.id,
                user_id: row.user_id,
                user_name: row.user_name,
                date: row.date,
                check_in_time: row.check_in_time,
                check_out_time: row.check_out_time,
                breaks: interval.into_iter().collect(),
            }),
        }
    }

    records
}
