use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;
use utoipa::ToSchema;

use super::day_key::{AttendanceByDay, group_by_day};
use crate::model::attendance::AttendanceRecord;

/// Business rules for what counts as a working day and as overtime.
#[derive(Debug, Clone)]
pub struct WorkPolicy {
    pub overtime_threshold: Duration,
    pub weekend_days: Vec<Weekday>,
    pub holidays: Vec<NaiveDate>,
}

impl WorkPolicy {
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !self.weekend_days.contains(&date.weekday()) && !self.holidays.contains(&date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStatus {
    Present { overtime: bool },
    Absent,
    Off,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttendanceSummary {
    #[schema(value_type = Object)]
    pub attendance_by_day: AttendanceByDay,
    #[schema(example = 2)]
    pub overtime_days: u32,
    #[schema(example = 1)]
    pub total_absents: u32,
    #[schema(example = 18)]
    pub total_present: u32,
}

/// First and last day of a month, `None` for an impossible month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next.pred_opt()?))
}

/// Classifies a single day from the records stored on it. Only an active
/// employee can be absent.
pub fn classify_day(
    date: NaiveDate,
    records: &[AttendanceRecord],
    policy: &WorkPolicy,
    as_of: NaiveDate,
    active: bool,
) -> DayStatus {
    if !records.is_empty() {
        let worked = records
            .iter()
            .filter_map(AttendanceRecord::worked)
            .fold(Duration::zero(), |acc, d| acc + d);
        return DayStatus::Present {
            overtime: worked > policy.overtime_threshold,
        };
    }

    if active && date < as_of && policy.is_working_day(date) {
        DayStatus::Absent
    } else {
        DayStatus::Off
    }
}

/// Rolls one user's records up for a month. Records outside the month are ignored.
pub fn summarize(
    records: Vec<AttendanceRecord>,
    year: i32,
    month: u32,
    policy: &WorkPolicy,
    as_of: NaiveDate,
    active: bool,
) -> Option<AttendanceSummary> {
    let (first, last) = month_bounds(year, month)?;

    let mut per_date: BTreeMap<NaiveDate, Vec<AttendanceRecord>> = BTreeMap::new();
    for record in records
        .into_iter()
        .filter(|r| r.date >= first && r.date <= last)
    {
        per_date.entry(record.date).or_default().push(record);
    }

    let mut summary = AttendanceSummary {
        attendance_by_day: AttendanceByDay::new(),
        overtime_days: 0,
        total_absents: 0,
        total_present: 0,
    };

    for date in first.iter_days().take_while(|d| *d <= last) {
        let on_day = per_date.get(&date).map(Vec::as_slice).unwrap_or(&[]);
        match classify_day(date, on_day, policy, as_of, active) {
            DayStatus::Present { overtime } => {
                summary.total_present += 1;
                if overtime {
                    summary.overtime_days += 1;
                }
            }
            DayStatus::Absent => summary.total_absents += 1,
            DayStatus::Off => {}
        }
    }

    summary.attendance_by_day = group_by_day(per_date.into_values().flatten());
    Some(summary)
}
