use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::model::attendance::AttendanceRecord;

/// Records bucketed by `DD-MM-YYYY` day key.
pub type AttendanceByDay = BTreeMap<String, Vec<AttendanceRecord>>;

/// `DD-MM-YYYY`, zero padded. This is the join key between stored records and
/// calendar cells, so every lookup and every grouping goes through here.
pub fn day_key(date: NaiveDate) -> String {
    format!("{:02}-{:02}-{:04}", date.day(), date.month(), date.year())
}

/// Buckets records by the day key of their `date`, keeping input order inside a day.
pub fn group_by_day<I>(records: I) -> AttendanceByDay
where
    I: IntoIterator<Item = AttendanceRecord>,
{
    let mut by_day = AttendanceByDay::new();
    for record in records {
        by_day.entry(day_key(record.date)).or_default().push(record);
    }
    by_day
}
