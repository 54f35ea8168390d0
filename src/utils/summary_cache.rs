use chrono::{Datelike, NaiveDate};
use moka::future::Cache;
use once_cell::sync::Lazy;
use std::time::Duration;

use crate::attendance::summary::AttendanceSummary;

/// (user_id, year, month, as_of, active)
pub type SummaryKey = (u64, i32, u32, NaiveDate, bool);

/// Monthly summaries are recomputed from the event store; this only spares
/// repeated reads of the same month within a few minutes.
pub static SUMMARY_CACHE: Lazy<Cache<SummaryKey, AttendanceSummary>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(10_000)
        .time_to_live(Duration::from_secs(600)) // 10 min
        .build()
});

pub async fn get(key: &SummaryKey) -> Option<AttendanceSummary> {
    SUMMARY_CACHE.get(key).await
}

pub async fn put(key: SummaryKey, summary: AttendanceSummary) {
    SUMMARY_CACHE.insert(key, summary).await;
}

/// Drops the summary of the month containing `date`, as computed on `as_of`.
pub async fn invalidate(user_id: u64, date: NaiveDate, as_of: NaiveDate) {
    for active in [true, false] {
        SUMMARY_CACHE
            .invalidate(&(user_id, date.year(), date.month(), as_of, active))
            .await;
    }
}
