use chrono::{NaiveDate, NaiveDateTime};
use sqlx::MySqlPool;
use tracing::debug;

use super::actions::Transition;
use crate::model::attendance::{AttendanceRecord, AttendanceRow, fold_rows};

const SELECT_RECORDS: &str = r#"
    SELECT
        a.id,
        a.user_id,
        u.name AS user_name,
        a.date,
        a.check_in_time,
        a.check_out_time,
        b.id AS break_id,
        b.break_start,
        b.break_end
    FROM attendance a
    LEFT JOIN users u ON u.id = a.user_id
    LEFT JOIN attendance_breaks b ON b.attendance_id = a.id
"#;

const ORDER_RECORDS: &str = "ORDER BY a.date, a.id, b.break_start, b.id";

/// Records with `from <= date <= to`, optionally for a single user.
pub async fn records_between(
    pool: &MySqlPool,
    from: NaiveDate,
    to: NaiveDate,
    user_id: Option<u64>,
) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
    let sql = match user_id {
        Some(_) => format!(
            "{SELECT_RECORDS} WHERE a.date BETWEEN ? AND ? AND a.user_id = ? {ORDER_RECORDS}"
        ),
        None => format!("{SELECT_RECORDS} WHERE a.date BETWEEN ? AND ? {ORDER_RECORDS}"),
    };
    debug!(sql = %sql, %from, %to, ?user_id, "Loading attendance records");

    let mut query = sqlx::query_as::<_, AttendanceRow>(&sql).bind(from).bind(to);
    if let Some(user_id) = user_id {
        query = query.bind(user_id);
    }

    Ok(fold_rows(query.fetch_all(pool).await?))
}

pub async fn record_for_day(
    pool: &MySqlPool,
    user_id: u64,
    date: NaiveDate,
) -> Result<Option<AttendanceRecord>, sqlx::Error> {
    Ok(records_between(pool, date, date, Some(user_id))
        .await?
        .into_iter()
        .next())
}

pub async fn record_by_id(
    pool: &MySqlPool,
    attendance_id: u64,
) -> Result<Option<AttendanceRecord>, sqlx::Error> {
    let sql = format!("{SELECT_RECORDS} WHERE a.id = ? {ORDER_RECORDS}");
    let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
        .bind(attendance_id)
        .fetch_all(pool)
        .await?;

    Ok(fold_rows(rows).into_iter().next())
}

/// What happened when a planned transition hit the database.
#[derive(Debug, PartialEq, Eq)]
pub enum Applied {
    /// Row written; carries the attendance id it touched.
    Written(u64),
    /// Someone else got there first: duplicate check-in, or the row was no longer open.
    Lost,
}

/// MySQL duplicate-key SQLSTATE.
const DUPLICATE_KEY: &str = "23000";

pub async fn apply(
    pool: &MySqlPool,
    user_id: u64,
    transition: &Transition,
) -> Result<Applied, sqlx::Error> {
    match *transition {
        Transition::Open { date, at } => {
            let result = sqlx::query(
                r#"
                INSERT INTO attendance (user_id, date, check_in_time)
                VALUES (?, ?, ?)
                "#,
            )
            .bind(user_id)
            .bind(date)
            .bind(at)
            .execute(pool)
            .await;

            match result {
                Ok(done) => Ok(Applied::Written(done.last_insert_id())),
                Err(sqlx::Error::Database(db_err))
                    if db_err.code().as_deref() == Some(DUPLICATE_KEY) =>
                {
                    Ok(Applied::Lost)
                }
                Err(e) => Err(e),
            }
        }
        Transition::OpenBreak { attendance_id, at } => {
            // Guarded so a concurrent check-out or open break wins.
            let done = sqlx::query(
                r#"
                INSERT INTO attendance_breaks (attendance_id, break_start)
                SELECT a.id, ?
                FROM attendance a
                WHERE a.id = ?
                AND a.check_out_time IS NULL
                AND NOT EXISTS (
                    SELECT 1 FROM attendance_breaks b
                    WHERE b.attendance_id = a.id AND b.break_end IS NULL
                )
                "#,
            )
            .bind(at)
            .bind(attendance_id)
            .execute(pool)
            .await?;

            Ok(written_or_lost(done.rows_affected(), attendance_id))
        }
        Transition::CloseBreak {
            attendance_id,
            break_id,
            at,
        } => {
            let done = sqlx::query(
                r#"
                UPDATE attendance_breaks
                SET break_end = ?
                WHERE id = ?
                AND attendance_id = ?
                AND break_end IS NULL
                "#,
            )
            .bind(at)
            .bind(break_id)
            .bind(attendance_id)
            .execute(pool)
            .await?;

            Ok(written_or_lost(done.rows_affected(), attendance_id))
        }
        Transition::Close { attendance_id, at } => {
            let done = sqlx::query(
                r#"
                UPDATE attendance
                SET check_out_time = ?
                WHERE id = ?
                AND check_out_time IS NULL
                "#,
            )
            .bind(at)
            .bind(attendance_id)
            .execute(pool)
            .await?;

            Ok(written_or_lost(done.rows_affected(), attendance_id))
        }
    }
}

fn written_or_lost(rows_affected: u64, attendance_id: u64) -> Applied {
    if rows_affected == 0 {
        Applied::Lost
    } else {
        Applied::Written(attendance_id)
    }
}

pub async fn update_times(
    pool: &MySqlPool,
    attendance_id: u64,
    check_in_time: NaiveDateTime,
    check_out_time: Option<NaiveDateTime>,
) -> Result<u64, sqlx::Error> {
    let done = sqlx::query(
        r#"
        UPDATE attendance
        SET check_in_time = ?, check_out_time = ?
        WHERE id = ?
        "#,
    )
    .bind(check_in_time)
    .bind(check_out_time)
    .bind(attendance_id)
    .execute(pool)
    .await?;

    Ok(done.rows_affected())
}
