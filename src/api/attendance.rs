use crate::{
    attendance::{
        actions::{Action, ActionOutcome, Rejection, plan},
        calendar::{DaySummary, day_entries},
        day_key::{AttendanceByDay, group_by_day},
        store::{self, Applied},
        summary::{AttendanceSummary, month_bounds, summarize},
    },
    auth::auth::AuthUser,
    config::Config,
    model::{attendance::AttendanceRecord, user::User},
    utils::summary_cache,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct ActionRequest {
    #[schema(example = 7)]
    pub user_id: u64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct MonthQuery {
    #[schema(example = 2024)]
    pub year: i32,
    #[schema(example = 3)]
    pub month: u32,
    /// Restrict to one user (HR/Admin); employees always see themselves
    #[schema(example = 7)]
    pub user_id: Option<u64>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct DayQuery {
    #[schema(example = "2024-03-07", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = 7)]
    pub user_id: Option<u64>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct SummaryQuery {
    #[schema(example = 2024)]
    pub year: i32,
    #[schema(example = 3)]
    pub month: u32,
}

#[derive(Serialize, ToSchema)]
pub struct UserSummaryResponse {
    pub user: User,
    pub summary: AttendanceSummary,
}

#[derive(Deserialize, ToSchema)]
pub struct EditAttendance {
    #[schema(example = "2024-03-07T09:00:00", value_type = String, format = "date-time")]
    pub check_in_time: Option<NaiveDateTime>,
    #[schema(example = "2024-03-07T17:30:00", value_type = String, format = "date-time")]
    pub check_out_time: Option<NaiveDateTime>,
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Runs one action for `user_id` against today's record.
async fn run_action(pool: &MySqlPool, action: Action, user_id: u64) -> ActionOutcome {
    let now = now();
    let today = now.date();

    let current = match store::record_for_day(pool, user_id, today).await {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, user_id, action = %action, "Failed to load today's attendance");
            return ActionOutcome::Failed {
                error: e.to_string(),
            };
        }
    };

    let transition = match plan(action, current.as_ref(), now) {
        Ok(t) => t,
        Err(rejection) => return ActionOutcome::rejected(rejection),
    };

    let attendance_id = match store::apply(pool, user_id, &transition).await {
        Ok(Applied::Written(id)) => id,
        Ok(Applied::Lost) => return ActionOutcome::rejected(Rejection::for_lost(action)),
        Err(e) => {
            error!(error = %e, user_id, action = %action, "Failed to record attendance action");
            return ActionOutcome::Failed {
                error: e.to_string(),
            };
        }
    };

    summary_cache::invalidate(user_id, today, today).await;

    match store::record_by_id(pool, attendance_id).await {
        Ok(Some(attendance)) => ActionOutcome::Succeeded {
            attendance,
            message: action.success_message().to_string(),
        },
        Ok(None) => {
            error!(attendance_id, user_id, "Attendance vanished after write");
            ActionOutcome::Failed {
                error: "attendance not found after write".to_string(),
            }
        }
        Err(e) => {
            error!(error = %e, attendance_id, "Failed to reload attendance");
            ActionOutcome::Failed {
                error: e.to_string(),
            }
        }
    }
}

async fn handle_action(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ActionRequest>,
    action: Action,
) -> actix_web::Result<HttpResponse> {
    let user_id = payload.user_id;
    auth.require_self_or_hr(user_id)?;

    let outcome = run_action(pool.get_ref(), action, user_id).await;
    if let ActionOutcome::Rejected { reason } = &outcome {
        info!(user_id, action = %action, reason = %reason, "Attendance action rejected");
    }

    match outcome.into_reply() {
        Ok(reply) => Ok(HttpResponse::Ok().json(reply)),
        Err(_) => Ok(HttpResponse::InternalServerError().json(json!({
            "message": "Something went wrong, Contact with system admin"
        }))),
    }
}

/// Check in for today
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body = ActionRequest,
    responses(
        (status = 200, description = "Checked in, or refused with `attendance: null`", body = ActionReply),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ActionRequest>,
) -> actix_web::Result<impl Responder> {
    handle_action(auth, pool, payload, Action::CheckIn).await
}

/// Start a break
#[utoipa::path(
    post,
    path = "/api/attendance/start-break",
    request_body = ActionRequest,
    responses(
        (status = 200, description = "Break started, or refused with `attendance: null`", body = ActionReply),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn start_break(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ActionRequest>,
) -> actix_web::Result<impl Responder> {
    handle_action(auth, pool, payload, Action::StartBreak).await
}

/// End the ongoing break
#[utoipa::path(
    post,
    path = "/api/attendance/end-break",
    request_body = ActionRequest,
    responses(
        (status = 200, description = "Break ended, or refused with `attendance: null`", body = ActionReply),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn end_break(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ActionRequest>,
) -> actix_web::Result<impl Responder> {
    handle_action(auth, pool, payload, Action::EndBreak).await
}

/// Check out for today
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    request_body = ActionRequest,
    responses(
        (status = 200, description = "Checked out, or refused with `attendance: null`", body = ActionReply),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ActionRequest>,
) -> actix_web::Result<impl Responder> {
    handle_action(auth, pool, payload, Action::CheckOut).await
}

/// Employees only ever see themselves; HR/Admin see everyone unless they pick a user.
fn visible_user(auth: &AuthUser, requested: Option<u64>) -> actix_web::Result<Option<u64>> {
    match requested {
        Some(user_id) => {
            auth.require_self_or_hr(user_id)?;
            Ok(Some(user_id))
        }
        None if auth.is_hr_or_admin() => Ok(None),
        None => Ok(Some(auth.user_id)),
    }
}

/// Month calendar keyed by `DD-MM-YYYY`
#[utoipa::path(
    get,
    path = "/api/attendance/calendar",
    params(MonthQuery),
    responses(
        (status = 200, description = "Records bucketed by day key", body = Object, example = json!({
            "07-03-2024": [{
                "id": 1, "user_id": 7, "user_name": "Jane Doe", "date": "2024-03-07",
                "check_in_time": "2024-03-07T09:00:00", "check_out_time": null, "breaks": []
            }]
        })),
        (status = 400, description = "Invalid month"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn calendar(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<MonthQuery>,
) -> actix_web::Result<impl Responder> {
    let user_id = visible_user(&auth, query.user_id)?;

    let (first, last) = month_bounds(query.year, query.month)
        .ok_or_else(|| actix_web::error::ErrorBadRequest("Invalid month"))?;

    let records = store::records_between(pool.get_ref(), first, last, user_id)
        .await
        .map_err(|e| {
            error!(error = %e, ?user_id, "Failed to load calendar");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let by_day: AttendanceByDay = group_by_day(records);
    Ok(HttpResponse::Ok().json(by_day))
}

/// Per-user view of a single day
#[utoipa::path(
    get,
    path = "/api/attendance/day",
    params(DayQuery),
    responses(
        (status = 200, description = "One entry per user", body = [DaySummary]),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn day(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<DayQuery>,
) -> actix_web::Result<impl Responder> {
    let user_id = visible_user(&auth, query.user_id)?;

    let records = store::records_between(pool.get_ref(), query.date, query.date, user_id)
        .await
        .map_err(|e| {
            error!(error = %e, date = %query.date, "Failed to load day");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let entries: Vec<DaySummary> = day_entries(query.date, &group_by_day(records));
    Ok(HttpResponse::Ok().json(entries))
}

/// Monthly summary for one user
#[utoipa::path(
    get,
    path = "/api/attendance/summary/{user_id}",
    params(
        ("user_id", Path, description = "User ID"),
        SummaryQuery
    ),
    responses(
        (status = 200, body = UserSummaryResponse),
        (status = 400, description = "Invalid month"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    query: web::Query<SummaryQuery>,
) -> actix_web::Result<impl Responder> {
    let user_id = path.into_inner();
    auth.require_self_or_hr(user_id)?;

    let (first, last) = month_bounds(query.year, query.month)
        .ok_or_else(|| actix_web::error::ErrorBadRequest("Invalid month"))?;

    let user = sqlx::query_as::<_, User>(
        "SELECT id, name, email, role_id, is_active FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id, "Failed to fetch user");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let Some(user) = user else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "User not found"
        })));
    };

    let as_of = now().date();
    let key = (user_id, query.year, query.month, as_of, user.is_active);

    let summary = match summary_cache::get(&key).await {
        Some(cached) => cached,
        None => {
            let records = store::records_between(pool.get_ref(), first, last, Some(user_id))
                .await
                .map_err(|e| {
                    error!(error = %e, user_id, "Failed to load attendance for summary");
                    actix_web::error::ErrorInternalServerError("Internal Server Error")
                })?;

            let summary = summarize(
                records,
                query.year,
                query.month,
                &config.work_policy(),
                as_of,
                user.is_active,
            )
            .ok_or_else(|| actix_web::error::ErrorBadRequest("Invalid month"))?;
            summary_cache::put(key, summary.clone()).await;
            summary
        }
    };

    Ok(HttpResponse::Ok().json(UserSummaryResponse { user, summary }))
}

/// Merges an edit into a record, refusing anything that breaks the record's ordering.
pub fn merge_edit(
    record: &AttendanceRecord,
    edit: &EditAttendance,
) -> Result<(NaiveDateTime, Option<NaiveDateTime>), String> {
    let check_in = edit.check_in_time.unwrap_or(record.check_in_time);
    let check_out = edit.check_out_time.or(record.check_out_time);

    if check_in.date() != record.date {
        return Err("Check-in must stay on the attendance date".into());
    }

    if check_out.is_some() && record.ongoing_break().is_some() {
        return Err("Cannot check out while a break is in progress".into());
    }

    if let Some(out) = check_out {
        if out < check_in {
            return Err("Check-out cannot be earlier than check-in".into());
        }
    }

    if let Some(first) = record.breaks.iter().map(|b| b.break_start).min() {
        if check_in > first {
            return Err("Check-in cannot be later than a recorded break".into());
        }
    }

    if let Some(out) = check_out {
        let latest = record
            .breaks
            .iter()
            .map(|b| b.break_end.unwrap_or(b.break_start))
            .max();
        if latest.is_some_and(|end| out < end) {
            return Err("Check-out cannot be earlier than a recorded break".into());
        }
    }

    Ok((check_in, check_out))
}

/// Correct check-in/check-out times
#[utoipa::path(
    put,
    path = "/api/attendance/{attendance_id}",
    params(
        ("attendance_id", Path, description = "Attendance ID")
    ),
    request_body = EditAttendance,
    responses(
        (status = 200, description = "Updated record", body = AttendanceRecord),
        (status = 400, description = "Times out of order", body = Object, example = json!({
            "message": "Check-out cannot be earlier than check-in"
        })),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Attendance not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn edit_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<EditAttendance>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let attendance_id = path.into_inner();
    let internal = |e: sqlx::Error| {
        error!(error = %e, attendance_id, "Failed to edit attendance");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    };

    let Some(record) = store::record_by_id(pool.get_ref(), attendance_id)
        .await
        .map_err(internal)?
    else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Attendance not found"
        })));
    };

    let (check_in, check_out) = match merge_edit(&record, &body) {
        Ok(times) => times,
        Err(message) => {
            return Ok(HttpResponse::BadRequest().json(json!({ "message": message })));
        }
    };

    store::update_times(pool.get_ref(), attendance_id, check_in, check_out)
        .await
        .map_err(internal)?;

    info!(
        attendance_id,
        edited_by = auth.user_id,
        editor = %auth.username,
        "Attendance edited"
    );
    summary_cache::invalidate(record.user_id, record.date, now().date()).await;

    match store::record_by_id(pool.get_ref(), attendance_id)
        .await
        .map_err(internal)?
    {
        Some(updated) => Ok(HttpResponse::Ok().json(updated)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Attendance not found"
        }))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::BreakInterval;
    use crate::model::role::Role;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn record() -> AttendanceRecord {
        AttendanceRecord {
            id: 1,
            user_id: 7,
            user_name: Some("Ann".into()),
            date: at(0, 0).date(),
            check_in_time: at(9, 0),
            check_out_time: Some(at(17, 0)),
            breaks: vec![BreakInterval {
                id: 1,
                break_start: at(12, 0),
                break_end: Some(at(12, 30)),
            }],
        }
    }

    fn edit(check_in: Option<NaiveDateTime>, check_out: Option<NaiveDateTime>) -> EditAttendance {
        EditAttendance {
            check_in_time: check_in,
            check_out_time: check_out,
        }
    }

    #[test]
    fn edit_keeps_unspecified_times() {
        assert_eq!(
            merge_edit(&record(), &edit(Some(at(8, 30)), None)),
            Ok((at(8, 30), Some(at(17, 0))))
        );
    }

    #[test]
    fn edit_rejects_inverted_times() {
        assert!(merge_edit(&record(), &edit(None, Some(at(8, 0)))).is_err());
    }

    #[test]
    fn edit_must_enclose_breaks() {
        assert!(merge_edit(&record(), &edit(Some(at(12, 15)), None)).is_err());
        assert!(merge_edit(&record(), &edit(None, Some(at(12, 15)))).is_err());
        assert!(merge_edit(&record(), &edit(None, Some(at(12, 30)))).is_ok());

        let mut on_break = record();
        on_break.check_out_time = None;
        on_break.breaks.push(BreakInterval {
            id: 2,
            break_start: at(15, 0),
            break_end: None,
        });
        assert_eq!(
            merge_edit(&on_break, &edit(None, Some(at(17, 0)))),
            Err("Cannot check out while a break is in progress".to_string())
        );
        assert!(merge_edit(&on_break, &edit(Some(at(8, 0)), None)).is_ok());
    }

    #[test]
    fn edit_keeps_check_in_on_the_record_day() {
        let next_day = at(9, 0) + chrono::Duration::days(1);
        assert_eq!(
            merge_edit(&record(), &edit(Some(next_day), None)),
            Err("Check-in must stay on the attendance date".to_string())
        );
    }

    #[test]
    fn employees_are_pinned_to_themselves() {
        let employee = AuthUser {
            user_id: 7,
            username: "ann".into(),
            role: Role::Employee,
        };
        assert_eq!(visible_user(&employee, None).unwrap(), Some(7));
        assert_eq!(visible_user(&employee, Some(7)).unwrap(), Some(7));
        assert!(visible_user(&employee, Some(8)).is_err());

        let admin = AuthUser {
            user_id: 1,
            username: "root".into(),
            role: Role::Admin,
        };
        assert_eq!(visible_user(&admin, None).unwrap(), None);
        assert_eq!(visible_user(&admin, Some(8)).unwrap(), Some(8));
    }
}
