use std::str::FromStr;

use actix_web::{
    HttpRequest, HttpResponse, Responder,
    error::{InternalError, QueryPayloadError},
    web,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::history::query::{
    HistoryError, HistoryFilters, HistoryPage, MonthFilter, fetch_history,
};
use crate::model::history::SalaryStatus;

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct HistoryQueryParams {
    /// Page number, starting at 1
    #[schema(example = 1)]
    pub page: Option<u32>,
    /// Items per page (max 100)
    #[schema(example = 10)]
    pub limit: Option<u32>,
    /// Case-insensitive substring of the user's name
    #[schema(example = "jane")]
    pub name: Option<String>,
    /// Case-insensitive substring of the user's email
    #[schema(example = "@company.com")]
    pub email: Option<String>,
    /// One of `pending`, `dispatched`, `on_hold`, `failed`
    #[schema(example = "dispatched")]
    pub salary_status: Option<String>,
    /// Dispatch month (1-12); requires `year`
    #[schema(example = 3)]
    pub month: Option<u32>,
    /// Dispatch year; requires `month`
    #[schema(example = 2024)]
    pub year: Option<i32>,
}

impl HistoryQueryParams {
    fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    fn limit(&self) -> u32 {
        self.limit.unwrap_or(10).clamp(1, 100)
    }

    fn filters(&self) -> Result<HistoryFilters, HistoryError> {
        let dispatch_date = match (self.month, self.year) {
            (Some(month), Some(year)) => Some(MonthFilter { month, year }),
            (None, None) => None,
            _ => {
                return Err(HistoryError::InvalidFilter(
                    "month and year must be given together".into(),
                ));
            }
        };

        let salary_status = match self.salary_status.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => Some(SalaryStatus::from_str(raw).map_err(|_| {
                HistoryError::InvalidFilter(format!("unknown salary status {raw}"))
            })?),
            None => None,
        };

        Ok(HistoryFilters {
            name: self.name.clone(),
            email: self.email.clone(),
            salary_status,
            dispatch_date,
        })
    }
}

/// Builds the error body: the empty page plus what went wrong.
fn error_body(page: u32, limit: u32, message: &str) -> serde_json::Value {
    let mut body = serde_json::to_value(HistoryPage::empty(page, limit)).unwrap_or_else(|_| json!({}));
    body["error"] = json!(message);
    body
}

/// Query strings that do not even deserialize get the same 400 body as a bad filter.
pub fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    info!(error = %err, "Rejected history query");
    let body = error_body(1, 10, &format!("invalid filter: {err}"));
    InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
}

/// Salary dispatch history
#[utoipa::path(
    get,
    path = "/api/history",
    params(HistoryQueryParams),
    responses(
        (status = 200, description = "Matching page", body = HistoryPage),
        (status = 400, description = "Invalid filter", body = Object, example = json!({
            "error": "invalid filter: no such month 2024-13",
            "data": [], "current_page": 1, "limit": 10, "total_records": 0
        })),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "History could not be searched", body = Object, example = json!({
            "error": "History search failed",
            "data": [], "current_page": 1, "limit": 10, "total_records": 0
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "History"
)]
pub async fn list_history(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<HistoryQueryParams>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let page = query.page();
    let limit = query.limit();

    let result = match query.filters() {
        Ok(filters) => fetch_history(pool.get_ref(), page, limit, &filters).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(history) => Ok(HttpResponse::Ok().json(history)),
        Err(HistoryError::InvalidFilter(reason)) => {
            info!(reason = %reason, "Rejected history filter");
            Ok(HttpResponse::BadRequest().json(error_body(
                page,
                limit,
                &format!("invalid filter: {reason}"),
            )))
        }
        Err(e) => {
            error!(error = %e, page, limit, "History search failed");
            Ok(HttpResponse::InternalServerError().json(error_body(
                page,
                limit,
                "History search failed",
            )))
        }
    }
}
