use crate::api::attendance::{
    ActionRequest, DayQuery, EditAttendance, MonthQuery, SummaryQuery, UserSummaryResponse,
};
use crate::api::history::HistoryQueryParams;
use crate::attendance::actions::ActionReply;
use crate::attendance::calendar::DaySummary;
use crate::attendance::summary::AttendanceSummary;
use crate::history::query::HistoryPage;
use crate::model::attendance::{AttendanceRecord, BreakInterval};
use crate::model::history::{HistoryRecord, HistoryUser, SalaryStatus};
use crate::model::user::User;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance API",
        version = "1.0.0",
        description = r#"
## Attendance Tracking

Employees check in, take breaks and check out; HR and admins browse the
attendance calendar, monthly summaries and the salary dispatch history.

### Actions
`check-in`, `start-break`, `end-break` and `check-out` always answer
`{ "attendance": ..., "message": ... }`. A `null` attendance means the action
was refused by a business rule (for example a second check-in on the same day);
it is a warning, not an error. Server faults answer `500`.

### Calendar
Calendar responses are keyed by `DD-MM-YYYY`.

### History
Failed history searches answer with an error status and an `error` field, so an
empty result is never confused with a failed search.

### Security
All endpoints require a **JWT Bearer** access token.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::start_break,
        crate::api::attendance::end_break,
        crate::api::attendance::check_out,
        crate::api::attendance::calendar,
        crate::api::attendance::day,
        crate::api::attendance::summary,
        crate::api::attendance::edit_attendance,

        crate::api::history::list_history
    ),
    components(
        schemas(
            ActionRequest,
            ActionReply,
            AttendanceRecord,
            BreakInterval,
            DaySummary,
            AttendanceSummary,
            UserSummaryResponse,
            EditAttendance,
            MonthQuery,
            DayQuery,
            SummaryQuery,
            User,
            HistoryQueryParams,
            HistoryPage,
            HistoryRecord,
            HistoryUser,
            SalaryStatus
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Check-in/out, breaks, calendars and summaries"),
        (name = "History", description = "Salary dispatch history"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
