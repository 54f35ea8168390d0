use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SalaryStatus {
    Pending,
    Dispatched,
    OnHold,
    Failed,
}

/// The user a history row belongs to, as resolved by the join.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryUser {
    #[schema(example = 7)]
    pub id: u64,
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "jane.doe@company.com")]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryRecord {
    #[schema(example = 42)]
    pub id: u64,
    pub user: HistoryUser,
    #[schema(example = "2024-03-31T23:59:00", value_type = String, format = "date-time")]
    pub dispatch_date: NaiveDateTime,
    #[schema(example = "dispatched", value_type = String)]
    pub salary_status: String,
    #[schema(example = 52000.0)]
    pub amount: f64,
}

/// `history INNER JOIN users` row.
#[derive(Debug, sqlx::FromRow)]
pub struct HistoryRow {
    pub id: u64,
    pub dispatch_date: NaiveDateTime,
    pub salary_status: String,
    pub amount: f64,
    pub user_id: u64,
    pub user_name: String,
    pub user_email: String,
}

impl From<HistoryRow> for HistoryRecord {
    fn from(row: HistoryRow) -> Self {
        Self {
            id: row.id,
            user: HistoryUser {
                id: row.user_id,
                name: row.user_name,
                email: row.user_email,
            },
            dispatch_date: row.dispatch_date,
            salary_status: row.salary_status,
            amount: row.amount,
        }
    }
}
