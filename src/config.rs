use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, Weekday};
use dotenvy::dotenv;

use crate::attendance::summary::WorkPolicy;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub server_addr: String,
    pub api_prefix: String,
    pub log_level: String,

    // Rate limiting
    pub rate_actions_per_min: u32,
    pub rate_protected_per_min: u32,

    // Attendance rules
    pub overtime_threshold_minutes: i64,
    pub weekend_days: Vec<Weekday>,
    pub holidays: Vec<NaiveDate>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            db_max_connections: parsed_or("DB_MAX_CONNECTIONS", 10)?,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "debug".to_string()),

            rate_actions_per_min: parsed_or("RATE_ACTIONS_PER_MIN", 30)?,
            rate_protected_per_min: parsed_or("RATE_PROTECTED_PER_MIN", 1000)?,

            overtime_threshold_minutes: parsed_or("OVERTIME_THRESHOLD_MINUTES", 480)?, // 8h
            weekend_days: parse_weekdays(
                &env::var("WEEKEND_DAYS").unwrap_or_else(|_| "Sat,Sun".to_string()),
            )?,
            holidays: parse_holidays(&env::var("HOLIDAYS").unwrap_or_default())?,
        })
    }

    pub fn work_policy(&self) -> WorkPolicy {
        WorkPolicy {
            overtime_threshold: chrono::Duration::minutes(self.overtime_threshold_minutes),
            weekend_days: self.weekend_days.clone(),
            holidays: self.holidays.clone(),
        }
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{key} has invalid value {raw:?}: {e}")),
        Err(_) => Ok(default),
    }
}

/// Parses a comma separated list such as `Sat,Sun` or `Fri`.
pub fn parse_weekdays(raw: &str) -> Result<Vec<Weekday>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Weekday>()
                .map_err(|_| anyhow!("invalid weekday {s:?} in WEEKEND_DAYS"))
        })
        .collect()
}

/// Parses a comma separated list of `YYYY-MM-DD` dates.
pub fn parse_holidays(raw: &str) -> Result<Vec<NaiveDate>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("invalid date {s:?} in HOLIDAYS"))
        })
        .collect()
}
