use crate::store::ScheduleStore;
use crate::time_grid::{format_hhmm, parse_hhmm};
use crate::weekday::{self, DayCode};
use std::fmt;

pub const TITLE_MAX_CHARS: usize = 100;

#[derive(Debug)]
pub enum ScheduleError {
    InvalidTitle(String),
    MissingDays,
    InvalidTime { field: &'static str, value: String },
    InvertedTimeRange { start: String, end: String },
    NotFound,
    AccessDenied,
    OutOfRange { day_index: i64, lesson_index: i64 },
    Storage(anyhow::Error),
}

impl ScheduleError {
    /// Wire code reported back to the client.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTitle(_)
            | Self::MissingDays
            | Self::InvalidTime { .. }
            | Self::InvertedTimeRange { .. } => "bad_params",
            Self::NotFound => "not_found",
            Self::AccessDenied => "access_denied",
            Self::OutOfRange { .. } => "out_of_range",
            Self::Storage(_) => "db_failed",
        }
    }
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTitle(msg) => write!(f, "{}", msg),
            Self::MissingDays => write!(f, "at least one day of the week is required"),
            Self::InvalidTime { field, value } => {
                write!(f, "{} must be HH:MM, got {:?}", field, value)
            }
            Self::InvertedTimeRange { start, end } => {
                write!(f, "endTime {} must be after startTime {}", end, start)
            }
            Self::NotFound => write!(f, "schedule not found"),
            Self::AccessDenied => write!(f, "schedule belongs to another user"),
            Self::OutOfRange {
                day_index,
                lesson_index,
            } => write!(
                f,
                "cell {}_{} is outside the schedule grid",
                day_index, lesson_index
            ),
            Self::Storage(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ScheduleError {}

impl From<anyhow::Error> for ScheduleError {
    fn from(e: anyhow::Error) -> Self {
        Self::Storage(e)
    }
}

impl From<rusqlite::Error> for ScheduleError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.into())
    }
}

pub fn validate_title(raw: &str) -> Result<String, ScheduleError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ScheduleError::InvalidTitle(
            "title must not be empty".to_string(),
        ));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(ScheduleError::InvalidTitle(format!(
            "title must be at most {} characters",
            TITLE_MAX_CHARS
        )));
    }
    Ok(title.to_string())
}

/// Validated schedule settings as submitted by the create form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub title: String,
    pub days: Vec<DayCode>,
    pub start_time: String,
    pub end_time: String,
}

impl ScheduleConfig {
    pub fn new(
        title: &str,
        days: &serde_json::Value,
        start_time: &str,
        end_time: &str,
    ) -> Result<Self, ScheduleError> {
        let title = validate_title(title)?;

        // An explicit empty submission (`[]` or a blank string) is a form
        // error; undecodable input still degrades to the default week.
        if days.as_str().is_some_and(|s| s.trim().is_empty()) {
            return Err(ScheduleError::MissingDays);
        }
        let days = weekday::normalize(days);
        if days.is_empty() {
            return Err(ScheduleError::MissingDays);
        }

        let start = parse_hhmm(start_time).ok_or_else(|| ScheduleError::InvalidTime {
            field: "startTime",
            value: start_time.to_string(),
        })?;
        let end = parse_hhmm(end_time).ok_or_else(|| ScheduleError::InvalidTime {
            field: "endTime",
            value: end_time.to_string(),
        })?;
        if end <= start {
            return Err(ScheduleError::InvertedTimeRange {
                start: start_time.trim().to_string(),
                end: end_time.trim().to_string(),
            });
        }

        Ok(Self {
            title,
            days,
            start_time: format_hhmm(start),
            end_time: format_hhmm(end),
        })
    }
}

/// A schedule row as persisted. Times and days are kept raw: rows written
/// by older builds may hold values `ScheduleConfig` would refuse today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRecord {
    pub id: String,
    pub title: String,
    pub user_id: String,
    pub days_of_week: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ScheduleRecord {
    pub fn ensure_owner(&self, user_id: &str) -> Result<(), ScheduleError> {
        if self.user_id == user_id {
            Ok(())
        } else {
            Err(ScheduleError::AccessDenied)
        }
    }
}

/// Renames a schedule owned by `user_id`. The grid and its cells are untouched.
pub fn rename<S: ScheduleStore>(
    store: &S,
    schedule_id: &str,
    user_id: &str,
    title: &str,
) -> Result<String, ScheduleError> {
    let title = validate_title(title)?;
    let record = store
        .get_schedule(schedule_id)?
        .ok_or(ScheduleError::NotFound)?;
    record.ensure_owner(user_id)?;
    store.atomically(|tx| tx.save_title(schedule_id, &title))?;
    Ok(title)
}
