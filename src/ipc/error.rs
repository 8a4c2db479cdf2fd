use crate::schedule::ScheduleError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Error response for a failed schedule operation, with the offending
/// coordinates or times echoed back where there are any.
pub fn schedule_err(id: &str, e: &ScheduleError) -> serde_json::Value {
    let details = match e {
        ScheduleError::OutOfRange {
            day_index,
            lesson_index,
        } => Some(json!({ "dayIndex": day_index, "lessonIndex": lesson_index })),
        ScheduleError::InvertedTimeRange { start, end } => {
            Some(json!({ "startTime": start, "endTime": end }))
        }
        ScheduleError::InvalidTime { field, value } => Some(json!({ "field": field, "value": value })),
        _ => None,
    };
    err(id, e.code(), e.to_string(), details)
}
