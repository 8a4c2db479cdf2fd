use crate::ipc::error::{err, ok, schedule_err};
use crate::ipc::helpers::{db_conn, required_i64, required_str};
use crate::ipc::types::{AppState, Request};
use crate::lessons::{CellContent, LessonReconciler, RejectReason, RejectedEdit};
use serde_json::json;
use std::collections::BTreeMap;

const LESSONS_SAVE_MAX_EDITS: usize = 5000;

fn rejection_json(r: &RejectedEdit) -> serde_json::Value {
    json!({
        "key": r.key,
        "code": r.reason.code(),
        "message": r.reason.message(),
    })
}

fn handle_lessons_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let user_id = match required_str(req, "userId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let schedule_id = match required_str(req, "scheduleId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match LessonReconciler::new(conn).lessons_by_key(&schedule_id, &user_id) {
        Ok(lessons) => ok(&req.id, json!({ "lessons": lessons })),
        Err(e) => schedule_err(&req.id, &e),
    }
}

fn handle_lessons_save_all(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let user_id = match required_str(req, "userId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let schedule_id = match required_str(req, "scheduleId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(edits_obj) = req.params.get("edits").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "edits must be an object", None);
    };

    if edits_obj.len() > LESSONS_SAVE_MAX_EDITS {
        let rejected = edits_obj.len();
        return ok(
            &req.id,
            json!({
                "ok": true,
                "saved": 0,
                "deleted": 0,
                "rejected": rejected,
                "rejectedKeys": [],
                "limitExceeded": true,
                "errors": [{
                    "key": null,
                    "code": "too_many_edits",
                    "message": format!(
                        "payload exceeds max edits: {} > {}",
                        rejected, LESSONS_SAVE_MAX_EDITS
                    )
                }]
            }),
        );
    }

    let mut edits: BTreeMap<String, CellContent> = BTreeMap::new();
    let mut malformed: Vec<RejectedEdit> = Vec::new();
    for (key, value) in edits_obj {
        let parsed = if value.is_object() {
            serde_json::from_value::<CellContent>(value.clone()).ok()
        } else {
            None
        };
        match parsed {
            Some(content) => {
                edits.insert(key.clone(), content);
            }
            None => malformed.push(RejectedEdit {
                key: key.clone(),
                reason: RejectReason::MalformedContent,
            }),
        }
    }

    let outcome = match LessonReconciler::new(conn).replace_all(&schedule_id, &user_id, &edits) {
        Ok(v) => v,
        Err(e) => return schedule_err(&req.id, &e),
    };

    let mut rejected = outcome.rejected.clone();
    rejected.extend(malformed);
    rejected.sort_by(|a, b| a.key.cmp(&b.key));
    let rejected_keys: Vec<&str> = rejected.iter().map(|r| r.key.as_str()).collect();
    let errors: Vec<serde_json::Value> = rejected.iter().map(rejection_json).collect();

    ok(
        &req.id,
        json!({
            "ok": true,
            "saved": outcome.saved,
            "deleted": outcome.deleted,
            "rejected": rejected.len(),
            "rejectedKeys": rejected_keys,
            "errors": errors,
        }),
    )
}

fn handle_lessons_update_one(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let user_id = match required_str(req, "userId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let schedule_id = match required_str(req, "scheduleId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let day_index = match required_i64(req, "dayIndex") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let lesson_index = match required_i64(req, "lessonIndex") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let content = match req.params.get("content") {
        Some(v) if v.is_object() => match serde_json::from_value::<CellContent>(v.clone()) {
            Ok(c) => c,
            Err(e) => return err(&req.id, "bad_params", format!("content: {}", e), None),
        },
        _ => return err(&req.id, "bad_params", "content must be an object", None),
    };

    match LessonReconciler::new(conn).update_single(
        &schedule_id,
        &user_id,
        day_index,
        lesson_index,
        &content,
    ) {
        Ok(cell) => ok(&req.id, json!({ "ok": true, "lesson": cell })),
        Err(e) => schedule_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "lessons.list" => Some(handle_lessons_list(state, req)),
        "lessons.saveAll" => Some(handle_lessons_save_all(state, req)),
        "lessons.updateOne" => Some(handle_lessons_update_one(state, req)),
        _ => None,
    }
}
