use crate::db;
use crate::grid::ScheduleGrid;
use crate::ipc::error::{err, ok, schedule_err};
use crate::ipc::handlers::setup::{load_editor, load_locale};
use crate::ipc::helpers::{db_conn, parse_opt_string, required_str};
use crate::ipc::types::{AppState, Request};
use crate::lessons::{LessonReconciler, AVAILABLE_FONTS, DEFAULT_COLOR, DEFAULT_FONT};
use crate::schedule::{self, ScheduleConfig, ScheduleError, ScheduleRecord};
use crate::store::ScheduleStore;
use crate::weekday;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::info;

#[derive(Clone, Copy, PartialEq, Eq)]
enum OpenMode {
    View,
    Edit,
}

fn schedule_to_json(record: &ScheduleRecord, grid: &ScheduleGrid) -> serde_json::Value {
    json!({
        "id": record.id,
        "title": record.title,
        "dayCodes": grid.days.iter().map(|d| d.as_str()).collect::<Vec<_>>(),
        "startTime": record.start_time,
        "endTime": record.end_time,
        "dayCount": grid.day_count(),
        "slotCount": grid.slot_count(),
        "cellCount": grid.cell_count(),
        "createdAt": record.created_at,
        "updatedAt": record.updated_at,
    })
}

fn editor_options(conn: &rusqlite::Connection) -> serde_json::Value {
    let fonts: Vec<serde_json::Value> = AVAILABLE_FONTS
        .iter()
        .map(|(family, category)| json!({ "value": family, "name": family, "category": category }))
        .collect();
    let mut editor = load_editor(conn);
    if let Some(obj) = editor.as_object_mut() {
        obj.insert("fonts".into(), json!(fonts));
        obj.insert("defaultFont".into(), json!(DEFAULT_FONT));
        obj.insert("defaultColor".into(), json!(DEFAULT_COLOR));
    }
    editor
}

fn handle_schedules_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let user_id = match required_str(req, "userId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let records = match db::list_schedules(conn, &user_id) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let mut schedules = Vec::with_capacity(records.len());
    for record in &records {
        let grid = ScheduleGrid::for_record(record);
        let (lesson_count, filled_count) = match db::lesson_counts(conn, &record.id) {
            Ok(v) => v,
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        };
        let mut item = schedule_to_json(record, &grid);
        item["lessonCount"] = json!(lesson_count);
        item["filledCount"] = json!(filled_count);
        schedules.push(item);
    }
    ok(&req.id, json!({ "schedules": schedules }))
}

fn handle_schedules_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let user_id = match required_str(req, "userId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(input) = req.params.get("input").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing input", None);
    };
    let Some(title) = input.get("title").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "input.title is required", None);
    };
    let days = match input.get("days") {
        Some(v) if !v.is_null() => v,
        _ => return schedule_err(&req.id, &ScheduleError::MissingDays),
    };
    let Some(start_time) = input.get("startTime").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "input.startTime is required", None);
    };
    let Some(end_time) = input.get("endTime").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "input.endTime is required", None);
    };

    let config = match ScheduleConfig::new(title, days, start_time, end_time) {
        Ok(c) => c,
        Err(e) => return schedule_err(&req.id, &e),
    };
    let schedule_id = match db::insert_schedule(
        conn,
        &user_id,
        &config.title,
        &weekday::encode(&config.days),
        &config.start_time,
        &config.end_time,
    ) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_insert_failed", e.to_string(), None),
    };

    let grid = ScheduleGrid::build(&config);
    info!(
        schedule_id = %schedule_id,
        days = grid.day_count(),
        slots = grid.slot_count(),
        "schedule created"
    );
    ok(
        &req.id,
        json!({
            "scheduleId": schedule_id,
            "grid": grid.to_json(load_locale(conn)),
        }),
    )
}

fn handle_schedules_open(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let mode = match parse_opt_string(req.params.get("mode")) {
        Ok(None) => OpenMode::View,
        Ok(Some(m)) if m == "view" => OpenMode::View,
        Ok(Some(m)) if m == "edit" => OpenMode::Edit,
        Ok(Some(_)) => return err(&req.id, "bad_params", "mode must be one of: view, edit", None),
        Err(m) => return err(&req.id, "bad_params", format!("mode {}", m), None),
    };

    let reconciler = LessonReconciler::new(conn);
    let (record, grid) = match reconciler.load(&schedule_id, &user_id) {
        Ok(v) => v,
        Err(e) => return schedule_err(&req.id, &e),
    };
    let cells = match conn.list_lessons(&schedule_id) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    // Cells outside the current grid stay stored but are not rendered.
    let lessons: BTreeMap<String, serde_json::Value> = cells
        .into_iter()
        .filter(|c| grid.validate_coordinate(c.day_index, c.lesson_index))
        .map(|c| (c.key(), json!(c)))
        .collect();

    let locale = load_locale(conn);
    let mut result = json!({
        "schedule": schedule_to_json(&record, &grid),
        "grid": grid.to_json(locale),
        "lessons": lessons,
        "locale": locale.code(),
    });
    match mode {
        OpenMode::Edit => {
            result["mode"] = json!("edit");
            result["editor"] = editor_options(conn);
        }
        OpenMode::View => {
            result["mode"] = json!("view");
            result["generatedAt"] = json!(db::now_ts());
        }
    }
    ok(&req.id, result)
}

fn handle_schedules_update_title(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let Some(title) = req.params.get("title").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing title", None);
    };

    match schedule::rename(conn, &schedule_id, &user_id, title) {
        Ok(title) => ok(&req.id, json!({ "ok": true, "title": title })),
        Err(e) => schedule_err(&req.id, &e),
    }
}

fn handle_schedules_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    if let Err(e) = LessonReconciler::new(conn).load(&schedule_id, &user_id) {
        return schedule_err(&req.id, &e);
    }
    match db::delete_schedule(conn, &schedule_id) {
        Ok(deleted_lessons) => {
            info!(schedule_id = %schedule_id, deleted_lessons, "schedule deleted");
            ok(
                &req.id,
                json!({ "ok": true, "deletedLessons": deleted_lessons }),
            )
        }
        Err(e) => err(&req.id, "db_delete_failed", e.to_string(), None),
    }
}

fn handle_schedules_repair_day_codes(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let user_id = match required_str(req, "userId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match db::repair_day_codes(conn, &user_id) {
        Ok(fixed) => {
            info!(user_id = %user_id, fixed, "day code repair finished");
            ok(&req.id, json!({ "fixedCount": fixed }))
        }
        Err(e) => err(&req.id, "db_update_failed", e.to_string(), None),
    }
}

fn handle_profile_stats(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let user_id = match required_str(req, "userId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let records = match db::list_schedules(conn, &user_id) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let mut total_slots = 0usize;
    let mut filled_cells = 0i64;
    for record in &records {
        total_slots += ScheduleGrid::for_record(record).cell_count();
        match db::lesson_counts(conn, &record.id) {
            Ok((_, filled)) => filled_cells += filled,
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        }
    }
    ok(
        &req.id,
        json!({
            "scheduleCount": records.len(),
            "totalSlots": total_slots,
            "filledCells": filled_cells,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "schedules.list" => Some(handle_schedules_list(state, req)),
        "schedules.create" => Some(handle_schedules_create(state, req)),
        "schedules.open" => Some(handle_schedules_open(state, req)),
        "schedules.updateTitle" => Some(handle_schedules_update_title(state, req)),
        "schedules.delete" => Some(handle_schedules_delete(state, req)),
        "schedules.repairDayCodes" => Some(handle_schedules_repair_day_codes(state, req)),
        "profile.stats" => Some(handle_profile_stats(state, req)),
        _ => None,
    }
}
