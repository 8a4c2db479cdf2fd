mod test_support;

use serde_json::json;
use test_support::{create_schedule, error_code, request, request_ok, spawn_sidecar, temp_dir};

fn five_day_morning() -> serde_json::Value {
    json!({
        "title": "5A",
        "days": ["mon", "tue", "wed", "thu", "fri"],
        "startTime": "09:00",
        "endTime": "12:00"
    })
}

#[test]
fn save_all_reports_rejected_keys_and_replaces_prior_cells() {
    let workspace = temp_dir("timetabled-save-all");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let schedule_id = create_schedule(&mut stdin, &mut reader, "2", "alice", five_day_morning());

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "lessons.updateOne",
        json!({
            "userId": "alice",
            "scheduleId": schedule_id,
            "dayIndex": 1,
            "lessonIndex": 1,
            "content": { "subject_name": "Old" }
        }),
    );

    let saved = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "lessons.saveAll",
        json!({
            "userId": "alice",
            "scheduleId": schedule_id,
            "edits": {
                "0_0": { "subject_name": "Math", "color": "#FF6B6B", "font_family": "georgia" },
                "99_0": { "subject_name": "Lost" },
                "abc": { "subject_name": "Lost" },
                "2_0": "not an object"
            }
        }),
    );
    assert_eq!(saved["saved"], 1);
    assert_eq!(saved["deleted"], 1);
    assert_eq!(saved["rejected"], 3);
    assert_eq!(saved["rejectedKeys"], json!(["2_0", "99_0", "abc"]));
    let codes: Vec<&str> = saved["errors"]
        .as_array()
        .expect("errors")
        .iter()
        .filter_map(|e| e["code"].as_str())
        .collect();
    assert_eq!(codes, vec!["bad_params", "out_of_range", "bad_key"]);

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "lessons.list",
        json!({ "userId": "alice", "scheduleId": schedule_id }),
    );
    let lessons = listed["lessons"].as_object().expect("lessons");
    assert_eq!(lessons.len(), 1);
    assert_eq!(lessons["0_0"]["subject_name"], "Math");
    assert_eq!(lessons["0_0"]["font_family"], "Georgia");
    assert_eq!(lessons["0_0"]["color"], "#FF6B6B");

    let stats = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "profile.stats",
        json!({ "userId": "alice" }),
    );
    assert_eq!(stats["scheduleCount"], 1);
    assert_eq!(stats["totalSlots"], 15);
    assert_eq!(stats["filledCells"], 1);
}

#[test]
fn save_all_accounts_for_every_submitted_edit() {
    let workspace = temp_dir("timetabled-save-all-duplicates");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let schedule_id = create_schedule(&mut stdin, &mut reader, "2", "alice", five_day_morning());

    let edits = json!({
        "0_1": { "subject_name": "A" },
        "00_1": { "subject_name": "B" },
        "2_2": { "subject_name": "C" }
    });
    let saved = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "lessons.saveAll",
        json!({ "userId": "alice", "scheduleId": schedule_id, "edits": edits }),
    );
    let submitted = edits.as_object().map(|o| o.len()).unwrap_or(0) as u64;
    assert_eq!(
        saved["saved"].as_u64().unwrap_or(0) + saved["rejected"].as_u64().unwrap_or(0),
        submitted
    );
    assert_eq!(saved["saved"], 2);
    assert_eq!(saved["rejectedKeys"], json!(["00_1"]));
    assert_eq!(saved["errors"][0]["code"], "duplicate_cell");

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "lessons.list",
        json!({ "userId": "alice", "scheduleId": schedule_id }),
    );
    assert_eq!(listed["lessons"]["0_1"]["subject_name"], "A");
}

#[test]
fn save_all_twice_leaves_identical_state() {
    let workspace = temp_dir("timetabled-save-all-idempotent");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let schedule_id = create_schedule(&mut stdin, &mut reader, "2", "alice", five_day_morning());
    let edits = json!({
        "0_0": { "subject_name": "Math" },
        "4_2": { "subject_name": "Art", "lesson_link": "https://example.org/art", "link_text": "board" }
    });

    let mut snapshots = Vec::new();
    for round in 0..2 {
        let saved = request_ok(
            &mut stdin,
            &mut reader,
            &format!("save-{}", round),
            "lessons.saveAll",
            json!({ "userId": "alice", "scheduleId": schedule_id, "edits": edits }),
        );
        assert_eq!(saved["saved"], 2);
        assert_eq!(saved["rejected"], 0);
        let listed = request_ok(
            &mut stdin,
            &mut reader,
            &format!("list-{}", round),
            "lessons.list",
            json!({ "userId": "alice", "scheduleId": schedule_id }),
        );
        snapshots.push(listed["lessons"].clone());
    }
    assert_eq!(snapshots[0], snapshots[1]);
    assert_eq!(snapshots[1]["4_2"]["link_text"], "board");

    let cleared = request_ok(
        &mut stdin,
        &mut reader,
        "clear",
        "lessons.saveAll",
        json!({ "userId": "alice", "scheduleId": schedule_id, "edits": {} }),
    );
    assert_eq!(cleared["deleted"], 2);
    assert_eq!(cleared["saved"], 0);
}

#[test]
fn save_all_payload_limit_returns_deterministic_rejection() {
    let workspace = temp_dir("timetabled-save-all-limit");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let schedule_id = create_schedule(&mut stdin, &mut reader, "2", "alice", five_day_morning());

    let mut edits = serde_json::Map::new();
    for i in 0..5001 {
        edits.insert(format!("{}_{}", i, 0), json!({ "subject_name": "x" }));
    }
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "lessons.saveAll",
        json!({ "userId": "alice", "scheduleId": schedule_id, "edits": edits }),
    );
    assert_eq!(result["limitExceeded"], true);
    assert_eq!(result["saved"], 0);
    assert_eq!(result["rejected"], 5001);
    assert_eq!(result["errors"][0]["code"], "too_many_edits");

    let missing = request(
        &mut stdin,
        &mut reader,
        "4",
        "lessons.saveAll",
        json!({ "userId": "alice", "scheduleId": schedule_id, "edits": [] }),
    );
    assert_eq!(error_code(&missing), "bad_params");
}

#[test]
fn update_one_touches_only_its_cell() {
    let workspace = temp_dir("timetabled-update-one");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let schedule_id = create_schedule(&mut stdin, &mut reader, "2", "alice", five_day_morning());

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "lessons.saveAll",
        json!({
            "userId": "alice",
            "scheduleId": schedule_id,
            "edits": {
                "0_0": { "subject_name": "Math" },
                "0_1": { "subject_name": "Physics" }
            }
        }),
    );
    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "lessons.updateOne",
        json!({
            "userId": "alice",
            "scheduleId": schedule_id,
            "dayIndex": 0,
            "lessonIndex": 0,
            "content": { "subject_name": "Chemistry", "font_family": "Bookman Old Style" }
        }),
    );
    assert_eq!(updated["lesson"]["subject_name"], "Chemistry");
    assert_eq!(updated["lesson"]["font_family"], "Arial");
    assert_eq!(updated["lesson"]["color"], "#FFFFFF");

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "lessons.list",
        json!({ "userId": "alice", "scheduleId": schedule_id }),
    );
    assert_eq!(listed["lessons"]["0_0"]["subject_name"], "Chemistry");
    assert_eq!(listed["lessons"]["0_1"]["subject_name"], "Physics");

    let out_of_range = request(
        &mut stdin,
        &mut reader,
        "6",
        "lessons.updateOne",
        json!({
            "userId": "alice",
            "scheduleId": schedule_id,
            "dayIndex": 0,
            "lessonIndex": 3,
            "content": { "subject_name": "Late" }
        }),
    );
    assert_eq!(error_code(&out_of_range), "out_of_range");
    assert_eq!(out_of_range["error"]["details"]["lessonIndex"], 3);

    let no_content = request(
        &mut stdin,
        &mut reader,
        "7",
        "lessons.updateOne",
        json!({ "userId": "alice", "scheduleId": schedule_id, "dayIndex": 0, "lessonIndex": 0 }),
    );
    assert_eq!(error_code(&no_content), "bad_params");
}
