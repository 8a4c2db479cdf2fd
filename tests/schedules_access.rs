mod test_support;

use serde_json::json;
use test_support::{create_schedule, error_code, request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn foreign_and_missing_schedules_are_refused_everywhere() {
    let workspace = temp_dir("timetabled-access");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let no_workspace = request(
        &mut stdin,
        &mut reader,
        "0",
        "schedules.list",
        json!({ "userId": "alice" }),
    );
    assert_eq!(error_code(&no_workspace), "no_workspace");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let schedule_id = create_schedule(
        &mut stdin,
        &mut reader,
        "2",
        "alice",
        json!({ "title": "Private", "days": ["mon"], "startTime": "08:00", "endTime": "10:00" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "lessons.updateOne",
        json!({
            "userId": "alice",
            "scheduleId": schedule_id,
            "dayIndex": 0,
            "lessonIndex": 0,
            "content": { "subject_name": "Math" }
        }),
    );

    let calls = [
        ("schedules.open", json!({ "mode": "edit" })),
        ("schedules.updateTitle", json!({ "title": "Mine now" })),
        ("schedules.delete", json!({})),
        ("lessons.list", json!({})),
        ("lessons.saveAll", json!({ "edits": {} })),
        (
            "lessons.updateOne",
            json!({ "dayIndex": 0, "lessonIndex": 0, "content": { "subject_name": "x" } }),
        ),
    ];
    for (i, (method, extra)) in calls.iter().enumerate() {
        for (user, target, expected) in [
            ("mallory", schedule_id.as_str(), "access_denied"),
            ("alice", "no-such-schedule", "not_found"),
        ] {
            let mut params = extra.clone();
            params["userId"] = json!(user);
            params["scheduleId"] = json!(target);
            let resp = request(
                &mut stdin,
                &mut reader,
                &format!("{}-{}-{}", i, user, expected),
                method,
                params,
            );
            assert_eq!(error_code(&resp), expected, "{} as {}", method, user);
        }
    }

    // Nothing the refused calls attempted may have landed.
    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "after",
        "schedules.open",
        json!({ "userId": "alice", "scheduleId": schedule_id }),
    );
    assert_eq!(opened["schedule"]["title"], "Private");
    assert_eq!(opened["lessons"]["0_0"]["subject_name"], "Math");
}
