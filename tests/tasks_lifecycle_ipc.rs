mod test_support;

use serde_json::json;
use test_support::{
    create_task, request_err, request_ok, select_workspace, spawn_sidecar, task_id,
};

#[test]
fn create_numbers_and_completion_timestamps() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "gradedesk-tasks-lifecycle");

    let a1 = create_task(
        &mut stdin,
        &mut reader,
        "1",
        json!({ "subjectName": "dm class", "type": "assignment", "name": "Graphs" }),
    );
    assert_eq!(a1.get("subjectName").and_then(|v| v.as_str()), Some("DM Class"));
    assert_eq!(a1.get("number").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(a1.get("completed").and_then(|v| v.as_bool()), Some(false));
    assert!(a1.get("completedAt").expect("completedAt").is_null());
    assert!(a1.get("present").expect("present").is_null());

    let a2 = create_task(
        &mut stdin,
        &mut reader,
        "2",
        json!({ "subjectName": "DM Class", "type": "assignment", "name": "Trees", "date": "2024-03-01" }),
    );
    assert_eq!(a2.get("number").and_then(|v| v.as_i64()), Some(2));
    assert_eq!(a2.get("date").and_then(|v| v.as_str()), Some("2024-03-01"));

    let lecture = create_task(
        &mut stdin,
        &mut reader,
        "3",
        json!({ "subjectName": "DM Lab", "type": "lecture", "name": "Lab 1" }),
    );
    assert_eq!(lecture.get("number").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(lecture.get("completed").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(lecture.get("present").and_then(|v| v.as_bool()), Some(true));

    let done = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "tasks.update",
        json!({ "id": task_id(&a1), "completed": true, "link": "https://example.org/a1" }),
    );
    let completed_at = done
        .pointer("/task/completedAt")
        .and_then(|v| v.as_i64())
        .expect("completedAt set");
    assert!(completed_at > 0);
    assert_eq!(
        done.pointer("/task/link").and_then(|v| v.as_str()),
        Some("https://example.org/a1")
    );

    // Re-marking as complete keeps the original timestamp.
    let again = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "tasks.update",
        json!({ "id": task_id(&a1), "completed": true, "link": null }),
    );
    assert_eq!(
        again.pointer("/task/completedAt").and_then(|v| v.as_i64()),
        Some(completed_at)
    );
    assert!(again.pointer("/task/link").expect("link").is_null());

    let undone = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "tasks.update",
        json!({ "id": task_id(&a1), "completed": false }),
    );
    assert!(undone.pointer("/task/completedAt").expect("completedAt").is_null());

    let all = request_ok(&mut stdin, &mut reader, "7", "tasks.list", json!({}));
    assert_eq!(all.get("tasks").and_then(|v| v.as_array()).map(|a| a.len()), Some(3));
    let base = request_ok(&mut stdin, &mut reader, "8", "tasks.list", json!({ "subject": "DM" }));
    assert_eq!(base.get("tasks").and_then(|v| v.as_array()).map(|a| a.len()), Some(3));
    let lab = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "tasks.list",
        json!({ "subject": "DM Lab" }),
    );
    assert_eq!(lab.get("tasks").and_then(|v| v.as_array()).map(|a| a.len()), Some(1));

    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "tasks.delete",
        json!({ "id": task_id(&a2) }),
    );
    assert_eq!(
        deleted.get("deleted").and_then(|v| v.as_str()),
        Some(task_id(&a2).as_str())
    );
    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "11",
            "tasks.delete",
            json!({ "id": task_id(&a2) })
        ),
        "not_found"
    );
}

#[test]
fn rejects_invalid_tasks() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "gradedesk-tasks-invalid");

    let cases = [
        json!({ "subjectName": "Chemistry Class", "type": "assignment", "name": "x" }),
        json!({ "subjectName": "DM", "type": "assignment", "name": "x" }),
        json!({ "subjectName": "DM Class", "type": "homework", "name": "x" }),
        json!({ "subjectName": "DM Class", "type": "assignment", "name": "  " }),
        json!({ "subjectName": "DM Class", "type": "assignment", "name": "x", "date": "03/01/2024" }),
        json!({ "subjectName": "DM Class", "type": "assignment", "name": "x", "present": true }),
        json!({ "subjectName": "DM Class", "type": "contest", "name": "x", "components": [] }),
        json!({ "subjectName": "DM Class", "type": "contest", "name": "x" }),
    ];
    let expected = [
        "not_found",
        "bad_params",
        "bad_params",
        "bad_params",
        "bad_params",
        "bad_params",
        "no_components",
        "no_components",
    ];
    for (i, (params, code)) in cases.into_iter().zip(expected).enumerate() {
        let got = request_err(
            &mut stdin,
            &mut reader,
            &format!("c{}", i),
            "tasks.create",
            params,
        );
        assert_eq!(got, code, "case {}", i);
    }

    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "u1",
            "tasks.update",
            json!({ "id": "missing", "name": "x" })
        ),
        "not_found"
    );
    let list = request_ok(&mut stdin, &mut reader, "l", "tasks.list", json!({}));
    assert_eq!(list.get("tasks").and_then(|v| v.as_array()).map(|a| a.len()), Some(0));
}

#[test]
fn scored_entry_keeps_its_max_marks_snapshot() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "gradedesk-tasks-scored");

    let contest = create_task(
        &mut stdin,
        &mut reader,
        "1",
        json!({
            "subjectName": "GenAI Class",
            "type": "contest",
            "name": "Contest 1",
            "components": [
                { "component": "quiz", "correct": { "primary": 8, "peer": 5 }, "total": 10, "weight": 50 },
                { "component": "coding", "correct": { "primary": 2, "peer": 4 }, "total": 4, "weight": 50 }
            ]
        }),
    );
    // GenAI contests: 10 points over 2 entries.
    assert_eq!(contest.pointer("/entry/maxMarks").and_then(|v| v.as_f64()), Some(5.0));
    assert_eq!(
        contest.pointer("/entry/marks/primary").and_then(|v| v.as_f64()),
        Some(3.25)
    );
    assert_eq!(
        contest.pointer("/entry/marks/peer").and_then(|v| v.as_f64()),
        Some(3.75)
    );

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "tasks.update",
        json!({
            "id": task_id(&contest),
            "components": [
                { "component": "written", "correct": { "primary": 10, "peer": 0 }, "total": 10, "weight": 100 }
            ]
        }),
    );
    assert_eq!(
        updated.pointer("/task/entry/marks/primary").and_then(|v| v.as_f64()),
        Some(5.0)
    );
    assert_eq!(
        updated.pointer("/task/entry/marks/peer").and_then(|v| v.as_f64()),
        Some(0.0)
    );
}
