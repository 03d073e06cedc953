mod test_support;

use serde_json::json;
use std::io::{BufRead, Write};
use test_support::{request_err, request_ok, spawn_sidecar, temp_dir};

#[test]
fn health_and_workspace_selection() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(
        health.get("version").and_then(|v| v.as_str()),
        Some(env!("CARGO_PKG_VERSION"))
    );
    assert!(health.get("workspacePath").expect("workspacePath").is_null());

    let workspace = temp_dir("gradedesk-smoke");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let health = request_ok(&mut stdin, &mut reader, "3", "health", json!({}));
    assert_eq!(
        health.get("workspacePath").and_then(|v| v.as_str()),
        Some(workspace.to_string_lossy().as_ref())
    );
    assert!(workspace.join("gradedesk.sqlite3").is_file());
}

#[test]
fn errors_are_reported_with_codes() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    assert_eq!(
        request_err(&mut stdin, &mut reader, "1", "nope.method", json!({})),
        "not_implemented"
    );
    assert_eq!(
        request_err(&mut stdin, &mut reader, "2", "tasks.list", json!({})),
        "no_workspace"
    );
    assert_eq!(
        request_err(&mut stdin, &mut reader, "3", "workspace.select", json!({})),
        "bad_params"
    );

    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("json");
    assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        value.pointer("/error/code").and_then(|v| v.as_str()),
        Some("bad_json")
    );

    // The loop keeps serving after a bad line.
    let _ = request_ok(&mut stdin, &mut reader, "4", "health", json!({}));
}

#[test]
fn settings_defaults_and_validation() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let workspace = temp_dir("gradedesk-settings-ipc");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let got = request_ok(&mut stdin, &mut reader, "2", "settings.get", json!({}));
    assert_eq!(
        got.pointer("/settings/targetAttendance").and_then(|v| v.as_f64()),
        Some(75.0)
    );
    assert_eq!(
        got.pointer("/settings/subjects"),
        Some(&json!(["GenAI", "DM", "SD", "DVA"]))
    );

    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "3",
            "settings.update",
            json!({ "targetAttendance": 0 })
        ),
        "bad_params"
    );
    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "4",
            "settings.update",
            json!({ "subjects": ["DM", "dm"] })
        ),
        "bad_params"
    );

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "settings.update",
        json!({ "targetAttendance": 80, "subjects": [" DM ", "Compilers"] }),
    );
    assert_eq!(
        updated.pointer("/settings/subjects"),
        Some(&json!(["DM", "Compilers"]))
    );

    // Persisted across a restart.
    drop(stdin);
    let (_child2, mut stdin2, mut reader2) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin2,
        &mut reader2,
        "6",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let got = request_ok(&mut stdin2, &mut reader2, "7", "settings.get", json!({}));
    assert_eq!(
        got.pointer("/settings/targetAttendance").and_then(|v| v.as_f64()),
        Some(80.0)
    );
}
