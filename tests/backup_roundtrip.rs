mod test_support;

use serde_json::json;
use test_support::{create_task, request_err, request_ok, select_workspace, spawn_sidecar, temp_dir};

fn task_count(
    stdin: &mut std::process::ChildStdin,
    reader: &mut std::io::BufReader<std::process::ChildStdout>,
    id: &str,
) -> usize {
    let res = request_ok(stdin, reader, id, "tasks.list", json!({}));
    res.get("tasks")
        .and_then(|v| v.as_array())
        .map(|a| a.len())
        .expect("tasks")
}

#[test]
fn export_then_import_restores_the_workspace() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let workspace = select_workspace(&mut stdin, &mut reader, "gradedesk-backup-src");

    for i in 0..3 {
        let _ = create_task(
            &mut stdin,
            &mut reader,
            &format!("c{}", i),
            json!({ "subjectName": "SD Class", "type": "assignment", "name": format!("A{}", i) }),
        );
    }
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "s",
        "settings.update",
        json!({ "targetAttendance": 85 }),
    );

    let bundle = temp_dir("gradedesk-backup-out").join("workspace.zip");
    let export = request_ok(
        &mut stdin,
        &mut reader,
        "e",
        "backup.exportWorkspace",
        json!({ "outPath": bundle.to_string_lossy() }),
    );
    assert_eq!(
        export.get("bundleFormat").and_then(|v| v.as_str()),
        Some("gradedesk-workspace-v1")
    );
    let digest = export
        .get("dbSha256")
        .and_then(|v| v.as_str())
        .expect("dbSha256")
        .to_string();
    assert!(bundle.is_file());

    let _ = create_task(
        &mut stdin,
        &mut reader,
        "extra",
        json!({ "subjectName": "SD Class", "type": "assignment", "name": "Later" }),
    );
    assert_eq!(task_count(&mut stdin, &mut reader, "n1"), 4);

    let import = request_ok(
        &mut stdin,
        &mut reader,
        "i",
        "backup.importWorkspace",
        json!({ "inPath": bundle.to_string_lossy() }),
    );
    assert_eq!(import.get("dbSha256").and_then(|v| v.as_str()), Some(digest.as_str()));
    assert_eq!(
        import.get("workspacePath").and_then(|v| v.as_str()),
        Some(workspace.to_string_lossy().as_ref())
    );
    assert_eq!(task_count(&mut stdin, &mut reader, "n2"), 3);
    let settings = request_ok(&mut stdin, &mut reader, "g", "settings.get", json!({}));
    assert_eq!(
        settings.pointer("/settings/targetAttendance").and_then(|v| v.as_f64()),
        Some(85.0)
    );

    // Import into a fresh workspace path.
    let other = temp_dir("gradedesk-backup-dst");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "i2",
        "backup.importWorkspace",
        json!({ "inPath": bundle.to_string_lossy(), "workspacePath": other.to_string_lossy() }),
    );
    assert_eq!(task_count(&mut stdin, &mut reader, "n3"), 3);
}

#[test]
fn import_rejects_bad_bundles() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "0",
            "backup.exportWorkspace",
            json!({ "outPath": "/tmp/never.zip" })
        ),
        "no_workspace"
    );
    let _ = select_workspace(&mut stdin, &mut reader, "gradedesk-backup-bad");

    let dir = temp_dir("gradedesk-backup-garbage");
    let garbage = dir.join("not-a-zip.zip");
    std::fs::write(&garbage, b"definitely not a zip").expect("write garbage");

    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "1",
            "backup.importWorkspace",
            json!({ "inPath": dir.join("missing.zip").to_string_lossy() })
        ),
        "not_found"
    );
    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "2",
            "backup.importWorkspace",
            json!({ "inPath": garbage.to_string_lossy() })
        ),
        "io_failed"
    );
    assert_eq!(
        request_err(&mut stdin, &mut reader, "3", "backup.importWorkspace", json!({})),
        "bad_params"
    );
    // The workspace stays usable after a rejected import.
    assert_eq!(task_count(&mut stdin, &mut reader, "4"), 0);
}

#[test]
fn rejected_import_elsewhere_keeps_the_open_workspace() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let workspace = select_workspace(&mut stdin, &mut reader, "gradedesk-backup-keep");
    let _ = create_task(
        &mut stdin,
        &mut reader,
        "c",
        json!({ "subjectName": "DVA Lab", "type": "project", "name": "Dashboards" }),
    );

    let dir = temp_dir("gradedesk-backup-keep-garbage");
    let garbage = dir.join("broken.zip");
    std::fs::write(&garbage, b"PK but not really").expect("write garbage");
    let elsewhere = temp_dir("gradedesk-backup-keep-other");
    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "i",
            "backup.importWorkspace",
            json!({ "inPath": garbage.to_string_lossy(), "workspacePath": elsewhere.to_string_lossy() })
        ),
        "io_failed"
    );

    let health = request_ok(&mut stdin, &mut reader, "h", "health", json!({}));
    assert_eq!(
        health.get("workspacePath").and_then(|v| v.as_str()),
        Some(workspace.to_string_lossy().as_ref())
    );
    assert_eq!(task_count(&mut stdin, &mut reader, "n"), 1);
    assert!(!elsewhere.join("gradedesk.sqlite3").exists());
}
