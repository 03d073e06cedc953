use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "gradedesk.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS tasks(
            id TEXT PRIMARY KEY,
            subject_name TEXT NOT NULL,
            kind TEXT NOT NULL,
            number INTEGER NOT NULL,
            name TEXT NOT NULL,
            date TEXT,
            created_at INTEGER NOT NULL,
            completed_at INTEGER,
            completed INTEGER NOT NULL DEFAULT 0,
            present INTEGER,
            important INTEGER NOT NULL DEFAULT 0,
            entry_json TEXT
        )",
        [],
    )?;
    // Columns added after the first release.
    ensure_tasks_link(&conn)?;
    ensure_tasks_peer_completed(&conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tasks_subject ON tasks(subject_name)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tasks_subject_kind ON tasks(subject_name, kind)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tasks_created ON tasks(created_at, id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS friend_meta(
            subject_name TEXT PRIMARY KEY,
            attendance_count INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row("SELECT value_json FROM settings WHERE key = ?", [key], |r| {
            r.get(0)
        })
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

fn ensure_tasks_link(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "tasks", "link")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE tasks ADD COLUMN link TEXT", [])?;
    Ok(())
}

fn ensure_tasks_peer_completed(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "tasks", "peer_completed")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE tasks ADD COLUMN peer_completed INTEGER NOT NULL DEFAULT 0",
        [],
    )?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
