use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{db_conn, parse_field};
use crate::ipc::types::{AppState, Request};
use crate::settings;
use serde_json::json;

fn load(conn: &rusqlite::Connection) -> Result<settings::Settings, HandlerErr> {
    settings::load(conn).map_err(|e| HandlerErr::new("db_query_failed", format!("{:#}", e)))
}

fn settings_get(state: &AppState, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    Ok(json!({ "settings": load(conn)? }))
}

fn settings_update(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let mut current = load(conn)?;

    if let Some(t) = parse_field::<f64>(params, "targetAttendance")? {
        current.target_attendance = settings::validate_target(t).map_err(HandlerErr::bad_params)?;
    }
    if let Some(list) = parse_field::<Vec<String>>(params, "subjects")? {
        current.subjects = settings::validate_subjects(&list).map_err(HandlerErr::bad_params)?;
    }

    settings::save(conn, &current)
        .map_err(|e| HandlerErr::new("db_update_failed", format!("{:#}", e)))?;
    tracing::info!(
        target_attendance = current.target_attendance,
        subjects = current.subjects.len(),
        "settings updated"
    );
    Ok(json!({ "settings": current }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "settings.get" => settings_get(state, &req.params),
        "settings.update" => settings_update(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
