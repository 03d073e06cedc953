use rusqlite::Connection;
use serde::de::DeserializeOwned;

use crate::ipc::error::HandlerErr;
use crate::ipc::types::AppState;
use crate::model::SubjectName;
use crate::settings;

pub fn db_conn(state: &AppState) -> Result<&Connection, HandlerErr> {
    state
        .db
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

pub fn required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn optional_str(params: &serde_json::Value, key: &str) -> Result<Option<String>, HandlerErr> {
    match params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a string", key))),
    }
}

/// Absent leaves a field alone; `null` clears it.
pub fn nullable_str(
    params: &serde_json::Value,
    key: &str,
) -> Result<Option<Option<String>>, HandlerErr> {
    match params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(Some(None)),
        Some(v) => v
            .as_str()
            .map(|s| Some(Some(s.to_string())))
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a string or null", key))),
    }
}

pub fn optional_bool(params: &serde_json::Value, key: &str) -> Result<Option<bool>, HandlerErr> {
    match params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_bool()
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a boolean", key))),
    }
}

pub fn optional_i64(params: &serde_json::Value, key: &str) -> Result<Option<i64>, HandlerErr> {
    match params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be an integer", key))),
    }
}

pub fn required_count(params: &serde_json::Value, key: &str) -> Result<u64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a non-negative integer", key)))
}

pub fn parse_field<T: DeserializeOwned>(
    params: &serde_json::Value,
    key: &str,
) -> Result<Option<T>, HandlerErr> {
    match params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => serde_json::from_value(v.clone())
            .map(Some)
            .map_err(|e| HandlerErr::bad_params(format!("invalid {}: {}", key, e))),
    }
}

/// Explicit `targetAttendance` param, else the workspace setting, else the default.
pub fn target_attendance(
    params: &serde_json::Value,
    conn: Option<&Connection>,
) -> Result<f64, HandlerErr> {
    if let Some(v) = params.get("targetAttendance").filter(|v| !v.is_null()) {
        let t = v
            .as_f64()
            .ok_or_else(|| HandlerErr::bad_params("targetAttendance must be a number"))?;
        return settings::validate_target(t).map_err(HandlerErr::bad_params);
    }
    match conn {
        Some(conn) => settings::load(conn)
            .map(|s| s.target_attendance)
            .map_err(|e| HandlerErr::new("db_query_failed", format!("{:#}", e))),
        None => Ok(settings::DEFAULT_TARGET_ATTENDANCE),
    }
}

/// Catalog spelling of the base subject named by `raw` ("dm lab" -> "DM").
pub fn catalog_base(conn: &Connection, raw: &str) -> Result<String, HandlerErr> {
    let subjects = settings::load(conn)
        .map_err(|e| HandlerErr::new("db_query_failed", format!("{:#}", e)))?
        .subjects;
    let name = SubjectName::parse(raw);
    match subjects.iter().find(|s| s.eq_ignore_ascii_case(&name.base)) {
        Some(base) => Ok(base.clone()),
        None => Err(
            HandlerErr::new("not_found", format!("unknown subject: {}", name.base))
                .with_details(serde_json::json!({ "subjects": subjects })),
        ),
    }
}

/// Respells a "<subject> Class|Lab" name with the catalog's casing. Names without a variant
/// pass through for the store to reject.
pub fn catalog_subject(conn: &Connection, raw: &str) -> Result<String, HandlerErr> {
    let base = catalog_base(conn, raw)?;
    Ok(match SubjectName::parse(raw).variant {
        Some(v) => SubjectName::full(&base, v),
        None => raw.to_string(),
    })
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
