use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{catalog_subject, db_conn, now_ms, optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::json;

fn friend_get(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    match optional_str(params, "subjectName")? {
        Some(subject) => {
            let meta = store::get_friend_meta(conn, &catalog_subject(conn, &subject)?)?;
            Ok(json!({ "friendMeta": meta }))
        }
        None => Ok(json!({ "friendMetas": store::list_friend_metas(conn)? })),
    }
}

fn friend_set_attendance(
    state: &AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let subject = catalog_subject(conn, &required_str(params, "subjectName")?)?;
    let count = params
        .get("attendanceCount")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params("attendanceCount must be an integer"))?;
    let meta = store::set_friend_attendance(conn, &subject, count, now_ms())?;
    Ok(json!({ "friendMeta": meta }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "friend.get" => friend_get(state, &req.params),
        "friend.setAttendance" => friend_set_attendance(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
