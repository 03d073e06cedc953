use crate::attendance;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{required_count, target_attendance};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn counts(params: &serde_json::Value, present_key: &str, total_key: &str) -> Result<(u64, u64), HandlerErr> {
    let present = required_count(params, present_key)?;
    let total = required_count(params, total_key)?;
    if present > total {
        return Err(HandlerErr::bad_params(format!(
            "{} must not exceed {}",
            present_key, total_key
        )));
    }
    Ok((present, total))
}

fn safe_zone(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let (present, total) = counts(params, "present", "total")?;
    let target = target_attendance(params, state.db.as_ref())?;
    Ok(json!({
        "targetAttendance": target,
        "safeZone": attendance::safe_zone(present, total, target),
    }))
}

fn combined_safe_zone(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let (class_present, class_total) = counts(params, "classPresent", "classTotal")?;
    let (lab_present, lab_total) = counts(params, "labPresent", "labTotal")?;
    let target = target_attendance(params, state.db.as_ref())?;
    Ok(json!({
        "targetAttendance": target,
        "safeZone": attendance::combined_safe_zone(
            class_present,
            class_total,
            lab_present,
            lab_total,
            target,
        ),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "attendance.safeZone" => safe_zone(state, &req.params),
        "attendance.combinedSafeZone" => combined_safe_zone(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
