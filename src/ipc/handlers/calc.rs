use crate::calc;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{catalog_base, db_conn, parse_field, required_str, target_attendance};
use crate::ipc::types::{AppState, Request};
use crate::model::{ComponentScore, TaskKind};
use crate::settings;
use crate::store;
use crate::weights::{self, Category};
use serde_json::json;

fn subjects_weights(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    if let Some(subject) = params.get("subject").and_then(|v| v.as_str()) {
        let w = weights::resolve(subject);
        return Ok(json!({
            "subject": subject,
            "weighting": w,
            "totalPoints": w.weights.total_points(),
            "entryMaxMarks": {
                "contest": w.entry_max_marks(Category::Contest),
                "midSem": w.entry_max_marks(Category::MidSem),
                "endSem": w.entry_max_marks(Category::EndSem),
            }
        }));
    }
    let conn = db_conn(state)?;
    let subjects = settings::load(conn)
        .map_err(|e| HandlerErr::new("db_query_failed", format!("{:#}", e)))?
        .subjects;
    let rows: Vec<serde_json::Value> = subjects
        .iter()
        .map(|s| json!({ "subject": s, "weighting": weights::resolve(s) }))
        .collect();
    Ok(json!({ "subjects": rows }))
}

/// Previews an entry's marks without saving; the form uses this while the user types.
fn entry_marks(_state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let subject = required_str(params, "subjectName")?;
    let raw_kind = required_str(params, "type")?;
    let kind = TaskKind::parse(&raw_kind)
        .ok_or_else(|| HandlerErr::bad_params(format!("unknown task type: {}", raw_kind)))?;
    let components = parse_field::<Vec<ComponentScore>>(params, "components")?.unwrap_or_default();
    let weighting = weights::resolve(&subject);
    let m = calc::compute_entry_marks(&weighting, kind, &components).map_err(|e| HandlerErr {
        code: e.code,
        message: e.message,
        details: e.details,
    })?;
    Ok(json!({ "entry": m }))
}

fn subject_summary(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    // A variant name ("DM Class") summarizes its whole subject.
    let base = catalog_base(conn, &required_str(params, "subject")?)?;
    let target = target_attendance(params, Some(conn))?;
    let tasks = store::list_tasks(conn, Some(&base))?;
    let metas = store::list_friend_metas(conn)?;
    let summary = calc::summarize_subject(&base, &tasks, &metas, target);
    Ok(json!({ "targetAttendance": target, "summary": summary }))
}

fn overview(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let target = target_attendance(params, Some(conn))?;
    let subjects = settings::load(conn)
        .map_err(|e| HandlerErr::new("db_query_failed", format!("{:#}", e)))?
        .subjects;
    let tasks = store::list_tasks(conn, None)?;
    let metas = store::list_friend_metas(conn)?;
    let overview = calc::summarize_overview(&subjects, &tasks, &metas, target);
    Ok(json!({ "targetAttendance": target, "overview": overview }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "subjects.weights" => subjects_weights(state, &req.params),
        "calc.entryMarks" => entry_marks(state, &req.params),
        "calc.subjectSummary" => subject_summary(state, &req.params),
        "calc.overview" => overview(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
