use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{
    catalog_subject, db_conn, now_ms, nullable_str, optional_bool, optional_i64, optional_str,
    parse_field, required_str,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{ComponentScore, TaskKind};
use crate::store::{self, NewTask, TaskPatch};
use serde_json::json;

fn parse_kind(params: &serde_json::Value) -> Result<TaskKind, HandlerErr> {
    let raw = required_str(params, "type")?;
    TaskKind::parse(&raw).ok_or_else(|| {
        HandlerErr::bad_params(format!("unknown task type: {}", raw)).with_details(json!({
            "allowed": ["lecture", "assignment", "quiz", "project", "contest", "midSem", "endSem"]
        }))
    })
}

fn tasks_list(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let subject = optional_str(params, "subject")?;
    let tasks = store::list_tasks(conn, subject.as_deref())?;
    Ok(json!({ "tasks": tasks }))
}

fn tasks_create(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let subject_name = catalog_subject(conn, &required_str(params, "subjectName")?)?;

    let new = NewTask {
        subject_name,
        kind: parse_kind(params)?,
        name: required_str(params, "name")?,
        number: optional_i64(params, "number")?,
        date: optional_str(params, "date")?,
        link: optional_str(params, "link")?,
        completed: optional_bool(params, "completed")?,
        present: optional_bool(params, "present")?,
        important: optional_bool(params, "important")?.unwrap_or(false),
        peer_completed: optional_bool(params, "peerCompleted")?.unwrap_or(false),
        components: parse_field::<Vec<ComponentScore>>(params, "components")?,
    };
    let task = store::create_task(conn, new, now_ms())?;
    Ok(json!({ "task": task }))
}

fn tasks_update(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let id = required_str(params, "id")?;
    let patch = TaskPatch {
        name: optional_str(params, "name")?,
        number: optional_i64(params, "number")?,
        date: nullable_str(params, "date")?,
        link: nullable_str(params, "link")?,
        completed: optional_bool(params, "completed")?,
        present: optional_bool(params, "present")?,
        important: optional_bool(params, "important")?,
        peer_completed: optional_bool(params, "peerCompleted")?,
        components: parse_field::<Vec<ComponentScore>>(params, "components")?,
    };
    let task = store::update_task(conn, &id, patch, now_ms())?;
    Ok(json!({ "task": task }))
}

fn tasks_delete(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let id = required_str(params, "id")?;
    let task = store::delete_task(conn, &id, now_ms())?;
    Ok(json!({ "deleted": task.id }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "tasks.list" => tasks_list(state, &req.params),
        "tasks.create" => tasks_create(state, &req.params),
        "tasks.update" => tasks_update(state, &req.params),
        "tasks.delete" => tasks_delete(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
