use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::fmt;
use uuid::Uuid;

use crate::calc::{self, CalcError};
use crate::model::{ComponentScore, FriendMeta, ScoredEntry, SubjectName, Task, TaskKind};
use crate::weights;

#[derive(Debug)]
pub enum StoreError {
    NotFound(String),
    Invalid(CalcError),
    Db(anyhow::Error),
}

impl StoreError {
    fn invalid(message: impl Into<String>) -> Self {
        StoreError::Invalid(CalcError::new("bad_params", message))
    }

    pub fn code(&self) -> &str {
        match self {
            StoreError::NotFound(_) => "not_found",
            StoreError::Invalid(e) => &e.code,
            StoreError::Db(_) => "db_query_failed",
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(what) => write!(f, "{} not found", what),
            StoreError::Invalid(e) => write!(f, "{}", e.message),
            StoreError::Db(e) => write!(f, "{:#}", e),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Db(e.into())
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(e: anyhow::Error) -> Self {
        StoreError::Db(e)
    }
}

impl From<CalcError> for StoreError {
    fn from(e: CalcError) -> Self {
        StoreError::Invalid(e)
    }
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub subject_name: String,
    pub kind: TaskKind,
    pub name: String,
    pub number: Option<i64>,
    pub date: Option<String>,
    pub link: Option<String>,
    pub completed: Option<bool>,
    pub present: Option<bool>,
    pub important: bool,
    pub peer_completed: bool,
    pub components: Option<Vec<ComponentScore>>,
}

/// Partial update. `Some(None)` on `date`/`link` clears the field.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub number: Option<i64>,
    pub date: Option<Option<String>>,
    pub link: Option<Option<String>>,
    pub completed: Option<bool>,
    pub present: Option<bool>,
    pub important: Option<bool>,
    pub peer_completed: Option<bool>,
    pub components: Option<Vec<ComponentScore>>,
}

fn validate_subject(raw: &str) -> Result<String, StoreError> {
    let name = SubjectName::parse(raw);
    match name.variant {
        Some(v) if !name.base.is_empty() => Ok(SubjectName::full(&name.base, v)),
        _ => Err(StoreError::invalid(
            "subjectName must be '<subject> Class' or '<subject> Lab'",
        )),
    }
}

fn validate_name(raw: &str) -> Result<String, StoreError> {
    let t = raw.trim();
    if t.is_empty() {
        return Err(StoreError::invalid("name must not be empty"));
    }
    Ok(t.to_string())
}

fn normalize_date(raw: Option<String>) -> Result<Option<String>, StoreError> {
    let Some(raw) = raw else { return Ok(None) };
    let t = raw.trim();
    if t.is_empty() {
        return Ok(None);
    }
    chrono::NaiveDate::parse_from_str(t, "%Y-%m-%d")
        .map_err(|_| StoreError::invalid("date must be YYYY-MM-DD"))?;
    Ok(Some(t.to_string()))
}

fn normalize_link(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Scores against the weighting in force right now; the stored `max_marks` is a snapshot.
fn score_entry(
    subject_name: &str,
    kind: TaskKind,
    components: Vec<ComponentScore>,
) -> Result<ScoredEntry, StoreError> {
    for c in &components {
        if !(0.0..=100.0).contains(&c.weight) {
            return Err(StoreError::invalid("component weight must be between 0 and 100"));
        }
        if c.correct.primary < 0.0 || c.correct.peer < 0.0 || c.total.unwrap_or(0.0) < 0.0 {
            return Err(StoreError::invalid("component counts must not be negative"));
        }
    }
    let weighting = weights::resolve(subject_name);
    let m = calc::compute_entry_marks(&weighting, kind, &components)?;
    Ok(ScoredEntry {
        components,
        marks: m.marks,
        max_marks: m.max_marks,
    })
}

struct TaskRow {
    id: String,
    subject_name: String,
    kind: String,
    number: i64,
    name: String,
    date: Option<String>,
    link: Option<String>,
    created_at: i64,
    completed_at: Option<i64>,
    completed: i64,
    present: Option<i64>,
    important: i64,
    peer_completed: i64,
    entry_json: Option<String>,
}

impl TaskRow {
    fn into_task(self) -> anyhow::Result<Task> {
        let kind = TaskKind::parse(&self.kind)
            .with_context(|| format!("task {} has unknown kind {}", self.id, self.kind))?;
        let entry = match self.entry_json {
            Some(s) => Some(
                serde_json::from_str::<ScoredEntry>(&s)
                    .with_context(|| format!("task {} has unreadable entry", self.id))?,
            ),
            None => None,
        };
        Ok(Task {
            id: self.id,
            subject_name: self.subject_name,
            kind,
            number: self.number,
            name: self.name,
            date: self.date,
            link: self.link,
            created_at: self.created_at,
            completed_at: self.completed_at,
            completed: self.completed != 0,
            present: self.present.map(|v| v != 0),
            important: self.important != 0,
            peer_completed: self.peer_completed != 0,
            entry,
        })
    }
}

const TASK_COLUMNS: &str = "id, subject_name, kind, number, name, date, link, created_at,
     completed_at, completed, present, important, peer_completed, entry_json";

fn read_task_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<TaskRow> {
    Ok(TaskRow {
        id: r.get(0)?,
        subject_name: r.get(1)?,
        kind: r.get(2)?,
        number: r.get(3)?,
        name: r.get(4)?,
        date: r.get(5)?,
        link: r.get(6)?,
        created_at: r.get(7)?,
        completed_at: r.get(8)?,
        completed: r.get(9)?,
        present: r.get(10)?,
        important: r.get(11)?,
        peer_completed: r.get(12)?,
        entry_json: r.get(13)?,
    })
}

pub fn get_task(conn: &Connection, id: &str) -> Result<Option<Task>, StoreError> {
    let sql = format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS);
    let row = conn.query_row(&sql, [id], read_task_row).optional()?;
    Ok(row.map(TaskRow::into_task).transpose()?)
}

/// All tasks in creation order. `subject` may name one variant ("DM Lab") or a base ("DM").
pub fn list_tasks(conn: &Connection, subject: Option<&str>) -> Result<Vec<Task>, StoreError> {
    let sql = format!(
        "SELECT {} FROM tasks ORDER BY created_at, id",
        TASK_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], read_task_row)?
        .collect::<Result<Vec<_>, _>>()?;
    let mut tasks = Vec::with_capacity(rows.len());
    for row in rows {
        tasks.push(row.into_task()?);
    }

    let Some(subject) = subject else {
        return Ok(tasks);
    };
    let wanted = SubjectName::parse(subject);
    tasks.retain(|t| {
        let name = SubjectName::parse(&t.subject_name);
        name.base.eq_ignore_ascii_case(&wanted.base)
            && (wanted.variant.is_none() || wanted.variant == name.variant)
    });
    Ok(tasks)
}

fn next_number(conn: &Connection, subject_name: &str, kind: TaskKind) -> Result<i64, StoreError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM tasks WHERE subject_name = ? COLLATE NOCASE AND kind = ?",
        (subject_name, kind.as_str()),
        |r| r.get(0),
    )?;
    Ok(count + 1)
}

/// Shifts an existing friend counter; subjects without one keep following the primary count.
fn apply_friend_delta(
    conn: &Connection,
    subject_name: &str,
    delta: i64,
    now: i64,
) -> Result<(), StoreError> {
    if delta == 0 {
        return Ok(());
    }
    conn.execute(
        "UPDATE friend_meta
         SET attendance_count = MAX(0, attendance_count + ?), updated_at = ?
         WHERE subject_name = ? COLLATE NOCASE",
        (delta, now, subject_name),
    )?;
    Ok(())
}

fn write_task(conn: &Connection, task: &Task, insert: bool) -> Result<(), StoreError> {
    let entry_json = task
        .entry
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(anyhow::Error::from)?;
    let sql = if insert {
        "INSERT INTO tasks(subject_name, kind, number, name, date, link, created_at,
             completed_at, completed, present, important, peer_completed, entry_json, id)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    } else {
        "UPDATE tasks SET subject_name = ?, kind = ?, number = ?, name = ?, date = ?, link = ?,
             created_at = ?, completed_at = ?, completed = ?, present = ?, important = ?,
             peer_completed = ?, entry_json = ?
         WHERE id = ?"
    };
    conn.execute(
        sql,
        rusqlite::params![
            task.subject_name,
            task.kind.as_str(),
            task.number,
            task.name,
            task.date,
            task.link,
            task.created_at,
            task.completed_at,
            task.completed as i64,
            task.present.map(|p| p as i64),
            task.important as i64,
            task.peer_completed as i64,
            entry_json,
            task.id,
        ],
    )?;
    Ok(())
}

pub fn create_task(conn: &Connection, new: NewTask, now: i64) -> Result<Task, StoreError> {
    let subject_name = validate_subject(&new.subject_name)?;
    let name = validate_name(&new.name)?;
    let date = normalize_date(new.date)?;

    let entry = if new.kind.is_scored() {
        Some(score_entry(
            &subject_name,
            new.kind,
            new.components.unwrap_or_default(),
        )?)
    } else if new.components.is_some() {
        return Err(StoreError::invalid(format!(
            "{} tasks do not take components",
            new.kind.as_str()
        )));
    } else {
        None
    };

    let is_lecture = new.kind == TaskKind::Lecture;
    if !is_lecture && new.present.is_some() {
        return Err(StoreError::invalid("present applies to lectures only"));
    }
    if let Some(n) = new.number {
        if n < 1 {
            return Err(StoreError::invalid("number must be at least 1"));
        }
    }

    let tx = conn.unchecked_transaction()?;
    let number = match new.number {
        Some(n) => n,
        None => next_number(&tx, &subject_name, new.kind)?,
    };
    let completed = new.completed.unwrap_or(is_lecture);
    let task = Task {
        id: Uuid::new_v4().to_string(),
        subject_name,
        kind: new.kind,
        number,
        name,
        date,
        link: normalize_link(new.link),
        created_at: now,
        completed_at: completed.then_some(now),
        completed,
        present: is_lecture.then(|| new.present.unwrap_or(true)),
        important: new.important,
        peer_completed: new.peer_completed,
        entry,
    };
    write_task(&tx, &task, true)?;
    if is_lecture && task.is_present() {
        apply_friend_delta(&tx, &task.subject_name, 1, now)?;
    }
    tx.commit()?;

    tracing::debug!(
        id = %task.id,
        subject = %task.subject_name,
        kind = task.kind.as_str(),
        "task created"
    );
    Ok(task)
}

pub fn update_task(
    conn: &Connection,
    id: &str,
    patch: TaskPatch,
    now: i64,
) -> Result<Task, StoreError> {
    let tx = conn.unchecked_transaction()?;
    let Some(before) = get_task(&tx, id)? else {
        return Err(StoreError::NotFound(format!("task {}", id)));
    };
    let mut task = before.clone();

    if let Some(name) = patch.name {
        task.name = validate_name(&name)?;
    }
    if let Some(n) = patch.number {
        if n < 1 {
            return Err(StoreError::invalid("number must be at least 1"));
        }
        task.number = n;
    }
    if let Some(date) = patch.date {
        task.date = normalize_date(date)?;
    }
    if let Some(link) = patch.link {
        task.link = normalize_link(link);
    }
    if let Some(important) = patch.important {
        task.important = important;
    }
    if let Some(peer_completed) = patch.peer_completed {
        task.peer_completed = peer_completed;
    }
    if let Some(completed) = patch.completed {
        if completed && !before.completed {
            task.completed_at = Some(now);
        } else if !completed {
            task.completed_at = None;
        }
        task.completed = completed;
    }
    if let Some(present) = patch.present {
        if task.kind != TaskKind::Lecture {
            return Err(StoreError::invalid("present applies to lectures only"));
        }
        task.present = Some(present);
    }
    if let Some(components) = patch.components {
        if !task.kind.is_scored() {
            return Err(StoreError::invalid(format!(
                "{} tasks do not take components",
                task.kind.as_str()
            )));
        }
        task.entry = Some(score_entry(&task.subject_name, task.kind, components)?);
    }

    write_task(&tx, &task, false)?;
    if task.kind == TaskKind::Lecture {
        let delta = task.is_present() as i64 - before.is_present() as i64;
        apply_friend_delta(&tx, &task.subject_name, delta, now)?;
    }
    tx.commit()?;
    Ok(task)
}

pub fn delete_task(conn: &Connection, id: &str, now: i64) -> Result<Task, StoreError> {
    let tx = conn.unchecked_transaction()?;
    let Some(task) = get_task(&tx, id)? else {
        return Err(StoreError::NotFound(format!("task {}", id)));
    };
    tx.execute("DELETE FROM tasks WHERE id = ?", [id])?;
    if task.kind == TaskKind::Lecture && task.is_present() {
        apply_friend_delta(&tx, &task.subject_name, -1, now)?;
    }
    tx.commit()?;
    tracing::debug!(id = %task.id, subject = %task.subject_name, "task deleted");
    Ok(task)
}

pub fn list_friend_metas(conn: &Connection) -> Result<Vec<FriendMeta>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT subject_name, attendance_count, updated_at
         FROM friend_meta
         ORDER BY subject_name",
    )?;
    let metas = stmt
        .query_map([], |r| {
            Ok(FriendMeta {
                subject_name: r.get(0)?,
                attendance_count: r.get(1)?,
                updated_at: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(metas)
}

pub fn get_friend_meta(conn: &Connection, subject: &str) -> Result<Option<FriendMeta>, StoreError> {
    let subject_name = validate_subject(subject)?;
    Ok(list_friend_metas(conn)?
        .into_iter()
        .find(|m| m.subject_name == subject_name))
}

/// Creates the subject's friend counter on first use.
pub fn set_friend_attendance(
    conn: &Connection,
    subject: &str,
    count: i64,
    now: i64,
) -> Result<FriendMeta, StoreError> {
    let subject_name = validate_subject(subject)?;
    if count < 0 {
        return Err(StoreError::invalid("attendanceCount must not be negative"));
    }
    conn.execute(
        "INSERT INTO friend_meta(subject_name, attendance_count, updated_at) VALUES(?, ?, ?)
         ON CONFLICT(subject_name) DO UPDATE SET
           attendance_count = excluded.attendance_count,
           updated_at = excluded.updated_at",
        (&subject_name, count, now),
    )?;
    Ok(FriendMeta {
        subject_name,
        attendance_count: count,
        updated_at: now,
    })
}
