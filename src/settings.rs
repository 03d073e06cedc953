use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db;

pub const DEFAULT_TARGET_ATTENDANCE: f64 = 75.0;
pub const DEFAULT_SUBJECTS: [&str; 4] = ["GenAI", "DM", "SD", "DVA"];

const KEY_TARGET: &str = "targetAttendance";
const KEY_SUBJECTS: &str = "subjects";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub target_attendance: f64,
    /// Base subject names; each is tracked as a Class and a Lab variant.
    pub subjects: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_attendance: DEFAULT_TARGET_ATTENDANCE,
            subjects: DEFAULT_SUBJECTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

pub fn validate_target(target: f64) -> Result<f64, String> {
    if target.is_finite() && target > 0.0 && target <= 100.0 {
        Ok(target)
    } else {
        Err("targetAttendance must be greater than 0 and at most 100".to_string())
    }
}

pub fn validate_subjects(raw: &[String]) -> Result<Vec<String>, String> {
    let mut out: Vec<String> = Vec::new();
    for s in raw {
        let t = s.trim();
        if t.is_empty() {
            return Err("subject names must not be empty".to_string());
        }
        if out.iter().any(|o| o.eq_ignore_ascii_case(t)) {
            return Err(format!("duplicate subject: {}", t));
        }
        out.push(t.to_string());
    }
    if out.is_empty() {
        return Err("at least one subject is required".to_string());
    }
    Ok(out)
}

/// Stored values that no longer validate fall back to the defaults.
pub fn load(conn: &Connection) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();
    if let Some(v) = db::settings_get_json(conn, KEY_TARGET)? {
        if let Some(t) = v.as_f64().and_then(|t| validate_target(t).ok()) {
            settings.target_attendance = t;
        }
    }
    if let Some(v) = db::settings_get_json(conn, KEY_SUBJECTS)? {
        if let Ok(list) = serde_json::from_value::<Vec<String>>(v) {
            if let Ok(list) = validate_subjects(&list) {
                settings.subjects = list;
            }
        }
    }
    Ok(settings)
}

pub fn save(conn: &Connection, settings: &Settings) -> anyhow::Result<()> {
    db::settings_set_json(conn, KEY_TARGET, &json!(settings.target_attendance))?;
    db::settings_set_json(conn, KEY_SUBJECTS, &json!(settings.subjects))?;
    Ok(())
}
