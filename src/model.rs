use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskKind {
    Lecture,
    Assignment,
    Quiz,
    Project,
    Contest,
    MidSem,
    EndSem,
}

impl TaskKind {
    pub fn parse(s: &str) -> Option<TaskKind> {
        match s {
            "lecture" => Some(TaskKind::Lecture),
            "assignment" => Some(TaskKind::Assignment),
            "quiz" => Some(TaskKind::Quiz),
            "project" => Some(TaskKind::Project),
            "contest" => Some(TaskKind::Contest),
            "midSem" => Some(TaskKind::MidSem),
            "endSem" => Some(TaskKind::EndSem),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Lecture => "lecture",
            TaskKind::Assignment => "assignment",
            TaskKind::Quiz => "quiz",
            TaskKind::Project => "project",
            TaskKind::Contest => "contest",
            TaskKind::MidSem => "midSem",
            TaskKind::EndSem => "endSem",
        }
    }

    /// Kinds whose records carry quiz/coding/written component scores.
    pub fn is_scored(self) -> bool {
        matches!(self, TaskKind::Contest | TaskKind::MidSem | TaskKind::EndSem)
    }
}

/// A tracked person. `Primary` owns the dashboard; `Peer` is the friend being compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Party {
    Primary,
    Peer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerParty<T> {
    pub primary: T,
    pub peer: T,
}

impl<T> PerParty<T> {
    pub fn new(primary: T, peer: T) -> Self {
        Self { primary, peer }
    }

    pub fn from_fn(mut f: impl FnMut(Party) -> T) -> Self {
        Self {
            primary: f(Party::Primary),
            peer: f(Party::Peer),
        }
    }

    pub fn get(&self, party: Party) -> &T {
        match party {
            Party::Primary => &self.primary,
            Party::Peer => &self.peer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Component {
    Quiz,
    Coding,
    Written,
}

/// One enabled component of a contest or exam entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentScore {
    pub component: Component,
    pub correct: PerParty<f64>,
    #[serde(default)]
    pub total: Option<f64>,
    /// Share of the entry's internal split, 0-100.
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredEntry {
    pub components: Vec<ComponentScore>,
    pub marks: PerParty<f64>,
    /// Snapshot taken when the entry was last saved; never re-derived from the weight table.
    pub max_marks: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub subject_name: String,
    pub kind: TaskKind,
    pub number: i64,
    pub name: String,
    pub date: Option<String>,
    pub link: Option<String>,
    pub created_at: i64,
    pub completed_at: Option<i64>,
    pub completed: bool,
    pub present: Option<bool>,
    pub important: bool,
    pub peer_completed: bool,
    pub entry: Option<ScoredEntry>,
}

impl Task {
    /// Unmarked lectures count as attended.
    pub fn is_present(&self) -> bool {
        self.present != Some(false)
    }

    pub fn activity_at(&self) -> i64 {
        self.completed_at.unwrap_or(self.created_at)
    }

    pub fn marks(&self, party: Party) -> f64 {
        self.entry.as_ref().map(|e| *e.marks.get(party)).unwrap_or(0.0)
    }

    pub fn max_marks(&self) -> f64 {
        self.entry.as_ref().map(|e| e.max_marks).unwrap_or(0.0)
    }
}

/// The peer's running lecture-attendance count for one subject variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendMeta {
    pub subject_name: String,
    pub attendance_count: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Variant {
    Class,
    Lab,
}

impl Variant {
    pub fn suffix(self) -> &'static str {
        match self {
            Variant::Class => "Class",
            Variant::Lab => "Lab",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectName {
    pub base: String,
    pub variant: Option<Variant>,
}

impl SubjectName {
    pub fn parse(raw: &str) -> SubjectName {
        let t = raw.trim();
        let lower = t.to_ascii_lowercase();
        for (suffix, variant) in [(" class", Variant::Class), (" lab", Variant::Lab)] {
            if lower.ends_with(suffix) {
                return SubjectName {
                    base: t[..t.len() - suffix.len()].trim_end().to_string(),
                    variant: Some(variant),
                };
            }
        }
        SubjectName {
            base: t.to_string(),
            variant: None,
        }
    }

    pub fn full(base: &str, variant: Variant) -> String {
        format!("{} {}", base, variant.suffix())
    }
}
