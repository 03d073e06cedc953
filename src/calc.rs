use serde::Serialize;

use crate::attendance::{self, CombinedSafeZone, SafeZone, CLASS_SHARE, LAB_SHARE};
use crate::model::{
    ComponentScore, FriendMeta, Party, PerParty, SubjectName, Task, TaskKind, Variant,
};
use crate::weights::{self, Category, CategoryWeights, SubjectFamily, Weighting};

#[derive(Debug, Clone, Serialize)]
pub struct CalcError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl CalcError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }
}

/// Marks are stored at 2 decimals; sums of stored marks are not re-rounded.
pub fn round_2_decimals(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        100.0 * part / whole
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMarks {
    pub ratio: PerParty<f64>,
    pub marks: PerParty<f64>,
    pub max_marks: f64,
}

/// Scores a contest or exam entry against the subject's current weighting.
///
/// Each component contributes `correct / total * weight`; the sum is normalised by the summed
/// weights and scaled to the entry's share of its category. A missing or zero `total` is
/// treated as 1.
pub fn compute_entry_marks(
    weighting: &Weighting,
    kind: TaskKind,
    components: &[ComponentScore],
) -> Result<EntryMarks, CalcError> {
    if !kind.is_scored() {
        return Err(CalcError::new(
            "bad_params",
            format!("{} entries do not carry component scores", kind.as_str()),
        ));
    }
    if components.is_empty() {
        return Err(CalcError::new(
            "no_components",
            "select at least one of quiz, coding or written",
        ));
    }
    for (i, c) in components.iter().enumerate() {
        if components[..i].iter().any(|o| o.component == c.component) {
            return Err(CalcError::new(
                "bad_params",
                format!("component {:?} listed more than once", c.component),
            ));
        }
    }

    let total_weight: f64 = components.iter().map(|c| c.weight).sum();
    let max_marks = weighting.entry_max_marks(Category::of(kind));

    let ratio = PerParty::from_fn(|party| {
        if total_weight <= 0.0 {
            return 0.0;
        }
        let total_score: f64 = components
            .iter()
            .map(|c| {
                let total = c.total.filter(|t| *t != 0.0).unwrap_or(1.0);
                (c.correct.get(party) / total) * c.weight
            })
            .sum();
        total_score / total_weight
    });
    let marks = PerParty::from_fn(|party| round_2_decimals(ratio.get(party) * max_marks));

    Ok(EntryMarks {
        ratio,
        marks,
        max_marks,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LectureStats {
    pub subject_name: String,
    pub variant: Variant,
    pub total: usize,
    pub attendance_count: PerParty<i64>,
    pub attendance_percent: PerParty<f64>,
    pub safe_zone: Option<SafeZone>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub category: Category,
    pub weight: f64,
    pub total: usize,
    pub done: PerParty<usize>,
    pub percent: PerParty<f64>,
    pub total_marks: PerParty<f64>,
    pub max_marks: f64,
    /// Points out of 100 this category adds to the subject score.
    pub contribution: PerParty<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    pub subject: String,
    pub family: SubjectFamily,
    pub weights: CategoryWeights,
    pub lectures: Vec<LectureStats>,
    pub categories: Vec<CategoryStats>,
    pub score: PerParty<f64>,
    pub safe_zone: Option<CombinedSafeZone>,
    pub last_activity_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub subjects: Vec<SubjectSummary>,
    pub totals: PerParty<f64>,
    pub max_possible: f64,
}

/// Tasks belonging to the Class or Lab variant of `base`, in creation order.
fn subject_tasks<'a>(base: &str, tasks: &'a [Task]) -> Vec<(Variant, &'a Task)> {
    let mut out: Vec<(Variant, &Task)> = tasks
        .iter()
        .filter_map(|t| {
            let name = SubjectName::parse(&t.subject_name);
            match name.variant {
                Some(v) if name.base.eq_ignore_ascii_case(base) => Some((v, t)),
                _ => None,
            }
        })
        .collect();
    out.sort_by(|(_, a), (_, b)| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    out
}

fn lecture_stats(
    base: &str,
    variant: Variant,
    tasks: &[(Variant, &Task)],
    friend_metas: &[FriendMeta],
    target_percent: f64,
) -> LectureStats {
    let subject_name = SubjectName::full(base, variant);
    let lectures: Vec<&Task> = tasks
        .iter()
        .filter(|(v, t)| *v == variant && t.kind == TaskKind::Lecture)
        .map(|(_, t)| *t)
        .collect();
    let total = lectures.len();
    let attended = lectures.iter().filter(|t| t.is_present()).count() as i64;
    let peer_attended = friend_metas
        .iter()
        .find(|m| m.subject_name.eq_ignore_ascii_case(&subject_name))
        .map(|m| m.attendance_count)
        .unwrap_or(attended);
    let attendance_count = PerParty::new(attended, peer_attended);
    let attendance_percent =
        PerParty::from_fn(|p| percent_of(*attendance_count.get(p) as f64, total as f64));

    LectureStats {
        subject_name,
        variant,
        total,
        attendance_count,
        attendance_percent,
        safe_zone: attendance::safe_zone(attended.max(0) as u64, total as u64, target_percent),
    }
}

/// 60/40 blend when both variants have lectures; otherwise whichever variant has any.
fn combined_attendance_percent(class: &LectureStats, lab: &LectureStats, party: Party) -> f64 {
    let c = *class.attendance_percent.get(party);
    let l = *lab.attendance_percent.get(party);
    match (class.total > 0, lab.total > 0) {
        (true, true) => c * CLASS_SHARE + l * LAB_SHARE,
        (true, false) => c,
        (false, true) => l,
        (false, false) => 0.0,
    }
}

fn is_done(task: &Task, party: Party) -> bool {
    match (party, task.kind) {
        (Party::Primary, _) => task.completed,
        // Assignments and quizzes are shared coursework; the peer follows the primary's flag.
        (Party::Peer, TaskKind::Assignment | TaskKind::Quiz) => task.completed,
        (Party::Peer, _) => task.peer_completed,
    }
}

fn category_stats(
    category: Category,
    weighting: &Weighting,
    tasks: &[(Variant, &Task)],
    lectures: (&LectureStats, &LectureStats),
) -> CategoryStats {
    let points = f64::from(weighting.weights.points(category));
    let weight = weighting.weights.fraction(category);

    if category == Category::Attendance {
        let (class, lab) = lectures;
        let percent = PerParty::from_fn(|p| combined_attendance_percent(class, lab, p));
        return CategoryStats {
            category,
            weight,
            total: class.total + lab.total,
            done: PerParty::from_fn(|p| {
                (*class.attendance_count.get(p) + *lab.attendance_count.get(p)).max(0) as usize
            }),
            contribution: PerParty::from_fn(|p| percent.get(p) / 100.0 * points),
            percent,
            total_marks: PerParty::default(),
            max_marks: 0.0,
        };
    }

    let items: Vec<&Task> = tasks
        .iter()
        .filter(|(_, t)| Category::of(t.kind) == category)
        .map(|(_, t)| *t)
        .collect();
    let total = items.len();
    let done = PerParty::from_fn(|p| items.iter().filter(|t| is_done(t, p)).count());
    let total_marks = PerParty::from_fn(|p| items.iter().map(|t| t.marks(p)).sum::<f64>());
    let max_marks: f64 = items.iter().map(|t| t.max_marks()).sum();

    let percent = PerParty::from_fn(|p| {
        if max_marks > 0.0 {
            percent_of(*total_marks.get(p), max_marks)
        } else {
            percent_of(*done.get(p) as f64, total as f64)
        }
    });
    let scored = matches!(
        category,
        Category::Contest | Category::MidSem | Category::EndSem
    );
    let contribution = PerParty::from_fn(|p| {
        if scored {
            *total_marks.get(p)
        } else {
            percent.get(p) / 100.0 * points
        }
    });

    CategoryStats {
        category,
        weight,
        total,
        done,
        percent,
        total_marks,
        max_marks,
        contribution,
    }
}

/// Projects one subject's score for both parties from its Class and Lab tasks.
///
/// Recomputed from scratch on every call; the result depends only on the task set, not on
/// the order it is delivered in.
pub fn summarize_subject(
    base: &str,
    tasks: &[Task],
    friend_metas: &[FriendMeta],
    target_percent: f64,
) -> SubjectSummary {
    let weighting = weights::resolve(base);
    let own = subject_tasks(base, tasks);

    let class = lecture_stats(base, Variant::Class, &own, friend_metas, target_percent);
    let lab = lecture_stats(base, Variant::Lab, &own, friend_metas, target_percent);

    let categories: Vec<CategoryStats> = Category::ALL
        .iter()
        .map(|c| category_stats(*c, &weighting, &own, (&class, &lab)))
        .collect();
    let score = PerParty::from_fn(|p| {
        categories
            .iter()
            .map(|c| *c.contribution.get(p))
            .sum::<f64>()
    });

    let safe_zone = attendance::combined_safe_zone(
        class.attendance_count.primary.max(0) as u64,
        class.total as u64,
        lab.attendance_count.primary.max(0) as u64,
        lab.total as u64,
        target_percent,
    );
    let last_activity_at = own.iter().map(|(_, t)| t.activity_at()).max();

    SubjectSummary {
        subject: base.to_string(),
        family: weighting.family,
        weights: weighting.weights,
        lectures: vec![class, lab],
        categories,
        score,
        safe_zone,
        last_activity_at,
    }
}

pub fn summarize_overview(
    subjects: &[String],
    tasks: &[Task],
    friend_metas: &[FriendMeta],
    target_percent: f64,
) -> Overview {
    let subjects: Vec<SubjectSummary> = subjects
        .iter()
        .map(|s| summarize_subject(s, tasks, friend_metas, target_percent))
        .collect();
    let totals = PerParty::from_fn(|p| subjects.iter().map(|s| *s.score.get(p)).sum::<f64>());
    let max_possible = 100.0 * subjects.len() as f64;
    Overview {
        subjects,
        totals,
        max_possible,
    }
}
