use serde::Serialize;

use crate::model::{SubjectName, TaskKind};

/// Gradeable bucket a task contributes to. Lectures feed `Attendance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Attendance,
    Assignment,
    Project,
    Contest,
    MidSem,
    EndSem,
    Quiz,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Attendance,
        Category::Assignment,
        Category::Project,
        Category::Contest,
        Category::MidSem,
        Category::EndSem,
        Category::Quiz,
    ];

    pub fn of(kind: TaskKind) -> Category {
        match kind {
            TaskKind::Lecture => Category::Attendance,
            TaskKind::Assignment => Category::Assignment,
            TaskKind::Project => Category::Project,
            TaskKind::Contest => Category::Contest,
            TaskKind::MidSem => Category::MidSem,
            TaskKind::EndSem => Category::EndSem,
            TaskKind::Quiz => Category::Quiz,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SubjectFamily {
    GenAi,
    DmOrSd,
    Dva,
    Default,
}

impl SubjectFamily {
    /// Keyword match on the lowercased family name. GenAI wins over DM/SD, which wins over DVA.
    pub fn classify(subject_name: &str) -> SubjectFamily {
        let family = SubjectName::parse(subject_name).base.to_ascii_lowercase();
        if family.contains("genai") {
            SubjectFamily::GenAi
        } else if family.contains("dm") || family.contains("sd") {
            SubjectFamily::DmOrSd
        } else if family.contains("dva") {
            SubjectFamily::Dva
        } else {
            SubjectFamily::Default
        }
    }
}

/// Category weights in whole percentage points. Every table sums to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWeights {
    pub attendance: u32,
    pub assignment: u32,
    pub project: u32,
    pub contest: u32,
    pub mid_sem: u32,
    pub end_sem: u32,
    pub quiz: u32,
}

impl CategoryWeights {
    pub fn points(&self, category: Category) -> u32 {
        match category {
            Category::Attendance => self.attendance,
            Category::Assignment => self.assignment,
            Category::Project => self.project,
            Category::Contest => self.contest,
            Category::MidSem => self.mid_sem,
            Category::EndSem => self.end_sem,
            Category::Quiz => self.quiz,
        }
    }

    pub fn fraction(&self, category: Category) -> f64 {
        f64::from(self.points(category)) / 100.0
    }

    pub fn total_points(&self) -> u32 {
        Category::ALL.iter().map(|c| self.points(*c)).sum()
    }
}

/// Expected number of graded events per category, used to split a category's weight across entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCounts {
    pub contest: u32,
    pub mid_sem: u32,
    pub end_sem: u32,
    pub quiz: u32,
}

impl CategoryCounts {
    pub fn expected(&self, category: Category) -> u32 {
        match category {
            Category::Contest => self.contest,
            Category::MidSem => self.mid_sem,
            Category::EndSem => self.end_sem,
            Category::Quiz => self.quiz,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Weighting {
    pub family: SubjectFamily,
    pub weights: CategoryWeights,
    pub counts: CategoryCounts,
}

impl Weighting {
    /// Ceiling of a single scored entry: its share of the category weight, out of 100.
    pub fn entry_max_marks(&self, category: Category) -> f64 {
        let count = self.counts.expected(category).max(1);
        f64::from(self.weights.points(category)) / f64::from(count)
    }
}

pub fn weighting_for(family: SubjectFamily) -> Weighting {
    let (weights, contest_count) = match family {
        SubjectFamily::GenAi => (
            CategoryWeights {
                attendance: 5,
                assignment: 10,
                project: 15,
                contest: 10,
                mid_sem: 20,
                end_sem: 40,
                quiz: 0,
            },
            2,
        ),
        SubjectFamily::DmOrSd => (
            CategoryWeights {
                attendance: 5,
                assignment: 10,
                project: 10,
                contest: 15,
                mid_sem: 20,
                end_sem: 40,
                quiz: 0,
            },
            3,
        ),
        SubjectFamily::Dva => (
            CategoryWeights {
                attendance: 5,
                assignment: 5,
                project: 20,
                contest: 10,
                mid_sem: 20,
                end_sem: 40,
                quiz: 0,
            },
            2,
        ),
        SubjectFamily::Default => (
            CategoryWeights {
                attendance: 10,
                assignment: 20,
                project: 20,
                contest: 0,
                mid_sem: 15,
                end_sem: 25,
                quiz: 10,
            },
            1,
        ),
    };
    Weighting {
        family,
        weights,
        counts: CategoryCounts {
            contest: contest_count,
            mid_sem: 1,
            end_sem: 1,
            quiz: 1,
        },
    }
}

pub fn resolve(subject_name: &str) -> Weighting {
    weighting_for(SubjectFamily::classify(subject_name))
}
