use serde::Serialize;

/// Class attendance carries 60% of the combined figure, Lab the remaining 40%.
pub const CLASS_SHARE: f64 = 0.6;
pub const LAB_SHARE: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ZoneStatus {
    Safe,
    Warning,
    Danger,
}

/// How much room one attendance counter has relative to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "count", rename_all = "camelCase")]
pub enum Margin {
    Skip(u64),
    AtEdge,
    Need(u64),
    /// The other counter alone already carries the target.
    Unlimited,
    /// Would need a ratio of 100% or more from this counter alone.
    Unreachable,
}

impl Margin {
    fn can_skip(self) -> bool {
        matches!(self, Margin::Skip(_) | Margin::Unlimited)
    }

    fn label(self) -> String {
        match self {
            Margin::Skip(n) | Margin::Need(n) => n.to_string(),
            Margin::Unlimited => "any".to_string(),
            Margin::AtEdge => "0".to_string(),
            Margin::Unreachable => "all".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeZone {
    pub status: ZoneStatus,
    pub message: String,
    pub percent: f64,
    pub margin: Margin,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedSafeZone {
    pub status: ZoneStatus,
    pub message: String,
    pub current_weighted: f64,
    pub class: Margin,
    pub lab: Margin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_need: Option<u64>,
}

fn ratio(present: u64, total: u64) -> f64 {
    present as f64 / total as f64
}

/// Ratios built from session counts land a few ulps off their exact value; comparisons and
/// rounding against the target absorb that much slack.
const EPSILON: f64 = 1e-9;

fn reaches(value: f64, target: f64) -> bool {
    value + EPSILON >= target
}

/// Further absences tolerable while `present / (total + skipped)` stays at `required`.
fn skip_count(present: u64, total: u64, required: f64) -> u64 {
    (present as f64 / required - total as f64 + EPSILON)
        .floor()
        .max(0.0) as u64
}

/// Consecutive attended sessions needed to lift `present / total` up to `required`.
fn need_count(present: u64, total: u64, required: f64) -> u64 {
    ((required * total as f64 - present as f64) / (1.0 - required) - EPSILON)
        .ceil()
        .max(0.0) as u64
}

fn skip_margin(present: u64, total: u64, required: f64) -> Margin {
    if required <= EPSILON {
        return Margin::Unlimited;
    }
    match skip_count(present, total, required) {
        0 => Margin::AtEdge,
        n => Margin::Skip(n),
    }
}

fn need_margin(present: u64, total: u64, required: f64) -> Margin {
    if required >= 1.0 - EPSILON {
        return Margin::Unreachable;
    }
    Margin::Need(need_count(present, total, required))
}

/// Single-counter verdict. `None` when there is nothing recorded yet.
pub fn safe_zone(present: u64, total: u64, target_percent: f64) -> Option<SafeZone> {
    if total == 0 {
        return None;
    }
    let target = target_percent / 100.0;
    let percent = ratio(present, total) * 100.0;

    if reaches(percent, target_percent) {
        let margin = skip_margin(present, total, target);
        let message = match margin {
            Margin::Skip(n) => format!("Can skip {}", n),
            Margin::Unlimited => "Can skip any".to_string(),
            _ => "At the edge! Attend next".to_string(),
        };
        return Some(SafeZone {
            status: ZoneStatus::Safe,
            message,
            percent,
            margin,
        });
    }

    let margin = need_margin(present, total, target);
    let message = match margin {
        Margin::Need(n) => format!("Attend next {}", n),
        _ => "Target unreachable".to_string(),
    };
    Some(SafeZone {
        status: ZoneStatus::Danger,
        message,
        percent,
        margin,
    })
}

/// Verdict over the 60/40 Class/Lab blend. Each counter's margin is worked out while the other
/// holds its current ratio. `None` unless both counters have sessions recorded.
///
/// A blend sitting exactly on the target is never Danger. It reports Warning rather than Safe
/// when neither counter can drop a single session.
pub fn combined_safe_zone(
    class_present: u64,
    class_total: u64,
    lab_present: u64,
    lab_total: u64,
    target_percent: f64,
) -> Option<CombinedSafeZone> {
    if class_total == 0 || lab_total == 0 {
        return None;
    }
    let class_ratio = ratio(class_present, class_total);
    let lab_ratio = ratio(lab_present, lab_total);
    let current_weighted = class_ratio * 100.0 * CLASS_SHARE + lab_ratio * 100.0 * LAB_SHARE;

    let target = target_percent / 100.0;
    let target_for_class = (target - LAB_SHARE * lab_ratio) / CLASS_SHARE;
    let target_for_lab = (target - CLASS_SHARE * class_ratio) / LAB_SHARE;

    if reaches(current_weighted, target_percent) {
        let class = skip_margin(class_present, class_total, target_for_class);
        let lab = skip_margin(lab_present, lab_total, target_for_lab);
        let (status, message) = match (class.can_skip(), lab.can_skip()) {
            (true, true) => (
                ZoneStatus::Safe,
                format!("Skip {} Cls OR {} Lab", class.label(), lab.label()),
            ),
            (true, false) => (
                ZoneStatus::Safe,
                format!("Skip {} Cls (Lab at the edge)", class.label()),
            ),
            (false, true) => (
                ZoneStatus::Safe,
                format!("Skip {} Lab (Cls at the edge)", lab.label()),
            ),
            (false, false) => (
                ZoneStatus::Warning,
                "At the edge! Attend next of both".to_string(),
            ),
        };
        return Some(CombinedSafeZone {
            status,
            message,
            current_weighted,
            class,
            lab,
            min_need: None,
        });
    }

    let class = need_margin(class_present, class_total, target_for_class);
    let lab = need_margin(lab_present, lab_total, target_for_lab);
    let (message, min_need) = match (class, lab) {
        (Margin::Need(c), Margin::Need(l)) => {
            (format!("Attend {} Cls OR {} Lab", c, l), Some(c.min(l)))
        }
        (_, Margin::Need(l)) => (
            format!("Cls can't recover alone. Attend next {} Lab", l),
            Some(l),
        ),
        (Margin::Need(c), _) => (
            format!("Lab can't recover alone. Attend next {} Cls", c),
            Some(c),
        ),
        _ => ("Attend every Cls and Lab".to_string(), None),
    };
    Some(CombinedSafeZone {
        status: ZoneStatus::Danger,
        message,
        current_weighted,
        class,
        lab,
        min_need,
    })
}
