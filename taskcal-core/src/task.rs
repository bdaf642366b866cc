//! Task model and the raw→validated input boundary.
//!
//! Stored and remote documents carry tasks in a loose legacy shape (optional
//! ids, string dates, title-encoded types). `RawTask` models that shape;
//! `repair`/`sanitize` are the only places it is converted into the closed
//! `Task` type the rest of the crate works with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::date::DateKey;

/// Titles the original app used before tasks carried an explicit kind.
/// Matching on them is kept only as a legacy-data migration step.
const RECURRING_TITLES: [&str; 3] = ["Weekly Planning", "Friday Reflection", "Daily Check-in"];

/// Generate a collision-resistant task id: time component + random suffix.
pub fn generate_task_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let rand = Uuid::new_v4().simple().to_string();
    format!("task_{}_{}", millis, &rand[..9])
}

fn step_id(task_id: &str, index: usize) -> String {
    format!("{}_step_{}", task_id, index + 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Complete,
}

#[derive(Debug, Clone, Serialize)]
pub struct Step {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub description: String,
    pub status: StepStatus,
}

impl Step {
    pub fn pending(id: String, description: &str) -> Self {
        Step {
            id: Some(id),
            description: description.to_string(),
            status: StepStatus::Pending,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == StepStatus::Complete
    }

    pub fn toggle(&mut self) {
        self.status = match self.status {
            StepStatus::Pending => StepStatus::Complete,
            StepStatus::Complete => StepStatus::Pending,
        };
    }
}

/// First-class task kind. Legacy data encoded this in the title and a loose
/// `taskType`/`category` string; both are migrated here on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Planning,
    Reflection,
    Checkin,
    #[default]
    Custom,
}

/// How often a kind recurs, which decides the scope of its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Weekly,
    Daily,
    None,
}

impl TaskKind {
    pub fn from_wire(s: &str) -> Option<TaskKind> {
        match s {
            "planning" => Some(TaskKind::Planning),
            "reflection" => Some(TaskKind::Reflection),
            "checkin" => Some(TaskKind::Checkin),
            "default" | "custom" => Some(TaskKind::Custom),
            _ => None,
        }
    }

    pub fn from_title(title: &str) -> Option<TaskKind> {
        match title {
            "Weekly Planning" => Some(TaskKind::Planning),
            "Friday Reflection" => Some(TaskKind::Reflection),
            "Daily Check-in" => Some(TaskKind::Checkin),
            _ => None,
        }
    }

    pub fn cadence(&self) -> Cadence {
        match self {
            TaskKind::Planning | TaskKind::Reflection => Cadence::Weekly,
            TaskKind::Checkin => Cadence::Daily,
            TaskKind::Custom => Cadence::None,
        }
    }
}

/// A validated task.
///
/// `id` is `None` only for legacy/cross-source entries that arrived without
/// one; repair assigns ids before anything is persisted, and the merge engine
/// assigns fresh ids to id-less remote tasks it appends.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub steps: Vec<Step>,
    pub reflection: String,
    pub last_modified: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_created: Option<DateKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_context: Option<DateKey>,
    #[serde(rename = "taskType")]
    pub kind: TaskKind,
    #[serde(rename = "isRecurring")]
    pub recurring: bool,
}

/// Step completion summary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Completion {
    pub completed: usize,
    pub total: usize,
}

impl Completion {
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

impl Task {
    /// Create an auto-generated recurring task from its fixed template.
    ///
    /// Weekly-cadence kinds carry the week identifier of `date`; the daily
    /// check-in carries the specific day instead. Every task and step gets a
    /// fresh id.
    pub fn recurring(kind: TaskKind, date: DateKey) -> Task {
        let id = generate_task_id();
        let (title, descriptions): (&str, &[&str]) = match kind {
            TaskKind::Planning => (
                "Weekly Planning",
                &[
                    "Review last week's achievements",
                    "Set 3 key goals for this week",
                    "Plan daily priorities",
                    "Schedule important tasks",
                ],
            ),
            TaskKind::Reflection => (
                "Friday Reflection",
                &[
                    "Review week's accomplishments",
                    "Identify lessons learned",
                    "Note areas for improvement",
                    "Celebrate wins",
                ],
            ),
            TaskKind::Checkin => (
                "Daily Check-in",
                &[
                    "Review today's priorities",
                    "Complete 3 most important tasks",
                    "Plan tomorrow's focus",
                ],
            ),
            TaskKind::Custom => ("New Task", &["Complete task"]),
        };

        let steps = descriptions
            .iter()
            .enumerate()
            .map(|(i, d)| Step::pending(step_id(&id, i), d))
            .collect();

        let week_context = match kind.cadence() {
            Cadence::Weekly => Some(date.week_start()),
            Cadence::Daily | Cadence::None => None,
        };

        Task {
            id: Some(id),
            title: title.to_string(),
            steps,
            reflection: String::new(),
            last_modified: Utc::now(),
            date_created: Some(date),
            week_context,
            kind,
            recurring: kind != TaskKind::Custom,
        }
    }

    /// Whether this task participates in recurring-task identity rules.
    /// The explicit flag wins; template titles cover legacy data.
    pub fn recurring_identity(&self) -> bool {
        self.recurring || RECURRING_TITLES.contains(&self.title.as_str())
    }

    /// Week identifier for identity scoping: explicit context, else the week
    /// of the creation date, else the week of the bucket the task sits in.
    pub fn week_identifier(&self, bucket: DateKey) -> DateKey {
        self.week_context
            .or_else(|| self.date_created.map(|d| d.week_start()))
            .unwrap_or_else(|| bucket.week_start())
    }

    /// The day this task is anchored to, when known.
    pub fn date_context(&self) -> Option<DateKey> {
        self.date_created
    }

    pub fn completion(&self) -> Completion {
        Completion {
            completed: self.steps.iter().filter(|s| s.is_complete()).count(),
            total: self.steps.len(),
        }
    }

    /// Assign an id (and step ids) if missing. Called before persistence so
    /// every stored task has a stable identity.
    pub fn ensure_id(&mut self) {
        if self.id.is_none() {
            self.id = Some(generate_task_id());
        }
        let id = self.id.clone().unwrap_or_default();
        for (i, step) in self.steps.iter_mut().enumerate() {
            if step.id.is_none() {
                step.id = Some(step_id(&id, i));
            }
        }
    }
}

// RAW INPUT SHAPES:

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStep {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A task as found in stored or remote documents: everything optional,
/// legacy field aliases accepted. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTask {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub steps: Option<serde_json::Value>,
    #[serde(default)]
    pub reflection: Option<String>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_created: Option<String>,
    /// Legacy daily-cadence anchor; old documents carry this alongside
    /// `dateCreated`, so it can't be a serde alias.
    #[serde(default)]
    pub day_context: Option<String>,
    #[serde(default)]
    pub week_context: Option<String>,
    #[serde(default)]
    pub task_type: Option<String>,
    /// Legacy duplicate of `taskType`; used as a fallback only.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_recurring: Option<bool>,
}

/// Accept any value where a timestamp should be; anything unparseable reads
/// as missing rather than failing the whole task.
fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().and_then(|s| s.parse::<DateTime<Utc>>().ok()))
}

impl RawTask {
    /// Whether this entry is recognizable as a task at all. Entries lacking
    /// both id and title are junk and get dropped by sanitization.
    fn has_identity(&self) -> bool {
        self.id.as_deref().is_some_and(|s| !s.trim().is_empty())
            || self.title.as_deref().is_some_and(|s| !s.trim().is_empty())
    }

    fn repair_steps(&self, task_id: &str) -> Vec<Step> {
        // Missing or non-array steps become one default step; a present but
        // empty array is kept as-is.
        let raw_steps = match &self.steps {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| serde_json::from_value::<RawStep>(v.clone()).ok())
                .collect::<Vec<_>>(),
            _ => {
                return vec![Step {
                    id: Some(step_id(task_id, 0)),
                    description: "Complete task".to_string(),
                    status: StepStatus::Pending,
                }];
            }
        };

        raw_steps
            .into_iter()
            .enumerate()
            .map(|(i, raw)| Step {
                id: raw.id.or_else(|| Some(step_id(task_id, i))),
                description: raw
                    .description
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| format!("Step {}", i + 1)),
                status: match raw.status.as_deref() {
                    Some("complete") => StepStatus::Complete,
                    _ => StepStatus::Pending,
                },
            })
            .collect()
    }

    fn build(self, id: Option<String>) -> Task {
        let title = self
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("Untitled Task")
            .to_string();

        let kind = self
            .task_type
            .as_deref()
            .or(self.category.as_deref())
            .and_then(TaskKind::from_wire)
            .or_else(|| TaskKind::from_title(&title))
            .unwrap_or_default();

        let step_seed = id.clone().unwrap_or_else(|| title.clone());
        let steps = self.repair_steps(&step_seed);

        let date_created = self
            .date_created
            .as_deref()
            .or(self.day_context.as_deref())
            .and_then(DateKey::parse);
        // Invalid week strings (including the old YYYY-Www format) are
        // dropped; the merge engine re-derives the week from the date.
        let week_context = self.week_context.as_deref().and_then(DateKey::parse);

        let recurring = self
            .is_recurring
            .unwrap_or(RECURRING_TITLES.contains(&title.as_str()));

        Task {
            id,
            title,
            steps,
            reflection: self.reflection.unwrap_or_default(),
            last_modified: self.last_modified.unwrap_or_else(Utc::now),
            date_created,
            week_context,
            kind,
            recurring,
        }
    }

    /// Total repair for the local path: always yields a task, generating an
    /// id when missing.
    pub fn repair(self) -> Task {
        let id = self
            .id
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| Some(generate_task_id()));
        let mut task = self.build(id);
        task.ensure_id();
        task
    }

    /// Best-effort repair for the remote path: drops entries lacking both id
    /// and title, and never fabricates ids (the merge engine needs to know
    /// which side actually carried one).
    pub fn sanitize(self) -> Option<Task> {
        if !self.has_identity() {
            return None;
        }
        let id = self.id.clone().filter(|s| !s.trim().is_empty());
        Some(self.build(id))
    }
}
