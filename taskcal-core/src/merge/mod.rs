//! The merge engine: reconcile a local and a remote dataset into one.
//!
//! The result is a strict superset of both sides. A task that exists
//! unambiguously on only one side survives unchanged; two versions of the
//! same logical task are resolved in favor of the more informative one; and
//! auto-generated recurring tasks are deduplicated within the scope of their
//! week, never across weeks.

mod identity;
mod resolve;

pub use identity::tasks_are_equal;
pub use resolve::{dedup_bucket, merge_task_versions, score_task};

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::dataset::{Dataset, MergeInfo, SyncMeta};
use crate::date::DateKey;
use crate::task::{Cadence, Task, generate_task_id};

/// Merge two datasets. Neither input is mutated; the result carries a fresh
/// `mergeInfo` record and no other metadata.
pub fn merge_datasets(local: &Dataset, remote: &Dataset, now: DateTime<Utc>) -> Dataset {
    let mut info = MergeInfo {
        local_task_count: local.task_count(),
        remote_task_count: remote.task_count(),
        merged_at: Some(now),
        ..Default::default()
    };

    let keys: BTreeSet<DateKey> = local
        .days
        .keys()
        .chain(remote.days.keys())
        .copied()
        .collect();

    let mut days = BTreeMap::new();
    for key in keys {
        let local_bucket = local.days.get(&key).cloned().unwrap_or_default();
        let remote_bucket = remote.days.get(&key).map(Vec::as_slice).unwrap_or_default();
        days.insert(
            key,
            merge_bucket(local_bucket, remote_bucket, key, now, &mut info),
        );
    }

    let mut merged = Dataset {
        days,
        meta: SyncMeta::default(),
    };
    info.final_task_count = merged.task_count();
    merged.meta.merge_info = Some(info);
    merged
}

/// Merge one day's remote tasks into the local bucket, then deduplicate.
fn merge_bucket(
    local: Vec<Task>,
    remote: &[Task],
    bucket: DateKey,
    now: DateTime<Utc>,
    info: &mut MergeInfo,
) -> Vec<Task> {
    let mut merged = local;

    for task in remote {
        // Cross-week guard: a recurring task's remote copy must never land
        // in a different week's bucket, even when titles match.
        if task.recurring_identity() && task.week_identifier(bucket) != bucket.week_start() {
            debug!(
                title = %task.title,
                bucket = %bucket,
                week = %task.week_identifier(bucket),
                "blocking cross-week recurring task"
            );
            info.cross_week_blocks += 1;
            continue;
        }

        match merged
            .iter()
            .position(|existing| tasks_are_equal(existing, task, bucket))
        {
            Some(index) => {
                merged[index] = merge_task_versions(&merged[index], task, now);
                info.tasks_updated += 1;
            }
            None => {
                let mut incoming = task.clone();
                if incoming.id.is_none() {
                    incoming.id = Some(generate_task_id());
                }
                // Stamp only missing context; present values may belong to a
                // task deliberately moved across days.
                if incoming.date_created.is_none() {
                    incoming.date_created = Some(bucket);
                }
                if incoming.week_context.is_none()
                    && incoming.kind.cadence() == Cadence::Weekly
                {
                    incoming.week_context = Some(bucket.week_start());
                }
                merged.push(incoming);
                info.tasks_added += 1;
            }
        }
    }

    dedup_bucket(merged, bucket, now)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::task::{Step, StepStatus, TaskKind};

    pub(crate) fn ts(s: &str) -> DateTime<Utc> {
        s.parse().expect("test timestamp should parse")
    }

    fn steps(completed: usize, total: usize) -> Vec<Step> {
        (0..total)
            .map(|i| Step {
                id: Some(format!("step_{}", i + 1)),
                description: format!("Step {}", i + 1),
                status: if i < completed {
                    StepStatus::Complete
                } else {
                    StepStatus::Pending
                },
            })
            .collect()
    }

    pub(crate) fn plain_task(
        id: Option<&str>,
        title: &str,
        completed: usize,
        total: usize,
    ) -> Task {
        Task {
            id: id.map(str::to_string),
            title: title.to_string(),
            steps: steps(completed, total),
            reflection: String::new(),
            last_modified: ts("2024-03-04T12:00:00Z"),
            date_created: DateKey::parse("2024-3-4"),
            week_context: None,
            kind: TaskKind::Custom,
            recurring: false,
        }
    }

    pub(crate) fn recurring_task(id: Option<&str>, title: &str, week: &str, created: &str) -> Task {
        Task {
            id: id.map(str::to_string),
            title: title.to_string(),
            steps: steps(0, 3),
            reflection: String::new(),
            last_modified: ts("2024-03-04T12:00:00Z"),
            date_created: DateKey::parse(created),
            week_context: DateKey::parse(week).map(|d| d.week_start()),
            kind: TaskKind::from_title(title).unwrap_or(TaskKind::Custom),
            recurring: true,
        }
    }

    pub(crate) fn set_completion(mut task: Task, completed: usize) -> Task {
        for (i, step) in task.steps.iter_mut().enumerate() {
            step.status = if i < completed {
                StepStatus::Complete
            } else {
                StepStatus::Pending
            };
        }
        task
    }

    fn dataset(entries: &[(&str, Vec<Task>)]) -> Dataset {
        let mut ds = Dataset::default();
        for (key, tasks) in entries {
            ds.days.insert(DateKey::parse(key).unwrap(), tasks.clone());
        }
        ds
    }

    fn now() -> DateTime<Utc> {
        ts("2024-03-05T00:00:00Z")
    }

    // Scenario 1: remote empty, local intact.
    #[test]
    fn merging_with_empty_remote_returns_local_unchanged() {
        let local = dataset(&[(
            "2024-3-4",
            vec![set_completion(
                recurring_task(Some("task_1"), "Daily Check-in", "2024-3-4", "2024-3-4"),
                1,
            )],
        )]);

        let merged = merge_datasets(&local, &Dataset::default(), now());
        assert_eq!(merged.task_count(), 1);
        let task = &merged.days[&DateKey::parse("2024-3-4").unwrap()][0];
        assert_eq!(task.id.as_deref(), Some("task_1"));
        assert_eq!(task.completion().completed, 1);
        assert_eq!(task.last_modified, ts("2024-03-04T12:00:00Z"), "untouched");
    }

    // Scenario 2: local empty, remote adopted.
    #[test]
    fn merging_with_empty_local_returns_remote() {
        let remote = dataset(&[("2024-3-4", vec![plain_task(Some("task_2"), "Errands", 0, 2)])]);

        let merged = merge_datasets(&Dataset::default(), &remote, now());
        assert_eq!(merged.task_count(), 1);
        assert_eq!(
            merged.days[&DateKey::parse("2024-3-4").unwrap()][0].id.as_deref(),
            Some("task_2")
        );
    }

    #[test]
    fn remote_tasks_without_ids_get_one_on_adoption() {
        let remote = dataset(&[("2024-3-4", vec![plain_task(None, "Errands", 0, 2)])]);

        let merged = merge_datasets(&Dataset::default(), &remote, now());
        let task = &merged.days[&DateKey::parse("2024-3-4").unwrap()][0];
        assert!(task.id.is_some(), "adopted tasks are assigned fresh ids");
    }

    // Scenario 3: same id on both sides, best version wins.
    #[test]
    fn conflicting_versions_resolve_to_the_more_complete_one() {
        let stale = recurring_task(Some("task_1"), "Daily Check-in", "2024-3-4", "2024-3-4");
        let mut done = set_completion(stale.clone(), 3);
        done.last_modified = ts("2024-03-04T18:00:00Z");

        let local = dataset(&[("2024-3-4", vec![stale])]);
        let remote = dataset(&[("2024-3-4", vec![done])]);

        let merged = merge_datasets(&local, &remote, now());
        assert_eq!(merged.task_count(), 1);
        let task = &merged.days[&DateKey::parse("2024-3-4").unwrap()][0];
        assert_eq!(task.id.as_deref(), Some("task_1"));
        assert_eq!(task.completion().completed, 3);
        assert_eq!(merged.meta.merge_info.as_ref().unwrap().tasks_updated, 1);
    }

    // Scenario 4: week isolation.
    #[test]
    fn same_titled_planning_tasks_in_different_weeks_both_survive() {
        let local = dataset(&[(
            "2024-3-3",
            vec![recurring_task(None, "Weekly Planning", "2024-3-3", "2024-3-3")],
        )]);
        let remote = dataset(&[(
            "2024-3-10",
            vec![recurring_task(None, "Weekly Planning", "2024-3-10", "2024-3-10")],
        )]);

        let merged = merge_datasets(&local, &remote, now());
        assert_eq!(merged.task_count(), 2, "one planning task per week");
        assert_eq!(merged.days[&DateKey::parse("2024-3-3").unwrap()].len(), 1);
        assert_eq!(merged.days[&DateKey::parse("2024-3-10").unwrap()].len(), 1);
    }

    // Scenario 5: malformed remote bucket sanitized, local preserved.
    #[test]
    fn malformed_remote_bucket_does_not_disturb_local() {
        let local = dataset(&[("2024-3-4", vec![plain_task(Some("task_1"), "Errands", 0, 2)])]);
        let remote = Dataset::from_remote_value(serde_json::json!({
            "2024-3-4": "not-an-array"
        }));

        let merged = merge_datasets(&local, &remote, now());
        assert_eq!(merged.task_count(), 1);
        assert_eq!(
            merged.days[&DateKey::parse("2024-3-4").unwrap()][0].id.as_deref(),
            Some("task_1")
        );
    }

    // No-loss property.
    #[test]
    fn one_sided_tasks_survive_unchanged() {
        let local = dataset(&[
            ("2024-3-4", vec![plain_task(Some("task_l"), "Local only", 1, 3)]),
        ]);
        let mut remote_task = plain_task(Some("task_r"), "Remote only", 2, 2);
        remote_task.reflection = "remote notes".to_string();
        let remote = dataset(&[("2024-3-5", vec![remote_task.clone()])]);

        let merged = merge_datasets(&local, &remote, now());
        assert_eq!(merged.task_count(), 2);

        let kept = &merged.days[&DateKey::parse("2024-3-5").unwrap()][0];
        assert_eq!(kept.id, remote_task.id);
        assert_eq!(kept.title, remote_task.title);
        assert_eq!(kept.reflection, remote_task.reflection);
        assert_eq!(kept.steps.len(), remote_task.steps.len());
        assert_eq!(kept.last_modified, remote_task.last_modified);
    }

    // Idempotence property.
    #[test]
    fn self_merge_does_not_duplicate() {
        let mut local = Dataset::default();
        local.ensure_week(DateKey::parse("2024-3-6").unwrap());
        local.days.entry(DateKey::parse("2024-3-4").unwrap()).or_default().push(
            plain_task(Some("task_x"), "Errands", 1, 2),
        );
        let count = local.task_count();

        let merged = merge_datasets(&local, &local, now());
        assert_eq!(merged.task_count(), count);
    }

    // Cross-week guard.
    #[test]
    fn recurring_task_from_another_week_is_blocked() {
        let local = dataset(&[("2024-3-4", vec![])]);
        // A planning task claiming last week, sitting in this week's bucket.
        let remote = dataset(&[(
            "2024-3-4",
            vec![recurring_task(Some("task_w"), "Weekly Planning", "2024-2-26", "2024-2-26")],
        )]);

        let merged = merge_datasets(&local, &remote, now());
        assert_eq!(merged.task_count(), 0);
        assert_eq!(merged.meta.merge_info.as_ref().unwrap().cross_week_blocks, 1);
    }

    #[test]
    fn moved_plain_task_is_not_blocked_by_week_guard() {
        // A plain task moved into a bucket in a different week than its
        // creation date must still merge in (no-loss beats week hygiene for
        // non-recurring tasks).
        let mut moved = plain_task(Some("task_m"), "Moved errand", 0, 1);
        moved.date_created = DateKey::parse("2024-2-20");
        let remote = dataset(&[("2024-3-4", vec![moved])]);

        let merged = merge_datasets(&Dataset::default(), &remote, now());
        assert_eq!(merged.task_count(), 1);
    }

    // Dedup correctness.
    #[test]
    fn duplicate_recurring_tasks_collapse_to_the_best() {
        let base = recurring_task(None, "Daily Check-in", "2024-3-4", "2024-3-4");
        let mut best = set_completion(base.clone(), 3);
        best.id = Some("task_best".to_string());
        best.reflection = "solid day".to_string();
        let mut dup_a = base.clone();
        dup_a.id = Some("task_a".to_string());
        let mut dup_b = set_completion(base.clone(), 1);
        dup_b.id = Some("task_b".to_string());

        let local = dataset(&[("2024-3-4", vec![dup_a, best, dup_b])]);
        let merged = merge_datasets(&local, &Dataset::default(), now());

        let bucket = &merged.days[&DateKey::parse("2024-3-4").unwrap()];
        assert_eq!(bucket.len(), 1, "duplicates within a week collapse");
        assert_eq!(bucket[0].id.as_deref(), Some("task_best"));
    }

    #[test]
    fn merge_info_counts_add_up() {
        let local = dataset(&[("2024-3-4", vec![plain_task(Some("task_1"), "Shared", 0, 2)])]);
        let remote = dataset(&[
            ("2024-3-4", vec![plain_task(Some("task_1"), "Shared", 2, 2)]),
            ("2024-3-5", vec![plain_task(Some("task_2"), "New", 0, 1)]),
        ]);

        let merged = merge_datasets(&local, &remote, now());
        let info = merged.meta.merge_info.as_ref().unwrap();
        assert_eq!(info.local_task_count, 1);
        assert_eq!(info.remote_task_count, 2);
        assert_eq!(info.tasks_updated, 1);
        assert_eq!(info.tasks_added, 1);
        assert_eq!(info.final_task_count, 2);
        assert_eq!(info.merged_at, Some(now()));
    }
}
