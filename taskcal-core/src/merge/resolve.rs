//! Conflict resolution between two versions of the same task, and
//! week-scoped deduplication within a bucket.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::date::DateKey;
use crate::task::Task;

/// Completion-ratio gap above which the more-complete version wins outright;
/// below it, recency decides.
const COMPLETION_GAP: f64 = 0.1;

// Dedup scoring weights. Heuristic; the no-loss and week-isolation
// guarantees do not depend on them.
const COMPLETED_STEP_SCORE: f64 = 10.0;
const REFLECTION_SCORE: f64 = 20.0;
const STEP_DETAIL_SCORE: f64 = 2.0;
const RECENCY_WINDOW_DAYS: i64 = 14;

/// Resolve two versions of the same logical task into one.
///
/// The winner keeps its steps; the loser backfills its reflection (when the
/// winner's is empty or shorter) and any steps beyond the winner's count, so
/// steps are never dropped. The result keeps an existing id (never
/// fabricates one when either side has one) and is stamped as modified now.
pub fn merge_task_versions(a: &Task, b: &Task, now: DateTime<Utc>) -> Task {
    let ratio_a = a.completion().ratio();
    let ratio_b = b.completion().ratio();

    let (winner, loser) = if (ratio_a - ratio_b).abs() > COMPLETION_GAP {
        if ratio_a > ratio_b { (a, b) } else { (b, a) }
    } else if b.last_modified > a.last_modified {
        (b, a)
    } else {
        (a, b)
    };

    let mut merged = winner.clone();

    let loser_reflection = loser.reflection.trim();
    if !loser_reflection.is_empty()
        && loser_reflection.len() > merged.reflection.trim().len()
    {
        merged.reflection = loser.reflection.clone();
    }

    if loser.steps.len() > merged.steps.len() {
        merged
            .steps
            .extend(loser.steps[merged.steps.len()..].iter().cloned());
    }

    if merged.id.is_none() {
        merged.id = loser.id.clone();
    }

    merged.last_modified = now;
    merged
}

/// Score a task for deduplication: completed work and reflections dominate,
/// detail and recency break ties.
pub fn score_task(task: &Task, now: DateTime<Utc>) -> f64 {
    let completion = task.completion();
    let mut score = COMPLETED_STEP_SCORE * completion.completed as f64
        + STEP_DETAIL_SCORE * completion.total as f64;

    if !task.reflection.trim().is_empty() {
        score += REFLECTION_SCORE;
    }

    let days_stale = (now - task.last_modified).num_days();
    score += (RECENCY_WINDOW_DAYS - days_stale).clamp(0, RECENCY_WINDOW_DAYS) as f64;

    score
}

/// Collapse duplicate recurring tasks within one bucket.
///
/// Recurring-titled tasks are grouped by `(week identifier, title)`; each
/// group keeps only its highest-scoring member (first wins on a tie). Plain
/// tasks pass through untouched and are never deduplicated by title.
pub fn dedup_bucket(tasks: Vec<Task>, bucket: DateKey, now: DateTime<Utc>) -> Vec<Task> {
    let mut best: HashMap<(DateKey, String), usize> = HashMap::new();

    for (index, task) in tasks.iter().enumerate() {
        if !task.recurring_identity() {
            continue;
        }
        let key = (task.week_identifier(bucket), task.title.clone());
        match best.get(&key) {
            Some(&current) if score_task(task, now) <= score_task(&tasks[current], now) => {}
            _ => {
                best.insert(key, index);
            }
        }
    }

    let keep: HashSet<usize> = best.into_values().collect();

    tasks
        .into_iter()
        .enumerate()
        .filter(|(index, task)| !task.recurring_identity() || keep.contains(index))
        .map(|(_, task)| task)
        .collect()
}
