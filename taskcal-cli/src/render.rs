//! Terminal rendering for taskcal types.
//!
//! Extension traits adding colored output to taskcal-core types using
//! owo_colors.

use chrono::Utc;
use owo_colors::OwoColorize;
use taskcal_core::sync::{SyncStatus, SyncStatusReport};
use taskcal_core::{Dataset, DateKey, Task};

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for Task {
    fn render(&self) -> String {
        let completion = self.completion();
        let progress = format!("[{}/{}]", completion.completed, completion.total);
        let progress = if completion.total > 0 && completion.completed == completion.total {
            progress.green().to_string()
        } else {
            progress.yellow().to_string()
        };

        let mut lines = vec![format!(
            "{} {} {}",
            progress,
            self.title,
            self.id.as_deref().unwrap_or("").dimmed()
        )];

        for step in &self.steps {
            let mark = if step.is_complete() {
                "x".green().to_string()
            } else {
                " ".to_string()
            };
            lines.push(format!("   [{}] {}", mark, step.description));
        }

        if !self.reflection.trim().is_empty() {
            lines.push(format!("   {} {}", "reflection:".dimmed(), self.reflection.trim()));
        }

        lines.join("\n")
    }
}

/// Render one week of the dataset, starting at the Monday of the week
/// containing `date`.
pub fn render_week(dataset: &Dataset, date: DateKey) -> String {
    let start = date.week_start();
    let mut lines = Vec::new();

    for offset in 0..7 {
        let day = start.add_days(offset);
        let heading = format!("{} {}", day.weekday(), day);
        lines.push(heading.bold().to_string());

        match dataset.days.get(&day) {
            Some(tasks) if !tasks.is_empty() => {
                for task in tasks {
                    for line in task.render().lines() {
                        lines.push(format!("  {line}"));
                    }
                }
            }
            _ => lines.push(format!("  {}", "no tasks".dimmed())),
        }

        if offset < 6 {
            lines.push(String::new());
        }
    }

    lines.join("\n")
}

impl Render for SyncStatusReport {
    fn render(&self) -> String {
        let status = match self.status {
            SyncStatus::Connected => self.status.to_string().green().to_string(),
            SyncStatus::Error => self.status.to_string().red().to_string(),
            SyncStatus::Syncing | SyncStatus::Connecting => {
                self.status.to_string().yellow().to_string()
            }
            SyncStatus::Disconnected => self.status.to_string().dimmed().to_string(),
        };

        let mut lines = vec![
            format!("Sync:      {}", if self.sync_enabled { "on" } else { "off" }),
            format!("Status:    {status}"),
            format!("Message:   {}", self.message),
        ];

        if let Some(at) = self.last_sync_time {
            let ago = (Utc::now() - at).to_std().unwrap_or_default();
            lines.push(format!(
                "Last sync: {} ago",
                humantime::format_duration(round_to_seconds(ago))
            ));
        }

        if self.failure_count > 0 {
            lines.push(format!(
                "Failures:  {} (retry {})",
                self.failure_count,
                if self.retry_eligible { "ready" } else { "waiting" }
            ));
        }

        lines.join("\n")
    }
}

fn round_to_seconds(d: std::time::Duration) -> std::time::Duration {
    std::time::Duration::from_secs(d.as_secs())
}
