//! History reconciler
//!
//! Maintains the bounded, newest-first log of daily outcomes. Entries are
//! keyed by (calendar date of recording, day name): repeated recordings of
//! the same key update one entry in place, keeping its first timestamp.

use chrono::{DateTime, FixedOffset, Utc};

use crate::config::HISTORY_LIMIT;
use crate::models::{DailyPlan, DayName, PlanHistoryEntry};

/// What [`record_or_update`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryWrite {
    /// An existing entry at this index was overwritten.
    Updated(usize),
    /// A new entry was prepended.
    Inserted,
}

/// Record a day's outcome, updating today's entry for `day_name` if present.
///
/// `now` carries the local offset used to decide calendar-date equality.
pub fn record_or_update(
    history: &mut Vec<PlanHistoryEntry>,
    now: DateTime<FixedOffset>,
    day_name: DayName,
    plan: DailyPlan,
    completed_checklist: Vec<bool>,
    affirmation: String,
) -> HistoryWrite {
    let today = now.date_naive();
    let offset = *now.offset();

    let existing = history.iter().position(|entry| {
        entry.day_name == day_name && entry.date.with_timezone(&offset).date_naive() == today
    });

    match existing {
        Some(index) => {
            let entry = &mut history[index];
            entry.plan = plan;
            entry.completed_checklist = completed_checklist;
            entry.affirmation = affirmation;
            tracing::debug!("Updated history entry for {} ({})", day_name, today);
            HistoryWrite::Updated(index)
        }
        None => {
            history.insert(
                0,
                PlanHistoryEntry {
                    date: now.with_timezone(&Utc),
                    day_name,
                    plan,
                    completed_checklist,
                    affirmation,
                },
            );
            history.truncate(HISTORY_LIMIT);
            tracing::debug!("Recorded new history entry for {} ({})", day_name, today);
            HistoryWrite::Inserted
        }
    }
}

/// Totals over the whole log
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistorySummary {
    pub days: usize,
    pub tasks_completed: usize,
    pub total_tasks: usize,
    /// Percentage, 0 when there are no tasks
    pub completion_rate: f64,
}

pub fn summarize(history: &[PlanHistoryEntry]) -> HistorySummary {
    let tasks_completed: usize = history.iter().map(PlanHistoryEntry::completed_count).sum();
    let total_tasks: usize = history.iter().map(|e| e.plan.checklist.len()).sum();
    let completion_rate = if total_tasks > 0 {
        tasks_completed as f64 / total_tasks as f64 * 100.0
    } else {
        0.0
    };

    HistorySummary {
        days: history.len(),
        tasks_completed,
        total_tasks,
        completion_rate,
    }
}
