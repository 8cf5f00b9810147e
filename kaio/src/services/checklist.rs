//! Checklist completion tracking
//!
//! Completion arrays are always sized from the checklist they shadow when
//! a plan is installed; toggling never grows them.

use crate::error::{AppError, Result};
use crate::models::{DayName, WeeklyChecklistCompletion};

/// Flip one weekly checklist flag and return the day's updated flags.
pub fn toggle_weekly(
    completion: &mut WeeklyChecklistCompletion,
    day: DayName,
    index: usize,
) -> Result<Vec<bool>> {
    let flags = completion.day_mut(day).ok_or(AppError::ChecklistIndexOutOfRange {
        day,
        index,
        len: 0,
    })?;
    toggle_flag(flags, day, index)?;
    Ok(flags.clone())
}

/// Flip a flag in place, rejecting indices past the end.
pub fn toggle_flag(flags: &mut [bool], day: DayName, index: usize) -> Result<()> {
    let len = flags.len();
    let flag = flags
        .get_mut(index)
        .ok_or(AppError::ChecklistIndexOutOfRange { day, index, len })?;
    *flag = !*flag;
    Ok(())
}

/// Percentage of checklist items done, 0 for an empty checklist.
pub fn completion_rate(completed: &[bool], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let done = completed.iter().filter(|d| **d).count();
    done as f64 / total as f64 * 100.0
}
