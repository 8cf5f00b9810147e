//! Persisted plan store
//!
//! Single source of truth for profile, plans, checklist completion,
//! groceries, history and scheduler settings. Every mutation replaces the
//! affected subtree and then writes the whole state blob back to durable
//! storage. When storage is unavailable the store keeps working in memory.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};

use crate::clock::Clock;
use crate::error::{AppError, Result};
use crate::models::{
    DailyPlan, DayName, GroceryDraft, GroceryItem, PlanHistoryEntry, PlanState, RegenerateTime,
    ResetTime, SchedulerConfig, UserProfile, WeeklyChecklistCompletion, WeeklyPlan,
};
use crate::services::generator::WeeklyPlanResponse;
use crate::services::history::{self, HistorySummary, HistoryWrite};
use crate::services::{affirmations, checklist, grocery, scheduler};
use crate::storage::StateStorage;

pub struct PlanStore {
    state: PlanState,
    storage: Arc<dyn StateStorage>,
    clock: Arc<dyn Clock>,
    durable: bool,
}

impl PlanStore {
    /// Rehydrate from storage, falling back to empty defaults.
    ///
    /// Never fails: unreadable storage switches the store to in-memory
    /// mode, and an unparseable blob is replaced on the next write.
    pub async fn open(storage: Arc<dyn StateStorage>, clock: Arc<dyn Clock>) -> Self {
        let fresh = || PlanState {
            current_day_index: today(clock.as_ref()).index(),
            ..PlanState::default()
        };

        let mut durable = true;
        let state = match storage.read().await {
            Ok(Some(blob)) => match serde_json::from_str::<PlanState>(&blob) {
                Ok(state) => {
                    tracing::info!(
                        "Rehydrated plan state from {} ({} history entries)",
                        storage.describe(),
                        state.history.len()
                    );
                    state
                }
                Err(e) => {
                    tracing::error!("Stored plan state is unreadable, starting fresh: {}", e);
                    fresh()
                }
            },
            Ok(None) => {
                tracing::info!("No stored plan state in {}, starting fresh", storage.describe());
                fresh()
            }
            Err(e) => {
                tracing::warn!(
                    "Durable storage {} unavailable, continuing in memory: {}",
                    storage.describe(),
                    e
                );
                durable = false;
                fresh()
            }
        };

        Self {
            state,
            storage,
            clock,
            durable,
        }
    }

    pub fn state(&self) -> &PlanState {
        &self.state
    }

    /// False once durable storage has failed; state then lives in memory only.
    pub fn is_durable(&self) -> bool {
        self.durable
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now()
    }

    async fn persist(&mut self) {
        if !self.durable {
            return;
        }

        let blob = match serde_json::to_string(&self.state) {
            Ok(blob) => blob,
            Err(e) => {
                tracing::error!("Failed to serialize plan state: {}", e);
                return;
            }
        };

        if let Err(e) = self.storage.write(&blob).await {
            tracing::warn!(
                "Failed to write plan state to {}, continuing in memory: {}",
                self.storage.describe(),
                e
            );
            self.durable = false;
        }
    }

    // ===== Profile and settings =====

    pub fn scheduler_config(&self) -> &SchedulerConfig {
        &self.state.scheduler
    }

    pub async fn set_user_profile(&mut self, profile: UserProfile) {
        self.state.user_profile = profile;
        self.persist().await;
    }

    /// Store the profile and derive the goals text from it.
    pub async fn set_goals_from_profile(&mut self, profile: UserProfile) {
        self.state.scheduler.goals = non_blank(profile.describe());
        self.state.user_profile = profile;
        self.persist().await;
    }

    /// Blank goals count as absent.
    pub async fn set_goals(&mut self, goals: impl Into<String>) {
        self.state.scheduler.goals = non_blank(goals.into());
        self.persist().await;
    }

    pub async fn set_user_notes(&mut self, notes: impl Into<String>) {
        self.state.scheduler.user_notes = non_blank(notes.into());
        self.persist().await;
    }

    /// 0 = Sunday .. 6 = Saturday
    pub async fn set_auto_regenerate_day(&mut self, day: u8) -> Result<()> {
        if day > 6 {
            return Err(AppError::InvalidSchedule(format!(
                "regeneration day must be 0 (Sunday) to 6 (Saturday), got {}",
                day
            )));
        }
        self.state.scheduler.auto_regenerate_day = day;
        self.persist().await;
        Ok(())
    }

    /// Accepts "HH:MM".
    pub async fn set_auto_regenerate_time(&mut self, time: &str) -> Result<()> {
        let parsed: RegenerateTime = time.parse().map_err(AppError::InvalidSchedule)?;
        self.state.scheduler.auto_regenerate_time = parsed;
        self.persist().await;
        Ok(())
    }

    pub async fn set_reset_time(&mut self, reset_time: ResetTime) {
        self.state.reset_time = reset_time;
        self.persist().await;
    }

    /// Whether the installed plan is due for replacement right now.
    pub fn is_stale(&self) -> bool {
        scheduler::is_stale_at(&self.state.scheduler, self.clock.as_ref())
    }

    // ===== Plan installation =====

    pub fn weekly_plan(&self) -> Option<&WeeklyPlan> {
        self.state.weekly_plan.as_ref()
    }

    pub fn weekly_completion(&self) -> &WeeklyChecklistCompletion {
        &self.state.weekly_checklist_completion
    }

    /// Replace the weekly plan wholesale and reset its completion flags.
    pub async fn install_weekly_plan(&mut self, plan: WeeklyPlan) {
        self.replace_weekly_plan(plan);
        self.persist().await;
    }

    fn replace_weekly_plan(&mut self, plan: WeeklyPlan) {
        self.state.weekly_checklist_completion = WeeklyChecklistCompletion::for_plan(&plan);
        tracing::info!("Installed weekly plan starting {}", plan.start_date);
        self.state.weekly_plan = Some(plan);
    }

    /// Install a generated week: plan anchored to this week's Monday,
    /// fresh grocery list, reset completion and `last_generated = now`,
    /// all written in one step.
    pub async fn install_generated_week(&mut self, response: WeeklyPlanResponse) {
        let now = self.clock.now();
        let start_date = scheduler::monday_of_week(now.date_naive());

        self.replace_weekly_plan(WeeklyPlan::new(start_date, response.days));
        self.state.grocery_list = grocery::build_list(response.grocery_list);
        self.state.scheduler.last_generated = Some(now.with_timezone(&Utc));
        self.persist().await;
    }

    pub fn current_plan(&self) -> Option<&DailyPlan> {
        self.state.current_plan.as_ref()
    }

    /// Replace the single-day plan and reset its completion flags.
    pub async fn set_current_plan(&mut self, plan: DailyPlan) {
        self.state.completed_checklist = vec![false; plan.checklist.len()];
        self.state.current_plan = Some(plan);
        self.persist().await;
    }

    // ===== Checklists =====

    /// Flip one item of a weekly day's checklist and reconcile history.
    pub async fn toggle_checklist_item(&mut self, day: DayName, index: usize) -> Result<()> {
        let plan = self
            .state
            .weekly_plan
            .as_ref()
            .and_then(|p| p.day(day))
            .cloned()
            .ok_or(AppError::PlanNotInstalled)?;

        let flags = checklist::toggle_weekly(&mut self.state.weekly_checklist_completion, day, index)?;
        tracing::debug!("Toggled {} checklist item {}", day, index);

        self.record(day, plan, flags);
        self.persist().await;
        Ok(())
    }

    /// Flip one item of the single-day plan.
    ///
    /// History tracks the weekly plan only, so this never touches it.
    pub async fn toggle_daily_checklist_item(&mut self, index: usize) -> Result<()> {
        if self.state.current_plan.is_none() {
            return Err(AppError::PlanNotInstalled);
        }
        let day = today(self.clock.as_ref());

        checklist::toggle_flag(&mut self.state.completed_checklist, day, index)?;
        tracing::debug!("Toggled daily checklist item {}", index);

        self.persist().await;
        Ok(())
    }

    fn record(&mut self, day: DayName, plan: DailyPlan, flags: Vec<bool>) -> HistoryWrite {
        let rate = checklist::completion_rate(&flags, plan.checklist.len());
        let now = self.clock.now();
        history::record_or_update(
            &mut self.state.history,
            now,
            day,
            plan,
            flags,
            affirmations::affirmation(rate),
        )
    }

    // ===== Day navigation =====

    pub fn current_day(&self) -> DayName {
        DayName::from_index(self.state.current_day_index)
    }

    pub async fn set_current_day_index(&mut self, index: usize) {
        self.state.current_day_index = index % 7;
        self.persist().await;
    }

    /// Capture the viewed day's final state in history, then move forward.
    pub async fn next_day(&mut self) -> DayName {
        let day = self.current_day();
        let snapshot = self.state.weekly_plan.as_ref().and_then(|p| p.day(day)).cloned();

        if let Some(plan) = snapshot {
            let flags = self
                .state
                .weekly_checklist_completion
                .day(day)
                .map(<[bool]>::to_vec)
                .unwrap_or_else(|| vec![false; plan.checklist.len()]);
            self.record(day, plan, flags);
        }

        self.state.current_day_index = (self.state.current_day_index + 1) % 7;
        self.persist().await;
        self.current_day()
    }

    pub async fn previous_day(&mut self) -> DayName {
        self.state.current_day_index = (self.state.current_day_index + 6) % 7;
        self.persist().await;
        self.current_day()
    }

    /// Point the view at today's weekday.
    pub async fn reset_current_day(&mut self) {
        self.state.current_day_index = today(self.clock.as_ref()).index();
        self.persist().await;
    }

    // ===== Groceries =====

    pub fn grocery_list(&self) -> &[GroceryItem] {
        &self.state.grocery_list
    }

    pub fn grocery_groups(&self) -> Vec<grocery::GroceryGroup<'_>> {
        grocery::group_by_category(&self.state.grocery_list)
    }

    /// Replace the list, assigning fresh ids.
    pub async fn set_grocery_list(&mut self, drafts: Vec<GroceryDraft>) {
        self.state.grocery_list = grocery::build_list(drafts);
        self.persist().await;
    }

    pub async fn toggle_grocery_item(&mut self, id: &str) -> bool {
        let found = grocery::toggle(&mut self.state.grocery_list, id);
        self.persist_if(found, "toggle", id).await
    }

    pub async fn delete_grocery_item(&mut self, id: &str) -> bool {
        let found = grocery::delete(&mut self.state.grocery_list, id);
        self.persist_if(found, "delete", id).await
    }

    pub async fn update_grocery_item_name(&mut self, id: &str, name: &str) -> bool {
        let found = grocery::rename(&mut self.state.grocery_list, id, name);
        self.persist_if(found, "rename", id).await
    }

    pub async fn update_grocery_item_category(&mut self, id: &str, category: &str) -> bool {
        let found = grocery::recategorize(&mut self.state.grocery_list, id, category);
        self.persist_if(found, "recategorize", id).await
    }

    async fn persist_if(&mut self, found: bool, action: &str, id: &str) -> bool {
        if found {
            self.persist().await;
        } else {
            tracing::debug!("Grocery {} ignored, no item {}", action, id);
        }
        found
    }

    // ===== History =====

    pub fn history(&self) -> &[PlanHistoryEntry] {
        &self.state.history
    }

    pub fn history_summary(&self) -> HistorySummary {
        history::summarize(&self.state.history)
    }

    pub async fn clear_history(&mut self) {
        self.state.history.clear();
        self.persist().await;
    }

    /// Forget everything except the schedule settings.
    pub async fn clear_all_data(&mut self) {
        let scheduler = SchedulerConfig {
            auto_regenerate_day: self.state.scheduler.auto_regenerate_day,
            auto_regenerate_time: self.state.scheduler.auto_regenerate_time,
            ..SchedulerConfig::default()
        };

        self.state = PlanState {
            current_day_index: today(self.clock.as_ref()).index(),
            reset_time: self.state.reset_time,
            scheduler,
            ..PlanState::default()
        };

        tracing::info!("Cleared all plan data");
        self.persist().await;
    }
}

fn today(clock: &dyn Clock) -> DayName {
    use chrono::Datelike;
    DayName::from(clock.now().weekday())
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
