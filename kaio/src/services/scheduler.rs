/// Scheduler Service
/// Decides when the weekly plan is stale and drives regeneration.
/// Generation runs at most once at a time and never holds the store lock
/// while waiting on the remote service.
use crate::clock::{resolve_in, Clock};
use crate::error::{GenerationError, Result};
use crate::models::{RegenerateTime, SchedulerConfig};
use crate::services::generator::{PlanGenerator, WeeklyPlanResponse};
use crate::services::store::PlanStore;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Monday of the week containing `date`.
pub fn monday_of_week(date: NaiveDate) -> NaiveDate {
    date - ChronoDuration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Wall time of the most recent occurrence of `weekday` (0 = Sunday) at
/// `time`, counting `today` as an occurrence even if `time` is still ahead.
pub fn occurrence_local(today: NaiveDate, weekday: u8, time: RegenerateTime) -> Option<NaiveDateTime> {
    if weekday > 6 {
        return None;
    }

    let days_back = (today.weekday().num_days_from_sunday() + 7 - u32::from(weekday)) % 7;
    Some((today - ChronoDuration::days(i64::from(days_back))).and_time(time.time()))
}

/// [`occurrence_local`] resolved in `now`'s timezone.
pub fn scheduled_occurrence<Tz: TimeZone>(
    now: &DateTime<Tz>,
    weekday: u8,
    time: RegenerateTime,
) -> Option<DateTime<Tz>> {
    let local = occurrence_local(now.date_naive(), weekday, time)?;
    resolve_in(&now.timezone(), local)
}

/// Whether the installed plan should be replaced at `now`.
///
/// True only when goals are set, a plan was generated before, and the
/// scheduled occurrence lies after that generation and not in the future.
/// The occurrence is resolved with `now`'s zone rules, so pass a real
/// zone rather than a fixed offset when DST matters.
pub fn is_stale<Tz: TimeZone>(config: &SchedulerConfig, now: &DateTime<Tz>) -> bool {
    let zone = now.timezone();
    stale_between(config, now.date_naive(), now.with_timezone(&Utc), |local| {
        resolve_in(&zone, local).map(|at| at.with_timezone(&Utc))
    })
}

/// [`is_stale`] as seen by `clock`, resolving the occurrence in its zone.
pub fn is_stale_at(config: &SchedulerConfig, clock: &dyn Clock) -> bool {
    let now = clock.now();
    stale_between(config, now.date_naive(), now.with_timezone(&Utc), |local| {
        clock.resolve_local(local).map(|at| at.with_timezone(&Utc))
    })
}

fn stale_between(
    config: &SchedulerConfig,
    today: NaiveDate,
    now: DateTime<Utc>,
    resolve: impl Fn(NaiveDateTime) -> Option<DateTime<Utc>>,
) -> bool {
    let has_goals = config
        .goals
        .as_deref()
        .is_some_and(|g| !g.trim().is_empty());
    if !has_goals {
        return false;
    }

    let Some(last) = config.last_generated else {
        return false;
    };

    let scheduled = occurrence_local(today, config.auto_regenerate_day, config.auto_regenerate_time)
        .and_then(resolve);

    match scheduled {
        Some(scheduled) => last < scheduled && scheduled <= now,
        None => false,
    }
}

/// Result of one regeneration attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegenerationOutcome {
    /// The plan is still current
    NotDue,
    /// Another generation is already running
    InFlight,
    /// No goals have been captured yet
    MissingGoals,
    /// A new plan was installed
    Regenerated,
}

/// Clears the in-flight flag when dropped
struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct Regenerator {
    store: Arc<Mutex<PlanStore>>,
    generator: Arc<dyn PlanGenerator>,
    in_flight: Arc<AtomicBool>,
    timeout: Duration,
}

impl Regenerator {
    pub fn new(
        store: Arc<Mutex<PlanStore>>,
        generator: Arc<dyn PlanGenerator>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            generator,
            in_flight: Arc::new(AtomicBool::new(false)),
            timeout,
        }
    }

    pub fn store(&self) -> Arc<Mutex<PlanStore>> {
        self.store.clone()
    }

    /// Whether a generation request is currently outstanding
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Start the polling loop. The first check runs immediately.
    pub fn start(self, poll_interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("Starting plan regeneration scheduler");

            let mut interval = tokio::time::interval(poll_interval);

            loop {
                interval.tick().await;

                match self.check_and_regenerate().await {
                    Ok(RegenerationOutcome::Regenerated) => {
                        tracing::info!("Weekly plan regenerated on schedule");
                    }
                    Ok(outcome) => tracing::debug!("Regeneration check: {:?}", outcome),
                    Err(e) => tracing::error!("Scheduled regeneration failed: {}", e),
                }
            }
        })
    }

    /// Regenerate the week if the schedule says the plan is stale.
    pub async fn check_and_regenerate(&self) -> Result<RegenerationOutcome> {
        if !self.store.lock().await.is_stale() {
            return Ok(RegenerationOutcome::NotDue);
        }

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            return Ok(RegenerationOutcome::InFlight);
        };

        // A previous holder may have just installed a plan
        let (goals, notes) = {
            let store = self.store.lock().await;
            if !store.is_stale() {
                return Ok(RegenerationOutcome::NotDue);
            }
            let config = store.scheduler_config();
            (config.goals.clone().unwrap_or_default(), config.user_notes.clone())
        };

        tracing::info!("Weekly plan is stale, generating a new one");
        let response = self.generate_week(&goals, notes.as_deref()).await?;
        self.store.lock().await.install_generated_week(response).await;

        Ok(RegenerationOutcome::Regenerated)
    }

    /// Regenerate the week on request, regardless of schedule.
    /// On success the view moves to today.
    pub async fn regenerate_now(&self) -> Result<RegenerationOutcome> {
        let Some((goals, notes)) = self.goals_and_notes().await else {
            return Ok(RegenerationOutcome::MissingGoals);
        };

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            return Ok(RegenerationOutcome::InFlight);
        };

        tracing::info!("Manual weekly plan regeneration requested");
        let response = self.generate_week(&goals, notes.as_deref()).await?;

        let mut store = self.store.lock().await;
        store.install_generated_week(response).await;
        store.reset_current_day().await;

        Ok(RegenerationOutcome::Regenerated)
    }

    /// Generate a single-day plan from the stored goals.
    pub async fn generate_today(&self) -> Result<RegenerationOutcome> {
        let Some((goals, _)) = self.goals_and_notes().await else {
            return Ok(RegenerationOutcome::MissingGoals);
        };

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            return Ok(RegenerationOutcome::InFlight);
        };

        let plan = self
            .bounded(self.generator.generate_day(&goals))
            .await
            .inspect_err(|e| tracing::error!("Daily plan generation failed: {}", e))?;

        self.store.lock().await.set_current_plan(plan).await;
        Ok(RegenerationOutcome::Regenerated)
    }

    async fn goals_and_notes(&self) -> Option<(String, Option<String>)> {
        let store = self.store.lock().await;
        let config = store.scheduler_config();
        let goals = config.goals.clone().filter(|g| !g.trim().is_empty())?;
        Some((goals, config.user_notes.clone()))
    }

    async fn generate_week(
        &self,
        goals: &str,
        notes: Option<&str>,
    ) -> std::result::Result<WeeklyPlanResponse, GenerationError> {
        self.bounded(self.generator.generate_week(goals, notes))
            .await
            .inspect_err(|e| tracing::error!("Weekly plan generation failed: {}", e))
    }

    async fn bounded<T>(
        &self,
        request: impl Future<Output = std::result::Result<T, GenerationError>>,
    ) -> std::result::Result<T, GenerationError> {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout {
                secs: self.timeout.as_secs(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::AppError;
    use crate::models::{DailyPlan, DayName, GroceryDraft, Meal};
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;
    use chrono::FixedOffset;
    use chrono_tz::Europe::Berlin;
    use std::sync::atomic::AtomicUsize;

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(-5 * 3600).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        offset().with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn sunday_six(last: DateTime<FixedOffset>) -> SchedulerConfig {
        SchedulerConfig {
            auto_regenerate_day: 0,
            auto_regenerate_time: RegenerateTime::new(6, 0).unwrap(),
            last_generated: Some(last.with_timezone(&Utc)),
            goals: Some("lose weight".to_string()),
            user_notes: None,
        }
    }

    #[test]
    fn test_monday_of_week() {
        let monday = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
        for day in 12..=18 {
            let date = NaiveDate::from_ymd_opt(2026, 10, day).unwrap();
            assert_eq!(monday_of_week(date), monday);
        }
        assert_eq!(
            monday_of_week(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()),
            NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
        );
    }

    #[test]
    fn test_scheduled_occurrence_steps_back() {
        let time = RegenerateTime::new(6, 0).unwrap();

        // Wednesday -> previous Sunday
        let wed = at(2026, 10, 14, 12, 0);
        assert_eq!(scheduled_occurrence(&wed, 0, time), Some(at(2026, 10, 11, 6, 0)));

        // Sunday before the time still counts today
        let early_sunday = at(2026, 10, 18, 5, 0);
        assert_eq!(
            scheduled_occurrence(&early_sunday, 0, time),
            Some(at(2026, 10, 18, 6, 0))
        );

        assert_eq!(scheduled_occurrence(&wed, 7, time), None);
    }

    #[test]
    fn test_stale_boundary() {
        let config = sunday_six(at(2026, 10, 11, 5, 59));

        assert!(is_stale(&config, &at(2026, 10, 18, 6, 1)));
        assert!(is_stale(&config, &at(2026, 10, 18, 6, 0)));
        assert!(!is_stale(&config, &at(2026, 10, 18, 5, 59)));
    }

    #[test]
    fn test_not_stale_after_generation_this_week() {
        let config = sunday_six(at(2026, 10, 11, 6, 1));

        assert!(!is_stale(&config, &at(2026, 10, 14, 9, 0)));
        assert!(!is_stale(&config, &at(2026, 10, 18, 5, 0)));
        assert!(is_stale(&config, &at(2026, 10, 18, 7, 0)));
    }

    #[test]
    fn test_not_stale_without_goals_or_history() {
        let mut config = sunday_six(at(2026, 10, 4, 6, 0));
        let now = at(2026, 10, 14, 9, 0);
        assert!(is_stale(&config, &now));

        config.goals = Some("   ".to_string());
        assert!(!is_stale(&config, &now));

        config.goals = Some("goals".to_string());
        config.last_generated = None;
        assert!(!is_stale(&config, &now));

        config.last_generated = Some(at(2026, 10, 4, 6, 0).with_timezone(&Utc));
        config.auto_regenerate_day = 9;
        assert!(!is_stale(&config, &now));
    }

    #[test]
    fn test_fall_back_does_not_refire_occurrence() {
        let config = SchedulerConfig {
            auto_regenerate_day: 6,
            auto_regenerate_time: RegenerateTime::new(6, 0).unwrap(),
            last_generated: Some(Berlin.with_ymd_and_hms(2026, 10, 24, 6, 1, 0).unwrap().with_timezone(&Utc)),
            goals: Some("stay consistent".to_string()),
            user_notes: None,
        };

        // Clocks went back an hour overnight
        let sunday = Berlin.with_ymd_and_hms(2026, 10, 25, 9, 0, 0).unwrap();
        assert!(!is_stale(&config, &sunday));

        let next_saturday = Berlin.with_ymd_and_hms(2026, 10, 31, 5, 59, 0).unwrap();
        assert!(!is_stale(&config, &next_saturday));
        assert!(is_stale(&config, &(next_saturday + ChronoDuration::minutes(1))));
    }

    #[test]
    fn test_occurrence_in_spring_gap_moves_forward() {
        // 02:30 is skipped on 2026-03-29 in Berlin
        let time = RegenerateTime::new(2, 30).unwrap();
        let now = Berlin.with_ymd_and_hms(2026, 3, 29, 12, 0, 0).unwrap();

        let occurrence = scheduled_occurrence(&now, 0, time).unwrap();

        assert_eq!(
            occurrence.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2026, 3, 29, 1, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let flag = Arc::new(AtomicBool::new(false));
        let guard = InFlightGuard::acquire(&flag).unwrap();
        assert!(InFlightGuard::acquire(&flag).is_none());
        drop(guard);
        assert!(InFlightGuard::acquire(&flag).is_some());
    }

    // ----- Regenerator -----

    #[derive(Clone, Copy)]
    enum Script {
        Succeed,
        Invalid,
        Hang,
    }

    struct FakeGenerator {
        script: Script,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl FakeGenerator {
        fn new(script: Script) -> Self {
            Self {
                script,
                delay: Duration::from_millis(50),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn plan() -> DailyPlan {
        DailyPlan {
            wake_time: "7:00 AM".to_string(),
            hydration: "3 liters".to_string(),
            meals: vec![Meal {
                name: "Lunch".to_string(),
                calories: 500,
                protein: 35,
                details: "Chicken wrap".to_string(),
            }],
            workout: "Rest day".to_string(),
            checklist: vec!["Walk".to_string(), "Stretch".to_string()],
            beard_care: None,
            lifestyle_tips: None,
        }
    }

    #[async_trait]
    impl PlanGenerator for FakeGenerator {
        async fn generate_day(&self, _goals: &str) -> std::result::Result<DailyPlan, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            match self.script {
                Script::Succeed => Ok(plan()),
                Script::Invalid => Err(GenerationError::SchemaValidation("meals".to_string())),
                Script::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(plan())
                }
            }
        }

        async fn generate_week(
            &self,
            _goals: &str,
            _user_notes: Option<&str>,
        ) -> std::result::Result<WeeklyPlanResponse, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            match self.script {
                Script::Succeed => Ok(WeeklyPlanResponse {
                    days: DayName::ALL.iter().map(|d| (*d, plan())).collect(),
                    grocery_list: vec![GroceryDraft {
                        name: "Chicken".to_string(),
                        category: "Protein".to_string(),
                    }],
                }),
                Script::Invalid => Err(GenerationError::SchemaValidation("Sunday".to_string())),
                Script::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Err(GenerationError::Network("unreachable".to_string()))
                }
            }
        }
    }

    async fn stale_setup(
        script: Script,
        timeout: Duration,
    ) -> (Regenerator, Arc<FakeGenerator>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(at(2026, 10, 11, 7, 0)));
        let mut store = PlanStore::open(Arc::new(MemoryStorage::new()), clock.clone()).await;
        store.set_goals("build muscle").await;
        store
            .install_generated_week(WeeklyPlanResponse {
                days: DayName::ALL.iter().map(|d| (*d, plan())).collect(),
                grocery_list: vec![],
            })
            .await;

        // One week later, past Sunday 06:00
        clock.set(at(2026, 10, 18, 6, 30));

        let generator = Arc::new(FakeGenerator::new(script));
        let regenerator = Regenerator::new(Arc::new(Mutex::new(store)), generator.clone(), timeout);
        (regenerator, generator, clock)
    }

    #[tokio::test]
    async fn test_regenerates_once_per_occurrence() {
        let (regenerator, generator, clock) =
            stale_setup(Script::Succeed, Duration::from_secs(5)).await;

        assert_eq!(
            regenerator.check_and_regenerate().await.unwrap(),
            RegenerationOutcome::Regenerated
        );
        clock.advance(ChronoDuration::minutes(1));
        assert_eq!(
            regenerator.check_and_regenerate().await.unwrap(),
            RegenerationOutcome::NotDue
        );
        assert_eq!(generator.calls(), 1);

        let store = regenerator.store();
        let store = store.lock().await;
        assert_eq!(
            store.weekly_plan().unwrap().start_date,
            NaiveDate::from_ymd_opt(2026, 10, 12).unwrap()
        );
        assert_eq!(store.grocery_list()[0].category, "protein");
    }

    #[tokio::test]
    async fn test_concurrent_checks_generate_once() {
        let (regenerator, generator, _clock) =
            stale_setup(Script::Succeed, Duration::from_secs(5)).await;

        let (a, b) = tokio::join!(
            regenerator.check_and_regenerate(),
            regenerator.check_and_regenerate()
        );
        let mut outcomes = vec![a.unwrap(), b.unwrap()];
        outcomes.sort_by_key(|o| format!("{:?}", o));

        assert_eq!(
            outcomes,
            vec![RegenerationOutcome::InFlight, RegenerationOutcome::Regenerated]
        );
        assert_eq!(generator.calls(), 1);
        assert!(!regenerator.is_running());
    }

    #[tokio::test]
    async fn test_failure_leaves_state_untouched() {
        let (regenerator, _generator, _clock) =
            stale_setup(Script::Invalid, Duration::from_secs(5)).await;
        let before = regenerator.store().lock().await.state().clone();

        let err = regenerator.check_and_regenerate().await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Generation(GenerationError::SchemaValidation(_))
        ));
        assert_eq!(regenerator.store().lock().await.state(), &before);
        assert!(!regenerator.is_running());
        // Still stale, so the next poll retries
        assert!(regenerator.store().lock().await.is_stale());
    }

    #[tokio::test]
    async fn test_generation_timeout() {
        let (regenerator, _generator, _clock) =
            stale_setup(Script::Hang, Duration::from_millis(100)).await;

        let err = regenerator.check_and_regenerate().await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Generation(GenerationError::Timeout { .. })
        ));
        assert!(!regenerator.is_running());
    }

    #[tokio::test]
    async fn test_manual_regeneration_and_missing_goals() {
        let clock = Arc::new(ManualClock::new(at(2026, 10, 14, 9, 0)));
        let store = PlanStore::open(Arc::new(MemoryStorage::new()), clock).await;
        let store = Arc::new(Mutex::new(store));
        let generator = Arc::new(FakeGenerator::new(Script::Succeed));
        let regenerator = Regenerator::new(store.clone(), generator.clone(), Duration::from_secs(5));

        assert_eq!(
            regenerator.regenerate_now().await.unwrap(),
            RegenerationOutcome::MissingGoals
        );
        assert_eq!(generator.calls(), 0);

        {
            let mut store = store.lock().await;
            store.set_goals("get lean").await;
            store.set_current_day_index(0).await;
        }

        assert_eq!(
            regenerator.regenerate_now().await.unwrap(),
            RegenerationOutcome::Regenerated
        );
        let store = store.lock().await;
        assert!(store.weekly_plan().is_some());
        assert_eq!(store.current_day(), DayName::Wednesday);
        assert!(store.scheduler_config().last_generated.is_some());
    }

    #[tokio::test]
    async fn test_generate_today_installs_daily_plan() {
        let clock = Arc::new(ManualClock::new(at(2026, 10, 14, 9, 0)));
        let mut store = PlanStore::open(Arc::new(MemoryStorage::new()), clock).await;
        store.set_goals("sleep better").await;
        let store = Arc::new(Mutex::new(store));
        let regenerator = Regenerator::new(
            store.clone(),
            Arc::new(FakeGenerator::new(Script::Succeed)),
            Duration::from_secs(5),
        );

        assert_eq!(
            regenerator.generate_today().await.unwrap(),
            RegenerationOutcome::Regenerated
        );

        let store = store.lock().await;
        assert_eq!(store.current_plan(), Some(&plan()));
        assert_eq!(store.state().completed_checklist, vec![false, false]);
        assert!(store.weekly_plan().is_none());
    }

    #[tokio::test]
    async fn test_regenerates_once_across_fall_back() {
        let clock = Arc::new(ManualClock::in_zone(
            Berlin,
            Berlin.with_ymd_and_hms(2026, 10, 24, 6, 1, 0).unwrap(),
        ));
        let mut store = PlanStore::open(Arc::new(MemoryStorage::new()), clock.clone()).await;
        store.set_goals("stay consistent").await;
        store.set_auto_regenerate_day(6).await.unwrap();
        store
            .install_generated_week(WeeklyPlanResponse {
                days: DayName::ALL.iter().map(|d| (*d, plan())).collect(),
                grocery_list: vec![],
            })
            .await;
        store.toggle_checklist_item(DayName::Saturday, 0).await.unwrap();

        let generator = Arc::new(FakeGenerator::new(Script::Succeed));
        let regenerator = Regenerator::new(
            Arc::new(Mutex::new(store)),
            generator.clone(),
            Duration::from_secs(5),
        );

        clock.set(Berlin.with_ymd_and_hms(2026, 10, 25, 9, 0, 0).unwrap());
        assert_eq!(
            regenerator.check_and_regenerate().await.unwrap(),
            RegenerationOutcome::NotDue
        );
        assert_eq!(generator.calls(), 0);
        assert_eq!(
            regenerator
                .store()
                .lock()
                .await
                .weekly_completion()
                .day(DayName::Saturday)
                .unwrap(),
            &[true, false]
        );

        clock.set(Berlin.with_ymd_and_hms(2026, 10, 31, 6, 30, 0).unwrap());
        assert_eq!(
            regenerator.check_and_regenerate().await.unwrap(),
            RegenerationOutcome::Regenerated
        );
        assert_eq!(generator.calls(), 1);
    }
}
