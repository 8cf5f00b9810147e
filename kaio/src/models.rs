//! Plan data model
//!
//! Entity definitions shared by the store, the scheduler and the
//! generation client. All models use serde; the persisted blob uses
//! camelCase keys while daily plans keep the generation wire names.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::config::{DEFAULT_REGENERATE_DAY, DEFAULT_REGENERATE_TIME};

/// Day of the plan week. Ordering is Monday first, Sunday last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DayName {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayName {
    pub const ALL: [DayName; 7] = [
        DayName::Monday,
        DayName::Tuesday,
        DayName::Wednesday,
        DayName::Thursday,
        DayName::Friday,
        DayName::Saturday,
        DayName::Sunday,
    ];

    /// Position in the plan week, Monday = 0.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Inverse of [`DayName::index`], wrapping modulo 7.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 7]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DayName::Monday => "Monday",
            DayName::Tuesday => "Tuesday",
            DayName::Wednesday => "Wednesday",
            DayName::Thursday => "Thursday",
            DayName::Friday => "Friday",
            DayName::Saturday => "Saturday",
            DayName::Sunday => "Sunday",
        }
    }
}

impl From<Weekday> for DayName {
    fn from(weekday: Weekday) -> Self {
        Self::from_index(weekday.num_days_from_monday() as usize)
    }
}

impl fmt::Display for DayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayName {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Unknown day name: {}", s))
    }
}

/// A single meal. Immutable once part of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meal {
    pub name: String,
    pub calories: u32,
    pub protein: u32,
    pub details: String,
}

/// One day's routine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPlan {
    pub wake_time: String,
    pub hydration: String,
    pub meals: Vec<Meal>,
    /// Free text, line breaks separate exercises
    pub workout: String,
    pub checklist: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beard_care: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifestyle_tips: Option<Vec<String>>,
}

impl DailyPlan {
    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.meals.is_empty() {
            return Err("meals must contain at least one entry".to_string());
        }
        if self.checklist.is_empty() {
            return Err("checklist must contain at least one item".to_string());
        }
        Ok(())
    }
}

/// A full week of daily plans anchored to its Monday
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyPlan {
    pub start_date: NaiveDate,
    pub days: BTreeMap<DayName, DailyPlan>,
}

impl WeeklyPlan {
    pub fn new(start_date: NaiveDate, days: BTreeMap<DayName, DailyPlan>) -> Self {
        Self { start_date, days }
    }

    /// A plan is usable only once all seven days are present.
    pub fn is_complete(&self) -> bool {
        DayName::ALL.iter().all(|d| self.days.contains_key(d))
    }

    pub fn day(&self, day: DayName) -> Option<&DailyPlan> {
        self.days.get(&day)
    }
}

/// Grocery entry as returned by the generator, before the store assigns an id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroceryDraft {
    pub name: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroceryItem {
    /// Assigned by the store, never edited
    pub id: String,
    pub name: String,
    /// Trimmed lowercase
    pub category: String,
    pub purchased: bool,
}

/// Recorded snapshot of one day's plan and completion state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanHistoryEntry {
    /// First time this (calendar date, day name) pair was recorded
    pub date: DateTime<Utc>,
    pub day_name: DayName,
    pub plan: DailyPlan,
    /// Index-aligned with `plan.checklist`
    pub completed_checklist: Vec<bool>,
    pub affirmation: String,
}

impl PlanHistoryEntry {
    pub fn completed_count(&self) -> usize {
        self.completed_checklist.iter().filter(|done| **done).count()
    }
}

/// Per-day completion flags, index-aligned with each day's checklist
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeeklyChecklistCompletion(pub BTreeMap<DayName, Vec<bool>>);

impl WeeklyChecklistCompletion {
    /// All-false completion sized from each day's checklist.
    pub fn for_plan(plan: &WeeklyPlan) -> Self {
        Self(
            plan.days
                .iter()
                .map(|(day, daily)| (*day, vec![false; daily.checklist.len()]))
                .collect(),
        )
    }

    pub fn day(&self, day: DayName) -> Option<&[bool]> {
        self.0.get(&day).map(Vec::as_slice)
    }

    pub fn day_mut(&mut self, day: DayName) -> Option<&mut Vec<bool>> {
        self.0.get_mut(&day)
    }
}

/// Time of day for automatic regeneration, stored as "HH:MM"
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RegenerateTime(NaiveTime);

impl RegenerateTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn time(self) -> NaiveTime {
        self.0
    }
}

impl Default for RegenerateTime {
    fn default() -> Self {
        DEFAULT_REGENERATE_TIME
            .parse()
            .unwrap_or(Self(NaiveTime::default()))
    }
}

impl FromStr for RegenerateTime {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let (hours, minutes) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid time '{}', expected HH:MM", s))?;
        let hour: u32 = hours
            .parse()
            .map_err(|_| format!("Invalid hour in '{}'", s))?;
        let minute: u32 = minutes
            .parse()
            .map_err(|_| format!("Invalid minute in '{}'", s))?;
        Self::new(hour, minute).ok_or_else(|| format!("Time out of range: {}", s))
    }
}

impl fmt::Display for RegenerateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl Serialize for RegenerateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RegenerateTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Daily rollover time preference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResetTime {
    #[serde(rename = "00:00")]
    Midnight,
    #[default]
    #[serde(rename = "06:00")]
    SixAm,
}

/// Inputs of the regeneration scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// 0 = Sunday .. 6 = Saturday
    #[serde(default = "default_regenerate_day")]
    pub auto_regenerate_day: u8,
    #[serde(default)]
    pub auto_regenerate_time: RegenerateTime,
    #[serde(default)]
    pub last_generated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub goals: Option<String>,
    #[serde(default)]
    pub user_notes: Option<String>,
}

fn default_regenerate_day() -> u8 {
    DEFAULT_REGENERATE_DAY
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            auto_regenerate_day: default_regenerate_day(),
            auto_regenerate_time: RegenerateTime::default(),
            last_generated: None,
            goals: None,
            user_notes: None,
        }
    }
}

/// Answers from the onboarding questionnaire; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub age: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub gender: Option<String>,
    pub fitness_goals: Option<String>,
    pub workout_frequency: Option<String>,
    pub dietary_preferences: Option<String>,
    pub supplements: Option<String>,
    pub has_beard: Option<bool>,
    pub beard_length: Option<String>,
    pub beard_style: Option<String>,
    pub beard_care_preferences: Option<String>,
    pub wake_time: Option<String>,
    pub sleep_time: Option<String>,
    pub lifestyle_goals: Option<String>,
    pub additional_info: Option<String>,
}

impl UserProfile {
    /// Render answered questions as goals text, one "question answer" line each.
    pub fn describe(&self) -> String {
        let text = |question: &str, answer: &Option<String>| {
            answer
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(|a| format!("{} {}", question, a))
        };
        let beard = self.has_beard == Some(true);

        let lines = [
            text("How old are you?", &self.age),
            text("What's your height?", &self.height),
            text("What's your current weight?", &self.weight),
            text("What's your gender?", &self.gender),
            text("What are your fitness goals?", &self.fitness_goals),
            text("How often do you work out per week?", &self.workout_frequency),
            text("Any dietary preferences or restrictions?", &self.dietary_preferences),
            text("Do you take any supplements?", &self.supplements),
            self.has_beard.map(|b| format!("Do you have a beard? {}", b)),
            text("How long is your beard?", &self.beard_length).filter(|_| beard),
            text("What style is your beard?", &self.beard_style).filter(|_| beard),
            text("What are your beard care goals?", &self.beard_care_preferences).filter(|_| beard),
            text("What time do you usually wake up?", &self.wake_time),
            text("What time do you usually go to sleep?", &self.sleep_time),
            text("Any other lifestyle goals or habits you want to build?", &self.lifestyle_goals),
            text("Anything else you'd like to add?", &self.additional_info),
        ];

        lines.into_iter().flatten().collect::<Vec<_>>().join("\n")
    }
}

/// Full persisted state: the single blob written after every mutation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanState {
    pub user_profile: UserProfile,
    pub current_plan: Option<DailyPlan>,
    pub completed_checklist: Vec<bool>,
    pub weekly_plan: Option<WeeklyPlan>,
    pub weekly_checklist_completion: WeeklyChecklistCompletion,
    /// Transient view position, 0 = Monday
    pub current_day_index: usize,
    pub grocery_list: Vec<GroceryItem>,
    /// Newest first
    pub history: Vec<PlanHistoryEntry>,
    pub reset_time: ResetTime,
    pub scheduler: SchedulerConfig,
}
