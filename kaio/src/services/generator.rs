//! Plan generation client
//!
//! Request/response contract of the text-generation service that writes
//! daily and weekly plans. Responses are fence-stripped, parsed and
//! validated here so the store only ever sees well-formed plans.
//!
//! Failure kinds are kept apart (see [`GenerationError`]): missing
//! credential, HTTP/network failure, timeout, unparseable payload, and a
//! payload of the wrong shape.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_MODEL, GENERATION_ENDPOINT};
use crate::error::GenerationError;
use crate::models::{DailyPlan, DayName, GroceryDraft};
use crate::services::credentials::CredentialManager;

type GenResult<T> = std::result::Result<T, GenerationError>;

/// Whether one day or a full week is requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationScope {
    Day,
    Week,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub goals: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_notes: Option<String>,
    pub scope: GenerationScope,
}

impl GenerationRequest {
    pub fn day(goals: impl Into<String>) -> Self {
        Self {
            goals: goals.into(),
            user_notes: None,
            scope: GenerationScope::Day,
        }
    }

    pub fn week(goals: impl Into<String>, user_notes: Option<String>) -> Self {
        Self {
            goals: goals.into(),
            user_notes: user_notes.filter(|n| !n.trim().is_empty()),
            scope: GenerationScope::Week,
        }
    }
}

/// Validated week: all seven days plus the grocery list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyPlanResponse {
    pub days: BTreeMap<DayName, DailyPlan>,
    pub grocery_list: Vec<GroceryDraft>,
}

/// Wire shape of a weekly response
#[derive(Deserialize)]
struct WeeklyWire {
    #[serde(rename = "Monday")]
    monday: DailyPlan,
    #[serde(rename = "Tuesday")]
    tuesday: DailyPlan,
    #[serde(rename = "Wednesday")]
    wednesday: DailyPlan,
    #[serde(rename = "Thursday")]
    thursday: DailyPlan,
    #[serde(rename = "Friday")]
    friday: DailyPlan,
    #[serde(rename = "Saturday")]
    saturday: DailyPlan,
    #[serde(rename = "Sunday")]
    sunday: DailyPlan,
    #[serde(rename = "groceryList")]
    grocery_list: Vec<GroceryDraft>,
}

impl From<WeeklyWire> for WeeklyPlanResponse {
    fn from(wire: WeeklyWire) -> Self {
        let days = [
            (DayName::Monday, wire.monday),
            (DayName::Tuesday, wire.tuesday),
            (DayName::Wednesday, wire.wednesday),
            (DayName::Thursday, wire.thursday),
            (DayName::Friday, wire.friday),
            (DayName::Saturday, wire.saturday),
            (DayName::Sunday, wire.sunday),
        ]
        .into_iter()
        .collect();

        Self {
            days,
            grocery_list: wire.grocery_list,
        }
    }
}

/// The external plan generation service
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    async fn generate_day(&self, goals: &str) -> GenResult<DailyPlan>;

    async fn generate_week(&self, goals: &str, user_notes: Option<&str>) -> GenResult<WeeklyPlanResponse>;
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Remove a surrounding markdown code fence and whatever language tag
/// follows the opening backticks.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = match inner.split_once('\n') {
        // Payload starts on the fence line
        Some((first, _)) if first.trim_start().starts_with(['{', '[']) => inner,
        Some((_, rest)) => rest,
        None => inner.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-'),
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn parse_json(raw: &str) -> GenResult<serde_json::Value> {
    let text = strip_code_fences(raw);
    serde_json::from_str(text).map_err(|e| {
        tracing::error!("Generation response is not valid JSON: {}", e);
        GenerationError::MalformedResponse(e.to_string())
    })
}

fn schema_error(detail: String) -> GenerationError {
    tracing::error!("Generation response failed validation: {}", detail);
    GenerationError::SchemaValidation(detail)
}

/// Parse and validate a single-day response.
pub fn parse_daily_plan(raw: &str) -> GenResult<DailyPlan> {
    let value = parse_json(raw)?;
    let plan: DailyPlan = serde_json::from_value(value).map_err(|e| schema_error(e.to_string()))?;
    plan.validate().map_err(schema_error)?;
    Ok(plan)
}

/// Parse and validate a full-week response.
pub fn parse_weekly_plan(raw: &str) -> GenResult<WeeklyPlanResponse> {
    let value = parse_json(raw)?;
    let wire: WeeklyWire = serde_json::from_value(value).map_err(|e| schema_error(e.to_string()))?;
    let response = WeeklyPlanResponse::from(wire);

    for (day, plan) in &response.days {
        plan.validate()
            .map_err(|detail| schema_error(format!("{}: {}", day, detail)))?;
    }

    Ok(response)
}

// ---------------------------------------------------------------------------
// Prompt construction
// ---------------------------------------------------------------------------

const SYSTEM_PROMPT: &str = "You are Kaio, an expert AI life coach specializing in fitness, \
nutrition, and lifestyle optimization. You always respond with valid JSON only, no markdown or code blocks.";

const DAY_SHAPE: &str = r#"{
  "wake_time": "6:00 AM",
  "hydration": "3 liters",
  "meals": [
    { "name": "Breakfast", "calories": 500, "protein": 30, "details": "Specific meal details" }
  ],
  "workout": "Push Day:\n- Bench Press: 4 sets x 8 reps\n- Incline Dumbbell Press: 3 sets x 10 reps",
  "checklist": ["Item 1", "Item 2", "Item 3"],
  "beard_care": "Optional beard care routine",
  "lifestyle_tips": ["Tip 1", "Tip 2"]
}"#;

const GROCERY_SHAPE: &str = r#""groceryList": [
    { "name": "Chicken breast", "category": "protein" },
    { "name": "Broccoli", "category": "produce" }
  ]"#;

const DAY_REQUIREMENTS: &str = "1. Optimal wake time based on their schedule
2. Daily hydration goal (in liters or ounces)
3. 3-5 meals with specific details, whole-number calories and protein
4. A workout (exercises, sets and reps, or rest day activities)
5. A checklist of 5-8 actionable items
6. Beard care routine if mentioned in the goals (optional)
7. 3-5 lifestyle tips relevant to the goals (optional)";

const WORKOUT_RULE: &str = "CRITICAL: The \"workout\" field MUST be a single string with line breaks (\\n), NOT an object or array.";

/// Build the user prompt for a request.
pub fn build_prompt(request: &GenerationRequest) -> String {
    let mut prompt = String::with_capacity(2048);

    match request.scope {
        GenerationScope::Day => {
            prompt.push_str("Based on the following user goals, create a comprehensive, personalized daily plan:\n\n");
            prompt.push_str(&request.goals);
            prompt.push_str("\n\nThe plan must include:\n");
            prompt.push_str(DAY_REQUIREMENTS);
            prompt.push_str("\n\nReturn ONLY a JSON object with this exact structure:\n");
            prompt.push_str(DAY_SHAPE);
        }
        GenerationScope::Week => {
            prompt.push_str("Based on the following user information, create a comprehensive, personalized WEEKLY plan (Monday through Sunday):\n\n");
            prompt.push_str(&request.goals);
            if let Some(notes) = &request.user_notes {
                prompt.push_str("\n\nADDITIONAL NOTES/GOALS:\n");
                prompt.push_str(notes);
                prompt.push_str("\n\nIncorporate these notes into the plan.");
            }
            prompt.push_str("\n\nFor EACH DAY the plan must include:\n");
            prompt.push_str(DAY_REQUIREMENTS);
            prompt.push_str("\n\nVary meals and workout focus across the week. Also produce a grocery list with every ingredient needed for the week, categorized by type.");
            prompt.push_str("\n\nReturn ONLY a JSON object with one key per day (\"Monday\" .. \"Sunday\"), each shaped like:\n");
            prompt.push_str(DAY_SHAPE);
            prompt.push_str("\nplus:\n");
            prompt.push_str(GROCERY_SHAPE);
        }
    }

    prompt.push_str("\n\n");
    prompt.push_str(WORKOUT_RULE);
    prompt
}

// ---------------------------------------------------------------------------
// OpenRouter client
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Deserialize)]
struct ChatContent {
    content: Option<String>,
}

/// Generator backed by an OpenAI-compatible chat completions endpoint
pub struct OpenRouterGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl OpenRouterGenerator {
    pub fn new(model: impl Into<String>, timeout: Duration) -> GenResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent("Kaio-Planner")
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: GENERATION_ENDPOINT.to_string(),
            model: model.into(),
            api_key: None,
            timeout,
        })
    }

    pub fn with_defaults(timeout: Duration) -> GenResult<Self> {
        Self::new(DEFAULT_MODEL, timeout)
    }

    /// Use a fixed key instead of resolving one per request.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn api_key(&self) -> GenResult<String> {
        match &self.api_key {
            Some(key) => Ok(key.clone()),
            None => CredentialManager::get_api_key(),
        }
    }

    /// Send one request and return the raw message content.
    async fn complete(&self, request: &GenerationRequest) -> GenResult<String> {
        let api_key = self.api_key()?;
        let prompt = build_prompt(request);

        tracing::info!(
            "Requesting {:?} plan from {} (model {})",
            request.scope,
            self.endpoint,
            self.model
        );

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Generation service returned {}: {}", status, body);
            return Err(GenerationError::Transport {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await.map_err(|e| self.request_error(e))?;
        let chat: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            tracing::error!("Generation service body is not a chat completion: {}", e);
            GenerationError::MalformedResponse(e.to_string())
        })?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                tracing::error!("No content in generation response");
                GenerationError::MalformedResponse("no content received".to_string())
            })?;

        tracing::debug!("Generation response content length: {}", content.len());
        Ok(content)
    }

    fn request_error(&self, e: reqwest::Error) -> GenerationError {
        if e.is_timeout() {
            tracing::error!("Generation request timed out: {}", e);
            GenerationError::Timeout {
                secs: self.timeout.as_secs(),
            }
        } else {
            tracing::error!("Generation request failed: {}", e);
            GenerationError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl PlanGenerator for OpenRouterGenerator {
    async fn generate_day(&self, goals: &str) -> GenResult<DailyPlan> {
        let content = self.complete(&GenerationRequest::day(goals)).await?;
        parse_daily_plan(&content)
    }

    async fn generate_week(&self, goals: &str, user_notes: Option<&str>) -> GenResult<WeeklyPlanResponse> {
        let request = GenerationRequest::week(goals, user_notes.map(str::to_string));
        let content = self.complete(&request).await?;
        parse_weekly_plan(&content)
    }
}
