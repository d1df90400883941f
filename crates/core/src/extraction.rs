//! Structured Extraction Types
//!
//! Each stage of the conversation asks the LLM for a result of a specific
//! shape. The shapes live here as plain serde structs that also derive a
//! JSON Schema, which is sent upstream as the strict output contract. Upstream
//! providers are not trusted to honor that contract, so every type also
//! carries a `validate` check that runs after parsing.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Minimum LLM-reported confidence for a result to drive an automatic decision.
pub const CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Upper bound on a plausible goal timeframe.
pub const MAX_PLAN_MONTHS: u32 = 1200;

/// Date format used for every date exchanged with the LLM and the client.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A result type that can be requested from the LLM in strict structured mode.
pub trait StructuredOutput: DeserializeOwned + JsonSchema {
    /// Name under which the schema is registered with the provider.
    const SCHEMA_NAME: &'static str;
    /// One-line description sent alongside the schema.
    const DESCRIPTION: &'static str;

    /// Checks invariants the JSON Schema alone cannot express.
    fn validate(&self) -> Result<(), String>;
}

/// The declared shape a generation call must conform to.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub name: String,
    pub description: String,
    pub schema: Value,
}

impl OutputSchema {
    /// Builds the provider-ready schema descriptor for `T`.
    pub fn of<T: StructuredOutput>() -> Self {
        let mut schema = schemars::schema_for!(T).to_value();
        sanitize_schema(&mut schema);
        Self {
            name: T::SCHEMA_NAME.to_string(),
            description: T::DESCRIPTION.to_string(),
            schema,
        }
    }
}

/// Strips keywords strict structured-output providers reject and closes
/// every object schema to unknown properties.
fn sanitize_schema(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.remove("$schema");
            map.remove("format");
            if map.get("type").and_then(Value::as_str) == Some("object")
                && map.contains_key("properties")
            {
                map.entry("additionalProperties")
                    .or_insert(Value::Bool(false));
            }
            for (key, child) in map.iter_mut() {
                // Keys of these maps are property/definition names, not keywords.
                if key == "properties" || key == "$defs" {
                    if let Value::Object(entries) = child {
                        entries.values_mut().for_each(sanitize_schema);
                    }
                } else {
                    sanitize_schema(child);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(sanitize_schema),
        _ => {}
    }
}

fn check_confidence(confidence: f64) -> Result<(), String> {
    if (0.0..=1.0).contains(&confidence) {
        Ok(())
    } else {
        Err(format!(
            "confidence must be between 0 and 1, got {}",
            confidence
        ))
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| format!("{} '{}' is not a YYYY-MM-DD date: {}", field, value, e))
}

// --- INITIAL ---

/// The user's goal, as understood from their opening message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GoalAnalysis {
    /// A concrete, measurable restatement of the user's goal.
    pub goal: String,
    /// How sure the model is that this is what the user wants (0.0 to 1.0).
    pub confidence: f64,
    /// Ways to make the goal more specific or achievable.
    pub suggestions: Vec<String>,
    /// Immediate actions the user can take.
    pub next_steps: Vec<String>,
}

impl StructuredOutput for GoalAnalysis {
    const SCHEMA_NAME: &'static str = "goal_analysis";
    const DESCRIPTION: &'static str = "The user's goal extracted from their message.";

    fn validate(&self) -> Result<(), String> {
        if self.goal.trim().is_empty() {
            return Err("goal must not be empty".to_string());
        }
        check_confidence(self.confidence)
    }
}

// --- GOAL_EXTRACTED ---

/// Advice on how to approach the goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlanningAdvice {
    /// Major steps towards the goal, in order.
    pub steps: Vec<String>,
    /// Resources or preparation the user will need.
    pub resources: Vec<String>,
    /// Challenges the user is likely to face.
    pub risks: Vec<String>,
    /// How to deal with those challenges.
    pub mitigations: Vec<String>,
}

impl StructuredOutput for PlanningAdvice {
    const SCHEMA_NAME: &'static str = "planning_advice";
    const DESCRIPTION: &'static str = "A practical plan of action for reaching the goal.";

    fn validate(&self) -> Result<(), String> {
        if self.steps.is_empty() {
            return Err("at least one step is required".to_string());
        }
        Ok(())
    }
}

// --- PLANNING ---

/// The timeframe the user gave for reaching the goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PeriodAnalysis {
    /// Length of the period in months (years multiplied by 12). Zero if none was given.
    pub months: u32,
    /// How sure the model is about the extracted period (0.0 to 1.0).
    pub confidence: f64,
    /// Why this period was extracted.
    pub reasoning: String,
    /// Rough checkpoints across the period.
    pub milestones: Vec<String>,
}

impl PeriodAnalysis {
    /// The period in months, if it is usable to fix a target date.
    pub fn accepted_months(&self) -> Option<u32> {
        (self.confidence >= CONFIDENCE_THRESHOLD && self.months > 0).then_some(self.months)
    }
}

impl StructuredOutput for PeriodAnalysis {
    const SCHEMA_NAME: &'static str = "period_analysis";
    const DESCRIPTION: &'static str = "The timeframe for achieving the goal.";

    fn validate(&self) -> Result<(), String> {
        check_confidence(self.confidence)?;
        if self.months > MAX_PLAN_MONTHS {
            return Err(format!(
                "months must be at most {}, got {}",
                MAX_PLAN_MONTHS, self.months
            ));
        }
        Ok(())
    }
}

// --- SCHEDULING ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Milestone {
    pub title: String,
    /// Deadline for the milestone, YYYY-MM-DD.
    pub target_date: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MonthlyGoal {
    /// The month this goal belongs to, e.g. "2025-03" or "Month 1".
    pub month: String,
    pub goals: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WeeklyTask {
    /// The week the tasks belong to, e.g. "Week 1".
    pub week: String,
    pub tasks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimeEstimate {
    pub activity: String,
    pub hours_per_week: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReviewPoint {
    /// When to review, e.g. "every Sunday" or "end of month 3".
    pub timing: String,
    /// How progress is measured at this review.
    pub method: String,
}

/// A complete schedule for the goal between today and the target date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SchedulePlan {
    pub milestones: Vec<Milestone>,
    pub monthly_goals: Vec<MonthlyGoal>,
    pub weekly_tasks: Vec<WeeklyTask>,
    pub time_estimates: Vec<TimeEstimate>,
    pub review_points: Vec<ReviewPoint>,
}

impl StructuredOutput for SchedulePlan {
    const SCHEMA_NAME: &'static str = "schedule_plan";
    const DESCRIPTION: &'static str =
        "Milestones, monthly goals, weekly tasks, time estimates and review points.";

    fn validate(&self) -> Result<(), String> {
        if self.milestones.is_empty() {
            return Err("at least one milestone is required".to_string());
        }
        for milestone in &self.milestones {
            parse_date("milestone target_date", &milestone.target_date)?;
        }
        if let Some(estimate) = self
            .time_estimates
            .iter()
            .find(|e| !e.hours_per_week.is_finite() || e.hours_per_week < 0.0)
        {
            return Err(format!(
                "hours_per_week for '{}' must be a non-negative number",
                estimate.activity
            ));
        }
        Ok(())
    }
}

// --- CONFIRM_SCHEDULE ---

/// Whether the user agreed to put the schedule in their calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ApprovalDecision {
    pub is_approved: bool,
    /// How sure the model is about the decision (0.0 to 1.0).
    pub confidence: f64,
    pub reasoning: String,
}

impl ApprovalDecision {
    /// True only for a confident yes.
    pub fn approved(&self) -> bool {
        self.is_approved && self.confidence >= CONFIDENCE_THRESHOLD
    }
}

impl StructuredOutput for ApprovalDecision {
    const SCHEMA_NAME: &'static str = "approval_decision";
    const DESCRIPTION: &'static str = "Whether the user approved adding the schedule to a calendar.";

    fn validate(&self) -> Result<(), String> {
        check_confidence(self.confidence)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReminderMethod {
    Email,
    Popup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Reminder {
    pub method: ReminderMethod,
    pub minutes_before: u32,
}

/// A single calendar entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CalendarEvent {
    pub title: String,
    pub description: String,
    /// First day of the event, YYYY-MM-DD.
    pub start_date: String,
    /// Last day of the event, YYYY-MM-DD. Equal to start_date for one-day events.
    pub end_date: String,
    pub priority: Priority,
    pub reminders: Vec<Reminder>,
}

impl CalendarEvent {
    /// Parsed `(start, end)` dates.
    pub fn dates(&self) -> Result<(NaiveDate, NaiveDate), String> {
        let start = parse_date("start_date", &self.start_date)?;
        let end = parse_date("end_date", &self.end_date)?;
        Ok((start, end))
    }
}

/// Calendar events generated from an approved schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CalendarSchedule {
    pub events: Vec<CalendarEvent>,
}

impl StructuredOutput for CalendarSchedule {
    const SCHEMA_NAME: &'static str = "calendar_schedule";
    const DESCRIPTION: &'static str = "Calendar events implementing the agreed schedule.";

    fn validate(&self) -> Result<(), String> {
        if self.events.is_empty() {
            return Err("at least one event is required".to_string());
        }
        for event in &self.events {
            if event.title.trim().is_empty() {
                return Err("event title must not be empty".to_string());
            }
            let (start, end) = event.dates()?;
            if end < start {
                return Err(format!(
                    "event '{}' ends ({}) before it starts ({})",
                    event.title, end, start
                ));
            }
        }
        Ok(())
    }
}

// --- Transition validator ---

/// Whether the conversation holds enough information to leave a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TransitionCheck {
    pub can_proceed: bool,
    /// How sure the model is about the decision (0.0 to 1.0).
    pub confidence: f64,
    /// Questions to ask the user for whatever is still missing.
    pub missing_information: Vec<String>,
    pub reasoning: String,
}

impl TransitionCheck {
    /// True only when the model is confident the stage cannot be left yet.
    pub fn blocks(&self) -> bool {
        !self.can_proceed && self.confidence >= CONFIDENCE_THRESHOLD
    }
}

impl StructuredOutput for TransitionCheck {
    const SCHEMA_NAME: &'static str = "transition_check";
    const DESCRIPTION: &'static str =
        "Whether enough information exists to move to the next conversation stage.";

    fn validate(&self) -> Result<(), String> {
        check_confidence(self.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(start: &str, end: &str) -> CalendarEvent {
        CalendarEvent {
            title: "Vocabulary sprint".to_string(),
            description: "Learn 200 new words".to_string(),
            start_date: start.to_string(),
            end_date: end.to_string(),
            priority: Priority::High,
            reminders: vec![Reminder {
                method: ReminderMethod::Popup,
                minutes_before: 30,
            }],
        }
    }

    fn contains_key(value: &Value, key: &str) -> bool {
        match value {
            Value::Object(map) => {
                map.contains_key(key) || map.values().any(|v| contains_key(v, key))
            }
            Value::Array(items) => items.iter().any(|v| contains_key(v, key)),
            _ => false,
        }
    }

    #[test]
    fn test_output_schema_is_strict_friendly() {
        let schema = OutputSchema::of::<PeriodAnalysis>();
        assert_eq!(schema.name, "period_analysis");
        assert!(!contains_key(&schema.schema, "$schema"));
        assert!(!contains_key(&schema.schema, "format"));
        assert_eq!(schema.schema["additionalProperties"], json!(false));

        let required = schema.schema["required"].as_array().unwrap();
        for field in ["months", "confidence", "reasoning", "milestones"] {
            assert!(required.contains(&json!(field)), "missing {}", field);
        }
    }

    #[test]
    fn test_nested_definitions_are_sanitized() {
        let schema = OutputSchema::of::<CalendarSchedule>();
        let defs = schema.schema["$defs"].as_object().unwrap();
        let event = &defs["CalendarEvent"];
        assert_eq!(event["additionalProperties"], json!(false));
        assert!(event["properties"].get("start_date").is_some());
        assert_eq!(
            defs["Priority"]["enum"],
            json!(["high", "medium", "low"])
        );
    }

    #[test]
    fn test_sanitize_keeps_properties_named_like_keywords() {
        let mut schema = json!({
            "type": "object",
            "properties": {
                "format": { "type": "string", "format": "date" }
            }
        });
        sanitize_schema(&mut schema);
        assert_eq!(schema["properties"]["format"], json!({ "type": "string" }));
    }

    #[test]
    fn test_goal_analysis_validation() {
        let mut analysis = GoalAnalysis {
            goal: "Hold a 10 minute conversation in Spanish".to_string(),
            confidence: 0.8,
            suggestions: vec![],
            next_steps: vec![],
        };
        assert!(analysis.validate().is_ok());

        analysis.confidence = 1.3;
        assert!(analysis.validate().is_err());

        analysis.confidence = 0.8;
        analysis.goal = "   ".to_string();
        assert!(analysis.validate().is_err());
    }

    #[test]
    fn test_period_acceptance() {
        let mut period = PeriodAnalysis {
            months: 6,
            confidence: 0.9,
            reasoning: "explicitly half a year".to_string(),
            milestones: vec![],
        };
        assert_eq!(period.accepted_months(), Some(6));

        period.confidence = 0.6;
        assert_eq!(period.accepted_months(), Some(6));

        period.confidence = 0.59;
        assert_eq!(period.accepted_months(), None);

        period.confidence = 0.95;
        period.months = 0;
        assert_eq!(period.accepted_months(), None);
    }

    #[test]
    fn test_period_validation_rejects_implausible_months() {
        let period = PeriodAnalysis {
            months: MAX_PLAN_MONTHS + 1,
            confidence: 0.9,
            reasoning: String::new(),
            milestones: vec![],
        };
        assert!(period.validate().is_err());
    }

    #[test]
    fn test_approval_requires_confidence() {
        let mut decision = ApprovalDecision {
            is_approved: true,
            confidence: 0.8,
            reasoning: "said yes".to_string(),
        };
        assert!(decision.approved());

        decision.confidence = 0.5;
        assert!(!decision.approved());

        decision.confidence = 0.99;
        decision.is_approved = false;
        assert!(!decision.approved());
    }

    #[test]
    fn test_transition_check_blocks_only_when_confident() {
        let mut check = TransitionCheck {
            can_proceed: false,
            confidence: 0.9,
            missing_information: vec!["What is your goal?".to_string()],
            reasoning: String::new(),
        };
        assert!(check.blocks());

        check.confidence = 0.3;
        assert!(!check.blocks());

        check.confidence = 0.9;
        check.can_proceed = true;
        assert!(!check.blocks());
    }

    #[test]
    fn test_calendar_validation() {
        let schedule = CalendarSchedule {
            events: vec![event("2025-01-06", "2025-01-12")],
        };
        assert!(schedule.validate().is_ok());

        let backwards = CalendarSchedule {
            events: vec![event("2025-01-12", "2025-01-06")],
        };
        assert!(backwards.validate().unwrap_err().contains("ends"));

        let bad_date = CalendarSchedule {
            events: vec![event("next monday", "2025-01-06")],
        };
        assert!(bad_date.validate().unwrap_err().contains("start_date"));

        let empty = CalendarSchedule { events: vec![] };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_schedule_plan_validation() {
        let mut plan = SchedulePlan {
            milestones: vec![Milestone {
                title: "A2 level".to_string(),
                target_date: "2025-06-30".to_string(),
                description: String::new(),
            }],
            monthly_goals: vec![],
            weekly_tasks: vec![],
            time_estimates: vec![TimeEstimate {
                activity: "Flashcards".to_string(),
                hours_per_week: 3.0,
            }],
            review_points: vec![],
        };
        assert!(plan.validate().is_ok());

        plan.time_estimates[0].hours_per_week = -1.0;
        assert!(plan.validate().is_err());

        plan.time_estimates.clear();
        plan.milestones[0].target_date = "June".to_string();
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_priority_wire_format() {
        let reminder: Reminder =
            serde_json::from_value(json!({ "method": "email", "minutes_before": 60 })).unwrap();
        assert_eq!(reminder.method, ReminderMethod::Email);
        assert_eq!(serde_json::to_string(&Priority::Medium).unwrap(), "\"medium\"");
    }
}
