//! Conversation State Machine
//!
//! This module drives a goal-setting conversation through its five stages.
//! Each turn is stateless on the server side: the caller sends the full
//! `ConversationContext` along with the user's message, and receives the
//! updated context with the reply. Per turn the engine makes at most one
//! optional transition check followed by the stage's own LLM calls, strictly
//! in sequence.

use crate::{
    error::{ConversationError, GenerationError},
    extraction::{
        ApprovalDecision, CalendarSchedule, GoalAnalysis, PeriodAnalysis, PlanningAdvice,
        SchedulePlan, StructuredOutput, TransitionCheck,
    },
    llm_client::{GenerationRequest, LLMClient, generate_structured},
    prompts::{PromptKey, PromptLibrary},
    render,
    schedule::{CalendarSummary, default_target_date, target_date_after},
    stage::ConversationStage,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Everything the server needs to know about a conversation, resent by the
/// caller on every turn.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    #[serde(default)]
    pub stage: ConversationStage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_goal: Option<String>,
    /// Serialized as an ISO date (`YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar: Option<CalendarSchedule>,
}

impl ConversationContext {
    /// A fresh conversation at `INITIAL`.
    pub fn new() -> Self {
        Self::default()
    }

    fn goal(&self) -> Option<&str> {
        self.extracted_goal
            .as_deref()
            .map(str::trim)
            .filter(|goal| !goal.is_empty())
    }
}

/// The result of one conversation turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// The reply to show the user, as Markdown.
    pub response: String,
    /// The context to send back on the next turn.
    pub context: ConversationContext,
}

/// Drives conversations through their stages using an LLM.
///
/// The engine holds no per-conversation state and is safe to share between
/// concurrent requests.
pub struct ConversationEngine {
    llm: Arc<dyn LLMClient>,
    prompts: Arc<PromptLibrary>,
    validate_transitions: bool,
}

impl ConversationEngine {
    pub fn new(llm: Arc<dyn LLMClient>, prompts: Arc<PromptLibrary>) -> Self {
        Self {
            llm,
            prompts,
            validate_transitions: false,
        }
    }

    /// Enables the pre-check that asks the LLM whether a stage can be left.
    pub fn with_transition_validation(mut self, enabled: bool) -> Self {
        self.validate_transitions = enabled;
        self
    }

    /// Handles one user message, dating the turn with the local calendar date.
    pub async fn advance(
        &self,
        context: ConversationContext,
        message: &str,
    ) -> Result<TurnOutcome, ConversationError> {
        self.advance_on(context, message, Local::now().date_naive())
            .await
    }

    /// Handles one user message as if today were `today`.
    #[instrument(skip_all, fields(stage = %context.stage))]
    pub async fn advance_on(
        &self,
        context: ConversationContext,
        message: &str,
        today: NaiveDate,
    ) -> Result<TurnOutcome, ConversationError> {
        let stage = context.stage;
        if stage != ConversationStage::Initial && context.goal().is_none() {
            return Err(ConversationError::MissingGoal { stage });
        }

        if self.validate_transitions && stage != ConversationStage::ConfirmSchedule {
            let check = self.check_transition(&context, message).await?;
            if check.blocks() {
                info!(missing = check.missing_information.len(), "Transition blocked");
                return Ok(TurnOutcome {
                    response: render::transition_blocked(&check),
                    context,
                });
            }
        }

        let outcome = match stage {
            ConversationStage::Initial => self.extract_goal(context, message).await?,
            ConversationStage::GoalExtracted => self.advise(context, message).await?,
            ConversationStage::Planning => self.settle_period(context, message, today).await?,
            ConversationStage::Scheduling => self.build_schedule(context, message, today).await?,
            ConversationStage::ConfirmSchedule => {
                self.confirm_schedule(context, message, today).await?
            }
        };

        info!(from = %stage, to = %outcome.context.stage, "Conversation turn complete");
        Ok(outcome)
    }

    async fn request<T: StructuredOutput + Debug>(
        &self,
        key: PromptKey,
        vars: &[(&str, &str)],
    ) -> Result<T, GenerationError> {
        let request = GenerationRequest::structured::<T>(self.prompts.render(key, vars))
            .with_system(self.prompts.template(PromptKey::System));
        let result: T = generate_structured(self.llm.as_ref(), request).await?;
        debug!(schema = T::SCHEMA_NAME, ?result, "Structured result received");
        Ok(result)
    }

    async fn check_transition(
        &self,
        context: &ConversationContext,
        message: &str,
    ) -> Result<TransitionCheck, GenerationError> {
        let target_date = context
            .target_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "not set yet".to_string());
        self.request(
            PromptKey::TransitionCheck,
            &[
                ("stage", context.stage.as_str()),
                ("requirement", context.stage.exit_requirement()),
                ("goal", context.goal().unwrap_or("not set yet")),
                ("target_date", target_date.as_str()),
                ("message", message),
            ],
        )
        .await
    }

    async fn extract_goal(
        &self,
        mut context: ConversationContext,
        message: &str,
    ) -> Result<TurnOutcome, ConversationError> {
        let analysis: GoalAnalysis = self
            .request(PromptKey::GoalAnalysis, &[("message", message)])
            .await?;

        context.extracted_goal = Some(analysis.goal.trim().to_string());
        context.stage = context.stage.next();
        Ok(TurnOutcome {
            response: render::goal_analysis(&analysis),
            context,
        })
    }

    async fn advise(
        &self,
        mut context: ConversationContext,
        message: &str,
    ) -> Result<TurnOutcome, ConversationError> {
        let goal = context.goal().unwrap_or_default().to_string();
        let advice: PlanningAdvice = self
            .request(
                PromptKey::PlanningAdvice,
                &[("goal", goal.as_str()), ("message", message)],
            )
            .await?;

        context.stage = context.stage.next();
        Ok(TurnOutcome {
            response: render::planning_advice(&advice),
            context,
        })
    }

    async fn settle_period(
        &self,
        mut context: ConversationContext,
        message: &str,
        today: NaiveDate,
    ) -> Result<TurnOutcome, ConversationError> {
        let goal = context.goal().unwrap_or_default().to_string();
        let today_str = today.to_string();
        let period: PeriodAnalysis = self
            .request(
                PromptKey::PeriodAnalysis,
                &[
                    ("goal", goal.as_str()),
                    ("today", today_str.as_str()),
                    ("message", message),
                ],
            )
            .await?;

        let Some(months) = period.accepted_months() else {
            info!(
                months = period.months,
                confidence = period.confidence,
                "Timeframe unclear, asking again"
            );
            return Ok(TurnOutcome {
                response: render::period_unclear(&period),
                context,
            });
        };

        let target_date = target_date_after(today, months);
        context.target_date = Some(target_date);
        context.stage = context.stage.next();
        Ok(TurnOutcome {
            response: render::period_accepted(&period, target_date),
            context,
        })
    }

    async fn build_schedule(
        &self,
        mut context: ConversationContext,
        message: &str,
        today: NaiveDate,
    ) -> Result<TurnOutcome, ConversationError> {
        let goal = context.goal().unwrap_or_default().to_string();
        let target_date = context
            .target_date
            .unwrap_or_else(|| default_target_date(today));
        let (today_str, target_str) = (today.to_string(), target_date.to_string());
        let plan: SchedulePlan = self
            .request(
                PromptKey::SchedulePlan,
                &[
                    ("goal", goal.as_str()),
                    ("today", today_str.as_str()),
                    ("target_date", target_str.as_str()),
                    ("message", message),
                ],
            )
            .await?;

        context.target_date = Some(target_date);
        context.stage = context.stage.next();
        Ok(TurnOutcome {
            response: render::schedule_plan(&plan, today, target_date),
            context,
        })
    }

    async fn confirm_schedule(
        &self,
        mut context: ConversationContext,
        message: &str,
        today: NaiveDate,
    ) -> Result<TurnOutcome, ConversationError> {
        let goal = context.goal().unwrap_or_default().to_string();
        let decision: ApprovalDecision = self
            .request(
                PromptKey::ApprovalDecision,
                &[("goal", goal.as_str()), ("message", message)],
            )
            .await?;

        if !decision.approved() {
            info!(
                is_approved = decision.is_approved,
                confidence = decision.confidence,
                "Calendar registration not approved"
            );
            return Ok(TurnOutcome {
                response: render::DECLINED_REPLY.to_string(),
                context,
            });
        }

        let target_date = context
            .target_date
            .unwrap_or_else(|| default_target_date(today));
        let (today_str, target_str) = (today.to_string(), target_date.to_string());
        let calendar: CalendarSchedule = self
            .request(
                PromptKey::CalendarSchedule,
                &[
                    ("goal", goal.as_str()),
                    ("today", today_str.as_str()),
                    ("target_date", target_str.as_str()),
                ],
            )
            .await?;
        let summary = CalendarSummary::of(&calendar).ok_or_else(|| {
            GenerationError::ContractViolation {
                schema: CalendarSchedule::SCHEMA_NAME.to_string(),
                reason: "no events with valid dates".to_string(),
            }
        })?;
        info!(
            events = summary.event_count,
            first = %summary.first_date,
            last = %summary.last_date,
            "Calendar events generated"
        );

        context.target_date = Some(target_date);
        context.calendar = Some(calendar);
        Ok(TurnOutcome {
            response: render::calendar_created(&summary),
            context,
        })
    }
}
