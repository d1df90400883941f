//! Renders structured LLM results as Markdown replies for the user.

use crate::extraction::{
    CONFIDENCE_THRESHOLD, GoalAnalysis, PeriodAnalysis, PlanningAdvice,
    SchedulePlan, TransitionCheck,
};
use crate::schedule::CalendarSummary;
use chrono::NaiveDate;
use std::fmt::Write;

pub const CALENDAR_QUESTION: &str = "Would you like me to add this schedule to your calendar?";

pub const TIMEFRAME_QUESTION: &str = "Could you tell me a concrete timeframe for this goal? \
    (for example: 3 months, half a year, one year)";

fn push_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n**{}**", heading);
    for item in items {
        let _ = writeln!(out, "- {}", item);
    }
}

pub fn goal_analysis(analysis: &GoalAnalysis) -> String {
    let mut out = format!("**Your goal:** {}\n", analysis.goal.trim());
    if analysis.confidence < CONFIDENCE_THRESHOLD {
        out.push_str("\nThis is my best reading of what you want. Feel free to correct it.\n");
    }
    push_list(&mut out, "Ways to sharpen it", &analysis.suggestions);
    push_list(&mut out, "First steps", &analysis.next_steps);
    out.push_str("\nTell me a little about where you stand today with this goal.");
    out
}

pub fn planning_advice(advice: &PlanningAdvice) -> String {
    let mut out = String::from("Here is a plan of action.\n");
    push_list(&mut out, "Main steps", &advice.steps);
    push_list(&mut out, "What you will need", &advice.resources);
    push_list(&mut out, "Likely challenges", &advice.risks);
    push_list(&mut out, "How to handle them", &advice.mitigations);
    out.push_str("\nBy when would you like to reach this goal?");
    out
}

pub fn period_accepted(period: &PeriodAnalysis, target_date: NaiveDate) -> String {
    let mut out = format!(
        "Great, that gives us about {} month{}. Your target date is **{}**.\n",
        period.months,
        if period.months == 1 { "" } else { "s" },
        target_date
    );
    push_list(&mut out, "Rough milestones", &period.milestones);
    out.push_str("\nShall I put together a detailed schedule?");
    out
}

pub fn period_unclear(period: &PeriodAnalysis) -> String {
    let mut out = String::new();
    if !period.reasoning.trim().is_empty() {
        let _ = writeln!(out, "I couldn't pin down a timeframe: {}\n", period.reasoning.trim());
    }
    out.push_str(TIMEFRAME_QUESTION);
    out
}

pub fn schedule_plan(plan: &SchedulePlan, today: NaiveDate, target_date: NaiveDate) -> String {
    let mut out = format!("## Your schedule ({} to {})\n", today, target_date);

    out.push_str("\n### Milestones\n");
    for milestone in &plan.milestones {
        let _ = write!(out, "- **{}** ({})", milestone.title, milestone.target_date);
        if milestone.description.trim().is_empty() {
            out.push('\n');
        } else {
            let _ = writeln!(out, ": {}", milestone.description.trim());
        }
    }

    if !plan.monthly_goals.is_empty() {
        out.push_str("\n### Monthly goals\n");
        for month in &plan.monthly_goals {
            let _ = writeln!(out, "- **{}**: {}", month.month, month.goals.join("; "));
        }
    }

    if !plan.weekly_tasks.is_empty() {
        out.push_str("\n### Weekly tasks\n");
        for week in &plan.weekly_tasks {
            let _ = writeln!(out, "- **{}**: {}", week.week, week.tasks.join("; "));
        }
    }

    if !plan.time_estimates.is_empty() {
        out.push_str("\n### Time estimates\n");
        for estimate in &plan.time_estimates {
            let _ = writeln!(
                out,
                "- {}: {:.1} hours/week",
                estimate.activity, estimate.hours_per_week
            );
        }
    }

    if !plan.review_points.is_empty() {
        out.push_str("\n### Progress reviews\n");
        for review in &plan.review_points {
            let _ = writeln!(out, "- {}: {}", review.timing, review.method);
        }
    }

    let _ = write!(out, "\n{}", CALENDAR_QUESTION);
    out
}

pub fn calendar_created(summary: &CalendarSummary) -> String {
    format!(
        "Done! I prepared {} calendar event{} from {} to {}. \
         Is there anything else you would like to ask or adjust?",
        summary.event_count,
        if summary.event_count == 1 { "" } else { "s" },
        summary.first_date,
        summary.last_date
    )
}

pub const DECLINED_REPLY: &str = "Understood, I won't add it to your calendar. \
    Is there anything else you would like to ask or adjust?";

pub fn transition_blocked(check: &TransitionCheck) -> String {
    if check.missing_information.is_empty() {
        return "Before we move on, could you tell me a bit more?".to_string();
    }
    let mut out = String::from("Before we move on, I need a little more information:\n");
    for question in &check.missing_information {
        let _ = writeln!(out, "- {}", question);
    }
    out.trim_end().to_string()
}
