//! Prompt Templates
//!
//! Every stage prompt is a Markdown template with `{placeholder}` slots.
//! Defaults are compiled into the binary; a directory of `<key>.md` files
//! can override any of them at startup.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Identifies one prompt template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKey {
    System,
    GoalAnalysis,
    PlanningAdvice,
    PeriodAnalysis,
    SchedulePlan,
    ApprovalDecision,
    CalendarSchedule,
    TransitionCheck,
}

impl PromptKey {
    pub const ALL: [PromptKey; 8] = [
        PromptKey::System,
        PromptKey::GoalAnalysis,
        PromptKey::PlanningAdvice,
        PromptKey::PeriodAnalysis,
        PromptKey::SchedulePlan,
        PromptKey::ApprovalDecision,
        PromptKey::CalendarSchedule,
        PromptKey::TransitionCheck,
    ];

    /// File stem of the template, e.g. `period_analysis` for `period_analysis.md`.
    pub fn file_stem(self) -> &'static str {
        match self {
            PromptKey::System => "system",
            PromptKey::GoalAnalysis => "goal_analysis",
            PromptKey::PlanningAdvice => "planning_advice",
            PromptKey::PeriodAnalysis => "period_analysis",
            PromptKey::SchedulePlan => "schedule_plan",
            PromptKey::ApprovalDecision => "approval_decision",
            PromptKey::CalendarSchedule => "calendar_schedule",
            PromptKey::TransitionCheck => "transition_check",
        }
    }

    fn builtin(self) -> &'static str {
        match self {
            PromptKey::System => include_str!("../prompts/system.md"),
            PromptKey::GoalAnalysis => include_str!("../prompts/goal_analysis.md"),
            PromptKey::PlanningAdvice => include_str!("../prompts/planning_advice.md"),
            PromptKey::PeriodAnalysis => include_str!("../prompts/period_analysis.md"),
            PromptKey::SchedulePlan => include_str!("../prompts/schedule_plan.md"),
            PromptKey::ApprovalDecision => include_str!("../prompts/approval_decision.md"),
            PromptKey::CalendarSchedule => include_str!("../prompts/calendar_schedule.md"),
            PromptKey::TransitionCheck => include_str!("../prompts/transition_check.md"),
        }
    }

    fn from_file_stem(stem: &str) -> Option<Self> {
        PromptKey::ALL.into_iter().find(|key| key.file_stem() == stem)
    }
}

/// The full set of templates used by the conversation engine.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    templates: HashMap<PromptKey, String>,
}

impl PromptLibrary {
    /// The templates compiled into the crate.
    pub fn builtin() -> Self {
        let templates = PromptKey::ALL
            .into_iter()
            .map(|key| (key, key.builtin().to_string()))
            .collect();
        Self { templates }
    }

    /// Built-in templates, overridden by any `<key>.md` file in `dir`.
    ///
    /// Files whose stem does not name a known template are skipped.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut library = Self::builtin();
        let entries = fs::read_dir(dir)
            .with_context(|| format!("Could not read prompts directory {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("md") {
                continue;
            }
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?;
            match PromptKey::from_file_stem(stem) {
                Some(key) => {
                    let content = fs::read_to_string(&path)
                        .with_context(|| format!("Could not read {}", path.display()))?;
                    debug!(prompt = stem, "Overriding built-in prompt");
                    library.templates.insert(key, content);
                }
                None => warn!(file = %path.display(), "Ignoring unknown prompt template"),
            }
        }
        Ok(library)
    }

    /// The raw template for `key`.
    pub fn template(&self, key: PromptKey) -> &str {
        self.templates
            .get(&key)
            .map(String::as_str)
            .unwrap_or_else(|| key.builtin())
    }

    /// Fills `{name}` slots in the template for `key` in a single pass.
    ///
    /// Substituted values are never rescanned, so a value containing
    /// `{message}` is inserted verbatim. Braces that do not enclose a known
    /// name (such as JSON in the examples) are left as they are.
    pub fn render(&self, key: PromptKey, vars: &[(&str, &str)]) -> String {
        let template = self.template(key);
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let slot = after.find('}').and_then(|close| {
                let name = &after[..close];
                vars.iter()
                    .find(|(var, _)| *var == name)
                    .map(|(_, value)| (close, *value))
            });
            match slot {
                Some((close, value)) => {
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}
