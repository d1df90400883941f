use serde::{Deserialize, Serialize};
use std::fmt;

/// A named phase of the guided goal-setting conversation.
///
/// Stages are ordered. The engine only ever moves a conversation one step
/// forward, except for `Planning`, which repeats until a usable timeframe
/// has been extracted, and `ConfirmSchedule`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationStage {
    #[default]
    Initial,
    GoalExtracted,
    Planning,
    Scheduling,
    ConfirmSchedule,
}

impl ConversationStage {
    /// The stage that follows a successful turn in this stage.
    ///
    /// `ConfirmSchedule` has no successor and maps to itself.
    pub fn next(self) -> Self {
        match self {
            ConversationStage::Initial => ConversationStage::GoalExtracted,
            ConversationStage::GoalExtracted => ConversationStage::Planning,
            ConversationStage::Planning => ConversationStage::Scheduling,
            ConversationStage::Scheduling => ConversationStage::ConfirmSchedule,
            ConversationStage::ConfirmSchedule => ConversationStage::ConfirmSchedule,
        }
    }

    /// The wire name, e.g. `GOAL_EXTRACTED`.
    pub fn as_str(self) -> &'static str {
        match self {
            ConversationStage::Initial => "INITIAL",
            ConversationStage::GoalExtracted => "GOAL_EXTRACTED",
            ConversationStage::Planning => "PLANNING",
            ConversationStage::Scheduling => "SCHEDULING",
            ConversationStage::ConfirmSchedule => "CONFIRM_SCHEDULE",
        }
    }

    /// What the user has to have told us before this stage can be left.
    /// Fed to the transition validator.
    pub fn exit_requirement(self) -> &'static str {
        match self {
            ConversationStage::Initial => "a goal the user wants to achieve",
            ConversationStage::GoalExtracted => {
                "enough about the user's current situation to give planning advice"
            }
            ConversationStage::Planning => "a timeframe for reaching the goal",
            ConversationStage::Scheduling => "agreement to build a detailed schedule",
            ConversationStage::ConfirmSchedule => {
                "a clear answer on whether to add the schedule to the calendar"
            }
        }
    }
}

impl fmt::Display for ConversationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
