use serde::{Deserialize, Serialize};
use std::fmt;

/// Meeting lifecycle states
///
/// Stages only move forward: members nominate books during `Submit`, rank
/// them during `Vote`, and `Organized` records the chosen book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeetingStage {
    /// Collecting one nomination per member
    Submit,
    /// Collecting ranked ballots over the nominations
    Vote,
    /// Winner chosen, meeting scheduled
    Organized,
}

impl MeetingStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingStage::Submit => "submit",
            MeetingStage::Vote => "vote",
            MeetingStage::Organized => "organized",
        }
    }

    /// Check if this stage can transition to another stage
    pub fn can_transition_to(&self, target: MeetingStage) -> bool {
        use MeetingStage::*;

        match (self, target) {
            (Submit, Vote) => true,
            (Vote, Organized) => true,

            // All other transitions are invalid
            _ => false,
        }
    }

    /// Get valid next stages from the current stage
    pub fn valid_transitions(&self) -> Vec<MeetingStage> {
        use MeetingStage::*;

        match self {
            Submit => vec![Vote],
            Vote => vec![Organized],
            Organized => vec![],
        }
    }

    /// Is this the end of the cycle?
    pub fn is_terminal(&self) -> bool {
        matches!(self, MeetingStage::Organized)
    }
}

impl fmt::Display for MeetingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for MeetingStage {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "submit" => Ok(MeetingStage::Submit),
            "vote" => Ok(MeetingStage::Vote),
            "organized" => Ok(MeetingStage::Organized),
            _ => Err(format!("Unknown stage: {}", s)),
        }
    }
}

/// A book club meeting
///
/// At most one meeting is active at a time; starting a new meeting
/// deactivates all prior ones. `volume_id` is set once the meeting is
/// organized and names the winning catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub meeting_id: i64,
    pub active: bool,
    pub stage: MeetingStage,
    pub volume_id: Option<String>,
}

/// A member's nomination for a meeting
///
/// `submission_id` is 1-based and sequential within the meeting; it is
/// assigned at first submission and stable across re-submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub meeting_id: i64,
    pub member_id: i64,
    pub submission_id: i64,
    pub volume_id: String,
}
