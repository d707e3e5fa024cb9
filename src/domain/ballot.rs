use crate::error::{Result, TomeError};
use serde::{Deserialize, Serialize};

/// One member's ranked ballot: three distinct submission numbers in
/// descending order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedChoices {
    pub first: i64,
    pub second: i64,
    pub third: i64,
}

impl RankedChoices {
    /// Validate a raw choice triple against the submission count `n`.
    ///
    /// Rules, in order: each choice must lie in `[1, n]`, and the three
    /// choices must be pairwise distinct. Pure; nothing is written on
    /// failure.
    pub fn validate(choices: (i64, i64, i64), submission_count: i64) -> Result<Self> {
        let (first, second, third) = choices;
        for choice in [first, second, third] {
            if choice < 1 || choice > submission_count {
                return Err(TomeError::ChoiceOutOfRange {
                    choice,
                    min: 1,
                    max: submission_count,
                });
            }
        }
        if first == second || second == third || first == third {
            return Err(TomeError::DuplicateChoice);
        }
        Ok(Self {
            first,
            second,
            third,
        })
    }

    /// Choices in rank order
    pub fn ranked(&self) -> [i64; 3] {
        [self.first, self.second, self.third]
    }

    /// 1-based rank this ballot gives a candidate, if ranked at all
    pub fn rank_of(&self, candidate: i64) -> Option<usize> {
        self.ranked().iter().position(|&c| c == candidate).map(|i| i + 1)
    }
}

/// A ballot as stored: who cast it, for which meeting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub meeting_id: i64,
    pub member_id: i64,
    pub choices: RankedChoices,
}
