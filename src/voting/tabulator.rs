//! Instant-runoff tabulation over submission numbers.
//!
//! Each ballot contributes its highest-ranked choice that is still in the
//! running. A candidate holding a strict majority of active votes wins;
//! otherwise the candidate with the fewest active votes is eliminated and
//! its ballots redistribute to their next choice. Ballots whose three
//! choices are all eliminated become exhausted and stop counting toward
//! the majority threshold.

use crate::domain::RankedChoices;
use crate::error::{Result, TomeError};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Tally of one elimination round, kept for logging and auditability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    /// Active votes per surviving candidate
    pub tallies: BTreeMap<i64, usize>,
    /// Candidate eliminated at the end of this round, if any
    pub eliminated: Option<i64>,
}

/// Full tabulation outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tabulation {
    pub winner: i64,
    pub rounds: Vec<Round>,
}

/// Compute the instant-runoff winner among `candidates` given `ballots`.
///
/// Tie-break: when several candidates share the fewest active votes, the
/// one with the lowest submission number is eliminated; exactly one
/// candidate leaves per round, so the loop terminates within
/// `candidates.len()` rounds. If every ballot exhausts before a strict
/// majority forms, the lowest-numbered surviving candidate wins.
pub fn instant_runoff(candidates: &BTreeSet<i64>, ballots: &[RankedChoices]) -> Result<Tabulation> {
    if candidates.is_empty() {
        return Err(TomeError::NoCandidates);
    }
    if ballots.is_empty() {
        return Err(TomeError::NoBallots);
    }

    let mut remaining: BTreeSet<i64> = candidates.clone();
    let mut rounds = Vec::new();

    loop {
        // Every surviving candidate appears in the tally, at zero if no
        // ballot currently reaches it.
        let mut tallies: BTreeMap<i64, usize> =
            remaining.iter().map(|&c| (c, 0)).collect();
        let mut active_ballots = 0usize;
        for ballot in ballots {
            if let Some(choice) = ballot
                .ranked()
                .into_iter()
                .find(|c| remaining.contains(c))
            {
                *tallies.entry(choice).or_insert(0) += 1;
                active_ballots += 1;
            }
        }

        if active_ballots == 0 {
            // Degenerate: all ballots exhausted. Deterministic fallback.
            let winner = *remaining.iter().next().expect("remaining is non-empty");
            rounds.push(Round {
                tallies,
                eliminated: None,
            });
            debug!(winner, "all ballots exhausted, falling back to lowest survivor");
            return Ok(Tabulation { winner, rounds });
        }

        // Strict majority of ballots still holding an active vote
        if let Some((&winner, &votes)) = tallies.iter().find(|(_, &v)| v * 2 > active_ballots) {
            rounds.push(Round {
                tallies: tallies.clone(),
                eliminated: None,
            });
            debug!(winner, votes, active_ballots, "majority reached");
            return Ok(Tabulation { winner, rounds });
        }

        // No majority: eliminate the lowest-numbered candidate among those
        // tied for fewest votes. BTreeMap iterates in ascending key order,
        // so the first minimum seen is the lowest submission number.
        let fewest = *tallies.values().min().expect("tallies is non-empty");
        let eliminated = *tallies
            .iter()
            .find(|(_, &v)| v == fewest)
            .map(|(c, _)| c)
            .expect("a candidate holds the minimum");

        remaining.remove(&eliminated);
        debug!(eliminated, fewest, "elimination round");
        rounds.push(Round {
            tallies,
            eliminated: Some(eliminated),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ballot(first: i64, second: i64, third: i64) -> RankedChoices {
        RankedChoices {
            first,
            second,
            third,
        }
    }

    fn candidates(ids: &[i64]) -> BTreeSet<i64> {
        ids.iter().copied().collect()
    }

    #[test]
    fn first_round_majority_wins_without_elimination() {
        // Candidate 1 holds 2/3 first-choice votes
        let result = instant_runoff(
            &candidates(&[1, 2, 3]),
            &[ballot(1, 2, 3), ballot(1, 3, 2), ballot(2, 1, 3)],
        )
        .unwrap();
        assert_eq!(result.winner, 1);
        assert_eq!(result.rounds.len(), 1);
        assert_eq!(result.rounds[0].eliminated, None);
    }

    #[test]
    fn three_way_tie_resolves_deterministically() {
        // One first-choice vote each: eliminate the lowest number (1),
        // whose ballot transfers to 2, giving 2 a majority.
        let result = instant_runoff(
            &candidates(&[1, 2, 3]),
            &[ballot(1, 2, 3), ballot(2, 1, 3), ballot(3, 1, 2)],
        )
        .unwrap();
        assert_eq!(result.winner, 2);
        assert_eq!(result.rounds.len(), 2);
        assert_eq!(result.rounds[0].eliminated, Some(1));
    }

    #[test]
    fn redistribution_can_flip_the_leader() {
        // Round 1: 1 has 2 votes, 2 has 2 votes, 3 has 1 vote. No majority
        // (need > 2.5). Candidate 3 eliminated; its ballot transfers to 2.
        let result = instant_runoff(
            &candidates(&[1, 2, 3]),
            &[
                ballot(1, 2, 3),
                ballot(1, 3, 2),
                ballot(2, 3, 1),
                ballot(2, 1, 3),
                ballot(3, 2, 1),
            ],
        )
        .unwrap();
        assert_eq!(result.rounds[0].eliminated, Some(3));
        assert_eq!(result.winner, 2);
    }

    #[test]
    fn pure_and_idempotent() {
        let cands = candidates(&[1, 2, 3, 4]);
        let ballots = [
            ballot(4, 2, 1),
            ballot(3, 4, 2),
            ballot(2, 3, 4),
            ballot(4, 1, 3),
            ballot(1, 2, 4),
        ];
        let first = instant_runoff(&cands, &ballots).unwrap();
        for _ in 0..3 {
            assert_eq!(instant_runoff(&cands, &ballots).unwrap(), first);
        }
    }

    #[test]
    fn exhausted_ballots_leave_the_threshold() {
        // Candidates 1, 3, 2 are eliminated in that order, so the three
        // ballots ranking only those exhaust; candidate 4 then holds all
        // three still-active votes and the majority is over those three.
        let result = instant_runoff(
            &candidates(&[1, 2, 3, 4]),
            &[
                ballot(1, 2, 3),
                ballot(2, 3, 1),
                ballot(3, 2, 1),
                ballot(4, 1, 2),
                ballot(4, 2, 3),
                ballot(4, 3, 2),
            ],
        )
        .unwrap();
        assert_eq!(result.rounds[0].eliminated, Some(1));
        assert_eq!(result.rounds[1].eliminated, Some(3));
        assert_eq!(result.rounds[2].eliminated, Some(2));
        assert_eq!(result.winner, 4);
        assert_eq!(result.rounds.len(), 4);
    }

    #[test]
    fn unreferenced_candidate_is_eliminated_first() {
        // Candidate 1 receives no votes at any rank; it goes out first.
        let result = instant_runoff(
            &candidates(&[1, 2, 3, 4]),
            &[ballot(2, 3, 4), ballot(3, 2, 4), ballot(4, 3, 2)],
        )
        .unwrap();
        assert_eq!(result.rounds[0].eliminated, Some(1));
    }

    #[test]
    fn single_candidate_wins_immediately() {
        let result =
            instant_runoff(&candidates(&[7]), &[ballot(7, 7, 7), ballot(7, 7, 7)]).unwrap();
        assert_eq!(result.winner, 7);
        assert_eq!(result.rounds.len(), 1);
    }

    #[test]
    fn empty_inputs_are_rejected() {
        assert!(matches!(
            instant_runoff(&candidates(&[]), &[ballot(1, 2, 3)]),
            Err(TomeError::NoCandidates)
        ));
        assert!(matches!(
            instant_runoff(&candidates(&[1, 2, 3]), &[]),
            Err(TomeError::NoBallots)
        ));
    }

    #[test]
    fn terminates_within_candidate_count_rounds() {
        let cands = candidates(&[1, 2, 3, 4, 5]);
        let ballots = [
            ballot(1, 2, 3),
            ballot(2, 3, 4),
            ballot(3, 4, 5),
            ballot(4, 5, 1),
            ballot(5, 1, 2),
        ];
        let result = instant_runoff(&cands, &ballots).unwrap();
        assert!(result.rounds.len() <= cands.len());
    }
}
