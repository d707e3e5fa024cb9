//! End-to-end meeting lifecycle tests against an in-memory database.

use std::collections::BTreeSet;
use tome::adapters::SqliteStore;
use tome::domain::{MeetingStage, RankedChoices};
use tome::error::TomeError;
use tome::voting;

/// One connection so the in-memory database survives across queries
async fn store() -> SqliteStore {
    let store = SqliteStore::new("sqlite::memory:", 1)
        .await
        .expect("connect");
    store.migrate().await.expect("migrate");
    store
}

#[tokio::test]
async fn full_meeting_cycle() {
    let store = store().await;

    // No meeting yet
    assert!(matches!(
        store.active_meeting().await,
        Err(TomeError::NoActiveMeeting)
    ));

    let meeting_id = store.create_meeting().await.unwrap();
    assert_eq!(meeting_id, 1);
    let meeting = store.active_meeting().await.unwrap();
    assert_eq!(meeting.stage, MeetingStage::Submit);
    assert!(meeting.active);

    // Three members submit one book each
    assert_eq!(store.upsert_submission(1, 100, "vol-a").await.unwrap(), 1);
    assert_eq!(store.upsert_submission(1, 200, "vol-b").await.unwrap(), 2);
    assert_eq!(store.upsert_submission(1, 300, "vol-c").await.unwrap(), 3);
    assert_eq!(store.submission_count(1).await.unwrap(), 3);

    store.begin_voting(1).await.unwrap();
    assert_eq!(
        store.active_meeting().await.unwrap().stage,
        MeetingStage::Vote
    );

    // Everyone votes
    let n = store.submission_count(1).await.unwrap();
    for (member, raw) in [(100, (1, 2, 3)), (200, (1, 3, 2)), (300, (2, 1, 3))] {
        let choices = RankedChoices::validate(raw, n).unwrap();
        store.record_ballot(1, member, choices).await.unwrap();
    }

    let ballots = store.ballots(1).await.unwrap();
    assert_eq!(ballots.len(), 3);
    let candidates: BTreeSet<i64> = store
        .submissions(1)
        .await
        .unwrap()
        .iter()
        .map(|s| s.submission_id)
        .collect();
    let choices: Vec<RankedChoices> = ballots.iter().map(|b| b.choices).collect();

    // Submission 1 holds 2 of 3 first preferences: a first-round majority
    let tabulation = voting::instant_runoff(&candidates, &choices).unwrap();
    assert_eq!(tabulation.winner, 1);
    assert_eq!(tabulation.rounds.len(), 1);

    let winning_volume = store.submission_volume(1, tabulation.winner).await.unwrap();
    assert_eq!(winning_volume, "vol-a");

    store.conclude(1, &winning_volume).await.unwrap();
    let meeting = store.active_meeting().await.unwrap();
    assert_eq!(meeting.stage, MeetingStage::Organized);
    assert_eq!(meeting.volume_id.as_deref(), Some("vol-a"));
}

#[tokio::test]
async fn resubmission_keeps_the_number_and_replaces_the_volume() {
    let store = store().await;
    store.create_meeting().await.unwrap();

    assert_eq!(store.upsert_submission(1, 100, "vol-x").await.unwrap(), 1);
    assert_eq!(store.upsert_submission(1, 200, "vol-y").await.unwrap(), 2);
    // Member 100 changes their mind; same number, new volume
    assert_eq!(store.upsert_submission(1, 100, "vol-z").await.unwrap(), 1);

    let submissions = store.submissions(1).await.unwrap();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0].submission_id, 1);
    assert_eq!(submissions[0].volume_id, "vol-z");
    assert_eq!(submissions[1].volume_id, "vol-y");
}

#[tokio::test]
async fn repeat_ballot_overwrites_the_previous_one() {
    let store = store().await;
    store.create_meeting().await.unwrap();
    for (member, vol) in [(1, "a"), (2, "b"), (3, "c")] {
        store.upsert_submission(1, member, vol).await.unwrap();
    }
    store.begin_voting(1).await.unwrap();

    let first = RankedChoices::validate((1, 2, 3), 3).unwrap();
    let second = RankedChoices::validate((3, 2, 1), 3).unwrap();
    store.record_ballot(1, 100, first).await.unwrap();
    store.record_ballot(1, 100, second).await.unwrap();

    let ballots = store.ballots(1).await.unwrap();
    assert_eq!(ballots.len(), 1);
    assert_eq!(ballots[0].choices, second);
}

#[tokio::test]
async fn stage_transitions_are_forward_only() {
    let store = store().await;
    store.create_meeting().await.unwrap();

    // submit -> organized is not allowed
    assert!(matches!(
        store.conclude(1, "vol-a").await,
        Err(TomeError::InvalidStageTransition { .. })
    ));

    store.begin_voting(1).await.unwrap();

    // vote -> vote is not allowed either
    assert!(matches!(
        store.begin_voting(1).await,
        Err(TomeError::InvalidStageTransition { .. })
    ));

    store.conclude(1, "vol-a").await.unwrap();
    assert!(matches!(
        store.begin_voting(1).await,
        Err(TomeError::InvalidStageTransition { .. })
    ));
}

#[tokio::test]
async fn new_meeting_deactivates_the_previous_one() {
    let store = store().await;
    let first = store.create_meeting().await.unwrap();
    let second = store.create_meeting().await.unwrap();
    assert_eq!((first, second), (1, 2));

    let active = store.active_meeting().await.unwrap();
    assert_eq!(active.meeting_id, 2);
    let old = store.get_meeting(1).await.unwrap().unwrap();
    assert!(!old.active);
}

#[tokio::test]
async fn submissions_are_scoped_per_meeting() {
    let store = store().await;
    store.create_meeting().await.unwrap();
    store.upsert_submission(1, 100, "vol-a").await.unwrap();

    store.create_meeting().await.unwrap();
    assert_eq!(store.submission_count(2).await.unwrap(), 0);
    // Numbering restarts per meeting
    assert_eq!(store.upsert_submission(2, 100, "vol-b").await.unwrap(), 1);

    assert!(matches!(
        store.submission_volume(2, 99).await,
        Err(TomeError::MissingSubmission {
            submission_id: 99,
            meeting_id: 2,
        })
    ));
}

#[tokio::test]
async fn three_way_tie_resolves_to_a_deterministic_winner() {
    let store = store().await;
    store.create_meeting().await.unwrap();
    for (member, vol) in [(1, "a"), (2, "b"), (3, "c")] {
        store.upsert_submission(1, member, vol).await.unwrap();
    }
    store.begin_voting(1).await.unwrap();

    // Perfect rotation: every candidate has exactly one first preference
    for (member, raw) in [(1, (1, 2, 3)), (2, (2, 3, 1)), (3, (3, 1, 2))] {
        let choices = RankedChoices::validate(raw, 3).unwrap();
        store.record_ballot(1, member, choices).await.unwrap();
    }

    let candidates: BTreeSet<i64> = (1..=3).collect();
    let choices: Vec<RankedChoices> = store
        .ballots(1)
        .await
        .unwrap()
        .iter()
        .map(|b| b.choices)
        .collect();

    // Lowest number among the tied is eliminated first: 1 goes, its ballot
    // transfers to 2, which then holds a majority.
    let tabulation = voting::instant_runoff(&candidates, &choices).unwrap();
    assert_eq!(tabulation.rounds[0].eliminated, Some(1));
    assert_eq!(tabulation.winner, 2);
}
