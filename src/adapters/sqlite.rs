use crate::domain::{Ballot, Meeting, MeetingStage, RankedChoices, Submission};
use crate::error::{Result, TomeError};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::{debug, info, instrument};

/// SQLite storage adapter for meetings, submissions and votes
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to SQLite");
        Ok(Self { pool })
    }

    /// Create a store from an existing connection pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ==================== Meetings ====================

    /// Deactivate all meetings and create a new one in the submit stage.
    /// Returns the new meeting id (count + 1).
    #[instrument(skip(self))]
    pub async fn create_meeting(&self) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE meetings SET active = 0")
            .execute(&mut *tx)
            .await?;

        let count: i64 = sqlx::query("SELECT COUNT(meeting_id) AS n FROM meetings")
            .fetch_one(&mut *tx)
            .await?
            .get("n");
        let meeting_id = count + 1;

        sqlx::query("INSERT INTO meetings (meeting_id, active, stage) VALUES (?, 1, ?)")
            .bind(meeting_id)
            .bind(MeetingStage::Submit.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(meeting_id, "Initialized meeting");
        Ok(meeting_id)
    }

    /// Get a meeting by id
    pub async fn get_meeting(&self, meeting_id: i64) -> Result<Option<Meeting>> {
        let row = sqlx::query(
            "SELECT meeting_id, active, stage, volume_id FROM meetings WHERE meeting_id = ?",
        )
        .bind(meeting_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_meeting).transpose()
    }

    /// Get the single active meeting, or fail with `NoActiveMeeting`
    pub async fn active_meeting(&self) -> Result<Meeting> {
        self.try_active_meeting()
            .await?
            .ok_or(TomeError::NoActiveMeeting)
    }

    /// Get the active meeting if one exists
    pub async fn try_active_meeting(&self) -> Result<Option<Meeting>> {
        let row = sqlx::query(
            "SELECT meeting_id, active, stage, volume_id FROM meetings WHERE active = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_meeting).transpose()
    }

    /// Advance the active meeting from submit to vote
    #[instrument(skip(self))]
    pub async fn begin_voting(&self, meeting_id: i64) -> Result<()> {
        self.transition(meeting_id, MeetingStage::Vote, None).await
    }

    /// Conclude the meeting: stage organized, winning volume recorded
    #[instrument(skip(self))]
    pub async fn conclude(&self, meeting_id: i64, volume_id: &str) -> Result<()> {
        self.transition(meeting_id, MeetingStage::Organized, Some(volume_id))
            .await
    }

    /// Stage transition with forward-only guard
    async fn transition(
        &self,
        meeting_id: i64,
        target: MeetingStage,
        volume_id: Option<&str>,
    ) -> Result<()> {
        let meeting = self
            .get_meeting(meeting_id)
            .await?
            .ok_or(TomeError::MeetingNotFound(meeting_id))?;

        if !meeting.stage.can_transition_to(target) {
            return Err(TomeError::InvalidStageTransition {
                from: meeting.stage.to_string(),
                to: target.to_string(),
            });
        }

        sqlx::query("UPDATE meetings SET stage = ?, volume_id = COALESCE(?, volume_id) WHERE meeting_id = ?")
            .bind(target.as_str())
            .bind(volume_id)
            .bind(meeting_id)
            .execute(&self.pool)
            .await?;

        info!(meeting_id, stage = %target, "Changed meeting stage");
        Ok(())
    }

    // ==================== Submissions ====================

    /// Insert or overwrite a member's submission for a meeting.
    ///
    /// First submission for a member gets number `count + 1`; re-submitting
    /// replaces the volume but keeps the number. Runs in one transaction so
    /// numbering stays dense. Returns the submission number.
    #[instrument(skip(self))]
    pub async fn upsert_submission(
        &self,
        meeting_id: i64,
        member_id: i64,
        volume_id: &str,
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<i64> = sqlx::query(
            "SELECT submission_id FROM submissions WHERE meeting_id = ? AND member_id = ?",
        )
        .bind(meeting_id)
        .bind(member_id)
        .fetch_optional(&mut *tx)
        .await?
        .map(|r| r.get("submission_id"));

        let submission_id = match existing {
            Some(submission_id) => {
                sqlx::query(
                    "UPDATE submissions SET volume_id = ? WHERE meeting_id = ? AND member_id = ?",
                )
                .bind(volume_id)
                .bind(meeting_id)
                .bind(member_id)
                .execute(&mut *tx)
                .await?;
                debug!(member_id, meeting_id, volume_id, "Replaced submission");
                submission_id
            }
            None => {
                let count: i64 =
                    sqlx::query("SELECT COUNT(member_id) AS n FROM submissions WHERE meeting_id = ?")
                        .bind(meeting_id)
                        .fetch_one(&mut *tx)
                        .await?
                        .get("n");
                let submission_id = count + 1;
                sqlx::query(
                    "INSERT INTO submissions (meeting_id, member_id, submission_id, volume_id) VALUES (?, ?, ?, ?)",
                )
                .bind(meeting_id)
                .bind(member_id)
                .bind(submission_id)
                .bind(volume_id)
                .execute(&mut *tx)
                .await?;
                debug!(member_id, meeting_id, submission_id, "New submission");
                submission_id
            }
        };

        tx.commit().await?;
        Ok(submission_id)
    }

    /// All submissions for a meeting, in submission-number order
    pub async fn submissions(&self, meeting_id: i64) -> Result<Vec<Submission>> {
        let rows = sqlx::query(
            r#"
            SELECT meeting_id, member_id, submission_id, volume_id
            FROM submissions
            WHERE meeting_id = ?
            ORDER BY submission_id ASC
            "#,
        )
        .bind(meeting_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Submission {
                meeting_id: row.get("meeting_id"),
                member_id: row.get("member_id"),
                submission_id: row.get("submission_id"),
                volume_id: row.get("volume_id"),
            })
            .collect())
    }

    /// Number of submissions in a meeting
    pub async fn submission_count(&self, meeting_id: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query("SELECT COUNT(member_id) AS n FROM submissions WHERE meeting_id = ?")
                .bind(meeting_id)
                .fetch_one(&self.pool)
                .await?
                .get("n");
        Ok(count)
    }

    /// Volume id behind a submission number
    pub async fn submission_volume(&self, meeting_id: i64, submission_id: i64) -> Result<String> {
        let row = sqlx::query(
            "SELECT volume_id FROM submissions WHERE meeting_id = ? AND submission_id = ?",
        )
        .bind(meeting_id)
        .bind(submission_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.get("volume_id"))
            .ok_or(TomeError::MissingSubmission {
                submission_id,
                meeting_id,
            })
    }

    // ==================== Votes ====================

    /// Record a member's ballot. A repeat ballot replaces the previous one:
    /// each member is counted at most once in tabulation.
    #[instrument(skip(self))]
    pub async fn record_ballot(
        &self,
        meeting_id: i64,
        member_id: i64,
        choices: RankedChoices,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO votes (meeting_id, member_id, first_choice, second_choice, third_choice)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (meeting_id, member_id) DO UPDATE SET
                first_choice = excluded.first_choice,
                second_choice = excluded.second_choice,
                third_choice = excluded.third_choice
            "#,
        )
        .bind(meeting_id)
        .bind(member_id)
        .bind(choices.first)
        .bind(choices.second)
        .bind(choices.third)
        .execute(&self.pool)
        .await?;

        debug!(member_id, meeting_id, "Recorded ballot");
        Ok(())
    }

    /// All ballots for a meeting
    pub async fn ballots(&self, meeting_id: i64) -> Result<Vec<Ballot>> {
        let rows = sqlx::query(
            r#"
            SELECT meeting_id, member_id, first_choice, second_choice, third_choice
            FROM votes
            WHERE meeting_id = ?
            ORDER BY member_id ASC
            "#,
        )
        .bind(meeting_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Ballot {
                meeting_id: row.get("meeting_id"),
                member_id: row.get("member_id"),
                choices: RankedChoices {
                    first: row.get("first_choice"),
                    second: row.get("second_choice"),
                    third: row.get("third_choice"),
                },
            })
            .collect())
    }
}

fn row_to_meeting(row: sqlx::sqlite::SqliteRow) -> Result<Meeting> {
    let stage_str: String = row.get("stage");
    let stage = MeetingStage::try_from(stage_str.as_str())
        .map_err(|e| TomeError::Other(anyhow::anyhow!(e)))?;
    Ok(Meeting {
        meeting_id: row.get("meeting_id"),
        active: row.get::<i64, _>("active") != 0,
        stage,
        volume_id: row.get("volume_id"),
    })
}
