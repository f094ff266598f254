use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use super::models::*;
use super::store::Store;
use super::Database;
use crate::error::{Result, ReviewError};

fn user_from_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        user_id: row.try_get("id")?,
        username: row.try_get("username")?,
        team_name: row.try_get("team_name")?,
        is_active: row.try_get("is_active")?,
    })
}

fn parse_status(raw: &str) -> Result<PrStatus> {
    PrStatus::from_str(raw)
        .ok_or_else(|| ReviewError::Internal(format!("Unknown pull request status: {}", raw)))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

async fn insert_reviewers(
    conn: &mut SqliteConnection,
    pr_id: &str,
    reviewer_ids: &[String],
) -> Result<()> {
    for reviewer_id in reviewer_ids {
        sqlx::query("INSERT INTO pr_reviewers (pr_id, user_id) VALUES (?, ?)")
            .bind(pr_id)
            .bind(reviewer_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                ReviewError::Internal(format!("Failed to assign reviewer {}: {}", reviewer_id, e))
            })?;
    }
    Ok(())
}

impl Database {
    async fn fetch_users(&self, team_name: &str, active_only: bool) -> Result<Vec<User>> {
        let sql = if active_only {
            "SELECT id, username, team_name, is_active FROM users WHERE team_name = ? AND is_active = TRUE ORDER BY id"
        } else {
            "SELECT id, username, team_name, is_active FROM users WHERE team_name = ? ORDER BY id"
        };

        let rows = sqlx::query(sql).bind(team_name).fetch_all(self.pool()).await?;
        rows.iter().map(user_from_row).collect()
    }
}

#[async_trait]
impl Store for Database {
    async fn team_exists(&self, team_name: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teams WHERE name = ?")
            .bind(team_name)
            .fetch_one(self.pool())
            .await?;
        Ok(count > 0)
    }

    async fn create_team_with_members(&self, team: &Team) -> Result<()> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("INSERT INTO teams (name) VALUES (?)")
            .bind(&team.team_name)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ReviewError::TeamExists
                } else {
                    ReviewError::Internal(format!("Failed to insert team: {}", e))
                }
            })?;

        for member in &team.members {
            sqlx::query(
                r#"
                INSERT INTO users (id, username, team_name, is_active)
                VALUES (?, ?, ?, ?)
                ON CONFLICT (id) DO UPDATE SET
                    username = excluded.username,
                    team_name = excluded.team_name,
                    is_active = excluded.is_active
                "#,
            )
            .bind(&member.user_id)
            .bind(&member.username)
            .bind(&team.team_name)
            .bind(member.is_active)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                ReviewError::Internal(format!("Failed to upsert user {}: {}", member.user_id, e))
            })?;
        }

        tx.commit().await?;
        debug!(
            "Stored team {} with {} members",
            team.team_name,
            team.members.len()
        );
        Ok(())
    }

    async fn get_team_by_name(&self, team_name: &str) -> Result<Option<Team>> {
        let members: Vec<TeamMember> = self
            .fetch_users(team_name, false)
            .await?
            .into_iter()
            .map(|user| TeamMember {
                user_id: user.user_id,
                username: user.username,
                is_active: user.is_active,
            })
            .collect();

        if members.is_empty() {
            return Ok(None);
        }

        Ok(Some(Team {
            team_name: team_name.to_string(),
            members,
        }))
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, team_name, is_active FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn update_user_active(&self, user_id: &str, is_active: bool) -> Result<Option<User>> {
        let result = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
            .bind(is_active)
            .bind(user_id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_user(user_id).await
    }

    async fn get_users_by_team(&self, team_name: &str) -> Result<Vec<User>> {
        self.fetch_users(team_name, false).await
    }

    async fn get_active_users_by_team(&self, team_name: &str) -> Result<Vec<User>> {
        self.fetch_users(team_name, true).await
    }

    async fn pr_exists(&self, pr_id: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pull_requests WHERE id = ?")
            .bind(pr_id)
            .fetch_one(self.pool())
            .await?;
        Ok(count > 0)
    }

    async fn create_pull_request(&self, pr: &PullRequest) -> Result<()> {
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            r#"
            INSERT INTO pull_requests (id, title, author_id, status, created_at, merged_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&pr.pull_request_id)
        .bind(&pr.pull_request_name)
        .bind(&pr.author_id)
        .bind(pr.status.as_str())
        .bind(pr.created_at)
        .bind(pr.merged_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ReviewError::PrExists
            } else {
                ReviewError::Internal(format!("Failed to insert pull request: {}", e))
            }
        })?;

        insert_reviewers(&mut *tx, &pr.pull_request_id, &pr.assigned_reviewers).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_pull_request(&self, pr_id: &str) -> Result<Option<PullRequest>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, author_id, status, created_at, merged_at
            FROM pull_requests
            WHERE id = ?
            "#,
        )
        .bind(pr_id)
        .fetch_optional(self.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let assigned_reviewers: Vec<String> =
            sqlx::query_scalar("SELECT user_id FROM pr_reviewers WHERE pr_id = ? ORDER BY rowid")
                .bind(pr_id)
                .fetch_all(self.pool())
                .await?;

        let status: String = row.try_get("status")?;

        Ok(Some(PullRequest {
            pull_request_id: row.try_get("id")?,
            pull_request_name: row.try_get("title")?,
            author_id: row.try_get("author_id")?,
            status: parse_status(&status)?,
            assigned_reviewers,
            created_at: row.try_get("created_at")?,
            merged_at: row.try_get("merged_at")?,
        }))
    }

    async fn update_pull_request_status(
        &self,
        pr_id: &str,
        status: PrStatus,
        merged_at: Option<DateTime<Utc>>,
    ) -> Result<Option<PullRequest>> {
        let result = match merged_at {
            Some(merged_at) => {
                // merged_at is written once. Later callers read back the first write.
                sqlx::query(
                    "UPDATE pull_requests SET status = ?, merged_at = ? WHERE id = ? AND merged_at IS NULL",
                )
                .bind(status.as_str())
                .bind(merged_at)
                .bind(pr_id)
                .execute(self.pool())
                .await?
            }
            None => {
                sqlx::query("UPDATE pull_requests SET status = ? WHERE id = ?")
                    .bind(status.as_str())
                    .bind(pr_id)
                    .execute(self.pool())
                    .await?
            }
        };

        if result.rows_affected() == 0 {
            debug!("PR {} not updated, returning stored row", pr_id);
        }
        self.get_pull_request(pr_id).await
    }

    async fn get_pull_requests_by_reviewer(&self, user_id: &str) -> Result<Vec<PullRequestShort>> {
        let rows = sqlx::query(
            r#"
            SELECT pr.id, pr.title, pr.author_id, pr.status
            FROM pull_requests pr
            JOIN pr_reviewers prr ON pr.id = prr.pr_id
            WHERE prr.user_id = ?
            ORDER BY pr.created_at, pr.id
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| -> Result<PullRequestShort> {
                let status: String = row.try_get("status")?;
                Ok(PullRequestShort {
                    pull_request_id: row.try_get("id")?,
                    pull_request_name: row.try_get("title")?,
                    author_id: row.try_get("author_id")?,
                    status: parse_status(&status)?,
                })
            })
            .collect()
    }

    async fn assign_reviewers(&self, pr_id: &str, reviewer_ids: &[String]) -> Result<()> {
        let mut tx = self.pool().begin().await?;
        insert_reviewers(&mut *tx, pr_id, reviewer_ids).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn reassign_reviewer(
        &self,
        pr_id: &str,
        old_reviewer_id: &str,
        new_reviewer_id: &str,
    ) -> Result<()> {
        let mut tx = self.pool().begin().await?;

        let removed = sqlx::query("DELETE FROM pr_reviewers WHERE pr_id = ? AND user_id = ?")
            .bind(pr_id)
            .bind(old_reviewer_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| ReviewError::Internal(format!("Failed to remove old reviewer: {}", e)))?;

        if removed.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Err(ReviewError::NotAssigned);
        }

        sqlx::query("INSERT INTO pr_reviewers (pr_id, user_id) VALUES (?, ?)")
            .bind(pr_id)
            .bind(new_reviewer_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| ReviewError::Internal(format!("Failed to add new reviewer: {}", e)))?;

        tx.commit().await?;
        Ok(())
    }
}
