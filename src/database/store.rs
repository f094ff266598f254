//! Persistence seam used by the review workflow.
//!
//! `Store` lists every read and write the workflow needs. Missing entities
//! come back as `None` or `false`; only infrastructure failures are errors.
//! Implementations must apply each multi-row write atomically.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::{PrStatus, PullRequest, PullRequestShort, Team, User};
use crate::error::Result;

#[async_trait]
pub trait Store: Send + Sync {
    async fn team_exists(&self, team_name: &str) -> Result<bool>;

    /// Insert the team and upsert every member into it in one transaction.
    ///
    /// A member id that already belongs to another team is moved into this
    /// one, with its username and active flag overwritten.
    async fn create_team_with_members(&self, team: &Team) -> Result<()>;

    /// Team with its members, or `None` when no user belongs to it.
    async fn get_team_by_name(&self, team_name: &str) -> Result<Option<Team>>;

    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    /// Set the active flag and return the updated user, `None` if unknown.
    async fn update_user_active(&self, user_id: &str, is_active: bool) -> Result<Option<User>>;

    /// All members of a team, active or not.
    async fn get_users_by_team(&self, team_name: &str) -> Result<Vec<User>>;

    /// Active members of a team only.
    async fn get_active_users_by_team(&self, team_name: &str) -> Result<Vec<User>>;

    async fn pr_exists(&self, pr_id: &str) -> Result<bool>;

    /// Insert the pull request together with its reviewer rows.
    async fn create_pull_request(&self, pr: &PullRequest) -> Result<()>;

    async fn get_pull_request(&self, pr_id: &str) -> Result<Option<PullRequest>>;

    /// Update status, and `merged_at` when given and not already set.
    /// Returns the stored PR, or `None` when it does not exist.
    async fn update_pull_request_status(
        &self,
        pr_id: &str,
        status: PrStatus,
        merged_at: Option<DateTime<Utc>>,
    ) -> Result<Option<PullRequest>>;

    async fn get_pull_requests_by_reviewer(&self, user_id: &str) -> Result<Vec<PullRequestShort>>;

    async fn assign_reviewers(&self, pr_id: &str, reviewer_ids: &[String]) -> Result<()>;

    /// Swap `old_reviewer_id` for `new_reviewer_id` in one transaction.
    ///
    /// Fails with `NotAssigned` and changes nothing if the old reviewer is no
    /// longer on the PR.
    async fn reassign_reviewer(
        &self,
        pr_id: &str,
        old_reviewer_id: &str,
        new_reviewer_id: &str,
    ) -> Result<()>;
}
