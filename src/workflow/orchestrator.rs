use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::assignment::AssignmentPolicy;
use crate::database::models::*;
use crate::database::Store;
use crate::error::{Result, ReviewError};

/// Runs every team, user and pull request operation against a `Store`.
///
/// Each call is independent. The only state held here is the random
/// generator used for reviewer selection.
pub struct ReviewWorkflow {
    store: Arc<dyn Store>,
    rng: Mutex<StdRng>,
}

impl ReviewWorkflow {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_rng(store, StdRng::from_entropy())
    }

    /// Deterministic reviewer selection, for tests and replays.
    pub fn with_seed(store: Arc<dyn Store>, seed: u64) -> Self {
        Self::with_rng(store, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(store: Arc<dyn Store>, rng: StdRng) -> Self {
        Self {
            store,
            rng: Mutex::new(rng),
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    fn draw<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        // The generator holds no invariant a panic could break.
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *rng)
    }

    pub async fn create_team(&self, team: Team) -> Result<Team> {
        info!(
            "Creating team {} with {} members",
            team.team_name,
            team.members.len()
        );

        if team.team_name.trim().is_empty() {
            return Err(ReviewError::invalid_request("team_name is required"));
        }
        if team.members.iter().any(|m| m.user_id.trim().is_empty()) {
            return Err(ReviewError::invalid_request("member user_id is required"));
        }

        if self.store.team_exists(&team.team_name).await? {
            return Err(ReviewError::TeamExists);
        }

        self.store.create_team_with_members(&team).await?;
        Ok(team)
    }

    pub async fn get_team(&self, team_name: &str) -> Result<Team> {
        info!("Getting team {}", team_name);

        // A team with no members reads the same as a missing team.
        self.store
            .get_team_by_name(team_name)
            .await?
            .ok_or(ReviewError::NotFound)
    }

    pub async fn set_user_active(&self, user_id: &str, is_active: bool) -> Result<User> {
        info!("Setting user {} active: {}", user_id, is_active);

        self.store
            .update_user_active(user_id, is_active)
            .await?
            .ok_or(ReviewError::NotFound)
    }

    pub async fn get_user_reviews(&self, user_id: &str) -> Result<Vec<PullRequestShort>> {
        info!("Getting reviews for user {}", user_id);

        if self.store.get_user(user_id).await?.is_none() {
            return Err(ReviewError::NotFound);
        }

        self.store.get_pull_requests_by_reviewer(user_id).await
    }

    pub async fn create_pull_request(
        &self,
        pr_id: &str,
        title: &str,
        author_id: &str,
    ) -> Result<PullRequest> {
        info!("Creating PR {} by {}", pr_id, author_id);

        if pr_id.trim().is_empty() {
            return Err(ReviewError::invalid_request("pull_request_id is required"));
        }

        if self.store.pr_exists(pr_id).await? {
            return Err(ReviewError::PrExists);
        }

        let author = self
            .store
            .get_user(author_id)
            .await?
            .ok_or(ReviewError::AuthorNotFound)?;

        if !self.store.team_exists(&author.team_name).await? {
            return Err(ReviewError::TeamNotFound);
        }

        let team_members = self.store.get_active_users_by_team(&author.team_name).await?;
        let reviewers = self.draw(|rng| {
            AssignmentPolicy::select_initial_reviewers(author_id, &team_members, rng)
        });
        debug!("PR {} reviewers: {:?}", pr_id, reviewers);

        let pr = PullRequest {
            pull_request_id: pr_id.to_string(),
            pull_request_name: title.to_string(),
            author_id: author_id.to_string(),
            status: PrStatus::Open,
            assigned_reviewers: reviewers,
            created_at: Utc::now(),
            merged_at: None,
        };

        self.store.create_pull_request(&pr).await?;
        Ok(pr)
    }

    /// Merge is idempotent: a merged PR is returned unchanged.
    pub async fn merge_pull_request(&self, pr_id: &str) -> Result<PullRequest> {
        info!("Merging PR {}", pr_id);

        let pr = self
            .store
            .get_pull_request(pr_id)
            .await?
            .ok_or(ReviewError::NotFound)?;

        if pr.is_merged() {
            debug!("PR {} already merged", pr_id);
            return Ok(pr);
        }

        self.store
            .update_pull_request_status(pr_id, PrStatus::Merged, Some(Utc::now()))
            .await?
            .ok_or(ReviewError::NotFound)
    }

    pub async fn reassign_reviewer(
        &self,
        pr_id: &str,
        old_reviewer_id: &str,
    ) -> Result<ReassignResult> {
        info!("Reassigning reviewer {} on PR {}", old_reviewer_id, pr_id);

        let pr = self
            .store
            .get_pull_request(pr_id)
            .await?
            .ok_or(ReviewError::NotFound)?;

        if pr.is_merged() {
            return Err(ReviewError::PrMerged);
        }

        if !pr.has_reviewer(old_reviewer_id) {
            return Err(ReviewError::NotAssigned);
        }

        let old_reviewer = self
            .store
            .get_user(old_reviewer_id)
            .await?
            .ok_or(ReviewError::NotFound)?;

        if !self.store.team_exists(&old_reviewer.team_name).await? {
            return Err(ReviewError::TeamNotFound);
        }

        // Candidates come from the departing reviewer's team, not the author's.
        let candidates = self
            .store
            .get_active_users_by_team(&old_reviewer.team_name)
            .await?;

        let replacement = self.draw(|rng| {
            AssignmentPolicy::select_replacement_reviewer(&pr, old_reviewer_id, &candidates, rng)
        })?;

        self.store
            .reassign_reviewer(pr_id, old_reviewer_id, &replacement)
            .await?;

        let updated = self
            .store
            .get_pull_request(pr_id)
            .await?
            .ok_or(ReviewError::NotFound)?;

        info!(
            "PR {}: reviewer {} replaced by {}",
            pr_id, old_reviewer_id, replacement
        );

        Ok(ReassignResult {
            pr: updated,
            replaced_by: replacement,
        })
    }
}
