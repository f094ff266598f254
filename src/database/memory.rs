//! In-memory implementation of `Store`.
//!
//! Holds everything in maps behind a single `RwLock`, so each write is
//! applied under one guard and readers never see half of it. All state is
//! lost on drop.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::models::*;
use super::store::Store;
use crate::error::{Result, ReviewError};

#[derive(Default)]
struct State {
    teams: BTreeSet<String>,
    users: BTreeMap<String, User>,
    pull_requests: HashMap<String, PullRequest>,
    /// Insertion order, used for reviewer listings.
    pr_order: Vec<String>,
}

impl State {
    fn users_in_team(&self, team_name: &str) -> impl Iterator<Item = &User> {
        let team_name = team_name.to_string();
        self.users.values().filter(move |u| u.team_name == team_name)
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn team_exists(&self, team_name: &str) -> Result<bool> {
        Ok(self.state.read().await.teams.contains(team_name))
    }

    async fn create_team_with_members(&self, team: &Team) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.teams.insert(team.team_name.clone()) {
            return Err(ReviewError::TeamExists);
        }
        for member in &team.members {
            state.users.insert(
                member.user_id.clone(),
                User::new(
                    member.user_id.clone(),
                    member.username.clone(),
                    team.team_name.clone(),
                    member.is_active,
                ),
            );
        }
        Ok(())
    }

    async fn get_team_by_name(&self, team_name: &str) -> Result<Option<Team>> {
        let state = self.state.read().await;
        let members: Vec<TeamMember> = state
            .users_in_team(team_name)
            .map(|u| TeamMember {
                user_id: u.user_id.clone(),
                username: u.username.clone(),
                is_active: u.is_active,
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
        Ok(self.state.read().await.users.get(user_id).cloned())
    }

    async fn update_user_active(&self, user_id: &str, is_active: bool) -> Result<Option<User>> {
        let mut state = self.state.write().await;
        Ok(state.users.get_mut(user_id).map(|user| {
            user.is_active = is_active;
            user.clone()
        }))
    }

    async fn get_users_by_team(&self, team_name: &str) -> Result<Vec<User>> {
        let state = self.state.read().await;
        Ok(state.users_in_team(team_name).cloned().collect())
    }

    async fn get_active_users_by_team(&self, team_name: &str) -> Result<Vec<User>> {
        let state = self.state.read().await;
        Ok(state
            .users_in_team(team_name)
            .filter(|u| u.is_active)
            .cloned()
            .collect())
    }

    async fn pr_exists(&self, pr_id: &str) -> Result<bool> {
        Ok(self.state.read().await.pull_requests.contains_key(pr_id))
    }

    async fn create_pull_request(&self, pr: &PullRequest) -> Result<()> {
        let mut state = self.state.write().await;
        if state.pull_requests.contains_key(&pr.pull_request_id) {
            return Err(ReviewError::PrExists);
        }
        state.pr_order.push(pr.pull_request_id.clone());
        state
            .pull_requests
            .insert(pr.pull_request_id.clone(), pr.clone());
        Ok(())
    }

    async fn get_pull_request(&self, pr_id: &str) -> Result<Option<PullRequest>> {
        Ok(self.state.read().await.pull_requests.get(pr_id).cloned())
    }

    async fn update_pull_request_status(
        &self,
        pr_id: &str,
        status: PrStatus,
        merged_at: Option<DateTime<Utc>>,
    ) -> Result<Option<PullRequest>> {
        let mut state = self.state.write().await;
        Ok(state.pull_requests.get_mut(pr_id).map(|pr| {
            pr.status = status;
            if pr.merged_at.is_none() {
                pr.merged_at = merged_at;
            }
            pr.clone()
        }))
    }

    async fn get_pull_requests_by_reviewer(&self, user_id: &str) -> Result<Vec<PullRequestShort>> {
        let state = self.state.read().await;
        Ok(state
            .pr_order
            .iter()
            .filter_map(|id| state.pull_requests.get(id))
            .filter(|pr| pr.has_reviewer(user_id))
            .map(PullRequest::to_short)
            .collect())
    }

    async fn assign_reviewers(&self, pr_id: &str, reviewer_ids: &[String]) -> Result<()> {
        let mut state = self.state.write().await;
        let pr = state
            .pull_requests
            .get_mut(pr_id)
            .ok_or_else(|| ReviewError::Internal(format!("Unknown pull request {}", pr_id)))?;

        if let Some(dup) = reviewer_ids.iter().find(|id| pr.has_reviewer(id)) {
            return Err(ReviewError::Internal(format!(
                "Reviewer {} already assigned to {}",
                dup, pr_id
            )));
        }
        pr.assigned_reviewers.extend(reviewer_ids.iter().cloned());
        Ok(())
    }

    async fn reassign_reviewer(
        &self,
        pr_id: &str,
        old_reviewer_id: &str,
        new_reviewer_id: &str,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let pr = state
            .pull_requests
            .get_mut(pr_id)
            .ok_or_else(|| ReviewError::Internal(format!("Unknown pull request {}", pr_id)))?;

        let position = pr
            .assigned_reviewers
            .iter()
            .position(|r| r == old_reviewer_id)
            .ok_or(ReviewError::NotAssigned)?;

        pr.assigned_reviewers.remove(position);
        pr.assigned_reviewers.push(new_reviewer_id.to_string());
        Ok(())
    }
}
