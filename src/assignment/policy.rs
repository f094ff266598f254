use rand::seq::SliceRandom;
use rand::Rng;

use crate::database::models::{PullRequest, User};
use crate::error::ReviewError;

/// Upper bound on reviewers picked when a pull request is created.
pub const MAX_REVIEWERS: usize = 2;

pub struct AssignmentPolicy;

impl AssignmentPolicy {
    /// Pick up to `MAX_REVIEWERS` distinct active team members other than the author.
    ///
    /// Returns an empty list when nobody qualifies.
    pub fn select_initial_reviewers<R: Rng + ?Sized>(
        author_id: &str,
        team_members: &[User],
        rng: &mut R,
    ) -> Vec<String> {
        let mut candidates = Self::distinct_ids(
            team_members
                .iter()
                .filter(|user| user.user_id != author_id && user.is_active),
        );

        candidates.shuffle(rng);
        candidates.truncate(MAX_REVIEWERS);
        candidates
    }

    /// Pick one replacement for `old_reviewer_id` from `candidate_pool`.
    ///
    /// The pool is the active membership of the departing reviewer's team.
    /// The author, the departing reviewer and anyone already reviewing the
    /// pull request are never chosen.
    pub fn select_replacement_reviewer<R: Rng + ?Sized>(
        pr: &PullRequest,
        old_reviewer_id: &str,
        candidate_pool: &[User],
        rng: &mut R,
    ) -> Result<String, ReviewError> {
        let eligible = Self::distinct_ids(candidate_pool.iter().filter(|user| {
            user.user_id != pr.author_id
                && user.user_id != old_reviewer_id
                && !pr.has_reviewer(&user.user_id)
        }));

        eligible.choose(rng).cloned().ok_or(ReviewError::NoCandidate)
    }

    fn distinct_ids<'a>(users: impl Iterator<Item = &'a User>) -> Vec<String> {
        let mut ids: Vec<String> = users.map(|user| user.user_id.clone()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::PrStatus;
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn user(id: &str, active: bool) -> User {
        User::new(id, id.to_uppercase(), "core", active)
    }

    fn pr(author: &str, reviewers: &[&str]) -> PullRequest {
        PullRequest {
            pull_request_id: "pr-1".to_string(),
            pull_request_name: "Add feature".to_string(),
            author_id: author.to_string(),
            status: PrStatus::Open,
            assigned_reviewers: reviewers.iter().map(|r| r.to_string()).collect(),
            created_at: Utc::now(),
            merged_at: None,
        }
    }

    #[test]
    fn test_initial_reviewers_exclude_author_and_inactive() {
        let members = vec![
            user("a", true),
            user("b", true),
            user("c", false),
            user("d", true),
            user("e", true),
        ];

        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let reviewers = AssignmentPolicy::select_initial_reviewers("a", &members, &mut rng);

            assert_eq!(reviewers.len(), 2);
            let unique: HashSet<_> = reviewers.iter().collect();
            assert_eq!(unique.len(), reviewers.len());
            assert!(!reviewers.contains(&"a".to_string()));
            assert!(!reviewers.contains(&"c".to_string()));
        }
    }

    #[test]
    fn test_initial_reviewers_size_follows_pool() {
        let mut rng = StdRng::seed_from_u64(7);

        let only_author = vec![user("a", true), user("b", false)];
        assert!(AssignmentPolicy::select_initial_reviewers("a", &only_author, &mut rng).is_empty());

        let one = vec![user("a", true), user("b", true), user("c", false)];
        assert_eq!(
            AssignmentPolicy::select_initial_reviewers("a", &one, &mut rng),
            vec!["b".to_string()]
        );

        assert!(AssignmentPolicy::select_initial_reviewers("a", &[], &mut rng).is_empty());
    }

    #[test]
    fn test_initial_reviewers_collapse_duplicate_members() {
        let members = vec![user("a", true), user("b", true), user("b", true)];
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            AssignmentPolicy::select_initial_reviewers("a", &members, &mut rng),
            vec!["b".to_string()]
        );
    }

    #[test]
    fn test_initial_reviewers_reach_every_candidate() {
        let members = vec![user("a", true), user("b", true), user("c", true), user("d", true)];
        let mut seen = HashSet::new();

        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            seen.extend(AssignmentPolicy::select_initial_reviewers("a", &members, &mut rng));
        }

        let expected: HashSet<String> = ["b", "c", "d"].iter().map(|s| s.to_string()).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_same_seed_same_choice() {
        let members = vec![user("a", true), user("b", true), user("c", true), user("d", true)];
        let first =
            AssignmentPolicy::select_initial_reviewers("a", &members, &mut StdRng::seed_from_u64(42));
        let second =
            AssignmentPolicy::select_initial_reviewers("a", &members, &mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
    }

    #[test]
    fn test_replacement_skips_author_old_and_current_reviewers() {
        let pool = vec![user("a", true), user("b", true), user("c", true), user("d", true)];
        let pr = pr("a", &["b", "c"]);

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let chosen =
                AssignmentPolicy::select_replacement_reviewer(&pr, "b", &pool, &mut rng).unwrap();
            assert_eq!(chosen, "d");
        }
    }

    #[test]
    fn test_replacement_fails_without_eligible_candidate() {
        let pool = vec![user("a", true), user("c", true), user("d", true)];
        let pr = pr("a", &["c", "d"]);
        let mut rng = StdRng::seed_from_u64(3);

        let err = AssignmentPolicy::select_replacement_reviewer(&pr, "d", &pool, &mut rng)
            .unwrap_err();
        assert_eq!(err, ReviewError::NoCandidate);

        let err = AssignmentPolicy::select_replacement_reviewer(&pr, "d", &[], &mut rng)
            .unwrap_err();
        assert_eq!(err, ReviewError::NoCandidate);
    }

    #[test]
    fn test_replacement_chosen_from_eligible_set() {
        let pool: Vec<User> = ["a", "b", "c", "d", "e", "f"]
            .iter()
            .map(|id| user(id, true))
            .collect();
        let pr = pr("a", &["b", "c"]);
        let eligible: HashSet<&str> = ["d", "e", "f"].into_iter().collect();

        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let chosen =
                AssignmentPolicy::select_replacement_reviewer(&pr, "b", &pool, &mut rng).unwrap();
            assert!(eligible.contains(chosen.as_str()));
        }
    }
}
