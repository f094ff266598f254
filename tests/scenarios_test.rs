//! End-to-end review assignment scenarios against the SQLite store

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{member, setup_workflow, team};
use review_assigner::database::Database;
use review_assigner::database::models::PrStatus;
use review_assigner::workflow::ReviewWorkflow;
use review_assigner::ReviewError;

#[tokio::test]
async fn test_inactive_members_are_never_assigned() {
    let workflow = setup_workflow().await;
    workflow
        .create_team(team(
            "core",
            vec![member("A", true), member("B", true), member("C", false)],
        ))
        .await
        .unwrap();

    let pr = workflow
        .create_pull_request("pr-1", "Add search", "A")
        .await
        .unwrap();

    assert_eq!(pr.status, PrStatus::Open);
    assert_eq!(pr.assigned_reviewers, vec!["B".to_string()]);

    let stored = workflow.store().get_pull_request("pr-1").await.unwrap().unwrap();
    assert_eq!(stored.assigned_reviewers, vec!["B".to_string()]);
}

#[tokio::test]
async fn test_reassignment_picks_only_eligible_candidate() {
    let workflow = setup_workflow().await;
    workflow
        .create_team(team(
            "core",
            vec![
                member("A", true),
                member("B", true),
                member("C", true),
                member("D", false),
            ],
        ))
        .await
        .unwrap();

    let pr = workflow
        .create_pull_request("pr-1", "Refactor cache", "A")
        .await
        .unwrap();
    let mut reviewers = pr.assigned_reviewers.clone();
    reviewers.sort();
    assert_eq!(reviewers, vec!["B".to_string(), "C".to_string()]);

    workflow.set_user_active("D", true).await.unwrap();

    let result = workflow.reassign_reviewer("pr-1", "B").await.unwrap();
    assert_eq!(result.replaced_by, "D");
    assert!(!result.pr.has_reviewer("B"));
    assert!(result.pr.has_reviewer("C"));
    assert!(result.pr.has_reviewer("D"));

    // With B gone from the pool nobody is left to replace D.
    workflow.set_user_active("B", false).await.unwrap();
    let err = workflow.reassign_reviewer("pr-1", "D").await.unwrap_err();
    assert_eq!(err, ReviewError::NoCandidate);

    let stored = workflow.store().get_pull_request("pr-1").await.unwrap().unwrap();
    let mut reviewers = stored.assigned_reviewers;
    reviewers.sort();
    assert_eq!(reviewers, vec!["C".to_string(), "D".to_string()]);
}

#[tokio::test]
async fn test_merged_pull_request_is_frozen() {
    let workflow = setup_workflow().await;
    workflow
        .create_team(team(
            "core",
            vec![member("A", true), member("B", true), member("C", true)],
        ))
        .await
        .unwrap();
    workflow
        .create_pull_request("pr-1", "Bump deps", "A")
        .await
        .unwrap();

    let merged = workflow.merge_pull_request("pr-1").await.unwrap();
    assert_eq!(merged.status, PrStatus::Merged);
    assert!(merged.merged_at.is_some());

    let reviewer = merged.assigned_reviewers[0].clone();
    let err = workflow.reassign_reviewer("pr-1", &reviewer).await.unwrap_err();
    assert_eq!(err, ReviewError::PrMerged);

    let again = workflow.merge_pull_request("pr-1").await.unwrap();
    assert_eq!(again, merged);
}

#[tokio::test]
async fn test_user_reviews_follow_reassignment() {
    let workflow = setup_workflow().await;
    workflow
        .create_team(team("core", vec![member("A", true), member("B", true)]))
        .await
        .unwrap();
    workflow
        .create_team(team("infra", vec![member("E", true), member("F", true)]))
        .await
        .unwrap();

    workflow
        .create_pull_request("pr-1", "Tune GC", "A")
        .await
        .unwrap();
    assert_eq!(workflow.get_user_reviews("B").await.unwrap().len(), 1);

    // B moves to platform; replacements now come from platform.
    workflow
        .create_team(team("platform", vec![member("B", true), member("G", true)]))
        .await
        .unwrap();
    let result = workflow.reassign_reviewer("pr-1", "B").await.unwrap();
    assert_eq!(result.replaced_by, "G");

    assert!(workflow.get_user_reviews("B").await.unwrap().is_empty());
    let reviews = workflow.get_user_reviews("G").await.unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].pull_request_id, "pr-1");
    assert_eq!(reviews[0].author_id, "A");
}

#[tokio::test]
async fn test_duplicate_ids_are_rejected() {
    let workflow = setup_workflow().await;
    workflow
        .create_team(team("core", vec![member("A", true)]))
        .await
        .unwrap();

    assert_eq!(
        workflow
            .create_team(team("core", vec![member("Z", true)]))
            .await
            .unwrap_err(),
        ReviewError::TeamExists
    );
    // The rejected team's members were not written.
    assert!(workflow.store().get_user("Z").await.unwrap().is_none());

    workflow.create_pull_request("pr-1", "One", "A").await.unwrap();
    assert_eq!(
        workflow
            .create_pull_request("pr-1", "Two", "A")
            .await
            .unwrap_err(),
        ReviewError::PrExists
    );
    assert_eq!(
        workflow
            .create_pull_request("pr-2", "Two", "nobody")
            .await
            .unwrap_err(),
        ReviewError::AuthorNotFound
    );
}

#[tokio::test]
async fn test_concurrent_merges_agree_on_timestamp() {
    let temp_dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", temp_dir.path().join("merge.db").display());
    let db = Database::new(&url, 4).await.unwrap();
    db.run_migrations().await.unwrap();

    let workflow = Arc::new(ReviewWorkflow::with_seed(Arc::new(db), 7));
    workflow
        .create_team(team("core", vec![member("A", true), member("B", true)]))
        .await
        .unwrap();

    for i in 0..20 {
        let pr_id = format!("pr-{}", i);
        workflow
            .create_pull_request(&pr_id, "Concurrent", "A")
            .await
            .unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let workflow = Arc::clone(&workflow);
                let pr_id = pr_id.clone();
                tokio::spawn(async move { workflow.merge_pull_request(&pr_id).await })
            })
            .collect();

        let mut stamps = HashSet::new();
        for handle in handles {
            let pr = handle.await.unwrap().unwrap();
            assert_eq!(pr.status, PrStatus::Merged);
            stamps.insert(pr.merged_at);
        }

        let stored = workflow.merge_pull_request(&pr_id).await.unwrap();
        assert_eq!(stamps.len(), 1, "{} returned differing merged_at", pr_id);
        assert!(stamps.contains(&stored.merged_at));
    }
}
