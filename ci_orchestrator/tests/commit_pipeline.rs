use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use centrix_ci_orchestrator::services::scm::SourceControl;
use centrix_ci_orchestrator::store::MemoryStore;
use centrix_ci_orchestrator::{
    BuildEvent, BuildStatus, CiBuild, CiConfig, CiError, JobType, NewCiCommit, Orchestrator,
};

struct PushedRepo {
    message: String,
}

#[async_trait]
impl SourceControl for PushedRepo {
    async fn commit_message(&self, _project_id: i64, _sha: &str) -> anyhow::Result<String> {
        Ok(self.message.clone())
    }

    async fn author_name(&self, _project_id: i64, _sha: &str) -> anyhow::Result<String> {
        Ok("Grace Hopper".to_string())
    }

    async fn author_email(&self, _project_id: i64, _sha: &str) -> anyhow::Result<String> {
        anyhow::bail!("email lookup unavailable")
    }
}

fn setup(message: &str) -> (Arc<MemoryStore>, Arc<Orchestrator>) {
    let store = Arc::new(MemoryStore::new());
    let orch = Orchestrator::new(
        store.clone(),
        store.clone(),
        Arc::new(PushedRepo {
            message: message.to_string(),
        }),
        CiConfig::default(),
    );
    (store, Arc::new(orch))
}

fn push(sha: &str) -> NewCiCommit {
    NewCiCommit {
        project_id: 1,
        ref_name: "main".into(),
        sha: sha.to_string(),
        before_sha: "0f1e2d3c4b5a69788796a5b4c3d2e1f00f1e2d3c".into(),
        push_data: json!({ "user_email": "grace@example.com", "total_commits_count": 1 }),
    }
}

const SHA_X: &str = "c0ffee00c0ffee00c0ffee00c0ffee00c0ffee00";

async fn pass(orch: &Orchestrator, build: &CiBuild) {
    orch.report_transition(build.id, BuildEvent::Run).await.unwrap();
    orch.report_transition(build.id, BuildEvent::Success).await.unwrap();
}

fn build_for(builds: &[CiBuild], job_id: i64) -> CiBuild {
    builds
        .iter()
        .find(|b| b.job_id == Some(job_id))
        .cloned()
        .unwrap()
}

#[tokio::test]
async fn deploy_waits_for_every_test_job() {
    let (store, orch) = setup("Ship it");
    let a = store.add_job(1, "A", JobType::Test, json!({ "script": "make a" })).await;
    let b = store.add_job(1, "B", JobType::Test, json!({ "script": "make b" })).await;
    let c = store.add_job(1, "C", JobType::Deploy, json!({ "script": "make deploy" })).await;

    let commit = orch.record_commit(push(SHA_X)).await.unwrap();
    assert!(!orch.ci_skip(&commit).await);

    let created = orch.reconcile(&commit).await.unwrap();
    let mut jobs: Vec<_> = created.iter().map(|b| b.job_id.unwrap()).collect();
    jobs.sort();
    assert_eq!(jobs, [a.id, b.id]);
    assert!(created.iter().all(|b| b.status == BuildStatus::Pending));

    assert!(orch.reconcile(&commit).await.unwrap().is_empty());

    pass(&orch, &build_for(&created, b.id)).await;
    assert!(orch.reconcile(&commit).await.unwrap().is_empty());

    pass(&orch, &build_for(&created, a.id)).await;
    let deploys = orch.reconcile(&commit).await.unwrap();
    assert_eq!(deploys.len(), 1);
    assert_eq!(deploys[0].job_id, Some(c.id));
    assert_eq!(deploys[0].status, BuildStatus::Pending);

    assert!(orch.reconcile(&commit).await.unwrap().is_empty());
    assert_eq!(orch.builds(&commit).await.unwrap().len(), 3);
}

#[tokio::test]
async fn failed_test_unblocks_after_retry() {
    let (store, orch) = setup("Fix flaky spec");
    let test = store.add_job(1, "rspec", JobType::Test, json!({})).await;
    let deploy = store.add_job(1, "production", JobType::Deploy, json!({})).await;

    let commit = orch.record_commit(push(SHA_X)).await.unwrap();
    let first = orch.reconcile(&commit).await.unwrap().remove(0);
    orch.report_transition(first.id, BuildEvent::Run).await.unwrap();
    let failed = orch.report_transition(first.id, BuildEvent::Drop).await.unwrap();
    assert!(orch.reconcile(&commit).await.unwrap().is_empty());

    let rerun = orch.retry(&commit).await.unwrap();
    assert_eq!(rerun.job_id, Some(test.id));
    assert_eq!(orch.builds(&commit).await.unwrap().len(), 2);

    pass(&orch, &rerun).await;
    assert_eq!(orch.reconcile(&commit).await.unwrap().len(), 1);

    let history = orch.builds(&commit).await.unwrap();
    assert_eq!(history[0], failed);
    assert_eq!(orch.last_build(&commit).await.unwrap().unwrap().job_id, Some(deploy.id));
}

#[tokio::test]
async fn retry_reruns_the_failed_job_not_the_last_one() {
    let (store, orch) = setup("Two suites");
    let a = store.add_job(1, "A", JobType::Test, json!({})).await;
    let b = store.add_job(1, "B", JobType::Test, json!({})).await;
    let c = store.add_job(1, "C", JobType::Deploy, json!({})).await;

    let commit = orch.record_commit(push(SHA_X)).await.unwrap();
    let created = orch.reconcile(&commit).await.unwrap();
    let build_a = build_for(&created, a.id);
    let build_b = build_for(&created, b.id);
    assert!(build_b.id > build_a.id);

    orch.report_transition(build_a.id, BuildEvent::Run).await.unwrap();
    orch.report_transition(build_a.id, BuildEvent::Drop).await.unwrap();
    pass(&orch, &build_b).await;
    assert!(orch.reconcile(&commit).await.unwrap().is_empty());

    let rerun = orch.retry(&commit).await.unwrap();
    assert_eq!(rerun.job_id, Some(a.id));

    pass(&orch, &rerun).await;
    let deploys = orch.reconcile(&commit).await.unwrap();
    assert_eq!(deploys.len(), 1);
    assert_eq!(deploys[0].job_id, Some(c.id));
}

#[tokio::test]
async fn deploy_only_project_gets_no_builds() {
    let (store, orch) = setup("Release");
    store.add_job(1, "production", JobType::Deploy, json!({})).await;

    let commit = orch.record_commit(push(SHA_X)).await.unwrap();
    assert!(orch.reconcile(&commit).await.unwrap().is_empty());
    assert_eq!(store.build_count().await, 0);
}

#[tokio::test]
async fn skip_marker_and_author_lookup() {
    let (_store, orch) = setup("Small typo [ci skip]");
    let commit = orch.record_commit(push(SHA_X)).await.unwrap();

    assert!(orch.ci_skip(&commit).await);
    assert_eq!(orch.git_author_name(&commit).await.as_deref(), Some("Grace Hopper"));
    assert_eq!(orch.git_author_email(&commit).await, None);
    assert_eq!(commit.short_sha(), "c0ffee00");
    assert_eq!(commit.short_before_sha(), "0f1e2d3c");
}

#[tokio::test]
async fn latest_by_sha_collapses_repushes() {
    let (store, orch) = setup("Rebuild");
    store.add_job(1, "rspec", JobType::Test, json!({})).await;

    let x = orch.record_commit(push(SHA_X)).await.unwrap();
    let y = orch
        .record_commit(push("deadbeefdeadbeefdeadbeefdeadbeefdeadbeef"))
        .await
        .unwrap();
    orch.reconcile(&x).await.unwrap();
    orch.reconcile(&y).await.unwrap();
    let newest_x = orch.retry(&x).await.unwrap();

    let latest = orch.latest_by_sha(&[x.clone(), y.clone()]).await.unwrap();
    assert_eq!(latest.len(), 2);
    assert!(latest.contains(&newest_x));
    assert!(latest.iter().any(|b| b.sha == y.sha));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reconciles_create_one_deploy_build() {
    let (store, orch) = setup("Parallel hooks");
    store.add_job(1, "rspec", JobType::Test, json!({})).await;
    let deploy = store.add_job(1, "production", JobType::Deploy, json!({})).await;

    let commit = orch.record_commit(push(SHA_X)).await.unwrap();
    let test_build = orch.reconcile(&commit).await.unwrap().remove(0);
    pass(&orch, &test_build).await;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let orch = orch.clone();
        let commit = commit.clone();
        handles.push(tokio::spawn(async move { orch.reconcile(&commit).await }));
    }

    let mut created = 0;
    for handle in handles {
        created += handle.await.unwrap().unwrap().len();
    }
    assert_eq!(created, 1);

    let deploys = orch
        .builds(&commit)
        .await
        .unwrap()
        .into_iter()
        .filter(|b| b.job_id == Some(deploy.id))
        .count();
    assert_eq!(deploys, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_transitions_have_one_winner() {
    let (store, orch) = setup("Race");
    store.add_job(1, "rspec", JobType::Test, json!({})).await;
    let commit = orch.record_commit(push(SHA_X)).await.unwrap();
    let build_id = orch.reconcile(&commit).await.unwrap().remove(0).id;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let orch = orch.clone();
        handles.push(tokio::spawn(async move {
            orch.report_transition(build_id, BuildEvent::Run).await
        }));
    }

    let mut won = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(b) => {
                assert_eq!(b.status, BuildStatus::Running);
                won += 1;
            }
            Err(CiError::InvalidTransition { from, .. }) => assert_eq!(from, BuildStatus::Running),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(won, 1);
}
