//! Durable store unit tests

use std::time::Duration;

use chrono::Utc;
use serde_json::json;

use dockhand::filesys::dir::Dir;
use dockhand::models::deployment::DeploymentConfig;
use dockhand::models::job::JobStatus;
use dockhand::models::tag::TagRecord;
use dockhand::storage::layout::StorageLayout;
use dockhand::store::file::FileStore;
use dockhand::store::memory::MemoryStore;
use dockhand::store::{JobStore, NewProfile, ProfileStore, TagLedger};

fn new_profile(name: &str) -> NewProfile {
    let now = Utc::now();
    NewProfile {
        name: name.to_string(),
        config: DeploymentConfig {
            image_name: "web".to_string(),
            ssh_host: "10.0.0.5".to_string(),
            ..Default::default()
        },
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn test_job_ids_are_assigned_in_order() {
    let store = MemoryStore::new();
    let first = store.create_job(json!({"imageName": "a"})).await.unwrap();
    let second = store.create_job(json!({"imageName": "b"})).await.unwrap();

    assert_eq!(first.status, JobStatus::Pending);
    assert!(first.logs.is_empty());
    assert!(second.id > first.id);
}

#[tokio::test]
async fn test_update_job_overwrites_status_and_logs() {
    let store = MemoryStore::new();
    let job = store.create_job(json!({})).await.unwrap();

    store
        .update_job(job.id, JobStatus::Running, "a\nb".to_string())
        .await
        .unwrap();

    let stored = store.get_job(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Running);
    assert_eq!(stored.logs, "a\nb");
    assert!(store
        .update_job(999, JobStatus::Failed, String::new())
        .await
        .is_err());
}

#[tokio::test]
async fn test_recent_jobs_are_bounded_and_newest_first() {
    let store = MemoryStore::new();
    let mut ids = Vec::new();
    for _ in 0..5 {
        ids.push(store.create_job(json!({})).await.unwrap().id);
    }

    let recent = store.recent_jobs(3).await.unwrap();
    let recent_ids: Vec<i64> = recent.iter().map(|job| job.id).collect();
    assert_eq!(recent_ids, vec![ids[4], ids[3], ids[2]]);
}

#[tokio::test]
async fn test_same_tag_recorded_twice_is_kept() {
    let store = MemoryStore::new();
    store
        .record_tag(TagRecord::new("acme/web", "1.0", 1))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    store
        .record_tag(TagRecord::new("acme/web", "1.0", 2))
        .await
        .unwrap();
    store
        .record_tag(TagRecord::new("acme/api", "1.0", 3))
        .await
        .unwrap();

    let tags = store.image_tags("acme/web").await.unwrap();
    assert_eq!(tags.len(), 2);
    // Newest first
    assert_eq!(tags[0].job_id, 2);
    assert_eq!(tags[1].job_id, 1);

    assert!(store.tag_exists("acme/web", "1.0").await.unwrap());
    assert!(!store.tag_exists("acme/web", "2.0").await.unwrap());
}

#[tokio::test]
async fn test_identical_tag_record_rejected() {
    let store = MemoryStore::new();
    let record = TagRecord::new("acme/web", "1.0", 1);
    store.record_tag(record.clone()).await.unwrap();
    assert!(store.record_tag(record).await.is_err());
}

#[tokio::test]
async fn test_profiles_crud() {
    let store = MemoryStore::new();
    let id = store.insert_profile(new_profile("staging")).await.unwrap();

    let mut profile = store.get_profile(id).await.unwrap().unwrap();
    assert_eq!(profile.name, "staging");

    profile.name = "production".to_string();
    store.update_profile(profile).await.unwrap();
    assert_eq!(store.get_profile(id).await.unwrap().unwrap().name, "production");

    assert!(store.delete_profile(id).await.unwrap());
    assert!(!store.delete_profile(id).await.unwrap());
    assert!(store.get_profile(id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_file_store_survives_reopen() {
    let dir = Dir::create_temp_dir("dockhand-store-test").await.unwrap();
    let layout = StorageLayout::new(dir.path().join("data"));

    let (job_id, profile_id) = {
        let store = FileStore::open(&layout).await.unwrap();
        let job = store.create_job(json!({"imageName": "web"})).await.unwrap();
        store
            .update_job(job.id, JobStatus::Completed, "done".to_string())
            .await
            .unwrap();
        store
            .record_tag(TagRecord::new("acme/web", "1.0", job.id))
            .await
            .unwrap();
        let profile_id = store.insert_profile(new_profile("staging")).await.unwrap();
        (job.id, profile_id)
    };

    assert!(layout.jobs_file().exists().await);
    assert!(layout.profiles_file().exists().await);
    assert!(layout.tags_file().exists().await);

    let reopened = FileStore::open(&layout).await.unwrap();
    let job = reopened.get_job(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.logs, "done");
    assert_eq!(job.config, json!({"imageName": "web"}));
    assert!(reopened.tag_exists("acme/web", "1.0").await.unwrap());
    assert_eq!(reopened.list_profiles().await.unwrap()[0].id, profile_id);

    // Ids keep counting after a reopen
    let next = reopened.create_job(json!({})).await.unwrap();
    assert!(next.id > job_id);

    dir.delete().await.unwrap();
}

#[tokio::test]
async fn test_file_store_rejects_corrupt_file() {
    let dir = Dir::create_temp_dir("dockhand-store-test").await.unwrap();
    let layout = StorageLayout::new(dir.path());
    layout.jobs_file().write_string("{ not json").await.unwrap();

    assert!(FileStore::open(&layout).await.is_err());

    dir.delete().await.unwrap();
}
