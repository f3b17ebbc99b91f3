//! SqliteRepository against a real database file.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use uuid::Uuid;

use spenttime_core::{
    DeleteStatus, NoopPublisher, Record, RecordCache, RecordRepository, RecordService, SaveReason,
    ServiceConfig, SpentTime,
};
use spenttime_sqlite::SqliteRepository;

fn record(id: u128, name: &str, millis: u64) -> Record {
    Record::with_time(Uuid::from_u128(id), name, SpentTime::from_millis(millis)).unwrap()
}

#[tokio::test]
async fn test_save_find_roundtrip_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.db");

    {
        let repo = SqliteRepository::open(&path).unwrap();
        repo.save(record(1, "Steve", 1_234)).await.unwrap();
    }

    let repo = SqliteRepository::open(&path).unwrap();
    let found = repo.find(Uuid::from_u128(1)).await.unwrap().unwrap();
    assert_eq!(found.display_name(), "Steve");
    assert_eq!(found.spent_time(), SpentTime::from_millis(1_234));

    let by_name = repo.find_by_name("Steve").await.unwrap().unwrap();
    assert!(by_name.same_state(&found));
    assert!(repo.find_by_name("Alex").await.unwrap().is_none());
}

#[tokio::test]
async fn test_save_is_last_write_wins() {
    let repo = SqliteRepository::open_in_memory().unwrap();
    repo.save(record(1, "Steve", 10)).await.unwrap();
    repo.save(record(1, "Steve2", 20)).await.unwrap();

    let all = repo.find_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].display_name(), "Steve2");
    assert_eq!(all[0].spent_time(), SpentTime::from_millis(20));
}

#[tokio::test]
async fn test_find_top_ordering() {
    let repo = SqliteRepository::open_in_memory().unwrap();
    for (id, millis) in [(4, 50), (2, 900), (3, 50), (1, 10)] {
        repo.save(record(id, &format!("p{id}"), millis)).await.unwrap();
    }

    let top = repo.find_top(3).await.unwrap();
    let ids: Vec<u128> = top.iter().map(|r| r.identity().as_u128()).collect();
    assert_eq!(ids, vec![2, 3, 4]);
    assert!(repo.find_top(0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_statuses() {
    let repo = SqliteRepository::open_in_memory().unwrap();
    repo.save(record(1, "Steve", 10)).await.unwrap();
    repo.save(record(2, "Alex", 10)).await.unwrap();

    let missing = repo.delete(Uuid::from_u128(9)).await.unwrap();
    assert_eq!(missing.status, DeleteStatus::NotFound);
    assert!(missing.record.is_none());

    let deleted = repo.delete(Uuid::from_u128(1)).await.unwrap();
    assert!(deleted.is_success());
    assert_eq!(deleted.record.unwrap().display_name(), "Steve");

    let by_name = repo.delete_by_name("Alex").await.unwrap();
    assert!(by_name.is_success());
    assert!(repo.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_service_over_sqlite() {
    let repo = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let service = RecordService::new(
        repo.clone(),
        Arc::new(RecordCache::default()),
        Arc::new(NoopPublisher),
        ServiceConfig::default(),
    );

    service
        .save(record(1, "Steve", 500), SaveReason::PlayerJoin)
        .await
        .unwrap();
    service
        .save(record(2, "Alex", 700), SaveReason::PlayerJoin)
        .await
        .unwrap();

    assert_eq!(service.reset_all().await.unwrap(), 2);
    let top = service.top(10).await.unwrap();
    assert!(top.iter().all(|r| r.spent_time().is_zero()));
    assert!(service.find_cached_by_name("Alex").unwrap().spent_time().is_zero());
}
