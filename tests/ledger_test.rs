//! Integration tests for the processed-visit ledger over the in-memory backend

use chrono::{NaiveDate, TimeZone, Utc};
use hie_bridge::adapters::memory::InMemoryLedger;
use hie_bridge::core::ledger::{ProcessedVisitLedger, VisitStatus};
use hie_bridge::domain::{PatientId, VisitId};
use std::sync::Arc;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn at(d: u32, h: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap()
}

fn vid(id: &str) -> VisitId {
    VisitId::new(id).unwrap()
}

fn pid(id: &str) -> PatientId {
    PatientId::new(id).unwrap()
}

fn ledger() -> (Arc<InMemoryLedger>, ProcessedVisitLedger) {
    let storage = Arc::new(InMemoryLedger::new());
    (storage.clone(), ProcessedVisitLedger::new(storage))
}

#[tokio::test]
async fn test_one_record_per_visit_latest_status_wins() {
    let (storage, ledger) = ledger();

    ledger
        .mark_failure(&vid("v1"), &pid("p1"), day(15), "HIE returned 503", at(16, 2), Some(503))
        .await
        .unwrap();
    ledger
        .mark_success(&vid("v1"), &pid("p1"), day(15), 201, at(17, 2))
        .await
        .unwrap();

    assert_eq!(storage.len().await, 1);
    let record = ledger.get_record(&vid("v1")).await.unwrap().unwrap();
    assert_eq!(record.status, VisitStatus::Success);
    assert_eq!(record.http_status, Some(201));
    assert!(record.error_message.is_none());
    assert_eq!(record.processed_date, day(17));
}

#[tokio::test]
async fn test_only_successful_visits_count_as_processed() {
    let (_, ledger) = ledger();
    ledger
        .mark_success(&vid("v1"), &pid("p1"), day(15), 201, at(16, 2))
        .await
        .unwrap();
    ledger
        .mark_failure(&vid("v2"), &pid("p2"), day(15), "timeout", at(16, 2), None)
        .await
        .unwrap();

    let processed = ledger
        .find_processed(&[vid("v1"), vid("v2"), vid("v3")])
        .await
        .unwrap();

    assert_eq!(processed.len(), 1);
    assert!(processed.contains(&vid("v1")));
}

#[tokio::test]
async fn test_clear_failure_keeps_successful_records() {
    let (storage, ledger) = ledger();
    ledger
        .mark_success(&vid("v1"), &pid("p1"), day(15), 201, at(16, 2))
        .await
        .unwrap();
    ledger
        .mark_failure(&vid("v2"), &pid("p2"), day(15), "rejected", at(16, 2), Some(422))
        .await
        .unwrap();

    assert!(!ledger.clear_failure(&vid("v1")).await.unwrap());
    assert!(ledger.clear_failure(&vid("v2")).await.unwrap());
    assert!(!ledger.clear_failure(&vid("v2")).await.unwrap());
    assert_eq!(storage.len().await, 1);
}

#[tokio::test]
async fn test_failed_for_date_and_stats() {
    let (_, ledger) = ledger();
    ledger
        .mark_success(&vid("v1"), &pid("p1"), day(15), 201, at(16, 2))
        .await
        .unwrap();
    ledger
        .mark_failure(&vid("v2"), &pid("p2"), day(15), "rejected", at(16, 2), Some(422))
        .await
        .unwrap();
    ledger
        .mark_failure(&vid("v3"), &pid("p3"), day(16), "timeout", at(17, 2), None)
        .await
        .unwrap();

    let failed = ledger.get_failed_for_date(day(15)).await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].visit_id, vid("v2"));

    let stats = ledger.get_stats(day(16), day(17)).await.unwrap();
    assert_eq!(stats.success, 1);
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.total(), 3);
    assert_eq!(stats.by_day[&day(16)].failed, 1);
    assert_eq!(stats.by_day[&day(17)].failed, 1);

    let narrow = ledger.get_stats(day(17), day(17)).await.unwrap();
    assert_eq!(narrow.total(), 1);
}
