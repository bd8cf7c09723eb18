//! Session store lifecycle over an injected clock.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use idproof_core::domain::{DocumentStage, SessionStatus};
use idproof_core::{SessionConfig, SessionStore, VerificationError};
use idproof_test_support::ManualClock;
use time::macros::{date, datetime};
use time::Duration;

fn store(timeout: Duration) -> (SessionStore, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(datetime!(2025-03-01 12:00 UTC)));
    let store = SessionStore::new(SessionConfig { timeout }, clock.clone());
    (store, clock)
}

#[test]
fn test_session_retrievable_until_timeout() {
    let (store, clock) = store(Duration::minutes(30));
    let id = store.create_session();

    clock.advance(Duration::minutes(30) - Duration::seconds(1));
    assert!(store.get(id).is_ok());

    clock.advance(Duration::seconds(2));
    assert_eq!(store.get(id), Err(VerificationError::SessionNotFound));
}

#[test]
fn test_sweep_leaves_live_sessions_alone() {
    let (store, clock) = store(Duration::hours(1));
    let stale = store.create_session();
    clock.advance(Duration::minutes(45));
    let live = store.create_session();
    store
        .record_document_stage(
            live,
            DocumentStage::extracted(date!(1990 - 05 - 20), "20-05-1990", 90, 34),
        )
        .unwrap();

    clock.advance(Duration::minutes(16));
    let swept = store.sweep_expired();

    assert_eq!(swept.iter().map(|s| s.id()).collect::<Vec<_>>(), vec![stale]);
    assert_eq!(store.len(), 1);
    let session = store.get(live).unwrap();
    assert_eq!(session.status(), SessionStatus::DocumentUploaded);
    assert_eq!(session.extracted_age(), Some(34));
}

#[test]
fn test_sweep_is_idempotent() {
    let (store, clock) = store(Duration::hours(1));
    store.create_session();
    clock.advance(Duration::hours(2));

    assert_eq!(store.sweep_expired().len(), 1);
    assert!(store.sweep_expired().is_empty());
    assert!(store.is_empty());
}

#[test]
fn test_status_never_regresses() {
    let (store, _clock) = store(Duration::hours(1));
    let id = store.create_session();

    store
        .record_document_stage(
            id,
            DocumentStage::extracted(date!(1990 - 05 - 20), "20-05-1990", 90, 34),
        )
        .unwrap();
    let err = store
        .record_document_stage(id, DocumentStage::failed("no date"))
        .unwrap_err();

    assert!(matches!(err, VerificationError::StageConflict(_)));
    assert_eq!(store.get(id).unwrap().status(), SessionStatus::DocumentUploaded);
    assert_eq!(store.get(id).unwrap().dob_confidence(), 90);
}
