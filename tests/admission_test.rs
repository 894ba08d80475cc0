//! Integration tests for login admission and eviction.

mod helpers;

use std::collections::HashMap;

use sessionguard_core::config::{EvictionScope, LockMode, SessionConfig};
use sessionguard_core::error::ErrorKind;
use sessionguard_core::types::{DeviceType, PageRequest};
use sessionguard_service::SessionFilter;
use sessionguard_store::keys;

use helpers::{TestApp, session, test_config};

#[tokio::test]
async fn test_pc_capacity_keeps_newest_two() {
    let mut config = test_config();
    config.device_limits.insert("PC".to_string(), 2);
    let app = TestApp::with_config(config);

    let (first, _) = app.login("alice", DeviceType::Pc, 3000).await.unwrap();
    let (second, _) = app.login("alice", DeviceType::Pc, 2000).await.unwrap();
    let (third, outcome) = app.login("alice", DeviceType::Pc, 1000).await.unwrap();

    assert_eq!(outcome.session_id, third.id);
    assert_eq!(outcome.evicted, vec![first.id.clone()]);
    assert_eq!(app.index_ids("alice").await, vec![second.id, third.id]);
    assert!(!app.record_exists(&first.id).await);
    assert!(!app.has_tokens(&first.id).await);
}

#[tokio::test]
async fn test_capacity_never_exceeded_for_single_type() {
    let app = TestApp::new();

    for age in (1..=5).rev() {
        app.login("erin", DeviceType::Mobile, age * 1000).await.unwrap();
        let live = app
            .registry
            .count_by_type("erin", DeviceType::Mobile)
            .await
            .unwrap();
        assert!(live <= 2, "mobile sessions exceeded capacity: {live}");
    }
}

#[tokio::test]
async fn test_single_device_policy_clears_other_devices() {
    let config = SessionConfig {
        multi_device_enabled: false,
        ..test_config()
    };
    let app = TestApp::with_config(config);

    let (web, _) = app.login("bob", DeviceType::Web, 2000).await.unwrap();
    let (mobile, outcome) = app.login("bob", DeviceType::Mobile, 1000).await.unwrap();

    assert_eq!(outcome.evicted, vec![web.id.clone()]);
    let listed = app
        .query
        .list_for_user("bob", &SessionFilter::default(), PageRequest::unpaged())
        .await
        .unwrap();
    let ids: Vec<String> = listed.items.into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![mobile.id]);
    assert!(!app.record_exists(&web.id).await);
    assert!(!app.has_tokens(&web.id).await);
}

#[tokio::test]
async fn test_single_device_policy_skips_capacity_check() {
    let config = SessionConfig {
        multi_device_enabled: false,
        ..test_config()
    };
    let app = TestApp::with_config(config);

    let (_, outcome) = app.login("bob", DeviceType::Unknown, 0).await.unwrap();
    assert!(outcome.evicted.is_empty());
}

#[tokio::test]
async fn test_unknown_device_rejected_without_write() {
    let app = TestApp::new();
    let candidate = session("frank", DeviceType::Unknown, 0);

    let err = app.admission.admit(&candidate).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::UnsupportedDeviceType);
    assert!(!app.record_exists(&candidate.id).await);
    assert!(app.index_ids("frank").await.is_empty());
}

#[tokio::test]
async fn test_unlisted_device_uses_default_capacity() {
    let mut limits = HashMap::new();
    limits.insert("PC".to_string(), 1);
    let mut config = test_config();
    config.device_limits = limits;
    config.default_capacity = 1;
    let app = TestApp::with_config(config);

    let (first, _) = app.login("gina", DeviceType::MiniProgram, 2000).await.unwrap();
    let (_, outcome) = app.login("gina", DeviceType::MiniProgram, 1000).await.unwrap();

    assert_eq!(outcome.evicted, vec![first.id]);
}

#[tokio::test]
async fn test_any_device_scope_evicts_globally_oldest() {
    let app = TestApp::new();

    let (mobile, _) = app.login("hank", DeviceType::Mobile, 3000).await.unwrap();
    let (pc, _) = app.login("hank", DeviceType::Pc, 2000).await.unwrap();
    let (_, outcome) = app.login("hank", DeviceType::Pc, 1000).await.unwrap();

    // PC is full, but the oldest session overall is the mobile one.
    assert_eq!(outcome.evicted, vec![mobile.id.clone()]);
    assert!(app.record_exists(&pc.id).await);
    assert!(!app.record_exists(&mobile.id).await);
}

#[tokio::test]
async fn test_same_device_type_scope_evicts_oldest_of_type() {
    let mut config = test_config();
    config.admission.eviction_scope = EvictionScope::SameDeviceType;
    let app = TestApp::with_config(config);

    let (mobile, _) = app.login("hank", DeviceType::Mobile, 3000).await.unwrap();
    let (pc, _) = app.login("hank", DeviceType::Pc, 2000).await.unwrap();
    let (_, outcome) = app.login("hank", DeviceType::Pc, 1000).await.unwrap();

    assert_eq!(outcome.evicted, vec![pc.id.clone()]);
    assert!(app.record_exists(&mobile.id).await);
    assert_eq!(
        app.registry
            .count_by_type("hank", DeviceType::Pc)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_stale_sessions_pruned_before_counting() {
    let app = TestApp::new();
    let stale = session("ivy", DeviceType::Pc, app.stale_age());
    app.insert(&stale).await;

    let (_, outcome) = app.login("ivy", DeviceType::Pc, 0).await.unwrap();

    assert!(outcome.evicted.is_empty());
    assert!(!app.record_exists(&stale.id).await);
    assert_eq!(app.index_ids("ivy").await.len(), 1);
}

#[tokio::test]
async fn test_orphan_entries_do_not_count_against_capacity() {
    let app = TestApp::new();
    app.insert_orphan("jack", "ghost", 5000).await;

    let (admitted, outcome) = app.login("jack", DeviceType::Pc, 0).await.unwrap();

    assert!(outcome.evicted.is_empty());
    assert_eq!(app.index_ids("jack").await, vec![admitted.id]);
}

#[tokio::test]
async fn test_failed_revocation_does_not_abort_admission() {
    let app = TestApp::with_failing_revocation(test_config());

    let (first, _) = app.login("kate", DeviceType::Pc, 1000).await.unwrap();
    let (second, outcome) = app.login("kate", DeviceType::Pc, 0).await.unwrap();

    assert_eq!(outcome.evicted, vec![first.id.clone()]);
    assert!(!app.record_exists(&first.id).await);
    assert_eq!(app.index_ids("kate").await, vec![second.id]);
}

#[tokio::test]
async fn test_blank_identifiers_rejected() {
    let app = TestApp::new();

    let no_user = session("", DeviceType::Pc, 0);
    let err = app.admission.admit(&no_user).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let no_id = session("leo", DeviceType::Pc, 0).with_id("  ");
    let err = app.admission.admit(&no_id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(app.index_ids("leo").await.is_empty());
}

#[tokio::test]
async fn test_foreign_lock_times_out_with_conflict() {
    let mut config = test_config();
    config.admission.lock_wait_millis = 100;
    let app = TestApp::with_config(config);
    app.store
        .set(
            &keys::admission_lock("mia"),
            "other-node",
            std::time::Duration::from_secs(10),
        )
        .await
        .unwrap();

    let candidate = session("mia", DeviceType::Pc, 0);
    let err = app.admission.admit(&candidate).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Conflict);
    assert!(!app.record_exists(&candidate.id).await);
    assert_eq!(
        app.store.get(&keys::admission_lock("mia")).await.unwrap(),
        Some("other-node".to_string())
    );
}

#[tokio::test]
async fn test_lock_released_after_admission() {
    let app = TestApp::new();
    app.login("nora", DeviceType::Pc, 0).await.unwrap();

    assert!(
        app.store
            .get(&keys::admission_lock("nora"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_admit_locked_rejects_other_users_guard() {
    let app = TestApp::new();
    let guard = app.admission.lock_user("olga").await.unwrap();

    let candidate = session("pete", DeviceType::Pc, 0);
    let err = app
        .admission
        .admit_locked(&guard, &candidate)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let own = session("olga", DeviceType::Pc, 0);
    app.admission.admit_locked(&guard, &own).await.unwrap();
    guard.release().await.unwrap();
    assert_eq!(app.index_ids("olga").await, vec![own.id]);
}

async fn concurrent_logins_stay_within_capacity(lock: LockMode) {
    let mut config = test_config();
    config.admission.lock = lock;
    let app = TestApp::with_config(config);

    let mut handles = Vec::new();
    for i in 0..8 {
        let admission = app.admission.clone();
        let candidate = session("quinn", DeviceType::Pc, 100 - i);
        handles.push(tokio::spawn(
            async move { admission.admit(&candidate).await },
        ));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(
        app.registry
            .count_by_type("quinn", DeviceType::Pc)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_logins_distributed_lock() {
    concurrent_logins_stay_within_capacity(LockMode::Distributed).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_logins_local_lock() {
    concurrent_logins_stay_within_capacity(LockMode::Local).await;
}
