//! Unit tests for `ConnectionRegistry`.
//!
//! These tests exercise the registry directly, without performing any HTTP
//! upgrades. They verify register/lookup/remove semantics, replacement of
//! connections under the same client id, and graceful shutdown behaviour.

mod common;

use std::sync::Arc;

use common::client;
use docflow_api::ws::{ConnectionRegistry, Outbound};

// ---------------------------------------------------------------------------
// Test: new registry starts with zero connections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_registry_has_zero_connections() {
    let registry = ConnectionRegistry::new();

    assert_eq!(registry.connection_count().await, 0);
    assert!(registry.lookup(&client("c1")).await.is_none());
}

// ---------------------------------------------------------------------------
// Test: register() makes the connection visible to lookup()
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_then_lookup_returns_connection() {
    let registry = ConnectionRegistry::new();

    let (conn_id, _rx) = registry.register(client("c1")).await;

    let handle = registry.lookup(&client("c1")).await.expect("should be registered");
    assert_eq!(handle.conn_id, conn_id);
    assert_eq!(registry.connection_count().await, 1);
}

// ---------------------------------------------------------------------------
// Test: registering under A never affects lookup under B
// ---------------------------------------------------------------------------

#[tokio::test]
async fn distinct_client_ids_are_independent() {
    let registry = ConnectionRegistry::new();

    let (a_id, _rx_a) = registry.register(client("A")).await;
    assert!(registry.lookup(&client("B")).await.is_none());

    let (b_id, mut rx_b) = registry.register(client("B")).await;
    let (a2_id, _rx_a2) = registry.register(client("A")).await;

    assert_ne!(a_id, a2_id);
    assert_eq!(registry.lookup(&client("B")).await.unwrap().conn_id, b_id);
    // Replacing A sent nothing to B.
    assert!(rx_b.try_recv().is_err());

    registry.remove(&client("A")).await;
    assert_eq!(registry.lookup(&client("B")).await.unwrap().conn_id, b_id);
}

// ---------------------------------------------------------------------------
// Test: a second registration under the same id closes the first
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_id_replaces_and_closes_previous_connection() {
    let registry = ConnectionRegistry::new();

    let (old_id, mut rx_old) = registry.register(client("c1")).await;
    let (new_id, mut rx_new) = registry.register(client("c1")).await;

    assert_eq!(registry.connection_count().await, 1);
    assert_eq!(registry.lookup(&client("c1")).await.unwrap().conn_id, new_id);
    assert_ne!(old_id, new_id);

    let msg = rx_old.recv().await.expect("old connection should receive Close");
    assert_eq!(msg, Outbound::Close);
    // The old sender was dropped with the replaced entry.
    assert!(rx_old.recv().await.is_none());

    assert!(rx_new.try_recv().is_err());
}

// ---------------------------------------------------------------------------
// Test: remove() is idempotent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn remove_is_idempotent() {
    let registry = ConnectionRegistry::new();

    let _rx = registry.register(client("c1")).await;
    registry.remove(&client("c1")).await;
    registry.remove(&client("c1")).await;
    registry.remove(&client("never-registered")).await;

    assert_eq!(registry.connection_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: remove_connection() ignores stale connection ids
// ---------------------------------------------------------------------------

#[tokio::test]
async fn remove_connection_only_removes_matching_connection() {
    let registry = ConnectionRegistry::new();

    let (old_id, _rx_old) = registry.register(client("c1")).await;
    let (new_id, _rx_new) = registry.register(client("c1")).await;

    // The replaced connection cleaning up must not evict its successor.
    assert!(!registry.remove_connection(&client("c1"), old_id).await);
    assert_eq!(registry.lookup(&client("c1")).await.unwrap().conn_id, new_id);

    assert!(registry.remove_connection(&client("c1"), new_id).await);
    assert!(registry.lookup(&client("c1")).await.is_none());
}

// ---------------------------------------------------------------------------
// Test: shutdown_all() sends Close and clears all connections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_all_sends_close_and_clears() {
    let registry = ConnectionRegistry::new();

    let (_, mut rx1) = registry.register(client("c1")).await;
    let (_, mut rx2) = registry.register(client("c2")).await;

    registry.shutdown_all().await;

    assert_eq!(registry.connection_count().await, 0);
    assert_eq!(rx1.recv().await, Some(Outbound::Close));
    assert_eq!(rx2.recv().await, Some(Outbound::Close));
    assert!(rx1.recv().await.is_none(), "Channel should be closed after shutdown");
}

// ---------------------------------------------------------------------------
// Test: concurrent register/remove from independent tasks
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_register_and_remove() {
    let registry = Arc::new(ConnectionRegistry::new());

    let mut handles = Vec::new();
    for i in 0..64 {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            let id = client(&format!("client-{i}"));
            let (conn_id, _rx) = registry.register(id.clone()).await;
            assert_eq!(registry.lookup(&id).await.unwrap().conn_id, conn_id);
            if i % 2 == 0 {
                assert!(registry.remove_connection(&id, conn_id).await);
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(registry.connection_count().await, 32);
    assert!(registry.lookup(&client("client-1")).await.is_some());
    assert!(registry.lookup(&client("client-2")).await.is_none());
}
