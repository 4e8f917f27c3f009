//! Contract Test: Reconciliation Idempotency
//!
//! Constraints verified:
//! - Converging twice over the same discovered set declares each host once
//! - Create-once key material is generated exactly once, never regenerated
//! - The bootstrap list contains exactly the hosts added by the current
//!   run, never previously-declared hosts
//!
//! If these fail, re-running against a partially-provisioned cluster is
//! no longer safe.

mod common;

use common::*;
use flotilla_core::discovery::HostDescriptor;
use flotilla_core::reconcile::TopologyReconciler;
use flotilla_core::traits::TopologyStore;
use std::sync::atomic::Ordering;

fn descriptor(hostname: &str, ip: [u8; 4]) -> HostDescriptor {
    HostDescriptor {
        hostname: hostname.to_string(),
        public_ip: Some(ip.into()),
        tags: Vec::new(),
    }
}

#[tokio::test]
async fn converging_twice_declares_each_host_once() {
    let store = CountingTopology::new();
    let config = test_config();
    let reconciler = TopologyReconciler::new(&store, &config);

    let discovered = vec![
        descriptor("node1", [203, 0, 113, 1]),
        descriptor("node2", [203, 0, 113, 2]),
    ];

    let first = reconciler.converge(&discovered).await.unwrap();
    assert_eq!(first.added_hosts, vec!["node1", "node2"]);

    let second = reconciler.converge(&discovered).await.unwrap();
    assert!(second.added_hosts.is_empty(), "second run must add nothing");

    // No duplicate host entries
    assert_eq!(store.list_hosts().await.unwrap(), vec!["node1", "node2"]);

    // Each host's address was appended exactly once
    assert_eq!(
        store.host_addresses("node1").await.unwrap(),
        vec!["203.0.113.1/32"]
    );

    // One shape-instance generate per host, none on the second run
    assert_eq!(store.instance_generates.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn key_material_generated_exactly_once() {
    let store = CountingTopology::new();
    let config = test_config();
    let reconciler = TopologyReconciler::new(&store, &config);

    reconciler.converge(&[]).await.unwrap();
    assert_eq!(store.validation_generates.load(Ordering::SeqCst), 1);
    assert_eq!(store.swarm_generates.load(Ordering::SeqCst), 1);

    // Keys exist now; further runs must not regenerate them
    reconciler.converge(&[]).await.unwrap();
    reconciler.converge(&[]).await.unwrap();
    assert_eq!(store.validation_generates.load(Ordering::SeqCst), 1);
    assert_eq!(store.swarm_generates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn present_keys_are_never_regenerated() {
    let store = CountingTopology::new();
    store.generate_domain_validation().await.unwrap();
    store.generate_swarm_key().await.unwrap();
    let before = store.domain_validation_key().await.unwrap();

    let config = test_config();
    TopologyReconciler::new(&store, &config)
        .converge(&[])
        .await
        .unwrap();

    // The pre-seeded generates are the only ones
    assert_eq!(store.validation_generates.load(Ordering::SeqCst), 1);
    assert_eq!(store.swarm_generates.load(Ordering::SeqCst), 1);
    assert_eq!(store.domain_validation_key().await.unwrap(), before);
}

#[tokio::test]
async fn bootstrap_list_is_scoped_to_current_run() {
    let store = CountingTopology::new();
    let config = test_config();
    let reconciler = TopologyReconciler::new(&store, &config);

    reconciler
        .converge(&[descriptor("node1", [203, 0, 113, 1])])
        .await
        .unwrap();

    // node1 is now declared; a later run discovers it plus a new host
    reconciler
        .converge(&[
            descriptor("node1", [203, 0, 113, 1]),
            descriptor("node2", [203, 0, 113, 2]),
        ])
        .await
        .unwrap();

    let calls = store.bootstrap_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], vec!["node1"]);
    assert_eq!(
        calls[1],
        vec!["node2"],
        "previously-declared node1 must not be re-announced"
    );
}

#[tokio::test]
async fn host_without_public_address_is_skipped() {
    let store = CountingTopology::new();
    let config = test_config();

    let outcome = TopologyReconciler::new(&store, &config)
        .converge(&[HostDescriptor {
            hostname: "dark-node".to_string(),
            public_ip: None,
            tags: Vec::new(),
        }])
        .await
        .unwrap();

    assert!(outcome.added_hosts.is_empty());
    assert_eq!(outcome.skipped_hosts, vec!["dark-node"]);
    assert!(store.list_hosts().await.unwrap().is_empty());
}

#[tokio::test]
async fn converge_commits_once_per_run() {
    let store = CountingTopology::new();
    let config = test_config();
    let reconciler = TopologyReconciler::new(&store, &config);

    reconciler
        .converge(&[descriptor("node1", [203, 0, 113, 1])])
        .await
        .unwrap();
    assert_eq!(store.commits.load(Ordering::SeqCst), 1);

    reconciler.converge(&[]).await.unwrap();
    assert_eq!(store.commits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn declared_host_carries_full_identity() {
    let store = CountingTopology::new();
    let config = test_config();

    TopologyReconciler::new(&store, &config)
        .converge(&[descriptor("node1", [203, 0, 113, 1])])
        .await
        .unwrap();

    assert_eq!(
        store.host_addresses("node1").await.unwrap(),
        vec!["203.0.113.1/32"]
    );
    assert_eq!(store.host_shapes("node1").await.unwrap(), vec!["all"]);
}
