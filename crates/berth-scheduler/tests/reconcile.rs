//! Reconciliation tests over live in-process nodes.
//!
//! Each "host" is a real HTTP listener serving the node router with a
//! fake runtime, all sharing one in-memory KV, so the reconciler's
//! probes, stale checks, and launch dispatches go over the wire exactly
//! as in a fleet.

use std::sync::Arc;

use berth_api::{build_router, AppState};
use berth_cluster::PeerClient;
use berth_runtime::{ContainerRuntime, FakeRuntime, Probe, ResourceSnapshot, StaticProbe};
use berth_scheduler::{first_fit, Reconciler, ResourceRequest};
use berth_state::{ContainerRecord, HostRecord, KvStore, PodRecord, Store};
use berth_storage::StorageService;

struct TestNode {
    host: String,
    runtime: FakeRuntime,
    _data_dir: tempfile::TempDir,
}

/// Serve one node and register it in the host directory.
async fn spawn_host(store: &Store, host: &str, snapshot: ResourceSnapshot) -> TestNode {
    let data_dir = tempfile::tempdir().unwrap();
    let runtime = FakeRuntime::new();
    let probe = Arc::new(StaticProbe::new(snapshot));

    let listener = tokio::net::TcpListener::bind("0.0.0.0:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let peers = PeerClient::new().unwrap();
    let storage = StorageService::new(
        data_dir.path(),
        store.clone(),
        peers.clone(),
        probe.clone() as Arc<dyn Probe>,
        host,
        port,
    );
    let state = AppState {
        store: store.clone(),
        runtime: Arc::new(runtime.clone()),
        probe,
        peers,
        storage,
        local_host: host.to_string(),
        listen_port: port,
    };

    let router = build_router(state);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    store
        .create_host(&HostRecord {
            name: host.to_string(),
            port,
            disk: snapshot.disk,
            memory: snapshot.memory,
            cores: snapshot.cores,
        })
        .await
        .unwrap();

    TestNode {
        host: host.to_string(),
        runtime,
        _data_dir: data_dir,
    }
}

fn roomy() -> ResourceSnapshot {
    ResourceSnapshot {
        disk: 1 << 30,
        memory: 1 << 30,
        cores: 4,
    }
}

fn web_pod(count: u64) -> PodRecord {
    PodRecord {
        name: "web".to_string(),
        image: "nginx".to_string(),
        count,
        cores: 1,
        memory: 1 << 20,
        disk: 1 << 20,
    }
}

fn runtime_of<'a>(nodes: &'a [TestNode], record: &ContainerRecord) -> &'a FakeRuntime {
    &nodes
        .iter()
        .find(|n| n.host == record.host)
        .unwrap_or_else(|| panic!("no node named {}", record.host))
        .runtime
}

#[tokio::test]
async fn pod_converges_in_one_tick() {
    let store = Store::new(KvStore::open_in_memory());
    let nodes = [
        spawn_host(&store, "127.0.0.1", roomy()).await,
        spawn_host(&store, "127.0.0.2", roomy()).await,
        spawn_host(&store, "127.0.0.3", roomy()).await,
    ];
    store.create_pod(&web_pod(3)).await.unwrap();

    let reconciler = Reconciler::new(store.clone(), PeerClient::new().unwrap(), 8888);
    let stats = reconciler.tick().await.unwrap();
    assert_eq!(stats.launched, 3);
    assert_eq!(stats.failed, 0);

    let mut records = store.list_containers_with_prefix("web-").await.unwrap();
    records.sort_by(|a, b| a.name.cmp(&b.name));
    let names: Vec<_> = records.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["web-0", "web-1", "web-2"]);

    for record in &records {
        assert!(
            runtime_of(&nodes, record).is_running(&record.id),
            "{} not running on {}",
            record.name,
            record.host
        );
    }

    // A second tick finds nothing to do.
    let stats = reconciler.tick().await.unwrap();
    assert!(stats.is_noop(), "{stats:?}");
}

#[tokio::test]
async fn dead_replica_is_healed_with_its_index_reused() {
    let store = Store::new(KvStore::open_in_memory());
    let nodes = [
        spawn_host(&store, "127.0.0.1", roomy()).await,
        spawn_host(&store, "127.0.0.2", roomy()).await,
    ];
    store.create_pod(&web_pod(2)).await.unwrap();

    let reconciler = Reconciler::new(store.clone(), PeerClient::new().unwrap(), 8888);
    reconciler.tick().await.unwrap();

    // Kill the container backing web-1 out-of-band.
    let victim = store.get_container("web-1").await.unwrap();
    runtime_of(&nodes, &victim).kill(&victim.id);

    let stats = reconciler.tick().await.unwrap();
    assert_eq!(stats.stale_removed, 1);
    assert_eq!(stats.launched, 1);

    // The replacement reuses index 1 and actually runs.
    let healed = store.get_container("web-1").await.unwrap();
    assert_ne!(healed.id, victim.id);
    assert!(runtime_of(&nodes, &healed).is_running(&healed.id));

    let records = store.list_containers_with_prefix("web-").await.unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn colliding_name_with_wrong_image_is_reaped_not_counted() {
    let store = Store::new(KvStore::open_in_memory());
    let node = spawn_host(&store, "127.0.0.1", roomy()).await;
    store.create_pod(&web_pod(1)).await.unwrap();

    // An unrelated container whose name matches the pod's naming scheme
    // but runs a different image. It must not satisfy the pod.
    let id = node.runtime.create("redis", "web-5").await.unwrap();
    node.runtime.start(&id).await.unwrap();
    store
        .create_container(&ContainerRecord {
            image: "redis".to_string(),
            name: "web-5".to_string(),
            host: "127.0.0.1".to_string(),
            id: id.clone(),
            cores: 1,
            memory: 1 << 20,
            disk: 1 << 20,
        })
        .await
        .unwrap();

    let reconciler = Reconciler::new(store.clone(), PeerClient::new().unwrap(), 8888);
    let stats = reconciler.tick().await.unwrap();

    // The interloper's record is reaped and a real replica is launched.
    assert_eq!(stats.stale_removed, 1);
    assert_eq!(stats.launched, 1);

    let records = store.list_containers_with_prefix("web-").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "web-0");
    assert_eq!(records[0].image, "nginx");

    // The runtime container itself is left alone; KV presence is what
    // the reconciler owns.
    assert!(node.runtime.is_running(&id));
}

#[tokio::test]
async fn no_capacity_is_retried_not_fatal() {
    let store = Store::new(KvStore::open_in_memory());
    let _node = spawn_host(&store, "127.0.0.1", roomy()).await;

    // Nothing in the fleet has 64 cores.
    store
        .create_pod(&PodRecord {
            name: "heavy".to_string(),
            image: "nginx".to_string(),
            count: 2,
            cores: 64,
            memory: 1 << 20,
            disk: 1 << 20,
        })
        .await
        .unwrap();

    let reconciler = Reconciler::new(store.clone(), PeerClient::new().unwrap(), 8888);
    let stats = reconciler.tick().await.unwrap();
    assert_eq!(stats.pods_reconciled, 1);
    assert_eq!(stats.launched, 0);
    assert_eq!(stats.failed, 2);
    assert!(store
        .list_containers_with_prefix("heavy-")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn placement_skips_hosts_without_capacity() {
    let store = Store::new(KvStore::open_in_memory());
    let _small = spawn_host(
        &store,
        "127.0.0.1",
        ResourceSnapshot {
            disk: 1 << 30,
            memory: 1 << 30,
            cores: 1,
        },
    )
    .await;
    let big = spawn_host(&store, "127.0.0.2", roomy()).await;

    // Only the later host in KV order fits; first-fit must reach it.
    let peers = PeerClient::new().unwrap();
    let host = first_fit(
        &store,
        &peers,
        &ResourceRequest {
            disk: 1,
            memory: 1,
            cores: 4,
        },
    )
    .await
    .unwrap();
    assert_eq!(host.name, big.host);
}

#[tokio::test]
async fn unreachable_host_keeps_its_records() {
    let store = Store::new(KvStore::open_in_memory());
    let _live = spawn_host(&store, "127.0.0.1", roomy()).await;

    // A host that is registered but not answering.
    store
        .create_host(&HostRecord {
            name: "127.0.0.9".to_string(),
            port: 1,
            disk: 1 << 30,
            memory: 1 << 30,
            cores: 4,
        })
        .await
        .unwrap();
    store.create_pod(&web_pod(1)).await.unwrap();
    store
        .create_container(&ContainerRecord {
            image: "nginx".to_string(),
            name: "web-0".to_string(),
            host: "127.0.0.9".to_string(),
            id: "opaque".to_string(),
            cores: 1,
            memory: 1 << 20,
            disk: 1 << 20,
        })
        .await
        .unwrap();

    let reconciler = Reconciler::new(store.clone(), PeerClient::new().unwrap(), 8888);
    let stats = reconciler.tick().await.unwrap();

    // The record survives a transient probe failure; nothing is launched
    // in its place.
    assert_eq!(stats.stale_removed, 0);
    assert_eq!(stats.launched, 0);
    assert!(store.get_container("web-0").await.is_ok());
}
