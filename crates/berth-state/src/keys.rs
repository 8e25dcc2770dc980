//! KV key layout for the berth metadata store.
//!
//! Keys are UTF-8 paths; values are JSON documents. Directory listings
//! return the entries directly under a directory prefix.

/// File records keyed by `{filename}`.
pub const STORAGE_DIR: &str = "/rws/storage";

/// Host snapshots keyed by `{name}:{port}`.
pub const HOSTS_DIR: &str = "/rws/hosts";

/// Container records keyed by `{name}` (cluster-unique).
pub const CONTAINERS_DIR: &str = "/rws/containers";

/// Pod specs keyed by `{name}`.
pub const PODS_DIR: &str = "/rws/pods";

/// Scheduler leader lease (TTL key holding the lease holder's host name).
pub const SCHEDULER_LEADER_KEY: &str = "/rws/scheduler/leader";

/// Build the KV key for a File record.
pub fn file_key(name: &str) -> String {
    format!("{STORAGE_DIR}/{name}")
}

/// Build the KV key for a Host record.
pub fn host_key(name: &str, port: u16) -> String {
    format!("{HOSTS_DIR}/{name}:{port}")
}

/// Build the KV key for a Container record.
pub fn container_key(name: &str) -> String {
    format!("{CONTAINERS_DIR}/{name}")
}

/// Build the KV key for a Pod record.
pub fn pod_key(name: &str) -> String {
    format!("{PODS_DIR}/{name}")
}
