//! Host resource probe.
//!
//! `/host_info` serves a fresh snapshot on every call and placement
//! decisions read it live, so sampling happens at call time rather than
//! being cached.

use std::path::{Path, PathBuf};

use sysinfo::{Disks, System};

/// Free resources on this host, sampled at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceSnapshot {
    /// Free disk bytes on the volume backing the data directory.
    pub disk: u64,
    /// Available memory bytes.
    pub memory: u64,
    /// CPU core count.
    pub cores: u64,
}

/// Source of host resource snapshots.
pub trait Probe: Send + Sync {
    fn snapshot(&self) -> ResourceSnapshot;
}

/// OS-backed probe using `sysinfo`.
pub struct SysProbe {
    data_dir: PathBuf,
}

impl SysProbe {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

impl Probe for SysProbe {
    fn snapshot(&self) -> ResourceSnapshot {
        let mut system = System::new();
        system.refresh_memory();
        system.refresh_cpu_all();

        ResourceSnapshot {
            disk: free_disk_for(&self.data_dir),
            memory: system.available_memory(),
            cores: system.cpus().len() as u64,
        }
    }
}

/// This machine's host name, as the OS reports it.
pub fn local_host_name() -> Option<String> {
    System::host_name()
}

/// Free space on the disk whose mount point contains `path`, falling back
/// to the largest free space of any disk.
fn free_disk_for(path: &Path) -> u64 {
    let disks = Disks::new_with_refreshed_list();
    let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    disks
        .iter()
        .filter(|d| resolved.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())
        .map(|d| d.available_space())
        .or_else(|| disks.iter().map(|d| d.available_space()).max())
        .unwrap_or(0)
}

/// Fixed-value probe for tests.
pub struct StaticProbe {
    snapshot: std::sync::Mutex<ResourceSnapshot>,
}

impl StaticProbe {
    pub fn new(snapshot: ResourceSnapshot) -> Self {
        Self {
            snapshot: std::sync::Mutex::new(snapshot),
        }
    }

    /// Replace the reported snapshot.
    pub fn set(&self, snapshot: ResourceSnapshot) {
        *self.snapshot.lock().unwrap_or_else(|e| e.into_inner()) = snapshot;
    }
}

impl Probe for StaticProbe {
    fn snapshot(&self) -> ResourceSnapshot {
        *self.snapshot.lock().unwrap_or_else(|e| e.into_inner())
    }
}
