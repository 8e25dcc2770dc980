//! berth-runtime — local container operations and the host probe.
//!
//! Wraps the node's container runtime behind the [`ContainerRuntime`]
//! trait: pull, create, start, stop, remove, and list. Production uses
//! the Docker daemon via [`DockerRuntime`]; tests use the in-memory
//! [`FakeRuntime`].
//!
//! The [`probe`] module samples the node's free disk, available memory,
//! and core count, which `/host_info` serves and placement consumes.

pub mod docker;
pub mod driver;
pub mod error;
pub mod fake;
pub mod probe;

pub use docker::DockerRuntime;
pub use driver::ContainerRuntime;
pub use error::{RuntimeError, RuntimeResult};
pub use fake::FakeRuntime;
pub use probe::{local_host_name, Probe, ResourceSnapshot, StaticProbe, SysProbe};
