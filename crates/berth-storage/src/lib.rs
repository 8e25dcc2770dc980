//! berth-storage — cluster file storage with spill-over.
//!
//! Files are uploaded to whichever node receives the request. The node
//! keeps the bytes locally when its free disk allows and records the file
//! in KV; otherwise it spills over to the first registered peer whose
//! live-probed disk can hold them. Download and remove route to the
//! owning host and proxy when it is not the local one.
//!
//! The File record in KV is the source of truth: a name exists in the
//! cluster exactly when its record exists, and the atomic record create
//! is what arbitrates concurrent uploads of the same name.

pub mod error;
pub mod service;

pub use error::{StorageError, StorageResult};
pub use service::StorageService;
