//! Host Compute Service document schema and, on Windows, API wrappers

pub mod schema;

#[cfg(windows)]
pub mod access;
#[cfg(windows)]
pub mod compute;
#[cfg(windows)]
pub mod operation;

#[cfg(windows)]
pub use access::grant_vm_access;
#[cfg(windows)]
pub use compute::{ComputeSystem, HcsService};
pub use schema::SchemaVersion;
