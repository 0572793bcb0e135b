//! Utility VM sizing from OCI resource limits
//!
//! Two independent strategies live here and share nothing but the default
//! processor rule:
//!
//! - [`hosted_container_resources`] sizes a utility VM that will later receive
//!   a separately created container. It adds headroom and rounds memory up to
//!   the allocation granularity.
//! - [`uvm_launch_resources`] sizes the utility VM built directly from a
//!   hosting spec. Memory is converted as-is, without headroom or rounding.
//!
//! Both take the host's logical processor count as a parameter so callers
//! decide where it comes from (see [`host_logical_processors`]).

use serde::{Deserialize, Serialize};

use crate::spec::{Spec, WindowsCpuResources, WindowsMemoryResources, WindowsResources};
use crate::{Error, Result};

const MB: u64 = 1024 * 1024;

/// Memory reserved on top of the container's limit when planning capacity.
pub const MEMORY_HEADROOM_MB: u64 = 256;

/// Capacity-planning memory is always a multiple of this.
pub const MEMORY_GRANULARITY_MB: u64 = 512;

/// Startup memory for a hosting utility VM with no explicit limit.
pub const DEFAULT_UVM_MEMORY_MB: u64 = 1024;

pub const DEFAULT_PROCESSOR_COUNT: u64 = 2;

/// Number of logical processors on this host.
pub fn host_logical_processors() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Two processors, unless the host only has one.
fn default_processor_count(logical_processors: usize) -> u64 {
    if logical_processors <= 1 {
        1
    } else {
        DEFAULT_PROCESSOR_COUNT
    }
}

/// An explicit, non-zero processor count from the spec.
fn requested_processors(spec: &Spec) -> Option<u64> {
    spec.cpu_count().filter(|&count| count > 0)
}

/// Capacity to reserve for a utility VM hosting one container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Always a multiple of [`MEMORY_GRANULARITY_MB`].
    pub memory_limit_bytes: u64,
    /// Always at least 1.
    pub processor_count: u64,
}

impl ResourceDescriptor {
    pub fn memory_mb(&self) -> u64 {
        self.memory_limit_bytes / MB
    }

    /// Express the reservation as an OCI Windows resources block.
    pub fn to_windows_resources(&self) -> WindowsResources {
        WindowsResources {
            memory: Some(WindowsMemoryResources {
                limit: Some(self.memory_limit_bytes),
            }),
            cpu: Some(WindowsCpuResources {
                count: Some(self.processor_count),
                ..Default::default()
            }),
            storage: None,
        }
    }
}

/// Size a utility VM that will host the container described by `spec`.
///
/// Memory is the container limit plus [`MEMORY_HEADROOM_MB`], rounded up to
/// [`MEMORY_GRANULARITY_MB`]. An explicit CPU count takes precedence over the
/// single-processor default.
pub fn hosted_container_resources(
    spec: Option<&Spec>,
    logical_processors: usize,
) -> Result<ResourceDescriptor> {
    let spec = spec.ok_or_else(|| Error::InvalidSpec("no spec supplied".into()))?;
    if spec.linux.is_some() {
        return Err(Error::Unsupported(
            "utility VM sizing is not supported for Linux containers".into(),
        ));
    }
    if spec.windows.is_none() {
        return Err(Error::InvalidSpec(
            "Windows must be set to size a utility VM".into(),
        ));
    }

    let processor_count =
        requested_processors(spec).unwrap_or_else(|| default_processor_count(logical_processors));

    let container_mb = spec.memory_limit().map(|bytes| bytes / MB).unwrap_or(0);
    let memory_mb = (container_mb + MEMORY_HEADROOM_MB).div_ceil(MEMORY_GRANULARITY_MB)
        * MEMORY_GRANULARITY_MB;

    tracing::debug!(
        "uvm resources: memory {} MB, processors {}",
        memory_mb,
        processor_count
    );

    Ok(ResourceDescriptor {
        memory_limit_bytes: memory_mb.saturating_mul(MB),
        processor_count,
    })
}

/// Startup memory and processor topology of a hosting utility VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchResources {
    pub memory_mb: u64,
    pub processor_count: u64,
}

/// Size the utility VM described by a hosting spec.
///
/// The memory limit is converted bytes to MB by integer division. A limit
/// below 1 MB counts as unset.
pub fn uvm_launch_resources(spec: &Spec, logical_processors: usize) -> LaunchResources {
    let memory_mb = spec
        .memory_limit()
        .map(|bytes| bytes / MB)
        .filter(|&mb| mb > 0)
        .unwrap_or(DEFAULT_UVM_MEMORY_MB);
    let processor_count =
        requested_processors(spec).unwrap_or_else(|| default_processor_count(logical_processors));

    LaunchResources {
        memory_mb,
        processor_count,
    }
}
