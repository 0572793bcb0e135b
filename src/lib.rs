//! HCS Utility VM
//!
//! Builds the Host Compute Service configuration for a Windows utility VM that
//! hosts a single container, straight from the container's OCI spec.
//!
//! # Pipeline
//!
//! - **Validate** - a hosting spec may only carry layer folders and a memory /
//!   CPU count. Hostname, mounts, networking and friends are rejected.
//! - **Locate** - the uppermost layer folder with a `UtilityVM` directory
//!   provides the guest OS image.
//! - **Size** - memory and processor count come from the spec's resources,
//!   with defaults derived from the host.
//! - **Create** - a writable `sandbox.vhdx` is copied into the last layer
//!   folder and the v2 compute system document is submitted to HCS.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(windows)]
//! # fn main() -> hcs_uvm::Result<()> {
//! use hcs_uvm::{HcsService, LocalStorage, Spec, UtilityVmBuilder, UvmConfig};
//!
//! let spec = Spec::load(r"C:\bundles\uvm\config.json")?;
//! let config = UvmConfig::builder().owner("my-runtime").build_validated()?;
//!
//! let uvm = UtilityVmBuilder::new(&HcsService, &LocalStorage).create(&spec, &config)?;
//! println!("created {} with disk {:?}", uvm.id(), uvm.sandbox_disk());
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```

pub mod config;
pub mod error;
pub mod hcs;
pub mod layers;
pub mod resources;
pub mod spec;
pub mod storage;
pub mod uvm;
pub mod validate;

pub use config::UvmConfig;
pub use error::{Error, Result};
#[cfg(windows)]
pub use hcs::HcsService;
pub use layers::{locate_uvm_folder, UvmLayer};
pub use resources::{hosted_container_resources, uvm_launch_resources, ResourceDescriptor};
pub use spec::Spec;
pub use storage::{HostStorage, LocalStorage};
pub use uvm::{plan_uvm, ComputeService, GuestOs, UtilityVm, UtilityVmBuilder, UvmPlan};
pub use validate::validate_hosting_spec;
