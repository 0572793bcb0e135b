//! Windows utility VM creation from a hosting container spec
//!
//! [`UtilityVmBuilder`] turns a validated spec into an HCS v2 compute system
//! document: it locates the layer carrying the utility VM image, prepares the
//! writable sandbox disk in the last layer folder and submits the document
//! through a [`ComputeService`].

use std::collections::BTreeMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::UvmConfig;
use crate::hcs::schema::{
    Attachment, Chipset, ComputeSystem, ComputeTopology, Devices, GuestInterface, Memory,
    Processor, Scsi, Uefi, UefiBootEntry, VirtualMachine, VirtualSmbShare, VsmbFlags,
};
use crate::hcs::SchemaVersion;
use crate::layers::{locate_uvm_folder, UvmLayer};
use crate::resources::{host_logical_processors, uvm_launch_resources, LaunchResources};
use crate::spec::Spec;
use crate::storage::{create_uvm_sandbox, HostStorage, SANDBOX_VHDX};
use crate::validate::validate_hosting_spec;
use crate::{Error, Result};

/// Boot manager loaded from the VMBFS device.
pub const BOOT_MANAGER_PATH: &str = r"\EFI\Microsoft\Boot\bootmgfw.efi";

/// Name of the read-only share carrying the guest OS files.
pub const OS_SHARE_NAME: &str = "os";

const DIRECT_FILE_MAPPING_MB: u64 = 1024;

/// Creates compute systems from serialized documents.
#[cfg_attr(test, mockall::automock(type System = String;))]
pub trait ComputeService {
    /// Handle to a created compute system.
    type System;

    fn create_compute_system(
        &self,
        id: &str,
        document: &str,
        schema: SchemaVersion,
    ) -> Result<Self::System>;
}

/// Operating system running in the guest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum GuestOs {
    Windows,
}

impl fmt::Display for GuestOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuestOs::Windows => write!(f, "windows"),
        }
    }
}

/// Everything needed to create a utility VM, before any side effect.
#[derive(Debug, Clone)]
pub struct UvmPlan {
    pub id: String,
    pub schema_version: SchemaVersion,
    pub layer: UvmLayer,
    pub sandbox_folder: PathBuf,
    pub sandbox_disk: PathBuf,
    pub resources: LaunchResources,
    pub document: ComputeSystem,
}

/// A created utility VM
pub struct UtilityVm<S> {
    id: String,
    system: S,
    operating_system: GuestOs,
    /// Host paths keyed by (controller, lun)
    scsi_locations: BTreeMap<(u32, u32), PathBuf>,
}

impl<S> UtilityVm<S> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn system(&self) -> &S {
        &self.system
    }

    pub fn into_system(self) -> S {
        self.system
    }

    pub fn operating_system(&self) -> GuestOs {
        self.operating_system
    }

    /// Host path of the disk attached at `controller`/`lun`.
    pub fn scsi_host_path(&self, controller: u32, lun: u32) -> Option<&Path> {
        self.scsi_locations
            .get(&(controller, lun))
            .map(PathBuf::as_path)
    }

    /// The writable sandbox disk.
    pub fn sandbox_disk(&self) -> Option<&Path> {
        self.scsi_host_path(0, 0)
    }
}

impl<S> fmt::Debug for UtilityVm<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UtilityVm")
            .field("id", &self.id)
            .field("operating_system", &self.operating_system)
            .field("scsi_locations", &self.scsi_locations)
            .finish()
    }
}

/// Assemble the compute system document for a Windows utility VM.
pub fn build_uvm_document(
    config: &UvmConfig,
    layer: &UvmLayer,
    sandbox_disk: &Path,
    resources: LaunchResources,
) -> ComputeSystem {
    let mut attachments = BTreeMap::new();
    attachments.insert(
        "0".to_string(),
        Attachment::virtual_disk(sandbox_disk.to_string_lossy()),
    );
    let mut scsi = BTreeMap::new();
    scsi.insert("0".to_string(), Scsi { attachments });

    ComputeSystem {
        owner: config.owner.clone(),
        schema_version: config.schema_version,
        virtual_machine: Some(VirtualMachine {
            chipset: Chipset {
                uefi: Some(Uefi {
                    boot_this: UefiBootEntry {
                        device_path: BOOT_MANAGER_PATH.to_string(),
                        disk_number: 0,
                        uefi_device: "VMBFS".to_string(),
                    },
                }),
            },
            compute_topology: ComputeTopology {
                memory: Memory {
                    backing: "Virtual".to_string(),
                    startup: resources.memory_mb,
                    direct_file_mapping_mb: DIRECT_FILE_MAPPING_MB,
                },
                processor: Processor {
                    count: resources.processor_count,
                },
            },
            devices: Devices {
                scsi,
                virtual_smb_shares: vec![VirtualSmbShare {
                    name: OS_SHARE_NAME.to_string(),
                    path: layer.files_path().to_string_lossy().into_owned(),
                    flags: VsmbFlags::os_share(),
                }],
                guest_interface: Some(GuestInterface {
                    connect_to_bridge: true,
                }),
            },
        }),
    }
}

/// Validate `spec` and work out the utility VM without touching the host.
pub fn plan_uvm(spec: &Spec, config: &UvmConfig, logical_processors: usize) -> Result<UvmPlan> {
    config.validate()?;
    validate_hosting_spec(spec)?;

    let layer = locate_uvm_folder(spec.layer_folders())?;

    // Validation guarantees at least two layer folders.
    let sandbox_folder = spec
        .layer_folders()
        .last()
        .cloned()
        .ok_or_else(|| Error::InvalidSpec("Windows.LayerFolders is empty".into()))?;
    let sandbox_disk = sandbox_folder.join(SANDBOX_VHDX);

    let resources = uvm_launch_resources(spec, logical_processors);
    let document = build_uvm_document(config, &layer, &sandbox_disk, resources);

    Ok(UvmPlan {
        id: config.id.clone(),
        schema_version: config.schema_version,
        layer,
        sandbox_folder,
        sandbox_disk,
        resources,
        document,
    })
}

/// Builds Windows utility VMs that host a single container.
pub struct UtilityVmBuilder<'a, C> {
    compute: &'a C,
    storage: &'a dyn HostStorage,
    logical_processors: usize,
}

impl<'a, C: ComputeService> UtilityVmBuilder<'a, C> {
    pub fn new(compute: &'a C, storage: &'a dyn HostStorage) -> Self {
        Self {
            compute,
            storage,
            logical_processors: host_logical_processors(),
        }
    }

    /// Override the host processor count used for the default topology.
    pub fn logical_processors(mut self, count: usize) -> Self {
        self.logical_processors = count;
        self
    }

    /// Validate `spec` and work out the utility VM without touching the host.
    pub fn plan(&self, spec: &Spec, config: &UvmConfig) -> Result<UvmPlan> {
        plan_uvm(spec, config, self.logical_processors)
    }

    /// Create the utility VM described by `spec`.
    ///
    /// The sandbox folder and disk are left behind if a later step fails.
    pub fn create(&self, spec: &Spec, config: &UvmConfig) -> Result<UtilityVm<C::System>> {
        tracing::debug!("creating utility VM id={}", config.id);
        let plan = self.plan(spec, config)?;

        tracing::debug!("sandbox folder: {}", plan.sandbox_folder.display());
        ensure_folder(&plan.sandbox_folder)?;

        let sandbox_disk =
            create_uvm_sandbox(self.storage, &plan.layer, &plan.sandbox_folder, &plan.id)?;

        self.submit(plan, sandbox_disk)
    }

    fn submit(&self, plan: UvmPlan, sandbox_disk: PathBuf) -> Result<UtilityVm<C::System>> {
        let document = serde_json::to_string(&plan.document)?;
        let system = self
            .compute
            .create_compute_system(&plan.id, &document, plan.schema_version)
            .inspect_err(|e| tracing::debug!("failed to create utility VM {}: {}", plan.id, e))?;

        tracing::info!(
            "created utility VM {} ({} MB, {} processors)",
            plan.id,
            plan.resources.memory_mb,
            plan.resources.processor_count
        );

        let mut scsi_locations = BTreeMap::new();
        scsi_locations.insert((0, 0), sandbox_disk);

        Ok(UtilityVm {
            id: plan.id,
            system,
            operating_system: GuestOs::Windows,
            scsi_locations,
        })
    }
}

/// Create `folder` if it does not exist yet.
fn ensure_folder(folder: &Path) -> Result<()> {
    match std::fs::metadata(folder) {
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!("creating folder: {}", folder.display());
            std::fs::create_dir_all(folder).map_err(|source| Error::SandboxFolder {
                path: folder.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}
