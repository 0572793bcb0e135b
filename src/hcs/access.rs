//! File access grants for compute systems

use std::path::Path;
use windows::{
    core::{HSTRING, PCWSTR},
    Win32::System::HostComputeSystem::HcsGrantVmAccess,
};
use crate::Result;

/// Grant the VM group SID of `vm_id` access to `path`.
pub fn grant_vm_access(vm_id: &str, path: &Path) -> Result<()> {
    let id = HSTRING::from(vm_id);
    let file = HSTRING::from(path);
    unsafe {
        HcsGrantVmAccess(PCWSTR(id.as_ptr()), PCWSTR(file.as_ptr()))?;
    }
    tracing::debug!("granted {} access to {}", vm_id, path.display());
    Ok(())
}
