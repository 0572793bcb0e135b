//! Writable sandbox disk for a utility VM

use std::path::{Path, PathBuf};

use crate::layers::UvmLayer;
use crate::{Error, Result};

/// File name of the sandbox disk inside the sandbox folder.
pub const SANDBOX_VHDX: &str = "sandbox.vhdx";

/// Host file primitives used to materialize a sandbox disk.
#[cfg_attr(test, mockall::automock)]
pub trait HostStorage {
    /// Copy `source` to `target`, replacing `target` if it exists.
    fn copy_file(&self, source: &Path, target: &Path) -> Result<()>;

    /// Allow the compute system `vm_id` to open `path`.
    fn grant_vm_access(&self, vm_id: &str, path: &Path) -> Result<()>;
}

/// [`HostStorage`] backed by the local filesystem and the HCS storage API.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorage;

impl HostStorage for LocalStorage {
    fn copy_file(&self, source: &Path, target: &Path) -> Result<()> {
        std::fs::copy(source, target)?;
        Ok(())
    }

    #[cfg(windows)]
    fn grant_vm_access(&self, vm_id: &str, path: &Path) -> Result<()> {
        crate::hcs::grant_vm_access(vm_id, path)
    }

    #[cfg(not(windows))]
    fn grant_vm_access(&self, _vm_id: &str, _path: &Path) -> Result<()> {
        Err(Error::Unsupported(
            "granting VM access to a file requires Windows".into(),
        ))
    }
}

/// Copy the layer's system template into `dest_dir` as the sandbox disk and
/// grant `vm_id` access to it.
///
/// A failed grant leaves the copied disk in place.
pub fn create_uvm_sandbox(
    storage: &dyn HostStorage,
    layer: &UvmLayer,
    dest_dir: &Path,
    vm_id: &str,
) -> Result<PathBuf> {
    let source = layer.template_path();
    let target = dest_dir.join(SANDBOX_VHDX);
    let wrap = |e: Error| Error::SandboxDisk {
        path: target.clone(),
        source: Box::new(e),
    };

    tracing::debug!("copying {} to {}", source.display(), target.display());
    storage.copy_file(&source, &target).map_err(wrap)?;
    storage.grant_vm_access(vm_id, &target).map_err(wrap)?;

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{locate_uvm_folder, UTILITY_VM_DIR};

    fn uvm_layer(root: &Path) -> UvmLayer {
        let base = root.join("base");
        std::fs::create_dir_all(base.join(UTILITY_VM_DIR)).unwrap();
        locate_uvm_folder(&[base]).unwrap()
    }

    #[test]
    fn test_copies_template_then_grants() {
        let dir = tempfile::tempdir().unwrap();
        let layer = uvm_layer(dir.path());
        let dest = dir.path().join("sandbox");
        let expected_target = dest.join(SANDBOX_VHDX);

        let mut storage = MockHostStorage::new();
        let mut seq = mockall::Sequence::new();
        let template = layer.template_path();
        let target = expected_target.clone();
        storage
            .expect_copy_file()
            .withf(move |s, t| s == template && t == target)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        let target = expected_target.clone();
        storage
            .expect_grant_vm_access()
            .withf(move |id, p| id == "uvm-1" && p == target)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let disk = create_uvm_sandbox(&storage, &layer, &dest, "uvm-1").unwrap();
        assert_eq!(disk, expected_target);
    }

    #[test]
    fn test_copy_failure_skips_grant() {
        let dir = tempfile::tempdir().unwrap();
        let layer = uvm_layer(dir.path());

        let mut storage = MockHostStorage::new();
        storage
            .expect_copy_file()
            .returning(|_, _| Err(Error::Io(std::io::ErrorKind::NotFound.into())));
        storage.expect_grant_vm_access().never();

        let err = create_uvm_sandbox(&storage, &layer, dir.path(), "uvm-1").unwrap_err();
        match err {
            Error::SandboxDisk { source, .. } => assert!(matches!(*source, Error::Io(_))),
            other => panic!("expected SandboxDisk, got {:?}", other),
        }
    }

    #[test]
    fn test_grant_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let layer = uvm_layer(dir.path());

        let mut storage = MockHostStorage::new();
        storage.expect_copy_file().returning(|_, _| Ok(()));
        storage
            .expect_grant_vm_access()
            .withf(|id, _| id == "uvm-2")
            .returning(|_, _| Err(Error::InsufficientPrivileges));

        match create_uvm_sandbox(&storage, &layer, dir.path(), "uvm-2") {
            Err(Error::SandboxDisk { path, source }) => {
                assert_eq!(path, dir.path().join(SANDBOX_VHDX));
                assert!(source.is_privilege_error());
                assert!(matches!(*source, Error::InsufficientPrivileges));
            }
            other => panic!("expected SandboxDisk, got {:?}", other),
        }
    }

    #[test]
    fn test_local_storage_copy_replaces_target() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("template.vhdx");
        let target = dir.path().join(SANDBOX_VHDX);
        std::fs::write(&source, b"template").unwrap();
        std::fs::write(&target, b"stale").unwrap();

        LocalStorage.copy_file(&source, &target).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"template");
    }

    #[cfg(not(windows))]
    #[test]
    fn test_local_storage_grant_unsupported() {
        let err = LocalStorage
            .grant_vm_access("uvm", Path::new("sandbox.vhdx"))
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }
}
