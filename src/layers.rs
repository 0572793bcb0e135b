//! Locating the utility VM image among a container's layer folders
//!
//! Layer folders are ordered read-only layers first, uppermost layer at the
//! start and the base OS layer last, optionally followed by the read-write
//! sandbox folder. A layer carries a utility VM image when it has a
//! `UtilityVM` subdirectory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Subdirectory marking a layer that carries a utility VM image.
pub const UTILITY_VM_DIR: &str = "UtilityVM";

/// A layer folder carrying a utility VM image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UvmLayer {
    folder: PathBuf,
    index: usize,
}

impl UvmLayer {
    /// The layer folder itself.
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Position in the layer folder list.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Guest OS file tree shared read-only into the VM.
    pub fn files_path(&self) -> PathBuf {
        self.folder.join(UTILITY_VM_DIR).join("Files")
    }

    /// Template the writable sandbox disk is copied from.
    pub fn template_path(&self) -> PathBuf {
        self.folder.join(UTILITY_VM_DIR).join("SystemTemplate.vhdx")
    }
}

/// Find the uppermost layer folder carrying a utility VM image.
///
/// Folders are checked in the order given and the first match wins. Any error
/// other than "not found" while checking a folder stops the scan.
pub fn locate_uvm_folder<P: AsRef<Path>>(layer_folders: &[P]) -> Result<UvmLayer> {
    for (index, layer_folder) in layer_folders.iter().enumerate() {
        let layer_folder = layer_folder.as_ref();
        match std::fs::metadata(layer_folder.join(UTILITY_VM_DIR)) {
            Ok(_) => {
                tracing::debug!(
                    "utility VM image at index {} of {} possibles ({})",
                    index,
                    layer_folders.len(),
                    layer_folder.display()
                );
                return Ok(UvmLayer {
                    folder: layer_folder.to_path_buf(),
                    index,
                });
            }
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(source) => {
                return Err(Error::LayerScan {
                    path: layer_folder.to_path_buf(),
                    source,
                })
            }
        }
    }
    Err(Error::UvmFolderNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn layers(root: &Path, names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| root.join(n)).collect()
    }

    #[test]
    fn test_finds_marked_layer_in_middle() {
        let dir = tempfile::tempdir().unwrap();
        let folders = layers(dir.path(), &["a", "b", "c"]);
        for f in &folders {
            fs::create_dir_all(f).unwrap();
        }
        fs::create_dir(folders[1].join(UTILITY_VM_DIR)).unwrap();

        let found = locate_uvm_folder(&folders).unwrap();
        assert_eq!(found.folder(), folders[1]);
        assert_eq!(found.index(), 1);
    }

    #[test]
    fn test_uppermost_match_wins() {
        let dir = tempfile::tempdir().unwrap();
        let folders = layers(dir.path(), &["top", "base"]);
        for f in &folders {
            fs::create_dir_all(f.join(UTILITY_VM_DIR)).unwrap();
        }

        assert_eq!(locate_uvm_folder(&folders).unwrap().folder(), folders[0]);
    }

    #[test]
    fn test_missing_folders_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let folders = layers(dir.path(), &["missing", "base"]);
        fs::create_dir_all(folders[1].join(UTILITY_VM_DIR)).unwrap();

        assert_eq!(locate_uvm_folder(&folders).unwrap().index(), 1);
    }

    #[test]
    fn test_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let folders = layers(dir.path(), &["a", "b"]);
        for f in &folders {
            fs::create_dir_all(f).unwrap();
        }

        assert!(locate_uvm_folder(&folders).unwrap_err().is_not_found());
        assert!(locate_uvm_folder::<PathBuf>(&[]).unwrap_err().is_not_found());
    }

    #[cfg(unix)]
    #[test]
    fn test_stat_error_aborts_scan() {
        let dir = tempfile::tempdir().unwrap();
        let folders = layers(dir.path(), &["a", "b"]);
        // A plain file where a folder is expected fails with ENOTDIR.
        fs::write(&folders[0], b"not a folder").unwrap();
        fs::create_dir_all(folders[1].join(UTILITY_VM_DIR)).unwrap();

        match locate_uvm_folder(&folders) {
            Err(Error::LayerScan { path, .. }) => assert_eq!(path, folders[0]),
            other => panic!("expected LayerScan, got {:?}", other),
        }
    }

    #[test]
    fn test_image_paths() {
        let layer = UvmLayer { folder: PathBuf::from("base"), index: 0 };
        assert_eq!(
            layer.files_path(),
            Path::new("base").join("UtilityVM").join("Files")
        );
        assert_eq!(
            layer.template_path(),
            Path::new("base").join("UtilityVM").join("SystemTemplate.vhdx")
        );
    }
}
