//! Hosting-system checks on a container spec
//!
//! A utility VM built straight from a container spec only understands layer
//! folders and a memory/processor size. Every other option must be refused
//! rather than dropped on the floor.

use crate::spec::Spec;
use crate::{Error, Result};

/// Check that `spec` can describe a hosting system.
///
/// The first violated rule is reported.
pub fn validate_hosting_spec(spec: &Spec) -> Result<()> {
    if spec.layer_folders().len() < 2 {
        return reject("Windows.LayerFolders must have length of at least 2 for a hosting system");
    }
    if spec.hostname.as_deref().is_some_and(|h| !h.is_empty()) {
        return reject("Hostname cannot be set for a hosting system");
    }
    if let Some(cpu) = spec.cpu() {
        if cpu.shares.is_some() {
            return reject("Windows.Resources.CPU.Shares must not be set for a hosting system");
        }
        if cpu.maximum.is_some() {
            return reject("Windows.Resources.CPU.Maximum must not be set for a hosting system");
        }
    }
    if spec.root.is_some() {
        return reject("Root must not be set for a hosting system");
    }
    if spec.windows_resources().is_some_and(|r| r.storage.is_some()) {
        return reject("Windows.Resources.Storage must not be set for a hosting system");
    }

    // Windows section is guaranteed by the layer folder check above.
    if let Some(windows) = &spec.windows {
        if windows.credential_spec.is_some() {
            return reject("Windows.CredentialSpec must not be set for a hosting system");
        }
        // TODO: allow endpoints once network adapters are attached to the utility VM
        if windows.network.is_some() {
            return reject("Windows.Network must not be set for a hosting system");
        }
    }
    if !spec.mounts.is_empty() {
        return reject("Mounts must not be set for a hosting system");
    }

    Ok(())
}

fn reject(reason: &str) -> Result<()> {
    tracing::debug!("rejecting hosting spec: {}", reason);
    Err(Error::InvalidSpec(reason.to_string()))
}
