//! HCS compute system creation

use windows::{
    core::{HSTRING, PCWSTR},
    Win32::System::HostComputeSystem::*,
};
use crate::hcs::schema::SchemaVersion;
use crate::uvm::ComputeService;
use crate::{Error, Result};
use super::operation::Operation;

/// Wrapper around HCS_SYSTEM handle
pub struct ComputeSystem {
    handle: HCS_SYSTEM,
    id: String,
}

impl ComputeSystem {
    /// Create a compute system from a JSON document and wait for HCS to finish.
    ///
    /// The handle is closed again if the create operation fails.
    pub fn create(id: &str, document: &str) -> Result<Self> {
        let id_hstring = HSTRING::from(id);
        let document_hstring = HSTRING::from(document);
        let operation = Operation::new();

        let handle = unsafe {
            HcsCreateComputeSystem(
                PCWSTR(id_hstring.as_ptr()),
                PCWSTR(document_hstring.as_ptr()),
                operation.handle(),
                None,
            )?
        };
        let system = Self {
            handle,
            id: id.to_string(),
        };

        let result = operation.wait("HcsCreateComputeSystem")?;
        if !result.is_empty() {
            tracing::debug!("create result for {}: {}", id, result);
        }
        Ok(system)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the raw handle (for advanced operations)
    pub fn handle(&self) -> HCS_SYSTEM {
        self.handle
    }
}

impl Drop for ComputeSystem {
    fn drop(&mut self) {
        unsafe {
            HcsCloseComputeSystem(self.handle);
        }
    }
}

/// [`ComputeService`] talking to the Host Compute Service
#[derive(Debug, Default, Clone, Copy)]
pub struct HcsService;

impl ComputeService for HcsService {
    type System = ComputeSystem;

    fn create_compute_system(
        &self,
        id: &str,
        document: &str,
        schema: SchemaVersion,
    ) -> Result<ComputeSystem> {
        if !schema.is_v2() {
            return Err(Error::Unsupported(format!(
                "schema version {} cannot describe a utility VM",
                schema
            )));
        }
        ComputeSystem::create(id, document)
    }
}
