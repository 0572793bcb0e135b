//! HCS Operation wrapper for synchronous calls

use std::ffi::c_void;
use windows::{
    core::PWSTR,
    Win32::System::HostComputeSystem::*,
};
use crate::{Error, Result};

/// Wrapper around HCS_OPERATION created without a callback
pub struct Operation {
    handle: HCS_OPERATION,
}

impl Operation {
    pub fn new() -> Self {
        unsafe {
            let handle = HcsCreateOperation(None, None);
            Self { handle }
        }
    }

    pub fn handle(&self) -> HCS_OPERATION {
        self.handle
    }

    /// Block until the operation completes.
    ///
    /// On failure the HCS result document, which carries the error details,
    /// is folded into the returned error.
    pub fn wait(&self, context: &str) -> Result<String> {
        let mut result_doc: PWSTR = PWSTR::null();
        let outcome = unsafe {
            HcsWaitForOperationResult(self.handle, u32::MAX, Some(&mut result_doc))
        };
        let document = take_pwstr(&mut result_doc);

        match outcome {
            Ok(()) => Ok(document),
            Err(e) => {
                let err = Error::from_hresult(e.code().0, context);
                if document.is_empty() || err.is_privilege_error() {
                    Err(err)
                } else {
                    Err(Error::Hcs(format!("{}: {}", err, document)))
                }
            }
        }
    }
}

impl Default for Operation {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Operation {
    fn drop(&mut self) {
        unsafe {
            HcsCloseOperation(self.handle);
        }
    }
}

/// Copy out and free a string allocated by HCS.
fn take_pwstr(p: &mut PWSTR) -> String {
    if p.is_null() {
        return String::new();
    }
    unsafe {
        let s = p.to_string().unwrap_or_default();
        windows::Win32::System::Com::CoTaskMemFree(Some(p.as_ptr() as *const c_void));
        *p = PWSTR::null();
        s
    }
}
