//! Error types for utility VM creation

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The container spec cannot be used for a hosting system.
    #[error("invalid OCI spec: {0}")]
    InvalidSpec(String),

    #[error("utility VM folder could not be found in layers")]
    UvmFolderNotFound,

    #[error("failed to inspect layer folder {path}: {source}")]
    LayerScan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("failed to create utility VM sandbox folder {path}: {source}")]
    SandboxFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create UVM sandbox {path}: {source}")]
    SandboxDisk {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("HCS operation failed: {0}")]
    Hcs(String),

    #[cfg(windows)]
    #[error("Windows API error: {0}")]
    Windows(#[from] windows::core::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Insufficient privileges - run as Administrator or add to Hyper-V Administrators")]
    InsufficientPrivileges,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if the spec was rejected before any side effect happened
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::InvalidSpec(_))
    }

    /// Check if no layer carried a utility VM image
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::UvmFolderNotFound)
    }

    pub fn is_privilege_error(&self) -> bool {
        matches!(self, Error::InsufficientPrivileges)
    }

    /// Create from Windows HRESULT if it's a privilege error
    pub fn from_hresult(hr: i32, context: &str) -> Self {
        // 0x8037011B = HCS_E_ACCESS_DENIED
        if hr == 0x8037011Bu32 as i32 {
            Error::InsufficientPrivileges
        } else {
            Error::Hcs(format!("{}: HRESULT 0x{:08X}", context, hr))
        }
    }
}
