//! OCI runtime spec subset consumed when hosting a container in a utility VM
//!
//! Only the fields that decide whether a spec can drive a hosting system, and
//! how large that system should be, are modelled. Everything else in a
//! `config.json` is ignored on load.
//! Reference: <https://github.com/opencontainers/runtime-spec/blob/main/config-windows.md>

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::Result;

/// OCI runtime configuration (config.json).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spec {
    #[serde(default)]
    pub oci_version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    /// Root filesystem override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<Root>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<Mount>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub windows: Option<Windows>,

    /// Present when the workload targets Linux. The content is never inspected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linux: Option<serde_json::Value>,
}

impl Spec {
    /// Load a spec from a config.json file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Layer folders, read-only layers uppermost first, then the sandbox folder.
    pub fn layer_folders(&self) -> &[PathBuf] {
        self.windows
            .as_ref()
            .map(|w| w.layer_folders.as_slice())
            .unwrap_or(&[])
    }

    pub fn windows_resources(&self) -> Option<&WindowsResources> {
        self.windows.as_ref().and_then(|w| w.resources.as_ref())
    }

    pub fn cpu(&self) -> Option<&WindowsCpuResources> {
        self.windows_resources().and_then(|r| r.cpu.as_ref())
    }

    /// Memory limit in bytes, if one was given.
    pub fn memory_limit(&self) -> Option<u64> {
        self.windows_resources()
            .and_then(|r| r.memory.as_ref())
            .and_then(|m| m.limit)
    }

    pub fn cpu_count(&self) -> Option<u64> {
        self.cpu().and_then(|c| c.count)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Root {
    pub path: String,
    #[serde(default)]
    pub readonly: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mount {
    pub destination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// Windows-specific section of the spec.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Windows {
    #[serde(default)]
    pub layer_folders: Vec<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<WindowsResources>,

    /// Opaque to this crate; only its presence matters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_spec: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<WindowsNetwork>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowsResources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<WindowsMemoryResources>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<WindowsCpuResources>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<WindowsStorageResources>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowsMemoryResources {
    /// Limit in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowsCpuResources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowsStorageResources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iops: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bps: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox_size: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowsNetwork {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoint_list: Vec<String>,
    #[serde(default)]
    pub allow_unqualified_dns_query: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_search_list: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_shared_container_name: Option<String>,
}
