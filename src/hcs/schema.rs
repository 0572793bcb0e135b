//! HCS v2 compute system document for a Windows utility VM
//! Based on: https://learn.microsoft.com/en-us/virtualization/api/hcs/schemareference

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::BitOr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SchemaVersion {
    pub major: u32,
    pub minor: u32,
}

impl SchemaVersion {
    pub const V2_0: SchemaVersion = SchemaVersion { major: 2, minor: 0 };
    pub const V2_1: SchemaVersion = SchemaVersion { major: 2, minor: 1 };

    pub fn is_v2(&self) -> bool {
        self.major == 2
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::V2_0
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Root document handed to HcsCreateComputeSystem
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ComputeSystem {
    pub owner: String,
    pub schema_version: SchemaVersion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_machine: Option<VirtualMachine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VirtualMachine {
    pub chipset: Chipset,
    pub compute_topology: ComputeTopology,
    pub devices: Devices,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Chipset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uefi: Option<Uefi>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Uefi {
    pub boot_this: UefiBootEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UefiBootEntry {
    pub device_path: String,
    pub disk_number: u32,
    pub uefi_device: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ComputeTopology {
    pub memory: Memory,
    pub processor: Processor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Memory {
    /// "Virtual" or "Physical"
    pub backing: String,
    /// Startup memory in MB
    pub startup: u64,
    #[serde(rename = "DirectFileMappingMB")]
    pub direct_file_mapping_mb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Processor {
    pub count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Devices {
    /// Controllers keyed by slot ("0", "1", ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scsi: BTreeMap<String, Scsi>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub virtual_smb_shares: Vec<VirtualSmbShare>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_interface: Option<GuestInterface>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Scsi {
    /// Attachments keyed by LUN
    pub attachments: BTreeMap<String, Attachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Attachment {
    pub path: String,
    #[serde(rename = "Type")]
    pub attachment_type: String,
}

impl Attachment {
    pub fn virtual_disk(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            attachment_type: "VirtualDisk".to_string(),
        }
    }
}

/// Host folder exposed to the guest over virtual SMB
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VirtualSmbShare {
    pub name: String,
    pub path: String,
    pub flags: VsmbFlags,
}

/// Virtual SMB share option bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VsmbFlags(pub u32);

impl VsmbFlags {
    pub const READ_ONLY: VsmbFlags = VsmbFlags(0x0000_0001);
    pub const SHARE_READ: VsmbFlags = VsmbFlags(0x0000_0002);
    pub const CACHE_IO: VsmbFlags = VsmbFlags(0x0000_0004);
    pub const TAKE_BACKUP_PRIVILEGE: VsmbFlags = VsmbFlags(0x0000_0010);
    pub const PSEUDO_OPLOCKS: VsmbFlags = VsmbFlags(0x0000_4000);

    /// Flags for sharing a utility VM's OS files.
    pub fn os_share() -> Self {
        Self::READ_ONLY
            | Self::PSEUDO_OPLOCKS
            | Self::TAKE_BACKUP_PRIVILEGE
            | Self::CACHE_IO
            | Self::SHARE_READ
    }

    pub fn contains(self, other: VsmbFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for VsmbFlags {
    type Output = VsmbFlags;

    fn bitor(self, rhs: VsmbFlags) -> VsmbFlags {
        VsmbFlags(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GuestInterface {
    pub connect_to_bridge: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_version() {
        assert_eq!(SchemaVersion::default(), SchemaVersion::V2_0);
        assert_eq!(SchemaVersion::V2_1.to_string(), "2.1");
        assert!(!SchemaVersion { major: 1, minor: 0 }.is_v2());

        let json = serde_json::to_value(SchemaVersion::V2_1).unwrap();
        assert_eq!(json, serde_json::json!({ "Major": 2, "Minor": 1 }));
    }

    #[test]
    fn test_os_share_flags() {
        let flags = VsmbFlags::os_share();
        assert!(flags.contains(VsmbFlags::READ_ONLY));
        assert!(flags.contains(VsmbFlags::SHARE_READ));
        assert!(flags.contains(VsmbFlags::CACHE_IO));
        assert!(flags.contains(VsmbFlags::TAKE_BACKUP_PRIVILEGE));
        assert!(flags.contains(VsmbFlags::PSEUDO_OPLOCKS));
        assert_eq!(serde_json::to_value(flags).unwrap(), serde_json::json!(0x4017));
    }

    #[test]
    fn test_devices_serialization() {
        let mut attachments = BTreeMap::new();
        attachments.insert("0".to_string(), Attachment::virtual_disk(r"C:\uvm\sandbox.vhdx"));
        let mut scsi = BTreeMap::new();
        scsi.insert("0".to_string(), Scsi { attachments });

        let devices = Devices {
            scsi,
            virtual_smb_shares: Vec::new(),
            guest_interface: Some(GuestInterface { connect_to_bridge: true }),
        };

        let json = serde_json::to_value(&devices).unwrap();
        assert_eq!(json["Scsi"]["0"]["Attachments"]["0"]["Type"], "VirtualDisk");
        assert_eq!(json["GuestInterface"]["ConnectToBridge"], true);
        assert!(json.get("VirtualSmbShares").is_none());
    }
}
