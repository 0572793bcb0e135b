//! Utility VM creation options with builder pattern

use serde::{Deserialize, Serialize};

use crate::hcs::SchemaVersion;

/// Owner recorded on compute systems created by this crate
pub const DEFAULT_OWNER: &str = "hcs-uvm";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UvmConfig {
    /// Compute system id. Generated when left empty.
    pub id: String,
    pub owner: String,
    pub schema_version: SchemaVersion,
}

impl Default for UvmConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            owner: DEFAULT_OWNER.to_string(),
            schema_version: SchemaVersion::default(),
        }
    }
}

impl UvmConfig {
    pub fn builder() -> UvmConfigBuilder {
        UvmConfigBuilder::default()
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.owner.is_empty() {
            return Err(crate::Error::Config("owner cannot be empty".into()));
        }
        if !self.schema_version.is_v2() {
            return Err(crate::Error::Config(format!(
                "schema version {} is not supported, expected 2.x",
                self.schema_version
            )));
        }
        if self.id.contains(['/', '\\']) {
            return Err(crate::Error::Config(format!(
                "id {:?} must not contain path separators",
                self.id
            )));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct UvmConfigBuilder {
    config: UvmConfig,
}

impl UvmConfigBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.config.id = id.into();
        self
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.config.owner = owner.into();
        self
    }

    pub fn schema_version(mut self, version: SchemaVersion) -> Self {
        self.config.schema_version = version;
        self
    }

    /// Build the config, generating an id if none was set.
    pub fn build(mut self) -> UvmConfig {
        if self.config.id.is_empty() {
            self.config.id = format!("hcs-uvm-{}", uuid::Uuid::new_v4());
        }
        self.config
    }

    pub fn build_validated(self) -> crate::Result<UvmConfig> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
