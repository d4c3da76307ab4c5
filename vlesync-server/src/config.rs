use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vlesync_store::SITE_COURSE_ID;
use vlesync_sync::{BasicCredentials, DirectoryConfig, GatewayConfig};

/// Service configuration, read from a JSON file.
///
/// Every field has a default so an empty object is a valid configuration.
/// Without `gateway` settings operations are classified and logged but not
/// sent; without `inbound_auth` the reconciliation endpoint rejects every
/// request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// SQLite database holding the directory.
    pub database: PathBuf,
    pub site_course_id: i64,
    pub student_role: String,
    pub tutor_role: String,
    pub gateway: GatewayConfig,
    /// Credentials the VLE must present when calling the endpoint.
    pub inbound_auth: Option<BasicCredentials>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let directory = DirectoryConfig::default();
        Self {
            database: PathBuf::from("vlesync.db"),
            site_course_id: SITE_COURSE_ID,
            student_role: directory.student_role,
            tutor_role: directory.tutor_role,
            gateway: GatewayConfig::default(),
            inbound_auth: None,
        }
    }
}

impl ServiceConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid service configuration")
    }

    /// Loads the configuration file, falling back to defaults when absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                Self::from_json(&raw)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn directory(&self) -> DirectoryConfig {
        DirectoryConfig {
            site_course_id: self.site_course_id,
            student_role: self.student_role.clone(),
            tutor_role: self.tutor_role.clone(),
        }
    }
}
