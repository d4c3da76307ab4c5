use serde::{Deserialize, Serialize};
use vlesync_store::SITE_COURSE_ID;

/// Directory conventions shared by classification and reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Internal id of the reserved site course, never synchronized.
    pub site_course_id: i64,
    /// Shortname of the student role.
    pub student_role: String,
    /// Shortname of the tutor role.
    pub tutor_role: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            site_course_id: SITE_COURSE_ID,
            student_role: "student".to_string(),
            tutor_role: "tutor".to_string(),
        }
    }
}
