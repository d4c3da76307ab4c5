//! Outbound sync operations.
//!
//! A `SyncOperation` is the unit of work sent to the VLE: an operation name
//! from a fixed set plus a flat JSON payload. Internal ids never appear in
//! payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Name of a remote operation, used as the key into the gateway path table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationName {
    CreateCourse,
    UpdateCourse,
    DeleteCourse,
    AddCourseMembers,
    RemoveCourseMembers,
    AddTutor,
    RemoveTutor,
    CreateGroup,
    UpdateGroup,
    DeleteGroup,
    AddGroupMembers,
    RemoveGroupMembers,
}

impl OperationName {
    /// Every operation, in declaration order.
    pub const ALL: [OperationName; 12] = [
        Self::CreateCourse,
        Self::UpdateCourse,
        Self::DeleteCourse,
        Self::AddCourseMembers,
        Self::RemoveCourseMembers,
        Self::AddTutor,
        Self::RemoveTutor,
        Self::CreateGroup,
        Self::UpdateGroup,
        Self::DeleteGroup,
        Self::AddGroupMembers,
        Self::RemoveGroupMembers,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateCourse => "create_course",
            Self::UpdateCourse => "update_course",
            Self::DeleteCourse => "delete_course",
            Self::AddCourseMembers => "add_course_members",
            Self::RemoveCourseMembers => "remove_course_members",
            Self::AddTutor => "add_tutor",
            Self::RemoveTutor => "remove_tutor",
            Self::CreateGroup => "create_group",
            Self::UpdateGroup => "update_group",
            Self::DeleteGroup => "delete_group",
            Self::AddGroupMembers => "add_group_members",
            Self::RemoveGroupMembers => "remove_group_members",
        }
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationName {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| crate::Error::UnknownOperation(s.to_string()))
    }
}

/// One outbound operation with its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "payload", rename_all = "snake_case")]
pub enum SyncOperation {
    CreateCourse {
        vle_course_id: String,
        name: String,
    },

    UpdateCourse {
        old_vle_course_id: String,
        vle_course_id: String,
        name: String,
    },

    DeleteCourse {
        vle_course_id: String,
    },

    AddCourseMembers {
        vle_course_id: String,
        usernames: Vec<String>,
    },

    RemoveCourseMembers {
        vle_course_id: String,
        usernames: Vec<String>,
    },

    AddTutor {
        vle_course_id: String,
        username: String,
    },

    RemoveTutor {
        vle_course_id: String,
        username: String,
    },

    CreateGroup {
        vle_course_id: String,
        vle_group_id: String,
        name: String,
    },

    UpdateGroup {
        vle_course_id: String,
        old_vle_group_id: String,
        vle_group_id: String,
        name: String,
    },

    DeleteGroup {
        vle_course_id: String,
        vle_group_id: String,
    },

    AddGroupMembers {
        vle_course_id: String,
        vle_group_id: String,
        usernames: Vec<String>,
    },

    RemoveGroupMembers {
        vle_course_id: String,
        vle_group_id: String,
        usernames: Vec<String>,
    },
}

impl SyncOperation {
    pub fn name(&self) -> OperationName {
        match self {
            Self::CreateCourse { .. } => OperationName::CreateCourse,
            Self::UpdateCourse { .. } => OperationName::UpdateCourse,
            Self::DeleteCourse { .. } => OperationName::DeleteCourse,
            Self::AddCourseMembers { .. } => OperationName::AddCourseMembers,
            Self::RemoveCourseMembers { .. } => OperationName::RemoveCourseMembers,
            Self::AddTutor { .. } => OperationName::AddTutor,
            Self::RemoveTutor { .. } => OperationName::RemoveTutor,
            Self::CreateGroup { .. } => OperationName::CreateGroup,
            Self::UpdateGroup { .. } => OperationName::UpdateGroup,
            Self::DeleteGroup { .. } => OperationName::DeleteGroup,
            Self::AddGroupMembers { .. } => OperationName::AddGroupMembers,
            Self::RemoveGroupMembers { .. } => OperationName::RemoveGroupMembers,
        }
    }

    /// The flat JSON body sent to the VLE for this operation.
    pub fn payload(&self) -> crate::Result<Value> {
        let mut tagged = serde_json::to_value(self)?;
        Ok(tagged
            .get_mut("payload")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }
}
