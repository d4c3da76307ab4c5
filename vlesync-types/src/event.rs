//! Domain change events emitted by the learning-management system.
//!
//! Each variant mirrors one lifecycle notification. Events carry the internal
//! ids needed to read the current state of related rows, plus whatever
//! previous-state fields the transition decisions depend on (old external
//! ids, full names, record snapshots taken when the event fired).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Context level an event was raised in.
///
/// Only course-level role changes are relevant to synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextLevel {
    System,
    User,
    CourseCategory,
    Course,
    Module,
    Block,
}

impl ContextLevel {
    /// Numeric level as stored in the `context` table.
    pub fn as_level(self) -> i64 {
        match self {
            Self::System => 10,
            Self::User => 30,
            Self::CourseCategory => 40,
            Self::Course => 50,
            Self::Module => 70,
            Self::Block => 80,
        }
    }
}

/// A course row as it was when the event fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSnapshot {
    pub id: i64,
    #[serde(default)]
    pub idnumber: String,
    #[serde(default)]
    pub fullname: String,
}

/// A group row as it was when the event fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub id: i64,
    #[serde(default)]
    pub idnumber: String,
    #[serde(default)]
    pub name: String,
}

/// A lifecycle notification from the learning-management system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum DomainEvent {
    CourseCreated {
        course_id: i64,
        fullname: String,
    },

    CourseUpdated {
        course_id: i64,
        /// External id the course had before the update.
        #[serde(default)]
        old_vle_course_id: String,
        fullname: String,
    },

    CourseDeleted {
        course: CourseSnapshot,
    },

    UserEnrolmentCreated {
        course_id: i64,
        related_user_id: i64,
    },

    UserEnrolmentDeleted {
        course_id: i64,
        related_user_id: i64,
    },

    RoleAssigned {
        course_id: i64,
        context_level: ContextLevel,
        role_id: i64,
        related_user_id: i64,
    },

    RoleUnassigned {
        course_id: i64,
        context_level: ContextLevel,
        role_id: i64,
        related_user_id: i64,
    },

    GroupCreated {
        course_id: i64,
        group: GroupSnapshot,
    },

    GroupUpdated {
        course_id: i64,
        group: GroupSnapshot,
        /// External id the group had before the update.
        #[serde(default)]
        old_vle_group_id: String,
    },

    GroupDeleted {
        course_id: i64,
        group: GroupSnapshot,
    },

    GroupMemberAdded {
        course_id: i64,
        group: GroupSnapshot,
        related_user_id: i64,
    },

    GroupMemberRemoved {
        course_id: i64,
        group: GroupSnapshot,
        related_user_id: i64,
    },
}

impl DomainEvent {
    /// Event name as emitted by the learning-management system.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CourseCreated { .. } => "course_created",
            Self::CourseUpdated { .. } => "course_updated",
            Self::CourseDeleted { .. } => "course_deleted",
            Self::UserEnrolmentCreated { .. } => "user_enrolment_created",
            Self::UserEnrolmentDeleted { .. } => "user_enrolment_deleted",
            Self::RoleAssigned { .. } => "role_assigned",
            Self::RoleUnassigned { .. } => "role_unassigned",
            Self::GroupCreated { .. } => "group_created",
            Self::GroupUpdated { .. } => "group_updated",
            Self::GroupDeleted { .. } => "group_deleted",
            Self::GroupMemberAdded { .. } => "group_member_added",
            Self::GroupMemberRemoved { .. } => "group_member_removed",
        }
    }

    /// Internal id of the course the event belongs to.
    pub fn course_id(&self) -> i64 {
        match self {
            Self::CourseDeleted { course } => course.id,
            Self::CourseCreated { course_id, .. }
            | Self::CourseUpdated { course_id, .. }
            | Self::UserEnrolmentCreated { course_id, .. }
            | Self::UserEnrolmentDeleted { course_id, .. }
            | Self::RoleAssigned { course_id, .. }
            | Self::RoleUnassigned { course_id, .. }
            | Self::GroupCreated { course_id, .. }
            | Self::GroupUpdated { course_id, .. }
            | Self::GroupDeleted { course_id, .. }
            | Self::GroupMemberAdded { course_id, .. }
            | Self::GroupMemberRemoved { course_id, .. } => *course_id,
        }
    }

    /// Parses one event from its JSON form.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl fmt::Display for DomainEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(course={})", self.kind(), self.course_id())
    }
}
