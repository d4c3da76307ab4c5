//! Full reconciliation snapshot.
//!
//! Plain-data records only; internal ids are dropped before anything lands
//! in here. Field order is the serialized key order.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub vle_course_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub vle_course_id: String,
    pub vle_group_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseMemberRecord {
    pub username: String,
    pub vle_course_id: String,
    pub is_tutor: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMemberRecord {
    pub username: String,
    pub vle_course_id: String,
    pub vle_group_id: String,
}

/// Everything that currently requires synchronization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSnapshot {
    pub course_kv_store: Vec<CourseRecord>,
    pub group_kv_store: Vec<GroupRecord>,
    pub course_member: Vec<CourseMemberRecord>,
    pub group_member: Vec<GroupMemberRecord>,
}

impl SyncSnapshot {
    /// Returns true when no collection has any record.
    pub fn is_empty(&self) -> bool {
        self.course_kv_store.is_empty()
            && self.group_kv_store.is_empty()
            && self.course_member.is_empty()
            && self.group_member.is_empty()
    }
}
