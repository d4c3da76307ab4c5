//! Bulk reconciliation: the full synchronizable state in one snapshot.

use crate::config::DirectoryConfig;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use vlesync_store::{
    CourseRoleRow, CourseRow, DirectoryReader, GroupMemberRow, GroupRow, StoreResult,
};
use vlesync_types::{
    CourseMemberRecord, CourseRecord, GroupMemberRecord, GroupRecord, SyncSnapshot,
};

/// Computes deduplicated snapshots of everything requiring synchronization.
pub struct Reconciler {
    reader: Arc<dyn DirectoryReader>,
    config: DirectoryConfig,
}

impl Reconciler {
    pub fn new(reader: Arc<dyn DirectoryReader>, config: DirectoryConfig) -> Self {
        Self { reader, config }
    }

    /// Courses, groups, course memberships and group memberships.
    ///
    /// All four collections come from one read of the directory, so a
    /// concurrent write can never leave a group without its course. Any
    /// query failure aborts the whole snapshot.
    pub fn snapshot(&self) -> StoreResult<SyncSnapshot> {
        let rows = self.reader.synchronizable_rows(
            self.config.site_course_id,
            &self.config.student_role,
            &self.config.tutor_role,
        )?;
        let snapshot = SyncSnapshot {
            course_kv_store: course_records(rows.courses),
            group_kv_store: group_records(rows.groups),
            course_member: collapse_course_roles(rows.course_roles),
            group_member: dedupe_group_members(rows.group_members),
        };
        debug!(
            courses = snapshot.course_kv_store.len(),
            groups = snapshot.group_kv_store.len(),
            course_members = snapshot.course_member.len(),
            group_members = snapshot.group_member.len(),
            "Computed reconciliation snapshot"
        );
        Ok(snapshot)
    }

    pub fn courses(&self) -> StoreResult<Vec<CourseRecord>> {
        let rows = self
            .reader
            .synchronizable_courses(self.config.site_course_id)?;
        Ok(course_records(rows))
    }

    pub fn groups(&self) -> StoreResult<Vec<GroupRecord>> {
        let rows = self
            .reader
            .synchronizable_groups(self.config.site_course_id)?;
        Ok(group_records(rows))
    }

    /// One record per (course, user); tutors win over students.
    pub fn course_members(&self) -> StoreResult<Vec<CourseMemberRecord>> {
        let rows = self.reader.course_role_rows(
            self.config.site_course_id,
            &self.config.student_role,
            &self.config.tutor_role,
        )?;
        Ok(collapse_course_roles(rows))
    }

    pub fn group_members(&self) -> StoreResult<Vec<GroupMemberRecord>> {
        let rows = self
            .reader
            .synchronizable_group_members(self.config.site_course_id)?;
        Ok(dedupe_group_members(rows))
    }
}

fn course_records(rows: Vec<CourseRow>) -> Vec<CourseRecord> {
    rows.into_iter()
        .map(|row| CourseRecord {
            vle_course_id: row.vle_course_id,
            name: row.name,
        })
        .collect()
}

fn group_records(rows: Vec<GroupRow>) -> Vec<GroupRecord> {
    rows.into_iter()
        .map(|row| GroupRecord {
            vle_course_id: row.vle_course_id,
            vle_group_id: row.vle_group_id,
            name: row.name,
        })
        .collect()
}

/// Drops exact (group, user) duplicates, keeping the first occurrence.
fn dedupe_group_members(rows: Vec<GroupMemberRow>) -> Vec<GroupMemberRecord> {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.into_iter()
        .filter(|row| seen.insert((row.group_id, row.user_id)))
        .map(|row| GroupMemberRecord {
            username: row.username,
            vle_course_id: row.vle_course_id,
            vle_group_id: row.vle_group_id,
        })
        .collect()
}

/// Collapses student/tutor role rows into one membership per (course, user).
///
/// A student row is discarded outright when a tutor row exists for the same
/// pair. Input order is preserved for the surviving rows.
pub fn collapse_course_roles(rows: Vec<CourseRoleRow>) -> Vec<CourseMemberRecord> {
    let tutors: HashSet<(i64, i64)> = rows
        .iter()
        .filter(|row| row.is_tutor)
        .map(|row| (row.course_id, row.user_id))
        .collect();

    let mut emitted = HashSet::with_capacity(rows.len());
    rows.into_iter()
        .filter(|row| row.is_tutor || !tutors.contains(&(row.course_id, row.user_id)))
        .filter(|row| emitted.insert((row.course_id, row.user_id)))
        .map(|row| CourseMemberRecord {
            username: row.username,
            vle_course_id: row.vle_course_id,
            is_tutor: row.is_tutor,
        })
        .collect()
}
