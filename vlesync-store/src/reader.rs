//! Read interface consumed by the sync engine.

use crate::error::StoreResult;

/// A course eligible for synchronization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseRow {
    pub id: i64,
    pub vle_course_id: String,
    pub name: String,
}

/// A group eligible for synchronization, joined with its course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRow {
    pub id: i64,
    pub course_id: i64,
    pub vle_course_id: String,
    pub vle_group_id: String,
    pub name: String,
}

/// One student or tutor role assignment in a synchronizable course.
///
/// A user holding both roles yields two rows; collapsing them is up to the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseRoleRow {
    pub course_id: i64,
    pub user_id: i64,
    pub username: String,
    pub vle_course_id: String,
    pub is_tutor: bool,
}

/// One active member of a synchronizable group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMemberRow {
    pub course_id: i64,
    pub group_id: i64,
    pub user_id: i64,
    pub username: String,
    pub vle_course_id: String,
    pub vle_group_id: String,
}

/// Every set-returning query, read at a single point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryRows {
    pub courses: Vec<CourseRow>,
    pub groups: Vec<GroupRow>,
    pub course_roles: Vec<CourseRoleRow>,
    pub group_members: Vec<GroupMemberRow>,
}

/// Read access to the learning-management directory.
///
/// Idnumbers in set-returning rows are already trimmed and non-empty; point
/// lookups return the stored value untouched.
pub trait DirectoryReader: Send + Sync {
    /// Returns the idnumber of a course. Fails with `NotFound` if the
    /// course does not exist.
    fn course_idnumber(&self, course_id: i64) -> StoreResult<String>;

    /// Returns the username of a user that has not been soft-deleted.
    fn active_username(&self, user_id: i64) -> StoreResult<String>;

    /// Looks up a role id by shortname.
    fn role_id(&self, shortname: &str) -> StoreResult<Option<i64>>;

    /// Courses other than the site course with a non-empty idnumber,
    /// ordered by idnumber.
    fn synchronizable_courses(&self, site_course_id: i64) -> StoreResult<Vec<CourseRow>>;

    /// Groups with a non-empty idnumber in a synchronizable course, ordered
    /// by (course idnumber, group idnumber).
    fn synchronizable_groups(&self, site_course_id: i64) -> StoreResult<Vec<GroupRow>>;

    /// Student and tutor role assignments of active users in synchronizable
    /// courses, ordered by (course idnumber, username).
    fn course_role_rows(
        &self,
        site_course_id: i64,
        student_role: &str,
        tutor_role: &str,
    ) -> StoreResult<Vec<CourseRoleRow>>;

    /// Active members of synchronizable groups, ordered by (course idnumber,
    /// group idnumber, username).
    fn synchronizable_group_members(&self, site_course_id: i64) -> StoreResult<Vec<GroupMemberRow>>;

    /// Runs all four set-returning queries.
    ///
    /// Implementations backed by a shared database should override this to
    /// read from one consistent view; the default issues the queries one
    /// after another.
    fn synchronizable_rows(
        &self,
        site_course_id: i64,
        student_role: &str,
        tutor_role: &str,
    ) -> StoreResult<DirectoryRows> {
        Ok(DirectoryRows {
            courses: self.synchronizable_courses(site_course_id)?,
            groups: self.synchronizable_groups(site_course_id)?,
            course_roles: self.course_role_rows(site_course_id, student_role, tutor_role)?,
            group_members: self.synchronizable_group_members(site_course_id)?,
        })
    }
}
