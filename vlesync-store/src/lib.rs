//! Directory store for VLE sync.
//!
//! Read access to the learning-management tables (courses, groups, users,
//! roles and their relationships) behind the [`DirectoryReader`] trait, with
//! a SQLite implementation in [`DirectoryStore`].
//!
//! # Architecture
//!
//! - Point lookups resolve a single field by primary key (a course's
//!   idnumber, a user's username, a role id by shortname)
//! - Set-returning queries feed bulk reconciliation; they exclude the site
//!   course by internal id and filter out empty (trimmed) idnumbers
//! - Writers exist for seeding and tests; the sync engine never writes

mod directory_store;
mod error;
mod reader;

pub use directory_store::{DirectoryStore, SITE_COURSE_ID};
pub use error::{StoreError, StoreResult};
pub use reader::{
    CourseRoleRow, CourseRow, DirectoryReader, DirectoryRows, GroupMemberRow, GroupRow,
};
