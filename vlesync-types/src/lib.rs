//! Core type definitions for VLE directory sync.
//!
//! This crate defines the value types shared by the directory store,
//! the sync engine and the HTTP surface:
//! - Domain change events delivered by the learning-management system
//! - Outbound sync operations and their payloads
//! - Plain-data records making up a full reconciliation snapshot
//!
//! Nothing in here performs I/O.

mod event;
mod operation;
mod snapshot;

pub use event::{ContextLevel, CourseSnapshot, DomainEvent, GroupSnapshot};
pub use operation::{OperationName, SyncOperation};
pub use snapshot::{CourseMemberRecord, CourseRecord, GroupMemberRecord, GroupRecord, SyncSnapshot};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unknown operation: {0}")]
    UnknownOperation(String),
}

/// Characters stripped from both ends of an external-sync identifier:
/// space, tab, line feed, vertical tab, form feed and carriage return.
///
/// The directory queries trim with the same set
/// (`TRIM(x, ' ' || char(9, 10, 11, 12, 13))`), so bulk output and event
/// classification agree on what counts as empty.
pub const EXT_ID_TRIM_CHARS: [char; 6] = [' ', '\t', '\n', '\x0B', '\x0C', '\r'];

/// Trims surrounding whitespace from an external-sync identifier.
///
/// Identifiers are always compared and transmitted in trimmed form.
pub fn normalize_ext_id(raw: &str) -> String {
    raw.trim_matches(&EXT_ID_TRIM_CHARS[..]).to_string()
}
