//! Event classifier - maps one domain event to at most one sync operation.
//!
//! Update events compare the previous and current external id to detect
//! transitions into or out of synchronizable status:
//! - empty -> non-empty: the entity is created remotely
//! - non-empty -> empty: the entity is deleted remotely (using the old id)
//! - anything else: a plain update carrying both ids
//!
//! Created events are sent even when the new id is empty.

use crate::config::DirectoryConfig;
use crate::error::ClassifyResult;
use std::sync::Arc;
use tracing::debug;
use vlesync_store::DirectoryReader;
use vlesync_types::{normalize_ext_id, ContextLevel, DomainEvent, GroupSnapshot, SyncOperation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Enter,
    Leave,
    Update,
}

fn transition(old: &str, new: &str) -> Transition {
    match (old.is_empty(), new.is_empty()) {
        (true, false) => Transition::Enter,
        (false, true) => Transition::Leave,
        _ => Transition::Update,
    }
}

#[derive(Debug, Clone, Copy)]
enum Membership {
    Add,
    Remove,
}

/// Decides which remote operation, if any, a domain event translates to.
///
/// Holds no mutable state; the "after" state of related rows is read fresh
/// from the directory on every call.
pub struct EventClassifier {
    reader: Arc<dyn DirectoryReader>,
    config: DirectoryConfig,
}

impl EventClassifier {
    /// Creates a classifier reading from the given directory.
    pub fn new(reader: Arc<dyn DirectoryReader>, config: DirectoryConfig) -> Self {
        Self { reader, config }
    }

    /// Classifies one event.
    ///
    /// Returns `Ok(None)` for events that deliberately produce no operation
    /// (role changes outside a course or for a role other than the tutor
    /// role).
    pub fn classify(&self, event: &DomainEvent) -> ClassifyResult<Option<SyncOperation>> {
        debug!(event = %event, "Classifying event");

        let op = match event {
            DomainEvent::CourseCreated { course_id, fullname } => SyncOperation::CreateCourse {
                vle_course_id: self.vle_course_id(*course_id)?,
                name: fullname.clone(),
            },

            DomainEvent::CourseUpdated {
                course_id,
                old_vle_course_id,
                fullname,
            } => {
                let old = normalize_ext_id(old_vle_course_id);
                let new = self.vle_course_id(*course_id)?;
                match transition(&old, &new) {
                    Transition::Enter => SyncOperation::CreateCourse {
                        vle_course_id: new,
                        name: fullname.clone(),
                    },
                    Transition::Leave => SyncOperation::DeleteCourse { vle_course_id: old },
                    Transition::Update => SyncOperation::UpdateCourse {
                        old_vle_course_id: old,
                        vle_course_id: new,
                        name: fullname.clone(),
                    },
                }
            }

            DomainEvent::CourseDeleted { course } => SyncOperation::DeleteCourse {
                vle_course_id: normalize_ext_id(&course.idnumber),
            },

            DomainEvent::UserEnrolmentCreated {
                course_id,
                related_user_id,
            } => self.course_membership(*course_id, *related_user_id, Membership::Add)?,

            DomainEvent::UserEnrolmentDeleted {
                course_id,
                related_user_id,
            } => self.course_membership(*course_id, *related_user_id, Membership::Remove)?,

            DomainEvent::RoleAssigned {
                course_id,
                context_level,
                role_id,
                related_user_id,
            } => {
                return self.tutor_status(
                    *course_id,
                    *context_level,
                    *role_id,
                    *related_user_id,
                    Membership::Add,
                );
            }

            DomainEvent::RoleUnassigned {
                course_id,
                context_level,
                role_id,
                related_user_id,
            } => {
                return self.tutor_status(
                    *course_id,
                    *context_level,
                    *role_id,
                    *related_user_id,
                    Membership::Remove,
                );
            }

            DomainEvent::GroupCreated { course_id, group } => SyncOperation::CreateGroup {
                vle_course_id: self.vle_course_id(*course_id)?,
                vle_group_id: normalize_ext_id(&group.idnumber),
                name: group.name.clone(),
            },

            DomainEvent::GroupUpdated {
                course_id,
                group,
                old_vle_group_id,
            } => {
                let vle_course_id = self.vle_course_id(*course_id)?;
                let old = normalize_ext_id(old_vle_group_id);
                let new = normalize_ext_id(&group.idnumber);
                match transition(&old, &new) {
                    Transition::Enter => SyncOperation::CreateGroup {
                        vle_course_id,
                        vle_group_id: new,
                        name: group.name.clone(),
                    },
                    Transition::Leave => SyncOperation::DeleteGroup {
                        vle_course_id,
                        vle_group_id: old,
                    },
                    Transition::Update => SyncOperation::UpdateGroup {
                        vle_course_id,
                        old_vle_group_id: old,
                        vle_group_id: new,
                        name: group.name.clone(),
                    },
                }
            }

            DomainEvent::GroupDeleted { course_id, group } => SyncOperation::DeleteGroup {
                vle_course_id: self.vle_course_id(*course_id)?,
                vle_group_id: normalize_ext_id(&group.idnumber),
            },

            DomainEvent::GroupMemberAdded {
                course_id,
                group,
                related_user_id,
            } => self.group_membership(*course_id, group, *related_user_id, Membership::Add)?,

            DomainEvent::GroupMemberRemoved {
                course_id,
                group,
                related_user_id,
            } => self.group_membership(*course_id, group, *related_user_id, Membership::Remove)?,
        };

        Ok(Some(op))
    }

    fn vle_course_id(&self, course_id: i64) -> ClassifyResult<String> {
        Ok(normalize_ext_id(&self.reader.course_idnumber(course_id)?))
    }

    fn course_membership(
        &self,
        course_id: i64,
        user_id: i64,
        kind: Membership,
    ) -> ClassifyResult<SyncOperation> {
        let vle_course_id = self.vle_course_id(course_id)?;
        let usernames = vec![self.reader.active_username(user_id)?];
        Ok(match kind {
            Membership::Add => SyncOperation::AddCourseMembers { vle_course_id, usernames },
            Membership::Remove => SyncOperation::RemoveCourseMembers { vle_course_id, usernames },
        })
    }

    fn tutor_status(
        &self,
        course_id: i64,
        context_level: ContextLevel,
        role_id: i64,
        user_id: i64,
        kind: Membership,
    ) -> ClassifyResult<Option<SyncOperation>> {
        if context_level != ContextLevel::Course {
            debug!(?context_level, "Ignoring role change outside a course context");
            return Ok(None);
        }

        match self.reader.role_id(&self.config.tutor_role)? {
            Some(tutor_role_id) if tutor_role_id == role_id => {}
            Some(_) => {
                debug!(role_id, "Ignoring change to a non-tutor role");
                return Ok(None);
            }
            None => {
                debug!(role = %self.config.tutor_role, "Tutor role does not exist, ignoring");
                return Ok(None);
            }
        }

        let vle_course_id = self.vle_course_id(course_id)?;
        let username = self.reader.active_username(user_id)?;
        Ok(Some(match kind {
            Membership::Add => SyncOperation::AddTutor { vle_course_id, username },
            Membership::Remove => SyncOperation::RemoveTutor { vle_course_id, username },
        }))
    }

    fn group_membership(
        &self,
        course_id: i64,
        group: &GroupSnapshot,
        user_id: i64,
        kind: Membership,
    ) -> ClassifyResult<SyncOperation> {
        let vle_course_id = self.vle_course_id(course_id)?;
        let vle_group_id = normalize_ext_id(&group.idnumber);
        let usernames = vec![self.reader.active_username(user_id)?];
        Ok(match kind {
            Membership::Add => SyncOperation::AddGroupMembers {
                vle_course_id,
                vle_group_id,
                usernames,
            },
            Membership::Remove => SyncOperation::RemoveGroupMembers {
                vle_course_id,
                vle_group_id,
                usernames,
            },
        })
    }
}
