//! SQLite-backed directory store.

use crate::error::{StoreError, StoreResult};
use crate::reader::{
    CourseRoleRow, CourseRow, DirectoryReader, DirectoryRows, GroupMemberRow, GroupRow,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use vlesync_types::{ContextLevel, CourseSnapshot, GroupSnapshot};

/// Internal id of the reserved site course.
pub const SITE_COURSE_ID: i64 = 1;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS courses (
    id INTEGER PRIMARY KEY,
    idnumber TEXT NOT NULL DEFAULT '',
    fullname TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS course_groups (
    id INTEGER PRIMARY KEY,
    course_id INTEGER NOT NULL,
    idnumber TEXT NOT NULL DEFAULT '',
    name TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_course_groups_course ON course_groups(course_id);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    deleted INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS roles (
    id INTEGER PRIMARY KEY,
    shortname TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS contexts (
    id INTEGER PRIMARY KEY,
    context_level INTEGER NOT NULL,
    instance_id INTEGER NOT NULL,
    UNIQUE(context_level, instance_id)
);

CREATE TABLE IF NOT EXISTS role_assignments (
    id INTEGER PRIMARY KEY,
    context_id INTEGER NOT NULL,
    role_id INTEGER NOT NULL,
    user_id INTEGER NOT NULL,
    UNIQUE(context_id, role_id, user_id)
);

CREATE TABLE IF NOT EXISTS group_members (
    id INTEGER PRIMARY KEY,
    group_id INTEGER NOT NULL,
    user_id INTEGER NOT NULL,
    UNIQUE(group_id, user_id)
);
";

/// Directory store backed by SQLite.
///
/// Cloning is cheap; clones share the same connection.
#[derive(Clone)]
pub struct DirectoryStore {
    conn: Arc<Mutex<Connection>>,
}

impl DirectoryStore {
    /// Opens (or creates) a directory store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        debug!("Opened directory store at {}", path.as_ref().display());
        Self::with_connection(conn)
    }

    /// Opens an in-memory directory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA)?;
        conn.execute(
            "INSERT OR IGNORE INTO courses (id, idnumber, fullname) VALUES (?1, '', 'Site')",
            params![SITE_COURSE_ID],
        )?;
        Ok(())
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    // ── Courses ──────────────────────────────────────────────────

    /// Inserts a course and returns its id.
    pub fn insert_course(&self, idnumber: &str, fullname: &str) -> StoreResult<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO courses (idnumber, fullname) VALUES (?1, ?2)",
            params![idnumber, fullname],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Changes a course's idnumber and full name.
    pub fn update_course(&self, course_id: i64, idnumber: &str, fullname: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE courses SET idnumber = ?2, fullname = ?3 WHERE id = ?1",
            params![course_id, idnumber, fullname],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound { table: "course", id: course_id });
        }
        Ok(())
    }

    /// Deletes a course together with its groups, memberships and role
    /// assignments.
    pub fn delete_course(&self, course_id: i64) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM group_members WHERE group_id IN (SELECT id FROM course_groups WHERE course_id = ?1)",
            params![course_id],
        )?;
        tx.execute("DELETE FROM course_groups WHERE course_id = ?1", params![course_id])?;
        tx.execute(
            "DELETE FROM role_assignments WHERE context_id IN
                (SELECT id FROM contexts WHERE context_level = ?1 AND instance_id = ?2)",
            params![ContextLevel::Course.as_level(), course_id],
        )?;
        tx.execute(
            "DELETE FROM contexts WHERE context_level = ?1 AND instance_id = ?2",
            params![ContextLevel::Course.as_level(), course_id],
        )?;
        tx.execute("DELETE FROM courses WHERE id = ?1", params![course_id])?;
        tx.commit()?;
        Ok(())
    }

    /// Returns the course row as an event snapshot.
    pub fn course_snapshot(&self, course_id: i64) -> StoreResult<CourseSnapshot> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, idnumber, fullname FROM courses WHERE id = ?1",
            params![course_id],
            |row| {
                Ok(CourseSnapshot {
                    id: row.get(0)?,
                    idnumber: row.get(1)?,
                    fullname: row.get(2)?,
                })
            },
        )
        .optional()?
        .ok_or(StoreError::NotFound { table: "course", id: course_id })
    }

    // ── Groups ───────────────────────────────────────────────────

    /// Inserts a group into a course and returns its id.
    pub fn insert_group(&self, course_id: i64, idnumber: &str, name: &str) -> StoreResult<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO course_groups (course_id, idnumber, name) VALUES (?1, ?2, ?3)",
            params![course_id, idnumber, name],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Changes a group's idnumber and name.
    pub fn update_group(&self, group_id: i64, idnumber: &str, name: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE course_groups SET idnumber = ?2, name = ?3 WHERE id = ?1",
            params![group_id, idnumber, name],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound { table: "group", id: group_id });
        }
        Ok(())
    }

    /// Deletes a group and its memberships.
    pub fn delete_group(&self, group_id: i64) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM group_members WHERE group_id = ?1", params![group_id])?;
        tx.execute("DELETE FROM course_groups WHERE id = ?1", params![group_id])?;
        tx.commit()?;
        Ok(())
    }

    /// Returns the group row as an event snapshot.
    pub fn group_snapshot(&self, group_id: i64) -> StoreResult<GroupSnapshot> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, idnumber, name FROM course_groups WHERE id = ?1",
            params![group_id],
            |row| {
                Ok(GroupSnapshot {
                    id: row.get(0)?,
                    idnumber: row.get(1)?,
                    name: row.get(2)?,
                })
            },
        )
        .optional()?
        .ok_or(StoreError::NotFound { table: "group", id: group_id })
    }

    /// Adds a user to a group. Adding an existing member is a no-op.
    pub fn add_group_member(&self, group_id: i64, user_id: i64) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO group_members (group_id, user_id) VALUES (?1, ?2)",
            params![group_id, user_id],
        )?;
        Ok(())
    }

    /// Removes a user from a group.
    pub fn remove_group_member(&self, group_id: i64, user_id: i64) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM group_members WHERE group_id = ?1 AND user_id = ?2",
            params![group_id, user_id],
        )?;
        Ok(())
    }

    // ── Users & roles ────────────────────────────────────────────

    /// Inserts an active user and returns its id.
    pub fn insert_user(&self, username: &str) -> StoreResult<i64> {
        let conn = self.conn()?;
        conn.execute("INSERT INTO users (username) VALUES (?1)", params![username])?;
        Ok(conn.last_insert_rowid())
    }

    /// Soft-deletes a user.
    pub fn mark_user_deleted(&self, user_id: i64) -> StoreResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute("UPDATE users SET deleted = 1 WHERE id = ?1", params![user_id])?;
        if changed == 0 {
            return Err(StoreError::NotFound { table: "user", id: user_id });
        }
        Ok(())
    }

    /// Inserts a role and returns its id.
    pub fn insert_role(&self, shortname: &str) -> StoreResult<i64> {
        let conn = self.conn()?;
        conn.execute("INSERT INTO roles (shortname) VALUES (?1)", params![shortname])?;
        Ok(conn.last_insert_rowid())
    }

    /// Assigns a role to a user in a course's context, creating the context
    /// on first use. Returns the role assignment's context id.
    pub fn assign_role(&self, course_id: i64, user_id: i64, role_id: i64) -> StoreResult<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO contexts (context_level, instance_id) VALUES (?1, ?2)",
            params![ContextLevel::Course.as_level(), course_id],
        )?;
        let context_id: i64 = conn.query_row(
            "SELECT id FROM contexts WHERE context_level = ?1 AND instance_id = ?2",
            params![ContextLevel::Course.as_level(), course_id],
            |row| row.get(0),
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO role_assignments (context_id, role_id, user_id) VALUES (?1, ?2, ?3)",
            params![context_id, role_id, user_id],
        )?;
        Ok(context_id)
    }

    /// Removes a role assignment from a course's context.
    pub fn unassign_role(&self, course_id: i64, user_id: i64, role_id: i64) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM role_assignments
             WHERE role_id = ?3 AND user_id = ?2 AND context_id IN
                (SELECT id FROM contexts WHERE context_level = ?4 AND instance_id = ?1)",
            params![course_id, user_id, role_id, ContextLevel::Course.as_level()],
        )?;
        Ok(())
    }
}

impl DirectoryReader for DirectoryStore {
    fn course_idnumber(&self, course_id: i64) -> StoreResult<String> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT idnumber FROM courses WHERE id = ?1",
            params![course_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or(StoreError::NotFound { table: "course", id: course_id })
    }

    fn active_username(&self, user_id: i64) -> StoreResult<String> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT username FROM users WHERE id = ?1 AND deleted = 0",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or(StoreError::NotFound { table: "user", id: user_id })
    }

    fn role_id(&self, shortname: &str) -> StoreResult<Option<i64>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT id FROM roles WHERE shortname = ?1",
                params![shortname],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn synchronizable_courses(&self, site_course_id: i64) -> StoreResult<Vec<CourseRow>> {
        query_courses(&*self.conn()?, site_course_id)
    }

    fn synchronizable_groups(&self, site_course_id: i64) -> StoreResult<Vec<GroupRow>> {
        query_groups(&*self.conn()?, site_course_id)
    }

    fn course_role_rows(
        &self,
        site_course_id: i64,
        student_role: &str,
        tutor_role: &str,
    ) -> StoreResult<Vec<CourseRoleRow>> {
        query_course_roles(&*self.conn()?, site_course_id, student_role, tutor_role)
    }

    fn synchronizable_group_members(&self, site_course_id: i64) -> StoreResult<Vec<GroupMemberRow>> {
        query_group_members(&*self.conn()?, site_course_id)
    }

    fn synchronizable_rows(
        &self,
        site_course_id: i64,
        student_role: &str,
        tutor_role: &str,
    ) -> StoreResult<DirectoryRows> {
        let conn = self.conn()?;
        // Holding the guard keeps in-process writers out; the read
        // transaction covers other connections to the same file.
        let tx = conn.unchecked_transaction()?;
        let rows = DirectoryRows {
            courses: query_courses(&tx, site_course_id)?,
            groups: query_groups(&tx, site_course_id)?,
            course_roles: query_course_roles(&tx, site_course_id, student_role, tutor_role)?,
            group_members: query_group_members(&tx, site_course_id)?,
        };
        tx.commit()?;
        Ok(rows)
    }
}

// ── Set-returning queries ────────────────────────────────────────

fn query_courses(conn: &Connection, site_course_id: i64) -> StoreResult<Vec<CourseRow>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, TRIM(c.idnumber, ' ' || char(9, 10, 11, 12, 13)) AS vle_course_id, c.fullname
         FROM courses c
         WHERE c.id != ?1
            AND LENGTH(TRIM(c.idnumber, ' ' || char(9, 10, 11, 12, 13))) > 0
         ORDER BY vle_course_id, c.id",
    )?;
    let rows = stmt.query_map(params![site_course_id], |row| {
        Ok(CourseRow {
            id: row.get(0)?,
            vle_course_id: row.get(1)?,
            name: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn query_groups(conn: &Connection, site_course_id: i64) -> StoreResult<Vec<GroupRow>> {
    let mut stmt = conn.prepare(
        "SELECT g.id, c.id, TRIM(c.idnumber, ' ' || char(9, 10, 11, 12, 13)) AS vle_course_id, TRIM(g.idnumber, ' ' || char(9, 10, 11, 12, 13)) AS vle_group_id, g.name
         FROM course_groups g
         INNER JOIN courses c
            ON c.id = g.course_id
         WHERE c.id != ?1
            AND LENGTH(TRIM(c.idnumber, ' ' || char(9, 10, 11, 12, 13))) > 0
            AND LENGTH(TRIM(g.idnumber, ' ' || char(9, 10, 11, 12, 13))) > 0
         ORDER BY vle_course_id, vle_group_id, g.id",
    )?;
    let rows = stmt.query_map(params![site_course_id], |row| {
        Ok(GroupRow {
            id: row.get(0)?,
            course_id: row.get(1)?,
            vle_course_id: row.get(2)?,
            vle_group_id: row.get(3)?,
            name: row.get(4)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn query_course_roles(
    conn: &Connection,
    site_course_id: i64,
    student_role: &str,
    tutor_role: &str,
) -> StoreResult<Vec<CourseRoleRow>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, u.id, u.username, TRIM(c.idnumber, ' ' || char(9, 10, 11, 12, 13)) AS vle_course_id, r.shortname = ?3 AS is_tutor
         FROM courses c
         INNER JOIN contexts ctx
            ON ctx.instance_id = c.id
            AND ctx.context_level = ?4
         INNER JOIN role_assignments ra
            ON ra.context_id = ctx.id
         INNER JOIN roles r
            ON r.id = ra.role_id
            AND r.shortname IN (?2, ?3)
         INNER JOIN users u
            ON u.id = ra.user_id
            AND u.deleted = 0
         WHERE c.id != ?1
            AND LENGTH(TRIM(c.idnumber, ' ' || char(9, 10, 11, 12, 13))) > 0
         ORDER BY vle_course_id, u.username, c.id, is_tutor DESC",
    )?;
    let rows = stmt.query_map(
        params![
            site_course_id,
            student_role,
            tutor_role,
            ContextLevel::Course.as_level()
        ],
        |row| {
            Ok(CourseRoleRow {
                course_id: row.get(0)?,
                user_id: row.get(1)?,
                username: row.get(2)?,
                vle_course_id: row.get(3)?,
                is_tutor: row.get(4)?,
            })
        },
    )?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn query_group_members(conn: &Connection, site_course_id: i64) -> StoreResult<Vec<GroupMemberRow>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, g.id, u.id, u.username, TRIM(c.idnumber, ' ' || char(9, 10, 11, 12, 13)) AS vle_course_id, TRIM(g.idnumber, ' ' || char(9, 10, 11, 12, 13)) AS vle_group_id
         FROM course_groups g
         INNER JOIN courses c
            ON c.id = g.course_id
         INNER JOIN group_members gm
            ON gm.group_id = g.id
         INNER JOIN users u
            ON gm.user_id = u.id
            AND u.deleted = 0
         WHERE c.id != ?1
            AND LENGTH(TRIM(c.idnumber, ' ' || char(9, 10, 11, 12, 13))) > 0
            AND LENGTH(TRIM(g.idnumber, ' ' || char(9, 10, 11, 12, 13))) > 0
         ORDER BY vle_course_id, vle_group_id, u.username, g.id",
    )?;
    let rows = stmt.query_map(params![site_course_id], |row| {
        Ok(GroupMemberRow {
            course_id: row.get(0)?,
            group_id: row.get(1)?,
            user_id: row.get(2)?,
            username: row.get(3)?,
            vle_course_id: row.get(4)?,
            vle_group_id: row.get(5)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
