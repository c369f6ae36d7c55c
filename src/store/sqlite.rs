use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        register_functions(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database, mostly useful in tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        register_functions(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

/// `fold(text)` lowercases with full Unicode rules; SQLite's `lower()` only
/// folds ASCII.
fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "fold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|v| v.to_lowercase()))
        },
    )?;
    Ok(())
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

/// Fixed-width UTC timestamps so that text ordering matches time ordering.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_code<T: FromStr<Err = String>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn parse_json<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn opt_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    Ok(row.get::<_, Option<String>>(idx)?.map(|s| parse_datetime(&s)))
}

const USER_COLUMNS: &str =
    "id, email, password_hash, status, created_at, updated_at, last_login_at, last_seen_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        status: parse_code(row, 3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        updated_at: parse_datetime(&row.get::<_, String>(5)?),
        last_login_at: opt_datetime(row, 6)?,
        last_seen_at: opt_datetime(row, 7)?,
    })
}

const PROFILE_COLUMNS: &str = "user_id, first_name, last_name, phone, school, grade_level, \
     birth_date, gender, bio, avatar_media_id";

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        user_id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        phone: row.get(3)?,
        school: row.get(4)?,
        grade_level: row.get(5)?,
        birth_date: row
            .get::<_, Option<String>>(6)?
            .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        gender: row.get(7)?,
        bio: row.get(8)?,
        avatar_media_id: row.get(9)?,
    })
}

const GROUP_COLUMNS: &str =
    "id, name, description, grade, year, visibility, teacher_id, created_at, updated_at";

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        grade: row.get(3)?,
        year: row.get(4)?,
        visibility: parse_code(row, 5)?,
        teacher_id: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        updated_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

const MEMBER_COLUMNS: &str = "id, group_id, user_id, member_role, status, joined_at, updated_at";

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<GroupMember> {
    Ok(GroupMember {
        id: row.get(0)?,
        group_id: row.get(1)?,
        user_id: row.get(2)?,
        member_role: parse_code(row, 3)?,
        status: parse_code(row, 4)?,
        joined_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

const CATEGORY_COLUMNS: &str = "code, label, group_label, sort_order, group_order, created_at";

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<ResourceCategory> {
    Ok(ResourceCategory {
        code: row.get(0)?,
        label: row.get(1)?,
        group_label: row.get(2)?,
        sort_order: row.get(3)?,
        group_order: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

const ENTRY_COLUMNS: &str = "id, slug, category_code, author_id, title, summary, avatar_media_id, \
     content, tags, status, published_at, created_at, updated_at";

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<ResourceEntry> {
    Ok(ResourceEntry {
        id: row.get(0)?,
        slug: row.get(1)?,
        category_code: row.get(2)?,
        author_id: row.get(3)?,
        title: row.get(4)?,
        summary: row.get(5)?,
        avatar_media_id: row.get(6)?,
        content: parse_json(row, 7)?,
        tags: parse_json(row, 8)?,
        status: parse_code(row, 9)?,
        published_at: opt_datetime(row, 10)?,
        created_at: parse_datetime(&row.get::<_, String>(11)?),
        updated_at: parse_datetime(&row.get::<_, String>(12)?),
    })
}

const MEDIA_COLUMNS: &str = "id, owner_user_id, bucket, storage_key, filename, kind, \
     content_type, size_bytes, sha256, status, created_at";

fn media_from_row(row: &Row<'_>) -> rusqlite::Result<MediaAsset> {
    Ok(MediaAsset {
        id: row.get(0)?,
        owner_user_id: row.get(1)?,
        bucket: parse_code(row, 2)?,
        storage_key: row.get(3)?,
        filename: row.get(4)?,
        kind: parse_code(row, 5)?,
        content_type: row.get(6)?,
        size_bytes: row.get(7)?,
        sha256: row.get(8)?,
        status: parse_code(row, 9)?,
        created_at: parse_datetime(&row.get::<_, String>(10)?),
    })
}

const METRIC_COLUMNS: &str = "id, captured_at, heap_used_bytes, heap_max_bytes, \
     system_memory_total_bytes, system_memory_used_bytes, disk_total_bytes, disk_used_bytes, \
     process_cpu_load, system_cpu_load";

fn metric_from_row(row: &Row<'_>) -> rusqlite::Result<MetricSample> {
    Ok(MetricSample {
        id: row.get(0)?,
        captured_at: parse_datetime(&row.get::<_, String>(1)?),
        heap_used_bytes: row.get(2)?,
        heap_max_bytes: row.get(3)?,
        system_memory_total_bytes: row.get(4)?,
        system_memory_used_bytes: row.get(5)?,
        disk_total_bytes: row.get(6)?,
        disk_used_bytes: row.get(7)?,
        process_cpu_load: row.get(8)?,
        system_cpu_load: row.get(9)?,
    })
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_account(&self, user: &User, profile: &Profile, roles: &[Role]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let now = format_datetime(&user.created_at);

        tx.execute(
            "INSERT INTO users (id, email, password_hash, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id,
                user.email,
                user.password_hash,
                user.status.as_str(),
                now,
                format_datetime(&user.updated_at),
            ],
        )?;

        tx.execute(
            "INSERT INTO user_profiles (user_id, first_name, last_name, phone, school, grade_level,
                birth_date, gender, bio, avatar_media_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
            params![
                profile.user_id,
                profile.first_name,
                profile.last_name,
                profile.phone,
                profile.school,
                profile.grade_level,
                profile.birth_date.map(|d| d.format("%Y-%m-%d").to_string()),
                profile.gender,
                profile.bio,
                profile.avatar_media_id,
                now,
            ],
        )?;

        for role in roles {
            tx.execute(
                "INSERT OR IGNORE INTO user_roles (user_id, role, assigned_at) VALUES (?1, ?2, ?3)",
                params![user.id, role.as_str(), now],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                user_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_users(&self, search: Option<&str>, offset: i64, limit: i64) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE (?1 IS NULL OR email LIKE ?1 ESCAPE '\\')
             ORDER BY created_at DESC, id LIMIT ?2 OFFSET ?3"
        ))?;

        let rows = stmt.query_map(params![search, limit, offset], user_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_users(&self, search: Option<&str>) -> Result<i64> {
        self.conn()
            .query_row(
                "SELECT COUNT(*) FROM users WHERE (?1 IS NULL OR email LIKE ?1 ESCAPE '\\')",
                params![search],
                |row| row.get(0),
            )
            .map_err(Error::from)
    }

    fn update_user(&self, user: &User) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET password_hash = ?1, status = ?2, updated_at = ?3,
                last_login_at = ?4, last_seen_at = ?5
             WHERE id = ?6",
            params![
                user.password_hash,
                user.status.as_str(),
                format_datetime(&user.updated_at),
                user.last_login_at.as_ref().map(format_datetime),
                user.last_seen_at.as_ref().map(format_datetime),
                user.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::not_found("User not found"));
        }
        Ok(())
    }

    fn delete_user(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Profile operations

    fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        self.conn()
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE user_id = ?1"),
                params![user_id],
                profile_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        let now = format_datetime(&Utc::now());
        self.conn().execute(
            "INSERT INTO user_profiles (user_id, first_name, last_name, phone, school, grade_level,
                birth_date, gender, bio, avatar_media_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
             ON CONFLICT(user_id) DO UPDATE SET
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                phone = excluded.phone,
                school = excluded.school,
                grade_level = excluded.grade_level,
                birth_date = excluded.birth_date,
                gender = excluded.gender,
                bio = excluded.bio,
                avatar_media_id = excluded.avatar_media_id,
                updated_at = excluded.updated_at",
            params![
                profile.user_id,
                profile.first_name,
                profile.last_name,
                profile.phone,
                profile.school,
                profile.grade_level,
                profile.birth_date.map(|d| d.format("%Y-%m-%d").to_string()),
                profile.gender,
                profile.bio,
                profile.avatar_media_id,
                now,
            ],
        )?;
        Ok(())
    }

    // Role operations

    fn list_user_roles(&self, user_id: &str) -> Result<Vec<Role>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT role FROM user_roles WHERE user_id = ?1 ORDER BY assigned_at, role",
        )?;

        let rows = stmt.query_map(params![user_id], |row| parse_code(row, 0))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn add_user_role(&self, user_id: &str, role: Role) -> Result<bool> {
        let rows = self.conn().execute(
            "INSERT OR IGNORE INTO user_roles (user_id, role, assigned_at) VALUES (?1, ?2, ?3)",
            params![user_id, role.as_str(), format_datetime(&Utc::now())],
        )?;
        Ok(rows > 0)
    }

    fn remove_user_role(&self, user_id: &str, role: Role) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM user_roles WHERE user_id = ?1 AND role = ?2",
            params![user_id, role.as_str()],
        )?;
        Ok(rows > 0)
    }

    // Group operations

    fn create_group(&self, group: &Group) -> Result<()> {
        self.conn().execute(
            "INSERT INTO groups (id, name, description, grade, year, visibility, teacher_id,
                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                group.id,
                group.name,
                group.description,
                group.grade,
                group.year,
                group.visibility.as_str(),
                group.teacher_id,
                format_datetime(&group.created_at),
                format_datetime(&group.updated_at),
            ],
        )?;
        Ok(())
    }

    fn insert_system_group(&self, group: &Group) -> Result<bool> {
        let rows = self.conn().execute(
            "INSERT OR IGNORE INTO groups (id, name, description, grade, year, visibility,
                teacher_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, NULL, NULL, 'SYSTEM', NULL, ?4, ?5)",
            params![
                group.id,
                group.name,
                group.description,
                format_datetime(&group.created_at),
                format_datetime(&group.updated_at),
            ],
        )?;
        Ok(rows > 0)
    }

    fn get_system_group(&self, name: &str) -> Result<Option<Group>> {
        self.conn()
            .query_row(
                &format!(
                    "SELECT {GROUP_COLUMNS} FROM groups WHERE name = ?1 AND visibility = 'SYSTEM'"
                ),
                params![name],
                group_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn get_group(&self, id: &str) -> Result<Option<Group>> {
        self.conn()
            .query_row(
                &format!("SELECT {GROUP_COLUMNS} FROM groups WHERE id = ?1"),
                params![id],
                group_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_groups(&self, offset: i64, limit: i64) -> Result<Vec<Group>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups ORDER BY visibility DESC, name, id
             LIMIT ?1 OFFSET ?2"
        ))?;

        let rows = stmt.query_map(params![limit, offset], group_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_groups(&self) -> Result<i64> {
        self.conn()
            .query_row("SELECT COUNT(*) FROM groups", [], |row| row.get(0))
            .map_err(Error::from)
    }

    fn update_group(&self, group: &Group) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE groups SET name = ?1, description = ?2, grade = ?3, year = ?4,
                teacher_id = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                group.name,
                group.description,
                group.grade,
                group.year,
                group.teacher_id,
                format_datetime(&group.updated_at),
                group.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::not_found("Group not found"));
        }
        Ok(())
    }

    fn delete_group(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM groups WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Group member operations

    fn add_group_member(&self, member: &GroupMember) -> Result<bool> {
        let rows = self.conn().execute(
            "INSERT OR IGNORE INTO group_members (id, group_id, user_id, member_role, status,
                joined_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                member.id,
                member.group_id,
                member.user_id,
                member.member_role.as_str(),
                member.status.as_str(),
                format_datetime(&member.joined_at),
                format_datetime(&member.updated_at),
            ],
        )?;
        Ok(rows > 0)
    }

    fn get_group_member(&self, group_id: &str, user_id: &str) -> Result<Option<GroupMember>> {
        self.conn()
            .query_row(
                &format!(
                    "SELECT {MEMBER_COLUMNS} FROM group_members WHERE group_id = ?1 AND user_id = ?2"
                ),
                params![group_id, user_id],
                member_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn update_member_role(&self, group_id: &str, user_id: &str, role: MemberRole) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE group_members SET member_role = ?1, updated_at = ?2
             WHERE group_id = ?3 AND user_id = ?4",
            params![
                role.as_str(),
                format_datetime(&Utc::now()),
                group_id,
                user_id
            ],
        )?;

        if rows == 0 {
            return Err(Error::not_found("Member not found"));
        }
        Ok(())
    }

    fn remove_group_member(&self, group_id: &str, user_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM group_members WHERE group_id = ?1 AND user_id = ?2",
            params![group_id, user_id],
        )?;
        Ok(rows > 0)
    }

    fn list_group_members(&self, group_id: &str) -> Result<Vec<GroupMemberEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT m.user_id, u.email, m.member_role
             FROM group_members m
             JOIN users u ON u.id = m.user_id
             WHERE m.group_id = ?1
             ORDER BY m.joined_at, u.email",
        )?;

        let rows = stmt.query_map(params![group_id], |row| {
            Ok(GroupMemberEntry {
                user_id: row.get(0)?,
                email: row.get(1)?,
                member_role: parse_code(row, 2)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_user_group_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT m.group_id
             FROM group_members m
             JOIN groups g ON g.id = m.group_id
             WHERE m.user_id = ?1
             ORDER BY g.name",
        )?;

        let rows = stmt.query_map(params![user_id], |row| row.get(0))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Resource category operations

    fn create_category(&self, category: &ResourceCategory) -> Result<()> {
        self.conn().execute(
            "INSERT INTO resource_categories (code, label, group_label, sort_order, group_order,
                created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                category.code,
                category.label,
                category.group_label,
                category.sort_order,
                category.group_order,
                format_datetime(&category.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_category(&self, code: &str) -> Result<Option<ResourceCategory>> {
        self.conn()
            .query_row(
                &format!("SELECT {CATEGORY_COLUMNS} FROM resource_categories WHERE code = ?1"),
                params![code],
                category_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_categories(&self) -> Result<Vec<ResourceCategory>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM resource_categories
             ORDER BY group_order, sort_order, code"
        ))?;

        let rows = stmt.query_map([], category_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_categories_in_group(&self, group_label: &str) -> Result<Vec<ResourceCategory>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM resource_categories WHERE group_label = ?1
             ORDER BY sort_order, code"
        ))?;

        let rows = stmt.query_map(params![group_label], category_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_category(&self, category: &ResourceCategory) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE resource_categories SET label = ?1, group_label = ?2, sort_order = ?3,
                group_order = ?4
             WHERE code = ?5",
            params![
                category.label,
                category.group_label,
                category.sort_order,
                category.group_order,
                category.code,
            ],
        )?;

        if rows == 0 {
            return Err(Error::not_found("Category not found"));
        }
        Ok(())
    }

    fn delete_category(&self, code: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM resource_categories WHERE code = ?1", params![code])?;
        Ok(rows > 0)
    }

    fn max_group_order(&self) -> Result<Option<i64>> {
        self.conn()
            .query_row("SELECT MAX(group_order) FROM resource_categories", [], |row| {
                row.get(0)
            })
            .map_err(Error::from)
    }

    fn max_sort_order(&self, group_label: &str) -> Result<Option<i64>> {
        self.conn()
            .query_row(
                "SELECT MAX(sort_order) FROM resource_categories WHERE group_label = ?1",
                params![group_label],
                |row| row.get(0),
            )
            .map_err(Error::from)
    }

    fn relabel_category_group(
        &self,
        current: &str,
        new_label: &str,
        group_order: i64,
    ) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let rows = tx.execute(
            "UPDATE resource_categories SET group_label = ?1, group_order = ?2
             WHERE group_label = ?3",
            params![new_label, group_order, current],
        )?;

        tx.commit()?;
        Ok(rows)
    }

    // Resource entry operations

    fn create_entry(&self, entry: &ResourceEntry) -> Result<()> {
        let content = serde_json::to_string(&entry.content)?;
        let tags = serde_json::to_string(&entry.tags)?;
        self.conn().execute(
            &format!(
                "INSERT INTO resource_entries ({ENTRY_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
            ),
            params![
                entry.id,
                entry.slug,
                entry.category_code,
                entry.author_id,
                entry.title,
                entry.summary,
                entry.avatar_media_id,
                content,
                tags,
                entry.status.as_str(),
                entry.published_at.as_ref().map(format_datetime),
                format_datetime(&entry.created_at),
                format_datetime(&entry.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_entry(&self, id: &str) -> Result<Option<ResourceEntry>> {
        self.conn()
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM resource_entries WHERE id = ?1"),
                params![id],
                entry_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn get_entry_by_slug(&self, slug: &str) -> Result<Option<ResourceEntry>> {
        self.conn()
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM resource_entries WHERE slug = ?1"),
                params![slug],
                entry_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn update_entry(&self, entry: &ResourceEntry) -> Result<()> {
        let content = serde_json::to_string(&entry.content)?;
        let tags = serde_json::to_string(&entry.tags)?;
        let rows = self.conn().execute(
            "UPDATE resource_entries SET category_code = ?1, title = ?2, summary = ?3,
                avatar_media_id = ?4, content = ?5, tags = ?6, status = ?7, published_at = ?8,
                updated_at = ?9
             WHERE id = ?10",
            params![
                entry.category_code,
                entry.title,
                entry.summary,
                entry.avatar_media_id,
                content,
                tags,
                entry.status.as_str(),
                entry.published_at.as_ref().map(format_datetime),
                format_datetime(&entry.updated_at),
                entry.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::not_found("Resource not found"));
        }
        Ok(())
    }

    fn delete_entry(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM resource_entries WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn count_category_entries(&self, category_code: &str) -> Result<i64> {
        self.conn()
            .query_row(
                "SELECT COUNT(*) FROM resource_entries WHERE category_code = ?1",
                params![category_code],
                |row| row.get(0),
            )
            .map_err(Error::from)
    }

    fn list_entries(&self, author_id: Option<&str>) -> Result<Vec<ResourceEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM resource_entries
             WHERE (?1 IS NULL OR author_id = ?1)
             ORDER BY created_at DESC, id"
        ))?;

        let rows = stmt.query_map(params![author_id], entry_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_published(
        &self,
        category_code: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ResourceEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM resource_entries
             WHERE status = 'PUBLISHED' AND (?1 IS NULL OR category_code = ?1)
             ORDER BY published_at DESC, id LIMIT ?2 OFFSET ?3"
        ))?;

        let rows = stmt.query_map(params![category_code, limit, offset], entry_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_published(&self, category_code: Option<&str>) -> Result<i64> {
        self.conn()
            .query_row(
                "SELECT COUNT(*) FROM resource_entries
                 WHERE status = 'PUBLISHED' AND (?1 IS NULL OR category_code = ?1)",
                params![category_code],
                |row| row.get(0),
            )
            .map_err(Error::from)
    }

    fn search_published(&self, pattern: &str, limit: i64) -> Result<Vec<ResourceEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM resource_entries
             WHERE status = 'PUBLISHED'
               AND (fold(title) LIKE ?1 ESCAPE '\\'
                    OR fold(summary) LIKE ?1 ESCAPE '\\'
                    OR fold(tags) LIKE ?1 ESCAPE '\\')
             ORDER BY published_at DESC, id LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![pattern, limit], entry_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Media operations

    fn create_media_asset(&self, asset: &MediaAsset) -> Result<()> {
        self.conn().execute(
            &format!(
                "INSERT INTO media_assets ({MEDIA_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ),
            params![
                asset.id,
                asset.owner_user_id,
                asset.bucket.as_str(),
                asset.storage_key,
                asset.filename,
                asset.kind.as_str(),
                asset.content_type,
                asset.size_bytes,
                asset.sha256,
                asset.status.as_str(),
                format_datetime(&asset.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_media_asset(&self, id: &str) -> Result<Option<MediaAsset>> {
        self.conn()
            .query_row(
                &format!("SELECT {MEDIA_COLUMNS} FROM media_assets WHERE id = ?1"),
                params![id],
                media_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn delete_media_asset(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM media_assets WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Metric sample operations

    fn insert_metric_sample(&self, sample: &MetricSample) -> Result<()> {
        self.conn().execute(
            &format!(
                "INSERT INTO server_metric_samples ({METRIC_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                sample.id,
                format_datetime(&sample.captured_at),
                sample.heap_used_bytes,
                sample.heap_max_bytes,
                sample.system_memory_total_bytes,
                sample.system_memory_used_bytes,
                sample.disk_total_bytes,
                sample.disk_used_bytes,
                sample.process_cpu_load,
                sample.system_cpu_load,
            ],
        )?;
        Ok(())
    }

    fn list_recent_metric_samples(&self, limit: i64) -> Result<Vec<MetricSample>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {METRIC_COLUMNS} FROM server_metric_samples
             ORDER BY captured_at DESC, rowid DESC LIMIT ?1"
        ))?;

        let rows = stmt.query_map(params![limit], metric_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Site visit operations

    fn create_site_visit(&self, visit: &SiteVisit) -> Result<()> {
        self.conn().execute(
            "INSERT INTO site_visits (id, ip_address, user_agent, path, referrer, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                visit.id,
                visit.ip_address,
                visit.user_agent,
                visit.path,
                visit.referrer,
                format_datetime(&visit.created_at),
            ],
        )?;
        Ok(())
    }

    fn count_site_visits(&self) -> Result<i64> {
        self.conn()
            .query_row("SELECT COUNT(*) FROM site_visits", [], |row| row.get(0))
            .map_err(Error::from)
    }
}
