//! Group CRUD with per-group authority.
//!
//! A global TEACHER role grants nothing here: a teacher manages a group only
//! while holding the TEACHER in-group role in that group.

use chrono::Utc;
use uuid::Uuid;

use super::Actor;
use super::directory::{is_member, is_teacher_in_group};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Group, GroupMember, GroupMemberEntry, GroupVisibility, MemberRole, MemberStatus};

#[derive(Debug, Clone)]
pub struct GroupView {
    pub group: Group,
    pub members: Vec<GroupMemberEntry>,
}

#[derive(Debug, Clone)]
pub struct GroupPage {
    pub items: Vec<Group>,
    pub total: i64,
}

fn parse_member_role(role: &str) -> Result<MemberRole> {
    MemberRole::parse(role).ok_or_else(|| Error::bad_request("Invalid member role"))
}

fn require_group(store: &dyn Store, group_id: &str) -> Result<Group> {
    store
        .get_group(group_id)?
        .ok_or_else(|| Error::not_found("Group not found"))
}

fn require_manager(store: &dyn Store, group_id: &str, actor: &Actor) -> Result<()> {
    if actor.is_admin || is_teacher_in_group(store, group_id, &actor.user_id)? {
        Ok(())
    } else {
        Err(Error::forbidden("Teacher can manage only own groups"))
    }
}

/// Role groups are owned by the directory and mirror role holders.
fn require_private(group: &Group) -> Result<()> {
    if group.visibility == GroupVisibility::System {
        return Err(Error::forbidden("System groups cannot be modified"));
    }
    Ok(())
}

fn clean_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::bad_request("Name is required"));
    }
    Ok(name.to_string())
}

pub fn create_group(
    store: &dyn Store,
    name: &str,
    grade: Option<i32>,
    year: Option<i32>,
    actor: &Actor,
) -> Result<Group> {
    if !actor.is_admin {
        return Err(Error::forbidden("Only ADMIN can create groups"));
    }
    let name = clean_name(name)?;

    let now = Utc::now();
    let group = Group {
        id: Uuid::new_v4().to_string(),
        name,
        description: None,
        grade,
        year,
        visibility: GroupVisibility::Private,
        teacher_id: None,
        created_at: now,
        updated_at: now,
    };
    store.create_group(&group)?;

    tracing::info!("Created group {} ({})", group.name, group.id);
    Ok(group)
}

/// Renames and re-grades a group. `grade` and `year` are replaced as given.
/// SYSTEM groups are refused.
pub fn update_group(
    store: &dyn Store,
    group_id: &str,
    name: Option<&str>,
    grade: Option<i32>,
    year: Option<i32>,
    actor: &Actor,
) -> Result<Group> {
    if !actor.is_admin && !is_teacher_in_group(store, group_id, &actor.user_id)? {
        return Err(Error::forbidden("Not allowed"));
    }
    let mut group = require_group(store, group_id)?;
    require_private(&group)?;

    if let Some(name) = name {
        group.name = clean_name(name)?;
    }
    group.grade = grade;
    group.year = year;
    group.updated_at = Utc::now();
    store.update_group(&group)?;

    Ok(group)
}

pub fn delete_group(store: &dyn Store, group_id: &str, actor: &Actor) -> Result<()> {
    if !actor.is_admin {
        return Err(Error::forbidden("Only ADMIN can delete groups"));
    }
    let group = require_group(store, group_id)?;
    require_private(&group)?;
    store.delete_group(&group.id)?;

    tracing::info!("Deleted group {group_id}");
    Ok(())
}

/// Adds a member. Admins may change an existing member's role in place; for
/// a teacher an existing membership is left untouched.
pub fn add_member(
    store: &dyn Store,
    group_id: &str,
    user_id: &str,
    role: &str,
    actor: &Actor,
) -> Result<()> {
    let role = parse_member_role(role)?;
    if !actor.is_admin {
        require_manager(store, group_id, actor)?;
        if role == MemberRole::Teacher {
            return Err(Error::forbidden("Teacher cannot grant TEACHER role"));
        }
    }

    let group = require_group(store, group_id)?;
    if store.get_user(user_id)?.is_none() {
        return Err(Error::not_found("User not found"));
    }

    if let Some(existing) = store.get_group_member(&group.id, user_id)? {
        if actor.is_admin && existing.member_role != role {
            store.update_member_role(&group.id, user_id, role)?;
        }
        return Ok(());
    }

    let now = Utc::now();
    store.add_group_member(&GroupMember {
        id: Uuid::new_v4().to_string(),
        group_id: group.id,
        user_id: user_id.to_string(),
        member_role: role,
        status: MemberStatus::Active,
        joined_at: now,
        updated_at: now,
    })?;
    Ok(())
}

pub fn remove_member(store: &dyn Store, group_id: &str, user_id: &str, actor: &Actor) -> Result<()> {
    let member = store
        .get_group_member(group_id, user_id)?
        .ok_or_else(|| Error::not_found("Member not found"))?;

    if !actor.is_admin {
        require_manager(store, group_id, actor)?;
        if member.member_role != MemberRole::Student {
            return Err(Error::forbidden("Teacher can remove only students"));
        }
    }

    store.remove_group_member(group_id, user_id)?;
    Ok(())
}

pub fn get_group_view(store: &dyn Store, group_id: &str, actor: &Actor) -> Result<GroupView> {
    if !actor.is_admin && !is_member(store, group_id, &actor.user_id)? {
        return Err(Error::forbidden("Not allowed"));
    }
    let group = require_group(store, group_id)?;
    let members = store.list_group_members(&group.id)?;
    Ok(GroupView { group, members })
}

/// Every group the actor belongs to, with its member list.
pub fn my_groups(store: &dyn Store, actor: &Actor) -> Result<Vec<GroupView>> {
    // Membership was just established, so the view check is skipped.
    let elevated = Actor::admin(&actor.user_id);
    store
        .list_user_group_ids(&actor.user_id)?
        .iter()
        .map(|group_id| get_group_view(store, group_id, &elevated))
        .collect()
}

pub fn list_groups(store: &dyn Store, page: i64, size: i64) -> Result<GroupPage> {
    let page = page.max(1);
    let size = size.clamp(1, 100);
    Ok(GroupPage {
        items: store.list_groups((page - 1) * size, size)?,
        total: store.count_groups()?,
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::service::directory::{ensure_membership, ensure_role_group};
    use crate::store::SqliteStore;
    use crate::types::{Profile, Role, User, UserStatus};

    struct Fixture {
        _temp: TempDir,
        store: SqliteStore,
        group_id: String,
    }

    fn create_user(store: &dyn Store, id: &str) {
        let now = Utc::now();
        let user = User {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            password_hash: "hash".to_string(),
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
            last_login_at: None,
            last_seen_at: None,
        };
        store
            .create_account(&user, &Profile::empty(id), &[Role::Student])
            .unwrap();
    }

    /// Group "9A" with `teacher` (TEACHER) and `pupil` (STUDENT); `other` and
    /// `outsider` exist but are not members.
    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();

        for id in ["admin", "teacher", "co-teacher", "pupil", "other", "outsider"] {
            create_user(&store, id);
        }

        let admin = Actor::admin("admin");
        let group = create_group(&store, "9A", Some(9), Some(2024), &admin).unwrap();
        add_member(&store, &group.id, "teacher", "TEACHER", &admin).unwrap();
        add_member(&store, &group.id, "co-teacher", "teacher", &admin).unwrap();
        add_member(&store, &group.id, "pupil", "STUDENT", &admin).unwrap();

        Fixture {
            _temp: temp,
            store,
            group_id: group.id,
        }
    }

    fn role_of(f: &Fixture, user_id: &str) -> Option<MemberRole> {
        f.store
            .get_group_member(&f.group_id, user_id)
            .unwrap()
            .map(|m| m.member_role)
    }

    #[test]
    fn test_create_requires_admin_and_name() {
        let f = fixture();
        assert!(matches!(
            create_group(&f.store, "X", None, None, &Actor::member("teacher")),
            Err(Error::Forbidden(_))
        ));
        assert!(matches!(
            create_group(&f.store, "   ", None, None, &Actor::admin("admin")),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn test_teacher_adds_student_but_cannot_grant_teacher() {
        let f = fixture();
        let teacher = Actor::member("teacher");

        add_member(&f.store, &f.group_id, "other", "STUDENT", &teacher).unwrap();
        assert_eq!(role_of(&f, "other"), Some(MemberRole::Student));

        assert!(matches!(
            add_member(&f.store, &f.group_id, "outsider", "TEACHER", &teacher),
            Err(Error::Forbidden(_))
        ));

        // Re-adding an existing member never escalates.
        add_member(&f.store, &f.group_id, "pupil", "ADMIN", &teacher).unwrap();
        assert_eq!(role_of(&f, "pupil"), Some(MemberRole::Student));
    }

    #[test]
    fn test_admin_upgrades_in_place() {
        let f = fixture();
        let admin = Actor::admin("admin");

        add_member(&f.store, &f.group_id, "pupil", "TEACHER", &admin).unwrap();
        assert_eq!(role_of(&f, "pupil"), Some(MemberRole::Teacher));
        assert_eq!(f.store.list_group_members(&f.group_id).unwrap().len(), 3);
    }

    #[test]
    fn test_invalid_role_and_unknown_targets() {
        let f = fixture();
        let admin = Actor::admin("admin");

        assert!(matches!(
            add_member(&f.store, &f.group_id, "other", "PRINCIPAL", &admin),
            Err(Error::BadRequest(_))
        ));
        assert!(matches!(
            add_member(&f.store, &f.group_id, "ghost", "STUDENT", &admin),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            add_member(&f.store, "missing", "other", "STUDENT", &admin),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_non_member_teacher_cannot_manage() {
        let f = fixture();
        let outsider = Actor::member("outsider");

        assert!(matches!(
            add_member(&f.store, &f.group_id, "other", "STUDENT", &outsider),
            Err(Error::Forbidden(_))
        ));
        assert!(matches!(
            update_group(&f.store, &f.group_id, Some("X"), None, None, &outsider),
            Err(Error::Forbidden(_))
        ));
        // A STUDENT member is not a manager either.
        assert!(matches!(
            update_group(&f.store, &f.group_id, Some("X"), None, None, &Actor::member("pupil")),
            Err(Error::Forbidden(_))
        ));
    }

    #[test]
    fn test_teacher_removes_only_students() {
        let f = fixture();
        let teacher = Actor::member("teacher");

        assert!(matches!(
            remove_member(&f.store, &f.group_id, "co-teacher", &teacher),
            Err(Error::Forbidden(_))
        ));
        remove_member(&f.store, &f.group_id, "pupil", &teacher).unwrap();
        assert_eq!(role_of(&f, "pupil"), None);

        assert!(matches!(
            remove_member(&f.store, &f.group_id, "pupil", &teacher),
            Err(Error::NotFound(_))
        ));

        remove_member(&f.store, &f.group_id, "co-teacher", &Actor::admin("admin")).unwrap();
    }

    #[test]
    fn test_teacher_updates_own_group() {
        let f = fixture();
        let group = update_group(
            &f.store,
            &f.group_id,
            Some(" 10A "),
            Some(10),
            None,
            &Actor::member("teacher"),
        )
        .unwrap();

        assert_eq!(group.name, "10A");
        assert_eq!(group.grade, Some(10));
        assert_eq!(group.year, None);
    }

    #[test]
    fn test_view_requires_membership() {
        let f = fixture();

        let view = get_group_view(&f.store, &f.group_id, &Actor::member("pupil")).unwrap();
        assert_eq!(view.members.len(), 3);

        assert!(matches!(
            get_group_view(&f.store, &f.group_id, &Actor::member("outsider")),
            Err(Error::Forbidden(_))
        ));
        get_group_view(&f.store, &f.group_id, &Actor::admin("outsider")).unwrap();
    }

    #[test]
    fn test_my_groups_and_delete() {
        let f = fixture();

        let groups = my_groups(&f.store, &Actor::member("pupil")).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].group.name, "9A");

        assert!(matches!(
            delete_group(&f.store, &f.group_id, &Actor::member("teacher")),
            Err(Error::Forbidden(_))
        ));
        delete_group(&f.store, &f.group_id, &Actor::admin("admin")).unwrap();
        assert!(my_groups(&f.store, &Actor::member("pupil")).unwrap().is_empty());
        assert!(matches!(
            delete_group(&f.store, &f.group_id, &Actor::admin("admin")),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_role_groups_cannot_be_renamed_or_deleted() {
        let f = fixture();
        let role_group = ensure_role_group(&f.store, Role::Teacher).unwrap();
        ensure_membership(&f.store, "teacher", Role::Teacher).unwrap();

        assert!(matches!(
            update_group(&f.store, &role_group.id, Some("Mine"), None, None, &Actor::member("teacher")),
            Err(Error::Forbidden(_))
        ));
        assert!(matches!(
            update_group(&f.store, &role_group.id, Some("Mine"), None, None, &Actor::admin("admin")),
            Err(Error::Forbidden(_))
        ));
        assert!(matches!(
            delete_group(&f.store, &role_group.id, &Actor::admin("admin")),
            Err(Error::Forbidden(_))
        ));

        let again = ensure_role_group(&f.store, Role::Teacher).unwrap();
        assert_eq!(again.id, role_group.id);
        assert_eq!(again.name, "Role: TEACHER");
        assert!(is_member(&f.store, &again.id, "teacher").unwrap());
    }

    #[test]
    fn test_list_groups_pages() {
        let f = fixture();
        let admin = Actor::admin("admin");
        create_group(&f.store, "9B", None, None, &admin).unwrap();

        let page = list_groups(&f.store, 1, 1).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total, 2);
        assert_eq!(list_groups(&f.store, 2, 1).unwrap().items.len(), 1);
    }
}
