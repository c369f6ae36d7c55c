//! Who holds which global role, and who belongs to which group.
//!
//! Every global role is mirrored by one SYSTEM group whose members are the
//! role's holders. Provisioning relies on the partial unique index over
//! SYSTEM group names, so concurrent callers converge on the same row.

use chrono::Utc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Group, GroupMember, GroupVisibility, MemberRole, MemberStatus, Role};

#[must_use]
pub fn role_group_name(role: Role) -> String {
    format!("Role: {}", role.as_str())
}

/// Returns the SYSTEM group for `role`, creating it when absent.
pub fn ensure_role_group(store: &dyn Store, role: Role) -> Result<Group> {
    let name = role_group_name(role);
    if let Some(group) = store.get_system_group(&name)? {
        return Ok(group);
    }

    let now = Utc::now();
    let group = Group {
        id: Uuid::new_v4().to_string(),
        name: name.clone(),
        description: Some(format!("System generated group for role {}", role.as_str())),
        grade: None,
        year: None,
        visibility: GroupVisibility::System,
        teacher_id: None,
        created_at: now,
        updated_at: now,
    };

    if store.insert_system_group(&group)? {
        tracing::info!("Provisioned role group {name}");
        return Ok(group);
    }

    // Another caller won the race; return its row.
    store
        .get_system_group(&name)?
        .ok_or_else(|| Error::not_found(format!("Role group {name} disappeared")))
}

/// Startup reconciliation: one SYSTEM group per role.
pub fn ensure_all_role_groups(store: &dyn Store) -> Result<Vec<Group>> {
    Role::ALL
        .iter()
        .map(|role| ensure_role_group(store, *role))
        .collect()
}

/// Adds the user to the role's SYSTEM group. No-op when already a member.
pub fn ensure_membership(store: &dyn Store, user_id: &str, role: Role) -> Result<()> {
    let group = ensure_role_group(store, role)?;
    let now = Utc::now();
    let member = GroupMember {
        id: Uuid::new_v4().to_string(),
        group_id: group.id,
        user_id: user_id.to_string(),
        member_role: role.member_role(),
        status: MemberStatus::Active,
        joined_at: now,
        updated_at: now,
    };

    if store.add_group_member(&member)? {
        tracing::debug!("Added {user_id} to {}", group.name);
    }
    Ok(())
}

/// Re-derives SYSTEM memberships from the roles the user currently holds.
pub fn ensure_user_memberships(store: &dyn Store, user_id: &str) -> Result<()> {
    for role in store.list_user_roles(user_id)? {
        ensure_membership(store, user_id, role)?;
    }
    Ok(())
}

/// Removes the user from the role's SYSTEM group.
pub fn revoke_membership(store: &dyn Store, user_id: &str, role: Role) -> Result<()> {
    if let Some(group) = store.get_system_group(&role_group_name(role))? {
        store.remove_group_member(&group.id, user_id)?;
    }
    Ok(())
}

pub fn is_member(store: &dyn Store, group_id: &str, user_id: &str) -> Result<bool> {
    Ok(store.get_group_member(group_id, user_id)?.is_some())
}

pub fn is_teacher_in_group(store: &dyn Store, group_id: &str, user_id: &str) -> Result<bool> {
    Ok(store
        .get_group_member(group_id, user_id)?
        .is_some_and(|m| m.member_role == MemberRole::Teacher))
}

pub fn user_roles(store: &dyn Store, user_id: &str) -> Result<Vec<Role>> {
    store.list_user_roles(user_id)
}

pub fn has_role(store: &dyn Store, user_id: &str, role: Role) -> Result<bool> {
    Ok(user_roles(store, user_id)?.contains(&role))
}
