//! Account administration.

use std::collections::HashSet;

use chrono::Utc;
use uuid::Uuid;

use super::accounts::{ProfileInput, apply_profile, check_password, normalize_email};
use super::directory::{ensure_membership, revoke_membership};
use super::media::delete_asset;
use crate::auth::PasswordHasher;
use crate::error::{Error, Result};
use crate::media::MediaStorage;
use crate::store::Store;
use crate::types::{Profile, Role, User, UserStatus};

pub const MAX_PAGE_SIZE: i64 = 100;

/// A user with the profile and roles shown in admin listings.
#[derive(Debug, Clone)]
pub struct UserSummary {
    pub user: User,
    pub profile: Profile,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone)]
pub struct UserPage {
    pub items: Vec<UserSummary>,
    pub total: i64,
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub status: Option<UserStatus>,
    pub roles: Vec<String>,
    pub profile: ProfileInput,
}

#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub email: String,
    pub status: Option<UserStatus>,
    pub roles: Vec<String>,
    pub profile: ProfileInput,
}

/// Known role codes in the given order, STUDENT when none are usable.
fn requested_roles(codes: &[String]) -> Vec<Role> {
    let mut roles = Vec::new();
    for role in codes.iter().filter_map(|c| Role::parse(c)) {
        if !roles.contains(&role) {
            roles.push(role);
        }
    }
    if roles.is_empty() {
        roles.push(Role::Student);
    }
    roles
}

fn parse_role(code: &str) -> Result<Role> {
    Role::parse(code).ok_or_else(|| Error::not_found("Role not found"))
}

fn require_user(store: &dyn Store, user_id: &str) -> Result<User> {
    store
        .get_user(user_id)?
        .ok_or_else(|| Error::not_found("User not found"))
}

pub fn load_summary(store: &dyn Store, user: User) -> Result<UserSummary> {
    let profile = store
        .get_profile(&user.id)?
        .unwrap_or_else(|| Profile::empty(&user.id));
    let roles = store.list_user_roles(&user.id)?;
    Ok(UserSummary {
        user,
        profile,
        roles,
    })
}

pub fn get_user(store: &dyn Store, user_id: &str) -> Result<UserSummary> {
    let user = require_user(store, user_id)?;
    load_summary(store, user)
}

/// Newest accounts first; `search` matches anywhere in the email.
pub fn list_users(
    store: &dyn Store,
    page: i64,
    page_size: i64,
    search: Option<&str>,
) -> Result<UserPage> {
    let page = page.max(1);
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    let pattern = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let escaped = s
                .to_lowercase()
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("%{escaped}%")
        });

    let users = store.list_users(pattern.as_deref(), (page - 1) * page_size, page_size)?;
    let items = users
        .into_iter()
        .map(|u| load_summary(store, u))
        .collect::<Result<Vec<_>>>()?;

    Ok(UserPage {
        items,
        total: store.count_users(pattern.as_deref())?,
    })
}

pub fn create_user(store: &dyn Store, hasher: &PasswordHasher, input: NewUser) -> Result<UserSummary> {
    let email = normalize_email(&input.email)?;
    check_password(&input.password)?;
    if store.get_user_by_email(&email)?.is_some() {
        return Err(Error::bad_request("User already exists"));
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email,
        password_hash: hasher.hash(&input.password)?,
        status: input.status.unwrap_or(UserStatus::Active),
        created_at: now,
        updated_at: now,
        last_login_at: None,
        last_seen_at: None,
    };
    let mut profile = Profile::empty(&user.id);
    apply_profile(&mut profile, input.profile)?;
    let roles = requested_roles(&input.roles);

    store.create_account(&user, &profile, &roles)?;
    for role in &roles {
        ensure_membership(store, &user.id, *role)?;
    }

    tracing::info!("Admin created {} with roles {:?}", user.email, roles);
    load_summary(store, user)
}

/// Updates status, profile and roles. Role changes are mirrored in the
/// SYSTEM groups. The avatar is kept.
pub fn update_user(store: &dyn Store, user_id: &str, input: UserUpdate) -> Result<UserSummary> {
    let mut user = require_user(store, user_id)?;
    if user.email != input.email.trim().to_lowercase() {
        return Err(Error::bad_request("Email cannot be changed"));
    }

    let mut profile = store
        .get_profile(&user.id)?
        .unwrap_or_else(|| Profile::empty(&user.id));
    apply_profile(&mut profile, input.profile)?;

    if let Some(status) = input.status {
        user.status = status;
    }
    user.updated_at = Utc::now();
    store.update_user(&user)?;
    store.upsert_profile(&profile)?;

    let desired: HashSet<Role> = requested_roles(&input.roles).into_iter().collect();
    let current: HashSet<Role> = store.list_user_roles(&user.id)?.into_iter().collect();

    for role in desired.difference(&current) {
        store.add_user_role(&user.id, *role)?;
        ensure_membership(store, &user.id, *role)?;
    }
    for role in current.difference(&desired) {
        store.remove_user_role(&user.id, *role)?;
        revoke_membership(store, &user.id, *role)?;
    }

    load_summary(store, user)
}

/// Grants a role; granting a held role changes nothing.
pub fn assign_role(store: &dyn Store, user_id: &str, code: &str) -> Result<()> {
    let role = parse_role(code)?;
    require_user(store, user_id)?;
    if store.add_user_role(user_id, role)? {
        tracing::info!("Granted {role} to {user_id}");
    }
    ensure_membership(store, user_id, role)
}

pub fn revoke_role(store: &dyn Store, user_id: &str, code: &str) -> Result<()> {
    let role = parse_role(code)?;
    require_user(store, user_id)?;
    if store.remove_user_role(user_id, role)? {
        tracing::info!("Revoked {role} from {user_id}");
    }
    revoke_membership(store, user_id, role)
}

pub async fn delete_user(store: &dyn Store, storage: &MediaStorage, user_id: &str) -> Result<()> {
    let summary = get_user(store, user_id)?;
    if let Some(avatar) = &summary.profile.avatar_media_id {
        delete_asset(store, storage, avatar).await?;
    }
    store.delete_user(user_id)?;

    tracing::info!("Admin deleted {}", summary.user.email);
    Ok(())
}
