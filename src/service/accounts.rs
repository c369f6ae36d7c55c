//! Self-service account flows: registration, sessions, profile and password.

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use super::directory::ensure_user_memberships;
use super::media::delete_asset;
use crate::auth::{IssuedToken, PasswordHasher, TokenKind, TokenService};
use crate::error::{Error, Result};
use crate::media::MediaStorage;
use crate::store::Store;
use crate::types::{Profile, Role, User, UserStatus};

pub const MIN_PASSWORD_LEN: usize = 8;
const AUTH_FAILED: &str = "Authentication failed";

#[derive(Debug, Clone, Default)]
pub struct ProfileInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub school: Option<String>,
    pub grade_level: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub confirm_password: Option<String>,
    pub profile: ProfileInput,
}

/// Tokens issued on login or refresh, plus the signed-in user.
#[derive(Debug, Clone)]
pub struct Session {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
    pub user: User,
    pub roles: Vec<Role>,
}

pub(crate) fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if !valid {
        return Err(Error::bad_request("A valid email is required"));
    }
    Ok(email)
}

pub(crate) fn check_password(password: &str) -> Result<()> {
    if password.trim().is_empty() {
        return Err(Error::bad_request("Password is required"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_birth_date(value: Option<String>) -> Result<Option<NaiveDate>> {
    clean(value)
        .map(|v| {
            NaiveDate::parse_from_str(&v, "%Y-%m-%d")
                .map_err(|_| Error::bad_request("Birth date must be formatted as YYYY-MM-DD"))
        })
        .transpose()
}

/// Overwrites the personal fields of `profile`. The avatar is left alone.
pub fn apply_profile(profile: &mut Profile, input: ProfileInput) -> Result<()> {
    profile.birth_date = parse_birth_date(input.birth_date)?;
    profile.first_name = clean(input.first_name);
    profile.last_name = clean(input.last_name);
    profile.phone = clean(input.phone);
    profile.school = clean(input.school);
    profile.grade_level = clean(input.grade_level);
    profile.gender = clean(input.gender);
    profile.bio = clean(input.bio);
    Ok(())
}

/// Creates an ACTIVE account holding exactly the STUDENT role.
pub fn register(store: &dyn Store, hasher: &PasswordHasher, input: RegisterInput) -> Result<User> {
    let email = normalize_email(&input.email)?;
    if input
        .confirm_password
        .as_deref()
        .is_some_and(|confirm| confirm != input.password)
    {
        return Err(Error::bad_request("Password confirmation does not match"));
    }
    check_password(&input.password)?;
    if store.get_user_by_email(&email)?.is_some() {
        return Err(Error::bad_request("User already exists"));
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email,
        password_hash: hasher.hash(&input.password)?,
        status: UserStatus::Active,
        created_at: now,
        updated_at: now,
        last_login_at: None,
        last_seen_at: None,
    };
    let mut profile = Profile::empty(&user.id);
    apply_profile(&mut profile, input.profile)?;

    store.create_account(&user, &profile, &[Role::Student])?;
    ensure_user_memberships(store, &user.id)?;

    tracing::info!("Registered {}", user.email);
    Ok(user)
}

fn open_session(store: &dyn Store, tokens: &TokenService, user: User) -> Result<Session> {
    let roles = store.list_user_roles(&user.id)?;
    Ok(Session {
        access: tokens.issue_access(&user.id, &user.email, &roles)?,
        refresh: tokens.issue_refresh(&user.id)?,
        user,
        roles,
    })
}

/// Unknown emails and wrong passwords fail identically, and both pay for an
/// Argon2 verification.
pub fn login(
    store: &dyn Store,
    hasher: &PasswordHasher,
    tokens: &TokenService,
    email: &str,
    password: &str,
) -> Result<Session> {
    let email = email.trim().to_lowercase();
    let verified = match store.get_user_by_email(&email)? {
        Some(user) => hasher.verify(password, &user.password_hash).then_some(user),
        None => {
            hasher.verify_missing(password);
            None
        }
    };
    let mut user = verified.ok_or(Error::Unauthorized)?;

    if user.status != UserStatus::Active {
        return Err(Error::forbidden(AUTH_FAILED));
    }

    let now = Utc::now();
    user.last_login_at = Some(now);
    user.last_seen_at = Some(now);
    store.update_user(&user)?;

    open_session(store, tokens, user)
}

/// Exchanges a refresh token for a fresh pair.
pub fn refresh(store: &dyn Store, tokens: &TokenService, refresh_token: &str) -> Result<Session> {
    let claims = tokens.decode(refresh_token)?;
    if claims.typ != TokenKind::Refresh {
        return Err(Error::Unauthorized);
    }
    let user = store.get_user(&claims.sub)?.ok_or(Error::Unauthorized)?;
    if user.status != UserStatus::Active {
        return Err(Error::forbidden(AUTH_FAILED));
    }
    open_session(store, tokens, user)
}

pub fn change_password(
    store: &dyn Store,
    hasher: &PasswordHasher,
    user: &User,
    current: &str,
    new_password: &str,
    confirm: &str,
) -> Result<()> {
    if new_password != confirm {
        return Err(Error::bad_request("Password confirmation does not match"));
    }
    if !hasher.verify(current, &user.password_hash) {
        return Err(Error::Unauthorized);
    }
    check_password(new_password)?;

    let mut user = user.clone();
    user.password_hash = hasher.hash(new_password)?;
    user.updated_at = Utc::now();
    store.update_user(&user)
}

pub fn touch_last_seen(store: &dyn Store, user: &User) -> Result<()> {
    let mut user = user.clone();
    user.last_seen_at = Some(Utc::now());
    store.update_user(&user)
}

pub fn get_profile(store: &dyn Store, user_id: &str) -> Result<Profile> {
    Ok(store
        .get_profile(user_id)?
        .unwrap_or_else(|| Profile::empty(user_id)))
}

pub fn update_profile(store: &dyn Store, user_id: &str, input: ProfileInput) -> Result<Profile> {
    let mut profile = get_profile(store, user_id)?;
    apply_profile(&mut profile, input)?;
    store.upsert_profile(&profile)?;
    Ok(profile)
}

/// Deletes the account together with its avatar.
pub async fn delete_account(store: &dyn Store, storage: &MediaStorage, user_id: &str) -> Result<()> {
    let avatar = store
        .get_profile(user_id)?
        .and_then(|p| p.avatar_media_id);
    if let Some(avatar) = avatar {
        delete_asset(store, storage, &avatar).await?;
    }
    if !store.delete_user(user_id)? {
        return Err(Error::not_found("User not found"));
    }

    tracing::info!("Deleted account {user_id}");
    Ok(())
}
