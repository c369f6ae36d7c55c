//! Domain operations over a [`Store`](crate::store::Store).
//!
//! Functions here return [`crate::error::Error`] and know nothing about HTTP.

pub mod accounts;
pub mod catalog;
pub mod directory;
pub mod groups;
pub mod media;
pub mod users;
pub mod visits;

/// Who is acting. `is_admin` is decided by the caller: the route family for
/// groups, the ADMIN role for resources.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: String,
    pub is_admin: bool,
}

impl Actor {
    #[must_use]
    pub fn admin(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            is_admin: true,
        }
    }

    #[must_use]
    pub fn member(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            is_admin: false,
        }
    }
}
