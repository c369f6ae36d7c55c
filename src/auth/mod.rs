mod middleware;
mod password;
mod token;

pub use middleware::{
    AuthError, AuthUser, RequireAdmin, RequireStaff, RequireStudent, RequireTeacher, RequireUser,
    authenticate_token,
};
pub use password::PasswordHasher;
pub use token::{Claims, IssuedToken, TokenKind, TokenService};
