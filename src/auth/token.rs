use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::types::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub typ: TokenKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies HS256 session tokens.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &str, issuer: &str, access_ttl_seconds: i64, refresh_ttl_seconds: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_string(),
            access_ttl: Duration::seconds(access_ttl_seconds),
            refresh_ttl: Duration::seconds(refresh_ttl_seconds),
        }
    }

    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            &config.jwt_secret,
            &config.jwt_issuer,
            config.access_ttl_seconds,
            config.refresh_ttl_seconds,
        )
    }

    pub fn issue_access(&self, user_id: &str, email: &str, roles: &[Role]) -> Result<IssuedToken> {
        self.issue(
            TokenKind::Access,
            user_id,
            Some(email.to_string()),
            roles.to_vec(),
            self.access_ttl,
        )
    }

    pub fn issue_refresh(&self, user_id: &str) -> Result<IssuedToken> {
        self.issue(TokenKind::Refresh, user_id, None, Vec::new(), self.refresh_ttl)
    }

    fn issue(
        &self,
        typ: TokenKind,
        user_id: &str,
        email: Option<String>,
        roles: Vec<Role>,
        ttl: Duration,
    ) -> Result<IssuedToken> {
        let now = Utc::now();
        let expires_at = now + ttl;
        let claims = Claims {
            iss: self.issuer.clone(),
            sub: user_id.to_string(),
            typ,
            email,
            roles,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Token(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verifies signature, expiry and issuer.
    pub fn decode(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                if e.kind() == &jsonwebtoken::errors::ErrorKind::ExpiredSignature {
                    tracing::debug!("Rejected expired token");
                } else {
                    tracing::debug!("Rejected token: {e}");
                }
                Error::Unauthorized
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn service() -> TokenService {
        TokenService::new(SECRET, "lyceum", 3600, 7200)
    }

    #[test]
    fn test_access_token_round_trip() {
        let tokens = service();
        let issued = tokens
            .issue_access("u-1", "ana@example.com", &[Role::Teacher, Role::Student])
            .unwrap();

        let claims = tokens.decode(&issued.token).unwrap();
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.typ, TokenKind::Access);
        assert_eq!(claims.iss, "lyceum");
        assert_eq!(claims.email.as_deref(), Some("ana@example.com"));
        assert_eq!(claims.roles, vec![Role::Teacher, Role::Student]);
        assert_eq!(claims.exp, issued.expires_at.timestamp());
    }

    #[test]
    fn test_refresh_token_kind() {
        let tokens = service();
        let issued = tokens.issue_refresh("u-1").unwrap();

        let claims = tokens.decode(&issued.token).unwrap();
        assert_eq!(claims.typ, TokenKind::Refresh);
        assert!(claims.email.is_none());
        assert!(claims.roles.is_empty());
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = TokenService::new(SECRET, "lyceum", -600, -600);
        let issued = tokens.issue_access("u-1", "a@b.c", &[]).unwrap();

        assert!(matches!(tokens.decode(&issued.token), Err(Error::Unauthorized)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issued = service().issue_refresh("u-1").unwrap();
        let other = TokenService::new("another-secret-another-secret-xx", "lyceum", 60, 60);

        assert!(matches!(other.decode(&issued.token), Err(Error::Unauthorized)));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let issued = service().issue_refresh("u-1").unwrap();
        let other = TokenService::new(SECRET, "someone-else", 60, 60);

        assert!(other.decode(&issued.token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(service().decode("not.a.jwt"), Err(Error::Unauthorized)));
        assert!(service().decode("").is_err());
    }
}
