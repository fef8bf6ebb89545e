//! HS256 session tokens for the platform's own accounts.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AuthSettings;
use crate::core::shared::enums::UserRole;

pub const MIN_SECRET_LEN: usize = 32;
const AUDIENCE: &str = "zelene-api";
const LEEWAY_SECONDS: u64 = 60;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("session secret must be at least {MIN_SECRET_LEN} characters")]
    WeakSecret,
    #[error("could not sign session token: {0}")]
    Sign(jsonwebtoken::errors::Error),
    #[error("session token rejected: {0}")]
    Rejected(jsonwebtoken::errors::Error),
}

/// Payload of a session token. `sub` is the account id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
    pub username: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

pub struct JwtManager {
    issuer: String,
    ttl: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl JwtManager {
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, TokenError> {
        let secret = settings.jwt_secret.as_bytes();
        if secret.len() < MIN_SECRET_LEN {
            return Err(TokenError::WeakSecret);
        }
        Ok(Self {
            issuer: settings.issuer.clone(),
            ttl: Duration::minutes(settings.token_ttl_minutes.max(1)),
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        })
    }

    pub fn issue(&self, user_id: Uuid, username: &str, role: UserRole) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: user_id,
            iss: self.issuer.clone(),
            aud: AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
            username: username.to_string(),
            role,
        };
        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Sign)?;
        Ok(IssuedToken {
            access_token,
            token_type: "Bearer",
            expires_at,
        })
    }

    /// Checks signature, issuer, audience and expiry.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[AUDIENCE]);
        validation.leeway = LEEWAY_SECONDS;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(TokenError::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(secret: &str) -> AuthSettings {
        AuthSettings {
            jwt_secret: secret.to_string(),
            ..AuthSettings::default()
        }
    }

    fn manager(secret: &str) -> JwtManager {
        JwtManager::from_settings(&settings(secret)).unwrap()
    }

    #[test]
    fn test_issue_and_validate() {
        let jwt = manager("test-secret-that-is-long-enough-for-hs256");
        let user_id = Uuid::new_v4();
        let token = jwt.issue(user_id, "mila", UserRole::TenantAdmin).unwrap();

        let claims = jwt.validate(&token.access_token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "mila");
        assert_eq!(claims.role, UserRole::TenantAdmin);
        assert_eq!(token.token_type, "Bearer");
    }

    #[test]
    fn test_rejects_foreign_signature() {
        let issuer = manager("test-secret-that-is-long-enough-for-hs256");
        let other = manager("another-secret-that-is-long-enough!!");
        let token = issuer.issue(Uuid::new_v4(), "ivo", UserRole::Member).unwrap();
        assert!(matches!(
            other.validate(&token.access_token),
            Err(TokenError::Rejected(_))
        ));
    }

    #[test]
    fn test_rejects_other_issuer() {
        let secret = "shared-secret-that-is-long-enough-xyz";
        let ours = manager(secret);
        let theirs = JwtManager::from_settings(&AuthSettings {
            issuer: "someone-else".into(),
            ..settings(secret)
        })
        .unwrap();
        let token = theirs.issue(Uuid::new_v4(), "ivo", UserRole::Member).unwrap();
        assert!(ours.validate(&token.access_token).is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(matches!(
            JwtManager::from_settings(&settings("short")),
            Err(TokenError::WeakSecret)
        ));
    }
}
