use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::JwtConfig;
use crate::models::{Admin, Customer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    #[serde(rename = "password-reset")]
    PasswordReset,
}

/// Claims carried by every token. Session tokens set `role`; reset tokens
/// set `type` and never a role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (admin or customer id, hex)
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<TokenType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "customerId", default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// What a token asserts before timestamps are attached.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub sub: String,
    pub role: Option<Role>,
    pub token_type: Option<TokenType>,
    pub email: Option<String>,
    pub customer_id: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,
    #[error("Invalid token signature")]
    InvalidSignature,
    #[error("Malformed token")]
    Malformed,
    #[error("Token is not valid for this operation")]
    WrongType,
    #[error("Failed to encode token: {0}")]
    Encoding(String),
}

/// HS256 token issuing and verification over a shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_ttl: Duration,
    reset_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        tracing::info!("Token service initialized with HS256");
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            session_ttl: Duration::hours(config.session_ttl_hours),
            reset_ttl: Duration::minutes(config.reset_ttl_minutes),
        }
    }

    pub fn issue(&self, grant: TokenGrant, ttl: Duration) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: grant.sub,
            role: grant.role,
            token_type: grant.token_type,
            email: grant.email,
            customer_id: grant.customer_id,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    pub fn issue_admin_session(&self, admin: &Admin) -> Result<String, TokenError> {
        self.issue(
            TokenGrant {
                sub: admin.id.to_hex(),
                role: Some(Role::Admin),
                token_type: None,
                email: Some(admin.email.clone()),
                customer_id: None,
            },
            self.session_ttl,
        )
    }

    pub fn issue_user_session(&self, customer: &Customer) -> Result<String, TokenError> {
        self.issue(
            TokenGrant {
                sub: customer.id.to_hex(),
                role: Some(Role::User),
                token_type: None,
                email: None,
                customer_id: Some(customer.id.to_hex()),
            },
            self.session_ttl,
        )
    }

    pub fn issue_password_reset(&self, admin: &Admin) -> Result<String, TokenError> {
        self.issue(
            TokenGrant {
                sub: admin.id.to_hex(),
                role: None,
                token_type: Some(TokenType::PasswordReset),
                email: Some(admin.email.clone()),
                customer_id: None,
            },
            self.reset_ttl,
        )
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            })
    }

    /// Verify and additionally require `type == "password-reset"`.
    pub fn verify_password_reset(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.verify(token)?;
        if claims.token_type != Some(TokenType::PasswordReset) {
            return Err(TokenError::WrongType);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn service(secret: &str) -> TokenService {
        TokenService::new(&JwtConfig {
            secret: Secret::new(secret.to_string()),
            session_ttl_hours: 12,
            reset_ttl_minutes: 60,
        })
    }

    fn admin() -> Admin {
        Admin::new("admin@example.com".to_string(), "hash".to_string(), None)
    }

    #[test]
    fn test_admin_session_round_trip() {
        let jwt = service("test-secret");
        let admin = admin();
        let token = jwt.issue_admin_session(&admin).unwrap();

        let claims = jwt.verify(&token).unwrap();
        assert_eq!(claims.sub, admin.id.to_hex());
        assert_eq!(claims.role, Some(Role::Admin));
        assert_eq!(claims.email.as_deref(), Some("admin@example.com"));
        assert!(claims.token_type.is_none());
        assert_eq!(claims.exp - claims.iat, 12 * 3600);
    }

    #[test]
    fn test_expired_token_is_reported_as_expired() {
        let jwt = service("test-secret");
        let token = jwt
            .issue(
                TokenGrant {
                    sub: "x".to_string(),
                    role: Some(Role::Admin),
                    token_type: None,
                    email: None,
                    customer_id: None,
                },
                Duration::seconds(-30),
            )
            .unwrap();

        assert_eq!(jwt.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let token = service("one-secret").issue_admin_session(&admin()).unwrap();
        assert_eq!(
            service("another-secret").verify(&token),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert_eq!(service("s").verify("not-a-token"), Err(TokenError::Malformed));
    }

    #[test]
    fn test_session_token_is_not_a_reset_token() {
        let jwt = service("test-secret");
        let session = jwt.issue_admin_session(&admin()).unwrap();
        assert_eq!(jwt.verify_password_reset(&session), Err(TokenError::WrongType));

        let reset = jwt.issue_password_reset(&admin()).unwrap();
        let claims = jwt.verify_password_reset(&reset).unwrap();
        assert!(claims.role.is_none());
        assert_eq!(claims.exp - claims.iat, 3600);
    }
}
