//! JWT issuance and validation for access, refresh, password-reset and
//! email-verification tokens.
//!
//! Every token carries `pwd`, a short fingerprint of the password hash it was
//! issued against. Changing the password changes the fingerprint, which makes
//! all earlier tokens for that user stale without any server-side bookkeeping.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::UserRow;

const PASSWORD_RESET_TTL_MINUTES: i64 = 60;
const EMAIL_VERIFICATION_TTL_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
    PasswordReset,
    EmailVerification,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
    pub kind: TokenKind,
    pub pwd: String,
}

impl Claims {
    /// Time left before expiry, never negative.
    pub fn remaining(&self) -> Duration {
        let left = self.exp - Utc::now().timestamp();
        Duration::seconds(left.max(0))
    }

    /// False once the user's password has changed since issuance.
    pub fn matches_password(&self, user: &UserRow) -> bool {
        self.pwd == password_fingerprint(&user.password_hash)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
            TokenKind::PasswordReset => Duration::minutes(PASSWORD_RESET_TTL_MINUTES),
            TokenKind::EmailVerification => Duration::days(EMAIL_VERIFICATION_TTL_DAYS),
        }
    }

    pub fn issue(&self, user: &UserRow, kind: TokenKind) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + self.ttl(kind)).timestamp(),
            kind,
            pwd: password_fingerprint(&user.password_hash),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("token encoding failed: {e}")))
    }

    pub fn issue_pair(&self, user: &UserRow) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access: self.issue(user, TokenKind::Access)?,
            refresh: self.issue(user, TokenKind::Refresh)?,
        })
    }

    /// Verifies signature, expiry and kind. Any failure is `TokenInvalid`.
    pub fn decode(&self, token: &str, expected: TokenKind) -> Result<Claims, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            AppError::TokenInvalid
        })?;

        if data.claims.kind != expected {
            tracing::debug!(kind = ?data.claims.kind, expected = ?expected, "token kind mismatch");
            return Err(AppError::TokenInvalid);
        }
        Ok(data.claims)
    }
}

/// First 16 hex chars of SHA-256 over the stored password hash.
pub fn password_fingerprint(password_hash: &str) -> String {
    let digest = Sha256::digest(password_hash.as_bytes());
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}
