use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::AppConfig, error::AppError};

/// Name of the cookie carrying the admin session.
pub const SESSION_COOKIE: &str = "admin";

/// Subject every admin session token is issued for. There is a single shared identity.
pub const ADMIN_SUBJECT: &str = "admin";

/// Sessions are valid for six hours from issuance.
pub const SESSION_TTL_SECS: u64 = 6 * 60 * 60;

/// Claims
///
/// Payload of the signed session token stored in the cookie. Verification is purely
/// stateless: signature, expiry and subject.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

/// SessionIssuer
///
/// Checks the admin password and mints or verifies session cookies. Built once from
/// `AppConfig`; a missing admin password is kept as `None` so login can report the
/// misconfiguration rather than a wrong guess.
#[derive(Clone)]
pub struct SessionIssuer {
    admin_password: Option<String>,
    signing_secret: Option<String>,
    secure: bool,
}

impl SessionIssuer {
    pub fn new(admin_password: Option<String>, signing_secret: Option<String>, secure: bool) -> Self {
        Self {
            admin_password,
            signing_secret,
            secure,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.admin_password.clone(),
            config.signing_secret().map(str::to_string),
            config.secure_cookies(),
        )
    }

    /// login
    ///
    /// Exact match against the configured password. Returns the cookie to set on success.
    pub fn login(&self, password: &str) -> Result<Cookie<'static>, AppError> {
        let expected = self
            .admin_password
            .as_deref()
            .ok_or(AppError::Misconfigured)?;

        if !constant_time_eq(password.as_bytes(), expected.as_bytes()) {
            tracing::warn!("admin login rejected");
            return Err(AppError::InvalidCredentials);
        }

        let iat = u64::try_from(Utc::now().timestamp()).map_err(|_| {
            tracing::error!("system clock is before the unix epoch");
            AppError::Misconfigured
        })?;
        let token = self.issue_token(iat)?;
        tracing::info!("admin session issued");
        Ok(self.session_cookie(token))
    }

    /// Signs a token for the admin subject, issued at `iat` (seconds since the epoch).
    pub fn issue_token(&self, iat: u64) -> Result<String, AppError> {
        let secret = self.signing_secret.as_deref().ok_or(AppError::Misconfigured)?;
        let claims = Claims {
            sub: ADMIN_SUBJECT.to_string(),
            iat,
            exp: iat + SESSION_TTL_SECS,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| {
            tracing::error!("failed to sign session token: {}", e);
            AppError::Misconfigured
        })
    }

    /// verify
    ///
    /// True when the token carries a valid signature, has not expired and names the admin
    /// subject. Any decoding failure counts as "not logged in".
    pub fn verify(&self, token: &str) -> bool {
        let Some(secret) = self.signing_secret.as_deref() else {
            return false;
        };

        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.leeway = 0;

        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        ) {
            Ok(data) => data.claims.sub == ADMIN_SUBJECT,
            Err(e) => {
                tracing::debug!("session token rejected: {:?}", e.kind());
                false
            }
        }
    }

    fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token))
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .path("/")
            .max_age(time::Duration::seconds(SESSION_TTL_SECS as i64))
            .build()
    }

    /// A cookie that replaces the session with an already-expired one.
    pub fn logout_cookie(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, ""))
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .path("/")
            .max_age(time::Duration::ZERO)
            .build()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
