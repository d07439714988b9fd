use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgConnection;
use tracing::warn;

use crate::{
    error::ApiError,
    mailer::Mailer,
    users::{
        password::{hash_password, verify_password},
        repo_types::{ActivationCode, User},
    },
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

const PASSWORD_SYMBOLS: &str = "!@#$%^&*()_+-=[]{}|;':\",./<>?";
const MIN_PASSWORD_LEN: usize = 12;

/// Pure strength check; all violations are reported together.
pub(crate) fn check_password_strength(password: &str) -> Result<(), String> {
    let mut missing = Vec::new();
    if password.len() < MIN_PASSWORD_LEN {
        missing.push("at least 12 characters");
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        missing.push("at least one uppercase letter");
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        missing.push("at least one lowercase letter");
    }
    if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        missing.push("at least one special character");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!("Password must contain {}", missing.join(", ")))
    }
}

/// Create the account, issue a code, deliver it. A delivery failure leaves
/// the user and code rows persisted: the account then exists in an
/// unconfirmed state and the caller sees the delivery error.
pub async fn register(
    conn: &mut PgConnection,
    mailer: &dyn Mailer,
    email: &str,
    password: &str,
) -> Result<User, ApiError> {
    let password_hash = hash_password(password)?;

    let user = User::create(&mut *conn, email, &password_hash)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                warn!(email = %email, "registration for existing email");
                ApiError::UserAlreadyExists
            }
            _ => ApiError::from(e),
        })?;

    let code = ActivationCode::create_for_user(&mut *conn, user.id).await?;

    mailer
        .send_activation_code(&user.email, &code)
        .await
        .map_err(ApiError::EmailDelivery)?;

    Ok(user)
}

/// Credential check + one-time code redemption + activation. The caller owns
/// the surrounding transaction: both writes commit together or not at all.
pub async fn activate(
    conn: &mut PgConnection,
    email: &str,
    password: &str,
    code: &str,
) -> Result<(), ApiError> {
    let user = User::find_by_email(&mut *conn, email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "activation with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    if user.is_active {
        return Err(ApiError::UserAlreadyActive);
    }

    let record = ActivationCode::find_latest_valid(&mut *conn, user.id, code)
        .await?
        .ok_or(ApiError::InvalidCode)?;

    ActivationCode::mark_used(&mut *conn, record.id).await?;
    User::activate(&mut *conn, user.id).await?;
    Ok(())
}

#[cfg(test)]
mod email_tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("@example.com"));
    }
}
