use rand::{rngs::OsRng, Rng};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::users::repo_types::{ActivationCode, User};

impl User {
    /// Insert a new user. A unique-constraint violation on email surfaces as
    /// `sqlx::Error::Database`; the service layer translates it.
    pub async fn create(
        conn: &mut PgConnection,
        email: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, is_active, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&mut *conn)
        .await
    }

    /// Exact-match lookup, no normalization. Absent is not an error.
    pub async fn find_by_email(
        conn: &mut PgConnection,
        email: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, is_active, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&mut *conn)
        .await
    }

    pub async fn activate(conn: &mut PgConnection, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET is_active = TRUE, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

/// Cryptographically secure 4-digit code, uniform over 0000-9999.
pub(crate) fn generate_code() -> String {
    format!("{:04}", OsRng.gen_range(0..10_000))
}

impl ActivationCode {
    /// Insert a fresh code for the user and return its plaintext value.
    /// Expiry is computed by the database clock so that multiple app
    /// instances cannot disagree about "now".
    pub async fn create_for_user(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<String, sqlx::Error> {
        let code = generate_code();
        sqlx::query(
            r#"
            INSERT INTO activation_codes (user_id, code, expires_at)
            VALUES ($1, $2, NOW() + INTERVAL '60 seconds')
            "#,
        )
        .bind(user_id)
        .bind(&code)
        .execute(&mut *conn)
        .await?;
        Ok(code)
    }

    /// Newest unused, unexpired code matching user + value. Absent covers
    /// wrong value, expired and already used alike.
    pub async fn find_latest_valid(
        conn: &mut PgConnection,
        user_id: Uuid,
        code: &str,
    ) -> Result<Option<ActivationCode>, sqlx::Error> {
        sqlx::query_as::<_, ActivationCode>(
            r#"
            SELECT id, user_id, code, created_at, expires_at, used_at
            FROM activation_codes
            WHERE user_id = $1
              AND code = $2
              AND used_at IS NULL
              AND expires_at > NOW()
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(code)
        .fetch_optional(&mut *conn)
        .await
    }

    pub async fn mark_used(conn: &mut PgConnection, code_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE activation_codes SET used_at = NOW() WHERE id = $1")
            .bind(code_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod code_tests {
    use super::*;

    #[test]
    fn code_is_four_zero_padded_digits() {
        for _ in 0..1_000 {
            let code = generate_code();
            assert_eq!(code.len(), 4);
            assert!(code.chars().all(|c| c.is_ascii_digit()), "got {code}");
        }
    }

    #[test]
    fn code_distribution_is_roughly_uniform() {
        const SAMPLES: usize = 20_000;
        let mut buckets = [0usize; 10];
        for _ in 0..SAMPLES {
            let value: u32 = generate_code().parse().expect("numeric code");
            assert!(value < 10_000);
            buckets[(value / 1_000) as usize] += 1;
        }
        // Expected 2000 per bucket; bounds are wide enough (~7 sigma) that a
        // correct generator essentially never trips them.
        for (i, &count) in buckets.iter().enumerate() {
            assert!(
                (1_700..=2_300).contains(&count),
                "bucket {i} has skewed count {count}"
            );
        }
    }
}
