//! # User Repository
//!
//! Accounts for shoppers and staff. Emails are stored lowercased and the
//! unique index is case-insensitive.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use jewel_core::{Role, User};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at";

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Looks a user up by email, ignoring case.
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS);

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Creates an account.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - Email already registered
    pub async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> DbResult<User> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            email: normalize_email(email),
            password_hash: password_hash.to_string(),
            role,
            created_at: Utc::now(),
        };

        debug!(id = %user.id, role = role.as_str(), "Creating user");

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &user.email),
            other => other,
        })?;

        Ok(user)
    }

    /// Creates or refreshes the bootstrap admin account.
    ///
    /// An existing account with the same email is promoted to admin and
    /// its password replaced.
    pub async fn upsert_admin(&self, name: &str, email: &str, password_hash: &str) -> DbResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, created_at)
            VALUES (?1, ?2, ?3, ?4, 'admin', ?5)
            ON CONFLICT (email) DO UPDATE SET
                name = excluded.name,
                password_hash = excluded.password_hash,
                role = 'admin'
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4().to_string())
            .bind(name.trim())
            .bind(normalize_email(email))
            .bind(password_hash)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

        info!(id = %user.id, email = %user.email, "Admin account ready");
        Ok(user)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find_ignores_case() {
        let db = db().await;
        let created = db
            .users()
            .create("Asha", "Asha@Example.in", "hash", Role::Guest)
            .await
            .unwrap();

        assert_eq!(created.email, "asha@example.in");

        let found = db.users().find_by_email("ASHA@example.IN").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.role, Role::Guest);
        assert_eq!(found.password_hash, "hash");

        let by_id = db.users().get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, created.email);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = db().await;
        db.users()
            .create("Asha", "asha@example.in", "hash", Role::Guest)
            .await
            .unwrap();

        let err = db
            .users()
            .create("Other", "ASHA@example.in", "hash", Role::Guest)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_upsert_admin_promotes_existing_account() {
        let db = db().await;
        let guest = db
            .users()
            .create("Owner", "owner@store.in", "old", Role::Guest)
            .await
            .unwrap();

        let admin = db
            .users()
            .upsert_admin("Store Owner", "owner@store.in", "new")
            .await
            .unwrap();

        assert_eq!(admin.id, guest.id);
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.password_hash, "new");
        assert_eq!(admin.name, "Store Owner");
    }

    #[tokio::test]
    async fn test_upsert_admin_creates_when_missing() {
        let db = db().await;

        let admin = db
            .users()
            .upsert_admin("Admin", "admin@store.in", "hash")
            .await
            .unwrap();

        assert_eq!(admin.role, Role::Admin);
        assert!(db.users().find_by_email("admin@store.in").await.unwrap().is_some());
    }
}
