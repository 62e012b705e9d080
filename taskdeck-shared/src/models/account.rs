/// Account directory
///
/// Authoritative mapping from account identifier to profile. Identifiers are
/// opaque 5-character codes, stable for the lifetime of the account and
/// never reused. Uniqueness of (account_id, username, nickname-when-set,
/// email) is enforced by the store and surfaced as `Conflict` naming the
/// violated field.
///
/// The activation flag is owned by the credential store: it flips to true
/// when the holder changes their own password and back to false on an
/// administrative reset (see [`crate::models::credential`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;

use crate::error::{DomainError, DomainResult};

/// Privilege role of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountRole {
    /// Full access, including account administration
    Administrator,

    /// Default role; may read and mutate tasks
    General,

    /// Pre-created account; may authenticate and manage its own profile
    /// but may not mutate tasks
    Provisional,
}

/// A registered identity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    /// Opaque 5-character code
    pub account_id: String,

    /// Display name, 1..20 characters, unique
    pub username: String,

    /// Optional nickname, unique when set
    pub nickname: Option<String>,

    /// Unique, well-formed address
    pub email: String,

    /// Privilege role
    pub role: AccountRole,

    /// True once the holder has set their own password
    pub is_active: bool,

    /// Independent of activation; false at creation
    pub email_verified: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an account
#[derive(Debug, Clone)]
pub struct CreateAccount {
    pub account_id: String,
    pub username: String,
    pub nickname: Option<String>,
    pub email: String,
    pub role: AccountRole,
}

/// Patch for an existing profile.
///
/// `None` means "leave untouched"; the nested option distinguishes an
/// explicit null (clear the nickname) from an absent key. Non-nullable
/// fields carry a single level because explicit nulls for them are rejected
/// upstream at DTO parse.
#[derive(Debug, Clone, Default)]
pub struct UpdateAccount {
    pub username: Option<String>,
    pub nickname: Option<Option<String>>,
    pub email: Option<String>,
    pub role: Option<AccountRole>,
}

impl UpdateAccount {
    /// True when the patch carries no keys at all.
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.nickname.is_none()
            && self.email.is_none()
            && self.role.is_none()
    }
}

const COLUMNS: &str =
    "account_id, username, nickname, email, role, is_active, email_verified, created_at, updated_at";

impl Account {
    /// Inserts a profile. The caller is responsible for creating the
    /// credential in the same transaction (see the account directory
    /// service in taskdeck-api).
    pub async fn create(conn: &mut PgConnection, data: CreateAccount) -> DomainResult<Self> {
        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO profiles (account_id, username, nickname, email, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(data.account_id)
        .bind(data.username)
        .bind(data.nickname)
        .bind(data.email)
        .bind(data.role)
        .fetch_one(&mut *conn)
        .await?;

        Ok(account)
    }

    /// Simple lookup by identifier.
    pub async fn find_by_id(conn: &mut PgConnection, id: &str) -> DomainResult<Option<Self>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {COLUMNS} FROM profiles WHERE account_id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(account)
    }

    /// Lookup with an exclusive row lock, for update paths.
    pub async fn lock_by_id(conn: &mut PgConnection, id: &str) -> DomainResult<Option<Self>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {COLUMNS} FROM profiles WHERE account_id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(account)
    }

    /// Patch-only profile update: keys absent from the patch are untouched.
    ///
    /// Locks the row, applies only the present keys, and returns the updated
    /// profile. An empty patch is valid and returns the current row.
    pub async fn update_profile(
        conn: &mut PgConnection,
        id: &str,
        patch: UpdateAccount,
    ) -> DomainResult<Self> {
        let current = Self::lock_by_id(&mut *conn, id)
            .await?
            .ok_or_else(|| DomainError::NotFound("account".to_string()))?;

        if patch.is_empty() {
            return Ok(current);
        }

        let mut sql = String::from("UPDATE profiles SET updated_at = NOW()");
        let mut bind_count = 1;

        if patch.username.is_some() {
            bind_count += 1;
            sql.push_str(&format!(", username = ${}", bind_count));
        }
        if patch.nickname.is_some() {
            bind_count += 1;
            sql.push_str(&format!(", nickname = ${}", bind_count));
        }
        if patch.email.is_some() {
            bind_count += 1;
            sql.push_str(&format!(", email = ${}", bind_count));
        }
        if patch.role.is_some() {
            bind_count += 1;
            sql.push_str(&format!(", role = ${}", bind_count));
        }

        sql.push_str(&format!(" WHERE account_id = $1 RETURNING {COLUMNS}"));

        let mut query = sqlx::query_as::<_, Account>(&sql).bind(id);

        if let Some(username) = patch.username {
            query = query.bind(username);
        }
        if let Some(nickname) = patch.nickname {
            // An explicit null clears the nickname
            query = query.bind(nickname);
        }
        if let Some(email) = patch.email {
            query = query.bind(email);
        }
        if let Some(role) = patch.role {
            query = query.bind(role);
        }

        let account = query.fetch_one(&mut *conn).await?;
        Ok(account)
    }

    /// Flips the activation flag. Called by the credential store inside the
    /// same transaction as a password change or reset.
    pub async fn set_active(conn: &mut PgConnection, id: &str, active: bool) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE profiles SET is_active = $2, updated_at = NOW() WHERE account_id = $1",
        )
        .bind(id)
        .bind(active)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound("account".to_string()));
        }
        Ok(())
    }

    /// Deletes an account, returning the pre-delete snapshot.
    ///
    /// The store cascades to the credential and to watch entries; task
    /// references (registrant, assignee) are set to null.
    pub async fn delete(conn: &mut PgConnection, id: &str) -> DomainResult<Self> {
        let snapshot = Self::lock_by_id(&mut *conn, id)
            .await?
            .ok_or_else(|| DomainError::NotFound("account".to_string()))?;

        sqlx::query("DELETE FROM profiles WHERE account_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_names() {
        assert_eq!(
            serde_json::to_string(&AccountRole::Administrator).unwrap(),
            "\"ADMINISTRATOR\""
        );
        assert_eq!(
            serde_json::to_string(&AccountRole::General).unwrap(),
            "\"GENERAL\""
        );
        assert_eq!(
            serde_json::to_string(&AccountRole::Provisional).unwrap(),
            "\"PROVISIONAL\""
        );

        let role: AccountRole = serde_json::from_str("\"GENERAL\"").unwrap();
        assert_eq!(role, AccountRole::General);
    }

    #[test]
    fn test_update_account_is_empty() {
        assert!(UpdateAccount::default().is_empty());

        let patch = UpdateAccount {
            nickname: Some(None),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_account_serializes_without_credentials() {
        let account = Account {
            account_id: "T-901".to_string(),
            username: "tester".to_string(),
            nickname: None,
            email: "tester@example.com".to_string(),
            role: AccountRole::General,
            is_active: true,
            email_verified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["account_id"], "T-901");
        assert_eq!(json["is_active"], true);
        assert!(json.get("password").is_none());
    }
}
