/// Credential store
///
/// One credential per account, created atomically with the profile. The
/// stored value is an Argon2id PHC string with a salt unique to the record.
///
/// Two mutation paths with different activation semantics:
///
/// - [`Credential::change`] — the holder proves knowledge of the current
///   password upstream, then the account's activation flag flips to true.
/// - [`Credential::reset`] — administrative, no proof-of-knowledge; the
///   activation flag flips back to false.
///
/// Hashing and verification are CPU-bound and run on the blocking thread
/// pool so request workers are not starved.

use sqlx::PgConnection;

use crate::auth::password::{hash_password, verify_password};
use crate::error::{DomainError, DomainResult};
use crate::models::account::Account;

/// A stored credential row (`authes` table)
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Credential {
    /// Owning account
    pub account_id: String,

    /// PHC-format password hash
    pub password: String,
}

impl Credential {
    /// Inserts a credential with a freshly salted hash.
    ///
    /// Fails with `Conflict` if a credential already exists for the account.
    pub async fn create(
        conn: &mut PgConnection,
        account_id: &str,
        plaintext: &str,
    ) -> DomainResult<()> {
        let hash = hash_blocking(plaintext.to_string()).await?;

        sqlx::query("INSERT INTO authes (account_id, password) VALUES ($1, $2)")
            .bind(account_id)
            .bind(hash)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Verifies a plaintext against the stored hash.
    ///
    /// Returns false when no credential exists; callers cannot distinguish
    /// a missing account from a wrong password.
    pub async fn verify(
        conn: &mut PgConnection,
        account_id: &str,
        plaintext: &str,
    ) -> DomainResult<bool> {
        let row = sqlx::query_as::<_, Credential>(
            "SELECT account_id, password FROM authes WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(credential) = row else {
            return Ok(false);
        };

        verify_blocking(plaintext.to_string(), credential.password).await
    }

    /// Replaces the hash with a fresh salt and activates the account.
    ///
    /// A successful verification of the current password is required
    /// upstream before calling this. Re-hashing an unchanged plaintext is
    /// valid and still produces a new salt.
    pub async fn change(
        conn: &mut PgConnection,
        account_id: &str,
        new_plaintext: &str,
    ) -> DomainResult<()> {
        Self::replace(&mut *conn, account_id, new_plaintext).await?;
        Account::set_active(&mut *conn, account_id, true).await
    }

    /// Administrative reset: replaces the hash and deactivates the account.
    pub async fn reset(
        conn: &mut PgConnection,
        account_id: &str,
        new_plaintext: &str,
    ) -> DomainResult<()> {
        Self::replace(&mut *conn, account_id, new_plaintext).await?;
        Account::set_active(&mut *conn, account_id, false).await
    }

    /// Locks the credential row and writes a freshly salted hash.
    async fn replace(
        conn: &mut PgConnection,
        account_id: &str,
        new_plaintext: &str,
    ) -> DomainResult<()> {
        let locked = sqlx::query_as::<_, Credential>(
            "SELECT account_id, password FROM authes WHERE account_id = $1 FOR UPDATE",
        )
        .bind(account_id)
        .fetch_optional(&mut *conn)
        .await?;

        if locked.is_none() {
            return Err(DomainError::NotFound("account".to_string()));
        }

        let hash = hash_blocking(new_plaintext.to_string()).await?;

        sqlx::query("UPDATE authes SET password = $2 WHERE account_id = $1")
            .bind(account_id)
            .bind(hash)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}

async fn hash_blocking(plaintext: String) -> DomainResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&plaintext))
        .await
        .map_err(|e| DomainError::Internal(anyhow::anyhow!("hash task failed: {}", e)))?
        .map_err(|e| DomainError::Internal(anyhow::anyhow!(e)))
}

async fn verify_blocking(plaintext: String, hash: String) -> DomainResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&plaintext, &hash))
        .await
        .map_err(|e| DomainError::Internal(anyhow::anyhow!("verify task failed: {}", e)))?
        .map_err(|e| DomainError::Internal(anyhow::anyhow!(e)))
}
