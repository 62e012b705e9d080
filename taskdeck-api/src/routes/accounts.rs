/// Account administration endpoints
///
/// Administrator-only lifecycle operations. Creation is a PUT keyed on the
/// identifier the administrator assigns; the profile and its credential are
/// inserted in one transaction. When no initial password is supplied, a
/// random 20-character one is generated and returned once in the response.
///
/// # Endpoints
///
/// - `PUT /api/accounts/{id}/` - create an account
/// - `DELETE /api/accounts/{id}/` - delete an account
/// - `PATCH /api/accounts/{id}/password` - administrative password reset

use crate::{app::AppState, error::ApiResult, routes::profile::validate_new_password};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use taskdeck_shared::{
    auth::password::generate_password,
    error::DomainError,
    models::{
        account::{Account, AccountRole, CreateAccount},
        credential::Credential,
    },
};
use validator::ValidateEmail;

/// Account creation body
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountCreate {
    pub username: String,
    pub nickname: Option<String>,
    pub email: String,

    /// Defaults to GENERAL
    pub role: Option<AccountRole>,

    /// Initial password; generated when absent
    pub password: Option<String>,
}

impl AccountCreate {
    fn validate(&self) -> Result<(), DomainError> {
        let len = self.username.chars().count();
        if !(1..=20).contains(&len) {
            return Err(DomainError::validation(
                "username",
                "must be between 1 and 20 characters",
            ));
        }

        if let Some(nickname) = &self.nickname {
            let len = nickname.chars().count();
            if !(1..=20).contains(&len) {
                return Err(DomainError::validation(
                    "nickname",
                    "must be between 1 and 20 characters",
                ));
            }
        }

        if !self.email.validate_email() {
            return Err(DomainError::validation("email", "invalid email format"));
        }

        if let Some(password) = &self.password {
            let len = password.chars().count();
            if !(8..=64).contains(&len) {
                return Err(DomainError::validation(
                    "password",
                    "must be between 8 and 64 characters",
                ));
            }
        }

        Ok(())
    }
}

/// Creation response: the profile, plus the generated password when the
/// administrator did not supply one. Shown exactly once.
#[derive(Debug, Serialize)]
pub struct AccountCreated {
    #[serde(flatten)]
    pub account: Account,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub init_password: Option<String>,
}

/// Password reset body
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PasswordReset {
    /// Replacement password; generated when absent
    pub new_password: Option<String>,
}

/// Reset response, carrying the generated password when one was made
#[derive(Debug, Serialize)]
pub struct PasswordResetDone {
    pub detail: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub init_password: Option<String>,
}

/// Creates an account under the administrator-assigned identifier.
///
/// # Errors
///
/// - `400 Bad Request`: identifier / username / nickname / email taken
/// - `422 Unprocessable Entity`: field out of range, malformed identifier
pub async fn create(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Json(body): Json<AccountCreate>,
) -> ApiResult<Json<AccountCreated>> {
    validate_account_id(&account_id)?;
    body.validate()?;

    let (plaintext, generated) = match body.password {
        Some(password) => (password, None),
        None => {
            let generated = generate_password();
            (generated.clone(), Some(generated))
        }
    };

    let mut tx = state.db.begin().await?;

    let account = Account::create(
        &mut tx,
        CreateAccount {
            account_id: account_id.clone(),
            username: body.username,
            nickname: body.nickname,
            email: body.email,
            role: body.role.unwrap_or(AccountRole::General),
        },
    )
    .await?;

    Credential::create(&mut tx, &account_id, &plaintext).await?;

    tx.commit().await?;

    Ok(Json(AccountCreated {
        account,
        init_password: generated,
    }))
}

/// Deletes an account, returning the pre-delete profile.
///
/// The credential and watch entries go with it; task references are cleared
/// by the store.
pub async fn remove(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> ApiResult<Json<Account>> {
    let mut tx = state.db.begin().await?;
    let snapshot = Account::delete(&mut tx, &account_id).await?;
    tx.commit().await?;

    Ok(Json(snapshot))
}

/// Administrative password reset.
///
/// Stores a fresh hash and flips the account's activation flag back to
/// false; the holder re-activates by changing the password themselves.
pub async fn reset_password(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Json(body): Json<PasswordReset>,
) -> ApiResult<Json<PasswordResetDone>> {
    let (plaintext, generated) = match body.new_password {
        Some(password) => {
            validate_new_password(&password)?;
            (password, None)
        }
        None => {
            let generated = generate_password();
            (generated.clone(), Some(generated))
        }
    };

    let mut tx = state.db.begin().await?;
    Credential::reset(&mut tx, &account_id, &plaintext).await?;
    tx.commit().await?;

    Ok(Json(PasswordResetDone {
        detail: "Password reset successfully.".to_string(),
        init_password: generated,
    }))
}

/// Account identifiers are exactly 5 characters.
fn validate_account_id(account_id: &str) -> Result<(), DomainError> {
    if account_id.chars().count() != 5 {
        return Err(DomainError::validation(
            "account_id",
            "must be exactly 5 characters",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_width() {
        assert!(validate_account_id("T-901").is_ok());
        assert!(validate_account_id("T-90").is_err());
        assert!(validate_account_id("T-9011").is_err());
    }

    #[test]
    fn test_create_body_validation() {
        let body: AccountCreate = serde_json::from_str(
            r#"{"username": "deck", "email": "deck@example.com"}"#,
        )
        .unwrap();
        assert!(body.validate().is_ok());
        assert!(body.password.is_none());

        let bad_email: AccountCreate =
            serde_json::from_str(r#"{"username": "deck", "email": "nope"}"#).unwrap();
        assert!(bad_email.validate().is_err());

        let short_password: AccountCreate = serde_json::from_str(
            r#"{"username": "deck", "email": "deck@example.com", "password": "short"}"#,
        )
        .unwrap();
        assert!(short_password.validate().is_err());
    }

    #[test]
    fn test_create_body_rejects_unknown_keys() {
        let result = serde_json::from_str::<AccountCreate>(
            r#"{"username": "deck", "email": "deck@example.com", "is_active": true}"#,
        );
        assert!(result.is_err());
    }
}
