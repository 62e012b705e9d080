/// Own-profile endpoints
///
/// Every handler operates on the caller resolved by the gate; there is no
/// way to address another account here. These routes admit authenticated
/// but not-yet-activated callers so a freshly provisioned holder can set
/// their first password.
///
/// # Endpoints
///
/// - `GET /api/mine/profile` - the caller's profile
/// - `PATCH /api/mine/profile` - patch username / nickname / email
/// - `PATCH /api/mine/password` - change own password (activates the account)

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{double_option, Detail},
};
use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use taskdeck_shared::{
    auth::gate::CurrentAccount,
    error::DomainError,
    models::{
        account::{Account, UpdateAccount},
        credential::Credential,
    },
};
use validator::ValidateEmail;

/// Profile patch body.
///
/// All three fields distinguish "absent" from explicit `null`; `null` is
/// only legal for the nickname, which it clears.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfilePatch {
    #[serde(default, deserialize_with = "double_option")]
    pub username: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub nickname: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
}

impl ProfilePatch {
    /// Field-level checks; `null` for a non-nullable field is rejected here.
    fn validate(&self) -> Result<(), DomainError> {
        match &self.username {
            Some(None) => {
                return Err(DomainError::validation("username", "must not be null"));
            }
            Some(Some(name)) => {
                let len = name.chars().count();
                if !(1..=20).contains(&len) {
                    return Err(DomainError::validation(
                        "username",
                        "must be between 1 and 20 characters",
                    ));
                }
            }
            None => {}
        }

        if let Some(Some(nickname)) = &self.nickname {
            let len = nickname.chars().count();
            if !(1..=20).contains(&len) {
                return Err(DomainError::validation(
                    "nickname",
                    "must be between 1 and 20 characters",
                ));
            }
        }

        match &self.email {
            Some(None) => {
                return Err(DomainError::validation("email", "must not be null"));
            }
            Some(Some(email)) if !email.validate_email() => {
                return Err(DomainError::validation("email", "invalid email format"));
            }
            _ => {}
        }

        Ok(())
    }

    fn into_update(self) -> UpdateAccount {
        UpdateAccount {
            username: self.username.flatten(),
            nickname: self.nickname,
            email: self.email.flatten(),
            role: None,
        }
    }
}

/// Password change body
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PasswordChange {
    /// Current password, verified before anything changes
    pub password: String,

    /// Replacement password
    pub new_password: String,
}

/// Returns the caller's profile as resolved by the gate.
pub async fn get_profile(
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> ApiResult<Json<Account>> {
    Ok(Json(account))
}

/// Patches the caller's profile and returns the updated row.
///
/// # Errors
///
/// - `400 Bad Request`: username / nickname / email already taken
/// - `422 Unprocessable Entity`: unknown key, null for a non-nullable field,
///   field out of range
pub async fn patch_profile(
    State(state): State<AppState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Json(patch): Json<ProfilePatch>,
) -> ApiResult<Json<Account>> {
    patch.validate()?;

    let mut tx = state.db.begin().await?;
    let updated =
        Account::update_profile(&mut tx, &account.account_id, patch.into_update()).await?;
    tx.commit().await?;

    Ok(Json(updated))
}

/// Changes the caller's own password.
///
/// The current password must verify; the replacement is stored with a fresh
/// salt and the account's activation flag flips to true in the same
/// transaction.
///
/// # Errors
///
/// - `401 Unauthorized`: current password does not verify
/// - `422 Unprocessable Entity`: replacement out of range
pub async fn change_password(
    State(state): State<AppState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Json(body): Json<PasswordChange>,
) -> ApiResult<Json<Detail>> {
    validate_new_password(&body.new_password)?;

    let mut tx = state.db.begin().await?;

    let valid = Credential::verify(&mut tx, &account.account_id, &body.password).await?;
    if !valid {
        return Err(DomainError::Authentication.into());
    }

    Credential::change(&mut tx, &account.account_id, &body.new_password).await?;
    tx.commit().await?;

    Ok(Json(Detail::new("Password changed successfully.")))
}

/// Replacement passwords are 8..64 characters.
pub(crate) fn validate_new_password(password: &str) -> Result<(), DomainError> {
    let len = password.chars().count();
    if !(8..=64).contains(&len) {
        return Err(DomainError::validation(
            "new_password",
            "must be between 8 and 64 characters",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_rejects_null_for_non_nullable() {
        let patch: ProfilePatch = serde_json::from_str(r#"{"username": null}"#).unwrap();
        assert!(patch.validate().is_err());

        let patch: ProfilePatch = serde_json::from_str(r#"{"email": null}"#).unwrap();
        assert!(patch.validate().is_err());
    }

    #[test]
    fn test_patch_null_nickname_clears() {
        let patch: ProfilePatch = serde_json::from_str(r#"{"nickname": null}"#).unwrap();
        assert!(patch.validate().is_ok());

        let update = patch.into_update();
        assert_eq!(update.nickname, Some(None));
        assert!(update.username.is_none());
    }

    #[test]
    fn test_patch_field_ranges() {
        let patch: ProfilePatch =
            serde_json::from_str(r#"{"username": "this-name-is-way-too-long-to-fit"}"#).unwrap();
        assert!(patch.validate().is_err());

        let patch: ProfilePatch = serde_json::from_str(r#"{"email": "not-an-email"}"#).unwrap();
        assert!(patch.validate().is_err());

        let patch: ProfilePatch =
            serde_json::from_str(r#"{"username": "deck", "email": "deck@example.com"}"#).unwrap();
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn test_patch_rejects_unknown_keys() {
        let result = serde_json::from_str::<ProfilePatch>(r#"{"role": "ADMINISTRATOR"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_new_password_bounds() {
        assert!(validate_new_password("short").is_err());
        assert!(validate_new_password(&"x".repeat(65)).is_err());
        assert!(validate_new_password("long-enough").is_ok());
    }
}
