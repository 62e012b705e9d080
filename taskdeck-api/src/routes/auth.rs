/// Login endpoint
///
/// Exchanges account credentials for a bearer access token. The form's
/// `username` field carries the account identifier, matching the wire
/// contract of existing clients.
///
/// # Endpoint
///
/// ```text
/// POST /api/login
/// Content-Type: application/x-www-form-urlencoded
///
/// username=T-901&password=secret
/// ```
///
/// Response:
/// ```json
/// { "access_token": "eyJ...", "token_type": "bearer" }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: unknown account or wrong password, indistinguishable
/// - `422 Unprocessable Entity`: malformed form

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Form, Json};
use serde::{Deserialize, Serialize};
use taskdeck_shared::{auth::token::mint_token, error::DomainError, models::credential::Credential};

/// Login form; unrecognized fields are rejected
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginForm {
    /// Account identifier
    pub username: String,

    /// Plaintext password
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// Signed access token
    pub access_token: String,

    /// Always "bearer"
    pub token_type: &'static str,
}

/// Login handler
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> ApiResult<Json<TokenResponse>> {
    let mut tx = state.db.begin().await?;

    let valid = Credential::verify(&mut *tx, &form.username, &form.password).await?;
    if !valid {
        return Err(DomainError::Authentication.into());
    }

    tx.commit().await?;

    let access_token = mint_token(
        &form.username,
        state.token_ttl(),
        state.secret(),
        state.audience(),
    )
    .map_err(|e| DomainError::Internal(anyhow::anyhow!(e)))?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}
