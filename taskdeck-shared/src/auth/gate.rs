/// Authorization gate
///
/// The single place privilege is checked. Every protected route declares a
/// [`Capability`]; the gate parses the bearer token, resolves the caller's
/// profile, evaluates the capability, and injects [`CurrentAccount`] into
/// the request extensions. Components below the gate trust their caller.
///
/// Rejection reasons are distinguishable to the client:
///
/// - missing/invalid/expired token → 401 "Authentication was unsuccessful."
/// - authenticated but not activated → 401 "Not an active user."
/// - activated but insufficient role → 403 "Without permission user."
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Router};
/// use sqlx::PgPool;
/// use taskdeck_shared::auth::gate::{require, Capability};
///
/// # fn example(pool: PgPool) {
/// let app: Router = Router::new()
///     .route("/mine/profile", get(|| async { "profile" }))
///     .layer(middleware::from_fn(require(
///         pool,
///         "secret".into(),
///         "taskdeck-users".into(),
///         Capability::Authenticated,
///     )));
/// # }
/// ```

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;

use super::token::{parse_token, strip_bearer};
use crate::error::DomainError;
use crate::models::account::{Account, AccountRole};

/// The minimum role + activation state a caller must present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Token parses to an existing account
    Authenticated,

    /// `Authenticated` and the account is active
    Activated,

    /// `Activated` and role is ADMINISTRATOR or GENERAL
    ActivatedNotProvisional,

    /// `Activated` and role is ADMINISTRATOR
    ActivatedAdministrator,
}

impl Capability {
    /// Evaluates this capability against a resolved profile.
    pub fn admit(&self, account: &Account) -> Result<(), DomainError> {
        if matches!(self, Capability::Authenticated) {
            return Ok(());
        }

        if !account.is_active {
            return Err(DomainError::NotActive);
        }

        match self {
            Capability::Authenticated | Capability::Activated => Ok(()),
            Capability::ActivatedNotProvisional => match account.role {
                AccountRole::Administrator | AccountRole::General => Ok(()),
                AccountRole::Provisional => Err(DomainError::Forbidden),
            },
            Capability::ActivatedAdministrator => match account.role {
                AccountRole::Administrator => Ok(()),
                _ => Err(DomainError::Forbidden),
            },
        }
    }
}

/// The resolved caller, injected into request extensions by the gate
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub Account);

/// Gate rejection wrapper so the middleware can short-circuit with the
/// correct status and detail body.
#[derive(Debug)]
pub struct GateRejection(pub DomainError);

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DomainError::Authentication | DomainError::NotActive => StatusCode::UNAUTHORIZED,
            DomainError::Forbidden => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let detail = match &self.0 {
            DomainError::Internal(err) => {
                tracing::error!("gate failure: {}", err);
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

/// Parses the bearer token from the request headers and loads the caller's
/// profile. Every failure mode (missing header, wrong prefix, bad signature,
/// wrong audience, expiry, unknown account) collapses to `Authentication`.
pub async fn resolve_caller(
    pool: &PgPool,
    secret: &str,
    audience: &str,
    headers: &axum::http::HeaderMap,
) -> Result<Account, DomainError> {
    let header_value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(DomainError::Authentication)?;

    let token = strip_bearer(header_value).ok_or(DomainError::Authentication)?;

    let account_id =
        parse_token(token, secret, audience).map_err(|_| DomainError::Authentication)?;

    let mut conn = pool.acquire().await?;
    Account::find_by_id(&mut conn, &account_id)
        .await?
        .ok_or(DomainError::Authentication)
}

/// Creates an axum middleware enforcing `capability`.
///
/// Captures the pool and token configuration so the returned closure can be
/// mounted with `axum::middleware::from_fn`.
pub fn require(
    pool: PgPool,
    secret: String,
    audience: String,
    capability: Capability,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<
    Box<dyn std::future::Future<Output = Result<Response, GateRejection>> + Send>,
> + Clone {
    move |req, next| {
        let pool = pool.clone();
        let secret = secret.clone();
        let audience = audience.clone();
        Box::pin(gate_middleware(pool, secret, audience, capability, req, next))
    }
}

async fn gate_middleware(
    pool: PgPool,
    secret: String,
    audience: String,
    capability: Capability,
    mut req: Request,
    next: Next,
) -> Result<Response, GateRejection> {
    let account = resolve_caller(&pool, &secret, &audience, req.headers())
        .await
        .map_err(GateRejection)?;

    capability.admit(&account).map_err(GateRejection)?;

    req.extensions_mut().insert(CurrentAccount(account));

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn account(role: AccountRole, is_active: bool) -> Account {
        Account {
            account_id: "T-901".to_string(),
            username: "tester".to_string(),
            nickname: None,
            email: "tester@example.com".to_string(),
            role,
            is_active,
            email_verified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_authenticated_admits_inactive() {
        let a = account(AccountRole::General, false);
        assert!(Capability::Authenticated.admit(&a).is_ok());
    }

    #[test]
    fn test_activated_rejects_inactive() {
        let a = account(AccountRole::General, false);
        assert!(matches!(
            Capability::Activated.admit(&a),
            Err(DomainError::NotActive)
        ));

        let a = account(AccountRole::General, true);
        assert!(Capability::Activated.admit(&a).is_ok());
    }

    #[test]
    fn test_not_provisional_capability() {
        let provisional = account(AccountRole::Provisional, true);
        assert!(matches!(
            Capability::ActivatedNotProvisional.admit(&provisional),
            Err(DomainError::Forbidden)
        ));

        let general = account(AccountRole::General, true);
        assert!(Capability::ActivatedNotProvisional.admit(&general).is_ok());

        let admin = account(AccountRole::Administrator, true);
        assert!(Capability::ActivatedNotProvisional.admit(&admin).is_ok());
    }

    #[test]
    fn test_administrator_capability() {
        let general = account(AccountRole::General, true);
        assert!(matches!(
            Capability::ActivatedAdministrator.admit(&general),
            Err(DomainError::Forbidden)
        ));

        let admin = account(AccountRole::Administrator, true);
        assert!(Capability::ActivatedAdministrator.admit(&admin).is_ok());
    }

    #[test]
    fn test_activation_checked_before_role() {
        // An inactive administrator is rejected as not-active, not forbidden.
        let inactive_admin = account(AccountRole::Administrator, false);
        assert!(matches!(
            Capability::ActivatedAdministrator.admit(&inactive_admin),
            Err(DomainError::NotActive)
        ));
    }
}
