use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::request::Parts,
    routing::get,
    Json, Router,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{instrument, warn};

use crate::{
    auth::{User, UserSummary},
    error::ApiError,
    state::AppState,
};

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/users", get(list_users))
}

/// Passes every request when no `ADMIN_API_KEY` is configured.
pub struct AdminAccess;

#[async_trait]
impl FromRequestParts<AppState> for AdminAccess {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.admin_api_key.as_deref() else {
            return Ok(AdminAccess);
        };
        let given = parts
            .headers
            .get(ADMIN_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        if given.is_some_and(|given| keys_match(given, expected)) {
            Ok(AdminAccess)
        } else {
            warn!("admin key missing or wrong");
            Err(ApiError::Forbidden)
        }
    }
}

/// Constant-time comparison: both keys are MACed under `expected` and the tags
/// are checked with `verify_slice`.
fn keys_match(given: &str, expected: &str) -> bool {
    let tag = |key: &str| {
        Hmac::<Sha256>::new_from_slice(expected.as_bytes()).map(|mut mac| {
            mac.update(key.as_bytes());
            mac
        })
    };
    match (tag(given), tag(expected)) {
        (Ok(given), Ok(expected)) => {
            let expected = expected.finalize().into_bytes();
            given.verify_slice(&expected).is_ok()
        }
        _ => false,
    }
}

#[instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    _access: AdminAccess,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    Ok(Json(User::list_summaries(&state.db).await?))
}
