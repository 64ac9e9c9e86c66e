use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        claims::Identity,
        dto::{LoginRequest, PublicUser, RegisterRequest, TokenResponse},
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password_blocking, verify_password_blocking},
        repo::CreateUserError,
        repo_types::User,
        services::{is_valid_email, normalize_email, requested_plan},
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(payload) = payload?;
    let email = normalize_email(&payload.email);

    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation("Email and password required".into()));
    }

    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }

    let plan = requested_plan(payload.plan.as_deref())?;
    let hash = hash_password_blocking(payload.password).await?;

    let name = payload.name.unwrap_or_default();
    let user = User::create(&state.db, name.trim(), &email, &hash, plan)
        .await
        .map_err(|e| match e {
            CreateUserError::DuplicateEmail => {
                warn!(%email, "email already registered");
                ApiError::DuplicateEmail
            }
            CreateUserError::Db(e) => ApiError::Internal(e.into()),
        })?;

    let token = JwtKeys::from_ref(&state).sign(&Identity::from(&user))?;

    info!(user_id = user.id, email = %user.email, plan = %user.plan, "user registered");
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(payload) = payload?;
    let email = normalize_email(&payload.email);

    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        warn!(%email, "login unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password_blocking(payload.password, user.password_hash.clone()).await? {
        warn!(%email, user_id = user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = JwtKeys::from_ref(&state).sign(&Identity::from(&user))?;

    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok(Json(TokenResponse { token }))
}

/// Profile comes from the store, so the plan is current even when the
/// token's claim is stale.
#[instrument(skip(state, claims), fields(user_id = claims.sub))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or(ApiError::NotFound("No user"))?;

    Ok(Json(PublicUser {
        id: user.id,
        email: user.email,
        name: user.name,
        plan: user.plan,
    }))
}
