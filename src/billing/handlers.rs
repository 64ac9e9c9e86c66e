use axum::{
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use super::{
    dto::{CheckoutResponse, WebhookAck},
    provider::CheckoutRequest,
    webhook::{verify_signature, Entitlement, SignatureError, WebhookEvent},
};
use crate::{
    auth::{AuthUser, Plan, User},
    error::ApiError,
    state::AppState,
};

pub fn checkout_routes() -> Router<AppState> {
    Router::new().route("/create-checkout-session", post(create_checkout_session))
}

pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhook", post(webhook))
}

#[instrument(skip(state, claims), fields(user_id = claims.sub))]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or(ApiError::NotFound("No user"))?;

    let domain = state.config.frontend_url.trim_end_matches('/');
    let req = CheckoutRequest {
        user_id: user.id,
        customer_email: user.email,
        price_id: state.config.stripe.price_id.clone(),
        // {CHECKOUT_SESSION_ID} is substituted by Stripe.
        success_url: format!("{domain}/?checkout=success&session_id={{CHECKOUT_SESSION_ID}}"),
        cancel_url: format!("{domain}/?checkout=cancel"),
    };

    let session = state
        .payments
        .create_checkout_session(&req)
        .await
        .map_err(ApiError::PaymentProvider)?;

    info!(session_id = %session.id, "checkout session created");
    Ok(Json(CheckoutResponse { url: session.url }))
}

/// Plans only change for signed events; without an endpoint secret the
/// event is logged and acknowledged.
#[instrument(skip_all)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let verified = match state.config.stripe.endpoint_secret.as_deref() {
        Some(secret) => {
            let header = headers
                .get("stripe-signature")
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| ApiError::Webhook(SignatureError::MissingHeader.to_string()))?;
            let now = OffsetDateTime::now_utc().unix_timestamp();
            verify_signature(&body, header, secret, now).map_err(|e| {
                warn!(error = %e, "webhook signature verification failed");
                ApiError::Webhook(e.to_string())
            })?;
            true
        }
        None => false,
    };

    let event: WebhookEvent =
        serde_json::from_slice(&body).map_err(|e| ApiError::Webhook(e.to_string()))?;

    if event.is_recognized() {
        info!(event_id = %event.id, event_type = %event.kind, verified, "stripe event");
    }

    match event.entitlement() {
        Entitlement::Unchanged => {}
        change if !verified => {
            warn!(?change, event_type = %event.kind, "unsigned webhook; plan left unchanged")
        }
        Entitlement::Grant { user_id } => apply_plan(&state, user_id, Plan::Premium).await?,
        Entitlement::Revoke { user_id } => apply_plan(&state, user_id, Plan::Gratuito).await?,
    }

    Ok(Json(WebhookAck { received: true }))
}

async fn apply_plan(state: &AppState, user_id: i64, plan: Plan) -> Result<(), ApiError> {
    if User::set_plan(&state.db, user_id, plan).await? {
        info!(user_id, %plan, "plan changed");
    } else {
        warn!(user_id, "webhook references unknown user");
    }
    Ok(())
}
