mod dto;
pub mod handlers;
mod provider;
pub mod webhook;

use crate::state::AppState;
use axum::Router;

pub use dto::CheckoutResponse;
pub use provider::{CheckoutRequest, CheckoutSession, PaymentError, PaymentProvider, StripeClient};

/// Routes mounted under `/api`.
pub fn router() -> Router<AppState> {
    handlers::checkout_routes()
}

/// Provider callbacks, mounted at the root.
pub fn webhook_router() -> Router<AppState> {
    handlers::webhook_routes()
}
