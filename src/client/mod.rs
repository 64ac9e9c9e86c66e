//! Client side of the chat service: a typed HTTP client, token persistence,
//! and the controller that drives the UI state.

mod api;
mod controller;
mod session;

pub use api::{ApiClient, ClientError, RegisterForm};
pub use controller::{Author, ClientController, TranscriptLine, UiState, BOT_NAME, CHECKOUT_FAILED};
pub use session::{Session, TokenStore};
