mod dto;
pub mod handlers;
pub mod repo;
pub mod reply;

use crate::state::AppState;
use axum::Router;

pub use dto::{ChatRequest, ChatResponse};
pub use repo::ChatRecord;

pub fn router() -> Router<AppState> {
    handlers::chat_routes()
}
