use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{ChatRequest, ChatResponse},
    repo::{self, ChatRecord},
    reply,
};
use crate::{
    auth::{AuthUser, User},
    error::ApiError,
    state::AppState,
};

pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat))
        .route("/chat/history", get(history))
}

/// The reply is gated on the plan stored for the user, not the token claim.
#[instrument(skip(state, claims, payload), fields(user_id = claims.sub))]
pub async fn chat(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(payload) = payload?;
    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or(ApiError::NotFound("No user"))?;

    let reply = reply::generate(user.plan, &user.name, &payload.message)?;

    repo::record(&state.db, user.id, &payload.message, &reply).await;

    info!(plan = %user.plan, "chat reply sent");
    Ok(Json(ChatResponse { reply }))
}

#[instrument(skip(state, claims), fields(user_id = claims.sub))]
pub async fn history(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<ChatRecord>>, ApiError> {
    Ok(Json(ChatRecord::list_by_user(&state.db, claims.sub).await?))
}

#[cfg(test)]
mod tests {
    use crate::auth::{Plan, User};
    use crate::chat::{reply::VIOLENCE_ADVISORY, ChatRecord};
    use crate::state::fake;
    use crate::test_support::{register_user, send, TestApp};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    async fn chat(app: &TestApp, token: &str, message: &str) -> (StatusCode, serde_json::Value) {
        send(app, Method::POST, "/api/chat", Some(token), Some(json!({ "message": message }))).await
    }

    #[tokio::test]
    async fn free_user_gets_echo_without_advisory() {
        let app = TestApp::new(fake::state().await);
        let token = register_user(&app, "Ana", "ana@example.com", "pw", Some("gratuito")).await;

        let (status, body) = chat(&app, &token, "¿Qué hago?").await;
        assert_eq!(status, StatusCode::OK);
        let reply = body["reply"].as_str().unwrap();
        assert!(reply.contains("¿Qué hago?"));
        assert!(reply.contains("Hola Ana"));
        assert!(!reply.contains(VIOLENCE_ADVISORY));
    }

    #[tokio::test]
    async fn premium_user_gets_advisory_only_on_keyword() {
        let app = TestApp::new(fake::state().await);
        let token = register_user(&app, "Ana", "ana@example.com", "pw", Some("premium")).await;

        let (_, body) = chat(&app, &token, "Mi vecino sufre violencia").await;
        assert!(body["reply"].as_str().unwrap().contains(VIOLENCE_ADVISORY));

        let (_, body) = chat(&app, &token, "Quiero un contrato de alquiler").await;
        assert!(!body["reply"].as_str().unwrap().contains(VIOLENCE_ADVISORY));
    }

    #[tokio::test]
    async fn empty_message_is_rejected_and_not_recorded() {
        let state = fake::state().await;
        let db = state.db.clone();
        let app = TestApp::new(state);
        let token = register_user(&app, "Ana", "ana@example.com", "pw", None).await;

        for message in ["", "   "] {
            let (status, body) = chat(&app, &token, message).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "No message");
        }
        let (status, _) =
            send(&app, Method::POST, "/api/chat", Some(&token), Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chats")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn every_reply_is_recorded_and_listed() {
        let state = fake::state().await;
        let db = state.db.clone();
        let app = TestApp::new(state);
        let token = register_user(&app, "Ana", "ana@example.com", "pw", None).await;

        let (_, first) = chat(&app, &token, "primera").await;
        chat(&app, &token, "segunda").await;

        let user = User::find_by_email(&db, "ana@example.com").await.unwrap().unwrap();
        let records = ChatRecord::list_by_user(&db, user.id).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].user_message, "primera");
        assert_eq!(records[0].bot_reply, first["reply"].as_str().unwrap());

        let (status, body) = send(&app, Method::GET, "/api/chat/history", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(body[1]["user_message"], "segunda");
    }

    #[tokio::test]
    async fn message_is_echoed_and_recorded_as_sent() {
        let state = fake::state().await;
        let db = state.db.clone();
        let app = TestApp::new(state);
        let token = register_user(&app, "Ana", "ana@example.com", "pw", None).await;

        let (status, body) = chat(&app, &token, "  hola\n").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["reply"].as_str().unwrap().contains("\"  hola\n\""));

        let user = User::find_by_email(&db, "ana@example.com").await.unwrap().unwrap();
        let records = ChatRecord::list_by_user(&db, user.id).await.unwrap();
        assert_eq!(records[0].user_message, "  hola\n");
    }

    #[tokio::test]
    async fn reply_uses_stored_plan_not_token_claim() {
        let state = fake::state().await;
        let db = state.db.clone();
        let app = TestApp::new(state);
        // Token minted while the user was on the free plan.
        let token = register_user(&app, "Ana", "ana@example.com", "pw", None).await;
        let user = User::find_by_email(&db, "ana@example.com").await.unwrap().unwrap();
        User::set_plan(&db, user.id, Plan::Premium).await.unwrap();

        let (_, body) = chat(&app, &token, "violencia").await;
        let reply = body["reply"].as_str().unwrap();
        assert!(reply.contains("Versión premium"));
        assert!(reply.contains(VIOLENCE_ADVISORY));
    }

    #[tokio::test]
    async fn chat_requires_token() {
        let app = TestApp::new(fake::state().await);
        let (status, body) =
            send(&app, Method::POST, "/api/chat", None, Some(json!({ "message": "hola" }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "No token");
    }

    #[tokio::test]
    async fn reply_survives_history_failure() {
        let state = fake::state().await;
        let db = state.db.clone();
        let app = TestApp::new(state);
        let token = register_user(&app, "Ana", "ana@example.com", "pw", None).await;
        sqlx::query("DROP TABLE chats").execute(&db).await.unwrap();

        let (status, body) = chat(&app, &token, "hola").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["reply"].as_str().unwrap().contains("hola"));
    }
}
