use reqwest::{Response, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;

use crate::auth::{dto::PublicUser, Plan, UserSummary};
use crate::chat::ChatRecord;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with an `{error}` body.
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid server url: {0}")]
    Url(#[from] url::ParseError),
    #[error("token storage: {0}")]
    Storage(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub plan: Plan,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct TokenBody {
    token: String,
}

#[derive(Deserialize)]
struct ReplyBody {
    reply: String,
}

#[derive(Deserialize)]
struct UrlBody {
    url: String,
}

/// Typed client for the HTTP surface. Stateless: tokens are passed per call.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    pub async fn register(&self, form: &RegisterForm) -> Result<String, ClientError> {
        let body: TokenBody = self.post("api/register", None, form).await?;
        Ok(body.token)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String, ClientError> {
        let body: TokenBody = self
            .post("api/login", None, &json!({ "email": email, "password": password }))
            .await?;
        Ok(body.token)
    }

    pub async fn me(&self, token: &str) -> Result<PublicUser, ClientError> {
        self.get("api/me", Some(token), None).await
    }

    pub async fn chat(&self, token: &str, message: &str) -> Result<String, ClientError> {
        let body: ReplyBody = self
            .post("api/chat", Some(token), &json!({ "message": message }))
            .await?;
        Ok(body.reply)
    }

    pub async fn chat_history(&self, token: &str) -> Result<Vec<ChatRecord>, ClientError> {
        self.get("api/chat/history", Some(token), None).await
    }

    pub async fn create_checkout_session(&self, token: &str) -> Result<String, ClientError> {
        let body: UrlBody = self
            .post("api/create-checkout-session", Some(token), &json!({}))
            .await?;
        Ok(body.url)
    }

    pub async fn admin_users(
        &self,
        admin_key: Option<&str>,
    ) -> Result<Vec<UserSummary>, ClientError> {
        self.get("api/admin/users", None, admin_key).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<T, ClientError> {
        let mut req = self.http.post(self.base.join(path)?).json(body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        decode(req.send().await?).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        admin_key: Option<&str>,
    ) -> Result<T, ClientError> {
        let mut req = self.http.get(self.base.join(path)?);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(key) = admin_key {
            req = req.header(crate::admin::handlers::ADMIN_KEY_HEADER, key);
        }
        decode(req.send().await?).await
    }
}

async fn decode<T: DeserializeOwned>(res: Response) -> Result<T, ClientError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res.json::<T>().await?);
    }
    let message = match res.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.to_string(),
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
