use tracing::debug;

use super::{
    api::{ApiClient, ClientError, RegisterForm},
    session::{Session, TokenStore},
};

pub const BOT_NAME: &str = "IurisBot";
pub const CHECKOUT_FAILED: &str = "Error al crear sesión de pago";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub author: Author,
    pub text: String,
}

/// What the UI shows. Mutated only by controller actions.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UiState {
    pub status: String,
    pub chat_enabled: bool,
    pub subscribe_enabled: bool,
    pub transcript: Vec<TranscriptLine>,
}

/// Glue between user actions and the API. Each action makes at most one
/// network call; nothing is retried or queued.
pub struct ClientController {
    api: ApiClient,
    store: TokenStore,
    ui: UiState,
}

impl ClientController {
    pub fn new(api: ApiClient, store: TokenStore) -> Self {
        Self {
            api,
            store,
            ui: UiState::default(),
        }
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// On load: reuse the stored token and fetch the profile it belongs to.
    pub async fn restore(&mut self) -> Result<Option<Session>, ClientError> {
        let Some(token) = self.store.load()? else {
            return Ok(None);
        };
        let session = self.refresh_profile(Session::new(token)).await?;
        Ok(Some(session))
    }

    pub async fn refresh_profile(&mut self, mut session: Session) -> Result<Session, ClientError> {
        let profile = self.api.me(&session.token).await?;
        self.ui.status = format!("Conectado como {} — Plan: {}", profile.email, profile.plan);
        self.enable_controls();
        session.profile = Some(profile);
        Ok(session)
    }

    pub async fn register(&mut self, form: RegisterForm) -> Result<Session, ClientError> {
        let email = form.email.clone();
        let result = self.api.register(&form).await;
        self.start_session(result, &email)
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<Session, ClientError> {
        let result = self.api.login(email, password).await;
        self.start_session(result, email)
    }

    fn start_session(
        &mut self,
        result: Result<String, ClientError>,
        email: &str,
    ) -> Result<Session, ClientError> {
        match result {
            Ok(token) => {
                self.store.save(&token)?;
                self.ui.status = format!("Conectado como {email}");
                self.enable_controls();
                debug!(token_file = %self.store.path().display(), "token stored");
                Ok(Session::new(token))
            }
            Err(e) => {
                self.ui.status = e.to_string();
                Err(e)
            }
        }
    }

    /// Blank input is ignored without a network call. The user's own line is
    /// echoed before the request goes out.
    pub async fn send_message(
        &mut self,
        session: &Session,
        input: &str,
    ) -> Result<Option<String>, ClientError> {
        let message = input.trim();
        if message.is_empty() {
            return Ok(None);
        }
        self.push(Author::User, message.to_string());

        match self.api.chat(&session.token, message).await {
            Ok(reply) => {
                let reply = if reply.is_empty() { "Sin respuesta".to_string() } else { reply };
                self.push(Author::Bot, reply.clone());
                Ok(Some(reply))
            }
            Err(e) => {
                self.push(Author::Bot, format!("Error: {e}"));
                Err(e)
            }
        }
    }

    /// Returns the checkout URL the user should be sent to.
    pub async fn subscribe(&mut self, session: &Session) -> Result<String, ClientError> {
        match self.api.create_checkout_session(&session.token).await {
            Ok(url) => Ok(url),
            Err(e) => {
                self.ui.status = CHECKOUT_FAILED.to_string();
                Err(e)
            }
        }
    }

    pub fn logout(&mut self) -> Result<(), ClientError> {
        self.store.clear()?;
        self.ui = UiState::default();
        Ok(())
    }

    fn enable_controls(&mut self) {
        self.ui.chat_enabled = true;
        self.ui.subscribe_enabled = true;
    }

    fn push(&mut self, author: Author, text: String) {
        self.ui.transcript.push(TranscriptLine { author, text });
    }
}
