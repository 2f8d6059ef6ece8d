//! Conversation state and the lifecycle of one widget chat session.
//!
//! A session is keyed by a persisted UUID and holds the ordered transcript,
//! the active merchant context, and the chosen language. All remote work goes
//! through an injected [`ChatBackend`]; the bearer credential comes from an
//! injected [`TokenProvider`]. Read-path failures degrade to defaults; the
//! only user-visible failures are a blocked unauthenticated send and a
//! synthetic assistant error message when the send call itself fails.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::backend::ChatBackend;
use crate::config::VisualConfig;
use crate::lang::{self, Language};
use crate::store::WidgetStore;
use crate::token::TokenProvider;

/// Context adopted when the remote lookup fails or has not run yet.
pub const DEFAULT_CONTEXT: &str = "example-context";

/// Fixed transcript reply appended when a send fails.
pub const SEND_ERROR_REPLY: &str = "❌ Ocurrió un error al enviar el mensaje. Intenta nuevamente.";

/// Who authored a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single message in the transcript (assistant replies may carry a link).
/// Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            url: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// What happened to one `send_message` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Assistant reply appended and transcript persisted.
    Delivered,
    /// Send failed; a fixed error reply was appended instead.
    Failed,
    /// Trimmed text was empty; nothing changed.
    Empty,
    /// No bearer token; the front end should show a sign-in notice.
    NotAuthenticated,
    /// A send is already in flight; at most one runs per session.
    Busy,
}

/// One widget conversation: transcript, context, language, and the remote
/// calls that drive them.
pub struct ChatSession<B: ChatBackend> {
    backend: B,
    tokens: Box<dyn TokenProvider>,
    store: WidgetStore,
    visual: VisualConfig,
    session_id: String,
    active_context: String,
    language: Language,
    messages: Vec<Message>,
    input: String,
    loading: bool,
}

impl<B: ChatBackend> ChatSession<B> {
    /// Build a session over persisted state: stored language and context win
    /// over the visual defaults; the session id is ensured by `initialize`.
    pub fn new(
        backend: B,
        tokens: Box<dyn TokenProvider>,
        store: WidgetStore,
        visual: VisualConfig,
    ) -> Self {
        let stored = store.load();
        let language = stored.user_language.unwrap_or(visual.language);
        let active_context = stored
            .active_context
            .unwrap_or_else(|| DEFAULT_CONTEXT.to_string());
        let session_id = stored.session_id.unwrap_or_default();
        Self {
            backend,
            tokens,
            store,
            visual,
            session_id,
            active_context,
            language,
            messages: Vec::new(),
            input: String::new(),
            loading: false,
        }
    }

    /// Run once at mount: ensure the session id, adopt the remote context
    /// (sentinel on failure — never an error to the caller), ping the context
    /// confirmation endpoint, then load the transcript.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.session_id.is_empty() {
            let stored = self.store.load();
            self.session_id = match stored.session_id {
                Some(id) => id,
                None => {
                    let id = uuid::Uuid::new_v4().to_string();
                    let persisted = id.clone();
                    self.store.update(move |s| s.session_id = Some(persisted))?;
                    log::info!("generated new session id {}", id);
                    id
                }
            };
        }

        let token = self.tokens.token().await;
        self.active_context = match self.backend.active_context(token.as_deref()).await {
            Ok(ctx) => ctx,
            Err(e) => {
                log::warn!("context lookup failed, using {}: {}", DEFAULT_CONTEXT, e);
                DEFAULT_CONTEXT.to_string()
            }
        };
        let ctx = self.active_context.clone();
        self.store.update(move |s| s.active_context = Some(ctx))?;

        // Response body is unused; the call stays for its backend-side effects.
        if let Err(e) = self
            .backend
            .confirm_context(&self.active_context, token.as_deref())
            .await
        {
            log::debug!("context confirmation failed (ignored): {}", e);
        }

        self.load_history().await
    }

    /// Adopt the cached transcript if one exists, else ask the backend, else
    /// seed a welcome message (persisted only by the next successful send).
    pub async fn load_history(&mut self) -> Result<()> {
        let stored = self.store.load();
        if let Some(history) = stored.chat_history {
            if !history.is_empty() {
                self.messages = history;
                return Ok(());
            }
        }

        let token = self.tokens.token().await;
        match self.backend.history(&self.session_id, token.as_deref()).await {
            Ok(history) if !history.is_empty() => {
                self.messages = history.clone();
                self.store.update(move |s| s.chat_history = Some(history))?;
            }
            Ok(_) => self.seed_welcome(),
            Err(e) => {
                log::debug!("history lookup failed, seeding welcome: {}", e);
                self.seed_welcome();
            }
        }
        Ok(())
    }

    /// Send one message: optimistic user append, bounded remote call, assistant
    /// reply (or the fixed error reply) appended on resolution. Preconditions
    /// that fail leave the state untouched.
    pub async fn send_message(&mut self, text: &str) -> Result<SendOutcome> {
        let msg = text.trim();
        if msg.is_empty() {
            return Ok(SendOutcome::Empty);
        }
        if self.loading {
            return Ok(SendOutcome::Busy);
        }
        let token = match self.tokens.token().await {
            Some(t) => t,
            None => return Ok(SendOutcome::NotAuthenticated),
        };

        self.messages.push(Message::user(msg));
        self.input.clear();
        self.loading = true;
        let result = self.backend.send(msg, &token).await;
        self.loading = false;

        match result {
            Ok(reply) => {
                let mut message = Message::assistant(reply.response);
                message.url = reply.url;
                self.messages.push(message);
                self.persist_history()?;
                Ok(SendOutcome::Delivered)
            }
            Err(e) => {
                log::warn!("send failed: {}", e);
                self.messages.push(Message::assistant(SEND_ERROR_REPLY));
                Ok(SendOutcome::Failed)
            }
        }
    }

    /// Send whatever is in the input buffer.
    pub async fn send_input(&mut self) -> Result<SendOutcome> {
        let text = self.input.clone();
        self.send_message(&text).await
    }

    /// Notify the backend (outcome ignored), drop the transcript and persisted
    /// session id, and reseed one welcome message. The in-memory id stays
    /// valid until the next `initialize` regenerates it.
    pub async fn reset_session(&mut self) -> Result<()> {
        if let Err(e) = self.backend.reset().await {
            log::debug!("reset notification failed (ignored): {}", e);
        }
        self.messages.clear();
        self.store.update(|s| {
            s.session_id = None;
            s.chat_history = None;
        })?;
        self.seed_welcome();
        Ok(())
    }

    /// Switch display language. The conversation is discarded with it, as the
    /// widget has always done.
    pub async fn change_language(&mut self, lang: Language) -> Result<()> {
        self.language = lang;
        self.store.update(move |s| s.user_language = Some(lang))?;
        self.reset_session().await
    }

    fn seed_welcome(&mut self) {
        self.messages = vec![Message::assistant(lang::welcome_message(
            self.language,
            &self.visual.bot_name,
        ))];
    }

    fn persist_history(&self) -> Result<()> {
        let history = self.messages.clone();
        self.store.update(move |s| s.chat_history = Some(history))
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn active_context(&self) -> &str {
        &self.active_context
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Stage text in the input buffer (typed text or a quick reply).
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn visual(&self) -> &VisualConfig {
        &self.visual
    }

    #[cfg(test)]
    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }
}
