//! Widget languages and the localized strings the session and CLI render.
//!
//! The welcome message is seeded into a fresh transcript; the placeholder and
//! privacy strings are presentation text for whatever front end hosts the
//! session.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Languages the widget ships translations for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Spanish (product default).
    #[default]
    Es,
    /// English.
    En,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Es => "es",
            Language::En => "en",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "es" => Ok(Language::Es),
            "en" => Ok(Language::En),
            other => Err(format!("unknown language: {}", other)),
        }
    }
}

/// Welcome message seeded into an empty or freshly reset transcript.
pub fn welcome_message(lang: Language, bot_name: &str) -> String {
    match lang {
        Language::Es => format!("¡Hola! Soy {} 🤖, ¿en qué puedo ayudarte hoy?", bot_name),
        Language::En => format!("Hello! I'm {} 🤖, how can I assist you today?", bot_name),
    }
}

/// Input placeholder shown next to the message prompt.
pub fn input_placeholder(lang: Language) -> &'static str {
    match lang {
        Language::Es => "Escribe tu mensaje...",
        Language::En => "Type your message...",
    }
}

/// Privacy notice line; `{url}` is the merchant's policy link.
pub fn privacy_notice(lang: Language, url: &str) -> String {
    match lang {
        Language::Es => format!("Al chatear aceptas nuestra Política de Privacidad: {}", url),
        Language::En => format!("By chatting, you accept our Privacy Policy: {}", url),
    }
}

/// Quick-reply suggestions the widget offers as one-tap buttons; picking one
/// stages it in the input buffer.
pub fn quick_replies(lang: Language, bot_name: &str) -> [String; 3] {
    match lang {
        Language::Es => [
            format!("¡Hola! Soy {} 🤖, estoy para ayudarte", bot_name),
            "¿Necesitas ayuda? Escríbeme 👀".to_string(),
            "Pregunta lo que quieras, estoy aquí para ayudarte 😉".to_string(),
        ],
        Language::En => [
            format!("Hello! I'm {} 🤖, here to help", bot_name),
            "Need help? Write to me 👀".to_string(),
            "Ask me anything, I'm here to assist you 😉".to_string(),
        ],
    }
}

/// Blocking notice shown when a send is attempted without a bearer token.
pub fn login_required_notice(lang: Language) -> &'static str {
    match lang {
        Language::Es => "Debes iniciar sesión para usar el chatbot.",
        Language::En => "You must sign in to use the chatbot.",
    }
}
