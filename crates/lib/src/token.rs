//! Bearer token providers.
//!
//! The session never issues credentials itself; it asks an injected provider
//! on demand and treats `None` as "unauthenticated" (sends are blocked).

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Supplies the bearer credential presented on each remote call.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current token, or None when unauthenticated.
    async fn token(&self) -> Option<String>;
}

/// Fixed token (CLI --token flag, tests).
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self(token.and_then(|t| {
            let t = t.trim().to_string();
            if t.is_empty() {
                None
            } else {
                Some(t)
            }
        }))
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Guest token fetched from the chat service for a storefront domain.
/// Fetched lazily and cached; a failed fetch leaves the cache empty so the
/// next ask retries.
pub struct GuestToken {
    base_url: String,
    shop_domain: String,
    client: reqwest::Client,
    cached: RwLock<Option<String>>,
}

#[derive(Debug, serde::Deserialize)]
struct GuestTokenResponse {
    token: Option<String>,
}

impl GuestToken {
    pub fn new(base_url: impl Into<String>, shop_domain: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            shop_domain: shop_domain.into(),
            client: reqwest::Client::new(),
            cached: RwLock::new(None),
        }
    }

    /// GET /guest_token?shop={domain} — returns the token, if the service issued one.
    async fn fetch(&self) -> Option<String> {
        let url = format!("{}/guest_token?shop={}", self.base_url, self.shop_domain);
        let res = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                log::debug!("guest token request failed: {}", e);
                return None;
            }
        };
        if !res.status().is_success() {
            log::debug!("guest token request returned {}", res.status());
            return None;
        }
        match res.json::<GuestTokenResponse>().await {
            Ok(body) => body.token.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                log::debug!("guest token response unparseable: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl TokenProvider for GuestToken {
    async fn token(&self) -> Option<String> {
        if let Some(t) = self.cached.read().await.clone() {
            return Some(t);
        }
        let fetched = self.fetch().await;
        if let Some(ref t) = fetched {
            *self.cached.write().await = Some(t.clone());
        }
        fetched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_token_trims_and_drops_empty() {
        assert_eq!(
            StaticToken::new(Some(" jwt ".to_string())).token().await,
            Some("jwt".to_string())
        );
        assert_eq!(StaticToken::new(Some("  ".to_string())).token().await, None);
        assert_eq!(StaticToken::new(None).token().await, None);
    }
}
