//! API handlers and the shared peer-token guard.

pub mod health;
pub mod replay;

use crate::replay::protocol::PEER_TOKEN_HEADER;
use axum::http::{HeaderMap, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use tracing::warn;

/// Shared secret every farm member presents on replay calls.
/// Without a configured token all callers are trusted.
#[derive(Clone, Default)]
pub struct PeerAuth {
    token: Option<SecretString>,
}

impl PeerAuth {
    #[must_use]
    pub fn new(token: Option<SecretString>) -> Self {
        Self { token }
    }

    /// # Errors
    /// Returns `401 Unauthorized` if a token is configured and the request does not carry it.
    pub fn authorize(&self, headers: &HeaderMap) -> Result<(), StatusCode> {
        let Some(expected) = &self.token else {
            return Ok(());
        };

        let presented = headers
            .get(PEER_TOKEN_HEADER)
            .map(|value| value.as_bytes())
            .unwrap_or_default();

        if presented.ct_eq(expected.expose_secret().as_bytes()).unwrap_u8() == 1 {
            Ok(())
        } else {
            warn!("rejected replay call with missing or invalid peer token");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

impl std::fmt::Debug for PeerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerAuth")
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}
