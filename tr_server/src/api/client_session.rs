//! Signed client session cookie.
//!
//! The cookie carries the opaque session key the matchmaker binds rooms to,
//! as `<uuid>.<hex sha256 of secret and uuid>`. Requests without a valid
//! cookie get a fresh session and a `Set-Cookie` header on the response.

use axum::{
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue,
        header::{COOKIE, SET_COOKIE},
    },
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tictac_rooms::ClientSession;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "ttr.sid";

/// Cookie signing settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    secret: String,
    max_age: Duration,
}

impl SessionConfig {
    pub fn new(secret: impl Into<String>, max_age: Duration) -> Self {
        Self {
            secret: secret.into(),
            max_age,
        }
    }

    fn signature(&self, id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b".");
        hasher.update(id.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Cookie value for a session
    pub fn sign(&self, session: ClientSession) -> String {
        let id = session.to_string();
        let signature = self.signature(&id);
        format!("{id}.{signature}")
    }

    /// Session carried by a cookie value, if the signature checks out
    pub fn verify(&self, value: &str) -> Option<ClientSession> {
        let (id, signature) = value.split_once('.')?;
        let expected = self.signature(id);
        if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            return None;
        }
        id.parse().ok()
    }

    /// Full `Set-Cookie` header value for a session
    pub fn set_cookie(&self, session: ClientSession) -> String {
        format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            SESSION_COOKIE,
            self.sign(session),
            self.max_age.as_secs()
        )
    }
}

/// Value of the session cookie among the request's `Cookie` headers
fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
}

/// Middleware resolving the client session and minting one when absent
///
/// Handlers read the session with `Extension<ClientSession>`.
pub async fn client_session_middleware(
    State(config): State<Arc<SessionConfig>>,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = session_cookie(request.headers()).and_then(|value| config.verify(value));
    let (session, minted) = match existing {
        Some(session) => (session, false),
        None => (ClientSession::new(), true),
    };

    request.extensions_mut().insert(session);
    let mut response = next.run(request).await;

    if minted {
        tracing::debug!(session = %session, "Minted client session");
        if let Ok(value) = HeaderValue::from_str(&config.set_cookie(session)) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }

    response
}
