use crate::error::FlowError;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

pub const CLIENT_COOKIE: &str = "PARKBOOK-CLIENT";

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LoginPayload {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginPayload {
    /// The demo accepts any credentials as long as both are given.
    pub fn validate(&self) -> Result<(), String> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err("Please fill in all fields".to_string());
        }
        Ok(())
    }
}

/// Identifies one browser. Each client owns a separate storage record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }
}

impl TryFrom<&str> for ClientId {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let bytes = URL_SAFE_NO_PAD
            .decode(value)
            .map_err(|e| format!("Invalid client token: {}", e))?;
        if bytes.len() != TOKEN_BYTES {
            return Err(format!("Invalid client token length: {}", bytes.len()));
        }
        Ok(Self(value.to_string()))
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn client_cookie(id: &ClientId) -> Cookie<'static> {
    Cookie::build((CLIENT_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Middleware making sure every request belongs to a client. Unknown or
/// malformed cookies get a fresh id.
pub async fn assign_client(
    cookies: CookieJar,
    mut request: Request,
    next: Next,
) -> (CookieJar, Response) {
    trace!("{}, {}", request.method(), request.uri().path());

    let known = cookies
        .get(CLIENT_COOKIE)
        .and_then(|cookie| ClientId::try_from(cookie.value()).ok());

    let (cookies, client) = match known {
        Some(client) => (cookies, client),
        None => {
            let client = ClientId::generate();
            debug!("New client");
            (cookies.add(client_cookie(&client)), client)
        }
    };

    request.extensions_mut().insert(client);
    (cookies, next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientId
where
    S: Send + Sync,
{
    type Rejection = FlowError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ClientId>()
            .cloned()
            .ok_or_else(|| FlowError::Internal(anyhow::anyhow!("client middleware not installed")))
    }
}

impl aide::OperationInput for ClientId {}
