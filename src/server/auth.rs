//! Credential extraction for inbound MCP requests.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use http::header::AUTHORIZATION;
use http::request::Parts;
use tracing::debug;

use crate::credential::Credential;

/// The credential carried by one inbound HTTP request, `None` if it had no
/// usable `Authorization: Bearer` header.
#[derive(Debug, Clone, Default)]
pub struct RequestCredential(pub Option<Credential>);

/// Axum middleware storing a [`RequestCredential`] in the request extensions.
///
/// The request is always passed on; tools report missing authentication
/// themselves so the caller gets readable text rather than a bare 401.
pub async fn extract_credential(mut request: Request, next: Next) -> Response {
    let credential = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(Credential::from_authorization);

    debug!(
        method = %request.method(),
        authenticated = credential.is_some(),
        "Inbound MCP request"
    );

    request
        .extensions_mut()
        .insert(RequestCredential(credential));
    next.run(request).await
}

/// Recovers the credential recorded by [`extract_credential`] from the HTTP
/// request parts that rmcp attaches to each message.
#[must_use]
pub fn credential_from_parts(parts: &Parts) -> Option<Credential> {
    parts
        .extensions
        .get::<RequestCredential>()
        .and_then(|c| c.0.clone())
}
