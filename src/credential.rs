//! Request-scoped bearer credentials.
//!
//! Every inbound request carries its own credential. The credential is bound to
//! the task handling that request with [`establish`] and read back from
//! arbitrarily deep call chains with [`current`], without being passed through
//! every intermediate function.
//!
//! The binding is a tokio task-local: it follows the future across `.await`
//! points, and two requests running concurrently on the same runtime (or even
//! the same worker thread) never observe each other's credential. There is no
//! way to replace or clear a binding from inside its scope.
//!
//! # Example
//!
//! ```
//! use sandbox_mcp_bridge::credential::{self, Credential};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let token = Credential::from_authorization("Bearer abc123");
//! let seen = credential::establish(token, async {
//!     tokio::task::yield_now().await;
//!     credential::current()
//! })
//! .await;
//!
//! assert_eq!(seen.as_ref().map(Credential::expose), Some("abc123"));
//! assert!(credential::current().is_none());
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

tokio::task_local! {
    static CURRENT: Option<Credential>;
}

/// An opaque bearer token.
///
/// `Debug` output is redacted so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Arc<str>);

impl Credential {
    /// Wraps a raw token. Returns `None` for empty or whitespace-only input.
    #[must_use]
    pub fn new(token: impl AsRef<str>) -> Option<Self> {
        let token = token.as_ref().trim();
        if token.is_empty() {
            None
        } else {
            Some(Self(Arc::from(token)))
        }
    }

    /// Parses an `Authorization` header value.
    ///
    /// Only the `Bearer` scheme is recognized (case-insensitively). Any other
    /// scheme, a missing token, or an empty token yields `None`.
    #[must_use]
    pub fn from_authorization(value: &str) -> Option<Self> {
        let (scheme, token) = value.trim().split_once(|c: char| c.is_ascii_whitespace())?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        Self::new(token)
    }

    /// Returns the raw token for placing on an outbound request.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Runs `body` with `credential` bound as the current credential.
///
/// Nested calls shadow the outer binding for their own extent only.
pub async fn establish<F>(credential: Option<Credential>, body: F) -> F::Output
where
    F: Future,
{
    CURRENT.scope(credential, body).await
}

/// Returns the credential bound by the innermost active [`establish`] on this
/// task, or `None` outside any scope or when the request carried none.
#[must_use]
pub fn current() -> Option<Credential> {
    CURRENT.try_with(Clone::clone).ok().flatten()
}
