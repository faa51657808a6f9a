//! Identity verification seam.
//!
//! Token issuance and role claims belong to the surrounding application's
//! auth service. The hub only needs the verified `(userId, role)` pair, so
//! the boundary is a trait: the binary wires a deployment implementation,
//! tests substitute a stub. Nothing else in this crate ever inspects a
//! token.

use std::collections::HashMap;

use async_trait::async_trait;
use parley_core::{HubError, Identity};

/// Verifies a connection token into an [`Identity`].
///
/// Called exactly once per connection attempt, before the WebSocket
/// upgrade completes. A failure refuses the connection.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify `token` and return the identity it asserts.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Unauthenticated`] when the token is unknown,
    /// expired, or malformed.
    async fn verify(&self, token: &str) -> Result<Identity, HubError>;
}

/// Verifier backed by a static token table.
///
/// Suitable for deployments where the auth service provisions opaque
/// per-user connection tokens out of band (and for tests). Lookups are
/// exact-match; there is nothing to decode.
pub struct StaticTokenVerifier {
    tokens: HashMap<String, Identity>,
}

impl StaticTokenVerifier {
    /// Build a verifier from `(token, identity)` pairs.
    #[must_use]
    pub fn new(pairs: impl IntoIterator<Item = (String, Identity)>) -> Self {
        Self {
            tokens: pairs.into_iter().collect(),
        }
    }

    /// Number of provisioned tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no tokens are provisioned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl IdentityVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, HubError> {
        self.tokens
            .get(token)
            .copied()
            .ok_or_else(|| HubError::Unauthenticated("unknown connection token".into()))
    }
}
