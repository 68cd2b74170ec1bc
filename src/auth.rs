//! Identity issuance collaborator.
//!
//! The coordinator never mints identities itself; it hands the connect-time
//! credential to an [`IdentityProvider`] and closes the connection when
//! verification fails.

use crate::protocol::Identity;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("credential rejected: {0}")]
    Rejected(String),
    #[error("display name unusable: {0}")]
    BadDisplayName(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a connect event to a stable identity.
    ///
    /// `credential` is whatever the client presented (may be absent in the
    /// unauthenticated variant); `display_name` is what it asked to be
    /// called.
    async fn verify(
        &self,
        credential: Option<&str>,
        display_name: &str,
    ) -> Result<Identity, AuthError>;
}

/// Unauthenticated variant: the identity is the normalized display name.
///
/// Two connections presenting the same name are the same participant on
/// another device - the multi-session policy handles the rest.
pub struct GuestProvider;

#[async_trait]
impl IdentityProvider for GuestProvider {
    async fn verify(
        &self,
        _credential: Option<&str>,
        display_name: &str,
    ) -> Result<Identity, AuthError> {
        let normalized: String = display_name
            .trim()
            .chars()
            .filter(|c| !c.is_control())
            .collect::<String>()
            .to_lowercase();
        if normalized.is_empty() {
            return Err(AuthError::BadDisplayName("empty display name".into()));
        }
        Ok(Identity(normalized))
    }
}
