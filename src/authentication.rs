// the admin viewer is guarded by a single shared secret, passed as a query
// parameter. there are no users, sessions or roles.

use secrecy::ExposeSecret;
use secrecy::Secret;
use sha2::Digest;
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// The configured admin token. `None` (or blank) means the admin endpoint is
/// misconfigured.
#[derive(Clone)]
pub struct AdminToken(pub Option<Secret<String>>);

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Admin token is not configured")]
    Misconfigured,
    #[error("Invalid or missing admin token")]
    InvalidToken,
}

impl AdminToken {
    /// Compare `supplied` against the configured token in constant time.
    ///
    /// Both sides are hashed first, so the comparison always runs over 32
    /// bytes and the token length does not leak either.
    pub fn verify(
        &self,
        supplied: Option<&str>,
    ) -> Result<(), AuthError> {
        let expected = self
            .0
            .as_ref()
            .map(|t| t.expose_secret())
            .filter(|t| !t.trim().is_empty())
            .ok_or(AuthError::Misconfigured)?;

        let supplied = supplied.ok_or(AuthError::InvalidToken)?;

        let expected = Sha256::digest(expected.as_bytes());
        let supplied = Sha256::digest(supplied.as_bytes());

        match bool::from(expected.as_slice().ct_eq(supplied.as_slice())) {
            true => Ok(()),
            false => Err(AuthError::InvalidToken),
        }
    }
}
