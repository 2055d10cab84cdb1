use thiserror::Error;

/// Authentication failures.
///
/// Raised while a connection is being built, either by an authenticator or by
/// the verification request.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The verification endpoint answered with a non-success status.
    #[error("authentication failed: '{url}' answered {status}")]
    VerificationFailed { url: String, status: u16 },

    /// A challenge/response login did not yield a session.
    #[error("challenge login rejected: {message}")]
    ChallengeRejected { message: String },

    /// Credentials could not be turned into a header value.
    #[error("invalid credentials: {message}")]
    InvalidCredentials { message: String },

    /// A login or password holds characters the chosen text encoding cannot represent.
    #[error("'{character}' cannot be encoded as {encoding}")]
    UnsupportedEncoding {
        character: char,
        encoding: &'static str,
    },
}
