//! Authentication strategies.
//!
//! An [`Authenticator`] is applied exactly once, while a
//! [`ServiceConnection`](crate::ServiceConnection) is being built, and writes
//! its credentials into the transport's default headers. After that every
//! request carries them; nothing is recomputed per call.
//!
//! | Variant                    | Header written                          |
//! |----------------------------|-----------------------------------------|
//! | [`ApiKeyAuthenticator`]    | `<name>: <value>`                       |
//! | [`TokenAuthenticator`]     | `<name>: <value>`                       |
//! | [`BearerAuthenticator`]    | `Authorization: Bearer <token>`         |
//! | [`BasicAuthenticator`]     | `Authorization: Basic <base64>`         |
//! | [`BasicHeaderAuthenticator`] | `<name>: <base64>`                    |
//! | [`MultiAuthenticator`]     | each child in order, last write wins    |
//! | [`ChallengeAuthenticator`] | session id from a challenge/response login |

mod challenge;
mod encoding;
mod header;
mod multi;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::error::ServiceError;
use crate::transport::Transport;

pub use challenge::ChallengeAuthenticator;
pub use encoding::TextEncoding;
pub use header::{
    ApiKeyAuthenticator, BasicAuthenticator, BasicHeaderAuthenticator, BearerAuthenticator,
    TokenAuthenticator,
};
pub use multi::MultiAuthenticator;

/// Boxed future returned by [`Authenticator::authenticate`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A strategy that establishes credentials on a transport.
///
/// Implementations must only touch the transport's default headers (and, for
/// login flows, issue their own requests through it). Applying the same
/// authenticator twice leaves the headers in the same state.
pub trait Authenticator: fmt::Debug + Send + Sync {
    fn authenticate<'a>(
        &'a self,
        transport: &'a mut Transport,
    ) -> BoxFuture<'a, Result<(), ServiceError>>;
}
