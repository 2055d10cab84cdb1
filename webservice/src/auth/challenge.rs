//! Challenge/response session login as used by AVM home routers.
//!
//! The router publishes a challenge at `login_sid.lua`. The client answers
//! with `<challenge>-<md5(utf16le("<challenge>-<password>"))>` and receives a
//! session id that has to accompany every later request.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use md5::{Digest, Md5};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{Authenticator, BoxFuture, TextEncoding};
use crate::error::{AuthError, SerializationError, ServiceError};
use crate::transport::Transport;
use crate::url_builder::{combine_url, QueryValue};

const LOGIN_PATH: &str = "login_sid.lua";
const EMPTY_SESSION: &str = "0000000000000000";
const DEFAULT_SESSION_HEADER: &str = "sid";

#[derive(Debug, Deserialize)]
struct SessionInfo {
    #[serde(rename = "SID")]
    sid: String,
    #[serde(rename = "Challenge", default)]
    challenge: String,
}

impl SessionInfo {
    fn has_session(&self) -> bool {
        !self.sid.trim().is_empty() && self.sid != EMPTY_SESSION
    }
}

/// Logs in through a challenge/response exchange and keeps the session id.
///
/// The session id is written as a secret default header (`sid` unless
/// changed with [`with_session_header`](Self::with_session_header)) and can be
/// read back with [`session_id`](Self::session_id) for services that expect it
/// as a query parameter instead.
pub struct ChallengeAuthenticator {
    login: String,
    password: String,
    session_header: String,
    session_id: Mutex<Option<String>>,
}

impl ChallengeAuthenticator {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
            session_header: DEFAULT_SESSION_HEADER.to_string(),
            session_id: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_session_header(mut self, name: impl Into<String>) -> Self {
        self.session_header = name.into();
        self
    }

    /// The session id of the last successful login.
    pub fn session_id(&self) -> Option<String> {
        self.session_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[instrument(name = "challenge_login", skip_all, fields(login = %self.login))]
    async fn login(&self, transport: &mut Transport) -> Result<(), ServiceError> {
        let info = fetch_session(transport, LOGIN_PATH).await?;

        let sid = if info.has_session() {
            debug!("router reports an open session");
            info.sid
        } else {
            let response = challenge_response(&info.challenge, &self.password)?;
            let login = Some(self.login.as_str()).filter(|l| !l.trim().is_empty());
            let uri = combine_url(
                &[LOGIN_PATH],
                &[
                    ("username", QueryValue::from(login)),
                    ("response", response.into()),
                ],
            );
            let answer = fetch_session(transport, &uri).await?;
            if !answer.has_session() {
                return Err(AuthError::ChallengeRejected {
                    message: format!("no session granted for '{}'", self.login),
                }
                .into());
            }
            answer.sid
        };

        transport.set_secret_header(&self.session_header, &sid)?;
        *self
            .session_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(sid);
        debug!("session established");
        Ok(())
    }
}

impl fmt::Debug for ChallengeAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChallengeAuthenticator")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .field("session_header", &self.session_header)
            .finish_non_exhaustive()
    }
}

impl Authenticator for ChallengeAuthenticator {
    fn authenticate<'a>(
        &'a self,
        transport: &'a mut Transport,
    ) -> BoxFuture<'a, Result<(), ServiceError>> {
        Box::pin(self.login(transport))
    }
}

async fn fetch_session(transport: &Transport, uri: &str) -> Result<SessionInfo, ServiceError> {
    let response = transport.get(uri).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AuthError::ChallengeRejected {
            message: format!("'{}' answered {}", response.url(), status.as_u16()),
        }
        .into());
    }
    let body = response.text().await?;
    let info = quick_xml::de::from_str(&body).map_err(SerializationError::from)?;
    Ok(info)
}

/// `<challenge>-<hex md5 of utf16le("<challenge>-<password>")>`.
fn challenge_response(challenge: &str, password: &str) -> Result<String, AuthError> {
    if challenge.trim().is_empty() {
        return Err(AuthError::ChallengeRejected {
            message: "server sent no challenge".to_string(),
        });
    }
    let bytes = TextEncoding::Utf16Le.encode(&format!("{challenge}-{password}"))?;
    Ok(format!("{challenge}-{:x}", Md5::digest(bytes)))
}
