//! Named host and credential records kept in a local JSON file.
//!
//! The file maps a name to a [`KeyStore`] record:
//!
//! ```json
//! {
//!   "jira": {
//!     "host": "https://jira.example.com/",
//!     "verify": "rest/api/2/myself",
//!     "authentication": "Bearer",
//!     "token": "..."
//!   }
//! }
//! ```
//!
//! A record turns into a ready-to-build [`ServiceConnectionBuilder`] with
//! [`KeyStore::connection_builder`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::auth::{
    ApiKeyAuthenticator, Authenticator, BasicAuthenticator, BearerAuthenticator,
    MultiAuthenticator,
};
use crate::connection::{ServiceConnection, ServiceConnectionBuilder};
use crate::error::ConfigError;

/// Header JFrog Artifactory reads its API key from.
pub const JFROG_API_HEADER: &str = "X-JFrog-Art-Api";

/// How a [`KeyStore`] record authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthenticationKind {
    #[default]
    None,
    Basic,
    Bearer,
    /// Bearer token that is also sent as JFrog API key.
    BearerAndJFrogApi,
}

/// One named record of the credential file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyStore {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify: Option<String>,
    #[serde(default)]
    pub authentication: AuthenticationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(
        rename = "tokenexpire",
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::serializer::lenient_datetime"
    )]
    pub token_expire: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Page where the token can be renewed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<String>,
}

impl KeyStore {
    /// The host as an absolute URL.
    pub fn url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.host).map_err(|e| ConfigError::InvalidHost {
            host: self.host.clone(),
            message: e.to_string(),
        })
    }

    /// The authenticator matching [`authentication`](Self::authentication).
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::MissingField`] when the record lacks the token
    /// or login/password its kind needs.
    pub fn authenticator(&self) -> Result<Option<Arc<dyn Authenticator>>, ConfigError> {
        let authenticator: Arc<dyn Authenticator> = match self.authentication {
            AuthenticationKind::None => return Ok(None),
            AuthenticationKind::Basic => Arc::new(BasicAuthenticator::new(
                required(&self.login, "login")?,
                required(&self.password, "password")?,
            )),
            AuthenticationKind::Bearer => {
                Arc::new(BearerAuthenticator::new(required(&self.token, "token")?))
            }
            AuthenticationKind::BearerAndJFrogApi => {
                let token = required(&self.token, "token")?;
                Arc::new(
                    MultiAuthenticator::default()
                        .with(BearerAuthenticator::new(token))
                        .with(ApiKeyAuthenticator::new(JFROG_API_HEADER, token)),
                )
            }
        };
        Ok(Some(authenticator))
    }

    /// A connection builder for the host with this record's authenticator
    /// and verification path.
    pub fn connection_builder(&self) -> Result<ServiceConnectionBuilder, ConfigError> {
        let mut builder =
            ServiceConnection::builder(self.url()?).maybe_authenticator(self.authenticator()?);
        if let Some(verify) = self.verify.as_deref().filter(|v| !v.trim().is_empty()) {
            builder = builder.verify_path(verify);
        }
        Ok(builder)
    }

    /// `true` once `token_expire` lies in the past.
    pub fn is_token_expired(&self) -> bool {
        self.token_expire.is_some_and(|expire| expire < Utc::now())
    }
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingField { field })
}

/// The credential file and its records.
#[derive(Debug, Clone)]
pub struct KeyStoreFile {
    path: PathBuf,
    entries: BTreeMap<String, KeyStore>,
}

impl KeyStoreFile {
    /// `<local data dir>/KeyStore/KeyStore.json`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let base = dirs::data_local_dir().ok_or(ConfigError::NoDataDirectory)?;
        Ok(base.join("KeyStore").join("KeyStore.json"))
    }

    /// Reads the records at `path`.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let entries = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "loaded key store");
        Ok(Self { path, entries })
    }

    /// Reads the records at `path`, writing a file with placeholder records
    /// first if there is none.
    pub fn load_or_create(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        if path.exists() {
            return Self::load(path);
        }

        let store = Self {
            path,
            entries: demo_entries(),
        };
        store.save()?;
        info!(path = %store.path.display(), "created key store with placeholder entries");
        Ok(store)
    }

    /// [`load_or_create`](Self::load_or_create) at [`default_path`](Self::default_path).
    pub fn open_default() -> Result<Self, ConfigError> {
        Self::load_or_create(Self::default_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&KeyStore> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Adds or replaces a record. Call [`save`](Self::save) to persist it.
    pub fn insert(&mut self, name: impl Into<String>, entry: KeyStore) {
        self.entries.insert(name.into(), entry);
    }

    /// Writes all records as indented JSON, creating parent directories.
    pub fn save(&self) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Read {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let json = serde_json::to_string_pretty(&self.entries).map_err(|source| {
            ConfigError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;
        std::fs::write(&self.path, json).map_err(io_error)
    }
}

fn demo_entries() -> BTreeMap<String, KeyStore> {
    let now = Utc::now().fixed_offset();
    let demo = |host: &str, comment: &str| KeyStore {
        host: host.to_string(),
        verify: Some(host.to_string()),
        authentication: AuthenticationKind::None,
        token: Some("xxxxxxxx".to_string()),
        token_expire: Some(now),
        user: Some("Max Mustermann".to_string()),
        email: Some("Max.Mustermann@web.de".to_string()),
        login: Some("mm".to_string()),
        password: Some("1234".to_string()),
        comment: Some(comment.to_string()),
        update: None,
    };
    BTreeMap::from([
        (
            "jira".to_string(),
            demo("https://www.atlassian.com/", "Access to Atlassian JIRA"),
        ),
        (
            "github".to_string(),
            demo("https://github.com/", "Access to GitHub"),
        ),
    ])
}
