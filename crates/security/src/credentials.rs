use std::collections::BTreeMap;

use base64::Engine as _;
use http::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

/// Query parameter GeoServer-style services read an authentication key from.
pub const AUTH_KEY_PARAM: &str = "authkey";

/// Credentials registered for a protected source.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum Credentials {
    Basic { username: String, password: String },
    Bearer { token: String },
    AuthKey { key: String },
}

// Keep secrets out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Basic { username, .. } => {
                f.debug_struct("Basic").field("username", username).finish_non_exhaustive()
            }
            Credentials::Bearer { .. } => f.write_str("Bearer(..)"),
            Credentials::AuthKey { .. } => f.write_str("AuthKey(..)"),
        }
    }
}

/// Credentials keyed by the security source id resources refer to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialStore {
    sources: BTreeMap<String, Credentials>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source_id: impl Into<String>, credentials: Credentials) {
        self.sources.insert(source_id.into(), credentials);
    }

    pub fn with(mut self, source_id: impl Into<String>, credentials: Credentials) -> Self {
        self.insert(source_id, credentials);
        self
    }

    pub fn remove(&mut self, source_id: &str) -> Option<Credentials> {
        self.sources.remove(source_id)
    }

    pub fn get(&self, source_id: &str) -> Option<&Credentials> {
        self.sources.get(source_id)
    }

    /// Request headers for `source_id`: `Authorization` for Basic and Bearer credentials.
    ///
    /// Unknown sources, auth keys and header values that cannot be encoded yield no headers.
    pub fn authorization_headers(&self, source_id: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let Some(credentials) = source_id.and_then(|id| self.get(id)) else {
            return headers;
        };
        let value = match credentials {
            Credentials::Basic { username, password } => {
                let token = base64::engine::general_purpose::STANDARD
                    .encode(format!("{username}:{password}"));
                format!("Basic {token}")
            }
            Credentials::Bearer { token } => format!("Bearer {token}"),
            Credentials::AuthKey { .. } => return headers,
        };
        match HeaderValue::from_str(&value) {
            Ok(mut v) => {
                v.set_sensitive(true);
                headers.insert(AUTHORIZATION, v);
            }
            Err(err) => tracing::warn!("dropping unencodable authorization header: {err}"),
        }
        headers
    }

    /// Adds authentication to a styled-layer-descriptor URL the service will fetch itself.
    ///
    /// Only auth keys can travel inside a URL; other credential kinds leave it unchanged.
    pub fn authenticate_sld_url(&self, sld_url: &str, source_id: Option<&str>) -> String {
        match source_id.and_then(|id| self.get(id)) {
            Some(Credentials::AuthKey { key }) => {
                let sep = if sld_url.contains('?') { '&' } else { '?' };
                format!("{sld_url}{sep}{AUTH_KEY_PARAM}={key}")
            }
            _ => sld_url.to_string(),
        }
    }
}
