use std::collections::BTreeMap;

use foundation::params::VendorParams;
use security::policy::EditPermissions;
use serde::{Deserialize, Serialize};

/// Locale key used when the current locale has no translation.
pub const DEFAULT_LOCALE_KEY: &str = "default";

/// Plain text or a per-locale mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Title {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

impl Title {
    pub fn resolve(&self, locale: Option<&str>) -> Option<&str> {
        match self {
            Title::Plain(s) => Some(s.as_str()),
            Title::Localized(map) => locale
                .and_then(|l| map.get(l))
                .or_else(|| map.get(DEFAULT_LOCALE_KEY))
                .map(String::as_str),
        }
    }
}

/// One or several endpoints of the same service; the first one is queried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceUrl {
    Single(String),
    Many(Vec<String>),
}

impl Default for ServiceUrl {
    fn default() -> Self {
        ServiceUrl::Single(String::new())
    }
}

impl ServiceUrl {
    pub fn primary(&self) -> &str {
        match self {
            ServiceUrl::Single(url) => url.as_str(),
            ServiceUrl::Many(urls) => urls.first().map(String::as_str).unwrap_or_default(),
        }
    }

    /// Primary endpoint without its query string.
    pub fn base(&self) -> &str {
        let url = self.primary();
        url.split_once('?').map_or(url, |(base, _)| base)
    }
}

impl From<&str> for ServiceUrl {
    fn from(url: &str) -> Self {
        ServiceUrl::Single(url.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<Title>,
}

/// Reference to the credentials protecting a resource's service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySource {
    pub source_id: String,
}

/// A queryable, possibly editable, layer backed by a feature service or client data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub id: String,
    /// Qualified feature type name, e.g. `topp:states`.
    pub name: String,
    #[serde(default)]
    pub url: ServiceUrl,
    #[serde(default)]
    pub title: Option<Title>,
    #[serde(default)]
    pub base_params: VendorParams,
    #[serde(default)]
    pub params: VendorParams,
    /// CQL expression always applied to queries on this resource.
    #[serde(default)]
    pub layer_filter: Option<String>,
    #[serde(default)]
    pub fields: Option<Vec<FieldDescriptor>>,
    #[serde(default)]
    pub feature_info_regex: Option<String>,
    #[serde(default)]
    pub security: Option<SecuritySource>,
    #[serde(flatten)]
    pub permissions: EditPermissions,
}

impl ResourceDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: &str) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn title(&self, locale: Option<&str>) -> Option<String> {
        self.title
            .as_ref()
            .and_then(|t| t.resolve(locale))
            .map(str::to_string)
    }

    pub fn source_id(&self) -> Option<&str> {
        self.security.as_ref().map(|s| s.source_id.as_str())
    }
}
