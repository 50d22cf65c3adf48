//! Seam to the remote feature service.
//!
//! The identify flow only needs two calls: describing a feature type (to learn its
//! geometry attribute) and fetching features. Transports implement
//! [`FeatureService`]; [`crate::wfs::HttpFeatureService`] is the stock one.

use std::future::Future;
use std::pin::Pin;

use foundation::feature::FeatureCollection;
use foundation::params::VendorParams;
use http::HeaderMap;
use serde::{Deserialize, Serialize};

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Upstream failure reported by a feature service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("could not decode response from {url}")]
    Decode {
        url: String,
        #[source]
        source: BoxError,
    },
    #[error("{0}")]
    Other(String),
}

impl ServiceError {
    pub fn other(message: impl Into<String>) -> Self {
        ServiceError::Other(message.into())
    }
}

/// One attribute of a described feature type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescription {
    pub name: String,
    /// Qualified type, e.g. `xsd:string` or `gml:MultiPolygon`.
    #[serde(default, rename = "type")]
    pub property_type: String,
    #[serde(default)]
    pub local_type: Option<String>,
}

impl PropertyDescription {
    pub fn is_geometry(&self) -> bool {
        self.property_type.starts_with("gml:")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureTypeSchema {
    pub type_name: String,
    #[serde(default)]
    pub properties: Vec<PropertyDescription>,
}

/// DescribeFeatureType response in its JSON form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureTypeDescription {
    #[serde(default)]
    pub target_prefix: Option<String>,
    #[serde(default)]
    pub feature_types: Vec<FeatureTypeSchema>,
}

impl FeatureTypeDescription {
    /// Name of the first geometry attribute of the first described type.
    pub fn geometry_attribute(&self) -> Option<&str> {
        self.feature_types
            .first()?
            .properties
            .iter()
            .find(|p| p.is_geometry())
            .map(|p| p.name.as_str())
    }
}

/// Remote feature service.
///
/// Implementations must be `Send + Sync` for use across async tasks.
/// Methods return boxed futures for dyn-compatibility.
pub trait FeatureService: Send + Sync {
    /// Describe `type_name` as published at `url`.
    fn describe_feature_type(
        &self,
        url: &str,
        type_name: &str,
    ) -> BoxFuture<'_, Result<FeatureTypeDescription, ServiceError>>;

    /// Query features of `type_name` with the final vendor `params`.
    fn get_feature(
        &self,
        url: &str,
        type_name: &str,
        params: VendorParams,
        headers: HeaderMap,
    ) -> BoxFuture<'_, Result<FeatureCollection, ServiceError>>;
}
