use foundation::feature::FeatureCollection;
use foundation::params::{VendorParams, param_text};
use http::HeaderMap;

use crate::service::{BoxFuture, FeatureService, FeatureTypeDescription, ServiceError};

/// WFS version used when the caller does not pin one.
pub const DEFAULT_WFS_VERSION: &str = "1.1.0";

/// WFS transport over HTTP GET with JSON responses.
#[derive(Debug, Clone)]
pub struct HttpFeatureService {
    client: reqwest::Client,
    version: String,
}

impl Default for HttpFeatureService {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFeatureService {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            version: DEFAULT_WFS_VERSION.to_string(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: HeaderMap,
    ) -> Result<T, ServiceError> {
        let resp = self
            .client
            .get(url)
            .headers(headers)
            .query(query)
            .send()
            .await
            .map_err(|e| ServiceError::Transport {
                url: url.to_string(),
                source: Box::new(e),
            })?;

        if !resp.status().is_success() {
            return Err(ServiceError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        resp.json::<T>().await.map_err(|e| ServiceError::Decode {
            url: url.to_string(),
            source: Box::new(e),
        })
    }
}

/// GetFeature query: protocol defaults first, then `params`, which may override them.
pub fn get_feature_query(
    version: &str,
    type_name: &str,
    params: &VendorParams,
) -> Vec<(String, String)> {
    let mut merged = VendorParams::new();
    for (k, v) in [
        ("service", "WFS"),
        ("version", version),
        ("request", "GetFeature"),
        ("typeName", type_name),
        ("outputFormat", "application/json"),
    ] {
        merged.insert(k.to_string(), v.into());
    }
    merged.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));

    merged
        .into_iter()
        .filter_map(|(k, v)| param_text(&v).map(|text| (k, text)))
        .collect()
}

impl FeatureService for HttpFeatureService {
    fn describe_feature_type(
        &self,
        url: &str,
        type_name: &str,
    ) -> BoxFuture<'_, Result<FeatureTypeDescription, ServiceError>> {
        let url = url.to_string();
        let query: Vec<(String, String)> = [
            ("service", "WFS"),
            ("version", self.version.as_str()),
            ("request", "DescribeFeatureType"),
            ("typeName", type_name),
            ("outputFormat", "application/json"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Box::pin(async move { self.get_json(&url, &query, HeaderMap::new()).await })
    }

    fn get_feature(
        &self,
        url: &str,
        type_name: &str,
        params: VendorParams,
        headers: HeaderMap,
    ) -> BoxFuture<'_, Result<FeatureCollection, ServiceError>> {
        let url = url.to_string();
        let query = get_feature_query(&self.version, type_name, &params);
        Box::pin(async move { self.get_json(&url, &query, headers).await })
    }
}
