use std::sync::Arc;

use foundation::feature::Feature;
use foundation::params::{VendorParams, param_text};
use foundation::srs::{WGS84, normalize_srs};
use security::credentials::CredentialStore;
use serde::Serialize;
use serde_json::Value;

use crate::layer::{FieldDescriptor, ResourceDescriptor};
use crate::point::MapPoint;

/// URL marker for requests resolved entirely client-side; no service is contacted.
pub const CLIENT_WORKFLOW: &str = "client";

pub const JSON_FORMAT: &str = "application/json";
pub const HTML_FORMAT: &str = "text/html";

const SLD_PARAM: &str = "SLD";

#[derive(Debug, Clone, PartialEq)]
pub struct QueryDefaults {
    pub max_items: usize,
    pub srs: String,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            max_items: 10,
            srs: WGS84.to_string(),
        }
    }
}

/// Map state relevant to building a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapSnapshot {
    pub projection: Option<String>,
}

/// Everything known about one identify interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct PointQueryContext {
    pub map: MapSnapshot,
    pub point: MapPoint,
    pub current_locale: Option<String>,
    /// Caller parameters merged into remote requests.
    pub params: VendorParams,
    /// Result-size cap; the builder default applies when unset.
    pub max_items: Option<usize>,
}

impl PointQueryContext {
    pub fn new(point: MapPoint) -> Self {
        Self {
            map: MapSnapshot::default(),
            point,
            current_locale: None,
            params: VendorParams::new(),
            max_items: None,
        }
    }

    pub fn with_projection(mut self, projection: impl Into<String>) -> Self {
        self.map.projection = Some(projection.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.current_locale = Some(locale.into());
        self
    }
}

/// Where a local resolution points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestTarget {
    /// Resolved from already fetched features, no network call.
    ClientSide,
    Url(String),
}

impl RequestTarget {
    pub fn as_str(&self) -> &str {
        match self {
            RequestTarget::ClientSide => CLIENT_WORKFLOW,
            RequestTarget::Url(url) => url.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalRequest {
    pub features: Vec<Feature>,
    pub output_format: String,
    pub target: RequestTarget,
}

/// GetFeature parameters for a remote identify.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetFeatureParams {
    pub service: String,
    pub version: String,
    pub request: String,
    pub output_format: String,
    pub exceptions: String,
    pub id: String,
    pub type_name: String,
    pub srs: String,
    #[serde(rename = "feature_count")]
    pub feature_count: usize,
    /// Only used to build the spatial filter; never sent.
    #[serde(skip)]
    pub point: Option<MapPoint>,
    #[serde(flatten)]
    pub params: VendorParams,
}

impl GetFeatureParams {
    /// Removes the point, leaving the parameters in their final form.
    pub fn take_point(&mut self) -> Option<MapPoint> {
        self.point.take()
    }

    /// Wire parameters, flattened; the point is never included.
    pub fn to_params(&self) -> VendorParams {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map.into_iter().collect(),
            _ => VendorParams::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
    pub params: GetFeatureParams,
    /// Service endpoint without query string.
    pub url: String,
}

/// Either a client-side resolution or a remote feature query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryRequest {
    Local(LocalRequest),
    Remote(RemoteRequest),
}

impl QueryRequest {
    pub fn is_local(&self) -> bool {
        matches!(self, QueryRequest::Local(_))
    }

    /// URL the request is sent to, or [`CLIENT_WORKFLOW`].
    pub fn url(&self) -> &str {
        match self {
            QueryRequest::Local(local) => local.target.as_str(),
            QueryRequest::Remote(remote) => remote.url.as_str(),
        }
    }
}

/// Display information accompanying every request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestMetadata {
    pub title: Option<String>,
    /// Pattern extracting the relevant part of HTML responses.
    pub regex: Option<String>,
    pub fields: Option<Vec<FieldDescriptor>>,
    pub viewer: Option<String>,
    pub feature_info: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuiltRequest {
    pub request: QueryRequest,
    pub metadata: RequestMetadata,
}

/// Turns an identify interaction into a query against one resource.
///
/// Pure construction: no I/O and no state carried between calls.
#[derive(Debug, Clone, Default)]
pub struct QueryRequestBuilder {
    credentials: Arc<CredentialStore>,
    defaults: QueryDefaults,
}

impl QueryRequestBuilder {
    pub fn new(credentials: Arc<CredentialStore>) -> Self {
        Self {
            credentials,
            defaults: QueryDefaults::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: QueryDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn build(
        &self,
        resource: &ResourceDescriptor,
        ctx: &PointQueryContext,
        info_format: Option<&str>,
        viewer: Option<&str>,
        feature_info: Option<Value>,
    ) -> BuiltRequest {
        let title = resource.title(ctx.current_locale.as_deref());

        if let Some(features) = ctx.point.intersected_for(&resource.id) {
            let html = info_format == Some(HTML_FORMAT);
            let target = if html {
                RequestTarget::Url(resource.url.primary().to_string())
            } else {
                RequestTarget::ClientSide
            };
            tracing::debug!(resource = %resource.id, count = features.len(), "identify resolved locally");
            return BuiltRequest {
                request: QueryRequest::Local(LocalRequest {
                    features: features.to_vec(),
                    output_format: (if html { HTML_FORMAT } else { JSON_FORMAT }).to_string(),
                    target,
                }),
                metadata: RequestMetadata {
                    title,
                    regex: resource.feature_info_regex.clone(),
                    fields: resource.fields.clone(),
                    viewer: viewer.map(str::to_string),
                    feature_info,
                },
            };
        }

        let srs = ctx
            .map
            .projection
            .as_deref()
            .and_then(normalize_srs)
            .unwrap_or_else(|| self.defaults.srs.clone());

        let mut params = GetFeatureParams {
            service: "WFS".to_string(),
            version: "1.1.1".to_string(),
            request: "GetFeature".to_string(),
            output_format: JSON_FORMAT.to_string(),
            exceptions: JSON_FORMAT.to_string(),
            id: resource.id.clone(),
            type_name: resource.name.clone(),
            srs,
            feature_count: ctx.max_items.unwrap_or(self.defaults.max_items),
            point: Some(ctx.point.clone()),
            params: ctx.params.clone(),
        };
        self.authenticate_sld(&mut params.params, resource);

        BuiltRequest {
            request: QueryRequest::Remote(RemoteRequest {
                params,
                url: resource.url.base().to_string(),
            }),
            metadata: RequestMetadata {
                title,
                regex: resource.feature_info_regex.clone(),
                fields: None,
                viewer: viewer.map(str::to_string),
                feature_info,
            },
        }
    }

    fn authenticate_sld(&self, params: &mut VendorParams, resource: &ResourceDescriptor) {
        let Some(key) = params
            .keys()
            .find(|k| k.eq_ignore_ascii_case(SLD_PARAM))
            .cloned()
        else {
            return;
        };
        let Some(sld) = params.get(&key).and_then(param_text) else {
            return;
        };
        let authenticated = self
            .credentials
            .authenticate_sld_url(&sld, resource.source_id());
        params.insert(key, Value::String(authenticated));
    }
}
