use std::future::Future;
use std::sync::Arc;

use foundation::feature::FeatureCollection;
use foundation::params::merge_params;
use layers::cql::feature_id_filter;
use layers::filter::{FilterObject, build_point_filter};
use layers::layer::ResourceDescriptor;
use layers::query::{BuiltRequest, CLIENT_WORKFLOW};
use layers::vendor::{VendorOptions, merge_vendor_params};
use security::credentials::CredentialStore;
use tokio_util::sync::CancellationToken;

use crate::cache::{DescribeCache, DescribeKey};
use crate::request::IdentifyRequest;
use crate::service::{FeatureService, FeatureTypeDescription, ServiceError};

/// States of one identify run:
///
/// Start → (LocalResolved | Describing → FilterBuilt → Requesting) → (Succeeded | Failed | Cancelled)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IdentifyState {
    Start,
    LocalResolved,
    Describing,
    FilterBuilt,
    Requesting,
    Succeeded,
    Failed,
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentifyError {
    #[error("identify cancelled while {during:?}")]
    Cancelled { during: IdentifyState },
    #[error("describing {type_name} failed")]
    Describe {
        type_name: String,
        #[source]
        source: ServiceError,
    },
    #[error("{type_name} has no geometry attribute")]
    MissingGeometryAttribute { type_name: String },
    #[error("identify on {type_name} needs a point, a spatial filter or a feature list")]
    MissingPoint { type_name: String },
    #[error("feature request for {type_name} failed")]
    Fetch {
        type_name: String,
        #[source]
        source: ServiceError,
    },
}

impl IdentifyError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, IdentifyError::Cancelled { .. })
    }
}

// Tracks the current state for diagnostics; the terminal state is logged once.
struct Progress<'a> {
    resource: &'a str,
    state: IdentifyState,
}

impl<'a> Progress<'a> {
    fn new(resource: &'a str) -> Self {
        tracing::trace!(resource, "identify start");
        Self {
            resource,
            state: IdentifyState::Start,
        }
    }

    fn enter(&mut self, state: IdentifyState) {
        tracing::debug!(resource = self.resource, from = ?self.state, to = ?state, "identify");
        self.state = state;
    }

    fn finish<T>(mut self, result: Result<T, IdentifyError>) -> Result<T, IdentifyError> {
        let terminal = match &result {
            Ok(_) => IdentifyState::Succeeded,
            Err(e) if e.is_cancelled() => IdentifyState::Cancelled,
            Err(_) => IdentifyState::Failed,
        };
        self.enter(terminal);
        result
    }

    /// Runs `fut` unless `cancel` fires first; a result that arrives after
    /// cancellation is discarded.
    async fn guard<T>(
        &self,
        cancel: &CancellationToken,
        fut: impl Future<Output = T>,
    ) -> Result<T, IdentifyError> {
        let during = self.state;
        let out = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(IdentifyError::Cancelled { during }),
            out = fut => out,
        };
        if cancel.is_cancelled() {
            return Err(IdentifyError::Cancelled { during });
        }
        Ok(out)
    }
}

/// Answers identify requests against remote or client-side data.
pub struct IdentifyFlow {
    service: Arc<dyn FeatureService>,
    credentials: Arc<CredentialStore>,
    descriptions: DescribeCache,
}

impl IdentifyFlow {
    pub fn new(service: Arc<dyn FeatureService>, credentials: Arc<CredentialStore>) -> Self {
        Self {
            service,
            credentials,
            descriptions: DescribeCache::new(),
        }
    }

    pub fn descriptions(&self) -> &DescribeCache {
        &self.descriptions
    }

    /// Runs the request produced by the query builder.
    pub async fn run_built(
        &self,
        resource: &ResourceDescriptor,
        built: BuiltRequest,
        cancel: &CancellationToken,
    ) -> Result<FeatureCollection, IdentifyError> {
        let (url, request) = IdentifyRequest::from_query(built.request);
        self.identify(resource, &url, request, cancel).await
    }

    /// Resolves `request` on `resource`, querying `base_url` when a round trip is needed.
    ///
    /// Once `cancel` fires the run ends with [`IdentifyError::Cancelled`], even if the
    /// service already answered.
    pub async fn identify(
        &self,
        resource: &ResourceDescriptor,
        base_url: &str,
        request: IdentifyRequest,
        cancel: &CancellationToken,
    ) -> Result<FeatureCollection, IdentifyError> {
        let mut progress = Progress::new(&resource.id);
        let result = self
            .identify_inner(resource, base_url, request, cancel, &mut progress)
            .await;
        progress.finish(result)
    }

    async fn identify_inner(
        &self,
        resource: &ResourceDescriptor,
        base_url: &str,
        request: IdentifyRequest,
        cancel: &CancellationToken,
        progress: &mut Progress<'_>,
    ) -> Result<FeatureCollection, IdentifyError> {
        if cancel.is_cancelled() {
            return Err(IdentifyError::Cancelled {
                during: IdentifyState::Start,
            });
        }
        let headers = self.credentials.authorization_headers(resource.source_id());
        let IdentifyRequest {
            point,
            filter,
            features,
            params: caller_params,
        } = request;
        let params = merge_params([&resource.base_params, &resource.params, &caller_params]);

        if let Some(features) = features {
            let remote = !base_url.is_empty() && base_url != CLIENT_WORKFLOW;
            let ids = if remote { feature_id_filter(&features) } else { None };
            let Some(ids) = ids else {
                progress.enter(IdentifyState::LocalResolved);
                return Ok(FeatureCollection::new(features));
            };

            let params = merge_vendor_params(
                VendorOptions {
                    layer_filter: resource.layer_filter.as_deref(),
                    filter: None,
                    params,
                },
                Some(&ids),
            );
            progress.enter(IdentifyState::Requesting);
            return progress
                .guard(
                    cancel,
                    self.service
                        .get_feature(base_url, &resource.name, params, headers),
                )
                .await?
                .map_err(|source| IdentifyError::Fetch {
                    type_name: resource.name.clone(),
                    source,
                });
        }

        let extra = filter.filter(|f| !f.is_empty());
        if point.is_none() && extra.is_none() {
            return Err(IdentifyError::MissingPoint {
                type_name: resource.name.clone(),
            });
        }

        progress.enter(IdentifyState::Describing);
        let description = self.describe(resource, cancel, progress).await?;
        let attribute = description.geometry_attribute().ok_or_else(|| {
            IdentifyError::MissingGeometryAttribute {
                type_name: resource.name.clone(),
            }
        })?;

        let mut filter = FilterObject::default();
        if let Some(point) = point {
            filter
                .spatial_field
                .push(build_point_filter(attribute, point.identify_geometry()));
        }
        if let Some(extra) = extra {
            filter
                .spatial_field
                .extend(extra.with_attribute(attribute).spatial_field);
        }
        let params = merge_vendor_params(
            VendorOptions {
                layer_filter: resource.layer_filter.as_deref(),
                filter: Some(&filter),
                params,
            },
            None,
        );
        progress.enter(IdentifyState::FilterBuilt);

        progress.enter(IdentifyState::Requesting);
        progress
            .guard(
                cancel,
                self.service
                    .get_feature(base_url, &resource.name, params, headers),
            )
            .await?
            .map_err(|source| IdentifyError::Fetch {
                type_name: resource.name.clone(),
                source,
            })
    }

    async fn describe(
        &self,
        resource: &ResourceDescriptor,
        cancel: &CancellationToken,
        progress: &Progress<'_>,
    ) -> Result<Arc<FeatureTypeDescription>, IdentifyError> {
        let key = DescribeKey::new(resource.url.base(), resource.name.clone());
        if let Some(hit) = self.descriptions.get(&key) {
            tracing::trace!(type_name = %resource.name, "describe cache hit");
            return Ok(hit);
        }

        let description = progress
            .guard(
                cancel,
                self.service
                    .describe_feature_type(&key.service_url, &key.type_name),
            )
            .await?
            .map_err(|source| IdentifyError::Describe {
                type_name: resource.name.clone(),
                source,
            })?;
        Ok(self.descriptions.insert(key, description))
    }
}
