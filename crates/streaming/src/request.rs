use foundation::feature::Feature;
use foundation::params::VendorParams;
use layers::filter::{FilterObject, ViewportQueryContext, viewport_filter};
use layers::point::MapPoint;
use layers::query::{LocalRequest, QueryRequest, RemoteRequest};

/// Inputs of one identify run against a resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentifyRequest {
    /// Click position; required unless `features` or `filter` is set.
    pub point: Option<MapPoint>,
    /// Extra spatial filters, e.g. the viewport. Unbound filters are bound to
    /// the described geometry attribute.
    pub filter: Option<FilterObject>,
    /// Features already known client-side; only their ids are queried again.
    pub features: Option<Vec<Feature>>,
    /// Caller parameters, overriding the resource's own.
    pub params: VendorParams,
}

impl IdentifyRequest {
    pub fn at(point: MapPoint) -> Self {
        Self {
            point: Some(point),
            ..Default::default()
        }
    }

    pub fn for_features(features: Vec<Feature>) -> Self {
        Self {
            features: Some(features),
            ..Default::default()
        }
    }

    /// Features on screen: the viewport rectangle, when the map supports it and
    /// the user enabled viewport filtering.
    pub fn within_viewport(ctx: &ViewportQueryContext) -> Self {
        Self {
            filter: Some(viewport_filter(ctx)),
            ..Default::default()
        }
    }

    /// Narrows a point request by `filter`; feature lists ignore it.
    pub fn with_filter(mut self, filter: FilterObject) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Splits a built remote request into its endpoint and identify inputs.
    ///
    /// The point is moved out of the GetFeature parameters so it never reaches the wire.
    pub fn from_remote(mut remote: RemoteRequest) -> (String, Self) {
        let point = remote.params.take_point();
        let params = remote.params.to_params();
        (
            remote.url,
            Self {
                point,
                params,
                ..Default::default()
            },
        )
    }

    pub fn from_local(local: LocalRequest) -> (String, Self) {
        (
            local.target.as_str().to_string(),
            Self::for_features(local.features),
        )
    }

    pub fn from_query(request: QueryRequest) -> (String, Self) {
        match request {
            QueryRequest::Local(local) => Self::from_local(local),
            QueryRequest::Remote(remote) => Self::from_remote(remote),
        }
    }
}
