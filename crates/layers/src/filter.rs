use foundation::bounds::Aabb2;
use foundation::geometry::Geometry;
use serde::{Deserialize, Serialize};

/// Label downstream consumers use for box-shaped filters.
pub const RECTANGLE_METHOD: &str = "Rectangle";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpatialOperation {
    Intersects,
    Within,
    Contains,
    Bbox,
}

impl SpatialOperation {
    pub fn cql_name(self) -> &'static str {
        match self {
            SpatialOperation::Intersects => "INTERSECTS",
            SpatialOperation::Within => "WITHIN",
            SpatialOperation::Contains => "CONTAINS",
            SpatialOperation::Bbox => "BBOX",
        }
    }
}

/// Spatial predicate `attribute OPERATION geometry`. Rebuilt for every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialFilter {
    /// Geometry attribute of the feature type; unknown until the type is described.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    pub operation: SpatialOperation,
    pub geometry: Geometry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl SpatialFilter {
    /// Binds the filter to `attribute` unless it already names one.
    pub fn with_attribute(mut self, attribute: &str) -> Self {
        if self.attribute.is_none() {
            self.attribute = Some(attribute.to_string());
        }
        self
    }
}

/// Filter on the geometry attribute for a point identify.
pub fn build_point_filter(attribute: impl Into<String>, geometry: Geometry) -> SpatialFilter {
    SpatialFilter {
        attribute: Some(attribute.into()),
        operation: SpatialOperation::Intersects,
        geometry,
        method: None,
    }
}

/// Rectangle filter covering the viewport `bbox` in `crs`.
pub fn build_viewport_filter(bbox: Aabb2, crs: impl Into<String>) -> SpatialFilter {
    SpatialFilter {
        attribute: None,
        operation: SpatialOperation::Intersects,
        geometry: Geometry::rectangle(bbox, crs),
        method: Some(RECTANGLE_METHOD.to_string()),
    }
}

/// Structured filter; empty when no constraint applies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterObject {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spatial_field: Vec<SpatialFilter>,
}

impl FilterObject {
    pub fn spatial(filter: SpatialFilter) -> Self {
        Self {
            spatial_field: vec![filter],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.spatial_field.is_empty()
    }

    /// Binds every unbound spatial filter to the described geometry `attribute`.
    pub fn with_attribute(self, attribute: &str) -> Self {
        Self {
            spatial_field: self
                .spatial_field
                .into_iter()
                .map(|f| f.with_attribute(attribute))
                .collect(),
        }
    }
}

/// Rendering technology of the map.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapTechnology {
    #[default]
    OpenLayers,
    Leaflet,
    /// 3D globe.
    Cesium,
}

impl MapTechnology {
    /// Whether the map reports a planar bounding box that can be intersected client-side.
    pub fn supports_viewport_filter(self) -> bool {
        match self {
            MapTechnology::OpenLayers | MapTechnology::Leaflet => true,
            MapTechnology::Cesium => false,
        }
    }
}

/// Current viewport, as needed for filtering queries by what is on screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportQueryContext {
    pub bbox: Aabb2,
    pub projection: String,
    /// Whether the user enabled filtering by viewport.
    pub active: bool,
    #[serde(default)]
    pub technology: MapTechnology,
}

/// Viewport filter for the current map state; empty when inactive or unsupported.
pub fn viewport_filter(ctx: &ViewportQueryContext) -> FilterObject {
    if !ctx.active || !ctx.technology.supports_viewport_filter() {
        return FilterObject::default();
    }
    FilterObject::spatial(build_viewport_filter(ctx.bbox, ctx.projection.clone()))
}
