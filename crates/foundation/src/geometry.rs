use serde::{Deserialize, Serialize};

use crate::bounds::Aabb2;
use crate::math::LatLng;
use crate::srs::{WGS84, epsg_code};

/// Geometry value carried by spatial filters, tagged with its reference system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        coordinates: [f64; 2],
        projection: String,
    },
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extent: Option<[f64; 4]>,
        projection: String,
    },
}

impl Geometry {
    pub fn point(x: f64, y: f64, projection: impl Into<String>) -> Self {
        Geometry::Point {
            coordinates: [x, y],
            projection: projection.into(),
        }
    }

    /// WGS84 point for a pointer position, longitude wrapped into `[-180, 180)`.
    pub fn from_lat_lng(latlng: LatLng) -> Self {
        let p = latlng.wrapped();
        Geometry::point(p.lng, p.lat, WGS84)
    }

    /// Rectangle polygon covering `bbox`, keeping the box as its extent.
    pub fn rectangle(bbox: Aabb2, projection: impl Into<String>) -> Self {
        Geometry::Polygon {
            coordinates: vec![bbox.ring()],
            extent: Some(bbox.extent()),
            projection: projection.into(),
        }
    }

    pub fn projection(&self) -> &str {
        match self {
            Geometry::Point { projection, .. } | Geometry::Polygon { projection, .. } => projection,
        }
    }

    /// Well-known-text rendering, prefixed with `SRID=n;` when the projection is an EPSG code.
    pub fn to_ewkt(&self) -> String {
        let wkt = match self {
            Geometry::Point { coordinates, .. } => {
                format!("POINT({} {})", coordinates[0], coordinates[1])
            }
            Geometry::Polygon { coordinates, .. } => {
                let rings: Vec<String> = coordinates
                    .iter()
                    .map(|ring| {
                        let pts: Vec<String> =
                            ring.iter().map(|[x, y]| format!("{x} {y}")).collect();
                        format!("({})", pts.join(", "))
                    })
                    .collect();
                format!("POLYGON({})", rings.join(", "))
            }
        };
        match epsg_code(self.projection()) {
            Some(code) => format!("SRID={code};{wkt}"),
            None => wkt,
        }
    }
}
