use foundation::feature::Feature;
use foundation::geometry::Geometry;
use foundation::math::LatLng;
use serde::{Deserialize, Serialize};

/// Features already resolved client-side for one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntersectedFeatures {
    /// Resource id the features belong to.
    pub id: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// A map click, possibly carrying pre-intersected features or an explicit filter geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapPoint {
    pub latlng: LatLng,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intersected_features: Option<Vec<IntersectedFeatures>>,
    /// Geometry of an emulated click filter; takes precedence over `latlng`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometric_filter: Option<Geometry>,
}

impl MapPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            latlng: LatLng::new(lat, lng),
            intersected_features: None,
            geometric_filter: None,
        }
    }

    pub fn with_intersected(mut self, id: impl Into<String>, features: Vec<Feature>) -> Self {
        self.intersected_features
            .get_or_insert_with(Vec::new)
            .push(IntersectedFeatures {
                id: id.into(),
                features,
            });
        self
    }

    pub fn with_geometric_filter(mut self, geometry: Geometry) -> Self {
        self.geometric_filter = Some(geometry);
        self
    }

    /// Pre-intersected features for `resource_id`, if the client resolved them.
    pub fn intersected_for(&self, resource_id: &str) -> Option<&[Feature]> {
        self.intersected_features
            .as_ref()?
            .iter()
            .find(|entry| entry.id == resource_id)
            .map(|entry| entry.features.as_slice())
    }

    /// Canonical query geometry: the explicit filter geometry when present, else a
    /// WGS84 point with the longitude wrapped into `[-180, 180)`.
    pub fn identify_geometry(&self) -> Geometry {
        match &self.geometric_filter {
            Some(geometry) => geometry.clone(),
            None => Geometry::from_lat_lng(self.latlng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MapPoint;
    use foundation::feature::Feature;
    use foundation::geometry::Geometry;

    #[test]
    fn click_point_is_normalized() {
        let p = MapPoint::new(45.0, -200.0);
        assert_eq!(p.identify_geometry(), Geometry::point(160.0, 45.0, "EPSG:4326"));
    }

    #[test]
    fn explicit_filter_geometry_passes_through() {
        let g = Geometry::point(1_000_000.0, 2_000_000.0, "EPSG:3857");
        let p = MapPoint::new(45.0, 500.0).with_geometric_filter(g.clone());
        assert_eq!(p.identify_geometry(), g);
    }

    #[test]
    fn intersected_lookup_by_resource() {
        let p = MapPoint::new(0.0, 0.0).with_intersected("a", vec![Feature::new("a.1")]);
        assert_eq!(p.intersected_for("a").map(<[Feature]>::len), Some(1));
        assert!(p.intersected_for("b").is_none());
        assert!(MapPoint::new(0.0, 0.0).intersected_for("a").is_none());
    }
}
