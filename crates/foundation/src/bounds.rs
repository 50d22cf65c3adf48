use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in map units, `[min_x, min_y]` to `[max_x, max_y]`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    /// Builds a box from `[min_x, min_y, max_x, max_y]`, the order map bounds are reported in.
    pub fn from_extent(extent: [f64; 4]) -> Self {
        Aabb2 {
            min: [extent[0], extent[1]],
            max: [extent[2], extent[3]],
        }
    }

    pub fn extent(&self) -> [f64; 4] {
        [self.min[0], self.min[1], self.max[0], self.max[1]]
    }

    /// Closed, counter-clockwise exterior ring starting at the lower-left corner.
    pub fn ring(&self) -> Vec<[f64; 2]> {
        let [x0, y0] = self.min;
        let [x1, y1] = self.max;
        vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]
    }
}

#[cfg(test)]
mod tests {
    use super::Aabb2;

    #[test]
    fn ring_is_closed() {
        let b = Aabb2::from_extent([0.0, 0.0, 1.0, 2.0]);
        let ring = b.ring();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
        assert_eq!(ring[2], [1.0, 2.0]);
        assert_eq!(b.extent(), [0.0, 0.0, 1.0, 2.0]);
    }
}
