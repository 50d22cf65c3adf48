pub mod bounds;
pub mod feature;
pub mod geometry;
pub mod math;
pub mod params;
pub mod srs;

// Foundation crate: small, well-tested primitives only.
pub use bounds::*;
pub use feature::*;
pub use geometry::*;
pub use math::*;
pub use params::*;
pub use srs::*;
