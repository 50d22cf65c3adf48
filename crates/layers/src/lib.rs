pub mod cql;
pub mod filter;
pub mod layer;
pub mod point;
pub mod query;
pub mod vendor;

pub use filter::*;
pub use layer::*;
pub use point::*;
pub use query::*;
pub use vendor::*;
