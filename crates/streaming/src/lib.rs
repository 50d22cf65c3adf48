pub mod cache;
pub mod identify;
pub mod request;
pub mod service;
pub mod wfs;

pub use cache::*;
pub use identify::*;
pub use request::*;
pub use service::*;
pub use wfs::*;
