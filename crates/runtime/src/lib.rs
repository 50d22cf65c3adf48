pub mod config;
pub mod deferred;
pub mod error;
pub mod events;
pub mod lifecycle;

pub use config::*;
pub use deferred::*;
pub use error::*;
pub use events::*;
pub use lifecycle::*;
