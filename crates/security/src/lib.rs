pub mod credentials;
pub mod policy;
pub mod principal;

pub use credentials::*;
pub use policy::*;
pub use principal::*;
