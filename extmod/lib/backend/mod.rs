//! Backends that know how to fetch and execute a module bundle on the host platform.

mod bundle;
mod http;
mod scope;
mod traits;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use bundle::*;
pub use http::*;
pub use scope::*;
pub use traits::*;
