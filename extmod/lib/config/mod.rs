//! Configuration types and helpers.

mod defaults;
mod loader;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use defaults::*;
pub use loader::*;
