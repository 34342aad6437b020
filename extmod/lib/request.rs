use getset::Getters;
use typed_builder::TypedBuilder;

use crate::backend::Globals;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// What a consumer asks for: a module URL, the key the module publishes itself under and the
/// globals it expects the host to provide.
#[derive(Debug, Clone, TypedBuilder, PartialEq, Getters)]
#[getset(get = "pub with_prefix")]
pub struct ModuleRequest {
    /// Absolute URL of the module bundle. Also the cache key.
    #[builder(setter(into))]
    url: String,

    /// The name the module publishes its export under.
    #[builder(setter(into))]
    registration_key: String,

    /// Values bound in the execution environment before the module runs.
    #[builder(default)]
    globals: Globals,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ModuleRequest {
    /// Creates a request that seeds no globals.
    pub fn new(url: impl Into<String>, registration_key: impl Into<String>) -> Self {
        Self::builder()
            .url(url)
            .registration_key(registration_key)
            .build()
    }
}
