use std::sync::Arc;

use crate::{backend::Globals, ExtmodResult};

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// Executes remote module code on the host platform and hands back what it published.
///
/// How the code is fetched, how it runs and how it hands its export back are details of the
/// implementation. The loader only relies on this contract:
///
/// - `globals` are bound in the execution environment before the code runs, so the module can
///   depend on host-provided values instead of bundling its own copies.
/// - The module publishes a single value under `registration_key`.
/// - `Ok(None)` means the code ran but published nothing (or `null`) under that key.
///
/// Each call performs one fetch. De-duplication and caching belong to the loader.
#[async_trait::async_trait]
pub trait LoaderBackend: Send + Sync + 'static {
    /// The type of the value a module publishes.
    type Module: Send + Sync + 'static;

    /// Fetches and executes the code at `url`, then returns the value published under
    /// `registration_key`.
    async fn fetch(
        &self,
        url: &str,
        registration_key: &str,
        globals: &Globals,
    ) -> ExtmodResult<Option<Self::Module>>;
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait::async_trait]
impl<B> LoaderBackend for Arc<B>
where
    B: LoaderBackend + ?Sized,
{
    type Module = B::Module;

    async fn fetch(
        &self,
        url: &str,
        registration_key: &str,
        globals: &Globals,
    ) -> ExtmodResult<Option<Self::Module>> {
        (**self).fetch(url, registration_key, globals).await
    }
}
