//! Fetch-and-register of external modules on top of a [`ModuleCache`].

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use futures::{
    future::{self, BoxFuture, Shared},
    FutureExt,
};

use crate::{
    backend::{Globals, LoaderBackend},
    cache::ModuleCache,
    ExtmodError, ExtmodResult, ModuleRequest,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The outcome of a load as seen by every caller that joined it.
type SharedOutcome<T> = Result<Arc<T>, Arc<ExtmodError>>;

/// A load that is still running, shared by all callers waiting on the same URL.
type InFlightLoad<T> = Shared<BoxFuture<'static, SharedOutcome<T>>>;

type InFlightMap<T> = Arc<Mutex<HashMap<String, InFlight<T>>>>;

/// A running fetch and the registration key it was started with.
struct InFlight<T> {
    registration_key: String,
    load: InFlightLoad<T>,
}

/// Removes a URL from the in-flight map when its fetch task ends, including by panic.
struct Unregister<T> {
    in_flight: InFlightMap<T>,
    url: String,
}

/// Loads external modules through a [`LoaderBackend`] and remembers them in a [`ModuleCache`].
///
/// - A URL that is already cached is served without touching the backend.
/// - Concurrent loads of the same URL share a single backend fetch.
/// - Fetches run in their own task. Dropping every future returned by [`load`][Self::load] does
///   not cancel the fetch, so the cache still gets primed for later requests.
///
/// Clones share the backend, the cache and the set of in-flight loads.
pub struct ModuleLoader<B, C>
where
    B: LoaderBackend,
{
    backend: Arc<B>,
    cache: Arc<C>,
    in_flight: InFlightMap<B::Module>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<B, C> ModuleLoader<B, C>
where
    B: LoaderBackend,
    C: ModuleCache<B::Module> + 'static,
{
    /// Creates a loader that fetches through `backend` and caches into `cache`.
    pub fn new(backend: B, cache: C) -> Self {
        Self {
            backend: Arc::new(backend),
            cache: Arc::new(cache),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The backend used for fetching.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The cache loaded modules are stored in.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Returns the cached module for `url` without starting a load.
    pub fn lookup(&self, url: &str) -> Option<Arc<B::Module>> {
        self.cache.lookup(url)
    }

    /// Whether a fetch for `url` is currently running.
    pub fn in_flight(&self, url: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(url)
    }

    /// Loads the module described by `request`.
    ///
    /// The cache check and the registration of a new fetch happen when this is called, not when
    /// the returned future is first polled. The module is in the cache before the returned future
    /// resolves, so a [`lookup`][Self::lookup] after an awaited load always hits.
    ///
    /// Failures are reported as [`ExtmodError::LoadFailed`] wrapping the backend's error. A failed
    /// URL is not remembered, the next call fetches it again.
    ///
    /// Loads are keyed by URL alone. A request that arrives while a fetch for its URL is running
    /// joins that fetch and receives its result, even if it names a different registration key
    /// or different globals.
    ///
    /// # Panics
    ///
    /// Panics when a fetch has to be started outside of a tokio runtime.
    pub fn load(
        &self,
        request: &ModuleRequest,
    ) -> BoxFuture<'static, ExtmodResult<Arc<B::Module>>> {
        let url = request.get_url().clone();
        if let Some(module) = self.cache.lookup(&url) {
            tracing::debug!(%url, "serving module from cache");
            return future::ready(Ok(module)).boxed();
        }

        let load = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

            // A fetch may have finished between the first lookup and taking the lock. It stores
            // into the cache before it unregisters itself, so checking again here is enough.
            if let Some(module) = self.cache.lookup(&url) {
                return future::ready(Ok(module)).boxed();
            }

            match in_flight.get(&url) {
                Some(running) => {
                    let registration_key = request.get_registration_key();
                    if *registration_key != running.registration_key {
                        tracing::debug!(
                            %url,
                            %registration_key,
                            running = %running.registration_key,
                            "joining in-flight load started under another registration key"
                        );
                    } else {
                        tracing::debug!(%url, "joining in-flight load");
                    }
                    running.load.clone()
                }
                None => {
                    let load = self.spawn_fetch(request);
                    in_flight.insert(
                        url.clone(),
                        InFlight {
                            registration_key: request.get_registration_key().clone(),
                            load: load.clone(),
                        },
                    );
                    load
                }
            }
        };

        async move { load.await.map_err(|source| ExtmodError::LoadFailed { url, source }) }.boxed()
    }

    /// Starts the backend fetch for `request` in its own task.
    ///
    /// Must be called with the in-flight map locked, the task unregisters itself from that map
    /// when it finishes.
    fn spawn_fetch(&self, request: &ModuleRequest) -> InFlightLoad<B::Module> {
        let backend = Arc::clone(&self.backend);
        let cache = Arc::clone(&self.cache);
        let in_flight = Arc::clone(&self.in_flight);
        let request = request.clone();

        let handle = tokio::spawn(async move {
            let _unregister = Unregister {
                in_flight,
                url: request.get_url().clone(),
            };

            fetch_and_register(
                &*backend,
                &*cache,
                request.get_url(),
                request.get_registration_key(),
                request.get_globals(),
            )
            .await
            .map_err(Arc::new)
        });

        handle
            .map(|joined| match joined {
                Ok(outcome) => outcome,
                Err(e) => Err(Arc::new(ExtmodError::JoinError(e))),
            })
            .boxed()
            .shared()
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Fetches a module and stores it in the cache.
async fn fetch_and_register<B, C>(
    backend: &B,
    cache: &C,
    url: &str,
    registration_key: &str,
    globals: &Globals,
) -> ExtmodResult<Arc<B::Module>>
where
    B: LoaderBackend,
    C: ModuleCache<B::Module>,
{
    let Some(module) = backend.fetch(url, registration_key, globals).await? else {
        tracing::error!("loaded {url} but it did not publish `{registration_key}`");
        return Err(ExtmodError::MissingExport {
            url: url.to_string(),
            key: registration_key.to_string(),
        });
    };

    let module = Arc::new(module);
    cache.store(url, Arc::clone(&module));
    tracing::info!(url, registration_key, "module loaded");

    Ok(module)
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl<T> Drop for Unregister<T> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.url);
    }
}

impl<B, C> Clone for ModuleLoader<B, C>
where
    B: LoaderBackend,
{
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            cache: Arc::clone(&self.cache),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<B, C> fmt::Debug for ModuleLoader<B, C>
where
    B: LoaderBackend + fmt::Debug,
    C: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let in_flight: Vec<String> = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();

        f.debug_struct("ModuleLoader")
            .field("backend", &self.backend)
            .field("cache", &self.cache)
            .field("in_flight", &in_flight)
            .finish()
    }
}
