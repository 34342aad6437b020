//! Observable load state for consumers of external modules.
//!
//! A [`Projector`] turns a [`ModuleLoader`] into a small state machine a UI layer can watch:
//!
//! ```text
//!            cache hit                               load resolves
//! observe ──────────────▶ Ready{cached}   Loading ─────────────────▶ Ready
//!    │                                    │   ▲  │
//!    │ cache miss                         │   │  └── load fails ─────▶ Failed
//!    └──────────────▶ Loading{spinner: false}  │
//!                          │ slow-load threshold
//!                          └──────▶ Loading{spinner: true}
//! ```
//!
//! Observing a different URL replaces the state synchronously before any asynchronous work. A load
//! that resolves after its URL was superseded never touches the newer state.

mod state;

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::{sync::watch, task::JoinHandle};

use crate::{
    backend::LoaderBackend, cache::ModuleCache, config::LoaderConfig, loader::ModuleLoader,
    ExtmodError, ExtmodResult, ModuleRequest,
};

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use state::*;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Tracks the load state of one module for one consumer.
///
/// The state is published through a [`watch`] channel: [`subscribe`][Self::subscribe] hands out
/// live receivers, [`state`][Self::state] and [`view`][Self::view] take snapshots.
///
/// Dropping the projector stops tracking. The underlying fetch is left running and still fills the
/// cache.
pub struct Projector<B, C>
where
    B: LoaderBackend,
{
    /// The loader modules are requested from.
    loader: ModuleLoader<B, C>,

    /// How long a load may stay pending before the spinner is raised.
    slow_load_threshold: Duration,

    /// The request currently being tracked.
    request: ModuleRequest,

    /// The current state.
    state: Arc<watch::Sender<LoadState<B::Module>>>,

    /// Identifies the current cycle. Bumped on every URL change, only while the state lock is held.
    epoch: Arc<AtomicU64>,

    /// The task driving the current cycle's timer and load, if the cycle needs one.
    cycle: Option<JoinHandle<()>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<B, C> Projector<B, C>
where
    B: LoaderBackend,
    C: ModuleCache<B::Module> + 'static,
{
    /// Creates a projector and performs the first observation of `request`.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime and the module is not cached.
    pub fn new(loader: ModuleLoader<B, C>, config: &LoaderConfig, request: ModuleRequest) -> Self {
        let (state, _) = watch::channel(LoadState::loading(request.get_url().as_str()));
        let mut projector = Self {
            loader,
            slow_load_threshold: config.slow_load_threshold(),
            request: request.clone(),
            state: Arc::new(state),
            epoch: Arc::new(AtomicU64::new(0)),
            cycle: None,
        };

        projector.start(request);
        projector
    }

    /// Observes `request`.
    ///
    /// If the URL is the one already tracked this is a no-op, whatever state the current cycle is
    /// in. Otherwise the current cycle is abandoned and a new one starts: the state becomes
    /// `Ready { cached: true }` on a cache hit and `Loading { spinner: false }` on a miss, before
    /// this returns.
    pub fn observe(&mut self, request: ModuleRequest) {
        if request.get_url() == self.request.get_url() {
            return;
        }

        tracing::debug!(
            from = %self.request.get_url(),
            to = %request.get_url(),
            "module url changed"
        );

        self.start(request);
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> LoadState<B::Module> {
        self.state.borrow().clone()
    }

    /// A snapshot of the current state, flattened for UI consumption.
    pub fn view(&self) -> ModuleView<B::Module> {
        self.state.borrow().view()
    }

    /// A receiver that sees every state transition from now on.
    pub fn subscribe(&self) -> watch::Receiver<LoadState<B::Module>> {
        self.state.subscribe()
    }

    /// The request currently tracked.
    pub fn request(&self) -> &ModuleRequest {
        &self.request
    }

    /// The loader this projector requests modules from.
    pub fn loader(&self) -> &ModuleLoader<B, C> {
        &self.loader
    }

    /// Waits until the current cycle leaves the loading state.
    ///
    /// Bound the wait with [`tokio::time::timeout`] if needed; a backend that never answers keeps
    /// the state loading forever.
    pub async fn wait_ready(&self) -> ExtmodResult<Arc<B::Module>> {
        let mut updates = self.state.subscribe();
        let state = updates
            .wait_for(|state| !state.is_pending())
            .await
            .map_err(ExtmodError::custom)?
            .clone();

        match state {
            LoadState::Ready { module, .. } => Ok(module),
            LoadState::Failed { url, error } => Err(ExtmodError::LoadFailed { url, source: error }),
            LoadState::Loading { .. } => unreachable!("waited for a settled state"),
        }
    }

    /// Stops tracking. The in-flight fetch, if any, keeps running and still fills the cache.
    pub fn detach(self) {
        tracing::debug!(url = %self.request.get_url(), "projector detached");
    }

    /// Starts a new cycle for `request`.
    fn start(&mut self, request: ModuleRequest) {
        if let Some(cycle) = self.cycle.take() {
            cycle.abort();
        }

        let url = request.get_url().clone();
        let cached = self.loader.lookup(&url);
        let is_cached = cached.is_some();
        let initial = match cached {
            Some(module) => LoadState::Ready {
                url: url.clone(),
                cached: true,
                module,
            },
            None => LoadState::loading(url.as_str()),
        };

        let mut epoch = 0;
        self.state.send_modify(|state| {
            epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
            *state = initial;
        });

        tracing::debug!(%url, epoch, cached = is_cached, "observing module");
        self.request = request;

        if is_cached {
            return;
        }

        let cycle = Cycle {
            url,
            epoch,
            current: Arc::clone(&self.epoch),
            state: Arc::clone(&self.state),
        };
        let load = self.loader.load(&self.request);
        let threshold = self.slow_load_threshold;

        self.cycle = Some(tokio::spawn(async move {
            let mut load = load;
            let outcome = tokio::select! {
                biased;
                outcome = &mut load => outcome,
                _ = tokio::time::sleep(threshold) => {
                    cycle.publish(LoadState::Loading {
                        url: cycle.url.clone(),
                        spinner: true,
                    });
                    load.await
                }
            };

            let next = match outcome {
                Ok(module) => LoadState::Ready {
                    url: cycle.url.clone(),
                    cached: false,
                    module,
                },
                Err(ExtmodError::LoadFailed { source, .. }) => LoadState::Failed {
                    url: cycle.url.clone(),
                    error: source,
                },
                Err(e) => LoadState::Failed {
                    url: cycle.url.clone(),
                    error: Arc::new(e),
                },
            };

            cycle.publish(next);
        }));
    }
}

/// The handle a cycle task uses to publish its transitions.
struct Cycle<T> {
    url: String,
    epoch: u64,
    current: Arc<AtomicU64>,
    state: Arc<watch::Sender<LoadState<T>>>,
}

impl<T> Cycle<T> {
    /// Replaces the state unless this cycle has been superseded.
    fn publish(&self, next: LoadState<T>) -> bool {
        let published = self.state.send_if_modified(|state| {
            if self.current.load(Ordering::Acquire) != self.epoch {
                return false;
            }

            *state = next;
            true
        });

        if published {
            tracing::debug!(url = %self.url, epoch = self.epoch, "load state changed");
        } else {
            tracing::debug!(url = %self.url, epoch = self.epoch, "dropped stale transition");
        }

        published
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl<B, C> Drop for Projector<B, C>
where
    B: LoaderBackend,
{
    fn drop(&mut self) {
        if let Some(cycle) = self.cycle.take() {
            cycle.abort();
        }
    }
}

impl<B, C> fmt::Debug for Projector<B, C>
where
    B: LoaderBackend,
    B::Module: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Projector")
            .field("request", &self.request)
            .field("state", &*self.state.borrow())
            .field("slow_load_threshold", &self.slow_load_threshold)
            .finish()
    }
}
