use std::{fmt, sync::Arc};

use crate::ExtmodError;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The load state of a module as seen by one consumer.
///
/// Every transition replaces the whole value, so a state is never observed half-updated.
#[derive(Debug)]
pub enum LoadState<T> {
    /// The module is being fetched.
    Loading {
        /// The module URL.
        url: String,

        /// Whether the load has been pending for longer than the slow-load threshold.
        spinner: bool,
    },

    /// The module is available.
    Ready {
        /// The module URL.
        url: String,

        /// Whether the module came straight from the cache without a fetch in this cycle.
        cached: bool,

        /// The loaded module.
        module: Arc<T>,
    },

    /// The load failed. Stays failed until the consumer observes a different URL.
    Failed {
        /// The module URL.
        url: String,

        /// Why the load failed.
        error: Arc<ExtmodError>,
    },
}

/// A flat, read-only projection of a [`LoadState`] for UI layers.
///
/// `module` is present if and only if `ready` is true.
#[derive(Debug)]
pub struct ModuleView<T> {
    /// The module URL.
    pub url: String,

    /// Whether the module is available.
    pub ready: bool,

    /// Whether the module came from the cache.
    pub cached: bool,

    /// Whether a slow-load indicator should be shown.
    pub spinner: bool,

    /// The loaded module.
    pub module: Option<Arc<T>>,

    /// The failure message, if the load failed.
    pub error: Option<String>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<T> LoadState<T> {
    /// A fresh pending state for `url`.
    pub fn loading(url: impl Into<String>) -> Self {
        LoadState::Loading {
            url: url.into(),
            spinner: false,
        }
    }

    /// The URL this state belongs to.
    pub fn url(&self) -> &str {
        match self {
            LoadState::Loading { url, .. }
            | LoadState::Ready { url, .. }
            | LoadState::Failed { url, .. } => url,
        }
    }

    /// Whether the module is available.
    pub fn is_ready(&self) -> bool {
        matches!(self, LoadState::Ready { .. })
    }

    /// Whether the module was served from the cache.
    pub fn is_cached(&self) -> bool {
        matches!(self, LoadState::Ready { cached: true, .. })
    }

    /// Whether the slow-load indicator is up.
    pub fn is_spinner(&self) -> bool {
        matches!(self, LoadState::Loading { spinner: true, .. })
    }

    /// Whether the load is still running.
    pub fn is_pending(&self) -> bool {
        matches!(self, LoadState::Loading { .. })
    }

    /// The loaded module, if ready.
    pub fn module(&self) -> Option<&Arc<T>> {
        match self {
            LoadState::Ready { module, .. } => Some(module),
            _ => None,
        }
    }

    /// The failure, if the load failed.
    pub fn error(&self) -> Option<&Arc<ExtmodError>> {
        match self {
            LoadState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Flattens the state into a [`ModuleView`].
    pub fn view(&self) -> ModuleView<T> {
        ModuleView {
            url: self.url().to_string(),
            ready: self.is_ready(),
            cached: self.is_cached(),
            spinner: self.is_spinner(),
            module: self.module().cloned(),
            error: self.error().map(|error| error.to_string()),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl<T> Clone for LoadState<T> {
    fn clone(&self) -> Self {
        match self {
            LoadState::Loading { url, spinner } => LoadState::Loading {
                url: url.clone(),
                spinner: *spinner,
            },
            LoadState::Ready {
                url,
                cached,
                module,
            } => LoadState::Ready {
                url: url.clone(),
                cached: *cached,
                module: Arc::clone(module),
            },
            LoadState::Failed { url, error } => LoadState::Failed {
                url: url.clone(),
                error: Arc::clone(error),
            },
        }
    }
}

impl<T> Clone for ModuleView<T> {
    fn clone(&self) -> Self {
        Self {
            url: self.url.clone(),
            ready: self.ready,
            cached: self.cached,
            spinner: self.spinner,
            module: self.module.clone(),
            error: self.error.clone(),
        }
    }
}

impl<T> From<&LoadState<T>> for ModuleView<T> {
    fn from(state: &LoadState<T>) -> Self {
        state.view()
    }
}

impl<T> fmt::Display for LoadState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadState::Loading { url, spinner: false } => write!(f, "loading {url}"),
            LoadState::Loading { url, spinner: true } => write!(f, "loading {url} (slow)"),
            LoadState::Ready {
                url, cached: true, ..
            } => write!(f, "ready {url} (cached)"),
            LoadState::Ready { url, .. } => write!(f, "ready {url}"),
            LoadState::Failed { url, error } => write!(f, "failed {url}: {error}"),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
