//! `extmod` loads externally hosted module bundles into a running process and tracks their load
//! state for consumers.
//!
//! # Overview
//!
//! - [`ModuleCache`] remembers every module loaded during the process lifetime, keyed by URL.
//! - [`LoaderBackend`] fetches and executes a bundle and returns what it published under its
//!   registration key. [`HttpBackend`] does this over HTTP against a shared [`GlobalScope`].
//! - [`ModuleLoader`] combines the two: cache hits are served directly, concurrent loads of one
//!   URL share a single fetch, and loaded modules are stored before callers see them.
//! - [`Projector`] exposes a live [`LoadState`] per consumer, with a slow-load spinner and
//!   deterministic handling of URL changes.
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use extmod::{
//!     HttpBackend, LoaderConfig, MemoryModuleCache, ModuleLoader, ModuleRequest, Projector,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = LoaderConfig::default();
//!     let backend = HttpBackend::<serde_json::Value>::new(&config)?;
//!     let loader = ModuleLoader::new(backend, MemoryModuleCache::new());
//!
//!     let request = ModuleRequest::new("http://localhost:3005/hello.json", "__hello__");
//!     let projector = Projector::new(loader, &config, request);
//!
//!     let module = projector.wait_ready().await?;
//!     println!("{module}");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`backend`] - Fetching and executing bundles
//! - [`cache`] - Module storage
//! - [`cli`] - Command-line interface
//! - [`config`] - Loader configuration
//! - [`loader`] - Cached, de-duplicated loading
//! - [`projector`] - Observable load state

#![warn(missing_docs)]

mod error;
mod request;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub mod backend;
pub mod cache;
pub mod cli;
pub mod config;
pub mod loader;
pub mod projector;

pub use backend::*;
pub use cache::*;
pub use config::*;
pub use error::*;
pub use loader::*;
pub use projector::*;
pub use request::*;
