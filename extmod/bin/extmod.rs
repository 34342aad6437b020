//! `extmod` loads a module bundle and prints how its load state evolves.
//!
//! ```bash
//! extmod load http://localhost:3005/build/hello/bundle.json \
//!     --key __hello__ \
//!     --global '__hello_globals__={"react":"18.2.0"}' \
//!     --repeat 2
//! ```
//!
//! The second observation of the same URL comes straight from the cache.

use std::path::{Path, PathBuf};

use clap::Parser;
use extmod::{
    cli::{AnsiStyles, ExtmodArgs, ExtmodSubcommand},
    parse_global, ExtmodError, ExtmodResult, Globals, HttpBackend, LoadState, LoaderConfig,
    MemoryModuleCache, ModuleLoader, ModuleRequest, Projector, DEFAULT_CONFIG_FILENAME,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

//--------------------------------------------------------------------------------------------------
// Functions: main
//--------------------------------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExtmodResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = ExtmodArgs::parse();
    match args.subcommand {
        ExtmodSubcommand::Load {
            url,
            key,
            globals,
            config,
            slow_ms,
            repeat,
        } => load_subcommand(url, key, globals, config, slow_ms, repeat).await?,
    }

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Functions: Handlers
//--------------------------------------------------------------------------------------------------

async fn load_subcommand(
    url: String,
    key: String,
    globals: Vec<String>,
    config: Option<PathBuf>,
    slow_ms: Option<u64>,
    repeat: u32,
) -> ExtmodResult<()> {
    let mut config = load_config(config.as_deref()).await?;
    if let Some(slow_ms) = slow_ms {
        config.set_slow_load_threshold_ms(slow_ms);
    }

    let globals = globals
        .iter()
        .map(|binding| parse_global(binding))
        .collect::<ExtmodResult<Globals>>()?;

    let request = ModuleRequest::builder()
        .url(url)
        .registration_key(key)
        .globals(globals)
        .build();

    let backend = HttpBackend::<Value>::new(&config)?;
    let loader = ModuleLoader::new(backend, MemoryModuleCache::new());

    for round in 1..=repeat.max(1) {
        println!("{}", format!("observation {round}").header());

        let projector = Projector::new(loader.clone(), &config, request.clone());
        let mut updates = projector.subscribe();

        loop {
            let state = updates.borrow_and_update().clone();
            print_state(&state);

            match state {
                LoadState::Loading { .. } => {
                    updates.changed().await.map_err(ExtmodError::custom)?;
                }
                LoadState::Ready { module, .. } => {
                    let rendered =
                        serde_json::to_string_pretty(&*module).map_err(ExtmodError::custom)?;
                    println!("{rendered}");
                    break;
                }
                LoadState::Failed { url, error } => {
                    return Err(ExtmodError::LoadFailed { url, source: error });
                }
            }
        }

        projector.detach();
    }

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

/// Reads the given config file, or `extmod.toml` in the working directory if it exists.
async fn load_config(path: Option<&Path>) -> ExtmodResult<LoaderConfig> {
    match path {
        Some(path) => LoaderConfig::from_path(path).await,
        None if Path::new(DEFAULT_CONFIG_FILENAME).exists() => {
            LoaderConfig::from_path(DEFAULT_CONFIG_FILENAME).await
        }
        None => Ok(LoaderConfig::default()),
    }
}

fn print_state(state: &LoadState<Value>) {
    let view = state.view();
    let label = match state {
        LoadState::Loading { .. } if view.spinner => "slow".placeholder(),
        LoadState::Loading { .. } => "loading".literal(),
        LoadState::Ready { .. } => "ready".valid(),
        LoadState::Failed { .. } => "failed".error(),
    };

    println!(
        "  {label} url={} ready={} cached={} spinner={}",
        view.url, view.ready, view.cached, view.spinner
    );
}
