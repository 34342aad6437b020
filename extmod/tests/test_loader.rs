mod common;

use std::{sync::Arc, time::Duration};

use common::{MockBackend, KEY_A, KEY_B, URL_A, URL_B};
use extmod::{
    ExtmodError, MemoryModuleCache, ModuleCache, ModuleLoader, ModuleRequest,
};
use serde_json::json;

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[test_log::test(tokio::test(start_paused = true))]
async fn test_loader_caches_loaded_module() -> anyhow::Result<()> {
    let loader = ModuleLoader::new(
        MockBackend::new().with_module(URL_A, 100, "hello"),
        MemoryModuleCache::new(),
    );
    let request = ModuleRequest::new(URL_A, KEY_A);

    assert!(loader.lookup(URL_A).is_none());

    let first = loader.load(&request).await?;
    assert_eq!(*first, "hello");

    // The cache is written before the load resolves.
    let cached = loader.lookup(URL_A).expect("module should be cached");
    assert!(Arc::ptr_eq(&first, &cached));

    let second = loader.load(&request).await?;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(loader.backend().calls(URL_A), 1);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_loader_serves_pre_seeded_cache_without_fetching() -> anyhow::Result<()> {
    let cache = MemoryModuleCache::new();
    let module = Arc::new("primed".to_string());
    cache.store(URL_A, Arc::clone(&module));

    let loader = ModuleLoader::new(MockBackend::new(), cache);
    let loaded = loader.load(&ModuleRequest::new(URL_A, KEY_A)).await?;

    assert!(Arc::ptr_eq(&loaded, &module));
    assert_eq!(loader.backend().calls(URL_A), 0);

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_loader_deduplicates_concurrent_loads() -> anyhow::Result<()> {
    let loader = ModuleLoader::new(
        MockBackend::new().with_module(URL_A, 500, "hello"),
        MemoryModuleCache::new(),
    );
    let request = ModuleRequest::new(URL_A, KEY_A);

    let first = loader.load(&request);
    let second = loader.clone().load(&request);
    assert!(loader.in_flight(URL_A));

    let (first, second) = tokio::join!(first, second);
    let (first, second) = (first?, second?);

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(loader.backend().calls(URL_A), 1);
    assert!(!loader.in_flight(URL_A));

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_loader_joined_request_shares_result_across_keys() -> anyhow::Result<()> {
    let loader = ModuleLoader::new(
        MockBackend::new().with_module(URL_A, 200, "hello"),
        MemoryModuleCache::new(),
    );

    let (first, second) = tokio::join!(
        loader.load(&ModuleRequest::new(URL_A, KEY_A)),
        loader.load(&ModuleRequest::new(URL_A, KEY_B))
    );

    assert!(Arc::ptr_eq(&first?, &second?));
    assert_eq!(loader.backend().calls(URL_A), 1);

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_loader_fetch_survives_dropped_callers() -> anyhow::Result<()> {
    let loader = ModuleLoader::new(
        MockBackend::new().with_module(URL_A, 300, "hello"),
        MemoryModuleCache::new(),
    );

    drop(loader.load(&ModuleRequest::new(URL_A, KEY_A)));
    assert!(loader.in_flight(URL_A));

    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(loader.lookup(URL_A).as_deref().map(String::as_str), Some("hello"));
    assert!(!loader.in_flight(URL_A));
    assert_eq!(loader.backend().calls(URL_A), 1);

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_loader_missing_export_fails_and_is_retryable() -> anyhow::Result<()> {
    let loader = ModuleLoader::new(
        MockBackend::new().with_missing_export(URL_A, 100),
        MemoryModuleCache::new(),
    );
    let request = ModuleRequest::new(URL_A, KEY_A);

    let error = loader.load(&request).await.unwrap_err();
    assert!(matches!(error, ExtmodError::LoadFailed { .. }));
    assert!(matches!(
        error.root(),
        ExtmodError::MissingExport { url, key } if url == URL_A && key == KEY_A
    ));
    assert!(loader.lookup(URL_A).is_none());
    assert!(!loader.in_flight(URL_A));

    assert!(loader.load(&request).await.is_err());
    assert_eq!(loader.backend().calls(URL_A), 2);

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_loader_shares_failures_with_joined_callers() -> anyhow::Result<()> {
    let loader = ModuleLoader::new(
        MockBackend::new().with_failure(URL_A, 200, 503),
        MemoryModuleCache::new(),
    );
    let request = ModuleRequest::new(URL_A, KEY_A);

    let (first, second) = tokio::join!(loader.load(&request), loader.load(&request));
    for result in [first, second] {
        assert!(matches!(
            result.unwrap_err().root(),
            ExtmodError::UnexpectedStatus { status: 503, .. }
        ));
    }
    assert_eq!(loader.backend().calls(URL_A), 1);

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_loader_fetches_distinct_urls_independently() -> anyhow::Result<()> {
    let loader = ModuleLoader::new(
        MockBackend::new()
            .with_module(URL_A, 100, "a")
            .with_module(URL_B, 100, "b"),
        MemoryModuleCache::new(),
    );

    let (a, b) = tokio::join!(
        loader.load(&ModuleRequest::new(URL_A, KEY_A)),
        loader.load(&ModuleRequest::new(URL_B, KEY_B))
    );

    assert_eq!(*a?, "a");
    assert_eq!(*b?, "b");
    assert_eq!(loader.backend().calls(URL_A), 1);
    assert_eq!(loader.backend().calls(URL_B), 1);
    assert_eq!(loader.cache().len(), 2);

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_loader_passes_globals_to_backend() -> anyhow::Result<()> {
    let loader = ModuleLoader::new(
        MockBackend::new().with_module(URL_A, 10, "hello"),
        MemoryModuleCache::new(),
    );

    let mut globals = extmod::Globals::new();
    globals.insert("__hello_globals__".into(), json!({ "react": "18.2.0" }));
    let request = ModuleRequest::builder()
        .url(URL_A)
        .registration_key(KEY_A)
        .globals(globals.clone())
        .build();

    loader.load(&request).await?;
    assert_eq!(loader.backend().seen_globals(), vec![globals]);

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_loaders_with_separate_caches_share_a_backend() -> anyhow::Result<()> {
    let backend = Arc::new(MockBackend::new().with_module(URL_A, 10, "hello"));
    let first = ModuleLoader::new(Arc::clone(&backend), MemoryModuleCache::new());
    let second = ModuleLoader::new(Arc::clone(&backend), MemoryModuleCache::new());
    let request = ModuleRequest::new(URL_A, KEY_A);

    first.load(&request).await?;
    assert!(second.lookup(URL_A).is_none());

    second.load(&request).await?;
    assert_eq!(backend.calls(URL_A), 2);

    Ok(())
}
