use std::{fmt, marker::PhantomData};

use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;

use crate::{
    backend::{Bundle, GlobalScope, Globals, LoaderBackend},
    config::LoaderConfig,
    ExtmodError, ExtmodResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A [`LoaderBackend`] that fetches [`Bundle`] documents over HTTP and runs them against a shared
/// [`GlobalScope`].
///
/// A fetch goes through these steps:
/// 1. the caller's globals are seeded into the scope,
/// 2. the bundle at the URL is downloaded, retrying transient failures,
/// 3. the bundle is executed, which publishes its bindings into the scope,
/// 4. the value bound to the registration key is deserialized into `T`.
///
/// Steps 3 and 4 happen under one lock of the scope, so concurrent fetches that publish the same
/// key each read back their own value.
pub struct HttpBackend<T> {
    /// The HTTP client used to download bundles.
    client: ClientWithMiddleware,

    /// The namespace bundles execute against.
    scope: GlobalScope,

    module: PhantomData<fn() -> T>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<T> HttpBackend<T> {
    /// Creates a backend with its own empty scope.
    pub fn new(config: &LoaderConfig) -> ExtmodResult<Self> {
        Self::with_scope(config, GlobalScope::new())
    }

    /// Creates a backend that executes bundles against `scope`.
    pub fn with_scope(config: &LoaderConfig, scope: GlobalScope) -> ExtmodResult<Self> {
        let mut client = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            client = client.timeout(timeout);
        }

        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(*config.get_http_max_retries());
        let client = ClientBuilder::new(client.build()?)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            scope,
            module: PhantomData,
        })
    }

    /// The namespace bundles execute against.
    pub fn scope(&self) -> &GlobalScope {
        &self.scope
    }

    /// Downloads the raw bundle bytes.
    async fn download(&self, url: &str) -> ExtmodResult<Vec<u8>> {
        let request = self.client.get(url).build()?;
        let response = self.client.execute(request).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtmodError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait::async_trait]
impl<T> LoaderBackend for HttpBackend<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    type Module = T;

    async fn fetch(
        &self,
        url: &str,
        registration_key: &str,
        globals: &Globals,
    ) -> ExtmodResult<Option<T>> {
        self.scope.seed(globals);

        tracing::info!("fetching bundle: {url}");
        let bytes = self.download(url).await?;
        let bundle = Bundle::from_slice(url, &bytes)?;

        let Some(value) = self.scope.run(url, bundle, registration_key)? else {
            return Ok(None);
        };

        serde_json::from_value(value)
            .map(Some)
            .map_err(|source| ExtmodError::InvalidExport {
                url: url.to_string(),
                key: registration_key.to_string(),
                source,
            })
    }
}

impl<T> fmt::Debug for HttpBackend<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBackend")
            .field("client", &self.client)
            .field("scope", &self.scope)
            .finish()
    }
}
