#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use extmod::{ExtmodError, ExtmodResult, Globals, LoaderBackend};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

pub const URL_A: &str = "https://host/a.js";
pub const URL_B: &str = "https://host/b.js";
pub const KEY_A: &str = "modA";
pub const KEY_B: &str = "modB";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// How the fake host answers a URL.
#[derive(Debug, Clone)]
enum Response {
    /// The code runs and publishes `module`.
    Publish(String),

    /// The code runs but publishes nothing under the registration key.
    Nothing,

    /// The request itself fails.
    Fail(u16),
}

/// A backend that answers from a fixed table after a per-URL delay, counting every fetch.
#[derive(Debug, Default)]
pub struct MockBackend {
    responses: HashMap<String, (Duration, Response)>,
    failures_first: HashMap<String, usize>,
    calls: Mutex<HashMap<String, usize>>,
    seen_globals: Mutex<Vec<Globals>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// `url` publishes `module` after `delay_ms`.
    pub fn with_module(mut self, url: &str, delay_ms: u64, module: &str) -> Self {
        self.responses.insert(
            url.to_string(),
            (
                Duration::from_millis(delay_ms),
                Response::Publish(module.to_string()),
            ),
        );
        self
    }

    /// `url` runs after `delay_ms` without publishing its export.
    pub fn with_missing_export(mut self, url: &str, delay_ms: u64) -> Self {
        self.responses.insert(
            url.to_string(),
            (Duration::from_millis(delay_ms), Response::Nothing),
        );
        self
    }

    /// `url` fails with `status` after `delay_ms`.
    pub fn with_failure(mut self, url: &str, delay_ms: u64, status: u16) -> Self {
        self.responses.insert(
            url.to_string(),
            (Duration::from_millis(delay_ms), Response::Fail(status)),
        );
        self
    }

    /// The first `failures` fetches of `url` fail with a 503 before its configured response.
    pub fn with_failures_first(mut self, url: &str, failures: usize) -> Self {
        self.failures_first.insert(url.to_string(), failures);
        self
    }

    /// How many times `url` has been fetched.
    pub fn calls(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .copied()
            .unwrap_or_default()
    }

    /// The globals passed to every fetch so far, in order.
    pub fn seen_globals(&self) -> Vec<Globals> {
        self.seen_globals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait::async_trait]
impl LoaderBackend for MockBackend {
    type Module = String;

    async fn fetch(
        &self,
        url: &str,
        _registration_key: &str,
        globals: &Globals,
    ) -> ExtmodResult<Option<String>> {
        let attempt = {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            let count = calls.entry(url.to_string()).or_default();
            *count += 1;
            *count
        };
        self.seen_globals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(globals.clone());

        let (delay, mut response) = self
            .responses
            .get(url)
            .cloned()
            .unwrap_or((Duration::ZERO, Response::Fail(404)));
        if attempt <= self.failures_first.get(url).copied().unwrap_or_default() {
            response = Response::Fail(503);
        }

        tokio::time::sleep(delay).await;

        match response {
            Response::Publish(module) => Ok(Some(module)),
            Response::Nothing => Ok(None),
            Response::Fail(status) => Err(ExtmodError::UnexpectedStatus {
                url: url.to_string(),
                status,
            }),
        }
    }
}
