use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use serde_json::{Map, Value};

use crate::{backend::Bundle, ExtmodError, ExtmodResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Named values bound in the execution environment before a module runs.
pub type Globals = Map<String, Value>;

/// The host namespace that module bundles run against.
///
/// Seeded globals and the bindings a bundle publishes end up in the same namespace, the way a
/// script sees and writes its page's global object. Clones share the namespace.
#[derive(Debug, Clone, Default)]
pub struct GlobalScope {
    bindings: Arc<RwLock<Map<String, Value>>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl GlobalScope {
    /// Creates an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds every entry of `globals`, overwriting existing bindings with the same name.
    pub fn seed(&self, globals: &Globals) {
        if globals.is_empty() {
            return;
        }

        let mut bindings = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
        for (name, value) in globals {
            bindings.insert(name.clone(), value.clone());
        }
    }

    /// Binds a single value.
    pub fn publish(&self, name: impl Into<String>, value: Value) {
        self.bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value);
    }

    /// Returns the value bound to `name`. A `null` binding counts as unbound.
    pub fn get(&self, name: &str) -> Option<Value> {
        bound(&self.bindings.read().unwrap_or_else(PoisonError::into_inner), name)
    }

    /// Runs `bundle` and returns what is then bound to `registration_key`.
    ///
    /// The scope stays write-locked from the requirement check to the read-back, so a bundle
    /// running concurrently cannot overwrite the key in between.
    pub fn run(
        &self,
        url: &str,
        bundle: Bundle,
        registration_key: &str,
    ) -> ExtmodResult<Option<Value>> {
        let mut bindings = self.write();
        bundle.apply(url, &mut bindings)?;
        Ok(bound(&bindings, registration_key))
    }

    /// Whether `name` is bound, including bindings to `null`.
    pub fn contains(&self, name: &str) -> bool {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Map<String, Value>> {
        self.bindings.write().unwrap_or_else(PoisonError::into_inner)
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

fn bound(bindings: &Map<String, Value>, name: &str) -> Option<Value> {
    bindings.get(name).filter(|value| !value.is_null()).cloned()
}

/// Parses a `NAME=VALUE` global binding.
///
/// `VALUE` is read as JSON when it parses as JSON and as a plain string otherwise, so both
/// `theme="dark"` and `theme=dark` bind the string `dark`.
pub fn parse_global(binding: &str) -> ExtmodResult<(String, Value)> {
    let (name, raw) = binding
        .split_once('=')
        .ok_or_else(|| ExtmodError::InvalidGlobal(format!("expected NAME=VALUE, got `{binding}`")))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(ExtmodError::InvalidGlobal(format!(
            "missing name in `{binding}`"
        )));
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((name.to_string(), value))
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
