use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{backend::GlobalScope, ExtmodError, ExtmodResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The document an [`HttpBackend`][crate::backend::HttpBackend] fetches and executes.
///
/// ```json
/// {
///   "requires": ["__hello_globals__"],
///   "publish": { "__hello__": { "greeting": "Hello, world" } }
/// }
/// ```
///
/// Executing a bundle checks that everything in `requires` is bound in the scope, then binds every
/// entry of `publish`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    /// Globals that must be seeded before the bundle can run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,

    /// Bindings the bundle writes into the scope.
    #[serde(default)]
    pub publish: Map<String, Value>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Bundle {
    /// Parses a bundle fetched from `url`.
    pub fn from_slice(url: &str, bytes: &[u8]) -> ExtmodResult<Self> {
        serde_json::from_slice(bytes).map_err(|source| ExtmodError::InvalidBundle {
            url: url.to_string(),
            source,
        })
    }

    /// Runs the bundle against `scope`.
    ///
    /// Nothing is published when a requirement is missing.
    pub fn execute(self, url: &str, scope: &GlobalScope) -> ExtmodResult<()> {
        self.apply(url, &mut scope.write())
    }

    /// Runs the bundle against an already locked set of bindings.
    pub(crate) fn apply(self, url: &str, bindings: &mut Map<String, Value>) -> ExtmodResult<()> {
        if let Some(name) = self.requires.iter().find(|name| !bindings.contains_key(*name)) {
            return Err(ExtmodError::MissingGlobal {
                url: url.to_string(),
                name: name.clone(),
            });
        }

        bindings.extend(self.publish);
        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
