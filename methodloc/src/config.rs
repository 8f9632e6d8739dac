//! Callback configuration
//!
//! Maps lifecycle callback names to method descriptors in preference order.
//! The defaults mirror the usual component-framework signatures; a TOML file
//! can replace individual callbacks or add new ones:
//!
//! ```toml
//! allow_private = false
//!
//! [callbacks]
//! activate = ["start(Map)", "start()"]
//! refresh = ["refresh"]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::descriptor::MethodDescriptor;
use crate::introspect::TypeHandle;
use crate::resolver::locate_by_preference;
use crate::MethodError;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unknown callback `{0}`")]
    UnknownCallback(String),

    #[error("callback `{0}` lists no method descriptors")]
    EmptyPreferences(String),

    #[error("callback `{callback}`: {source}")]
    Descriptor {
        callback: String,
        #[source]
        source: MethodError,
    },
}

/// Configuration result type.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Lifecycle callbacks and the descriptors that implement them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbackConfig {
    /// Accept private methods declared by the component type itself.
    pub allow_private: bool,

    /// Descriptor texts per callback, most preferred first.
    pub callbacks: BTreeMap<String, Vec<String>>,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        let mut callbacks = BTreeMap::new();
        callbacks.insert("activate".to_string(), context_signatures("activate", &[]));
        callbacks.insert(
            "deactivate".to_string(),
            context_signatures("deactivate", &["int", "Integer"]),
        );
        callbacks.insert("modified".to_string(), context_signatures("modified", &[]));

        Self {
            allow_private: true,
            callbacks,
        }
    }
}

/// `name(ComponentContext)`, `name(BundleContext)`, `name(Map)`, one entry
/// per extra single-argument type, then `name()`.
fn context_signatures(name: &str, extra: &[&str]) -> Vec<String> {
    ["ComponentContext", "BundleContext", "Map"]
        .iter()
        .chain(extra)
        .map(|ty| format!("{name}({ty})"))
        .chain(std::iter::once(format!("{name}()")))
        .collect()
}

/// Shape of a configuration file; absent entries keep their defaults.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    allow_private: Option<bool>,
    #[serde(default)]
    callbacks: BTreeMap<String, Vec<String>>,
}

impl CallbackConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration, layering it over the defaults.
    ///
    /// Every descriptor is validated here, so later lookups only fail for
    /// unknown callback names.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let file: ConfigFile = toml::from_str(text)?;

        let mut config = Self::default();
        if let Some(allow_private) = file.allow_private {
            config.allow_private = allow_private;
        }
        config.callbacks.extend(file.callbacks);
        config.validate()?;

        debug!(
            callbacks = config.callbacks.len(),
            allow_private = config.allow_private,
            "loaded callback configuration"
        );
        Ok(config)
    }

    /// Reads and parses a configuration file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        debug!("Reading callback configuration: {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// Checks that every callback lists at least one well-formed descriptor.
    pub fn validate(&self) -> ConfigResult<()> {
        for callback in self.callbacks.keys() {
            self.preferences(callback)?;
        }
        Ok(())
    }

    /// Parsed descriptors of a callback, most preferred first.
    pub fn preferences(&self, callback: &str) -> ConfigResult<Vec<MethodDescriptor>> {
        let texts = self
            .callbacks
            .get(callback)
            .ok_or_else(|| ConfigError::UnknownCallback(callback.to_string()))?;
        if texts.is_empty() {
            return Err(ConfigError::EmptyPreferences(callback.to_string()));
        }

        texts
            .iter()
            .map(|text| {
                MethodDescriptor::parse(text).map_err(|source| ConfigError::Descriptor {
                    callback: callback.to_string(),
                    source,
                })
            })
            .collect()
    }

    /// Locates the method implementing `callback` on `component` or one of
    /// its ancestors.
    pub fn locate_callback<T: TypeHandle>(
        &self,
        callback: &str,
        component: &T,
    ) -> ConfigResult<Option<T::Member>> {
        let descriptors = self.preferences(callback)?;
        locate_by_preference(component, self.allow_private, &descriptors).map_err(|source| {
            ConfigError::Descriptor {
                callback: callback.to_string(),
                source,
            }
        })
    }
}
