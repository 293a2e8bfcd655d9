//! Dispatcher options.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, ConfigurationResult};

/// Options fixed when a [`Dispatcher`](crate::Dispatcher) is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherOptions {
    /// Name of the input field holding a routable path.
    ///
    /// Without it, mount paths given at registration are ignored and every
    /// entry is matched on its conditions alone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_property: Option<String>,
}

impl DispatcherOptions {
    /// Creates options with path mounting disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables path mounting on the given input field.
    pub fn path_property(mut self, name: impl Into<String>) -> Self {
        self.path_property = Some(name.into());
        self
    }

    /// Checks the options for misuse.
    pub fn validate(&self) -> ConfigurationResult<()> {
        match self.path_property.as_deref() {
            Some("") => Err(ConfigurationError::EmptyPathProperty),
            _ => Ok(()),
        }
    }
}
