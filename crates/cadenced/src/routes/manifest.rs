//! JSON route manifests.
//!
//! ```json
//! {"commands":[{"name":"set_tempo","handler":"set_tempo","main_thread":true}]}
//! ```
//!
//! `handler` defaults to the command name and `main_thread` to `false`.

use serde::{Deserialize, Serialize};

use super::errors::RouteError;

const DEFAULT_MANIFEST: &str = include_str!("default_routes.json");

/// Declarative list of routed commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RouteManifest {
    /// Routed commands.
    pub commands: Vec<RouteEntry>,
}

/// One routed command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RouteEntry {
    /// Command name as it appears on the wire.
    pub name: String,
    /// Catalog handler serving the command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    /// Whether the handler must run on the host thread.
    #[serde(default)]
    pub main_thread: bool,
}

impl RouteEntry {
    /// Handler name, falling back to the command name.
    #[must_use]
    pub fn handler_name(&self) -> &str {
        self.handler.as_deref().unwrap_or(&self.name)
    }
}

impl RouteManifest {
    /// Parses a manifest from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::Manifest`] when the text is not a manifest.
    pub fn parse(text: &str) -> Result<Self, RouteError> {
        serde_json::from_str(text).map_err(|source| RouteError::Manifest { source })
    }

    /// Manifest compiled into the daemon.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::Manifest`] if the embedded manifest is invalid.
    pub fn embedded() -> Result<Self, RouteError> {
        Self::parse(DEFAULT_MANIFEST)
    }
}
