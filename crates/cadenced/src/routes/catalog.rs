//! Registry of compiled handlers.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::collections::HashSet;

use super::errors::RouteError;
use super::handler::CommandHandler;
use super::manifest::RouteManifest;
use super::table::{Route, RouteTable};

/// Handlers available to route manifests, keyed by handler name.
#[derive(Default)]
pub struct HandlerCatalog {
    handlers: HashMap<String, CommandHandler>,
}

impl HandlerCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::DuplicateHandler`] when `name` is taken.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: CommandHandler,
    ) -> Result<(), RouteError> {
        match self.handlers.entry(name.into()) {
            Entry::Occupied(entry) => Err(RouteError::DuplicateHandler {
                name: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(handler);
                Ok(())
            }
        }
    }

    /// Returns `true` when a handler named `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Builds a route table from a manifest.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::UnknownHandler`] when an entry names a handler
    /// that is not registered, or [`RouteError::DuplicateCommand`] when a
    /// command appears twice.
    pub fn bind(&self, manifest: &RouteManifest) -> Result<RouteTable, RouteError> {
        let mut seen = HashSet::new();
        let mut routes = Vec::with_capacity(manifest.commands.len());
        for entry in &manifest.commands {
            if !seen.insert(entry.name.as_str()) {
                return Err(RouteError::DuplicateCommand {
                    name: entry.name.clone(),
                });
            }
            let handler_name = entry.handler_name();
            let handler =
                self.handlers
                    .get(handler_name)
                    .ok_or_else(|| RouteError::UnknownHandler {
                        command: entry.name.clone(),
                        handler: handler_name.to_owned(),
                    })?;
            routes.push(Route::new(
                entry.name.clone(),
                handler.clone(),
                entry.main_thread,
            ));
        }
        Ok(RouteTable::from_routes(routes))
    }
}

impl std::fmt::Debug for HandlerCatalog {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort_unstable();
        formatter
            .debug_struct("HandlerCatalog")
            .field("handlers", &names)
            .finish()
    }
}
