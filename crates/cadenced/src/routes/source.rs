//! Backing sources for reloadable route tables.

use std::fs;
use std::sync::Arc;
use std::time::SystemTime;

use camino::Utf8PathBuf;

use super::catalog::HandlerCatalog;
use super::errors::RouteError;
use super::manifest::RouteManifest;
use super::table::RouteTable;

/// Something a route table can be (re)built from.
pub trait RouteSource: Send + Sync {
    /// Last modification time of the backing definition.
    ///
    /// # Errors
    ///
    /// Returns an error when the definition cannot be inspected.
    fn modified(&self) -> Result<SystemTime, RouteError>;

    /// Builds a fresh table from the current definition.
    ///
    /// # Errors
    ///
    /// Returns an error when the definition cannot be read or bound.
    fn load(&self) -> Result<RouteTable, RouteError>;

    /// Human-readable location used in log events.
    fn describe(&self) -> String;
}

/// Route manifest on disk bound against a handler catalog.
#[derive(Debug, Clone)]
pub struct FileRouteSource {
    path: Utf8PathBuf,
    catalog: Arc<HandlerCatalog>,
}

impl FileRouteSource {
    /// Creates a source reading `path`.
    pub fn new(path: impl Into<Utf8PathBuf>, catalog: Arc<HandlerCatalog>) -> Self {
        Self {
            path: path.into(),
            catalog,
        }
    }

    fn read_error(&self, source: std::io::Error) -> RouteError {
        RouteError::Read {
            path: self.path.to_string(),
            source,
        }
    }
}

impl RouteSource for FileRouteSource {
    fn modified(&self) -> Result<SystemTime, RouteError> {
        fs::metadata(&self.path)
            .and_then(|metadata| metadata.modified())
            .map_err(|source| self.read_error(source))
    }

    fn load(&self) -> Result<RouteTable, RouteError> {
        let text = fs::read_to_string(&self.path).map_err(|source| self.read_error(source))?;
        let manifest = RouteManifest::parse(&text)?;
        self.catalog.bind(&manifest)
    }

    fn describe(&self) -> String {
        self.path.to_string()
    }
}
