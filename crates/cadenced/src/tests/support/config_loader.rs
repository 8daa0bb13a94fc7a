//! Configuration loaders for success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::OrthoError;

use cadence_config::{Config, OrthoConfig};

use crate::bootstrap::ConfigLoader;

/// Loader binding an ephemeral localhost port with short timings.
#[derive(Debug, Clone, Default)]
pub struct TestConfigLoader {
    routes_path: Option<Utf8PathBuf>,
}

impl TestConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Watches `path` instead of the embedded manifest.
    pub fn with_routes(path: Utf8PathBuf) -> Self {
        Self {
            routes_path: Some(path),
        }
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            host: String::from("127.0.0.1"),
            port: 0,
            routes_path: self.routes_path.clone(),
            poll_interval_ms: Some(20),
            shutdown_grace_ms: Some(500),
            main_thread_timeout_ms: Some(2_000),
            ..Config::default()
        })
    }
}

/// Loader that fails by passing an unparsable port.
#[derive(Debug, Clone, Copy)]
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("cadenced"),
            OsString::from("--port"),
            OsString::from("not-a-port"),
        ];
        Config::load_from_iter(args)
    }
}
