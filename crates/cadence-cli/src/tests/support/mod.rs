//! Test support: a scriptable fake bridge and fixed configuration.

mod fake_bridge;

use std::ffi::OsString;
use std::time::Duration;

use cadence_config::Config;

use crate::{AppError, ClientSettings, ConfigLoader};

pub(in crate::tests) use fake_bridge::{FakeBridge, Reply};

/// A config loader that returns a fixed configuration.
pub(in crate::tests) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(in crate::tests) fn for_port(port: u16) -> Self {
        Self {
            config: Config {
                host: String::from("127.0.0.1"),
                port,
                connect_attempts: Some(2),
                retry_delay_ms: Some(20),
                ..Config::default()
            },
        }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Client settings with short deadlines and a small retry budget.
pub(in crate::tests) fn quick_settings() -> ClientSettings {
    ClientSettings {
        connect_attempts: 3,
        retry_delay: Duration::from_millis(100),
        connect_timeout: Duration::from_secs(1),
        receive_timeout: Duration::from_secs(2),
        mutating_timeout: Duration::from_secs(3),
        probe_command: String::from("get_session_info"),
        max_message_bytes: 64 * 1024,
    }
}
