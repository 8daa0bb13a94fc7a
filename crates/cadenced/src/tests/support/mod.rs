//! Shared harness for the daemon behaviour suites.

mod client;
mod config_loader;
mod harness;
mod reporter;

pub use client::{RawClient, Reply};
pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use harness::{CommandProbe, ServerHarness};
pub use reporter::{HealthEvent, RecordingHealthReporter};
