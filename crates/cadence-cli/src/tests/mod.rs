//! Test suites for the Cadence CLI and bridge client.

mod support;
