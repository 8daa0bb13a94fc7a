//! Test suites for the Cadence daemon.

mod process_behaviour;
mod socket_behaviour;
mod support;
