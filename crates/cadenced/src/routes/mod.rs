//! Command routing and hot reload.
//!
//! A [`RouteTable`] maps command names to compiled handlers and their thread
//! affinity. Tables are immutable; the [`RoutingTable`] implementation swaps a
//! whole new table in when its backing manifest changes, so a request keeps
//! using the snapshot it captured even if a reload happens mid-flight.

mod catalog;
mod errors;
mod handler;
mod manifest;
mod reload;
mod source;
mod table;

pub use catalog::HandlerCatalog;
pub use errors::RouteError;
pub use handler::{CommandError, CommandHandler, handler};
pub use manifest::{RouteEntry, RouteManifest};
pub use reload::{HotRoutes, ReloadOutcome, RoutingTable, StaticRoutes};
pub use source::{FileRouteSource, RouteSource};
pub use table::{Route, RouteTable};

pub(crate) const ROUTES_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::routes");
