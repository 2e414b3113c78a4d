//! Client core for the Hub Numérique distribution API.
//!
//! # Overview
//! Looks up ONIX notices and checks e-book availability for EAN13 codes
//! against the test or production hub. `Client` validates input and builds
//! the request; a `Connector` performs the authenticated GET and its response
//! is returned unchanged.
//!
//! # Design
//! - `Client` owns credentials, environment and transport flags; setters
//!   consume and return it.
//! - Availability lines are sent as sequentially indexed flat keys, built as
//!   an ordered `Query`.
//! - `UreqConnector` is the default transport and can be swapped for any
//!   `Connector`, which is how the tests observe outgoing requests.

pub mod client;
pub mod connector;
pub mod error;
pub mod http;
pub mod query;
pub mod types;

pub use client::Client;
pub use connector::{Connector, ConnectorOptions, UreqConnector};
pub use error::Error;
pub use http::HttpResponse;
pub use query::Query;
pub use types::{AvailabilityLine, ClientConfig, Credentials, Environment};
