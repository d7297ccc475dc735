// lacrosse-api: Async client and page parser for the La Crosse Alerts web portal

pub mod auth;
pub mod client;
pub mod error;
mod login;
pub mod models;
pub mod parser;
pub mod transport;

pub use auth::{Credentials, LoginDiscovery};
pub use client::PortalClient;
pub use error::Error;
pub use models::{RawDevice, RawObservation, StatusPage};
pub use transport::TransportConfig;
