//! Data-access and synchronization services.
//!
//! - [`config`] - environment-resolved gateway and backend configuration
//! - [`schema`] - per-table schema registry and local/remote column mapping
//! - [`gateway`] - HTTP client for the remote SQL gateway
//! - [`remote`] - per-table CRUD shim over the gateway (dynamic, schema-validated SQL)
//! - [`store`] - the shared record-store interface and its adapters
//! - [`sync`] - multi-table reconciliation between the two stores

pub mod config;
pub mod gateway;
pub mod remote;
pub mod schema;
pub mod store;
pub mod sync;
