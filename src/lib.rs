// Library interface for manga_page_gateway
// The binary and the integration tests both build on these modules

pub mod app_state;
pub mod artifact;
pub mod browser;
pub mod config;
pub mod error;
pub mod http_client;
pub mod metrics;
pub mod models;
pub mod retrieval;
pub mod routes;
pub mod selector;
pub mod sources;
