//! HTTPS update server library.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod pki;

pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use pki::Issuer;
