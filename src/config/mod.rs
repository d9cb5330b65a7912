//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! env.conf beside the executable (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!
//! Missing or broken file:
//!     → warning logged
//!     → ServerConfig::default()
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup and never reloaded
//! - All fields have defaults to allow minimal configs
//! - A bad config file is never fatal

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{default_config_path, load_config, load_or_default, ConfigError};
pub use schema::{HttpServerConfig, PkiConfig, ServerConfig};
