//! # Gradebook Config
//!
//! Configuration types for the Gradebook API, loaded from environment variables:
//!
//! - [`jwt`]: JWT authentication configuration
//! - [`cors`]: CORS (Cross-Origin Resource Sharing) configuration
//! - [`import`]: Spreadsheet import limits and progress reporting
//!
//! # Example
//!
//! ```ignore
//! use gradebook_config::{CorsConfig, ImportConfig, JwtConfig};
//!
//! let jwt_config = JwtConfig::from_env();
//! let cors_config = CorsConfig::from_env();
//! let import_config = ImportConfig::from_env();
//! ```

pub mod cors;
pub mod import;
pub mod jwt;

pub use cors::CorsConfig;
pub use import::ImportConfig;
pub use jwt::JwtConfig;

/// Reads an environment variable and parses it, falling back to `default`
/// when the variable is missing or malformed.
pub(crate) fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
