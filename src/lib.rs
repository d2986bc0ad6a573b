//! Intentionally vulnerable web application.
//!
//! Every route demonstrates one well-known flaw class and must stay broken.
//! Do not deploy this anywhere reachable.

pub mod db;
pub mod error;
pub mod files;
pub mod pickle;
pub mod routes;
pub mod script;
pub mod settings;
pub mod shell;
pub mod weak_crypto;
pub mod xml;

// Re-export commonly used items for tests / external users
pub use routes::{config, AppState};
pub use settings::AppConfig;
