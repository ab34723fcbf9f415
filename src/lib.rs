pub mod auth;
pub mod config;
pub mod error;
pub mod graph;
pub mod providers;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{AuthError, Result};
pub use types::{AuthorizationRequest, DriveItem, TokenSet, TokenSource};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
