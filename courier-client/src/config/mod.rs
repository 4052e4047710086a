//! Configuration management for courier clients
//!
//! Dispatcher addresses and transport settings are read from TOML and shared
//! through an ArcSwap handle, so a reload takes effect on the next dial
//! without coordinating with the connection tasks.

mod defaults;
mod loader;
mod schema;

pub use defaults::DEFAULT_CONFIG_TOML;
pub use loader::ConfigLoader;
pub use schema::*;

use arc_swap::ArcSwap;
use std::sync::Arc;

/// Shared configuration handle
pub type ConfigHandle = Arc<ArcSwap<ClientConfig>>;

/// Create a new config handle holding `config`
pub fn new_config_handle(config: ClientConfig) -> ConfigHandle {
    Arc::new(ArcSwap::from_pointee(config))
}
