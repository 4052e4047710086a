//! Default configuration values
//!
//! Written out by `courier-probe --print-default-config`.

/// Default configuration as TOML
pub const DEFAULT_CONFIG_TOML: &str = r##"
# courier configuration

# One entry per dispatcher this endpoint may connect to.
[[dispatcher]]
id = 1
host = "127.0.0.1"
port = 13001

[transport]
read_buffer_size = 1048576
write_buffer_size = 1048576
recv_timeout_ms = 1000
send_queue_capacity = 4096
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientConfig, ConfigLoader, TransportConfig};
    use std::path::Path;

    #[test]
    fn test_default_toml_matches_defaults() {
        let config: ClientConfig =
            ConfigLoader::parse(DEFAULT_CONFIG_TOML, Path::new("default.toml")).unwrap();
        assert_eq!(config.transport, TransportConfig::default());
        assert_eq!(config.dispatchers.len(), 1);
        assert!(ConfigLoader::validate(&config).is_ok());
    }
}
