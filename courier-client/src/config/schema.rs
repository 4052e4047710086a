//! Configuration schema structs

use std::time::Duration;

use serde::{Deserialize, Serialize};

use courier_protocol::DispatcherId;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Known dispatchers, keyed by `id`
    #[serde(rename = "dispatcher")]
    pub dispatchers: Vec<DispatcherEntry>,
    pub transport: TransportConfig,
}

impl ClientConfig {
    /// Look up the address entry for a dispatcher
    pub fn dispatcher(&self, id: DispatcherId) -> Option<&DispatcherEntry> {
        self.dispatchers.iter().find(|d| d.id == id)
    }
}

/// Address of one dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherEntry {
    pub id: DispatcherId,
    pub host: String,
    pub port: u16,
}

impl DispatcherEntry {
    pub fn new(id: DispatcherId, host: impl Into<String>, port: u16) -> Self {
        Self {
            id,
            host: host.into(),
            port,
        }
    }
}

/// Socket and queue settings applied to every dispatcher connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// SO_RCVBUF in bytes
    pub read_buffer_size: u32,
    /// SO_SNDBUF in bytes
    pub write_buffer_size: u32,
    /// How long a single receive waits before reporting a timeout
    pub recv_timeout_ms: u64,
    /// Outbound packets buffered per connection before sends are rejected
    pub send_queue_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: 1024 * 1024,
            write_buffer_size: 1024 * 1024,
            recv_timeout_ms: 1000,
            send_queue_capacity: 4096,
        }
    }
}

impl TransportConfig {
    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }
}
