//! Resilient dispatcher connections for gate and game endpoints
//!
//! [`ConnectionManager`] keeps one connection to a dispatcher alive,
//! reconnecting in the background and handing inbound packets to a
//! [`DispatcherDelegate`]. [`TcpConnector`] is the production transport.

pub mod config;
pub mod connection;
pub mod manager;
pub mod retry;
pub mod slot;

pub use config::{ClientConfig, ConfigHandle, ConfigLoader, DispatcherEntry, TransportConfig};
pub use connection::{
    CallbackDelegate, ConnectionFactory, DispatcherConnection, DispatcherDelegate, TcpConnection,
    TcpConnector,
};
pub use manager::{ConnectionManager, ManagerOptions};
pub use retry::{RetryPolicy, LOOP_DELAY_ON_DISPATCHER_ERROR};
pub use slot::ConnectionSlot;
