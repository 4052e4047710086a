//! Dispatcher connection collaborators
//!
//! Traits the connection manager drives (factory, connection, delegate)
//! and the TCP implementation used in production.

mod handler;
mod tcp;
mod transport;

pub use handler::{CallbackDelegate, DispatcherDelegate};
pub use tcp::{TcpConnection, TcpConnector};
pub use transport::{ConnectionFactory, DispatcherConnection};
