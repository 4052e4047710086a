//! Transport traits used by the connection manager

use std::future::Future;

use courier_protocol::{DispatcherId, Handshake, Packet};
use courier_utils::Result;

/// A live connection to a dispatcher.
///
/// Only the manager's serve task calls `recv`. Any number of tasks may call
/// the send methods concurrently through a published handle.
pub trait DispatcherConnection: Send + Sync + 'static {
    /// False once the connection was closed locally or failed
    fn is_open(&self) -> bool;

    /// Wait for the next inbound packet.
    ///
    /// Returns an error for which `is_timeout()` holds when nothing arrived
    /// within the receive window; any other error means the connection is gone.
    fn recv(&self) -> impl Future<Output = Result<Packet>> + Send;

    /// Tear the connection down; idempotent
    fn close(&self);

    /// Queue the identification message for this endpoint
    fn send_handshake(&self, handshake: Handshake) -> Result<()>;

    /// Queue an outbound packet without waiting
    fn send_packet(&self, packet: Packet) -> Result<()>;
}

/// Dials dispatchers by id
pub trait ConnectionFactory: Send + Sync + 'static {
    type Connection: DispatcherConnection;

    fn dial(
        &self,
        dispatcher_id: DispatcherId,
    ) -> impl Future<Output = Result<Self::Connection>> + Send;
}
