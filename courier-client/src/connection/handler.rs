//! Delegate trait for inbound dispatcher events

use bytes::Bytes;
use courier_protocol::MsgType;

/// Receives everything the serve task reads from the dispatcher.
///
/// Both callbacks run synchronously on the serve task, so a slow delegate
/// delays the next receive.
pub trait DispatcherDelegate: Send + Sync + 'static {
    /// Called for every packet, in receive order
    fn on_packet(&self, msg_type: MsgType, payload: Bytes);

    /// Called once per lost connection, before reconnecting
    fn on_disconnect(&self);
}

/// Simple callback-based delegate
pub struct CallbackDelegate<P, D>
where
    P: Fn(MsgType, Bytes) + Send + Sync + 'static,
    D: Fn() + Send + Sync + 'static,
{
    on_packet: P,
    on_disconnect: D,
}

impl<P, D> CallbackDelegate<P, D>
where
    P: Fn(MsgType, Bytes) + Send + Sync + 'static,
    D: Fn() + Send + Sync + 'static,
{
    pub fn new(on_packet: P, on_disconnect: D) -> Self {
        Self {
            on_packet,
            on_disconnect,
        }
    }
}

impl<P, D> DispatcherDelegate for CallbackDelegate<P, D>
where
    P: Fn(MsgType, Bytes) + Send + Sync + 'static,
    D: Fn() + Send + Sync + 'static,
{
    fn on_packet(&self, msg_type: MsgType, payload: Bytes) {
        (self.on_packet)(msg_type, payload);
    }

    fn on_disconnect(&self) {
        (self.on_disconnect)();
    }
}
