//! courier-protocol: Wire definitions for dispatcher connections
//!
//! This crate defines the packet, message-type and handshake types
//! exchanged with a dispatcher, plus the length-prefixed frame codec.

pub mod codec;
pub mod messages;

// Re-export main types at crate root
pub use codec::{CodecError, PacketCodec, MAX_PAYLOAD_SIZE};
pub use messages::{ClientKind, DispatcherId, Handshake, MsgType, Packet};
