//! Packet codec for dispatcher framing
//!
//! Frame layout: `u32` big-endian length of the remainder, `u16` big-endian
//! message type, then the payload.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::messages::{MsgType, Packet};

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

const LEN_SIZE: usize = 4;
const MSG_TYPE_SIZE: usize = 2;

/// Protocol codec error
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Frame of {len} bytes is shorter than the message type header")]
    FrameTooShort { len: usize },
}

/// Codec for [`Packet`] frames, used in both directions
#[derive(Debug, Default)]
pub struct PacketCodec;

impl PacketCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for PacketCodec {
    type Item = Packet;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LEN_SIZE {
            return Ok(None);
        }

        // Peek at length without consuming
        let len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

        if len < MSG_TYPE_SIZE {
            return Err(CodecError::FrameTooShort { len });
        }
        if len - MSG_TYPE_SIZE > MAX_PAYLOAD_SIZE {
            return Err(CodecError::MessageTooLarge {
                size: len - MSG_TYPE_SIZE,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        if src.len() < LEN_SIZE + len {
            src.reserve(LEN_SIZE + len - src.len());
            return Ok(None);
        }

        src.advance(LEN_SIZE);
        let msg_type = MsgType(src.get_u16());
        let payload = src.split_to(len - MSG_TYPE_SIZE).freeze();

        Ok(Some(Packet { msg_type, payload }))
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(CodecError::MessageTooLarge {
                size: item.payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        dst.reserve(LEN_SIZE + MSG_TYPE_SIZE + item.payload.len());
        dst.put_u32((MSG_TYPE_SIZE + item.payload.len()) as u32);
        dst.put_u16(item.msg_type.0);
        dst.put_slice(&item.payload);
        Ok(())
    }
}
