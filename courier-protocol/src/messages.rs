//! Packet and handshake definitions

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::codec::CodecError;

/// Identity of a dispatcher peer
pub type DispatcherId = u16;

/// Numeric message type carried in every frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MsgType(pub u16);

impl MsgType {
    /// Gate-side identification sent right after connecting
    pub const SET_GATE_ID: MsgType = MsgType(1);
    /// Game-side identification sent right after connecting
    pub const SET_GAME_ID: MsgType = MsgType(2);

    /// First message type available to applications
    pub const FIRST_APPLICATION: MsgType = MsgType(1000);
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single framed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub msg_type: MsgType,
    pub payload: Bytes,
}

impl Packet {
    pub fn new(msg_type: MsgType, payload: impl Into<Bytes>) -> Self {
        Self {
            msg_type,
            payload: payload.into(),
        }
    }
}

/// Role of the endpoint that owns a dispatcher connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientKind {
    Gate,
    Game,
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientKind::Gate => write!(f, "gate"),
            ClientKind::Game => write!(f, "game"),
        }
    }
}

/// Identification message sent immediately after every successful dial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handshake {
    SetGateId {
        gate_id: u16,
    },
    SetGameId {
        game_id: u16,
        /// False only for the very first connect of this process
        is_reconnect: bool,
        /// Whether the game is restoring a previously frozen state
        is_restore: bool,
    },
}

#[derive(Serialize, Deserialize)]
struct SetGateIdBody {
    gate_id: u16,
}

#[derive(Serialize, Deserialize)]
struct SetGameIdBody {
    game_id: u16,
    is_reconnect: bool,
    is_restore: bool,
}

impl Handshake {
    /// Build the handshake a given endpoint role sends
    pub fn for_kind(kind: ClientKind, local_id: u16, is_reconnect: bool, is_restore: bool) -> Self {
        match kind {
            ClientKind::Game => Handshake::SetGameId {
                game_id: local_id,
                is_reconnect,
                is_restore,
            },
            ClientKind::Gate => Handshake::SetGateId { gate_id: local_id },
        }
    }

    pub fn msg_type(&self) -> MsgType {
        match self {
            Handshake::SetGateId { .. } => MsgType::SET_GATE_ID,
            Handshake::SetGameId { .. } => MsgType::SET_GAME_ID,
        }
    }

    pub fn to_packet(&self) -> Result<Packet, CodecError> {
        let payload = match *self {
            Handshake::SetGateId { gate_id } => bincode::serialize(&SetGateIdBody { gate_id })?,
            Handshake::SetGameId {
                game_id,
                is_reconnect,
                is_restore,
            } => bincode::serialize(&SetGameIdBody {
                game_id,
                is_reconnect,
                is_restore,
            })?,
        };
        Ok(Packet::new(self.msg_type(), payload))
    }

    /// Decode a handshake packet; `Ok(None)` if the packet is not a handshake
    pub fn from_packet(packet: &Packet) -> Result<Option<Self>, CodecError> {
        match packet.msg_type {
            MsgType::SET_GATE_ID => {
                let body: SetGateIdBody = bincode::deserialize(&packet.payload)?;
                Ok(Some(Handshake::SetGateId {
                    gate_id: body.gate_id,
                }))
            }
            MsgType::SET_GAME_ID => {
                let body: SetGameIdBody = bincode::deserialize(&packet.payload)?;
                Ok(Some(Handshake::SetGameId {
                    game_id: body.game_id,
                    is_reconnect: body.is_reconnect,
                    is_restore: body.is_restore,
                }))
            }
            _ => Ok(None),
        }
    }
}
