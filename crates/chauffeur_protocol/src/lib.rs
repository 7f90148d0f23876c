//! # Chauffeur Protocol
//!
//! Wire protocol shared between the chauffeur agent and the game server.
//! Every frame on the wire is a JSON text envelope carrying a root `msg`
//! kind; inbound and outbound envelopes are closed tagged unions so that
//! adding a message kind forces every dispatch site to handle it.
//!
//! Tile paths and passenger name lists travel in a compact `;`-delimited
//! encoding (see [`codec`]) rather than as JSON arrays; the server treats
//! them as opaque strings.

pub use codec::{decode_names, decode_path, encode_names, encode_path};
pub use error::ProtocolError;
pub use message::{
    ClientMessage, MapSnapshot, PassengerPhase, PassengerSnapshot, PassengerUpdate,
    PlayerSnapshot, PlayerUpdate, PowerUpSnapshot, PowerupStatusMessage, ServerMessage,
    SetupMessage, StatusMessage, StopSnapshot,
};
pub use types::{CardAction, CardKind, GameEvent, Tile};

pub mod codec;
pub mod error;
pub mod message;
pub mod types;
