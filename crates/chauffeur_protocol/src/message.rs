//! Message envelopes exchanged with the game server.
//!
//! Inbound frames are decoded in two steps: the root `msg` kind is read
//! first, then the payload is deserialized into the matching typed message.
//! Kinds the agent does not know decode to [`ServerMessage::Unknown`] so the
//! dispatch layer can log and discard them without failing the whole frame.

use crate::error::ProtocolError;
use crate::types::{CardAction, CardKind, GameEvent};
use serde::{Deserialize, Serialize};

/// Every message the server can send.
#[derive(Debug, Clone)]
pub enum ServerMessage {
    /// One-time full-state load at the start of a game (and after every
    /// reconnect).
    Setup(SetupMessage),
    /// A game-event notification with updated entity snapshots.
    Status(StatusMessage),
    /// The result of a power-up play or draw.
    PowerupStatus(PowerupStatusMessage),
    /// Terminate the process immediately.
    Exit,
    /// A kind this agent does not understand; logged and discarded.
    Unknown { kind: String },
}

impl ServerMessage {
    /// Decode a raw text frame by its root `msg` kind.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let kind = value
            .get("msg")
            .and_then(|v| v.as_str())
            .ok_or(ProtocolError::MissingKind)?;
        match kind {
            "setup" => Ok(Self::Setup(serde_json::from_value(value)?)),
            "status" => Ok(Self::Status(serde_json::from_value(value)?)),
            "powerup-status" => Ok(Self::PowerupStatus(serde_json::from_value(value)?)),
            "exit" => Ok(Self::Exit),
            other => Ok(Self::Unknown {
                kind: other.to_string(),
            }),
        }
    }
}

/// Full-state snapshot identifying this agent's own player by `my-guid`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SetupMessage {
    pub my_guid: String,
    pub map: MapSnapshot,
    pub players: Vec<PlayerSnapshot>,
    pub companies: Vec<StopSnapshot>,
    pub stores: Vec<StopSnapshot>,
    pub passengers: Vec<PassengerSnapshot>,
    /// The power-up deck this player can draw from.
    #[serde(default)]
    pub powerups: Vec<PowerUpSnapshot>,
}

/// The walkable tile grid. Rows are strings of one character per tile;
/// `#` marks a blocked tile, every other character is drivable.
#[derive(Debug, Clone, Deserialize)]
pub struct MapSnapshot {
    pub width: usize,
    pub height: usize,
    pub rows: Vec<String>,
}

/// A player as first announced during setup.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlayerSnapshot {
    pub guid: String,
    pub name: String,
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub language: String,
    pub limo_x: i32,
    pub limo_y: i32,
    #[serde(default)]
    pub limo_angle: i32,
}

/// A company or coffee store: a named fixed bus stop.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StopSnapshot {
    pub name: String,
    pub bus_stop_x: i32,
    pub bus_stop_y: i32,
}

/// A passenger as first announced during setup.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PassengerSnapshot {
    pub name: String,
    pub points_delivered: u32,
    /// Company whose lobby the passenger waits in, if any.
    pub lobby: Option<String>,
    /// Company the passenger wants to reach next, if any.
    pub destination: Option<String>,
    /// Remaining destinations after `destination`, in order.
    #[serde(default)]
    pub route: Vec<String>,
    /// Passengers this one refuses to share a bus stop with.
    #[serde(default)]
    pub enemies: Vec<String>,
}

/// A power-up card reference. Identity is the card kind plus the target
/// names; `ok-to-play` is transient state.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PowerUpSnapshot {
    pub card: CardKind,
    pub company: Option<String>,
    pub passenger: Option<String>,
    pub player: Option<String>,
    #[serde(default)]
    pub ok_to_play: bool,
}

/// A game-event notification.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StatusMessage {
    pub status: GameEvent,
    /// The player the event is about; absent means it is about us.
    pub player_guid: Option<String>,
    #[serde(default)]
    pub players: Vec<PlayerUpdate>,
    #[serde(default)]
    pub passengers: Vec<PassengerUpdate>,
    /// The acting player's remaining path, `;`-delimited `x,y` pairs.
    pub path: Option<String>,
    /// The acting player's pick-up list, `;`-delimited names.
    pub pick_up: Option<String>,
}

/// Per-player fields refreshed on every status message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlayerUpdate {
    pub guid: String,
    pub score: f32,
    pub total_score: f32,
    pub cards_max: u32,
    pub coffee_servings: i32,
    pub limo_x: i32,
    pub limo_y: i32,
    #[serde(default)]
    pub limo_angle: i32,
    /// Name of the passenger aboard; absent means the limo is empty.
    pub passenger: Option<String>,
    /// Most recent delivery, announced once.
    pub last_delivered: Option<String>,
    /// Card this player will trigger at the next bus stop.
    pub next_bus_stop: Option<PowerUpSnapshot>,
    /// Card in effect for the transit under way.
    pub transit: Option<PowerUpSnapshot>,
}

/// Where a passenger is, as reported by a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassengerPhase {
    Lobby,
    Travelling,
    Done,
}

/// Per-passenger fields refreshed on every status message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PassengerUpdate {
    pub name: String,
    pub status: PassengerPhase,
    /// Company lobby the passenger waits in (`status == "lobby"`).
    pub lobby: Option<String>,
    /// Name of the player whose limo carries them (`status == "travelling"`).
    pub limo_driver: Option<String>,
    pub destination: Option<String>,
    /// Replacement route, `;`-delimited company names.
    pub route: Option<String>,
}

/// The outcome of a card action, with an optional full deck/hand resync.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PowerupStatusMessage {
    pub status: GameEvent,
    /// Who played the card; absent means it was us.
    pub played_by: Option<String>,
    pub card: PowerUpSnapshot,
    pub cards_deck: Option<Vec<PowerUpSnapshot>>,
    pub cards_hand: Option<Vec<PowerUpSnapshot>>,
}

/// Every message the agent can send.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "msg", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Session join request, sent once per (re)connection.
    Join {
        name: String,
        school: String,
        language: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        avatar: Option<String>,
    },
    /// The initial order replying to `setup`.
    Ready {
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        #[serde(rename = "pick-up", skip_serializing_if = "Option::is_none")]
        pick_up: Option<String>,
    },
    /// A movement order replying to a status event.
    Move {
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        #[serde(rename = "pick-up", skip_serializing_if = "Option::is_none")]
        pick_up: Option<String>,
    },
    /// A card action (draw, discard, or play) with its targets.
    Order {
        action: CardAction,
        card: CardKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        company: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        passenger: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        player: Option<String>,
    },
}

impl ClientMessage {
    /// Encode for the wire.
    pub fn encode(&self) -> String {
        serde_json::to_string(self).expect("client messages always serialize")
    }
}
