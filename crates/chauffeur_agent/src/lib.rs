//! # Chauffeur Agent
//!
//! The core of an autonomous player for a multiplayer tile-based
//! limo-transport game. The agent mirrors the server's world state in an
//! in-memory entity arena, reacts to game events with movement and pick-up
//! orders, and draws/plays power-up cards.
//!
//! Layout:
//!
//! * [`world`] - the entity repository: players, companies, coffee stores,
//!   passengers, the map, and the power-up flyweight cache. Mutated only by
//!   the message-handling routines.
//! * [`path`] - the tile-grid path planner, a pure function over the map.
//! * [`brain`] - the decision engine, fed by the connection manager through
//!   a narrow [`brain::OrderSink`] interface.
//! * [`connection`] - the connection manager: WebSocket session lifecycle,
//!   message dispatch behind a non-blocking guard, reconnect with backoff.
//!
//! Exactly one status message is processed at a time; a message arriving
//! while the previous one is still being handled is dropped, not queued.
//! The next server update re-synchronizes whatever was missed.

pub use error::AgentError;

pub mod brain;
pub mod connection;
pub mod error;
pub mod path;
pub mod world;
