//! Agent error types.

use chauffeur_protocol::ProtocolError;
use thiserror::Error;

/// Errors raised while applying server updates or deciding on orders.
///
/// Every variant is recoverable at the message-handling boundary: the
/// offending message is logged and discarded, and the loop moves on.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("unknown player `{0}` in update")]
    UnknownPlayer(String),

    #[error("unknown passenger `{0}` in update")]
    UnknownPassenger(String),

    #[error("unknown company `{0}` in update")]
    UnknownCompany(String),

    #[error("update for passenger `{0}` is missing its `{1}` field")]
    MissingUpdateField(String, &'static str),

    #[error("malformed map snapshot: {0}")]
    MalformedMap(String),

    #[error("no eligible passenger to pick up")]
    NoEligiblePassenger,

    #[error("passenger `{0}` is not waiting at any lobby")]
    NotWaiting(String),

    #[error("passenger `{0}` has no destination")]
    MissingDestination(String),

    #[error("no carried passenger for a drop-off event")]
    NoCarriedPassenger,

    #[error("no conflict-free company to deliver to")]
    NoSafeCompany,

    #[error("no coffee store on the map")]
    NoCoffeeStore,

    #[error("not connected to the server")]
    Disconnected,

    #[error("transport failure: {0}")]
    Transport(String),
}
