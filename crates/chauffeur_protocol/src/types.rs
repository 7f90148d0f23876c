//! Core wire-level types: tile coordinates and the closed enumerations for
//! game events, power-up cards, and card actions.
//!
//! The enumerations mirror the server's vocabulary exactly; serde renames
//! map the Rust variants onto the SCREAMING_SNAKE_CASE values the server
//! sends.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A tile coordinate on the game map. `(0, 0)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
}

impl Tile {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another tile.
    pub fn distance(&self, other: Tile) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Game-event kinds carried by `status` and `powerup-status` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameEvent {
    /// Periodic tick with no specific event attached.
    Update,
    /// The limo has no path to follow.
    NoPath,
    /// The passenger was abandoned, nobody was picked up.
    PassengerAbandoned,
    /// The passenger was delivered, nobody was picked up.
    PassengerDelivered,
    /// The passenger was delivered or abandoned and a new one boarded.
    PassengerDeliveredAndPickedUp,
    /// The passenger refused to exit because an enemy waits at the stop.
    PassengerRefusedEnemy,
    /// A passenger boarded; there was nobody to deliver first.
    PassengerPickedUp,
    /// The limo stopped at a bus stop and nothing happened.
    PassengerNoAction,
    /// The coffee store would not restock (a passenger is aboard).
    CoffeeStoreNoStockUp,
    /// The coffee store restocked the limo.
    CoffeeStoreCarRestocked,
    /// The passenger refused to board for lack of coffee.
    PassengerRefusedNoCoffee,
    /// Delivered or abandoned, and the new passenger refused to board for
    /// lack of coffee.
    PassengerDeliveredAndPickUpRefused,
    /// A draw was refused; the hand is already full.
    PowerUpDrawTooMany,
    /// A play was requested for a card not in hand.
    PowerUpPlayNotExist,
    /// A play was requested for a card that has not matured yet.
    PowerUpPlayNotReady,
    /// The card cannot legally be played right now.
    PowerUpIllegalToPlay,
    /// The power-up was played.
    PowerUpPlayed,
    /// Too many cards in hand; the server discarded the excess.
    PowerUpHandTooMany,
}

/// The specific power of a power-up card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardKind {
    /// Move a passenger not in a limo to a random bus stop.
    MovePassenger,
    /// Change the destination of a passenger in an opponent's limo.
    ChangeDestination,
    /// 1.5x delivery points, but the limo drops to quarter speed.
    MultDeliveryQuarterSpeed,
    /// All other limos drop to quarter speed for a while.
    AllOtherCarsQuarterSpeed,
    /// Stop a specific limo in its tracks for a while.
    StopCar,
    /// Relocate every limo (including ours) to a random location.
    RelocateAllCars,
    /// Relocate every waiting passenger to a random stop.
    RelocateAllPassengers,
    /// Bonus multiplier for delivering a specific passenger.
    MultDeliveringPassenger,
    /// Bonus multiplier for delivering at a specific company.
    MultDeliverAtCompany,
}

/// Actions the agent can request against its card deck and hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardAction {
    Draw,
    Discard,
    Play,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kinds_use_server_vocabulary() {
        let json = serde_json::to_string(&GameEvent::PassengerDeliveredAndPickUpRefused)
            .expect("serialize event");
        assert_eq!(json, "\"PASSENGER_DELIVERED_AND_PICK_UP_REFUSED\"");

        let event: GameEvent =
            serde_json::from_str("\"COFFEE_STORE_CAR_RESTOCKED\"").expect("deserialize event");
        assert_eq!(event, GameEvent::CoffeeStoreCarRestocked);
    }

    #[test]
    fn card_kinds_round_trip() {
        for kind in [
            CardKind::MovePassenger,
            CardKind::ChangeDestination,
            CardKind::MultDeliveryQuarterSpeed,
            CardKind::AllOtherCarsQuarterSpeed,
            CardKind::StopCar,
            CardKind::RelocateAllCars,
            CardKind::RelocateAllPassengers,
            CardKind::MultDeliveringPassenger,
            CardKind::MultDeliverAtCompany,
        ] {
            let json = serde_json::to_string(&kind).expect("serialize card kind");
            let back: CardKind = serde_json::from_str(&json).expect("deserialize card kind");
            assert_eq!(kind, back);
        }
    }

    #[test]
    fn tile_distance_is_manhattan() {
        assert_eq!(Tile::new(1, 2).distance(Tile::new(4, 0)), 5);
        assert_eq!(Tile::new(3, 3).distance(Tile::new(3, 3)), 0);
    }
}
