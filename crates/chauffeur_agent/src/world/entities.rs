//! The entities mirrored from the server, addressed by arena ids.
//!
//! All cross-entity references are stored as ids into the [`World`]'s
//! arenas, never as direct references; the repository's update routines are
//! the only code that touches both sides of a bidirectional relationship.
//!
//! [`World`]: crate::world::World

use chauffeur_protocol::Tile;

/// Index into [`World::players`](crate::world::World::players).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerId(pub usize);

/// Index into [`World::companies`](crate::world::World::companies).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompanyId(pub usize);

/// Index into [`World::stores`](crate::world::World::stores).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreId(pub usize);

/// Index into [`World::passengers`](crate::world::World::passengers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassengerId(pub usize);

/// Handle to a canonical power-up instance in the flyweight cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PowerUpId(pub usize);

/// A player in the game, ourselves included. Created once during setup and
/// mutated in place on every relevant status message; never destroyed
/// during a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Server-issued identity, stable for the whole game.
    pub guid: String,
    pub name: String,
    pub school: String,
    pub language: String,
    /// Score this game.
    pub score: f32,
    /// Score across all games so far.
    pub total_score: f32,
    pub max_cards_in_hand: u32,
    pub limo: Limo,
    /// Who to pick up at the next bus stop, most recent order first.
    pub pick_up: Vec<PassengerId>,
    /// Passengers delivered this game.
    pub delivered: Vec<PassengerId>,
    /// Card this player will trigger at the next bus stop, if any.
    pub power_up_next_stop: Option<PowerUpId>,
    /// Card in effect for the transit under way, if any.
    pub power_up_transit: Option<PowerUpId>,
}

/// A player's vehicle. Carries at most one passenger.
#[derive(Debug, Clone, PartialEq)]
pub struct Limo {
    pub tile: Tile,
    /// 0..360, 0 is north, 90 is east.
    pub angle: i32,
    /// The passenger aboard. The limo does not own the passenger's
    /// lifecycle; the passenger's own location is authoritative.
    pub passenger: Option<PassengerId>,
    /// Servings left. Passengers refuse to board an empty pot.
    pub coffee_servings: i32,
    /// Mirror of the last path ordered; local bookkeeping only, the server
    /// echoes the authoritative remainder on each status.
    pub path: Vec<Tile>,
}

impl Limo {
    pub fn new(tile: Tile, angle: i32) -> Self {
        Self {
            tile,
            angle,
            passenger: None,
            coffee_servings: 0,
            path: Vec::new(),
        }
    }
}

/// A company: a named bus stop where passengers wait and are delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct Company {
    pub name: String,
    pub bus_stop: Tile,
    /// Passengers waiting in this company's lobby. Kept in lock-step with
    /// each passenger's [`PassengerLocation::Lobby`] back-reference.
    pub waiting: Vec<PassengerId>,
}

/// A coffee store: a named bus stop where limos restock. Immutable after
/// creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CoffeeStore {
    pub name: String,
    pub bus_stop: Tile,
}

/// Where a passenger currently is. A passenger is always in exactly one of
/// these states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassengerLocation {
    /// Waiting in a company's lobby.
    Lobby(CompanyId),
    /// Riding in a player's limo.
    Riding(PlayerId),
    /// Dropped off at the final destination.
    Delivered,
}

/// A passenger to be ferried between companies.
#[derive(Debug, Clone, PartialEq)]
pub struct Passenger {
    pub name: String,
    /// Points awarded for delivering this passenger.
    pub points: u32,
    pub location: PassengerLocation,
    /// The company this passenger wants to reach next. `None` once they are
    /// done for good.
    pub destination: Option<CompanyId>,
    /// Destinations after `destination`, in order, excluding it.
    pub route: Vec<CompanyId>,
    /// This passenger will not leave the limo while any of these wait at
    /// the drop-off stop.
    pub enemies: Vec<PassengerId>,
}

impl Passenger {
    /// True while the passenger sits in some company's lobby.
    pub fn lobby(&self) -> Option<CompanyId> {
        match self.location {
            PassengerLocation::Lobby(company) => Some(company),
            _ => None,
        }
    }

    /// True while the passenger rides in some limo.
    pub fn is_riding(&self) -> bool {
        matches!(self.location, PassengerLocation::Riding(_))
    }
}
