//! The entity repository: the single source of truth for the mirrored game
//! state.
//!
//! All entities live in arenas on [`World`] and refer to each other by id.
//! Bidirectional relationships (a company's waiting lobby and each
//! passenger's location, a limo's seat and its rider) are maintained by
//! [`World::set_passenger_location`] alone; no other code mutates one side
//! of a relationship.

pub use entities::{
    CoffeeStore, Company, CompanyId, Limo, Passenger, PassengerId, PassengerLocation, Player,
    PlayerId, PowerUpId, StoreId,
};
pub use map::Map;
pub use powerup::{PowerUp, PowerUpKey, PowerUps, ResolvedTargets};

pub mod entities;
pub mod map;
pub mod powerup;
pub mod update;

use crate::error::AgentError;
use chauffeur_protocol::{PowerUpSnapshot, SetupMessage, Tile};

/// The mirrored game world. Built from a `setup` message, then mutated in
/// place by the update routines in [`update`].
#[derive(Debug)]
pub struct World {
    pub map: Map,
    pub players: Vec<Player>,
    pub companies: Vec<Company>,
    pub stores: Vec<CoffeeStore>,
    pub passengers: Vec<Passenger>,
    /// Our deck, hand, and the flyweight cache behind them.
    pub powerups: PowerUps,
    /// Our own player.
    pub me: PlayerId,
}

impl World {
    /// Build a fresh world from a full setup snapshot.
    pub fn from_setup(setup: &SetupMessage) -> Result<Self, AgentError> {
        let map = Map::from_snapshot(&setup.map)?;

        let players: Vec<Player> = setup
            .players
            .iter()
            .map(|snap| Player {
                guid: snap.guid.clone(),
                name: snap.name.clone(),
                school: snap.school.clone(),
                language: snap.language.clone(),
                score: 0.0,
                total_score: 0.0,
                max_cards_in_hand: 0,
                limo: Limo::new(Tile::new(snap.limo_x, snap.limo_y), snap.limo_angle),
                pick_up: Vec::new(),
                delivered: Vec::new(),
                power_up_next_stop: None,
                power_up_transit: None,
            })
            .collect();

        let companies: Vec<Company> = setup
            .companies
            .iter()
            .map(|snap| Company {
                name: snap.name.clone(),
                bus_stop: Tile::new(snap.bus_stop_x, snap.bus_stop_y),
                waiting: Vec::new(),
            })
            .collect();

        let stores: Vec<CoffeeStore> = setup
            .stores
            .iter()
            .map(|snap| CoffeeStore {
                name: snap.name.clone(),
                bus_stop: Tile::new(snap.bus_stop_x, snap.bus_stop_y),
            })
            .collect();

        // passengers first, enemy links second: the relation needs every id
        let mut passengers: Vec<Passenger> = Vec::with_capacity(setup.passengers.len());
        for snap in &setup.passengers {
            let location = match &snap.lobby {
                Some(name) => PassengerLocation::Lobby(find_company(&companies, name)?),
                None => PassengerLocation::Delivered,
            };
            let destination = match &snap.destination {
                Some(name) => Some(find_company(&companies, name)?),
                None => None,
            };
            let route = snap
                .route
                .iter()
                .map(|name| find_company(&companies, name))
                .collect::<Result<Vec<_>, _>>()?;
            passengers.push(Passenger {
                name: snap.name.clone(),
                points: snap.points_delivered,
                location,
                destination,
                route,
                enemies: Vec::new(),
            });
        }
        for (index, snap) in setup.passengers.iter().enumerate() {
            let enemies = snap
                .enemies
                .iter()
                .map(|name| {
                    passengers
                        .iter()
                        .position(|p| p.name == *name)
                        .map(PassengerId)
                        .ok_or_else(|| AgentError::UnknownPassenger(name.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            passengers[index].enemies = enemies;
        }

        let me = players
            .iter()
            .position(|p| p.guid == setup.my_guid)
            .map(PlayerId)
            .ok_or_else(|| AgentError::UnknownPlayer(setup.my_guid.clone()))?;

        let mut world = Self {
            map,
            players,
            companies,
            stores,
            passengers,
            powerups: PowerUps::new(),
            me,
        };

        // fill the waiting lobbies from the passenger locations
        for index in 0..world.passengers.len() {
            if let PassengerLocation::Lobby(company) = world.passengers[index].location {
                world.companies[company.0].waiting.push(PassengerId(index));
            }
        }

        // the announced deck
        let deck: Vec<PowerUpId> = setup
            .powerups
            .iter()
            .map(|snap| world_resolve(&mut world, snap))
            .collect();
        world.powerups.deck = deck;

        Ok(world)
    }

    pub fn me(&self) -> &Player {
        &self.players[self.me.0]
    }

    pub fn me_mut(&mut self) -> &mut Player {
        &mut self.players[self.me.0]
    }

    pub fn player_by_guid(&self, guid: &str) -> Option<PlayerId> {
        self.players.iter().position(|p| p.guid == guid).map(PlayerId)
    }

    pub fn player_by_name(&self, name: &str) -> Option<PlayerId> {
        self.players.iter().position(|p| p.name == name).map(PlayerId)
    }

    pub fn company_by_name(&self, name: &str) -> Option<CompanyId> {
        self.companies
            .iter()
            .position(|c| c.name == name)
            .map(CompanyId)
    }

    pub fn passenger_by_name(&self, name: &str) -> Option<PassengerId> {
        self.passengers
            .iter()
            .position(|p| p.name == name)
            .map(PassengerId)
    }

    /// Whether any company or coffee store has its bus stop on this tile.
    pub fn at_bus_stop(&self, tile: Tile) -> bool {
        self.companies.iter().any(|c| c.bus_stop == tile)
            || self.stores.iter().any(|s| s.bus_stop == tile)
    }

    /// Intern a power-up reference, resolving its target names first.
    pub fn resolve_power_up(&mut self, snapshot: &PowerUpSnapshot) -> PowerUpId {
        world_resolve(self, snapshot)
    }

    /// Move a passenger to a new location, maintaining both sides of every
    /// relationship: the old and new company lobbies, and the old and new
    /// limo seats. This is the only routine allowed to touch them.
    pub fn set_passenger_location(&mut self, passenger: PassengerId, location: PassengerLocation) {
        for (index, company) in self.companies.iter_mut().enumerate() {
            if location != PassengerLocation::Lobby(CompanyId(index)) {
                company.waiting.retain(|&waiting| waiting != passenger);
            }
        }
        for (index, player) in self.players.iter_mut().enumerate() {
            if location != PassengerLocation::Riding(PlayerId(index))
                && player.limo.passenger == Some(passenger)
            {
                player.limo.passenger = None;
            }
        }
        match location {
            PassengerLocation::Lobby(company) => {
                let waiting = &mut self.companies[company.0].waiting;
                if !waiting.contains(&passenger) {
                    waiting.push(passenger);
                }
            }
            PassengerLocation::Riding(player) => {
                self.players[player.0].limo.passenger = Some(passenger);
            }
            PassengerLocation::Delivered => {}
        }
        self.passengers[passenger.0].location = location;
    }
}

fn find_company(companies: &[Company], name: &str) -> Result<CompanyId, AgentError> {
    companies
        .iter()
        .position(|c| c.name == name)
        .map(CompanyId)
        .ok_or_else(|| AgentError::UnknownCompany(name.to_string()))
}

fn world_resolve(world: &mut World, snapshot: &PowerUpSnapshot) -> PowerUpId {
    let targets = ResolvedTargets {
        company: snapshot
            .company
            .as_deref()
            .and_then(|name| world.company_by_name(name)),
        passenger: snapshot
            .passenger
            .as_deref()
            .and_then(|name| world.passenger_by_name(name)),
        player: snapshot
            .player
            .as_deref()
            .and_then(|name| world.player_by_name(name)),
    };
    world.powerups.resolve(snapshot, targets)
}
