//! The decision engine: reacts to game events with movement orders and
//! card actions.
//!
//! The engine never talks to the transport. It is handed an [`OrderSink`]
//! at each invocation (the connection manager in production, a recording
//! stub in tests) and consumes the entity repository plus the triggering
//! event. Each invocation produces at most one movement order and at most
//! one card action.

use crate::error::AgentError;
use crate::path::plan_route;
use crate::world::{
    CompanyId, PassengerId, PlayerId, PowerUpId, PowerUpKey, World,
};
use chauffeur_protocol::{CardAction, CardKind, GameEvent, Tile};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

/// Which order verb to put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderVerb {
    /// The initial order replying to setup.
    Ready,
    /// Any subsequent movement order.
    Move,
}

/// A movement order: destination path plus the pick-up preference list.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveOrder {
    pub verb: OrderVerb,
    pub path: Vec<Tile>,
    /// Passenger names, best candidate first.
    pub pick_up: Vec<String>,
}

/// A card action with its chosen targets, by name as the wire wants them.
#[derive(Debug, Clone, PartialEq)]
pub struct CardPlay {
    pub action: CardAction,
    pub card: CardKind,
    pub company: Option<String>,
    pub passenger: Option<String>,
    pub player: Option<String>,
}

impl CardPlay {
    /// The derived identity of the card this play refers to.
    pub fn key(&self) -> PowerUpKey {
        PowerUpKey {
            card: self.card,
            company: self.company.clone(),
            passenger: self.passenger.clone(),
            player: self.player.clone(),
        }
    }
}

/// The narrow interface the engine submits through. Implemented by the
/// connection manager; tests supply a recording stub.
pub trait OrderSink {
    fn send_order(&mut self, order: MoveOrder) -> Result<(), AgentError>;
    fn send_card(&mut self, play: CardPlay) -> Result<(), AgentError>;
}

/// Skip the card logic on this fraction of update ticks when the hand is
/// non-empty, so the agent does not churn cards every tick.
const HOLD_NUMERATOR: i32 = 30;
const HOLD_DENOMINATOR: i32 = 50;

/// The reactive decision engine.
#[derive(Debug)]
pub struct Brain {
    rng: StdRng,
}

impl Default for Brain {
    fn default() -> Self {
        Self::new()
    }
}

impl Brain {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic variant for tests.
    pub fn with_rng(rng: StdRng) -> Self {
        Self { rng }
    }

    /// Setup hook: must produce the initial order.
    pub fn setup(&mut self, world: &mut World, sink: &mut dyn OrderSink) -> Result<(), AgentError> {
        let pick_up = ranked_pickups(world, world.me);
        let first = *pick_up.first().ok_or(AgentError::NoEligiblePassenger)?;
        let dest = lobby_stop(world, first)?;
        let path = plan_route(&world.map, world.me().limo.tile, dest);
        self.issue(world, sink, OrderVerb::Ready, path, pick_up)
    }

    /// React to a game event. May send nothing at all.
    pub fn game_status(
        &mut self,
        world: &mut World,
        sink: &mut dyn OrderSink,
        event: GameEvent,
        acting: PlayerId,
    ) -> Result<(), AgentError> {
        if acting != world.me {
            return self.other_player_event(world, acting);
        }

        // cards mature once the limo visits any bus stop after the draw
        if world.at_bus_stop(world.me().limo.tile) {
            for index in 0..world.powerups.hand.len() {
                let id = world.powerups.hand[index];
                world.powerups.get_mut(id).ok_to_play = true;
            }
        }

        if event == GameEvent::Update {
            return self.maybe_play_power_up(world, sink);
        }

        log_event(world, event);

        let mut pick_up: Vec<PassengerId> = Vec::new();
        let mut dest: Option<Tile> = None;

        match event {
            GameEvent::NoPath | GameEvent::PassengerNoAction => {
                match world.me().limo.passenger {
                    None => {
                        pick_up = ranked_pickups(world, world.me);
                        let first = *pick_up.first().ok_or(AgentError::NoEligiblePassenger)?;
                        dest = Some(lobby_stop(world, first)?);
                    }
                    Some(carried) => dest = Some(destination_stop(world, carried)?),
                }
            }
            GameEvent::PassengerDelivered | GameEvent::PassengerAbandoned => {
                pick_up = ranked_pickups(world, world.me);
                let first = *pick_up.first().ok_or(AgentError::NoEligiblePassenger)?;
                dest = Some(lobby_stop(world, first)?);
            }
            GameEvent::PassengerRefusedEnemy => {
                dest = Some(self.handle_enemy_refusal(world, sink)?);
            }
            GameEvent::PassengerDeliveredAndPickedUp | GameEvent::PassengerPickedUp => {
                pick_up = ranked_pickups(world, world.me);
                let carried = world
                    .me()
                    .limo
                    .passenger
                    .ok_or(AgentError::NoCarriedPassenger)?;
                dest = Some(destination_stop(world, carried)?);
            }
            _ => {}
        }

        // an empty pot overrides everything: nobody boards without coffee
        match event {
            GameEvent::PassengerDeliveredAndPickedUp
            | GameEvent::PassengerDelivered
            | GameEvent::PassengerAbandoned
                if world.me().limo.coffee_servings <= 0 =>
            {
                dest = Some(nearest_store(world)?);
            }
            GameEvent::PassengerRefusedNoCoffee
            | GameEvent::PassengerDeliveredAndPickUpRefused => {
                dest = Some(nearest_store(world)?);
            }
            GameEvent::CoffeeStoreCarRestocked => {
                pick_up = ranked_pickups(world, world.me);
                match pick_up.first() {
                    Some(&first) => dest = Some(lobby_stop(world, first)?),
                    None => return Ok(()),
                }
            }
            _ => {}
        }

        let Some(dest) = dest else {
            // some events need no reply at all
            return Ok(());
        };

        log_heading(world, dest);

        let path = plan_route(&world.map, world.me().limo.tile, dest);
        debug!(
            "{:?}: path {} -> {}, {} steps; {} pick-up candidates",
            event,
            path.first().map(|t| t.to_string()).unwrap_or_default(),
            path.last().map(|t| t.to_string()).unwrap_or_default(),
            path.len(),
            pick_up.len()
        );
        self.issue(world, sink, OrderVerb::Move, path, pick_up)
    }

    /// A power-up play resolved somewhere in the game. Re-plan when the
    /// board moved under us.
    pub fn powerup_status(
        &mut self,
        world: &mut World,
        sink: &mut dyn OrderSink,
        event: GameEvent,
        _player: PlayerId,
        card: PowerUpId,
    ) -> Result<(), AgentError> {
        let me = world.me;
        let power_up = world.powerups.get(card);
        let relocated = power_up.kind() == CardKind::RelocateAllCars;
        let rerouted =
            power_up.kind() == CardKind::ChangeDestination && power_up.player == Some(me);
        if event == GameEvent::PowerUpPlayed && (relocated || rerouted) {
            return self.game_status(world, sink, GameEvent::NoPath, me);
        }
        Ok(())
    }

    /// Someone else's event. Only interesting when a rival grabbed the
    /// passenger we were heading for.
    fn other_player_event(
        &mut self,
        world: &mut World,
        acting: PlayerId,
    ) -> Result<(), AgentError> {
        let me = world.me;
        let Some(&target) = world.players[me.0].pick_up.first() else {
            return Ok(());
        };
        if world.players[acting.0].limo.passenger != Some(target) {
            return Ok(());
        }
        let heading_to_store = world.players[me.0]
            .limo
            .path
            .last()
            .is_some_and(|&tile| world.stores.iter().any(|s| s.bus_stop == tile));
        if !heading_to_store {
            info!(
                "{} grabbed {}, abandoning that destination",
                world.players[acting.0].name, world.passengers[target.0].name
            );
            world.players[me.0].limo.path.clear();
            world.players[me.0].pick_up.clear();
        }
        Ok(())
    }

    /// An enemy blocks the drop-off. Clear the stop with a rider-mover card
    /// when one is ready, otherwise find somewhere safer to go.
    fn handle_enemy_refusal(
        &mut self,
        world: &mut World,
        sink: &mut dyn OrderSink,
    ) -> Result<Tile, AgentError> {
        let carried = world
            .me()
            .limo
            .passenger
            .ok_or(AgentError::NoCarriedPassenger)?;
        let destination = world.passengers[carried.0]
            .destination
            .ok_or_else(|| AgentError::MissingDestination(world.passengers[carried.0].name.clone()))?;

        let mover = world.powerups.hand.iter().copied().find(|&id| {
            let power_up = world.powerups.get(id);
            power_up.kind() == CardKind::MovePassenger && power_up.ok_to_play
        });
        if let Some(card) = mover {
            let enemy = world.passengers[carried.0]
                .enemies
                .iter()
                .copied()
                .find(|e| world.companies[destination.0].waiting.contains(e));
            if let Some(enemy) = enemy {
                info!(
                    "moving {} away from {}",
                    world.passengers[enemy.0].name, world.companies[destination.0].name
                );
                sink.send_card(CardPlay {
                    action: CardAction::Play,
                    card: CardKind::MovePassenger,
                    company: None,
                    passenger: Some(world.passengers[enemy.0].name.clone()),
                    player: None,
                })?;
                world.powerups.take_from_hand(card);
                return Ok(world.companies[destination.0].bus_stop);
            }
        }

        // nearest company whose lobby shares no enemies with our rider
        let me_tile = world.me().limo.tile;
        let mut best: Option<(usize, Tile)> = None;
        for (index, company) in world.companies.iter().enumerate() {
            if CompanyId(index) == destination {
                continue;
            }
            let conflicted = company
                .waiting
                .iter()
                .any(|p| world.passengers[carried.0].enemies.contains(p));
            if conflicted {
                continue;
            }
            let length = plan_route(&world.map, me_tile, company.bus_stop).len();
            if best.is_none_or(|(shortest, _)| length < shortest) {
                best = Some((length, company.bus_stop));
            }
        }
        best.map(|(_, stop)| stop).ok_or(AgentError::NoSafeCompany)
    }

    /// Card logic for generic update ticks: draw first, then maybe play one.
    fn maybe_play_power_up(
        &mut self,
        world: &mut World,
        sink: &mut dyn OrderSink,
    ) -> Result<(), AgentError> {
        if !world.powerups.hand.is_empty()
            && self.rng.gen_range(0..HOLD_DENOMINATOR) < HOLD_NUMERATOR
        {
            return Ok(());
        }

        let max_hand = world.me().max_cards_in_hand as usize;
        if world.powerups.hand.len() < max_hand && !world.powerups.deck.is_empty() {
            // drawing takes priority over playing
            while world.powerups.hand.len() < max_hand && !world.powerups.deck.is_empty() {
                let card = world.powerups.deck.remove(0);
                world.powerups.hand.push(card);
                sink.send_card(card_play(world, CardAction::Draw, card))?;
            }
            return Ok(());
        }

        // the rider-mover stays reserved for enemy refusals
        let candidates: Vec<PowerUpId> = world
            .powerups
            .hand
            .iter()
            .copied()
            .filter(|&id| {
                let power_up = world.powerups.get(id);
                power_up.ok_to_play && power_up.kind() != CardKind::MovePassenger
            })
            .collect();
        let Some(&choice) = candidates.choose(&mut self.rng) else {
            return Ok(());
        };

        let mut play = card_play(world, CardAction::Play, choice);
        match world.powerups.get(choice).kind() {
            CardKind::MovePassenger => {
                let idle: Vec<PassengerId> = world
                    .passengers
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| !p.is_riding())
                    .map(|(index, _)| PassengerId(index))
                    .collect();
                let Some(&target) = idle.choose(&mut self.rng) else {
                    return Ok(());
                };
                play.passenger = Some(world.passengers[target.0].name.clone());
            }
            CardKind::ChangeDestination | CardKind::StopCar => {
                let loaded: Vec<PlayerId> = world
                    .players
                    .iter()
                    .enumerate()
                    .filter(|&(index, p)| {
                        PlayerId(index) != world.me && p.limo.passenger.is_some()
                    })
                    .map(|(index, _)| PlayerId(index))
                    .collect();
                let Some(&target) = loaded.choose(&mut self.rng) else {
                    return Ok(());
                };
                play.player = Some(world.players[target.0].name.clone());
            }
            _ => {}
        }

        info!("requesting play of {}", world.powerups.get(choice));
        sink.send_card(play)?;
        world.powerups.take_from_hand(choice);
        Ok(())
    }

    /// Mirror the order locally, then put it on the wire.
    fn issue(
        &mut self,
        world: &mut World,
        sink: &mut dyn OrderSink,
        verb: OrderVerb,
        path: Vec<Tile>,
        pick_up: Vec<PassengerId>,
    ) -> Result<(), AgentError> {
        let me = world.me;
        if !path.is_empty() {
            world.players[me.0].limo.path = path.clone();
        }
        if !pick_up.is_empty() {
            world.players[me.0].pick_up = pick_up.clone();
        }
        let names = pick_up
            .iter()
            .map(|&id| world.passengers[id.0].name.clone())
            .collect();
        sink.send_order(MoveOrder {
            verb,
            path,
            pick_up: names,
        })
    }
}

/// Rank every pickable passenger by path cost per delivery point,
/// cheapest-per-point first, ties keeping list order.
pub fn ranked_pickups(world: &World, player: PlayerId) -> Vec<PassengerId> {
    let me = &world.players[player.0];
    let mut scored: Vec<(PassengerId, f64)> = world
        .passengers
        .iter()
        .enumerate()
        .filter_map(|(index, passenger)| {
            let id = PassengerId(index);
            let lobby = passenger.lobby()?;
            let destination = passenger.destination?;
            let eligible = !me.delivered.contains(&id) && me.limo.passenger != Some(id);
            if !eligible {
                return None;
            }
            let lobby_stop = world.companies[lobby.0].bus_stop;
            let destination_stop = world.companies[destination.0].bus_stop;
            let outbound = plan_route(&world.map, me.limo.tile, lobby_stop).len();
            let onward = plan_route(&world.map, lobby_stop, destination_stop).len();
            let score = (outbound + onward) as f64 / f64::from(passenger.points);
            Some((id, score))
        })
        .collect();
    scored.sort_by(|a, b| a.1.total_cmp(&b.1));
    scored.into_iter().map(|(id, _)| id).collect()
}

fn lobby_stop(world: &World, passenger: PassengerId) -> Result<Tile, AgentError> {
    let lobby = world.passengers[passenger.0]
        .lobby()
        .ok_or_else(|| AgentError::NotWaiting(world.passengers[passenger.0].name.clone()))?;
    Ok(world.companies[lobby.0].bus_stop)
}

fn destination_stop(world: &World, passenger: PassengerId) -> Result<Tile, AgentError> {
    let destination = world.passengers[passenger.0]
        .destination
        .ok_or_else(|| AgentError::MissingDestination(world.passengers[passenger.0].name.clone()))?;
    Ok(world.companies[destination.0].bus_stop)
}

/// The path-nearest coffee store's bus stop, ties keeping list order.
fn nearest_store(world: &World) -> Result<Tile, AgentError> {
    let me_tile = world.me().limo.tile;
    let mut best: Option<(usize, Tile)> = None;
    for store in &world.stores {
        let length = plan_route(&world.map, me_tile, store.bus_stop).len();
        if best.is_none_or(|(shortest, _)| length < shortest) {
            best = Some((length, store.bus_stop));
        }
    }
    best.map(|(_, stop)| stop).ok_or(AgentError::NoCoffeeStore)
}

fn card_play(world: &World, action: CardAction, card: PowerUpId) -> CardPlay {
    let power_up = world.powerups.get(card);
    CardPlay {
        action,
        card: power_up.kind(),
        company: power_up.key.company.clone(),
        passenger: power_up.key.passenger.clone(),
        player: power_up.key.player.clone(),
    }
}

fn log_event(world: &World, event: GameEvent) {
    let carried = world
        .me()
        .limo
        .passenger
        .map(|p| world.passengers[p.0].name.clone())
        .unwrap_or_else(|| "{none}".to_string());
    info!(
        "{:?} at {} (carrying {})",
        event,
        world.me().limo.tile,
        carried
    );
}

fn log_heading(world: &World, dest: Tile) {
    let name = world
        .stores
        .iter()
        .find(|s| s.bus_stop == dest)
        .map(|s| s.name.as_str())
        .or_else(|| {
            world
                .companies
                .iter()
                .find(|c| c.bus_stop == dest)
                .map(|c| c.name.as_str())
        });
    if let Some(name) = name {
        info!("heading toward {} at {}", name, dest);
    }
}
