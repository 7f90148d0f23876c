//! Application of `status` message payloads to the repository.
//!
//! These routines are the only writers of the mirrored state after setup.
//! Applying the same snapshot twice leaves the world in the same observable
//! state as applying it once: every field written here is overwritten, and
//! list memberships go through set-like operations.

use crate::error::AgentError;
use crate::world::{PassengerLocation, PlayerId, World};
use chauffeur_protocol::{
    decode_names, decode_path, PassengerPhase, PassengerUpdate, PlayerUpdate, StatusMessage, Tile,
};
use tracing::warn;

/// Apply a full status message. Returns the acting player (ourselves when
/// the message names nobody).
pub fn apply_status(world: &mut World, msg: &StatusMessage) -> Result<PlayerId, AgentError> {
    apply_player_updates(world, &msg.players)?;
    apply_passenger_updates(world, &msg.passengers)?;

    let acting = match &msg.player_guid {
        Some(guid) => world
            .player_by_guid(guid)
            .ok_or_else(|| AgentError::UnknownPlayer(guid.clone()))?,
        None => world.me,
    };

    // the server's view of the acting player's remaining path and pick-ups
    if let Some(text) = &msg.path {
        world.players[acting.0].limo.path = decode_path(text)?;
    }
    if let Some(text) = &msg.pick_up {
        let mut pick_up = Vec::new();
        for name in decode_names(text) {
            match world.passenger_by_name(&name) {
                Some(id) => pick_up.push(id),
                None => warn!("pick-up list names unknown passenger `{name}`"),
            }
        }
        world.players[acting.0].pick_up = pick_up;
    }

    Ok(acting)
}

pub fn apply_player_updates(world: &mut World, updates: &[PlayerUpdate]) -> Result<(), AgentError> {
    for update in updates {
        let id = world
            .player_by_guid(&update.guid)
            .ok_or_else(|| AgentError::UnknownPlayer(update.guid.clone()))?;

        {
            let player = &mut world.players[id.0];
            player.score = update.score;
            player.total_score = update.total_score;
            player.max_cards_in_hand = update.cards_max;
            player.limo.coffee_servings = update.coffee_servings;
            player.limo.tile = Tile::new(update.limo_x, update.limo_y);
            player.limo.angle = update.limo_angle;
        }

        match &update.passenger {
            Some(name) => {
                let passenger = world
                    .passenger_by_name(name)
                    .ok_or_else(|| AgentError::UnknownPassenger(name.clone()))?;
                world.set_passenger_location(passenger, PassengerLocation::Riding(id));
            }
            None => {
                // only the seat is cleared; the rider's own update in the
                // same message settles where they went
                world.players[id.0].limo.passenger = None;
            }
        }

        if let Some(name) = &update.last_delivered {
            let passenger = world
                .passenger_by_name(name)
                .ok_or_else(|| AgentError::UnknownPassenger(name.clone()))?;
            let delivered = &mut world.players[id.0].delivered;
            if !delivered.contains(&passenger) {
                delivered.push(passenger);
            }
        }

        let next_stop = update
            .next_bus_stop
            .as_ref()
            .map(|snap| world.resolve_power_up(snap));
        let transit = update
            .transit
            .as_ref()
            .map(|snap| world.resolve_power_up(snap));
        let player = &mut world.players[id.0];
        player.power_up_next_stop = next_stop;
        player.power_up_transit = transit;
    }
    Ok(())
}

pub fn apply_passenger_updates(
    world: &mut World,
    updates: &[PassengerUpdate],
) -> Result<(), AgentError> {
    for update in updates {
        let id = world
            .passenger_by_name(&update.name)
            .ok_or_else(|| AgentError::UnknownPassenger(update.name.clone()))?;

        if let Some(name) = &update.destination {
            let company = world
                .company_by_name(name)
                .ok_or_else(|| AgentError::UnknownCompany(name.clone()))?;
            world.passengers[id.0].destination = Some(company);
        }
        if let Some(route) = &update.route {
            let mut companies = Vec::new();
            for name in decode_names(route) {
                companies.push(
                    world
                        .company_by_name(&name)
                        .ok_or(AgentError::UnknownCompany(name))?,
                );
            }
            world.passengers[id.0].route = companies;
        }

        match update.status {
            PassengerPhase::Lobby => {
                let name = update.lobby.as_ref().ok_or(AgentError::MissingUpdateField(
                    update.name.clone(),
                    "lobby",
                ))?;
                let company = world
                    .company_by_name(name)
                    .ok_or_else(|| AgentError::UnknownCompany(name.clone()))?;
                world.set_passenger_location(id, PassengerLocation::Lobby(company));
            }
            PassengerPhase::Travelling => {
                let name = update
                    .limo_driver
                    .as_ref()
                    .ok_or(AgentError::MissingUpdateField(
                        update.name.clone(),
                        "limo-driver",
                    ))?;
                let driver = world
                    .player_by_name(name)
                    .ok_or_else(|| AgentError::UnknownPlayer(name.clone()))?;
                world.set_passenger_location(id, PassengerLocation::Riding(driver));
            }
            PassengerPhase::Done => {
                world.passengers[id.0].destination = None;
                world.set_passenger_location(id, PassengerLocation::Delivered);
            }
        }
    }
    Ok(())
}
