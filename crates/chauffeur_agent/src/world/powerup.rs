//! Power-up cards, the flyweight cache that canonicalizes them, and the
//! deck/hand bookkeeping.
//!
//! The server refers to "the same" card from many messages (setup deck,
//! per-player transit cards, play results, resync lists). Each reference is
//! interned here so a given {kind, targets} combination maps to exactly one
//! [`PowerUp`] instance whose `ok_to_play` flag is refreshed in place, and
//! card identity reduces to [`PowerUpId`] equality.

use crate::world::entities::{CompanyId, PassengerId, PlayerId, PowerUpId};
use chauffeur_protocol::{CardKind, PowerUpSnapshot};
use std::collections::HashMap;
use std::fmt;

/// The derived identity of a power-up: the card kind plus the names of its
/// targets. Display name and playability are deliberately excluded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PowerUpKey {
    pub card: CardKind,
    pub company: Option<String>,
    pub passenger: Option<String>,
    pub player: Option<String>,
}

impl PowerUpKey {
    pub fn of_snapshot(snapshot: &PowerUpSnapshot) -> Self {
        Self {
            card: snapshot.card,
            company: snapshot.company.clone(),
            passenger: snapshot.passenger.clone(),
            player: snapshot.player.clone(),
        }
    }
}

impl fmt::Display for PowerUpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.card)?;
        for target in [&self.company, &self.passenger, &self.player]
            .into_iter()
            .flatten()
        {
            write!(f, " - {target}")?;
        }
        Ok(())
    }
}

/// A canonical power-up instance. At most one exists per [`PowerUpKey`].
#[derive(Debug, Clone, PartialEq)]
pub struct PowerUp {
    pub key: PowerUpKey,
    /// Resolved targets, where the names matched known entities.
    pub company: Option<CompanyId>,
    pub passenger: Option<PassengerId>,
    pub player: Option<PlayerId>,
    /// False until the card has been drawn and the limo has visited a bus
    /// stop since.
    pub ok_to_play: bool,
}

impl PowerUp {
    pub fn kind(&self) -> CardKind {
        self.key.card
    }
}

impl fmt::Display for PowerUp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.key.fmt(f)
    }
}

/// Target ids resolved by the repository before interning; the cache itself
/// never looks entities up.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolvedTargets {
    pub company: Option<CompanyId>,
    pub passenger: Option<PassengerId>,
    pub player: Option<PlayerId>,
}

/// The flyweight cache plus this player's deck and hand, both lists of ids
/// into the cache arena. Equal cards may legitimately appear more than once
/// in a list (two untargeted copies of the same kind).
#[derive(Debug, Default)]
pub struct PowerUps {
    cards: Vec<PowerUp>,
    by_key: HashMap<PowerUpKey, PowerUpId>,
    /// Cards still available to draw.
    pub deck: Vec<PowerUpId>,
    /// Cards drawn and not yet played.
    pub hand: Vec<PowerUpId>,
}

impl PowerUps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a card reference. Repeated resolutions of the same derived
    /// key return the same id for the lifetime of the process; the cached
    /// instance's `ok_to_play` is refreshed from the snapshot either way.
    pub fn resolve(&mut self, snapshot: &PowerUpSnapshot, targets: ResolvedTargets) -> PowerUpId {
        let key = PowerUpKey::of_snapshot(snapshot);
        if let Some(&id) = self.by_key.get(&key) {
            self.cards[id.0].ok_to_play = snapshot.ok_to_play;
            return id;
        }
        let id = PowerUpId(self.cards.len());
        self.cards.push(PowerUp {
            key: key.clone(),
            company: targets.company,
            passenger: targets.passenger,
            player: targets.player,
            ok_to_play: snapshot.ok_to_play,
        });
        self.by_key.insert(key, id);
        id
    }

    pub fn get(&self, id: PowerUpId) -> &PowerUp {
        &self.cards[id.0]
    }

    pub fn get_mut(&mut self, id: PowerUpId) -> &mut PowerUp {
        &mut self.cards[id.0]
    }

    /// Remove one occurrence of a card from the hand.
    pub fn take_from_hand(&mut self, id: PowerUpId) {
        if let Some(pos) = self.hand.iter().position(|&held| held == id) {
            self.hand.remove(pos);
        }
    }

    /// Reconcile the local deck against the server's deck list. Local cards
    /// the server no longer lists have been drawn: they migrate to the
    /// hand. Server cards we do not hold are added back.
    pub fn reconcile_deck(&mut self, server: Vec<PowerUpId>) {
        let mut remaining = server;
        let mut index = 0;
        while index < self.deck.len() {
            let card = self.deck[index];
            if let Some(pos) = remaining.iter().position(|&c| c == card) {
                remaining.remove(pos);
                index += 1;
            } else {
                let drawn = self.deck.remove(index);
                self.hand.push(drawn);
            }
        }
        self.deck.extend(remaining);
    }

    /// Reconcile the local hand against the server's hand list. Local cards
    /// the server no longer lists are gone (played or discarded); server
    /// cards we do not hold are added back.
    pub fn reconcile_hand(&mut self, server: Vec<PowerUpId>) {
        let mut remaining = server;
        let mut index = 0;
        while index < self.hand.len() {
            let card = self.hand[index];
            if let Some(pos) = remaining.iter().position(|&c| c == card) {
                remaining.remove(pos);
                index += 1;
            } else {
                self.hand.remove(index);
            }
        }
        self.hand.extend(remaining);
    }
}
