//! The walkable tile grid, immutable per game session.

use crate::error::AgentError;
use chauffeur_protocol::{MapSnapshot, Tile};

/// The game map: a rectangular grid of walkable flags. `#` tiles in the
/// snapshot are blocked; every other character is drivable (roads and bus
/// stops included).
#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    width: usize,
    height: usize,
    walkable: Vec<bool>,
}

impl Map {
    pub fn from_snapshot(snapshot: &MapSnapshot) -> Result<Self, AgentError> {
        if snapshot.rows.len() != snapshot.height {
            return Err(AgentError::MalformedMap(format!(
                "expected {} rows, got {}",
                snapshot.height,
                snapshot.rows.len()
            )));
        }
        let mut walkable = Vec::with_capacity(snapshot.width * snapshot.height);
        for (y, row) in snapshot.rows.iter().enumerate() {
            if row.chars().count() != snapshot.width {
                return Err(AgentError::MalformedMap(format!(
                    "row {} has {} tiles, expected {}",
                    y,
                    row.chars().count(),
                    snapshot.width
                )));
            }
            walkable.extend(row.chars().map(|ch| ch != '#'));
        }
        Ok(Self {
            width: snapshot.width,
            height: snapshot.height,
            walkable,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn contains(&self, tile: Tile) -> bool {
        tile.x >= 0
            && tile.y >= 0
            && (tile.x as usize) < self.width
            && (tile.y as usize) < self.height
    }

    /// Whether a limo may drive over this tile. Out-of-bounds tiles are not
    /// walkable.
    pub fn is_walkable(&self, tile: Tile) -> bool {
        self.contains(tile) && self.walkable[tile.y as usize * self.width + tile.x as usize]
    }
}
