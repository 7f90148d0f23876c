//! Tile-grid path planning: a pure function over the map, no side effects.

use crate::world::Map;
use chauffeur_protocol::Tile;
use pathfinding::prelude::astar;

/// Shortest drivable path from `start` to `goal`, both endpoints included.
/// Empty when the goal is unreachable; a single tile when already there.
pub fn shortest_path(map: &Map, start: Tile, goal: Tile) -> Vec<Tile> {
    if start == goal {
        return vec![start];
    }
    let result = astar(
        &start,
        |&tile| {
            [
                Tile::new(tile.x + 1, tile.y),
                Tile::new(tile.x - 1, tile.y),
                Tile::new(tile.x, tile.y + 1),
                Tile::new(tile.x, tile.y - 1),
            ]
            .into_iter()
            .filter(|&next| map.is_walkable(next))
            .map(|next| (next, 1u32))
            .collect::<Vec<_>>()
        },
        |&tile| tile.distance(goal),
        |&tile| tile == goal,
    );
    match result {
        Some((path, _cost)) => path,
        None => Vec::new(),
    }
}

/// A path for an order: the shortest path plus a repeat of the
/// second-to-last tile, so the limo pulls back out of the stop while the
/// next decision is still in flight.
pub fn plan_route(map: &Map, start: Tile, goal: Tile) -> Vec<Tile> {
    let mut path = shortest_path(map, start, goal);
    if path.len() > 1 {
        path.push(path[path.len() - 2]);
    }
    path
}
