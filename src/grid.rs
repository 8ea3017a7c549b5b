use crate::types::{Direction, MapSize, Position, WallSet};

pub fn is_valid_position(
    pos: Position,
    map_size: MapSize,
    walls: &WallSet,
    occupied: &[Position],
) -> bool {
    map_size.contains(pos) && !walls.contains(pos) && !occupied.contains(&pos)
}

pub fn valid_directions(
    pos: Position,
    map_size: MapSize,
    walls: &WallSet,
    occupied: &[Position],
) -> Vec<Direction> {
    Direction::ALL
        .into_iter()
        .filter(|dir| is_valid_position(pos.offset(*dir), map_size, walls, occupied))
        .collect()
}

/// Closest valid, unoccupied cell to `anchor`, searching Manhattan rings of
/// growing radius. Within a ring, cells are visited left to right and top to
/// bottom.
pub fn nearest_free_cell(
    anchor: Position,
    map_size: MapSize,
    walls: &WallSet,
    occupied: &[Position],
) -> Option<Position> {
    let max_radius = map_size.width.max(0) + map_size.height.max(0);
    for radius in 0..=max_radius {
        for dx in -radius..=radius {
            let rest = radius - dx.abs();
            let candidates = if rest == 0 {
                [Some(rest), None]
            } else {
                [Some(-rest), Some(rest)]
            };
            for dy in candidates.into_iter().flatten() {
                let pos = Position::new(anchor.x + dx, anchor.y + dy);
                if is_valid_position(pos, map_size, walls, occupied) {
                    return Some(pos);
                }
            }
        }
    }
    None
}

/// First valid, unoccupied cell in row-major order, skipping the outer ring.
pub fn first_free_interior_cell(
    map_size: MapSize,
    walls: &WallSet,
    occupied: &[Position],
) -> Option<Position> {
    for y in 1..map_size.height - 1 {
        for x in 1..map_size.width - 1 {
            let pos = Position::new(x, y);
            if is_valid_position(pos, map_size, walls, occupied) {
                return Some(pos);
            }
        }
    }
    None
}
