use crate::constants::{DEFAULT_WALL_DENSITY, MAZE_CONNECTOR_CHANCE};
use crate::rng::RandomSource;
use crate::types::{MapSize, Position, WallSet};

const PACMAN_PATTERN: [&str; 13] = [
    "####################",
    "#..................#",
    "#.##.#######.####..#",
    "#..................#",
    "#.####.##.####.###.#",
    "#..................#",
    "#.##.#######.####..#",
    "#..................#",
    "#.####.##.####.###.#",
    "#..................#",
    "#.##.#######.####..#",
    "#..................#",
    "####################",
];

#[derive(Clone, Debug, PartialEq)]
pub struct MapLayout {
    pub map_size: MapSize,
    pub walls: WallSet,
}

pub fn border_walls(width: i32, height: i32) -> WallSet {
    let mut walls = WallSet::new();
    for x in 0..width {
        walls.insert(Position::new(x, 0));
        walls.insert(Position::new(x, height - 1));
    }
    for y in 1..height - 1 {
        walls.insert(Position::new(0, y));
        walls.insert(Position::new(width - 1, y));
    }
    walls
}

/// `#` and `1` mark walls; any other character is floor. The width is the
/// longest row.
pub fn from_pattern<S: AsRef<str>>(rows: &[S]) -> MapLayout {
    let mut walls = WallSet::new();
    let mut width = 0;
    for (y, row) in rows.iter().enumerate() {
        let row = row.as_ref();
        width = width.max(row.chars().count() as i32);
        for (x, cell) in row.chars().enumerate() {
            if cell == '#' || cell == '1' {
                walls.insert(Position::new(x as i32, y as i32));
            }
        }
    }
    MapLayout {
        map_size: MapSize::new(width, rows.len() as i32),
        walls,
    }
}

pub fn pacman_map() -> MapLayout {
    from_pattern(&PACMAN_PATTERN)
}

pub fn open_map(width: i32, height: i32) -> MapLayout {
    MapLayout {
        map_size: MapSize::new(width, height),
        walls: border_walls(width, height),
    }
}

/// Posts every fourth column and second row, each growing a connector to the
/// right and one downward with fixed probability.
pub fn maze_map(width: i32, height: i32, rng: &mut dyn RandomSource) -> MapLayout {
    let mut walls = border_walls(width, height);
    for x in (2..width - 2).step_by(4) {
        for y in (2..height - 2).step_by(2) {
            walls.insert(Position::new(x, y));
            if rng.chance(MAZE_CONNECTOR_CHANCE) {
                walls.insert(Position::new(x + 1, y));
            }
            if rng.chance(MAZE_CONNECTOR_CHANCE) {
                walls.insert(Position::new(x, y + 1));
            }
        }
    }
    MapLayout {
        map_size: MapSize::new(width, height),
        walls,
    }
}

pub fn random_map(
    width: i32,
    height: i32,
    density: Option<f32>,
    rng: &mut dyn RandomSource,
) -> MapLayout {
    let density = density.unwrap_or(DEFAULT_WALL_DENSITY);
    let mut walls = border_walls(width, height);
    for x in 1..width - 1 {
        for y in 1..height - 1 {
            if rng.chance(density) {
                walls.insert(Position::new(x, y));
            }
        }
    }
    MapLayout {
        map_size: MapSize::new(width, height),
        walls,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashSet, VecDeque};

    use super::*;
    use crate::grid::is_valid_position;
    use crate::rng::Rng;

    fn reachable_from(layout: &MapLayout, start: Position) -> HashSet<Position> {
        let mut out = HashSet::new();
        let mut queue = VecDeque::new();
        out.insert(start);
        queue.push_back(start);
        while let Some(pos) = queue.pop_front() {
            for dir in crate::types::Direction::ALL {
                let next = pos.offset(dir);
                if !is_valid_position(next, layout.map_size, &layout.walls, &[]) {
                    continue;
                }
                if out.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        out
    }

    #[test]
    fn border_walls_enclose_the_map() {
        let walls = border_walls(6, 4);
        assert_eq!(walls.len(), 2 * 6 + 2 * 2);
        assert!(walls.contains(Position::new(0, 0)));
        assert!(walls.contains(Position::new(5, 3)));
        assert!(!walls.contains(Position::new(1, 1)));
    }

    #[test]
    fn pattern_rows_become_walls() {
        let layout = from_pattern(&["###", "#.1", "###"]);
        assert_eq!(layout.map_size, MapSize::new(3, 3));
        assert_eq!(layout.walls.len(), 8);
        assert!(!layout.walls.contains(Position::new(1, 1)));
        assert!(layout.walls.contains(Position::new(2, 1)));
    }

    #[test]
    fn pacman_map_floor_is_connected() {
        let layout = pacman_map();
        assert_eq!(layout.map_size, MapSize::new(20, 13));
        let floor: HashSet<Position> = (0..layout.map_size.height)
            .flat_map(|y| (0..layout.map_size.width).map(move |x| Position::new(x, y)))
            .filter(|pos| !layout.walls.contains(*pos))
            .collect();
        let reachable = reachable_from(&layout, Position::new(1, 1));
        assert_eq!(reachable, floor);
    }

    #[test]
    fn maze_keeps_border_and_inner_corners_open() {
        for seed in 0..50u32 {
            let mut rng = Rng::new(seed);
            let layout = maze_map(25, 15, &mut rng);
            for corner in layout.map_size.inner_corners() {
                assert!(!layout.walls.contains(corner), "seed={seed}");
            }
            assert!(layout.walls.contains(Position::new(24, 14)));
        }
    }

    #[test]
    fn random_map_density_zero_is_open() {
        let mut rng = Rng::new(5);
        let layout = random_map(8, 8, Some(0.0), &mut rng);
        assert_eq!(layout, open_map(8, 8));
    }
}
