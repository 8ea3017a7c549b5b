use std::collections::HashSet;

use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dir: Direction) -> Self {
        Self {
            x: self.x + dir.x,
            y: self.y + dir.y,
        }
    }

    pub fn manhattan(self, other: Position) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

/// One of the four unit steps, or [`Direction::STAY`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Direction {
    pub x: i32,
    pub y: i32,
}

impl Direction {
    pub const UP: Direction = Direction { x: 0, y: -1 };
    pub const DOWN: Direction = Direction { x: 0, y: 1 };
    pub const LEFT: Direction = Direction { x: -1, y: 0 };
    pub const RIGHT: Direction = Direction { x: 1, y: 0 };
    pub const STAY: Direction = Direction { x: 0, y: 0 };

    pub const ALL: [Direction; 4] = [
        Direction::UP,
        Direction::DOWN,
        Direction::LEFT,
        Direction::RIGHT,
    ];

    pub fn is_stay(self) -> bool {
        self == Self::STAY
    }

    pub fn opposite(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }

    /// Unit step leading from `from` to the adjacent cell `to`.
    pub fn between(from: Position, to: Position) -> Option<Self> {
        let dir = Self {
            x: to.x - from.x,
            y: to.y - from.y,
        };
        if dir.x.abs() + dir.y.abs() == 1 {
            Some(dir)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSize {
    pub width: i32,
    pub height: i32,
}

impl MapSize {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn contains(self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    /// Cells one step inside each corner: top-left, top-right, bottom-left,
    /// bottom-right.
    pub fn inner_corners(self) -> [Position; 4] {
        [
            Position::new(1, 1),
            Position::new(self.width - 2, 1),
            Position::new(1, self.height - 2),
            Position::new(self.width - 2, self.height - 2),
        ]
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WallSet(HashSet<Position>);

impl WallSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.0.contains(&pos)
    }

    pub fn insert(&mut self, pos: Position) -> bool {
        self.0.insert(pos)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.0.iter()
    }
}

impl FromIterator<Position> for WallSet {
    fn from_iter<I: IntoIterator<Item = Position>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Position> for WallSet {
    fn extend<I: IntoIterator<Item = Position>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRanking {
    pub player_id: usize,
    pub rank: usize,
    pub eliminated_at: u64,
}

/// Everything needed to start or reset a game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSetup {
    pub players: Vec<Position>,
    pub ghost: Position,
    pub map_size: MapSize,
    pub walls: WallSet,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub players: Vec<Position>,
    pub ghost: Position,
    pub map_size: MapSize,
    pub walls: WallSet,
    pub eliminated_players: Vec<usize>,
    pub rankings: Vec<PlayerRanking>,
    pub game_step: u64,
}

impl GameState {
    pub fn from_setup(setup: GameSetup) -> Self {
        Self {
            players: setup.players,
            ghost: setup.ghost,
            map_size: setup.map_size,
            walls: setup.walls,
            eliminated_players: Vec::new(),
            rankings: Vec::new(),
            game_step: 0,
        }
    }

    pub fn is_eliminated(&self, slot: usize) -> bool {
        self.eliminated_players.contains(&slot)
    }

    pub fn active_slots(&self) -> Vec<usize> {
        (0..self.players.len())
            .filter(|slot| !self.is_eliminated(*slot))
            .collect()
    }

    pub fn active_positions(&self) -> Vec<Position> {
        self.active_slots()
            .into_iter()
            .map(|slot| self.players[slot])
            .collect()
    }

    pub fn ranking_of(&self, slot: usize) -> Option<&PlayerRanking> {
        self.rankings.iter().find(|ranking| ranking.player_id == slot)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOverStatus {
    pub is_over: bool,
    pub winner: Option<usize>,
    pub total_players: usize,
    pub remaining_players: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct VisualPosition {
    pub x: f32,
    pub y: f32,
}

impl From<Position> for VisualPosition {
    fn from(pos: Position) -> Self {
        Self {
            x: pos.x as f32,
            y: pos.y as f32,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SmoothPosition {
    pub logical: Position,
    pub visual: VisualPosition,
}

/// Logical state plus the interpolated positions a renderer draws.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSnapshot {
    pub state: GameState,
    pub players: Vec<SmoothPosition>,
    pub ghost: SmoothPosition,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostLevel {
    #[default]
    Basic,
    Predictive,
    Strategic,
    Advanced,
}

impl GhostLevel {
    /// Values outside `1..=4` clamp to the nearest level.
    pub fn from_number(level: i32) -> Self {
        match level.clamp(1, 4) {
            1 => Self::Basic,
            2 => Self::Predictive,
            3 => Self::Strategic,
            _ => Self::Advanced,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Self::Basic => 1,
            Self::Predictive => 2,
            Self::Strategic => 3,
            Self::Advanced => 4,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "1" | "basic" => Some(Self::Basic),
            "2" | "predictive" => Some(Self::Predictive),
            "3" | "strategic" => Some(Self::Strategic),
            "4" | "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    PlayerJoined {
        slot: usize,
        position: Position,
    },
    PlayerLeft {
        slot: usize,
    },
    PlayerEliminated {
        slot: usize,
        rank: usize,
        tick: u64,
    },
    GameEnded {
        winner: Option<usize>,
        rankings: Vec<PlayerRanking>,
    },
    GameReset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn between_only_accepts_unit_steps() {
        let origin = Position::new(3, 3);
        assert_eq!(
            Direction::between(origin, Position::new(3, 2)),
            Some(Direction::UP)
        );
        assert_eq!(Direction::between(origin, origin), None);
        assert_eq!(Direction::between(origin, Position::new(4, 4)), None);
    }

    #[test]
    fn ghost_level_clamps_out_of_range_numbers() {
        assert_eq!(GhostLevel::from_number(0), GhostLevel::Basic);
        assert_eq!(GhostLevel::from_number(3), GhostLevel::Strategic);
        assert_eq!(GhostLevel::from_number(9), GhostLevel::Advanced);
        assert_eq!(GhostLevel::parse("advanced").map(GhostLevel::number), Some(4));
    }

    #[test]
    fn game_state_serializes_with_camel_case_fields() {
        let state = GameState::from_setup(GameSetup {
            players: vec![Position::new(1, 1)],
            ghost: Position::new(2, 2),
            map_size: MapSize::new(4, 4),
            walls: WallSet::new(),
        });
        let json = serde_json::to_value(&state).expect("state should serialize");
        assert_eq!(json["gameStep"], 0);
        assert_eq!(json["mapSize"]["width"], 4);
        assert!(json["eliminatedPlayers"].as_array().is_some());
    }
}
