pub const TICK_MS: u64 = 300;
pub const DEFAULT_MOVE_MS: u64 = 200;
pub const DEFAULT_MAX_PLAYERS: usize = 10;

pub const MOVEMENT_HISTORY_LEN: usize = 4;
pub const TARGET_HISTORY_LEN: usize = 5;

pub const BASE_DIRECTION_WEIGHT: f32 = 1.0;
pub const REVERSE_DIRECTION_WEIGHT: f32 = 0.1;
pub const MIN_CONTINUITY_BONUS: f32 = 3.0;
pub const MAX_CONTINUITY_BONUS: f32 = 10.0;

pub const FLEE_RADIUS: i32 = 3;
pub const FLEE_BONUS: f32 = 5.0;
pub const FLEE_PENALTY: f32 = 0.3;
pub const RECENT_CELL_PENALTY: f32 = 0.5;
pub const RANDOM_MOVE_CHANCE: f32 = 0.25;

pub const CHASE_BONUS: f32 = 3.0;
pub const PREDICTION_BLEND: f32 = 0.7;
pub const CORNERED_ESCAPE_ROUTES: usize = 2;
pub const CORNERED_BONUS: f32 = 2.0;
pub const OPTIMAL_AXIS_BONUS: f32 = 4.0;
pub const PATTERN_BONUS: f32 = 0.5;
pub const CLUSTER_RADIUS: i32 = 4;
pub const CLUSTER_BONUS_PER_PLAYER: f32 = 0.5;
pub const BACK_OFF_CHANCE: f32 = 0.1;
pub const BACK_OFF_DISTANCE: i32 = 3;
pub const BACK_OFF_FACTOR: f32 = 0.3;

/// Progress past which a moving entity accepts its next move.
pub const MOVE_REQUEUE_PROGRESS: f32 = 0.5;

pub const MAZE_CONNECTOR_CHANCE: f32 = 0.7;
pub const DEFAULT_WALL_DENSITY: f32 = 0.2;

pub const DEFAULT_EFFECT_MS: u64 = 3_000;
pub const DEFAULT_EFFECT_MULTIPLIER: f32 = 2.0;

pub fn continuity_bonus(streak: u32) -> f32 {
    (2.0 * streak as f32).clamp(MIN_CONTINUITY_BONUS, MAX_CONTINUITY_BONUS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuity_bonus_grows_then_caps() {
        assert_eq!(continuity_bonus(1), MIN_CONTINUITY_BONUS);
        assert!(continuity_bonus(3) > continuity_bonus(2));
        assert_eq!(continuity_bonus(5), MAX_CONTINUITY_BONUS);
        assert_eq!(continuity_bonus(50), MAX_CONTINUITY_BONUS);
    }
}
