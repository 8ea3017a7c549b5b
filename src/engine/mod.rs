use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_PLAYERS, DEFAULT_MOVE_MS};
use crate::grid::is_valid_position;
use crate::policy::{Board, GhostPolicy, MovementPolicy, PlayerPolicy};
use crate::rng::{RandomSource, Rng};
use crate::smooth::SmoothMovement;
use crate::types::{
    Direction, GameEvent, GameOverStatus, GameSetup, GameState, GhostLevel, PlayerRanking,
    Position, RenderSnapshot,
};

mod collision;
mod roster;

use self::collision::resolve_moves;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameEngineOptions {
    pub max_players: usize,
    pub ghost_level: GhostLevel,
    pub player_move_ms: u64,
    pub ghost_move_ms: u64,
    pub seed: u32,
}

impl Default for GameEngineOptions {
    fn default() -> Self {
        Self {
            max_players: DEFAULT_MAX_PLAYERS,
            ghost_level: GhostLevel::Basic,
            player_move_ms: DEFAULT_MOVE_MS,
            ghost_move_ms: DEFAULT_MOVE_MS,
            seed: 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GameEngine<R = Rng> {
    state: GameState,
    player_policies: Vec<PlayerPolicy>,
    player_movements: Vec<SmoothMovement>,
    speed_multipliers: Vec<f32>,
    ghost_policy: GhostPolicy,
    ghost_movement: SmoothMovement,
    options: GameEngineOptions,
    started: bool,
    events: Vec<GameEvent>,
    rng: R,
}

impl GameEngine<Rng> {
    pub fn new(setup: GameSetup, options: GameEngineOptions) -> Self {
        let rng = Rng::new(options.seed);
        Self::with_rng(setup, options, rng)
    }
}

impl<R: RandomSource> GameEngine<R> {
    pub fn with_rng(setup: GameSetup, options: GameEngineOptions, rng: R) -> Self {
        let state = GameState::from_setup(setup);
        let mut engine = Self {
            player_policies: Vec::new(),
            player_movements: Vec::new(),
            speed_multipliers: Vec::new(),
            ghost_policy: GhostPolicy::new(options.ghost_level),
            ghost_movement: SmoothMovement::with_duration(state.ghost, options.ghost_move_ms),
            state,
            options,
            started: false,
            events: Vec::new(),
            rng,
        };
        engine.rebuild_agents();
        engine
    }

    fn rebuild_agents(&mut self) {
        let count = self.state.players.len();
        self.player_policies = (0..count).map(|_| PlayerPolicy::new()).collect();
        self.player_movements = self
            .state
            .players
            .iter()
            .map(|pos| SmoothMovement::with_duration(*pos, self.options.player_move_ms))
            .collect();
        self.speed_multipliers = vec![1.0; count];
        self.ghost_policy = GhostPolicy::new(self.options.ghost_level);
        self.ghost_movement =
            SmoothMovement::with_duration(self.state.ghost, self.options.ghost_move_ms);
    }

    pub fn game_state(&self) -> GameState {
        self.state.clone()
    }

    pub fn options(&self) -> &GameEngineOptions {
        &self.options
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn start(&mut self) {
        self.started = true;
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advances one logic step and returns the resulting state.
    pub fn tick(&mut self, now_ms: u64) -> GameState {
        self.started = true;
        if self.game_over_status().is_over {
            self.state.game_step += 1;
            return self.state.clone();
        }

        let ghost_before = self.state.ghost;
        let before: Vec<(usize, Position)> = self
            .state
            .active_slots()
            .into_iter()
            .map(|slot| (slot, self.state.players[slot]))
            .collect();

        let planned = self.plan_player_moves(&before);
        let current: Vec<Position> = before.iter().map(|(_, pos)| *pos).collect();
        let resolved = resolve_moves(&current, &planned);
        self.commit_player_moves(&before, &resolved, now_ms);
        self.move_ghost(now_ms);
        self.resolve_captures(&before, ghost_before);
        self.conclude_if_over();

        self.state.game_step += 1;
        self.state.clone()
    }

    /// Advances only the visual interpolation of every entity.
    pub fn render_tick(&mut self, now_ms: u64) -> RenderSnapshot {
        for movement in &mut self.player_movements {
            movement.update(now_ms);
        }
        self.ghost_movement.update(now_ms);
        RenderSnapshot {
            state: self.state.clone(),
            players: self
                .player_movements
                .iter()
                .map(SmoothMovement::position)
                .collect(),
            ghost: self.ghost_movement.position(),
        }
    }

    fn plan_player_moves(&mut self, before: &[(usize, Position)]) -> Vec<Position> {
        let mut planned = Vec::with_capacity(before.len());
        for (slot, current) in before {
            let others: Vec<Position> = before
                .iter()
                .filter(|(other, _)| other != slot)
                .map(|(_, pos)| *pos)
                .collect();
            let board = Board {
                map_size: self.state.map_size,
                walls: &self.state.walls,
                ghost: Some(self.state.ghost),
                players: &others,
            };
            let dir = self.player_policies[*slot].next_move(*current, &board, &mut self.rng);
            let dest = current.offset(dir);
            if is_valid_position(dest, self.state.map_size, &self.state.walls, &[]) {
                planned.push(dest);
            } else {
                planned.push(*current);
            }
        }
        planned
    }

    fn commit_player_moves(
        &mut self,
        before: &[(usize, Position)],
        resolved: &[Position],
        now_ms: u64,
    ) {
        for ((slot, current), dest) in before.iter().zip(resolved) {
            let Some(dir) = Direction::between(*current, *dest) else {
                continue;
            };
            self.state.players[*slot] = *dest;
            let movement = &mut self.player_movements[*slot];
            if movement.logical() != *current {
                movement.jump_to(*current);
            }
            if !movement.start_move(dir, now_ms) {
                movement.jump_to(*dest);
            }
        }
    }

    fn move_ghost(&mut self, now_ms: u64) {
        let targets = self.state.active_positions();
        let board = Board {
            map_size: self.state.map_size,
            walls: &self.state.walls,
            ghost: None,
            players: &targets,
        };
        let current = self.state.ghost;
        let dir = self.ghost_policy.next_move(current, &board, &mut self.rng);
        if dir.is_stay() {
            return;
        }
        let dest = current.offset(dir);
        if !is_valid_position(dest, self.state.map_size, &self.state.walls, &[]) {
            return;
        }
        self.state.ghost = dest;
        if self.ghost_movement.logical() != current {
            self.ghost_movement.jump_to(current);
        }
        if !self.ghost_movement.start_move(dir, now_ms) {
            self.ghost_movement.jump_to(dest);
        }
    }

    /// Same-cell contact or crossing paths with the ghost eliminates a
    /// player. Simultaneous captures go in slot order, so the lower slot
    /// takes the worse rank.
    fn resolve_captures(&mut self, before: &[(usize, Position)], ghost_before: Position) {
        let ghost_now = self.state.ghost;
        let tick = self.state.game_step;
        for (slot, previous) in before {
            let now = self.state.players[*slot];
            let same_cell = now == ghost_now;
            let crossed = now == ghost_before && ghost_now == *previous;
            if !same_cell && !crossed {
                continue;
            }
            self.state.eliminated_players.push(*slot);
            let rank = self.state.active_slots().len() + 1;
            self.state.rankings.push(PlayerRanking {
                player_id: *slot,
                rank,
                eliminated_at: tick,
            });
            tracing::debug!(slot, rank, tick, crossed, "player eliminated");
            self.events.push(GameEvent::PlayerEliminated {
                slot: *slot,
                rank,
                tick,
            });
        }
    }

    /// Ranks the last player standing and announces the end of the game.
    fn conclude_if_over(&mut self) {
        self.crown_survivor();
        let status = self.game_over_status();
        if !status.is_over {
            return;
        }
        let rankings = self.rankings();
        tracing::info!(
            tick = self.state.game_step,
            winner = ?status.winner,
            players = status.total_players,
            "game over"
        );
        self.events.push(GameEvent::GameEnded {
            winner: status.winner,
            rankings,
        });
    }

    fn crown_survivor(&mut self) {
        if self.state.players.len() < 2 {
            return;
        }
        let active = self.state.active_slots();
        let [survivor] = active.as_slice() else {
            return;
        };
        if self.state.ranking_of(*survivor).is_some() {
            return;
        }
        self.state.rankings.push(PlayerRanking {
            player_id: *survivor,
            rank: 1,
            eliminated_at: self.state.game_step,
        });
    }

    /// The game ends with at most one player left, except that an empty
    /// roster is never over and a solo game ends only when its player is
    /// caught.
    pub fn game_over_status(&self) -> GameOverStatus {
        let total_players = self.state.players.len();
        let active = self.state.active_slots();
        let remaining_players = active.len();
        let is_over = match total_players {
            0 => false,
            1 => remaining_players == 0,
            _ => remaining_players <= 1,
        };
        let winner = if is_over && total_players >= 2 {
            active.first().copied()
        } else {
            None
        };
        GameOverStatus {
            is_over,
            winner,
            total_players,
            remaining_players,
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over_status().is_over
    }

    /// Rankings ordered from the winner down.
    pub fn rankings(&self) -> Vec<PlayerRanking> {
        let mut rankings = self.state.rankings.clone();
        rankings.sort_by(|a, b| a.rank.cmp(&b.rank).then(a.player_id.cmp(&b.player_id)));
        rankings
    }

    pub fn ghost_level(&self) -> GhostLevel {
        self.ghost_policy.level()
    }

    pub fn set_ghost_level(&mut self, level: GhostLevel) {
        self.options.ghost_level = level;
        self.ghost_policy.set_level(level);
    }

    pub fn player_speed(&self) -> u64 {
        self.options.player_move_ms
    }

    pub fn ghost_speed(&self) -> u64 {
        self.options.ghost_move_ms
    }

    /// Milliseconds per cell for every player, before per-player multipliers.
    pub fn set_player_speed(&mut self, move_ms: u64) {
        self.options.player_move_ms = move_ms;
        for slot in 0..self.player_movements.len() {
            self.apply_player_duration(slot);
        }
    }

    pub fn set_ghost_speed(&mut self, move_ms: u64) {
        self.options.ghost_move_ms = move_ms;
        self.ghost_movement.set_duration_ms(move_ms);
    }

    /// A multiplier of 2 halves that player's move duration.
    pub fn set_player_speed_multiplier(&mut self, slot: usize, multiplier: f32) -> bool {
        let usable = multiplier.is_finite() && multiplier > 0.0;
        if slot >= self.speed_multipliers.len() || !usable {
            return false;
        }
        self.speed_multipliers[slot] = multiplier;
        self.apply_player_duration(slot);
        true
    }

    fn apply_player_duration(&mut self, slot: usize) {
        let multiplier = self.speed_multipliers.get(slot).copied().unwrap_or(1.0);
        let duration = (self.options.player_move_ms as f32 / multiplier).round() as u64;
        if let Some(movement) = self.player_movements.get_mut(slot) {
            movement.set_duration_ms(duration);
        }
    }

    pub fn max_players(&self) -> usize {
        self.options.max_players
    }

    pub fn set_max_players(&mut self, max_players: usize) {
        self.options.max_players = max_players;
    }

    pub fn player_movement(&self, slot: usize) -> Option<&SmoothMovement> {
        self.player_movements.get(slot)
    }

    pub fn ghost_movement(&self) -> &SmoothMovement {
        &self.ghost_movement
    }

    pub fn ghost_policy(&self) -> &GhostPolicy {
        &self.ghost_policy
    }

    /// Replaces the whole game. Options and the random source carry over.
    pub fn reset_game(&mut self, setup: GameSetup) {
        self.state = GameState::from_setup(setup);
        self.started = false;
        self.rebuild_agents();
        self.events.push(GameEvent::GameReset);
    }
}
