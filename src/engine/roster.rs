use crate::error::{EngineError, EngineResult};
use crate::grid::{first_free_interior_cell, is_valid_position, nearest_free_cell};
use crate::policy::PlayerPolicy;
use crate::rng::RandomSource;
use crate::smooth::SmoothMovement;
use crate::types::{Direction, GameEvent, MapSize, Position, WallSet};

use super::GameEngine;

impl<R: RandomSource> GameEngine<R> {
    /// Cells a new or teleported player must avoid: every active player and
    /// the ghost.
    fn blocked_cells(&self, exclude_slot: Option<usize>) -> Vec<Position> {
        let mut blocked: Vec<Position> = self
            .state
            .active_slots()
            .into_iter()
            .filter(|slot| Some(*slot) != exclude_slot)
            .map(|slot| self.state.players[slot])
            .collect();
        blocked.push(self.state.ghost);
        blocked
    }

    pub fn is_position_available(&self, pos: Position) -> bool {
        is_valid_position(
            pos,
            self.state.map_size,
            &self.state.walls,
            &self.blocked_cells(None),
        )
    }

    fn ensure_can_add(&self) -> EngineResult<()> {
        if self.is_game_over() {
            return Err(EngineError::GameOver);
        }
        if self.state.players.len() >= self.options.max_players {
            return Err(EngineError::CapacityExceeded {
                max_players: self.options.max_players,
            });
        }
        Ok(())
    }

    /// Adds a player next to an existing one, or at the first free interior
    /// cell when no neighbor is free.
    pub fn add_player(&mut self) -> EngineResult<usize> {
        self.ensure_can_add()?;
        let blocked = self.blocked_cells(None);
        let beside_player = self.state.active_positions().into_iter().find_map(|anchor| {
            Direction::ALL.into_iter().map(|dir| anchor.offset(dir)).find(|cell| {
                is_valid_position(*cell, self.state.map_size, &self.state.walls, &blocked)
            })
        });
        let pos = beside_player
            .or_else(|| first_free_interior_cell(self.state.map_size, &self.state.walls, &blocked))
            .ok_or(EngineError::NoFreeCell)?;
        Ok(self.push_player(pos))
    }

    /// Adds a player at `pos` when it is free, otherwise at a corner.
    pub fn add_player_at(&mut self, pos: Position) -> EngineResult<usize> {
        self.ensure_can_add()?;
        if self.is_position_available(pos) {
            return Ok(self.push_player(pos));
        }
        self.add_player_to_corner()
    }

    /// Targets the four inner corners in turn by roster size and takes the
    /// free cell closest to the chosen one.
    pub fn add_player_to_corner(&mut self) -> EngineResult<usize> {
        self.ensure_can_add()?;
        let corners = self.state.map_size.inner_corners();
        let corner = corners[self.state.players.len() % corners.len()];
        let pos = nearest_free_cell(
            corner,
            self.state.map_size,
            &self.state.walls,
            &self.blocked_cells(None),
        )
        .ok_or(EngineError::NoFreeCell)?;
        Ok(self.push_player(pos))
    }

    fn push_player(&mut self, pos: Position) -> usize {
        let slot = self.state.players.len();
        self.state.players.push(pos);
        self.player_policies.push(PlayerPolicy::new());
        self.player_movements
            .push(SmoothMovement::with_duration(pos, self.options.player_move_ms));
        self.speed_multipliers.push(1.0);
        tracing::debug!(slot, x = pos.x, y = pos.y, "player joined");
        self.events.push(GameEvent::PlayerJoined {
            slot,
            position: pos,
        });
        slot
    }

    /// Drops the player at `slot` and shifts every later slot down by one in
    /// the eliminated set and the rankings. Ranks are renumbered to the
    /// smaller roster, and a removal that leaves one player standing ends
    /// the game. A crowned survivor left alone in a solo roster loses its
    /// rank and plays on.
    pub fn remove_player(&mut self, slot: usize) -> bool {
        if slot >= self.state.players.len() {
            return false;
        }
        let was_over = self.is_game_over();
        self.state.players.remove(slot);
        self.player_policies.remove(slot);
        self.player_movements.remove(slot);
        self.speed_multipliers.remove(slot);

        self.state.eliminated_players.retain(|eliminated| *eliminated != slot);
        for eliminated in &mut self.state.eliminated_players {
            if *eliminated > slot {
                *eliminated -= 1;
            }
        }
        self.state.rankings.retain(|ranking| ranking.player_id != slot);
        for ranking in &mut self.state.rankings {
            if ranking.player_id > slot {
                ranking.player_id -= 1;
            }
        }

        self.renumber_rankings();
        if !self.is_game_over() {
            let eliminated = &self.state.eliminated_players;
            self.state
                .rankings
                .retain(|ranking| eliminated.contains(&ranking.player_id));
        }

        tracing::debug!(slot, "player left");
        self.events.push(GameEvent::PlayerLeft { slot });
        if !was_over {
            self.conclude_if_over();
        }
        true
    }

    /// Eliminated players keep their order and take the bottom ranks of the
    /// current roster.
    fn renumber_rankings(&mut self) {
        let total = self.state.players.len();
        let eliminated = &self.state.eliminated_players;
        let mut order: Vec<usize> = (0..self.state.rankings.len())
            .filter(|index| eliminated.contains(&self.state.rankings[*index].player_id))
            .collect();
        order.sort_by(|a, b| {
            self.state.rankings[*b]
                .rank
                .cmp(&self.state.rankings[*a].rank)
        });
        for (offset, index) in order.into_iter().enumerate() {
            self.state.rankings[index].rank = total - offset;
        }
    }

    /// Moves an active player to a free cell with no animation.
    pub fn teleport_player(&mut self, slot: usize, pos: Position) -> bool {
        if slot >= self.state.players.len() || self.state.is_eliminated(slot) {
            return false;
        }
        let blocked = self.blocked_cells(Some(slot));
        if !is_valid_position(pos, self.state.map_size, &self.state.walls, &blocked) {
            return false;
        }
        self.state.players[slot] = pos;
        self.player_movements[slot].jump_to(pos);
        true
    }

    /// Swaps in a new map before the game starts and moves every player to
    /// the corners in turn. Returns `false` once the game has started.
    pub fn change_map(&mut self, map_size: MapSize, walls: WallSet) -> bool {
        if self.started {
            tracing::debug!("map change rejected after start");
            return false;
        }
        self.state.map_size = map_size;
        self.state.walls = walls;

        if !is_valid_position(self.state.ghost, map_size, &self.state.walls, &[]) {
            let center = Position::new(map_size.width / 2, map_size.height / 2);
            if let Some(pos) = nearest_free_cell(center, map_size, &self.state.walls, &[]) {
                self.state.ghost = pos;
            }
        }

        let corners = map_size.inner_corners();
        let mut placed: Vec<Position> = Vec::with_capacity(self.state.players.len());
        for slot in 0..self.state.players.len() {
            let corner = corners[slot % corners.len()];
            let mut blocked = placed.clone();
            blocked.push(self.state.ghost);
            let pos =
                nearest_free_cell(corner, map_size, &self.state.walls, &blocked).unwrap_or(corner);
            placed.push(pos);
        }
        self.state.players = placed;
        self.state.eliminated_players.clear();
        self.state.rankings.clear();
        self.state.game_step = 0;
        self.rebuild_agents();
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::{GameEngine, GameEngineOptions};
    use crate::error::EngineError;
    use crate::maps::{from_pattern, open_map, pacman_map};
    use crate::types::{GameEvent, GameSetup, PlayerRanking, Position};

    fn engine_with(players: Vec<Position>, max_players: usize) -> GameEngine {
        let layout = open_map(9, 9);
        GameEngine::new(
            GameSetup {
                players,
                ghost: Position::new(4, 4),
                map_size: layout.map_size,
                walls: layout.walls,
            },
            GameEngineOptions {
                max_players,
                ..GameEngineOptions::default()
            },
        )
    }

    #[test]
    fn add_beyond_capacity_fails_and_leaves_roster_alone() {
        let mut engine = engine_with(vec![Position::new(1, 1), Position::new(7, 7)], 2);
        let before = engine.game_state();
        assert_eq!(
            engine.add_player(),
            Err(EngineError::CapacityExceeded { max_players: 2 })
        );
        assert_eq!(
            engine.add_player_to_corner(),
            Err(EngineError::CapacityExceeded { max_players: 2 })
        );
        assert_eq!(engine.game_state(), before);
        assert!(engine.drain_events().is_empty());
    }

    #[test]
    fn add_player_lands_next_to_an_existing_player() {
        let mut engine = engine_with(vec![Position::new(1, 1)], 4);
        let slot = engine.add_player().expect("room for a player");
        assert_eq!(slot, 1);
        let state = engine.game_state();
        assert_eq!(state.players[1], Position::new(1, 2));
        assert_eq!(engine.player_movement(1).map(|m| m.logical()), Some(state.players[1]));
    }

    #[test]
    fn add_player_falls_back_to_raster_scan() {
        let mut engine = engine_with(Vec::new(), 4);
        engine.add_player().expect("room for a player");
        assert_eq!(engine.game_state().players[0], Position::new(1, 1));
    }

    #[test]
    fn corner_seeking_rotates_through_corners() {
        let mut engine = engine_with(Vec::new(), 8);
        for _ in 0..5 {
            engine.add_player_to_corner().expect("room for a player");
        }
        let players = engine.game_state().players;
        assert_eq!(players[0], Position::new(1, 1));
        assert_eq!(players[1], Position::new(7, 1));
        assert_eq!(players[2], Position::new(1, 7));
        assert_eq!(players[3], Position::new(7, 7));
        assert_eq!(players[4].manhattan(Position::new(1, 1)), 1);
    }

    #[test]
    fn add_player_at_taken_cell_goes_to_corner() {
        let mut engine = engine_with(vec![Position::new(3, 3)], 4);
        engine.add_player_at(Position::new(5, 5)).expect("free cell");
        engine.add_player_at(Position::new(4, 4)).expect("ghost cell redirects");
        let players = engine.game_state().players;
        assert_eq!(players[1], Position::new(5, 5));
        assert_eq!(players[2], Position::new(1, 7));
    }

    #[test]
    fn full_board_reports_no_free_cell() {
        let layout = from_pattern(&["####", "#..#", "####"]);
        let mut engine = GameEngine::new(
            GameSetup {
                players: vec![Position::new(1, 1)],
                ghost: Position::new(2, 1),
                map_size: layout.map_size,
                walls: layout.walls,
            },
            GameEngineOptions::default(),
        );
        assert_eq!(engine.add_player(), Err(EngineError::NoFreeCell));
        assert_eq!(engine.add_player_to_corner(), Err(EngineError::NoFreeCell));
    }

    #[test]
    fn remove_player_compacts_eliminations_and_rankings() {
        let mut engine = engine_with(
            vec![
                Position::new(1, 1),
                Position::new(3, 1),
                Position::new(5, 1),
                Position::new(7, 1),
            ],
            4,
        );
        engine.state.eliminated_players = vec![1, 3];
        engine.state.rankings = vec![
            PlayerRanking {
                player_id: 1,
                rank: 4,
                eliminated_at: 2,
            },
            PlayerRanking {
                player_id: 3,
                rank: 3,
                eliminated_at: 6,
            },
        ];

        assert!(engine.remove_player(1));
        let state = engine.game_state();
        assert_eq!(state.players.len(), 3);
        assert_eq!(state.eliminated_players, vec![2]);
        assert_eq!(state.rankings.len(), 1);
        assert_eq!(state.rankings[0].player_id, 2);
        assert_eq!(state.rankings[0].rank, 3);

        assert!(!engine.remove_player(9));
        assert!(engine
            .drain_events()
            .contains(&GameEvent::PlayerLeft { slot: 1 }));
    }

    /// Slot 0 sits in a dead end next to the ghost and is caught on the
    /// first tick; every other player is sealed in its own cell.
    fn sealed_engine(players: usize) -> GameEngine {
        let layout = from_pattern(&["##########", "#..#.#.#.#", "##########"]);
        let cells = [
            Position::new(1, 1),
            Position::new(4, 1),
            Position::new(6, 1),
            Position::new(8, 1),
        ];
        GameEngine::new(
            GameSetup {
                players: cells[..players].to_vec(),
                ghost: Position::new(2, 1),
                map_size: layout.map_size,
                walls: layout.walls,
            },
            GameEngineOptions::default(),
        )
    }

    #[test]
    fn removing_active_players_after_an_elimination_renumbers_ranks() {
        let mut engine = sealed_engine(4);
        engine.tick(0);
        assert_eq!(engine.game_state().eliminated_players, vec![0]);
        assert_eq!(engine.rankings()[0].rank, 4);

        assert!(engine.remove_player(3));
        assert!(!engine.is_game_over());
        assert_eq!(
            engine.rankings(),
            vec![PlayerRanking {
                player_id: 0,
                rank: 3,
                eliminated_at: 0,
            }]
        );
    }

    #[test]
    fn removal_that_leaves_one_player_crowns_the_survivor() {
        let mut engine = sealed_engine(4);
        engine.tick(0);
        engine.drain_events();
        assert!(engine.remove_player(3));
        assert!(engine.remove_player(2));

        let status = engine.game_over_status();
        assert!(status.is_over);
        assert_eq!(status.winner, Some(1));
        assert_eq!(status.total_players, 2);
        let rankings = engine.rankings();
        assert_eq!((rankings[0].player_id, rankings[0].rank), (1, 1));
        assert_eq!((rankings[1].player_id, rankings[1].rank), (0, 2));
        let events = engine.drain_events();
        assert!(matches!(
            events.last(),
            Some(GameEvent::GameEnded {
                winner: Some(1),
                ..
            })
        ));

        engine.tick(300);
        assert_eq!(engine.rankings(), rankings);
    }

    #[test]
    fn survivor_left_alone_plays_on_unranked() {
        let mut engine = sealed_engine(2);
        engine.tick(0);
        assert_eq!(engine.rankings().len(), 2);

        assert!(engine.remove_player(0));
        assert!(!engine.is_game_over());
        assert!(engine.rankings().is_empty());
        assert_eq!(engine.game_state().players, vec![Position::new(4, 1)]);
    }

    #[test]
    fn adds_are_rejected_once_the_game_is_over() {
        let mut engine = sealed_engine(2);
        engine.tick(0);
        assert!(engine.is_game_over());
        let before = engine.game_state();

        assert_eq!(engine.add_player(), Err(EngineError::GameOver));
        assert_eq!(
            engine.add_player_at(Position::new(2, 1)),
            Err(EngineError::GameOver)
        );
        assert_eq!(engine.add_player_to_corner(), Err(EngineError::GameOver));
        assert_eq!(engine.game_state(), before);
        assert!(engine.is_game_over());
    }

    #[test]
    fn teleport_requires_a_free_cell() {
        let mut engine = engine_with(vec![Position::new(1, 1), Position::new(7, 7)], 4);
        assert!(!engine.teleport_player(0, Position::new(7, 7)));
        assert!(!engine.teleport_player(0, Position::new(4, 4)));
        assert!(!engine.teleport_player(0, Position::new(0, 0)));
        assert!(engine.teleport_player(0, Position::new(2, 6)));
        assert_eq!(engine.game_state().players[0], Position::new(2, 6));
        assert_eq!(
            engine.player_movement(0).map(|m| m.logical()),
            Some(Position::new(2, 6))
        );
    }

    #[test]
    fn map_change_relocates_players_to_corners() {
        let mut engine = engine_with(
            vec![
                Position::new(3, 3),
                Position::new(4, 3),
                Position::new(5, 3),
            ],
            4,
        );
        let layout = pacman_map();
        assert!(engine.change_map(layout.map_size, layout.walls.clone()));

        let state = engine.game_state();
        assert_eq!(state.map_size, layout.map_size);
        assert_eq!(state.players[0], Position::new(1, 1));
        assert_eq!(state.players[1], Position::new(18, 1));
        assert_eq!(state.players[2], Position::new(1, 11));
        for pos in &state.players {
            assert!(!layout.walls.contains(*pos));
        }
        assert!(!layout.walls.contains(state.ghost));
    }

    #[test]
    fn map_change_after_start_is_rejected() {
        let mut engine = engine_with(vec![Position::new(1, 1)], 4);
        engine.tick(0);
        let layout = pacman_map();
        assert!(!engine.change_map(layout.map_size, layout.walls));
        assert_eq!(engine.game_state().map_size, open_map(9, 9).map_size);
    }
}
