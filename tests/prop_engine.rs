//! Property-based tests for the tick loop and weighted selection.

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;

use proptest::prelude::*;

use ghost_chase::engine::{GameEngine, GameEngineOptions};
use ghost_chase::maps::{open_map, random_map, MapLayout};
use ghost_chase::policy::{select_weighted, DirectionWeights};
use ghost_chase::rng::{Rng, ScriptedRng};
use ghost_chase::types::{Direction, GameSetup, GhostLevel, Position};

fn build_engine(layout: MapLayout, players: usize, level: i32, seed: u32) -> GameEngine {
    let center = Position::new(layout.map_size.width / 2, layout.map_size.height / 2);
    let ghost = ghost_chase::grid::nearest_free_cell(center, layout.map_size, &layout.walls, &[])
        .unwrap_or(center);
    let mut engine = GameEngine::new(
        GameSetup {
            players: Vec::new(),
            ghost,
            map_size: layout.map_size,
            walls: layout.walls,
        },
        GameEngineOptions {
            ghost_level: GhostLevel::from_number(level),
            seed,
            ..GameEngineOptions::default()
        },
    );
    for _ in 0..players {
        if engine.add_player_to_corner().is_err() {
            break;
        }
    }
    engine
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Each tick advances the step by one and never stacks active players.
    #[test]
    fn prop_tick_keeps_board_consistent(
        seed in any::<u32>(),
        players in 1usize..8,
        level in 1i32..=4,
        dense in any::<bool>(),
    ) {
        let layout = if dense {
            let mut map_rng = Rng::new(seed.rotate_left(7));
            random_map(13, 11, Some(0.15), &mut map_rng)
        } else {
            open_map(11, 9)
        };
        let mut engine = build_engine(layout, players, level, seed);

        let mut previous = engine.game_state().game_step;
        for tick in 1..=150u64 {
            let state = engine.tick(tick * 300);
            prop_assert_eq!(state.game_step, previous + 1);
            previous = state.game_step;

            let mut occupied = HashSet::new();
            for slot in state.active_slots() {
                let pos = state.players[slot];
                prop_assert!(occupied.insert(pos), "shared cell {:?}", pos);
                prop_assert!(!state.walls.contains(pos));
                prop_assert!(state.map_size.contains(pos));
            }
            prop_assert!(!state.walls.contains(state.ghost));
        }
    }

    /// Ranks are distinct, within the roster size, and complete once the
    /// game is over, even when a player leaves partway through.
    #[test]
    fn prop_rankings_form_a_permutation(
        seed in any::<u32>(),
        players in 2usize..6,
        level in 1i32..=4,
        removal in proptest::option::of((1u64..60, any::<prop::sample::Index>())),
    ) {
        let mut engine = build_engine(open_map(9, 7), players, level, seed);

        for tick in 1..=600u64 {
            engine.tick(tick * 300);
            if let Some((at, index)) = &removal {
                if *at == tick {
                    let roster = engine.game_state().players.len();
                    prop_assert!(engine.remove_player(index.index(roster)));
                }
            }
            let total = engine.game_state().players.len();
            let rankings = engine.rankings();

            let ids: HashSet<usize> = rankings.iter().map(|r| r.player_id).collect();
            prop_assert_eq!(ids.len(), rankings.len());
            let ranks: HashSet<usize> = rankings.iter().map(|r| r.rank).collect();
            prop_assert_eq!(ranks.len(), rankings.len());
            prop_assert!(rankings.iter().all(|r| r.rank >= 1 && r.rank <= total));

            if engine.is_game_over() {
                let mut sorted: Vec<usize> = ranks.into_iter().collect();
                sorted.sort_unstable();
                prop_assert_eq!(sorted, (1..=total).collect::<Vec<_>>());
                break;
            }
        }
    }

    /// Only positive-weight directions are ever drawn.
    #[test]
    fn prop_select_weighted_skips_non_positive(
        weights in proptest::collection::vec(0.0f32..5.0, 4),
        zero_mask in proptest::collection::vec(any::<bool>(), 4),
        draw in 0.0f32..1.0,
    ) {
        let mut table = DirectionWeights::default();
        for ((dir, weight), zero) in Direction::ALL.into_iter().zip(&weights).zip(&zero_mask) {
            table.set(dir, if *zero { 0.0 } else { *weight });
        }
        let mut rng = ScriptedRng::constant(draw);
        match select_weighted(&table, &mut rng) {
            Some(dir) => prop_assert!(table.get(dir).unwrap() > 0.0),
            None => prop_assert!(table.total() <= 0.0),
        }
    }
}

#[test]
fn select_weighted_on_all_zero_weights_is_none() {
    let mut table = DirectionWeights::default();
    for dir in Direction::ALL {
        table.set(dir, 0.0);
    }
    let mut rng = Rng::new(1);
    assert_eq!(select_weighted(&table, &mut rng), None);
}
