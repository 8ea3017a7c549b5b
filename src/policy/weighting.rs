use std::collections::VecDeque;

use crate::constants::{
    continuity_bonus, BASE_DIRECTION_WEIGHT, MOVEMENT_HISTORY_LEN, REVERSE_DIRECTION_WEIGHT,
};
use crate::rng::RandomSource;
use crate::types::{Direction, Position};

/// Bounded FIFO of an agent's most recent cells.
#[derive(Clone, Debug)]
pub struct MovementHistory {
    positions: VecDeque<Position>,
    capacity: usize,
}

impl MovementHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            positions: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, pos: Position) {
        self.positions.push_back(pos);
        while self.positions.len() > self.capacity {
            self.positions.pop_front();
        }
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.positions.contains(&pos)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Position> {
        self.positions.iter()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DirectionWeights {
    entries: Vec<(Direction, f32)>,
}

impl DirectionWeights {
    pub fn get(&self, dir: Direction) -> Option<f32> {
        self.entries
            .iter()
            .find(|(candidate, _)| *candidate == dir)
            .map(|(_, weight)| *weight)
    }

    pub fn set(&mut self, dir: Direction, weight: f32) {
        match self.entries.iter_mut().find(|(candidate, _)| *candidate == dir) {
            Some(entry) => entry.1 = weight,
            None => self.entries.push((dir, weight)),
        }
    }

    pub fn add(&mut self, dir: Direction, amount: f32) {
        if let Some(weight) = self.get(dir) {
            self.set(dir, weight + amount);
        }
    }

    pub fn scale(&mut self, dir: Direction, factor: f32) {
        if let Some(weight) = self.get(dir) {
            self.set(dir, weight * factor);
        }
    }

    pub fn directions(&self) -> Vec<Direction> {
        self.entries.iter().map(|(dir, _)| *dir).collect()
    }

    /// Directions that can still be drawn.
    pub fn live_directions(&self) -> Vec<Direction> {
        self.entries
            .iter()
            .filter(|(_, weight)| *weight > 0.0)
            .map(|(dir, _)| *dir)
            .collect()
    }

    pub fn total(&self) -> f32 {
        self.entries
            .iter()
            .map(|(_, weight)| weight.max(0.0))
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Direction, f32)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Recent cells, last direction and straight-run length shared by every
/// policy.
#[derive(Clone, Debug)]
pub struct MovementCore {
    history: MovementHistory,
    last_direction: Option<Direction>,
    streak: u32,
}

impl Default for MovementCore {
    fn default() -> Self {
        Self::new(MOVEMENT_HISTORY_LEN)
    }
}

impl MovementCore {
    pub fn new(history_len: usize) -> Self {
        Self {
            history: MovementHistory::new(history_len),
            last_direction: None,
            streak: 0,
        }
    }

    pub fn history(&self) -> &MovementHistory {
        &self.history
    }

    pub fn last_direction(&self) -> Option<Direction> {
        self.last_direction
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn direction_weights(&self, candidates: &[Direction]) -> DirectionWeights {
        let mut weights = DirectionWeights::default();
        for dir in candidates {
            let mut weight = BASE_DIRECTION_WEIGHT;
            if let Some(last) = self.last_direction {
                if *dir == last {
                    weight += continuity_bonus(self.streak);
                } else if *dir == last.opposite() {
                    weight = REVERSE_DIRECTION_WEIGHT;
                }
            }
            weights.set(*dir, weight);
        }
        weights
    }

    pub fn record(&mut self, from: Position, chosen: Direction) {
        if self.last_direction == Some(chosen) {
            self.streak = self.streak.saturating_add(1);
        } else {
            self.streak = 1;
        }
        self.last_direction = Some(chosen);
        self.history.push(from);
    }
}

/// Cumulative draw over the positive-weight entries, in insertion order.
/// Returns `None` when nothing has positive weight.
pub fn select_weighted(
    weights: &DirectionWeights,
    rng: &mut dyn RandomSource,
) -> Option<Direction> {
    let live: Vec<(Direction, f32)> = weights
        .iter()
        .filter(|(_, weight)| *weight > 0.0)
        .copied()
        .collect();
    let total: f32 = live.iter().map(|(_, weight)| weight).sum();
    if live.is_empty() || total <= 0.0 {
        return None;
    }
    let mut threshold = rng.next_f32() * total;
    for (dir, weight) in &live {
        threshold -= weight;
        if threshold <= 0.0 {
            return Some(*dir);
        }
    }
    live.last().map(|(dir, _)| *dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MIN_CONTINUITY_BONUS;
    use crate::rng::ScriptedRng;

    #[test]
    fn history_drops_oldest_cell() {
        let mut history = MovementHistory::new(2);
        history.push(Position::new(1, 1));
        history.push(Position::new(2, 1));
        history.push(Position::new(3, 1));
        assert_eq!(history.len(), 2);
        assert!(!history.contains(Position::new(1, 1)));
        assert!(history.contains(Position::new(3, 1)));
    }

    #[test]
    fn weights_favor_straight_runs_and_suppress_reversal() {
        let mut core = MovementCore::default();
        core.record(Position::new(1, 1), Direction::RIGHT);
        let weights = core.direction_weights(&Direction::ALL);
        assert_eq!(
            weights.get(Direction::RIGHT),
            Some(BASE_DIRECTION_WEIGHT + MIN_CONTINUITY_BONUS)
        );
        assert_eq!(weights.get(Direction::LEFT), Some(REVERSE_DIRECTION_WEIGHT));
        assert_eq!(weights.get(Direction::UP), Some(BASE_DIRECTION_WEIGHT));
    }

    #[test]
    fn continuity_bonus_scales_with_streak() {
        let mut core = MovementCore::default();
        core.record(Position::new(1, 1), Direction::DOWN);
        let first = core.direction_weights(&[Direction::DOWN]).get(Direction::DOWN);
        core.record(Position::new(1, 2), Direction::DOWN);
        core.record(Position::new(1, 3), Direction::DOWN);
        let third = core.direction_weights(&[Direction::DOWN]).get(Direction::DOWN);
        assert_eq!(core.streak(), 3);
        assert!(third > first);

        core.record(Position::new(1, 4), Direction::LEFT);
        assert_eq!(core.streak(), 1);
    }

    #[test]
    fn select_weighted_walks_cumulative_weights() {
        let mut weights = DirectionWeights::default();
        weights.set(Direction::UP, 1.0);
        weights.set(Direction::DOWN, 3.0);

        let mut low = ScriptedRng::constant(0.1);
        assert_eq!(select_weighted(&weights, &mut low), Some(Direction::UP));
        let mut high = ScriptedRng::constant(0.5);
        assert_eq!(select_weighted(&weights, &mut high), Some(Direction::DOWN));
    }

    #[test]
    fn select_weighted_skips_zero_weights_and_reports_empty() {
        let mut weights = DirectionWeights::default();
        weights.set(Direction::UP, 0.0);
        let mut rng = ScriptedRng::constant(0.3);
        assert_eq!(select_weighted(&weights, &mut rng), None);

        weights.set(Direction::LEFT, 2.0);
        for _ in 0..10 {
            assert_eq!(select_weighted(&weights, &mut rng), Some(Direction::LEFT));
        }
    }
}
