use serde::Serialize;

use crate::constants::{DEFAULT_MOVE_MS, MOVE_REQUEUE_PROGRESS};
use crate::types::{Direction, Position, SmoothPosition, VisualPosition};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementState {
    Idle,
    Moving,
}

/// One in-flight visual transition between two adjacent cells.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Movement {
    pub from: Position,
    pub to: Position,
    pub start_ms: u64,
    pub duration_ms: u64,
    pub progress: f32,
}

/// Bridges the logic tick and the render frame for a single entity.
///
/// The logical cell jumps as soon as a move starts; the visual position
/// follows over `duration_ms` and depends only on the timestamps passed to
/// [`SmoothMovement::update`], never on how often it is called.
#[derive(Clone, Debug)]
pub struct SmoothMovement {
    logical: Position,
    visual: VisualPosition,
    current: Option<Movement>,
    queued: Option<Direction>,
    state: MovementState,
    duration_ms: u64,
}

impl SmoothMovement {
    pub fn new(initial: Position) -> Self {
        Self::with_duration(initial, DEFAULT_MOVE_MS)
    }

    pub fn with_duration(initial: Position, duration_ms: u64) -> Self {
        Self {
            logical: initial,
            visual: initial.into(),
            current: None,
            queued: None,
            state: MovementState::Idle,
            duration_ms,
        }
    }

    pub fn position(&self) -> SmoothPosition {
        SmoothPosition {
            logical: self.logical,
            visual: self.visual,
        }
    }

    pub fn logical(&self) -> Position {
        self.logical
    }

    pub fn visual(&self) -> VisualPosition {
        self.visual
    }

    pub fn state(&self) -> MovementState {
        self.state
    }

    pub fn current_move(&self) -> Option<&Movement> {
        self.current.as_ref()
    }

    pub fn queued_direction(&self) -> Option<Direction> {
        self.queued
    }

    pub fn is_moving(&self) -> bool {
        self.state == MovementState::Moving
    }

    pub fn can_move(&self) -> bool {
        match self.state {
            MovementState::Idle => true,
            MovementState::Moving => self
                .current
                .map(|movement| movement.progress > MOVE_REQUEUE_PROGRESS)
                .unwrap_or(true),
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Applies to moves started after this call.
    pub fn set_duration_ms(&mut self, duration_ms: u64) {
        self.duration_ms = duration_ms;
    }

    pub fn queue_direction(&mut self, dir: Direction) {
        self.queued = Some(dir);
    }

    /// Commits the logical cell one step in `dir` and starts animating toward
    /// it. Returns `false` without changing anything when a move is still in
    /// its first half.
    pub fn start_move(&mut self, dir: Direction, now_ms: u64) -> bool {
        if !self.can_move() {
            return false;
        }
        let target = self.logical.offset(dir);
        self.current = Some(Movement {
            from: self.logical,
            to: target,
            start_ms: now_ms,
            duration_ms: self.duration_ms,
            progress: 0.0,
        });
        self.logical = target;
        self.state = MovementState::Moving;
        true
    }

    /// Advances the visual position to `now_ms`. Returns `true` when a move
    /// finished during this call.
    pub fn update(&mut self, now_ms: u64) -> bool {
        let Some(mut movement) = self.current else {
            return false;
        };
        if self.state == MovementState::Idle {
            return false;
        }

        let elapsed = now_ms.saturating_sub(movement.start_ms);
        movement.progress = if movement.duration_ms == 0 {
            1.0
        } else {
            (elapsed as f32 / movement.duration_ms as f32).min(1.0)
        };

        let t = ease_in_out(movement.progress);
        self.visual = VisualPosition {
            x: movement.from.x as f32 + (movement.to.x - movement.from.x) as f32 * t,
            y: movement.from.y as f32 + (movement.to.y - movement.from.y) as f32 * t,
        };

        if movement.progress >= 1.0 {
            self.visual = movement.to.into();
            self.current = None;
            self.state = MovementState::Idle;
            if let Some(next) = self.queued.take() {
                self.start_move(next, now_ms);
            }
            return true;
        }

        self.current = Some(movement);
        false
    }

    /// Cancels any transition, snaps the visual to the logical cell and
    /// drops the queued direction.
    pub fn force_stop(&mut self) {
        if self.current.take().is_some() {
            self.visual = self.logical.into();
        }
        self.state = MovementState::Idle;
        self.queued = None;
    }

    /// Moves both positions to `pos` with no animation.
    pub fn jump_to(&mut self, pos: Position) {
        self.logical = pos;
        self.current = None;
        self.visual = pos.into();
        self.state = MovementState::Idle;
        self.queued = None;
    }
}

/// Quadratic ease-in-out over `[0, 1]`.
pub fn ease_in_out(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        -1.0 + (4.0 - 2.0 * t) * t
    }
}
