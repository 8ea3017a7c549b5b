use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_EFFECT_MS, DEFAULT_EFFECT_MULTIPLIER};
use crate::engine::{GameEngine, GameEngineOptions};
use crate::error::EngineResult;
use crate::grid::nearest_free_cell;
use crate::maps::{pacman_map, MapLayout};
use crate::rng::{RandomSource, Rng};
use crate::types::{GameEvent, GameSetup, PlayerRanking, Position};

/// Display details a client attaches to a player.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Speed,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEffect {
    #[serde(rename = "type")]
    pub kind: EffectKind,
    pub multiplier: f32,
    pub ends_at_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Add,
    Remove,
    Boost,
    Slow,
    Teleport,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandData {
    pub duration_ms: Option<u64>,
    pub position: Option<Position>,
    pub speed_multiplier: Option<f32>,
}

/// A remote control request, as sent by clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerCommand {
    pub player_id: String,
    #[serde(rename = "type")]
    pub kind: CommandKind,
    #[serde(default)]
    pub data: CommandData,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalRanking {
    pub player_id: String,
    pub rank: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    #[serde(rename_all = "camelCase")]
    Joined { player_id: String, slot: usize },
    #[serde(rename_all = "camelCase")]
    JoinFailed { player_id: String, error: String },
    #[serde(rename_all = "camelCase")]
    Left { player_id: String },
    #[serde(rename_all = "camelCase")]
    Moved { player_id: String, position: Position },
    #[serde(rename_all = "camelCase")]
    Eliminated { player_id: String, rank: usize },
    GameEnded { rankings: Vec<ExternalRanking> },
    Reset,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalPlayer {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub position: Position,
    pub is_eliminated: bool,
    pub effects: Vec<PlayerEffect>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub ghost_level: u8,
    pub player_speed: u64,
    pub ghost_speed: u64,
    pub max_players: usize,
    pub game_started: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalState {
    pub is_ended: bool,
    pub step: u64,
    pub players: Vec<ExternalPlayer>,
    pub ghost: Position,
    pub rankings: Vec<ExternalRanking>,
    pub config: SessionConfig,
}

/// The pac-man layout with the ghost in the free cell nearest the middle.
pub fn default_setup() -> GameSetup {
    let MapLayout { map_size, walls } = pacman_map();
    let center = Position::new(map_size.width / 2, map_size.height / 2);
    let ghost = nearest_free_cell(center, map_size, &walls, &[]).unwrap_or(center);
    GameSetup {
        players: Vec::new(),
        ghost,
        map_size,
        walls,
    }
}

/// Drives a [`GameEngine`] on behalf of clients that know players by string
/// id rather than by slot.
///
/// `ids[slot]` is the external id of the player in that engine slot; effects
/// and ids move together when a slot is removed.
#[derive(Clone, Debug)]
pub struct GameSession<R = Rng> {
    engine: GameEngine<R>,
    ids: Vec<String>,
    info: HashMap<String, PlayerInfo>,
    effects: Vec<Vec<PlayerEffect>>,
    events: Vec<SessionEvent>,
}

impl GameSession<Rng> {
    pub fn new(options: GameEngineOptions) -> Self {
        Self::from_engine(GameEngine::new(default_setup(), options))
    }
}

impl<R: RandomSource> GameSession<R> {
    pub fn from_engine(mut engine: GameEngine<R>) -> Self {
        let players = engine.game_state().players.len();
        engine.drain_events();
        Self {
            engine,
            ids: (0..players).map(|slot| format!("slot-{slot}")).collect(),
            info: HashMap::new(),
            effects: vec![Vec::new(); players],
            events: Vec::new(),
        }
    }

    pub fn engine(&self) -> &GameEngine<R> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut GameEngine<R> {
        &mut self.engine
    }

    pub fn slot_of(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|known| known == id)
    }

    pub fn player_ids(&self) -> &[String] {
        &self.ids
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Adds `id` to the game, at `position` when that cell is free and at a
    /// corner otherwise. Joining twice returns the existing slot.
    pub fn join(
        &mut self,
        id: &str,
        info: Option<PlayerInfo>,
        position: Option<Position>,
    ) -> EngineResult<usize> {
        if let Some(slot) = self.slot_of(id) {
            return Ok(slot);
        }
        let added = match position {
            Some(pos) => self.engine.add_player_at(pos),
            None => self.engine.add_player_to_corner(),
        };
        let slot = match added {
            Ok(slot) => slot,
            Err(error) => {
                tracing::debug!(player = id, %error, "join rejected");
                self.events.push(SessionEvent::JoinFailed {
                    player_id: id.to_string(),
                    error: error.to_string(),
                });
                return Err(error);
            }
        };
        self.ids.push(id.to_string());
        self.effects.push(Vec::new());
        if let Some(info) = info {
            self.info.insert(id.to_string(), info);
        }
        self.collect_engine_events();
        Ok(slot)
    }

    pub fn leave(&mut self, id: &str) -> bool {
        let Some(slot) = self.slot_of(id) else {
            return false;
        };
        self.collect_engine_events();
        self.engine.remove_player(slot);
        self.ids.remove(slot);
        self.effects.remove(slot);
        self.info.remove(id);
        self.events.push(SessionEvent::Left {
            player_id: id.to_string(),
        });
        // Anything the removal triggered refers to the compacted slots.
        self.collect_engine_events();
        true
    }

    /// Multiplies the player's speed by `multiplier` until `now_ms +
    /// duration_ms`. Effects stack multiplicatively.
    pub fn boost(&mut self, id: &str, duration_ms: u64, multiplier: f32, now_ms: u64) -> bool {
        let Some(slot) = self.slot_of(id) else {
            return false;
        };
        if multiplier <= 0.0 || !multiplier.is_finite() {
            return false;
        }
        self.effects[slot].push(PlayerEffect {
            kind: EffectKind::Speed,
            multiplier,
            ends_at_ms: now_ms.saturating_add(duration_ms),
        });
        self.apply_speed(slot);
        true
    }

    /// Divides the player's speed by `divisor` for `duration_ms`.
    pub fn slow(&mut self, id: &str, duration_ms: u64, divisor: f32, now_ms: u64) -> bool {
        if divisor <= 0.0 {
            return false;
        }
        self.boost(id, duration_ms, 1.0 / divisor, now_ms)
    }

    pub fn teleport(&mut self, id: &str, position: Position) -> bool {
        match self.slot_of(id) {
            Some(slot) => self.engine.teleport_player(slot, position),
            None => false,
        }
    }

    pub fn update_info(&mut self, id: &str, info: PlayerInfo) -> bool {
        if self.slot_of(id).is_none() {
            return false;
        }
        self.info.insert(id.to_string(), info);
        true
    }

    pub fn info(&self, id: &str) -> Option<&PlayerInfo> {
        self.info.get(id)
    }

    pub fn effects(&self, id: &str) -> &[PlayerEffect] {
        self.slot_of(id)
            .and_then(|slot| self.effects.get(slot))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn process_command(&mut self, command: &PlayerCommand, now_ms: u64) -> bool {
        let id = command.player_id.as_str();
        let data = &command.data;
        let duration_ms = data.duration_ms.unwrap_or(DEFAULT_EFFECT_MS);
        let multiplier = data.speed_multiplier.unwrap_or(DEFAULT_EFFECT_MULTIPLIER);
        match command.kind {
            CommandKind::Add => self.join(id, None, data.position).is_ok(),
            CommandKind::Remove => self.leave(id),
            CommandKind::Boost => self.boost(id, duration_ms, multiplier, now_ms),
            CommandKind::Slow => self.slow(id, duration_ms, multiplier, now_ms),
            CommandKind::Teleport => match data.position {
                Some(pos) => self.teleport(id, pos),
                None => false,
            },
        }
    }

    /// Expires effects, advances the engine one step and reports what
    /// happened in terms of external ids.
    pub fn tick(&mut self, now_ms: u64) -> ExternalState {
        for slot in 0..self.effects.len() {
            self.effects[slot].retain(|effect| effect.ends_at_ms > now_ms);
            self.apply_speed(slot);
        }
        let state = self.engine.tick(now_ms);
        self.collect_engine_events();
        for (slot, id) in self.ids.iter().enumerate() {
            if let Some(position) = state.players.get(slot) {
                self.events.push(SessionEvent::Moved {
                    player_id: id.clone(),
                    position: *position,
                });
            }
        }
        self.external_state()
    }

    pub fn external_state(&self) -> ExternalState {
        let state = self.engine.game_state();
        let players = self
            .ids
            .iter()
            .enumerate()
            .filter_map(|(slot, id)| {
                let position = *state.players.get(slot)?;
                let info = self.info.get(id);
                Some(ExternalPlayer {
                    id: id.clone(),
                    name: info.and_then(|info| info.name.clone()),
                    avatar: info.and_then(|info| info.avatar.clone()),
                    position,
                    is_eliminated: state.is_eliminated(slot),
                    effects: self.effects.get(slot).cloned().unwrap_or_default(),
                })
            })
            .collect();
        ExternalState {
            is_ended: self.engine.is_game_over(),
            step: state.game_step,
            players,
            ghost: state.ghost,
            rankings: self.external_rankings(&self.engine.rankings()),
            config: SessionConfig {
                ghost_level: self.engine.ghost_level().number(),
                player_speed: self.engine.player_speed(),
                ghost_speed: self.engine.ghost_speed(),
                max_players: self.engine.max_players(),
                game_started: self.engine.is_started(),
            },
        }
    }

    /// Forgets every player and starts over on the default map.
    pub fn reset(&mut self) {
        self.engine.reset_game(default_setup());
        self.collect_engine_events();
        self.ids.clear();
        self.info.clear();
        self.effects.clear();
    }

    fn apply_speed(&mut self, slot: usize) {
        let multiplier: f32 = self.effects[slot]
            .iter()
            .filter(|effect| effect.kind == EffectKind::Speed)
            .map(|effect| effect.multiplier)
            .product();
        self.engine.set_player_speed_multiplier(slot, multiplier);
    }

    fn external_rankings(&self, rankings: &[PlayerRanking]) -> Vec<ExternalRanking> {
        rankings
            .iter()
            .filter_map(|ranking| {
                self.ids.get(ranking.player_id).map(|id| ExternalRanking {
                    player_id: id.clone(),
                    rank: ranking.rank,
                })
            })
            .collect()
    }

    /// Must run while `ids` still matches the engine slots the events name.
    fn collect_engine_events(&mut self) {
        for event in self.engine.drain_events() {
            let translated = match event {
                GameEvent::PlayerJoined { slot, .. } => {
                    self.ids.get(slot).map(|id| SessionEvent::Joined {
                        player_id: id.clone(),
                        slot,
                    })
                }
                GameEvent::PlayerLeft { .. } => None,
                GameEvent::PlayerEliminated { slot, rank, .. } => {
                    self.ids.get(slot).map(|id| SessionEvent::Eliminated {
                        player_id: id.clone(),
                        rank,
                    })
                }
                GameEvent::GameEnded { rankings, .. } => Some(SessionEvent::GameEnded {
                    rankings: self.external_rankings(&rankings),
                }),
                GameEvent::GameReset => Some(SessionEvent::Reset),
            };
            self.events.extend(translated);
        }
    }
}
