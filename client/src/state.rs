//! The client proxy's local mirror of server state.
//!
//! Per Design Note 9, `phase` is the only field the two proxy threads race
//! on (the GUI->server thread reads it to decide Join vs. action; the
//! server->GUI thread writes it on `GameStarted`/`GameEnded`), so it is
//! modeled as a shared `AtomicU8`. Everything else in [`ClientState`] is
//! touched exclusively by the server->GUI thread and needs no locking.

use shared::{Bomb, DrawMessage, Event, Player, PlayerMap, Position, ServerMessage};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const LOBBY: u8 = 0;
const GAME: u8 = 1;

/// Shared, lock-free phase flag.
#[derive(Clone)]
pub struct SharedPhase(Arc<AtomicU8>);

impl SharedPhase {
    pub fn new() -> Self {
        SharedPhase(Arc::new(AtomicU8::new(LOBBY)))
    }

    pub fn is_lobby(&self) -> bool {
        self.0.load(Ordering::Acquire) == LOBBY
    }

    fn set_lobby(&self) {
        self.0.store(LOBBY, Ordering::Release);
    }

    fn set_game(&self) {
        self.0.store(GAME, Ordering::Release);
    }
}

impl Default for SharedPhase {
    fn default() -> Self {
        Self::new()
    }
}

/// Owned exclusively by the server->GUI thread.
#[derive(Debug, Default, Clone)]
pub struct ClientState {
    pub server_name: String,
    pub players_count: u8,
    pub size_x: u16,
    pub size_y: u16,
    pub game_length: u16,
    pub explosion_radius: u16,
    pub bomb_timer: u16,
    pub turn: u16,
    pub players: PlayerMap<Player>,
    pub player_positions: PlayerMap<Position>,
    pub blocks: BTreeSet<Position>,
    pub bombs: std::collections::BTreeMap<u32, Bomb>,
    pub explosions: BTreeSet<Position>,
    pub scores: PlayerMap<u32>,
}

impl ClientState {
    pub fn new() -> Self {
        ClientState::default()
    }

    /// Applies one `ServerMessage`, mutating local state exactly as the
    /// original implementation's `ServerMessage` constructor does as a side
    /// effect of parsing. Returns whether a `DrawMessage` should be emitted.
    pub fn apply(&mut self, msg: &ServerMessage, phase: &SharedPhase) -> bool {
        match msg {
            ServerMessage::Hello {
                server_name,
                players_count,
                size_x,
                size_y,
                game_length,
                explosion_radius,
                bomb_timer,
            } => {
                self.server_name = server_name.clone();
                self.players_count = *players_count;
                self.size_x = *size_x;
                self.size_y = *size_y;
                self.game_length = *game_length;
                self.explosion_radius = *explosion_radius;
                self.bomb_timer = *bomb_timer;
                true
            }
            ServerMessage::AcceptedPlayer { id, player } => {
                self.players.insert(*id, player.clone());
                true
            }
            ServerMessage::GameStarted { players } => {
                self.players = players.clone();
                self.scores = players.keys().map(|id| (*id, 0)).collect();
                self.player_positions.clear();
                self.blocks.clear();
                self.bombs.clear();
                self.explosions.clear();
                self.turn = 0;
                phase.set_game();
                // GameStarted is never forwarded to the GUI.
                false
            }
            ServerMessage::Turn { turn, events } => {
                for bomb in self.bombs.values_mut() {
                    bomb.decrease_timer();
                }
                self.explosions.clear();
                self.turn = *turn;
                let mut destroyed_robots = BTreeSet::new();
                let mut destroyed_blocks = BTreeSet::new();
                for event in events {
                    self.apply_event(event, &mut destroyed_robots, &mut destroyed_blocks);
                }
                for id in &destroyed_robots {
                    *self.scores.entry(*id).or_insert(0) += 1;
                }
                for pos in &destroyed_blocks {
                    self.blocks.remove(pos);
                }
                true
            }
            ServerMessage::GameEnded { scores } => {
                self.scores = scores.clone();
                self.player_positions.clear();
                self.blocks.clear();
                self.bombs.clear();
                self.explosions.clear();
                self.turn = 0;
                phase.set_lobby();
                true
            }
        }
    }

    fn apply_event(
        &mut self,
        event: &Event,
        destroyed_robots: &mut BTreeSet<u8>,
        destroyed_blocks: &mut BTreeSet<Position>,
    ) {
        match event {
            Event::BombPlaced { bomb_id, position } => {
                self.bombs.insert(
                    *bomb_id,
                    Bomb {
                        position: *position,
                        timer: self.bomb_timer,
                    },
                );
            }
            Event::BombExploded {
                bomb_id,
                robots_destroyed,
                blocks_destroyed,
            } => {
                if let Some(bomb) = self.bombs.remove(bomb_id) {
                    for pos in explosion_footprint(
                        bomb.position,
                        self.explosion_radius,
                        self.size_x,
                        self.size_y,
                        &self.blocks,
                    ) {
                        self.explosions.insert(pos);
                    }
                }
                destroyed_robots.extend(robots_destroyed.iter().copied());
                destroyed_blocks.extend(blocks_destroyed.iter().copied());
            }
            Event::PlayerMoved { player_id, position } => {
                self.player_positions.insert(*player_id, *position);
            }
            Event::BlockPlaced { position } => {
                self.blocks.insert(*position);
            }
        }
    }

    /// The original decides `Lobby` vs. `Game` from the triggering message's
    /// own type (`Hello`/`AcceptedPlayer`/`GameEnded` -> Lobby, `Turn` ->
    /// Game), not from whatever board state happens to be empty. `phase` is
    /// already flipped correctly by `apply()` by the time this runs, so it's
    /// the right proxy for that decision.
    pub fn to_draw_message(&self, phase: &SharedPhase) -> DrawMessage {
        if phase.is_lobby() {
            DrawMessage::Lobby {
                server_name: self.server_name.clone(),
                players_count: self.players_count,
                size_x: self.size_x,
                size_y: self.size_y,
                game_length: self.game_length,
                explosion_radius: self.explosion_radius,
                bomb_timer: self.bomb_timer,
                players: self.players.clone(),
            }
        } else {
            DrawMessage::Game {
                server_name: self.server_name.clone(),
                size_x: self.size_x,
                size_y: self.size_y,
                game_length: self.game_length,
                turn: self.turn,
                players: self.players.clone(),
                player_positions: self.player_positions.clone(),
                blocks: self.blocks.clone(),
                bombs: self.bombs.clone(),
                explosions: self.explosions.clone(),
                scores: self.scores.clone(),
            }
        }
    }
}

/// Mirrors the four-ray footprint computed server-side so the GUI can render
/// the full blast radius even though `BombExploded` only carries the
/// destroyed robots and blocks over the wire.
fn explosion_footprint(
    center: Position,
    radius: u16,
    size_x: u16,
    size_y: u16,
    blocks: &BTreeSet<Position>,
) -> BTreeSet<Position> {
    use shared::Direction;

    let mut cells = BTreeSet::new();
    cells.insert(center);
    for direction in [Direction::Up, Direction::Right, Direction::Down, Direction::Left] {
        let mut cursor = center;
        for _ in 0..radius {
            match cursor.step(direction, size_x, size_y) {
                Some(next) => {
                    cursor = next;
                    cells.insert(cursor);
                    if blocks.contains(&cursor) {
                        break;
                    }
                }
                None => break,
            }
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Event, ServerMessage};

    #[test]
    fn hello_populates_config_without_touching_phase() {
        let mut state = ClientState::new();
        let phase = SharedPhase::new();
        let forward = state.apply(
            &ServerMessage::Hello {
                server_name: "srv".to_string(),
                players_count: 2,
                size_x: 5,
                size_y: 5,
                game_length: 10,
                explosion_radius: 2,
                bomb_timer: 3,
            },
            &phase,
        );
        assert!(forward);
        assert_eq!(state.server_name, "srv");
        assert_eq!(state.bomb_timer, 3);
        assert!(phase.is_lobby());
    }

    #[test]
    fn game_started_flips_phase_and_is_not_forwarded() {
        let mut state = ClientState::new();
        let phase = SharedPhase::new();
        let mut players = PlayerMap::new();
        players.insert(0, Player { name: "A".to_string(), address: "a".to_string() });
        let forward = state.apply(&ServerMessage::GameStarted { players }, &phase);
        assert!(!forward);
        assert!(!phase.is_lobby());
        assert_eq!(state.scores.get(&0), Some(&0));
    }

    #[test]
    fn game_ended_clears_dynamic_state_and_returns_to_lobby() {
        let mut state = ClientState::new();
        let phase = SharedPhase::new();
        state.player_positions.insert(0, Position::new(1, 1));
        state.blocks.insert(Position::new(2, 2));
        state.turn = 7;
        phase.set_game();
        let mut scores = PlayerMap::new();
        scores.insert(0, 5);
        let forward = state.apply(&ServerMessage::GameEnded { scores: scores.clone() }, &phase);
        assert!(forward);
        assert!(phase.is_lobby());
        assert!(state.player_positions.is_empty());
        assert!(state.blocks.is_empty());
        assert_eq!(state.turn, 0);
        assert_eq!(state.scores, scores);
        assert!(matches!(state.to_draw_message(&phase), DrawMessage::Lobby { .. }));
    }

    #[test]
    fn turn_decrements_bomb_timers_and_applies_events() {
        let mut state = ClientState::new();
        state.size_x = 5;
        state.size_y = 5;
        state.explosion_radius = 1;
        state.bomb_timer = 2;
        let phase = SharedPhase::new();
        state.apply(
            &ServerMessage::Turn {
                turn: 1,
                events: vec![Event::BombPlaced { bomb_id: 0, position: Position::new(2, 2) }],
            },
            &phase,
        );
        assert_eq!(state.bombs.get(&0).unwrap().timer, 2);

        state.apply(
            &ServerMessage::Turn {
                turn: 2,
                events: vec![Event::BombExploded {
                    bomb_id: 0,
                    robots_destroyed: vec![3],
                    blocks_destroyed: vec![],
                }],
            },
            &phase,
        );
        assert!(state.bombs.is_empty());
        assert!(state.explosions.contains(&Position::new(2, 2)));
        assert_eq!(state.scores.get(&3), Some(&1));
    }

    #[test]
    fn lobby_draw_message_used_before_game_starts() {
        let state = ClientState::new();
        let phase = SharedPhase::new();
        assert!(matches!(state.to_draw_message(&phase), DrawMessage::Lobby { .. }));
    }
}
