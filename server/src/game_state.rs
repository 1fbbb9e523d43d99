//! The dynamic, authoritative game state.
//!
//! Grounded in `original_source/common/game.h`'s `GameState` struct. The
//! static config fields live separately in [`crate::config::GameConfig`];
//! this struct holds only what changes turn to turn.

use shared::{Bomb, GameStateType, Player, PlayerMap, Position};
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct GameState {
    pub phase: GameStateType,
    pub turn: u16,
    pub players: PlayerMap<Player>,
    pub player_positions: PlayerMap<Position>,
    pub blocks: BTreeSet<Position>,
    pub bombs: PlayerMap32<Bomb>,
    pub explosions: BTreeSet<Position>,
    pub scores: PlayerMap<u32>,
}

/// `bomb_id` is a `u32`, unlike every other keyed collection here which is
/// keyed by the `u8` `player_id`.
pub type PlayerMap32<V> = std::collections::BTreeMap<u32, V>;

impl GameState {
    pub fn new() -> Self {
        GameState {
            phase: GameStateType::Lobby,
            turn: 0,
            players: PlayerMap::new(),
            player_positions: PlayerMap::new(),
            blocks: BTreeSet::new(),
            bombs: PlayerMap32::new(),
            explosions: BTreeSet::new(),
            scores: PlayerMap::new(),
        }
    }

    /// Clears every field back to a fresh Lobby, used by `reset_game_state`.
    pub fn reset(&mut self) {
        *self = GameState::new();
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_empty_lobby() {
        let state = GameState::new();
        assert_eq!(state.phase, GameStateType::Lobby);
        assert!(state.players.is_empty());
        assert!(state.bombs.is_empty());
    }

    #[test]
    fn reset_clears_everything() {
        let mut state = GameState::new();
        state.turn = 5;
        state.blocks.insert(Position::new(1, 1));
        state.reset();
        assert_eq!(state.turn, 0);
        assert!(state.blocks.is_empty());
    }
}
