//! The tick engine: lobby handshake, world initialization, and the per-turn
//! simulation step.
//!
//! Grounded in `original_source/server/game_manager.{h,cpp}`. The
//! past-messages replay log itself lives on `Server` (see `server.rs`),
//! appended atomically with fan-out by the single game-loop consumer
//! thread — `GameManager` only ever pushes onto the broadcast queue.

use crate::blocking_queue::BlockingQueue;
use crate::config::GameConfig;
use crate::game_state::GameState;
use shared::{
    ClientMessage, Direction, Event, GameStateType, IdGenerator, Lcg, Player, PlayerMap, Position,
    ServerMessage,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

struct Locked {
    state: GameState,
    player_id_gen: IdGenerator<u8>,
    bomb_id_gen: IdGenerator<u32>,
    client_to_player: HashMap<u32, u8>,
}

pub struct GameManager {
    config: GameConfig,
    locked: Mutex<Locked>,
    rng: Mutex<Lcg>,
    broadcast: Arc<BlockingQueue<ServerMessage>>,
}

impl GameManager {
    pub fn new(config: GameConfig, broadcast: Arc<BlockingQueue<ServerMessage>>) -> Arc<Self> {
        let seed = config.seed;
        let manager = GameManager {
            config,
            locked: Mutex::new(Locked {
                state: GameState::new(),
                player_id_gen: IdGenerator::<u8>::new(),
                bomb_id_gen: IdGenerator::<u32>::new(),
                client_to_player: HashMap::new(),
            }),
            rng: Mutex::new(Lcg::new(seed)),
            broadcast,
        };
        Arc::new(manager)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn hello_message(&self) -> ServerMessage {
        ServerMessage::Hello {
            server_name: self.config.server_name.clone(),
            players_count: self.config.players_count,
            size_x: self.config.size_x,
            size_y: self.config.size_y,
            game_length: self.config.game_length,
            explosion_radius: self.config.explosion_radius,
            bomb_timer: self.config.bomb_timer,
        }
    }

    pub fn player_count(&self) -> usize {
        self.locked.lock().unwrap().state.players.len()
    }

    /// `client_id -> player_id`, for mapping sessions to intent slots.
    pub fn client_to_player_snapshot(&self) -> HashMap<u32, u8> {
        self.locked.lock().unwrap().client_to_player.clone()
    }

    /// Lobby handshake. Returns `true` if the player was accepted.
    pub fn add_player(&self, client_id: u32, name: String, address: String) -> bool {
        let accepted_player;
        let id;
        {
            let mut locked = self.locked.lock().unwrap();
            if locked.state.phase != GameStateType::Lobby
                || locked.state.players.len() >= self.config.players_count as usize
                || locked.client_to_player.contains_key(&client_id)
            {
                return false;
            }
            id = locked.player_id_gen.next_id();
            let player = Player { name, address };
            locked.state.players.insert(id, player.clone());
            locked.state.scores.insert(id, 0);
            locked.client_to_player.insert(client_id, id);
            accepted_player = player;
        }
        let msg = ServerMessage::AcceptedPlayer {
            id,
            player: accepted_player,
        };
        self.broadcast.push(msg);
        true
    }

    pub fn start_game(&self) {
        let players = {
            let mut locked = self.locked.lock().unwrap();
            locked.state.phase = GameStateType::Game;
            locked.state.players.clone()
        };
        self.broadcast.push(ServerMessage::GameStarted { players });
    }

    pub fn initialize_game_state(&self) {
        let mut events = Vec::new();
        {
            let mut locked = self.locked.lock().unwrap();
            let size_x = self.config.size_x;
            let size_y = self.config.size_y;
            locked.state.turn = 0;

            let player_ids: Vec<u8> = locked.state.players.keys().copied().collect();
            for id in player_ids {
                let pos = self.rng.lock().unwrap().random_position(size_x, size_y);
                locked.state.player_positions.insert(id, pos);
                events.push(Event::PlayerMoved {
                    player_id: id,
                    position: pos,
                });
            }

            for _ in 0..self.config.initial_blocks {
                let pos = self.rng.lock().unwrap().random_position(size_x, size_y);
                if locked.state.blocks.insert(pos) {
                    events.push(Event::BlockPlaced { position: pos });
                }
            }
        }
        let msg = ServerMessage::Turn { turn: 0, events };
        self.broadcast.push(msg);
    }

    /// Computes the four-ray explosion footprint for a bomb, stopping each
    /// ray at the first block (inclusive) or board edge.
    fn explosion_footprint(
        bomb: Position,
        radius: u16,
        size_x: u16,
        size_y: u16,
        blocks: &BTreeSet<Position>,
    ) -> BTreeSet<Position> {
        let mut cells = BTreeSet::new();
        cells.insert(bomb);
        for direction in [Direction::Left, Direction::Right, Direction::Down, Direction::Up] {
            let mut current = bomb;
            for _ in 0..radius {
                match current.step(direction, size_x, size_y) {
                    Some(next) => {
                        cells.insert(next);
                        current = next;
                        if blocks.contains(&next) {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
        cells
    }

    /// Runs one tick: bomb decay/explosion, then player-intent application,
    /// in the exact order the protocol's determinism guarantee depends on.
    pub fn run_turn(&self, turn: u16, intents: &BTreeMap<u8, ClientMessage>) {
        let mut events = Vec::new();
        {
            let mut locked = self.locked.lock().unwrap();
            let size_x = self.config.size_x;
            let size_y = self.config.size_y;
            let radius = self.config.explosion_radius;

            // 1. Decrement timers, explode the ones that hit zero.
            let mut exploded_ids = Vec::new();
            for bomb in locked.state.bombs.values_mut() {
                bomb.decrease_timer();
            }
            let exploding: Vec<(u32, Position)> = locked
                .state
                .bombs
                .iter()
                .filter(|(_, b)| b.timer == 0)
                .map(|(id, b)| (*id, b.position))
                .collect();

            let mut turn_destroyed_blocks: BTreeSet<Position> = BTreeSet::new();
            for (bomb_id, position) in &exploding {
                let footprint = Self::explosion_footprint(
                    *position,
                    radius,
                    size_x,
                    size_y,
                    &locked.state.blocks,
                );
                let robots_destroyed: Vec<u8> = locked
                    .state
                    .player_positions
                    .iter()
                    .filter(|(_, pos)| footprint.contains(pos))
                    .map(|(id, _)| *id)
                    .collect();
                let blocks_destroyed: Vec<Position> = footprint
                    .iter()
                    .filter(|pos| locked.state.blocks.contains(pos))
                    .copied()
                    .collect();
                turn_destroyed_blocks.extend(blocks_destroyed.iter().copied());
                events.push(Event::BombExploded {
                    bomb_id: *bomb_id,
                    robots_destroyed,
                    blocks_destroyed,
                });
                exploded_ids.push(*bomb_id);
            }

            // 2. Clear explosions (they're transient, valid only mid-tick on
            // the client side via event application, not stored here).
            locked.state.explosions.clear();

            // 3. Remove exploded bombs.
            for id in &exploded_ids {
                locked.state.bombs.remove(id);
            }

            // 4. Remove destroyed blocks.
            for pos in &turn_destroyed_blocks {
                locked.state.blocks.remove(pos);
            }

            // Players destroyed this turn, for the intent-application step.
            let mut destroyed_players: BTreeSet<u8> = BTreeSet::new();
            for ev in &events {
                if let Event::BombExploded {
                    robots_destroyed, ..
                } = ev
                {
                    destroyed_players.extend(robots_destroyed.iter().copied());
                }
            }

            // 5. Apply per-player effects, in player_id order.
            let player_ids: Vec<u8> = locked.state.players.keys().copied().collect();
            for id in player_ids {
                if destroyed_players.contains(&id) {
                    *locked.state.scores.entry(id).or_insert(0) += 1;
                    let pos = self.rng.lock().unwrap().random_position(size_x, size_y);
                    locked.state.player_positions.insert(id, pos);
                    events.push(Event::PlayerMoved {
                        player_id: id,
                        position: pos,
                    });
                } else if let Some(intent) = intents.get(&id) {
                    Self::apply_intent(
                        &mut locked,
                        id,
                        intent,
                        size_x,
                        size_y,
                        self.config.bomb_timer,
                        &mut events,
                    );
                }
            }
        }
        let msg = ServerMessage::Turn { turn, events };
        self.broadcast.push(msg);
    }

    fn apply_intent(
        locked: &mut Locked,
        player_id: u8,
        intent: &ClientMessage,
        size_x: u16,
        size_y: u16,
        bomb_timer: u16,
        events: &mut Vec<Event>,
    ) {
        let position = match locked.state.player_positions.get(&player_id) {
            Some(p) => *p,
            None => return,
        };
        match intent {
            ClientMessage::PlaceBomb => {
                let bomb_id = locked.bomb_id_gen.next_id();
                locked.state.bombs.insert(
                    bomb_id,
                    shared::Bomb {
                        position,
                        timer: bomb_timer,
                    },
                );
                events.push(Event::BombPlaced { bomb_id, position });
            }
            ClientMessage::PlaceBlock => {
                if locked.state.blocks.insert(position) {
                    events.push(Event::BlockPlaced { position });
                }
            }
            ClientMessage::Move(direction) => {
                if let Some(target) = position.step(*direction, size_x, size_y) {
                    if !locked.state.blocks.contains(&target) {
                        locked.state.player_positions.insert(player_id, target);
                        events.push(Event::PlayerMoved {
                            player_id,
                            position: target,
                        });
                    }
                }
            }
            ClientMessage::Join(_) => {}
        }
    }

    pub fn end_game(&self) {
        let scores: PlayerMap<u32> = {
            let locked = self.locked.lock().unwrap();
            locked.state.scores.clone()
        };
        {
            let mut locked = self.locked.lock().unwrap();
            locked.state.phase = GameStateType::Lobby;
        }
        self.broadcast.push(ServerMessage::GameEnded { scores });
    }

    pub fn reset_game_state(&self) {
        {
            let mut locked = self.locked.lock().unwrap();
            locked.state.reset();
            locked.player_id_gen.reset();
            locked.bomb_id_gen.reset();
            locked.client_to_player.clear();
        }
    }
}
