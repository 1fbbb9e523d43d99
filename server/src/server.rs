//! The acceptor thread and the game-loop driver.
//!
//! Grounded in `original_source/server/server.{h,cpp}` and
//! `server/robots-server.cpp`. The acceptor thread is spawned once and
//! persists across repeated games (Open Question #3 in SPEC_FULL.md):
//! a socket that stays open across a Lobby<->Game boundary may rejoin the
//! next lobby.

use crate::blocking_queue::{BlockingQueue, PopError};
use crate::config::GameConfig;
use crate::errors::ServerError;
use crate::game_manager::GameManager;
use crate::session::{self, Session};
use log::{info, warn};
use shared::{ClientMessage, IdGenerator, ServerMessage};
use std::collections::BTreeMap;
use std::net::{Ipv6Addr, SocketAddr, SocketAddrV6, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Everything a newly accepted session must see atomically: the replay log
/// it gets seeded from and the list fan-out delivers to. Kept behind one
/// lock so "read the log, register the session" (accept_loop) and "append to
/// the log, fan out to registered sessions" (fan_out_step) can never
/// interleave in a way that delivers a message twice or not at all.
struct Registry {
    past_messages: Vec<ServerMessage>,
    sessions: Vec<Arc<Session>>,
}

pub struct Server {
    game_manager: Arc<GameManager>,
    broadcast: Arc<BlockingQueue<ServerMessage>>,
    registry: Mutex<Registry>,
    client_id_gen: Mutex<IdGenerator<u32>>,
}

impl Server {
    pub fn new(config: GameConfig) -> Arc<Self> {
        let broadcast = BlockingQueue::new();
        let game_manager = GameManager::new(config, Arc::clone(&broadcast));
        let hello = game_manager.hello_message();
        Arc::new(Server {
            game_manager,
            broadcast,
            registry: Mutex::new(Registry {
                past_messages: vec![hello],
                sessions: Vec::new(),
            }),
            client_id_gen: Mutex::new(IdGenerator::<u32>::new()),
        })
    }

    /// Binds an IPv6 dual-stack listener and spawns the long-lived acceptor
    /// thread. Returns immediately; the acceptor keeps running for the life
    /// of the process.
    pub fn spawn_acceptor(self: &Arc<Self>, port: u16) -> Result<(), ServerError> {
        let addr = SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, port, 0, 0));
        let listener = TcpListener::bind(addr)?;
        let server = Arc::clone(self);
        thread::spawn(move || server.accept_loop(listener));
        Ok(())
    }

    fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        for incoming in listener.incoming() {
            let stream = match incoming {
                Ok(s) => s,
                Err(e) => {
                    warn!("accept failed: {e}");
                    continue;
                }
            };
            if let Err(e) = stream.set_nodelay(true) {
                warn!("failed to set TCP_NODELAY: {e}");
                continue;
            }
            let address = match stream.peer_addr() {
                Ok(a) => a.to_string(),
                Err(e) => {
                    warn!("failed to read peer address: {e}");
                    continue;
                }
            };
            let client_id = self.client_id_gen.lock().unwrap().next_id();
            let session = Session::new(client_id);

            {
                let mut registry = self.registry.lock().unwrap();
                for msg in registry.past_messages.iter() {
                    session.send_queue.push(msg.clone());
                }
                registry.sessions.push(Arc::clone(&session));
            }

            info!("accepted client {client_id} from {address}");
            if let Err(e) = session::spawn(session, stream, Arc::clone(&self.game_manager), address)
            {
                warn!("failed to spawn session threads: {e}");
            }
        }
    }

    /// Pops one broadcast message, appends it to the replay log (or, for
    /// `GameStarted`/`GameEnded`, resets the log to a fresh `[Hello]`
    /// instead), then fans it out to every live session — reaping closed
    /// ones first. Log append and fan-out happen under the same lock as a
    /// single atomic step, so a session registering concurrently in
    /// `accept_loop` can never see the message twice (once via its initial
    /// replay snapshot, once via live fan-out) or miss it.
    fn fan_out_step(&self) {
        match self.broadcast.pop() {
            Ok(msg) => {
                let mut registry = self.registry.lock().unwrap();
                match &msg {
                    ServerMessage::GameStarted { .. } | ServerMessage::GameEnded { .. } => {
                        registry.past_messages.clear();
                        registry.past_messages.push(self.game_manager.hello_message());
                    }
                    _ => registry.past_messages.push(msg.clone()),
                }
                registry.sessions.retain(|s| !s.is_closed());
                for s in registry.sessions.iter() {
                    s.send_queue.push(msg.clone());
                }
            }
            Err(PopError::Closed) => {}
        }
    }

    fn collect_players(&self) {
        while self.game_manager.player_count() < self.game_manager.config().players_count as usize
        {
            self.fan_out_step();
        }
    }

    fn collect_intents(&self) -> BTreeMap<u8, ClientMessage> {
        let mapping = self.game_manager.client_to_player_snapshot();
        let registry = self.registry.lock().unwrap();
        let mut intents = BTreeMap::new();
        for s in registry.sessions.iter() {
            if let Some(player_id) = mapping.get(&s.client_id) {
                if let Some(msg) = s.take_intent() {
                    intents.insert(*player_id, msg);
                }
            }
        }
        intents
    }

    /// Runs one game to completion, then loops forever: `collect_players`,
    /// `start_game`, `initialize_game_state`, `game_length` ticks, `end_game`,
    /// `reset_game_state`.
    pub fn run_game_loop(self: &Arc<Self>) -> ! {
        loop {
            self.collect_players();

            self.game_manager.start_game();
            self.fan_out_step();

            self.game_manager.initialize_game_state();
            self.fan_out_step();

            let config = self.game_manager.config().clone();
            for turn in 1..=config.game_length {
                thread::sleep(Duration::from_millis(config.turn_duration_ms));
                let intents = self.collect_intents();
                self.game_manager.run_turn(turn, &intents);
                self.fan_out_step();
            }

            self.game_manager.end_game();
            self.fan_out_step();

            info!("game ended, resetting for next lobby");
            self.game_manager.reset_game_state();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GameConfig {
        GameConfig {
            server_name: "srv".to_string(),
            players_count: 1,
            size_x: 3,
            size_y: 3,
            game_length: 1,
            explosion_radius: 1,
            bomb_timer: 1,
            turn_duration_ms: 1,
            initial_blocks: 0,
            seed: 0,
        }
    }

    #[test]
    fn fan_out_delivers_to_all_live_sessions() {
        let server = Server::new(config());
        let s1 = Session::new(1);
        let s2 = Session::new(2);
        {
            let mut registry = server.registry.lock().unwrap();
            registry.sessions.push(Arc::clone(&s1));
            registry.sessions.push(Arc::clone(&s2));
        }
        server.broadcast.push(ServerMessage::GameEnded {
            scores: Default::default(),
        });
        server.fan_out_step();
        assert!(matches!(s1.send_queue.pop().unwrap(), ServerMessage::GameEnded { .. }));
        assert!(matches!(s2.send_queue.pop().unwrap(), ServerMessage::GameEnded { .. }));
    }

    #[test]
    fn fan_out_skips_closed_sessions() {
        let server = Server::new(config());
        let s1 = Session::new(1);
        s1.close();
        server.registry.lock().unwrap().sessions.push(Arc::clone(&s1));
        server.broadcast.push(ServerMessage::GameEnded {
            scores: Default::default(),
        });
        server.fan_out_step();
        assert_eq!(server.registry.lock().unwrap().sessions.len(), 0);
    }

    #[test]
    fn fan_out_appends_turn_to_log_but_resets_log_on_game_started() {
        let server = Server::new(config());
        server.broadcast.push(ServerMessage::Turn {
            turn: 1,
            events: Vec::new(),
        });
        server.fan_out_step();
        assert_eq!(server.registry.lock().unwrap().past_messages.len(), 2);

        server.broadcast.push(ServerMessage::GameStarted {
            players: Default::default(),
        });
        server.fan_out_step();
        let registry = server.registry.lock().unwrap();
        assert_eq!(registry.past_messages.len(), 1);
        assert!(matches!(registry.past_messages[0], ServerMessage::Hello { .. }));
    }

    #[test]
    fn accept_and_fan_out_never_double_deliver_or_drop() {
        let server = Server::new(config());
        let late = Session::new(1);
        {
            // Simulate a session registering after one AcceptedPlayer has
            // already been fanned out but before a second one arrives: it
            // should get exactly the past-messages snapshot at registration
            // time, then exactly the live fan-out after, never both for the
            // same message.
            let mut registry = server.registry.lock().unwrap();
            for msg in registry.past_messages.iter() {
                late.send_queue.push(msg.clone());
            }
            registry.sessions.push(Arc::clone(&late));
        }
        server.broadcast.push(ServerMessage::AcceptedPlayer {
            id: 0,
            player: shared::Player {
                name: "A".to_string(),
                address: "addr".to_string(),
            },
        });
        server.fan_out_step();
        assert!(matches!(
            late.send_queue.pop().unwrap(),
            ServerMessage::Hello { .. }
        ));
        assert!(matches!(
            late.send_queue.pop().unwrap(),
            ServerMessage::AcceptedPlayer { .. }
        ));
    }

    #[test]
    fn collect_intents_maps_by_player_id() {
        let server = Server::new(config());
        server
            .game_manager
            .add_player(7, "A".to_string(), "addr".to_string());
        let session = Session::new(7);
        session.set_intent(ClientMessage::PlaceBomb);
        server.registry.lock().unwrap().sessions.push(session);
        let intents = server.collect_intents();
        assert_eq!(intents.get(&0), Some(&ClientMessage::PlaceBomb));
    }
}
