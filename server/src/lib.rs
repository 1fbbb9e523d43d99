//! # Bomberman-style game server
//!
//! The authoritative half of the protocol: accepts TCP clients, runs the
//! deterministic tick engine, and broadcasts per-turn events.
//!
//! ## Module layout
//!
//! - [`config`] — CLI parsing (`clap`) and the immutable `GameConfig`.
//! - [`game_state`] — the dynamic, per-game board state.
//! - [`game_manager`] — the tick engine: lobby handshake, world init,
//!   `run_turn`, explosion footprints, game end/reset.
//! - [`blocking_queue`] — the bounded blocking FIFO used for both the
//!   process-wide broadcast queue and each session's send queue.
//! - [`session`] — per-client receive/send threads and the intent slot.
//! - [`server`] — the acceptor thread and the game-loop driver that ties
//!   everything together.
//! - [`errors`] — the crate-local error type.
//!
//! ## Concurrency model
//!
//! Plain `std::thread` throughout, no async runtime: one acceptor thread,
//! one game-loop thread, and two threads per connected client. All shared
//! mutable state is behind `Mutex`/`Condvar` — see `SPEC_FULL.md` Section 5.

pub mod blocking_queue;
pub mod config;
pub mod errors;
pub mod game_manager;
pub mod game_state;
pub mod server;
pub mod session;
