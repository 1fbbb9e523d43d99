//! # Shared protocol library
//!
//! Data structures and the wire codec shared by the Bomberman-style game
//! server and its client proxy. This is the foundation both binaries build
//! on: it defines the byte-for-byte layout of every message that crosses a
//! socket, so a change here changes the protocol for both programs at once.
//!
//! ## Layout
//!
//! - [`buffer`] — the codec: big-endian primitives, length-prefixed strings,
//!   lists, key-ascending maps, and the UDP/TCP transport adapters.
//! - [`types`] — value types shared by every message: `Position`,
//!   `Direction`, `Player`, `Bomb`, and the dense id generators.
//! - [`messages`] — the five typed envelopes (`InputMessage`, `ClientMessage`,
//!   `ServerMessage`, `Event`, `DrawMessage`) and their encode/decode logic.
//! - [`rng`] — the deterministic PRNG the game manager uses for spawn and
//!   teleport positions.

pub mod buffer;
pub mod messages;
pub mod rng;
pub mod types;

pub use buffer::{BufferUdp, ByteReader, ByteWriter, CodecError, SliceReader, TcpReader, TcpWriter, VecWriter};
pub use messages::{ClientMessage, DrawMessage, Event, InputMessage, ServerMessage};
pub use rng::Lcg;
pub use types::{Bomb, Direction, GameStateType, IdGenerator, Player, PlayerMap, Position};
