//! Protocol message envelopes: `InputMessage` (GUI -> proxy), `ClientMessage`
//! (proxy -> server), `ServerMessage` (server -> proxy) with its nested
//! `Event`s, and `DrawMessage` (proxy -> GUI).
//!
//! Grounded in `original_source/common/messages.{h,cpp}` and
//! `common/events.{h,cpp}` for the exact tag values and field layouts.

use crate::buffer::{ByteReader, ByteWriter, CodecError};
use crate::types::{Bomb, Direction, Player, PlayerMap, Position};
use std::collections::BTreeSet;

/// GUI -> client proxy, over UDP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMessage {
    PlaceBomb,
    PlaceBlock,
    Move(Direction),
}

impl InputMessage {
    pub fn decode<R: ByteReader>(r: &mut R) -> Result<Self, CodecError> {
        match r.read_u8()? {
            0 => Ok(InputMessage::PlaceBomb),
            1 => Ok(InputMessage::PlaceBlock),
            2 => {
                let d = r.read_u8()?;
                Direction::from_tag(d)
                    .map(InputMessage::Move)
                    .ok_or(CodecError::InvalidDirection(d))
            }
            t => Err(CodecError::InvalidTag(t)),
        }
    }

    pub fn encode<W: ByteWriter>(&self, w: &mut W) {
        match self {
            InputMessage::PlaceBomb => w.write_u8(0),
            InputMessage::PlaceBlock => w.write_u8(1),
            InputMessage::Move(dir) => {
                w.write_u8(2);
                w.write_u8(dir.to_tag());
            }
        }
    }
}

/// Client proxy -> server, over TCP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Join(String),
    PlaceBomb,
    PlaceBlock,
    Move(Direction),
}

impl ClientMessage {
    pub fn decode<R: ByteReader>(r: &mut R) -> Result<Self, CodecError> {
        match r.read_u8()? {
            0 => Ok(ClientMessage::Join(r.read_string()?)),
            1 => Ok(ClientMessage::PlaceBomb),
            2 => Ok(ClientMessage::PlaceBlock),
            3 => {
                let d = r.read_u8()?;
                Direction::from_tag(d)
                    .map(ClientMessage::Move)
                    .ok_or(CodecError::InvalidDirection(d))
            }
            t => Err(CodecError::InvalidTag(t)),
        }
    }

    pub fn encode<W: ByteWriter>(&self, w: &mut W) {
        match self {
            ClientMessage::Join(name) => {
                w.write_u8(0);
                w.write_string(name);
            }
            ClientMessage::PlaceBomb => w.write_u8(1),
            ClientMessage::PlaceBlock => w.write_u8(2),
            ClientMessage::Move(dir) => {
                w.write_u8(3);
                w.write_u8(dir.to_tag());
            }
        }
    }
}

/// One effect of a turn, nested inside `ServerMessage::Turn`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    BombPlaced {
        bomb_id: u32,
        position: Position,
    },
    BombExploded {
        bomb_id: u32,
        robots_destroyed: Vec<u8>,
        blocks_destroyed: Vec<Position>,
    },
    PlayerMoved {
        player_id: u8,
        position: Position,
    },
    BlockPlaced {
        position: Position,
    },
}

fn decode_position<R: ByteReader>(r: &mut R) -> Result<Position, CodecError> {
    let x = r.read_u16()?;
    let y = r.read_u16()?;
    Ok(Position::new(x, y))
}

fn encode_position<W: ByteWriter>(w: &mut W, p: &Position) {
    w.write_u16(p.x);
    w.write_u16(p.y);
}

impl Event {
    pub fn decode<R: ByteReader>(r: &mut R) -> Result<Self, CodecError> {
        match r.read_u8()? {
            0 => Ok(Event::BombPlaced {
                bomb_id: r.read_u32()?,
                position: decode_position(r)?,
            }),
            1 => {
                let bomb_id = r.read_u32()?;
                let robots_destroyed = r.read_list(|r| r.read_u8())?;
                let blocks_destroyed = r.read_list(decode_position)?;
                Ok(Event::BombExploded {
                    bomb_id,
                    robots_destroyed,
                    blocks_destroyed,
                })
            }
            2 => Ok(Event::PlayerMoved {
                player_id: r.read_u8()?,
                position: decode_position(r)?,
            }),
            3 => Ok(Event::BlockPlaced {
                position: decode_position(r)?,
            }),
            t => Err(CodecError::InvalidTag(t)),
        }
    }

    pub fn encode<W: ByteWriter>(&self, w: &mut W) {
        match self {
            Event::BombPlaced { bomb_id, position } => {
                w.write_u8(0);
                w.write_u32(*bomb_id);
                encode_position(w, position);
            }
            Event::BombExploded {
                bomb_id,
                robots_destroyed,
                blocks_destroyed,
            } => {
                w.write_u8(1);
                w.write_u32(*bomb_id);
                w.write_list(robots_destroyed, |w, id| w.write_u8(*id));
                w.write_list(blocks_destroyed, |w, p| encode_position(w, p));
            }
            Event::PlayerMoved { player_id, position } => {
                w.write_u8(2);
                w.write_u8(*player_id);
                encode_position(w, position);
            }
            Event::BlockPlaced { position } => {
                w.write_u8(3);
                encode_position(w, position);
            }
        }
    }
}

fn decode_player<R: ByteReader>(r: &mut R) -> Result<Player, CodecError> {
    let name = r.read_string()?;
    let address = r.read_string()?;
    Ok(Player { name, address })
}

fn encode_player<W: ByteWriter>(w: &mut W, p: &Player) {
    w.write_string(&p.name);
    w.write_string(&p.address);
}

/// Server -> client proxy, over TCP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Hello {
        server_name: String,
        players_count: u8,
        size_x: u16,
        size_y: u16,
        game_length: u16,
        explosion_radius: u16,
        bomb_timer: u16,
    },
    AcceptedPlayer {
        id: u8,
        player: Player,
    },
    GameStarted {
        players: PlayerMap<Player>,
    },
    Turn {
        turn: u16,
        events: Vec<Event>,
    },
    GameEnded {
        scores: PlayerMap<u32>,
    },
}

impl ServerMessage {
    pub fn decode<R: ByteReader>(r: &mut R) -> Result<Self, CodecError> {
        match r.read_u8()? {
            0 => Ok(ServerMessage::Hello {
                server_name: r.read_string()?,
                players_count: r.read_u8()?,
                size_x: r.read_u16()?,
                size_y: r.read_u16()?,
                game_length: r.read_u16()?,
                explosion_radius: r.read_u16()?,
                bomb_timer: r.read_u16()?,
            }),
            1 => Ok(ServerMessage::AcceptedPlayer {
                id: r.read_u8()?,
                player: decode_player(r)?,
            }),
            2 => Ok(ServerMessage::GameStarted {
                players: r.read_map(|r| Ok((r.read_u8()?, decode_player(r)?)))?,
            }),
            3 => Ok(ServerMessage::Turn {
                turn: r.read_u16()?,
                events: r.read_list(Event::decode)?,
            }),
            4 => Ok(ServerMessage::GameEnded {
                scores: r.read_map(|r| Ok((r.read_u8()?, r.read_u32()?)))?,
            }),
            t => Err(CodecError::InvalidTag(t)),
        }
    }

    pub fn encode<W: ByteWriter>(&self, w: &mut W) {
        match self {
            ServerMessage::Hello {
                server_name,
                players_count,
                size_x,
                size_y,
                game_length,
                explosion_radius,
                bomb_timer,
            } => {
                w.write_u8(0);
                w.write_string(server_name);
                w.write_u8(*players_count);
                w.write_u16(*size_x);
                w.write_u16(*size_y);
                w.write_u16(*game_length);
                w.write_u16(*explosion_radius);
                w.write_u16(*bomb_timer);
            }
            ServerMessage::AcceptedPlayer { id, player } => {
                w.write_u8(1);
                w.write_u8(*id);
                encode_player(w, player);
            }
            ServerMessage::GameStarted { players } => {
                w.write_u8(2);
                w.write_map(players, |w, k, v| {
                    w.write_u8(*k);
                    encode_player(w, v);
                });
            }
            ServerMessage::Turn { turn, events } => {
                w.write_u8(3);
                w.write_u16(*turn);
                w.write_list(events, |w, e| e.encode(w));
            }
            ServerMessage::GameEnded { scores } => {
                w.write_u8(4);
                w.write_map(scores, |w, k, v| {
                    w.write_u8(*k);
                    w.write_u32(*v);
                });
            }
        }
    }
}

/// Client proxy -> GUI, over UDP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawMessage {
    Lobby {
        server_name: String,
        players_count: u8,
        size_x: u16,
        size_y: u16,
        game_length: u16,
        explosion_radius: u16,
        bomb_timer: u16,
        players: PlayerMap<Player>,
    },
    Game {
        server_name: String,
        size_x: u16,
        size_y: u16,
        game_length: u16,
        turn: u16,
        players: PlayerMap<Player>,
        player_positions: PlayerMap<Position>,
        blocks: BTreeSet<Position>,
        bombs: std::collections::BTreeMap<u32, Bomb>,
        explosions: BTreeSet<Position>,
        scores: PlayerMap<u32>,
    },
}

impl DrawMessage {
    pub fn encode<W: ByteWriter>(&self, w: &mut W) {
        match self {
            DrawMessage::Lobby {
                server_name,
                players_count,
                size_x,
                size_y,
                game_length,
                explosion_radius,
                bomb_timer,
                players,
            } => {
                w.write_u8(0);
                w.write_string(server_name);
                w.write_u8(*players_count);
                w.write_u16(*size_x);
                w.write_u16(*size_y);
                w.write_u16(*game_length);
                w.write_u16(*explosion_radius);
                w.write_u16(*bomb_timer);
                w.write_map(players, |w, k, v| {
                    w.write_u8(*k);
                    encode_player(w, v);
                });
            }
            DrawMessage::Game {
                server_name,
                size_x,
                size_y,
                game_length,
                turn,
                players,
                player_positions,
                blocks,
                bombs,
                explosions,
                scores,
            } => {
                w.write_u8(1);
                w.write_string(server_name);
                w.write_u16(*size_x);
                w.write_u16(*size_y);
                w.write_u16(*game_length);
                w.write_u16(*turn);
                w.write_map(players, |w, k, v| {
                    w.write_u8(*k);
                    encode_player(w, v);
                });
                w.write_map(player_positions, |w, k, v| {
                    w.write_u8(*k);
                    encode_position(w, v);
                });
                let block_list: Vec<Position> = blocks.iter().copied().collect();
                w.write_list(&block_list, |w, p| encode_position(w, p));
                w.write_map(bombs, |w, k, v| {
                    w.write_u32(*k);
                    encode_position(w, &v.position);
                    w.write_u16(v.timer);
                });
                let explosion_list: Vec<Position> = explosions.iter().copied().collect();
                w.write_list(&explosion_list, |w, p| encode_position(w, p));
                w.write_map(scores, |w, k, v| {
                    w.write_u8(*k);
                    w.write_u32(*v);
                });
            }
        }
    }
}
