//! Command-line configuration for the server binary.
//!
//! Flags mirror `original_source/common/program_options.h` /
//! `server/robots-server.cpp` letter-for-letter.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "robots-server", about = "Authoritative Bomberman-style game server")]
pub struct ServerArgs {
    /// Bomb timer, in turns, before a placed bomb explodes.
    #[arg(short = 'b', long = "bomb-timer")]
    pub bomb_timer: u16,

    /// Number of players required before a game starts.
    #[arg(short = 'c', long = "players-count")]
    pub players_count: u8,

    /// Duration of one turn, in milliseconds.
    #[arg(short = 'd', long = "turn-duration")]
    pub turn_duration_ms: u64,

    /// Explosion radius, in cells, along each of the four rays.
    #[arg(short = 'e', long = "explosion-radius")]
    pub explosion_radius: u16,

    /// Number of blocks randomly placed at game start.
    #[arg(short = 'k', long = "initial-blocks")]
    pub initial_blocks: u16,

    /// Number of turns in one game.
    #[arg(short = 'l', long = "game-length")]
    pub game_length: u16,

    /// Name advertised to clients in `Hello`.
    #[arg(short = 'n', long = "server-name")]
    pub server_name: String,

    /// TCP port to listen on.
    #[arg(short = 'p', long = "port")]
    pub port: u16,

    /// PRNG seed.
    #[arg(short = 's', long = "seed", default_value_t = 0)]
    pub seed: u32,

    /// Board width.
    #[arg(short = 'x', long = "size-x")]
    pub size_x: u16,

    /// Board height.
    #[arg(short = 'y', long = "size-y")]
    pub size_y: u16,
}

/// Immutable snapshot of the static game configuration, built once from CLI
/// args and carried by the game manager for the life of the process.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub server_name: String,
    pub players_count: u8,
    pub size_x: u16,
    pub size_y: u16,
    pub game_length: u16,
    pub explosion_radius: u16,
    pub bomb_timer: u16,
    pub turn_duration_ms: u64,
    pub initial_blocks: u16,
    pub seed: u32,
}

impl From<ServerArgs> for GameConfig {
    fn from(args: ServerArgs) -> Self {
        GameConfig {
            server_name: args.server_name,
            players_count: args.players_count,
            size_x: args.size_x,
            size_y: args.size_y,
            game_length: args.game_length,
            explosion_radius: args.explosion_radius,
            bomb_timer: args.bomb_timer,
            turn_duration_ms: args.turn_duration_ms,
            initial_blocks: args.initial_blocks,
            seed: args.seed,
        }
    }
}
