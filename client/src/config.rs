//! Command-line configuration for the client-proxy binary.
//!
//! Flags mirror `original_source/common/program_options.h` /
//! `client/robots-client.cpp` letter-for-letter.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "robots-client", about = "UDP GUI <-> TCP server bridge")]
pub struct ClientArgs {
    /// GUI address, `host:port`, to send `DrawMessage`s to.
    #[arg(short = 'd', long = "gui-address")]
    pub gui_address: String,

    /// Player name sent with `Join` while in the Lobby.
    #[arg(short = 'n', long = "player-name")]
    pub player_name: String,

    /// Local UDP port to bind for GUI communication.
    #[arg(short = 'p', long = "port")]
    pub port: u16,

    /// Server address, `host:port`, to connect to over TCP.
    #[arg(short = 's', long = "server-address")]
    pub server_address: String,
}
