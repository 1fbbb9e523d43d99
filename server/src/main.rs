//! Server binary entry point.

use clap::Parser;
use log::info;
use server::config::{GameConfig, ServerArgs};
use server::server::Server;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = ServerArgs::parse();
    let port = args.port;
    let config: GameConfig = args.into();

    info!(
        "Starting server \"{}\" on port {port} ({}x{}, {} players)",
        config.server_name, config.size_x, config.size_y, config.players_count
    );

    let server = Server::new(config);
    server.spawn_acceptor(port)?;
    server.run_game_loop();
}
