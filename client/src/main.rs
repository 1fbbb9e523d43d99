//! Client-proxy binary entry point.

use client::config::ClientArgs;
use client::proxy::{run_gui_to_server, run_server_to_gui};
use client::state::{ClientState, SharedPhase};
use clap::Parser;
use log::info;
use shared::{TcpReader, TcpWriter};
use std::net::{TcpStream, ToSocketAddrs, UdpSocket};
use std::sync::{Arc, Mutex};
use std::thread;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = ClientArgs::parse();

    let gui_addr = args
        .gui_address
        .to_socket_addrs()?
        .next()
        .ok_or("could not resolve gui address")?;

    info!("connecting to server at {}", args.server_address);
    let stream = TcpStream::connect(&args.server_address)?;
    stream.set_nodelay(true)?;
    let write_stream = stream.try_clone()?;

    info!("binding gui socket on port {}", args.port);
    let udp = Arc::new(UdpSocket::bind(("::", args.port))?);

    let phase = SharedPhase::new();
    let state = Arc::new(Mutex::new(ClientState::new()));

    let gui_to_server = thread::spawn({
        let udp = Arc::clone(&udp);
        let phase = phase.clone();
        let player_name = args.player_name.clone();
        let writer = TcpWriter::new(write_stream);
        move || run_gui_to_server(udp, writer, phase, player_name)
    });

    let server_to_gui = thread::spawn({
        let udp = Arc::clone(&udp);
        let phase = phase.clone();
        let state = Arc::clone(&state);
        let reader = TcpReader::new(stream);
        move || run_server_to_gui(reader, udp, gui_addr, state, phase)
    });

    gui_to_server.join().expect("gui->server thread panicked");
    server_to_gui.join().expect("server->gui thread panicked");

    Ok(())
}
