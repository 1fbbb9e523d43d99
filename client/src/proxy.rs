//! The two proxy threads: GUI->server and server->GUI.
//!
//! Grounded in `original_source/client/robots-client.cpp`'s
//! `from_gui_to_server` and `from_server_to_gui` functions. Each thread owns
//! one direction of the bridge; the only thing they share is the game
//! [`SharedPhase`] and, on the receive side, the `ClientState` mirror.

use crate::state::{ClientState, SharedPhase};
use log::{debug, warn};
use shared::{
    BufferUdp, ByteWriter, ClientMessage, CodecError, InputMessage, ServerMessage, SliceReader,
    TcpReader, TcpWriter, VecWriter,
};
use std::net::{SocketAddr, TcpStream, UdpSocket};
use std::sync::{Arc, Mutex};

/// Reads `InputMessage` datagrams from the GUI and forwards them to the
/// server as `ClientMessage`s. While the game is in the Lobby, any datagram
/// (regardless of its decoded contents) triggers a `Join` with the
/// configured player name, matching the original's "any input joins" rule.
pub fn run_gui_to_server(
    udp: Arc<UdpSocket>,
    mut writer: TcpWriter<TcpStream>,
    phase: SharedPhase,
    player_name: String,
) {
    let buffer = BufferUdp::new(&udp);
    loop {
        let datagram = match buffer.receive_datagram() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("gui socket read error: {e}");
                break;
            }
        };
        let mut reader = SliceReader::new(&datagram);
        let input = match InputMessage::decode(&mut reader) {
            Ok(input) if reader.at_end() => input,
            Ok(_) => {
                debug!("dropping gui datagram with trailing garbage");
                continue;
            }
            Err(e) => {
                debug!("dropping malformed gui datagram: {e}");
                continue;
            }
        };

        let client_message = if phase.is_lobby() {
            ClientMessage::Join(player_name.clone())
        } else {
            match input {
                InputMessage::PlaceBomb => ClientMessage::PlaceBomb,
                InputMessage::PlaceBlock => ClientMessage::PlaceBlock,
                InputMessage::Move(direction) => ClientMessage::Move(direction),
            }
        };

        let mut w = VecWriter::new();
        client_message.encode(&mut w);
        if let Err(e) = writer.send(w.as_slice()) {
            warn!("server write error, stopping gui->server relay: {e}");
            break;
        }
    }
}

/// Reads `ServerMessage`s from the server, updates the local state mirror,
/// and forwards a `DrawMessage` to the GUI whenever the update is one the
/// GUI needs to see (everything except `GameStarted`).
pub fn run_server_to_gui(
    mut reader: TcpReader<TcpStream>,
    udp: Arc<UdpSocket>,
    gui_addr: SocketAddr,
    state: Arc<Mutex<ClientState>>,
    phase: SharedPhase,
) {
    let buffer = BufferUdp::new(&udp);
    loop {
        let message = match ServerMessage::decode(&mut reader) {
            Ok(m) => m,
            Err(CodecError::PeerClosed) => {
                debug!("server closed the connection");
                break;
            }
            Err(e) => {
                warn!("server read error, stopping server->gui relay: {e}");
                break;
            }
        };

        let should_forward = {
            let mut state = state.lock().unwrap();
            state.apply(&message, &phase)
        };
        if !should_forward {
            continue;
        }

        let draw = state.lock().unwrap().to_draw_message(&phase);
        let mut w = VecWriter::new();
        draw.encode(&mut w);
        if let Err(e) = buffer.send_datagram(w.as_slice(), gui_addr) {
            warn!("gui write error: {e}");
        }
    }
}
