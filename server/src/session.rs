//! Per-client session: a receive thread, a send thread, a latest-intent
//! slot, and a closed flag.
//!
//! Grounded in `original_source/server/client_connection.h`,
//! `message_sender.h`, and `message_receiver.h`. The receive thread either
//! forwards `Join` to the game manager or overwrites the intent slot; the
//! send thread drains the per-session queue until it's closed.

use crate::blocking_queue::{BlockingQueue, PopError};
use crate::game_manager::GameManager;
use log::{debug, info, warn};
use shared::{ByteWriter, ClientMessage, ServerMessage, TcpReader, TcpWriter, VecWriter};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

pub struct Session {
    pub client_id: u32,
    pub send_queue: Arc<BlockingQueue<ServerMessage>>,
    intent: Mutex<Option<ClientMessage>>,
    closed: AtomicBool,
}

impl Session {
    pub fn new(client_id: u32) -> Arc<Self> {
        Arc::new(Session {
            client_id,
            send_queue: BlockingQueue::new(),
            intent: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    pub fn set_intent(&self, msg: ClientMessage) {
        *self.intent.lock().unwrap() = Some(msg);
    }

    /// Takes the latest unread intent, if any, clearing the slot. Last
    /// write since the previous call wins.
    pub fn take_intent(&self) -> Option<ClientMessage> {
        self.intent.lock().unwrap().take()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.send_queue.close();
    }
}

/// Reads `ClientMessage`s until the connection closes or a malformed
/// message arrives. A failure here is contained to this session.
pub fn run_receive(
    session: Arc<Session>,
    stream: TcpStream,
    game_manager: Arc<GameManager>,
    address: String,
) {
    let client_id = session.client_id;
    let mut reader = TcpReader::new(stream);
    loop {
        match ClientMessage::decode(&mut reader) {
            Ok(ClientMessage::Join(name)) => {
                if game_manager.add_player(client_id, name.clone(), address.clone()) {
                    info!("client {client_id} joined as \"{name}\"");
                } else {
                    debug!("client {client_id} join rejected (lobby full or already joined)");
                }
            }
            Ok(action) => session.set_intent(action),
            Err(e) => {
                warn!("client {client_id} receive error, closing session: {e}");
                session.close();
                break;
            }
        }
    }
}

/// Drains the session's send queue to the socket until the queue is closed.
pub fn run_send(session: Arc<Session>, stream: TcpStream) {
    let client_id = session.client_id;
    let mut writer = TcpWriter::new(stream);
    loop {
        match session.send_queue.pop() {
            Ok(msg) => {
                let mut w = VecWriter::new();
                msg.encode(&mut w);
                if let Err(e) = writer.send(w.as_slice()) {
                    warn!("client {client_id} send error, closing session: {e}");
                    session.close();
                    break;
                }
            }
            Err(PopError::Closed) => break,
        }
    }
}

/// Spawns both threads for a newly accepted connection.
pub fn spawn(
    session: Arc<Session>,
    stream: TcpStream,
    game_manager: Arc<GameManager>,
    address: String,
) -> std::io::Result<()> {
    let recv_stream = stream.try_clone()?;
    let recv_session = Arc::clone(&session);
    thread::spawn(move || run_receive(recv_session, recv_stream, game_manager, address));

    let send_session = Arc::clone(&session);
    thread::spawn(move || run_send(send_session, stream));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Direction;

    #[test]
    fn intent_slot_keeps_only_latest() {
        let session = Session::new(1);
        session.set_intent(ClientMessage::PlaceBomb);
        session.set_intent(ClientMessage::Move(Direction::Up));
        assert_eq!(session.take_intent(), Some(ClientMessage::Move(Direction::Up)));
        assert_eq!(session.take_intent(), None);
    }

    #[test]
    fn close_marks_closed_and_closes_queue() {
        let session = Session::new(1);
        assert!(!session.is_closed());
        session.close();
        assert!(session.is_closed());
        assert!(session.send_queue.is_closed());
    }
}
