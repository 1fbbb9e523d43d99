//! End-to-end tests against a real server over loopback TCP.
//!
//! Each test starts its own `Server` on a fixed port, connects a plain
//! `TcpStream` client, and drives it through the wire protocol exactly as a
//! real client proxy would: `Join`, then a run of `Turn`s, then `GameEnded`.

use server::config::GameConfig;
use server::server::Server;
use shared::{ByteWriter, ClientMessage, Direction, ServerMessage, TcpReader, TcpWriter, VecWriter};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

fn connect_with_retry(port: u16) -> TcpStream {
    let addr = format!("127.0.0.1:{port}");
    for _ in 0..50 {
        if let Ok(stream) = TcpStream::connect(&addr) {
            stream.set_nodelay(true).unwrap();
            return stream;
        }
        thread::sleep(Duration::from_millis(20));
    }
    panic!("could not connect to test server on port {port}");
}

fn send(stream: &mut TcpWriter<TcpStream>, msg: &ClientMessage) {
    let mut w = VecWriter::new();
    msg.encode(&mut w);
    stream.send(w.as_slice()).unwrap();
}

fn recv(reader: &mut TcpReader<TcpStream>) -> ServerMessage {
    ServerMessage::decode(reader).expect("expected a well-formed server message")
}

fn start_server(port: u16, config: GameConfig) {
    let server = Server::new(config);
    server.spawn_acceptor(port).expect("acceptor bind failed");
    thread::spawn(move || server.run_game_loop());
}

#[test]
fn single_player_game_runs_lobby_through_game_ended() {
    let port = 18080;
    start_server(
        port,
        GameConfig {
            server_name: "integration".to_string(),
            players_count: 1,
            size_x: 3,
            size_y: 3,
            game_length: 2,
            explosion_radius: 1,
            bomb_timer: 1,
            turn_duration_ms: 10,
            initial_blocks: 0,
            seed: 1,
        },
    );

    let stream = connect_with_retry(port);
    let mut writer = TcpWriter::new(stream.try_clone().unwrap());
    let mut reader = TcpReader::new(stream);

    assert!(matches!(recv(&mut reader), ServerMessage::Hello { players_count: 1, .. }));

    send(&mut writer, &ClientMessage::Join("Alice".to_string()));

    assert!(matches!(
        recv(&mut reader),
        ServerMessage::AcceptedPlayer { id: 0, .. }
    ));
    assert!(matches!(recv(&mut reader), ServerMessage::GameStarted { .. }));

    // initial placement turn, then `game_length` turns.
    for _ in 0..3 {
        assert!(matches!(recv(&mut reader), ServerMessage::Turn { .. }));
    }

    match recv(&mut reader) {
        ServerMessage::GameEnded { scores } => {
            assert_eq!(scores.len(), 1);
            assert_eq!(scores.get(&0), Some(&0));
        }
        other => panic!("expected GameEnded, got {other:?}"),
    }
}

#[test]
fn movement_intent_updates_player_position() {
    let port = 18081;
    start_server(
        port,
        GameConfig {
            server_name: "integration".to_string(),
            players_count: 1,
            size_x: 5,
            size_y: 5,
            game_length: 1,
            explosion_radius: 1,
            bomb_timer: 3,
            turn_duration_ms: 30,
            initial_blocks: 0,
            seed: 42,
        },
    );

    let stream = connect_with_retry(port);
    let mut writer = TcpWriter::new(stream.try_clone().unwrap());
    let mut reader = TcpReader::new(stream);

    recv(&mut reader); // Hello
    send(&mut writer, &ClientMessage::Join("Bob".to_string()));
    recv(&mut reader); // AcceptedPlayer
    recv(&mut reader); // GameStarted

    let spawn_turn = recv(&mut reader);
    let spawn_position = match spawn_turn {
        ServerMessage::Turn { events, .. } => events
            .into_iter()
            .find_map(|e| match e {
                shared::Event::PlayerMoved { player_id: 0, position } => Some(position),
                _ => None,
            })
            .expect("spawn turn should place player 0"),
        other => panic!("expected initial Turn, got {other:?}"),
    };

    send(&mut writer, &ClientMessage::Move(Direction::Right));

    let moved_turn = recv(&mut reader);
    match moved_turn {
        ServerMessage::Turn { events, .. } => {
            let moved = events.into_iter().find_map(|e| match e {
                shared::Event::PlayerMoved { player_id: 0, position } => Some(position),
                _ => None,
            });
            let position = moved.expect("move right should have produced a PlayerMoved event");
            assert_ne!(position, spawn_position);
        }
        other => panic!("expected Turn, got {other:?}"),
    }

    assert!(matches!(recv(&mut reader), ServerMessage::GameEnded { .. }));
}

#[test]
fn mid_game_arrival_receives_replayed_log() {
    let port = 18082;
    start_server(
        port,
        GameConfig {
            server_name: "integration".to_string(),
            players_count: 1,
            size_x: 3,
            size_y: 3,
            game_length: 1,
            explosion_radius: 1,
            bomb_timer: 1,
            turn_duration_ms: 50,
            initial_blocks: 0,
            seed: 7,
        },
    );

    let first = connect_with_retry(port);
    let mut first_writer = TcpWriter::new(first.try_clone().unwrap());
    let mut first_reader = TcpReader::new(first);
    recv(&mut first_reader); // Hello
    send(&mut first_writer, &ClientMessage::Join("First".to_string()));
    recv(&mut first_reader); // AcceptedPlayer
    recv(&mut first_reader); // GameStarted, lobby now full and game running

    // A second connection during the running game gets the replayed log
    // (Hello, then every Turn emitted so far) even though the lobby is full.
    let second = connect_with_retry(port);
    let mut second_reader = TcpReader::new(second);
    assert!(matches!(recv(&mut second_reader), ServerMessage::Hello { .. }));
}
