//! Shared helpers: in-memory clients driving the gateway the way a socket would.
#![allow(dead_code)]

use chess_lobby::{Config, Connection, Gateway, Lobby, RoomId, RuleEngine, TournamentId};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

pub struct Client {
    pub conn: Connection,
    inbox: UnboundedReceiver<Arc<str>>,
}

impl Client {
    pub fn id(&self) -> String {
        self.conn.player_id().unwrap_or_default().to_string()
    }

    /// Every event received so far, in delivery order.
    pub fn drain(&mut self) -> Vec<Value> {
        let mut events = Vec::new();
        while let Ok(text) = self.inbox.try_recv() {
            events.push(serde_json::from_str(&text).unwrap());
        }
        events
    }

    /// Drain, keeping only events of one `type`.
    pub fn take(&mut self, kind: &str) -> Vec<Value> {
        self.drain()
            .into_iter()
            .filter(|event| event["type"] == kind)
            .collect()
    }

    /// Drain and return the `code` of the last `error` event.
    pub fn last_error(&mut self) -> Option<String> {
        self.take("error")
            .last()
            .map(|e| e["data"]["code"].as_str().unwrap().to_string())
    }
}

pub fn gateway() -> Gateway {
    gateway_with(Config::default())
}

pub fn gateway_with(config: Config) -> Gateway {
    Gateway::new(Lobby::with_default_rules(config))
}

pub fn gateway_with_rules(config: Config, rules: Arc<dyn RuleEngine>) -> Gateway {
    Gateway::new(Lobby::new(config, rules))
}

pub fn connect(gw: &Gateway) -> Client {
    let (outbox, inbox) = unbounded_channel();
    let conn = gw.connect(outbox);
    Client { conn, inbox }
}

pub fn send(gw: &Gateway, client: &mut Client, kind: &str, data: Value) {
    let text = json!({ "type": kind, "data": data }).to_string();
    gw.handle_text(&mut client.conn, &text);
}

/// Connect and register with `id` as both id and name; the inbox starts empty.
pub fn register(gw: &Gateway, id: &str) -> Client {
    register_with(gw, id, json!({ "playerId": id, "name": id }))
}

pub fn register_with(gw: &Gateway, id: &str, data: Value) -> Client {
    let mut client = connect(gw);
    send(gw, &mut client, "register_player", data);
    assert_eq!(client.id(), id, "registration failed: {:?}", client.drain());
    client.drain();
    client
}

pub fn create_room(gw: &Gateway, client: &mut Client, data: Value) -> RoomId {
    send(gw, client, "create_room", data);
    let created = client.take("room_created");
    let id = created[0]["data"]["room"]["id"].as_str().unwrap();
    id.parse().unwrap()
}

pub fn join(gw: &Gateway, client: &mut Client, room_id: RoomId) {
    send(gw, client, "join_room", json!({ "roomId": room_id }));
}

pub fn create_tournament(gw: &Gateway, client: &mut Client, data: Value) -> TournamentId {
    send(gw, client, "create_tournament", data);
    let created = client.take("tournament_created");
    let id = created[0]["data"]["tournament"]["id"].as_str().unwrap();
    id.parse().unwrap()
}

/// A move from `(row, col)` to `(row, col)` by `color`, optionally taking a king.
pub fn move_json(from: (u8, u8), to: (u8, u8), color: &str, takes_king_of: Option<&str>) -> Value {
    let mut mv = json!({
        "from": { "row": from.0, "col": from.1 },
        "to": { "row": to.0, "col": to.1 },
        "piece": { "type": "queen", "color": color },
    });
    if let Some(victim) = takes_king_of {
        mv["capturedPiece"] = json!({ "type": "king", "color": victim });
    }
    mv
}

pub fn play(gw: &Gateway, client: &mut Client, room_id: RoomId, mv: Value) {
    send(gw, client, "game_move", json!({ "roomId": room_id, "move": mv }));
}
