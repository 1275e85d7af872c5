//! Integration tests for tournaments: registration, auto-start, brackets and advancement.

mod common;

use chess_lobby::models::{AchievementKind, GameOutcome};
use chess_lobby::{
    BoardView, ChessMove, Config, GameMode, KingCaptureRules, LobbyError, RoomId, RoomStatus,
    RuleEngine, Standing, Tournament, TournamentId, TournamentStatus, Verdict,
};
use common::*;
use serde_json::json;
use std::sync::{Arc, Barrier};
use std::thread;

/// King captures still win; any game reaching two moves without one is drawn.
struct DrawRules;

impl RuleEngine for DrawRules {
    fn is_legal(&self, board: &BoardView<'_>, mv: &ChessMove) -> bool {
        KingCaptureRules.is_legal(board, mv)
    }

    fn standing(&self, board: &BoardView<'_>) -> Standing {
        let mut standing = KingCaptureRules.standing(board);
        if standing.verdict.is_none() && board.moves.len() >= 2 {
            standing.verdict = Some(Verdict::Draw);
        }
        standing
    }
}

/// Two quiet moves in a started two-player room: white then black.
fn draw_out(gw: &chess_lobby::Gateway, white: &mut Client, black: &mut Client, room_id: RoomId) {
    send(gw, white, "start_game", json!({ "roomId": room_id }));
    play(gw, white, room_id, move_json((6, 4), (4, 4), "white", None));
    play(gw, black, room_id, move_json((1, 4), (3, 4), "black", None));
}

fn players(gw: &chess_lobby::Gateway, n: usize) -> Vec<Client> {
    (1..=n).map(|i| register(gw, &format!("p{i}"))).collect()
}

fn join_all(gw: &chess_lobby::Gateway, clients: &mut [Client], tournament_id: TournamentId) {
    for client in clients.iter_mut() {
        send(gw, client, "join_tournament", json!({ "tournamentId": tournament_id }));
    }
}

fn match_rooms(
    gw: &chess_lobby::Gateway,
    tournament_id: TournamentId,
) -> Vec<(RoomId, Vec<String>)> {
    let t = gw.lobby().tournaments.snapshot(tournament_id).unwrap().tournament;
    t.rounds[t.current_round]
        .matches
        .iter()
        .map(|m| (m.room_id, m.players.clone()))
        .collect()
}

#[test]
fn fourth_join_starts_a_two_player_bracket() {
    let gw = gateway();
    let mut clients = players(&gw, 4);
    let tid = create_tournament(
        &gw,
        &mut clients[0],
        json!({ "name": "Cup", "gameMode": "2player", "maxParticipants": 8 }),
    );
    join_all(&gw, &mut clients[..3], tid);
    let t = gw.lobby().tournaments.snapshot(tid).unwrap().tournament;
    assert_eq!(t.status, TournamentStatus::Registration);

    join_all(&gw, &mut clients[3..], tid);
    let t = gw.lobby().tournaments.snapshot(tid).unwrap().tournament;
    assert_eq!(t.status, TournamentStatus::Active);
    assert_eq!(t.rounds.len(), 2);
    let matches = &t.rounds[0].matches;
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].players, vec!["p1".to_string(), "p2".to_string()]);
    assert_eq!(matches[1].players, vec!["p3".to_string(), "p4".to_string()]);

    for m in matches {
        let room = gw.lobby().rooms.snapshot(m.room_id).unwrap().room;
        assert_eq!(room.tournament_id, Some(tid));
        assert_eq!(room.status, RoomStatus::Waiting);
        assert_eq!(room.members, m.players);
    }
    for client in clients.iter_mut() {
        assert_eq!(client.take("tournament_started").len(), 1);
    }
}

#[test]
fn fourth_join_starts_a_single_four_player_match() {
    let gw = gateway();
    let mut clients = players(&gw, 4);
    let tid = create_tournament(
        &gw,
        &mut clients[0],
        json!({ "name": "Cup", "gameMode": "4player", "maxParticipants": 8 }),
    );
    join_all(&gw, &mut clients, tid);
    let rooms = match_rooms(&gw, tid);
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].1.len(), 4);
}

#[test]
fn joins_after_auto_start_are_rejected() {
    let gw = gateway();
    let mut clients = players(&gw, 5);
    let tid = create_tournament(
        &gw,
        &mut clients[0],
        json!({ "name": "Cup", "gameMode": "2player", "maxParticipants": 8 }),
    );
    join_all(&gw, &mut clients[..4], tid);
    assert_eq!(clients[3].take("tournament_started").len(), 1);
    send(&gw, &mut clients[4], "join_tournament", json!({ "tournamentId": tid }));
    assert_eq!(clients[4].last_error().as_deref(), Some("invalid_state"));
    let t = gw.lobby().tournaments.snapshot(tid).unwrap().tournament;
    assert_eq!(t.participants.len(), 4);
}

#[test]
fn creation_validates_and_announces() {
    let gw = gateway();
    let mut p1 = register(&gw, "p1");
    let mut p2 = register(&gw, "p2");
    send(
        &gw,
        &mut p1,
        "create_tournament",
        json!({ "name": "Tiny", "gameMode": "2player", "maxParticipants": 2 }),
    );
    assert_eq!(p1.last_error().as_deref(), Some("validation"));

    let tid = create_tournament(&gw, &mut p1, json!({ "name": "Cup", "gameMode": "3player" }));
    let t = gw.lobby().tournaments.snapshot(tid).unwrap().tournament;
    assert_eq!(t.max_participants, 16);
    assert_eq!(t.biome, "forest");
    let lists = p2.take("tournament_list_updated");
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0]["data"]["tournaments"][0]["name"], "Cup");
}

#[test]
fn duplicate_and_overflow_registration() {
    let mut t = Tournament::new("Cup", GameMode::TwoPlayer, "forest", 2);
    t.add_participant("p1").unwrap();
    assert!(matches!(t.add_participant("p1"), Err(LobbyError::InvalidState(_))));
    t.add_participant("p2").unwrap();
    assert_eq!(t.add_participant("p3"), Err(LobbyError::Full("Tournament")));
    assert_eq!(t.participants.len(), 2);
}

#[test]
fn auto_start_fires_exactly_once_under_concurrent_joins() {
    let gw = gateway();
    let mut clients = players(&gw, 8);
    let tid = create_tournament(
        &gw,
        &mut clients[0],
        json!({ "name": "Cup", "gameMode": "2player", "maxParticipants": 16 }),
    );
    let ids: Vec<String> = clients.iter().map(Client::id).collect();

    let barrier = Barrier::new(ids.len());
    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = ids
            .iter()
            .map(|id| {
                let (gw, barrier) = (&gw, &barrier);
                s.spawn(move || {
                    barrier.wait();
                    gw.lobby().tournaments.join(tid, id)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 4);
    let t = gw.lobby().tournaments.snapshot(tid).unwrap().tournament;
    assert_eq!(t.participants.len(), 4);
    assert_eq!(t.rounds[0].matches.len(), 2);
    let started: usize = clients
        .iter_mut()
        .map(|c| c.take("tournament_started").len())
        .sum();
    assert_eq!(started, 4);
    let tournament_rooms = gw
        .lobby()
        .rooms
        .list()
        .into_iter()
        .filter(|r| r.room.tournament_id == Some(tid))
        .count();
    assert_eq!(tournament_rooms, 2);
}

#[test]
fn outsiders_cannot_join_match_rooms() {
    let gw = gateway();
    let mut clients = players(&gw, 5);
    let tid = create_tournament(
        &gw,
        &mut clients[0],
        json!({ "name": "Cup", "gameMode": "2player" }),
    );
    join_all(&gw, &mut clients[..4], tid);
    let (room_id, _) = match_rooms(&gw, tid)[0].clone();
    join(&gw, &mut clients[4], room_id);
    assert_eq!(clients[4].last_error().as_deref(), Some("forbidden"));
}

#[test]
fn winners_advance_until_a_champion_remains() {
    let gw = gateway();
    let mut clients = players(&gw, 4);
    let tid = create_tournament(
        &gw,
        &mut clients[0],
        json!({ "name": "Cup", "gameMode": "2player" }),
    );
    join_all(&gw, &mut clients, tid);
    let rooms = match_rooms(&gw, tid);

    // p1 beats p2 on the board
    let first = rooms[0].0;
    send(&gw, &mut clients[0], "start_game", json!({ "roomId": first }));
    play(&gw, &mut clients[0], first, move_json((7, 3), (0, 4), "white", Some("black")));
    assert_eq!(clients[0].last_error(), None);

    // p4 walks out of a running game; p3 wins by forfeit
    let second = rooms[1].0;
    send(&gw, &mut clients[2], "start_game", json!({ "roomId": second }));
    send(&gw, &mut clients[3], "leave_room", json!({ "roomId": second }));

    let t = gw.lobby().tournaments.snapshot(tid).unwrap().tournament;
    assert_eq!(t.current_round, 1);
    assert_eq!(t.rounds[0].advancing_players(), vec!["p1".to_string(), "p3".to_string()]);
    let final_rooms = match_rooms(&gw, tid);
    assert_eq!(final_rooms.len(), 1);
    assert_eq!(final_rooms[0].1, vec!["p1".to_string(), "p3".to_string()]);
    let round_started = clients[1].take("tournament_round_started");
    assert_eq!(round_started.len(), 1);
    assert_eq!(round_started[0]["data"]["roundNumber"], 2);

    let last = final_rooms[0].0;
    send(&gw, &mut clients[2], "start_game", json!({ "roomId": last }));
    play(&gw, &mut clients[0], last, move_json((7, 3), (0, 4), "white", Some("black")));

    let t = gw.lobby().tournaments.snapshot(tid).unwrap().tournament;
    assert_eq!(t.status, TournamentStatus::Finished);
    assert_eq!(t.winner.as_deref(), Some("p1"));
    assert!(t.end_time.is_some());
    assert!(gw
        .lobby()
        .registry
        .history("p1")
        .unwrap()
        .has(AchievementKind::TournamentWinner));
    for client in clients.iter_mut() {
        assert_eq!(client.take("tournament_finished").len(), 1);
    }
}

#[test]
fn trailing_single_player_gets_a_bye() {
    let gw = gateway_with(Config {
        tournament_min_participants: 5,
        ..Config::default()
    });
    let mut clients = players(&gw, 5);
    let tid = create_tournament(
        &gw,
        &mut clients[0],
        json!({ "name": "Cup", "gameMode": "2player" }),
    );
    join_all(&gw, &mut clients, tid);

    let t = gw.lobby().tournaments.snapshot(tid).unwrap().tournament;
    assert_eq!(t.status, TournamentStatus::Active);
    assert_eq!(t.rounds[0].matches.len(), 2);
    assert_eq!(t.rounds[0].byes, vec!["p5".to_string()]);
    assert_eq!(
        t.rounds.iter().map(|r| r.expected_players).collect::<Vec<_>>(),
        vec![5, 3, 2]
    );
}

#[test]
fn leaving_a_waiting_match_hands_a_walkover() {
    let gw = gateway();
    let mut clients = players(&gw, 4);
    let tid = create_tournament(
        &gw,
        &mut clients[0],
        json!({ "name": "Cup", "gameMode": "2player" }),
    );
    join_all(&gw, &mut clients, tid);
    let rooms = match_rooms(&gw, tid);

    send(&gw, &mut clients[1], "leave_room", json!({ "roomId": rooms[0].0 }));
    let t = gw.lobby().tournaments.snapshot(tid).unwrap().tournament;
    let first = &t.rounds[0].matches[0];
    assert!(first.resolved);
    assert_eq!(first.advancing.as_deref(), Some("p1"));
    assert_eq!(t.current_round, 0);

    // the second walkover completes round 1
    send(&gw, &mut clients[2], "leave_room", json!({ "roomId": rooms[1].0 }));
    let t = gw.lobby().tournaments.snapshot(tid).unwrap().tournament;
    assert_eq!(t.rounds[0].matches[1].advancing.as_deref(), Some("p4"));
    assert_eq!(t.current_round, 1);

    // leaving the stale first-round room does not touch the final
    send(&gw, &mut clients[3], "leave_room", json!({ "roomId": rooms[1].0 }));
    let t = gw.lobby().tournaments.snapshot(tid).unwrap().tournament;
    assert_eq!(t.status, TournamentStatus::Active);
    assert_eq!(
        t.rounds[1].matches[0].players,
        vec!["p1".to_string(), "p4".to_string()]
    );
}

#[test]
fn advance_round_refuses_unfinished_rounds() {
    let gw = gateway();
    let mut clients = players(&gw, 4);
    let tid = create_tournament(
        &gw,
        &mut clients[0],
        json!({ "name": "Cup", "gameMode": "2player" }),
    );
    let err = gw.lobby().tournaments.advance_round(tid).unwrap_err();
    assert_eq!(err.code(), "invalid_state");
    join_all(&gw, &mut clients, tid);
    let err = gw.lobby().tournaments.advance_round(tid).unwrap_err();
    assert_eq!(err.code(), "invalid_state");
}

#[test]
fn drawn_match_advances_the_higher_rated_player() {
    let gw = gateway_with_rules(Config::default(), Arc::new(DrawRules));
    let mut clients = players(&gw, 4);

    // p2 beats p3 in a casual game first: p2 1216, p3 1184
    let warm_up = create_room(
        &gw,
        &mut clients[1],
        json!({ "name": "Casual", "gameMode": "2player" }),
    );
    join(&gw, &mut clients[1], warm_up);
    join(&gw, &mut clients[2], warm_up);
    send(&gw, &mut clients[1], "start_game", json!({ "roomId": warm_up }));
    play(&gw, &mut clients[1], warm_up, move_json((7, 3), (0, 4), "white", Some("black")));
    assert_eq!(gw.lobby().registry.lookup("p2").unwrap().rating, 1216);

    let tid = create_tournament(
        &gw,
        &mut clients[0],
        json!({ "name": "Cup", "gameMode": "2player" }),
    );
    join_all(&gw, &mut clients, tid);
    let rooms = match_rooms(&gw, tid);
    for client in clients.iter_mut() {
        client.drain();
    }

    let (left, right) = clients.split_at_mut(1);
    draw_out(&gw, &mut left[0], &mut right[0], rooms[0].0);
    let finished = clients[0].take("game_finished");
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0]["data"]["result"]["reason"], "draw");
    assert_eq!(finished[0]["data"]["result"]["winners"], json!([]));
    assert_eq!(finished[0]["data"]["ratingChanges"].as_array().unwrap().len(), 2);

    let (left, right) = clients.split_at_mut(3);
    draw_out(&gw, &mut left[2], &mut right[0], rooms[1].0);

    let t = gw.lobby().tournaments.snapshot(tid).unwrap().tournament;
    assert_eq!(t.rounds[0].matches[0].advancing.as_deref(), Some("p2"));
    assert_eq!(t.rounds[0].matches[1].advancing.as_deref(), Some("p4"));
    assert_eq!(t.current_round, 1);
    assert_eq!(
        t.rounds[1].matches[0].players,
        vec!["p2".to_string(), "p4".to_string()]
    );

    let history = gw.lobby().registry.history("p1").unwrap();
    assert_eq!(history.games.len(), 1);
    assert_eq!(history.games[0].result, GameOutcome::Draw);
    assert_eq!(history.games[0].tournament_id, Some(tid));
    assert_eq!(history.total_games_won, 0);
    let history = gw.lobby().registry.history("p2").unwrap();
    assert_eq!(history.games.last().unwrap().result, GameOutcome::Draw);
    assert_eq!(history.total_games_won, 1);
}

#[test]
fn drawn_match_between_equal_ratings_advances_the_first_seat() {
    let gw = gateway_with_rules(
        Config {
            tournament_min_participants: 2,
            ..Config::default()
        },
        Arc::new(DrawRules),
    );
    let mut clients = players(&gw, 2);
    let tid = create_tournament(
        &gw,
        &mut clients[0],
        json!({ "name": "Duel", "gameMode": "2player" }),
    );
    join_all(&gw, &mut clients, tid);
    let room_id = match_rooms(&gw, tid)[0].0;

    let (left, right) = clients.split_at_mut(1);
    draw_out(&gw, &mut left[0], &mut right[0], room_id);

    let t = gw.lobby().tournaments.snapshot(tid).unwrap().tournament;
    assert_eq!(t.status, TournamentStatus::Finished);
    assert_eq!(t.winner.as_deref(), Some("p1"));
}
