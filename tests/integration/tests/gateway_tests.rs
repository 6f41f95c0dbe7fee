//! Gateway integration tests
//!
//! Every test runs its own gateway over a seeded in-memory store and talks
//! to it through real WebSocket clients.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::sync::Arc;
use std::time::Duration;

use integration_tests::{
    FlakyMessages, Frame, SlowPresence, TestServer, TestStores, WsClient, ALICE, BOB, CAROL,
    GENERAL, SECRET,
};
use kizuna_common::RealtimeConfig;
use kizuna_core::{MessageQuery, Snowflake};
use kizuna_gateway::protocol::OpCode;
use kizuna_service::MessageService;
use serde_json::{json, Value};

const QUIET: Duration = Duration::from_millis(300);

// ============================================================================
// Session authentication
// ============================================================================

#[tokio::test]
async fn test_hello_then_ready() {
    let server = TestServer::start().await.unwrap();
    let mut client = WsClient::connect(&server).await.unwrap();
    assert_eq!(client.hello["heartbeat_interval"], 45_000);

    let ready = client.identify(&server.token(ALICE)).await.unwrap();
    assert_eq!(ready["v"], 1);
    assert_eq!(ready["user"]["id"], "1");
    assert_eq!(ready["user"]["username"], "alice");
    assert!(ready["session_id"].as_str().is_some_and(|s| !s.is_empty()));

    let rooms: Vec<&str> = ready["rooms"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(rooms.contains(&"1000"));
    assert!(rooms.contains(&"2000"));
}

#[tokio::test]
async fn test_invalid_token_closes_4004() {
    let server = TestServer::start().await.unwrap();
    let mut client = WsClient::connect(&server).await.unwrap();

    client
        .send_op(OpCode::Identify, json!({ "token": "not-a-token" }))
        .await
        .unwrap();
    assert_eq!(client.expect_close().await.unwrap(), Some(4004));
    assert_eq!(server.state.connection_manager().connection_count(), 0);
}

#[tokio::test]
async fn test_unknown_user_closes_4006() {
    let server = TestServer::start().await.unwrap();
    let mut client = WsClient::connect(&server).await.unwrap();

    let token = server.token(Snowflake::new(404));
    client
        .send_op(OpCode::Identify, json!({ "token": token }))
        .await
        .unwrap();
    assert_eq!(client.expect_close().await.unwrap(), Some(4006));
}

#[tokio::test]
async fn test_command_before_identify_closes_4003() {
    let server = TestServer::start().await.unwrap();
    let mut client = WsClient::connect(&server).await.unwrap();

    client
        .send_op(OpCode::RoomJoin, json!({ "room_id": GENERAL }))
        .await
        .unwrap();
    assert_eq!(client.expect_close().await.unwrap(), Some(4003));
}

#[tokio::test]
async fn test_heartbeat_before_identify_is_acked() {
    let server = TestServer::start().await.unwrap();
    let mut client = WsClient::connect(&server).await.unwrap();

    client.send_op(OpCode::Heartbeat, Value::Null).await.unwrap();
    match client.next_frame().await.unwrap() {
        Frame::Json(frame) => assert_eq!(frame["op"], 11),
        other => panic!("expected ack, got {other:?}"),
    }

    client.identify(&server.token(BOB)).await.unwrap();
}

#[tokio::test]
async fn test_identify_timeout_closes_4008() {
    let server = TestServer::start_with(RealtimeConfig {
        auth_timeout_ms: 200,
        ..RealtimeConfig::default()
    })
    .await
    .unwrap();
    let mut client = WsClient::connect(&server).await.unwrap();

    assert_eq!(client.expect_close().await.unwrap(), Some(4008));
}

#[tokio::test]
async fn test_second_identify_closes_4005() {
    let server = TestServer::start().await.unwrap();
    let (mut client, _) = server.login(ALICE).await.unwrap();

    client
        .send_op(OpCode::Identify, json!({ "token": server.token(ALICE) }))
        .await
        .unwrap();
    assert_eq!(client.expect_close().await.unwrap(), Some(4005));
}

#[tokio::test]
async fn test_malformed_frames_close_the_connection() {
    let server = TestServer::start().await.unwrap();

    let (mut client, _) = server.login(ALICE).await.unwrap();
    client.send_raw("{not json").await.unwrap();
    assert_eq!(client.expect_close().await.unwrap(), Some(4002));

    let (mut client, _) = server.login(ALICE).await.unwrap();
    client.send_raw(r#"{"op":99}"#).await.unwrap();
    assert_eq!(client.expect_close().await.unwrap(), Some(4001));

    let (mut client, _) = server.login(ALICE).await.unwrap();
    client.send_raw(r#"{"op":10}"#).await.unwrap();
    assert_eq!(client.expect_close().await.unwrap(), Some(4001));
}

#[tokio::test]
async fn test_missed_heartbeats_close_4009() {
    let server = TestServer::start_with(RealtimeConfig {
        heartbeat_interval_ms: 100,
        ..RealtimeConfig::default()
    })
    .await
    .unwrap();
    let (mut client, _) = server.login(ALICE).await.unwrap();

    assert_eq!(client.expect_close().await.unwrap(), Some(4009));
    assert!(server.eventually(|| !server.state.presence().is_online(ALICE)).await);
}

#[tokio::test]
async fn test_heartbeat_ack() {
    let server = TestServer::start().await.unwrap();
    let (mut client, _) = server.login(ALICE).await.unwrap();

    client.send_op(OpCode::Heartbeat, Value::Null).await.unwrap();
    loop {
        match client.next_frame().await.unwrap() {
            Frame::Json(frame) if frame["op"] == 11 => break,
            Frame::Json(_) => {}
            Frame::Closed(code) => panic!("closed with {code:?}"),
        }
    }
}

// ============================================================================
// Presence
// ============================================================================

#[tokio::test]
async fn test_presence_survives_until_last_connection_closes() {
    let server = TestServer::start().await.unwrap();
    let (mut bob, _) = server.login(BOB).await.unwrap();

    let (alice_phone, _) = server.login(ALICE).await.unwrap();
    let online = bob.expect_event("PRESENCE_UPDATE").await.unwrap();
    assert_eq!(online["user_id"], "1");
    assert_eq!(online["online"], true);

    let (alice_laptop, _) = server.login(ALICE).await.unwrap();
    assert!(bob.expect_no_event("PRESENCE_UPDATE", QUIET).await.unwrap());
    assert_eq!(server.state.presence().connection_count(ALICE), 2);

    alice_phone.close().await.unwrap();
    assert!(bob.expect_no_event("PRESENCE_UPDATE", QUIET).await.unwrap());
    assert!(server.state.presence().is_online(ALICE));

    alice_laptop.close().await.unwrap();
    let offline = bob.expect_event("PRESENCE_UPDATE").await.unwrap();
    assert_eq!(offline["user_id"], "1");
    assert_eq!(offline["online"], false);
    assert!(offline["last_seen"].is_string());
    assert!(!server.state.presence().is_online(ALICE));
}

// ============================================================================
// Rooms
// ============================================================================

#[tokio::test]
async fn test_join_forbidden_room_is_silent() {
    let server = TestServer::start().await.unwrap();
    let (mut carol, _) = server.login(CAROL).await.unwrap();

    carol
        .send_op(OpCode::RoomJoin, json!({ "room_id": SECRET }))
        .await
        .unwrap();
    assert!(carol.expect_no_event("ROOM_JOINED", QUIET).await.unwrap());

    carol.send_message(SECRET, "let me in", "n1").await.unwrap();
    let error = carol.expect_event("MESSAGE_ERROR").await.unwrap();
    assert_eq!(error["reason"], "FORBIDDEN");
    assert_eq!(error["nonce"], "n1");
    assert_eq!(server.store.message_count(), 0);
}

#[tokio::test]
async fn test_leave_twice_confirms_once() {
    let server = TestServer::start().await.unwrap();
    let (mut alice, _) = server.login(ALICE).await.unwrap();
    let joined = alice.join(GENERAL).await.unwrap();
    assert_eq!(joined["room_id"], "1000");

    alice
        .send_op(OpCode::RoomLeave, json!({ "room_id": GENERAL }))
        .await
        .unwrap();
    alice.expect_event("ROOM_LEFT").await.unwrap();

    alice
        .send_op(OpCode::RoomLeave, json!({ "room_id": GENERAL }))
        .await
        .unwrap();
    assert!(alice.expect_no_event("ROOM_LEFT", QUIET).await.unwrap());
    assert_eq!(server.state.rooms().subscriber_count(GENERAL), 0);
}

// ============================================================================
// Message relay
// ============================================================================

#[tokio::test]
async fn test_message_reaches_every_device_once() {
    let server = TestServer::start().await.unwrap();
    let (mut phone, _) = server.login(ALICE).await.unwrap();
    let (mut laptop, _) = server.login(ALICE).await.unwrap();
    let (mut bob, _) = server.login(BOB).await.unwrap();
    for client in [&mut phone, &mut laptop, &mut bob] {
        client.join(GENERAL).await.unwrap();
    }

    phone.send_message(GENERAL, "hi all", "abc").await.unwrap();

    for client in [&mut phone, &mut laptop, &mut bob] {
        let created = client.expect_event("MESSAGE_CREATE").await.unwrap();
        assert_eq!(created["content"], "hi all");
        assert_eq!(created["room_id"], "1000");
        assert_eq!(created["author"]["id"], "1");
        assert_eq!(created["nonce"], "abc");
        assert!(client.expect_no_event("MESSAGE_CREATE", QUIET).await.unwrap());
    }
    assert_eq!(server.store.message_count(), 1);
}

#[tokio::test]
async fn test_messages_arrive_in_send_order() {
    let server = TestServer::start().await.unwrap();
    let (mut alice, _) = server.login(ALICE).await.unwrap();
    let (mut bob, _) = server.login(BOB).await.unwrap();
    alice.join(GENERAL).await.unwrap();
    bob.join(GENERAL).await.unwrap();

    alice.send_message(GENERAL, "M1", "1").await.unwrap();
    alice.send_message(GENERAL, "M2", "2").await.unwrap();

    let first = bob.expect_event("MESSAGE_CREATE").await.unwrap();
    let second = bob.expect_event("MESSAGE_CREATE").await.unwrap();
    assert_eq!(first["content"], "M1");
    assert_eq!(second["content"], "M2");
}

#[tokio::test]
async fn test_left_room_misses_live_traffic_but_keeps_history() {
    let server = TestServer::start().await.unwrap();
    let (mut alice, _) = server.login(ALICE).await.unwrap();
    let (mut bob, _) = server.login(BOB).await.unwrap();
    alice.join(GENERAL).await.unwrap();
    bob.join(GENERAL).await.unwrap();

    bob.send_op(OpCode::RoomLeave, json!({ "room_id": GENERAL }))
        .await
        .unwrap();
    bob.expect_event("ROOM_LEFT").await.unwrap();

    alice.send_message(GENERAL, "while you were out", "x").await.unwrap();
    alice.expect_event("MESSAGE_CREATE").await.unwrap();
    assert!(bob.expect_no_event("MESSAGE_CREATE", QUIET).await.unwrap());

    let history = MessageService::new(server.state.service_context())
        .history(BOB, GENERAL, MessageQuery::latest(10))
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].content, "while you were out");
}

#[tokio::test]
async fn test_edit_delete_and_read() {
    let server = TestServer::start().await.unwrap();
    let (mut alice, _) = server.login(ALICE).await.unwrap();
    let (mut bob, _) = server.login(BOB).await.unwrap();
    alice.join(GENERAL).await.unwrap();
    bob.join(GENERAL).await.unwrap();

    alice.send_message(GENERAL, "draft", "s").await.unwrap();
    let created = bob.expect_event("MESSAGE_CREATE").await.unwrap();
    let message_id = created["id"].clone();

    bob.send_op(
        OpCode::MessageEdit,
        json!({ "message_id": message_id, "content": "hijack", "nonce": "e0" }),
    )
    .await
    .unwrap();
    let error = bob.expect_event("MESSAGE_ERROR").await.unwrap();
    assert_eq!(error["reason"], "FORBIDDEN");
    assert_eq!(error["nonce"], "e0");

    alice
        .send_op(
            OpCode::MessageEdit,
            json!({ "message_id": message_id, "content": "final" }),
        )
        .await
        .unwrap();
    let updated = bob.expect_event("MESSAGE_UPDATE").await.unwrap();
    assert_eq!(updated["content"], "final");
    assert!(updated["edited_at"].is_string());

    bob.send_op(OpCode::MessageRead, json!({ "message_id": message_id }))
        .await
        .unwrap();
    let read = alice.expect_event("MESSAGE_READ").await.unwrap();
    assert_eq!(read["user_id"], "2");
    assert!(bob.expect_no_event("MESSAGE_READ", QUIET).await.unwrap());

    alice
        .send_op(OpCode::MessageDelete, json!({ "message_id": message_id }))
        .await
        .unwrap();
    let deleted = bob.expect_event("MESSAGE_DELETE").await.unwrap();
    assert_eq!(deleted["id"], message_id);
}

#[tokio::test]
async fn test_invalid_message_reported_in_band() {
    let server = TestServer::start().await.unwrap();
    let (mut alice, _) = server.login(ALICE).await.unwrap();
    alice.join(GENERAL).await.unwrap();

    alice.send_message(GENERAL, "   ", "blank").await.unwrap();
    let error = alice.expect_event("MESSAGE_ERROR").await.unwrap();
    assert_eq!(error["reason"], "INVALID_MESSAGE");
    assert_eq!(error["nonce"], "blank");

    // The connection stays usable
    alice.send_message(GENERAL, "ok", "after").await.unwrap();
    alice.expect_event("MESSAGE_CREATE").await.unwrap();
}

#[tokio::test]
async fn test_command_flood_is_rate_limited() {
    let server = TestServer::start_with(RealtimeConfig {
        commands_per_second: 1,
        command_burst: 1,
        ..RealtimeConfig::default()
    })
    .await
    .unwrap();
    let (mut alice, _) = server.login(ALICE).await.unwrap();
    alice.join(GENERAL).await.unwrap();

    alice.send_message(GENERAL, "one", "1").await.unwrap();
    alice.send_message(GENERAL, "two", "2").await.unwrap();

    alice.expect_event("MESSAGE_CREATE").await.unwrap();
    let error = alice.expect_event("MESSAGE_ERROR").await.unwrap();
    assert_eq!(error["reason"], "RATE_LIMITED");
    assert_eq!(error["nonce"], "2");
    assert_eq!(server.store.message_count(), 1);
}

// ============================================================================
// Store failures
// ============================================================================

async fn server_with_flaky_messages() -> (TestServer, Arc<FlakyMessages>) {
    let mut flaky = None;
    let server = TestServer::start_with_stores(RealtimeConfig::default(), |store| {
        let messages = FlakyMessages::new(store.clone());
        flaky = Some(messages.clone());
        TestStores {
            messages,
            presence: store.clone(),
        }
    })
    .await
    .unwrap();
    (server, flaky.unwrap())
}

#[tokio::test]
async fn test_slow_presence_write_outlasting_auth_window() {
    let server = TestServer::start_with_stores(
        RealtimeConfig {
            auth_timeout_ms: 200,
            ..RealtimeConfig::default()
        },
        |store| TestStores {
            messages: store.clone(),
            presence: SlowPresence::new(store.clone(), Duration::from_millis(400)),
        },
    )
    .await
    .unwrap();

    let (mut alice, _) = server.login(ALICE).await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;

    // Still open well past the auth window
    alice.send_op(OpCode::Heartbeat, Value::Null).await.unwrap();
    loop {
        match alice.next_frame().await.unwrap() {
            Frame::Json(frame) if frame["op"] == 11 => break,
            Frame::Json(_) => {}
            Frame::Closed(code) => panic!("closed with {code:?}"),
        }
    }
    assert_eq!(server.state.connection_manager().connection_count(), 1);
    assert!(server.state.presence().is_online(ALICE));

    alice.close().await.unwrap();
    assert!(
        server
            .eventually(|| {
                server.state.connection_manager().connection_count() == 0
                    && !server.state.presence().is_online(ALICE)
            })
            .await
    );
}

#[tokio::test]
async fn test_store_outage_rejects_send_without_fan_out() {
    let (server, flaky) = server_with_flaky_messages().await;
    let (mut alice, _) = server.login(ALICE).await.unwrap();
    let (mut bob, _) = server.login(BOB).await.unwrap();
    alice.join(GENERAL).await.unwrap();
    bob.join(GENERAL).await.unwrap();

    flaky.fail_inserts(true);
    alice.send_message(GENERAL, "lost", "n1").await.unwrap();
    let error = alice.expect_event("MESSAGE_ERROR").await.unwrap();
    assert_eq!(error["reason"], "PERSISTENCE_FAILURE");
    assert_eq!(error["nonce"], "n1");

    assert!(bob.expect_no_event("MESSAGE_CREATE", QUIET).await.unwrap());
    assert!(alice.expect_no_event("MESSAGE_CREATE", QUIET).await.unwrap());
    assert_eq!(server.store.message_count(), 0);
    assert!(server.notifier.sent().is_empty());

    flaky.fail_inserts(false);
    alice.send_message(GENERAL, "back", "n2").await.unwrap();
    let created = bob.expect_event("MESSAGE_CREATE").await.unwrap();
    assert_eq!(created["content"], "back");
    assert_eq!(server.store.message_count(), 1);
}

#[tokio::test]
async fn test_best_effort_failures_never_reach_clients() {
    let (server, flaky) = server_with_flaky_messages().await;
    flaky.fail_summaries(true);
    server.notifier.fail_deliveries();

    let (mut alice, _) = server.login(ALICE).await.unwrap();
    let (mut carol, _) = server.login(CAROL).await.unwrap();
    alice.join(GENERAL).await.unwrap();
    carol.join(GENERAL).await.unwrap();

    alice.send_message(GENERAL, "hello @bob", "m").await.unwrap();
    carol.expect_event("MESSAGE_CREATE").await.unwrap();
    alice.expect_event("MESSAGE_CREATE").await.unwrap();

    // Delivery to Bob was attempted and failed
    assert!(server.eventually(|| !server.notifier.sent_to(BOB).is_empty()).await);
    assert!(alice.expect_no_event("MESSAGE_ERROR", QUIET).await.unwrap());
    assert!(carol.expect_no_event("MESSAGE_ERROR", QUIET).await.unwrap());

    assert_eq!(server.store.message_count(), 1);
    let room = server.store.room(GENERAL).unwrap();
    assert!(room.last_message_preview.is_none());

    alice.send_message(GENERAL, "still here", "m2").await.unwrap();
    let created = carol.expect_event("MESSAGE_CREATE").await.unwrap();
    assert_eq!(created["content"], "still here");
}

// ============================================================================
// Notifications
// ============================================================================

#[tokio::test]
async fn test_offline_member_notified_of_mention() {
    let server = TestServer::start().await.unwrap();
    let (mut alice, _) = server.login(ALICE).await.unwrap();
    let (mut carol, _) = server.login(CAROL).await.unwrap();
    alice.join(GENERAL).await.unwrap();
    carol.join(GENERAL).await.unwrap();

    alice.send_message(GENERAL, "hello @bob", "m").await.unwrap();
    carol.expect_event("MESSAGE_CREATE").await.unwrap();

    assert!(server.eventually(|| !server.notifier.sent_to(BOB).is_empty()).await);
    let notification = &server.notifier.sent_to(BOB)[0];
    assert_eq!(notification.title, "Alice mentioned you");
    assert_eq!(notification.body, "hello @bob");

    // Reached users and the author are never notified
    assert!(server
        .notifier
        .sent()
        .iter()
        .all(|n| n.user_id == BOB));
}

// ============================================================================
// Typing
// ============================================================================

#[tokio::test]
async fn test_typing_skips_senders_devices() {
    let server = TestServer::start().await.unwrap();
    let (mut phone, _) = server.login(ALICE).await.unwrap();
    let (mut laptop, _) = server.login(ALICE).await.unwrap();
    let (mut bob, _) = server.login(BOB).await.unwrap();
    for client in [&mut phone, &mut laptop, &mut bob] {
        client.join(GENERAL).await.unwrap();
    }

    phone
        .send_op(OpCode::TypingStart, json!({ "room_id": GENERAL }))
        .await
        .unwrap();
    let typing = bob.expect_event("TYPING_START").await.unwrap();
    assert_eq!(typing["user_id"], "1");
    assert_eq!(typing["room_id"], "1000");
    assert!(laptop.expect_no_event("TYPING_START", QUIET).await.unwrap());

    phone
        .send_op(OpCode::TypingStop, json!({ "room_id": GENERAL }))
        .await
        .unwrap();
    bob.expect_event("TYPING_STOP").await.unwrap();
}

// ============================================================================
// HTTP surface
// ============================================================================

#[tokio::test]
async fn test_health_reports_counts() {
    let server = TestServer::start().await.unwrap();
    let (_alice, _) = server.login(ALICE).await.unwrap();
    assert!(server.eventually(|| server.state.presence().is_online(ALICE)).await);

    let body: Value = reqwest::get(format!("http://{}/health", server.addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connections"], 1);
    assert_eq!(body["online_users"], 1);
}
