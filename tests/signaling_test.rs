//! End-to-end room actor scenarios that don't fit as unit tests because
//! they exercise timing (rate limit windows, heartbeat expiry) alongside
//! multi-peer message flow.

use std::sync::Arc;
use std::time::Duration;

use peerjs_broker::config::Config;
use peerjs_broker::message::{ClientMessage, ErrorKind, ServerMessage};
use peerjs_broker::room::{self, RoomCommand};
use tokio::sync::{mpsc, oneshot};

async fn register(mailbox: &mpsc::Sender<RoomCommand>, id: &str) -> mpsc::Receiver<ServerMessage> {
    let (outbound, rx) = mpsc::channel(32);
    let (reply_tx, reply_rx) = oneshot::channel();
    mailbox
        .send(RoomCommand::Register {
            id: id.to_string(),
            outbound,
            reply: reply_tx,
        })
        .await
        .unwrap();
    reply_rx.await.unwrap().unwrap();
    rx
}

#[tokio::test]
async fn exceeding_rate_limit_yields_wire_error() {
    let mut cfg = Config::default_for_test();
    cfg.rate_limit_max = 2;
    cfg.rate_limit_window = Duration::from_secs(60);
    let mailbox = room::spawn("rate-room".into(), Arc::new(cfg));

    let mut alice_rx = register(&mailbox, "alice").await;
    alice_rx.recv().await.unwrap(); // OPEN
    let _bob_rx = register(&mailbox, "bob").await;

    for _ in 0..2 {
        mailbox
            .send(RoomCommand::Inbound {
                peer_id: "alice".into(),
                message: ClientMessage::Offer {
                    src: "alice".into(),
                    dst: "bob".into(),
                    payload: serde_json::json!({"type": "offer", "sdp": "v=0"}),
                },
            })
            .await
            .unwrap();
    }

    mailbox
        .send(RoomCommand::Inbound {
            peer_id: "alice".into(),
            message: ClientMessage::Offer {
                src: "alice".into(),
                dst: "bob".into(),
                payload: serde_json::json!({"type": "offer", "sdp": "v=0"}),
            },
        })
        .await
        .unwrap();

    let frame = alice_rx.recv().await.unwrap();
    match frame {
        ServerMessage::Error { payload } => {
            assert_eq!(payload.kind, ErrorKind::RateLimitExceeded);
            assert_eq!(payload.message, "Rate limit exceeded (2 messages/second)");
        }
        other => panic!("expected rate-limit ERROR, got {other:?}"),
    }
}

#[tokio::test]
async fn heartbeat_keeps_peer_alive_across_sweeps() {
    let mut cfg = Config::default_for_test();
    cfg.heartbeat_timeout = Duration::from_millis(50);
    let mailbox = room::spawn("heartbeat-room".into(), Arc::new(cfg));

    let mut alice_rx = register(&mailbox, "alice").await;
    alice_rx.recv().await.unwrap(); // OPEN

    mailbox
        .send(RoomCommand::Inbound {
            peer_id: "alice".into(),
            message: ClientMessage::Heartbeat,
        })
        .await
        .unwrap();

    // A quiet room never sweeps on its own; nudge it with a second event
    // shortly after, well inside the timeout window.
    tokio::time::sleep(Duration::from_millis(10)).await;
    mailbox
        .send(RoomCommand::Inbound {
            peer_id: "alice".into(),
            message: ClientMessage::Heartbeat,
        })
        .await
        .unwrap();

    assert!(alice_rx.try_recv().is_err(), "no EXPIRE should have been sent");
}

#[tokio::test]
async fn silent_peer_is_expired_once_another_event_wakes_the_room() {
    let mut cfg = Config::default_for_test();
    cfg.heartbeat_timeout = Duration::from_millis(20);
    let mailbox = room::spawn("expiry-room".into(), Arc::new(cfg));

    let mut alice_rx = register(&mailbox, "alice").await;
    alice_rx.recv().await.unwrap(); // OPEN

    tokio::time::sleep(Duration::from_millis(40)).await;

    // Register a second peer to give the actor another event to process,
    // which triggers the on-event sweep that notices alice has gone stale.
    let _bob_rx = register(&mailbox, "bob").await;

    let frame = alice_rx.recv().await.unwrap();
    assert!(matches!(frame, ServerMessage::Expire { peer_id } if peer_id == "alice"));
}

#[tokio::test]
async fn leave_message_removes_peer_and_notifies_room() {
    let mailbox = room::spawn("leave-room".into(), Arc::new(Config::default_for_test()));
    let mut alice_rx = register(&mailbox, "alice").await;
    alice_rx.recv().await.unwrap(); // OPEN
    let _bob_rx = register(&mailbox, "bob").await;

    mailbox
        .send(RoomCommand::Inbound {
            peer_id: "bob".into(),
            message: ClientMessage::Leave { src: "bob".into() },
        })
        .await
        .unwrap();

    let frame = alice_rx.recv().await.unwrap();
    assert!(matches!(frame, ServerMessage::Leave { peer_id } if peer_id == "bob"));
}
