//! Pending-message queue behavior at the room-actor level: a message sent
//! to an unregistered destination is queued and delivered immediately
//! after that destination's OPEN, in send order.

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

fn offer(src: &str, dst: &str, tag: &str) -> ClientMessage {
    ClientMessage::Offer {
        src: src.to_string(),
        dst: dst.to_string(),
        payload: serde_json::json!({"type": "offer", "sdp": tag}),
    }
}

#[tokio::test]
async fn queued_messages_arrive_in_order_after_open() {
    let mailbox = room::spawn("queue-room".into(), Arc::new(Config::default_for_test()));
    let _alice_rx = register(&mailbox, "alice").await;

    for tag in ["first", "second", "third"] {
        mailbox
            .send(RoomCommand::Inbound {
                peer_id: "alice".into(),
                message: offer("alice", "bob", tag),
            })
            .await
            .unwrap();
    }

    let mut bob_rx = register(&mailbox, "bob").await;
    assert!(matches!(bob_rx.recv().await.unwrap(), ServerMessage::Open { .. }));

    for expected in ["first", "second", "third"] {
        match bob_rx.recv().await.unwrap() {
            ServerMessage::Offer { payload, .. } => {
                assert_eq!(payload["sdp"], expected);
            }
            other => panic!("expected Offer, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn expired_pending_messages_are_dropped_on_delivery() {
    let mut cfg = Config::default_for_test();
    cfg.queue_ttl = Duration::from_millis(20);
    let mailbox = room::spawn("queue-ttl-room".into(), Arc::new(cfg));
    let _alice_rx = register(&mailbox, "alice").await;

    mailbox
        .send(RoomCommand::Inbound {
            peer_id: "alice".into(),
            message: offer("alice", "bob", "stale"),
        })
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(40)).await;

    let mut bob_rx = register(&mailbox, "bob").await;
    assert!(matches!(bob_rx.recv().await.unwrap(), ServerMessage::Open { .. }));
    assert!(bob_rx.try_recv().is_err(), "stale message should have expired");
}

#[tokio::test]
async fn full_pending_queue_rejects_sender_with_unknown_peer_error() {
    let mut cfg = Config::default_for_test();
    cfg.queue_max_per_peer = 2;
    let mailbox = room::spawn("queue-full-room".into(), Arc::new(cfg));
    let mut alice_rx = register(&mailbox, "alice").await;
    alice_rx.recv().await.unwrap(); // OPEN

    for tag in ["first", "second"] {
        mailbox
            .send(RoomCommand::Inbound {
                peer_id: "alice".into(),
                message: offer("alice", "ghost", tag),
            })
            .await
            .unwrap();
    }
    assert!(
        alice_rx.try_recv().is_err(),
        "queueing under capacity should not error"
    );

    mailbox
        .send(RoomCommand::Inbound {
            peer_id: "alice".into(),
            message: offer("alice", "ghost", "third"),
        })
        .await
        .unwrap();

    let frame = alice_rx.recv().await.unwrap();
    match frame {
        ServerMessage::Error { payload } => {
            assert_eq!(payload.kind, ErrorKind::UnknownPeer);
            assert_eq!(payload.message, "Destination peer not found: ghost");
        }
        other => panic!("expected unknown-peer ERROR, got {other:?}"),
    }
}
