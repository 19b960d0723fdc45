use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use subcast_broker::Registry;
use subcast_client::Connection;
use subcast_protocol::{code, ClientFrame, FrameKind, Message, ServerFrame};
use tokio::sync::mpsc;

use crate::session::Session;
use crate::websocket::run_heartbeat;

fn registry() -> Arc<Registry> {
    Arc::new(Registry::new(16))
}

fn session_on(registry: &Arc<Registry>, queue_capacity: usize) -> (Session, mpsc::Receiver<ServerFrame>) {
    let (conn, rx) = Connection::new(16);
    (
        Session::new(conn, Arc::clone(registry), queue_capacity),
        rx,
    )
}

fn frame(kind: &str) -> ClientFrame {
    ClientFrame {
        kind: kind.to_string(),
        ..ClientFrame::default()
    }
}

fn subscribe_frame(topic: &str, client_id: &str, request_id: &str) -> ClientFrame {
    ClientFrame {
        topic: Some(topic.to_string()),
        client_id: Some(client_id.to_string()),
        request_id: Some(request_id.to_string()),
        ..frame("subscribe")
    }
}

fn publish_frame(topic: &str, id: &str) -> ClientFrame {
    ClientFrame {
        topic: Some(topic.to_string()),
        message: Some(Message::new(id, json!({}))),
        ..frame("publish")
    }
}

async fn recv(rx: &mut mpsc::Receiver<ServerFrame>) -> ServerFrame {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("reply within 1s")
        .expect("channel open")
}

#[tokio::test]
async fn ping_replies_pong() {
    let registry = registry();
    let (mut session, mut rx) = session_on(&registry, 8);
    session
        .dispatch(ClientFrame {
            request_id: Some("p1".into()),
            ..frame("ping")
        })
        .await;

    let reply = recv(&mut rx).await;
    assert_eq!(reply.kind, FrameKind::Pong);
    assert_eq!(reply.request_id.as_deref(), Some("p1"));
}

#[tokio::test]
async fn unknown_type_is_bad_request_with_request_id() {
    let registry = registry();
    let (mut session, mut rx) = session_on(&registry, 8);
    session
        .dispatch(ClientFrame {
            request_id: Some("x".into()),
            ..frame("bogus")
        })
        .await;

    let reply = recv(&mut rx).await;
    assert_eq!(reply.kind, FrameKind::Error);
    assert_eq!(reply.request_id.as_deref(), Some("x"));
    assert_eq!(reply.error.unwrap().code, code::BAD_REQUEST);
}

#[tokio::test]
async fn subscribe_validates_input_without_mutating_state() {
    let registry = registry();
    registry.create_topic("t").unwrap();
    let (mut session, mut rx) = session_on(&registry, 8);

    // Missing client_id entirely, then empty topic.
    for bad in [
        ClientFrame {
            topic: Some("t".into()),
            ..frame("subscribe")
        },
        ClientFrame {
            topic: Some(String::new()),
            client_id: Some("c".into()),
            ..frame("subscribe")
        },
    ] {
        session.dispatch(bad).await;
        let reply = recv(&mut rx).await;
        assert_eq!(reply.error.unwrap().code, code::BAD_REQUEST);
    }
    assert_eq!(registry.health().subscribers, 0);
    assert_eq!(session.subscription_count(), 0);
}

#[tokio::test]
async fn subscribe_unknown_topic_is_not_found() {
    let registry = registry();
    let (mut session, mut rx) = session_on(&registry, 8);
    session.dispatch(subscribe_frame("nope", "c", "r1")).await;

    let reply = recv(&mut rx).await;
    assert_eq!(reply.request_id.as_deref(), Some("r1"));
    assert_eq!(reply.error.unwrap().code, code::TOPIC_NOT_FOUND);
}

#[tokio::test]
async fn subscribe_then_publish_delivers_event() {
    let registry = registry();
    registry.create_topic("t").unwrap();
    let (mut session, mut rx) = session_on(&registry, 8);

    session.dispatch(subscribe_frame("t", "c", "r1")).await;
    let ack = recv(&mut rx).await;
    assert_eq!(ack.kind, FrameKind::Ack);
    assert_eq!(ack.status.as_deref(), Some("ok"));
    assert_eq!(session.subscription_count(), 1);

    session.dispatch(publish_frame("t", "m1")).await;

    // Publish ack and the delivered event; their relative order is not
    // guaranteed.
    let mut saw_ack = false;
    let mut saw_event = false;
    for _ in 0..2 {
        let reply = recv(&mut rx).await;
        match reply.kind {
            FrameKind::Ack => saw_ack = true,
            FrameKind::Event => {
                assert_eq!(reply.topic.as_deref(), Some("t"));
                assert_eq!(reply.message.unwrap().id, "m1");
                saw_event = true;
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }
    assert!(saw_ack && saw_event);
}

#[tokio::test]
async fn subscribe_with_replay_delivers_tail_before_live() {
    let registry = registry();
    let topic = registry.create_topic("t").unwrap();
    for i in 1..=3 {
        topic.publish(Message::new(format!("m{i}"), json!({ "n": i })));
    }

    let (mut session, mut rx) = session_on(&registry, 8);
    session
        .dispatch(ClientFrame {
            last_n: Some(2),
            ..subscribe_frame("t", "s1", "r")
        })
        .await;
    session.dispatch(publish_frame("t", "m4")).await;

    // Five frames total: two acks interleaved anywhere among the events,
    // with the events themselves strictly ordered.
    let mut events = Vec::new();
    let mut acks = 0;
    for _ in 0..5 {
        let reply = recv(&mut rx).await;
        match reply.kind {
            FrameKind::Event => events.push(reply.message.unwrap().id),
            FrameKind::Ack => acks += 1,
            other => panic!("unexpected frame {other:?}"),
        }
    }
    assert_eq!(events, ["m2", "m3", "m4"]);
    assert_eq!(acks, 2);
}

#[tokio::test]
async fn replay_overflow_closes_subscriber_without_ack() {
    let registry = registry();
    let topic = registry.create_topic("t").unwrap();
    for i in 0..5 {
        topic.publish(Message::new(format!("m{i}"), json!({})));
    }

    // Queue of one cannot hold a five-message replay.
    let (mut session, mut rx) = session_on(&registry, 1);
    session
        .dispatch(ClientFrame {
            last_n: Some(5),
            ..subscribe_frame("t", "s1", "r")
        })
        .await;

    assert_eq!(topic.subscriber_count(), 0);
    assert_eq!(session.subscription_count(), 0);
    let mut saw_slow_consumer = false;
    while let Ok(reply) = rx.try_recv() {
        assert_ne!(reply.kind, FrameKind::Ack, "no ack after replay overflow");
        if reply.kind == FrameKind::Error {
            assert_eq!(reply.error.unwrap().code, code::SLOW_CONSUMER);
            saw_slow_consumer = true;
        }
    }
    assert!(saw_slow_consumer);
}

#[tokio::test]
async fn unsubscribe_acks_even_when_topic_is_missing() {
    let registry = registry();
    let (mut session, mut rx) = session_on(&registry, 8);
    session
        .dispatch(ClientFrame {
            topic: Some("ghost".into()),
            client_id: Some("c".into()),
            request_id: Some("u1".into()),
            ..frame("unsubscribe")
        })
        .await;

    let reply = recv(&mut rx).await;
    assert_eq!(reply.kind, FrameKind::Ack);
    assert_eq!(reply.request_id.as_deref(), Some("u1"));
}

#[tokio::test]
async fn unsubscribe_removes_the_binding() {
    let registry = registry();
    let topic = registry.create_topic("t").unwrap();
    let (mut session, mut rx) = session_on(&registry, 8);

    session.dispatch(subscribe_frame("t", "c", "r1")).await;
    recv(&mut rx).await;
    assert_eq!(topic.subscriber_count(), 1);

    session
        .dispatch(ClientFrame {
            topic: Some("t".into()),
            client_id: Some("c".into()),
            ..frame("unsubscribe")
        })
        .await;
    recv(&mut rx).await;
    assert_eq!(topic.subscriber_count(), 0);
    assert_eq!(session.subscription_count(), 0);
}

#[tokio::test]
async fn publish_requires_topic_and_message() {
    let registry = registry();
    registry.create_topic("t").unwrap();
    let (mut session, mut rx) = session_on(&registry, 8);

    session
        .dispatch(ClientFrame {
            topic: Some("t".into()),
            ..frame("publish")
        })
        .await;
    let reply = recv(&mut rx).await;
    assert_eq!(reply.error.unwrap().code, code::BAD_REQUEST);
    assert_eq!(registry.stats().topics.get("t").unwrap().messages, 0);
}

#[tokio::test]
async fn publish_to_unknown_topic_keeps_session_usable() {
    let registry = registry();
    let (mut session, mut rx) = session_on(&registry, 8);

    session
        .dispatch(ClientFrame {
            request_id: Some("q".into()),
            ..publish_frame("x", "a")
        })
        .await;
    let reply = recv(&mut rx).await;
    assert_eq!(reply.request_id.as_deref(), Some("q"));
    assert_eq!(reply.error.unwrap().code, code::TOPIC_NOT_FOUND);

    // The session survives the error.
    session.dispatch(frame("ping")).await;
    assert_eq!(recv(&mut rx).await.kind, FrameKind::Pong);
}

#[tokio::test]
async fn finish_unregisters_everything_the_session_created() {
    let registry = registry();
    let topic_a = registry.create_topic("a").unwrap();
    let topic_b = registry.create_topic("b").unwrap();
    let (mut session, mut rx) = session_on(&registry, 8);

    session.dispatch(subscribe_frame("a", "c", "r1")).await;
    session.dispatch(subscribe_frame("b", "c", "r2")).await;
    recv(&mut rx).await;
    recv(&mut rx).await;
    assert_eq!(registry.health().subscribers, 2);

    session.finish();
    assert_eq!(topic_a.subscriber_count(), 0);
    assert_eq!(topic_b.subscriber_count(), 0);
    assert_eq!(session.subscription_count(), 0);
}

#[tokio::test]
async fn losing_session_exit_spares_the_replacement_binding() {
    let registry = registry();
    let topic = registry.create_topic("t").unwrap();
    let (mut session_a, mut rx_a) = session_on(&registry, 8);
    let (mut session_b, mut rx_b) = session_on(&registry, 8);

    session_a.dispatch(subscribe_frame("t", "c", "ra")).await;
    recv(&mut rx_a).await;
    session_b.dispatch(subscribe_frame("t", "c", "rb")).await;
    recv(&mut rx_b).await;
    assert_eq!(topic.subscriber_count(), 1);

    // A's exit must not tear down B's binding for the same client id.
    session_a.finish();
    assert_eq!(topic.subscriber_count(), 1);

    topic.publish(Message::new("m1", json!({})));
    let event = recv(&mut rx_b).await;
    assert_eq!(event.message.unwrap().id, "m1");
    assert!(rx_a.try_recv().is_err());
}

#[tokio::test]
async fn heartbeat_ticks_until_connection_closes() {
    let (conn, mut rx) = Connection::new(8);
    tokio::spawn(run_heartbeat(conn.clone(), Duration::from_millis(10)));

    for _ in 0..2 {
        let frame = recv(&mut rx).await;
        assert_eq!(frame.kind, FrameKind::Info);
        assert_eq!(frame.msg.as_deref(), Some("ping"));
    }
    conn.close();
    // The ticker stops; the channel eventually yields nothing new.
    tokio::time::sleep(Duration::from_millis(50)).await;
    while rx.try_recv().is_ok() {}
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(rx.try_recv().is_err());
}
