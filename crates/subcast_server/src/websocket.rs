use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use subcast_client::Connection;
use subcast_protocol::{code, ClientFrame, ServerFrame};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::session::Session;
use crate::state::AppState;

/// Per-frame read limit; larger frames terminate the session.
pub const READ_LIMIT_BYTES: usize = 1 << 20;

/// Period of the `{type:"info", msg:"ping"}` heartbeat.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.max_message_size(READ_LIMIT_BYTES)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

/// One session: reader (this task), send loop, heartbeat.
///
/// The reader dispatches inline and exits on socket error, an oversized
/// frame, a client close, or the connection's close signal (fired for
/// example when this session's only subscriber is evicted). Exit unwinds the
/// session's subscriptions and closes the socket with a normal-closure
/// status.
pub async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sink, mut reader) = socket.split();
    let queue_capacity = state.settings.broker.subscriber_queue_size;
    // Outbound buffering matches the subscriber queue bound so a stalled
    // socket backpressures subscriber writers instead of buffering frames
    // without limit.
    let (conn, out_rx) = Connection::new(queue_capacity);
    info!(conn = %conn.id(), "session open");

    let send_loop = tokio::spawn(run_send_loop(sink, out_rx, conn.clone()));
    tokio::spawn(run_heartbeat(conn.clone(), HEARTBEAT_INTERVAL));

    let mut session = Session::new(conn.clone(), state.registry.clone(), queue_capacity);
    loop {
        tokio::select! {
            _ = conn.closed() => break,
            incoming = reader.next() => match incoming {
                None | Some(Err(_)) => break,
                Some(Ok(WsMessage::Text(text))) => match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(frame) => session.dispatch(frame).await,
                    Err(err) => {
                        debug!(conn = %conn.id(), %err, "unparseable frame");
                        let _ = conn
                            .send(ServerFrame::error(None, code::BAD_REQUEST, "invalid JSON frame"))
                            .await;
                    }
                },
                Some(Ok(WsMessage::Binary(_))) => {
                    let _ = conn
                        .send(ServerFrame::error(
                            None,
                            code::BAD_REQUEST,
                            "binary frames are not supported",
                        ))
                        .await;
                }
                Some(Ok(WsMessage::Close(_))) => break,
                // Protocol-level ping/pong is handled by the library.
                Some(Ok(_)) => {}
            }
        }
    }

    session.finish();
    conn.close();
    let _ = send_loop.await;
    info!(conn = %conn.id(), "session closed");
}

/// Owns the socket sink. All outbound frames for the connection funnel
/// through here, so a frame write is never cancelled by per-request
/// handling; only connection close can abort one mid-flight. Dropping the
/// channel receiver on exit is what unblocks any writer still waiting for
/// capacity.
async fn run_send_loop(
    mut sink: SplitSink<WebSocket, WsMessage>,
    mut out: mpsc::Receiver<ServerFrame>,
    conn: Connection,
) {
    loop {
        tokio::select! {
            _ = conn.closed() => break,
            frame = out.recv() => match frame {
                None => break,
                Some(frame) => {
                    let text = match serde_json::to_string(&frame) {
                        Ok(text) => text,
                        Err(err) => {
                            debug!(conn = %conn.id(), %err, "dropping unencodable frame");
                            continue;
                        }
                    };
                    tokio::select! {
                        _ = conn.closed() => break,
                        sent = sink.send(WsMessage::Text(text)) => {
                            if sent.is_err() {
                                conn.close();
                                break;
                            }
                        }
                    }
                }
            }
        }
    }
    let goodbye = sink.send(WsMessage::Close(Some(CloseFrame {
        code: close_code::NORMAL,
        reason: "bye".into(),
    })));
    let _ = tokio::time::timeout(Duration::from_secs(1), goodbye).await;
}

/// Writes a heartbeat frame every `period` until the connection closes.
/// Best-effort: a full outbound channel drops the ping rather than waiting.
pub(crate) async fn run_heartbeat(conn: Connection, period: Duration) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = conn.closed() => break,
            _ = ticker.tick() => {
                conn.try_send(ServerFrame::heartbeat());
            }
        }
    }
}
