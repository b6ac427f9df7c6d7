//! WebSocket transport for one channel
//!
//! The writer task drains the channel's outbound queue into the socket; the
//! read loop feeds text frames to the `ChannelSession` one at a time.

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures::{SinkExt, StreamExt};
use koderunner_core::{ChannelHandle, ChannelSession, CloseReason, Endpoint, KodeRunner, Outbound};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

pub async fn run_channel(
    socket: WebSocket,
    runner: Arc<KodeRunner>,
    endpoint: Endpoint,
    remote: SocketAddr,
) {
    let (handle, mut outbound) = ChannelHandle::new(endpoint);
    let mut session = ChannelSession::open(runner, handle);
    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let frame = match message {
                Outbound::Text(text) => Message::Text(text),
                Outbound::Close => {
                    let _ = sink
                        .send(Message::Close(Some(CloseFrame {
                            code: close_code::NORMAL,
                            reason: "".into(),
                        })))
                        .await;
                    break;
                }
            };
            if let Err(e) = sink.send(frame).await {
                debug!("Send to {} failed: {}", remote, e);
                break;
            }
        }
    });

    let reason = loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                if let Err(e) = session.handle_text(&text).await {
                    break CloseReason::Fault(e.to_string());
                }
            }
            Some(Ok(Message::Close(_))) | None => break CloseReason::Client,
            // binary frames are not part of the protocol; ping/pong is handled by axum
            Some(Ok(_)) => {}
            Some(Err(e)) => break CloseReason::Fault(e.to_string()),
        }
    };

    session.close(reason).await;
    if let Err(e) = writer.await {
        debug!("Writer for {} ended abnormally: {}", remote, e);
    }
    info!("Connection from {} on {} finished", remote, endpoint);
}
