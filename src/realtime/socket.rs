//! `/gist-realtime` websocket endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{debug, instrument, warn};

use super::hub::{ClientEvent, ViewerHub};
use crate::AppState;
use crate::metrics::MetricsRegistry;

#[instrument(skip_all)]
pub async fn handle_gist_realtime(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let hub = Arc::clone(&state.hub);
    let metrics = state.metrics.clone();
    ws.on_upgrade(move |socket| serve_viewer(socket, hub, metrics))
}

/// Drive one viewer connection: a writer task drains the hub's outbound
/// queue while this task reads client frames in arrival order.
async fn serve_viewer(socket: WebSocket, hub: Arc<ViewerHub>, metrics: MetricsRegistry) {
    let (mut sink, mut stream) = socket.split();
    let (conn, mut outbound) = hub.connect();
    metrics.metrics.realtime_connections.inc();

    let writer = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "failed to encode viewer event");
                    continue;
                }
            };
            if let Err(e) = sink.send(Message::Text(text.into())).await {
                debug!(error = %e, "viewer socket closed while sending");
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(text.as_str()) {
                Ok(event) => hub.handle(conn, event),
                Err(e) => debug!(conn = %conn, error = %e, "ignoring malformed viewer frame"),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(conn = %conn, error = %e, "viewer socket error");
                break;
            }
        }
    }

    hub.disconnect(conn);
    writer.abort();
    metrics.metrics.realtime_connections.dec();
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
    use wiremock::MockServer;

    use super::*;
    use crate::gist::builder::test_support::config_for;
    use crate::http::handler::create_router;

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn serve(server: &MockServer) -> (SocketAddr, String) {
        let config = config_for(server);
        let page = format!("{}/blob/master/hello/main.go", config.upstream.root_repo);
        let state = AppState::build(Arc::new(config)).unwrap();
        let app = create_router(Arc::new(state)).unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr, page)
    }

    async fn client(addr: SocketAddr) -> Client {
        let (ws, _) = connect_async(format!("ws://{addr}/gist-realtime"))
            .await
            .unwrap();
        ws
    }

    async fn next_text(ws: &mut Client) -> String {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("socket closed")
                .unwrap();
            if msg.is_text() {
                return msg.to_text().unwrap().to_owned();
            }
        }
    }

    fn watch_frame(page: &str) -> WsMessage {
        WsMessage::text(serde_json::json!({"event": "watch", "data": page}).to_string())
    }

    #[tokio::test]
    async fn viewers_are_counted_over_the_socket() {
        let upstream = MockServer::start().await;
        let (addr, page) = serve(&upstream).await;
        let mut a = client(addr).await;
        let mut b = client(addr).await;

        a.send(WsMessage::text("not json")).await.unwrap();
        a.send(watch_frame(&page)).await.unwrap();
        assert_eq!(next_text(&mut a).await, r#"{"event":"watch","data":1}"#);

        b.send(watch_frame(&page)).await.unwrap();
        assert_eq!(next_text(&mut a).await, r#"{"event":"watch","data":2}"#);
        assert_eq!(next_text(&mut b).await, r#"{"event":"watch","data":2}"#);

        b.close(None).await.unwrap();
        assert_eq!(next_text(&mut a).await, r#"{"event":"watch","data":1}"#);
    }
}
