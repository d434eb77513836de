// WebSocket hub. Every connection receives a snapshot on connect and a fresh
// one after each store change; authenticated connections may also issue
// mutating commands. Command handling is split from the socket loop so it can
// be tested without a network.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::app::Auctioneer;
use crate::protocol::{ClientCommand, ServerMessage};
use crate::store::Store;

/// Accept loop. Runs until the listener fails; each connection gets its own
/// task and its own change subscription.
pub async fn run(
    listener: TcpListener,
    app: Arc<Auctioneer>,
    store: Arc<Store>,
    admin_token: Option<String>,
) -> Result<()> {
    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .context("websocket accept failed")?;
        info!(%peer, "client connected");

        let app = Arc::clone(&app);
        let store = Arc::clone(&store);
        let token = admin_token.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, app, store, token).await {
                debug!(%peer, error = %err, "connection closed with error");
            }
            info!(%peer, "client disconnected");
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    app: Arc<Auctioneer>,
    store: Arc<Store>,
    admin_token: Option<String>,
) -> Result<()> {
    let mut ws = tokio_tungstenite::accept_async(stream)
        .await
        .context("websocket handshake failed")?;
    let mut changes = store.subscribe();

    // No configured token means every connection is an admin.
    let mut session = Session::new(admin_token);

    send(&mut ws, &snapshot_message(&app)?).await?;

    loop {
        tokio::select! {
            incoming = ws.next() => {
                let msg = match incoming {
                    Some(Ok(msg)) => msg,
                    Some(Err(err)) => return Err(err).context("websocket read failed"),
                    None => return Ok(()),
                };
                match msg {
                    Message::Text(text) => {
                        let reply = session.handle_text(&app, text.as_str());
                        send(&mut ws, &reply).await?;
                    }
                    Message::Close(_) => return Ok(()),
                    // Pings are answered by the protocol layer; binary frames
                    // are not part of the protocol.
                    _ => {}
                }
            }
            change = changes.recv() => {
                match change {
                    // A lagged receiver is fine: the next snapshot is always
                    // the full state.
                    Ok(_) | Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                        send(&mut ws, &snapshot_message(&app)?).await?;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => return Ok(()),
                }
            }
        }
    }
}

fn snapshot_message(app: &Auctioneer) -> Result<ServerMessage> {
    Ok(ServerMessage::Snapshot(app.snapshot()?))
}

async fn send<S>(ws: &mut S, message: &ServerMessage) -> Result<()>
where
    S: futures_util::Sink<Message> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    let json = serde_json::to_string(message).context("failed to encode server message")?;
    ws.send(Message::text(json))
        .await
        .context("websocket send failed")?;
    Ok(())
}

/// Per-connection command state: just the auth gate.
struct Session {
    admin_token: Option<String>,
    authed: bool,
}

impl Session {
    fn new(admin_token: Option<String>) -> Self {
        let authed = admin_token.is_none();
        Self { admin_token, authed }
    }

    /// Parse and execute one inbound text frame, producing the direct reply.
    fn handle_text(&mut self, app: &Auctioneer, text: &str) -> ServerMessage {
        let command: ClientCommand = match serde_json::from_str(text) {
            Ok(cmd) => cmd,
            Err(err) => {
                return ServerMessage::Error {
                    message: format!("bad command: {err}"),
                }
            }
        };

        if let ClientCommand::Auth { token } = &command {
            return if self.admin_token.as_deref() == Some(token.as_str()) || self.authed {
                self.authed = true;
                ServerMessage::AuthOk
            } else {
                warn!("rejected auth attempt");
                ServerMessage::Error {
                    message: "invalid token".into(),
                }
            };
        }

        if command.is_mutating() && !self.authed {
            return ServerMessage::Error {
                message: "not authenticated".into(),
            };
        }

        app.dispatch(&command)
    }
}
