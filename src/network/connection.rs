//! Connection - Handles an individual client connection.
//!
//! Each Connection runs in its own Tokio task:
//!
//! ```text
//! Phase 1: Login (first line is the name, answered with WELCOME or ERROR)
//!    ↓
//! Phase 2: Event loop (tokio::select!)
//!    - client lines  -> chat broadcast or Registry dispatch
//!    - outgoing queue -> lines routed from other users
//! ```

use crate::handlers::{Context, Registry, chat};
use crate::state::{Hub, Session};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, info, instrument, warn};

/// Longest accepted line, in bytes.
const MAX_LINE_LEN: usize = 512;

/// Lines queued for one client before further lines are dropped.
const OUTGOING_QUEUE: usize = 64;

/// What the event loop does after a client line.
enum Flow {
    Reply(Vec<String>),
    Quit,
}

/// A client connection handler.
pub struct Connection {
    addr: SocketAddr,
    stream: TcpStream,
    hub: Arc<Hub>,
    registry: Arc<Registry>,
}

impl Connection {
    /// Create a new connection handler.
    pub fn new(stream: TcpStream, addr: SocketAddr, hub: Arc<Hub>, registry: Arc<Registry>) -> Self {
        Self {
            addr,
            stream,
            hub,
            registry,
        }
    }

    /// Run the connection until the client quits or the socket closes.
    #[instrument(skip(self), fields(addr = %self.addr), name = "connection")]
    pub async fn run(self) -> anyhow::Result<()> {
        let mut framed = Framed::new(self.stream, LinesCodec::new_with_max_length(MAX_LINE_LEN));

        let name = match framed.next().await {
            Some(Ok(line)) => line.trim().to_string(),
            Some(Err(e)) => {
                debug!(error = %e, "Login line unreadable");
                framed.send("ERROR invalid name").await?;
                return Ok(());
            }
            None => return Ok(()),
        };

        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<String>(OUTGOING_QUEUE);
        let session = match self.hub.connect(&name, outgoing_tx).await {
            Ok(session) => session,
            Err(e) => {
                info!(name, reason = %e, "Login refused");
                framed.send(format!("ERROR {}", e)).await?;
                return Ok(());
            }
        };

        let result = serve(
            &mut framed,
            &mut outgoing_rx,
            &self.hub,
            &self.registry,
            &session,
        )
        .await;

        self.hub.disconnect(session).await;
        result
    }
}

async fn serve(
    framed: &mut Framed<TcpStream, LinesCodec>,
    outgoing_rx: &mut mpsc::Receiver<String>,
    hub: &Hub,
    registry: &Registry,
    session: &Session,
) -> anyhow::Result<()> {
    framed.send(format!("WELCOME {}", session.name)).await?;
    if let Some(motd) = &hub.config.server.motd {
        framed.send(motd.as_str()).await?;
    }

    loop {
        tokio::select! {
            result = framed.next() => {
                let line = match result {
                    Some(Ok(line)) => line,
                    // The codec yields nothing after an error, so this ends the session.
                    Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                        framed.send("ERROR line too long").await?;
                        return Ok(());
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Read error");
                        return Ok(());
                    }
                    None => {
                        debug!("Client closed the connection");
                        return Ok(());
                    }
                };

                match handle_line(hub, registry, session, &line).await {
                    Flow::Reply(lines) => {
                        for reply in lines {
                            framed.send(reply).await?;
                        }
                    }
                    Flow::Quit => {
                        framed.send("BYE").await?;
                        return Ok(());
                    }
                }
            }

            Some(line) = outgoing_rx.recv() => {
                framed.send(line).await?;
            }
        }
    }
}

async fn handle_line(hub: &Hub, registry: &Registry, session: &Session, line: &str) -> Flow {
    if line.trim().is_empty() {
        return Flow::Reply(Vec::new());
    }

    if !line.starts_with('/') {
        let delivered = chat::broadcast(hub, session, line).await;
        debug!(user = %session.name, delivered, "Chat line broadcast");
        return Flow::Reply(Vec::new());
    }

    if line
        .split_whitespace()
        .next()
        .is_some_and(|command| command.eq_ignore_ascii_case("/quit"))
    {
        return Flow::Quit;
    }

    let ctx = Context { hub, session, line };
    match registry.dispatch(&ctx).await {
        Ok(lines) => Flow::Reply(lines),
        Err(e) => Flow::Reply(vec![e.to_reply()]),
    }
}
