//! Production TCP transport: one [`Connection`] per accepted socket, and
//! an accept loop that drives [`FrameAccumulator`] + [`Dispatcher::on_frame`]
//! over it. Socket I/O is deliberately kept thin and separate from the
//! protocol/dispatch core so the same core can run over any transport
//! that can produce a byte stream.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

use crate::connection::{Connection, ConnectionId};
use crate::dispatch::Dispatcher;
use crate::error::HlxResult;
use crate::protocol::framing::FrameAccumulator;
use async_trait::async_trait;

/// A live TCP peer. Reads happen on the owning task's read loop; writes go
/// through the connection object any handler may hold onto.
pub struct TcpConnection {
    id: ConnectionId,
    writer: AsyncMutex<OwnedWriteHalf>,
}

impl TcpConnection {
    /// Wraps an already-split TCP write half. Used by both the server's
    /// accept loop and the client, which each own the matching read half.
    pub fn new(writer: OwnedWriteHalf) -> Self {
        Self {
            id: ConnectionId::new(),
            writer: AsyncMutex::new(writer),
        }
    }
}

#[async_trait]
impl Connection for TcpConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn send(&self, bytes: &[u8]) -> HlxResult<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(bytes).await?;
        Ok(())
    }

    async fn close(&self) -> HlxResult<()> {
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
        Ok(())
    }
}

/// Accepts connections on `listener` until `cancel_token` fires, spawning
/// one task per peer. Each peer task reads until EOF or a read error,
/// feeding every chunk to a [`FrameAccumulator`] and handing each complete
/// frame body to the dispatcher; framing errors are logged and do not
/// close the connection.
pub async fn serve(listener: TcpListener, dispatcher: Arc<Dispatcher>, cancel_token: CancellationToken) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer_addr)) => {
                        let dispatcher = dispatcher.clone();
                        let cancel_token = cancel_token.child_token();
                        tokio::spawn(async move {
                                log::info!("[tcp] accepted connection from {peer_addr}");
                                if let Err(err) = handle_connection(stream, dispatcher, cancel_token).await {
                                    log::warn!("[tcp] connection from {peer_addr} ended: {err}");
                                }
                            });
                    }
                    Err(err) => {
                        log::warn!("[tcp] accept failed: {err}");
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log::info!("[tcp] accept loop shutting down");
                break;
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    dispatcher: Arc<Dispatcher>,
    cancel_token: CancellationToken,
) -> HlxResult<()> {
    stream.set_nodelay(true).ok();
    let (mut reader, writer) = stream.into_split();
    let connection: Arc<dyn Connection> = Arc::new(TcpConnection::new(writer));
    let mut accumulator = FrameAccumulator::new();
    let mut buf = vec![0u8; 4096];

    loop {
        let read = tokio::select! {
            result = reader.read(&mut buf) => result?,
            _ = cancel_token.cancelled() => break,
        };
        if read == 0 {
            break;
        }
        for frame in accumulator.feed(&buf[..read]) {
            match frame {
                Ok(body) => {
                    let body = String::from_utf8_lossy(&body).into_owned();
                    dispatcher.on_frame(connection.clone(), &body).await;
                }
                Err(err) => {
                    log::debug!("[tcp] framing error: {err}");
                }
            }
        }
    }

    connection.close().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::FnHandler;
    use crate::protocol::catalog::Verb;
    use crate::protocol::framing::render_frame;
    use tokio::io::AsyncReadExt as _;
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn accepted_connection_round_trips_a_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let dispatcher = Arc::new(Dispatcher::new());
        dispatcher.register(
            Verb::QueryCurrent,
            Arc::new(FnHandler::new(|connection, _captures| async move {
                        let _ = connection.send(&render_frame("QX")).await;
                    })),
        );
        let cancel_token = CancellationToken::new();
        let server_cancel = cancel_token.clone();
        tokio::spawn(serve(listener, dispatcher, server_cancel));

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"(QX)").await.unwrap();

        let mut buf = [0u8; 16];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"(QX)");

        cancel_token.cancel();
    }
}
