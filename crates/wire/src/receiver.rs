//! Inbound side: accept loop and per-connection dispatch.
//!
//! Each accepted connection gets its own task, which reads one request and
//! hands it to the [`RequestHandler`] together with a [`Responder`] for the
//! reply. The accept loop never waits on a handler.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

use crate::codec::{read_message, write_message};
use crate::error::WireError;
use crate::protocol::Message;
use crate::sender::{bounded, DEFAULT_PEER_TIMEOUT};

#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    /// Handle one request. Dropping `responder` without sending closes the
    /// connection with no reply.
    async fn handle(&self, message: Message, responder: Responder);
}

/// The reply half of an accepted connection. Consumed on send, so a
/// handler can answer at most once.
#[derive(Debug)]
pub struct Responder {
    stream: TcpStream,
    peer: SocketAddr,
    timeout: Duration,
}

impl Responder {
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub async fn send(mut self, message: &Message) -> Result<(), WireError> {
        let timeout = self.timeout;
        bounded(timeout, async {
            write_message(&mut self.stream, message).await?;
            self.stream.shutdown().await?;
            Ok::<(), WireError>(())
        })
        .await
    }
}

pub struct RequestReceiver<H> {
    listener: TcpListener,
    handler: Arc<H>,
    io_timeout: Duration,
}

impl<H: RequestHandler> RequestReceiver<H> {
    pub async fn bind(addr: SocketAddr, handler: Arc<H>) -> Result<Self, WireError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(listener, handler))
    }

    pub fn from_listener(listener: TcpListener, handler: Arc<H>) -> Self {
        Self {
            listener,
            handler,
            io_timeout: DEFAULT_PEER_TIMEOUT,
        }
    }

    /// Bound on reading a request and writing its reply.
    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, WireError> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn run(self) -> Result<(), WireError> {
        self.run_until(std::future::pending()).await
    }

    /// Accept connections until `shutdown` resolves. In-flight handlers
    /// keep running.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), WireError>
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr()?;
        tracing::info!(%addr, "listening");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(%addr, "receiver shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let handler = Arc::clone(&self.handler);
                        tokio::spawn(serve_connection(handler, stream, peer, self.io_timeout));
                    }
                    Err(err) => tracing::warn!(error = %err, "accept failed"),
                },
            }
        }
    }
}

async fn serve_connection<H: RequestHandler>(
    handler: Arc<H>,
    mut stream: TcpStream,
    peer: SocketAddr,
    timeout: Duration,
) {
    let message = match bounded(timeout, read_message(&mut stream)).await {
        Ok(message) => message,
        // Liveness probes connect and close without sending anything.
        Err(WireError::ConnectionClosed) => {
            tracing::trace!(%peer, "connection closed without a request");
            return;
        }
        Err(err) => {
            tracing::warn!(%peer, error = %err, "dropping connection");
            return;
        }
    };
    metrics::counter!("kv_requests_total", "kind" => message.kind().as_str()).increment(1);
    tracing::debug!(%peer, kind = %message.kind(), "request received");

    let responder = Responder {
        stream,
        peer,
        timeout,
    };
    handler.handle(message, responder).await;
}
