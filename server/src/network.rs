//! Listener setup and task orchestration for both transports.

use crate::config::ServerConfig;
use crate::context::ServerContext;
use crate::error::ServerError;
use crate::lifecycle::MatchController;
use crate::transport::{socket, stream};
use log::{error, info};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Both listeners plus the shared state they feed.
pub struct Server {
    ctx: Arc<ServerContext>,
    stream_listener: TcpListener,
    socket_listener: TcpListener,
}

impl Server {
    /// Binds both listeners. Nothing is accepted until [`Server::run`].
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let stream_listener = bind_listener(&config.stream_addr).await?;
        let socket_listener = bind_listener(&config.socket_addr).await?;

        info!(
            "Listening for stream clients on {}",
            stream_listener.local_addr()?
        );
        info!(
            "Listening for websocket clients on {}",
            socket_listener.local_addr()?
        );

        Ok(Server {
            ctx: Arc::new(ServerContext::new(config)),
            stream_listener,
            socket_listener,
        })
    }

    pub fn stream_addr(&self) -> io::Result<SocketAddr> {
        self.stream_listener.local_addr()
    }

    pub fn socket_addr(&self) -> io::Result<SocketAddr> {
        self.socket_listener.local_addr()
    }

    pub fn context(&self) -> Arc<ServerContext> {
        Arc::clone(&self.ctx)
    }

    /// Runs both acceptors and the match controller until one of them stops.
    pub async fn run(self) -> Result<(), ServerError> {
        let Server {
            ctx,
            stream_listener,
            socket_listener,
        } = self;

        let stream_task = tokio::spawn(stream::run_acceptor(stream_listener, Arc::clone(&ctx)));
        let socket_task = tokio::spawn(socket::run_acceptor(socket_listener, Arc::clone(&ctx)));
        let match_task = tokio::spawn(MatchController::new(Arc::clone(&ctx)).run());

        info!("Server started successfully");

        tokio::select! {
            result = stream_task => {
                if let Err(e) = result {
                    error!("Stream acceptor task failed: {}", e);
                }
            }
            result = socket_task => {
                if let Err(e) = result {
                    error!("Websocket acceptor task failed: {}", e);
                }
            }
            result = match_task => {
                if let Err(e) = result {
                    error!("Match task failed: {}", e);
                }
            }
        }

        info!("Server shutting down");
        Ok(())
    }
}

async fn bind_listener(addr: &str) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })
}
