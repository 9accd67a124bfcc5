//! # Listener
//!
//! Accepts Classic clients and hands each one its own session thread.
//!
//! ```text
//! ┌──────────────┐  accept   ┌──────────────────────────────────┐
//! │ TcpListener  │──────────▶│ session thread (one per client)  │
//! │ (poll 10 ms) │           │  login → level transfer → ready  │
//! └──────────────┘           └───────────────┬──────────────────┘
//!                                            │
//!                            ┌───────────────▼──────────────────┐
//!                            │ ServerContext                    │
//!                            │ - settings, salt, collaborators  │
//!                            │ - worlds and their map buffers   │
//!                            │ - player roster, per-IP counts   │
//!                            └──────────────────────────────────┘
//! ```

mod context;

pub use context::{ServerContext, ServerSettings, DEFAULT_GREETING, SALT_LENGTH};

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::is_timeout;
use crate::session::Session;

/// Sleep between accept attempts while idle.
pub const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A bound Classic server.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    context: Arc<ServerContext>,
}

impl Server {
    /// Binds the listening socket.
    ///
    /// # Errors
    ///
    /// Returns the socket error if the address cannot be bound.
    pub fn bind(address: impl ToSocketAddrs, context: Arc<ServerContext>) -> io::Result<Self> {
        let listener = TcpListener::bind(address)?;
        listener.set_nonblocking(true)?;
        Ok(Self { listener, context })
    }

    /// Bound address.
    ///
    /// # Errors
    ///
    /// Returns the socket error if the address cannot be read.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared state.
    #[must_use]
    pub fn context(&self) -> &Arc<ServerContext> {
        &self.context
    }

    /// Accepts clients until [`ServerContext::shutdown`] is called.
    ///
    /// # Errors
    ///
    /// Returns the socket error if the listener fails.
    pub fn run(&self) -> io::Result<()> {
        info!(addr = %self.local_addr()?, "listening");
        while !self.context.is_shutting_down() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    debug!(%peer, "accepted connection");
                    if let Err(err) = Session::spawn(stream, Arc::clone(&self.context)) {
                        warn!(%peer, error = %err, "could not start session");
                    }
                }
                Err(err) if is_timeout(&err) => thread::sleep(ACCEPT_POLL_INTERVAL),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
        info!("listener stopped");
        Ok(())
    }

    /// Stops accepting and asks every session to close.
    pub fn shutdown(&self) {
        self.context.shutdown();
    }
}
