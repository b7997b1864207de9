use std::net::SocketAddr;

use tracing::Instrument;

use crate::datastore::Datastore;
use crate::decode::DecodeLevel;
use crate::tcp::server::ServerTask;

pub(crate) mod context;
pub(crate) mod executor;
pub(crate) mod session;
pub(crate) mod task;

// re-export to the public API
pub use context::*;
pub use executor::*;
pub use session::*;

/// A handle to the server async task. The task is shutdown when the handle is dropped.
#[derive(Debug)]
pub struct ServerHandle {
    _tx: tokio::sync::mpsc::Sender<()>,
    addr: SocketAddr,
}

impl ServerHandle {
    fn new(tx: tokio::sync::mpsc::Sender<()>, addr: SocketAddr) -> Self {
        ServerHandle { _tx: tx, addr }
    }

    /// address the server is listening on
    ///
    /// Differs from the requested address when binding to port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }
}

/// Spawns a TCP server task onto the runtime. This method can only
/// be called from within the runtime context. Use [`create_tcp_server_task`]
/// and then spawn it manually if using outside the Tokio runtime.
///
/// Each incoming connection will spawn a new task to handle it.
///
/// * `max_sessions` - Maximum number of concurrent sessions
/// * `addr` - A socket address to bound to
/// * `context` - The datastore, framer and identity shared by every session
/// * `decode` - Decode log level
pub async fn spawn_tcp_server_task<T: Datastore>(
    max_sessions: usize,
    addr: SocketAddr,
    context: ServerContext<T>,
    decode: DecodeLevel,
) -> Result<ServerHandle, std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;

    let (tx, rx) = tokio::sync::mpsc::channel(1);
    tokio::spawn(create_tcp_server_task_impl(
        rx,
        max_sessions,
        local,
        listener,
        context,
        decode,
    ));

    Ok(ServerHandle::new(tx, local))
}

/// Creates a TCP server task that can then be spawned onto the runtime manually.
/// Most users will prefer [`spawn_tcp_server_task`] unless they are using the library from
/// outside the Tokio runtime and need to spawn it using a Runtime handle instead of the
/// `tokio::spawn` function.
///
/// The task stops when the sender of `rx` is dropped.
///
/// * `rx` - Shutdown channel
/// * `max_sessions` - Maximum number of concurrent sessions
/// * `addr` - A socket address to bound to
/// * `context` - The datastore, framer and identity shared by every session
/// * `decode` - Decode log level
pub async fn create_tcp_server_task<T: Datastore>(
    rx: tokio::sync::mpsc::Receiver<()>,
    max_sessions: usize,
    addr: SocketAddr,
    context: ServerContext<T>,
    decode: DecodeLevel,
) -> Result<impl std::future::Future<Output = ()>, std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    Ok(create_tcp_server_task_impl(
        rx,
        max_sessions,
        local,
        listener,
        context,
        decode,
    ))
}

async fn create_tcp_server_task_impl<T: Datastore>(
    rx: tokio::sync::mpsc::Receiver<()>,
    max_sessions: usize,
    addr: SocketAddr,
    listener: tokio::net::TcpListener,
    context: ServerContext<T>,
    decode: DecodeLevel,
) {
    ServerTask::new(max_sessions, listener, context, decode)
        .run(rx)
        .instrument(tracing::info_span!("Modbus-Server-TCP", "listen" = ?addr))
        .await;
}
